//! Composite hash made of one fingerprint per 90° rotation.
//!
//! # Text format
//!
//! ```text
//! 0x0001 0x0010 <block 0°><block 90°><block 180°><block 270°>
//! ^       ^     (no spaces in the real encoding)
//! |       per-block hex width
//! format version
//! ```
//!
//! Both header fields are `0x` followed by four hex digits. For the default
//! `hash_size` of 8 a hash is `12 + 4 × 16 = 76` characters long.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{BitFingerprint, HashError};

/// Number of orientations captured by a composite hash.
pub const ROTATIONS: usize = 4;

/// Version written in the text header.
const FORMAT_VERSION: u16 = 0x0001;

/// Length of one `0xNNNN` header field.
const HEADER_FIELD_LEN: usize = 6;

/// Largest side length whose block width still fits the 4-digit header field.
pub const MAX_HASH_SIZE: usize = 256;

const DIGEST_MULTIPLIER: u64 = 0x9e37_79b9_7f4a_7c15;

/// Four fingerprints, one per rotation, in 0°, 90°, 180°, 270° order.
///
/// Always complete: use [`CompositeHashBuilder`] to assemble one rotation at
/// a time. Equality is positional, so rotation order matters.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CompositeHash {
    fingerprints: [BitFingerprint; ROTATIONS],
}

impl CompositeHash {
    /// Create a composite hash from four fingerprints of the same size.
    ///
    /// # Errors
    ///
    /// Returns [`HashError::SizeMismatch`] if the fingerprints differ in size,
    /// or [`HashError::Format`] if the size exceeds [`MAX_HASH_SIZE`].
    pub fn new(fingerprints: [BitFingerprint; ROTATIONS]) -> Result<Self, HashError> {
        let mut builder = CompositeHashBuilder::new();
        for fingerprint in fingerprints {
            builder.append(fingerprint)?;
        }
        builder.build()
    }

    /// Start assembling a composite hash one rotation at a time.
    #[must_use]
    pub fn builder() -> CompositeHashBuilder {
        CompositeHashBuilder::new()
    }

    /// The four fingerprints in rotation order.
    #[must_use]
    pub fn fingerprints(&self) -> &[BitFingerprint; ROTATIONS] {
        &self.fingerprints
    }

    /// Side length shared by all four fingerprints.
    #[must_use]
    pub fn hash_size(&self) -> usize {
        self.fingerprints[0].hash_size()
    }

    /// Total number of bits across the four rotations.
    #[must_use]
    pub fn bit_len(&self) -> usize {
        ROTATIONS * self.fingerprints[0].bit_len()
    }

    /// Normalized positional Hamming distance, in `[0, 1]`.
    ///
    /// Sums the distance of each rotation pair and divides by the total bit
    /// count. Symmetric, and zero exactly when the hashes are equal.
    ///
    /// # Errors
    ///
    /// Returns [`HashError::SizeMismatch`] if the hash sizes differ.
    pub fn difference(&self, other: &Self) -> Result<f64, HashError> {
        let distance = self.shifted_distance(other, 0)?;
        Ok(f64::from(distance) / self.bit_len() as f64)
    }

    /// Smallest [`difference`](Self::difference) over the four cyclic
    /// rotations of `other`.
    ///
    /// # Errors
    ///
    /// Returns [`HashError::SizeMismatch`] if the hash sizes differ.
    pub fn rotated_difference(&self, other: &Self) -> Result<f64, HashError> {
        let mut best = u32::MAX;
        for shift in 0..ROTATIONS {
            best = best.min(self.shifted_distance(other, shift)?);
        }
        Ok(f64::from(best) / self.bit_len() as f64)
    }

    /// Rotation offset under which `other` is bit-equal to `self`.
    ///
    /// Offset `s` pairs `self[i]` with `other[(i + s) % 4]`. Returns `None`
    /// when no rotation matches or the sizes differ.
    #[must_use]
    pub fn rotation_offset(&self, other: &Self) -> Option<usize> {
        (0..ROTATIONS).find(|&shift| {
            (0..ROTATIONS)
                .all(|i| self.fingerprints[i] == other.fingerprints[(i + shift) % ROTATIONS])
        })
    }

    /// Whether `other` equals `self` up to a cyclic rotation.
    #[must_use]
    pub fn matches_rotated(&self, other: &Self) -> bool {
        self.rotation_offset(other).is_some()
    }

    /// Digest combining the four fingerprint digests.
    ///
    /// Equal hashes produce equal digests; used as a grouping bucket key.
    #[must_use]
    pub fn digest(&self) -> u64 {
        self.fingerprints.iter().fold(0u64, |acc, fingerprint| {
            (acc.rotate_left(7) ^ fingerprint.fingerprint()).wrapping_mul(DIGEST_MULTIPLIER)
        })
    }

    /// Serialize with the version/width header followed by four hex blocks.
    #[must_use]
    pub fn to_hex(&self) -> String {
        let blocks: Vec<String> = self.fingerprints.iter().map(BitFingerprint::to_hex).collect();
        let width = blocks[0].len();
        let mut out = String::with_capacity(2 * HEADER_FIELD_LEN + ROTATIONS * width);
        out.push_str(&format!("{FORMAT_VERSION:#06x}"));
        out.push_str(&format!("{width:#06x}"));
        for block in &blocks {
            out.push_str(block);
        }
        out
    }

    /// Parse the text produced by [`to_hex`](Self::to_hex).
    ///
    /// # Errors
    ///
    /// Returns [`HashError::Format`] on a malformed header, an unsupported
    /// version, an impossible block width, or a body of the wrong length.
    pub fn from_hex(s: &str) -> Result<Self, HashError> {
        let version = parse_header_field(s.get(..HEADER_FIELD_LEN), "version")?;
        if version != FORMAT_VERSION {
            return Err(HashError::Format(format!(
                "unsupported hash format version {version:#06x}"
            )));
        }

        let width = usize::from(parse_header_field(
            s.get(HEADER_FIELD_LEN..2 * HEADER_FIELD_LEN),
            "block width",
        )?);
        let hash_size = hash_size_for_width(width)?;

        let body = &s[2 * HEADER_FIELD_LEN..];
        if body.len() != ROTATIONS * width {
            return Err(HashError::Format(format!(
                "expected {} hex digits after the header, found {}",
                ROTATIONS * width,
                body.len()
            )));
        }

        let mut builder = CompositeHashBuilder::new();
        for index in 0..ROTATIONS {
            let block = body
                .get(index * width..(index + 1) * width)
                .ok_or_else(|| HashError::Format("hash text is not ASCII".to_string()))?;
            builder.append(BitFingerprint::from_hex(block, hash_size)?)?;
        }
        builder.build()
    }

    fn shifted_distance(&self, other: &Self, shift: usize) -> Result<u32, HashError> {
        let mut total = 0;
        for i in 0..ROTATIONS {
            total += self.fingerprints[i]
                .hamming_distance(&other.fingerprints[(i + shift) % ROTATIONS])?;
        }
        Ok(total)
    }
}

impl fmt::Display for CompositeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for CompositeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CompositeHash").field(&self.to_hex()).finish()
    }
}

impl FromStr for CompositeHash {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for CompositeHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for CompositeHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Incomplete composite hash, filled one rotation at a time.
#[derive(Debug, Clone, Default)]
pub struct CompositeHashBuilder {
    fingerprints: Vec<BitFingerprint>,
}

impl CompositeHashBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            fingerprints: Vec::with_capacity(ROTATIONS),
        }
    }

    /// Append the fingerprint of the next rotation.
    ///
    /// # Errors
    ///
    /// - [`HashError::Overflow`] if four fingerprints are already present
    /// - [`HashError::SizeMismatch`] if the size differs from earlier entries
    /// - [`HashError::Format`] if the size exceeds [`MAX_HASH_SIZE`]
    pub fn append(&mut self, fingerprint: BitFingerprint) -> Result<(), HashError> {
        if self.fingerprints.len() == ROTATIONS {
            return Err(HashError::Overflow);
        }
        if fingerprint.hash_size() > MAX_HASH_SIZE {
            return Err(HashError::Format(format!(
                "hash size {} exceeds the maximum of {MAX_HASH_SIZE}",
                fingerprint.hash_size()
            )));
        }
        if let Some(first) = self.fingerprints.first() {
            if first.hash_size() != fingerprint.hash_size() {
                return Err(HashError::SizeMismatch {
                    expected: first.hash_size(),
                    found: fingerprint.hash_size(),
                });
            }
        }
        self.fingerprints.push(fingerprint);
        Ok(())
    }

    /// Number of rotations appended so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fingerprints.len()
    }

    /// Whether nothing has been appended yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }

    /// Whether all four rotations are present.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.fingerprints.len() == ROTATIONS
    }

    /// Finalize into a [`CompositeHash`].
    ///
    /// # Errors
    ///
    /// Returns [`HashError::Incomplete`] if fewer than four fingerprints were
    /// appended.
    pub fn build(self) -> Result<CompositeHash, HashError> {
        let fingerprints: [BitFingerprint; ROTATIONS] = self
            .fingerprints
            .try_into()
            .map_err(|partial: Vec<BitFingerprint>| HashError::Incomplete(partial.len()))?;
        Ok(CompositeHash { fingerprints })
    }
}

fn parse_header_field(field: Option<&str>, name: &str) -> Result<u16, HashError> {
    let field =
        field.ok_or_else(|| HashError::Format(format!("hash text too short for the {name}")))?;
    let digits = field
        .strip_prefix("0x")
        .ok_or_else(|| HashError::Format(format!("{name} field {field:?} lacks the 0x prefix")))?;
    if digits.len() != HEADER_FIELD_LEN - 2 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(HashError::Format(format!(
            "{name} field {field:?} is not {} hex digits",
            HEADER_FIELD_LEN - 2
        )));
    }
    u16::from_str_radix(digits, 16)
        .map_err(|_| HashError::Format(format!("{name} field {field:?} is not hexadecimal")))
}

/// Recover the side length from a block width of `n² / 4` digits.
fn hash_size_for_width(width: usize) -> Result<usize, HashError> {
    let bits = width * 4;
    let side = (bits as f64).sqrt().round() as usize;
    if width == 0 || side * side != bits || side % 2 != 0 {
        return Err(HashError::Format(format!(
            "block width {width} does not describe a square hash"
        )));
    }
    Ok(side)
}
