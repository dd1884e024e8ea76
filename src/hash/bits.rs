//! Fixed-size square bit matrix with hex serialization and Hamming distance.
//!
//! Bits are stored row-major, packed most-significant-bit first into `u64`
//! words. The hex form walks the same order, four bits per digit, so a
//! fingerprint of side `n` always renders to exactly `n² / 4` digits.

use std::fmt;

use super::HashError;

/// Multiplier used by [`BitFingerprint::fingerprint`] (FxHash constant).
const DIGEST_MULTIPLIER: u64 = 0x517c_c1b7_2722_0a95;

const WORD_BITS: usize = u64::BITS as usize;

/// Thresholded low-frequency block of one image orientation.
///
/// Immutable once constructed: the side length and the row-major bit order
/// are fixed by the constructor.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BitFingerprint {
    hash_size: usize,
    words: Vec<u64>,
}

impl BitFingerprint {
    /// Wrap a square matrix of thresholded bits.
    ///
    /// # Errors
    ///
    /// Returns [`HashError::Format`] if the matrix is empty, not square, or
    /// its bit count is not a multiple of 4.
    pub fn from_bits(matrix: &[Vec<bool>]) -> Result<Self, HashError> {
        let hash_size = matrix.len();
        if let Some(row) = matrix.iter().find(|row| row.len() != hash_size) {
            return Err(HashError::Format(format!(
                "bit matrix is not square: {} rows but a row of {} bits",
                hash_size,
                row.len()
            )));
        }
        Self::from_bit_iter(hash_size, matrix.iter().flatten().copied())
    }

    /// Build a fingerprint from `hash_size²` bits given in row-major order.
    ///
    /// # Errors
    ///
    /// Returns [`HashError::Format`] if `hash_size` is invalid or the iterator
    /// does not yield exactly `hash_size²` bits.
    pub fn from_bit_iter<I>(hash_size: usize, bits: I) -> Result<Self, HashError>
    where
        I: IntoIterator<Item = bool>,
    {
        let bit_len = validate_size(hash_size)?;
        let mut words = vec![0u64; bit_len.div_ceil(WORD_BITS)];
        let mut count = 0usize;

        for bit in bits {
            if count == bit_len {
                return Err(HashError::Format(format!(
                    "expected {bit_len} bits, found more"
                )));
            }
            if bit {
                words[count / WORD_BITS] |= mask(count);
            }
            count += 1;
        }

        if count != bit_len {
            return Err(HashError::Format(format!(
                "expected {bit_len} bits, found {count}"
            )));
        }

        Ok(Self { hash_size, words })
    }

    /// Parse a fingerprint from its fixed-width hex form.
    ///
    /// Both lower- and upper-case digits are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`HashError::Format`] if the text is not exactly
    /// `hash_size² / 4` hex digits long or contains a non-hex character.
    pub fn from_hex(s: &str, hash_size: usize) -> Result<Self, HashError> {
        let bit_len = validate_size(hash_size)?;
        let width = bit_len / 4;
        if s.len() != width {
            return Err(HashError::Format(format!(
                "expected {width} hex digits for hash size {hash_size}, found {}",
                s.len()
            )));
        }

        let mut words = vec![0u64; bit_len.div_ceil(WORD_BITS)];
        for (index, c) in s.chars().enumerate() {
            let nibble = c
                .to_digit(16)
                .ok_or_else(|| HashError::Format(format!("invalid hex character {c:?}")))?;
            let first_bit = index * 4;
            let shift = WORD_BITS - 4 - first_bit % WORD_BITS;
            words[first_bit / WORD_BITS] |= u64::from(nibble) << shift;
        }

        Ok(Self { hash_size, words })
    }

    /// Render the bits as `hash_size² / 4` lowercase hex digits.
    #[must_use]
    pub fn to_hex(&self) -> String {
        let width = self.bit_len() / 4;
        let mut out = String::with_capacity(width);
        for index in 0..width {
            let first_bit = index * 4;
            let shift = WORD_BITS - 4 - first_bit % WORD_BITS;
            let nibble = (self.words[first_bit / WORD_BITS] >> shift) & 0xf;
            // nibble < 16, always a valid digit
            out.push(char::from_digit(nibble as u32, 16).unwrap_or('0'));
        }
        out
    }

    /// Count the bit positions that differ from `other`.
    ///
    /// # Errors
    ///
    /// Returns [`HashError::SizeMismatch`] if the two fingerprints have a
    /// different side length.
    pub fn hamming_distance(&self, other: &Self) -> Result<u32, HashError> {
        if self.hash_size != other.hash_size {
            return Err(HashError::SizeMismatch {
                expected: self.hash_size,
                found: other.hash_size,
            });
        }
        Ok(self
            .words
            .iter()
            .zip(&other.words)
            .map(|(a, b)| (a ^ b).count_ones())
            .sum())
    }

    /// Cheap digest of the bit pattern, suitable as a bucket key.
    ///
    /// Bit-equal fingerprints always produce the same digest. Different
    /// fingerprints may collide, so callers must confirm with `==`.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        self.words.iter().fold(self.hash_size as u64, |acc, &word| {
            (acc.rotate_left(5) ^ word).wrapping_mul(DIGEST_MULTIPLIER)
        })
    }

    /// Side length of the bit matrix.
    #[must_use]
    pub fn hash_size(&self) -> usize {
        self.hash_size
    }

    /// Total number of bits (`hash_size²`).
    #[must_use]
    pub fn bit_len(&self) -> usize {
        self.hash_size * self.hash_size
    }

    /// Bit at `(row, col)`, or `None` when out of range.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Option<bool> {
        if row >= self.hash_size || col >= self.hash_size {
            return None;
        }
        let index = row * self.hash_size + col;
        Some(self.words[index / WORD_BITS] & mask(index) != 0)
    }

    /// Iterate over all bits in row-major order.
    pub fn bits(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.bit_len()).map(move |index| self.words[index / WORD_BITS] & mask(index) != 0)
    }

    /// Expand back into a square matrix of booleans.
    #[must_use]
    pub fn to_matrix(&self) -> Vec<Vec<bool>> {
        let bits: Vec<bool> = self.bits().collect();
        bits.chunks(self.hash_size).map(<[bool]>::to_vec).collect()
    }
}

impl fmt::Display for BitFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for BitFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BitFingerprint")
            .field("hash_size", &self.hash_size)
            .field("hex", &self.to_hex())
            .finish()
    }
}

/// Mask selecting bit `index` inside its word (MSB first).
fn mask(index: usize) -> u64 {
    1u64 << (WORD_BITS - 1 - index % WORD_BITS)
}

/// Check that `hash_size` yields a whole number of hex digits.
fn validate_size(hash_size: usize) -> Result<usize, HashError> {
    let bit_len = hash_size
        .checked_mul(hash_size)
        .ok_or_else(|| HashError::Format(format!("hash size {hash_size} is too large")))?;
    if bit_len == 0 || bit_len % 4 != 0 {
        return Err(HashError::Format(format!(
            "hash size {hash_size} must be even and non-zero"
        )));
    }
    Ok(bit_len)
}
