//! Bit fingerprints and the four-rotation composite hash.
//!
//! # Overview
//!
//! A [`BitFingerprint`] is the thresholded low-frequency DCT block of one
//! orientation of an image. A [`CompositeHash`] bundles the four fingerprints
//! computed for the 0°, 90°, 180° and 270° orientations, in that order.
//!
//! Composite hashes are assembled through a [`CompositeHashBuilder`], so a
//! value of type [`CompositeHash`] always holds exactly four fingerprints and
//! can be compared safely.
//!
//! # Example
//!
//! ```
//! use rotodupe::hash::{BitFingerprint, CompositeHash};
//!
//! let fp = BitFingerprint::from_hex("a5b4a3425cd72ccd", 8).unwrap();
//! assert_eq!(fp.to_hex(), "a5b4a3425cd72ccd");
//!
//! let hash = CompositeHash::new([fp.clone(), fp.clone(), fp.clone(), fp]).unwrap();
//! let parsed: CompositeHash = hash.to_hex().parse().unwrap();
//! assert_eq!(hash, parsed);
//! assert_eq!(hash.difference(&parsed).unwrap(), 0.0);
//! ```

pub mod bits;
pub mod composite;

pub use bits::BitFingerprint;
pub use composite::{CompositeHash, CompositeHashBuilder, ROTATIONS};

/// Default side of the fingerprint bit matrix (8 ⇒ 64 bits per rotation).
pub const DEFAULT_HASH_SIZE: usize = 8;

/// Default oversampling factor applied before the DCT (8 × 4 ⇒ 32×32 sample).
pub const DEFAULT_HIGHFREQ_FACTOR: usize = 4;

/// Errors raised while building, parsing or comparing hashes.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum HashError {
    /// Malformed hash text or bit matrix.
    #[error("Invalid hash format: {0}")]
    Format(String),

    /// Two operands have a different `hash_size`.
    #[error("Hash size mismatch: expected {expected}, found {found}")]
    SizeMismatch {
        /// Size of the left-hand operand
        expected: usize,
        /// Size of the right-hand operand
        found: usize,
    },

    /// A composite hash already holds all four rotations.
    #[error("Composite hash already holds {ROTATIONS} fingerprints")]
    Overflow,

    /// A composite hash was finalized with fewer than four rotations.
    #[error("Composite hash is incomplete: {0} of {ROTATIONS} fingerprints")]
    Incomplete(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_error_display() {
        let err = HashError::Format("bad".to_string());
        assert_eq!(err.to_string(), "Invalid hash format: bad");

        let err = HashError::SizeMismatch {
            expected: 8,
            found: 16,
        };
        assert_eq!(err.to_string(), "Hash size mismatch: expected 8, found 16");

        assert_eq!(
            HashError::Overflow.to_string(),
            "Composite hash already holds 4 fingerprints"
        );
        assert_eq!(
            HashError::Incomplete(2).to_string(),
            "Composite hash is incomplete: 2 of 4 fingerprints"
        );
    }

    #[test]
    fn test_defaults() {
        assert_eq!(DEFAULT_HASH_SIZE, 8);
        assert_eq!(DEFAULT_HIGHFREQ_FACTOR, 4);
    }
}
