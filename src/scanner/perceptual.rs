//! Rotation-aware perceptual hashing.
//!
//! This module provides the [`PerceptualHasher`], which turns a decoded image
//! into a [`CompositeHash`]:
//!
//! 1. Resize to a `hash_size × highfreq_factor` square (32×32 by default)
//! 2. Convert to 8-bit luminance
//! 3. Four times: take the low-frequency DCT block, threshold it against its
//!    median, append the bits, and rotate the sample 90° clockwise
//!
//! Thresholding against the block median makes every bit insensitive to
//! brightness and contrast scaling, and keeping only the lowest frequencies
//! discards fine detail and noise.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, ImageReader, Limits};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::dct::Dct2d;
use crate::hash::composite::MAX_HASH_SIZE;
use crate::hash::{
    BitFingerprint, CompositeHash, HashError, DEFAULT_HASH_SIZE, DEFAULT_HIGHFREQ_FACTOR, ROTATIONS,
};

/// Default cap on decoded image width and height, in pixels.
pub const DEFAULT_MAX_DIMENSION: u32 = 16_384;

/// Largest supported resampled side (`hash_size × highfreq_factor`).
const MAX_SAMPLE_SIZE: usize = 4_096;

/// Parameters of the hashing pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HasherConfig {
    /// Side of each fingerprint bit matrix. Must be even.
    pub hash_size: usize,
    /// Oversampling factor applied before the DCT.
    pub highfreq_factor: usize,
    /// Images wider or taller than this fail to decode.
    pub max_dimension: u32,
}

impl Default for HasherConfig {
    fn default() -> Self {
        Self {
            hash_size: DEFAULT_HASH_SIZE,
            highfreq_factor: DEFAULT_HIGHFREQ_FACTOR,
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }
}

impl HasherConfig {
    /// Create a configuration with the given hash parameters.
    #[must_use]
    pub fn new(hash_size: usize, highfreq_factor: usize) -> Self {
        Self {
            hash_size,
            highfreq_factor,
            ..Self::default()
        }
    }

    /// Set the decode size cap.
    #[must_use]
    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension;
        self
    }

    /// Side of the square luminance sample fed to the DCT.
    #[must_use]
    pub fn sample_size(&self) -> usize {
        self.hash_size.saturating_mul(self.highfreq_factor)
    }

    /// Check the parameters.
    ///
    /// # Errors
    ///
    /// Returns [`PerceptualError::InvalidConfig`] if `hash_size` is odd, zero
    /// or above the serializable maximum, if `highfreq_factor` is zero, if the
    /// sample would be unreasonably large, or if `max_dimension` is zero.
    pub fn validate(&self) -> Result<(), PerceptualError> {
        if self.hash_size < 2 || self.hash_size % 2 != 0 {
            return Err(PerceptualError::InvalidConfig(format!(
                "hash_size must be an even number of at least 2, got {}",
                self.hash_size
            )));
        }
        if self.hash_size > MAX_HASH_SIZE {
            return Err(PerceptualError::InvalidConfig(format!(
                "hash_size must not exceed {MAX_HASH_SIZE}, got {}",
                self.hash_size
            )));
        }
        if self.highfreq_factor == 0 {
            return Err(PerceptualError::InvalidConfig(
                "highfreq_factor must be at least 1".to_string(),
            ));
        }
        if self.sample_size() > MAX_SAMPLE_SIZE {
            return Err(PerceptualError::InvalidConfig(format!(
                "hash_size × highfreq_factor must not exceed {MAX_SAMPLE_SIZE}, got {}",
                self.sample_size()
            )));
        }
        if self.max_dimension == 0 {
            return Err(PerceptualError::InvalidConfig(
                "max_dimension must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Errors that can occur during perceptual hashing.
#[derive(Debug, Error)]
pub enum PerceptualError {
    /// The hasher parameters are unusable.
    #[error("Invalid hasher configuration: {0}")]
    InvalidConfig(String),

    /// The bytes could not be decoded as an image.
    #[error("Failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    /// The image has no pixels.
    #[error("Cannot hash an empty {width}x{height} image")]
    EmptyImage {
        /// Width of the image
        width: u32,
        /// Height of the image
        height: u32,
    },

    /// The image file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// Path of the unreadable file
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Assembling the composite hash failed.
    #[error(transparent)]
    Hash(#[from] HashError),
}

/// Computes composite perceptual hashes for images.
///
/// Holds the precomputed DCT table, so one hasher should be shared across
/// all images of a batch (it is `Send + Sync`).
#[derive(Debug, Clone)]
pub struct PerceptualHasher {
    config: HasherConfig,
    dct: Dct2d,
}

impl PerceptualHasher {
    /// Create a hasher after validating `config`.
    ///
    /// # Errors
    ///
    /// Returns [`PerceptualError::InvalidConfig`] for unusable parameters.
    pub fn new(config: HasherConfig) -> Result<Self, PerceptualError> {
        config.validate()?;
        Ok(Self {
            dct: Dct2d::new(config.sample_size(), config.hash_size),
            config,
        })
    }

    /// The parameters of this hasher.
    #[must_use]
    pub fn config(&self) -> &HasherConfig {
        &self.config
    }

    /// Hash an already decoded image.
    ///
    /// # Errors
    ///
    /// Returns [`PerceptualError::EmptyImage`] when either dimension is zero.
    pub fn hash_image(&self, image: &DynamicImage) -> Result<CompositeHash, PerceptualError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(PerceptualError::EmptyImage {
                width: image.width(),
                height: image.height(),
            });
        }
        let side = self.config.sample_size() as u32;
        let sample = image.resize_exact(side, side, FilterType::Triangle).to_luma8();
        self.hash_sample(sample)
    }

    /// Hash a luminance sample that already has the configured side.
    fn hash_sample(&self, mut sample: GrayImage) -> Result<CompositeHash, PerceptualError> {
        let mut builder = CompositeHash::builder();

        for _ in 0..ROTATIONS {
            let values: Vec<f64> = sample.as_raw().iter().map(|&p| f64::from(p)).collect();
            let block = self.dct.low_frequency(&values);
            let median = median(&block);
            let fingerprint = BitFingerprint::from_bit_iter(
                self.config.hash_size,
                block.iter().map(|&coefficient| coefficient > median),
            )?;
            builder.append(fingerprint)?;
            sample = imageops::rotate90(&sample);
        }

        Ok(builder.build()?)
    }

    /// Decode raw bytes, guessing the format from the content.
    ///
    /// Width and height are capped by `max_dimension`.
    ///
    /// # Errors
    ///
    /// Returns [`PerceptualError::Decode`] for unknown formats, corrupt data
    /// or images exceeding the size cap.
    pub fn decode_bytes(&self, bytes: &[u8]) -> Result<DynamicImage, PerceptualError> {
        let mut reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| PerceptualError::Decode(image::ImageError::IoError(e)))?;

        let mut limits = Limits::default();
        limits.max_image_width = Some(self.config.max_dimension);
        limits.max_image_height = Some(self.config.max_dimension);
        reader.limits(limits);

        reader.decode().map_err(PerceptualError::Decode)
    }

    /// Read, decode and hash the image at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`PerceptualError::Io`] if the file cannot be read, or
    /// [`PerceptualError::Decode`] if it is not a decodable image.
    pub fn compute_hash<P: AsRef<Path>>(&self, path: P) -> Result<CompositeHash, PerceptualError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| PerceptualError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let image = self.decode_bytes(&bytes)?;
        self.hash_image(&image)
    }
}

/// Median of a non-empty slice; mean of the two middle values for even counts.
fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.is_empty() {
        0.0
    } else if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
