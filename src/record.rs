//! Hashed image records.
//!
//! An [`ImageRecord`] is the unit of comparison: image dimensions, the
//! composite perceptual hash, and a [`Provenance`] describing where the pixels
//! came from. Records are created once and never mutated; grouping only
//! borrows them.
//!
//! # Example
//!
//! ```no_run
//! use rotodupe::record::ImageRecord;
//! use rotodupe::scanner::{HasherConfig, PerceptualHasher};
//! use std::path::Path;
//!
//! let hasher = PerceptualHasher::new(HasherConfig::default()).unwrap();
//! let a = ImageRecord::from_path(Path::new("a.png"), &hasher).unwrap();
//! let b = ImageRecord::from_path(Path::new("b.png"), &hasher).unwrap();
//! println!("similar: {}", a.is_similar(&b, 0.05).unwrap());
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use image::DynamicImage;
use serde::Serialize;
use thiserror::Error;

use crate::hash::{CompositeHash, HashError};
use crate::scanner::{read_tags, ExifTags, PerceptualError, PerceptualHasher};

/// Difference below which two records are reported as similar by default.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.01;

/// Errors that can occur while turning an image into a record.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The path does not name an existing regular file.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// The file exists but could not be read.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path of the unreadable file
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The bytes are not a decodable image, or hashing failed.
    #[error(transparent)]
    Decode(PerceptualError),

    /// Hashing did not finish within the configured limit.
    #[error("Hashing {path} exceeded the {limit:?} limit")]
    TimedOut {
        /// Path of the slow image
        path: PathBuf,
        /// The configured per-image limit
        limit: Duration,
    },

    /// The batch was cancelled before this image was hashed.
    #[error("Hashing interrupted")]
    Interrupted,
}

impl From<PerceptualError> for RecordError {
    fn from(e: PerceptualError) -> Self {
        match e {
            PerceptualError::Io { path, source } => {
                if source.kind() == std::io::ErrorKind::NotFound {
                    Self::NotFound(path)
                } else {
                    Self::Io { path, source }
                }
            }
            other => Self::Decode(other),
        }
    }
}

/// Where a record's pixels came from.
#[derive(Debug, Clone, PartialEq)]
pub enum Provenance {
    /// An in-memory decoded image.
    Matrix,
    /// An encoded byte buffer.
    Buffer {
        /// EXIF tags read from the buffer
        tags: ExifTags,
    },
    /// A file on disk.
    File {
        /// EXIF tags read from the file
        tags: ExifTags,
        /// File size in bytes
        size: u64,
        /// Extension with its leading dot (`.png`), empty if none
        extension: String,
        /// File name without the extension
        filename: String,
        /// Path as given when the record was created
        path: PathBuf,
    },
}

/// A hashed image.
#[derive(Debug, Clone)]
pub struct ImageRecord {
    /// Width of the decoded image in pixels
    pub width: u32,
    /// Height of the decoded image in pixels
    pub height: u32,
    /// Channel count of the decoded image
    pub channels: u8,
    /// Rotation-aware perceptual hash
    pub hash: CompositeHash,
    /// Origin of the pixels
    pub provenance: Provenance,
}

impl ImageRecord {
    /// Hash an already decoded image.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Decode`] if hashing fails, for example on an
    /// image with zero width or height.
    pub fn from_matrix(image: &DynamicImage, hasher: &PerceptualHasher) -> Result<Self, RecordError> {
        Ok(Self {
            width: image.width(),
            height: image.height(),
            channels: image.color().channel_count(),
            hash: hasher.hash_image(image)?,
            provenance: Provenance::Matrix,
        })
    }

    /// Decode and hash an encoded image buffer, reading EXIF tags as well.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Decode`] if the bytes are not a decodable image.
    pub fn from_buffer(bytes: &[u8], hasher: &PerceptualHasher) -> Result<Self, RecordError> {
        let image = hasher.decode_bytes(bytes)?;
        let mut record = Self::from_matrix(&image, hasher)?;
        record.provenance = Provenance::Buffer {
            tags: read_tags(bytes),
        };
        Ok(record)
    }

    /// Read, decode and hash the image file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::NotFound`] unless `path` is an existing regular
    /// file, [`RecordError::Io`] if it cannot be read, and
    /// [`RecordError::Decode`] if it is not a decodable image.
    pub fn from_path(path: &Path, hasher: &PerceptualHasher) -> Result<Self, RecordError> {
        if !path.is_file() {
            return Err(RecordError::NotFound(path.to_path_buf()));
        }

        let bytes = std::fs::read(path).map_err(|source| RecordError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut record = Self::from_buffer(&bytes, hasher)?;

        let tags = match record.provenance {
            Provenance::Buffer { tags } => tags,
            _ => ExifTags::new(),
        };
        record.provenance = Provenance::File {
            tags,
            size: bytes.len() as u64,
            extension: path
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
                .unwrap_or_default(),
            filename: path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            path: path.to_path_buf(),
        };
        Ok(record)
    }

    /// Whether the hash difference to `other` is at most `threshold`.
    ///
    /// # Errors
    ///
    /// Returns [`HashError::SizeMismatch`] if the records were hashed with
    /// different hash sizes.
    pub fn is_similar(&self, other: &Self, threshold: f64) -> Result<bool, HashError> {
        Ok(self.hash.difference(&other.hash)? <= threshold)
    }

    /// Path of the source file, for file records.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match &self.provenance {
            Provenance::File { path, .. } => Some(path),
            _ => None,
        }
    }

    /// EXIF tags, for buffer and file records.
    #[must_use]
    pub fn tags(&self) -> Option<&ExifTags> {
        match &self.provenance {
            Provenance::Matrix => None,
            Provenance::Buffer { tags } | Provenance::File { tags, .. } => Some(tags),
        }
    }

    /// File size in bytes, for file records.
    #[must_use]
    pub fn size(&self) -> Option<u64> {
        match &self.provenance {
            Provenance::File { size, .. } => Some(*size),
            _ => None,
        }
    }

    /// Flat, serializable view of the record.
    #[must_use]
    pub fn to_projection(&self) -> Projection {
        let mut projection = Projection {
            width: self.width,
            height: self.height,
            channels: self.channels,
            hash: self.hash.to_hex(),
            exiftags: None,
            size: None,
            extension: None,
            filename: None,
            filepath: None,
        };

        match &self.provenance {
            Provenance::Matrix => {}
            Provenance::Buffer { tags } => {
                projection.exiftags = Some(tags.clone());
            }
            Provenance::File {
                tags,
                size,
                extension,
                filename,
                path,
            } => {
                projection.exiftags = Some(tags.clone());
                projection.size = Some(*size);
                projection.extension = Some(extension.clone());
                projection.filename = Some(filename.clone());
                projection.filepath = Some(path.to_string_lossy().into_owned());
            }
        }
        projection
    }
}

impl PartialEq for ImageRecord {
    /// Records are equal when their hashes are; provenance is ignored.
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

/// Serializable projection of an [`ImageRecord`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Projection {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Channel count
    pub channels: u8,
    /// Composite hash as hex text
    pub hash: String,
    /// EXIF tags
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exiftags: Option<ExifTags>,
    /// File size in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Extension with leading dot
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    /// File name without extension
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Source path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filepath: Option<String>,
}
