//! Scanner module for image discovery and perceptual hashing.
//!
//! This module provides functionality for:
//! - Parallel directory walking using jwalk, filtered by image extension
//! - Image decoding with size limits
//! - Rotation-aware perceptual hashing
//! - Best-effort EXIF tag extraction
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and image file discovery
//! - [`perceptual`]: Decode + resize + DCT hashing pipeline
//! - [`dct`]: Truncated 2-D DCT-II used by the pipeline
//! - [`metadata`]: EXIF tag reading
//!
//! # Example
//!
//! ```no_run
//! use rotodupe::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let config = WalkerConfig {
//!     skip_hidden: true,
//!     ..Default::default()
//! };
//!
//! let walker = Walker::new(Path::new("."), config);
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(image) => println!("{}: {} bytes", image.path.display(), image.size),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

pub mod dct;
pub mod metadata;
pub mod perceptual;
pub mod walker;

use std::path::{Path, PathBuf};

pub use metadata::{read_tags, ExifTags};
pub use perceptual::{HasherConfig, PerceptualError, PerceptualHasher, DEFAULT_MAX_DIMENSION};
pub use walker::Walker;

/// Extensions scanned when none are configured.
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "bmp", "gif", "jpeg", "jpg", "png", "pbm", "pgm", "ppm", "pnm", "tif", "tiff", "webp",
];

/// A candidate image discovered by the walker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
}

impl FileEntry {
    /// Create a new FileEntry.
    #[must_use]
    pub fn new(path: PathBuf, size: u64) -> Self {
        Self { path, size }
    }
}

/// Configuration for directory walking.
///
/// Controls extension filtering, symlink handling and ignore patterns.
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    /// Follow symbolic links during traversal.
    /// Warning: May cause infinite loops with symlink cycles.
    pub follow_symlinks: bool,

    /// Skip hidden files and directories (names starting with `.`).
    pub skip_hidden: bool,

    /// Glob patterns to ignore (gitignore-style).
    /// These are applied in addition to any .gitignore file in the root.
    pub ignore_patterns: Vec<String>,

    /// Allowed file extensions, lowercase and without a leading dot.
    /// An empty list accepts every file.
    pub extensions: Vec<String>,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            skip_hidden: false,
            ignore_patterns: Vec::new(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| (*e).to_string()).collect(),
        }
    }
}

impl WalkerConfig {
    /// Create a new configuration from CLI arguments.
    ///
    /// Extensions are normalized with [`normalize_extension`].
    #[must_use]
    pub fn new<S: AsRef<str>>(
        follow_symlinks: bool,
        skip_hidden: bool,
        ignore_patterns: Vec<String>,
        extensions: &[S],
    ) -> Self {
        Self {
            follow_symlinks,
            skip_hidden,
            ignore_patterns,
            extensions: extensions
                .iter()
                .map(|e| normalize_extension(e.as_ref()))
                .collect(),
        }
    }

    /// Whether `path` carries one of the allowed extensions.
    #[must_use]
    pub fn accepts_extension(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        path.extension()
            .and_then(|e| e.to_str())
            .map(normalize_extension)
            .is_some_and(|ext| self.extensions.iter().any(|allowed| *allowed == ext))
    }
}

/// Lowercase an extension and strip any leading dots.
///
/// ```
/// use rotodupe::scanner::normalize_extension;
///
/// assert_eq!(normalize_extension(".JPG"), "jpg");
/// assert_eq!(normalize_extension("png"), "png");
/// ```
#[must_use]
pub fn normalize_extension(extension: &str) -> String {
    extension.trim().trim_start_matches('.').to_lowercase()
}

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The specified path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl ScanError {
    /// The path this error refers to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::PermissionDenied(path) | Self::NotFound(path) | Self::NotADirectory(path) => {
                path
            }
            Self::Io { path, .. } => path,
        }
    }
}
