//! Scan pipeline: walk, hash in parallel, group.
//!
//! # Pipeline
//!
//! 1. **Walk** - collect candidate images under the root, in sorted order
//! 2. **Hash** - decode and hash every image on a dedicated rayon pool
//! 3. **Group** - feed the records, in walk order, to a [`DuplicateGrouper`]
//!
//! Hashing results are collected in walk order before grouping, so the groups
//! do not depend on thread scheduling. Images that fail to hash are recorded in
//! [`ScanSummary::failures`] and skipped; they never abort the scan.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

use bytesize::ByteSize;
use rayon::prelude::*;

use super::groups::{DuplicateGroup, DuplicateGrouper, GroupingConfig};
use crate::progress::{ProgressCallback, PHASE_HASHING, PHASE_WALKING};
use crate::record::{ImageRecord, RecordError};
use crate::scanner::{FileEntry, HasherConfig, PerceptualError, PerceptualHasher, Walker, WalkerConfig};

/// Timed-out hashing helpers allowed to outlive their wait.
pub const MAX_STALLED_HELPERS: usize = 8;

/// Configuration for the duplicate finder.
#[derive(Clone, Default)]
pub struct FinderConfig {
    /// Hashing pipeline parameters.
    pub hasher: HasherConfig,
    /// Match rule for grouping.
    pub grouping: GroupingConfig,
    /// Walker configuration for directory traversal.
    pub walker_config: WalkerConfig,
    /// Hashing threads; 0 uses one per CPU.
    pub threads: usize,
    /// Optional per-image hashing time limit.
    ///
    /// Each image is hashed on a helper thread; a helper that overruns keeps
    /// running detached until its image is done. At most
    /// [`MAX_STALLED_HELPERS`] helpers beyond the pool size are alive at once;
    /// past that, images are hashed on the pool thread without a limit.
    pub hash_timeout: Option<Duration>,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback for reporting.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinderConfig")
            .field("hasher", &self.hasher)
            .field("grouping", &self.grouping)
            .field("walker_config", &self.walker_config)
            .field("threads", &self.threads)
            .field("hash_timeout", &self.hash_timeout)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl FinderConfig {
    /// Set the hashing parameters.
    #[must_use]
    pub fn with_hasher(mut self, hasher: HasherConfig) -> Self {
        self.hasher = hasher;
        self
    }

    /// Set the grouping parameters.
    #[must_use]
    pub fn with_grouping(mut self, grouping: GroupingConfig) -> Self {
        self.grouping = grouping;
        self
    }

    /// Set the walker configuration.
    #[must_use]
    pub fn with_walker_config(mut self, config: WalkerConfig) -> Self {
        self.walker_config = config;
        self
    }

    /// Set the number of hashing threads (0 = one per CPU).
    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Limit the time spent hashing a single image.
    #[must_use]
    pub fn with_hash_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.hash_timeout = timeout.filter(|t| !t.is_zero());
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// An image that could not be hashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFailure {
    /// Path of the image
    pub path: PathBuf,
    /// Human-readable reason
    pub message: String,
}

/// Summary statistics from a scan.
#[derive(Debug, Clone, Default)]
pub struct ScanSummary {
    /// Candidate images found by the walker
    pub total_images: usize,
    /// Images hashed successfully
    pub hashed_images: usize,
    /// Total size of the hashed images in bytes
    pub total_size: u64,
    /// Number of duplicate groups
    pub duplicate_groups: usize,
    /// Images in duplicate groups, excluding the first of each group
    pub duplicate_images: usize,
    /// Record comparisons performed while grouping
    pub comparisons: u64,
    /// Duration of the entire scan
    pub scan_duration: Duration,
    /// Whether the scan was interrupted
    pub interrupted: bool,
    /// Images or directories that could not be processed
    pub failures: Vec<ImageFailure>,
}

impl ScanSummary {
    /// Whether some inputs could not be processed.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Format total size as human-readable string.
    #[must_use]
    pub fn total_size_display(&self) -> String {
        ByteSize(self.total_size).to_string()
    }
}

/// Result of a scan: the hashed records and how they group.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// Successfully hashed records, in walk order
    pub records: Vec<ImageRecord>,
    /// Member indices into `records`, one list per duplicate group
    group_indices: Vec<Vec<usize>>,
    /// Statistics
    pub summary: ScanSummary,
}

impl ScanReport {
    /// Duplicate groups, borrowing from [`records`](Self::records).
    #[must_use]
    pub fn groups(&self) -> Vec<DuplicateGroup<'_>> {
        self.group_indices
            .iter()
            .map(|members| DuplicateGroup::new(members.iter().map(|&i| &self.records[i]).collect()))
            .collect()
    }

    /// Member indices of each duplicate group.
    #[must_use]
    pub fn group_indices(&self) -> &[Vec<usize>] {
        &self.group_indices
    }

    /// Whether at least one duplicate group was found.
    #[must_use]
    pub fn has_duplicates(&self) -> bool {
        !self.group_indices.is_empty()
    }
}

/// Errors that abort a scan.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// The provided path does not exist.
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// The provided path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The hasher parameters are unusable.
    #[error(transparent)]
    InvalidConfig(#[from] PerceptualError),

    /// The hashing thread pool could not be created.
    #[error("Failed to create thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Duplicate finder that orchestrates the scan pipeline.
///
/// # Example
///
/// ```no_run
/// use rotodupe::duplicates::{DuplicateFinder, FinderConfig};
/// use std::path::Path;
///
/// let finder = DuplicateFinder::new(FinderConfig::default().with_threads(4)).unwrap();
/// let report = finder.find_duplicates(Path::new("/some/photos")).unwrap();
///
/// println!("Found {} duplicate groups", report.summary.duplicate_groups);
/// for group in report.groups() {
///     println!("{:?}", group.paths());
/// }
/// ```
#[derive(Debug)]
pub struct DuplicateFinder {
    config: FinderConfig,
    hasher: Arc<PerceptualHasher>,
    live_helpers: Arc<AtomicUsize>,
}

/// Releases a live helper slot when a timed hashing thread ends.
struct HelperSlot(Arc<AtomicUsize>);

impl Drop for HelperSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl DuplicateFinder {
    /// Create a new duplicate finder with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::InvalidConfig`] for unusable hasher parameters.
    pub fn new(config: FinderConfig) -> Result<Self, FinderError> {
        let hasher = PerceptualHasher::new(config.hasher)?;
        Ok(Self {
            config,
            hasher: Arc::new(hasher),
            live_helpers: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Create a new duplicate finder with default configuration.
    ///
    /// # Errors
    ///
    /// Never fails with the default parameters; kept fallible for symmetry
    /// with [`new`](Self::new).
    pub fn with_defaults() -> Result<Self, FinderError> {
        Self::new(FinderConfig::default())
    }

    /// The shared hasher.
    #[must_use]
    pub fn hasher(&self) -> &PerceptualHasher {
        &self.hasher
    }

    /// Find all duplicate images under `path`.
    ///
    /// # Errors
    ///
    /// Returns `FinderError` if the path does not exist, is not a directory,
    /// or the thread pool cannot be built. Per-image failures and
    /// interruption are reported through the summary instead.
    pub fn find_duplicates(&self, path: &Path) -> Result<ScanReport, FinderError> {
        let start_time = Instant::now();

        if !path.exists() {
            return Err(FinderError::PathNotFound(path.to_path_buf()));
        }
        if !path.is_dir() {
            return Err(FinderError::NotADirectory(path.to_path_buf()));
        }

        log::info!("Starting duplicate scan of {}", path.display());

        let (files, walk_failures) = self.walk(path);

        let mut report = if self.config.is_shutdown_requested() {
            log::info!("Scan interrupted while walking");
            let mut report = ScanReport::default();
            report.summary.total_images = files.len();
            report.summary.interrupted = true;
            report
        } else {
            self.find_duplicates_from_files(files)?
        };

        let mut failures = walk_failures;
        failures.append(&mut report.summary.failures);
        report.summary.failures = failures;
        report.summary.scan_duration = start_time.elapsed();

        log::info!(
            "Scan complete: {} duplicate groups, {} duplicate images, {} failures",
            report.summary.duplicate_groups,
            report.summary.duplicate_images,
            report.summary.failures.len()
        );

        Ok(report)
    }

    /// Hash and group a pre-collected list of files.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::ThreadPool`] if the hashing pool cannot be built.
    pub fn find_duplicates_from_files(
        &self,
        files: Vec<FileEntry>,
    ) -> Result<ScanReport, FinderError> {
        let start_time = Instant::now();
        let mut summary = ScanSummary {
            total_images: files.len(),
            ..Default::default()
        };

        let results = self.hash_all(&files)?;

        let mut records = Vec::with_capacity(results.len());
        for (file, result) in files.into_iter().zip(results) {
            match result {
                Ok(record) => records.push(record),
                Err(RecordError::Interrupted) => summary.interrupted = true,
                Err(e) => {
                    log::warn!("Failed to hash {}: {}", file.path.display(), e);
                    summary.failures.push(ImageFailure {
                        path: file.path,
                        message: e.to_string(),
                    });
                }
            }
        }
        if summary.interrupted {
            log::info!(
                "Hashing interrupted after {} of {} images",
                records.len() + summary.failures.len(),
                summary.total_images
            );
        }

        let mut grouper = DuplicateGrouper::new(self.config.grouping);
        for record in &records {
            grouper.push(record);
        }
        summary.comparisons = grouper.candidates_compared();
        let groups = grouper.finish();

        summary.hashed_images = records.len();
        summary.total_size = records.iter().filter_map(ImageRecord::size).sum();
        summary.duplicate_groups = groups.len();
        summary.duplicate_images = groups.iter().map(DuplicateGroup::duplicate_count).sum();

        let position: HashMap<*const ImageRecord, usize> = records
            .iter()
            .enumerate()
            .map(|(i, r)| (r as *const ImageRecord, i))
            .collect();
        let group_indices: Vec<Vec<usize>> = groups
            .iter()
            .map(|group| {
                group
                    .iter()
                    .filter_map(|r| position.get(&(r as *const ImageRecord)).copied())
                    .collect()
            })
            .collect();
        drop(groups);

        summary.scan_duration = start_time.elapsed();

        Ok(ScanReport {
            records,
            group_indices,
            summary,
        })
    }

    fn walk(&self, path: &Path) -> (Vec<FileEntry>, Vec<ImageFailure>) {
        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_start(PHASE_WALKING, 0);
            callback.on_message(&format!("Walking {}", path.display()));
        }

        let mut walker = Walker::new(path, self.config.walker_config.clone());
        if let Some(ref flag) = self.config.shutdown_flag {
            walker = walker.with_shutdown_flag(flag.clone());
        }

        let mut files = Vec::new();
        let mut failures = Vec::new();
        for result in walker.walk() {
            match result {
                Ok(file) => {
                    files.push(file);
                    if let Some(ref callback) = self.config.progress_callback {
                        if let Some(last) = files.last() {
                            callback.on_progress(files.len(), &last.path.to_string_lossy());
                        }
                    }
                }
                Err(e) => failures.push(ImageFailure {
                    path: e.path().to_path_buf(),
                    message: e.to_string(),
                }),
            }
        }

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_end(PHASE_WALKING);
        }

        log::info!("Found {} candidate images", files.len());
        (files, failures)
    }

    /// Hash every file on the pool, returning results in input order.
    fn hash_all(
        &self,
        files: &[FileEntry],
    ) -> Result<Vec<Result<ImageRecord, RecordError>>, FinderError> {
        if files.is_empty() {
            return Ok(Vec::new());
        }

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_start(PHASE_HASHING, files.len());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.threads)
            .thread_name(|i| format!("rotodupe-hash-{i}"))
            .build()?;
        log::debug!(
            "Hashing {} images ({}) on {} threads",
            files.len(),
            ByteSize(files.iter().map(|f| f.size).sum()),
            pool.current_num_threads()
        );

        let helper_limit = pool.current_num_threads() + MAX_STALLED_HELPERS;
        let completed = AtomicUsize::new(0);
        let results = pool.install(|| {
            files
                .par_iter()
                .map(|file| {
                    let result = self.hash_file(&file.path, helper_limit);
                    if let Some(ref callback) = self.config.progress_callback {
                        let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                        callback.on_progress(done, &file.path.to_string_lossy());
                    }
                    result
                })
                .collect::<Vec<_>>()
        });

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_end(PHASE_HASHING);
        }

        Ok(results)
    }

    fn hash_file(&self, path: &Path, helper_limit: usize) -> Result<ImageRecord, RecordError> {
        if self.config.is_shutdown_requested() {
            return Err(RecordError::Interrupted);
        }

        let Some(limit) = self.config.hash_timeout else {
            return self.hash_untimed(path);
        };

        if self.live_helpers.fetch_add(1, Ordering::AcqRel) >= helper_limit {
            self.live_helpers.fetch_sub(1, Ordering::AcqRel);
            log::warn!(
                "Too many stalled hashing threads; hashing {} without a time limit",
                path.display()
            );
            return self.hash_untimed(path);
        }
        let slot = HelperSlot(Arc::clone(&self.live_helpers));

        let (tx, rx) = mpsc::channel();
        let hasher = Arc::clone(&self.hasher);
        let owned = path.to_path_buf();
        std::thread::Builder::new()
            .name("rotodupe-hash-timed".to_string())
            .spawn(move || {
                let _slot = slot;
                // The receiver is gone once the wait timed out
                let _ = tx.send(ImageRecord::from_path(&owned, &hasher));
            })
            .map_err(|source| RecordError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        match rx.recv_timeout(limit) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => Err(RecordError::TimedOut {
                path: path.to_path_buf(),
                limit,
            }),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(RecordError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::other("hashing thread exited without a result"),
            }),
        }
    }

    fn hash_untimed(&self, path: &Path) -> Result<ImageRecord, RecordError> {
        let record = ImageRecord::from_path(path, &self.hasher)?;
        log::trace!("Hashed {}", path.display());
        Ok(record)
    }
}
