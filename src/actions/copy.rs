//! Copy duplicate groups into a review directory.
//!
//! Group `i` (0-based) is copied into `<dest>/group_<i>/`. Two members with
//! the same file name get distinct copies: the later one receives a random
//! `_xxxxxxxx` suffix before its extension. Members that were not read from a
//! file are skipped.
//!
//! ```no_run
//! use rotodupe::actions::copy::copy_groups;
//! use rotodupe::duplicates::DuplicateFinder;
//! use std::path::Path;
//!
//! let report = DuplicateFinder::with_defaults()
//!     .unwrap()
//!     .find_duplicates(Path::new("photos"))
//!     .unwrap();
//! let summary = copy_groups(&report.groups(), Path::new("review")).unwrap();
//! println!("copied {} files", summary.copied);
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::duplicates::DuplicateGroup;

/// Errors raised while copying.
#[derive(thiserror::Error, Debug)]
pub enum CopyError {
    /// A directory could not be created or a file could not be copied.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// The path being created or copied to
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Outcome of [`copy_groups`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopySummary {
    /// Files copied
    pub copied: usize,
    /// Members without a source file
    pub skipped: usize,
    /// Bytes copied
    pub bytes: u64,
    /// Destination paths, in group order
    pub destinations: Vec<PathBuf>,
}

/// Directory that receives group `index`.
#[must_use]
pub fn group_dir(dest: &Path, index: usize) -> PathBuf {
    dest.join(format!("group_{index}"))
}

/// Copy every file-backed member of `groups` under `dest`.
///
/// # Errors
///
/// Returns [`CopyError::Io`] on the first directory or copy failure; files
/// copied before it stay in place.
pub fn copy_groups(groups: &[DuplicateGroup<'_>], dest: &Path) -> Result<CopySummary, CopyError> {
    let mut summary = CopySummary::default();

    for (index, group) in groups.iter().enumerate() {
        let dir = group_dir(dest, index);
        fs::create_dir_all(&dir).map_err(|source| CopyError::Io {
            path: dir.clone(),
            source,
        })?;

        for record in group.iter() {
            let Some(source_path) = record.path() else {
                log::debug!("Skipping group {index} member without a source file");
                summary.skipped += 1;
                continue;
            };

            let target = unique_target(&dir, source_path);
            let bytes = fs::copy(source_path, &target).map_err(|source| CopyError::Io {
                path: target.clone(),
                source,
            })?;
            log::trace!("Copied {} -> {}", source_path.display(), target.display());

            summary.copied += 1;
            summary.bytes += bytes;
            summary.destinations.push(target);
        }
    }

    log::info!(
        "Copied {} files from {} groups into {}",
        summary.copied,
        groups.len(),
        dest.display()
    );
    Ok(summary)
}

/// `dir/<file name>`, or `dir/<stem>_<8 hex><ext>` when that is taken.
fn unique_target(dir: &Path, source: &Path) -> PathBuf {
    let file_name = source
        .file_name()
        .map_or_else(|| "image".into(), |n| n.to_string_lossy().into_owned());
    let candidate = dir.join(&file_name);
    if !candidate.exists() {
        return candidate;
    }

    let stem = source
        .file_stem()
        .map_or_else(|| "image".into(), |s| s.to_string_lossy().into_owned());
    let extension = source
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    loop {
        let token = Uuid::new_v4().simple().to_string();
        let candidate = dir.join(format!("{stem}_{}{extension}", &token[..8]));
        if !candidate.exists() {
            return candidate;
        }
    }
}
