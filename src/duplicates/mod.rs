//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Grouping hashed records by the configured match rule
//! - Running a whole directory scan (walk, parallel hash, group)

pub mod finder;
pub mod groups;

pub use finder::{
    DuplicateFinder, FinderConfig, FinderError, ImageFailure, ScanReport, ScanSummary,
    MAX_STALLED_HELPERS,
};
pub use groups::{group_records, DuplicateGroup, DuplicateGrouper, GroupingConfig, MatchMode};
