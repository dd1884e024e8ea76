//! Grouping of hashed image records into duplicate groups.
//!
//! # Overview
//!
//! [`DuplicateGrouper`] consumes records one at a time. Each record joins the
//! first group (in creation order) holding a member it matches, or opens a new
//! group of its own. Groups with a single member are dropped when the grouper
//! is finished.
//!
//! ## Match rule
//!
//! | threshold | [`MatchMode::Aligned`]      | [`MatchMode::Rotated`]              |
//! |-----------|-----------------------------|-------------------------------------|
//! | `0`       | hashes equal                | hashes equal up to a cyclic shift   |
//! | `> 0`     | `difference ≤ threshold`    | `rotated_difference ≤ threshold`    |
//!
//! Records hashed with different hash sizes never match.
//!
//! In exact mode the grouper keeps a digest index and only inspects groups
//! that share a digest with the incoming record. Candidate groups are still
//! visited in creation order, so the result is the same as scanning every
//! group.
//!
//! # Example
//!
//! ```
//! use rotodupe::duplicates::{group_records, GroupingConfig};
//! use rotodupe::record::ImageRecord;
//! use rotodupe::scanner::{HasherConfig, PerceptualHasher};
//! use image::{DynamicImage, GrayImage, Luma};
//!
//! let hasher = PerceptualHasher::new(HasherConfig::default()).unwrap();
//! let image = DynamicImage::ImageLuma8(GrayImage::from_fn(32, 32, |x, y| Luma([(x * y) as u8])));
//! let a = ImageRecord::from_matrix(&image, &hasher).unwrap();
//! let b = ImageRecord::from_matrix(&image, &hasher).unwrap();
//!
//! let groups = group_records([&a, &b], GroupingConfig::default());
//! assert_eq!(groups.len(), 1);
//! assert_eq!(groups[0].len(), 2);
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::hash::ROTATIONS;
use crate::record::ImageRecord;

/// How fingerprints of two composite hashes are paired up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Compare rotation `i` with rotation `i`.
    #[default]
    Aligned,
    /// Also accept the three cyclic shifts, so rotated copies match.
    Rotated,
}

impl std::fmt::Display for MatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Aligned => write!(f, "aligned"),
            Self::Rotated => write!(f, "rotated"),
        }
    }
}

/// Grouping parameters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GroupingConfig {
    /// Largest difference still counted as a match. `0.0` means exact.
    pub threshold: f64,
    /// Rotation pairing rule.
    pub match_mode: MatchMode,
}

impl GroupingConfig {
    /// Set the similarity threshold, clamped to `[0, 1]`.
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = if threshold.is_nan() {
            0.0
        } else {
            threshold.clamp(0.0, 1.0)
        };
        self
    }

    /// Set the rotation pairing rule.
    #[must_use]
    pub fn with_match_mode(mut self, match_mode: MatchMode) -> Self {
        self.match_mode = match_mode;
        self
    }

    /// Whether records only match on bit-equality.
    #[must_use]
    pub fn is_exact(&self) -> bool {
        self.threshold <= 0.0
    }

    /// Apply the match rule to two records.
    #[must_use]
    pub fn matches(&self, a: &ImageRecord, b: &ImageRecord) -> bool {
        match (self.is_exact(), self.match_mode) {
            (true, MatchMode::Aligned) => a.hash == b.hash,
            (true, MatchMode::Rotated) => a.hash.matches_rotated(&b.hash),
            (false, MatchMode::Aligned) => a
                .hash
                .difference(&b.hash)
                .is_ok_and(|d| d <= self.threshold),
            (false, MatchMode::Rotated) => a
                .hash
                .rotated_difference(&b.hash)
                .is_ok_and(|d| d <= self.threshold),
        }
    }
}

/// A group of matching records.
///
/// Members are borrowed from the caller and listed in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateGroup<'a> {
    records: Vec<&'a ImageRecord>,
}

impl<'a> DuplicateGroup<'a> {
    /// Create a group from its members.
    #[must_use]
    pub fn new(records: Vec<&'a ImageRecord>) -> Self {
        Self { records }
    }

    /// Members in insertion order.
    #[must_use]
    pub fn records(&self) -> &[&'a ImageRecord] {
        &self.records
    }

    /// Iterate over the members.
    pub fn iter(&self) -> impl Iterator<Item = &'a ImageRecord> + '_ {
        self.records.iter().copied()
    }

    /// Number of records in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Paths of the members that came from files.
    #[must_use]
    pub fn paths(&self) -> Vec<&'a Path> {
        self.records.iter().filter_map(|r| r.path()).collect()
    }

    /// Number of extra copies (total - 1 original).
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.records.len().saturating_sub(1)
    }
}

/// Incremental grouper over a sequence of records.
#[derive(Debug)]
pub struct DuplicateGrouper<'a> {
    config: GroupingConfig,
    groups: Vec<Vec<&'a ImageRecord>>,
    /// Digest → groups holding a member with that digest, ascending.
    index: HashMap<u64, Vec<usize>>,
    candidates_compared: u64,
}

impl<'a> DuplicateGrouper<'a> {
    /// Create an empty grouper.
    #[must_use]
    pub fn new(config: GroupingConfig) -> Self {
        Self {
            config,
            groups: Vec::new(),
            index: HashMap::new(),
            candidates_compared: 0,
        }
    }

    /// The grouping parameters.
    #[must_use]
    pub fn config(&self) -> &GroupingConfig {
        &self.config
    }

    /// Place `record` into the first matching group, or open a new one.
    pub fn push(&mut self, record: &'a ImageRecord) {
        let target = if self.config.is_exact() {
            let candidates = self.candidate_groups(record);
            self.first_match(record, candidates)
        } else {
            self.first_match(record, 0..self.groups.len())
        };

        let group = match target {
            Some(group) => {
                self.groups[group].push(record);
                group
            }
            None => {
                self.groups.push(vec![record]);
                self.groups.len() - 1
            }
        };

        if self.config.is_exact() {
            self.index_record(record, group);
        }
    }

    /// Finish grouping, keeping only groups with at least two members.
    #[must_use]
    pub fn finish(self) -> Vec<DuplicateGroup<'a>> {
        log::debug!(
            "Grouping finished: {} open groups, {} comparisons",
            self.groups.len(),
            self.candidates_compared
        );
        self.groups
            .into_iter()
            .filter(|members| members.len() >= 2)
            .map(DuplicateGroup::new)
            .collect()
    }

    /// Number of open groups, singletons included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Check if no record has been pushed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of record comparisons performed so far.
    #[must_use]
    pub fn candidates_compared(&self) -> u64 {
        self.candidates_compared
    }

    fn first_match(
        &mut self,
        record: &ImageRecord,
        candidates: impl IntoIterator<Item = usize>,
    ) -> Option<usize> {
        for group in candidates {
            for member in &self.groups[group] {
                self.candidates_compared += 1;
                if self.config.matches(member, record) {
                    return Some(group);
                }
            }
        }
        None
    }

    /// Groups sharing a digest with `record`, in creation order.
    fn candidate_groups(&self, record: &ImageRecord) -> Vec<usize> {
        let key = match self.config.match_mode {
            MatchMode::Aligned => record.hash.digest(),
            // A cyclic match pairs rotation 0 with one of the member's rotations
            MatchMode::Rotated => record.hash.fingerprints()[0].fingerprint(),
        };
        let mut groups = self.index.get(&key).cloned().unwrap_or_default();
        groups.sort_unstable();
        groups.dedup();
        groups
    }

    fn index_record(&mut self, record: &ImageRecord, group: usize) {
        let keys: Vec<u64> = match self.config.match_mode {
            MatchMode::Aligned => vec![record.hash.digest()],
            MatchMode::Rotated => (0..ROTATIONS)
                .map(|i| record.hash.fingerprints()[i].fingerprint())
                .collect(),
        };
        for key in keys {
            let groups = self.index.entry(key).or_default();
            if !groups.contains(&group) {
                groups.push(group);
            }
        }
    }
}

/// Group `records` in iteration order.
#[must_use]
pub fn group_records<'a, I>(records: I, config: GroupingConfig) -> Vec<DuplicateGroup<'a>>
where
    I: IntoIterator<Item = &'a ImageRecord>,
{
    let mut grouper = DuplicateGrouper::new(config);
    for record in records {
        grouper.push(record);
    }
    grouper.finish()
}
