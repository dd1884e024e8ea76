//! File actions on duplicate groups.
//!
//! Only non-destructive actions are provided: [`copy::copy_groups`] gathers
//! each group into its own directory for review.

pub mod copy;

pub use copy::{copy_groups, CopyError, CopySummary};
