//! Command-line interface definitions for rotodupe.
//!
//! This module defines all CLI arguments, subcommands, and options using the clap derive API.
//! Global options control verbosity, colour, error format and the configuration file;
//! subcommands scan a directory, hash single files, compare two files or manage the
//! configuration.
//!
//! # Example
//!
//! ```bash
//! # Scan a directory and list duplicate groups
//! rotodupe scan ~/Pictures
//!
//! # Near-duplicates, rotation-insensitive, as JSON
//! rotodupe scan ~/Pictures --threshold 0.05 --match-mode rotated --output json
//!
//! # Gather each group in review/group_<i>/
//! rotodupe scan ~/Pictures --copy-to review
//!
//! # Print the composite hash of some files
//! rotodupe hash a.png b.jpg
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::Config;
use crate::duplicates::MatchMode;

/// Rotation-aware perceptual duplicate image finder.
///
/// rotodupe hashes every image in all four 90° orientations and groups images
/// whose hashes match exactly or within a similarity threshold.
#[derive(Debug, Parser)]
#[command(name = "rotodupe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Print errors as JSON objects on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Configuration file (defaults to config.toml in the platform config directory)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan a directory for duplicate images
    Scan(ScanArgs),
    /// Print the composite hash of image files
    Hash(HashArgs),
    /// Compare two images
    Compare(CompareArgs),
    /// Show or create the configuration file
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Hashing parameters shared by the subcommands.
#[derive(Debug, Clone, Default, Args)]
pub struct HashingArgs {
    /// Side of each fingerprint bit matrix (even, at least 2)
    #[arg(long, value_name = "N")]
    pub hash_size: Option<usize>,

    /// Oversampling factor applied before the DCT
    #[arg(long, value_name = "N")]
    pub highfreq_factor: Option<usize>,
}

impl HashingArgs {
    /// Override the hashing keys of `config`.
    pub fn apply(&self, config: &mut Config) {
        if let Some(hash_size) = self.hash_size {
            config.hash_size = hash_size;
        }
        if let Some(factor) = self.highfreq_factor {
            config.highfreq_factor = factor;
        }
    }
}

/// Arguments for the scan subcommand.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Directory path to scan for duplicates
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Write the output to a file instead of stdout
    #[arg(long, value_name = "FILE")]
    pub output_file: Option<PathBuf>,

    /// Copy each duplicate group into DIR/group_<i>/ for review
    #[arg(long, value_name = "DIR")]
    pub copy_to: Option<PathBuf>,

    /// Largest difference (0.0 to 1.0) still considered a duplicate; 0 means exact
    #[arg(short, long, value_name = "T", value_parser = parse_threshold)]
    pub threshold: Option<f64>,

    /// How rotated copies are paired
    #[arg(short, long, value_enum, value_name = "MODE")]
    pub match_mode: Option<MatchMode>,

    #[command(flatten)]
    pub hashing: HashingArgs,

    /// Only scan files with this extension (can be specified multiple times)
    #[arg(short, long = "extension", value_name = "EXT")]
    pub extensions: Vec<String>,

    /// Glob patterns to ignore (can be specified multiple times)
    ///
    /// These patterns are added to any .gitignore patterns found.
    #[arg(short, long = "ignore", value_name = "PATTERN")]
    pub ignore_patterns: Vec<String>,

    /// Number of hashing threads (default: one per CPU)
    #[arg(long, value_name = "N")]
    pub threads: Option<usize>,

    /// Give up on an image after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Follow symbolic links during scan
    ///
    /// Warning: May cause infinite loops if symlinks form cycles.
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Skip hidden files and directories (starting with .)
    #[arg(long)]
    pub skip_hidden: bool,
}

impl ScanArgs {
    /// Override `config` with the flags given on the command line.
    pub fn apply(&self, config: &mut Config) {
        self.hashing.apply(config);
        if let Some(threshold) = self.threshold {
            config.threshold = threshold;
        }
        if let Some(mode) = self.match_mode {
            config.match_mode = mode;
        }
        if !self.extensions.is_empty() {
            config.extensions = self.extensions.clone();
        }
        config
            .ignore_patterns
            .extend(self.ignore_patterns.iter().cloned());
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if let Some(timeout) = self.timeout {
            config.hash_timeout_secs = Some(timeout);
        }
        config.follow_symlinks |= self.follow_symlinks;
        config.skip_hidden |= self.skip_hidden;
    }
}

/// Arguments for the hash subcommand.
#[derive(Debug, Args)]
pub struct HashArgs {
    /// Image files to hash
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    #[command(flatten)]
    pub hashing: HashingArgs,
}

/// Arguments for the compare subcommand.
#[derive(Debug, Args)]
pub struct CompareArgs {
    /// First image
    #[arg(value_name = "FIRST")]
    pub first: PathBuf,

    /// Second image
    #[arg(value_name = "SECOND")]
    pub second: PathBuf,

    /// Largest difference (0.0 to 1.0) reported as similar
    #[arg(short, long, value_name = "T", value_parser = parse_threshold)]
    pub threshold: Option<f64>,

    #[command(flatten)]
    pub hashing: HashingArgs,
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration as TOML
    Show,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable listing
    Text,
    /// JSON for scripting
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Parse a similarity threshold in `[0, 1]`.
///
/// # Examples
///
/// ```
/// use rotodupe::cli::parse_threshold;
///
/// assert_eq!(parse_threshold("0").unwrap(), 0.0);
/// assert_eq!(parse_threshold("0.05").unwrap(), 0.05);
/// assert!(parse_threshold("1.5").is_err());
/// ```
///
/// # Errors
///
/// Returns an error if the string is not a number or lies outside `[0, 1]`.
pub fn parse_threshold(s: &str) -> Result<f64, String> {
    let s = s.trim();
    let value: f64 = s
        .parse()
        .map_err(|_| format!("Invalid threshold: '{s}'"))?;

    if !(0.0..=1.0).contains(&value) {
        return Err(format!("Threshold must be between 0 and 1, got {value}"));
    }
    Ok(value)
}
