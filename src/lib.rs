//! rotodupe - rotation-aware perceptual image hashing and duplicate grouping
//!
//! Every image is reduced to a [`hash::CompositeHash`]: one DCT bit
//! fingerprint per 90° orientation. Images are grouped when their hashes
//! match exactly or differ by at most a configurable fraction of bits.
//!
//! ```no_run
//! use rotodupe::duplicates::{DuplicateFinder, FinderConfig, GroupingConfig, MatchMode};
//! use std::path::Path;
//!
//! let config = FinderConfig::default().with_grouping(
//!     GroupingConfig::default()
//!         .with_threshold(0.05)
//!         .with_match_mode(MatchMode::Rotated),
//! );
//! let report = DuplicateFinder::new(config)
//!     .unwrap()
//!     .find_duplicates(Path::new("photos"))
//!     .unwrap();
//! for group in report.groups() {
//!     println!("{:?}", group.paths());
//! }
//! ```

pub mod actions;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod hash;
pub mod logging;
pub mod output;
pub mod progress;
pub mod record;
pub mod scanner;
pub mod signal;

use std::fs::File;
use std::io::{self, BufWriter, IsTerminal, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use crate::cli::{Cli, Commands, CompareArgs, ConfigCommand, HashArgs, OutputFormat, ScanArgs};
use crate::config::{Config, ConfigError};
use crate::duplicates::{DuplicateFinder, MatchMode};
use crate::error::ExitCode;
use crate::output::{JsonOutput, TextOutput};
use crate::progress::Progress;
use crate::record::{ImageRecord, Projection, DEFAULT_SIMILARITY_THRESHOLD};
use crate::scanner::PerceptualHasher;

/// Run the command described by `cli`.
///
/// # Errors
///
/// Returns an error for invalid configuration, an unreadable scan root or
/// output file, or a failed copy. Per-image failures are not errors; they
/// are reported and turn the exit code into [`ExitCode::PartialSuccess`].
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);
    if cli.no_color {
        yansi::disable();
    }

    if let Commands::Config(ConfigCommand::Init { force }) = &cli.command {
        return init_config(cli.config.as_deref(), *force);
    }

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    log::debug!("Effective configuration: {config:?}");

    match cli.command {
        Commands::Scan(args) => run_scan(&args, config, cli.quiet, !cli.no_color),
        Commands::Hash(args) => run_hash(&args, config),
        Commands::Compare(args) => run_compare(&args, config),
        Commands::Config(_) => {
            print!("{}", config.to_toml()?);
            Ok(ExitCode::Success)
        }
    }
}

fn run_scan(args: &ScanArgs, mut config: Config, quiet: bool, color: bool) -> Result<ExitCode> {
    args.apply(&mut config);
    config.validate()?;

    let handler = signal::install_handler().context("Failed to install Ctrl+C handler")?;
    let mut finder_config = config.finder_config().with_shutdown_flag(handler.flag());

    let json_to_stdout = args.output == OutputFormat::Json && args.output_file.is_none();
    if !quiet && !json_to_stdout {
        finder_config = finder_config.with_progress_callback(Arc::new(Progress::new(false)));
    }

    log::info!(
        "Scanning {} (threshold {}, {} mode)",
        args.path.display(),
        config.threshold,
        config.match_mode
    );
    let finder = DuplicateFinder::new(finder_config)?;
    let report = finder
        .find_duplicates(&args.path)
        .with_context(|| format!("Failed to scan {}", args.path.display()))?;
    let groups = report.groups();

    match &args.output_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            write_scan(args.output, &groups, &report.summary, BufWriter::new(file), false)?;
            log::info!("Results written to {}", path.display());
        }
        None => {
            let stdout = io::stdout();
            let color = color && stdout.is_terminal();
            write_scan(args.output, &groups, &report.summary, stdout.lock(), color)?;
        }
    }

    if let Some(dest) = &args.copy_to {
        let copied = actions::copy_groups(&groups, dest)
            .with_context(|| format!("Failed to copy duplicates to {}", dest.display()))?;
        if !quiet {
            eprintln!(
                "Copied {} files ({}) into {}",
                copied.copied,
                bytesize::ByteSize(copied.bytes),
                dest.display()
            );
        }
    }

    Ok(ExitCode::for_scan(
        report.summary.interrupted,
        report.summary.is_partial(),
        report.has_duplicates(),
    ))
}

fn write_scan<W: Write>(
    format: OutputFormat,
    groups: &[duplicates::DuplicateGroup<'_>],
    summary: &duplicates::ScanSummary,
    writer: W,
    color: bool,
) -> Result<()> {
    match format {
        OutputFormat::Json => JsonOutput::new(groups)
            .write_to(writer, true)
            .context("Failed to write JSON output"),
        OutputFormat::Text => TextOutput::new(groups, summary)
            .with_color(color)
            .write_to(writer)
            .context("Failed to write output"),
    }
}

fn run_hash(args: &HashArgs, mut config: Config) -> Result<ExitCode> {
    args.hashing.apply(&mut config);
    config.validate()?;
    let hasher = PerceptualHasher::new(config.hasher_config())?;

    let mut projections: Vec<Projection> = Vec::with_capacity(args.files.len());
    let mut failures = 0usize;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for path in &args.files {
        match ImageRecord::from_path(path, &hasher) {
            Ok(record) => match args.output {
                OutputFormat::Text => writeln!(out, "{}  {}", record.hash.to_hex(), path.display())?,
                OutputFormat::Json => projections.push(record.to_projection()),
            },
            Err(e) => {
                log::warn!("Failed to hash {}: {}", path.display(), e);
                failures += 1;
            }
        }
    }

    if args.output == OutputFormat::Json {
        serde_json::to_writer_pretty(&mut out, &projections)?;
        writeln!(out)?;
    }
    out.flush()?;

    if failures == args.files.len() {
        bail!("None of the {} files could be hashed", failures);
    }
    Ok(if failures > 0 {
        ExitCode::PartialSuccess
    } else {
        ExitCode::Success
    })
}

fn run_compare(args: &CompareArgs, mut config: Config) -> Result<ExitCode> {
    args.hashing.apply(&mut config);
    config.validate()?;
    let hasher = PerceptualHasher::new(config.hasher_config())?;

    let first = ImageRecord::from_path(&args.first, &hasher)
        .with_context(|| format!("Failed to hash {}", args.first.display()))?;
    let second = ImageRecord::from_path(&args.second, &hasher)
        .with_context(|| format!("Failed to hash {}", args.second.display()))?;

    let difference = first.hash.difference(&second.hash)?;
    let rotated = first.hash.rotated_difference(&second.hash)?;
    let threshold = args.threshold.unwrap_or(DEFAULT_SIMILARITY_THRESHOLD);
    let score = match config.match_mode {
        MatchMode::Aligned => difference,
        MatchMode::Rotated => rotated,
    };
    let similar = score <= threshold;

    println!("difference: {difference:.4}");
    match first.hash.rotation_offset(&second.hash) {
        Some(offset) => println!("rotated difference: {rotated:.4} (exact at {offset} quarter turns)"),
        None => println!("rotated difference: {rotated:.4}"),
    }
    println!(
        "{} ({} mode, threshold {threshold})",
        if similar { "similar" } else { "different" },
        config.match_mode
    );

    Ok(if similar {
        ExitCode::Success
    } else {
        ExitCode::NoDuplicates
    })
}

fn init_config(explicit: Option<&Path>, force: bool) -> Result<ExitCode> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => Config::default_path().ok_or(ConfigError::NoConfigDir)?,
    };
    if path.exists() && !force {
        bail!("{} already exists; use --force to overwrite", path.display());
    }
    Config::default().save(&path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(ExitCode::Success)
}
