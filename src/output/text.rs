//! Human-readable listing of duplicate groups.
//!
//! ```text
//! Group 1: 2 images
//!   /photos/holiday.png   640x480  19.5 KiB
//!   /backup/holiday.bmp   640x480  900.1 KiB
//!
//! 12 images scanned, 12 hashed, 1 duplicate group (1 duplicate image)
//! Scanned 2.1 MiB in 180.42ms (66 comparisons)
//! ```

use std::fmt::Write as _;
use std::io::Write;

use bytesize::ByteSize;
use yansi::Paint;

use crate::duplicates::{DuplicateGroup, ScanSummary};
use crate::record::ImageRecord;

/// Label used for members that were not read from a file.
const IN_MEMORY_LABEL: &str = "<in-memory image>";

/// Text renderer for a scan.
#[derive(Debug)]
pub struct TextOutput<'a> {
    groups: &'a [DuplicateGroup<'a>],
    summary: &'a ScanSummary,
    color: bool,
}

impl<'a> TextOutput<'a> {
    /// Renderer without colours.
    #[must_use]
    pub fn new(groups: &'a [DuplicateGroup<'a>], summary: &'a ScanSummary) -> Self {
        Self {
            groups,
            summary,
            color: false,
        }
    }

    /// Enable or disable ANSI colours.
    #[must_use]
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Render the full listing.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();

        for (index, group) in self.groups.iter().enumerate() {
            let header = format!("Group {}: {} images", index + 1, group.len());
            let _ = writeln!(out, "{}", self.bold(&header));

            let labels: Vec<String> = group.iter().map(member_label).collect();
            let width = labels.iter().map(|l| l.chars().count()).max().unwrap_or(0);
            for (record, label) in group.iter().zip(&labels) {
                let _ = write!(out, "  {label:<width$}  {}x{}", record.width, record.height);
                if let Some(size) = record.size() {
                    let _ = write!(out, "  {}", ByteSize(size));
                }
                out.push('\n');
            }
            out.push('\n');
        }

        self.render_summary(&mut out);
        out
    }

    fn render_summary(&self, out: &mut String) {
        let summary = self.summary;

        if self.groups.is_empty() {
            let _ = writeln!(out, "{}", self.green("No duplicate images found."));
        }

        let _ = writeln!(
            out,
            "{} images scanned, {} hashed, {} duplicate group{} ({} duplicate image{})",
            summary.total_images,
            summary.hashed_images,
            summary.duplicate_groups,
            plural(summary.duplicate_groups),
            summary.duplicate_images,
            plural(summary.duplicate_images),
        );
        let _ = writeln!(
            out,
            "Scanned {} in {:.2?} ({} comparisons)",
            summary.total_size_display(),
            summary.scan_duration,
            summary.comparisons
        );

        if !summary.failures.is_empty() {
            let _ = writeln!(
                out,
                "{}",
                self.yellow(&format!(
                    "{} image{} could not be processed:",
                    summary.failures.len(),
                    plural(summary.failures.len())
                ))
            );
            for failure in &summary.failures {
                let _ = writeln!(out, "  {}: {}", failure.path.display(), failure.message);
            }
        }

        if summary.interrupted {
            let _ = writeln!(
                out,
                "{}",
                self.yellow("Scan interrupted; results are partial.")
            );
        }
    }

    /// Write the listing to `writer`.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn write_to<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        writer.write_all(self.render().as_bytes())?;
        writer.flush()
    }

    fn bold(&self, text: &str) -> String {
        if self.color {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn green(&self, text: &str) -> String {
        if self.color {
            text.green().to_string()
        } else {
            text.to_string()
        }
    }

    fn yellow(&self, text: &str) -> String {
        if self.color {
            text.yellow().to_string()
        } else {
            text.to_string()
        }
    }
}

fn member_label(record: &ImageRecord) -> String {
    record
        .path()
        .map_or_else(|| IN_MEMORY_LABEL.to_string(), |p| p.display().to_string())
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}
