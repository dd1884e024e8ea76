//! JSON output formatter for duplicate groups.
//!
//! The document is an array of groups, each an array of record projections:
//!
//! ```json
//! [
//!   [
//!     {
//!       "width": 640,
//!       "height": 480,
//!       "channels": 3,
//!       "hash": "c3f0...",
//!       "exiftags": { "Image Make": "ACME" },
//!       "size": 20480,
//!       "extension": ".png",
//!       "filename": "holiday",
//!       "filepath": "/photos/holiday.png"
//!     },
//!     { "...": "..." }
//!   ]
//! ]
//! ```
//!
//! Fields a record does not carry (for example `filepath` for an image hashed
//! from memory) are omitted.

use std::io::Write;

use serde::Serialize;

use crate::duplicates::DuplicateGroup;
use crate::record::Projection;

/// Errors raised while writing JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// Serialization failed.
    #[error("Failed to serialize JSON: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The destination could not be written.
    #[error("Failed to write JSON: {0}")]
    Io(#[from] std::io::Error),
}

/// Duplicate groups as serializable projections.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct JsonOutput {
    /// One entry per group, members in grouping order.
    pub groups: Vec<Vec<Projection>>,
}

impl JsonOutput {
    /// Project every record of every group.
    ///
    /// ```
    /// use rotodupe::output::json::JsonOutput;
    ///
    /// let output = JsonOutput::new(&[]);
    /// assert_eq!(output.to_json().unwrap(), "[]");
    /// ```
    #[must_use]
    pub fn new(groups: &[DuplicateGroup<'_>]) -> Self {
        Self {
            groups: groups
                .iter()
                .map(|group| group.iter().map(|record| record.to_projection()).collect())
                .collect(),
        }
    }

    /// Compact JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Pretty-printed JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write the document followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn write_to<W: Write>(&self, mut writer: W, pretty: bool) -> Result<(), JsonOutputError> {
        if pretty {
            serde_json::to_writer_pretty(&mut writer, self)?;
        } else {
            serde_json::to_writer(&mut writer, self)?;
        }
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ImageRecord;
    use crate::scanner::{HasherConfig, PerceptualHasher};
    use image::{DynamicImage, GrayImage, Luma};

    fn record(seed: u32) -> ImageRecord {
        let hasher = PerceptualHasher::new(HasherConfig::default()).unwrap();
        let image = DynamicImage::ImageLuma8(GrayImage::from_fn(32, 32, |x, y| {
            Luma([((x * seed + y * 7) % 251) as u8])
        }));
        ImageRecord::from_matrix(&image, &hasher).unwrap()
    }

    #[test]
    fn test_array_of_arrays() {
        let a = record(3);
        let b = a.clone();
        let groups = vec![DuplicateGroup::new(vec![&a, &b])];

        let output = JsonOutput::new(&groups);
        let value: serde_json::Value = serde_json::from_str(&output.to_json().unwrap()).unwrap();

        let outer = value.as_array().unwrap();
        assert_eq!(outer.len(), 1);
        let members = outer[0].as_array().unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members[0]["width"], 32);
        assert_eq!(members[0]["channels"], 1);
        assert_eq!(members[0]["hash"], a.hash.to_hex());
    }

    #[test]
    fn test_matrix_records_omit_file_fields() {
        let a = record(5);
        let groups = vec![DuplicateGroup::new(vec![&a, &a])];
        let json = JsonOutput::new(&groups).to_json().unwrap();

        assert!(!json.contains("filepath"));
        assert!(!json.contains("exiftags"));
        assert!(!json.contains("size"));
    }

    #[test]
    fn test_write_to_pretty() {
        let a = record(9);
        let groups = vec![DuplicateGroup::new(vec![&a, &a])];
        let mut buffer = Vec::new();
        JsonOutput::new(&groups).write_to(&mut buffer, true).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        assert!(text.starts_with('['));
        assert!(text.ends_with("]\n"));
        assert!(text.lines().count() > 3);
    }
}
