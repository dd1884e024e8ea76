//! Output formatters for duplicate groups.
//!
//! - [`json`]: array of arrays of record projections, for scripting
//! - [`text`]: a readable listing with a summary
//!
//! ```no_run
//! use rotodupe::duplicates::DuplicateFinder;
//! use rotodupe::output::JsonOutput;
//! use std::path::Path;
//!
//! let finder = DuplicateFinder::with_defaults().unwrap();
//! let report = finder.find_duplicates(Path::new(".")).unwrap();
//!
//! let output = JsonOutput::new(&report.groups());
//! println!("{}", output.to_json_pretty().unwrap());
//! ```

pub mod json;
pub mod text;

pub use json::{JsonOutput, JsonOutputError};
pub use text::TextOutput;
