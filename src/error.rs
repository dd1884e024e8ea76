//! Exit codes and structured error reporting.

use serde::Serialize;

/// Process exit codes.
///
/// - 0: Success (completed normally, duplicates found)
/// - 1: General error (unexpected failure)
/// - 2: No duplicates found (completed normally, no duplicates)
/// - 3: Partial success (some images could not be processed)
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Scan completed and duplicates were found.
    Success = 0,
    /// An unexpected error occurred.
    GeneralError = 1,
    /// Scan completed but no duplicates were found.
    NoDuplicates = 2,
    /// Scan completed but some images failed.
    PartialSuccess = 3,
    /// Scan was interrupted by user (Ctrl+C).
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "RT000",
            Self::GeneralError => "RT001",
            Self::NoDuplicates => "RT002",
            Self::PartialSuccess => "RT003",
            Self::Interrupted => "RT130",
        }
    }

    /// Pick the exit code for a finished scan.
    ///
    /// Interruption wins over failures, and failures over the duplicate
    /// outcome.
    #[must_use]
    pub fn for_scan(interrupted: bool, has_failures: bool, has_duplicates: bool) -> Self {
        if interrupted {
            Self::Interrupted
        } else if has_failures {
            Self::PartialSuccess
        } else if has_duplicates {
            Self::Success
        } else {
            Self::NoDuplicates
        }
    }
}

/// Structured error information for `--json-errors`.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "RT001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message, including its causes
    pub message: String,
    /// Whether the operation was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{:#}", err),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::Success.as_i32(), 0);
        assert_eq!(ExitCode::GeneralError.as_i32(), 1);
        assert_eq!(ExitCode::NoDuplicates.as_i32(), 2);
        assert_eq!(ExitCode::PartialSuccess.as_i32(), 3);
        assert_eq!(ExitCode::Interrupted.as_i32(), 130);
        assert_eq!(ExitCode::Interrupted.code_prefix(), "RT130");
    }

    #[test]
    fn test_for_scan_priority() {
        assert_eq!(ExitCode::for_scan(true, true, true), ExitCode::Interrupted);
        assert_eq!(ExitCode::for_scan(false, true, true), ExitCode::PartialSuccess);
        assert_eq!(ExitCode::for_scan(false, false, true), ExitCode::Success);
        assert_eq!(ExitCode::for_scan(false, false, false), ExitCode::NoDuplicates);
    }

    #[test]
    fn test_structured_error_includes_context() {
        let err = anyhow::anyhow!("disk on fire").context("Failed to scan /photos");
        let structured = StructuredError::new(&err, ExitCode::GeneralError);
        assert_eq!(structured.code, "RT001");
        assert_eq!(structured.message, "Failed to scan /photos: disk on fire");
        assert!(!structured.interrupted);

        let json = serde_json::to_value(&structured).unwrap();
        assert_eq!(json["exit_code"], 1);
    }
}
