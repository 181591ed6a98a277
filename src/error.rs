//! Error types for `sortie`
//!
//! The scripting core itself never fails: missing callers, malformed
//! reads and stray triggers all degrade to "nothing happens". Errors
//! only arise at the edges, when loading level scripts or running the
//! command-line tool.

use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for `sortie` CLI operations.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// General error
    pub const ERROR: i32 = 1;

    /// Level script error (invalid YAML, validation failure)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (file not found, permission denied)
    pub const IO_ERROR: i32 = 3;

    /// The simulated level did not complete within its time budget
    pub const INCOMPLETE: i32 = 4;

    /// Usage error (invalid arguments)
    pub const USAGE_ERROR: i32 = 64;

    /// Interrupted by SIGINT (Ctrl+C)
    pub const INTERRUPTED: i32 = 130;

    /// Terminated by SIGTERM
    pub const TERMINATED: i32 = 143;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for `sortie` operations.
#[derive(Debug, Error)]
pub enum SortieError {
    /// Level script loading or validation error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Invalid command-line usage
    #[error("usage error: {0}")]
    Usage(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A simulated run stopped before the level finished
    #[error("level '{level}' did not complete: {reason}")]
    Incomplete { level: String, reason: String },
}

impl SortieError {
    /// Returns the exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Yaml(_) => ExitCode::CONFIG_ERROR,
            Self::Usage(_) => ExitCode::USAGE_ERROR,
            Self::Io(_) => ExitCode::IO_ERROR,
            Self::Json(_) => ExitCode::ERROR,
            Self::Incomplete { .. } => ExitCode::INCOMPLETE,
        }
    }
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Level script loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// YAML parsing failed
    #[error("parse error in {path}: {message}")]
    ParseError {
        /// Path to the level script
        path: PathBuf,
        /// Line number where the error occurred (if available)
        line: Option<usize>,
        /// Error message from the parser
        message: String,
    },

    /// Level script validation failed
    #[error("validation failed for {path}: {}", summarize(.errors))]
    ValidationError {
        /// Path to the level script
        path: String,
        /// Every error found
        errors: Vec<ValidationIssue>,
    },

    /// Level script not found or unreadable
    #[error("file not found: {path}")]
    MissingFile {
        /// Path to the missing file
        path: PathBuf,
    },

    /// Level script exceeds the configured size limit
    #[error("{path} is {size} bytes, limit is {limit}")]
    TooLarge {
        path: PathBuf,
        size: usize,
        limit: usize,
    },

    /// Field has an invalid value
    #[error("invalid value for '{field}': got '{value}', expected {expected}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The actual value provided
        value: String,
        /// Description of what was expected
        expected: String,
    },
}

fn summarize(errors: &[ValidationIssue]) -> String {
    match errors {
        [] => "no details".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{first} (and {} more)", rest.len()),
    }
}

// ============================================================================
// Validation Types
// ============================================================================

/// A single validation issue found in a level script.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ValidationIssue {
    /// Path to the problematic field (e.g., "phases[1].events[0].until")
    pub path: String,
    /// Description of the validation issue
    pub message: String,
    /// Severity level of the issue
    pub severity: Severity,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {} at {}", prefix, self.message, self.path)
    }
}

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Prevents the level from loading
    Error,
    /// Informational, the level still loads
    Warning,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(message: &str) -> ValidationIssue {
        ValidationIssue {
            path: "phases[0]".to_string(),
            message: message.to_string(),
            severity: Severity::Error,
        }
    }

    #[test]
    fn test_exit_codes() {
        let config = SortieError::Config(ConfigError::MissingFile {
            path: PathBuf::from("level.yaml"),
        });
        assert_eq!(config.exit_code(), ExitCode::CONFIG_ERROR);

        let io = SortieError::Io(std::io::Error::other("boom"));
        assert_eq!(io.exit_code(), ExitCode::IO_ERROR);

        let usage = SortieError::Usage("bad".to_string());
        assert_eq!(usage.exit_code(), ExitCode::USAGE_ERROR);

        let incomplete = SortieError::Incomplete {
            level: "wave".to_string(),
            reason: "time limit reached".to_string(),
        };
        assert_eq!(incomplete.exit_code(), ExitCode::INCOMPLETE);
        assert_eq!(
            incomplete.to_string(),
            "level 'wave' did not complete: time limit reached"
        );
    }

    #[test]
    fn test_issue_display() {
        assert_eq!(
            issue("Phase name is required").to_string(),
            "error: Phase name is required at phases[0]"
        );
    }

    #[test]
    fn test_validation_error_summarizes() {
        let err = ConfigError::ValidationError {
            path: "level.yaml".to_string(),
            errors: vec![issue("first"), issue("second"), issue("third")],
        };
        assert_eq!(
            err.to_string(),
            "validation failed for level.yaml: error: first at phases[0] (and 2 more)"
        );
    }
}
