//! Error types for batch configuration.

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use trove_archive::ArchiveError;

/// Primary error type for configuration validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Field contained an invalid value.
    #[error("invalid configuration field")]
    InvalidField {
        /// Field that failed validation.
        field: &'static str,
        /// Offending value when available.
        value: Option<String>,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// Format selector did not name a supported container.
    #[error("invalid archive format")]
    InvalidFormat {
        /// Selector provided by the caller.
        value: String,
        /// Parse failure from the archive crate.
        source: ArchiveError,
    },
    /// Resolving a path failed.
    #[error("filesystem operation failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Path being resolved.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
}

impl ConfigError {
    /// Name of the field that failed, when the error is field-scoped.
    #[must_use]
    pub const fn field(&self) -> Option<&'static str> {
        match self {
            Self::InvalidField { field, .. } => Some(*field),
            Self::InvalidFormat { .. } => Some("format"),
            Self::Io { .. } => None,
        }
    }

    /// Machine-readable reason, when the error is field-scoped.
    #[must_use]
    pub const fn reason(&self) -> Option<&'static str> {
        match self {
            Self::InvalidField { reason, .. } => Some(*reason),
            Self::InvalidFormat { .. } => Some("unsupported"),
            Self::Io { .. } => None,
        }
    }
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn field_and_reason_describe_invalid_fields() {
        let err = ConfigError::InvalidField {
            field: "concurrency",
            value: Some("0".to_string()),
            reason: "must_be_positive",
        };
        assert_eq!(err.field(), Some("concurrency"));
        assert_eq!(err.reason(), Some("must_be_positive"));
        assert_eq!(err.to_string(), "invalid configuration field");
    }

    #[test]
    fn format_errors_keep_their_source() {
        let err = ConfigError::InvalidFormat {
            value: "rar".to_string(),
            source: ArchiveError::UnsupportedFormat {
                value: "rar".to_string(),
            },
        };
        assert_eq!(err.field(), Some("format"));
        assert!(err.source().is_some());
    }

    #[test]
    fn io_errors_are_not_field_scoped() {
        let err = ConfigError::Io {
            operation: "resolve_root",
            path: PathBuf::from("src"),
            source: io::Error::other("boom"),
        };
        assert!(err.field().is_none());
        assert!(err.reason().is_none());
    }
}
