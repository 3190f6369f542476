//! # Design
//!
//! - Provide structured, constant-message errors for the archive writer.
//! - Capture operation context (paths, fields, inputs) to make failures reproducible in tests.
//! - Preserve source errors without interpolating context into error messages.

use std::error::Error as StdError;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for archive operations.
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Errors produced while walking a source tree or writing an archive container.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// IO failures while interacting with the filesystem or the container stream.
    #[error("archive io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Walkdir traversal failures.
    #[error("archive walk failure")]
    Walkdir {
        /// Operation that triggered the walkdir failure.
        operation: &'static str,
        /// Path involved in the walkdir failure.
        path: PathBuf,
        /// Underlying walkdir error.
        source: walkdir::Error,
    },
    /// Zip container failures.
    #[error("archive zip failure")]
    Zip {
        /// Operation that triggered the zip failure.
        operation: &'static str,
        /// Path involved in the zip failure.
        path: PathBuf,
        /// Underlying zip error.
        source: zip::result::ZipError,
    },
    /// Input validation failures.
    #[error("archive invalid input")]
    InvalidInput {
        /// Field that failed validation.
        field: &'static str,
        /// Static reason for the failure.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
    /// The format selector did not name a supported container format.
    #[error("unsupported archive format")]
    UnsupportedFormat {
        /// Selector supplied by the caller.
        value: String,
    },
    /// The container was used after it had been closed.
    #[error("archive container already closed")]
    ContainerClosed {
        /// Destination of the closed container.
        path: PathBuf,
    },
}

impl ArchiveError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn walkdir(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: walkdir::Error,
    ) -> Self {
        Self::Walkdir {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn zip(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: zip::result::ZipError,
    ) -> Self {
        Self::Zip {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Whether the failure originated from filesystem or stream IO.
    #[must_use]
    pub const fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::Walkdir { .. } | Self::Zip { .. })
    }

    /// Operation label recorded with the failure, when one exists.
    #[must_use]
    pub const fn operation(&self) -> Option<&'static str> {
        match self {
            Self::Io { operation, .. }
            | Self::Walkdir { operation, .. }
            | Self::Zip { operation, .. } => Some(*operation),
            Self::InvalidInput { .. }
            | Self::UnsupportedFormat { .. }
            | Self::ContainerClosed { .. } => None,
        }
    }

    /// Path recorded with the failure, when one exists.
    #[must_use]
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Self::Io { path, .. }
            | Self::Walkdir { path, .. }
            | Self::Zip { path, .. }
            | Self::ContainerClosed { path } => Some(path),
            Self::InvalidInput { .. } | Self::UnsupportedFormat { .. } => None,
        }
    }
}

/// Render an error and every source beneath it as a single `: `-joined line.
#[must_use]
pub fn error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut rendered = error.to_string();
    let mut current = error.source();
    while let Some(source) = current {
        rendered.push_str(": ");
        rendered.push_str(&source.to_string());
        current = source.source();
    }
    rendered
}
