//! # Design
//!
//! - Batch-level errors only; per-leaf failures stay [`ArchiveError`]s inside the report.
//! - Keep error messages constant while carrying context fields for debugging.
//!
//! [`ArchiveError`]: trove_archive::ArchiveError

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for batch operations.
pub type BatchResult<T> = Result<T, BatchError>;

/// Errors raised while enumerating or scheduling a batch.
#[derive(Debug, Error)]
pub enum BatchError {
    /// Directory listing or creation failed.
    #[error("batch io failure")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The concurrency slot pool was closed while the dispatch loop waited.
    #[error("concurrency slots closed")]
    SlotsClosed {
        /// Underlying semaphore error.
        source: tokio::sync::AcquireError,
    },
    /// A date task panicked or was cancelled before reporting.
    #[error("date task aborted")]
    TaskAborted {
        /// Date directory handled by the task.
        date: String,
        /// Underlying join error.
        source: tokio::task::JoinError,
    },
}

impl BatchError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}
