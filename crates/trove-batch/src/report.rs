//! Structured batch results.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use trove_archive::{ArchiveError, ArchiveFormat, ArchiveStats};
use uuid::Uuid;

use crate::error::BatchError;

/// Result of archiving one `<date>/<name>` leaf.
#[derive(Debug)]
pub enum LeafOutcome {
    /// The archive was written and closed cleanly.
    Archived(ArchiveStats),
    /// Walking, writing or closing failed.
    Failed(ArchiveError),
}

impl LeafOutcome {
    /// Whether the leaf succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Archived(_))
    }

    /// Statistics of a successful leaf.
    #[must_use]
    pub const fn stats(&self) -> Option<&ArchiveStats> {
        match self {
            Self::Archived(stats) => Some(stats),
            Self::Failed(_) => None,
        }
    }

    /// Error of a failed leaf.
    #[must_use]
    pub const fn error(&self) -> Option<&ArchiveError> {
        match self {
            Self::Archived(_) => None,
            Self::Failed(err) => Some(err),
        }
    }
}

/// One leaf job and its outcome.
#[derive(Debug)]
pub struct LeafReport {
    /// Name directory.
    pub name: String,
    /// Archived source directory.
    pub source: PathBuf,
    /// Produced (or attempted) archive path.
    pub destination: PathBuf,
    /// Outcome.
    pub outcome: LeafOutcome,
}

/// One dispatched date directory.
#[derive(Debug)]
pub struct DateReport {
    /// Date directory name.
    pub date: String,
    /// Destination directory for this date.
    pub destination: PathBuf,
    /// Leaves in archive order.
    pub leaves: Vec<LeafReport>,
    /// Task-level failure (listing, destination creation, or an aborted task).
    pub failure: Option<BatchError>,
}

impl DateReport {
    pub(crate) const fn new(date: String, destination: PathBuf) -> Self {
        Self {
            date,
            destination,
            leaves: Vec::new(),
            failure: None,
        }
    }

    pub(crate) fn failed(date: String, destination: PathBuf, failure: BatchError) -> Self {
        Self {
            failure: Some(failure),
            ..Self::new(date, destination)
        }
    }

    /// Whether the task and every leaf succeeded.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.failure.is_none() && self.leaves.iter().all(|leaf| leaf.outcome.is_success())
    }
}

/// Everything a batch run produced.
#[derive(Debug)]
pub struct BatchReport {
    /// Correlation id attached to every log line of the run.
    pub run_id: Uuid,
    /// Container format used for every leaf.
    pub format: ArchiveFormat,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the last task finished.
    pub finished_at: DateTime<Utc>,
    /// Dispatched dates, sorted by name.
    pub dates: Vec<DateReport>,
    /// Dates passed over before `start_at` matched.
    pub skipped: Vec<String>,
    /// Highest number of date tasks holding a slot at once.
    pub peak_slots: usize,
}

impl BatchReport {
    /// Whether every dispatched date and leaf succeeded.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.dates.iter().all(DateReport::succeeded)
    }

    /// Iterate over every leaf with its date.
    pub fn leaves(&self) -> impl Iterator<Item = (&DateReport, &LeafReport)> {
        self.dates
            .iter()
            .flat_map(|date| date.leaves.iter().map(move |leaf| (date, leaf)))
    }

    /// Number of archives written.
    #[must_use]
    pub fn archived(&self) -> usize {
        self.leaves()
            .filter(|(_, leaf)| leaf.outcome.is_success())
            .count()
    }

    /// Number of failed leaves.
    #[must_use]
    pub fn failed_leaves(&self) -> usize {
        self.leaves()
            .filter(|(_, leaf)| !leaf.outcome.is_success())
            .count()
    }

    /// Number of dates whose task failed as a whole.
    #[must_use]
    pub fn failed_dates(&self) -> usize {
        self.dates
            .iter()
            .filter(|date| date.failure.is_some())
            .count()
    }

    /// Counters summed over every successful leaf.
    #[must_use]
    pub fn totals(&self) -> ArchiveStats {
        let mut totals = ArchiveStats::default();
        for stats in self.leaves().filter_map(|(_, leaf)| leaf.outcome.stats()) {
            totals.merge(stats);
        }
        totals
    }
}
