//! Batch orchestrator: enumerate dates, admit them, hold a slot per date task
//! and archive every name directory inside it.
//!
//! # Design
//! - The dispatch loop acquires the slot before spawning, and only for
//!   admitted dates, so skipped or limited dates never hold one.
//! - Each date task runs on the blocking pool and archives its leaves
//!   sequentially; one failing leaf never stops its siblings.
//! - The working directory is never consulted; every path derives from the
//!   validated absolute roots.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinSet;
use tracing::{Instrument, debug, error, info, info_span};
use trove_archive::{ArchiveFormat, ArchiveJob, ContainerOptions, error_chain};
use trove_config::BatchConfig;
use trove_telemetry::{Metrics, outcome};
use uuid::Uuid;

use crate::error::{BatchError, BatchResult};
use crate::filter::{Admission, DateFilter};
use crate::layout::{Subdirectory, archive_destination, list_subdirectories};
use crate::report::{BatchReport, DateReport, LeafOutcome, LeafReport};
use crate::slots::{ConcurrencySlot, SlotPool};

/// Drives one batch over a validated configuration.
pub struct BatchOrchestrator {
    config: Arc<BatchConfig>,
    metrics: Metrics,
}

impl BatchOrchestrator {
    /// Build an orchestrator; nothing touches the filesystem until [`run`](Self::run).
    #[must_use]
    pub fn new(config: BatchConfig, metrics: Metrics) -> Self {
        Self {
            config: Arc::new(config),
            metrics,
        }
    }

    /// Configuration driving this orchestrator.
    #[must_use]
    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Execute the batch and wait for every dispatched date task.
    ///
    /// # Errors
    ///
    /// Fails only when the source root cannot be enumerated or the slot pool
    /// closes; every date- and leaf-level failure is captured in the report.
    pub async fn run(&self) -> BatchResult<BatchReport> {
        let run_id = Uuid::new_v4();
        let span = info_span!("batch", run_id = %run_id);
        self.run_inner(run_id).instrument(span).await
    }

    async fn run_inner(&self, run_id: Uuid) -> BatchResult<BatchReport> {
        let config = &self.config;
        let started_at = Utc::now();
        info!(
            source = %config.source_root.display(),
            destination = %config.destination_root.display(),
            format = %config.format,
            concurrency = config.concurrency.get(),
            start_at = config.start_at.as_deref().unwrap_or(""),
            limit = ?config.limit,
            "batch starting"
        );

        let source_root = config.source_root.clone();
        let dates = tokio::task::spawn_blocking(move || list_subdirectories(&source_root))
            .await
            .map_err(|source| BatchError::TaskAborted {
                date: config.source_root.display().to_string(),
                source,
            })?
            .map_err(|source| BatchError::io("list_dates", &config.source_root, source))?;

        let pool = SlotPool::new(config.concurrency, self.metrics.clone());
        let mut filter = DateFilter::new(config.start_at.clone(), config.limit);
        let mut tasks = JoinSet::new();
        let mut in_flight = HashMap::new();
        let mut reports = Vec::new();
        let mut skipped = Vec::new();

        for date in dates {
            match filter.admit(&date.name) {
                Admission::Skip => {
                    info!(date = %date.name, "skipping date directory before start_at");
                    skipped.push(date.name);
                    continue;
                }
                Admission::Stop => {
                    debug!(dispatched = filter.dispatched(), "date limit reached");
                    break;
                }
                Admission::Dispatch => {}
            }

            let destination = config.destination_root.join(&date.file_name);
            if let Err(source) = tokio::fs::create_dir_all(&destination).await {
                let failure = BatchError::io("create_date_destination", &destination, source);
                error!(
                    date = %date.name,
                    error = %error_chain(&failure),
                    "date task failed"
                );
                self.metrics.inc_date_task(outcome::FAILURE);
                reports.push(DateReport::failed(date.name, destination, failure));
                continue;
            }

            let slot = pool.acquire().await?;
            let task = DateTask {
                date: date.clone(),
                destination: destination.clone(),
                format: config.format,
                options: config.options,
                metrics: self.metrics.clone(),
            };
            let span = info_span!("date", date = %date.name);
            let handle = tasks.spawn_blocking(move || {
                let _entered = span.enter();
                task.run(slot)
            });
            in_flight.insert(handle.id(), (date.name, destination));
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((id, report)) => {
                    in_flight.remove(&id);
                    reports.push(report);
                }
                Err(source) => {
                    let (date, destination) =
                        in_flight.remove(&source.id()).unwrap_or_default();
                    let failure = BatchError::TaskAborted {
                        date: date.clone(),
                        source,
                    };
                    error!(date = %date, error = %error_chain(&failure), "date task failed");
                    self.metrics.inc_date_task(outcome::FAILURE);
                    reports.push(DateReport::failed(date, destination, failure));
                }
            }
        }

        reports.sort_by(|left, right| left.date.cmp(&right.date));
        let report = BatchReport {
            run_id,
            format: config.format,
            started_at,
            finished_at: Utc::now(),
            dates: reports,
            skipped,
            peak_slots: pool.peak(),
        };
        info!(
            dates = report.dates.len(),
            skipped = report.skipped.len(),
            archived = report.archived(),
            failed_leaves = report.failed_leaves(),
            failed_dates = report.failed_dates(),
            peak_slots = report.peak_slots,
            "batch finished"
        );
        Ok(report)
    }
}

/// Everything one date task needs, moved onto the blocking pool.
struct DateTask {
    date: Subdirectory,
    destination: std::path::PathBuf,
    format: ArchiveFormat,
    options: ContainerOptions,
    metrics: Metrics,
}

impl DateTask {
    fn run(self, _slot: ConcurrencySlot) -> DateReport {
        let names = match list_subdirectories(&self.date.path) {
            Ok(names) => names,
            Err(source) => {
                let failure = BatchError::io("list_names", &self.date.path, source);
                error!(error = %error_chain(&failure), "date task failed");
                self.metrics.inc_date_task(outcome::FAILURE);
                return DateReport::failed(self.date.name, self.destination, failure);
            }
        };

        let mut report = DateReport::new(self.date.name.clone(), self.destination.clone());
        for name in names {
            report.leaves.push(self.archive_leaf(name));
        }
        self.metrics.inc_date_task(outcome::SUCCESS);
        report
    }

    fn archive_leaf(&self, name: Subdirectory) -> LeafReport {
        let destination = archive_destination(&self.destination, &name.file_name, self.format);
        let job = ArchiveJob {
            source: name.path.clone(),
            destination: destination.clone(),
            format: self.format,
            options: self.options,
        };
        let outcome = match job.run() {
            Ok(stats) => {
                info!(
                    name = %name.name,
                    destination = %destination.display(),
                    entries = stats.entries,
                    bytes = stats.bytes,
                    "archive written"
                );
                self.metrics
                    .inc_archive(self.format.as_str(), outcome::SUCCESS);
                self.metrics.add_archived(stats.entries, stats.bytes);
                LeafOutcome::Archived(stats)
            }
            Err(err) => {
                error!(
                    name = %name.name,
                    destination = %destination.display(),
                    error = %error_chain(&err),
                    "archive failed"
                );
                self.metrics
                    .inc_archive(self.format.as_str(), outcome::FAILURE);
                LeafOutcome::Failed(err)
            }
        };
        LeafReport {
            name: name.name,
            source: name.path,
            destination,
            outcome,
        }
    }
}
