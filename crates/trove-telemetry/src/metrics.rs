//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes the counters and gauges a batch run reports on.

use std::path::Path;
use std::sync::Arc;

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Prometheus-backed metrics registry for archive batches.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    archives_total: IntCounterVec,
    archive_bytes_total: IntCounter,
    archive_entries_total: IntCounter,
    date_tasks_total: IntCounterVec,
    active_slots: IntGauge,
    peak_active_slots: IntGauge,
}

/// Snapshot of the batch counters and gauges.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Archives written successfully.
    pub archives_succeeded: u64,
    /// Archives that failed.
    pub archives_failed: u64,
    /// Payload bytes copied into archives.
    pub archive_bytes_total: u64,
    /// Entries written into archives.
    pub archive_entries_total: u64,
    /// Date tasks that finished without a task-level failure.
    pub date_tasks_succeeded: u64,
    /// Date tasks that failed to list or prepare their directory.
    pub date_tasks_failed: u64,
    /// Slots currently held.
    pub active_slots: i64,
    /// Highest number of slots held at once.
    pub peak_active_slots: i64,
}

/// Outcome label values.
pub mod outcome {
    /// Label for a successful unit of work.
    pub const SUCCESS: &str = "success";
    /// Label for a failed unit of work.
    pub const FAILURE: &str = "failure";
}

/// Format label values accepted by [`Metrics::inc_archive`].
pub const FORMAT_LABELS: [&str; 2] = ["tar_gzip", "zip"];

impl Metrics {
    /// Construct a new metrics registry with the batch collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// built or registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let archives_total = IntCounterVec::new(
            Opts::new("archives_total", "Archives produced by format and outcome"),
            &["format", "outcome"],
        )
        .map_err(|source| TelemetryError::MetricsCollector {
            name: "archives_total",
            source,
        })?;
        let archive_bytes_total = counter("archive_bytes_total", "Payload bytes archived")?;
        let archive_entries_total = counter("archive_entries_total", "Entries archived")?;
        let date_tasks_total = IntCounterVec::new(
            Opts::new("date_tasks_total", "Date directory tasks by outcome"),
            &["outcome"],
        )
        .map_err(|source| TelemetryError::MetricsCollector {
            name: "date_tasks_total",
            source,
        })?;
        let active_slots = gauge("active_slots", "Concurrency slots currently held")?;
        let peak_active_slots =
            gauge("peak_active_slots", "Highest number of concurrency slots held")?;

        register(&registry, "archives_total", &archives_total)?;
        register(&registry, "archive_bytes_total", &archive_bytes_total)?;
        register(&registry, "archive_entries_total", &archive_entries_total)?;
        register(&registry, "date_tasks_total", &date_tasks_total)?;
        register(&registry, "active_slots", &active_slots)?;
        register(&registry, "peak_active_slots", &peak_active_slots)?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                archives_total,
                archive_bytes_total,
                archive_entries_total,
                date_tasks_total,
                active_slots,
                peak_active_slots,
            }),
        })
    }

    /// Count one archive attempt for `format` (`tar_gzip`, `zip`) and `outcome`.
    pub fn inc_archive(&self, format: &str, outcome: &str) {
        self.inner
            .archives_total
            .with_label_values(&[format, outcome])
            .inc();
    }

    /// Add archived payload bytes and entries.
    pub fn add_archived(&self, entries: u64, bytes: u64) {
        self.inner.archive_entries_total.inc_by(entries);
        self.inner.archive_bytes_total.inc_by(bytes);
    }

    /// Count one finished date task.
    pub fn inc_date_task(&self, outcome: &str) {
        self.inner
            .date_tasks_total
            .with_label_values(&[outcome])
            .inc();
    }

    /// Record the slots currently held and the highest count seen so far.
    pub fn set_slot_usage(&self, active: i64, peak: i64) {
        self.inner.active_slots.set(active);
        self.inner.peak_active_slots.set(peak);
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Render and write the exposition text to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails or the file cannot be written.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let rendered = self.render()?;
        std::fs::write(path, rendered).map_err(|source| TelemetryError::MetricsWrite {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Take a point-in-time snapshot of every counter and gauge.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let archives = |outcome: &str| -> u64 {
            FORMAT_LABELS
                .iter()
                .map(|format| {
                    self.inner
                        .archives_total
                        .with_label_values(&[*format, outcome])
                        .get()
                })
                .sum()
        };
        MetricsSnapshot {
            archives_succeeded: archives(outcome::SUCCESS),
            archives_failed: archives(outcome::FAILURE),
            archive_bytes_total: self.inner.archive_bytes_total.get(),
            archive_entries_total: self.inner.archive_entries_total.get(),
            date_tasks_succeeded: self
                .inner
                .date_tasks_total
                .with_label_values(&[outcome::SUCCESS])
                .get(),
            date_tasks_failed: self
                .inner
                .date_tasks_total
                .with_label_values(&[outcome::FAILURE])
                .get(),
            active_slots: self.inner.active_slots.get(),
            peak_active_slots: self.inner.peak_active_slots.get(),
        }
    }
}

fn counter(name: &'static str, help: &str) -> Result<IntCounter> {
    IntCounter::with_opts(Opts::new(name, help))
        .map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn gauge(name: &'static str, help: &str) -> Result<IntGauge> {
    IntGauge::with_opts(Opts::new(name, help))
        .map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn register<C>(registry: &Registry, name: &'static str, collector: &C) -> Result<()>
where
    C: prometheus::core::Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn metrics_render_and_snapshot() -> Result<()> {
        let metrics = Metrics::new()?;
        metrics.inc_archive("tar_gzip", outcome::SUCCESS);
        metrics.inc_archive("zip", outcome::SUCCESS);
        metrics.inc_archive("zip", outcome::FAILURE);
        metrics.add_archived(3, 42);
        metrics.inc_date_task(outcome::SUCCESS);
        metrics.set_slot_usage(2, 2);
        metrics.set_slot_usage(1, 2);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.archives_succeeded, 2);
        assert_eq!(snapshot.archives_failed, 1);
        assert_eq!(snapshot.archive_entries_total, 3);
        assert_eq!(snapshot.archive_bytes_total, 42);
        assert_eq!(snapshot.date_tasks_succeeded, 1);
        assert_eq!(snapshot.date_tasks_failed, 0);
        assert_eq!(snapshot.active_slots, 1);
        assert_eq!(snapshot.peak_active_slots, 2);

        let rendered = metrics.render()?;
        assert!(rendered.contains("archives_total"));
        assert!(rendered.contains("outcome=\"failure\""));
        assert!(rendered.contains("peak_active_slots 2"));
        Ok(())
    }

    #[test]
    fn write_to_persists_exposition() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let temp = TempDir::new()?;
        let metrics = Metrics::new()?;
        metrics.add_archived(1, 1);
        let path = temp.path().join("metrics.prom");
        metrics.write_to(&path)?;
        assert!(std::fs::read_to_string(&path)?.contains("archive_bytes_total 1"));

        let missing = temp.path().join("missing").join("metrics.prom");
        assert!(matches!(
            metrics.write_to(&missing),
            Err(TelemetryError::MetricsWrite { .. })
        ));
        Ok(())
    }
}
