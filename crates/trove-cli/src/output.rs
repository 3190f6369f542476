//! Summary renderers and formatting helpers.

use std::io::Write;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::Serialize;
use trove_archive::error_chain;
use trove_batch::{BatchReport, LeafOutcome};
use uuid::Uuid;

use crate::error::{CliError, CliResult};

/// Summary output selection.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// One row per archived leaf, plus one per failed date task.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub(crate) struct SummaryRow {
    pub(crate) date: String,
    pub(crate) name: Option<String>,
    pub(crate) status: &'static str,
    pub(crate) entries: u64,
    pub(crate) bytes: u64,
    pub(crate) error: Option<String>,
}

impl SummaryRow {
    fn label(&self) -> String {
        match &self.name {
            Some(name) => format!("{}/{name}", self.date),
            None => self.date.clone(),
        }
    }
}

/// Serializable view of a finished batch.
#[derive(Debug, Serialize)]
pub(crate) struct BatchSummary {
    pub(crate) run_id: Uuid,
    pub(crate) format: String,
    pub(crate) started_at: DateTime<Utc>,
    pub(crate) finished_at: DateTime<Utc>,
    pub(crate) dispatched: usize,
    pub(crate) skipped: Vec<String>,
    pub(crate) archived: usize,
    pub(crate) failed_leaves: usize,
    pub(crate) failed_dates: usize,
    pub(crate) peak_slots: usize,
    pub(crate) total_entries: u64,
    pub(crate) total_bytes: u64,
    pub(crate) rows: Vec<SummaryRow>,
}

impl BatchSummary {
    pub(crate) fn from_report(report: &BatchReport) -> Self {
        let mut rows = Vec::new();
        for date in &report.dates {
            if let Some(failure) = &date.failure {
                rows.push(SummaryRow {
                    date: date.date.clone(),
                    name: None,
                    status: "failed",
                    entries: 0,
                    bytes: 0,
                    error: Some(error_chain(failure)),
                });
            }
            for leaf in &date.leaves {
                let row = match &leaf.outcome {
                    LeafOutcome::Archived(stats) => SummaryRow {
                        date: date.date.clone(),
                        name: Some(leaf.name.clone()),
                        status: "ok",
                        entries: stats.entries,
                        bytes: stats.bytes,
                        error: None,
                    },
                    LeafOutcome::Failed(err) => SummaryRow {
                        date: date.date.clone(),
                        name: Some(leaf.name.clone()),
                        status: "failed",
                        entries: 0,
                        bytes: 0,
                        error: Some(error_chain(err)),
                    },
                };
                rows.push(row);
            }
        }

        let totals = report.totals();
        Self {
            run_id: report.run_id,
            format: report.format.to_string(),
            started_at: report.started_at,
            finished_at: report.finished_at,
            dispatched: report.dates.len(),
            skipped: report.skipped.clone(),
            archived: report.archived(),
            failed_leaves: report.failed_leaves(),
            failed_dates: report.failed_dates(),
            peak_slots: report.peak_slots,
            total_entries: totals.entries,
            total_bytes: totals.bytes,
            rows,
        }
    }
}

pub(crate) fn render_summary(
    summary: &BatchSummary,
    format: OutputFormat,
    out: &mut impl Write,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => {
            let text = serde_json::to_string_pretty(summary)
                .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
            writeln!(out, "{text}").map_err(write_failed)?;
        }
        OutputFormat::Table => render_table(summary, out).map_err(write_failed)?,
    }
    Ok(())
}

fn render_table(summary: &BatchSummary, out: &mut impl Write) -> std::io::Result<()> {
    writeln!(
        out,
        "{:<32} {:<7} {:>8} {:>12} ERROR",
        "DATE/NAME", "STATUS", "ENTRIES", "SIZE"
    )?;
    for row in &summary.rows {
        writeln!(
            out,
            "{:<32} {:<7} {:>8} {:>12} {}",
            row.label(),
            row.status,
            row.entries,
            format_bytes(row.bytes),
            row.error.as_deref().unwrap_or("")
        )?;
    }
    writeln!(
        out,
        "run {}: {} archived, {} failed, {} date(s) dispatched, {} skipped, {} failed date task(s), peak slots {}, {} in {} entries",
        summary.run_id,
        summary.archived,
        summary.failed_leaves,
        summary.dispatched,
        summary.skipped.len(),
        summary.failed_dates,
        summary.peak_slots,
        format_bytes(summary.total_bytes),
        summary.total_entries
    )
}

fn write_failed(err: std::io::Error) -> CliError {
    CliError::failure(anyhow!("failed to write summary: {err}"))
}

#[must_use]
pub(crate) fn format_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    const GIB: f64 = MIB * 1024.0;
    let value = bytes_to_f64(bytes);
    if value >= GIB {
        format!("{:.2} GiB", value / GIB)
    } else if value >= MIB {
        format!("{:.2} MiB", value / MIB)
    } else if value >= KIB {
        format!("{:.2} KiB", value / KIB)
    } else {
        format!("{bytes} B")
    }
}

fn bytes_to_f64(value: u64) -> f64 {
    let high = u32::try_from(value >> 32).unwrap_or(u32::MAX);
    let low = u32::try_from(value & 0xFFFF_FFFF).unwrap_or(u32::MAX);
    f64::from(high) * 4_294_967_296.0 + f64::from(low)
}
