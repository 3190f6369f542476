//! Telemetry primitives shared across the Trove workspace.
//!
//! This crate centralises logging and metrics so the batch engine and the
//! CLI adopt a consistent observability story.
//!
//! Layout: init.rs (subscriber install), metrics.rs (Prometheus registry),
//! error.rs (telemetry errors).
#![forbid(unsafe_code)]
#![deny(
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions, clippy::multiple_crate_versions)]

pub mod error;
pub mod init;
pub mod metrics;

pub use error::{Result, TelemetryError};
pub use init::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, build_env_filter, init_logging};
pub use metrics::{FORMAT_LABELS, Metrics, MetricsSnapshot, outcome};
