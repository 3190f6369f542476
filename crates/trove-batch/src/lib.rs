//! Bounded-concurrency batch archiving over a `<source>/<date>/<name>` tree.
//!
//! Layout: `orchestrator.rs` (dispatch loop and date tasks), `filter.rs`
//! (`start_at`/limit admission), `slots.rs` (concurrency slots), `layout.rs`
//! (directory listing), `report.rs` (structured results).
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
pub mod filter;
pub mod layout;
pub mod orchestrator;
pub mod report;
pub mod slots;

pub use error::{BatchError, BatchResult};
pub use filter::{Admission, DateFilter};
pub use layout::{Subdirectory, archive_destination, list_subdirectories};
pub use orchestrator::BatchOrchestrator;
pub use report::{BatchReport, DateReport, LeafOutcome, LeafReport};
pub use slots::{ConcurrencySlot, SlotPool};
