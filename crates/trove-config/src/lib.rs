#![forbid(unsafe_code)]
#![deny(
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::redundant_pub_crate)]

//! Batch configuration: raw settings in, validated configuration out.
//!
//! Layout: `model.rs` (raw and validated settings), `validate.rs`
//! (field parsing helpers), `defaults.rs` (fallback values).

pub mod defaults;
pub mod error;
pub mod model;
mod validate;

pub use defaults::{
    DEFAULT_CONCURRENCY, DEFAULT_DESTINATION_ROOT, DEFAULT_FORMAT, DEFAULT_SOURCE_ROOT,
};
pub use error::{ConfigError, ConfigResult};
pub use model::{BatchConfig, BatchSettings};
