//! Archive-writing engine: walks a directory tree and serialises it into a
//! tar+gzip or zip container, one container per job.
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

pub mod container;
pub mod entry;
pub mod error;
pub mod model;
pub mod path;
pub mod tree;

pub use container::ArchiveContainer;
pub use entry::{EntryWriter, TarEntryWriter, ZipEntryWriter, is_safe_entry_name};
pub use error::{ArchiveError, ArchiveResult, error_chain};
pub use model::{
    ArchiveFormat, ArchiveJob, ArchiveStats, ContainerOptions, DEFAULT_COMPRESSION_LEVEL,
    EntryKind, FilesystemEntry, MAX_COMPRESSION_LEVEL, WriteMode,
};
pub use path::{PathCursor, directory_entry_name, normalize_entry_name};
pub use tree::TreeArchiver;
