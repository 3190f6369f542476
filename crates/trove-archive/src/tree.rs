//! Source tree traversal and leaf job execution.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use tracing::{trace, warn};
use walkdir::WalkDir;

use crate::container::ArchiveContainer;
use crate::entry::EntryWriter;
use crate::error::{ArchiveError, ArchiveResult, error_chain};
use crate::model::{ArchiveJob, ArchiveStats, EntryKind, FilesystemEntry};
use crate::path::PathCursor;

/// Walks one source directory and feeds every node to an [`EntryWriter`].
#[derive(Debug, Clone)]
pub struct TreeArchiver {
    root: PathBuf,
    cursor: PathCursor,
}

impl TreeArchiver {
    /// Prepare a traversal of `root`. Entry names are rooted at the final
    /// component of `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let cursor = PathCursor::for_root(&root);
        Self { root, cursor }
    }

    /// Root of the traversal.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Depth-first, lexicographically ordered walk including the root itself.
    /// Symlinks are recorded, never followed.
    ///
    /// # Errors
    ///
    /// Aborts on the first traversal, read or write failure.
    pub fn archive(&self, writer: &mut dyn EntryWriter) -> ArchiveResult<ArchiveStats> {
        let mut stats = ArchiveStats::default();
        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name();

        for item in walker {
            let item =
                item.map_err(|source_err| ArchiveError::walkdir("tree.walk", &self.root, source_err))?;
            let path = item.path();
            let metadata = fs::symlink_metadata(path)
                .map_err(|source_err| ArchiveError::io("tree.metadata", path, source_err))?;
            let kind = EntryKind::from_file_type(metadata.file_type());
            let link_target = if metadata.file_type().is_symlink() {
                Some(
                    fs::read_link(path)
                        .map_err(|source_err| ArchiveError::io("tree.read_link", path, source_err))?,
                )
            } else {
                None
            };
            let name = self.cursor.entry_name(path)?;
            let size = if kind == EntryKind::RegularFile {
                metadata.len()
            } else {
                0
            };
            let entry = FilesystemEntry {
                name: &name,
                path,
                kind,
                size,
                metadata: &metadata,
                link_target: link_target.as_deref(),
            };

            let written = if kind == EntryKind::RegularFile {
                let mut file = File::open(path)
                    .map_err(|source_err| ArchiveError::io("tree.open_file", path, source_err))?;
                writer.append_file(&entry, &mut file)?
            } else {
                writer.append_header(&entry)?;
                0
            };
            trace!(entry = %name, bytes = written, "archived entry");
            stats.record(kind, written);
        }

        Ok(stats)
    }
}

impl ArchiveJob {
    /// Open the destination container, archive the source tree into it and
    /// close it. The container is closed on every path; a walk failure takes
    /// precedence over a close failure.
    ///
    /// # Errors
    ///
    /// Returns the walk failure, or the close failure after a clean walk.
    pub fn run(&self) -> ArchiveResult<ArchiveStats> {
        let mut container = ArchiveContainer::open(&self.destination, self.format, self.options)?;
        let archiver = TreeArchiver::new(&self.source);
        let walked = container
            .entry_writer()
            .and_then(|writer| archiver.archive(writer));

        match walked {
            Ok(stats) => {
                container.close()?;
                Ok(stats)
            }
            Err(err) => {
                warn!(
                    source = %self.source.display(),
                    destination = %self.destination.display(),
                    error = %error_chain(&err),
                    "archive walk failed; closing container"
                );
                container.abandon();
                Err(err)
            }
        }
    }
}
