//! Two-level source layout: `<source>/<date>/<name>/...`.

use std::ffi::{OsStr, OsString};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;
use trove_archive::ArchiveFormat;

/// An immediate subdirectory discovered while listing a level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subdirectory {
    /// Directory name as text (lossy for non UTF-8 names).
    pub name: String,
    /// Raw directory name.
    pub file_name: OsString,
    /// Absolute path of the directory.
    pub path: PathBuf,
}

/// List the immediate subdirectories of `dir` in lexicographic name order.
/// Files, symlinks and other nodes are skipped.
///
/// # Errors
///
/// Returns the IO error raised while reading the directory.
pub fn list_subdirectories(dir: &Path) -> io::Result<Vec<Subdirectory>> {
    let mut found = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if !file_type.is_dir() {
            debug!(path = %entry.path().display(), "skipping non-directory");
            continue;
        }
        let file_name = entry.file_name();
        found.push(Subdirectory {
            name: file_name.to_string_lossy().into_owned(),
            file_name,
            path: entry.path(),
        });
    }
    found.sort_by(|left, right| left.file_name.cmp(&right.file_name));
    Ok(found)
}

/// `<dir>/<name>.<ext>` built without a lossy round trip through UTF-8.
#[must_use]
pub fn archive_destination(dir: &Path, name: &OsStr, format: ArchiveFormat) -> PathBuf {
    let mut file_name = name.to_os_string();
    file_name.push(".");
    file_name.push(format.extension());
    dir.join(file_name)
}
