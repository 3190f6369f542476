//! Archive entry name normalisation.
//!
//! Entry names are derived purely from the walked path and a known base; the
//! process working directory is never consulted.

use std::path::{Component, Path, PathBuf};

use crate::error::{ArchiveError, ArchiveResult};

/// Normalise a path into a relative, `/`-separated archive entry name.
///
/// Leading separators (and any platform prefix) are stripped so the stored
/// name can never be absolute. `.` segments are dropped and `..` segments are
/// rejected.
///
/// # Errors
///
/// Returns [`ArchiveError::InvalidInput`] when the path contains a parent
/// segment, a non UTF-8 segment, or nothing to name.
pub fn normalize_entry_name(path: &Path) -> ArchiveResult<String> {
    let mut segments = Vec::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::CurDir => {}
            Component::Normal(segment) => {
                let segment = segment.to_str().ok_or_else(|| ArchiveError::InvalidInput {
                    field: "entry_name",
                    reason: "non_utf8_segment",
                    value: Some(path.to_string_lossy().into_owned()),
                })?;
                segments.push(segment);
            }
            Component::ParentDir => {
                return Err(ArchiveError::InvalidInput {
                    field: "entry_name",
                    reason: "parent_segment",
                    value: Some(path.to_string_lossy().into_owned()),
                });
            }
        }
    }

    if segments.is_empty() {
        return Err(ArchiveError::InvalidInput {
            field: "entry_name",
            reason: "empty",
            value: Some(path.to_string_lossy().into_owned()),
        });
    }

    Ok(segments.join("/"))
}

/// Append the trailing separator zip extractors use to recognise directories.
#[must_use]
pub fn directory_entry_name(name: &str) -> String {
    if name.ends_with('/') {
        name.to_string()
    } else {
        format!("{name}/")
    }
}

/// Derives entry names relative to the parent of a traversal root, so an
/// archive of `/data/2024-01-01/alice` stores `alice/...`.
#[derive(Debug, Clone)]
pub struct PathCursor {
    base: PathBuf,
}

impl PathCursor {
    /// Build a cursor for a traversal rooted at `root`.
    #[must_use]
    pub fn for_root(root: &Path) -> Self {
        let base = root.parent().map(Path::to_path_buf).unwrap_or_default();
        Self { base }
    }

    /// Base stripped from every walked path.
    #[must_use]
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Entry name for a path discovered underneath the traversal root.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::InvalidInput`] when `walked` is not below the
    /// cursor base or does not normalise to a safe name.
    pub fn entry_name(&self, walked: &Path) -> ArchiveResult<String> {
        let relative = walked
            .strip_prefix(&self.base)
            .map_err(|_| ArchiveError::InvalidInput {
                field: "walked_path",
                reason: "outside_root",
                value: Some(walked.to_string_lossy().into_owned()),
            })?;
        normalize_entry_name(relative)
    }
}
