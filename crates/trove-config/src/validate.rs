//! Validation helpers and parsing utilities for batch settings.

use std::num::NonZeroUsize;
use std::path::{Component, Path, PathBuf};

use trove_archive::{ArchiveFormat, MAX_COMPRESSION_LEVEL};

use crate::error::{ConfigError, ConfigResult};

pub(crate) fn parse_format(value: &str) -> ConfigResult<ArchiveFormat> {
    value
        .parse::<ArchiveFormat>()
        .map_err(|source| ConfigError::InvalidFormat {
            value: value.to_string(),
            source,
        })
}

pub(crate) fn parse_concurrency(value: i64) -> ConfigResult<NonZeroUsize> {
    usize::try_from(value)
        .ok()
        .and_then(NonZeroUsize::new)
        .ok_or_else(|| ConfigError::InvalidField {
            field: "concurrency",
            value: Some(value.to_string()),
            reason: "must_be_positive",
        })
}

pub(crate) fn parse_limit(value: Option<i64>) -> ConfigResult<Option<u64>> {
    value
        .map(|limit| {
            u64::try_from(limit).map_err(|_| ConfigError::InvalidField {
                field: "limit",
                value: Some(limit.to_string()),
                reason: "must_not_be_negative",
            })
        })
        .transpose()
}

pub(crate) fn parse_compression_level(value: u32) -> ConfigResult<u32> {
    if value > MAX_COMPRESSION_LEVEL {
        return Err(ConfigError::InvalidField {
            field: "compression_level",
            value: Some(value.to_string()),
            reason: "out_of_range",
        });
    }
    Ok(value)
}

pub(crate) fn normalize_start_at(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

/// Make `value` absolute against the current directory without changing it,
/// then fold `.` and `..` lexically.
pub(crate) fn resolve_root(field: &'static str, value: &Path) -> ConfigResult<PathBuf> {
    if value.as_os_str().is_empty() {
        return Err(ConfigError::InvalidField {
            field,
            value: None,
            reason: "empty",
        });
    }
    let absolute = std::path::absolute(value).map_err(|source| ConfigError::Io {
        operation: "resolve_root",
        path: value.to_path_buf(),
        source,
    })?;
    Ok(lexical_normalize(&absolute))
}

pub(crate) fn lexical_normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component);
                }
            }
            Component::Prefix(_) | Component::RootDir | Component::Normal(_) => {
                normalized.push(component);
            }
        }
    }
    normalized
}

/// The destination root must not sit inside (or equal) the source root, or
/// it would be enumerated as a date directory.
pub(crate) fn ensure_disjoint(source: &Path, destination: &Path) -> ConfigResult<()> {
    if destination.starts_with(source) {
        return Err(ConfigError::InvalidField {
            field: "destination_root",
            value: Some(destination.display().to_string()),
            reason: "inside_source_root",
        });
    }
    Ok(())
}
