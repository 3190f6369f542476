//! Raw and validated batch settings.
//!
//! # Design
//! - `BatchSettings` mirrors whatever the operator typed (CLI flags, env, or a
//!   serialized document) and is never trusted.
//! - `BatchConfig` only exists after validation, so holders can rely on
//!   absolute roots, a positive concurrency and a parsed format.

use std::num::NonZeroUsize;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use trove_archive::{ArchiveFormat, ContainerOptions, DEFAULT_COMPRESSION_LEVEL, WriteMode};

use crate::defaults::{
    DEFAULT_CONCURRENCY, DEFAULT_DESTINATION_ROOT, DEFAULT_FORMAT, DEFAULT_SOURCE_ROOT,
};
use crate::error::ConfigResult;
use crate::validate::{
    ensure_disjoint, normalize_start_at, parse_compression_level, parse_concurrency, parse_format,
    parse_limit, resolve_root,
};

/// Unvalidated batch settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchSettings {
    /// Directory whose children are date directories.
    pub source_root: PathBuf,
    /// Directory receiving `<date>/<name>.<ext>` archives.
    pub destination_root: PathBuf,
    /// Format selector (`tar.gz` or `zip`).
    pub format: String,
    /// Number of date directories archived at once.
    pub concurrency: i64,
    /// First date directory name to archive.
    pub start_at: Option<String>,
    /// Maximum number of date directories to dispatch.
    pub limit: Option<i64>,
    /// Compression level (0..=9).
    pub compression_level: Option<u32>,
    /// Stage archives in `.partial` files and rename on success.
    pub atomic: bool,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            source_root: PathBuf::from(DEFAULT_SOURCE_ROOT),
            destination_root: PathBuf::from(DEFAULT_DESTINATION_ROOT),
            format: DEFAULT_FORMAT.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            start_at: None,
            limit: None,
            compression_level: None,
            atomic: false,
        }
    }
}

impl BatchSettings {
    /// Validate every field and resolve both roots to absolute paths.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`](crate::ConfigError) encountered.
    pub fn validate(&self) -> ConfigResult<BatchConfig> {
        let format = parse_format(&self.format)?;
        let concurrency = parse_concurrency(self.concurrency)?;
        let limit = parse_limit(self.limit)?;
        let compression_level =
            parse_compression_level(self.compression_level.unwrap_or(DEFAULT_COMPRESSION_LEVEL))?;
        let source_root = resolve_root("source_root", &self.source_root)?;
        let destination_root = resolve_root("destination_root", &self.destination_root)?;
        ensure_disjoint(&source_root, &destination_root)?;

        Ok(BatchConfig {
            source_root,
            destination_root,
            format,
            concurrency,
            start_at: normalize_start_at(self.start_at.as_deref()),
            limit,
            options: ContainerOptions {
                compression_level,
                write_mode: if self.atomic {
                    WriteMode::Atomic
                } else {
                    WriteMode::Direct
                },
            },
        })
    }
}

/// Validated batch configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    /// Absolute source root.
    pub source_root: PathBuf,
    /// Absolute destination root.
    pub destination_root: PathBuf,
    /// Container format shared by every leaf.
    pub format: ArchiveFormat,
    /// Maximum number of date tasks archiving at once.
    pub concurrency: NonZeroUsize,
    /// First eligible date directory; `None` makes all eligible.
    pub start_at: Option<String>,
    /// Maximum number of dispatched date directories; `None` is unlimited.
    pub limit: Option<u64>,
    /// Options applied to every container.
    pub options: ContainerOptions,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate_to_tar_gz_with_single_slot() {
        let config = BatchSettings::default().validate().unwrap();
        assert_eq!(config.format, ArchiveFormat::TarGzip);
        assert_eq!(config.concurrency.get(), 1);
        assert!(config.source_root.is_absolute());
        assert!(config.source_root.ends_with("test_tar_dir"));
        assert!(config.destination_root.ends_with("tmp"));
        assert_eq!(config.limit, None);
        assert_eq!(config.options, ContainerOptions::default());
    }

    #[test]
    fn atomic_flag_selects_write_mode() {
        let settings = BatchSettings {
            atomic: true,
            compression_level: Some(9),
            ..BatchSettings::default()
        };
        let config = settings.validate().unwrap();
        assert_eq!(config.options.write_mode, WriteMode::Atomic);
        assert_eq!(config.options.compression_level, 9);
    }
}
