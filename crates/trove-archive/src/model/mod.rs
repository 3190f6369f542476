//! Domain models for the archive writer.
//!
//! # Design
//! - Keep request/response types lightweight and copyable.
//! - Avoid embedding IO handles; callers supply references.

use std::fmt;
use std::fs::{FileType, Metadata};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ArchiveError;

/// Default compression level applied to gzip streams and deflated zip entries.
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;
/// Highest compression level accepted by the encoders.
pub const MAX_COMPRESSION_LEVEL: u32 = 9;

/// Container format produced for every leaf of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveFormat {
    /// POSIX ustar entries inside a gzip stream.
    TarGzip,
    /// Zip local headers plus central directory, entries deflated individually.
    Zip,
}

impl ArchiveFormat {
    /// File extension (without the leading dot) used for produced archives.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::TarGzip => "tar.gz",
            Self::Zip => "zip",
        }
    }

    /// Stable label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TarGzip => "tar_gzip",
            Self::Zip => "zip",
        }
    }

    /// Destination file name for an archived directory called `stem`.
    #[must_use]
    pub fn file_name(self, stem: &str) -> String {
        format!("{stem}.{}", self.extension())
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ArchiveFormat {
    type Err = ArchiveError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "tar.gz" => Ok(Self::TarGzip),
            "zip" => Ok(Self::Zip),
            _ => Err(ArchiveError::UnsupportedFormat {
                value: value.to_string(),
            }),
        }
    }
}

/// Classification of a walked filesystem node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Regular file whose bytes are streamed into the entry payload.
    RegularFile,
    /// Directory; header only.
    Directory,
    /// Symlink, device, socket or fifo; header only.
    Other,
}

impl EntryKind {
    /// Classify a file type without following symlinks.
    #[must_use]
    pub fn from_file_type(file_type: FileType) -> Self {
        if file_type.is_file() {
            Self::RegularFile
        } else if file_type.is_dir() {
            Self::Directory
        } else {
            Self::Other
        }
    }
}

/// Transient view of one walked node, consumed immediately by an entry writer.
#[derive(Debug, Clone, Copy)]
pub struct FilesystemEntry<'a> {
    /// Normalised archive entry name, relative and `/`-separated.
    pub name: &'a str,
    /// Absolute path of the node on disk.
    pub path: &'a Path,
    /// Node classification.
    pub kind: EntryKind,
    /// Payload size in bytes; zero for anything but regular files.
    pub size: u64,
    /// Metadata captured without following symlinks.
    pub metadata: &'a Metadata,
    /// Target of a symlink node.
    pub link_target: Option<&'a Path>,
}

impl FilesystemEntry<'_> {
    /// Whether the node is a symlink.
    #[must_use]
    pub fn is_symlink(&self) -> bool {
        self.metadata.file_type().is_symlink()
    }

    /// Unix permission bits (including the file type bits) when available.
    #[must_use]
    pub fn mode(&self) -> u32 {
        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            self.metadata.mode()
        }
        #[cfg(not(unix))]
        {
            match self.kind {
                EntryKind::Directory => 0o040_755,
                EntryKind::RegularFile | EntryKind::Other => 0o100_644,
            }
        }
    }
}

/// How the destination file is materialised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Write straight into the destination; failures may leave a truncated file.
    #[default]
    Direct,
    /// Write into a `.partial` sibling and rename it into place after a clean close.
    Atomic,
}

/// Tunables applied when opening a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerOptions {
    /// Compression level in `0..=9`.
    pub compression_level: u32,
    /// Destination write strategy.
    pub write_mode: WriteMode,
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self {
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            write_mode: WriteMode::Direct,
        }
    }
}

/// Counters describing one successfully written archive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveStats {
    /// Total number of entries written.
    pub entries: u64,
    /// Regular-file entries.
    pub files: u64,
    /// Directory entries.
    pub directories: u64,
    /// Symlink, device, socket and fifo entries.
    pub others: u64,
    /// Payload bytes copied from regular files.
    pub bytes: u64,
}

impl ArchiveStats {
    pub(crate) const fn record(&mut self, kind: EntryKind, bytes: u64) {
        self.entries += 1;
        self.bytes += bytes;
        match kind {
            EntryKind::RegularFile => self.files += 1,
            EntryKind::Directory => self.directories += 1,
            EntryKind::Other => self.others += 1,
        }
    }

    /// Fold another archive's counters into this one.
    pub const fn merge(&mut self, other: &Self) {
        self.entries += other.entries;
        self.files += other.files;
        self.directories += other.directories;
        self.others += other.others;
        self.bytes += other.bytes;
    }
}

/// One leaf unit of work: archive `source` into `destination`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveJob {
    /// Absolute path of the directory to archive.
    pub source: PathBuf,
    /// Absolute path of the archive file to produce.
    pub destination: PathBuf,
    /// Container format.
    pub format: ArchiveFormat,
    /// Container tunables.
    pub options: ContainerOptions,
}
