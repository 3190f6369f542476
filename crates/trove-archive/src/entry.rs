//! Per-format entry writers.
//!
//! # Design
//! - One small capability trait implemented once per container format.
//! - Header-only entries and header-plus-payload entries are separate calls so the
//!   walk never branches on format.
//! - Payloads are streamed through a fixed-size copy buffer; nothing buffers a whole file.

use std::io::{self, Read, Seek, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Timelike, Utc};
use tar::{EntryType, Header, HeaderMode};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{ArchiveError, ArchiveResult};
use crate::model::{ArchiveFormat, EntryKind, FilesystemEntry};
use crate::path::directory_entry_name;

/// Writes walked filesystem entries into an open archive stream.
pub trait EntryWriter {
    /// Container format produced by this writer.
    fn format(&self) -> ArchiveFormat;

    /// Name stored in the container for an entry of the given kind.
    /// Directories carry a trailing `/` in both formats.
    fn stored_name(&self, name: &str, kind: EntryKind) -> String {
        match kind {
            EntryKind::Directory => directory_entry_name(name),
            EntryKind::RegularFile | EntryKind::Other => name.to_string(),
        }
    }

    /// Record an entry that carries no payload (directories, symlinks, devices).
    ///
    /// # Errors
    ///
    /// Returns an error when the container stream rejects the header.
    fn append_header(&mut self, entry: &FilesystemEntry<'_>) -> ArchiveResult<()>;

    /// Record a regular file and stream exactly `entry.size` bytes from `contents`.
    ///
    /// # Errors
    ///
    /// Returns an error when reading the source or writing the container fails,
    /// including when the source yields fewer bytes than its recorded size.
    fn append_file(
        &mut self,
        entry: &FilesystemEntry<'_>,
        contents: &mut dyn Read,
    ) -> ArchiveResult<u64>;
}

/// Tar entry writer layered over any byte sink (typically a gzip encoder).
pub struct TarEntryWriter<W: Write> {
    builder: tar::Builder<W>,
    destination: PathBuf,
}

impl<W: Write> TarEntryWriter<W> {
    /// Wrap `inner`; `destination` is only used for error context.
    pub fn new(inner: W, destination: impl Into<PathBuf>) -> Self {
        Self {
            builder: tar::Builder::new(inner),
            destination: destination.into(),
        }
    }

    /// Write the end-of-archive marker and hand back the underlying sink.
    ///
    /// # Errors
    ///
    /// Returns an error if the trailing blocks cannot be written.
    pub fn into_inner(self) -> ArchiveResult<W> {
        let destination = self.destination;
        self.builder
            .into_inner()
            .map_err(|source_err| ArchiveError::io("tar.finish", destination, source_err))
    }

    fn header_for(entry: &FilesystemEntry<'_>) -> Header {
        let mut header = Header::new_ustar();
        header.set_metadata_in_mode(entry.metadata, HeaderMode::Complete);
        match entry.kind {
            EntryKind::RegularFile => header.set_size(entry.size),
            EntryKind::Directory => {
                header.set_entry_type(EntryType::Directory);
                header.set_size(0);
            }
            EntryKind::Other => header.set_size(0),
        }
        header
    }

    /// Directory names are written into the header verbatim so the trailing
    /// `/` survives; names longer than the header field are preceded by a GNU
    /// long-name record carrying the full name.
    fn append_directory(&mut self, header: &mut Header, name: &str) -> io::Result<()> {
        let bytes = name.as_bytes();
        if bytes.len() > header.as_old().name.len() {
            self.append_long_name(bytes)?;
        }
        let field = &mut header.as_old_mut().name;
        let stored = &bytes[..bytes.len().min(field.len())];
        field.fill(0);
        field[..stored.len()].copy_from_slice(stored);
        header.set_cksum();
        self.builder.append(header, io::empty())
    }

    fn append_long_name(&mut self, name: &[u8]) -> io::Result<()> {
        const LONG_LINK: &[u8] = b"././@LongLink";
        let mut record = Header::new_gnu();
        record.as_old_mut().name[..LONG_LINK.len()].copy_from_slice(LONG_LINK);
        record.set_mode(0o644);
        record.set_uid(0);
        record.set_gid(0);
        record.set_mtime(0);
        record.set_size(u64::try_from(name.len() + 1).map_err(io::Error::other)?);
        record.set_entry_type(EntryType::GNULongName);
        record.set_cksum();
        self.builder.append(&record, name.chain(&[0_u8][..]))
    }
}

impl<W: Write> EntryWriter for TarEntryWriter<W> {
    fn format(&self) -> ArchiveFormat {
        ArchiveFormat::TarGzip
    }

    fn append_header(&mut self, entry: &FilesystemEntry<'_>) -> ArchiveResult<()> {
        let mut header = Self::header_for(entry);
        let name = self.stored_name(entry.name, entry.kind);
        let result = match entry.link_target {
            Some(target) if entry.is_symlink() => {
                self.builder.append_link(&mut header, &name, target)
            }
            _ if matches!(entry.kind, EntryKind::Directory) => {
                self.append_directory(&mut header, &name)
            }
            _ => self.builder.append_data(&mut header, &name, io::empty()),
        };
        result.map_err(|source_err| ArchiveError::io("tar.append_header", entry.path, source_err))
    }

    fn append_file(
        &mut self,
        entry: &FilesystemEntry<'_>,
        contents: &mut dyn Read,
    ) -> ArchiveResult<u64> {
        let mut header = Self::header_for(entry);
        let name = self.stored_name(entry.name, entry.kind);
        let mut reader = ExactReader::new(contents, entry.size);
        self.builder
            .append_data(&mut header, &name, &mut reader)
            .map_err(|source_err| ArchiveError::io("tar.append_file", entry.path, source_err))?;
        Ok(entry.size)
    }
}

/// Zip entry writer; each file entry is deflated on its own.
pub struct ZipEntryWriter<W: Write + Seek> {
    writer: ZipWriter<W>,
    destination: PathBuf,
    compression_level: i32,
}

impl<W: Write + Seek> ZipEntryWriter<W> {
    /// Wrap `inner`; `destination` is only used for error context.
    pub fn new(inner: W, destination: impl Into<PathBuf>, compression_level: u32) -> Self {
        Self {
            writer: ZipWriter::new(inner),
            destination: destination.into(),
            compression_level: i32::try_from(compression_level).unwrap_or(i32::MAX),
        }
    }

    /// Write the central directory and hand back the underlying sink.
    ///
    /// # Errors
    ///
    /// Returns an error if the central directory cannot be written.
    pub fn finish(mut self) -> ArchiveResult<W> {
        self.writer
            .finish()
            .map_err(|source_err| ArchiveError::zip("zip.finish", &self.destination, source_err))
    }

    fn base_options(entry: &FilesystemEntry<'_>) -> FileOptions {
        FileOptions::default()
            .compression_method(CompressionMethod::Stored)
            .unix_permissions(entry.mode() & 0o7777)
            .last_modified_time(zip_timestamp(entry.metadata))
    }

    fn payload_options(&self, entry: &FilesystemEntry<'_>) -> FileOptions {
        // zip refuses to write past 4 GiB unless the entry is declared ZIP64 up front.
        let options =
            Self::base_options(entry).large_file(entry.size >= u64::from(u32::MAX));
        // Level 0 means no compression; store rather than deflate.
        if self.compression_level == 0 {
            return options;
        }
        options
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(self.compression_level))
    }
}

impl<W: Write + Seek> EntryWriter for ZipEntryWriter<W> {
    fn format(&self) -> ArchiveFormat {
        ArchiveFormat::Zip
    }

    fn append_header(&mut self, entry: &FilesystemEntry<'_>) -> ArchiveResult<()> {
        let name = self.stored_name(entry.name, entry.kind);
        let options = Self::base_options(entry);
        let result = match (entry.kind, entry.link_target) {
            (EntryKind::Directory, _) => self.writer.add_directory(name, options),
            (_, Some(target)) if entry.is_symlink() => {
                let target = target.to_str().ok_or_else(|| ArchiveError::InvalidInput {
                    field: "link_target",
                    reason: "non_utf8",
                    value: Some(target.to_string_lossy().into_owned()),
                })?;
                self.writer.add_symlink(name, target, options)
            }
            _ => self.writer.start_file(name, options),
        };
        result.map_err(|source_err| ArchiveError::zip("zip.append_header", entry.path, source_err))
    }

    fn append_file(
        &mut self,
        entry: &FilesystemEntry<'_>,
        contents: &mut dyn Read,
    ) -> ArchiveResult<u64> {
        let name = self.stored_name(entry.name, entry.kind);
        let options = self.payload_options(entry);
        self.writer
            .start_file(name, options)
            .map_err(|source_err| ArchiveError::zip("zip.start_file", entry.path, source_err))?;
        let mut reader = ExactReader::new(contents, entry.size);
        io::copy(&mut reader, &mut self.writer)
            .map_err(|source_err| ArchiveError::io("zip.append_file", entry.path, source_err))
    }
}

/// DOS timestamp for a node, falling back to the zip epoch when the mtime is
/// unavailable or outside the representable 1980..=2107 range.
fn zip_timestamp(metadata: &std::fs::Metadata) -> zip::DateTime {
    let Ok(modified) = metadata.modified() else {
        return zip::DateTime::default();
    };
    let modified: DateTime<Utc> = modified.into();
    let fields = (
        u16::try_from(modified.year()),
        u8::try_from(modified.month()),
        u8::try_from(modified.day()),
        u8::try_from(modified.hour()),
        u8::try_from(modified.minute()),
        u8::try_from(modified.second()),
    );
    match fields {
        (Ok(year), Ok(month), Ok(day), Ok(hour), Ok(minute), Ok(second)) => {
            zip::DateTime::from_date_and_time(year, month, day, hour, minute, second)
                .unwrap_or_default()
        }
        _ => zip::DateTime::default(),
    }
}

/// Yields exactly `expected` bytes, failing if the source ends early so a
/// header's recorded size always matches the payload that follows it.
struct ExactReader<'a> {
    inner: io::Take<&'a mut dyn Read>,
    remaining: u64,
}

impl<'a> ExactReader<'a> {
    fn new(inner: &'a mut dyn Read, expected: u64) -> Self {
        Self {
            inner: inner.take(expected),
            remaining: expected,
        }
    }
}

impl Read for ExactReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let read = self.inner.read(buf)?;
        if read == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "source ended before its recorded size",
            ));
        }
        self.remaining -= u64::try_from(read).map_err(io::Error::other)?;
        Ok(read)
    }
}

/// Whether an entry name is safe to extract beneath any root.
#[must_use]
pub fn is_safe_entry_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('/')
        && !Path::new(name)
            .components()
            .any(|component| !matches!(component, std::path::Component::Normal(_)))
}
