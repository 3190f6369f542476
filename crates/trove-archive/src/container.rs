//! Destination file, compression layer and container writer lifecycle.
//!
//! # Design
//! - Acquire in order: file, then (tar.gz only) gzip encoder, then container writer.
//! - Release in strict reverse order; every step surfaces its own error.
//! - `close` is safe to call more than once; dropping an unclosed container closes it
//!   best-effort and logs the failure.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;
use tracing::warn;

use crate::entry::{EntryWriter, TarEntryWriter, ZipEntryWriter};
use crate::error::{ArchiveError, ArchiveResult};
use crate::model::{ArchiveFormat, ContainerOptions, MAX_COMPRESSION_LEVEL, WriteMode};

const PARTIAL_SUFFIX: &str = "partial";

enum ContainerWriter {
    TarGzip(TarEntryWriter<GzEncoder<File>>),
    Zip(ZipEntryWriter<File>),
}

/// An open archive destination owned by exactly one job.
pub struct ArchiveContainer {
    destination: PathBuf,
    staging: PathBuf,
    format: ArchiveFormat,
    write_mode: WriteMode,
    writer: Option<ContainerWriter>,
}

impl ArchiveContainer {
    /// Create the destination file and layer the format's writers over it.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be created (for example, because the
    /// parent directory is missing) and an invalid-input error for a compression
    /// level outside `0..=9`.
    pub fn open(
        destination: impl Into<PathBuf>,
        format: ArchiveFormat,
        options: ContainerOptions,
    ) -> ArchiveResult<Self> {
        if options.compression_level > MAX_COMPRESSION_LEVEL {
            return Err(ArchiveError::InvalidInput {
                field: "compression_level",
                reason: "out_of_range",
                value: Some(options.compression_level.to_string()),
            });
        }

        let destination = destination.into();
        let staging = match options.write_mode {
            WriteMode::Direct => destination.clone(),
            WriteMode::Atomic => staging_path(&destination),
        };

        let file = File::create(&staging)
            .map_err(|source_err| ArchiveError::io("container.create", &staging, source_err))?;

        let writer = match format {
            ArchiveFormat::TarGzip => {
                let encoder =
                    GzEncoder::new(file, Compression::new(options.compression_level));
                ContainerWriter::TarGzip(TarEntryWriter::new(encoder, &destination))
            }
            ArchiveFormat::Zip => ContainerWriter::Zip(ZipEntryWriter::new(
                file,
                &destination,
                options.compression_level,
            )),
        };

        Ok(Self {
            destination,
            staging,
            format,
            write_mode: options.write_mode,
            writer: Some(writer),
        })
    }

    /// Final path of the archive.
    #[must_use]
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Container format.
    #[must_use]
    pub const fn format(&self) -> ArchiveFormat {
        self.format
    }

    /// Whether `close` has already run.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.writer.is_none()
    }

    /// Borrow the entry writer for the open container.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::ContainerClosed`] after `close`.
    pub fn entry_writer(&mut self) -> ArchiveResult<&mut dyn EntryWriter> {
        match self.writer.as_mut() {
            Some(ContainerWriter::TarGzip(writer)) => Ok(writer),
            Some(ContainerWriter::Zip(writer)) => Ok(writer),
            None => Err(ArchiveError::ContainerClosed {
                path: self.destination.clone(),
            }),
        }
    }

    /// Finish the container writer, then the compression stream, then flush and
    /// release the file. Calling it again is a no-op.
    ///
    /// In atomic mode the staged file is renamed onto the destination after a
    /// clean close and removed after a failed one.
    ///
    /// # Errors
    ///
    /// Returns the first failure encountered while finishing any layer.
    pub fn close(&mut self) -> ArchiveResult<()> {
        let Some(writer) = self.writer.take() else {
            return Ok(());
        };
        let result = self.finish_layers(writer).and_then(|()| self.publish());
        if result.is_err() {
            self.discard_staging();
        }
        result
    }

    /// Close after a failed write: release every layer and drop any staged file.
    pub(crate) fn abandon(&mut self) {
        if let Some(writer) = self.writer.take() {
            if let Err(err) = self.finish_layers(writer) {
                warn!(
                    destination = %self.destination.display(),
                    error = %crate::error::error_chain(&err),
                    "failed to close abandoned archive container"
                );
            }
        }
        self.discard_staging();
    }

    fn finish_layers(&self, writer: ContainerWriter) -> ArchiveResult<()> {
        let mut file = match writer {
            ContainerWriter::TarGzip(tar) => {
                let encoder = tar.into_inner()?;
                encoder.finish().map_err(|source_err| {
                    ArchiveError::io("container.gzip_finish", &self.staging, source_err)
                })?
            }
            ContainerWriter::Zip(zip) => zip.finish()?,
        };
        file.flush()
            .map_err(|source_err| ArchiveError::io("container.flush", &self.staging, source_err))
    }

    fn publish(&self) -> ArchiveResult<()> {
        if self.write_mode == WriteMode::Direct {
            return Ok(());
        }
        fs::rename(&self.staging, &self.destination)
            .map_err(|source_err| ArchiveError::io("container.publish", &self.staging, source_err))
    }

    fn discard_staging(&self) {
        if self.write_mode == WriteMode::Direct {
            return;
        }
        if let Err(err) = fs::remove_file(&self.staging) {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(
                    path = %self.staging.display(),
                    error = %err,
                    "failed to remove staged archive"
                );
            }
        }
    }
}

impl Drop for ArchiveContainer {
    fn drop(&mut self) {
        if self.writer.is_some() {
            if let Err(err) = self.close() {
                warn!(
                    destination = %self.destination.display(),
                    error = %crate::error::error_chain(&err),
                    "archive container dropped without a clean close"
                );
            }
        }
    }
}

fn staging_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    name.push(".");
    name.push(PARTIAL_SUFFIX);
    destination.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use flate2::read::GzDecoder;
    use std::io::Read;
    use tempfile::TempDir;

    #[test]
    fn open_fails_when_parent_is_missing() -> Result<()> {
        let temp = TempDir::new()?;
        let destination = temp.path().join("missing").join("alice.tar.gz");
        let result = ArchiveContainer::open(
            &destination,
            ArchiveFormat::TarGzip,
            ContainerOptions::default(),
        );
        assert!(matches!(
            result,
            Err(ArchiveError::Io {
                operation: "container.create",
                ..
            })
        ));
        Ok(())
    }

    #[test]
    fn open_rejects_out_of_range_compression() -> Result<()> {
        let temp = TempDir::new()?;
        let options = ContainerOptions {
            compression_level: 12,
            ..ContainerOptions::default()
        };
        let result = ArchiveContainer::open(temp.path().join("a.zip"), ArchiveFormat::Zip, options);
        assert!(matches!(result, Err(ArchiveError::InvalidInput { .. })));
        Ok(())
    }

    #[test]
    fn close_is_idempotent_and_blocks_further_writes() -> Result<()> {
        let temp = TempDir::new()?;
        let destination = temp.path().join("empty.tar.gz");
        let mut container = ArchiveContainer::open(
            &destination,
            ArchiveFormat::TarGzip,
            ContainerOptions::default(),
        )?;
        assert_eq!(container.format(), ArchiveFormat::TarGzip);
        container.close()?;
        container.close()?;
        assert!(container.is_closed());
        assert!(matches!(
            container.entry_writer(),
            Err(ArchiveError::ContainerClosed { .. })
        ));

        let mut decoded = Vec::new();
        GzDecoder::new(File::open(&destination)?).read_to_end(&mut decoded)?;
        assert_eq!(decoded.len() % 512, 0);
        assert!(decoded.iter().all(|byte| *byte == 0));
        Ok(())
    }

    #[test]
    fn atomic_mode_publishes_only_on_close() -> Result<()> {
        let temp = TempDir::new()?;
        let destination = temp.path().join("bob.zip");
        let options = ContainerOptions {
            write_mode: WriteMode::Atomic,
            ..ContainerOptions::default()
        };
        let mut container = ArchiveContainer::open(&destination, ArchiveFormat::Zip, options)?;
        let staged = temp.path().join("bob.zip.partial");
        assert!(staged.exists());
        assert!(!destination.exists());

        container.close()?;
        assert!(destination.exists());
        assert!(!staged.exists());
        Ok(())
    }

    #[test]
    fn abandon_removes_staged_file() -> Result<()> {
        let temp = TempDir::new()?;
        let destination = temp.path().join("carol.tar.gz");
        let options = ContainerOptions {
            write_mode: WriteMode::Atomic,
            ..ContainerOptions::default()
        };
        let mut container = ArchiveContainer::open(&destination, ArchiveFormat::TarGzip, options)?;
        container.abandon();
        assert!(!destination.exists());
        assert!(!temp.path().join("carol.tar.gz.partial").exists());
        Ok(())
    }

    #[test]
    fn drop_closes_open_container() -> Result<()> {
        let temp = TempDir::new()?;
        let destination = temp.path().join("dropped.zip");
        {
            let _container = ArchiveContainer::open(
                &destination,
                ArchiveFormat::Zip,
                ContainerOptions::default(),
            )?;
        }
        let archive = zip::ZipArchive::new(File::open(&destination)?)?;
        assert_eq!(archive.len(), 0);
        Ok(())
    }
}
