//! Archive inspection helpers for round-trip assertions.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use flate2::read::GzDecoder;

/// Kind of a listed archive entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListedKind {
    /// Regular file.
    File,
    /// Directory.
    Dir,
    /// Symlink.
    Symlink,
    /// Anything else.
    Other,
}

/// One entry read back from an archive, in container order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedEntry {
    /// Name exactly as stored.
    pub name: String,
    /// Entry kind.
    pub kind: ListedKind,
    /// Payload bytes.
    pub contents: Vec<u8>,
}

impl ListedEntry {
    /// Payload as UTF-8 text (lossy).
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.contents).into_owned()
    }
}

/// Read every entry of a `.tar.gz` file.
///
/// # Errors
///
/// Returns an error if the file is not a readable gzip-compressed tar stream.
pub fn list_tar_gz(path: &Path) -> Result<Vec<ListedEntry>> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    let mut listed = Vec::new();
    for entry in archive.entries().context("read tar entries")? {
        let mut entry = entry.context("read tar entry")?;
        let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
        let kind = match entry.header().entry_type() {
            tar::EntryType::Regular => ListedKind::File,
            tar::EntryType::Directory => ListedKind::Dir,
            tar::EntryType::Symlink => ListedKind::Symlink,
            _ => ListedKind::Other,
        };
        let mut contents = Vec::new();
        entry
            .read_to_end(&mut contents)
            .with_context(|| format!("read tar payload {name}"))?;
        listed.push(ListedEntry {
            name,
            kind,
            contents,
        });
    }
    Ok(listed)
}

/// Read every entry of a `.zip` file.
///
/// # Errors
///
/// Returns an error if the file is not a readable zip archive.
pub fn list_zip(path: &Path) -> Result<Vec<ListedEntry>> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut archive = zip::ZipArchive::new(file).context("read zip directory")?;
    let mut listed = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).context("read zip entry")?;
        let name = entry.name().to_string();
        let is_symlink = entry
            .unix_mode()
            .is_some_and(|mode| mode & 0o170_000 == 0o120_000);
        let kind = if entry.is_dir() {
            ListedKind::Dir
        } else if is_symlink {
            ListedKind::Symlink
        } else if entry.is_file() {
            ListedKind::File
        } else {
            ListedKind::Other
        };
        let mut contents = Vec::new();
        entry
            .read_to_end(&mut contents)
            .with_context(|| format!("read zip payload {name}"))?;
        listed.push(ListedEntry {
            name,
            kind,
            contents,
        });
    }
    Ok(listed)
}

/// Unpack a `.tar.gz` file beneath `destination`.
///
/// # Errors
///
/// Returns an error if the archive cannot be read or unpacked.
pub fn extract_tar_gz(path: &Path, destination: &Path) -> Result<()> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    tar::Archive::new(GzDecoder::new(file))
        .unpack(destination)
        .with_context(|| format!("unpack {}", path.display()))
}

/// Unpack a `.zip` file beneath `destination`.
///
/// # Errors
///
/// Returns an error if the archive cannot be read or unpacked.
pub fn extract_zip(path: &Path, destination: &Path) -> Result<()> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    zip::ZipArchive::new(file)
        .context("read zip directory")?
        .extract(destination)
        .with_context(|| format!("unpack {}", path.display()))
}

/// Entry names in container order.
#[must_use]
pub fn names(entries: &[ListedEntry]) -> Vec<&str> {
    entries.iter().map(|entry| entry.name.as_str()).collect()
}
