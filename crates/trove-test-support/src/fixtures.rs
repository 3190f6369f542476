//! Source tree fixtures.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;
use walkdir::WalkDir;

/// A temporary `src/` + `dest/` pair laid out the way a batch expects.
pub struct BatchLayout {
    temp: TempDir,
}

impl BatchLayout {
    /// Create an empty layout with both roots present.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary directories cannot be created.
    pub fn new() -> Result<Self> {
        let temp = TempDir::new().context("create temp dir")?;
        fs::create_dir_all(temp.path().join("src")).context("create source root")?;
        fs::create_dir_all(temp.path().join("dest")).context("create destination root")?;
        Ok(Self { temp })
    }

    /// Directory holding both roots.
    #[must_use]
    pub fn base(&self) -> &Path {
        self.temp.path()
    }

    /// Source root (`<base>/src`).
    #[must_use]
    pub fn source_root(&self) -> PathBuf {
        self.temp.path().join("src")
    }

    /// Destination root (`<base>/dest`).
    #[must_use]
    pub fn destination_root(&self) -> PathBuf {
        self.temp.path().join("dest")
    }

    /// Write `contents` to `src/<relative>`, creating parents.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or its parents cannot be written.
    pub fn file(&self, relative: &str, contents: &[u8]) -> Result<PathBuf> {
        write_file(&self.source_root(), relative, contents)
    }

    /// Create `src/<relative>` as a directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn dir(&self, relative: &str) -> Result<PathBuf> {
        make_dir(&self.source_root(), relative)
    }

    /// Path of the archive a batch produces for `date/name` with `extension`.
    #[must_use]
    pub fn archive_path(&self, date: &str, name: &str, extension: &str) -> PathBuf {
        self.destination_root()
            .join(date)
            .join(format!("{name}.{extension}"))
    }
}

/// Write `contents` to `root/<relative>`, creating parent directories.
///
/// # Errors
///
/// Returns an error if any directory or the file cannot be written.
pub fn write_file(root: &Path, relative: &str, contents: &[u8]) -> Result<PathBuf> {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}

/// Create `root/<relative>` and any missing parents.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn make_dir(root: &Path, relative: &str) -> Result<PathBuf> {
    let path = root.join(relative);
    fs::create_dir_all(&path).with_context(|| format!("create {}", path.display()))?;
    Ok(path)
}

/// One node of a snapshotted tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Directory.
    Dir,
    /// Regular file and its bytes.
    File(Vec<u8>),
    /// Symlink and its target.
    Link(PathBuf),
}

/// Capture every node beneath `root` keyed by its `/`-separated relative path.
/// The root itself is keyed as `""`.
///
/// # Errors
///
/// Returns an error if the tree cannot be walked or a file cannot be read.
pub fn snapshot_tree(root: &Path) -> Result<BTreeMap<String, Node>> {
    let mut nodes = BTreeMap::new();
    for item in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let item = item.with_context(|| format!("walk {}", root.display()))?;
        let relative = item
            .path()
            .strip_prefix(root)
            .context("walked path outside root")?
            .components()
            .map(|component| component.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        let file_type = item.file_type();
        let node = if file_type.is_symlink() {
            Node::Link(fs::read_link(item.path())?)
        } else if file_type.is_dir() {
            Node::Dir
        } else {
            Node::File(fs::read(item.path()).with_context(|| format!("read {}", item.path().display()))?)
        };
        nodes.insert(relative, node);
    }
    Ok(nodes)
}
