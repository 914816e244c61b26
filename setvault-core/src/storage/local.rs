/*!
Local filesystem document tree.
*/

use super::DocumentTree;
use crate::{Result, VaultError};
use std::fs::{self, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

/// Local filesystem document tree
///
/// Handles are absolute or base-relative paths. Locations may be plain paths or
/// `file://` URIs; relative locations are resolved against the optional base directory.
///
/// # Example
/// ```rust
/// use setvault_core::storage::{DocumentTree, LocalDocumentTree};
///
/// let dir = std::env::temp_dir();
/// let tree = LocalDocumentTree::new();
/// let root = tree.resolve(dir.to_str().unwrap()).unwrap();
/// assert!(tree.is_directory(&root));
/// ```
#[derive(Debug, Clone, Default)]
pub struct LocalDocumentTree {
    /// Optional base directory for relative locations
    base_dir: Option<PathBuf>,
}

impl LocalDocumentTree {
    /// Authority reported for every local location
    pub const AUTHORITY: &'static str = "setvault.localfs";

    /// Create a local tree that resolves relative locations against the working directory
    pub fn new() -> Self {
        Self { base_dir: None }
    }

    /// Create a local tree that resolves relative locations against `base_dir`
    pub fn with_base_dir<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: Some(base_dir.as_ref().to_path_buf()),
        }
    }

    /// Resolve the full path for a given location
    fn resolve_path(&self, location: &str) -> PathBuf {
        let path = Path::new(location.strip_prefix("file://").unwrap_or(location));
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Child path for a document name, rejecting names that would escape the parent
    fn child_path(parent: &Path, name: &str) -> Result<PathBuf> {
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(VaultError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Invalid document name: {name:?}"),
            )));
        }
        Ok(parent.join(name))
    }
}

/// Keep the error kind but say which path it was about
fn with_path(err: io::Error, action: &str, path: &Path) -> VaultError {
    VaultError::Io(io::Error::new(
        err.kind(),
        format!("Failed to {action} {}: {err}", path.display()),
    ))
}

impl DocumentTree for LocalDocumentTree {
    type Handle = PathBuf;

    fn name(&self, doc: &PathBuf) -> Option<String> {
        doc.file_name().map(|n| n.to_string_lossy().into_owned())
    }

    fn is_directory(&self, doc: &PathBuf) -> bool {
        doc.is_dir()
    }

    fn list_children(&self, dir: &PathBuf) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(dir).map_err(|e| with_path(e, "list", dir))?;
        let mut children = entries
            .map(|entry| entry.map(|e| e.path()))
            .collect::<io::Result<Vec<_>>>()
            .map_err(|e| with_path(e, "list", dir))?;
        // read_dir order is unspecified; present a stable provider order
        children.sort();
        Ok(children)
    }

    fn find_child(&self, dir: &PathBuf, name: &str) -> Result<Option<PathBuf>> {
        let path = Self::child_path(dir, name)?;
        match fs::symlink_metadata(&path) {
            Ok(_) => Ok(Some(path)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(with_path(e, "look up", &path)),
        }
    }

    fn create_directory(&self, parent: &PathBuf, name: &str) -> Result<PathBuf> {
        let path = Self::child_path(parent, name)?;
        fs::create_dir(&path).map_err(|e| with_path(e, "create directory", &path))?;
        Ok(path)
    }

    fn create_file(&self, parent: &PathBuf, name: &str) -> Result<PathBuf> {
        let path = Self::child_path(parent, name)?;
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| with_path(e, "create file", &path))?;
        Ok(path)
    }

    fn delete(&self, doc: &PathBuf) -> Result<()> {
        let result = if doc.is_dir() {
            fs::remove_dir_all(doc)
        } else {
            fs::remove_file(doc)
        };
        result.map_err(|e| with_path(e, "delete", doc))
    }

    fn open_read(&self, doc: &PathBuf) -> Result<Box<dyn Read + Send>> {
        let file = fs::File::open(doc).map_err(|e| with_path(e, "open", doc))?;
        Ok(Box::new(file))
    }

    fn open_write(&self, doc: &PathBuf) -> Result<Box<dyn Write + Send>> {
        let file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(doc)
            .map_err(|e| with_path(e, "open", doc))?;
        Ok(Box::new(file))
    }

    fn resolve(&self, location: &str) -> Option<PathBuf> {
        if location.is_empty() {
            return None;
        }
        let path = self.resolve_path(location);
        path.is_dir().then_some(path)
    }

    fn authority(&self, location: &str) -> Option<String> {
        self.resolve(location).map(|_| Self::AUTHORITY.to_string())
    }
}
