/*!
Document-tree storage providers.

This module defines the storage abstraction (port) the backup plugin is written against,
and concrete implementations (adapters). A provider exposes a tree of named documents
that can only be listed, looked up by name, created, deleted and opened as streams;
there is no path-based random access. Every call may be a round-trip to a slow
provider, so callers should query as little as possible (for example, read an entry's
name once and reuse it).
*/

#[cfg(feature = "local")]
pub mod local;
#[cfg(test)]
pub mod memory;

use crate::{Result, VaultError};
use std::fmt::Debug;
use std::io::{Read, Write};
use tracing::warn;

/// Hierarchical storage provider holding backup sets
///
/// Handles are opaque references owned by the provider. Implementations decide how
/// expensive each call is; the plugin assumes every call may block.
pub trait DocumentTree: Send + Sync {
    /// Reference to a single document (file or directory)
    type Handle: Clone + Debug + Send + Sync + 'static;

    /// Display name of a document, if the provider can still resolve it
    fn name(&self, doc: &Self::Handle) -> Option<String>;

    /// True if the document is a directory
    fn is_directory(&self, doc: &Self::Handle) -> bool;

    /// List the immediate children of a directory, in provider order
    fn list_children(&self, dir: &Self::Handle) -> Result<Vec<Self::Handle>>;

    /// Look up a direct child by name
    ///
    /// # Returns
    /// `Ok(None)` if no such child exists, an error if the lookup itself failed
    fn find_child(&self, dir: &Self::Handle, name: &str) -> Result<Option<Self::Handle>>;

    /// Create a new directory under `parent`
    fn create_directory(&self, parent: &Self::Handle, name: &str) -> Result<Self::Handle>;

    /// Create a new, empty file under `parent`
    fn create_file(&self, parent: &Self::Handle, name: &str) -> Result<Self::Handle>;

    /// Delete a document; directories are deleted with their contents
    fn delete(&self, doc: &Self::Handle) -> Result<()>;

    /// Open a document for reading
    fn open_read(&self, doc: &Self::Handle) -> Result<Box<dyn Read + Send>>;

    /// Open a document for writing, truncating existing content
    fn open_write(&self, doc: &Self::Handle) -> Result<Box<dyn Write + Send>>;

    /// Resolve an externally supplied storage location to a directory handle
    ///
    /// # Returns
    /// `None` if the location cannot be interpreted by this provider at all
    fn resolve(&self, location: &str) -> Option<Self::Handle>;

    /// Authority (provider identity) serving the given location
    fn authority(&self, location: &str) -> Option<String>;

    /// Return the named child directory, creating it if missing
    fn create_or_get_directory(&self, parent: &Self::Handle, name: &str) -> Result<Self::Handle> {
        if let Some(existing) = self.find_child(parent, name)? {
            return Ok(existing);
        }
        let created = self.create_directory(parent, name)?;
        ensure_created_name(self, &created, name, "Directory")?;
        Ok(created)
    }

    /// Return the named child file, creating it if missing
    fn create_or_get_file(&self, parent: &Self::Handle, name: &str) -> Result<Self::Handle> {
        if let Some(existing) = self.find_child(parent, name)? {
            return Ok(existing);
        }
        let created = self.create_file(parent, name)?;
        ensure_created_name(self, &created, name, "File")?;
        Ok(created)
    }

    /// Delete every child of a directory, keeping the directory itself
    ///
    /// Failing to list the directory is an error. Children that fail to delete are
    /// logged and skipped.
    fn delete_contents(&self, dir: &Self::Handle) -> Result<()> {
        for child in self.list_children(dir)? {
            if let Err(e) = self.delete(&child) {
                warn!("Failed to delete {:?}: {}", child, e);
            }
        }
        Ok(())
    }
}

/// Providers may silently rename a document on a name clash; that breaks name lookups.
fn ensure_created_name<T: DocumentTree + ?Sized>(
    tree: &T,
    created: &T::Handle,
    expected: &str,
    kind: &str,
) -> Result<()> {
    match tree.name(created) {
        Some(actual) if actual == expected => Ok(()),
        actual => Err(VaultError::io(format!(
            "{kind} named {actual:?}, but should be {expected}"
        ))),
    }
}

// Re-export types for convenience
#[cfg(feature = "local")]
pub use local::LocalDocumentTree;
#[cfg(test)]
pub use memory::MemoryDocumentTree;
