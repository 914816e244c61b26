/*!
# SetVault Core

Storage plugin for a backup engine that keeps each backup set in its own directory on a
hierarchical document-tree provider.

This crate provides:

- Token naming: every set lives in a directory named after its 13-digit
  epoch-millisecond token
- Discovery of valid backup sets (token directory plus metadata artifact) on a storage
  target, tolerating the chunk folders and snapshot files stored next to them
- A plugin managing the current set's directories and giving out per-item streams
- A local filesystem provider, and an async wrapper for tokio callers (feature `async-rt`)

## Architecture

The plugin is written against the [`DocumentTree`] port. Providers only offer
list/find/create/delete/open operations on named documents, so the plugin never
assumes path-based access and queries the provider as little as possible.

## Usage

```rust
use setvault_core::{BackupPlugin, BackupToken, DocumentTreePlugin, LocalDocumentTree, VaultConfig};
use std::io::Write;
use std::sync::Arc;

let device = std::env::temp_dir().join(format!("setvault-doc-{}", std::process::id()));
std::fs::create_dir_all(&device)?;

let config = VaultConfig::for_location(device.to_string_lossy());
let mut plugin = DocumentTreePlugin::from_config(Arc::new(LocalDocumentTree::new()), config)?;

let token = BackupToken::now();
plugin.start_new_restore_set(token)?;
plugin.initialize_device()?;
plugin.get_output_stream(token, ".backup.metadata")?.write_all(b"encrypted metadata")?;

let backups: Vec<_> = plugin.available_backups().into_iter().flatten().collect();
assert!(backups.iter().any(|b| b.token == token));
# std::fs::remove_dir_all(&device)?;
# Ok::<(), Box<dyn std::error::Error>>(())
```
*/

pub mod config;
pub mod discovery;
pub mod error;
pub mod naming;
pub mod observability;
pub mod plugin;
#[cfg(feature = "async-rt")]
pub mod runtime;
pub mod session;
pub mod storage;
pub mod token;

#[cfg(test)]
mod test_support;

pub use config::VaultConfig;
pub use discovery::{discover_backup_sets, BackupSet};
pub use error::{Result, VaultError};
pub use plugin::{AvailableBackups, BackupPlugin, DocumentTreePlugin, EncryptedMetadata, ProviderResolver};
#[cfg(feature = "async-rt")]
pub use runtime::{AsyncBackupPlugin, AsyncVaultPlugin};
pub use session::{SetSession, SettingsSource};
pub use storage::DocumentTree;
#[cfg(feature = "local")]
pub use storage::LocalDocumentTree;
pub use token::BackupToken;
