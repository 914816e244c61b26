/*!
Async access to a blocking [`BackupPlugin`].

Every plugin operation may block on storage round-trips. [`AsyncVaultPlugin`] moves each
call onto tokio's blocking thread pool so async callers never stall a worker thread.
The shared mutex serializes operations, which is the serialization the plugin expects
from its caller.
*/

use crate::plugin::{BackupPlugin, EncryptedMetadata};
use crate::token::BackupToken;
use crate::{Result, VaultError};
use async_trait::async_trait;
use std::io::{Read, Write};
use std::sync::{Arc, Mutex};

/// Async counterpart of [`BackupPlugin`]
#[async_trait]
pub trait AsyncBackupPlugin: Send + Sync {
    async fn start_new_restore_set(&self, token: BackupToken) -> Result<()>;
    async fn initialize_device(&self) -> Result<()>;
    async fn has_data(&self, token: BackupToken, name: &str) -> Result<bool>;
    async fn get_output_stream(&self, token: BackupToken, name: &str) -> Result<Box<dyn Write + Send>>;
    async fn get_input_stream(&self, token: BackupToken, name: &str) -> Result<Box<dyn Read + Send>>;
    async fn remove_data(&self, token: BackupToken, name: &str) -> Result<()>;
    async fn has_backup(&self, location: &str) -> Result<bool>;
    /// Restore candidates, collected on the blocking pool
    async fn available_backups(&self) -> Result<Option<Vec<EncryptedMetadata>>>;
    async fn provider_package_name(&self) -> Result<Option<String>>;
}

/// Runs a blocking plugin on tokio's blocking pool
pub struct AsyncVaultPlugin<P> {
    inner: Arc<Mutex<P>>,
}

impl<P> Clone for AsyncVaultPlugin<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: BackupPlugin + Send + 'static> AsyncVaultPlugin<P> {
    pub fn new(plugin: P) -> Self {
        Self {
            inner: Arc::new(Mutex::new(plugin)),
        }
    }

    async fn run<F, R>(&self, op: F) -> Result<R>
    where
        F: FnOnce(&mut P) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let mut plugin = inner
                .lock()
                .map_err(|_| VaultError::storage("Backup plugin lock poisoned"))?;
            op(&mut *plugin)
        })
        .await
        .map_err(|e| VaultError::storage(format!("Blocking plugin task failed: {e}")))?
    }
}

#[async_trait]
impl<P: BackupPlugin + Send + 'static> AsyncBackupPlugin for AsyncVaultPlugin<P> {
    async fn start_new_restore_set(&self, token: BackupToken) -> Result<()> {
        self.run(move |p| p.start_new_restore_set(token)).await
    }

    async fn initialize_device(&self) -> Result<()> {
        self.run(|p| p.initialize_device()).await
    }

    async fn has_data(&self, token: BackupToken, name: &str) -> Result<bool> {
        let name = name.to_string();
        self.run(move |p| p.has_data(token, &name)).await
    }

    async fn get_output_stream(&self, token: BackupToken, name: &str) -> Result<Box<dyn Write + Send>> {
        let name = name.to_string();
        self.run(move |p| p.get_output_stream(token, &name)).await
    }

    async fn get_input_stream(&self, token: BackupToken, name: &str) -> Result<Box<dyn Read + Send>> {
        let name = name.to_string();
        self.run(move |p| p.get_input_stream(token, &name)).await
    }

    async fn remove_data(&self, token: BackupToken, name: &str) -> Result<()> {
        let name = name.to_string();
        self.run(move |p| p.remove_data(token, &name)).await
    }

    async fn has_backup(&self, location: &str) -> Result<bool> {
        let location = location.to_string();
        self.run(move |p| p.has_backup(&location)).await
    }

    async fn available_backups(&self) -> Result<Option<Vec<EncryptedMetadata>>> {
        self.run(|p| Ok(p.available_backups().map(|backups| backups.collect())))
            .await
    }

    async fn provider_package_name(&self) -> Result<Option<String>> {
        self.run(|p| Ok(p.provider_package_name().map(str::to_string)))
            .await
    }
}
