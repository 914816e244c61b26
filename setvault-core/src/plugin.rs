/*!
Backup plugin that stores backup sets on a document tree.

This is the surface the backup engine talks to. It manages the lifecycle of the current
set, gives out item streams scoped to a token, checks storage targets for existing
backups and lists restore candidates.

Two error policies apply. Operations that write or need a set to exist propagate
storage failures to the caller. Scans (`has_backup` once its location resolved,
`available_backups`) degrade to fewer results and log what they skipped.
*/

use crate::discovery::{discover_backup_sets, BackupSet};
use crate::session::{SetSession, SettingsSource};
use crate::storage::DocumentTree;
use crate::token::BackupToken;
use crate::{Result, VaultConfig, VaultError};
use once_cell::sync::OnceCell;
use std::fmt;
use std::io::{Read, Write};
use std::iter::FusedIterator;
use std::sync::Arc;
use tracing::{debug, info};

/// Resolves the component that owns a storage provider, for provenance display
#[cfg_attr(test, mockall::automock)]
pub trait ProviderResolver: Send + Sync {
    /// Identity of the component serving `authority`, if known
    fn package_for_authority(&self, authority: &str) -> Option<String>;
}

/// Opens a fresh read stream on every call
pub type InputFactory = Box<dyn Fn() -> Result<Box<dyn Read + Send>> + Send + Sync>;

/// Restore candidate: a set's token and a deferred reader for its encrypted metadata
///
/// Nothing is opened until [`EncryptedMetadata::open`] is called.
pub struct EncryptedMetadata {
    pub token: BackupToken,
    input: InputFactory,
}

impl EncryptedMetadata {
    pub fn new<F>(token: BackupToken, input: F) -> Self
    where
        F: Fn() -> Result<Box<dyn Read + Send>> + Send + Sync + 'static,
    {
        Self {
            token,
            input: Box::new(input),
        }
    }

    /// Open the metadata artifact of this set
    pub fn open(&self) -> Result<Box<dyn Read + Send>> {
        (self.input)()
    }
}

impl fmt::Debug for EncryptedMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedMetadata")
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

/// Single-pass cursor over the sets found by one discovery run
pub struct AvailableBackups<T: DocumentTree> {
    tree: Arc<T>,
    sets: std::vec::IntoIter<BackupSet<T::Handle>>,
}

impl<T: DocumentTree + 'static> Iterator for AvailableBackups<T> {
    type Item = EncryptedMetadata;

    fn next(&mut self) -> Option<EncryptedMetadata> {
        let BackupSet { token, metadata } = self.sets.next()?;
        let tree = Arc::clone(&self.tree);
        Some(EncryptedMetadata::new(token, move || tree.open_read(&metadata)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.sets.size_hint()
    }
}

impl<T: DocumentTree + 'static> ExactSizeIterator for AvailableBackups<T> {}

impl<T: DocumentTree + 'static> FusedIterator for AvailableBackups<T> {}

/// Operations the backup engine performs against a storage backend
///
/// All operations may block on storage round-trips. Mutating operations must not run
/// concurrently for the same token; the caller serializes them.
pub trait BackupPlugin {
    /// Cursor type returned by [`BackupPlugin::available_backups`]
    type Backups: Iterator<Item = EncryptedMetadata>;

    /// Make `token` the current set and ensure the backup root exists
    fn start_new_restore_set(&mut self, token: BackupToken) -> Result<()>;

    /// Wipe the current set and recreate its working directories
    fn initialize_device(&mut self) -> Result<()>;

    /// True if an item named `name` exists in the set for `token`
    fn has_data(&mut self, token: BackupToken, name: &str) -> Result<bool>;

    /// Writer for an item, creating it if missing
    fn get_output_stream(&mut self, token: BackupToken, name: &str) -> Result<Box<dyn Write + Send>>;

    /// Reader for an existing item
    fn get_input_stream(&mut self, token: BackupToken, name: &str) -> Result<Box<dyn Read + Send>>;

    /// Delete an item if it exists
    fn remove_data(&mut self, token: BackupToken, name: &str) -> Result<()>;

    /// True if the storage target at `location` holds at least one backup set
    fn has_backup(&self, location: &str) -> Result<bool>;

    /// Restore candidates on the selected target, or `None` if it has no backup root
    fn available_backups(&mut self) -> Option<Self::Backups>;

    /// Component owning the selected storage provider, resolved once
    fn provider_package_name(&self) -> Option<&str>;
}

/// [`BackupPlugin`] storing each backup set as a token-named directory on a document tree
pub struct DocumentTreePlugin<T: DocumentTree> {
    tree: Arc<T>,
    session: SetSession<T>,
    resolver: Arc<dyn ProviderResolver>,
    provider_package: OnceCell<Option<String>>,
}

impl<T: DocumentTree> DocumentTreePlugin<T> {
    /// Create a plugin over `tree`
    ///
    /// # Arguments
    /// * `tree` - The storage provider
    /// * `settings` - Source of the selected storage location and persisted token
    /// * `resolver` - Maps provider authorities to owning components
    /// * `root_dir_name` - Name of the backup root on the selected target
    pub fn new(
        tree: Arc<T>,
        settings: Arc<dyn SettingsSource>,
        resolver: Arc<dyn ProviderResolver>,
        root_dir_name: impl Into<String>,
    ) -> Self {
        let session = SetSession::new(Arc::clone(&tree), settings, root_dir_name);
        Self {
            tree,
            session,
            resolver,
            provider_package: OnceCell::new(),
        }
    }

    /// Create a plugin whose settings and provider table come from `config`
    pub fn from_config(tree: Arc<T>, config: VaultConfig) -> Result<Self> {
        config.validate()?;
        let root_dir_name = config.root_dir_name.clone();
        let config = Arc::new(config);
        Ok(Self::new(tree, config.clone(), config, root_dir_name))
    }

    /// Current-set state, used by the key-value and full-backup data plugins
    pub fn session(&mut self) -> &mut SetSession<T> {
        &mut self.session
    }

    fn existing_set_dir(&mut self, token: BackupToken) -> Result<T::Handle> {
        self.session
            .set_dir(token)
            .map_err(VaultError::into_io)?
            .ok_or_else(|| VaultError::io(format!("No backup set directory for token {token}")))
    }
}

impl<T: DocumentTree + 'static> BackupPlugin for DocumentTreePlugin<T> {
    type Backups = AvailableBackups<T>;

    fn start_new_restore_set(&mut self, token: BackupToken) -> Result<()> {
        info!("Starting new backup set {}", token);
        self.session.reset(Some(token));
        self.session
            .root_dir()
            .ok_or_else(|| VaultError::io("Could not get or create the backup root directory"))?;
        Ok(())
    }

    fn initialize_device(&mut self) -> Result<()> {
        if let Some(set_dir) = self.session.current_set_dir() {
            debug!("Wiping current backup set {:?}", set_dir);
            self.tree.delete_contents(&set_dir)?;
        }

        // handles into the wiped set are stale now
        self.session.reset(None);

        self.session
            .current_kv_dir()
            .ok_or_else(|| VaultError::io("Could not create the key-value backup directory"))?;
        self.session
            .current_full_dir()
            .ok_or_else(|| VaultError::io("Could not create the full backup directory"))?;
        Ok(())
    }

    fn has_data(&mut self, token: BackupToken, name: &str) -> Result<bool> {
        let Some(set_dir) = self.session.set_dir(token).map_err(VaultError::into_io)? else {
            return Ok(false);
        };
        let item = self.tree.find_child(&set_dir, name).map_err(VaultError::into_io)?;
        Ok(item.is_some())
    }

    fn get_output_stream(&mut self, token: BackupToken, name: &str) -> Result<Box<dyn Write + Send>> {
        let set_dir = self.existing_set_dir(token)?;
        let file = self
            .tree
            .create_or_get_file(&set_dir, name)
            .map_err(VaultError::into_io)?;
        self.tree.open_write(&file).map_err(VaultError::into_io)
    }

    fn get_input_stream(&mut self, token: BackupToken, name: &str) -> Result<Box<dyn Read + Send>> {
        let set_dir = self.existing_set_dir(token)?;
        let file = self
            .tree
            .find_child(&set_dir, name)
            .map_err(VaultError::into_io)?
            .ok_or_else(|| VaultError::not_found(format!("{name} in backup set {token}")))?;
        self.tree.open_read(&file).map_err(VaultError::into_io)
    }

    fn remove_data(&mut self, token: BackupToken, name: &str) -> Result<()> {
        let set_dir = self.existing_set_dir(token)?;
        let Some(file) = self.tree.find_child(&set_dir, name).map_err(VaultError::into_io)? else {
            return Ok(());
        };
        self.tree.delete(&file).map_err(VaultError::into_io)
    }

    fn has_backup(&self, location: &str) -> Result<bool> {
        let parent = self.tree.resolve(location).ok_or_else(|| {
            VaultError::invariant(format!("Storage location cannot be resolved: {location}"))
        })?;
        let Some(root_dir) = self.tree.find_child(&parent, self.session.root_dir_name())? else {
            return Ok(false);
        };
        Ok(!discover_backup_sets(self.tree.as_ref(), &root_dir).is_empty())
    }

    fn available_backups(&mut self) -> Option<AvailableBackups<T>> {
        let root_dir = self.session.root_dir()?;
        let sets = discover_backup_sets(self.tree.as_ref(), &root_dir);
        Some(AvailableBackups {
            tree: Arc::clone(&self.tree),
            sets: sets.into_iter(),
        })
    }

    fn provider_package_name(&self) -> Option<&str> {
        self.provider_package
            .get_or_init(|| {
                let location = self.session.storage_location()?;
                let authority = self.tree.authority(&location)?;
                self.resolver.package_for_authority(&authority)
            })
            .as_deref()
    }
}
