/*!
Directory handles of the set currently being written.

A [`SetSession`] caches the backup root of the selected storage target, the directory of
the current set and its key-value and full-backup working directories. Handles are
created on first use and dropped together by [`SetSession::reset`], so a reset always
forces the next access to look at the provider again instead of trusting stale handles.
*/

use crate::naming::{DIRECTORY_FULL_BACKUP, DIRECTORY_KEY_VALUE_BACKUP, FILE_NO_MEDIA};
use crate::storage::DocumentTree;
use crate::token::BackupToken;
use crate::Result;
use std::sync::Arc;
use tracing::{debug, error};

/// Where persisted backup settings come from
pub trait SettingsSource: Send + Sync {
    /// Location of the storage target selected for backups, if any
    fn storage_location(&self) -> Option<String>;

    /// Token of the set last started on that target, if any
    fn backup_token(&self) -> Option<BackupToken>;
}

/// Cached handles, all invalidated together
#[derive(Debug)]
struct CachedDirs<H> {
    root: Option<H>,
    set: Option<H>,
    kv: Option<H>,
    full: Option<H>,
}

impl<H> Default for CachedDirs<H> {
    fn default() -> Self {
        Self {
            root: None,
            set: None,
            kv: None,
            full: None,
        }
    }
}

/// State of the current backup set on the selected storage target
pub struct SetSession<T: DocumentTree> {
    tree: Arc<T>,
    settings: Arc<dyn SettingsSource>,
    root_dir_name: String,
    token: Option<BackupToken>,
    dirs: CachedDirs<T::Handle>,
}

impl<T: DocumentTree> SetSession<T> {
    pub fn new(tree: Arc<T>, settings: Arc<dyn SettingsSource>, root_dir_name: impl Into<String>) -> Self {
        Self {
            tree,
            settings,
            root_dir_name: root_dir_name.into(),
            token: None,
            dirs: CachedDirs::default(),
        }
    }

    pub fn tree(&self) -> &Arc<T> {
        &self.tree
    }

    pub fn root_dir_name(&self) -> &str {
        &self.root_dir_name
    }

    /// Location of the selected storage target
    pub fn storage_location(&self) -> Option<String> {
        self.settings.storage_location()
    }

    /// Drop every cached handle.
    ///
    /// `Some(token)` also makes `token` the current set; `None` keeps the current token.
    pub fn reset(&mut self, new_token: Option<BackupToken>) {
        debug!("Resetting backup set session (new token: {:?})", new_token);
        if new_token.is_some() {
            self.token = new_token;
        }
        self.dirs = CachedDirs::default();
    }

    /// Token of the current set, falling back to the persisted settings
    pub fn current_token(&mut self) -> Option<BackupToken> {
        if self.token.is_none() {
            self.token = self.settings.backup_token();
        }
        self.token
    }

    /// Backup root on the selected target, created (with its no-media sentinel) if missing
    pub fn root_dir(&mut self) -> Option<T::Handle> {
        if self.dirs.root.is_none() {
            self.dirs.root = self.open_root_dir();
        }
        self.dirs.root.clone()
    }

    fn open_root_dir(&self) -> Option<T::Handle> {
        let location = self.settings.storage_location()?;
        let parent = self.tree.resolve(&location)?;
        let created = self
            .tree
            .create_or_get_directory(&parent, &self.root_dir_name)
            .and_then(|root| {
                self.tree.create_or_get_file(&root, FILE_NO_MEDIA)?;
                Ok(root)
            });
        match created {
            Ok(root) => Some(root),
            Err(e) => {
                error!("Error creating backup root in {}: {}", location, e);
                None
            }
        }
    }

    /// Directory of the current set, created if missing
    ///
    /// A current token of `0` means no set has been started yet.
    pub fn current_set_dir(&mut self) -> Option<T::Handle> {
        if self.dirs.set.is_none() {
            let token = self.current_token().filter(|t| t.value() != 0)?;
            let root = self.root_dir()?;
            self.dirs.set = self.create_dir_logged(&root, &token.dir_name());
        }
        self.dirs.set.clone()
    }

    /// Key-value working directory of the current set, created if missing
    pub fn current_kv_dir(&mut self) -> Option<T::Handle> {
        if self.dirs.kv.is_none() {
            let set = self.current_set_dir()?;
            self.dirs.kv = self.create_dir_logged(&set, DIRECTORY_KEY_VALUE_BACKUP);
        }
        self.dirs.kv.clone()
    }

    /// Full-backup working directory of the current set, created if missing
    pub fn current_full_dir(&mut self) -> Option<T::Handle> {
        if self.dirs.full.is_none() {
            let set = self.current_set_dir()?;
            self.dirs.full = self.create_dir_logged(&set, DIRECTORY_FULL_BACKUP);
        }
        self.dirs.full.clone()
    }

    /// Directory of the set for `token`.
    ///
    /// The current set is created on demand; any other set is only looked up.
    pub fn set_dir(&mut self, token: BackupToken) -> Result<Option<T::Handle>> {
        if self.current_token() == Some(token) {
            return Ok(self.current_set_dir());
        }
        let Some(root) = self.root_dir() else {
            return Ok(None);
        };
        self.tree.find_child(&root, &token.dir_name())
    }

    fn create_dir_logged(&self, parent: &T::Handle, name: &str) -> Option<T::Handle> {
        match self.tree.create_or_get_directory(parent, name) {
            Ok(dir) => Some(dir),
            Err(e) => {
                error!("Error creating directory {}: {}", name, e);
                None
            }
        }
    }
}
