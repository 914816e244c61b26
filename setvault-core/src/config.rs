//! Configuration for the backup plugin
//!
//! This module provides the persisted backup settings: which storage target is
//! selected, the name of the backup root on it, the token of the set last started,
//! and a static table of provider authorities to owning components.

use crate::naming::DIRECTORY_ROOT;
use crate::plugin::ProviderResolver;
use crate::session::SettingsSource;
use crate::token::BackupToken;
use crate::{Result, VaultError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Persisted backup settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Location of the selected storage target (a path or `file://` URI for local storage)
    pub storage_location: Option<String>,
    /// Name of the directory holding all backup sets on the target
    pub root_dir_name: String,
    /// Token of the set last started, if any
    pub token: Option<u64>,
    /// Provider authority to owning component, used for provenance display
    pub providers: BTreeMap<String, String>,
}

impl VaultConfig {
    /// Create a configuration for the given storage target with defaults elsewhere
    pub fn for_location<S: Into<String>>(location: S) -> Self {
        Self {
            storage_location: Some(location.into()),
            ..Self::default()
        }
    }

    /// Load a configuration from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            VaultError::config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration to a JSON file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.validate()?;
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), raw)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let name = self.root_dir_name.as_str();
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(VaultError::config(format!(
                "Invalid backup root directory name: {name:?}"
            )));
        }
        if BackupToken::parse(name).is_some() {
            return Err(VaultError::config(
                "Backup root directory name must not look like a backup token",
            ));
        }
        if matches!(&self.storage_location, Some(location) if location.trim().is_empty()) {
            return Err(VaultError::config("Storage location must not be empty"));
        }
        Ok(())
    }
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            storage_location: None,
            root_dir_name: DIRECTORY_ROOT.to_string(),
            token: None,
            providers: BTreeMap::new(),
        }
    }
}

impl SettingsSource for VaultConfig {
    fn storage_location(&self) -> Option<String> {
        self.storage_location.clone()
    }

    fn backup_token(&self) -> Option<BackupToken> {
        self.token.map(BackupToken::new)
    }
}

impl ProviderResolver for VaultConfig {
    fn package_for_authority(&self, authority: &str) -> Option<String> {
        self.providers.get(authority).cloned()
    }
}
