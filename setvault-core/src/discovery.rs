/*!
Backup set discovery.

Scans the backup root of a storage target for token-named directories that contain a
metadata artifact. Discovery is best-effort: a failed top-level listing yields no sets,
and problems with a single entry only exclude that entry. Entries are processed one at
a time in the order the provider returned them.
*/

use crate::naming::{is_unexpected_entry, FILE_BACKUP_METADATA};
use crate::storage::DocumentTree;
use crate::token::BackupToken;
use tracing::{error, warn};

#[cfg(feature = "metrics")]
use crate::observability::VaultMetrics;

/// A discoverable backup set: its token and its located metadata artifact.
///
/// Only built once the metadata artifact has been found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupSet<H> {
    pub token: BackupToken,
    pub metadata: H,
}

/// Find every valid backup set directly below `root_dir`.
pub fn discover_backup_sets<T>(tree: &T, root_dir: &T::Handle) -> Vec<BackupSet<T::Handle>>
where
    T: DocumentTree + ?Sized,
{
    #[cfg(feature = "metrics")]
    VaultMetrics::global().record_discovery();

    let mut backup_sets = Vec::new();
    let entries = match tree.list_children(root_dir) {
        Ok(entries) => entries,
        Err(e) => {
            error!("Error loading backups from storage: {}", e);
            #[cfg(feature = "metrics")]
            VaultMetrics::global().record_storage_error();
            return backup_sets;
        }
    };

    for entry in entries {
        // the name may be a provider query, fetch it once
        let name = tree.name(&entry);

        let Some(token) = token_of_entry(tree, &entry, name.as_deref()) else {
            #[cfg(feature = "metrics")]
            VaultMetrics::global().record_skipped_entry();
            continue;
        };
        let name = name.unwrap_or_default();

        let metadata = match tree.find_child(&entry, FILE_BACKUP_METADATA) {
            Ok(metadata) => metadata,
            Err(e) => {
                error!("Error reading metadata file in backup set folder {}: {}", name, e);
                #[cfg(feature = "metrics")]
                VaultMetrics::global().record_storage_error();
                None
            }
        };
        match metadata {
            Some(metadata) => {
                #[cfg(feature = "metrics")]
                VaultMetrics::global().record_set_discovered();
                backup_sets.push(BackupSet { token, metadata });
            }
            None => {
                warn!("Missing metadata file in backup set folder: {}", name);
                #[cfg(feature = "metrics")]
                VaultMetrics::global().record_skipped_entry();
            }
        }
    }
    backup_sets
}

/// Token of an entry that looks like a backup set folder.
///
/// The directory check is a provider query, so it only runs once the name already
/// has the token shape.
fn token_of_entry<T>(tree: &T, entry: &T::Handle, name: Option<&str>) -> Option<BackupToken>
where
    T: DocumentTree + ?Sized,
{
    let token = name.and_then(BackupToken::parse);
    if token.is_none() || !tree.is_directory(entry) {
        if let Some(name) = name.filter(|n| is_unexpected_entry(n)) {
            warn!("Found invalid backup set folder: {}", name);
        }
        return None;
    }
    token
}
