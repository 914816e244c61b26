//! Reserved names in the backup tree and the classifier for entries that do not belong.

use once_cell::sync::Lazy;
use regex::Regex;

/// Default name of the directory holding all backup sets on a storage target
pub const DIRECTORY_ROOT: &str = ".SeedVaultAndroidBackup";
/// Metadata artifact that makes a token directory a valid backup set
pub const FILE_BACKUP_METADATA: &str = ".backup.metadata";
/// Sentinel keeping media scanners out of the backup root
pub const FILE_NO_MEDIA: &str = ".nomedia";
/// Full-backup working directory inside a set
pub const DIRECTORY_FULL_BACKUP: &str = "full";
/// Key-value working directory inside a set
pub const DIRECTORY_KEY_VALUE_BACKUP: &str = "kv";
/// Suffix of snapshot files that live next to the backup sets
pub const SNAPSHOT_SUFFIX: &str = ".SeedSnap";

static CHUNK_FOLDER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-f0-9]{2}$").expect("chunk folder pattern is a valid regex"));

/// True if `name` is a content-addressed chunk folder name.
pub fn is_chunk_folder(name: &str) -> bool {
    CHUNK_FOLDER_PATTERN.is_match(name)
}

/// True if `name` is none of the artifacts expected next to backup sets.
///
/// Only used to decide whether a skipped entry is worth a warning.
pub fn is_unexpected_entry(name: &str) -> bool {
    name != FILE_NO_MEDIA && !is_chunk_folder(name) && !name.ends_with(SNAPSHOT_SUFFIX)
}
