/*!
Backup set tokens.

A token is the epoch-millisecond timestamp a backup set was started at. It is both the
set's identifier and the literal name of its directory under the backup root, always
written as exactly 13 decimal digits. That shape holds until the year 2286.
*/

use chrono::{DateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static TOKEN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{13}$").expect("token pattern is a valid regex"));

/// Identifier of a backup set, doubling as its directory name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackupToken(u64);

impl BackupToken {
    /// Wrap a raw token value
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Token for a set started at the given instant
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self(at.timestamp_millis().max(0) as u64)
    }

    /// Token for a set started now
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Raw numeric value
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Parse a directory name into a token.
    ///
    /// Returns `None` unless `name` is exactly 13 decimal digits. The numeric parse only
    /// runs after the lexical check, so a failure there is a logic error and panics.
    pub fn parse(name: &str) -> Option<Self> {
        if !TOKEN_PATTERN.is_match(name) {
            return None;
        }
        let value = name
            .parse::<u64>()
            .unwrap_or_else(|e| unreachable!("token-shaped name {name:?} failed to parse: {e}"));
        Some(Self(value))
    }

    /// Canonical directory name for this token, zero-padded to 13 digits
    pub fn dir_name(self) -> String {
        self.to_string()
    }

    /// Creation time encoded in the token, if it is a representable instant
    pub fn created_at(self) -> Option<DateTime<Utc>> {
        let millis = i64::try_from(self.0).ok()?;
        Utc.timestamp_millis_opt(millis).single()
    }
}

impl fmt::Display for BackupToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:013}", self.0)
    }
}

impl From<u64> for BackupToken {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<BackupToken> for u64 {
    fn from(token: BackupToken) -> Self {
        token.0
    }
}
