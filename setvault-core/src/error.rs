/*!
Error types for the SetVault core.
*/

use thiserror::Error;

/// Result type used throughout the SetVault core.
pub type Result<T> = std::result::Result<T, VaultError>;

/// Errors that can occur while managing backup sets.
#[derive(Error, Debug)]
pub enum VaultError {
    /// I/O errors reported by the storage provider
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A specifically requested item does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Something the code relies on structurally was violated; never retried
    #[error("Invariant violated: {0}")]
    Invariant(String),

    /// Storage provider errors that are not plain I/O errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl VaultError {
    /// Create a new not-found error
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new invariant error
    pub fn invariant<S: Into<String>>(msg: S) -> Self {
        Self::Invariant(msg.into())
    }

    /// Create a new storage error
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create an I/O error of kind `Other` with the given message
    pub fn io<S: Into<String>>(msg: S) -> Self {
        Self::Io(std::io::Error::new(std::io::ErrorKind::Other, msg.into()))
    }

    /// Fold provider-specific failures into `Io`, keeping `NotFound` and `Invariant`
    pub fn into_io(self) -> Self {
        match self {
            Self::Io(_) | Self::NotFound(_) | Self::Invariant(_) => self,
            other => Self::io(other.to_string()),
        }
    }

    /// True if the error means "the item does not exist", as opposed to "could not check".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// True for invariant violations that callers must not downgrade or retry.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Invariant(_))
    }
}
