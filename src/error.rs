//! Custom error types for TextVault
//!
//! This module defines the error hierarchy for the vault engine using thiserror.
//! Every variant maps to a stable process exit code so scripts driving the CLI
//! can branch on the kind of failure.

use thiserror::Error;

/// The main error type for TextVault operations
#[derive(Error, Debug)]
pub enum VaultError {
    /// The entry (or its primary file) does not exist
    #[error("Entry not found: {0}")]
    EntryNotFound(String),

    /// An entry with this name already exists
    #[error("Entry already exists: {0}")]
    EntryAlreadyExists(String),

    /// The entry name is empty or contains forbidden characters
    #[error("Invalid entry name '{name}': {reason}")]
    InvalidEntryName { name: String, reason: &'static str },

    /// No backup matches the request
    #[error("Backup not found for '{entry}': {detail}")]
    BackupNotFound { entry: String, detail: String },

    /// A date specification matched no backup
    #[error("No backup of '{entry}' matches '{spec}'")]
    AmbiguousOrMissingBackup { entry: String, spec: String },

    /// The backup specification could not be parsed
    #[error("Invalid backup specification: {0} (expected latest, N, YYYY_MM_DD or YYYY_MM_DD-hh:mm:ss)")]
    InvalidBackupSpec(String),

    /// The vault is not registered
    #[error("Vault not found: {0}")]
    VaultNotFound(String),

    /// A vault with this name is already registered
    #[error("Vault already exists: {0}")]
    VaultAlreadyExists(String),

    /// No vault has been selected with `switch`
    #[error("No current vault selected. Use 'tvault vault switch <name>' first")]
    NoCurrentVault,

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// The backup index disagrees with the files on disk
    #[error("Index inconsistency for '{entry}': index has {indexed}, disk has {on_disk}")]
    IndexInconsistency {
        entry: String,
        indexed: usize,
        on_disk: usize,
    },

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Vault archive errors
    #[error("Archive error: {0}")]
    Archive(String),

    /// External editor errors
    #[error("Editor error: {0}")]
    Editor(String),
}

impl VaultError {
    /// Create an "entry not found" error
    pub fn entry_not_found(name: impl Into<String>) -> Self {
        Self::EntryNotFound(name.into())
    }

    /// Create a "backup not found" error
    pub fn backup_not_found(entry: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::BackupNotFound {
            entry: entry.into(),
            detail: detail.into(),
        }
    }

    /// Create a "vault not found" error
    pub fn vault_not_found(name: impl Into<String>) -> Self {
        Self::VaultNotFound(name.into())
    }

    /// Process exit code for this error kind
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::EntryNotFound(_) => 2,
            Self::EntryAlreadyExists(_) => 3,
            Self::BackupNotFound { .. } => 4,
            Self::AmbiguousOrMissingBackup { .. } => 5,
            Self::InvalidBackupSpec(_) => 6,
            Self::VaultNotFound(_) => 7,
            Self::VaultAlreadyExists(_) => 8,
            Self::NoCurrentVault => 9,
            Self::Io(_) => 10,
            Self::IndexInconsistency { .. } => 11,
            Self::InvalidEntryName { .. } => 12,
            Self::Config(_) | Self::Json(_) | Self::Archive(_) | Self::Editor(_) => 1,
        }
    }
}

impl From<std::io::Error> for VaultError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type alias for TextVault operations
pub type VaultResult<T> = Result<T, VaultError>;
