//! User settings for TextVault
//!
//! Manages user preferences: the editor used for updates, whether updates take a
//! snapshot by default, and how many backups each entry keeps.

use serde::{Deserialize, Serialize};

use super::paths::TvaultPaths;
use crate::error::VaultError;
use crate::storage::file_io::write_json_atomic;

/// Backup retention settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackupRetention {
    /// Maximum backups kept per entry after an update-time snapshot (None = unlimited)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_backups: Option<usize>,
}

/// User settings for TextVault
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Editor command used by `file update` (falls back to $VISUAL, $EDITOR, nano)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editor: Option<String>,

    /// Take a snapshot before every update even without `--backup`
    #[serde(default)]
    pub snapshot_on_update: bool,

    /// Backup retention policy
    #[serde(default)]
    pub backup_retention: BackupRetention,
}

fn default_schema_version() -> u32 {
    1
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            editor: None,
            snapshot_on_update: false,
            backup_retention: BackupRetention::default(),
        }
    }
}

impl Settings {
    /// Load settings from disk, or return defaults if the file doesn't exist
    pub fn load_or_create(paths: &TvaultPaths) -> Result<Self, VaultError> {
        let settings_path = paths.settings_file();

        if !settings_path.exists() {
            // Don't save yet - let caller decide when to persist
            return Ok(Settings::default());
        }

        let contents = std::fs::read_to_string(&settings_path)
            .map_err(|e| VaultError::Io(format!("Failed to read settings file: {}", e)))?;

        serde_json::from_str(&contents)
            .map_err(|e| VaultError::Config(format!("Failed to parse settings file: {}", e)))
    }

    /// Save settings to disk
    pub fn save(&self, paths: &TvaultPaths) -> Result<(), VaultError> {
        paths.ensure_directories()?;
        write_json_atomic(paths.settings_file(), self)
    }
}
