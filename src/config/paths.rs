//! Path management for TextVault
//!
//! Provides XDG-compliant path resolution for the vault registry, the current
//! vault pointer and user settings.
//!
//! ## Path Resolution Order
//!
//! 1. `TVAULT_HOME` environment variable (if set)
//! 2. `$XDG_CONFIG_HOME/tvault`
//! 3. `<home>/.config/tvault`

use std::path::PathBuf;

use directories::BaseDirs;

use crate::error::VaultError;

/// Environment variable overriding the config directory
pub const HOME_ENV: &str = "TVAULT_HOME";

/// Manages all global paths used by TextVault
#[derive(Debug, Clone)]
pub struct TvaultPaths {
    /// Base directory for the registry and settings
    base_dir: PathBuf,
}

impl TvaultPaths {
    /// Create a new TvaultPaths instance
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> Result<Self, VaultError> {
        let base_dir = match std::env::var_os(HOME_ENV) {
            Some(custom) if !custom.is_empty() => PathBuf::from(custom),
            _ => resolve_default_path()?,
        };

        Ok(Self { base_dir })
    }

    /// Create TvaultPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Path to the vault registry (`name -> root path`)
    pub fn registry_file(&self) -> PathBuf {
        self.base_dir.join("vaults.json")
    }

    /// Path to the current vault pointer
    pub fn current_file(&self) -> PathBuf {
        self.base_dir.join("current.json")
    }

    /// Path to the settings file
    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Root of the vault registered on first run
    pub fn default_vault_dir(&self) -> PathBuf {
        self.base_dir.join("default")
    }

    /// Ensure the base directory exists
    pub fn ensure_directories(&self) -> Result<(), VaultError> {
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| VaultError::Io(format!("Failed to create config directory: {}", e)))
    }

    /// Check if TextVault has been used before (registry exists)
    pub fn is_initialized(&self) -> bool {
        self.registry_file().exists()
    }
}

fn resolve_default_path() -> Result<PathBuf, VaultError> {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(xdg).join("tvault"));
    }

    let base = BaseDirs::new()
        .ok_or_else(|| VaultError::Config("Could not determine home directory".into()))?;
    Ok(base.home_dir().join(".config").join("tvault"))
}
