//! Vault registry
//!
//! Maps vault names to root directories (`vaults.json`) and remembers which vault
//! is current (`current.json`). Nothing is cached between calls: each operation
//! loads the files, applies its change and saves them back atomically.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::transfer::{self, ExportSummary};
use crate::config::paths::TvaultPaths;
use crate::error::{VaultError, VaultResult};
use crate::storage::file_io::{read_json, write_json_atomic};

/// Name of the vault registered on first run
pub const DEFAULT_VAULT_NAME: &str = "default";

/// Registered vaults keyed by name
pub type VaultMap = BTreeMap<String, PathBuf>;

/// The persisted "current vault" pointer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentVault {
    pub name: String,
    pub path: PathBuf,
}

/// Registry of named vault roots
#[derive(Debug, Clone)]
pub struct VaultRegistry {
    paths: TvaultPaths,
}

impl VaultRegistry {
    /// Create a registry stored under `paths`
    pub fn new(paths: TvaultPaths) -> Self {
        Self { paths }
    }

    /// Paths backing this registry
    pub fn paths(&self) -> &TvaultPaths {
        &self.paths
    }

    fn load(&self) -> VaultResult<VaultMap> {
        read_json(self.paths.registry_file())
    }

    fn save(&self, vaults: &VaultMap) -> VaultResult<()> {
        write_json_atomic(self.paths.registry_file(), vaults)
    }

    fn load_pointer(&self) -> VaultResult<Option<CurrentVault>> {
        read_json(self.paths.current_file())
    }

    fn clear_pointer_if(&self, name: &str) -> VaultResult<()> {
        if let Some(current) = self.load_pointer()? {
            if current.name == name {
                fs::remove_file(self.paths.current_file())?;
                info!(vault = name, "Current vault pointer cleared");
            }
        }
        Ok(())
    }

    /// Register the `default` vault the first time TextVault runs
    ///
    /// Returns true if the registry was created by this call.
    pub fn ensure_default(&self) -> VaultResult<bool> {
        if self.paths.is_initialized() {
            return Ok(false);
        }

        let mut vaults = VaultMap::new();
        vaults.insert(
            DEFAULT_VAULT_NAME.to_string(),
            self.paths.default_vault_dir(),
        );
        self.save(&vaults)?;
        info!(path = %self.paths.default_vault_dir().display(), "Default vault registered");
        Ok(true)
    }

    /// Register a vault; the directory need not exist yet
    ///
    /// Returns the absolute root path that was stored.
    pub fn add(&self, name: &str, path: impl AsRef<Path>) -> VaultResult<PathBuf> {
        validate_vault_name(name)?;

        let mut vaults = self.load()?;
        if vaults.contains_key(name) {
            return Err(VaultError::VaultAlreadyExists(name.to_string()));
        }

        let root = absolutize(path.as_ref())?;
        vaults.insert(name.to_string(), root.clone());
        self.save(&vaults)?;

        info!(vault = name, path = %root.display(), "Vault added");
        Ok(root)
    }

    /// Unregister a vault, leaving its files on disk
    ///
    /// If it was the current vault the pointer is cleared.
    pub fn remove(&self, name: &str) -> VaultResult<PathBuf> {
        let mut vaults = self.load()?;
        let root = vaults
            .remove(name)
            .ok_or_else(|| VaultError::vault_not_found(name))?;

        self.clear_pointer_if(name)?;
        self.save(&vaults)?;

        info!(vault = name, "Vault removed from registry");
        Ok(root)
    }

    /// Unregister a vault and delete its root directory
    pub fn delete(&self, name: &str) -> VaultResult<PathBuf> {
        let mut vaults = self.load()?;
        let root = vaults
            .get(name)
            .cloned()
            .ok_or_else(|| VaultError::vault_not_found(name))?;

        if self.paths.base_dir().starts_with(&root) {
            return Err(VaultError::Config(format!(
                "Refusing to delete {}: it contains the TextVault config directory",
                root.display()
            )));
        }

        self.clear_pointer_if(name)?;

        if root.exists() {
            fs::remove_dir_all(&root).map_err(|e| {
                VaultError::Io(format!("Failed to delete {}: {}", root.display(), e))
            })?;
        }

        vaults.remove(name);
        self.save(&vaults)?;

        info!(vault = name, path = %root.display(), "Vault deleted");
        Ok(root)
    }

    /// Make `name` the current vault
    pub fn switch(&self, name: &str) -> VaultResult<CurrentVault> {
        let path = self.get(name)?;
        let current = CurrentVault {
            name: name.to_string(),
            path,
        };

        self.paths.ensure_directories()?;
        write_json_atomic(self.paths.current_file(), &current)?;

        info!(vault = name, "Switched current vault");
        Ok(current)
    }

    /// The current vault
    ///
    /// A pointer naming a vault that is no longer registered is reported as
    /// [`VaultError::NoCurrentVault`].
    pub fn current(&self) -> VaultResult<CurrentVault> {
        let current = self.load_pointer()?.ok_or(VaultError::NoCurrentVault)?;

        if !self.load()?.contains_key(&current.name) {
            warn!(vault = %current.name, "Current vault pointer names an unregistered vault");
            return Err(VaultError::NoCurrentVault);
        }

        Ok(current)
    }

    /// All registered vaults
    pub fn list(&self) -> VaultResult<VaultMap> {
        self.load()
    }

    /// Root path of a registered vault
    pub fn get(&self, name: &str) -> VaultResult<PathBuf> {
        self.load()?
            .remove(name)
            .ok_or_else(|| VaultError::vault_not_found(name))
    }

    /// Export a registered vault to an archive file
    pub fn dump(&self, name: &str, archive_path: impl AsRef<Path>) -> VaultResult<ExportSummary> {
        let root = self.get(name)?;
        let archive_path = absolutize(archive_path.as_ref())?;
        transfer::export_vault(&root, &archive_path)
    }

    /// Unpack an archive into `target` and register it as a new vault
    ///
    /// The vault is named after the target directory, with `_1`, `_2`, ...
    /// appended if that name is taken. Returns the registered name.
    pub fn import(
        &self,
        archive_path: impl AsRef<Path>,
        target: impl AsRef<Path>,
    ) -> VaultResult<String> {
        let archive_path = absolutize(archive_path.as_ref())?;
        let target = absolutize(target.as_ref())?;

        let base_name = target
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                VaultError::Archive(format!("Cannot name a vault after {}", target.display()))
            })?;

        transfer::import_vault(&archive_path, &target)?;

        let mut vaults = self.load()?;
        let mut name = base_name.clone();
        let mut suffix = 1;
        while vaults.contains_key(&name) {
            name = format!("{}_{}", base_name, suffix);
            suffix += 1;
        }

        vaults.insert(name.clone(), target.clone());
        self.save(&vaults)?;

        info!(vault = %name, path = %target.display(), "Vault imported");
        Ok(name)
    }
}

fn validate_vault_name(name: &str) -> VaultResult<()> {
    if name.trim().is_empty() {
        return Err(VaultError::Config("Vault name cannot be empty".into()));
    }
    Ok(())
}

/// Expand a leading `~` and make `path` absolute against the working directory
fn absolutize(path: &Path) -> VaultResult<PathBuf> {
    let expanded = match path.strip_prefix("~") {
        Ok(rest) => {
            let base = BaseDirs::new()
                .ok_or_else(|| VaultError::Config("Could not determine home directory".into()))?;
            base.home_dir().join(rest)
        }
        Err(_) => path.to_path_buf(),
    };

    let absolute = if expanded.is_absolute() {
        expanded
    } else {
        std::env::current_dir()?.join(expanded)
    };

    Ok(normalize(&absolute))
}

/// Lexically drop `.` components and resolve `..` against preceding components
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
