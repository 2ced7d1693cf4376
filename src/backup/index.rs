//! Per-vault backup index
//!
//! `index.json` at the vault root caches how many backups each entry has so that
//! listing a vault does not rescan every entry directory. The files on disk stay
//! authoritative: the index can be rebuilt from them at any time.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, info, warn};

use super::id::BackupId;
use crate::error::{VaultError, VaultResult};
use crate::storage::file_io::{read_json, write_json_atomic};

/// Name of the index file inside a vault root
pub const INDEX_FILE_NAME: &str = "index.json";

/// Backup counts keyed by entry name
pub type BackupCounts = BTreeMap<String, usize>;

/// Persistent `entry -> backup_count` cache for one vault
///
/// Every mutator loads the file, applies the change and writes it back
/// atomically, so the index on disk always reflects the last completed operation.
#[derive(Debug, Clone)]
pub struct BackupIndex {
    root: PathBuf,
    path: PathBuf,
}

impl BackupIndex {
    /// Index stored in `vault_root`
    pub fn new(vault_root: &Path) -> Self {
        Self {
            root: vault_root.to_path_buf(),
            path: vault_root.join(INDEX_FILE_NAME),
        }
    }

    /// Path of the index file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the full mapping (empty if the file doesn't exist yet)
    ///
    /// An unparsable index is rebuilt from the entry directories.
    pub fn load(&self) -> VaultResult<BackupCounts> {
        self.load_or_rebuild().map(|(counts, _)| counts)
    }

    /// The mapping, and whether it had to be rebuilt from disk
    fn load_or_rebuild(&self) -> VaultResult<(BackupCounts, bool)> {
        match read_json(&self.path) {
            Ok(counts) => Ok((counts, false)),
            Err(VaultError::Json(detail)) => {
                warn!(index = %self.path.display(), %detail, "Backup index unreadable, rebuilding from disk");
                Ok((self.rebuild_from_disk(&self.root)?, true))
            }
            Err(err) => Err(err),
        }
    }

    fn save(&self, counts: &BackupCounts) -> VaultResult<()> {
        write_json_atomic(&self.path, counts)
    }

    /// Apply `f` to the mapping and persist it, returning `f`'s result
    ///
    /// Mutators record changes already made on disk. When the index had to be
    /// rebuilt those changes are counted already, so `f` is skipped and the
    /// rebuilt count for `entry` is returned.
    fn modify<F>(&self, entry: &str, f: F) -> VaultResult<usize>
    where
        F: FnOnce(&mut BackupCounts) -> usize,
    {
        let (mut counts, rebuilt) = self.load_or_rebuild()?;
        if rebuilt {
            return Ok(counts.get(entry).copied().unwrap_or(0));
        }
        let result = f(&mut counts);
        self.save(&counts)?;
        Ok(result)
    }

    /// Backup count for `entry`; 0 if unknown
    pub fn get(&self, entry: &str) -> VaultResult<usize> {
        Ok(self.load()?.get(entry).copied().unwrap_or(0))
    }

    /// Add one backup, returning the new count
    pub fn increment(&self, entry: &str) -> VaultResult<usize> {
        self.modify(entry, |counts| {
            let count = counts.entry(entry.to_string()).or_insert(0);
            *count += 1;
            *count
        })
    }

    /// Remove `n` backups (saturating at zero), returning the new count
    pub fn decrement(&self, entry: &str, n: usize) -> VaultResult<usize> {
        self.modify(entry, |counts| {
            let count = counts.entry(entry.to_string()).or_insert(0);
            *count = count.saturating_sub(n);
            *count
        })
    }

    /// Overwrite the count for `entry`
    pub fn set(&self, entry: &str, count: usize) -> VaultResult<()> {
        self.modify(entry, |counts| {
            counts.insert(entry.to_string(), count);
            count
        })?;
        Ok(())
    }

    /// Drop `entry` from the index
    pub fn remove(&self, entry: &str) -> VaultResult<()> {
        self.modify(entry, |counts| counts.remove(entry).unwrap_or(0))?;
        Ok(())
    }

    /// Move the count stored under `old` to `new`
    pub fn rename(&self, old: &str, new: &str) -> VaultResult<()> {
        self.modify(new, |counts| {
            let count = counts.remove(old).unwrap_or(0);
            counts.insert(new.to_string(), count);
            count
        })?;
        Ok(())
    }

    /// Rewrite the file without changing its content
    ///
    /// Used after writes that touch an entry directory without changing its
    /// backups, so the directory does not look newer than the index.
    pub fn touch(&self) -> VaultResult<()> {
        let (counts, rebuilt) = self.load_or_rebuild()?;
        if !rebuilt {
            self.save(&counts)?;
        }
        Ok(())
    }

    /// Compare the cached count for `entry` with `on_disk`
    pub fn verify(&self, entry: &str, on_disk: usize) -> VaultResult<()> {
        let indexed = self.get(entry)?;
        if indexed != on_disk {
            return Err(VaultError::IndexInconsistency {
                entry: entry.to_string(),
                indexed,
                on_disk,
            });
        }
        Ok(())
    }

    /// Whether the cached count for the entry in `entry_dir` may be out of date
    ///
    /// True when the index file is missing or was last written before the entry
    /// directory changed.
    pub fn is_stale(&self, entry_dir: &Path) -> bool {
        let index_time = match modified(&self.path) {
            Some(t) => t,
            None => return true,
        };
        match modified(entry_dir) {
            Some(dir_time) => dir_time > index_time,
            None => false,
        }
    }

    /// Recount every entry directory under `vault_root` and persist the result
    pub fn rebuild_from_disk(&self, vault_root: &Path) -> VaultResult<BackupCounts> {
        let mut counts = BackupCounts::new();

        if vault_root.exists() {
            for dir_entry in fs::read_dir(vault_root).map_err(|e| {
                VaultError::Io(format!(
                    "Failed to read vault directory {}: {}",
                    vault_root.display(),
                    e
                ))
            })? {
                let dir_entry = dir_entry?;
                if !dir_entry.file_type()?.is_dir() {
                    continue;
                }
                let name = match dir_entry.file_name().into_string() {
                    Ok(name) if !name.starts_with('.') => name,
                    _ => continue,
                };
                let count = count_backup_files(&dir_entry.path(), &name)?;
                counts.insert(name, count);
            }
        }

        self.save(&counts)?;
        info!(entries = counts.len(), "Backup index rebuilt from disk");
        Ok(counts)
    }
}

/// Count files in `entry_dir` that follow the backup naming scheme for `entry`
pub fn count_backup_files(entry_dir: &Path, entry: &str) -> VaultResult<usize> {
    if !entry_dir.exists() {
        return Ok(0);
    }

    let mut count = 0;
    for dir_entry in fs::read_dir(entry_dir)? {
        let dir_entry = dir_entry?;
        let file_name = dir_entry.file_name();
        let is_backup = file_name
            .to_str()
            .and_then(|name| BackupId::parse_file_name(entry, name))
            .is_some();
        if is_backup && dir_entry.file_type()?.is_file() {
            count += 1;
        }
    }

    debug!(entry, count, "Counted backups on disk");
    Ok(count)
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}
