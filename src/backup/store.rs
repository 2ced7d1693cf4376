//! Backup store
//!
//! Creates, lists, resolves and deletes the physical backup files of entries in
//! one vault, keeping the [`BackupIndex`] in step with every change.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use tracing::{debug, info, warn};

use super::id::BackupId;
use super::index::{count_backup_files, BackupIndex};
use super::spec::BackupSpec;
use crate::error::{VaultError, VaultResult};
use crate::storage::file_io::write_bytes_atomic;

/// Manages backup files for the entries of one vault root
#[derive(Debug, Clone)]
pub struct BackupStore {
    root: PathBuf,
    index: BackupIndex,
}

impl BackupStore {
    /// Create a store for the vault rooted at `vault_root`
    pub fn new(vault_root: impl Into<PathBuf>) -> Self {
        let root = vault_root.into();
        let index = BackupIndex::new(&root);
        Self { root, index }
    }

    /// The vault's backup index
    pub fn index(&self) -> &BackupIndex {
        &self.index
    }

    /// Directory holding an entry's primary file and backups
    pub fn entry_dir(&self, entry: &str) -> PathBuf {
        self.root.join(entry)
    }

    /// Path of an entry's primary file
    pub fn primary_path(&self, entry: &str) -> PathBuf {
        self.entry_dir(entry).join(entry)
    }

    /// Path of one backup file
    pub fn backup_path(&self, entry: &str, id: BackupId) -> PathBuf {
        self.entry_dir(entry).join(id.file_name(entry))
    }

    /// Snapshot the entry's current content
    ///
    /// Returns the identifier of the new backup.
    pub fn create_backup(&self, entry: &str) -> VaultResult<BackupId> {
        self.create_backup_at(entry, Local::now().naive_local())
    }

    pub(crate) fn create_backup_at(&self, entry: &str, at: NaiveDateTime) -> VaultResult<BackupId> {
        let primary = self.primary_path(entry);
        if !primary.is_file() {
            return Err(VaultError::entry_not_found(entry));
        }

        let was_stale = self.index.is_stale(&self.entry_dir(entry));
        let existing = self.list_backups(entry)?;

        let candidate = BackupId::new(at, 0);
        let seq = existing
            .iter()
            .filter(|id| id.timestamp() == candidate.timestamp())
            .map(|id| id.seq() + 1)
            .max()
            .unwrap_or(0);
        let id = BackupId::new(at, seq);

        let content = fs::read(&primary).map_err(|e| {
            VaultError::Io(format!("Failed to read {}: {}", primary.display(), e))
        })?;
        write_bytes_atomic(self.backup_path(entry, id), &content)?;

        let count = self.record_change(entry, was_stale, |index| index.increment(entry))?;
        info!(entry, backup = %id, count, "Backup created");
        Ok(id)
    }

    /// All backups of `entry`, newest first
    ///
    /// Reads the entry directory on every call, so the result always reflects the
    /// current disk state.
    pub fn list_backups(&self, entry: &str) -> VaultResult<Vec<BackupId>> {
        let dir = self.entry_dir(entry);
        if !dir.is_dir() {
            return Err(VaultError::entry_not_found(entry));
        }

        let mut backups = Vec::new();
        for dir_entry in fs::read_dir(&dir).map_err(|e| {
            VaultError::Io(format!("Failed to read {}: {}", dir.display(), e))
        })? {
            let dir_entry = dir_entry?;
            let file_name = dir_entry.file_name();
            let id = match file_name
                .to_str()
                .and_then(|name| BackupId::parse_file_name(entry, name))
            {
                Some(id) => id,
                None => continue,
            };
            if dir_entry.file_type()?.is_file() {
                backups.push(id);
            }
        }

        // Sort by timestamp, newest first
        backups.sort_by(|a, b| b.cmp(a));
        Ok(backups)
    }

    /// Translate a user-facing backup specification into a concrete backup
    pub fn resolve(&self, entry: &str, spec: &str) -> VaultResult<BackupId> {
        let backups = self.list_backups(entry)?;
        let spec: BackupSpec = spec.parse()?;
        let id = spec.select(entry, &backups)?;
        debug!(entry, %spec, backup = %id, "Resolved backup specification");
        Ok(id)
    }

    /// Read the content of one backup
    pub fn read_backup(&self, entry: &str, id: BackupId) -> VaultResult<String> {
        let path = self.backup_path(entry, id);
        fs::read_to_string(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => VaultError::backup_not_found(entry, id.to_string()),
            _ => VaultError::Io(format!("Failed to read {}: {}", path.display(), e)),
        })
    }

    /// Delete a single backup
    pub fn delete_backup(&self, entry: &str, id: BackupId) -> VaultResult<()> {
        let dir = self.entry_dir(entry);
        if !dir.is_dir() {
            return Err(VaultError::entry_not_found(entry));
        }

        let path = self.backup_path(entry, id);
        if !path.is_file() {
            return Err(VaultError::backup_not_found(entry, id.to_string()));
        }

        let was_stale = self.index.is_stale(&dir);
        remove_backup_file(&path)?;
        self.record_change(entry, was_stale, |index| index.decrement(entry, 1))?;
        info!(entry, backup = %id, "Backup deleted");
        Ok(())
    }

    /// Delete up to `count` of the oldest backups
    ///
    /// Asking for more than exist deletes them all. Returns how many were removed.
    pub fn delete_oldest(&self, entry: &str, count: usize) -> VaultResult<usize> {
        let backups = self.list_backups(entry)?;
        let was_stale = self.index.is_stale(&self.entry_dir(entry));

        let mut removed = 0;
        for id in backups.iter().rev().take(count) {
            remove_backup_file(&self.backup_path(entry, *id))?;
            removed += 1;
        }

        self.record_change(entry, was_stale, |index| index.decrement(entry, removed))?;
        info!(entry, requested = count, removed, "Oldest backups deleted");
        Ok(removed)
    }

    /// Delete every backup of `entry`, returning how many were removed
    pub fn delete_all(&self, entry: &str) -> VaultResult<usize> {
        let backups = self.list_backups(entry)?;

        for id in &backups {
            remove_backup_file(&self.backup_path(entry, *id))?;
        }

        self.index.set(entry, 0)?;
        info!(entry, removed = backups.len(), "All backups deleted");
        Ok(backups.len())
    }

    /// Authoritative backup count, straight from disk
    pub fn count_on_disk(&self, entry: &str) -> VaultResult<usize> {
        count_backup_files(&self.entry_dir(entry), entry)
    }

    /// Apply an index update, or recount from disk when the index had already
    /// drifted before this operation touched the entry.
    fn record_change<F>(&self, entry: &str, was_stale: bool, apply: F) -> VaultResult<usize>
    where
        F: FnOnce(&BackupIndex) -> VaultResult<usize>,
    {
        if !was_stale {
            return apply(&self.index);
        }

        let on_disk = self.count_on_disk(entry)?;
        if let Err(err) = self.index.verify(entry, on_disk) {
            warn!(%err, "Healing backup index from disk");
        }
        self.index.set(entry, on_disk)?;
        Ok(on_disk)
    }
}

fn remove_backup_file(path: &Path) -> VaultResult<()> {
    fs::remove_file(path)
        .map_err(|e| VaultError::Io(format!("Failed to delete {}: {}", path.display(), e)))
}
