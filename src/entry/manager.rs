//! Entry manager
//!
//! CRUD over the primary content of entries in one vault, composing with the
//! [`BackupStore`] for write-time snapshots, pruning and recovery.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use tracing::{debug, info, warn};

use super::name::validate_entry_name;
use crate::backup::{BackupCounts, BackupId, BackupStore};
use crate::error::{VaultError, VaultResult};
use crate::storage::file_io::write_bytes_atomic;

/// What a call to [`EntryManager::delete`] removed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The entry directory was removed together with this many backups
    EntryRemoved { backups: usize },
    /// Only backups were removed; the primary file is untouched
    BackupsPruned { removed: usize, remaining: usize },
}

/// Manages the entries stored under one vault root
///
/// The root is passed in explicitly; the manager never consults the vault
/// registry. The directory is created lazily on the first write.
#[derive(Debug, Clone)]
pub struct EntryManager {
    root: PathBuf,
    store: BackupStore,
    max_backups: Option<usize>,
}

impl EntryManager {
    /// Create a manager for the vault rooted at `vault_root`
    pub fn new(vault_root: impl Into<PathBuf>) -> Self {
        let root = vault_root.into();
        Self {
            store: BackupStore::new(root.clone()),
            root,
            max_backups: None,
        }
    }

    /// Keep at most `max_backups` backups per entry after update-time snapshots
    ///
    /// A limit of 0 is raised to 1 so the snapshot just taken survives.
    pub fn with_retention(mut self, max_backups: Option<usize>) -> Self {
        if max_backups == Some(0) {
            warn!("backup_retention.max_backups = 0 would discard every snapshot, keeping 1");
        }
        self.max_backups = max_backups.map(|max| max.max(1));
        self
    }

    /// Vault root this manager operates on
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The underlying backup store
    pub fn store(&self) -> &BackupStore {
        &self.store
    }

    /// Whether `name` has a readable primary file
    pub fn exists(&self, name: &str) -> bool {
        validate_entry_name(name).is_ok() && self.store.primary_path(name).is_file()
    }

    /// Create a new entry
    ///
    /// With `force`, an existing entry's content is overwritten; its backups are
    /// kept.
    pub fn create(&self, name: &str, initial_content: &str, force: bool) -> VaultResult<()> {
        validate_entry_name(name)?;

        let dir = self.store.entry_dir(name);
        if dir.exists() && !force {
            return Err(VaultError::EntryAlreadyExists(name.to_string()));
        }

        fs::create_dir_all(&dir).map_err(|e| {
            VaultError::Io(format!("Failed to create {}: {}", dir.display(), e))
        })?;

        self.write_primary(name, initial_content)?;
        let backups = self.store.count_on_disk(name)?;
        self.store.index().set(name, backups)?;

        info!(entry = name, force, backups, "Entry created");
        Ok(())
    }

    /// Read an entry's current content
    pub fn read(&self, name: &str) -> VaultResult<String> {
        validate_entry_name(name)?;

        let path = self.store.primary_path(name);
        debug!(entry = name, "Reading entry");
        fs::read_to_string(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => VaultError::entry_not_found(name),
            _ => VaultError::Io(format!("Failed to read {}: {}", path.display(), e)),
        })
    }

    /// Read the content of the backup addressed by `spec`
    pub fn read_backup(&self, name: &str, spec: &str) -> VaultResult<String> {
        validate_entry_name(name)?;

        let id = self.store.resolve(name, spec)?;
        debug!(entry = name, backup = %id, "Reading backup");
        self.store.read_backup(name, id)
    }

    /// Replace an entry's content
    ///
    /// With `snapshot_before`, the current content is backed up first; if that
    /// fails the entry is left untouched. Returns the snapshot id, if any.
    pub fn update(
        &self,
        name: &str,
        new_content: &str,
        snapshot_before: bool,
    ) -> VaultResult<Option<BackupId>> {
        let snapshot_at = snapshot_before.then(|| Local::now().naive_local());
        self.update_at(name, new_content, snapshot_at)
    }

    /// [`update`](Self::update) with the snapshot timestamp supplied by the caller
    pub(crate) fn update_at(
        &self,
        name: &str,
        new_content: &str,
        snapshot_at: Option<NaiveDateTime>,
    ) -> VaultResult<Option<BackupId>> {
        validate_entry_name(name)?;

        if !self.store.primary_path(name).is_file() {
            return Err(VaultError::entry_not_found(name));
        }

        let snapshot = match snapshot_at {
            Some(at) => {
                let id = self.store.create_backup_at(name, at)?;
                self.enforce_retention(name)?;
                Some(id)
            }
            None => None,
        };

        self.write_primary(name, new_content)?;
        info!(entry = name, snapshot = snapshot.is_some(), "Entry updated");
        Ok(snapshot)
    }

    /// Take an explicit backup of an entry
    pub fn snapshot(&self, name: &str) -> VaultResult<BackupId> {
        validate_entry_name(name)?;
        self.store.create_backup(name)
    }

    /// Delete an entry or prune its backups
    ///
    /// - `backup_count = Some(n)`: remove the `n` oldest backups only
    /// - `remove_backups` alone: remove every backup, keep the primary
    /// - neither: remove the whole entry directory, backups included
    pub fn delete(
        &self,
        name: &str,
        remove_backups: bool,
        backup_count: Option<usize>,
    ) -> VaultResult<DeleteOutcome> {
        validate_entry_name(name)?;

        let dir = self.store.entry_dir(name);
        if !dir.is_dir() {
            return Err(VaultError::entry_not_found(name));
        }

        if let Some(count) = backup_count {
            let removed = self.store.delete_oldest(name, count)?;
            let remaining = self.store.index().get(name)?;
            return Ok(DeleteOutcome::BackupsPruned { removed, remaining });
        }

        if remove_backups {
            let removed = self.store.delete_all(name)?;
            return Ok(DeleteOutcome::BackupsPruned {
                removed,
                remaining: 0,
            });
        }

        let backups = self.store.count_on_disk(name)?;
        fs::remove_dir_all(&dir).map_err(|e| {
            VaultError::Io(format!("Failed to delete {}: {}", dir.display(), e))
        })?;
        self.store.index().remove(name)?;

        info!(entry = name, backups, "Entry deleted");
        Ok(DeleteOutcome::EntryRemoved { backups })
    }

    /// Restore an entry's content from a backup
    ///
    /// The backup itself is kept. Returns the id of the backup that was used.
    pub fn recover(&self, name: &str, spec: &str) -> VaultResult<BackupId> {
        validate_entry_name(name)?;

        let id = self.store.resolve(name, spec)?;
        let content = self.store.read_backup(name, id)?;
        self.write_primary(name, &content)?;

        info!(entry = name, backup = %id, "Entry recovered from backup");
        Ok(id)
    }

    /// Rename an entry, carrying its backups along
    pub fn rename(&self, old: &str, new: &str) -> VaultResult<()> {
        validate_entry_name(old)?;
        validate_entry_name(new)?;

        let old_dir = self.store.entry_dir(old);
        if !old_dir.is_dir() {
            return Err(VaultError::entry_not_found(old));
        }

        let new_dir = self.store.entry_dir(new);
        if new_dir.exists() {
            return Err(VaultError::EntryAlreadyExists(new.to_string()));
        }

        fs::rename(&old_dir, &new_dir).map_err(|e| {
            VaultError::Io(format!("Failed to rename {}: {}", old_dir.display(), e))
        })?;

        let old_primary = new_dir.join(old);
        if old_primary.exists() {
            fs::rename(&old_primary, new_dir.join(new))?;
        }

        for dir_entry in fs::read_dir(&new_dir)? {
            let dir_entry = dir_entry?;
            let file_name = dir_entry.file_name();
            let id = match file_name
                .to_str()
                .and_then(|n| BackupId::parse_file_name(old, n))
            {
                Some(id) => id,
                None => continue,
            };
            fs::rename(dir_entry.path(), new_dir.join(id.file_name(new)))?;
        }

        let index = self.store.index();
        index.rename(old, new)?;

        let on_disk = self.store.count_on_disk(new)?;
        if let Err(err) = index.verify(new, on_disk) {
            warn!(%err, "Healing backup index after rename");
            index.set(new, on_disk)?;
        }

        info!(from = old, to = new, "Entry renamed");
        Ok(())
    }

    /// All entries in the vault with their backup counts
    ///
    /// Counts come from the index. Entries whose directory changed after the index
    /// was last written, or which the index does not know, are recounted from
    /// disk and the index is healed.
    pub fn list(&self) -> VaultResult<BTreeMap<String, usize>> {
        let mut entries = BTreeMap::new();
        if !self.root.is_dir() {
            return Ok(entries);
        }

        let index = self.store.index();
        let cached = index.load()?;

        // Staleness is judged against the index as it was before any healing
        let mut found = Vec::new();
        for dir_entry in fs::read_dir(&self.root).map_err(|e| {
            VaultError::Io(format!("Failed to read {}: {}", self.root.display(), e))
        })? {
            let dir_entry = dir_entry?;
            if !dir_entry.file_type()?.is_dir() {
                continue;
            }
            let name = match dir_entry.file_name().into_string() {
                Ok(name) if validate_entry_name(&name).is_ok() => name,
                _ => continue,
            };
            let stale = !cached.contains_key(&name) || index.is_stale(&dir_entry.path());
            found.push((name, stale));
        }

        for (name, stale) in found {
            let count = if stale {
                let on_disk = self.store.count_on_disk(&name)?;
                if cached.get(&name) != Some(&on_disk) {
                    warn!(
                        entry = %name,
                        indexed = cached.get(&name).copied().unwrap_or(0),
                        on_disk,
                        "Backup index out of date, recounted from disk"
                    );
                }
                index.set(&name, on_disk)?;
                on_disk
            } else {
                cached.get(&name).copied().unwrap_or(0)
            };
            entries.insert(name, count);
        }

        for orphan in cached.keys().filter(|k| !entries.contains_key(*k)) {
            warn!(entry = %orphan, "Dropping index key without entry directory");
            index.remove(orphan)?;
        }

        Ok(entries)
    }

    /// Backups of an entry, newest first
    pub fn list_backups(&self, name: &str) -> VaultResult<Vec<BackupId>> {
        validate_entry_name(name)?;
        self.store.list_backups(name)
    }

    /// Rebuild the whole backup index from disk
    pub fn reindex(&self) -> VaultResult<BackupCounts> {
        self.store.index().rebuild_from_disk(&self.root)
    }

    /// Atomically replace the primary file, keeping the index at least as new as
    /// the entry directory.
    fn write_primary(&self, name: &str, content: &str) -> VaultResult<()> {
        let index = self.store.index();
        let was_stale = index.is_stale(&self.store.entry_dir(name));

        write_bytes_atomic(self.store.primary_path(name), content.as_bytes())?;

        if was_stale {
            let on_disk = self.store.count_on_disk(name)?;
            index.set(name, on_disk)
        } else {
            index.touch()
        }
    }

    fn enforce_retention(&self, name: &str) -> VaultResult<()> {
        let max = match self.max_backups {
            Some(max) => max,
            None => return Ok(()),
        };

        let count = self.store.list_backups(name)?.len();
        if count > max {
            let removed = self.store.delete_oldest(name, count - max)?;
            debug!(entry = name, removed, max, "Retention limit applied");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::file_io::temp_path_for;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn setup() -> (EntryManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let manager = EntryManager::new(temp_dir.path().join("vault"));
        (manager, temp_dir)
    }

    fn backup_at(manager: &EntryManager, name: &str, d: u32, h: u32) -> BackupId {
        let ts = NaiveDate::from_ymd_opt(2025, 2, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap();
        manager.store().create_backup_at(name, ts).unwrap()
    }

    #[test]
    fn test_create_then_read() {
        let (manager, _temp) = setup();

        manager.create("empty", "", false).unwrap();
        manager.create("greeting", "hello\nworld", false).unwrap();

        assert_eq!(manager.read("empty").unwrap(), "");
        assert_eq!(manager.read("greeting").unwrap(), "hello\nworld");
        assert!(manager.root().join("greeting").join("greeting").is_file());
    }

    #[test]
    fn test_create_existing_requires_force() {
        let (manager, _temp) = setup();
        manager.create("notes", "one", false).unwrap();
        manager.snapshot("notes").unwrap();

        let err = manager.create("notes", "two", false).unwrap_err();
        assert!(matches!(err, VaultError::EntryAlreadyExists(_)));

        manager.create("notes", "two", true).unwrap();
        assert_eq!(manager.read("notes").unwrap(), "two");
        assert_eq!(manager.list_backups("notes").unwrap().len(), 1);
        assert_eq!(manager.list().unwrap().get("notes"), Some(&1));
    }

    #[test]
    fn test_invalid_name_rejected() {
        let (manager, _temp) = setup();
        let err = manager.create("../escape", "", false).unwrap_err();
        assert!(matches!(err, VaultError::InvalidEntryName { .. }));
    }

    #[test]
    fn test_read_missing_entry() {
        let (manager, _temp) = setup();
        let err = manager.read("ghost").unwrap_err();
        assert!(matches!(err, VaultError::EntryNotFound(_)));
    }

    #[test]
    fn test_notes_scenario() {
        let (manager, _temp) = setup();
        manager.create("notes", "", false).unwrap();

        assert!(manager.update("notes", "a", false).unwrap().is_none());
        assert!(manager.update("notes", "b", true).unwrap().is_some());

        assert_eq!(manager.list_backups("notes").unwrap().len(), 1);
        assert_eq!(manager.read_backup("notes", "latest").unwrap(), "a");
        assert_eq!(manager.read("notes").unwrap(), "b");
    }

    #[test]
    fn test_update_missing_entry_does_not_create() {
        let (manager, _temp) = setup();
        let err = manager.update("ghost", "x", true).unwrap_err();
        assert!(matches!(err, VaultError::EntryNotFound(_)));
        assert!(!manager.root().join("ghost").exists());
    }

    #[test]
    fn test_failed_snapshot_aborts_update() {
        let (manager, _temp) = setup();
        manager.create("notes", "keep me", false).unwrap();

        // Occupy the backup's temp path so writing the snapshot fails
        let at = NaiveDate::from_ymd_opt(2025, 2, 7)
            .unwrap()
            .and_hms_opt(8, 15, 0)
            .unwrap();
        let backup_path = manager.store().backup_path("notes", BackupId::new(at, 0));
        fs::create_dir_all(temp_path_for(&backup_path)).unwrap();

        let err = manager.update_at("notes", "new text", Some(at)).unwrap_err();
        assert!(matches!(err, VaultError::Io(_)));

        assert_eq!(manager.read("notes").unwrap(), "keep me");
        assert!(manager.list_backups("notes").unwrap().is_empty());
        assert_eq!(manager.list().unwrap().get("notes"), Some(&0));
    }

    #[test]
    fn test_update_with_unparsable_index() {
        let (manager, _temp) = setup();
        manager.create("notes", "a", false).unwrap();
        fs::write(manager.store().index().path(), r#"{"notes": 0"#).unwrap();

        let id = manager.update("notes", "b", true).unwrap();
        assert!(id.is_some());

        assert_eq!(manager.read("notes").unwrap(), "b");
        assert_eq!(manager.read_backup("notes", "latest").unwrap(), "a");
        assert_eq!(manager.store().count_on_disk("notes").unwrap(), 1);
        assert_eq!(manager.list().unwrap().get("notes"), Some(&1));
    }

    #[test]
    fn test_list_with_unparsable_index() {
        let (manager, _temp) = setup();
        manager.create("notes", "a", false).unwrap();
        manager.snapshot("notes").unwrap();
        fs::write(manager.store().index().path(), "").unwrap();

        let entries = manager.list().unwrap();
        assert_eq!(entries.get("notes"), Some(&1));
    }

    #[test]
    fn test_backup_update_recover_round_trip() {
        let (manager, _temp) = setup();
        manager.create("notes", "original text", false).unwrap();

        manager.snapshot("notes").unwrap();
        manager.update("notes", "something else", false).unwrap();

        let used = manager.recover("notes", "latest").unwrap();
        assert_eq!(manager.read("notes").unwrap(), "original text");
        // Recovery keeps the backup
        assert_eq!(manager.list_backups("notes").unwrap(), vec![used]);
    }

    #[test]
    fn test_recover_restores_missing_primary() {
        let (manager, _temp) = setup();
        manager.create("notes", "keep me", false).unwrap();
        manager.snapshot("notes").unwrap();
        fs::remove_file(manager.store().primary_path("notes")).unwrap();

        assert!(!manager.exists("notes"));
        manager.recover("notes", "1").unwrap();
        assert_eq!(manager.read("notes").unwrap(), "keep me");
    }

    #[test]
    fn test_delete_prunes_oldest() {
        let (manager, _temp) = setup();
        manager.create("notes", "x", false).unwrap();
        backup_at(&manager, "notes", 5, 9);
        let kept = backup_at(&manager, "notes", 6, 9);

        let outcome = manager.delete("notes", false, Some(1)).unwrap();
        assert_eq!(
            outcome,
            DeleteOutcome::BackupsPruned {
                removed: 1,
                remaining: 1
            }
        );
        assert_eq!(manager.list_backups("notes").unwrap(), vec![kept]);
        assert!(manager.exists("notes"));
    }

    #[test]
    fn test_delete_oldest_beyond_count() {
        let (manager, _temp) = setup();
        manager.create("notes", "x", false).unwrap();
        backup_at(&manager, "notes", 5, 9);
        backup_at(&manager, "notes", 6, 9);

        let outcome = manager.delete("notes", false, Some(7)).unwrap();
        assert_eq!(
            outcome,
            DeleteOutcome::BackupsPruned {
                removed: 2,
                remaining: 0
            }
        );
        assert_eq!(manager.list().unwrap().get("notes"), Some(&0));
    }

    #[test]
    fn test_delete_all_backups_keeps_primary() {
        let (manager, _temp) = setup();
        manager.create("notes", "x", false).unwrap();
        backup_at(&manager, "notes", 5, 9);
        backup_at(&manager, "notes", 6, 9);

        let outcome = manager.delete("notes", true, None).unwrap();
        assert_eq!(
            outcome,
            DeleteOutcome::BackupsPruned {
                removed: 2,
                remaining: 0
            }
        );
        assert_eq!(manager.read("notes").unwrap(), "x");
    }

    #[test]
    fn test_delete_whole_entry() {
        let (manager, _temp) = setup();
        manager.create("notes", "x", false).unwrap();
        backup_at(&manager, "notes", 5, 9);

        let outcome = manager.delete("notes", false, None).unwrap();
        assert_eq!(outcome, DeleteOutcome::EntryRemoved { backups: 1 });
        assert!(!manager.root().join("notes").exists());
        assert!(manager.list().unwrap().is_empty());
        assert_eq!(manager.store().index().get("notes").unwrap(), 0);

        let err = manager.delete("notes", false, None).unwrap_err();
        assert!(matches!(err, VaultError::EntryNotFound(_)));
    }

    #[test]
    fn test_rename_preserves_backups() {
        let (manager, _temp) = setup();
        manager.create("old", "content", false).unwrap();
        let first = backup_at(&manager, "old", 5, 9);
        let second = backup_at(&manager, "old", 6, 9);

        manager.rename("old", "new").unwrap();

        assert_eq!(manager.read("new").unwrap(), "content");
        assert_eq!(manager.list_backups("new").unwrap(), vec![second, first]);
        assert!(manager
            .root()
            .join("new")
            .join("new_20250205-090000.bak")
            .is_file());

        let listed = manager.list().unwrap();
        assert_eq!(listed.get("new"), Some(&2));
        assert!(!listed.contains_key("old"));
    }

    #[test]
    fn test_rename_errors() {
        let (manager, _temp) = setup();
        manager.create("a", "", false).unwrap();
        manager.create("b", "", false).unwrap();

        assert!(matches!(
            manager.rename("ghost", "c").unwrap_err(),
            VaultError::EntryNotFound(_)
        ));
        assert!(matches!(
            manager.rename("a", "b").unwrap_err(),
            VaultError::EntryAlreadyExists(_)
        ));
    }

    #[test]
    fn test_list_on_missing_root() {
        let (manager, _temp) = setup();
        assert!(manager.list().unwrap().is_empty());
    }

    #[test]
    fn test_list_heals_lost_index() {
        let (manager, _temp) = setup();
        manager.create("notes", "x", false).unwrap();
        backup_at(&manager, "notes", 5, 9);
        backup_at(&manager, "notes", 6, 9);
        manager.create("todo", "y", false).unwrap();

        fs::remove_file(manager.store().index().path()).unwrap();

        let listed = manager.list().unwrap();
        assert_eq!(listed.get("notes"), Some(&2));
        assert_eq!(listed.get("todo"), Some(&0));
        assert_eq!(manager.store().index().get("notes").unwrap(), 2);
    }

    #[test]
    fn test_list_ignores_index_file_and_hidden_dirs() {
        let (manager, _temp) = setup();
        manager.create("notes", "x", false).unwrap();
        fs::create_dir_all(manager.root().join(".git")).unwrap();

        let listed = manager.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed.contains_key("notes"));
    }

    #[test]
    fn test_reindex_after_manual_tampering() {
        let (manager, _temp) = setup();
        manager.create("notes", "x", false).unwrap();
        backup_at(&manager, "notes", 5, 9);
        manager.store().index().set("notes", 42).unwrap();

        let counts = manager.reindex().unwrap();
        assert_eq!(counts.get("notes"), Some(&1));
        assert_eq!(manager.list().unwrap().get("notes"), Some(&1));
    }

    #[test]
    fn test_retention_limit_after_snapshot() {
        let (manager, temp) = setup();
        manager.create("notes", "v0", false).unwrap();
        backup_at(&manager, "notes", 1, 9);
        backup_at(&manager, "notes", 2, 9);

        let limited = EntryManager::new(temp.path().join("vault")).with_retention(Some(2));
        limited.update("notes", "v1", true).unwrap();

        let backups = limited.list_backups("notes").unwrap();
        assert_eq!(backups.len(), 2);
        assert_eq!(limited.read_backup("notes", "latest").unwrap(), "v0");
        assert_eq!(limited.list().unwrap().get("notes"), Some(&2));
    }

    #[test]
    fn test_zero_retention_keeps_latest_snapshot() {
        let (manager, temp) = setup();
        manager.create("notes", "v0", false).unwrap();

        let limited = EntryManager::new(temp.path().join("vault")).with_retention(Some(0));
        limited.update("notes", "v1", true).unwrap();

        assert_eq!(limited.list_backups("notes").unwrap().len(), 1);
        assert_eq!(limited.read_backup("notes", "latest").unwrap(), "v0");
    }
}
