//! Backup system for TextVault
//!
//! Every entry keeps an ordered history of immutable, timestamped copies of its
//! content next to the primary file.
//!
//! # Architecture
//!
//! - `BackupId`: names a backup and defines the on-disk naming scheme
//! - `BackupSpec`: parses user-facing specifications (`latest`, `N`, dates)
//! - `BackupIndex`: per-vault cache of backup counts, rebuildable from disk
//! - `BackupStore`: creates, lists, resolves and deletes backup files
//!
//! # Layout
//!
//! ```text
//! <vault root>/
//!   index.json
//!   notes/
//!     notes                          primary content
//!     notes_20250207-081500.bak      backups
//!     notes_20250207-081500-1.bak
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use textvault::backup::BackupStore;
//!
//! let store = BackupStore::new("/home/me/vault");
//! let id = store.create_backup("notes")?;
//! let same = store.resolve("notes", "latest")?;
//! assert_eq!(id, same);
//! ```

mod id;
mod index;
mod spec;
mod store;

pub use id::{BackupId, BACKUP_EXTENSION};
pub use index::{count_backup_files, BackupCounts, BackupIndex, INDEX_FILE_NAME};
pub use spec::BackupSpec;
pub use store::BackupStore;
