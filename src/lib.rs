//! TextVault - local file-backed text store with timestamped backups
//!
//! This library provides the core functionality for the `tvault` command.
//! Text entries live in named vaults; every entry keeps a history of
//! timestamped backups that can be listed, read and recovered.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration and path management
//! - `error`: Custom error types
//! - `storage`: Atomic JSON and byte file helpers
//! - `backup`: Backup files, backup specs and the per-vault backup index
//! - `entry`: Entry lifecycle (create, read, update, delete, rename, recover)
//! - `vault`: Vault registry and archive transfer
//! - `cli`: Command handlers
//! - `display`: Terminal formatting
//!
//! # Example
//!
//! ```rust,ignore
//! use textvault::entry::EntryManager;
//!
//! let manager = EntryManager::new("/home/me/notes");
//! manager.create("todo", "buy milk", false)?;
//! manager.update("todo", "buy oat milk", true)?;
//! assert_eq!(manager.read_backup("todo", "latest")?, "buy milk");
//! ```

pub mod backup;
pub mod cli;
pub mod config;
pub mod display;
pub mod entry;
pub mod error;
pub mod storage;
pub mod vault;

pub use error::{VaultError, VaultResult};
