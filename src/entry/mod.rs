//! Entry management for TextVault
//!
//! An entry is a named piece of text living in its own directory inside a vault
//! root, next to its backups.

pub mod manager;
pub mod name;

pub use manager::{DeleteOutcome, EntryManager};
pub use name::{check_entry_name, validate_entry_name, EntryNameError};
