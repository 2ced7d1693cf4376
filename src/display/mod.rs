//! Display formatting for terminal output
//!
//! Provides utilities for formatting vaults, entries and backups for terminal
//! display.

pub mod listing;

pub use listing::{format_backup_list, format_entry_list, format_vault_list};
