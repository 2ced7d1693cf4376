//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the vault and entry layers.

pub mod editor;
pub mod file;
pub mod vault;

pub use file::{handle_file_command, FileCommands};
pub use vault::{handle_vault_command, VaultCommands};
