//! Vault CLI commands
//!
//! Implements CLI commands for registering, switching and transferring vaults.

use std::path::PathBuf;

use clap::Subcommand;

use crate::display::format_vault_list;
use crate::error::{VaultError, VaultResult};
use crate::vault::VaultRegistry;

/// Vault subcommands
#[derive(Subcommand)]
pub enum VaultCommands {
    /// Register an existing directory as a vault
    Add {
        /// Name of the vault
        name: String,
        /// Root directory of the vault
        path: PathBuf,
    },

    /// Unregister a vault (files are kept)
    Remove {
        /// Name of the vault
        name: String,
    },

    /// Unregister a vault and delete its directory
    Delete {
        /// Name of the vault
        name: String,
        /// Actually delete (required)
        #[arg(long)]
        force: bool,
    },

    /// Switch the current vault
    Switch {
        /// Name of the vault
        name: String,
    },

    /// List all vaults
    List,

    /// Show the current vault
    Current,

    /// Export a vault to an archive
    Dump {
        /// Name of the vault
        name: String,
        /// Archive file to write
        archive: PathBuf,
    },

    /// Import an archive as a new vault
    Import {
        /// Archive file to read
        archive: PathBuf,
        /// Directory to unpack into (must not exist)
        target: PathBuf,
    },
}

/// Handle a vault command
pub fn handle_vault_command(registry: &VaultRegistry, cmd: VaultCommands) -> VaultResult<()> {
    match cmd {
        VaultCommands::Add { name, path } => {
            let root = registry.add(&name, &path)?;
            println!("Added vault '{}' at {}", name, root.display());
        }

        VaultCommands::Remove { name } => {
            let root = registry.remove(&name)?;
            println!("Removed vault '{}' (files kept at {})", name, root.display());
        }

        VaultCommands::Delete { name, force } => {
            let root = registry.get(&name)?;
            if !force {
                println!(
                    "WARNING: This will permanently delete {} and everything in it!",
                    root.display()
                );
                println!("To proceed, run again with --force flag:");
                println!("  tvault vault delete {} --force", name);
                return Ok(());
            }

            registry.delete(&name)?;
            println!("Deleted vault '{}' ({})", name, root.display());
        }

        VaultCommands::Switch { name } => {
            let current = registry.switch(&name)?;
            println!("Switched to vault '{}' ({})", current.name, current.path.display());
        }

        VaultCommands::List => {
            let vaults = registry.list()?;
            // A dangling pointer only hides the marker here
            let current = match registry.current() {
                Ok(current) => Some(current.name),
                Err(VaultError::NoCurrentVault) => None,
                Err(e) => return Err(e),
            };
            println!("{}", format_vault_list(&vaults, current.as_deref()));
        }

        VaultCommands::Current => {
            let current = registry.current()?;
            println!("{} ({})", current.name, current.path.display());
        }

        VaultCommands::Dump { name, archive } => {
            let summary = registry.dump(&name, &archive)?;
            println!(
                "Exported vault '{}' to {} ({} file(s), {} bytes)",
                name,
                archive.display(),
                summary.files,
                summary.archive_bytes
            );
        }

        VaultCommands::Import { archive, target } => {
            let name = registry.import(&archive, &target)?;
            println!("Imported vault '{}' into {}", name, target.display());
        }
    }

    Ok(())
}
