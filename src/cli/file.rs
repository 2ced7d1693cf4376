//! File CLI commands
//!
//! Implements CLI commands for entries in the current vault.

use clap::Subcommand;

use super::editor::{edit_text, read_stdin, resolve_editor};
use crate::config::settings::Settings;
use crate::display::{format_backup_list, format_entry_list};
use crate::entry::{DeleteOutcome, EntryManager};
use crate::error::{VaultError, VaultResult};

/// File subcommands
#[derive(Subcommand)]
pub enum FileCommands {
    /// Create a new file
    Create {
        /// Name of the file
        filename: String,
        /// Initial content
        #[arg(short, long, default_value = "")]
        content: String,
        /// Overwrite the content of an existing file (backups are kept)
        #[arg(short, long)]
        force: bool,
    },

    /// Read a file
    Read {
        /// Name of the file
        filename: String,
        /// Read from backup (latest, N, YYYY_MM_DD, YYYY_MM_DD-hh:mm:ss)
        #[arg(long)]
        backup: Option<String>,
    },

    /// Update a file in an editor
    Update {
        /// Name of the file
        filename: String,
        /// Create backup before editing
        #[arg(long)]
        backup: bool,
        /// Use vim instead of the configured editor
        #[arg(long)]
        vim: bool,
        /// Read the new content from standard input instead of an editor
        #[arg(long, conflicts_with = "vim")]
        stdin: bool,
    },

    /// Delete a file, or only its backups
    Delete {
        /// Name of the file
        filename: String,
        /// Delete backups instead of the file (all, or the N oldest)
        #[arg(long, num_args = 0..=1, default_missing_value = "all")]
        backup: Option<String>,
    },

    /// Rename a file
    Rename {
        /// Old file name
        old_name: String,
        /// New file name
        new_name: String,
    },

    /// Create backup of a file
    Backup {
        /// Name of the file
        filename: String,
    },

    /// Recover file from backup
    Recover {
        /// Name of the file
        filename: String,
        /// Backup specification (latest, N, YYYY_MM_DD, YYYY_MM_DD-hh:mm:ss)
        backup_spec: String,
    },

    /// List all files
    List,

    /// List the backups of a file
    Backups {
        /// Name of the file
        filename: String,
    },

    /// Rebuild the backup index from disk
    Reindex,
}

/// Which backups `file delete --backup` should remove
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BackupSelection {
    All,
    Oldest(usize),
}

fn parse_backup_selection(value: &str) -> VaultResult<BackupSelection> {
    if value.eq_ignore_ascii_case("all") {
        return Ok(BackupSelection::All);
    }
    match value.parse::<usize>() {
        Ok(n) if n > 0 => Ok(BackupSelection::Oldest(n)),
        _ => Err(VaultError::InvalidBackupSpec(format!(
            "{} (expected 'all' or a positive number of backups)",
            value
        ))),
    }
}

/// Handle a file command
pub fn handle_file_command(
    manager: &EntryManager,
    settings: &Settings,
    cmd: FileCommands,
) -> VaultResult<()> {
    match cmd {
        FileCommands::Create {
            filename,
            content,
            force,
        } => {
            manager.create(&filename, &content, force)?;
            println!("Created file '{}'", filename);
        }

        FileCommands::Read { filename, backup } => {
            let content = match backup {
                Some(spec) => manager.read_backup(&filename, &spec)?,
                None => manager.read(&filename)?,
            };
            println!("{}", content);
        }

        FileCommands::Update {
            filename,
            backup,
            vim,
            stdin,
        } => {
            let current = manager.read(&filename)?;
            let edited = if stdin {
                read_stdin()?
            } else {
                edit_text(&resolve_editor(settings, vim), &filename, &current)?
            };

            if edited == current {
                println!("No changes made to '{}'", filename);
                return Ok(());
            }

            let snapshot = backup || settings.snapshot_on_update;
            match manager.update(&filename, &edited, snapshot)? {
                Some(id) => println!("Updated file '{}' (backup {})", filename, id),
                None => println!("Updated file '{}'", filename),
            }
        }

        FileCommands::Delete { filename, backup } => {
            let outcome = match backup.as_deref().map(parse_backup_selection).transpose()? {
                None => manager.delete(&filename, false, None)?,
                Some(BackupSelection::All) => manager.delete(&filename, true, None)?,
                Some(BackupSelection::Oldest(n)) => manager.delete(&filename, false, Some(n))?,
            };

            match outcome {
                DeleteOutcome::EntryRemoved { backups } => {
                    println!("Deleted file '{}' and {} backup(s)", filename, backups)
                }
                DeleteOutcome::BackupsPruned { removed, remaining } => println!(
                    "Deleted {} backup(s) for '{}' ({} remaining)",
                    removed, filename, remaining
                ),
            }
        }

        FileCommands::Rename { old_name, new_name } => {
            manager.rename(&old_name, &new_name)?;
            println!("Renamed '{}' to '{}'", old_name, new_name);
        }

        FileCommands::Backup { filename } => {
            let id = manager.snapshot(&filename)?;
            println!("Created backup for '{}': {}", filename, id);
        }

        FileCommands::Recover {
            filename,
            backup_spec,
        } => {
            let id = manager.recover(&filename, &backup_spec)?;
            println!("Recovered '{}' from backup {}", filename, id);
        }

        FileCommands::List => {
            let entries = manager.list()?;
            println!("{}", format_entry_list(&entries));
        }

        FileCommands::Backups { filename } => {
            let backups = manager.list_backups(&filename)?;
            println!("{}", format_backup_list(&filename, &backups));
        }

        FileCommands::Reindex => {
            let counts = manager.reindex()?;
            let total: usize = counts.values().sum();
            println!(
                "Rebuilt index: {} file(s), {} backup(s)",
                counts.len(),
                total
            );
        }
    }

    Ok(())
}
