use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use textvault::cli::{handle_file_command, handle_vault_command, FileCommands, VaultCommands};
use textvault::config::{paths::TvaultPaths, settings::Settings};
use textvault::entry::EntryManager;
use textvault::vault::{VaultRegistry, DEFAULT_VAULT_NAME};
use textvault::VaultError;

#[derive(Parser)]
#[command(
    name = "tvault",
    version,
    about = "Local text vaults with timestamped backups",
    long_about = "TextVault keeps plain-text entries in named vaults. Every entry \
                  can be snapshotted into timestamped backups that can be listed, \
                  read and recovered from the command line."
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Vault management commands
    #[command(subcommand)]
    Vault(VaultCommands),

    /// File commands for the current vault
    #[command(subcommand)]
    File(FileCommands),

    /// Show current configuration and paths
    Config,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    // Already set when embedded in a test harness
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            let code = err
                .downcast_ref::<VaultError>()
                .map_or(1, VaultError::exit_code);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let paths = TvaultPaths::new()?;
    paths.ensure_directories()?;
    let settings = Settings::load_or_create(&paths)?;
    debug!(config = %paths.base_dir().display(), "Loaded settings");

    let registry = VaultRegistry::new(paths.clone());
    if registry.ensure_default()? {
        registry.switch(DEFAULT_VAULT_NAME)?;
    }

    match cli.command {
        Some(Commands::Vault(cmd)) => {
            handle_vault_command(&registry, cmd)?;
        }
        Some(Commands::File(cmd)) => {
            let current = registry.current()?;
            debug!(vault = %current.name, path = %current.path.display(), "Using vault");
            let manager = EntryManager::new(current.path)
                .with_retention(settings.backup_retention.max_backups);
            handle_file_command(&manager, &settings, cmd)?;
        }
        Some(Commands::Config) => {
            println!("TextVault Configuration");
            println!("=======================");
            println!("Config directory: {}", paths.base_dir().display());
            println!("Registry file:    {}", paths.registry_file().display());
            println!("Settings file:    {}", paths.settings_file().display());
            match registry.current() {
                Ok(current) => println!(
                    "Current vault:    {} ({})",
                    current.name,
                    current.path.display()
                ),
                Err(VaultError::NoCurrentVault) => println!("Current vault:    (none)"),
                Err(e) => return Err(e.into()),
            }
            println!();
            println!("Settings:");
            println!(
                "  Editor:             {}",
                settings.editor.as_deref().unwrap_or("(from $VISUAL/$EDITOR)")
            );
            println!("  Snapshot on update: {}", settings.snapshot_on_update);
            match settings.backup_retention.max_backups {
                Some(max) => println!("  Max backups:        {}", max),
                None => println!("  Max backups:        unlimited"),
            }
        }
        None => {
            println!("TextVault - local text vaults with timestamped backups");
            println!();
            println!("Run 'tvault --help' for usage information.");
        }
    }

    Ok(())
}
