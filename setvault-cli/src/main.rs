/*!
SetVault CLI - Command-line interface for backup sets stored on a local directory.

This CLI lists the backup sets found on a storage target, starts new sets and reads,
writes or removes individual items of a set.
*/

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use setvault_core::observability::init_observability;
use setvault_core::{
    BackupPlugin, BackupToken, DocumentTreePlugin, LocalDocumentTree, VaultConfig,
};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tabled::{Table, Tabled};
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "setvault")]
#[command(about = "CLI for SetVault backup sets")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json: bool,

    /// Print discovery metrics in Prometheus text format after the command
    #[cfg(feature = "metrics")]
    #[arg(long, global = true)]
    print_metrics: bool,

    /// JSON configuration file
    #[arg(short, long, global = true, env = "SETVAULT_CONFIG")]
    config: Option<PathBuf>,

    /// Storage target directory, overrides the configured location
    #[arg(short, long, global = true)]
    path: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the backup sets on the storage target
    List,
    /// Check whether a directory holds at least one backup set
    HasBackup {
        /// Storage target to inspect
        location: String,
    },
    /// Start a new backup set named after the current time
    Init,
    /// Store a local file as an item of a backup set
    Put {
        #[arg(value_parser = parse_token)]
        token: BackupToken,
        name: String,
        file: PathBuf,
    },
    /// Print an item of a backup set
    Get {
        #[arg(value_parser = parse_token)]
        token: BackupToken,
        name: String,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Remove an item from a backup set
    Rm {
        #[arg(value_parser = parse_token)]
        token: BackupToken,
        name: String,
    },
}

#[derive(Tabled)]
struct BackupSetInfo {
    #[tabled(rename = "Token")]
    token: String,
    #[tabled(rename = "Created")]
    created: String,
    #[tabled(rename = "Metadata")]
    metadata: String,
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    if cli.json {
        init_observability(true)?;
    } else {
        init_logging(cli.verbose);
    }

    let config = load_config(&cli)?;
    let mut plugin =
        DocumentTreePlugin::from_config(Arc::new(LocalDocumentTree::new()), config.clone())?;

    match cli.command {
        Commands::List => list_backup_sets(&mut plugin)?,
        Commands::HasBackup { location } => {
            if plugin.has_backup(&location)? {
                println!("✓ {location} holds at least one backup set");
            } else {
                println!("No backup sets found at {location}");
            }
        }
        Commands::Init => init_backup_set(&mut plugin, config, cli.config.as_ref())?,
        Commands::Put { token, name, file } => {
            let mut input =
                File::open(&file).with_context(|| format!("Failed to open {}", file.display()))?;
            let mut output = plugin.get_output_stream(token, &name)?;
            let written = io::copy(&mut input, &mut output)?;
            output.flush()?;
            println!("✓ Stored {name} in backup set {token} ({})", format_size(written));
        }
        Commands::Get { token, name, out } => {
            let mut input = plugin.get_input_stream(token, &name)?;
            match out {
                Some(path) => {
                    let mut output = File::create(&path)
                        .with_context(|| format!("Failed to create {}", path.display()))?;
                    io::copy(&mut input, &mut output)?;
                }
                None => {
                    io::copy(&mut input, &mut io::stdout().lock())?;
                }
            }
        }
        Commands::Rm { token, name } => {
            plugin.remove_data(token, &name)?;
            println!("✓ Removed {name} from backup set {token}");
        }
    }

    #[cfg(feature = "metrics")]
    if cli.print_metrics {
        let metrics = setvault_core::observability::VaultMetrics::global().gather_metrics()?;
        print!("{metrics}");
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug"))
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> Result<VaultConfig, anyhow::Error> {
    let mut config = match &cli.config {
        Some(path) => VaultConfig::load(path)?,
        None => VaultConfig::default(),
    };
    if let Some(path) = &cli.path {
        config.storage_location = Some(path.clone());
    }
    if config.storage_location.is_none() {
        config.storage_location = Some(".".to_string());
    }
    debug!("Using configuration {:?}", config);
    Ok(config)
}

fn parse_token(value: &str) -> Result<BackupToken, String> {
    BackupToken::parse(value).ok_or_else(|| format!("'{value}' is not a 13-digit backup token"))
}

fn list_backup_sets(plugin: &mut DocumentTreePlugin<LocalDocumentTree>) -> Result<(), anyhow::Error> {
    let Some(backups) = plugin.available_backups() else {
        println!("No backup root found on the storage target");
        return Ok(());
    };

    let mut sets = Vec::new();
    for backup in backups {
        let metadata = match backup.open() {
            Ok(mut input) => {
                let mut buf = Vec::new();
                input.read_to_end(&mut buf)?;
                format_size(buf.len() as u64)
            }
            Err(e) => {
                debug!("Failed to read metadata of {}: {}", backup.token, e);
                "Unreadable".to_string()
            }
        };
        sets.push(BackupSetInfo {
            token: backup.token.to_string(),
            created: format_created(backup.token),
            metadata,
        });
    }

    if sets.is_empty() {
        println!("No backup sets found");
    } else {
        let table = Table::new(sets);
        println!("{table}");
    }

    Ok(())
}

fn init_backup_set(
    plugin: &mut DocumentTreePlugin<LocalDocumentTree>,
    mut config: VaultConfig,
    config_path: Option<&PathBuf>,
) -> Result<(), anyhow::Error> {
    let token = BackupToken::now();
    plugin.start_new_restore_set(token)?;
    plugin.initialize_device()?;

    if let Some(path) = config_path {
        config.token = Some(token.value());
        config
            .save(path)
            .map_err(|e| anyhow!("Backup set {token} created but config not saved: {e}"))?;
        info!("Saved token {} to {}", token, path.display());
    }

    println!("✓ Started backup set {token}");
    Ok(())
}

fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

fn format_created(token: BackupToken) -> String {
    use chrono::Local;

    match token.created_at() {
        Some(created) => created
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None => "Unknown".to_string(),
    }
}
