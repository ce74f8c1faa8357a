use anyhow::{Context, Result};
use backup_orchestrator::config::{self, Config};
use backup_orchestrator::managers::backup::{BackupManager, Workflow};
use backup_orchestrator::managers::logging::{init_console_logging, init_logging, LoggingConfig};
use backup_orchestrator::managers::restore::RestoreManager;
use backup_orchestrator::strategies::MySqlShell;
use backup_orchestrator::utils::locker::RunLock;
use backup_orchestrator::utils::setup::{self, DependencyInstaller};
use backup_orchestrator::utils::{RealExecutor, ZipArchiver};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "backup-orchestrator")]
#[command(about = "Dump, archive and publish MySQL schemas or container backups", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "config.toml")]
    config: PathBuf,

    /// Keep artifacts in the local directory instead of uploading them
    #[arg(long, global = true)]
    only_dump: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Back up every selected MySQL schema
    Mysql,

    /// Capture the backup produced inside the configured container
    Container,

    /// Load a MySQL Shell dump (directory or .zip artifact) into the server
    Restore {
        /// Dump directory or zip artifact
        #[arg(short, long)]
        input: PathBuf,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Install mysqlsh and archive tools (Debian/Ubuntu)
    Setup,

    /// Validate configuration file
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup runs before any config exists
    if let Commands::Setup = cli.command {
        init_console_logging();
        return handle_setup().await;
    }

    let config = config::load_config(&cli.config)
        .with_context(|| format!("Failed to load configuration from {:?}", cli.config))?;

    // Must keep guard alive
    let _log_guard = init_logging(&LoggingConfig::from_settings(&config.logging))?;

    match cli.command {
        Commands::Mysql => handle_backup(&config, Workflow::MySql, cli.only_dump).await,
        Commands::Container => handle_backup(&config, Workflow::Container, cli.only_dump).await,
        Commands::Restore { input, yes } => handle_restore(&config, &input, yes).await,
        Commands::Validate => handle_validate(&config, cli.only_dump),
        Commands::Setup => unreachable!("handled before config loading"),
    }
}

/// Cancel `token` on Ctrl-C or SIGTERM
fn spawn_signal_handler(token: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    error!("Failed to listen for SIGTERM: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }

        warn!("Shutdown signal received, cancelling run");
        token.cancel();
    });
}

async fn handle_backup(config: &Config, workflow: Workflow, only_dump: bool) -> Result<()> {
    setup::require_tools(workflow.required_tools())?;

    let manager = BackupManager::from_config(config, workflow, only_dump, Arc::new(RealExecutor::new()))?;

    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    let summary = manager.run(&cancel).await?;
    println!(
        "✓ Backup completed: {} of {} targets succeeded",
        summary.success_count(),
        summary.total()
    );
    Ok(())
}

async fn handle_restore(config: &Config, input: &Path, yes: bool) -> Result<()> {
    use dialoguer::Confirm;

    setup::require_tools(setup::RESTORE_TOOLS)?;

    println!("=== Restore ===\n");
    println!("Input:  {}", input.display());
    println!("Server: {}@{}:{}", config.mysql.user, config.mysql.host, config.mysql.port);
    println!();

    if !yes {
        let confirm = Confirm::new()
            .with_prompt("Loading the dump may overwrite existing schemas. Proceed?")
            .default(false)
            .interact()?;

        if !confirm {
            println!("Restore cancelled.");
            return Ok(());
        }
    }

    // Restores and backups never overlap
    let mut lock = RunLock::acquire(&config.lock_file)?;

    let executor = Arc::new(RealExecutor::new());
    let timeout = config.backup.command_timeout();
    let manager = RestoreManager::new(
        MySqlShell::new(config.mysql.clone(), executor.clone(), timeout),
        Arc::new(ZipArchiver::new(executor, timeout)),
        &config.encryption.password,
        &config.backup.temp_dir,
    );

    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    let result = manager.restore(input, &cancel).await;
    lock.release();
    result?;

    println!("✓ Restore completed successfully");
    Ok(())
}

fn handle_validate(config: &Config, only_dump: bool) -> Result<()> {
    if !only_dump {
        config::validate_remote_storage(&config.storage)?;
    }

    println!("Configuration is valid!");
    println!("Lock file: {}", config.lock_file.display());
    println!("Temp dir: {}", config.backup.temp_dir.display());
    if only_dump {
        println!("Destination: {} (local)", config.backup.local_dir.display());
    } else {
        println!(
            "Destination: s3://{}/{}",
            config.storage.bucket,
            config.storage.path_prefix.trim_matches('/')
        );
    }
    println!("Retention: {} hours", config.retention.hours);
    println!(
        "Encryption: {}",
        if config.encryption.password.is_empty() { "disabled" } else { "enabled" }
    );
    Ok(())
}

async fn handle_setup() -> Result<()> {
    if !setup::host_is_debian_like() {
        anyhow::bail!("Automatic setup only supports Debian/Ubuntu; install mysqlsh, zip and unzip manually");
    }

    let mysqlsh_present = setup::missing_tools(&["mysqlsh"]).is_empty();
    DependencyInstaller::new(Arc::new(RealExecutor::new()))
        .install(mysqlsh_present)
        .await?;

    info!("Setup completed");
    println!("✓ Dependencies installed");
    Ok(())
}
