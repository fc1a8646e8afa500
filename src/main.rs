use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use db_backup_manager::config::{self, Config};
use db_backup_manager::managers::logging::{self, LoggingConfig, TracingLogger};
use db_backup_manager::managers::notification::DiscordNotifier;
use db_backup_manager::managers::pipeline::{self, BackupJob, Pipeline};
use db_backup_manager::resolver::{
    BackendResolver, DeclarativeSelection, InteractiveSelection, ResolvedStorage, SelectionPolicy,
};
use db_backup_manager::utils::runtime::cancel_on_interrupt;
use db_backup_manager::utils::{CommandExecutor, RealExecutor};
use db_backup_manager::DatabaseConnector;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "db-backup-manager")]
#[command(about = "Back up and restore databases to local or cloud storage", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Dump the selected database and store the backup
    Backup {
        /// Path to configuration file
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Load a stored backup and restore it into the selected database
    Restore {
        /// Path to configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let (command, config_path) = match cli.command {
        Commands::Backup { config } => (pipeline::Command::Backup, config),
        Commands::Restore { config } => (pipeline::Command::Restore, config),
    };

    let config_path = config::expand_tilde(&config_path);
    let config = match config::load_config(&config_path) {
        Ok(config) => config,
        Err(e) => {
            logging::init_console_logging();
            error!("Failed to load configuration from {:?}: {}", config_path, e);
            return ExitCode::from(1);
        }
    };

    // Setup logging with file rotation (must keep guard alive)
    let _log_guard = match logging::init_logging(&LoggingConfig::from_config(&config.logging)) {
        Ok(guard) => Some(guard),
        Err(e) => {
            logging::init_console_logging();
            warn!("File logging unavailable: {:#}", e);
            None
        }
    };

    match run(command, &config) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(1)
        }
    }
}

/// Resolve both backends and run the pipeline, returning the exit code
fn run(command: pipeline::Command, config: &Config) -> Result<u8> {
    let executor: Arc<dyn CommandExecutor> = Arc::new(RealExecutor::new());

    let (database, storage) = if std::io::stdin().is_terminal() {
        resolve(&BackendResolver::new(InteractiveSelection, executor), config)?
    } else {
        resolve(&BackendResolver::new(DeclarativeSelection, executor), config)?
    };

    let cancel = CancellationToken::new();
    if let Err(e) = cancel_on_interrupt(cancel.clone()) {
        warn!("Ctrl-C handling unavailable: {}", e);
    }

    let mut job = BackupJob::new(command, &storage.working_dir, Local::now());
    info!("Working file: {}", job.working_file_path.display());

    let mut runner = Pipeline::new(database, storage.connector, Box::new(TracingLogger))
        .with_cancellation(cancel)
        .keep_working_file(config.keep_working_file)
        .with_restore_key(storage.restore_key);

    if let Some(notifier) = DiscordNotifier::from_config(&config.notifications) {
        runner = runner.with_notifier(Box::new(notifier));
    }

    let state = runner.run(&mut job);
    Ok(state.exit_code())
}

fn resolve<P: SelectionPolicy>(
    resolver: &BackendResolver<P>,
    config: &Config,
) -> Result<(Box<dyn DatabaseConnector>, ResolvedStorage)> {
    let database = resolver
        .resolve_database_connector(config)
        .context("Failed to resolve database backend")?;
    let storage = resolver
        .resolve_storage_connector(config)
        .context("Failed to resolve storage backend")?;
    Ok((database, storage))
}
