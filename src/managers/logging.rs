//! Logging manager with file rotation
//!
//! Provides dual-output logging:
//! - Console: INFO level with concise format
//! - File (when `Logging.Directory` is set): configured level, daily rotation
//!
//! The pipeline reports progress through the [`RunLogger`] collaborator,
//! which the binary backs with `tracing`.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::config::{expand_tilde, LogSettings};

/// File name prefix for rotated log files
const LOG_FILE_PREFIX: &str = "db-backup-manager";

/// Logging collaborator used by the pipeline
pub trait RunLogger: Send {
    fn log_info(&self, message: &str);
    fn log_warning(&self, message: &str);
    fn log_error(&self, message: &str);
}

/// [`RunLogger`] that forwards to the global `tracing` subscriber
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl RunLogger for TracingLogger {
    fn log_info(&self, message: &str) {
        tracing::info!("{}", message);
    }

    fn log_warning(&self, message: &str) {
        tracing::warn!("{}", message);
    }

    fn log_error(&self, message: &str) {
        tracing::error!("{}", message);
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Directory for log files; console only when unset
    pub log_directory: Option<PathBuf>,
    /// Log level for file output (console always uses INFO)
    pub log_level: Level,
    /// Maximum number of log files to keep
    pub max_files: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_directory: None,
            log_level: Level::INFO,
            max_files: 10,
        }
    }
}

impl LoggingConfig {
    /// Create from the `Logging` section of the configuration
    pub fn from_config(settings: &LogSettings) -> Self {
        let level = match settings.level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" | "warning" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };

        Self {
            log_directory: settings.directory.clone(),
            log_level: level,
            max_files: settings.max_files,
        }
    }
}

/// Initialize logging with console and optional file outputs
///
/// Returns a guard that must be kept alive for the duration of the program.
/// When the guard is dropped, any remaining logs are flushed to disk.
pub fn init_logging(config: &LoggingConfig) -> Result<LogGuard> {
    let Some(directory) = &config.log_directory else {
        tracing_subscriber::registry()
            .with(console_layer())
            .try_init()
            .context("Failed to install log subscriber")?;
        return Ok(LogGuard { _file_guard: None });
    };

    let log_dir = expand_tilde(directory);
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory: {:?}", log_dir))?;

    // Daily files named db-backup-manager.YYYY-MM-DD.log
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .build(&log_dir)
        .with_context(|| format!("Failed to create log file in {:?}", log_dir))?;

    let (non_blocking, file_guard) = tracing_appender::non_blocking(file_appender);

    // File layer: configured level, no colors
    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_span_events(FmtSpan::NONE)
        .with_filter(level_filter(config.log_level));

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer())
        .try_init()
        .context("Failed to install log subscriber")?;

    cleanup_old_logs(&log_dir, config.max_files)?;

    Ok(LogGuard {
        _file_guard: Some(file_guard),
    })
}

/// Console layer: INFO level, concise format
fn console_layer<S>() -> impl Layer<S> + Send + Sync + 'static
where
    S: Subscriber + for<'a> LookupSpan<'a> + 'static,
{
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false)
        .with_level(true)
        .with_span_events(FmtSpan::NONE)
        .with_filter(level_filter(Level::INFO))
}

/// Initialize simple console-only logging (for when config isn't available)
pub fn init_console_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Ignore the error if a subscriber is already installed
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .try_init();
}

/// Create a level filter for tracing layers; `RUST_LOG` wins when set
fn level_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()))
}

/// Cleanup old log files, keeping only the most recent N files
fn cleanup_old_logs(log_dir: &Path, max_files: u32) -> Result<()> {
    let mut log_files: Vec<_> = fs::read_dir(log_dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            name.starts_with(LOG_FILE_PREFIX) && name.ends_with(".log")
        })
        .collect();

    // Sort by modification time (newest first)
    log_files.sort_by(|a, b| {
        let a_time = a.metadata().and_then(|m| m.modified()).ok();
        let b_time = b.metadata().and_then(|m| m.modified()).ok();
        b_time.cmp(&a_time)
    });

    for file in log_files.into_iter().skip(max_files as usize) {
        if let Err(e) = fs::remove_file(file.path()) {
            tracing::warn!("Failed to remove old log file {:?}: {}", file.path(), e);
        } else {
            tracing::debug!("Removed old log file: {:?}", file.path());
        }
    }

    Ok(())
}

/// Guard that keeps the logging system alive
///
/// When dropped, flushes any remaining logs to disk.
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
}
