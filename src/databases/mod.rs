//! Database connectors
//!
//! Every engine is driven through its native client tools. [`ToolConnector`]
//! holds the behaviour shared by all engines (session state, atomic artifact
//! writes, error mapping); each engine only describes its commands through
//! [`EngineTool`].

pub mod mongodb;
pub mod mysql;
pub mod postgres;

use crate::config::DatabaseKind;
use crate::utils::{CommandError, CommandExecutor, CommandSpec};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub use mongodb::MongoDbTool;
pub use mysql::MySqlTool;
pub use postgres::PostgresTool;

#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("Required client tool '{0}' not found in PATH")]
    ToolMissing(String),

    #[error("Failed to connect to {target}: {cause}")]
    Failed { target: String, cause: String },

    #[error("Connection attempt cancelled")]
    Cancelled,
}

#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("Backup attempted without an open connection")]
    NotConnected,

    #[error("Failed to write backup artifact {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Database dump failed: {cause}")]
    Failed { cause: String },

    #[error("Backup cancelled")]
    Cancelled,
}

#[derive(Debug, thiserror::Error)]
pub enum RestoreError {
    #[error("Restore attempted without an open connection")]
    NotConnected,

    #[error("Backup artifact not found: {0:?}")]
    SourceMissing(PathBuf),

    #[error("Restore was partially applied: {cause}")]
    Partial { cause: String },

    #[error("Restore failed (database state unknown): {cause}")]
    Unknown { cause: String },

    #[error("Restore cancelled (database state unknown)")]
    Cancelled,
}

impl ConnectionError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ConnectionError::Cancelled)
    }
}

impl BackupError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, BackupError::Cancelled)
    }
}

impl RestoreError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RestoreError::Cancelled)
    }
}

/// Capability every database variant provides to the pipeline
pub trait DatabaseConnector: Send {
    /// Engine name (for logging)
    fn name(&self) -> &'static str;

    /// Establish the session; a no-op when already connected
    fn connect(&mut self, cancel: &CancellationToken) -> Result<(), ConnectionError>;

    /// Release the session; a no-op when not connected
    fn disconnect(&mut self) -> Result<(), ConnectionError>;

    /// Write a complete backup artifact to `destination`
    fn backup(&self, destination: &Path, cancel: &CancellationToken) -> Result<(), BackupError>;

    /// Replace the database contents from the artifact at `source`
    fn restore(&self, source: &Path, cancel: &CancellationToken) -> Result<(), RestoreError>;
}

/// Validated connection settings for a database entry
#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub host: String,
    pub database_name: String,
    pub username: String,
    pub password: String,
    pub timeout: Duration,
}

/// Host and port parsed from a `host[:port]` setting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    /// Parse `host` or `host:port`, falling back to `default_port`
    pub fn parse(value: &str, default_port: u16) -> Result<Self, String> {
        let value = value.trim();

        // Bracketed IPv6 literal, optionally followed by a port
        if let Some(rest) = value.strip_prefix('[') {
            let (host, tail) = rest
                .split_once(']')
                .ok_or_else(|| format!("Invalid host '{}'", value))?;
            let port = match tail.strip_prefix(':') {
                Some(port) => parse_port(port, value)?,
                None if tail.is_empty() => default_port,
                None => return Err(format!("Invalid host '{}'", value)),
            };
            return Ok(Self { host: host.to_string(), port });
        }

        match value.rsplit_once(':') {
            Some((host, port)) if !host.contains(':') => Ok(Self {
                host: host.to_string(),
                port: parse_port(port, value)?,
            }),
            _ => Ok(Self {
                host: value.to_string(),
                port: default_port,
            }),
        }
    }
}

fn parse_port(port: &str, value: &str) -> Result<u16, String> {
    port.parse::<u16>()
        .map_err(|_| format!("Invalid port in host '{}'", value))
}

/// Engine-specific command descriptions
pub trait EngineTool: Send + Sync {
    /// Engine name (for logging)
    fn name(&self) -> &'static str;

    /// Human-readable target, never containing credentials
    fn target(&self) -> String;

    /// Programs that must be installed for backup and restore
    fn required_programs(&self) -> &'static [&'static str];

    /// Command verifying that the server accepts our credentials
    fn probe_command(&self) -> CommandSpec;

    /// Command writing a full dump to `destination`
    fn dump_command(&self, destination: &Path) -> CommandSpec;

    /// Command applying the dump at `source`
    fn restore_command(&self, source: &Path) -> CommandSpec;

    /// Whether a missing probe program should be tolerated
    fn probe_optional(&self) -> bool {
        false
    }

    /// Classify a failed restore; engines that cannot tell report `Unknown`
    fn classify_restore_failure(&self, error: &CommandError) -> RestoreError {
        RestoreError::Unknown {
            cause: error.to_string(),
        }
    }
}

/// Database connector driving an engine's client tools
pub struct ToolConnector<T: EngineTool> {
    tool: T,
    executor: Arc<dyn CommandExecutor>,
    connected: bool,
}

impl<T: EngineTool> ToolConnector<T> {
    pub fn new(tool: T, executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            tool,
            executor,
            connected: false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn tool(&self) -> &T {
        &self.tool
    }
}

impl<T: EngineTool> DatabaseConnector for ToolConnector<T> {
    fn name(&self) -> &'static str {
        self.tool.name()
    }

    fn connect(&mut self, cancel: &CancellationToken) -> Result<(), ConnectionError> {
        if self.connected {
            debug!("Already connected to {}", self.tool.target());
            return Ok(());
        }

        for program in self.tool.required_programs() {
            if !self.executor.program_exists(program) {
                return Err(ConnectionError::ToolMissing(program.to_string()));
            }
        }

        let probe = self.tool.probe_command();
        if !self.executor.program_exists(probe.program()) {
            if self.tool.probe_optional() {
                warn!(
                    "'{}' not found in PATH; skipping connectivity check for {}",
                    probe.program(),
                    self.tool.target()
                );
            } else {
                return Err(ConnectionError::ToolMissing(probe.program().to_string()));
            }
        } else {
            self.executor.run(&probe, cancel).map_err(|e| match e {
                CommandError::Cancelled { .. } => ConnectionError::Cancelled,
                other => ConnectionError::Failed {
                    target: self.tool.target(),
                    cause: other.to_string(),
                },
            })?;
        }

        self.connected = true;
        info!("Connected to {} database {}", self.tool.name(), self.tool.target());
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), ConnectionError> {
        if !self.connected {
            debug!("Disconnect requested for {} without an open session", self.tool.target());
            return Ok(());
        }

        self.connected = false;
        info!("Disconnected from {}", self.tool.target());
        Ok(())
    }

    fn backup(&self, destination: &Path, cancel: &CancellationToken) -> Result<(), BackupError> {
        if !self.connected {
            return Err(BackupError::NotConnected);
        }

        let parent = match destination.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(|source| BackupError::Io {
            path: parent.to_path_buf(),
            source,
        })?;

        // Staging file next to the destination, removed on drop unless persisted
        let staging = tempfile::Builder::new()
            .prefix(".backup-")
            .suffix(".partial")
            .tempfile_in(parent)
            .map_err(|source| BackupError::Io {
                path: parent.to_path_buf(),
                source,
            })?;

        info!(
            "Dumping {} database {} to {:?}",
            self.tool.name(),
            self.tool.target(),
            destination
        );

        let command = self.tool.dump_command(staging.path());
        self.executor.run(&command, cancel).map_err(|e| match e {
            CommandError::Cancelled { .. } => BackupError::Cancelled,
            other => BackupError::Failed {
                cause: other.to_string(),
            },
        })?;

        staging.persist(destination).map_err(|e| BackupError::Io {
            path: destination.to_path_buf(),
            source: e.error,
        })?;

        info!("Backup artifact written: {:?}", destination);
        Ok(())
    }

    fn restore(&self, source: &Path, cancel: &CancellationToken) -> Result<(), RestoreError> {
        if !self.connected {
            return Err(RestoreError::NotConnected);
        }

        if !source.is_file() {
            return Err(RestoreError::SourceMissing(source.to_path_buf()));
        }

        info!(
            "Restoring {} database {} from {:?}",
            self.tool.name(),
            self.tool.target(),
            source
        );

        let command = self.tool.restore_command(source);
        self.executor.run(&command, cancel).map_err(|e| match e {
            CommandError::Cancelled { .. } => RestoreError::Cancelled,
            other => self.tool.classify_restore_failure(&other),
        })?;

        info!("Restore of {} completed", self.tool.target());
        Ok(())
    }
}

impl<T: EngineTool> Drop for ToolConnector<T> {
    fn drop(&mut self) {
        if self.connected {
            debug!("Releasing open session to {} on drop", self.tool.target());
            self.connected = false;
        }
    }
}

/// Build the connector for a database kind
pub fn build_connector(
    kind: DatabaseKind,
    settings: DatabaseSettings,
    executor: Arc<dyn CommandExecutor>,
) -> Result<Box<dyn DatabaseConnector>, String> {
    let connector: Box<dyn DatabaseConnector> = match kind {
        DatabaseKind::MySql => Box::new(ToolConnector::new(MySqlTool::new(settings)?, executor)),
        DatabaseKind::PostgreSql => Box::new(ToolConnector::new(PostgresTool::new(settings)?, executor)),
        DatabaseKind::MongoDb => Box::new(ToolConnector::new(MongoDbTool::new(settings)?, executor)),
    };
    Ok(connector)
}
