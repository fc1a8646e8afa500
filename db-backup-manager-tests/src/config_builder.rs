//! Fluent API for building test configurations
//!
//! Provides a builder pattern for creating test configurations with sensible defaults.

use crate::fixtures::{database_entry, local_storage_entry};
use db_backup_manager::config::{
    Config, DatabaseBackendConfig, DatabaseKind, LogSettings, NotificationConfig, SelectionConfig,
    StorageBackendConfig, StorageSection,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Builder for creating test configurations
pub struct ConfigBuilder {
    temp_dir: TempDir,
    databases: Vec<DatabaseBackendConfig>,
    storage: Vec<StorageBackendConfig>,
    selection: SelectionConfig,
    keep_working_file: bool,
    notifications: NotificationConfig,
    logging: LogSettings,
}

impl ConfigBuilder {
    /// Create a new ConfigBuilder with no backends
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        Self {
            temp_dir,
            databases: Vec::new(),
            storage: Vec::new(),
            selection: SelectionConfig::default(),
            keep_working_file: false,
            notifications: NotificationConfig::default(),
            logging: LogSettings::default(),
        }
    }

    /// Create a minimal config: one MySql database and local storage
    pub fn minimal() -> Self {
        let builder = Self::new();
        let backups = builder.backups_dir();
        fs::create_dir_all(&backups).expect("Failed to create backup dir");

        builder
            .add_database(DatabaseKind::MySql)
            .add_storage(local_storage_entry(&backups))
    }

    /// Add a database entry of the given type with default credentials
    pub fn add_database(mut self, kind: DatabaseKind) -> Self {
        self.databases.push(database_entry(kind, "db1"));
        self
    }

    /// Add a database entry with custom settings
    pub fn add_database_config(mut self, entry: DatabaseBackendConfig) -> Self {
        self.databases.push(entry);
        self
    }

    /// Add a storage entry
    pub fn add_storage(mut self, entry: StorageBackendConfig) -> Self {
        self.storage.push(entry);
        self
    }

    /// Add a local storage entry rooted at `path`
    pub fn add_local_storage(self, path: &Path) -> Self {
        self.add_storage(local_storage_entry(path))
    }

    /// Set the explicit database selector
    pub fn select_database(mut self, tag: &str) -> Self {
        self.selection.database = Some(tag.to_string());
        self
    }

    /// Set the explicit storage selector
    pub fn select_storage(mut self, tag: &str) -> Self {
        self.selection.storage = Some(tag.to_string());
        self
    }

    pub fn keep_working_file(mut self, keep: bool) -> Self {
        self.keep_working_file = keep;
        self
    }

    /// Set notification configuration
    pub fn with_notifications(mut self, config: NotificationConfig) -> Self {
        self.notifications = config;
        self
    }

    /// Set the log directory
    pub fn with_log_dir(mut self, path: &Path) -> Self {
        self.logging.directory = Some(path.to_path_buf());
        self
    }

    /// Get the temp directory path
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Directory used by `minimal()` for local storage
    pub fn backups_dir(&self) -> PathBuf {
        self.temp_dir.path().join("backups")
    }

    fn config(&self) -> Config {
        let storage = match self.storage.as_slice() {
            [single] => StorageSection::Single(Box::new(single.clone())),
            many => StorageSection::Many(many.to_vec()),
        };

        Config {
            databases: self.databases.clone(),
            storage,
            selection: self.selection.clone(),
            keep_working_file: self.keep_working_file,
            notifications: self.notifications.clone(),
            logging: self.logging.clone(),
        }
    }

    /// Build the Config
    pub fn build(self) -> Config {
        self.config()
    }

    /// Write the config as JSON into the temp dir
    pub fn write_json(&self) -> PathBuf {
        let path = self.temp_dir.path().join("backup-config.json");
        let json = serde_json::to_string_pretty(&self.config()).expect("Failed to serialize config");
        fs::write(&path, json).expect("Failed to write config file");
        path
    }

    /// Keep the temp directory (don't delete on drop)
    pub fn persist(self) -> (Config, TempDir) {
        let config = self.config();
        (config, self.temp_dir)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
