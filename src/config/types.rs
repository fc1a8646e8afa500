use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Config {
    #[serde(default)]
    pub databases: Vec<DatabaseBackendConfig>,

    #[serde(default)]
    pub storage: StorageSection,

    /// Explicit backend selectors, used instead of prompting
    #[serde(default)]
    pub selection: SelectionConfig,

    /// Leave the working file in place after the run
    #[serde(default)]
    pub keep_working_file: bool,

    #[serde(default)]
    pub notifications: NotificationConfig,

    #[serde(default)]
    pub logging: LogSettings,
}

/// Which kind of backend a configuration section describes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendCategory {
    Database,
    Storage,
}

impl fmt::Display for BackendCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendCategory::Database => write!(f, "database"),
            BackendCategory::Storage => write!(f, "storage"),
        }
    }
}

/// A closed set of backend variants with their configuration tags
pub trait BackendKind: Copy + Eq + fmt::Debug + 'static {
    /// Every known variant
    const ALL: &'static [Self];

    /// The exact tag used in configuration files
    fn tag(&self) -> &'static str;

    /// Look up a variant by its exact, case-sensitive tag
    fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.tag() == tag)
    }
}

/// A configuration entry that carries a backend type tag
pub trait BackendEntry {
    type Kind: BackendKind;

    fn kind(&self) -> Self::Kind;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum DatabaseKind {
    MySql,
    PostgreSql,
    MongoDb,
}

impl BackendKind for DatabaseKind {
    const ALL: &'static [Self] = &[DatabaseKind::MySql, DatabaseKind::PostgreSql, DatabaseKind::MongoDb];

    fn tag(&self) -> &'static str {
        match self {
            DatabaseKind::MySql => "MySql",
            DatabaseKind::PostgreSql => "PostgreSql",
            DatabaseKind::MongoDb => "MongoDb",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum StorageKind {
    Local,
    GoogleCloudStorage,
    AmazonS3,
    AzureBlobStorage,
}

impl BackendKind for StorageKind {
    const ALL: &'static [Self] = &[
        StorageKind::Local,
        StorageKind::GoogleCloudStorage,
        StorageKind::AmazonS3,
        StorageKind::AzureBlobStorage,
    ];

    fn tag(&self) -> &'static str {
        match self {
            StorageKind::Local => "Local",
            StorageKind::GoogleCloudStorage => "GoogleCloudStorage",
            StorageKind::AmazonS3 => "AmazonS3",
            StorageKind::AzureBlobStorage => "AzureBlobStorage",
        }
    }
}

/// One configured database
///
/// Connection fields are optional at parse time so that a missing value is
/// reported by the resolver as a missing field rather than a parse error.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DatabaseBackendConfig {
    #[serde(rename = "Type")]
    pub kind: DatabaseKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Timeout for each client tool invocation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
}

impl BackendEntry for DatabaseBackendConfig {
    type Kind = DatabaseKind;

    fn kind(&self) -> DatabaseKind {
        self.kind
    }
}

/// One configured storage backend
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StorageBackendConfig {
    #[serde(rename = "Type")]
    pub kind: StorageKind,

    /// Working directory for every variant; backup root for `Local`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_file: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Custom endpoint for S3-compatible stores
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_string: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,

    /// Remote key to restore from (defaults to the newest backup)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restore_key: Option<String>,
}

impl StorageBackendConfig {
    /// Create an entry of the given kind with every field unset
    pub fn empty(kind: StorageKind) -> Self {
        Self {
            kind,
            local_path: None,
            credentials_file: None,
            bucket_name: None,
            access_key: None,
            secret_key: None,
            region: None,
            endpoint: None,
            connection_string: None,
            container_name: None,
            restore_key: None,
        }
    }
}

impl BackendEntry for StorageBackendConfig {
    type Kind = StorageKind;

    fn kind(&self) -> StorageKind {
        self.kind
    }
}

/// The `Storage` section: a single backend or a list of them
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum StorageSection {
    Many(Vec<StorageBackendConfig>),
    Single(Box<StorageBackendConfig>),
}

impl Default for StorageSection {
    fn default() -> Self {
        StorageSection::Many(Vec::new())
    }
}

impl StorageSection {
    pub fn entries(&self) -> &[StorageBackendConfig] {
        match self {
            StorageSection::Many(entries) => entries,
            StorageSection::Single(entry) => std::slice::from_ref(entry.as_ref()),
        }
    }
}

/// Explicit backend type selectors
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SelectionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<String>,
}

/// Notification configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NotificationConfig {
    #[serde(default)]
    pub discord_webhook_url: String,

    #[serde(default = "default_notify_on")]
    pub notify_on: Vec<NotifyEvent>,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            discord_webhook_url: String::new(),
            notify_on: default_notify_on(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub enum NotifyEvent {
    Success,
    Failure,
    Warning,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LogSettings {
    /// Directory for rotated log files; console only when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,

    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_max_files")]
    pub max_files: u32,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            directory: None,
            level: default_log_level(),
            max_files: default_log_max_files(),
        }
    }
}

// Default value functions

fn default_log_level() -> String { "info".to_string() }
fn default_log_max_files() -> u32 { 10 }
fn default_notify_on() -> Vec<NotifyEvent> {
    vec![NotifyEvent::Success, NotifyEvent::Failure]
}
