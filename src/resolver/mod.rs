//! Backend resolution
//!
//! Turns the declarative configuration into exactly one database connector
//! and one storage connector. Selection between several configured types is
//! delegated to a [`SelectionPolicy`].

mod selection;

pub use selection::{DeclarativeSelection, InteractiveSelection, SelectionPolicy};

use crate::config::{
    expand_tilde, BackendCategory, BackendEntry, BackendKind, Config, ConfigError, Result,
    StorageBackendConfig, StorageKind,
};
use crate::databases::{self, DatabaseConnector, DatabaseSettings};
use crate::storage::{LocalStorage, ObjectStoreConnector, StorageConnector};
use crate::utils::command::DEFAULT_TIMEOUT;
use crate::utils::CommandExecutor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const DEFAULT_S3_REGION: &str = "us-east-1";

/// The resolved storage backend and where the run keeps its working file
pub struct ResolvedStorage {
    pub connector: Box<dyn StorageConnector>,
    pub working_dir: PathBuf,
    pub restore_key: Option<String>,
}

impl std::fmt::Debug for ResolvedStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedStorage")
            .field("connector", &self.connector.name())
            .field("working_dir", &self.working_dir)
            .field("restore_key", &self.restore_key)
            .finish()
    }
}

pub struct BackendResolver<P: SelectionPolicy> {
    policy: P,
    executor: Arc<dyn CommandExecutor>,
}

impl<P: SelectionPolicy> BackendResolver<P> {
    pub fn new(policy: P, executor: Arc<dyn CommandExecutor>) -> Self {
        Self { policy, executor }
    }

    pub fn resolve_database_connector(&self, config: &Config) -> Result<Box<dyn DatabaseConnector>> {
        let category = BackendCategory::Database;
        let entry = select_entry(
            category,
            &config.databases,
            config.selection.database.as_deref(),
            &self.policy,
        )?;

        let settings = DatabaseSettings {
            host: required(category, "Host", &entry.host)?,
            database_name: required(category, "DatabaseName", &entry.database_name)?,
            username: required(category, "Username", &entry.username)?,
            password: required(category, "Password", &entry.password)?,
            timeout: entry
                .timeout_seconds
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_TIMEOUT),
        };

        let connector = databases::build_connector(entry.kind, settings, self.executor.clone())
            .map_err(|cause| ConfigError::ConstructionFailed { category, cause })?;

        info!("Using {} database", connector.name());
        Ok(connector)
    }

    pub fn resolve_storage_connector(&self, config: &Config) -> Result<ResolvedStorage> {
        let category = BackendCategory::Storage;
        let entry = select_entry(
            category,
            config.storage.entries(),
            config.selection.storage.as_deref(),
            &self.policy,
        )?;

        let working_dir = expand_tilde(Path::new(&required(category, "LocalPath", &entry.local_path)?));
        let connector = build_storage(entry, &working_dir)?;

        info!("Using {} storage (working directory {:?})", connector.name(), working_dir);
        Ok(ResolvedStorage {
            connector,
            working_dir,
            restore_key: optional(&entry.restore_key),
        })
    }
}

fn build_storage(entry: &StorageBackendConfig, working_dir: &Path) -> Result<Box<dyn StorageConnector>> {
    let category = BackendCategory::Storage;
    let failed = |e: crate::storage::StorageError| ConfigError::ConstructionFailed {
        category,
        cause: e.to_string(),
    };

    let connector: Box<dyn StorageConnector> = match entry.kind {
        StorageKind::Local => Box::new(LocalStorage::new(working_dir)),
        StorageKind::GoogleCloudStorage => {
            let credentials = required(category, "CredentialsFile", &entry.credentials_file)?;
            let bucket = required(category, "BucketName", &entry.bucket_name)?;
            let credentials = expand_tilde(Path::new(&credentials));
            Box::new(ObjectStoreConnector::google_cloud(&bucket, &credentials).map_err(failed)?)
        }
        StorageKind::AmazonS3 => {
            let access_key = required(category, "AccessKey", &entry.access_key)?;
            let secret_key = required(category, "SecretKey", &entry.secret_key)?;
            let bucket = required(category, "BucketName", &entry.bucket_name)?;
            let region = optional(&entry.region).unwrap_or_else(|| DEFAULT_S3_REGION.to_string());
            let endpoint = optional(&entry.endpoint);
            Box::new(
                ObjectStoreConnector::amazon_s3(&bucket, &access_key, &secret_key, &region, endpoint.as_deref())
                    .map_err(failed)?,
            )
        }
        StorageKind::AzureBlobStorage => {
            let connection_string = required(category, "ConnectionString", &entry.connection_string)?;
            let container = required(category, "ContainerName", &entry.container_name)?;
            Box::new(ObjectStoreConnector::azure_blob(&connection_string, &container).map_err(failed)?)
        }
    };
    Ok(connector)
}

/// Pick the configuration entry to use for one backend category
pub fn select_entry<'a, E, P>(
    category: BackendCategory,
    entries: &'a [E],
    selector: Option<&str>,
    policy: &P,
) -> Result<&'a E>
where
    E: BackendEntry,
    P: SelectionPolicy + ?Sized,
{
    if entries.is_empty() {
        return Err(ConfigError::NoBackendsConfigured { category });
    }

    let mut present: Vec<E::Kind> = Vec::new();
    for entry in entries {
        if !present.contains(&entry.kind()) {
            present.push(entry.kind());
        }
    }

    let chosen = match selector.filter(|s| !s.is_empty()) {
        Some(tag) => {
            let kind = E::Kind::from_tag(tag).ok_or_else(|| ConfigError::InvalidSelection {
                category,
                choice: tag.to_string(),
            })?;
            debug!("Using configured {} selection {}", category, tag);
            kind
        }
        None if present.len() == 1 => present[0],
        None => {
            let candidates: Vec<&'static str> = present.iter().map(|k| k.tag()).collect();
            let choice = policy.choose(category, &candidates)?;
            present
                .iter()
                .copied()
                .find(|k| k.tag() == choice)
                .ok_or(ConfigError::InvalidSelection { category, choice })?
        }
    };

    entries
        .iter()
        .find(|e| e.kind() == chosen)
        .ok_or_else(|| ConfigError::NoMatchingConfig {
            category,
            tag: chosen.tag().to_string(),
        })
}

fn required(category: BackendCategory, name: &'static str, value: &Option<String>) -> Result<String> {
    optional(value).ok_or(ConfigError::MissingField { category, name })
}

fn optional(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
}
