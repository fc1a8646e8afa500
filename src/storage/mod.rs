//! Storage connectors
//!
//! A storage connector moves a finished backup artifact between the local
//! working directory and the backup destination, and lists what the
//! destination holds so that a restore can pick the newest backup.

pub mod local;
pub mod object_store;

use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

pub use local::LocalStorage;
pub use object_store::ObjectStoreConnector;

/// Prefix shared by every backup key
pub const BACKUP_KEY_PREFIX: &str = "backup-";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Backup not found in storage: {key}")]
    NotFound { key: String },

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Storage backend error: {cause}")]
    Backend { cause: String },

    #[error("Credentials file not found: {0:?}")]
    MissingCredentials(PathBuf),

    #[error("Invalid backup key: '{0}'")]
    InvalidKey(String),

    #[error("Transfer cancelled")]
    Cancelled,
}

impl StorageError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, StorageError::Cancelled)
    }

    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl From<opendal::Error> for StorageError {
    fn from(err: opendal::Error) -> Self {
        StorageError::Backend {
            cause: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Capability every storage variant provides to the pipeline
pub trait StorageConnector: Send + Sync {
    /// Backend name (for logging)
    fn name(&self) -> &'static str;

    /// Persist the artifact at `local` under `key`
    fn save_backup(&self, local: &Path, key: &str, cancel: &CancellationToken) -> Result<()>;

    /// Fetch the artifact stored under `key` into `local`
    fn load_backup(&self, key: &str, local: &Path, cancel: &CancellationToken) -> Result<()>;

    /// Keys of stored backups, oldest first
    fn list_backups(&self) -> Result<Vec<String>>;

    /// Whether `local` already is the stored copy of `key`
    ///
    /// The pipeline must not delete a working file that is also the only
    /// stored copy.
    fn holds_in_place(&self, _local: &Path, _key: &str) -> bool {
        false
    }
}

/// Reject keys that could escape the storage root
pub(crate) fn validate_key(key: &str) -> Result<()> {
    let bad = key.is_empty()
        || key == "."
        || key.contains("..")
        || key.contains('/')
        || key.contains('\\');
    if bad {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Keep only backup keys, sorted oldest first
///
/// Keys embed a `%Y%m%d%H%M%S` timestamp, so lexical order is chronological.
pub fn backup_keys<I: IntoIterator<Item = String>>(names: I) -> Vec<String> {
    let mut keys: Vec<String> = names
        .into_iter()
        .filter(|name| name.starts_with(BACKUP_KEY_PREFIX) && validate_key(name).is_ok())
        .collect();
    keys.sort();
    keys
}
