use super::{backup_keys, validate_key, Result, StorageConnector, StorageError};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const COPY_CHUNK_SIZE: usize = 1024 * 1024;

/// Backups kept in a directory on the local filesystem
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

/// Compare paths after resolving symlinks, falling back to a lexical compare
fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Copy `source` to `destination` through a staging file, checking for
/// cancellation between chunks
pub(crate) fn copy_file(source: &Path, destination: &Path, cancel: &CancellationToken) -> Result<u64> {
    let mut input = File::open(source).map_err(|e| StorageError::io(source, e))?;
    let mut staging = staging_file(destination)?;

    let mut buf = vec![0u8; COPY_CHUNK_SIZE];
    let mut copied = 0u64;
    loop {
        if cancel.is_cancelled() {
            return Err(StorageError::Cancelled);
        }
        let n = input.read(&mut buf).map_err(|e| StorageError::io(source, e))?;
        if n == 0 {
            break;
        }
        staging
            .write_all(&buf[..n])
            .map_err(|e| StorageError::io(staging.path(), e))?;
        copied += n as u64;
    }

    staging
        .as_file()
        .sync_all()
        .map_err(|e| StorageError::io(destination, e))?;
    staging
        .persist(destination)
        .map_err(|e| StorageError::io(destination, e.error))?;
    Ok(copied)
}

/// Staging file in the destination's directory, removed unless persisted
pub(crate) fn staging_file(destination: &Path) -> Result<tempfile::NamedTempFile> {
    let parent = match destination.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;

    tempfile::Builder::new()
        .prefix(".backup-")
        .suffix(".partial")
        .tempfile_in(parent)
        .map_err(|e| StorageError::io(parent, e))
}

impl StorageConnector for LocalStorage {
    fn name(&self) -> &'static str {
        "Local"
    }

    fn save_backup(&self, local: &Path, key: &str, cancel: &CancellationToken) -> Result<()> {
        let target = self.key_path(key)?;
        if !local.is_file() {
            return Err(StorageError::io(
                local,
                std::io::Error::new(std::io::ErrorKind::NotFound, "backup artifact missing"),
            ));
        }

        if same_file(local, &target) {
            debug!("Backup {} already stored at {:?}", key, target);
            return Ok(());
        }

        let bytes = copy_file(local, &target, cancel)?;
        info!("Stored backup {} ({} bytes) at {:?}", key, bytes, target);
        Ok(())
    }

    fn load_backup(&self, key: &str, local: &Path, cancel: &CancellationToken) -> Result<()> {
        let source = self.key_path(key)?;
        if !source.is_file() {
            return Err(StorageError::NotFound { key: key.to_string() });
        }

        if same_file(&source, local) {
            debug!("Backup {} already at {:?}", key, local);
            return Ok(());
        }

        let bytes = copy_file(&source, local, cancel)?;
        info!("Fetched backup {} ({} bytes) to {:?}", key, bytes, local);
        Ok(())
    }

    fn list_backups(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::io(&self.root, e)),
        };

        let names = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|entry| entry.file_name().into_string().ok());

        Ok(backup_keys(names))
    }

    fn holds_in_place(&self, local: &Path, key: &str) -> bool {
        match self.key_path(key) {
            Ok(target) => same_file(local, &target),
            Err(_) => false,
        }
    }
}
