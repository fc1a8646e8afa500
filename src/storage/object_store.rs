use super::local::staging_file;
use super::{backup_keys, validate_key, Result, StorageConnector, StorageError};
use crate::utils::runtime::runtime;
use opendal::layers::BlockingLayer;
use opendal::{services, BlockingOperator, ErrorKind, Operator};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::info;

const TRANSFER_CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// Backups kept in a cloud object store
///
/// GCS, S3 and Azure Blob Storage share one implementation over an opendal
/// operator; only construction differs.
#[derive(Debug, Clone)]
pub struct ObjectStoreConnector {
    name: &'static str,
    operator: BlockingOperator,
}

impl ObjectStoreConnector {
    /// Wrap an async operator for use from the synchronous pipeline
    pub fn from_operator(name: &'static str, operator: Operator) -> Result<Self> {
        let rt = runtime().map_err(|e| StorageError::Backend { cause: e.to_string() })?;
        let _guard = rt.enter();
        let operator = operator.layer(BlockingLayer::create()?).blocking();
        Ok(Self { name, operator })
    }

    pub fn google_cloud(bucket: &str, credentials_file: &Path) -> Result<Self> {
        if !credentials_file.is_file() {
            return Err(StorageError::MissingCredentials(credentials_file.to_path_buf()));
        }

        let builder = services::Gcs::default()
            .bucket(bucket)
            .credential_path(&credentials_file.to_string_lossy());
        Self::from_operator("GoogleCloudStorage", Operator::new(builder)?.finish())
    }

    pub fn amazon_s3(
        bucket: &str,
        access_key: &str,
        secret_key: &str,
        region: &str,
        endpoint: Option<&str>,
    ) -> Result<Self> {
        let mut builder = services::S3::default()
            .bucket(bucket)
            .access_key_id(access_key)
            .secret_access_key(secret_key)
            .region(region);
        if let Some(endpoint) = endpoint {
            builder = builder.endpoint(endpoint);
        }
        Self::from_operator("AmazonS3", Operator::new(builder)?.finish())
    }

    pub fn azure_blob(connection_string: &str, container: &str) -> Result<Self> {
        let builder = services::Azblob::from_connection_string(connection_string)?.container(container);
        Self::from_operator("AzureBlobStorage", Operator::new(builder)?.finish())
    }

    /// In-memory store, used by tests
    pub fn in_memory() -> Result<Self> {
        Self::from_operator("Memory", Operator::new(services::Memory::default())?.finish())
    }
}

impl StorageConnector for ObjectStoreConnector {
    fn name(&self) -> &'static str {
        self.name
    }

    fn save_backup(&self, local: &Path, key: &str, cancel: &CancellationToken) -> Result<()> {
        validate_key(key)?;
        let mut input = File::open(local).map_err(|e| StorageError::io(local, e))?;

        let mut writer = self.operator.writer(key)?;
        let mut buf = vec![0u8; TRANSFER_CHUNK_SIZE];
        let mut sent = 0u64;
        loop {
            // Dropping the writer without close() abandons the upload
            if cancel.is_cancelled() {
                return Err(StorageError::Cancelled);
            }
            let n = input.read(&mut buf).map_err(|e| StorageError::io(local, e))?;
            if n == 0 {
                break;
            }
            writer.write(buf[..n].to_vec())?;
            sent += n as u64;
        }
        writer.close()?;

        info!("Uploaded backup {} ({} bytes) to {}", key, sent, self.name);
        Ok(())
    }

    fn load_backup(&self, key: &str, local: &Path, cancel: &CancellationToken) -> Result<()> {
        validate_key(key)?;

        let size = match self.operator.stat(key) {
            Ok(meta) => meta.content_length(),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::NotFound { key: key.to_string() })
            }
            Err(e) => return Err(e.into()),
        };

        let reader = self.operator.reader(key)?;
        let mut staging = staging_file(local)?;
        let mut offset = 0u64;
        while offset < size {
            if cancel.is_cancelled() {
                return Err(StorageError::Cancelled);
            }
            let end = (offset + TRANSFER_CHUNK_SIZE as u64).min(size);
            let chunk = reader.read(offset..end)?.to_vec();
            if chunk.is_empty() {
                return Err(StorageError::Backend {
                    cause: format!("Unexpected end of object {} at byte {}", key, offset),
                });
            }
            staging
                .write_all(&chunk)
                .map_err(|e| StorageError::io(staging.path(), e))?;
            offset += chunk.len() as u64;
        }

        staging
            .persist(local)
            .map_err(|e| StorageError::io(local, e.error))?;
        info!("Downloaded backup {} ({} bytes) from {}", key, size, self.name);
        Ok(())
    }

    fn list_backups(&self) -> Result<Vec<String>> {
        let entries = self.operator.list("/")?;
        let names = entries
            .into_iter()
            .filter(|entry| entry.metadata().is_file())
            .map(|entry| entry.name().to_string());
        Ok(backup_keys(names))
    }
}
