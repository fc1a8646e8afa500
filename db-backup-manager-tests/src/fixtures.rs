//! Test fixtures and sample data
//!
//! Provides pre-built configuration entries and documents for testing.

use db_backup_manager::config::{DatabaseBackendConfig, DatabaseKind, StorageBackendConfig, StorageKind};
use std::path::Path;

/// Database entry with every required field set
pub fn database_entry(kind: DatabaseKind, host: &str) -> DatabaseBackendConfig {
    DatabaseBackendConfig {
        kind,
        host: Some(host.to_string()),
        database_name: Some("app".to_string()),
        username: Some("backup".to_string()),
        password: Some("secret".to_string()),
        timeout_seconds: None,
    }
}

/// Local storage rooted at `path`
pub fn local_storage_entry(path: &Path) -> StorageBackendConfig {
    let mut entry = StorageBackendConfig::empty(StorageKind::Local);
    entry.local_path = Some(path.display().to_string());
    entry
}

/// Google Cloud Storage entry with the given credentials file
pub fn gcs_storage_entry(local_path: &Path, credentials_file: &Path) -> StorageBackendConfig {
    let mut entry = StorageBackendConfig::empty(StorageKind::GoogleCloudStorage);
    entry.local_path = Some(local_path.display().to_string());
    entry.credentials_file = Some(credentials_file.display().to_string());
    entry.bucket_name = Some("db-backups".to_string());
    entry
}

/// Amazon S3 entry with static credentials
pub fn s3_storage_entry(local_path: &Path) -> StorageBackendConfig {
    let mut entry = StorageBackendConfig::empty(StorageKind::AmazonS3);
    entry.local_path = Some(local_path.display().to_string());
    entry.access_key = Some("AKIAEXAMPLE".to_string());
    entry.secret_key = Some("example-secret".to_string());
    entry.bucket_name = Some("db-backups".to_string());
    entry
}

/// Azure Blob Storage entry using the storage emulator's connection string
pub fn azure_storage_entry(local_path: &Path) -> StorageBackendConfig {
    let mut entry = StorageBackendConfig::empty(StorageKind::AzureBlobStorage);
    entry.local_path = Some(local_path.display().to_string());
    entry.connection_string = Some(
        "DefaultEndpointsProtocol=http;AccountName=devstoreaccount1;\
         AccountKey=Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==;\
         BlobEndpoint=http://127.0.0.1:10000/devstoreaccount1;"
            .to_string(),
    );
    entry.container_name = Some("db-backups".to_string());
    entry
}

/// Minimal valid configuration document; `{backup_path}` must be replaced
pub fn minimal_config_json() -> &'static str {
    r#"{
    "Databases": [
        {"Type": "MySql", "Host": "db1", "DatabaseName": "app", "Username": "backup", "Password": "secret"}
    ],
    "Storage": {"Type": "Local", "LocalPath": "{backup_path}"}
}"#
}

/// Configuration with two database types and no selector
pub fn ambiguous_config_json() -> &'static str {
    r#"{
    "Databases": [
        {"Type": "MySql", "Host": "db1", "DatabaseName": "app", "Username": "backup", "Password": "secret"},
        {"Type": "PostgreSql", "Host": "db2", "DatabaseName": "app", "Username": "backup", "Password": "secret"}
    ],
    "Storage": {"Type": "Local", "LocalPath": "{backup_path}"}
}"#
}
