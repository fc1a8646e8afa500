//! Command tests for db-backup-manager
//!
//! These tests run the backup and restore pipelines against mocked
//! connectors and recording collaborators.

mod backup;
mod cleanup;
mod restore;
