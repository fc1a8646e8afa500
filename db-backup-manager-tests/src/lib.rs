//! Test utilities for db-backup-manager
//!
//! This crate provides shared test utilities, mock connectors and
//! collaborators, and helper functions for testing the db-backup-manager
//! application.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use test_utils::{ConfigBuilder, MockDatabase, MockStorage, RecordingLogger};
//!
//! #[test]
//! fn my_test() {
//!     let builder = ConfigBuilder::minimal();
//!     let database = MockDatabase::new();
//!     let storage = MockStorage::new();
//!     // ... test code
//! }
//! ```

pub mod config_builder;
pub mod fixtures;
pub mod mocks;
pub mod test_context;

// Re-export commonly used items
pub use config_builder::ConfigBuilder;
pub use fixtures::*;
pub use mocks::{
    Call, CallLog, LogLevel, MockDatabase, MockStorage, RecordingLogger, RecordingNotifier,
    RestoreFailure, ScriptedSelection,
};
pub use test_context::{OptionAssertions, ResultAssertions, TestContext};

// Re-export types from the main crate for convenience
pub use db_backup_manager::config::{
    BackendCategory, Config, ConfigError, DatabaseBackendConfig, DatabaseKind, NotificationConfig,
    NotifyEvent, StorageBackendConfig, StorageKind, StorageSection,
};
pub use db_backup_manager::managers::pipeline::{BackupJob, Command, JobState, Pipeline, Stage};

// Re-export mock implementations from the main crate
pub use db_backup_manager::utils::executor::mock::{CommandCall, MockExecutor, MockResponse};
pub use db_backup_manager::utils::executor::CommandExecutor;

/// Common test result type
pub type TestResult<T = ()> = anyhow::Result<T>;
