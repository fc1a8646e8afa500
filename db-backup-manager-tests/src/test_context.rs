//! Test context and harness for pipeline tests
//!
//! Bundles the mocks and a working directory so a test can run the pipeline
//! and then inspect every collaborator.

use crate::mocks::{CallLog, MockDatabase, MockStorage, RecordingLogger, RecordingNotifier};
use chrono::{Local, TimeZone};
use db_backup_manager::managers::pipeline::{BackupJob, Command, JobState, Pipeline};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

/// Test context that manages test resources and provides common utilities
pub struct TestContext {
    /// Temporary working directory
    temp_dir: TempDir,
    /// Shared call log of the database and storage mocks
    pub log: CallLog,
    pub database: MockDatabase,
    pub storage: MockStorage,
    pub logger: RecordingLogger,
    pub notifier: RecordingNotifier,
    pub cancel: CancellationToken,
    keep_working_file: bool,
    restore_key: Option<String>,
}

impl TestContext {
    /// Create a new test context with well-behaved mocks
    pub fn new() -> Self {
        let log = CallLog::new();
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp dir"),
            database: MockDatabase::with_log(log.clone()),
            storage: MockStorage::with_log(log.clone()),
            log,
            logger: RecordingLogger::new(),
            notifier: RecordingNotifier::new(),
            cancel: CancellationToken::new(),
            keep_working_file: false,
            restore_key: None,
        }
    }

    /// Replace the database mock, keeping the shared call log
    pub fn database(mut self, configure: impl FnOnce(MockDatabase) -> MockDatabase) -> Self {
        self.database = configure(self.database);
        self
    }

    /// Replace the storage mock, keeping the shared call log
    pub fn storage(mut self, configure: impl FnOnce(MockStorage) -> MockStorage) -> Self {
        self.storage = configure(self.storage);
        self
    }

    pub fn notifier(mut self, notifier: RecordingNotifier) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn keep_working_file(mut self, keep: bool) -> Self {
        self.keep_working_file = keep;
        self
    }

    pub fn restore_key(mut self, key: &str) -> Self {
        self.restore_key = Some(key.to_string());
        self
    }

    /// Get the temporary directory path
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Job with a fixed timestamp in the working directory
    pub fn job(&self, command: Command) -> BackupJob {
        let now = Local
            .with_ymd_and_hms(2026, 1, 2, 3, 4, 5)
            .single()
            .expect("valid timestamp");
        BackupJob::new(command, self.temp_dir.path(), now)
    }

    /// Run `command` through a pipeline built from this context's mocks
    pub fn run(&self, command: Command) -> (JobState, BackupJob) {
        let mut job = self.job(command);
        let mut pipeline = Pipeline::new(
            Box::new(self.database.clone()),
            Box::new(self.storage.clone()),
            Box::new(self.logger.clone()),
        )
        .with_notifier(Box::new(self.notifier.clone()))
        .with_cancellation(self.cancel.clone())
        .keep_working_file(self.keep_working_file)
        .with_restore_key(self.restore_key.clone());

        let state = pipeline.run(&mut job);
        (state, job)
    }

    /// Create a file in the temp dir
    pub fn create_file(&self, name: &str, content: &[u8]) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&path, content).expect("Failed to write file");
        path
    }

    /// Check if a file exists in the temp directory
    pub fn file_exists(&self, name: &str) -> bool {
        self.temp_dir.path().join(name).exists()
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Extension trait for assertion helpers
pub trait ResultAssertions<T> {
    /// Assert that the result is Ok and return the value
    fn assert_ok(self) -> T;

    /// Assert that the result is Err and the error message contains the given string
    fn assert_err_contains(self, needle: &str);
}

impl<T: std::fmt::Debug, E: std::fmt::Display> ResultAssertions<T> for Result<T, E> {
    fn assert_ok(self) -> T {
        match self {
            Ok(v) => v,
            Err(e) => panic!("Expected Ok, got Err: {}", e),
        }
    }

    fn assert_err_contains(self, needle: &str) {
        match self {
            Ok(v) => panic!("Expected Err containing '{}', got Ok: {:?}", needle, v),
            Err(e) => {
                let err_msg = e.to_string();
                assert!(
                    err_msg.contains(needle),
                    "Error '{}' does not contain '{}'",
                    err_msg,
                    needle
                );
            }
        }
    }
}

/// Extension trait for Option assertions
pub trait OptionAssertions<T> {
    /// Assert that the option is Some and return the value
    fn assert_some(self) -> T;
}

impl<T> OptionAssertions<T> for Option<T> {
    fn assert_some(self) -> T {
        match self {
            Some(v) => v,
            None => panic!("Expected Some, got None"),
        }
    }
}
