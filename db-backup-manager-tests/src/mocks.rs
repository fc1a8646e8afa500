//! Mock connectors and recording collaborators
//!
//! Every mock shares its state through `Arc`s, so a test can keep a clone
//! for inspection after handing the original to a `Pipeline`.

use anyhow::Result;
use db_backup_manager::config::{BackendCategory, ConfigError};
use db_backup_manager::databases::{BackupError, ConnectionError, DatabaseConnector, RestoreError};
use db_backup_manager::managers::logging::RunLogger;
use db_backup_manager::managers::notification::{Notification, Notifier};
use db_backup_manager::resolver::SelectionPolicy;
use db_backup_manager::storage::{backup_keys, StorageConnector, StorageError};
use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// One recorded connector call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Connect,
    Disconnect,
    Backup(PathBuf),
    Restore(PathBuf),
    Save { local: PathBuf, key: String },
    Load { key: String, local: PathBuf },
    List,
}

/// Call log shared between a database mock and a storage mock
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, call: Call) {
        self.0.lock().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.0.lock().iter().filter(|c| *c == call).count()
    }
}

/// How a mocked restore fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreFailure {
    Partial,
    Unknown,
}

/// Mock database connector
#[derive(Clone)]
pub struct MockDatabase {
    log: CallLog,
    connected: bool,
    dump: Vec<u8>,
    restored: Arc<Mutex<Option<Vec<u8>>>>,
    fail_connect: bool,
    fail_backup: bool,
    fail_disconnect: bool,
    restore_failure: Option<RestoreFailure>,
    cancel_during_backup: Option<CancellationToken>,
}

impl Default for MockDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDatabase {
    pub fn new() -> Self {
        Self::with_log(CallLog::new())
    }

    pub fn with_log(log: CallLog) -> Self {
        Self {
            log,
            connected: false,
            dump: b"-- mock dump".to_vec(),
            restored: Arc::new(Mutex::new(None)),
            fail_connect: false,
            fail_backup: false,
            fail_disconnect: false,
            restore_failure: None,
            cancel_during_backup: None,
        }
    }

    /// Contents written by `backup`
    pub fn with_dump(mut self, dump: &[u8]) -> Self {
        self.dump = dump.to_vec();
        self
    }

    pub fn fail_connect(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    pub fn fail_backup(mut self) -> Self {
        self.fail_backup = true;
        self
    }

    pub fn fail_disconnect(mut self) -> Self {
        self.fail_disconnect = true;
        self
    }

    pub fn fail_restore(mut self, failure: RestoreFailure) -> Self {
        self.restore_failure = Some(failure);
        self
    }

    /// Cancel `token` while the dump is running, as Ctrl-C would
    pub fn cancel_during_backup(mut self, token: CancellationToken) -> Self {
        self.cancel_during_backup = Some(token);
        self
    }

    pub fn log(&self) -> &CallLog {
        &self.log
    }

    /// Contents applied by the last successful restore
    pub fn restored(&self) -> Option<Vec<u8>> {
        self.restored.lock().clone()
    }
}

impl DatabaseConnector for MockDatabase {
    fn name(&self) -> &'static str {
        "MockDatabase"
    }

    fn connect(&mut self, _cancel: &CancellationToken) -> Result<(), ConnectionError> {
        self.log.push(Call::Connect);
        if self.fail_connect {
            return Err(ConnectionError::Failed {
                target: "mock:0/app".to_string(),
                cause: "connection refused".to_string(),
            });
        }
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), ConnectionError> {
        self.log.push(Call::Disconnect);
        self.connected = false;
        if self.fail_disconnect {
            return Err(ConnectionError::Failed {
                target: "mock:0/app".to_string(),
                cause: "connection reset".to_string(),
            });
        }
        Ok(())
    }

    fn backup(&self, destination: &Path, _cancel: &CancellationToken) -> Result<(), BackupError> {
        self.log.push(Call::Backup(destination.to_path_buf()));
        if !self.connected {
            return Err(BackupError::NotConnected);
        }
        if let Some(token) = &self.cancel_during_backup {
            token.cancel();
            return Err(BackupError::Cancelled);
        }
        if self.fail_backup {
            return Err(BackupError::Failed {
                cause: "mysqldump: Got error: 1044".to_string(),
            });
        }
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|source| BackupError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(destination, &self.dump).map_err(|source| BackupError::Io {
            path: destination.to_path_buf(),
            source,
        })
    }

    fn restore(&self, source: &Path, _cancel: &CancellationToken) -> Result<(), RestoreError> {
        self.log.push(Call::Restore(source.to_path_buf()));
        if !self.connected {
            return Err(RestoreError::NotConnected);
        }
        match self.restore_failure {
            Some(RestoreFailure::Partial) => {
                return Err(RestoreError::Partial {
                    cause: "3 document(s) restored successfully".to_string(),
                })
            }
            Some(RestoreFailure::Unknown) => {
                return Err(RestoreError::Unknown {
                    cause: "ERROR 1064".to_string(),
                })
            }
            None => {}
        }
        let contents = fs::read(source).map_err(|_| RestoreError::SourceMissing(source.to_path_buf()))?;
        *self.restored.lock() = Some(contents);
        Ok(())
    }
}

/// Mock storage backend keeping objects in memory
#[derive(Clone)]
pub struct MockStorage {
    log: CallLog,
    objects: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
    fail_save: bool,
    fail_load: bool,
    in_place: bool,
}

impl Default for MockStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStorage {
    pub fn new() -> Self {
        Self::with_log(CallLog::new())
    }

    pub fn with_log(log: CallLog) -> Self {
        Self {
            log,
            objects: Arc::new(Mutex::new(BTreeMap::new())),
            fail_save: false,
            fail_load: false,
            in_place: false,
        }
    }

    /// Pre-populate an object
    pub fn with_object(self, key: &str, contents: &[u8]) -> Self {
        self.objects.lock().insert(key.to_string(), contents.to_vec());
        self
    }

    pub fn fail_save(mut self) -> Self {
        self.fail_save = true;
        self
    }

    pub fn fail_load(mut self) -> Self {
        self.fail_load = true;
        self
    }

    /// Report every working file as already stored in place
    pub fn in_place(mut self) -> Self {
        self.in_place = true;
        self
    }

    pub fn log(&self) -> &CallLog {
        &self.log
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().keys().cloned().collect()
    }
}

impl StorageConnector for MockStorage {
    fn name(&self) -> &'static str {
        "MockStorage"
    }

    fn save_backup(&self, local: &Path, key: &str, cancel: &CancellationToken) -> Result<(), StorageError> {
        self.log.push(Call::Save {
            local: local.to_path_buf(),
            key: key.to_string(),
        });
        if cancel.is_cancelled() {
            return Err(StorageError::Cancelled);
        }
        if self.fail_save {
            return Err(StorageError::Backend {
                cause: "403 Forbidden".to_string(),
            });
        }
        let contents = fs::read(local).map_err(|source| StorageError::Io {
            path: local.to_path_buf(),
            source,
        })?;
        self.objects.lock().insert(key.to_string(), contents);
        Ok(())
    }

    fn load_backup(&self, key: &str, local: &Path, cancel: &CancellationToken) -> Result<(), StorageError> {
        self.log.push(Call::Load {
            key: key.to_string(),
            local: local.to_path_buf(),
        });
        if cancel.is_cancelled() {
            return Err(StorageError::Cancelled);
        }
        if self.fail_load {
            return Err(StorageError::Backend {
                cause: "503 Service Unavailable".to_string(),
            });
        }
        let contents = self
            .object(key)
            .ok_or_else(|| StorageError::NotFound { key: key.to_string() })?;
        fs::write(local, contents).map_err(|source| StorageError::Io {
            path: local.to_path_buf(),
            source,
        })
    }

    fn list_backups(&self) -> Result<Vec<String>, StorageError> {
        self.log.push(Call::List);
        Ok(backup_keys(self.keys()))
    }

    fn holds_in_place(&self, _local: &Path, _key: &str) -> bool {
        self.in_place
    }
}

/// Severity of a recorded log line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

/// Logger that records every line
#[derive(Debug, Clone, Default)]
pub struct RecordingLogger {
    lines: Arc<Mutex<Vec<(LogLevel, String)>>>,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<(LogLevel, String)> {
        self.lines.lock().clone()
    }

    pub fn messages(&self, level: LogLevel) -> Vec<String> {
        self.lines
            .lock()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn contains(&self, level: LogLevel, needle: &str) -> bool {
        self.messages(level).iter().any(|m| m.contains(needle))
    }

    fn record(&self, level: LogLevel, message: &str) {
        self.lines.lock().push((level, message.to_string()));
    }
}

impl RunLogger for RecordingLogger {
    fn log_info(&self, message: &str) {
        self.record(LogLevel::Info, message);
    }

    fn log_warning(&self, message: &str) {
        self.record(LogLevel::Warning, message);
    }

    fn log_error(&self, message: &str) {
        self.record(LogLevel::Error, message);
    }
}

/// Notifier that records notifications instead of sending them
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record, then report a delivery failure
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn send_notification(&self, notification: &Notification) -> Result<()> {
        self.sent.lock().push(notification.clone());
        if self.fail {
            anyhow::bail!("webhook returned 500");
        }
        Ok(())
    }
}

/// Selection policy answering from a script and counting prompts
#[derive(Debug, Clone, Default)]
pub struct ScriptedSelection {
    answers: Arc<Mutex<VecDeque<String>>>,
    prompts: Arc<Mutex<Vec<(BackendCategory, Vec<String>)>>>,
}

impl ScriptedSelection {
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: Arc::new(Mutex::new(answers.iter().map(|a| a.to_string()).collect())),
            prompts: Arc::default(),
        }
    }

    pub fn prompt_count(&self) -> usize {
        self.prompts.lock().len()
    }

    /// Candidates offered at each prompt
    pub fn prompts(&self) -> Vec<(BackendCategory, Vec<String>)> {
        self.prompts.lock().clone()
    }
}

impl SelectionPolicy for ScriptedSelection {
    fn choose(&self, category: BackendCategory, candidates: &[&'static str]) -> Result<String, ConfigError> {
        self.prompts
            .lock()
            .push((category, candidates.iter().map(|c| c.to_string()).collect()));
        Ok(self.answers.lock().pop_front().unwrap_or_default())
    }
}
