//! Pipeline orchestrator - drives one backup or restore run
//!
//! Backup:  Pending -> Connected -> Dumped -> Uploaded -> Succeeded
//! Restore: Pending -> Downloaded -> Connected -> Restored -> Succeeded
//!
//! Any stage may end the run in `Failed` or `Cancelled`. The database
//! session is released exactly once per run, whatever happened.

use crate::databases::{BackupError, ConnectionError, DatabaseConnector, RestoreError};
use crate::managers::logging::RunLogger;
use crate::managers::notification::{Notification, Notifier};
use crate::storage::{StorageConnector, StorageError, BACKUP_KEY_PREFIX};
use chrono::{DateTime, Local};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Timestamp embedded in working file names and backup keys
const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Prefix of restore working files; never matches a backup key
const RESTORE_FILE_PREFIX: &str = "restore-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Backup,
    Restore,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Backup => write!(f, "backup"),
            Command::Restore => write!(f, "restore"),
        }
    }
}

impl Command {
    fn title(&self) -> &'static str {
        match self {
            Command::Backup => "Backup",
            Command::Restore => "Restore",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Connect,
    Dump,
    Upload,
    Download,
    Restore,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Connect => "connect",
            Stage::Dump => "dump",
            Stage::Upload => "upload",
            Stage::Download => "download",
            Stage::Restore => "restore",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Connected,
    Dumped,
    Uploaded,
    Downloaded,
    Restored,
    Succeeded,
    Failed { stage: Stage, cause: String },
    Cancelled { stage: Stage },
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Succeeded | JobState::Failed { .. } | JobState::Cancelled { .. }
        )
    }

    /// Process exit code for a terminal state
    pub fn exit_code(&self) -> u8 {
        match self {
            JobState::Succeeded => 0,
            JobState::Cancelled { .. } => 130,
            _ => 1,
        }
    }
}

/// One backup or restore run
#[derive(Debug, Clone)]
pub struct BackupJob {
    pub command: Command,
    pub working_file_path: PathBuf,
    pub remote_key: String,
    pub state: JobState,
    pub error_message: Option<String>,
    pub transitions: Vec<JobState>,
}

impl BackupJob {
    pub fn new(command: Command, working_dir: &Path, now: DateTime<Local>) -> Self {
        let stamp = now.format(TIMESTAMP_FORMAT);
        let key = format!("{}{}", BACKUP_KEY_PREFIX, stamp);
        let working_file = match command {
            Command::Backup => key.clone(),
            Command::Restore => format!("{}{}", RESTORE_FILE_PREFIX, stamp),
        };
        Self {
            command,
            working_file_path: working_dir.join(working_file),
            remote_key: key,
            state: JobState::Pending,
            error_message: None,
            transitions: vec![JobState::Pending],
        }
    }

    fn transition(&mut self, state: JobState) {
        tracing::debug!("Job state: {:?} -> {:?}", self.state, state);
        if let JobState::Failed { cause, .. } = &state {
            self.error_message = Some(cause.clone());
        }
        self.transitions.push(state.clone());
        self.state = state;
    }
}

/// Why a stage stopped the run
#[derive(Debug)]
struct StageFailure {
    stage: Stage,
    cancelled: bool,
    cause: String,
}

impl StageFailure {
    fn cancelled(stage: Stage) -> Self {
        Self {
            stage,
            cancelled: true,
            cause: "cancelled".to_string(),
        }
    }
}

macro_rules! stage_failure_from {
    ($($err:ty),*) => {
        $(
            impl From<(Stage, $err)> for StageFailure {
                fn from((stage, err): (Stage, $err)) -> Self {
                    Self {
                        stage,
                        cancelled: err.is_cancelled(),
                        cause: err.to_string(),
                    }
                }
            }
        )*
    };
}

stage_failure_from!(ConnectionError, BackupError, RestoreError, StorageError);

/// Releases the database session exactly once, on close or on unwinding
struct Session<'a> {
    database: &'a mut dyn DatabaseConnector,
    logger: &'a dyn RunLogger,
    released: bool,
}

impl<'a> Session<'a> {
    fn new(database: &'a mut dyn DatabaseConnector, logger: &'a dyn RunLogger) -> Self {
        Self {
            database,
            logger,
            released: false,
        }
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(e) = self.database.disconnect() {
            self.logger
                .log_warning(&format!("Failed to disconnect from {}: {}", self.database.name(), e));
        }
    }

    fn close(mut self) {
        self.release();
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Orchestrates one run over a resolved database and storage backend
pub struct Pipeline {
    database: Box<dyn DatabaseConnector>,
    storage: Box<dyn StorageConnector>,
    logger: Box<dyn RunLogger>,
    notifier: Option<Box<dyn Notifier>>,
    cancel: CancellationToken,
    keep_working_file: bool,
    restore_key: Option<String>,
}

impl Pipeline {
    pub fn new(
        database: Box<dyn DatabaseConnector>,
        storage: Box<dyn StorageConnector>,
        logger: Box<dyn RunLogger>,
    ) -> Self {
        Self {
            database,
            storage,
            logger,
            notifier: None,
            cancel: CancellationToken::new(),
            keep_working_file: false,
            restore_key: None,
        }
    }

    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn keep_working_file(mut self, keep: bool) -> Self {
        self.keep_working_file = keep;
        self
    }

    /// Restore this key instead of the newest stored backup
    pub fn with_restore_key(mut self, key: Option<String>) -> Self {
        self.restore_key = key;
        self
    }

    /// Run the job to a terminal state and report the outcome
    pub fn run(&mut self, job: &mut BackupJob) -> JobState {
        let started = Instant::now();
        self.logger
            .log_info(&format!("Starting {} process...", job.command));

        let outcome = {
            let mut session = Session::new(self.database.as_mut(), self.logger.as_ref());
            let result = match job.command {
                Command::Backup => run_backup(&mut session, self.storage.as_ref(), job, &self.cancel),
                Command::Restore => run_restore(
                    &mut session,
                    self.storage.as_ref(),
                    self.restore_key.as_deref(),
                    job,
                    &self.cancel,
                ),
            };
            session.close();
            result
        };

        let terminal = match outcome {
            Ok(()) => JobState::Succeeded,
            Err(failure) if failure.cancelled => JobState::Cancelled { stage: failure.stage },
            Err(failure) => JobState::Failed {
                stage: failure.stage,
                cause: failure.cause,
            },
        };
        job.transition(terminal.clone());

        let duration_secs = started.elapsed().as_secs();
        self.report(job, duration_secs);
        self.cleanup(job);

        terminal
    }

    fn report(&self, job: &BackupJob, duration_secs: u64) {
        let title = job.command.title();
        let notification = match &job.state {
            JobState::Succeeded => {
                let message = format!("{} process completed successfully.", title);
                self.logger.log_info(&message);
                Notification::success(message, duration_secs)
            }
            JobState::Failed { stage, cause } => {
                self.logger.log_error(&format!(
                    "{} process failed during {} stage: {}",
                    title, stage, cause
                ));
                Notification::failure(format!("{} process failed.", title), cause.clone(), duration_secs)
            }
            JobState::Cancelled { stage } => {
                let message = format!("{} process was cancelled during {} stage.", title, stage);
                self.logger.log_warning(&message);
                Notification::warning(message, duration_secs)
            }
            other => {
                self.logger
                    .log_warning(&format!("{} process ended in non-terminal state {:?}", title, other));
                return;
            }
        };

        if let Some(ref notifier) = self.notifier {
            if let Err(e) = notifier.send_notification(&notification) {
                self.logger
                    .log_warning(&format!("Failed to send {:?} notification: {:#}", notification.event, e));
            }
        }
    }

    fn cleanup(&self, job: &BackupJob) {
        let path = &job.working_file_path;
        if self.keep_working_file {
            self.logger
                .log_info(&format!("Keeping working file {}", path.display()));
            return;
        }
        if self.storage.holds_in_place(path, &job.remote_key) || !path.exists() {
            return;
        }
        if let Err(e) = fs::remove_file(path) {
            self.logger.log_warning(&format!(
                "Failed to remove working file {}: {}",
                path.display(),
                e
            ));
        }
    }
}

fn checkpoint(cancel: &CancellationToken, next: Stage) -> Result<(), StageFailure> {
    if cancel.is_cancelled() {
        Err(StageFailure::cancelled(next))
    } else {
        Ok(())
    }
}

fn run_backup(
    session: &mut Session<'_>,
    storage: &dyn StorageConnector,
    job: &mut BackupJob,
    cancel: &CancellationToken,
) -> Result<(), StageFailure> {
    checkpoint(cancel, Stage::Connect)?;
    session
        .database
        .connect(cancel)
        .map_err(|e| (Stage::Connect, e))?;
    job.transition(JobState::Connected);

    checkpoint(cancel, Stage::Dump)?;
    session
        .database
        .backup(&job.working_file_path, cancel)
        .map_err(|e| (Stage::Dump, e))?;
    job.transition(JobState::Dumped);

    checkpoint(cancel, Stage::Upload)?;
    storage
        .save_backup(&job.working_file_path, &job.remote_key, cancel)
        .map_err(|e| (Stage::Upload, e))?;
    job.transition(JobState::Uploaded);

    Ok(())
}

fn run_restore(
    session: &mut Session<'_>,
    storage: &dyn StorageConnector,
    restore_key: Option<&str>,
    job: &mut BackupJob,
    cancel: &CancellationToken,
) -> Result<(), StageFailure> {
    checkpoint(cancel, Stage::Download)?;
    job.remote_key = match restore_key {
        Some(key) => key.to_string(),
        None => latest_backup(storage)?,
    };
    tracing::info!("Restoring from {}", job.remote_key);

    storage
        .load_backup(&job.remote_key, &job.working_file_path, cancel)
        .map_err(|e| (Stage::Download, e))?;
    job.transition(JobState::Downloaded);

    checkpoint(cancel, Stage::Connect)?;
    session
        .database
        .connect(cancel)
        .map_err(|e| (Stage::Connect, e))?;
    job.transition(JobState::Connected);

    checkpoint(cancel, Stage::Restore)?;
    session
        .database
        .restore(&job.working_file_path, cancel)
        .map_err(|e| (Stage::Restore, e))?;
    job.transition(JobState::Restored);

    Ok(())
}

fn latest_backup(storage: &dyn StorageConnector) -> Result<String, StageFailure> {
    let keys = storage.list_backups().map_err(|e| (Stage::Download, e))?;
    keys.last().cloned().ok_or_else(|| {
        StageFailure::from((
            Stage::Download,
            StorageError::NotFound {
                key: format!("{}*", BACKUP_KEY_PREFIX),
            },
        ))
    })
}
