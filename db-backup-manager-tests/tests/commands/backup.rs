//! Tests for the backup pipeline
//!
//! Backup runs Connect -> Dump -> Upload, always disconnects, and reports
//! the outcome through the logger and notifier.

use test_utils::{
    Call, Command, JobState, LogLevel, NotifyEvent, RecordingNotifier, Stage, TestContext,
};

#[test]
fn test_backup_success() {
    let ctx = TestContext::new().database(|db| db.with_dump(b"CREATE TABLE t (id int);"));
    let (state, job) = ctx.run(Command::Backup);

    assert_eq!(state, JobState::Succeeded);
    assert_eq!(state.exit_code(), 0);
    assert_eq!(
        job.transitions,
        vec![
            JobState::Pending,
            JobState::Connected,
            JobState::Dumped,
            JobState::Uploaded,
            JobState::Succeeded,
        ]
    );
    assert!(job.error_message.is_none());

    assert_eq!(
        ctx.storage.object("backup-20260102030405").as_deref(),
        Some(&b"CREATE TABLE t (id int);"[..])
    );
}

#[test]
fn test_backup_call_sequence() {
    let ctx = TestContext::new();
    let (_, job) = ctx.run(Command::Backup);

    assert_eq!(
        ctx.log.calls(),
        vec![
            Call::Connect,
            Call::Backup(job.working_file_path.clone()),
            Call::Save {
                local: job.working_file_path.clone(),
                key: "backup-20260102030405".to_string(),
            },
            Call::Disconnect,
        ]
    );
}

#[test]
fn test_backup_success_is_logged_and_notified_once() {
    let ctx = TestContext::new();
    ctx.run(Command::Backup);

    let info = ctx.logger.messages(LogLevel::Info);
    let start = info.iter().position(|m| m == "Starting backup process...").unwrap();
    let done = info
        .iter()
        .position(|m| m == "Backup process completed successfully.")
        .unwrap();
    assert!(start < done);
    assert!(ctx.logger.messages(LogLevel::Error).is_empty());

    let sent = ctx.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].event, NotifyEvent::Success);
    assert!(sent[0].duration_secs.is_some());
}

#[test]
fn test_connect_failure() {
    let ctx = TestContext::new().database(|db| db.fail_connect());
    let (state, job) = ctx.run(Command::Backup);

    match &state {
        JobState::Failed { stage, cause } => {
            assert_eq!(*stage, Stage::Connect);
            assert!(cause.contains("connection refused"));
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(state.exit_code(), 1);
    assert_eq!(job.error_message.as_deref().map(|m| m.contains("connection refused")), Some(true));

    // No dump or upload after a failed connect, but the session is still released
    assert_eq!(ctx.log.calls(), vec![Call::Connect, Call::Disconnect]);
}

#[test]
fn test_dump_failure_is_reported() {
    let ctx = TestContext::new().database(|db| db.fail_backup());
    let (state, _) = ctx.run(Command::Backup);

    assert!(matches!(state, JobState::Failed { stage: Stage::Dump, .. }));
    assert!(ctx.logger.contains(LogLevel::Error, "Got error: 1044"));
    assert!(ctx.storage.keys().is_empty());

    let sent = ctx.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].event, NotifyEvent::Failure);
    assert!(sent[0].error.as_deref().unwrap().contains("Got error: 1044"));
}

#[test]
fn test_upload_failure() {
    let ctx = TestContext::new().storage(|s| s.fail_save());
    let (state, job) = ctx.run(Command::Backup);

    assert!(matches!(state, JobState::Failed { stage: Stage::Upload, .. }));
    assert_eq!(
        job.transitions.last(),
        Some(&JobState::Failed {
            stage: Stage::Upload,
            cause: "Storage backend error: 403 Forbidden".to_string(),
        })
    );
    assert_eq!(ctx.log.count(&Call::Disconnect), 1);
}

#[test]
fn test_disconnect_failure_does_not_change_outcome() {
    let ctx = TestContext::new().database(|db| db.fail_disconnect());
    let (state, _) = ctx.run(Command::Backup);

    assert_eq!(state, JobState::Succeeded);
    assert!(ctx.logger.contains(LogLevel::Warning, "connection reset"));
    assert_eq!(ctx.notifier.sent()[0].event, NotifyEvent::Success);
}

#[test]
fn test_notifier_failure_is_only_a_warning() {
    let ctx = TestContext::new().notifier(RecordingNotifier::failing());
    let (state, _) = ctx.run(Command::Backup);

    assert_eq!(state, JobState::Succeeded);
    assert!(ctx.logger.contains(LogLevel::Warning, "webhook returned 500"));
}
