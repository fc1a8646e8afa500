//! Tests for the restore pipeline
//!
//! Restore runs Download -> Connect -> Restore against the newest stored
//! backup unless a key is configured.

use test_utils::{Call, Command, JobState, LogLevel, NotifyEvent, RestoreFailure, Stage, TestContext};

#[test]
fn test_restore_latest_backup() {
    let ctx = TestContext::new().storage(|s| {
        s.with_object("backup-20250101000000", b"old")
            .with_object("backup-20260101000000", b"new")
            .with_object("notes.txt", b"ignored")
    });
    let (state, job) = ctx.run(Command::Restore);

    assert_eq!(state, JobState::Succeeded);
    assert_eq!(
        job.transitions,
        vec![
            JobState::Pending,
            JobState::Downloaded,
            JobState::Connected,
            JobState::Restored,
            JobState::Succeeded,
        ]
    );
    assert_eq!(job.remote_key, "backup-20260101000000");
    assert_eq!(ctx.database.restored().as_deref(), Some(&b"new"[..]));
    assert!(ctx.logger.contains(LogLevel::Info, "Restore process completed successfully."));
    assert_eq!(ctx.notifier.sent()[0].event, NotifyEvent::Success);
}

#[test]
fn test_restore_call_sequence() {
    let ctx = TestContext::new().storage(|s| s.with_object("backup-20260101000000", b"dump"));
    let (_, job) = ctx.run(Command::Restore);

    assert_eq!(
        ctx.log.calls(),
        vec![
            Call::List,
            Call::Load {
                key: "backup-20260101000000".to_string(),
                local: job.working_file_path.clone(),
            },
            Call::Connect,
            Call::Restore(job.working_file_path.clone()),
            Call::Disconnect,
        ]
    );
}

#[test]
fn test_configured_restore_key_skips_listing() {
    let ctx = TestContext::new()
        .storage(|s| {
            s.with_object("backup-20250101000000", b"pinned")
                .with_object("backup-20260101000000", b"latest")
        })
        .restore_key("backup-20250101000000");
    let (state, job) = ctx.run(Command::Restore);

    assert_eq!(state, JobState::Succeeded);
    assert_eq!(job.remote_key, "backup-20250101000000");
    assert_eq!(ctx.database.restored().as_deref(), Some(&b"pinned"[..]));
    assert_eq!(ctx.log.count(&Call::List), 0);
}

#[test]
fn test_no_backups_stored() {
    let ctx = TestContext::new();
    let (state, _) = ctx.run(Command::Restore);

    match state {
        JobState::Failed { stage, cause } => {
            assert_eq!(stage, Stage::Download);
            assert!(cause.contains("backup-*"));
        }
        other => panic!("expected failure, got {:?}", other),
    }
    // Never connected, yet the session is still released once
    assert_eq!(ctx.log.count(&Call::Connect), 0);
    assert_eq!(ctx.log.count(&Call::Disconnect), 1);
}

#[test]
fn test_only_non_backup_objects_stored() {
    let ctx = TestContext::new().storage(|s| s.with_object("notes.txt", b"not a backup"));
    let (state, _) = ctx.run(Command::Restore);

    assert!(matches!(state, JobState::Failed { stage: Stage::Download, .. }));
    assert_eq!(ctx.log.count(&Call::Connect), 0);
    assert!(ctx.database.restored().is_none());
}

#[test]
fn test_missing_restore_key() {
    let ctx = TestContext::new()
        .storage(|s| s.with_object("backup-20260101000000", b"dump"))
        .restore_key("backup-19990101000000");
    let (state, _) = ctx.run(Command::Restore);

    assert_eq!(
        state,
        JobState::Failed {
            stage: Stage::Download,
            cause: "Backup not found in storage: backup-19990101000000".to_string(),
        }
    );
    assert_eq!(ctx.notifier.sent()[0].event, NotifyEvent::Failure);
}

#[test]
fn test_download_failure() {
    let ctx = TestContext::new().storage(|s| s.with_object("backup-20260101000000", b"dump").fail_load());
    let (state, _) = ctx.run(Command::Restore);

    assert!(matches!(state, JobState::Failed { stage: Stage::Download, .. }));
    assert!(ctx.database.restored().is_none());
}

#[test]
fn test_connect_failure_after_download() {
    let ctx = TestContext::new()
        .storage(|s| s.with_object("backup-20260101000000", b"dump"))
        .database(|db| db.fail_connect());
    let (state, job) = ctx.run(Command::Restore);

    assert!(matches!(state, JobState::Failed { stage: Stage::Connect, .. }));
    assert_eq!(job.transitions[1], JobState::Downloaded);
    assert_eq!(ctx.log.count(&Call::Disconnect), 1);
}

#[test]
fn test_partial_restore_is_reported() {
    let ctx = TestContext::new()
        .storage(|s| s.with_object("backup-20260101000000", b"dump"))
        .database(|db| db.fail_restore(RestoreFailure::Partial));
    let (state, job) = ctx.run(Command::Restore);

    assert!(matches!(state, JobState::Failed { stage: Stage::Restore, .. }));
    let message = job.error_message.unwrap();
    assert!(message.contains("partially applied"));
    assert!(message.contains("3 document(s)"));

    let sent = ctx.notifier.sent();
    assert_eq!(sent[0].message, "Restore process failed.");
    assert!(sent[0].error.as_deref().unwrap().contains("partially applied"));
}

#[test]
fn test_unknown_restore_failure() {
    let ctx = TestContext::new()
        .storage(|s| s.with_object("backup-20260101000000", b"dump"))
        .database(|db| db.fail_restore(RestoreFailure::Unknown));
    let (state, _) = ctx.run(Command::Restore);

    assert!(matches!(state, JobState::Failed { stage: Stage::Restore, .. }));
    assert!(ctx
        .logger
        .contains(LogLevel::Error, "Restore process failed during restore stage"));
    assert!(ctx.logger.contains(LogLevel::Error, "database state unknown"));
    assert_eq!(ctx.log.count(&Call::Disconnect), 1);
}
