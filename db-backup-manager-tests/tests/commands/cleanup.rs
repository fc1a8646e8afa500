//! Tests for working file cleanup after a run

use db_backup_manager::storage::{LocalStorage, StorageConnector};
use test_utils::{Command, JobState, LogLevel, Pipeline, TestContext};

const WORKING_FILE: &str = "backup-20260102030405";
const RESTORE_FILE: &str = "restore-20260102030405";

#[test]
fn test_working_file_removed_after_backup() {
    let ctx = TestContext::new();
    let (state, job) = ctx.run(Command::Backup);

    assert_eq!(state, JobState::Succeeded);
    assert!(!job.working_file_path.exists());
    assert!(!ctx.file_exists(WORKING_FILE));
    assert!(ctx.storage.object(WORKING_FILE).is_some());
}

#[test]
fn test_working_file_removed_after_failed_upload() {
    let ctx = TestContext::new().storage(|s| s.fail_save());
    ctx.run(Command::Backup);

    assert!(!ctx.file_exists(WORKING_FILE));
}

#[test]
fn test_working_file_removed_after_restore() {
    let ctx = TestContext::new().storage(|s| s.with_object("backup-20260101000000", b"dump"));
    let (state, _) = ctx.run(Command::Restore);

    assert_eq!(state, JobState::Succeeded);
    assert!(!ctx.file_exists(RESTORE_FILE));
}

#[test]
fn test_kept_restore_file_is_not_listed_as_backup() {
    let ctx = TestContext::new();
    let storage = LocalStorage::new(ctx.temp_dir());
    std::fs::write(ctx.temp_dir().join("backup-20260101000000"), b"dump").unwrap();

    let mut job = ctx.job(Command::Restore);
    let mut pipeline = Pipeline::new(
        Box::new(ctx.database.clone()),
        Box::new(storage.clone()),
        Box::new(ctx.logger.clone()),
    )
    .keep_working_file(true);
    assert_eq!(pipeline.run(&mut job), JobState::Succeeded);

    assert!(ctx.file_exists(RESTORE_FILE));
    assert_eq!(storage.list_backups().unwrap(), vec!["backup-20260101000000"]);
}

#[test]
fn test_keep_working_file() {
    let ctx = TestContext::new()
        .database(|db| db.with_dump(b"kept"))
        .keep_working_file(true);
    ctx.run(Command::Backup);

    assert!(ctx.file_exists(WORKING_FILE));
    assert_eq!(std::fs::read(ctx.temp_dir().join(WORKING_FILE)).unwrap(), b"kept");
    assert!(ctx.logger.contains(LogLevel::Info, "Keeping working file"));
}

#[test]
fn test_file_held_in_place_is_not_removed() {
    let ctx = TestContext::new().storage(|s| s.in_place());
    ctx.run(Command::Backup);

    assert!(ctx.file_exists(WORKING_FILE));
}

#[test]
fn test_missing_working_file_is_not_a_warning() {
    let ctx = TestContext::new().database(|db| db.fail_connect());
    ctx.run(Command::Backup);

    assert!(!ctx.file_exists(WORKING_FILE));
    assert!(ctx.logger.messages(LogLevel::Warning).is_empty());
}
