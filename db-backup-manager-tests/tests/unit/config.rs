//! Unit tests for configuration loading and validation

use db_backup_manager::config::{load_config, ConfigError, NotifyEvent, StorageKind};
use rstest::rstest;
use test_utils::{minimal_config_json, ConfigBuilder, DatabaseKind, ResultAssertions, TestContext};

#[test]
fn test_config_loading_valid() {
    let builder = ConfigBuilder::minimal();
    let path = builder.write_json();

    let config = load_config(&path).assert_ok();
    assert_eq!(config.databases[0].kind, DatabaseKind::MySql);
    assert_eq!(config.storage.entries()[0].kind, StorageKind::Local);
    assert_eq!(
        config.storage.entries()[0].local_path.as_deref(),
        Some(builder.backups_dir().display().to_string().as_str())
    );
}

#[test]
fn test_fixture_document_loads() {
    let ctx = TestContext::new();
    let json = minimal_config_json().replace("{backup_path}", "/var/backups");
    let path = ctx.create_file("config.json", json.as_bytes());

    let config = load_config(&path).assert_ok();
    assert_eq!(config.databases.len(), 1);
    assert_eq!(config.notifications.notify_on, vec![NotifyEvent::Success, NotifyEvent::Failure]);
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.logging.max_files, 10);
}

#[test]
fn test_storage_list_form() {
    let ctx = TestContext::new();
    let path = ctx.create_file(
        "config.json",
        br#"{
            "Databases": [{"Type": "MongoDb", "Host": "db1"}],
            "Storage": [
                {"Type": "Local", "LocalPath": "/a"},
                {"Type": "AmazonS3", "LocalPath": "/b", "BucketName": "x"}
            ],
            "Selection": {"Storage": "AmazonS3"},
            "KeepWorkingFile": true
        }"#,
    );

    let config = load_config(&path).assert_ok();
    assert_eq!(config.storage.entries().len(), 2);
    assert_eq!(config.selection.storage.as_deref(), Some("AmazonS3"));
    assert!(config.keep_working_file);
    // Missing connection fields are only reported at resolution time
    assert!(config.databases[0].username.is_none());
}

#[rstest]
#[case("Oracle")]
#[case("mysql")]
#[case("")]
fn test_unknown_database_type_fails_to_load(#[case] tag: &str) {
    let ctx = TestContext::new();
    let json = format!(r#"{{"Databases": [{{"Type": "{}", "Host": "db1"}}]}}"#, tag);
    let path = ctx.create_file("config.json", json.as_bytes());

    assert!(matches!(load_config(&path), Err(ConfigError::ParseError(_))));
}

#[test]
fn test_malformed_document() {
    let ctx = TestContext::new();
    let path = ctx.create_file("config.json", b"{ not json");

    load_config(&path).assert_err_contains("Failed to parse config file");
}

#[test]
fn test_missing_file() {
    let ctx = TestContext::new();
    let result = load_config(ctx.temp_dir().join("nope.json"));
    assert!(matches!(result, Err(ConfigError::ReadError(_))));
}

#[test]
fn test_toml_document() {
    let ctx = TestContext::new();
    let path = ctx.create_file(
        "config.toml",
        br#"
[[Databases]]
Type = "MongoDb"
Host = "mongo:27018"
DatabaseName = "app"
Username = "u"
Password = "p"
TimeoutSeconds = 120

[[Storage]]
Type = "AzureBlobStorage"
LocalPath = "/tmp/work"
ConnectionString = "UseDevelopmentStorage=true"
ContainerName = "backups"

[Notifications]
DiscordWebhookUrl = "https://discord.com/api/webhooks/1/abc"
NotifyOn = ["Failure", "Warning"]
"#,
    );

    let config = load_config(&path).assert_ok();
    assert_eq!(config.databases[0].timeout_seconds, Some(120));
    assert_eq!(config.storage.entries()[0].kind, StorageKind::AzureBlobStorage);
    assert_eq!(config.notifications.notify_on, vec![NotifyEvent::Failure, NotifyEvent::Warning]);
}
