//! Unit tests for backend resolution
//!
//! Resolution is driven with a scripted selection policy and a mock command
//! executor, so no prompt is shown and no client tool is run.

use db_backup_manager::resolver::{BackendResolver, DeclarativeSelection};
use std::sync::Arc;
use test_utils::{
    database_entry, gcs_storage_entry, local_storage_entry, s3_storage_entry, BackendCategory,
    ConfigBuilder, ConfigError, DatabaseKind, MockExecutor, ScriptedSelection, StorageKind,
    TestContext,
};

fn resolver(policy: ScriptedSelection) -> BackendResolver<ScriptedSelection> {
    BackendResolver::new(policy, Arc::new(MockExecutor::new()))
}

#[test]
fn test_single_entries_resolve_without_prompting() {
    let policy = ScriptedSelection::new(&[]);
    let resolver = resolver(policy.clone());
    let builder = ConfigBuilder::minimal();
    let backups = builder.backups_dir();
    let config = builder.build();

    let database = resolver.resolve_database_connector(&config).unwrap();
    let storage = resolver.resolve_storage_connector(&config).unwrap();

    assert_eq!(database.name(), "MySql");
    assert_eq!(storage.connector.name(), "Local");
    assert_eq!(storage.working_dir, backups);
    assert_eq!(policy.prompt_count(), 0);
}

#[test]
fn test_empty_sections() {
    let resolver = resolver(ScriptedSelection::new(&[]));
    let config = ConfigBuilder::new().build();

    match resolver.resolve_database_connector(&config) {
        Err(ConfigError::NoBackendsConfigured { category }) => {
            assert_eq!(category, BackendCategory::Database)
        }
        other => panic!("expected NoBackendsConfigured, got {:?}", other.err()),
    }
    match resolver.resolve_storage_connector(&config) {
        Err(ConfigError::NoBackendsConfigured { category }) => {
            assert_eq!(category, BackendCategory::Storage)
        }
        other => panic!("expected NoBackendsConfigured, got {:?}", other.err()),
    }
}

#[test]
fn test_prompt_offers_distinct_types_in_order() {
    let policy = ScriptedSelection::new(&["PostgreSql"]);
    let resolver = resolver(policy.clone());
    let config = ConfigBuilder::minimal()
        .add_database_config(database_entry(DatabaseKind::PostgreSql, "pg1"))
        .add_database_config(database_entry(DatabaseKind::MySql, "db2"))
        .add_database_config(database_entry(DatabaseKind::PostgreSql, "pg2"))
        .build();

    let database = resolver.resolve_database_connector(&config).unwrap();
    assert_eq!(database.name(), "PostgreSql");

    let prompts = policy.prompts();
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0].0, BackendCategory::Database);
    assert_eq!(prompts[0].1, vec!["MySql", "PostgreSql"]);
}

#[test]
fn test_unrecognized_answer_is_invalid_selection() {
    let resolver = resolver(ScriptedSelection::new(&["postgresql"]));
    let config = ConfigBuilder::minimal().add_database(DatabaseKind::PostgreSql).build();

    match resolver.resolve_database_connector(&config) {
        Err(ConfigError::InvalidSelection { choice, .. }) => assert_eq!(choice, "postgresql"),
        other => panic!("expected InvalidSelection, got {:?}", other.err()),
    }
}

#[test]
fn test_empty_answer_is_invalid_selection() {
    let resolver = resolver(ScriptedSelection::new(&[""]));
    let config = ConfigBuilder::minimal().add_database(DatabaseKind::MongoDb).build();

    assert!(matches!(
        resolver.resolve_database_connector(&config),
        Err(ConfigError::InvalidSelection { .. })
    ));
}

#[test]
fn test_explicit_selector_skips_prompt() {
    let policy = ScriptedSelection::new(&["MySql"]);
    let resolver = resolver(policy.clone());
    let config = ConfigBuilder::minimal()
        .add_database(DatabaseKind::MongoDb)
        .select_database("MongoDb")
        .build();

    assert_eq!(resolver.resolve_database_connector(&config).unwrap().name(), "MongoDb");
    assert_eq!(policy.prompt_count(), 0);
}

#[test]
fn test_selector_is_matched_exactly() {
    let policy = ScriptedSelection::new(&[]);
    let resolver = resolver(policy.clone());
    let config = ConfigBuilder::minimal()
        .add_database(DatabaseKind::MongoDb)
        .select_database(" MongoDb")
        .build();

    match resolver.resolve_database_connector(&config) {
        Err(ConfigError::InvalidSelection { choice, .. }) => assert_eq!(choice, " MongoDb"),
        other => panic!("expected InvalidSelection, got {:?}", other.err()),
    }
    assert_eq!(policy.prompt_count(), 0);
}

#[test]
fn test_selector_naming_unconfigured_type() {
    let resolver = resolver(ScriptedSelection::new(&[]));
    let config = ConfigBuilder::minimal().select_database("PostgreSql").build();

    match resolver.resolve_database_connector(&config) {
        Err(ConfigError::NoMatchingConfig { tag, .. }) => assert_eq!(tag, "PostgreSql"),
        other => panic!("expected NoMatchingConfig, got {:?}", other.err()),
    }
}

#[test]
fn test_declarative_policy_rejects_ambiguity() {
    let resolver = BackendResolver::new(DeclarativeSelection, Arc::new(MockExecutor::new()));
    let config = ConfigBuilder::minimal().add_database(DatabaseKind::PostgreSql).build();

    assert!(matches!(
        resolver.resolve_database_connector(&config),
        Err(ConfigError::InvalidSelection { .. })
    ));
}

#[test]
fn test_first_missing_field_is_reported() {
    let resolver = resolver(ScriptedSelection::new(&[]));
    let mut entry = database_entry(DatabaseKind::MySql, "db1");
    entry.database_name = Some(String::new());
    entry.password = None;
    let config = ConfigBuilder::new()
        .add_database_config(entry)
        .add_local_storage(std::path::Path::new("/tmp"))
        .build();

    match resolver.resolve_database_connector(&config) {
        Err(ConfigError::MissingField { name, .. }) => assert_eq!(name, "DatabaseName"),
        other => panic!("expected MissingField, got {:?}", other.err()),
    }
}

#[test]
fn test_unparsable_port_is_construction_failure() {
    let resolver = resolver(ScriptedSelection::new(&[]));
    let config = ConfigBuilder::new()
        .add_database_config(database_entry(DatabaseKind::MySql, "db1:port"))
        .build();

    assert!(matches!(
        resolver.resolve_database_connector(&config),
        Err(ConfigError::ConstructionFailed { .. })
    ));
}

#[test]
fn test_gcs_with_missing_credentials_file() {
    let ctx = TestContext::new();
    let resolver = resolver(ScriptedSelection::new(&[]));
    let config = ConfigBuilder::minimal()
        .select_storage("GoogleCloudStorage")
        .add_storage(gcs_storage_entry(ctx.temp_dir(), &ctx.temp_dir().join("missing.json")))
        .build();

    match resolver.resolve_storage_connector(&config) {
        Err(ConfigError::ConstructionFailed { category, cause }) => {
            assert_eq!(category, BackendCategory::Storage);
            assert!(cause.contains("missing.json"));
        }
        other => panic!("expected ConstructionFailed, got {:?}", other.err()),
    }
}

#[test]
fn test_s3_missing_secret_key() {
    let ctx = TestContext::new();
    let resolver = resolver(ScriptedSelection::new(&[]));
    let mut entry = s3_storage_entry(ctx.temp_dir());
    entry.secret_key = None;
    let config = ConfigBuilder::new().add_storage(entry).build();

    match resolver.resolve_storage_connector(&config) {
        Err(ConfigError::MissingField { name, .. }) => assert_eq!(name, "SecretKey"),
        other => panic!("expected MissingField, got {:?}", other.err()),
    }
}

#[test]
fn test_storage_prompt_and_restore_key() {
    let ctx = TestContext::new();
    let policy = ScriptedSelection::new(&["AmazonS3"]);
    let resolver = resolver(policy.clone());

    let mut s3 = s3_storage_entry(ctx.temp_dir());
    s3.restore_key = Some("backup-20260101000000".to_string());
    let config = ConfigBuilder::new()
        .add_storage(local_storage_entry(ctx.temp_dir()))
        .add_storage(s3)
        .build();

    let storage = resolver.resolve_storage_connector(&config).unwrap();
    assert_eq!(storage.connector.name(), "AmazonS3");
    assert_eq!(storage.restore_key.as_deref(), Some("backup-20260101000000"));
    assert_eq!(policy.prompts()[0].1, vec!["Local", "AmazonS3"]);
    assert_eq!(StorageKind::AmazonS3, config.storage.entries()[1].kind);
}
