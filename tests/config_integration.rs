//! Integration tests for loading `relweave.toml`.

use relweave::RelweaveConfig;
use relweave::query::{DatabaseType, ErrorCode, NestedModifiers, ToOneConflict};
use std::io::Write;

/// Test loading a complete configuration from disk
#[test]
fn test_config_from_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(
        file,
        r#"
        [query]
        dialect = "mysql"
        stable_ordering = false
        nested_modifiers = "ignore"
        to_one_conflict = "last_write_wins"
        "#
    )
    .unwrap();

    let config = RelweaveConfig::from_file(file.path()).expect("Failed to load config");
    assert_eq!(config.query.dialect, DatabaseType::MySQL);
    assert!(!config.query.stable_ordering);
    assert_eq!(config.query.nested_modifiers, NestedModifiers::Ignore);
    assert_eq!(config.query.to_one_conflict, ToOneConflict::LastWriteWins);
}

/// Test that a missing file is a configuration error
#[test]
fn test_config_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = RelweaveConfig::from_file(dir.path().join("relweave.toml")).unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidConfiguration);
    assert!(err.message.contains("relweave.toml"));
}

/// Test that invalid values are rejected
#[test]
fn test_config_invalid_value() {
    let err = RelweaveConfig::from_str("[query]\ndialect = \"oracle\"\n").unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidConfiguration);
}

/// Test that unknown sections are rejected
#[test]
fn test_config_unknown_section() {
    let err = RelweaveConfig::from_str("[database]\nurl = \"x\"\n").unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidConfiguration);
}

/// Test the planner honours the loaded dialect
#[test]
fn test_config_drives_planning() {
    use relweave::query::{EntityCatalog, EntityDescriptor, Filter, JoinPlanner, QueryRequest, ScalarCodec};

    let config = RelweaveConfig::from_str("[query]\ndialect = \"sqlite\"\n").unwrap();
    let catalog = EntityCatalog::builder()
        .entity(EntityDescriptor::new("User", "users").column("id", ScalarCodec::Int))
        .build()
        .unwrap();
    let plan = JoinPlanner::new(&catalog, &config.query)
        .plan(&QueryRequest::new("User").r#where(Filter::equals("id", 1)).skip(5))
        .unwrap();
    assert_eq!(
        plan.sql(),
        "SELECT users.id AS usersid FROM users WHERE users.id = ? ORDER BY users.id ASC LIMIT -1 OFFSET 5"
    );
}
