//! Unit tests for configuration loading and validation

use backup_orchestrator::config::{load_config, validate_remote_storage, ConfigError};
use std::path::PathBuf;
use test_utils::{full_config_toml, minimal_config_toml, render_config, ConfigBuilder, TestContext};

#[test]
fn test_minimal_config_uses_defaults() {
    let ctx = TestContext::new();
    let path = ctx.create_file("config.toml", &render_config(minimal_config_toml(), ctx.temp_dir()));

    let config = load_config(&path).unwrap();
    assert_eq!(config.lock_file, ctx.temp_dir().join("backup.lock"));
    assert_eq!(config.mysql.host, "127.0.0.1");
    assert_eq!(config.mysql.threads, 4);
    assert_eq!(config.container.label, "gitlab");
    assert_eq!(config.retention.hours, 168);
    assert!(config.backup.delete_after_upload);
    assert!(config.backup.history_file.is_none());
    assert!(validate_remote_storage(&config.storage).is_ok());
}

#[test]
fn test_full_config() {
    let ctx = TestContext::new();
    let path = ctx.create_file("config.toml", &render_config(full_config_toml(), ctx.temp_dir()));

    let config = load_config(&path).unwrap();
    assert_eq!(config.mysql.host, "db.internal");
    assert_eq!(config.mysql.port, 3307);
    assert_eq!(config.mysql.threads, 8);
    assert_eq!(config.mysql.schema_rule().include_prefix, vec!["app_"]);
    assert_eq!(config.mysql.table_filters.exclude_prefix, vec!["tmp_"]);
    assert_eq!(config.container.container_name, "gitlab-web");
    assert_eq!(config.storage.path_prefix, "/nightly/");
    assert_eq!(config.retention.hours, 72);
    assert_eq!(config.encryption.password, "zip-secret");
    assert_eq!(config.telegram.chat_id, "-100200300");
    assert_eq!(config.logging.level, "debug");
    assert!(config.logging.json);
    assert!(!config.backup.delete_after_upload);
    assert_eq!(config.backup.command_timeout(), None);
    assert_eq!(
        config.backup.history_file,
        Some(ctx.temp_dir().join("history.jsonl"))
    );
}

#[test]
fn test_tilde_paths_expanded() {
    let ctx = TestContext::new();
    let path = ctx.create_file("config.toml", "[backup]\nlocal_dir = \"~/db-backups\"\n");

    let config = load_config(&path).unwrap();
    assert!(!config.backup.local_dir.starts_with("~"));
    assert!(config.backup.local_dir.ends_with("db-backups"));
}

#[test]
fn test_invalid_toml() {
    let ctx = TestContext::new();
    let path = ctx.create_file("config.toml", "invalid { toml content");

    assert!(matches!(load_config(&path), Err(ConfigError::ParseError(_))));
}

#[test]
fn test_missing_file() {
    let result = load_config(PathBuf::from("/nonexistent/backup-orchestrator.toml"));
    assert!(matches!(result, Err(ConfigError::ReadError(_))));
}

#[test]
fn test_empty_schema_prefix_rejected() {
    let ctx = TestContext::new();
    let path = ctx.create_file("config.toml", "[mysql]\nexclude_prefix = [\"\"]\n");

    assert!(matches!(load_config(&path), Err(ConfigError::ValidationError(_))));
}

#[test]
fn test_zero_threads_rejected() {
    let ctx = TestContext::new();
    let path = ctx.create_file("config.toml", "[mysql]\nthreads = 0\n");

    assert!(load_config(&path).is_err());
}

#[test]
fn test_local_only_config_fails_remote_validation() {
    let (path, _config, _temp) = ConfigBuilder::local_only().write_toml();

    let config = load_config(&path).unwrap();
    let err = validate_remote_storage(&config.storage).unwrap_err();
    assert!(err.to_string().contains("storage.endpoint"));
}
