//! Tests for the 'validate' command
//!
//! The validate command loads the config and, unless `--only-dump` is given,
//! checks that remote storage is usable.

use backup_orchestrator::config::{load_config, validate_remote_storage, ConfigError};
use backup_orchestrator::managers::backup::{BackupManager, Workflow};
use backup_orchestrator::utils::RealExecutor;
use std::sync::Arc;
use test_utils::{ConfigBuilder, ResultAssertions, TestContext};

#[test]
fn test_validate_builder_config() {
    let (path, _config, _temp) = ConfigBuilder::new()
        .include_schema_prefix("app_")
        .with_encryption("secret")
        .write_toml();

    let loaded = load_config(&path).assert_ok();
    assert_eq!(loaded.mysql.include_prefix, vec!["app_"]);
    validate_remote_storage(&loaded.storage).assert_ok();
}

#[test]
fn test_validate_empty_config_uses_defaults() {
    let ctx = TestContext::new();
    let path = ctx.create_file("config.toml", "");

    let config = load_config(&path).assert_ok();
    validate_remote_storage(&config.storage).assert_err_contains("storage.endpoint");
}

#[test]
fn test_validate_rejects_empty_backup_command() {
    let ctx = TestContext::new();
    let path = ctx.create_file("config.toml", "[container]\nbackup_command = []\n");

    assert!(matches!(load_config(&path), Err(ConfigError::ValidationError(_))));
}

#[test]
fn test_remote_run_requires_storage() {
    let config = ConfigBuilder::local_only().build();

    let result = BackupManager::from_config(&config, Workflow::MySql, false, Arc::new(RealExecutor::new()));
    assert!(result.is_err());
}

#[test]
fn test_only_dump_run_needs_no_storage() {
    let config = ConfigBuilder::local_only().build();

    let result = BackupManager::from_config(&config, Workflow::Container, true, Arc::new(RealExecutor::new()));
    assert!(result.is_ok());
}

#[test]
fn test_workflow_tool_requirements() {
    assert_eq!(Workflow::MySql.required_tools(), &["mysqlsh", "zip"]);
    assert_eq!(Workflow::Container.required_tools(), &["docker", "zip"]);
}
