//! Schema runs through a mocked `mysqlsh`

use backup_orchestrator::config::FilterRule;
use backup_orchestrator::managers::history::HistoryLog;
use backup_orchestrator::managers::pipeline::Stage;
use backup_orchestrator::utils::locker::RunLock;
use std::sync::Arc;
use test_utils::*;
use tokio_util::sync::CancellationToken;

fn server(schemas: &[&str]) -> MockExecutor {
    MockExecutor::new().expect_with_arg("mysqlsh", "schemata", MockResponse::stdout(&schema_listing(schemas)))
}

#[tokio::test]
async fn test_failed_archive_does_not_stop_later_targets() {
    let ctx = TestContext::new();
    let executor = server(&["alpha", "bravo", "charlie"]);
    let archiver = MockArchiver::new().failing_for("bravo_");
    let store = MockStore::new();
    let notifier = MockNotifier::new();
    let manager = ctx
        .mysql_manager(&executor, &archiver, &store)
        .with_notifier(Arc::new(notifier.clone()));

    let summary = manager.execute(&CancellationToken::new()).await.unwrap();

    let targets: Vec<_> = summary.results.iter().map(|r| r.target.as_str()).collect();
    assert_eq!(targets, vec!["alpha", "bravo", "charlie"]);
    assert_eq!((summary.success_count(), summary.fail_count()), (2, 1));
    assert_eq!(summary.results[1].error().assert_some().stage, Stage::Archive);

    let uploads = store.get_uploads();
    assert_eq!(uploads.len(), 2);
    assert!(uploads[0].starts_with("alpha_") && uploads[0].ends_with(".zip"));
    assert!(uploads[1].starts_with("charlie_"));

    // Staging dirs and archives are removed, failures included
    assert!(ctx.work_dir_entries().is_empty());

    let report = &notifier.get_messages()[0];
    assert!(report.contains("Total: 3, Success: 2, Fail: 1"));
    assert!(report.contains("❌ bravo: Error: archive stage failed"));

    manager
        .run(&CancellationToken::new())
        .await
        .assert_err_contains("1 of 3 targets failed");
}

#[tokio::test]
async fn test_excluded_and_system_schemas_never_dumped() {
    let ctx = TestContext::from_builder(ConfigBuilder::new().exclude_schema("logs_db"));
    let executor = server(&["app_db", "logs_db"]);
    let store = MockStore::new();
    let manager = ctx.mysql_manager(&executor, &MockArchiver::new(), &store);

    let summary = manager.run(&CancellationToken::new()).await.assert_ok();

    assert_eq!(summary.total(), 1);
    assert_eq!(summary.results[0].target, "app_db");
    let dumps: Vec<_> = executor
        .calls_to("mysqlsh")
        .into_iter()
        .filter(|c| c.mentions("util.dumpSchemas"))
        .collect();
    assert_eq!(dumps.len(), 1);
    assert!(dumps[0].mentions(r#"["app_db"]"#));
}

#[tokio::test]
async fn test_dump_failure_is_reported_per_target() {
    let ctx = TestContext::from_builder(ConfigBuilder::new().with_history());
    let executor = server(&["app_db", "billing"]).expect_with_arg(
        "mysqlsh",
        r#"["billing"]"#,
        MockResponse::exit(1, "Dump failed: Access denied for user"),
    );
    let archiver = MockArchiver::new();
    let store = MockStore::new();
    let manager = ctx.mysql_manager(&executor, &archiver, &store);

    let summary = manager.execute(&CancellationToken::new()).await.unwrap();

    let failure = summary.results[1].error().assert_some();
    assert_eq!(failure.stage, Stage::Dump);
    assert!(failure.to_string().contains("Access denied"));
    assert_eq!(archiver.get_calls().len(), 1);
    assert_eq!(store.get_uploads().len(), 1);

    let history = HistoryLog::new(ctx.temp_dir().join("history.jsonl")).read_all().unwrap();
    let statuses: Vec<_> = history.iter().map(|r| (r.target.as_str(), r.status.as_str())).collect();
    assert_eq!(statuses, vec![("app_db", "SUCCESS"), ("billing", "FAILED")]);
    assert_eq!(history[0].sha256.len(), 64);
}

#[tokio::test]
async fn test_publish_failure_keeps_nothing_behind() {
    let ctx = TestContext::new();
    let executor = server(&["app_db"]);
    let store = MockStore::new().failing_upload("app_db");
    let manager = ctx.mysql_manager(&executor, &MockArchiver::new(), &store);

    let summary = manager.execute(&CancellationToken::new()).await.unwrap();

    let failure = summary.results[0].error().assert_some();
    assert_eq!(failure.stage, Stage::Publish);
    assert!(store.keys().is_empty());
    assert!(ctx.work_dir_entries().is_empty());
}

#[tokio::test]
async fn test_keep_local_files_leaves_staging_and_archive() {
    let ctx = TestContext::from_builder(ConfigBuilder::new().keep_local_files());
    let executor = server(&["app_db"]);
    let manager = ctx.mysql_manager(&executor, &MockArchiver::new(), &MockStore::new());

    manager.run(&CancellationToken::new()).await.assert_ok();

    let entries = ctx.work_dir_entries();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().any(|e| e.starts_with("app_db_") && e.ends_with(".zip")));
    assert!(entries.iter().any(|e| e.starts_with("app_db_") && !e.ends_with(".zip")));
}

#[tokio::test]
async fn test_archive_uses_configured_passphrase() {
    let ctx = TestContext::from_builder(ConfigBuilder::new().with_encryption("zip-secret"));
    let executor = server(&["app_db"]);
    let archiver = MockArchiver::new();
    let manager = ctx.mysql_manager(&executor, &archiver, &MockStore::new());

    manager.run(&CancellationToken::new()).await.assert_ok();

    let calls = archiver.get_calls();
    assert_eq!(calls[0].passphrase, "zip-secret");
    assert!(calls[0].source.starts_with(ctx.work_dir()));
}

#[tokio::test]
async fn test_table_filters_resolved_per_schema() {
    let ctx = TestContext::from_builder(ConfigBuilder::new().with_table_filters(FilterRule {
        exclude_prefix: vec!["tmp_".to_string()],
        ..Default::default()
    }));
    let executor = server(&["app_db"]).expect_with_arg(
        "mysqlsh",
        "information_schema.tables",
        MockResponse::stdout(&table_listing(&["users", "tmp_import"])),
    );
    let manager = ctx.mysql_manager(&executor, &MockArchiver::new(), &MockStore::new());

    manager.run(&CancellationToken::new()).await.assert_ok();

    let dump = executor
        .calls_to("mysqlsh")
        .into_iter()
        .find(|c| c.mentions("util.dumpSchemas"))
        .assert_some();
    assert!(dump.mentions(r#""excludeTables":["app_db.tmp_import"]"#));
}

#[tokio::test]
async fn test_table_catalog_failure_is_discovery_failure() {
    let ctx = TestContext::from_builder(ConfigBuilder::new().with_table_filters(FilterRule {
        include_prefix: vec!["core_".to_string()],
        ..Default::default()
    }));
    let executor = server(&["app_db"]).expect_with_arg(
        "mysqlsh",
        "information_schema.tables",
        MockResponse::exit(1, "Lost connection"),
    );
    let store = MockStore::new();
    let manager = ctx.mysql_manager(&executor, &MockArchiver::new(), &store);

    let err = manager.run(&CancellationToken::new()).await.unwrap_err();

    assert!(matches!(err, RunError::Discovery(_)));
    assert!(store.get_uploads().is_empty());
}

#[tokio::test]
async fn test_held_lock_fails_before_discovery() {
    let ctx = TestContext::new();
    let executor = server(&["app_db"]);
    let notifier = MockNotifier::new();
    let manager = ctx
        .mysql_manager(&executor, &MockArchiver::new(), &MockStore::new())
        .with_notifier(Arc::new(notifier.clone()));

    let held = RunLock::acquire(ctx.lock_path()).unwrap();
    let err = manager.run(&CancellationToken::new()).await.unwrap_err();

    assert!(matches!(err, RunError::LockContention(_)));
    assert!(executor.get_calls().is_empty());
    assert!(notifier.get_messages().is_empty());
    drop(held);

    manager.run(&CancellationToken::new()).await.assert_ok();
}

#[tokio::test]
async fn test_failed_notification_does_not_fail_run() {
    let ctx = TestContext::new();
    let executor = server(&["app_db"]);
    let manager = ctx
        .mysql_manager(&executor, &MockArchiver::new(), &MockStore::new())
        .with_notifier(Arc::new(MockNotifier::new().with_failure()));

    manager.run(&CancellationToken::new()).await.assert_ok();
}
