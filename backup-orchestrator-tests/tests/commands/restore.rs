//! Tests for the 'restore' command

use backup_orchestrator::config::MySqlConfig;
use backup_orchestrator::managers::restore::{find_dump_dir, RestoreManager};
use backup_orchestrator::strategies::MySqlShell;
use std::sync::Arc;
use test_utils::*;
use tokio_util::sync::CancellationToken;

fn restore_manager(ctx: &TestContext, executor: &MockExecutor, archiver: MockArchiver) -> RestoreManager {
    let mysql = MySqlConfig {
        threads: 8,
        ..Default::default()
    };
    RestoreManager::new(
        MySqlShell::new(mysql, Arc::new(executor.clone()), None),
        Arc::new(archiver),
        "zip-secret",
        ctx.work_dir(),
    )
}

#[tokio::test]
async fn test_restore_dump_directory() {
    let ctx = TestContext::new();
    let dump = write_dump_dir(&ctx.temp_dir().join("app_db_20240101_000000"));
    let executor = MockExecutor::new();

    restore_manager(&ctx, &executor, MockArchiver::new())
        .restore(&dump, &CancellationToken::new())
        .await
        .assert_ok();

    let calls = executor.calls_to("mysqlsh");
    assert_eq!(calls.len(), 1);
    assert!(calls[0].mentions(&format!("util.loadDump(\"{}\"", dump.display())));
    assert!(calls[0].mentions(r#""threads":8"#));
}

#[tokio::test]
async fn test_restore_parent_of_dump_directory() {
    let ctx = TestContext::new();
    let parent = ctx.create_subdir("extracted");
    let dump = write_dump_dir(&parent.join("app_db_20240101_000000"));

    assert_eq!(find_dump_dir(&parent).unwrap(), dump);
}

#[tokio::test]
async fn test_restore_non_dump_directory_fails() {
    let ctx = TestContext::new();
    let dir = ctx.create_subdir("random");
    ctx.create_file("random/notes.txt", "hello");
    let executor = MockExecutor::new();

    let err = restore_manager(&ctx, &executor, MockArchiver::new())
        .restore(&dir, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(format!("{:#}", err).contains("not a MySQL Shell dump"));
    assert!(!executor.was_called("mysqlsh"));
}

#[tokio::test]
async fn test_restore_cancelled_before_load_finishes() {
    let ctx = TestContext::new();
    let dump = write_dump_dir(&ctx.temp_dir().join("dump"));
    let executor = MockExecutor::new().expect("mysqlsh", MockResponse::Hang);

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = restore_manager(&ctx, &executor, MockArchiver::new())
        .restore(&dump, &cancel)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("cancelled"));
}

#[tokio::test]
async fn test_restore_zip_removes_extraction_dir() {
    let ctx = TestContext::new();
    let artifact = ctx.create_file("app_db_20240101_000000.zip", "PK");

    // The mock extracts nothing, so the load step finds no metadata
    let result = restore_manager(&ctx, &MockExecutor::new(), MockArchiver::new())
        .restore(&artifact, &CancellationToken::new())
        .await;

    assert!(result.is_err());
    assert!(ctx.work_dir_entries().is_empty());
}
