//! Retention and cancellation at the end of a run

use chrono::{Duration, Utc};
use rstest::rstest;
use std::time::Duration as StdDuration;
use test_utils::*;
use tokio_util::sync::CancellationToken;

fn server() -> MockExecutor {
    MockExecutor::new().expect_with_arg("mysqlsh", "schemata", MockResponse::stdout(&schema_listing(&["app_db"])))
}

#[rstest]
#[case::disabled(0, &["fresh.zip", "stale.zip"])]
#[case::one_hour(1, &["fresh.zip"])]
#[tokio::test]
async fn test_retention_after_run(#[case] hours: i64, #[case] survivors: &[&str]) {
    let ctx = TestContext::from_builder(ConfigBuilder::new().with_retention_hours(hours));
    let store = MockStore::new()
        .with_object("fresh.zip", Utc::now() - Duration::minutes(30))
        .with_object("stale.zip", Utc::now() - Duration::hours(2));
    let manager = ctx.mysql_manager(&server(), &MockArchiver::new(), &store);

    manager.run(&CancellationToken::new()).await.assert_ok();

    let remaining: Vec<_> = store.keys().into_iter().filter(|k| !k.starts_with("app_db_")).collect();
    assert_eq!(remaining, survivors.iter().map(|s| s.to_string()).collect::<Vec<_>>());
    assert!(store.keys().iter().any(|k| k.starts_with("app_db_")));
}

#[tokio::test]
async fn test_retention_scoped_to_prefix() {
    let ctx = TestContext::new();
    let store = MockStore::new()
        .with_prefix("nightly")
        .with_object("nightly/old.zip", Utc::now() - Duration::hours(48))
        .with_object("other/old.zip", Utc::now() - Duration::hours(48));
    let manager = ctx
        .mysql_manager(&server(), &MockArchiver::new(), &store)
        .with_retention_hours(24);

    manager.run(&CancellationToken::new()).await.assert_ok();

    assert_eq!(store.get_deletions(), vec!["nightly/old.zip"]);
    assert!(store.get_uploads()[0].starts_with("nightly/app_db_"));
}

#[tokio::test]
async fn test_retention_failure_does_not_fail_run() {
    let ctx = TestContext::new();
    let store = MockStore::new().with_failing_list();
    let manager = ctx
        .mysql_manager(&server(), &MockArchiver::new(), &store)
        .with_retention_hours(24);

    let summary = manager.run(&CancellationToken::new()).await.assert_ok();
    assert_eq!(summary.success_count(), 1);
}

#[tokio::test]
async fn test_cancel_during_dump_cleans_up_and_skips_retention() {
    let ctx = TestContext::from_builder(ConfigBuilder::new().keep_local_files());
    let executor = MockExecutor::new()
        .expect_with_arg("mysqlsh", "schemata", MockResponse::stdout(&schema_listing(&["app_db", "billing"])))
        .expect_with_arg("mysqlsh", "util.dumpSchemas", MockResponse::Hang);
    let store = MockStore::new().with_object("stale.zip", Utc::now() - Duration::hours(48));
    let manager = ctx
        .mysql_manager(&executor, &MockArchiver::new(), &store)
        .with_retention_hours(1);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(StdDuration::from_millis(100)).await;
        trigger.cancel();
    });

    let summary = manager.execute(&cancel).await.unwrap();

    assert_eq!(summary.fail_count(), 2);
    assert!(summary.results.iter().all(|r| r.error().is_some_and(|e| e.cancelled)));
    // Cancelled targets are cleaned up even when local files are kept
    assert!(ctx.work_dir_entries().is_empty());
    assert!(store.get_deletions().is_empty());
    assert_eq!(executor.calls_to("mysqlsh").iter().filter(|c| c.mentions("util.dumpSchemas")).count(), 1);
}
