//! Container runs through a mocked `docker`

use backup_orchestrator::managers::pipeline::Stage;
use std::sync::Arc;
use test_utils::*;
use tokio_util::sync::CancellationToken;

fn gitlab() -> MockExecutor {
    MockExecutor::new()
        .expect_with_arg("docker", "{{.State.Running}}", MockResponse::stdout("true\n"))
        .expect_with_arg("docker", "-1t", MockResponse::stdout(gitlab_backup_listing()))
}

#[tokio::test]
async fn test_container_backup_published_under_label() {
    let ctx = TestContext::from_builder(ConfigBuilder::new().with_container("gitlab", "gitlab-web"));
    let executor = gitlab();
    let archiver = MockArchiver::new();
    let store = MockStore::new();
    let notifier = MockNotifier::new();
    let manager = ctx
        .container_manager(&executor, &archiver, &store)
        .with_notifier(Arc::new(notifier.clone()));

    let summary = manager.run(&CancellationToken::new()).await.assert_ok();

    assert_eq!(summary.total(), 1);
    let artifact = summary.results[0].artifact().assert_some();
    assert!(artifact.key.starts_with("gitlab_") && artifact.key.ends_with(".zip"));

    let docker = executor.calls_to("docker");
    assert!(docker[0].mentions("inspect"));
    assert!(docker.iter().any(|c| c.mentions("gitlab:backup:create")));
    let copy = docker
        .iter()
        .find(|c| c.args[0] == "cp" && c.mentions("_gitlab_backup.tar"))
        .assert_some();
    assert_eq!(
        copy.args[1],
        "gitlab-web:/var/opt/gitlab/backups/1700003600_2023_11_14_16.5.1_gitlab_backup.tar"
    );

    assert!(notifier.get_messages()[0].contains("✅ gitlab"));
}

#[tokio::test]
async fn test_container_named_like_system_schema_is_backed_up() {
    let ctx = TestContext::from_builder(ConfigBuilder::new().with_container("mysql", "mysql-server"));
    let executor = gitlab();
    let store = MockStore::new();
    let manager = ctx.container_manager(&executor, &MockArchiver::new(), &store);

    let summary = manager.run(&CancellationToken::new()).await.assert_ok();

    assert_eq!(summary.total(), 1);
    assert_eq!(summary.results[0].target, "mysql");
    assert!(store.get_uploads()[0].starts_with("mysql_"));
}

#[tokio::test]
async fn test_stopped_container_is_discovery_failure() {
    let ctx = TestContext::new();
    let executor = MockExecutor::new().expect("docker", MockResponse::stdout("false\n"));
    let notifier = MockNotifier::new();
    let manager = ctx
        .container_manager(&executor, &MockArchiver::new(), &MockStore::new())
        .with_notifier(Arc::new(notifier.clone()));

    let err = manager.run(&CancellationToken::new()).await.unwrap_err();

    assert!(matches!(err, RunError::Discovery(_)));
    assert!(err.to_string().contains("is not running"));
    assert!(notifier.get_messages()[0].contains("is not running"));
}

#[tokio::test]
async fn test_missing_backup_file_fails_dump_stage() {
    let ctx = TestContext::new();
    let executor = MockExecutor::new()
        .expect_with_arg("docker", "{{.State.Running}}", MockResponse::stdout("true\n"))
        .expect_with_arg("docker", "-1t", MockResponse::stdout("backup_information.yml\n"));
    let archiver = MockArchiver::new();
    let manager = ctx.container_manager(&executor, &archiver, &MockStore::new());

    let summary = manager.execute(&CancellationToken::new()).await.unwrap();

    assert_eq!(summary.results[0].error().assert_some().stage, Stage::Dump);
    assert!(archiver.get_calls().is_empty());
}
