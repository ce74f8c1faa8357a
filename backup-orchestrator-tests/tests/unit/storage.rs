//! Unit tests for the local artifact store used by `--only-dump`

use backup_orchestrator::managers::retention;
use backup_orchestrator::utils::storage::{object_key, ArtifactStore, LocalStore};
use chrono::{Duration, Utc};
use test_utils::TestContext;

#[tokio::test]
async fn test_upload_copies_into_root() {
    let ctx = TestContext::new();
    let artifact = ctx.create_file("work/app_db_20240101_000000.zip", "PK archive");
    let store = LocalStore::new(ctx.temp_dir().join("local"));

    let size = store.upload("app_db_20240101_000000.zip", &artifact).await.unwrap();

    assert_eq!(size, 10);
    assert!(ctx.temp_dir().join("local/app_db_20240101_000000.zip").is_file());
    assert!(artifact.exists());
    assert_eq!(
        store.location("app_db_20240101_000000.zip"),
        ctx.temp_dir().join("local/app_db_20240101_000000.zip").display().to_string()
    );
}

#[tokio::test]
async fn test_list_missing_root_is_empty() {
    let ctx = TestContext::new();
    let store = LocalStore::new(ctx.temp_dir().join("never-created"));
    assert!(store.list("").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_fresh_artifacts_survive_retention() {
    let ctx = TestContext::new();
    let artifact = ctx.create_file("a.zip", "PK");
    let store = LocalStore::new(ctx.temp_dir().join("local"));
    store.upload("a.zip", &artifact).await.unwrap();

    let report = retention::enforce(&store, 1, Utc::now()).await.unwrap();
    assert_eq!(report.examined, 1);
    assert!(report.deleted.is_empty());

    // Seen from a day later, the copy has expired
    let report = retention::enforce(&store, 1, Utc::now() + Duration::hours(24)).await.unwrap();
    assert_eq!(report.deleted, vec!["a.zip"]);
    assert!(store.list("").await.unwrap().is_empty());
}

#[test]
fn test_object_key_joins_prefix() {
    assert_eq!(object_key("", "a.zip"), "a.zip");
    assert_eq!(object_key("nightly", "a.zip"), "nightly/a.zip");
}
