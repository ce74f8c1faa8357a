//! Tests for the 'setup' command and pre-run tool checks

use backup_orchestrator::utils::setup::{missing_tools, require_tools, DependencyInstaller, MYSQL_TOOLS, RESTORE_TOOLS};
use serial_test::serial;
use std::sync::Arc;
use test_utils::*;

/// Run `f` with PATH pointing at a directory holding only `tools`
#[cfg(unix)]
fn with_path_containing<F: FnOnce()>(tools: &[&str], f: F) {
    use std::os::unix::fs::PermissionsExt;

    let ctx = TestContext::new();
    let bin = ctx.create_subdir("bin");
    for tool in tools {
        let path = ctx.create_file(&format!("bin/{}", tool), "#!/bin/sh\nexit 0\n");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    let original = std::env::var_os("PATH");
    std::env::set_var("PATH", &bin);
    f();
    match original {
        Some(path) => std::env::set_var("PATH", path),
        None => std::env::remove_var("PATH"),
    }
}

#[cfg(unix)]
#[test]
#[serial]
fn test_missing_tools_reported_by_name() {
    with_path_containing(&["zip"], || {
        assert_eq!(missing_tools(MYSQL_TOOLS), vec!["mysqlsh"]);
        require_tools(MYSQL_TOOLS).assert_err_contains("mysqlsh");
    });
}

#[cfg(unix)]
#[test]
#[serial]
fn test_all_tools_present() {
    with_path_containing(&["mysqlsh", "unzip"], || {
        assert!(missing_tools(RESTORE_TOOLS).is_empty());
        require_tools(RESTORE_TOOLS).assert_ok();
    });
}

#[tokio::test]
async fn test_setup_installs_mysql_shell_last() {
    let executor = MockExecutor::new();
    DependencyInstaller::new(Arc::new(executor.clone()))
        .install(false)
        .await
        .assert_ok();

    let last = executor.get_calls().pop().assert_some();
    assert_eq!(last.program, "apt-get");
    assert!(last.mentions("mysql-shell"));
    assert!(executor
        .calls_to("wget")
        .iter()
        .any(|c| c.mentions("mysql-apt-config_0.8.36-1_all.deb")));
}

#[tokio::test]
async fn test_setup_apt_failure_is_error() {
    let executor = MockExecutor::new().expect("apt-get", MockResponse::exit(100, "Could not get lock"));

    DependencyInstaller::new(Arc::new(executor.clone()))
        .install(true)
        .await
        .assert_err_contains("apt-get");
}
