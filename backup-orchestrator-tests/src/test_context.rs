//! Test context and harness for whole-run tests
//!
//! Wires a [`BackupManager`] from a test [`Config`] and mocked collaborators,
//! keeping the config's temp directory alive for the duration of the test.

use crate::config_builder::ConfigBuilder;
use anyhow::Result;
use backup_orchestrator::config::Config;
use backup_orchestrator::managers::backup::BackupManager;
use backup_orchestrator::managers::history::HistoryLog;
use backup_orchestrator::managers::pipeline::PipelineSettings;
use backup_orchestrator::strategies::{ContainerStrategy, MySqlShell, MySqlStrategy};
use backup_orchestrator::utils::archive::mock::MockArchiver;
use backup_orchestrator::utils::docker::DockerCli;
use backup_orchestrator::utils::executor::mock::MockExecutor;
use backup_orchestrator::utils::storage::mock::MockStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Test context that manages test resources and provides common utilities
pub struct TestContext {
    /// Temporary directory for test files
    temp_dir: TempDir,
    /// The test configuration
    config: Config,
}

impl TestContext {
    /// Create a new test context with the default builder configuration
    pub fn new() -> Self {
        Self::from_builder(ConfigBuilder::new())
    }

    /// Create a test context from a ConfigBuilder
    pub fn from_builder(builder: ConfigBuilder) -> Self {
        let (config, temp_dir) = builder.persist();
        Self { temp_dir, config }
    }

    /// Get the temporary directory path
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Working directory where staging dirs and archives are created
    pub fn work_dir(&self) -> &Path {
        &self.config.backup.temp_dir
    }

    pub fn lock_path(&self) -> &Path {
        &self.config.lock_file
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            temp_dir: self.config.backup.temp_dir.clone(),
            passphrase: self.config.encryption.password.clone(),
            delete_after_upload: self.config.backup.delete_after_upload,
        }
    }

    /// Schema backup manager driven by mocked `mysqlsh` and storage
    pub fn mysql_manager(
        &self,
        executor: &MockExecutor,
        archiver: &MockArchiver,
        store: &MockStore,
    ) -> BackupManager {
        let shell = MySqlShell::new(self.config.mysql.clone(), Arc::new(executor.clone()), None);
        self.manager(Arc::new(MySqlStrategy::new(shell)), archiver, store)
    }

    /// Container backup manager driven by mocked `docker` and storage
    pub fn container_manager(
        &self,
        executor: &MockExecutor,
        archiver: &MockArchiver,
        store: &MockStore,
    ) -> BackupManager {
        let docker = DockerCli::new(Arc::new(executor.clone()), None);
        let strategy = ContainerStrategy::new(self.config.container.clone(), docker);
        self.manager(Arc::new(strategy), archiver, store)
    }

    fn manager(
        &self,
        strategy: Arc<dyn backup_orchestrator::strategies::TargetStrategy>,
        archiver: &MockArchiver,
        store: &MockStore,
    ) -> BackupManager {
        let mut manager = BackupManager::new(
            self.config.lock_file.clone(),
            strategy,
            Arc::new(archiver.clone()),
            Arc::new(store.clone()),
            self.pipeline_settings(),
        )
        .with_retention_hours(self.config.retention.hours);

        if let Some(ref path) = self.config.backup.history_file {
            manager = manager.with_history(HistoryLog::new(path));
        }
        manager
    }

    /// Create a subdirectory in the temp dir
    pub fn create_subdir(&self, name: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        std::fs::create_dir_all(&path).expect("Failed to create subdirectory");
        path
    }

    /// Create a file in the temp dir
    pub fn create_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&path, content).expect("Failed to write file");
        path
    }

    /// Entries left in the working directory
    pub fn work_dir_entries(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.work_dir())
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().to_string())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Read a file from the temp directory
    pub fn read_file(&self, name: &str) -> Result<String> {
        let path = self.temp_dir.path().join(name);
        Ok(std::fs::read_to_string(path)?)
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Extension trait for assertion helpers
pub trait ResultAssertions<T> {
    /// Assert that the result is Ok and return the value
    fn assert_ok(self) -> T;

    /// Assert that the result is Err and the error message contains the given string
    fn assert_err_contains(self, needle: &str);
}

impl<T: std::fmt::Debug, E: std::fmt::Display> ResultAssertions<T> for Result<T, E> {
    fn assert_ok(self) -> T {
        match self {
            Ok(v) => v,
            Err(e) => panic!("Expected Ok, got Err: {}", e),
        }
    }

    fn assert_err_contains(self, needle: &str) {
        match self {
            Ok(v) => panic!("Expected Err containing '{}', got Ok: {:?}", needle, v),
            Err(e) => {
                let err_msg = e.to_string();
                assert!(
                    err_msg.contains(needle),
                    "Error '{}' does not contain '{}'",
                    err_msg,
                    needle
                );
            }
        }
    }
}

/// Extension trait for Option assertions
pub trait OptionAssertions<T> {
    /// Assert that the option is Some and return the value
    fn assert_some(self) -> T;

    /// Assert that the option is None
    fn assert_none(self);
}

impl<T: std::fmt::Debug> OptionAssertions<T> for Option<T> {
    fn assert_some(self) -> T {
        match self {
            Some(v) => v,
            None => panic!("Expected Some, got None"),
        }
    }

    fn assert_none(self) {
        if let Some(v) = self {
            panic!("Expected None, got Some: {:?}", v);
        }
    }
}
