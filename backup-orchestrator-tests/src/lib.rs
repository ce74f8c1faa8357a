//! Test utilities for backup-orchestrator
//!
//! This crate provides shared test utilities, fixtures and re-exports of the
//! mock collaborators the main crate ships in its `mock` submodules.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use test_utils::{ConfigBuilder, TestContext};
//!
//! #[tokio::test]
//! async fn my_test() {
//!     let ctx = TestContext::from_builder(ConfigBuilder::new().exclude_schema("logs_db"));
//!     let manager = ctx.mysql_manager(executor, archiver, store);
//!     // ... test code
//! }
//! ```

pub mod config_builder;
pub mod fixtures;
pub mod test_context;

// Re-export commonly used items
pub use config_builder::ConfigBuilder;
pub use fixtures::*;
pub use test_context::{OptionAssertions, ResultAssertions, TestContext};

// Re-export types from the main crate for convenience
pub use backup_orchestrator::config::{
    BackupSettings, Config, ContainerConfig, FilterRule, MySqlConfig, StorageConfig,
};
pub use backup_orchestrator::managers::backup::{BackupManager, RunError};
pub use backup_orchestrator::managers::report::RunSummary;

// Re-export mock implementations from the main crate
pub use backup_orchestrator::managers::notification::mock::MockNotifier;
pub use backup_orchestrator::utils::archive::mock::MockArchiver;
pub use backup_orchestrator::utils::executor::mock::{MockExecutor, MockResponse};
pub use backup_orchestrator::utils::executor::CommandExecutor;
pub use backup_orchestrator::utils::storage::mock::MockStore;
pub use backup_orchestrator::utils::storage::ArtifactStore;

/// Common test result type
pub type TestResult<T = ()> = anyhow::Result<T>;
