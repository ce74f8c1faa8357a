pub mod container;
pub mod mysql;

use crate::config::FilterRule;
use anyhow::Result;
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};

pub use container::ContainerStrategy;
pub use mysql::{MySqlShell, MySqlStrategy};

/// Target-specific parameters, fixed once resolved for a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetParams {
    /// A database schema with its resolved table lists (`schema.table`)
    Schema {
        include_tables: Vec<String>,
        exclude_tables: Vec<String>,
    },
    /// A container whose built-in backup is captured
    Container { container: String },
}

/// One unit of work for the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupTarget {
    pub name: String,
    pub params: TargetParams,
}

impl BackupTarget {
    pub fn schema(name: &str) -> Self {
        Self {
            name: name.to_string(),
            params: TargetParams::Schema {
                include_tables: Vec::new(),
                exclude_tables: Vec::new(),
            },
        }
    }
}

impl fmt::Display for BackupTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Trait for backup strategies
///
/// The pipeline is the same for every kind of source; a strategy only knows
/// how to find its targets and how to produce a dump for one of them.
#[async_trait]
pub trait TargetStrategy: Send + Sync {
    /// Strategy name (for logging)
    fn kind(&self) -> &'static str;

    /// Policy applied to the names returned by `list_targets`
    fn filter_rule(&self) -> FilterRule {
        FilterRule::default()
    }

    /// Names dropped before any policy is applied
    fn reserved_names(&self) -> &'static [&'static str] {
        &[]
    }

    /// Candidate target names, in discovery order
    async fn list_targets(&self) -> Result<Vec<String>>;

    /// Turn filtered names into fully parameterized targets
    async fn resolve_targets(&self, names: &[String]) -> Result<Vec<BackupTarget>>;

    /// Produce the raw dump for `target` inside `staging`
    async fn dump(&self, target: &BackupTarget, staging: &Path) -> Result<()>;

    /// Path to archive once the dump is complete
    async fn locate_artifact(&self, target: &BackupTarget, staging: &Path) -> Result<PathBuf>;
}
