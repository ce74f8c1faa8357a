//! Per-target backup pipeline
//!
//! Drives one target through dump -> archive -> hash -> publish. Every stage
//! is raced against the run's cancellation token, and every outcome, good or
//! bad, becomes exactly one [`BackupResult`].

use crate::strategies::{BackupTarget, TargetStrategy};
use crate::utils::archive::Archiver;
use crate::utils::hash::sha256_file;
use crate::utils::storage::{object_key, ArtifactStore};
use anyhow::Context;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Timestamp layout used in staging and artifact names
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Dump,
    Archive,
    Hash,
    Publish,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Dump => "dump",
            Stage::Archive => "archive",
            Stage::Hash => "hash",
            Stage::Publish => "publish",
        };
        f.write_str(name)
    }
}

/// Why a target did not produce a published artifact
#[derive(Debug, thiserror::Error)]
pub struct StageError {
    pub stage: Stage,
    #[source]
    pub cause: anyhow::Error,
    pub cancelled: bool,
}

impl StageError {
    pub fn new(stage: Stage, cause: anyhow::Error) -> Self {
        Self {
            stage,
            cause,
            cancelled: false,
        }
    }

    pub fn cancelled(stage: Stage) -> Self {
        Self {
            stage,
            cause: anyhow::anyhow!("run cancelled"),
            cancelled: true,
        }
    }
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.cancelled {
            write!(f, "{} stage cancelled", self.stage)
        } else {
            write!(f, "{} stage failed: {:#}", self.stage, self.cause)
        }
    }
}

/// A published artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactInfo {
    pub key: String,
    pub location: String,
    pub size: u64,
    pub sha256: String,
}

#[derive(Debug)]
pub enum Outcome {
    Succeeded(ArtifactInfo),
    Failed(StageError),
}

/// Final record for one target; never modified once built
#[derive(Debug)]
pub struct BackupResult {
    pub target: String,
    pub outcome: Outcome,
    pub duration: Duration,
}

impl BackupResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Succeeded(_))
    }

    pub fn artifact(&self) -> Option<&ArtifactInfo> {
        match &self.outcome {
            Outcome::Succeeded(info) => Some(info),
            Outcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&StageError> {
        match &self.outcome {
            Outcome::Succeeded(_) => None,
            Outcome::Failed(e) => Some(e),
        }
    }
}

/// Settings shared by every target of a run
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub temp_dir: PathBuf,
    pub passphrase: String,
    pub delete_after_upload: bool,
}

/// Staging directory and archive of one target, removed on drop when asked to
struct Workspace {
    staging: PathBuf,
    artifact: PathBuf,
    remove: bool,
}

impl Workspace {
    /// Paths this target actually left on disk
    fn existing_paths(&self) -> Vec<&Path> {
        [self.staging.as_path(), self.artifact.as_path()]
            .into_iter()
            .filter(|path| path.exists())
            .collect()
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if !self.remove {
            for path in self.existing_paths() {
                info!("Keeping {:?}", path);
            }
            return;
        }
        if self.staging.exists() {
            if let Err(e) = std::fs::remove_dir_all(&self.staging) {
                warn!("Failed to remove staging directory {:?}: {}", self.staging, e);
            }
        }
        if self.artifact.exists() {
            if let Err(e) = std::fs::remove_file(&self.artifact) {
                warn!("Failed to remove archive {:?}: {}", self.artifact, e);
            }
        }
    }
}

/// Run a stage future unless the token fires first.
///
/// Dropping the stage future kills any child process it spawned.
async fn guarded<T, F>(stage: Stage, cancel: &CancellationToken, fut: F) -> Result<T, StageError>
where
    F: Future<Output = anyhow::Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(StageError::cancelled(stage)),
        result = fut => result.map_err(|cause| StageError::new(stage, cause)),
    }
}

pub struct TargetPipeline {
    strategy: Arc<dyn TargetStrategy>,
    archiver: Arc<dyn Archiver>,
    store: Arc<dyn ArtifactStore>,
    settings: PipelineSettings,
}

impl TargetPipeline {
    pub fn new(
        strategy: Arc<dyn TargetStrategy>,
        archiver: Arc<dyn Archiver>,
        store: Arc<dyn ArtifactStore>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            strategy,
            archiver,
            store,
            settings,
        }
    }

    /// Back up one target; never fails, the outcome is in the result
    pub async fn run(
        &self,
        target: &BackupTarget,
        timestamp: &str,
        cancel: &CancellationToken,
    ) -> BackupResult {
        let start = Instant::now();
        info!("Backing up {} ({})", target.name, self.strategy.kind());

        let outcome = match self.execute(target, timestamp, cancel).await {
            Ok(info) => {
                info!(
                    "Backup of {} published to {} ({} bytes)",
                    target.name, info.location, info.size
                );
                Outcome::Succeeded(info)
            }
            Err(e) if e.cancelled => {
                warn!("Backup of {} cancelled during {} stage", target.name, e.stage);
                Outcome::Failed(e)
            }
            Err(e) => {
                error!("Backup of {} failed: {}", target.name, e);
                Outcome::Failed(e)
            }
        };

        BackupResult {
            target: target.name.clone(),
            outcome,
            duration: start.elapsed(),
        }
    }

    async fn execute(
        &self,
        target: &BackupTarget,
        timestamp: &str,
        cancel: &CancellationToken,
    ) -> Result<ArtifactInfo, StageError> {
        if cancel.is_cancelled() {
            return Err(StageError::cancelled(Stage::Dump));
        }

        let base = format!("{}_{}", target.name, timestamp);
        let filename = format!("{}.zip", base);
        let mut workspace = Workspace {
            staging: self.settings.temp_dir.join(&base),
            artifact: self.settings.temp_dir.join(&filename),
            remove: self.settings.delete_after_upload,
        };

        let result = self
            .stages(target, &workspace.staging, &workspace.artifact, &filename, cancel)
            .await;

        if matches!(&result, Err(e) if e.cancelled) {
            workspace.remove = true;
        }
        result
    }

    async fn stages(
        &self,
        target: &BackupTarget,
        staging: &Path,
        artifact: &Path,
        filename: &str,
        cancel: &CancellationToken,
    ) -> Result<ArtifactInfo, StageError> {
        let source = guarded(Stage::Dump, cancel, async {
            tokio::fs::create_dir_all(staging)
                .await
                .with_context(|| format!("Failed to create staging directory {:?}", staging))?;
            self.strategy.dump(target, staging).await?;
            self.strategy.locate_artifact(target, staging).await
        })
        .await?;

        guarded(
            Stage::Archive,
            cancel,
            self.archiver.archive(&self.settings.passphrase, &source, artifact),
        )
        .await?;

        let (sha256, size) = guarded(Stage::Hash, cancel, async {
            let (digest, size) = sha256_file(artifact)
                .await
                .with_context(|| format!("Failed to read archive {:?}", artifact))?;
            if size == 0 {
                anyhow::bail!("archive {:?} is empty", artifact);
            }
            Ok((digest, size))
        })
        .await?;

        let key = object_key(self.store.prefix(), filename);
        guarded(Stage::Publish, cancel, self.store.upload(&key, artifact)).await?;

        Ok(ArtifactInfo {
            location: self.store.location(&key),
            key,
            size,
            sha256,
        })
    }
}
