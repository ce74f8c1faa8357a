//! Backup manager - orchestrates a whole run
//!
//! lock -> discover -> filter -> resolve -> pipeline per target -> retention
//! -> report -> unlock

use crate::config::Config;
use crate::managers::filter::{self, StaticCatalog};
use crate::managers::history::{HistoryLog, HistoryRecord};
use crate::managers::notification::{Notifier, NotifyError, TelegramNotifier, NOTIFY_TIMEOUT};
use crate::managers::pipeline::{PipelineSettings, TargetPipeline, TIMESTAMP_FORMAT};
use crate::managers::report::{self, RunAggregator, RunSummary};
use crate::managers::retention;
use crate::strategies::{BackupTarget, ContainerStrategy, MySqlShell, MySqlStrategy, TargetStrategy};
use crate::utils::archive::{Archiver, ZipArchiver};
use crate::utils::docker::DockerCli;
use crate::utils::executor::CommandExecutor;
use crate::utils::locker::{LockError, RunLock};
use crate::utils::storage::{ArtifactStore, LocalStore, S3Store};
use anyhow::Result;
use chrono::{DateTime, FixedOffset, Local, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Run-level failures; per-target failures live in the summary
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("another backup run holds the lock at {0:?}")]
    LockContention(PathBuf),

    #[error("failed to acquire run lock: {0}")]
    Lock(#[source] LockError),

    #[error("target discovery failed: {0:#}")]
    Discovery(anyhow::Error),

    #[error("{failed} of {total} targets failed")]
    TargetsFailed { failed: usize, total: usize },
}

/// Which kind of source a run backs up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Workflow {
    MySql,
    Container,
}

impl Workflow {
    /// External tools the workflow shells out to
    pub fn required_tools(&self) -> &'static [&'static str] {
        match self {
            Workflow::MySql => crate::utils::setup::MYSQL_TOOLS,
            Workflow::Container => crate::utils::setup::CONTAINER_TOOLS,
        }
    }
}

pub struct BackupManager {
    lock_path: PathBuf,
    strategy: Arc<dyn TargetStrategy>,
    pipeline: TargetPipeline,
    store: Arc<dyn ArtifactStore>,
    notifier: Option<Arc<dyn Notifier>>,
    history: Option<HistoryLog>,
    retention_hours: i64,
    notify_timeout: Duration,
}

impl BackupManager {
    /// Create new backup manager
    pub fn new(
        lock_path: PathBuf,
        strategy: Arc<dyn TargetStrategy>,
        archiver: Arc<dyn Archiver>,
        store: Arc<dyn ArtifactStore>,
        settings: PipelineSettings,
    ) -> Self {
        let pipeline = TargetPipeline::new(strategy.clone(), archiver, store.clone(), settings);
        Self {
            lock_path,
            strategy,
            pipeline,
            store,
            notifier: None,
            history: None,
            retention_hours: 0,
            notify_timeout: NOTIFY_TIMEOUT,
        }
    }

    /// Wire up real collaborators from configuration
    pub fn from_config(
        config: &Config,
        workflow: Workflow,
        only_dump: bool,
        executor: Arc<dyn CommandExecutor>,
    ) -> Result<Self> {
        let timeout = config.backup.command_timeout();

        let strategy: Arc<dyn TargetStrategy> = match workflow {
            Workflow::MySql => Arc::new(MySqlStrategy::new(MySqlShell::new(
                config.mysql.clone(),
                executor.clone(),
                timeout,
            ))),
            Workflow::Container => Arc::new(ContainerStrategy::new(
                config.container.clone(),
                DockerCli::new(executor.clone(), timeout),
            )),
        };

        let store: Arc<dyn ArtifactStore> = if only_dump {
            info!("Only-dump mode: artifacts are kept in {:?}", config.backup.local_dir);
            Arc::new(LocalStore::new(&config.backup.local_dir))
        } else {
            crate::config::validate_remote_storage(&config.storage)?;
            Arc::new(S3Store::new(&config.storage))
        };

        let settings = PipelineSettings {
            temp_dir: config.backup.temp_dir.clone(),
            passphrase: config.encryption.password.clone(),
            delete_after_upload: config.backup.delete_after_upload,
        };

        let mut manager = Self::new(
            config.lock_file.clone(),
            strategy,
            Arc::new(ZipArchiver::new(executor, timeout)),
            store,
            settings,
        )
        .with_retention_hours(config.retention.hours);

        let telegram = TelegramNotifier::new(config.telegram.clone())?;
        if telegram.is_enabled() {
            manager = manager.with_notifier(Arc::new(telegram));
        }
        if let Some(ref path) = config.backup.history_file {
            manager = manager.with_history(HistoryLog::new(path));
        }

        Ok(manager)
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_history(mut self, history: HistoryLog) -> Self {
        self.history = Some(history);
        self
    }

    pub fn with_retention_hours(mut self, hours: i64) -> Self {
        self.retention_hours = hours;
        self
    }

    pub fn with_notify_timeout(mut self, timeout: Duration) -> Self {
        self.notify_timeout = timeout;
        self
    }

    /// Run and fail with `TargetsFailed` if any target failed
    pub async fn run(&self, cancel: &CancellationToken) -> Result<RunSummary, RunError> {
        let summary = self.execute(cancel).await?;
        summary.ensure_success()?;
        Ok(summary)
    }

    /// Run and return the summary regardless of per-target failures
    pub async fn execute(&self, cancel: &CancellationToken) -> Result<RunSummary, RunError> {
        let mut lock = RunLock::acquire(&self.lock_path).map_err(|e| match e {
            LockError::AlreadyLocked(path) => RunError::LockContention(path),
            other => RunError::Lock(other),
        })?;

        let started_at = Local::now().fixed_offset();
        info!("Starting {} backup run", self.strategy.kind());

        let targets = match self.discover(cancel).await {
            Ok(targets) => targets,
            Err(e) => {
                error!("{}", e);
                self.notify(&report::render_discovery_failure(&started_at, &e))
                    .await;
                lock.release();
                return Err(e);
            }
        };

        let summary = self.process(&targets, started_at, cancel).await;

        if cancel.is_cancelled() {
            warn!("Run cancelled, skipping retention");
        } else {
            self.apply_retention().await;
        }

        info!(
            "Backup summary: {} succeeded, {} failed",
            summary.success_count(),
            summary.fail_count()
        );
        self.notify(&summary.render()).await;

        lock.release();
        Ok(summary)
    }

    /// List, filter and parameterize this run's targets
    async fn discover(&self, cancel: &CancellationToken) -> Result<Vec<BackupTarget>, RunError> {
        let discovery = async {
            let names = self.strategy.list_targets().await?;

            let rule = self.strategy.filter_rule();
            let resolved = filter::resolve(&rule, &StaticCatalog::new(names.clone()))
                .await?
                .with_reserved(self.strategy.reserved_names());
            let selected = resolved.apply(&names);
            info!("Selected targets: {:?}", selected);

            let targets = self.strategy.resolve_targets(&selected).await?;
            Ok::<_, anyhow::Error>(targets)
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(RunError::Discovery(anyhow::anyhow!("run cancelled"))),
            result = discovery => result.map_err(RunError::Discovery),
        }
    }

    async fn process(
        &self,
        targets: &[BackupTarget],
        started_at: DateTime<FixedOffset>,
        cancel: &CancellationToken,
    ) -> RunSummary {
        if targets.is_empty() {
            warn!("No targets to back up after filtering");
        }

        let timestamp = started_at.format(TIMESTAMP_FORMAT).to_string();
        let mut aggregator = RunAggregator::new(started_at);

        for target in targets {
            let result = self.pipeline.run(target, &timestamp, cancel).await;

            if let Some(ref history) = self.history {
                let record = HistoryRecord::from_result(&result, Utc::now());
                if let Err(e) = history.append(&record) {
                    warn!("Failed to append history record to {:?}: {:#}", history.path(), e);
                }
            }

            aggregator.record(result);
        }

        aggregator.finish()
    }

    async fn apply_retention(&self) {
        match retention::enforce(self.store.as_ref(), self.retention_hours, Utc::now()).await {
            Ok(report) if !report.deleted.is_empty() => {
                info!("Retention removed {} artifacts", report.deleted.len());
            }
            Ok(_) => {}
            Err(e) => error!("Retention policy failed: {}", e),
        }
    }

    async fn notify(&self, text: &str) {
        let Some(ref notifier) = self.notifier else {
            return;
        };

        let result = match tokio::time::timeout(self.notify_timeout, notifier.send(text)).await {
            Ok(result) => result,
            Err(_) => Err(NotifyError::Timeout(self.notify_timeout)),
        };
        if let Err(e) = result {
            warn!("Failed to send report notification: {}", e);
        }
    }
}
