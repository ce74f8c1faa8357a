//! Container snapshot strategy
//!
//! Triggers an application's own backup command inside its container (GitLab's
//! `gitlab-rake gitlab:backup:create` by default), then copies the newest
//! backup file and the configuration/secrets files out to the host.

use super::{BackupTarget, TargetParams, TargetStrategy};
use crate::config::ContainerConfig;
use crate::utils::docker::DockerCli;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub struct ContainerStrategy {
    config: ContainerConfig,
    docker: DockerCli,
}

impl ContainerStrategy {
    pub fn new(config: ContainerConfig, docker: DockerCli) -> Self {
        Self { config, docker }
    }

    fn container_of<'a>(&self, target: &'a BackupTarget) -> Result<&'a str> {
        match &target.params {
            TargetParams::Container { container } => Ok(container),
            TargetParams::Schema { .. } => {
                anyhow::bail!("{} is not a container target", target.name)
            }
        }
    }
}

#[async_trait]
impl TargetStrategy for ContainerStrategy {
    fn kind(&self) -> &'static str {
        "container"
    }

    async fn list_targets(&self) -> Result<Vec<String>> {
        let running = self
            .docker
            .is_running(&self.config.container_name)
            .await?;
        if !running {
            anyhow::bail!(
                "container '{}' is not running",
                self.config.container_name
            );
        }
        Ok(vec![self.config.label.clone()])
    }

    async fn resolve_targets(&self, names: &[String]) -> Result<Vec<BackupTarget>> {
        Ok(names
            .iter()
            .map(|name| BackupTarget {
                name: name.clone(),
                params: TargetParams::Container {
                    container: self.config.container_name.clone(),
                },
            })
            .collect())
    }

    async fn dump(&self, target: &BackupTarget, _staging: &Path) -> Result<()> {
        let container = self.container_of(target)?;
        info!("Triggering backup in container {}", container);
        self.docker
            .exec(container, &self.config.backup_command)
            .await
            .context("backup command failed")?;
        Ok(())
    }

    async fn locate_artifact(&self, target: &BackupTarget, staging: &Path) -> Result<PathBuf> {
        let container = self.container_of(target)?;

        let remote = self
            .docker
            .newest_file(container, &self.config.backup_dir, &self.config.backup_suffix)
            .await?;

        info!("Copying backup file {} to host", remote);
        self.docker.copy_from(container, &remote, staging).await?;

        for file in &self.config.config_files {
            if let Err(e) = self.docker.copy_from(container, file, staging).await {
                warn!("Failed to copy {}: {:#}", file, e);
            }
        }

        Ok(staging.to_path_buf())
    }
}
