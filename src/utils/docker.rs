//! Docker CLI helpers for capturing a container's built-in backup

use super::executor::CommandExecutor;
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Thin wrapper over the `docker` CLI
#[derive(Clone)]
pub struct DockerCli {
    executor: Arc<dyn CommandExecutor>,
    timeout: Option<Duration>,
}

impl DockerCli {
    pub fn new(executor: Arc<dyn CommandExecutor>, timeout: Option<Duration>) -> Self {
        Self { executor, timeout }
    }

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    /// Whether `container` exists and is running
    pub async fn is_running(&self, container: &str) -> Result<bool> {
        let args = Self::args(&["inspect", "-f", "{{.State.Running}}", container]);
        match self.executor.run_stdout("docker", &args, self.timeout).await {
            Ok(out) => Ok(out.trim() == "true"),
            Err(super::command::CommandError::Failed { .. }) => Ok(false),
            Err(e) => Err(e).context("Failed to inspect container"),
        }
    }

    /// Run a command inside the container
    pub async fn exec(&self, container: &str, command: &[String]) -> Result<String> {
        let mut args = Self::args(&["exec", container]);
        args.extend(command.iter().cloned());

        info!("Running in container {}: {}", container, command.join(" "));
        let out = self
            .executor
            .run("docker", &args, self.timeout)
            .await
            .with_context(|| format!("docker exec in {} failed", container))?;
        Ok(out.stdout)
    }

    /// Newest file in `dir` (inside the container) whose name ends with `suffix`
    pub async fn newest_file(&self, container: &str, dir: &str, suffix: &str) -> Result<String> {
        let listing = self
            .exec(container, &Self::args(&["ls", "-1t", dir]))
            .await
            .with_context(|| format!("Failed to list {} in {}", dir, container))?;

        let name = listing
            .lines()
            .map(str::trim)
            .find(|line| line.ends_with(suffix))
            .with_context(|| format!("No file ending with '{}' found in {}", suffix, dir))?;

        let path = format!("{}/{}", dir.trim_end_matches('/'), name);
        debug!("Newest backup in container: {}", path);
        Ok(path)
    }

    /// Copy `path` out of the container into the local directory `dest`
    pub async fn copy_from(&self, container: &str, path: &str, dest: &Path) -> Result<()> {
        let args = vec![
            "cp".to_string(),
            format!("{}:{}", container, path),
            dest.display().to_string(),
        ];
        self.executor
            .run("docker", &args, self.timeout)
            .await
            .with_context(|| format!("docker cp {}:{} failed", container, path))?;
        Ok(())
    }
}
