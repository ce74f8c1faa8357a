//! External tool checks and dependency installation on Debian/Ubuntu

use super::executor::CommandExecutor;
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Tools needed by the schema workflow
pub const MYSQL_TOOLS: &[&str] = &["mysqlsh", "zip"];
/// Tools needed by the container workflow
pub const CONTAINER_TOOLS: &[&str] = &["docker", "zip"];
/// Tools needed to restore a schema dump
pub const RESTORE_TOOLS: &[&str] = &["mysqlsh", "unzip"];

const APT_CONFIG_PACKAGE: &str = "mysql-apt-config_0.8.36-1_all.deb";
const APT_CONFIG_BASE_URL: &str = "https://dev.mysql.com/get/";

/// Names from `tools` not found on PATH
pub fn missing_tools(tools: &[&str]) -> Vec<String> {
    tools
        .iter()
        .filter(|tool| which::which(tool).is_err())
        .map(|tool| tool.to_string())
        .collect()
}

/// Fail fast when a workflow's tools are absent
pub fn require_tools(tools: &[&str]) -> Result<()> {
    let missing = missing_tools(tools);
    if !missing.is_empty() {
        anyhow::bail!(
            "Required tools not found in PATH: {}. Run 'backup-orchestrator setup' on Debian/Ubuntu or install them manually.",
            missing.join(", ")
        );
    }
    Ok(())
}

/// Whether an `/etc/os-release` body describes a Debian family system
pub fn is_debian_like(os_release: &str) -> bool {
    os_release.lines().any(|line| {
        let Some((key, value)) = line.split_once('=') else {
            return false;
        };
        if key != "ID" && key != "ID_LIKE" {
            return false;
        }
        value
            .trim_matches('"')
            .split_whitespace()
            .any(|id| id == "debian" || id == "ubuntu")
    })
}

/// Read `/etc/os-release` and check the distribution family
pub fn host_is_debian_like() -> bool {
    std::fs::read_to_string(Path::new("/etc/os-release"))
        .map(|content| is_debian_like(&content))
        .unwrap_or(false)
}

/// Installs mysqlsh and the archive tools through apt
pub struct DependencyInstaller {
    executor: Arc<dyn CommandExecutor>,
}

impl DependencyInstaller {
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self { executor }
    }

    /// Install everything a run needs; mysqlsh is skipped when already present
    pub async fn install(&self, mysqlsh_present: bool) -> Result<()> {
        if mysqlsh_present {
            info!("mysqlsh is already installed");
            self.apt_install(&["zip", "unzip", "wget", "gnupg"]).await?;
            return Ok(());
        }

        info!("mysqlsh not found, installing from the MySQL APT repository");
        self.apt_install(&["wget", "gnupg", "zip", "unzip", "lsb-release"])
            .await
            .context("Failed to install prerequisites")?;

        let package_path = format!("/tmp/{}", APT_CONFIG_PACKAGE);
        let url = format!("{}{}", APT_CONFIG_BASE_URL, APT_CONFIG_PACKAGE);
        info!("Downloading MySQL APT repository config from {}", url);
        self.run("wget", &["-O", &package_path, &url])
            .await
            .context("Failed to download mysql-apt-config")?;

        self.run(
            "env",
            &["DEBIAN_FRONTEND=noninteractive", "dpkg", "-i", &package_path],
        )
        .await
        .context("Failed to install mysql-apt-config package")?;

        self.apt_install(&["mysql-shell"])
            .await
            .context("Failed to install mysql-shell")?;

        info!("mysqlsh installed successfully");
        Ok(())
    }

    async fn apt_install(&self, packages: &[&str]) -> Result<()> {
        info!("Running apt-get update and installing: {}", packages.join(", "));
        self.run("apt-get", &["update"]).await?;

        let mut args = vec!["install", "-y"];
        args.extend_from_slice(packages);
        self.run("apt-get", &args).await
    }

    async fn run(&self, program: &str, args: &[&str]) -> Result<()> {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        self.executor.run(program, &args, None).await?;
        Ok(())
    }
}
