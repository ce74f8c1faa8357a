//! Restore manager - loads a MySQL Shell dump back into the server

use crate::strategies::mysql::{MySqlShell, DUMP_METADATA_FILE};
use crate::utils::archive::Archiver;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub struct RestoreManager {
    shell: MySqlShell,
    archiver: Arc<dyn Archiver>,
    passphrase: String,
    temp_dir: PathBuf,
}

impl RestoreManager {
    pub fn new(shell: MySqlShell, archiver: Arc<dyn Archiver>, passphrase: &str, temp_dir: &Path) -> Self {
        Self {
            shell,
            archiver,
            passphrase: passphrase.to_string(),
            temp_dir: temp_dir.to_path_buf(),
        }
    }

    /// Restore from a dump directory or a `.zip` artifact
    pub async fn restore(&self, input: &Path, cancel: &CancellationToken) -> Result<()> {
        if !input.exists() {
            anyhow::bail!("restore input {:?} does not exist", input);
        }

        if !is_zip(input) {
            return self.load(input, cancel).await;
        }

        let extract_dir = self
            .temp_dir
            .join(format!("restore_{}", chrono::Utc::now().timestamp()));
        info!("Extracting {:?} to {:?}", input, extract_dir);

        let result = async {
            self.archiver
                .extract(&self.passphrase, input, &extract_dir)
                .await
                .with_context(|| format!("Failed to extract {:?}", input))?;
            self.load(&extract_dir, cancel).await?;
            Ok::<_, anyhow::Error>(())
        }
        .await;

        if extract_dir.exists() {
            if let Err(e) = tokio::fs::remove_dir_all(&extract_dir).await {
                warn!("Failed to remove extraction directory {:?}: {}", extract_dir, e);
            }
        }
        result
    }

    async fn load(&self, root: &Path, cancel: &CancellationToken) -> Result<()> {
        let dump_dir = find_dump_dir(root)?;

        let output = tokio::select! {
            biased;
            _ = cancel.cancelled() => anyhow::bail!("restore cancelled"),
            result = self.shell.load_dump(&dump_dir) => result?,
        };

        if !output.trim().is_empty() {
            info!("mysqlsh: {}", output.trim());
        }
        info!("Restore from {:?} completed", dump_dir);
        Ok(())
    }
}

fn is_zip(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
}

/// Directory holding the dump metadata: `root` itself or one level below it
pub fn find_dump_dir(root: &Path) -> Result<PathBuf> {
    if root.join(DUMP_METADATA_FILE).is_file() {
        return Ok(root.to_path_buf());
    }

    let entries = std::fs::read_dir(root).with_context(|| format!("Failed to read {:?}", root))?;
    let mut candidates: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir() && path.join(DUMP_METADATA_FILE).is_file())
        .collect();
    candidates.sort();

    candidates.into_iter().next().ok_or_else(|| {
        anyhow::anyhow!(
            "no {} found in {:?} or its subdirectories; not a MySQL Shell dump",
            DUMP_METADATA_FILE,
            root
        )
    })
}
