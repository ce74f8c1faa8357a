//! Archive and encryption through the external zip/unzip tools

use super::executor::CommandExecutor;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Packs a dump into a single (optionally encrypted) artifact and back
#[async_trait]
pub trait Archiver: Send + Sync {
    /// Pack `source` (file or directory) into `dest`.
    ///
    /// An empty passphrase produces an unencrypted archive.
    async fn archive(&self, passphrase: &str, source: &Path, dest: &Path) -> Result<()>;

    /// Unpack `archive` into `dest_dir`, overwriting existing files
    async fn extract(&self, passphrase: &str, archive: &Path, dest_dir: &Path) -> Result<()>;
}

/// [`Archiver`] backed by Info-ZIP `zip` and `unzip`
pub struct ZipArchiver {
    executor: Arc<dyn CommandExecutor>,
    timeout: Option<Duration>,
}

impl ZipArchiver {
    pub fn new(executor: Arc<dyn CommandExecutor>, timeout: Option<Duration>) -> Self {
        Self { executor, timeout }
    }

    fn zip_args(passphrase: &str, source: &Path, dest: &Path) -> Vec<String> {
        let mut args = Vec::new();
        if !passphrase.is_empty() {
            args.push("-P".to_string());
            args.push(passphrase.to_string());
        }
        if source.is_dir() {
            args.push("-r".to_string());
        }
        // Junk paths: entries are stored without the staging prefix
        args.push("-j".to_string());
        args.push(dest.display().to_string());
        args.push(source.display().to_string());
        args
    }
}

#[async_trait]
impl Archiver for ZipArchiver {
    async fn archive(&self, passphrase: &str, source: &Path, dest: &Path) -> Result<()> {
        // zip would otherwise update an existing archive in place
        if dest.exists() {
            debug!("Removing stale archive: {:?}", dest);
            tokio::fs::remove_file(dest)
                .await
                .with_context(|| format!("Failed to remove stale archive {:?}", dest))?;
        }

        let args = Self::zip_args(passphrase, source, dest);
        info!("Archiving {:?} -> {:?}", source, dest);

        self.executor
            .run("zip", &args, self.timeout)
            .await
            .context("zip failed")?;

        Ok(())
    }

    async fn extract(&self, passphrase: &str, archive: &Path, dest_dir: &Path) -> Result<()> {
        tokio::fs::create_dir_all(dest_dir)
            .await
            .with_context(|| format!("Failed to create {:?}", dest_dir))?;

        let mut args = Vec::new();
        if !passphrase.is_empty() {
            args.push("-P".to_string());
            args.push(passphrase.to_string());
        }
        args.push("-o".to_string());
        args.push(archive.display().to_string());
        args.push("-d".to_string());
        args.push(dest_dir.display().to_string());

        info!("Extracting {:?} -> {:?}", archive, dest_dir);
        self.executor
            .run("unzip", &args, self.timeout)
            .await
            .context("unzip failed")?;

        Ok(())
    }
}

/// Mock archiver for testing
/// Available for use in external test crates
pub mod mock {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Mutex;

    #[derive(Clone, Debug)]
    pub struct ArchiveCall {
        pub passphrase: String,
        pub source: PathBuf,
        pub dest: PathBuf,
    }

    /// Writes a small fake archive instead of calling zip
    #[derive(Clone, Default)]
    pub struct MockArchiver {
        pub calls: Arc<Mutex<Vec<ArchiveCall>>>,
        /// Sources whose path contains one of these fragments fail
        failing: Arc<Mutex<Vec<String>>>,
        /// Sources whose path contains one of these fragments produce an empty archive
        empty: Arc<Mutex<Vec<String>>>,
    }

    impl MockArchiver {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing_for(self, fragment: &str) -> Self {
            self.failing.lock().unwrap().push(fragment.to_string());
            self
        }

        pub fn empty_for(self, fragment: &str) -> Self {
            self.empty.lock().unwrap().push(fragment.to_string());
            self
        }

        pub fn get_calls(&self) -> Vec<ArchiveCall> {
            self.calls.lock().unwrap().clone()
        }

        fn matches(list: &Mutex<Vec<String>>, path: &Path) -> bool {
            let text = path.display().to_string();
            list.lock().unwrap().iter().any(|f| text.contains(f.as_str()))
        }
    }

    #[async_trait]
    impl Archiver for MockArchiver {
        async fn archive(&self, passphrase: &str, source: &Path, dest: &Path) -> Result<()> {
            self.calls.lock().unwrap().push(ArchiveCall {
                passphrase: passphrase.to_string(),
                source: source.to_path_buf(),
                dest: dest.to_path_buf(),
            });

            if Self::matches(&self.failing, source) {
                anyhow::bail!("zip failed with exit code Some(12), output: nothing to do");
            }

            let contents: &[u8] = if Self::matches(&self.empty, source) {
                b""
            } else {
                b"PK\x03\x04 mock archive"
            };
            tokio::fs::write(dest, contents).await?;
            Ok(())
        }

        async fn extract(&self, _passphrase: &str, archive: &Path, dest_dir: &Path) -> Result<()> {
            if Self::matches(&self.failing, archive) {
                anyhow::bail!("unzip failed: incorrect password");
            }
            tokio::fs::create_dir_all(dest_dir).await?;
            Ok(())
        }
    }
}
