//! File-based locking to prevent concurrent runs

use fd_lock::RwLock;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("lock file {0:?} is already locked, another instance might be running")]
    AlreadyLocked(PathBuf),

    #[error("failed to prepare lock file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Exclusive, non-blocking run lock.
///
/// The advisory lock lives as long as the file handle: dropping the handle
/// closes the descriptor, which releases the lock. The lock file itself stays
/// on disk.
pub struct RunLock {
    handle: Option<RwLock<File>>,
    lock_path: PathBuf,
}

impl RunLock {
    /// Acquire the lock at `path`, failing immediately if it is held
    pub fn acquire(path: &Path) -> Result<Self, LockError> {
        debug!("Attempting to acquire lock: {:?}", path);

        let io_err = |source| LockError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(io_err)?;

        let mut handle = RwLock::new(file);
        match handle.try_write() {
            // The guard would borrow `handle`; forgetting it leaves the lock
            // held until the descriptor is closed in `release`.
            Ok(guard) => std::mem::forget(guard),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                return Err(LockError::AlreadyLocked(path.to_path_buf()))
            }
            Err(e) => return Err(io_err(e)),
        }

        info!("Acquired run lock: {:?}", path);

        Ok(Self {
            handle: Some(handle),
            lock_path: path.to_path_buf(),
        })
    }

    /// Release the lock; calling it more than once is a no-op
    pub fn release(&mut self) {
        if let Some(handle) = self.handle.take() {
            drop(handle);
            info!("Released run lock: {:?}", self.lock_path);
        }
    }

    pub fn path(&self) -> &Path {
        &self.lock_path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        self.release();
    }
}
