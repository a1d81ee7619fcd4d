//! Per-entry advisory locks
//!
//! Serializes writers of the same vault or build cache entry, across threads
//! and across processes sharing one root.
//!
//! # Storage
//!
//! - `<root>/.locks/<entry>.lock` - Lock file with OS-level exclusive lock
//!
//! # Invariants
//!
//! - Acquisition blocks for at most the given timeout, then fails with
//!   `LockTimeout`
//! - After acquiring, the caller must re-check whether the entry was
//!   published meanwhile (another writer may have finished first)
//! - Readers never take this lock
//! - Lock files are left on disk; removing one that another process holds
//!   open would let a third process lock a different inode

use crate::error::{DepvaultError, DepvaultResult};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

/// Directory holding lock files under a cache root
pub const LOCKS_DIR: &str = ".locks";

/// Default timeout for lock acquisition
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(120);

/// Polling interval when waiting for a lock
const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// An exclusive lock on one cache entry, released on drop.
#[derive(Debug)]
pub struct EntryLock {
    path: PathBuf,
    file: Option<File>,
}

impl EntryLock {
    /// Lock file path for an entry: `<root>/.locks/<entry>.lock`
    pub fn lock_path(root: &Path, entry: &str) -> PathBuf {
        root.join(LOCKS_DIR).join(format!("{}.lock", entry))
    }

    /// Acquire the entry lock, polling until `timeout` expires.
    pub fn acquire(root: &Path, entry: &str, timeout: Duration) -> DepvaultResult<Self> {
        let path = Self::lock_path(root, entry);
        Self::ensure_parent(&path)?;

        let started = Instant::now();
        let deadline = started + timeout;
        let mut logged = false;

        loop {
            if let Some(lock) = Self::try_acquire_internal(&path)? {
                return Ok(lock);
            }
            if Instant::now() >= deadline {
                return Err(DepvaultError::LockTimeout {
                    path,
                    waited: started.elapsed(),
                });
            }
            if !logged {
                debug!("Waiting for lock {}", path.display());
                logged = true;
            }
            thread::sleep(LOCK_POLL_INTERVAL);
        }
    }

    /// Try to acquire the lock without blocking.
    ///
    /// Returns `Ok(None)` if another holder has it.
    pub fn try_acquire(root: &Path, entry: &str) -> DepvaultResult<Option<Self>> {
        let path = Self::lock_path(root, entry);
        Self::ensure_parent(&path)?;
        Self::try_acquire_internal(&path)
    }

    fn ensure_parent(path: &Path) -> DepvaultResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                DepvaultError::io(format!("creating lock directory {}", parent.display()), e)
            })?;
        }
        Ok(())
    }

    fn try_acquire_internal(path: &Path) -> DepvaultResult<Option<Self>> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| DepvaultError::io(format!("opening lock file {}", path.display()), e))?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self {
                path: path.to_path_buf(),
                file: Some(file),
            })),
            Err(e) if is_contended(&e) => Ok(None),
            Err(e) => Err(DepvaultError::io(
                format!("locking {}", path.display()),
                e,
            )),
        }
    }

    /// Check if this guard still holds the lock
    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    /// Path to the lock file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock before the guard goes out of scope
    pub fn release(&mut self) -> DepvaultResult<()> {
        if let Some(file) = self.file.take() {
            file.unlock()
                .map_err(|e| DepvaultError::io(format!("unlocking {}", self.path.display()), e))?;
        }
        Ok(())
    }
}

impl Drop for EntryLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = file.unlock();
        }
    }
}

fn is_contended(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}
