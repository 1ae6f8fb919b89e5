//! Installation-level file locking for cross-process coordination.
//!
//! At most one update session may run against a root at a time; the session
//! itself implements no locking, so the CLI serializes invocations here. The
//! lock is advisory and released when the guard is dropped.
//!
//! File operations are wrapped in `spawn_blocking` to keep the tokio runtime
//! responsive while the OS lock call runs.

use crate::archive::SCRATCH_DIR_NAME;
use crate::core::UpdateError;
use crate::utils::ensure_dir;
use anyhow::{Context, Result};
use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const LOCK_FILE_NAME: &str = "refit.lock";

/// Advisory lock that serializes update sessions per installation root.
///
/// The lock file lives in the scratch directory, which the merge step never
/// treats as update content. Dropping the guard releases the OS lock and
/// removes the file.
#[derive(Debug)]
pub struct SessionLock {
    /// The file handle - the OS lock is released when this is dropped
    _file: Arc<File>,
    lock_path: PathBuf,
}

impl SessionLock {
    /// Takes the lock with a single attempt.
    ///
    /// A held lock means another session is running; the caller is rejected
    /// immediately with [`UpdateError::SessionActive`], never queued.
    pub async fn acquire(root: &Path) -> Result<Self> {
        let lock_dir = root.join(SCRATCH_DIR_NAME);
        ensure_dir(&lock_dir)?;
        let lock_path = lock_dir.join(LOCK_FILE_NAME);

        let open_path = lock_path.clone();
        let file = tokio::task::spawn_blocking(move || {
            OpenOptions::new().create(true).write(true).truncate(false).open(&open_path)
        })
        .await
        .with_context(|| "spawn_blocking panicked")?
        .with_context(|| format!("Failed to open lock file: {}", lock_path.display()))?;

        let file = Arc::new(file);
        let probe = Arc::clone(&file);
        let acquired = tokio::task::spawn_blocking(move || probe.try_lock_exclusive())
            .await
            .with_context(|| "spawn_blocking panicked")?
            .with_context(|| format!("Failed to probe lock file: {}", lock_path.display()))?;

        if !acquired {
            return Err(UpdateError::SessionActive {
                path: lock_path.display().to_string(),
            }
            .into());
        }

        tracing::debug!(target: "cli", "session lock acquired at {}", lock_path.display());
        Ok(Self {
            _file: file,
            lock_path,
        })
    }
}

impl Drop for SessionLock {
    fn drop(&mut self) {
        if let Err(error) = std::fs::remove_file(&self.lock_path) {
            // Tolerate a racing cleanup from a lock that just turned over.
            if error.kind() != std::io::ErrorKind::NotFound {
                tracing::debug!(target: "cli", "failed to remove lock file: {error}");
            }
        }
    }
}
