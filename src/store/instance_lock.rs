use crate::Result;
use core::time::Duration;
use fs4::fs_std::FileExt;
use ohno::{IntoAppError, app_err};
use std::fs::{File, OpenOptions};
use std::path::Path;

const LOG_TARGET: &str = "     store";

const LOCK_FILE_NAME: &str = "instance.lock";

/// How long to wait for a previous instance to release the data directory.
const LOCK_WAIT: Duration = Duration::from_secs(5);

/// Guard that releases the data directory lock when dropped
#[derive(Debug)]
pub struct InstanceLockGuard(File);

impl Drop for InstanceLockGuard {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.0) {
            log::warn!(target: LOG_TARGET, "Could not unlock data directory: {e:#}");
        }
    }
}

/// Take an exclusive advisory lock on the data directory.
///
/// Only one crawler may own a data directory at a time; a second instance fails here instead of
/// interleaving its writes with the first.
pub async fn acquire_instance_lock(data_dir: &Path) -> Result<InstanceLockGuard> {
    let lock_path = data_dir.join(LOCK_FILE_NAME);

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
        .into_app_err_with(|| format!("opening lock file at '{}'", lock_path.display()))?;

    let display_path = lock_path.display().to_string();
    let locking = tokio::task::spawn_blocking(move || {
        FileExt::lock_exclusive(&file).into_app_err_with(|| format!("acquiring exclusive lock at '{}'", lock_path.display()))?;
        Ok::<_, ohno::AppError>(file)
    });

    let file = tokio::time::timeout(LOCK_WAIT, locking)
        .await
        .map_err(|_elapsed| app_err!("data directory is locked by another instance ('{display_path}')"))?
        .into_app_err("lock task panicked")??;

    log::debug!(target: LOG_TARGET, "Acquired data directory lock at '{display_path}'");
    Ok(InstanceLockGuard(file))
}
