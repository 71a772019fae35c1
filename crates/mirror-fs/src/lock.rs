//! Per-mirror sync locking
//!
//! A mirror database must never be synchronized by two runs at once. The
//! lock is an advisory exclusive lock on a lock file colocated with the
//! database, acquired non-blocking so a second run fails fast instead of
//! queueing behind the first.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::{Error, Result};

/// An exclusive advisory lock held for the duration of one sync run.
///
/// The lock releases when the guard is dropped. The lock file itself is
/// left in place; only the lock matters.
#[derive(Debug)]
pub struct SyncLock {
    file: File,
    path: PathBuf,
}

impl SyncLock {
    /// Acquire the lock, failing fast if another run holds it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockHeld`] if the lock is already taken, or an I/O
    /// error if the lock file cannot be created.
    pub fn acquire(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| Error::io(path, e))?;

        file.try_lock_exclusive().map_err(|_| Error::LockHeld {
            path: path.to_path_buf(),
        })?;

        tracing::debug!("Acquired sync lock at {}", path.display());
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SyncLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mirror.lock");

        let _held = SyncLock::acquire(&path).unwrap();
        let second = SyncLock::acquire(&path);

        assert!(matches!(second, Err(Error::LockHeld { .. })));
    }

    #[test]
    fn released_lock_can_be_reacquired() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mirror.lock");

        drop(SyncLock::acquire(&path).unwrap());
        assert!(SyncLock::acquire(&path).is_ok());
    }
}
