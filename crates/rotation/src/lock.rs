//! Exclusive lock file
//!
//! The lock doubles as the scratch file for the next expiration record:
//! the new value is staged into the open lock file and published by renaming
//! the lock onto the record path. A rename is one filesystem operation, so
//! readers see either the old record or the new one, and the lock disappears
//! in the same step.
//!
//! ```text
//! acquire ──► stage* ──► commit   (lock renamed onto record)
//!    │                     │
//!    └──────► abandon ◄────┘      (lock deleted, record untouched)
//! ```
//!
//! A handle dropped without `commit` or `abandon` abandons itself, so every
//! exit path releases the lock. Only a process crash can leave one behind.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::core::LockError;

/// Held lock on a record path
#[derive(Debug)]
pub struct LockHandle {
    lock_path: PathBuf,
    target_path: PathBuf,
    file: Option<File>,
    released: bool,
}

impl LockHandle {
    /// Create the lock file, failing if it already exists.
    ///
    /// Uses `create_new`, so existence check and creation are one atomic
    /// step. An existing file yields [`LockError::Contended`]; any other
    /// failure is [`LockError::Io`].
    pub fn acquire(
        lock_path: impl Into<PathBuf>,
        target_path: impl Into<PathBuf>,
    ) -> Result<Self, LockError> {
        let lock_path = lock_path.into();

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let file = match options.open(&lock_path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(LockError::Contended { path: lock_path });
            }
            Err(source) => {
                return Err(LockError::Io {
                    path: lock_path,
                    operation: "create",
                    source,
                });
            }
        };

        tracing::debug!(lock = %lock_path.display(), "acquired rotation lock");

        Ok(Self {
            lock_path,
            target_path: target_path.into(),
            file: Some(file),
            released: false,
        })
    }

    /// Replace the staged content with `bytes`.
    ///
    /// Fails if the lock file was removed from under the handle, since a
    /// commit could no longer publish it.
    pub fn stage(&mut self, bytes: &[u8]) -> Result<(), LockError> {
        fs::metadata(&self.lock_path).map_err(|source| self.io_error("stage", source))?;

        let result = match self.file.as_mut() {
            Some(file) => file
                .set_len(0)
                .and_then(|()| file.seek(SeekFrom::Start(0)))
                .and_then(|_| file.write_all(bytes)),
            None => Err(io::Error::other("lock handle already released")),
        };
        result.map_err(|source| self.io_error("stage", source))
    }

    /// Publish the staged content by renaming the lock onto the target.
    ///
    /// On failure the lock file is removed and the target keeps its previous
    /// content.
    pub fn commit(mut self) -> Result<(), LockError> {
        if let Some(file) = self.file.take() {
            file.sync_all()
                .map_err(|source| self.io_error("commit", source))?;
        }

        fs::rename(&self.lock_path, &self.target_path)
            .map_err(|source| self.io_error("commit", source))?;
        self.released = true;

        tracing::debug!(
            lock = %self.lock_path.display(),
            record = %self.target_path.display(),
            "committed rotation lock"
        );
        Ok(())
    }

    /// Delete the lock file, discarding anything staged
    pub fn abandon(mut self) -> Result<(), LockError> {
        self.file.take();
        self.released = true;
        remove_lock(&self.lock_path).map_err(|source| self.io_error("abandon", source))?;

        tracing::debug!(lock = %self.lock_path.display(), "abandoned rotation lock");
        Ok(())
    }

    fn io_error(&self, operation: &'static str, source: io::Error) -> LockError {
        LockError::Io {
            path: self.lock_path.clone(),
            operation,
            source,
        }
    }
}

impl Drop for LockHandle {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.file.take();
        if let Err(e) = remove_lock(&self.lock_path) {
            tracing::warn!(
                lock = %self.lock_path.display(),
                error = %e,
                "failed to remove rotation lock; remove it manually to unblock rotation"
            );
        }
    }
}

fn remove_lock(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
