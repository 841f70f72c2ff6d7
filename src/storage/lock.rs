//! # Structural Writer Lock
//!
//! An advisory, process-external exclusive lock (`flock`) on the backing file.
//! It serialises structural writers only: inserting a new key, splitting a
//! page and growing the file. In-place accumulation of an existing key and
//! all reads (lookup, traversal, checking) never take it.
//!
//! The lock is held by a [`LockGuard`] and released when the guard drops, so
//! an early `?` return out of an insert cannot leak it.

use std::fs::File;
use std::path::{Path, PathBuf};

use eyre::Result;
use fs2::FileExt;
use tracing::{trace, warn};

use crate::error::StoreError;

#[derive(Debug)]
pub struct FileLock {
    file: File,
    path: PathBuf,
}

#[derive(Debug)]
pub struct LockGuard<'a> {
    lock: &'a FileLock,
}

impl FileLock {
    /// Wraps a handle to the store file. The handle should be a duplicate of
    /// the store's own descriptor so it shares its open file description.
    pub fn new(file: File, path: &Path) -> Self {
        Self {
            file,
            path: path.to_path_buf(),
        }
    }

    /// Blocks until the exclusive lock is granted. There is no timeout.
    pub fn exclusive(&self) -> Result<LockGuard<'_>> {
        FileExt::lock_exclusive(&self.file)
            .map_err(|e| StoreError::unavailable(&self.path, "lock", e))?;
        trace!(path = %self.path.display(), "structural lock acquired");
        Ok(LockGuard { lock: self })
    }

    /// Takes the lock only if nobody else holds it.
    pub fn try_exclusive(&self) -> Result<Option<LockGuard<'_>>> {
        match FileExt::try_lock_exclusive(&self.file) {
            Ok(()) => Ok(Some(LockGuard { lock: self })),
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => Ok(None),
            Err(e) => Err(StoreError::unavailable(&self.path, "lock", e).into()),
        }
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.lock.file) {
            warn!(path = %self.lock.path.display(), error = %e, "failed to release structural lock");
        } else {
            trace!(path = %self.lock.path.display(), "structural lock released");
        }
    }
}
