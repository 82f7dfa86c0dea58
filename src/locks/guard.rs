//! RAII lock guard implementation.

use super::file_lock::FileLock;
use super::types::{LockHandle, LockMode, LockOptions};
use crate::error::Result;
use std::path::Path;

/// RAII guard for a held [`FileLock`].
///
/// When dropped, the lock is released. If releasing fails, a warning is
/// logged but no panic occurs. Guards also release during panic unwinding.
#[derive(Debug)]
pub struct LockGuard {
    lock: FileLock,

    /// Whether the lock has been released manually.
    released: bool,
}

impl LockGuard {
    /// Acquire `mode` on `resource`, blocking per `options`.
    pub fn acquire<P: AsRef<Path>>(
        resource: P,
        mode: LockMode,
        options: LockOptions,
    ) -> Result<Self> {
        Self::from_lock(FileLock::new(resource, options)?, mode)
    }

    /// Acquire the exclusive lock on `resource`.
    pub fn exclusive<P: AsRef<Path>>(resource: P, options: LockOptions) -> Result<Self> {
        Self::acquire(resource, LockMode::Exclusive, options)
    }

    /// Acquire a shared lock on `resource`.
    pub fn shared<P: AsRef<Path>>(resource: P, options: LockOptions) -> Result<Self> {
        Self::acquire(resource, LockMode::Shared, options)
    }

    pub(crate) fn from_lock(mut lock: FileLock, mode: LockMode) -> Result<Self> {
        match mode {
            LockMode::Exclusive => lock.lock()?,
            LockMode::Shared => lock.rlock()?,
        }
        Ok(Self {
            lock,
            released: false,
        })
    }

    pub fn handle(&self) -> Option<LockHandle> {
        self.lock.handle()
    }

    /// Path of the lock file backing this guard.
    pub fn lock_path(&self) -> &Path {
        self.lock.lock_path()
    }

    /// Manually release the lock.
    ///
    /// Use this instead of dropping when the caller wants to handle release
    /// errors explicitly.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.unlock()
    }

    fn unlock(&mut self) -> Result<()> {
        match self.lock.mode() {
            Some(LockMode::Exclusive) => self.lock.unlock(),
            Some(LockMode::Shared) => self.lock.runlock(),
            None => Ok(()),
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if !self.released
            && let Err(e) = self.unlock()
        {
            tracing::warn!(
                lock = %self.lock.lock_path().display(),
                error = %e,
                "failed to release lock"
            );
        }
    }
}
