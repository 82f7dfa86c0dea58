//! The lock primitive: an advisory lock on a resource's lock file.

use super::metadata::LockMetadata;
use super::path::lock_path_for;
use super::sys;
use super::types::{LockHandle, LockMode, LockOptions, LockTimeout};
use crate::error::{CorralError, Result};
use chrono::{DateTime, Utc};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Instant;

/// How many times one attempt reopens a lock file that was unlinked under it.
const MAX_REOPEN_ATTEMPTS: u32 = 8;

/// Advisory lock on the lock file of one protected resource.
///
/// A `FileLock` holds at most one lock at a time. It is owned by the call
/// stack that acquired it and can be moved between threads, never shared.
/// Dropping a held `FileLock` releases the OS lock.
///
/// Locks held through separate `FileLock` values exclude each other even
/// within one process.
#[derive(Debug)]
pub struct FileLock {
    resource: PathBuf,
    lock_path: PathBuf,
    options: LockOptions,
    held: Option<Held>,
}

#[derive(Debug)]
struct Held {
    file: File,
    mode: LockMode,
    acquired_at: DateTime<Utc>,
}

impl FileLock {
    /// Create a handle for `resource`. Touches nothing on disk.
    pub fn new<P: AsRef<Path>>(resource: P, options: LockOptions) -> Result<Self> {
        let resource = resource.as_ref().to_path_buf();
        let lock_path = lock_path_for(&resource)?;
        Ok(Self {
            resource,
            lock_path,
            options,
            held: None,
        })
    }

    pub fn resource(&self) -> &Path {
        &self.resource
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    pub fn options(&self) -> &LockOptions {
        &self.options
    }

    pub fn is_locked(&self) -> bool {
        self.held.is_some()
    }

    /// The mode currently held, if any.
    pub fn mode(&self) -> Option<LockMode> {
        self.held.as_ref().map(|h| h.mode)
    }

    /// Describe the held lock, if any.
    pub fn handle(&self) -> Option<LockHandle> {
        self.held.as_ref().map(|h| LockHandle {
            resource: self.resource.clone(),
            lock_path: self.lock_path.clone(),
            mode: h.mode,
            acquired_at: h.acquired_at,
        })
    }

    /// Acquire the exclusive lock, waiting per the configured timeout.
    pub fn lock(&mut self) -> Result<()> {
        self.acquire(LockMode::Exclusive)
    }

    /// Acquire a shared lock, waiting per the configured timeout.
    pub fn rlock(&mut self) -> Result<()> {
        self.acquire(LockMode::Shared)
    }

    /// One non-blocking attempt at the exclusive lock.
    pub fn try_lock(&mut self) -> Result<bool> {
        self.try_acquire(LockMode::Exclusive)
    }

    /// One non-blocking attempt at a shared lock.
    pub fn try_rlock(&mut self) -> Result<bool> {
        self.try_acquire(LockMode::Shared)
    }

    /// Release an exclusive lock.
    pub fn unlock(&mut self) -> Result<()> {
        self.release(LockMode::Exclusive)
    }

    /// Release a shared lock.
    pub fn runlock(&mut self) -> Result<()> {
        self.release(LockMode::Shared)
    }

    fn acquire(&mut self, mode: LockMode) -> Result<()> {
        self.ensure_unlocked()?;

        let started = Instant::now();
        let mut delays = self.options.backoff.delays();
        loop {
            if let Some(file) = self.attempt(mode)? {
                self.hold(file, mode);
                return Ok(());
            }

            let delay = match self.options.timeout {
                LockTimeout::NoWait => return Err(self.timeout_error(started)),
                LockTimeout::Forever => delays.next_delay(),
                LockTimeout::After(limit) => {
                    let elapsed = started.elapsed();
                    if elapsed >= limit {
                        return Err(self.timeout_error(started));
                    }
                    // Never sleep past the deadline; the last attempt lands on it.
                    delays.next_delay().min(limit - elapsed)
                }
            };
            tracing::trace!(
                resource = %self.resource.display(),
                delay_ms = delay.as_millis() as u64,
                "lock contended, backing off"
            );
            thread::sleep(delay);
        }
    }

    fn try_acquire(&mut self, mode: LockMode) -> Result<bool> {
        self.ensure_unlocked()?;
        match self.attempt(mode)? {
            Some(file) => {
                self.hold(file, mode);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn ensure_unlocked(&self) -> Result<()> {
        if self.held.is_some() {
            return Err(CorralError::AlreadyLocked {
                path: self.resource.clone(),
            });
        }
        Ok(())
    }

    /// One acquisition attempt. `Ok(None)` means contention.
    fn attempt(&self, mode: LockMode) -> Result<Option<File>> {
        for _ in 0..MAX_REOPEN_ATTEMPTS {
            let file = self.open_lock_file()?;
            if !sys::try_lock(&file, mode)
                .map_err(|e| self.io_error("lock", &self.lock_path, e))?
            {
                return Ok(None);
            }
            if sys::is_current(&file, &self.lock_path)
                .map_err(|e| self.io_error("stat lock file", &self.lock_path, e))?
            {
                return Ok(Some(file));
            }
            tracing::debug!(
                lock = %self.lock_path.display(),
                "lock file was removed while acquiring, reopening"
            );
        }
        Ok(None)
    }

    fn open_lock_file(&self) -> Result<File> {
        if let Some(parent) = self.lock_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent)
                .map_err(|e| self.io_error("create locks directory", parent, e))?;
        }

        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)
            .map_err(|e| self.io_error("open lock file", &self.lock_path, e))
    }

    fn hold(&mut self, file: File, mode: LockMode) {
        let metadata = LockMetadata::new(mode);
        // Shared holders leave the file alone; several of them may be writing.
        if mode == LockMode::Exclusive
            && let Err(e) = write_metadata(&file, &metadata)
        {
            tracing::debug!(lock = %self.lock_path.display(), error = %e, "could not record lock holder");
        }

        tracing::debug!(
            resource = %self.resource.display(),
            mode = %mode,
            "lock acquired"
        );
        self.held = Some(Held {
            file,
            mode,
            acquired_at: metadata.acquired_at,
        });
    }

    fn release(&mut self, mode: LockMode) -> Result<()> {
        let held = match self.held.take() {
            Some(held) if held.mode == mode => held,
            other => {
                self.held = other;
                return Err(CorralError::NotLocked {
                    path: self.resource.clone(),
                });
            }
        };

        // Closing the file releases the lock even if the explicit unlock fails.
        sys::unlock(&held.file).map_err(|e| self.io_error("unlock", &self.lock_path, e))?;
        tracing::debug!(
            resource = %self.resource.display(),
            mode = %mode,
            "lock released"
        );
        Ok(())
    }

    /// I/O failure on `path`, naming the protected resource as well.
    fn io_error(&self, action: &str, path: &Path, source: io::Error) -> CorralError {
        CorralError::io(
            format!(
                "failed to {} '{}' for '{}'",
                action,
                path.display(),
                self.resource.display()
            ),
            source,
        )
    }

    fn timeout_error(&self, started: Instant) -> CorralError {
        CorralError::Timeout {
            path: self.resource.clone(),
            waited: started.elapsed(),
        }
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Some(held) = self.held.take()
            && let Err(e) = sys::unlock(&held.file)
        {
            tracing::warn!(
                lock = %self.lock_path.display(),
                error = %e,
                "failed to unlock on drop; closing the file releases it"
            );
        }
    }
}

fn write_metadata(mut file: &File, metadata: &LockMetadata) -> Result<()> {
    let json = metadata.to_json()?;
    file.set_len(0)
        .and_then(|()| file.write_all(json.as_bytes()))
        .map_err(|e| CorralError::io("failed to write lock metadata", e))
}
