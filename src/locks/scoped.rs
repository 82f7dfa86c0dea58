//! Scoped lock wrappers with guaranteed release.
//!
//! `with_read_lock` and `with_write_lock` acquire the lock, run the callback,
//! and release the lock however the callback exits: success, error, or panic.
//! A nested scoped call on the same path from the same thread is rejected
//! with [`CorralError::Reentrant`] instead of deadlocking.

use super::file_lock::FileLock;
use super::guard::LockGuard;
use super::types::{LockMode, LockOptions};
use crate::error::CorralError;
use std::cell::RefCell;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

thread_local! {
    /// Lock files held by scoped calls on this thread.
    static SCOPED_HELD: RefCell<HashSet<PathBuf>> = RefCell::new(HashSet::new());
}

/// Marks a lock file as held by a scoped call on this thread.
struct ScopeEntry {
    key: PathBuf,
}

impl ScopeEntry {
    fn enter(lock_path: &Path) -> Result<Self, CorralError> {
        let key = std::path::absolute(lock_path).unwrap_or_else(|_| lock_path.to_path_buf());
        let inserted = SCOPED_HELD.with(|held| held.borrow_mut().insert(key.clone()));
        if !inserted {
            return Err(CorralError::Reentrant {
                path: lock_path.to_path_buf(),
            });
        }
        Ok(Self { key })
    }
}

impl Drop for ScopeEntry {
    fn drop(&mut self) {
        let _ = SCOPED_HELD.try_with(|held| held.borrow_mut().remove(&self.key));
    }
}

/// Run `f` under a shared lock on `path` with default options.
pub fn with_read_lock<P, T, E, F>(path: P, f: F) -> Result<T, E>
where
    P: AsRef<Path>,
    F: FnOnce() -> Result<T, E>,
    E: From<CorralError>,
{
    with_read_lock_opts(path, &LockOptions::default(), f)
}

/// Run `f` under the exclusive lock on `path` with default options.
///
/// `f` owns any reload-modify-save sequence and must persist through the
/// atomic writer itself.
pub fn with_write_lock<P, T, E, F>(path: P, f: F) -> Result<T, E>
where
    P: AsRef<Path>,
    F: FnOnce() -> Result<T, E>,
    E: From<CorralError>,
{
    with_write_lock_opts(path, &LockOptions::default(), f)
}

pub fn with_read_lock_opts<P, T, E, F>(path: P, options: &LockOptions, f: F) -> Result<T, E>
where
    P: AsRef<Path>,
    F: FnOnce() -> Result<T, E>,
    E: From<CorralError>,
{
    scoped(path.as_ref(), LockMode::Shared, options, f)
}

pub fn with_write_lock_opts<P, T, E, F>(path: P, options: &LockOptions, f: F) -> Result<T, E>
where
    P: AsRef<Path>,
    F: FnOnce() -> Result<T, E>,
    E: From<CorralError>,
{
    scoped(path.as_ref(), LockMode::Exclusive, options, f)
}

fn scoped<T, E, F>(path: &Path, mode: LockMode, options: &LockOptions, f: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
    E: From<CorralError>,
{
    let lock = FileLock::new(path, *options)?;
    // Declared before the guard so it is dropped after the lock is released.
    let _entry = ScopeEntry::enter(lock.lock_path())?;
    let guard = LockGuard::from_lock(lock, mode)?;

    let outcome = f();
    let released = guard.release();

    match (outcome, released) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e.into()),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(release_err)) => {
            tracing::warn!(resource = %path.display(), error = %release_err, "failed to release lock after error");
            Err(e)
        }
    }
}
