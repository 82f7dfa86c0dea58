//! Stale lock reclamation and lock listing.
//!
//! A lock file is stale when no live process holds an OS lock on it. The
//! kernel drops a dead process's locks when its descriptors close, so a
//! successful non-blocking exclusive attempt proves there is no holder.
//!
//! Reclamation races with new acquisitions and is garbage collection only.
//! Acquirers detect a file unlinked under them and reopen, so deleting a
//! probed file never lets two holders coexist.

use super::metadata::LockMetadata;
use super::path::LOCK_EXTENSION;
use super::sys;
use super::types::{LockInfo, LockMode};
use crate::error::{CorralError, Result};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

/// Remove every lock file in `dir` that no live process holds.
///
/// Returns how many files were removed. A missing directory counts as empty.
/// Locks held by this process are left alone like any other live lock.
pub fn clean_stale_locks<P: AsRef<Path>>(dir: P) -> Result<usize> {
    let dir = dir.as_ref();
    let mut cleaned = 0;

    for lock_path in lock_files_in(dir)? {
        if reclaim(&lock_path)? {
            cleaned += 1;
        }
    }

    if cleaned > 0 {
        tracing::info!(dir = %dir.display(), cleaned, "reclaimed stale locks");
    }
    Ok(cleaned)
}

/// List the lock files in `dir`, probing each for a live holder.
pub fn list_locks<P: AsRef<Path>>(dir: P) -> Result<Vec<LockInfo>> {
    let mut locks = Vec::new();

    for path in lock_files_in(dir.as_ref())? {
        let held = match probe_held(&path)? {
            Some(held) => held,
            // Removed since the directory scan.
            None => continue,
        };
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        locks.push(LockInfo {
            metadata: LockMetadata::from_file(&path).ok(),
            path,
            name,
            held,
        });
    }

    Ok(locks)
}

/// Lock files in `dir`, sorted by path.
fn lock_files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(CorralError::io_at("read locks directory", dir, e)),
    };

    let mut paths = Vec::new();
    for entry in entries {
        let entry =
            entry.map_err(|e| CorralError::io_at("read locks directory entry in", dir, e))?;
        let path = entry.path();

        if path.extension().and_then(|e| e.to_str()) != Some(LOCK_EXTENSION) {
            continue;
        }
        if entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            paths.push(path);
        }
    }

    paths.sort();
    Ok(paths)
}

fn open_existing(path: &Path) -> Result<Option<File>> {
    match File::open(path) {
        Ok(file) => Ok(Some(file)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(CorralError::io_at("open lock file", path, e)),
    }
}

/// Delete `lock_path` if it has no live holder. Returns whether it was removed.
fn reclaim(lock_path: &Path) -> Result<bool> {
    let Some(file) = open_existing(lock_path)? else {
        return Ok(false);
    };

    if !sys::try_lock(&file, LockMode::Exclusive)
        .map_err(|e| CorralError::io_at("probe lock", lock_path, e))?
    {
        tracing::debug!(lock = %lock_path.display(), "lock has a live holder");
        return Ok(false);
    }

    // Someone may have replaced the file between our open and our lock.
    if !sys::is_current(&file, lock_path)
        .map_err(|e| CorralError::io_at("stat lock file", lock_path, e))?
    {
        return Ok(false);
    }

    // Delete while still holding the lock, then let the close release it.
    match fs::remove_file(lock_path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(CorralError::io_at("remove stale lock", lock_path, e)),
    }
    let _ = sys::unlock(&file);

    tracing::debug!(lock = %lock_path.display(), "removed stale lock");
    Ok(true)
}

/// `Some(true)` if a live process holds the lock, `None` if the file is gone.
fn probe_held(lock_path: &Path) -> Result<Option<bool>> {
    let Some(file) = open_existing(lock_path)? else {
        return Ok(None);
    };

    let acquired = sys::try_lock(&file, LockMode::Exclusive)
        .map_err(|e| CorralError::io_at("probe lock", lock_path, e))?;
    if acquired {
        let _ = sys::unlock(&file);
    }
    Ok(Some(!acquired))
}
