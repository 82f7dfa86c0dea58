//! Shared, file-resident state for corral consumers.
//!
//! Every stateful component (connection registry, name pool, and anything
//! built the same way) follows one pattern:
//!
//! - **Guard order**: the cross-process file lock is always taken outside the
//!   in-process `RwLock`, never the other way round.
//! - **Reads** are served from an in-memory snapshot under the local read
//!   lock. No file lock is taken.
//! - **Writes** take the file write lock, reload the file from disk
//!   (discarding the possibly stale snapshot), apply the change under the
//!   local write lock, persist with the atomic writer, then release.
//! - **Startup** loads the snapshot once under a shared file lock so it cannot
//!   race a writer's rename.
//!
//! The snapshot is only guaranteed fresh right after a write transaction.

pub mod connections;
pub mod names;
mod registry;


pub use connections::{Connection, ConnectionKind, ConnectionRegistry};
pub use names::{NamePool, PoolState};
pub use registry::{Record, Registry};

use crate::error::{CorralError, Result};
use crate::fs::{WriteOptions, atomic_write_json};
use crate::locks::{LockOptions, with_read_lock_opts, with_write_lock_opts};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A JSON document on disk mirrored by a process-local snapshot.
#[derive(Debug)]
pub struct SharedState<S> {
    path: PathBuf,
    lock_options: LockOptions,
    write_options: WriteOptions,
    snapshot: RwLock<S>,
}

impl<S> SharedState<S>
where
    S: Default + Clone + Serialize + DeserializeOwned,
{
    /// Open the state file at `path` and load the initial snapshot.
    pub fn open<P: AsRef<Path>>(
        path: P,
        lock_options: LockOptions,
        write_options: WriteOptions,
    ) -> Result<Self> {
        let state = Self {
            path: path.as_ref().to_path_buf(),
            lock_options,
            write_options,
            snapshot: RwLock::new(S::default()),
        };
        state.reload()?;
        Ok(state)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Refresh the snapshot from disk under a shared file lock.
    pub fn reload(&self) -> Result<()> {
        with_read_lock_opts(&self.path, &self.lock_options, || {
            let fresh = read_state::<S>(&self.path)?;
            *self.write_snapshot() = fresh;
            Ok(())
        })
    }

    /// Read from the snapshot. Fast path: no file lock, possibly stale.
    pub fn read<T>(&self, f: impl FnOnce(&S) -> T) -> T {
        f(&self.read_snapshot())
    }

    /// Clone of the current snapshot.
    pub fn snapshot(&self) -> S {
        self.read_snapshot().clone()
    }

    /// Run a reload-modify-save transaction.
    ///
    /// `f` sees the state freshly read from disk under the exclusive file
    /// lock. When it returns `Ok` the result is persisted atomically and
    /// becomes the new snapshot; when it returns `Err` nothing is written and
    /// the snapshot is refreshed to the reloaded state.
    pub fn transact<T>(&self, f: impl FnOnce(&mut S) -> Result<T>) -> Result<T> {
        with_write_lock_opts(&self.path, &self.lock_options, || {
            let mut snapshot = self.write_snapshot();
            let mut working = read_state::<S>(&self.path)?;

            let outcome = match f(&mut working) {
                Ok(value) => value,
                Err(e) => {
                    *snapshot = read_state::<S>(&self.path)?;
                    return Err(e);
                }
            };

            atomic_write_json(&self.path, &working, self.write_options)?;
            *snapshot = working;
            Ok(outcome)
        })
    }

    fn read_snapshot(&self) -> RwLockReadGuard<'_, S> {
        self.snapshot.read().unwrap_or_else(|poison| poison.into_inner())
    }

    fn write_snapshot(&self) -> RwLockWriteGuard<'_, S> {
        self.snapshot
            .write()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

/// Read a state document; a missing or empty file is the default state.
fn read_state<S: Default + DeserializeOwned>(path: &Path) -> Result<S> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(S::default()),
        Err(e) => return Err(CorralError::io_at("read state file", path, e)),
    };
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(S::default());
    }

    serde_json::from_slice(&bytes).map_err(|e| CorralError::Corrupt {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}
