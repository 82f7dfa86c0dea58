//! Locking subsystem for corral.
//!
//! Provides cross-process mutual exclusion over shared state files using OS
//! advisory locks only.
//!
//! # Lock Files
//!
//! A resource at `P` is guarded by the lock file `<dir(P)>/.locks/<base(P)>.lock`.
//! The lock lives in the OS (`flock` / `LockFileEx`) on an open descriptor of
//! that file, not in the file's existence. When a holder dies the kernel
//! drops its lock and the next acquisition attempt succeeds; the orphaned file
//! is later removed by [`clean_stale_locks`].
//!
//! # Lock Metadata
//!
//! Exclusive holders write JSON metadata (`owner`, `pid`, `mode`,
//! `acquired_at`) into the lock file for inspection. It is never parsed for
//! correctness.
//!
//! # Acquisition
//!
//! Blocking acquisitions retry with bounded exponential backoff
//! ([`BackoffPolicy`]) until [`LockTimeout`] expires. There is no fairness
//! among waiters.
//!
//! # Scoped Use
//!
//! Most callers should use [`with_read_lock`] / [`with_write_lock`], which
//! release the lock on every exit path including panics.

mod backoff;
mod file_lock;
mod guard;
mod metadata;
mod path;
mod reclaim;
mod scoped;
mod sys;
mod types;


// Re-export public API
pub use backoff::{Backoff, BackoffPolicy};
pub use file_lock::FileLock;
pub use guard::LockGuard;
pub use metadata::LockMetadata;
pub use path::{LOCK_EXTENSION, LOCKS_DIR_NAME, lock_path_for, locks_dir_for};
pub use reclaim::{clean_stale_locks, list_locks};
pub use scoped::{with_read_lock, with_read_lock_opts, with_write_lock, with_write_lock_opts};
pub use types::{
    DEFAULT_TIMEOUT, LockCategory, LockHandle, LockInfo, LockMode, LockOptions, LockTimeout,
};
