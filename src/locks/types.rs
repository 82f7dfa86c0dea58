//! Lock type definitions and information structures.

use super::backoff::BackoffPolicy;
use super::metadata::LockMetadata;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Mode of an advisory lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockMode {
    /// Single holder; excludes every other holder.
    Exclusive,
    /// Any number of shared holders; excludes exclusive holders.
    Shared,
}

impl LockMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LockMode::Exclusive => "exclusive",
            LockMode::Shared => "shared",
        }
    }
}

impl std::fmt::Display for LockMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How long a blocking acquisition may wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockTimeout {
    /// Fail on the first contended attempt; no retry loop.
    NoWait,
    /// Retry with backoff until the duration has elapsed.
    After(Duration),
    /// Retry with backoff indefinitely.
    Forever,
}

impl LockTimeout {
    /// Interpret a signed millisecond value: positive waits that long,
    /// zero waits forever, negative never waits.
    pub fn from_millis(ms: i64) -> Self {
        match ms {
            ms if ms > 0 => LockTimeout::After(Duration::from_millis(ms as u64)),
            0 => LockTimeout::Forever,
            _ => LockTimeout::NoWait,
        }
    }
}

/// Category of contention a lock is expected to see.
///
/// Each category has its own bounded backoff policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockCategory {
    /// Files on a local disk; short backoff cap.
    #[default]
    Local,
    /// Files on a network-backed share; long backoff cap.
    Network,
}

impl LockCategory {
    pub fn backoff(self) -> BackoffPolicy {
        match self {
            LockCategory::Local => BackoffPolicy::LOCAL,
            LockCategory::Network => BackoffPolicy::NETWORK,
        }
    }
}

/// Default wait for blocking acquisitions.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Options for acquiring a [`FileLock`](super::FileLock).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockOptions {
    pub timeout: LockTimeout,
    pub backoff: BackoffPolicy,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            timeout: LockTimeout::After(DEFAULT_TIMEOUT),
            backoff: BackoffPolicy::LOCAL,
        }
    }
}

impl LockOptions {
    /// Default timeout with the backoff policy of `category`.
    pub fn for_category(category: LockCategory) -> Self {
        Self {
            backoff: category.backoff(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: LockTimeout) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }
}

/// Description of a lock currently held by a [`FileLock`](super::FileLock).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockHandle {
    /// The protected resource path as given by the caller.
    pub resource: PathBuf,
    /// The lock file derived from the resource path.
    pub lock_path: PathBuf,
    pub mode: LockMode,
    pub acquired_at: DateTime<Utc>,
}

/// Information about a lock file found on disk.
#[derive(Debug, Clone)]
pub struct LockInfo {
    /// The lock file path.
    pub path: PathBuf,

    /// The lock name (the protected resource's file name).
    pub name: String,

    /// Diagnostic metadata written by the last exclusive holder, if readable.
    pub metadata: Option<LockMetadata>,

    /// Whether a live process held the lock when probed.
    pub held: bool,
}

impl std::fmt::Display for LockInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}", self.name, if self.held { "held" } else { "STALE" })?;
        if let Some(meta) = &self.metadata {
            write!(
                f,
                ", last holder: pid {} {}, {} ago",
                meta.pid,
                meta.owner,
                meta.age_string()
            )?;
        }
        write!(f, ")")
    }
}
