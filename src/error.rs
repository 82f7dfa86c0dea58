//! Error types for corral.
//!
//! Uses thiserror for derive macros. Variants fall into four groups:
//! lock timeouts (retryable), API misuse (a bug in the caller), filesystem
//! failures (surfaced with path context), and state/config problems.

use crate::exit_codes;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Main error type for corral operations.
#[derive(Error, Debug)]
pub enum CorralError {
    /// The lock could not be acquired before the deadline.
    #[error("timed out after {}ms waiting for lock on '{}'", waited.as_millis(), path.display())]
    Timeout {
        /// The protected resource path.
        path: PathBuf,
        /// How long the caller actually waited.
        waited: Duration,
    },

    /// `lock`/`rlock` called on a handle that already holds the lock.
    #[error("lock on '{}' is already held by this handle", path.display())]
    AlreadyLocked { path: PathBuf },

    /// `unlock`/`runlock` called without holding the lock in that mode.
    #[error("lock on '{}' is not held in the requested mode", path.display())]
    NotLocked { path: PathBuf },

    /// A scoped lock call was nested inside another on the same path.
    #[error("reentrant scoped lock on '{}' would deadlock", path.display())]
    Reentrant { path: PathBuf },

    /// Filesystem failure with context.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// A protected state file could not be parsed.
    #[error("corrupt state file '{}': {}", path.display(), reason)]
    Corrupt { path: PathBuf, reason: String },

    /// Serialization of state failed.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Invalid configuration.
    #[error("invalid config: {0}")]
    Config(String),

    /// User provided invalid arguments.
    #[error("{0}")]
    UserError(String),

    /// A keyed entry does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A keyed entry already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),
}

impl CorralError {
    /// Wrap an I/O error with a message naming the path involved.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        CorralError::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn io_at(action: &str, path: &Path, source: io::Error) -> Self {
        Self::io(format!("failed to {} '{}'", action, path.display()), source)
    }

    /// Whether the caller may reasonably retry the operation later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CorralError::Timeout { .. })
    }

    /// Whether the error indicates a programming error in the caller.
    pub fn is_misuse(&self) -> bool {
        matches!(
            self,
            CorralError::AlreadyLocked { .. }
                | CorralError::NotLocked { .. }
                | CorralError::Reentrant { .. }
        )
    }

    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            CorralError::Timeout { .. } => exit_codes::LOCK_BUSY,
            CorralError::AlreadyLocked { .. }
            | CorralError::NotLocked { .. }
            | CorralError::Reentrant { .. } => exit_codes::INTERNAL_MISUSE,
            CorralError::Io { .. } => exit_codes::IO_FAILURE,
            CorralError::Corrupt { .. } | CorralError::Serialization(_) => {
                exit_codes::STATE_FAILURE
            }
            CorralError::Config(_)
            | CorralError::UserError(_)
            | CorralError::NotFound(_)
            | CorralError::AlreadyExists(_) => exit_codes::USER_ERROR,
        }
    }
}

/// Result type alias for corral operations.
pub type Result<T> = std::result::Result<T, CorralError>;
