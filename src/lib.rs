//! Corral: file-based concurrency control and atomic shared state for
//! cooperating agent processes.
//!
//! The building blocks are an advisory [`locks::FileLock`] per protected
//! file, [`fs::atomic_write`] for crash-safe replacement, a stale lock
//! reclaimer, and [`state::SharedState`], which combines them into a
//! reload-modify-save registry that any number of processes can share.

pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod exit_codes;
pub mod fs;
pub mod locks;
pub mod state;

pub use error::{CorralError, Result};
