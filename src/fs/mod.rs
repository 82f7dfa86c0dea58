//! Filesystem utilities for corral.
//!
//! Provides the atomic write used for every protected state file.

pub mod atomic;

pub use atomic::{
    WriteOptions, atomic_write, atomic_write_file, atomic_write_json, atomic_write_with,
};
