//! Config struct definition and default implementation.

use super::types::*;
use crate::locks::LockCategory;
use serde::{Deserialize, Serialize};

/// Configuration for corral.
///
/// This struct represents the contents of `<state dir>/config.yaml`.
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Lock settings
    // =========================================================================
    /// How long blocking acquisitions wait, in milliseconds.
    /// Positive waits that long, `0` waits forever, negative never waits.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: i64,

    /// Contention category selecting the backoff policy.
    #[serde(default)]
    pub lock_category: LockCategory,

    /// Override of the category's initial backoff delay.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff_initial_ms: Option<u64>,

    /// Override of the category's backoff cap.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff_max_ms: Option<u64>,

    // =========================================================================
    // Write settings
    // =========================================================================
    /// Whether atomic writes fsync before renaming.
    #[serde(default = "default_true")]
    pub durable_writes: bool,

    // =========================================================================
    // Name pool settings
    // =========================================================================
    /// Prefix of overflow names once the base list is exhausted.
    #[serde(default = "default_name_theme")]
    pub name_theme: String,

    /// Ordered base names.
    #[serde(default = "default_name_pool")]
    pub name_pool: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lock_timeout_ms: default_lock_timeout_ms(),
            lock_category: LockCategory::default(),
            backoff_initial_ms: None,
            backoff_max_ms: None,
            durable_writes: default_true(),
            name_theme: default_name_theme(),
            name_pool: default_name_pool(),
        }
    }
}
