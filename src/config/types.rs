//! Configuration defaults for corral.

pub(crate) fn default_lock_timeout_ms() -> i64 {
    30_000
}
pub(crate) fn default_name_theme() -> String {
    "corral".to_string()
}
pub(crate) fn default_true() -> bool {
    true
}

/// Default base names handed out by the name pool.
pub fn default_name_pool() -> Vec<String> {
    [
        "amber", "basil", "cedar", "delta", "ember", "flint", "garnet", "harbor", "indigo",
        "juniper",
    ]
    .iter()
    .map(|n| n.to_string())
    .collect()
}
