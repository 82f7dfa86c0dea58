//! Config loading, validation, and conversion to runtime options.

use super::model::Config;
use crate::error::{CorralError, Result};
use crate::fs::WriteOptions;
use crate::locks::{BackoffPolicy, LockOptions, LockTimeout};
use std::collections::HashSet;
use std::io;
use std::path::Path;
use std::time::Duration;

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .map_err(|e| CorralError::io_at("read config file", path, e))?;

        Self::from_yaml(&content)
    }

    /// Load config from a YAML file, using defaults when it does not exist.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        match Self::load(path.as_ref()) {
            Err(CorralError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.as_ref().display(), "no config file, using defaults");
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| CorralError::Config(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| CorralError::Serialization(format!("failed to serialize config: {}", e)))
    }

    /// Validate config values.
    ///
    /// Validation rules:
    /// - backoff delays must be positive, and the cap at least the initial delay
    /// - `name_theme` must be non-empty
    /// - `name_pool` entries must be non-empty and unique
    pub fn validate(&self) -> Result<()> {
        let backoff = self.backoff();
        if backoff.initial.is_zero() {
            return Err(CorralError::Config(
                "backoff_initial_ms must be greater than 0".to_string(),
            ));
        }
        if backoff.max < backoff.initial {
            return Err(CorralError::Config(format!(
                "backoff_max_ms ({}) must not be less than backoff_initial_ms ({})",
                backoff.max.as_millis(),
                backoff.initial.as_millis()
            )));
        }

        if self.name_theme.trim().is_empty() {
            return Err(CorralError::Config(
                "name_theme must not be empty".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for name in &self.name_pool {
            if name.trim().is_empty() {
                return Err(CorralError::Config(
                    "name_pool entries must be non-empty".to_string(),
                ));
            }
            if !seen.insert(name) {
                return Err(CorralError::Config(format!(
                    "name_pool contains '{}' more than once",
                    name
                )));
            }
        }

        Ok(())
    }

    /// Backoff policy of the configured category with overrides applied.
    pub fn backoff(&self) -> BackoffPolicy {
        let base = self.lock_category.backoff();
        BackoffPolicy::new(
            self.backoff_initial_ms
                .map(Duration::from_millis)
                .unwrap_or(base.initial),
            self.backoff_max_ms
                .map(Duration::from_millis)
                .unwrap_or(base.max),
        )
    }

    pub fn lock_options(&self) -> LockOptions {
        LockOptions {
            timeout: LockTimeout::from_millis(self.lock_timeout_ms),
            backoff: self.backoff(),
        }
    }

    pub fn write_options(&self) -> WriteOptions {
        WriteOptions {
            durable: self.durable_writes,
        }
    }
}
