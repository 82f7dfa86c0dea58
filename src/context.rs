//! State directory resolution for corral.
//!
//! Every command works against one state directory holding the config file,
//! the registry files, and the `.locks/` directory next to them. This module
//! resolves that directory and derives the paths inside it, and opens the
//! registries with options taken from the config.

use crate::config::Config;
use crate::error::{CorralError, Result};
use crate::locks::LOCKS_DIR_NAME;
use crate::state::{ConnectionRegistry, NamePool};
use std::env;
use std::path::{Path, PathBuf};

/// Default state directory, relative to the working directory.
pub const DEFAULT_STATE_DIR: &str = ".corral";

/// Environment variable overriding the state directory.
pub const STATE_DIR_ENV: &str = "CORRAL_STATE_DIR";

pub const CONFIG_FILE: &str = "config.yaml";
pub const CONNECTIONS_FILE: &str = "connections.json";
pub const NAMES_FILE: &str = "names.json";

/// Resolved paths for one state directory. All paths are absolute.
#[derive(Debug, Clone)]
pub struct StateContext {
    pub state_dir: PathBuf,
}

impl StateContext {
    /// Resolve the state directory from an explicit path, or the default.
    ///
    /// Relative paths are taken against the current working directory.
    /// The directory is not created here.
    pub fn resolve(state_dir: Option<&Path>) -> Result<Self> {
        let cwd = env::current_dir().map_err(|e| {
            CorralError::UserError(format!("failed to get current working directory: {}", e))
        })?;

        Ok(Self::resolve_from(&cwd, state_dir))
    }

    /// Resolve against a known working directory.
    pub fn resolve_from<P: AsRef<Path>>(cwd: P, state_dir: Option<&Path>) -> Self {
        let dir = state_dir.unwrap_or_else(|| Path::new(DEFAULT_STATE_DIR));
        let state_dir = if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            cwd.as_ref().join(dir)
        };
        Self { state_dir }
    }

    pub fn config_path(&self) -> PathBuf {
        self.state_dir.join(CONFIG_FILE)
    }

    pub fn connections_path(&self) -> PathBuf {
        self.state_dir.join(CONNECTIONS_FILE)
    }

    pub fn names_path(&self) -> PathBuf {
        self.state_dir.join(NAMES_FILE)
    }

    /// Directory holding the lock files of the registries in this state dir.
    pub fn locks_dir(&self) -> PathBuf {
        self.state_dir.join(LOCKS_DIR_NAME)
    }

    /// Load `config.yaml`, falling back to defaults when it is absent.
    pub fn load_config(&self) -> Result<Config> {
        Config::load_or_default(self.config_path())
    }

    pub fn connections(&self, config: &Config) -> Result<ConnectionRegistry> {
        ConnectionRegistry::open(
            self.connections_path(),
            config.lock_options(),
            config.write_options(),
        )
    }

    pub fn names(&self, config: &Config) -> Result<NamePool> {
        NamePool::open(
            self.names_path(),
            config.name_theme.clone(),
            config.name_pool.clone(),
            config.lock_options(),
            config.write_options(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locks::lock_path_for;
    use tempfile::TempDir;

    #[test]
    fn default_state_dir_is_under_cwd() {
        let ctx = StateContext::resolve_from("/work", None);
        assert_eq!(ctx.state_dir, PathBuf::from("/work/.corral"));
        assert_eq!(ctx.config_path(), PathBuf::from("/work/.corral/config.yaml"));
        assert_eq!(ctx.locks_dir(), PathBuf::from("/work/.corral/.locks"));
    }

    #[test]
    fn relative_and_absolute_overrides() {
        let rel = StateContext::resolve_from("/work", Some(Path::new("state")));
        assert_eq!(rel.state_dir, PathBuf::from("/work/state"));

        let abs = StateContext::resolve_from("/work", Some(Path::new("/var/corral")));
        assert_eq!(abs.state_dir, PathBuf::from("/var/corral"));
    }

    #[test]
    fn registry_locks_live_in_locks_dir() {
        let ctx = StateContext::resolve_from("/work", None);
        let lock = lock_path_for(ctx.connections_path()).unwrap();
        assert_eq!(lock.parent(), Some(ctx.locks_dir().as_path()));
    }

    #[test]
    fn registries_open_with_config_options() {
        let dir = TempDir::new().unwrap();
        let ctx = StateContext::resolve_from(dir.path(), None);
        std::fs::create_dir_all(&ctx.state_dir).unwrap();
        std::fs::write(ctx.config_path(), "name_pool: [solo]\nname_theme: spare\n").unwrap();

        let config = ctx.load_config().unwrap();
        let names = ctx.names(&config).unwrap();
        assert_eq!(names.allocate("a").unwrap(), "solo");
        assert_eq!(names.allocate("b").unwrap(), "spare-1");

        let connections = ctx.connections(&config).unwrap();
        assert!(connections.list().is_empty());
    }
}
