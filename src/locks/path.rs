//! Derivation of lock file paths from resource paths.
//!
//! For a resource at `P`, the lock file is `<dir(P)>/.locks/<base(P)>.lock`.
//! Any process can compute it from `P` alone.

use crate::error::{CorralError, Result};
use std::path::{Path, PathBuf};

/// Name of the per-directory lock directory.
pub const LOCKS_DIR_NAME: &str = ".locks";

/// Extension of lock files.
pub const LOCK_EXTENSION: &str = "lock";

/// The lock directory that holds lock files for resources next to `resource`.
pub fn locks_dir_for<P: AsRef<Path>>(resource: P) -> PathBuf {
    let parent = resource.as_ref().parent().unwrap_or(Path::new(""));
    parent.join(LOCKS_DIR_NAME)
}

/// The lock file for `resource`.
pub fn lock_path_for<P: AsRef<Path>>(resource: P) -> Result<PathBuf> {
    let resource = resource.as_ref();
    let name = resource.file_name().ok_or_else(|| {
        CorralError::UserError(format!(
            "cannot derive a lock file for '{}': path has no file name",
            resource.display()
        ))
    })?;

    let mut file_name = name.to_os_string();
    file_name.push(".");
    file_name.push(LOCK_EXTENSION);
    Ok(locks_dir_for(resource).join(file_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_path_is_sibling_locks_dir() {
        let path = lock_path_for("/town/state/registry.json").unwrap();
        assert_eq!(path, PathBuf::from("/town/state/.locks/registry.json.lock"));
    }

    #[test]
    fn relative_resource_gives_relative_lock() {
        let path = lock_path_for("registry.json").unwrap();
        assert_eq!(path, PathBuf::from(".locks/registry.json.lock"));
    }

    #[test]
    fn derivation_is_deterministic() {
        assert_eq!(
            lock_path_for("a/b/mail.jsonl").unwrap(),
            lock_path_for("a/b/mail.jsonl").unwrap()
        );
        assert_ne!(
            lock_path_for("a/b/mail.jsonl").unwrap(),
            lock_path_for("a/c/mail.jsonl").unwrap()
        );
    }

    #[test]
    fn path_without_file_name_is_rejected() {
        assert!(matches!(
            lock_path_for("/"),
            Err(CorralError::UserError(_))
        ));
        assert!(lock_path_for("a/..").is_err());
    }
}
