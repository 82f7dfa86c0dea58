//! Atomic filesystem writes for corral.
//!
//! Every protected state file is replaced, never edited in place:
//! 1. Write content to a uniquely named temporary file in the same directory
//! 2. Optionally sync the file to disk (fsync)
//! 3. Rename the temporary file over the target
//!
//! Readers that open the target at any moment see either the complete old
//! content or the complete new content.
//!
//! # Temporary Names
//!
//! Temporary files are named `.{filename}.{pid}.{counter}.tmp` and created with
//! `create_new`. A fixed name would collide between concurrent writers of the
//! same target, in this process or another one.
//!
//! # Cross-Platform Behavior
//!
//! - **POSIX**: `rename()` is atomic when source and destination share a
//!   filesystem, which is guaranteed because the temp file is a sibling.
//! - **Windows**: `std::fs::rename` replaces an existing destination.

use crate::error::{CorralError, Result};
use serde::Serialize;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// How many unique names to try before giving up on creating a temp file.
const MAX_TEMP_ATTEMPTS: u32 = 16;

/// Options controlling durability of atomic writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    /// Sync the temp file before rename and the directory after it.
    pub durable: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self { durable: true }
    }
}

/// Atomically write bytes to a file with default (durable) options.
///
/// ```no_run
/// use corral::fs::atomic_write;
/// use std::path::Path;
///
/// atomic_write(Path::new("registry.json"), b"{}\n")?;
/// # Ok::<(), corral::error::CorralError>(())
/// ```
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
    atomic_write_with(path, content, WriteOptions::default())
}

/// Atomically write a string to a file.
pub fn atomic_write_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
    atomic_write(path, content.as_bytes())
}

/// Serialize `value` as pretty JSON and write it atomically.
pub fn atomic_write_json<P: AsRef<Path>, T: Serialize>(
    path: P,
    value: &T,
    options: WriteOptions,
) -> Result<()> {
    let mut bytes = serde_json::to_vec_pretty(value)
        .map_err(|e| CorralError::Serialization(e.to_string()))?;
    bytes.push(b'\n');
    atomic_write_with(path, &bytes, options)
}

/// Atomically write bytes to a file.
pub fn atomic_write_with<P: AsRef<Path>>(
    path: P,
    content: &[u8],
    options: WriteOptions,
) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent)
            .map_err(|e| CorralError::io_at("create parent directory", parent, e))?;
    }

    let (file, temp) = create_temp_file(path)?;
    write_and_sync(file, &temp, content, options.durable)?;
    atomic_replace(temp, path, options.durable)
}

/// Removes the temporary file on drop unless it was renamed into place.
struct TempPath {
    path: PathBuf,
    persisted: bool,
}

impl TempPath {
    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempPath {
    fn drop(&mut self) {
        if !self.persisted
            && let Err(e) = fs::remove_file(&self.path)
            && e.kind() != io::ErrorKind::NotFound
        {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to remove temp file");
        }
    }
}

/// Build the `n`th candidate temp path for `target`.
fn temp_path_for(target: &Path, counter: u64) -> Result<PathBuf> {
    let filename = target.file_name().ok_or_else(|| {
        CorralError::UserError(format!("invalid file path '{}'", target.display()))
    })?;

    let mut temp_name = OsString::from(".");
    temp_name.push(filename);
    temp_name.push(format!(".{}.{}.tmp", std::process::id(), counter));
    Ok(match target.parent() {
        Some(parent) => parent.join(temp_name),
        None => PathBuf::from(temp_name),
    })
}

fn create_temp_file(target: &Path) -> Result<(File, TempPath)> {
    let mut last_err = None;
    for _ in 0..MAX_TEMP_ATTEMPTS {
        let candidate = temp_path_for(target, TEMP_COUNTER.fetch_add(1, Ordering::Relaxed))?;
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(file) => {
                return Ok((
                    file,
                    TempPath {
                        path: candidate,
                        persisted: false,
                    },
                ));
            }
            // Left over from a crashed process that had our PID.
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => last_err = Some(e),
            Err(e) => return Err(CorralError::io_at("create temporary file", &candidate, e)),
        }
    }
    Err(CorralError::io_at(
        "create temporary file for",
        target,
        last_err.unwrap_or_else(|| io::Error::other("no unique temp name available")),
    ))
}

fn write_and_sync(mut file: File, temp: &TempPath, content: &[u8], durable: bool) -> Result<()> {
    file.write_all(content)
        .map_err(|e| CorralError::io_at("write temporary file", temp.path(), e))?;
    if durable {
        file.sync_all()
            .map_err(|e| CorralError::io_at("sync temporary file", temp.path(), e))?;
    }
    Ok(())
}

fn atomic_replace(mut temp: TempPath, target: &Path, durable: bool) -> Result<()> {
    fs::rename(temp.path(), target).map_err(|e| {
        CorralError::io(
            format!(
                "failed to rename '{}' over '{}'",
                temp.path().display(),
                target.display()
            ),
            e,
        )
    })?;
    temp.persisted = true;

    if durable {
        sync_parent_dir(target);
    }
    Ok(())
}

/// Persist the directory entry after a rename. Best-effort.
#[cfg(unix)]
fn sync_parent_dir(target: &Path) {
    let parent = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if let Ok(dir) = File::open(parent) {
        let _ = dir.sync_all();
    }
}

#[cfg(not(unix))]
fn sync_parent_dir(_target: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;
    use tempfile::TempDir;

    fn leftover_temp_files(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|n| n.ends_with(".tmp"))
            .collect()
    }

    #[test]
    fn test_atomic_write_new_file() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("test.txt");

        atomic_write(&file_path, b"hello world").unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "hello world");
    }

    #[test]
    fn test_atomic_write_replace_existing() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("test.txt");
        fs::write(&file_path, "original content").unwrap();

        atomic_write_file(&file_path, "new content").unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "new content");
        assert!(leftover_temp_files(temp_dir.path()).is_empty());
    }

    #[test]
    fn test_atomic_write_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("nested").join("dirs").join("test.txt");

        atomic_write(&file_path, b"nested content").unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "nested content");
    }

    #[test]
    fn test_atomic_write_json_pretty_with_newline() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("state.json");

        atomic_write_json(
            &file_path,
            &serde_json::json!({"a": 1}),
            WriteOptions { durable: false },
        )
        .unwrap();

        let content = fs::read_to_string(&file_path).unwrap();
        assert!(content.ends_with('\n'));
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed["a"], 1);
    }

    #[test]
    fn test_temp_paths_are_unique_per_call() {
        let target = Path::new("/some/path/file.txt");
        let a = temp_path_for(target, 1).unwrap();
        let b = temp_path_for(target, 2).unwrap();

        assert_ne!(a, b);
        assert_eq!(a.parent().unwrap(), Path::new("/some/path"));
        let name = a.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with(".file.txt."));
        assert!(name.contains(&std::process::id().to_string()));
        assert!(name.ends_with(".tmp"));
    }

    #[cfg(unix)]
    #[test]
    fn test_atomic_write_non_utf8_file_name() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir
            .path()
            .join(OsStr::from_bytes(b"reg\xff.json"));

        atomic_write(&file_path, b"{}").unwrap();
        atomic_write(&file_path, b"{\"a\": 1}").unwrap();

        assert_eq!(fs::read(&file_path).unwrap(), b"{\"a\": 1}");
        assert!(leftover_temp_files(temp_dir.path()).is_empty());
    }

    #[test]
    fn test_path_without_file_name_is_rejected() {
        assert!(matches!(
            atomic_write("/", b"x"),
            Err(CorralError::UserError(_))
        ));
    }

    #[test]
    fn test_stale_temp_name_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("test.txt");
        let next = TEMP_COUNTER.load(Ordering::Relaxed);
        // Occupy the next few candidate names, as a crashed writer would.
        for n in next..next + 4 {
            fs::write(temp_path_for(&file_path, n).unwrap(), "junk").unwrap();
        }

        atomic_write(&file_path, b"fresh").unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "fresh");
    }

    #[test]
    fn test_failed_rename_leaves_target_and_cleans_temp() {
        let temp_dir = TempDir::new().unwrap();
        // A directory at the target path makes the rename fail.
        let target = temp_dir.path().join("occupied");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep"), "x").unwrap();

        let err = atomic_write(&target, b"content").unwrap_err();

        assert!(matches!(err, CorralError::Io { .. }));
        assert!(err.to_string().contains("occupied"));
        assert!(target.join("keep").exists());
        assert!(leftover_temp_files(temp_dir.path()).is_empty());
    }

    #[test]
    fn test_atomic_write_empty_and_binary_content() {
        let temp_dir = TempDir::new().unwrap();
        let empty = temp_dir.path().join("empty.bin");
        let binary = temp_dir.path().join("binary.bin");
        let bytes: Vec<u8> = (0..=255).collect();

        atomic_write(&empty, b"").unwrap();
        atomic_write(&binary, &bytes).unwrap();

        assert!(fs::read(&empty).unwrap().is_empty());
        assert_eq!(fs::read(&binary).unwrap(), bytes);
    }

    #[test]
    fn test_concurrent_writers_same_target_all_succeed() {
        let temp_dir = TempDir::new().unwrap();
        let path = Arc::new(temp_dir.path().join("shared.txt"));

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let path = Arc::clone(&path);
                std::thread::spawn(move || {
                    let content = format!("writer {}", i);
                    atomic_write_with(&*path, content.as_bytes(), WriteOptions { durable: false })
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap().unwrap();
        }
        let content = fs::read_to_string(&*path).unwrap();
        assert!(content.starts_with("writer "));
        assert!(leftover_temp_files(temp_dir.path()).is_empty());
    }

    #[test]
    fn test_reader_never_sees_partial_content() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("large.txt");
        let old = vec![b'a'; 1024 * 1024];
        let new = vec![b'b'; 2 * 1024 * 1024];
        atomic_write(&path, &old).unwrap();

        let done = Arc::new(AtomicBool::new(false));
        let reader = {
            let path = path.clone();
            let done = Arc::clone(&done);
            let (old, new) = (old.clone(), new.clone());
            std::thread::spawn(move || {
                let mut reads = 0u32;
                while !done.load(Ordering::Acquire) || reads == 0 {
                    let seen = fs::read(&path).unwrap();
                    assert!(seen == old || seen == new, "observed {} bytes", seen.len());
                    reads += 1;
                }
            })
        };

        for i in 0..10 {
            let content = if i % 2 == 0 { &new } else { &old };
            atomic_write_with(&path, content, WriteOptions { durable: false }).unwrap();
        }
        done.store(true, Ordering::Release);
        reader.join().unwrap();
    }
}
