//! Platform advisory-lock backends.
//!
//! Both backends go through `fs2` for the lock call itself (`flock` on POSIX,
//! `LockFileEx` on Windows). They differ in how a holder confirms that the file
//! it locked is still the one at the lock path.
//!
//! POSIX locks are purely advisory. Windows byte-range locks also block reads
//! of the locked range through other handles, so diagnostic metadata may be
//! unreadable while a lock is held there. Neither backend enforces anything
//! against processes that do not call into this crate.

use super::types::LockMode;
use fs2::FileExt;
use std::fs::File;
use std::io;

/// One non-blocking lock attempt. `Ok(false)` means another holder has it.
pub(crate) fn try_lock(file: &File, mode: LockMode) -> io::Result<bool> {
    // Fully qualified: std's inherent `File` lock methods shadow the trait.
    let attempt = match mode {
        LockMode::Exclusive => FileExt::try_lock_exclusive(file),
        LockMode::Shared => FileExt::try_lock_shared(file),
    };
    match attempt {
        Ok(()) => Ok(true),
        Err(e) if is_contended(&e) => Ok(false),
        Err(e) => Err(e),
    }
}

pub(crate) fn unlock(file: &File) -> io::Result<()> {
    FileExt::unlock(file)
}

fn is_contended(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || (err.raw_os_error().is_some()
            && err.raw_os_error() == fs2::lock_contended_error().raw_os_error())
}

pub(crate) use imp::is_current;

#[cfg(unix)]
mod imp {
    use std::fs::{self, File};
    use std::io;
    use std::os::unix::fs::MetadataExt;
    use std::path::Path;

    /// Whether `file` is still the inode linked at `path`.
    ///
    /// A reclaimer may unlink a lock file after we opened it but before our
    /// `flock` succeeded; locking the orphaned inode would not exclude a
    /// process that creates a fresh file at the same path.
    pub(crate) fn is_current(file: &File, path: &Path) -> io::Result<bool> {
        let held = file.metadata()?;
        match fs::metadata(path) {
            Ok(linked) => Ok(held.dev() == linked.dev() && held.ino() == linked.ino()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[cfg(windows)]
mod imp {
    use std::fs::File;
    use std::io;
    use std::path::Path;

    /// A deleted file on Windows stays delete-pending while any handle is
    /// open, and the path cannot be recreated until then; checking that the
    /// path still resolves is sufficient.
    pub(crate) fn is_current(_file: &File, path: &Path) -> io::Result<bool> {
        Ok(path.exists())
    }
}
