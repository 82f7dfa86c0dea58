//! Implementation of the `corral lock` commands.

use crate::cli::{LockDirArgs, LockHoldArgs, LockRunArgs};
use crate::context::StateContext;
use crate::error::{CorralError, Result};
use crate::locks::{self, LockGuard, LockMode, LockOptions, LockTimeout};
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use std::thread;
use std::time::Duration;

fn lock_dir(ctx: &StateContext, args: LockDirArgs) -> PathBuf {
    args.dir.unwrap_or_else(|| ctx.locks_dir())
}

/// Config lock options with an optional `--timeout-ms` override, and the mode.
fn lock_request(
    ctx: &StateContext,
    timeout_ms: Option<i64>,
    shared: bool,
) -> Result<(LockOptions, LockMode)> {
    let mut options = ctx.load_config()?.lock_options();
    if let Some(ms) = timeout_ms {
        options = options.with_timeout(LockTimeout::from_millis(ms));
    }
    let mode = if shared {
        LockMode::Shared
    } else {
        LockMode::Exclusive
    };
    Ok((options, mode))
}

/// Execute `corral lock list`.
pub fn cmd_lock_list(ctx: &StateContext, args: LockDirArgs) -> Result<()> {
    let dir = lock_dir(ctx, args);
    let locks = locks::list_locks(&dir)?;

    if locks.is_empty() {
        println!("No lock files in {}.", dir.display());
        return Ok(());
    }

    println!("Lock files ({}):", locks.len());
    println!();

    for lock in &locks {
        println!("  {}", lock);
        println!("    {}", lock.path.display());
    }
    println!();

    let stale_count = locks.iter().filter(|l| !l.held).count();
    if stale_count > 0 {
        println!(
            "Note: {} lock file(s) are stale. Use `corral lock clean` to remove them.",
            stale_count
        );
    }

    Ok(())
}

/// Execute `corral lock clean`.
pub fn cmd_lock_clean(ctx: &StateContext, args: LockDirArgs) -> Result<()> {
    let dir = lock_dir(ctx, args);
    let removed = locks::clean_stale_locks(&dir)?;
    println!("Removed {} stale lock file(s) from {}", removed, dir.display());
    Ok(())
}

/// Execute `corral lock hold`.
///
/// Announces the held lock on stdout so a parent process can synchronize on
/// it, then sleeps while holding.
pub fn cmd_lock_hold(ctx: &StateContext, args: LockHoldArgs) -> Result<()> {
    let (options, mode) = lock_request(ctx, args.timeout_ms, args.shared)?;
    let guard = LockGuard::acquire(&args.path, mode, options)?;

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "locked {}", guard.lock_path().display())
        .and_then(|()| stdout.flush())
        .map_err(|e| CorralError::io("failed to write to stdout", e))?;
    drop(stdout);

    match args.hold_ms {
        Some(ms) => thread::sleep(Duration::from_millis(ms)),
        None => loop {
            thread::sleep(Duration::from_secs(60));
        },
    }

    guard.release()
}

/// Execute `corral lock run`.
///
/// Runs the command while holding the lock and releases it once the command
/// exits. A command that fails to start or exits unsuccessfully is an error.
pub fn cmd_lock_run(ctx: &StateContext, args: LockRunArgs) -> Result<()> {
    let Some((program, rest)) = args.command.split_first() else {
        return Err(CorralError::UserError("no command given to run".to_string()));
    };

    let (options, mode) = lock_request(ctx, args.timeout_ms, args.shared)?;
    let guard = LockGuard::acquire(&args.path, mode, options)?;
    tracing::debug!(program = %program, resource = %args.path.display(), "running under lock");

    let status = Command::new(program).args(rest).status();
    let released = guard.release();

    let status = status.map_err(|e| {
        CorralError::UserError(format!("failed to run command '{}': {}", program, e))
    })?;
    released?;

    if !status.success() {
        return Err(CorralError::UserError(format!(
            "command '{}' exited with {}",
            program, status
        )));
    }
    Ok(())
}
