//! CLI argument parsing for corral.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Corral: file-based locking and shared state for cooperating agents.
///
/// Every process working against the same state directory coordinates
/// through advisory lock files under `.locks/`, so registries stay
/// consistent without a central server.
#[derive(Parser, Debug)]
#[command(name = "corral")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// State directory holding config, registries, and locks.
    #[arg(long, global = true, env = "CORRAL_STATE_DIR")]
    pub state_dir: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for corral.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Lock management commands.
    ///
    /// Inspect, reclaim, or hold lock files.
    Lock(LockCommand),

    /// Manage the connection registry.
    Connection(ConnectionCommand),

    /// Allocate and release names from the shared pool.
    Names(NamesCommand),
}

/// Lock subcommands.
#[derive(Parser, Debug)]
pub struct LockCommand {
    #[command(subcommand)]
    pub action: LockAction,
}

/// Available lock actions.
#[derive(Subcommand, Debug)]
pub enum LockAction {
    /// List lock files and whether each is currently held.
    ///
    /// Defaults to the state directory's `.locks/`.
    List(LockDirArgs),

    /// Delete lock files whose holder is gone.
    ///
    /// Held locks are never touched; running it twice is harmless.
    Clean(LockDirArgs),

    /// Acquire a lock on PATH and hold it.
    ///
    /// Prints `locked <lockfile>` once held, then keeps holding until the
    /// hold time elapses or the process is killed.
    Hold(LockHoldArgs),

    /// Run a command while holding a lock on PATH.
    ///
    /// The lock is released when the command exits.
    Run(LockRunArgs),
}

/// Arguments for `lock list` and `lock clean`.
#[derive(Parser, Debug)]
pub struct LockDirArgs {
    /// Lock directory to inspect (defaults to `<state dir>/.locks`).
    pub dir: Option<PathBuf>,
}

/// Arguments for the `lock hold` command.
#[derive(Parser, Debug)]
pub struct LockHoldArgs {
    /// Resource path whose lock to take.
    pub path: PathBuf,

    /// Take a shared lock instead of an exclusive one.
    #[arg(long)]
    pub shared: bool,

    /// Acquisition timeout: positive waits, 0 waits forever, negative never waits.
    #[arg(long, allow_hyphen_values = true)]
    pub timeout_ms: Option<i64>,

    /// How long to hold the lock once acquired (default: until killed).
    #[arg(long)]
    pub hold_ms: Option<u64>,
}

/// Arguments for the `lock run` command.
#[derive(Parser, Debug)]
pub struct LockRunArgs {
    /// Resource path whose lock to take.
    pub path: PathBuf,

    /// Take a shared lock instead of an exclusive one.
    #[arg(long)]
    pub shared: bool,

    /// Acquisition timeout: positive waits, 0 waits forever, negative never waits.
    #[arg(long, allow_hyphen_values = true)]
    pub timeout_ms: Option<i64>,

    /// Command and arguments to run, after `--`.
    #[arg(last = true, required = true)]
    pub command: Vec<String>,
}

/// Connection subcommands.
#[derive(Parser, Debug)]
pub struct ConnectionCommand {
    #[command(subcommand)]
    pub action: ConnectionAction,
}

/// Available connection actions.
#[derive(Subcommand, Debug)]
pub enum ConnectionAction {
    /// Register a new connection.
    Add(ConnectionAddArgs),

    /// Remove a connection.
    Remove(ConnectionNameArgs),

    /// List registered connections.
    List,

    /// Mark a connection as seen just now.
    Touch(ConnectionNameArgs),
}

/// Arguments for the `connection add` command.
#[derive(Parser, Debug)]
pub struct ConnectionAddArgs {
    /// Unique connection name.
    pub name: String,

    /// Register an SSH connection (requires --host).
    #[arg(long)]
    pub ssh: bool,

    /// Remote host for SSH connections.
    #[arg(long)]
    pub host: Option<String>,

    /// Remote user for SSH connections.
    #[arg(long)]
    pub user: Option<String>,

    /// Working root on the target (defaults to the current directory).
    #[arg(long)]
    pub root: Option<PathBuf>,
}

/// Arguments naming a single connection.
#[derive(Parser, Debug)]
pub struct ConnectionNameArgs {
    /// Connection name.
    pub name: String,
}

/// Name pool subcommands.
#[derive(Parser, Debug)]
pub struct NamesCommand {
    #[command(subcommand)]
    pub action: NamesAction,
}

/// Available name pool actions.
#[derive(Subcommand, Debug)]
pub enum NamesAction {
    /// Allocate a free name to HOLDER and print it.
    Allocate {
        /// Who the name is allocated to.
        holder: String,
    },

    /// Return a name to the pool.
    Release {
        /// Name to release.
        name: String,
    },

    /// List allocated names and their holders.
    List,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
