//! Command implementations for corral.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations.

mod connection;
mod lock;
mod names;

use crate::cli::{Command, ConnectionAction, LockAction, NamesAction};
use crate::context::StateContext;
use crate::error::Result;
use std::path::Path;

/// Dispatch a command to its implementation.
///
/// This is the main entry point for command execution. Each command
/// is routed to its handler function.
pub fn dispatch(state_dir: Option<&Path>, command: Command) -> Result<()> {
    let ctx = StateContext::resolve(state_dir)?;
    tracing::debug!(state_dir = %ctx.state_dir.display(), "resolved state directory");

    match command {
        Command::Lock(lock_cmd) => match lock_cmd.action {
            LockAction::List(args) => lock::cmd_lock_list(&ctx, args),
            LockAction::Clean(args) => lock::cmd_lock_clean(&ctx, args),
            LockAction::Hold(args) => lock::cmd_lock_hold(&ctx, args),
            LockAction::Run(args) => lock::cmd_lock_run(&ctx, args),
        },
        Command::Connection(conn_cmd) => match conn_cmd.action {
            ConnectionAction::Add(args) => connection::cmd_connection_add(&ctx, args),
            ConnectionAction::Remove(args) => connection::cmd_connection_remove(&ctx, args),
            ConnectionAction::List => connection::cmd_connection_list(&ctx),
            ConnectionAction::Touch(args) => connection::cmd_connection_touch(&ctx, args),
        },
        Command::Names(names_cmd) => match names_cmd.action {
            NamesAction::Allocate { holder } => names::cmd_names_allocate(&ctx, &holder),
            NamesAction::Release { name } => names::cmd_names_release(&ctx, &name),
            NamesAction::List => names::cmd_names_list(&ctx),
        },
    }
}
