//! Implementation of the `corral connection` commands.

use crate::cli::{ConnectionAddArgs, ConnectionNameArgs};
use crate::context::StateContext;
use crate::error::{CorralError, Result};
use crate::state::{Connection, ConnectionKind};

/// Execute `corral connection add`.
pub fn cmd_connection_add(ctx: &StateContext, args: ConnectionAddArgs) -> Result<()> {
    let config = ctx.load_config()?;
    let registry = ctx.connections(&config)?;

    let root = match args.root {
        Some(root) => root,
        None => std::env::current_dir().map_err(|e| {
            CorralError::UserError(format!("failed to get current working directory: {}", e))
        })?,
    };

    if !args.ssh && (args.host.is_some() || args.user.is_some()) {
        return Err(CorralError::UserError(
            "--host and --user only apply to ssh connections (add --ssh)".to_string(),
        ));
    }

    let mut connection = Connection::local(args.name, root);
    if args.ssh {
        connection.kind = ConnectionKind::Ssh;
        connection.host = args.host;
        connection.user = args.user;
    }

    registry.add(connection.clone())?;
    println!("Added connection: {}", connection);
    Ok(())
}

/// Execute `corral connection remove`.
pub fn cmd_connection_remove(ctx: &StateContext, args: ConnectionNameArgs) -> Result<()> {
    let config = ctx.load_config()?;
    let registry = ctx.connections(&config)?;

    let removed = registry.remove(&args.name)?;
    println!("Removed connection: {}", removed.name);
    Ok(())
}

/// Execute `corral connection list`.
pub fn cmd_connection_list(ctx: &StateContext) -> Result<()> {
    let config = ctx.load_config()?;
    let registry = ctx.connections(&config)?;

    let connections = registry.list();
    if connections.is_empty() {
        println!("No connections.");
        return Ok(());
    }

    for conn in &connections {
        match conn.last_seen {
            Some(seen) => println!(
                "{}  (last seen {})",
                conn,
                seen.format("%Y-%m-%d %H:%M:%S UTC")
            ),
            None => println!("{}", conn),
        }
    }
    Ok(())
}

/// Execute `corral connection touch`.
pub fn cmd_connection_touch(ctx: &StateContext, args: ConnectionNameArgs) -> Result<()> {
    let config = ctx.load_config()?;
    let registry = ctx.connections(&config)?;

    let conn = registry.touch(&args.name)?;
    println!("Touched connection: {}", conn.name);
    Ok(())
}
