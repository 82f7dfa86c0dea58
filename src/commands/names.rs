//! Implementation of the `corral names` commands.

use crate::context::StateContext;
use crate::error::Result;

/// Execute `corral names allocate`. Prints only the name so scripts can capture it.
pub fn cmd_names_allocate(ctx: &StateContext, holder: &str) -> Result<()> {
    let config = ctx.load_config()?;
    let pool = ctx.names(&config)?;

    let name = pool.allocate(holder)?;
    println!("{}", name);
    Ok(())
}

/// Execute `corral names release`.
pub fn cmd_names_release(ctx: &StateContext, name: &str) -> Result<()> {
    let config = ctx.load_config()?;
    let pool = ctx.names(&config)?;

    let holder = pool.release(name)?;
    println!("Released {} (was held by {})", name, holder);
    Ok(())
}

/// Execute `corral names list`.
pub fn cmd_names_list(ctx: &StateContext) -> Result<()> {
    let config = ctx.load_config()?;
    let pool = ctx.names(&config)?;

    let in_use = pool.in_use();
    if in_use.is_empty() {
        println!("No names allocated.");
        return Ok(());
    }

    for (name, holder) in &in_use {
        println!("{:<16} {}", name, holder);
    }
    Ok(())
}
