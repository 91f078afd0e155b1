//! `sympi list` command

use anyhow::Result;

use crate::cli::ListArgs;
use sympi::env::ActiveEnvironment;
use sympi::ops::Inventory;
use sympi::util::GlobalContext;

pub fn execute(_args: ListArgs, ctx: &GlobalContext) -> Result<()> {
    let inventory = Inventory::scan(ctx.sympi_dir())?;
    print!("{}", inventory.render(&ActiveEnvironment::from_process_env()));
    Ok(())
}
