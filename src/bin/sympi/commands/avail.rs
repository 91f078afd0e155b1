//! `sympi avail` command

use anyhow::Result;

use crate::cli::AvailArgs;
use sympi::ops::avail::{available, render};
use sympi::util::GlobalContext;

pub fn execute(_args: AvailArgs, ctx: &GlobalContext) -> Result<()> {
    let releases = available(&ctx.etc_dir())?;
    print!("{}", render(&releases));
    Ok(())
}
