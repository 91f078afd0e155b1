//! `sympi install` command

use anyhow::Result;

use crate::cli::InstallArgs;
use sympi::builder::SourceBuilder;
use sympi::core::Implementation;
use sympi::ops::install_runtime;
use sympi::util::fs::ensure_dir;
use sympi::util::GlobalContext;

pub fn execute(args: InstallArgs, ctx: &GlobalContext) -> Result<()> {
    let implementation: Implementation = args.descriptor.parse()?;

    ensure_dir(ctx.sympi_dir())?;
    let builder = SourceBuilder::new(ctx);
    install_runtime(ctx.sympi_dir(), &implementation, &builder, ctx.shell())?;

    Ok(())
}
