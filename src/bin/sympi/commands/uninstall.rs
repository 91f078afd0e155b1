//! `sympi uninstall` command

use anyhow::Result;

use crate::cli::UninstallArgs;
use sympi::builder::SourceBuilder;
use sympi::core::Implementation;
use sympi::ops::uninstall_runtime;
use sympi::util::GlobalContext;

pub fn execute(args: UninstallArgs, ctx: &GlobalContext) -> Result<()> {
    let implementation: Implementation = args.descriptor.parse()?;
    let builder = SourceBuilder::new(ctx);
    uninstall_runtime(ctx.sympi_dir(), &implementation, &builder, ctx.shell())
}
