//! `sympi load` command

use anyhow::Result;

use crate::cli::LoadArgs;
use sympi::core::{Implementation, RuntimeInstall};
use sympi::util::{GlobalContext, Status};
use sympi::Error;

pub fn execute(args: LoadArgs, ctx: &GlobalContext) -> Result<()> {
    let implementation: Implementation = args.descriptor.parse()?;
    let install = RuntimeInstall::new(ctx.sympi_dir(), &implementation);
    if !install.is_ready() {
        return Err(Error::not_found("install", implementation.to_string()).into());
    }

    let mut activator = super::session_activator(ctx);
    activator.load(implementation.namespace(), &install)?;

    ctx.shell().status(Status::Loaded, &implementation);
    Ok(())
}
