//! `sympi unload` command

use anyhow::Result;

use crate::cli::UnloadArgs;
use sympi::core::Namespace;
use sympi::util::{GlobalContext, Status};

pub fn execute(args: UnloadArgs, ctx: &GlobalContext) -> Result<()> {
    let namespace: Namespace = args.namespace.parse()?;

    let mut activator = super::session_activator(ctx);
    if activator.environment().entries_of(namespace).is_empty() {
        ctx.shell()
            .status(Status::Skipped, format!("no {} install is loaded", namespace.label()));
    }
    activator.unload(namespace)?;

    ctx.shell().status(Status::Unloaded, namespace.label());
    Ok(())
}
