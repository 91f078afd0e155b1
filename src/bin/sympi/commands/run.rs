//! `sympi run` command

use std::path::PathBuf;

use anyhow::{bail, Result};

use crate::cli::RunArgs;
use sympi::builder::SourceBuilder;
use sympi::core::{Namespace, RuntimeInstall};
use sympi::inspect::SingularityInspector;
use sympi::jobmgr::{default_managers, SystemConfig};
use sympi::ops::{Launch, LaunchOptions};
use sympi::util::{GlobalContext, KvStore, Status};

/// The loaded Singularity install's binary, else the configured one.
fn singularity_bin(ctx: &GlobalContext) -> PathBuf {
    super::session_activator(ctx)
        .environment()
        .loaded(Namespace::Runtime)
        .map(|imp| RuntimeInstall::new(ctx.sympi_dir(), &imp))
        .filter(RuntimeInstall::is_ready)
        .map(|install| install.bin("singularity"))
        .unwrap_or_else(|| ctx.singularity_bin())
}

pub fn execute(args: RunArgs, ctx: &GlobalContext) -> Result<()> {
    let job = &ctx.config().job;
    let singularity = singularity_bin(ctx);
    tracing::debug!("using {}", singularity.display());

    let options = LaunchOptions {
        num_nodes: args.nodes.or(job.num_nodes).unwrap_or(0),
        num_procs: args.np.or(job.num_procs).unwrap_or(0),
        keep_artifacts: args.keep || job.keep_artifacts,
        singularity: singularity.clone(),
        scratch_dir: ctx.scratch_dir(),
        version_order: ctx.version_order(),
    };

    let inspector = SingularityInspector::new(singularity);
    let builder = SourceBuilder::new(ctx);
    let mut activator = super::session_activator(ctx);
    let sys = SystemConfig::new(KvStore::load_or_default(&ctx.settings_path())?);

    let result = Launch::new(
        ctx.sympi_dir(),
        &inspector,
        &builder,
        &mut activator,
        default_managers(),
        sys,
        options,
        ctx.shell().clone(),
    )
    .run(&args.container)?;

    print!("{}", result.stdout);
    eprint!("{}", result.stderr);

    if !result.passed {
        bail!(
            "{} failed: {}",
            args.container,
            result.err.as_deref().unwrap_or("unknown error")
        );
    }
    ctx.shell().status(Status::Finished, &args.container);
    Ok(())
}
