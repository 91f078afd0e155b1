//! sympi CLI - manage MPI and Singularity installs and run MPI containers

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use sympi::ops::check;
use sympi::util::{GlobalContext, Shell};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("sympi=trace")
    } else if cli.verbose {
        EnvFilter::new("sympi=debug")
    } else {
        EnvFilter::new("sympi=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let mut ctx = GlobalContext::new()?;
    ctx.set_verbose(cli.verbose || cli.debug);
    ctx.set_debug(cli.debug);
    ctx.set_shell(Shell::from_flags(
        cli.quiet,
        cli.verbose || cli.debug,
        cli.no_color,
    ));

    if cli.debug {
        check::report(&check::check_system(&ctx), ctx.shell());
    }

    match cli.command {
        Commands::List(args) => commands::list::execute(args, &ctx),
        Commands::Load(args) => commands::load::execute(args, &ctx),
        Commands::Unload(args) => commands::unload::execute(args, &ctx),
        Commands::Install(args) => commands::install::execute(args, &ctx),
        Commands::Uninstall(args) => commands::uninstall::execute(args, &ctx),
        Commands::Run(args) => commands::run::execute(args, &ctx),
        Commands::Avail(args) => commands::avail::execute(args, &ctx),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
