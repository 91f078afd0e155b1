//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// sympi - run MPI containers with a compatible host MPI
#[derive(Parser)]
#[command(name = "sympi")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug output and check the system setup
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with_all = ["verbose", "debug"])]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the MPI and Singularity installs and the containers on the host
    List(ListArgs),

    /// Load an install into the current shell, e.g. `openmpi:4.0.2`
    Load(LoadArgs),

    /// Unload the current MPI or Singularity install
    Unload(UnloadArgs),

    /// Install an MPI implementation or Singularity from source
    Install(InstallArgs),

    /// Remove an install
    Uninstall(UninstallArgs),

    /// Run a container with a compatible host MPI
    Run(RunArgs),

    /// List the versions that can be installed
    Avail(AvailArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct ListArgs {}

#[derive(Args)]
pub struct LoadArgs {
    /// Install to load, as `<implementation>:<version>`
    pub descriptor: String,
}

#[derive(Args)]
pub struct UnloadArgs {
    /// What to unload: `mpi` or `singularity`
    pub namespace: String,
}

#[derive(Args)]
pub struct InstallArgs {
    /// Implementation to install, as `<implementation>:<version>`
    pub descriptor: String,
}

#[derive(Args)]
pub struct UninstallArgs {
    /// Implementation to remove, as `<implementation>:<version>`
    pub descriptor: String,
}

#[derive(Args)]
pub struct RunArgs {
    /// Name of the container
    pub container: String,

    /// Number of MPI ranks
    #[arg(long)]
    pub np: Option<u32>,

    /// Number of nodes
    #[arg(long)]
    pub nodes: Option<u32>,

    /// Keep the batch script and job output
    #[arg(long)]
    pub keep: bool,
}

#[derive(Args)]
pub struct AvailArgs {}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
