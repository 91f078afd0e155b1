//! Installing runtimes from source.
//!
//! Releases are fetched as tarballs listed in the etc directory, unpacked
//! into a temporary build directory and installed under the sympi directory
//! as `<prefix><id>-<version>`. MPI implementations use the autotools recipe;
//! Singularity ships its own `mconfig` script.

pub mod fetch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::core::{Implementation, RuntimeInstall, RUNTIME_ID};
use crate::util::fs::{ensure_dir, remove_dir_all_if_exists};
use crate::util::process::ProcessBuilder;
use crate::util::shell::{Shell, Status};
use crate::util::GlobalContext;

/// Installs and removes runtimes on the host.
pub trait Builder {
    /// Build and install `implementation`, returning the new install.
    fn install(&self, implementation: &Implementation) -> Result<RuntimeInstall>;

    /// Remove an existing install.
    fn uninstall(&self, install: &RuntimeInstall) -> Result<()>;
}

/// Build procedure of a source release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipe {
    /// `./configure --prefix`, `make`, `make install`
    Autotools,
    /// `./mconfig --prefix`, `make -C builddir`, `make -C builddir install`
    Mconfig,
}

impl Recipe {
    pub fn for_implementation(id: &str) -> Self {
        if id == RUNTIME_ID {
            Recipe::Mconfig
        } else {
            Recipe::Autotools
        }
    }

    /// Commands that build the sources in `src` and install them into `prefix`.
    pub fn commands(&self, src: &Path, prefix: &Path, jobs: usize) -> Vec<ProcessBuilder> {
        let prefix_arg = format!("--prefix={}", prefix.display());
        let jobs_arg = format!("-j{}", jobs.max(1));

        match self {
            Recipe::Autotools => vec![
                ProcessBuilder::new(src.join("configure"))
                    .arg(prefix_arg)
                    .cwd(src),
                ProcessBuilder::new("make").arg(jobs_arg).cwd(src),
                ProcessBuilder::new("make").arg("install").cwd(src),
            ],
            Recipe::Mconfig => vec![
                ProcessBuilder::new(src.join("mconfig"))
                    .arg(prefix_arg)
                    .cwd(src),
                ProcessBuilder::new("make")
                    .args(["-C", "builddir"])
                    .arg(jobs_arg)
                    .cwd(src),
                ProcessBuilder::new("make")
                    .args(["-C", "builddir", "install"])
                    .cwd(src),
            ],
        }
    }
}

/// Builds releases from the tarballs listed in the etc directory.
pub struct SourceBuilder {
    sympi_dir: PathBuf,
    etc_dir: PathBuf,
    jobs: usize,
    shell: Arc<Shell>,
}

impl SourceBuilder {
    pub fn new(ctx: &GlobalContext) -> Self {
        SourceBuilder {
            sympi_dir: ctx.sympi_dir().to_path_buf(),
            etc_dir: ctx.etc_dir(),
            jobs: ctx.build_jobs(),
            shell: Arc::clone(ctx.shell()),
        }
    }

    fn build(&self, implementation: &Implementation, install: &RuntimeInstall) -> Result<()> {
        let url = fetch::release_url(&self.etc_dir, implementation)?;

        let scratch = tempfile::Builder::new()
            .prefix("sympi_build_")
            .tempdir()
            .context("failed to create build directory")?;
        let src = fetch::fetch_and_extract(&url, scratch.path(), &self.shell)?;

        ensure_dir(&install.install_dir)?;
        let recipe = Recipe::for_implementation(&implementation.id);
        for cmd in recipe.commands(&src, &install.install_dir, self.jobs) {
            tracing::info!("running {}", cmd.display_command());
            cmd.exec_and_check()
                .with_context(|| format!("failed to build {}", implementation))?;
        }

        Ok(())
    }
}

impl Builder for SourceBuilder {
    fn install(&self, implementation: &Implementation) -> Result<RuntimeInstall> {
        let install = RuntimeInstall::new(&self.sympi_dir, implementation);
        self.shell.status(Status::Installing, implementation);

        if let Err(e) = self.build(implementation, &install) {
            if let Err(cleanup) = remove_dir_all_if_exists(&install.install_dir) {
                tracing::warn!("failed to remove partial install: {:#}", cleanup);
            }
            return Err(e);
        }

        tracing::info!("{} installed in {}", implementation, install.install_dir.display());
        Ok(install)
    }

    fn uninstall(&self, install: &RuntimeInstall) -> Result<()> {
        remove_dir_all_if_exists(&install.install_dir)
    }
}
