//! Test doubles for the collaborators of the launch pipeline.
//!
//! - [`FakeInspector`] returns fixed container metadata
//! - [`FakeBuilder`] "installs" by creating the install tree
//! - [`FakeJobManager`] runs a shell snippet instead of a real launcher
//! - [`fake_slurm`] submits batch scripts through `sh`, honoring the output
//!   and error directives like `sbatch -W`

pub mod fixtures;

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{bail, Result};

use crate::builder::Builder;
use crate::core::{ContainerInfo, Implementation, Job, JobState, RuntimeInstall};
use crate::error::Result as CoreResult;
use crate::inspect::Inspector;
use crate::jobmgr::{JobManager, JobManagerId, Slurm, SystemConfig};
use crate::util::process::ProcessBuilder;

pub use fixtures::*;

/// Inspector returning the same metadata for every image.
#[derive(Debug, Clone)]
pub struct FakeInspector {
    info: ContainerInfo,
}

impl FakeInspector {
    pub fn new(info: ContainerInfo) -> Self {
        FakeInspector { info }
    }
}

impl Inspector for FakeInspector {
    fn inspect(&self, name: &str, image: &Path) -> CoreResult<ContainerInfo> {
        let mut info = self.info.clone();
        info.name = name.to_string();
        info.image = image.to_path_buf();
        Ok(info)
    }
}

/// Builder that creates empty install trees and records what it installed.
#[derive(Debug)]
pub struct FakeBuilder {
    base: PathBuf,
    fail: bool,
    installed: Mutex<Vec<Implementation>>,
}

impl FakeBuilder {
    pub fn new(base: &Path) -> Self {
        FakeBuilder {
            base: base.to_path_buf(),
            fail: false,
            installed: Mutex::new(Vec::new()),
        }
    }

    /// A builder whose every install fails.
    pub fn failing(base: &Path) -> Self {
        FakeBuilder {
            fail: true,
            ..Self::new(base)
        }
    }

    pub fn installed(&self) -> Vec<Implementation> {
        self.installed.lock().unwrap().clone()
    }
}

impl Builder for FakeBuilder {
    fn install(&self, implementation: &Implementation) -> Result<RuntimeInstall> {
        if self.fail {
            bail!("build of {} failed", implementation);
        }
        let install = fake_install(&self.base, &implementation.to_string());
        self.installed.lock().unwrap().push(implementation.clone());
        Ok(install)
    }

    fn uninstall(&self, install: &RuntimeInstall) -> Result<()> {
        std::fs::remove_dir_all(&install.install_dir)?;
        Ok(())
    }
}

/// Job manager with configurable detection that runs `sh -c <script>`.
#[derive(Debug, Clone)]
pub struct FakeJobManager {
    id: JobManagerId,
    detected: bool,
    script: String,
}

impl FakeJobManager {
    pub fn new(id: JobManagerId, detected: bool) -> Self {
        FakeJobManager {
            id,
            detected,
            script: "echo ok".to_string(),
        }
    }

    pub fn with_script(mut self, script: impl Into<String>) -> Self {
        self.script = script.into();
        self
    }
}

impl JobManager for FakeJobManager {
    fn id(&self) -> JobManagerId {
        self.id
    }

    fn detect(&self) -> bool {
        self.detected
    }

    fn submit(&self, job: &mut Job, _sys: &SystemConfig) -> CoreResult<ProcessBuilder> {
        job.advance(JobState::Submitted)?;
        Ok(ProcessBuilder::new("sh").arg("-c").arg(&self.script))
    }

    fn get_output(&self, job: &Job) -> String {
        job.captured().map(|c| c.stdout.clone()).unwrap_or_default()
    }

    fn get_error(&self, job: &Job) -> String {
        job.captured().map(|c| c.stderr.clone()).unwrap_or_default()
    }

    fn cleanup(&self, _job: &Job) -> CoreResult<()> {
        Ok(())
    }
}

/// Stand-in for `sbatch -W <script>`: runs the script in the foreground and
/// sends its streams to the files named by `--output`/`--error`.
const FAKE_SBATCH: &str = r#"script="$2"
out=$(sed -n 's/^#SBATCH --output=//p' "$script")
err=$(sed -n 's/^#SBATCH --error=//p' "$script")
sh "$script" >"$out" 2>"$err""#;

/// The Slurm job manager wired to [`FAKE_SBATCH`].
pub fn fake_slurm() -> Slurm {
    Slurm::new().with_submit_command("sh", ["-c", FAKE_SBATCH, "sbatch"])
}
