//! A single containerized MPI job and its dispatch state.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Output;

use crate::core::container::ContainerInfo;
use crate::core::install::RuntimeInstall;
use crate::error::{Error, Result};

/// Name of the MPI launcher shipped in every MPI install.
pub const LAUNCHER: &str = "mpirun";

/// Dispatch state of a job.
///
/// `Created -> [ScriptGenerated] -> Submitted -> {Completed | Failed}`.
/// `ScriptGenerated` only occurs with batch schedulers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Created,
    ScriptGenerated,
    Submitted,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }

    /// Whether the state machine allows moving to `next`.
    ///
    /// Re-entering the current non-terminal state is allowed so a job can be
    /// submitted again.
    pub fn can_transition_to(&self, next: JobState) -> bool {
        use JobState::*;
        match (*self, next) {
            (a, b) if a == b => !a.is_terminal(),
            (Created, ScriptGenerated) | (Created, Submitted) | (ScriptGenerated, Submitted) => {
                true
            }
            (Submitted, Completed) => true,
            (Created | ScriptGenerated | Submitted, Failed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobState::Created => "created",
            JobState::ScriptGenerated => "script-generated",
            JobState::Submitted => "submitted",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Output captured from a launcher that ran in the foreground.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
    pub code: Option<i32>,
}

/// A job created for one `run` invocation.
#[derive(Debug, Clone)]
pub struct Job {
    /// Job name, used for the script and output file names
    pub name: String,
    /// Number of nodes (0 = let the scheduler decide)
    pub num_nodes: u32,
    /// Number of MPI ranks (0 = let the launcher decide)
    pub num_procs: u32,
    /// Application started by the launcher
    pub app_binary: String,
    /// MPI install on the host that starts the job
    pub host_install: RuntimeInstall,
    /// Container the application runs in
    pub container: Option<ContainerInfo>,
    /// Arguments passed to the launcher
    pub launcher_args: Vec<String>,
    pub batch_script: PathBuf,
    pub output_path: PathBuf,
    pub error_path: PathBuf,
    state: JobState,
    captured: Option<CapturedOutput>,
}

impl Job {
    /// Create a job whose artifacts live in `scratch_dir`.
    pub fn new(name: impl Into<String>, host_install: RuntimeInstall, scratch_dir: &Path) -> Self {
        let name = name.into();
        Job {
            batch_script: scratch_dir.join(format!("{}.sh", name)),
            output_path: scratch_dir.join(format!("{}.out", name)),
            error_path: scratch_dir.join(format!("{}.err", name)),
            name,
            num_nodes: 0,
            num_procs: 0,
            app_binary: String::new(),
            host_install,
            container: None,
            launcher_args: Vec::new(),
            state: JobState::Created,
            captured: None,
        }
    }

    pub fn with_nodes(mut self, nodes: u32) -> Self {
        self.num_nodes = nodes;
        self
    }

    pub fn with_procs(mut self, procs: u32) -> Self {
        self.num_procs = procs;
        self
    }

    pub fn with_app(mut self, app: impl Into<String>) -> Self {
        self.app_binary = app.into();
        self
    }

    pub fn with_container(mut self, container: ContainerInfo) -> Self {
        self.container = Some(container);
        self
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.launcher_args = args;
        self
    }

    /// Path of the MPI launcher of the host install.
    pub fn launcher(&self) -> PathBuf {
        self.host_install.bin(LAUNCHER)
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Move the job to `next`.
    pub fn advance(&mut self, next: JobState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(Error::Scheduler(format!(
                "job {} cannot move from {} to {}",
                self.name, self.state, next
            )));
        }
        if self.state != next {
            tracing::debug!("job {}: {} -> {}", self.name, self.state, next);
        }
        self.state = next;
        Ok(())
    }

    /// Record the output of the launcher and settle the job.
    pub fn record(&mut self, output: &Output) -> Result<()> {
        self.captured = Some(CapturedOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            code: output.status.code(),
        });
        if output.status.success() {
            self.advance(JobState::Completed)
        } else {
            self.advance(JobState::Failed)
        }
    }

    pub fn captured(&self) -> Option<&CapturedOutput> {
        self.captured.as_ref()
    }
}

/// Final outcome of a launch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchResult {
    pub passed: bool,
    pub stdout: String,
    pub stderr: String,
    pub err: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::install::Implementation;

    fn install() -> RuntimeInstall {
        RuntimeInstall::new(Path::new("/opt/sympi"), &Implementation::new("openmpi", "4.0.2"))
    }

    #[test]
    fn test_job_paths() {
        let job = Job::new("hello", install(), Path::new("/scratch"));
        assert_eq!(job.batch_script, PathBuf::from("/scratch/hello.sh"));
        assert_eq!(job.output_path, PathBuf::from("/scratch/hello.out"));
        assert_eq!(job.error_path, PathBuf::from("/scratch/hello.err"));
        assert_eq!(
            job.launcher(),
            PathBuf::from("/opt/sympi/mpi_install_openmpi-4.0.2/bin/mpirun")
        );
        assert_eq!(job.state(), JobState::Created);
    }

    #[test]
    fn test_state_machine() {
        let mut job = Job::new("hello", install(), Path::new("/scratch"));
        job.advance(JobState::ScriptGenerated).unwrap();
        job.advance(JobState::Submitted).unwrap();
        job.advance(JobState::Submitted).unwrap();
        job.advance(JobState::Completed).unwrap();

        assert!(job.advance(JobState::Submitted).is_err());
        assert!(job.advance(JobState::Failed).is_err());
    }

    #[test]
    fn test_cannot_complete_before_submission() {
        assert!(!JobState::Created.can_transition_to(JobState::Completed));
        assert!(!JobState::ScriptGenerated.can_transition_to(JobState::Completed));
        assert!(!JobState::Submitted.can_transition_to(JobState::ScriptGenerated));
        assert!(JobState::Created.can_transition_to(JobState::Failed));
    }
}
