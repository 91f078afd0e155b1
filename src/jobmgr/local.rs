//! Local job manager: the MPI launcher runs on this host in the foreground.

use crate::core::{Job, JobState};
use crate::error::Result;
use crate::jobmgr::{JobManager, JobManagerId, SystemConfig};
use crate::util::process::ProcessBuilder;

/// Fallback of last resort; always available.
#[derive(Debug, Clone, Default)]
pub struct Local;

impl Local {
    pub fn new() -> Self {
        Local
    }
}

impl JobManager for Local {
    fn id(&self) -> JobManagerId {
        JobManagerId::Local
    }

    fn detect(&self) -> bool {
        true
    }

    fn get_config(&self, _sys: &SystemConfig) -> Option<bool> {
        Some(true)
    }

    fn set_config(&self, _sys: &mut SystemConfig) -> Result<()> {
        Ok(())
    }

    fn submit(&self, job: &mut Job, _sys: &SystemConfig) -> Result<ProcessBuilder> {
        job.host_install.validate()?;

        let launcher = ProcessBuilder::new(job.launcher())
            .args(&job.launcher_args)
            .prepend_path_var("PATH", &job.host_install.bin_dir)
            .prepend_path_var("LD_LIBRARY_PATH", &job.host_install.lib_dir);

        job.advance(JobState::Submitted)?;
        Ok(launcher)
    }

    fn get_output(&self, job: &Job) -> String {
        job.captured().map(|c| c.stdout.clone()).unwrap_or_default()
    }

    fn get_error(&self, job: &Job) -> String {
        job.captured().map(|c| c.stderr.clone()).unwrap_or_default()
    }

    fn cleanup(&self, job: &Job) -> Result<()> {
        tracing::trace!("nothing to clean up for local job {}", job.name);
        Ok(())
    }
}
