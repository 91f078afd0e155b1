//! Slurm job manager.
//!
//! Jobs are described by a generated batch script and submitted with
//! `sbatch -W`, which blocks until the job has finished. Output and error
//! streams end up in files next to the script.

use std::fmt::Write as _;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::core::{Job, JobState};
use crate::error::{Error, Result};
use crate::jobmgr::{read_job_file, remove_job_files, JobManager, JobManagerId, SystemConfig};
use crate::util::process::{find_executable, ProcessBuilder};

/// Settings key of the partition jobs are submitted to.
pub const SLURM_PARTITION_KEY: &str = "slurm_partition";

const DIRECTIVE: &str = "#SBATCH";

/// Submits jobs through `sbatch`.
#[derive(Debug, Clone)]
pub struct Slurm {
    submit_bin: PathBuf,
    /// Arguments placed before `-W <script>`
    submit_args: Vec<String>,
}

impl Slurm {
    pub fn new() -> Self {
        Slurm {
            submit_bin: PathBuf::from("sbatch"),
            submit_args: Vec::new(),
        }
    }

    /// Submit through `program` instead of `sbatch`.
    pub fn with_submit_command<I, S>(mut self, program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.submit_bin = program.into();
        self.submit_args = args.into_iter().map(Into::into).collect();
        self
    }

    fn check_job(job: &Job) -> Result<()> {
        if job.host_install.install_dir.as_os_str().is_empty() {
            return Err(Error::config(format!(
                "job {} has no host MPI install",
                job.name
            )));
        }
        if job.app_binary.is_empty() {
            return Err(Error::config(format!("job {} has no application", job.name)));
        }
        let paths = [&job.batch_script, &job.output_path, &job.error_path];
        if paths.iter().any(|p| p.as_os_str().is_empty()) {
            return Err(Error::config(format!(
                "job {} has no scratch location",
                job.name
            )));
        }
        Ok(())
    }
}

impl Default for Slurm {
    fn default() -> Self {
        Self::new()
    }
}

/// Contents of the batch script for `job`.
pub fn render_script(job: &Job, partition: Option<&str>) -> String {
    let mut script = String::from("#!/bin/bash\n");

    if let Some(partition) = partition.filter(|p| !p.is_empty()) {
        let _ = writeln!(script, "{} --partition={}", DIRECTIVE, partition);
    }
    if job.num_nodes > 0 {
        let _ = writeln!(script, "{} --nodes={}", DIRECTIVE, job.num_nodes);
    }
    if job.num_procs > 0 {
        let _ = writeln!(script, "{} --ntasks={}", DIRECTIVE, job.num_procs);
    }
    let _ = writeln!(script, "{} --error={}", DIRECTIVE, job.error_path.display());
    let _ = writeln!(script, "{} --output={}", DIRECTIVE, job.output_path.display());

    script.push('\n');
    let _ = writeln!(
        script,
        "export PATH={}:$PATH",
        job.host_install.bin_dir.display()
    );
    let _ = writeln!(
        script,
        "export LD_LIBRARY_PATH={}:$LD_LIBRARY_PATH",
        job.host_install.lib_dir.display()
    );
    script.push('\n');

    let launcher = ProcessBuilder::new(job.launcher()).args(&job.launcher_args);
    script.push_str(&launcher.display_command());
    script.push('\n');

    script
}

/// Write `script` to `path` unless a script is already there.
///
/// The contents are staged in a temporary file next to `path` and linked into
/// place without replacing anything, so a failed write leaves no truncated
/// script behind. Returns whether the script was written.
fn write_script(path: &Path, script: &str) -> Result<bool> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut staged = tempfile::Builder::new()
        .prefix(".sbatch")
        .tempfile_in(dir)
        .map_err(|e| Error::io(dir, e))?;
    staged
        .write_all(script.as_bytes())
        .map_err(|e| Error::io(staged.path(), e))?;

    match staged.persist_noclobber(path) {
        Ok(_) => Ok(true),
        Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(Error::io(path, e.error)),
    }
}

impl JobManager for Slurm {
    fn id(&self) -> JobManagerId {
        JobManagerId::Slurm
    }

    fn detect(&self) -> bool {
        find_executable(&self.submit_bin).is_some()
    }

    fn submit(&self, job: &mut Job, sys: &SystemConfig) -> Result<ProcessBuilder> {
        Self::check_job(job)?;

        let script = render_script(job, sys.settings.get(SLURM_PARTITION_KEY));
        if write_script(&job.batch_script, &script)? {
            tracing::debug!("wrote batch script {}", job.batch_script.display());
        } else {
            tracing::info!(
                "batch script {} already exists, keeping it",
                job.batch_script.display()
            );
        }

        if job.state() == JobState::Created {
            job.advance(JobState::ScriptGenerated)?;
        }
        job.advance(JobState::Submitted)?;

        Ok(ProcessBuilder::new(&self.submit_bin)
            .args(&self.submit_args)
            .arg("-W")
            .arg(&job.batch_script))
    }

    fn get_output(&self, job: &Job) -> String {
        read_job_file(&job.output_path)
    }

    fn get_error(&self, job: &Job) -> String {
        read_job_file(&job.error_path)
    }

    fn cleanup(&self, job: &Job) -> Result<()> {
        remove_job_files(&[&job.batch_script, &job.output_path, &job.error_path])
    }
}
