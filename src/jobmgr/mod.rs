//! Job managers - how a job reaches the compute resources.
//!
//! A job manager either starts the MPI launcher directly (`Local`) or hands a
//! generated batch script to a scheduler (`Slurm`). Managers are tried in a
//! fixed priority order and the first one that detects its tooling is used;
//! `Local` always detects and closes the list.
//!
//! Detection never has side effects, so it can be repeated and tests can
//! substitute their own managers.

pub mod local;
pub mod slurm;

pub use local::Local;
pub use slurm::Slurm;

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use crate::core::Job;
use crate::error::{Error, Result};
use crate::util::kv::KvStore;
use crate::util::process::ProcessBuilder;

/// Identifier of a job manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobManagerId {
    Local,
    Slurm,
}

impl JobManagerId {
    /// Whether jobs go through a batch scheduler.
    pub fn is_batch(&self) -> bool {
        !matches!(self, JobManagerId::Local)
    }

    /// Key of the "enabled" flag in the shared settings store.
    pub fn enabled_key(&self) -> String {
        format!("{}_enabled", self)
    }
}

impl fmt::Display for JobManagerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobManagerId::Local => write!(f, "local"),
            JobManagerId::Slurm => write!(f, "slurm"),
        }
    }
}

/// System-wide settings job managers read and persist.
#[derive(Debug, Clone, Default)]
pub struct SystemConfig {
    /// Shared key-value settings (`sympi.conf`)
    pub settings: KvStore,
}

impl SystemConfig {
    pub fn new(settings: KvStore) -> Self {
        SystemConfig { settings }
    }
}

/// Operations every job manager provides.
pub trait JobManager {
    fn id(&self) -> JobManagerId;

    /// Whether this manager can be used on this host.
    fn detect(&self) -> bool;

    /// Recorded "enabled" flag; `None` if never recorded.
    fn get_config(&self, sys: &SystemConfig) -> Option<bool> {
        sys.settings.get_bool(&self.id().enabled_key())
    }

    /// Record this manager as enabled in the shared settings.
    fn set_config(&self, sys: &mut SystemConfig) -> Result<()> {
        let key = self.id().enabled_key();
        tracing::info!("{} detected, updating {}", self.id(), key);
        sys.settings.set(key, "true");
        sys.settings.save()
    }

    /// Prepare `job` and return the command that runs it.
    fn submit(&self, job: &mut Job, sys: &SystemConfig) -> Result<ProcessBuilder>;

    /// Standard output of the job; empty until the job produced some.
    fn get_output(&self, job: &Job) -> String;

    /// Standard error of the job; empty until the job produced some.
    fn get_error(&self, job: &Job) -> String;

    /// Remove the job's temporary files.
    fn cleanup(&self, job: &Job) -> Result<()>;
}

/// Built-in managers in priority order.
pub fn default_managers() -> Vec<Box<dyn JobManager>> {
    vec![Box::new(Slurm::new()), Box::new(Local::new())]
}

/// Pick the first manager that detects its tooling and is not disabled.
///
/// A detected manager whose flag was never recorded gets it persisted.
pub fn select<'a>(
    managers: &'a [Box<dyn JobManager>],
    sys: &mut SystemConfig,
) -> Result<&'a dyn JobManager> {
    for manager in managers {
        if !manager.detect() {
            tracing::debug!("{} not detected", manager.id());
            continue;
        }
        match manager.get_config(sys) {
            Some(false) => {
                tracing::info!("{} detected but disabled in settings, skipping", manager.id());
                continue;
            }
            Some(true) => {}
            None => {
                if let Err(e) = manager.set_config(sys) {
                    tracing::warn!("unable to record {} settings: {}", manager.id(), e);
                }
            }
        }
        tracing::debug!("using the {} job manager", manager.id());
        return Ok(manager.as_ref());
    }

    Err(Error::Scheduler("no usable job manager found".to_string()))
}

/// Read a job file, treating anything unreadable as "not produced yet".
pub(crate) fn read_job_file(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_default()
}

/// Remove job files; files that are already gone are fine.
pub(crate) fn remove_job_files(paths: &[&Path]) -> Result<()> {
    for path in paths {
        match fs::remove_file(path) {
            Ok(()) => tracing::debug!("removed {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(Error::io(path, e)),
        }
    }
    Ok(())
}
