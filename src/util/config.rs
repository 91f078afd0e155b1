//! Configuration file support for sympi.
//!
//! sympi reads two configuration files:
//! - System: `/etc/sympi/config.toml` - site-wide defaults set by administrators
//! - User: `<sympi_dir>/config.toml` - per-user overrides
//!
//! User config takes precedence over system config. Settings shared with the
//! job managers (`slurm_enabled`, `slurm_partition`) live in the key-value
//! file `sympi.conf` instead, see [`crate::util::kv`].

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::resolver::VersionOrder;

/// Location of the site-wide configuration file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/sympi/config.toml";

/// sympi configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory overrides
    pub paths: PathsConfig,

    /// Compatibility resolution settings
    pub resolver: ResolverConfig,

    /// Container runtime settings
    pub runtime: RuntimeConfig,

    /// Source build settings
    pub build: BuildConfig,

    /// Job defaults
    pub job: JobConfig,
}

/// Directory overrides; unset entries fall back to locations under the
/// sympi directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory with the `<id>.conf` download lists
    pub etc_dir: Option<PathBuf>,

    /// Directory holding the shell hand-off files (default `/tmp`)
    pub handoff_dir: Option<PathBuf>,

    /// Directory for batch scripts and job output
    pub scratch_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// How versions are ordered: "lexical" (default) or "numeric"
    pub version_order: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Container runtime executable used when none is loaded
    pub singularity_bin: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Parallel make jobs (None = number of CPUs)
    pub jobs: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// Default node count (0 = let the scheduler decide)
    pub num_nodes: Option<u32>,

    /// Default rank count (0 = let the launcher decide)
    pub num_procs: Option<u32>,

    /// Keep batch scripts and job output after a run
    #[serde(default)]
    pub keep_artifacts: bool,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.paths.etc_dir.is_some() {
            self.paths.etc_dir = other.paths.etc_dir;
        }
        if other.paths.handoff_dir.is_some() {
            self.paths.handoff_dir = other.paths.handoff_dir;
        }
        if other.paths.scratch_dir.is_some() {
            self.paths.scratch_dir = other.paths.scratch_dir;
        }

        if other.resolver.version_order.is_some() {
            self.resolver.version_order = other.resolver.version_order;
        }

        if other.runtime.singularity_bin.is_some() {
            self.runtime.singularity_bin = other.runtime.singularity_bin;
        }

        if other.build.jobs.is_some() {
            self.build.jobs = other.build.jobs;
        }

        if other.job.num_nodes.is_some() {
            self.job.num_nodes = other.job.num_nodes;
        }
        if other.job.num_procs.is_some() {
            self.job.num_procs = other.job.num_procs;
        }
        if other.job.keep_artifacts {
            self.job.keep_artifacts = true;
        }
    }

    /// Parse the configured version order; unknown values fall back to the default.
    pub fn version_order(&self) -> VersionOrder {
        match self.resolver.version_order.as_deref() {
            None => VersionOrder::default(),
            Some(s) => s.parse().unwrap_or_else(|e| {
                tracing::warn!("{}, using the default version order", e);
                VersionOrder::default()
            }),
        }
    }
}

/// Load merged configuration from the system and user locations.
///
/// Order of precedence (highest to lowest):
/// 1. User config (`<sympi_dir>/config.toml`)
/// 2. System config (`/etc/sympi/config.toml`)
/// 3. Defaults
pub fn load_config(system_path: &Path, user_path: &Path) -> Config {
    let mut config = Config::default();

    if system_path.exists() {
        config.merge(Config::load_or_default(system_path));
    }

    if user_path.exists() {
        config.merge(Config::load_or_default(user_path));
    }

    config
}
