//! Global context for sympi operations.
//!
//! Provides centralized access to configuration, paths, and output.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use directories::BaseDirs;

use crate::core::RUNTIME_ID;
use crate::resolver::VersionOrder;
use crate::util::config::{load_config, Config, SYSTEM_CONFIG_PATH};
use crate::util::shell::Shell;

/// Environment variable overriding the sympi directory.
pub const SYMPI_DIR_ENV: &str = "SYMPI_DIR";

/// Where the shell wrapper puts hand-off files unless configured otherwise.
pub const DEFAULT_HANDOFF_DIR: &str = "/tmp";

/// Name of the key-value settings file shared with the job managers.
pub const SETTINGS_FILE: &str = "sympi.conf";

/// Global context containing configuration and paths.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Base directory holding installs, containers and settings (~/.sympi)
    sympi_dir: PathBuf,

    /// Merged configuration
    config: Config,

    verbose: bool,
    debug: bool,

    shell: Arc<Shell>,
}

impl GlobalContext {
    /// Create a context from `$SYMPI_DIR` or `~/.sympi`, loading the
    /// system and user configuration files.
    pub fn new() -> Result<Self> {
        let sympi_dir = match std::env::var_os(SYMPI_DIR_ENV) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => BaseDirs::new()
                .map(|b| b.home_dir().join(".sympi"))
                .context("unable to determine the home directory; set SYMPI_DIR")?,
        };

        let config = load_config(Path::new(SYSTEM_CONFIG_PATH), &sympi_dir.join("config.toml"));
        Ok(Self::with_sympi_dir(sympi_dir, config))
    }

    /// Create a context for an explicit directory and configuration.
    pub fn with_sympi_dir(sympi_dir: impl Into<PathBuf>, config: Config) -> Self {
        GlobalContext {
            sympi_dir: sympi_dir.into(),
            config,
            verbose: false,
            debug: false,
            shell: Arc::new(Shell::default()),
        }
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    pub fn set_shell(&mut self, shell: Shell) {
        self.shell = Arc::new(shell);
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    pub fn shell(&self) -> &Arc<Shell> {
        &self.shell
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Base directory of installs and containers.
    pub fn sympi_dir(&self) -> &Path {
        &self.sympi_dir
    }

    /// Directory with the `<id>.conf` download lists.
    pub fn etc_dir(&self) -> PathBuf {
        self.config
            .paths
            .etc_dir
            .clone()
            .unwrap_or_else(|| self.sympi_dir.join("etc"))
    }

    /// Directory holding the shell hand-off files.
    ///
    /// The shell wrapper creates the file at a fixed location, so `$TMPDIR`
    /// is not consulted.
    pub fn handoff_dir(&self) -> PathBuf {
        self.config
            .paths
            .handoff_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_HANDOFF_DIR))
    }

    /// Directory for batch scripts and job output.
    pub fn scratch_dir(&self) -> PathBuf {
        self.config
            .paths
            .scratch_dir
            .clone()
            .unwrap_or_else(|| self.sympi_dir.join("scratch"))
    }

    /// Path of the key-value settings file.
    pub fn settings_path(&self) -> PathBuf {
        self.sympi_dir.join(SETTINGS_FILE)
    }

    /// Path of the user configuration file.
    pub fn config_path(&self) -> PathBuf {
        self.sympi_dir.join("config.toml")
    }

    /// Container runtime executable used to inspect and exec images.
    pub fn singularity_bin(&self) -> PathBuf {
        self.config
            .runtime
            .singularity_bin
            .clone()
            .unwrap_or_else(|| PathBuf::from(RUNTIME_ID))
    }

    pub fn version_order(&self) -> VersionOrder {
        self.config.version_order()
    }

    /// Parallel make jobs for source builds.
    pub fn build_jobs(&self) -> usize {
        self.config.build.jobs.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}
