//! Environment activation through the shell hand-off file.
//!
//! A process cannot change its parent shell's environment. sympi instead
//! rewrites a per-session file with two `export` lines, and the wrapper that
//! started sympi sources it once sympi exits. The file must have been created
//! by that wrapper beforehand; its absence means the session was never
//! initialized.
//!
//! At most one install per namespace contributes directories: activating an
//! install first drops every entry of its namespace, then prepends the new
//! `bin`/`lib` directories. Untouched entries keep their relative order.

pub mod session;

pub use session::{FixedSession, ProcessTree, SessionId, SessionIdentity};

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::core::{Implementation, Namespace, RuntimeInstall};
use crate::error::{Error, Result};

/// Ordered `PATH` and `LD_LIBRARY_PATH` entries of a shell session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveEnvironment {
    pub path: Vec<String>,
    pub ld_library_path: Vec<String>,
}

impl ActiveEnvironment {
    /// Build from colon-separated values; empty items are dropped.
    pub fn from_vars(path: &str, ld_library_path: &str) -> Self {
        ActiveEnvironment {
            path: split_list(path),
            ld_library_path: split_list(ld_library_path),
        }
    }

    /// Snapshot of this process's environment, inherited from the shell.
    pub fn from_process_env() -> Self {
        let path = std::env::var("PATH").unwrap_or_default();
        let ld_library_path = std::env::var("LD_LIBRARY_PATH").unwrap_or_default();
        Self::from_vars(&path, &ld_library_path)
    }

    /// Drop every entry that belongs to an install of `namespace`.
    pub fn remove_namespace(&mut self, namespace: Namespace) {
        let prefix = namespace.prefix();
        self.path.retain(|entry| !entry.contains(prefix));
        self.ld_library_path.retain(|entry| !entry.contains(prefix));
    }

    /// Put the install's directories in front of everything else.
    pub fn prepend(&mut self, install: &RuntimeInstall) {
        self.path
            .insert(0, install.bin_dir.to_string_lossy().into_owned());
        self.ld_library_path
            .insert(0, install.lib_dir.to_string_lossy().into_owned());
    }

    /// Entries of either list that belong to `namespace`.
    pub fn entries_of(&self, namespace: Namespace) -> Vec<&str> {
        let prefix = namespace.prefix();
        self.path
            .iter()
            .chain(self.ld_library_path.iter())
            .filter(|entry| entry.contains(prefix))
            .map(String::as_str)
            .collect()
    }

    /// The install of `namespace` currently on `PATH`, if any.
    pub fn loaded(&self, namespace: Namespace) -> Option<Implementation> {
        self.path.iter().find_map(|entry| {
            Path::new(entry).components().find_map(|c| match c {
                Component::Normal(name) => RuntimeInstall::from_dir_name(
                    namespace,
                    Path::new(""),
                    &name.to_string_lossy(),
                )
                .map(|i| i.implementation()),
                _ => None,
            })
        })
    }

    /// Contents of the hand-off file.
    pub fn render(&self) -> String {
        format!(
            "export PATH={}\nexport LD_LIBRARY_PATH={}\n",
            self.path.join(":"),
            self.ld_library_path.join(":")
        )
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(':')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Manages the hand-off file of the invoking shell session.
pub struct EnvironmentActivator {
    session: Box<dyn SessionIdentity>,
    handoff_dir: PathBuf,
    env: ActiveEnvironment,
}

impl EnvironmentActivator {
    pub fn new(
        session: Box<dyn SessionIdentity>,
        handoff_dir: impl Into<PathBuf>,
        env: ActiveEnvironment,
    ) -> Self {
        EnvironmentActivator {
            session,
            handoff_dir: handoff_dir.into(),
            env,
        }
    }

    /// Identify the invoking shell session.
    pub fn identify(&self) -> Result<SessionId> {
        self.session.identify()
    }

    /// Path of the session's hand-off file.
    pub fn handoff_file(&self) -> Result<PathBuf> {
        let id = self.identify()?;
        Ok(self.handoff_dir.join(format!("sympi_{}", id)))
    }

    /// Whether the session was initialized (its hand-off file exists).
    pub fn is_initialized(&self) -> bool {
        self.handoff_file().map(|f| f.is_file()).unwrap_or(false)
    }

    /// The environment as last written.
    pub fn environment(&self) -> &ActiveEnvironment {
        &self.env
    }

    /// Make `install` the active install of `namespace`.
    pub fn load(&mut self, namespace: Namespace, install: &RuntimeInstall) -> Result<()> {
        install.validate()?;
        if install.namespace != namespace {
            return Err(Error::config(format!(
                "{} is not a {} install",
                install.implementation(),
                namespace
            )));
        }

        let mut env = self.env.clone();
        env.remove_namespace(namespace);
        env.prepend(install);
        self.write(env)?;

        tracing::info!("loaded {} {}", namespace, install.implementation());
        Ok(())
    }

    /// Deactivate whatever install of `namespace` is active.
    pub fn unload(&mut self, namespace: Namespace) -> Result<()> {
        let mut env = self.env.clone();
        env.remove_namespace(namespace);
        self.write(env)?;

        tracing::info!("unloaded {}", namespace);
        Ok(())
    }

    fn write(&mut self, env: ActiveEnvironment) -> Result<()> {
        let file = self.handoff_file()?;
        if !file.is_file() {
            return Err(Error::config(format!(
                "hand-off file {} does not exist; the shell session is not initialized, \
                 start sympi through its shell wrapper",
                file.display()
            )));
        }

        fs::write(&file, env.render()).map_err(|e| Error::io(&file, e))?;
        tracing::debug!("updated {}", file.display());

        self.env = env;
        Ok(())
    }
}
