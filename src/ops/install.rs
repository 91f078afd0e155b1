//! Installing and removing runtimes under the sympi directory.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::builder::Builder;
use crate::core::{Implementation, RuntimeInstall};
use crate::error::Error;
use crate::util::shell::{Shell, Status};

/// Exclusive claim on installing one version.
///
/// Held while a build runs; a second install of the same version fails fast
/// instead of racing. The lock file is removed on drop.
#[derive(Debug)]
pub struct InstallLock {
    path: PathBuf,
}

impl InstallLock {
    /// Path of the lock file for `implementation`.
    pub fn path_for(base: &Path, implementation: &Implementation) -> PathBuf {
        RuntimeInstall::new(base, implementation).lock_path()
    }

    pub fn acquire(base: &Path, implementation: &Implementation) -> crate::Result<Self> {
        fs::create_dir_all(base).map_err(|e| Error::io(base, e))?;

        let path = Self::path_for(base, implementation);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                // Owner pid, for whoever finds a stale lock.
                let _ = writeln!(file, "{}", std::process::id());
                tracing::debug!("acquired {}", path.display());
                Ok(InstallLock { path })
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(Error::config(format!(
                "{} is already being installed (remove {} if no install is running)",
                implementation,
                path.display()
            ))),
            Err(e) => Err(Error::io(&path, e)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstallLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!("failed to remove {}: {}", self.path.display(), e);
        }
    }
}

/// Install `implementation` unless it is already present.
///
/// The lock is taken before looking at the install directory, so a build
/// running elsewhere is never mistaken for a finished install.
pub fn install_runtime(
    base: &Path,
    implementation: &Implementation,
    builder: &dyn Builder,
    shell: &Shell,
) -> Result<RuntimeInstall> {
    let _lock = InstallLock::acquire(base, implementation)?;

    let existing = RuntimeInstall::new(base, implementation);
    if existing.exists() {
        shell.status(Status::Skipped, format!("{} is already installed", implementation));
        return Ok(existing);
    }

    let install = builder.install(implementation)?;
    shell.status(Status::Installed, implementation);
    Ok(install)
}

/// Remove the install of `implementation`.
pub fn uninstall_runtime(
    base: &Path,
    implementation: &Implementation,
    builder: &dyn Builder,
    shell: &Shell,
) -> Result<()> {
    let install = RuntimeInstall::new(base, implementation);
    if !install.is_ready() {
        return Err(Error::not_found("install", implementation.to_string()).into());
    }

    let _lock = InstallLock::acquire(base, implementation)?;
    builder.uninstall(&install)?;
    shell.status(Status::Removed, implementation);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeBuilder;
    use tempfile::TempDir;

    fn quiet() -> Shell {
        Shell::from_flags(true, false, true)
    }

    #[test]
    fn test_lock_is_exclusive_and_released() {
        let tmp = TempDir::new().unwrap();
        let imp = Implementation::new("openmpi", "4.0.2");

        let lock = InstallLock::acquire(tmp.path(), &imp).unwrap();
        assert!(lock
            .path()
            .ends_with(".mpi_install_openmpi-4.0.2.lock"));
        assert!(matches!(
            InstallLock::acquire(tmp.path(), &imp),
            Err(Error::Configuration(_))
        ));

        // Other versions are independent.
        InstallLock::acquire(tmp.path(), &Implementation::new("openmpi", "4.0.1")).unwrap();

        let path = lock.path().to_path_buf();
        drop(lock);
        assert!(!path.exists());
        InstallLock::acquire(tmp.path(), &imp).unwrap();
    }

    #[test]
    fn test_install_runtime() {
        let tmp = TempDir::new().unwrap();
        let builder = FakeBuilder::new(tmp.path());
        let imp = Implementation::new("mpich", "3.3.2");

        let install = install_runtime(tmp.path(), &imp, &builder, &quiet()).unwrap();
        assert!(install.exists());
        assert_eq!(builder.installed(), vec![imp.clone()]);
        assert!(!InstallLock::path_for(tmp.path(), &imp).exists());

        // Second install is a no-op.
        install_runtime(tmp.path(), &imp, &builder, &quiet()).unwrap();
        assert_eq!(builder.installed().len(), 1);
    }

    #[test]
    fn test_install_while_locked_fails_fast() {
        let tmp = TempDir::new().unwrap();
        let builder = FakeBuilder::new(tmp.path());
        let imp = Implementation::new("openmpi", "4.0.2");

        // A build in progress elsewhere: lock held, install dir half populated.
        let lock = InstallLock::acquire(tmp.path(), &imp).unwrap();
        fs::create_dir_all(RuntimeInstall::new(tmp.path(), &imp).bin_dir).unwrap();

        let err = install_runtime(tmp.path(), &imp, &builder, &quiet()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::Configuration(_))
        ));
        assert!(builder.installed().is_empty());

        drop(lock);
        let install = install_runtime(tmp.path(), &imp, &builder, &quiet()).unwrap();
        assert!(install.is_ready());
        assert!(builder.installed().is_empty());
    }

    #[test]
    fn test_install_failure_releases_lock() {
        let tmp = TempDir::new().unwrap();
        let builder = FakeBuilder::failing(tmp.path());
        let imp = Implementation::new("openmpi", "4.0.2");

        assert!(install_runtime(tmp.path(), &imp, &builder, &quiet()).is_err());
        assert!(!InstallLock::path_for(tmp.path(), &imp).exists());
    }

    #[test]
    fn test_uninstall_runtime() {
        let tmp = TempDir::new().unwrap();
        let builder = FakeBuilder::new(tmp.path());
        let imp = Implementation::new("singularity", "3.5.3");

        let err = uninstall_runtime(tmp.path(), &imp, &builder, &quiet()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::NotFound { .. })
        ));

        let install = install_runtime(tmp.path(), &imp, &builder, &quiet()).unwrap();
        uninstall_runtime(tmp.path(), &imp, &builder, &quiet()).unwrap();
        assert!(!install.exists());
    }
}
