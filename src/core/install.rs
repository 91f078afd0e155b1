//! Runtime installs on the host and their discovery.
//!
//! An install lives in `<sympi_dir>/<prefix><id>-<version>` and is rendered to
//! users as `<id>:<version>`. Installs are created by the builder and are
//! read-only to everything else.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::core::namespace::Namespace;
use crate::error::{Error, Result};

static DESCRIPTOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z][A-Za-z0-9_]*):([0-9][A-Za-z0-9._+-]*)$").expect("valid regex")
});

/// An implementation and version, e.g. `openmpi:4.0.2`.
///
/// Doubles as the query handed to the compatibility resolver.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Implementation {
    pub id: String,
    pub version: String,
}

impl Implementation {
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        Implementation {
            id: id.into(),
            version: version.into(),
        }
    }

    /// Namespace this implementation installs into.
    pub fn namespace(&self) -> Namespace {
        Namespace::of_implementation(&self.id)
    }

    /// Directory name of this implementation's install.
    pub fn dir_name(&self) -> String {
        format!("{}{}-{}", self.namespace().prefix(), self.id, self.version)
    }
}

impl fmt::Display for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.id, self.version)
    }
}

impl FromStr for Implementation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let caps = DESCRIPTOR_RE.captures(s.trim()).ok_or_else(|| {
            Error::config(format!(
                "invalid descriptor '{}'; expected '<implementation>:<version>', \
                 run 'sympi list' to see the available installations",
                s
            ))
        })?;
        Ok(Implementation::new(&caps[1], &caps[2]))
    }
}

/// A runtime installed on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeInstall {
    pub namespace: Namespace,
    pub id: String,
    pub version: String,
    pub install_dir: PathBuf,
    pub bin_dir: PathBuf,
    pub lib_dir: PathBuf,
}

impl RuntimeInstall {
    /// Describe the install of `implementation` under `base`.
    pub fn new(base: &Path, implementation: &Implementation) -> Self {
        let install_dir = base.join(implementation.dir_name());
        RuntimeInstall {
            namespace: implementation.namespace(),
            id: implementation.id.clone(),
            version: implementation.version.clone(),
            bin_dir: install_dir.join("bin"),
            lib_dir: install_dir.join("lib"),
            install_dir,
        }
    }

    /// Parse a directory entry name; `None` if it is not an install of `namespace`.
    pub fn from_dir_name(namespace: Namespace, base: &Path, name: &str) -> Option<Self> {
        let rest = name.strip_prefix(namespace.prefix())?;
        // Implementation ids never contain '-', versions may.
        let (id, version) = rest.split_once('-')?;
        if id.is_empty() || version.is_empty() {
            return None;
        }
        let implementation = Implementation::new(id, version);
        if implementation.namespace() != namespace {
            return None;
        }
        Some(RuntimeInstall::new(base, &implementation))
    }

    pub fn implementation(&self) -> Implementation {
        Implementation::new(&self.id, &self.version)
    }

    /// Path of an executable shipped in the install's bin directory.
    pub fn bin(&self, name: &str) -> PathBuf {
        self.bin_dir.join(name)
    }

    pub fn exists(&self) -> bool {
        self.install_dir.is_dir()
    }

    /// Lock file held while this install is being built or removed.
    pub fn lock_path(&self) -> PathBuf {
        let name = self
            .install_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.install_dir.with_file_name(format!(".{}.lock", name))
    }

    /// Present and not in the middle of an install or removal.
    pub fn is_ready(&self) -> bool {
        self.exists() && !self.lock_path().exists()
    }

    /// Check that every field needed for activation is set.
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() || self.version.is_empty() {
            return Err(Error::config(format!(
                "malformed install at {}: missing implementation or version",
                self.install_dir.display()
            )));
        }
        if self.bin_dir.as_os_str().is_empty() || self.lib_dir.as_os_str().is_empty() {
            return Err(Error::config(format!(
                "malformed install {}: undefined bin or lib directory",
                self.implementation()
            )));
        }
        Ok(())
    }
}

/// List the installs of `namespace` found under `base`, sorted by directory name.
///
/// A missing base directory means nothing is installed yet.
pub fn discover(base: &Path, namespace: Namespace) -> Result<Vec<RuntimeInstall>> {
    let entries = match fs::read_dir(base) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Error::io(base, e)),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(base, e))?;
        if !entry.path().is_dir() {
            continue;
        }
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();

    let installs: Vec<_> = names
        .iter()
        .filter_map(|name| RuntimeInstall::from_dir_name(namespace, base, name))
        .filter(|install| {
            let locked = install.lock_path().exists();
            if locked {
                tracing::debug!("skipping {}, install in progress", install.implementation());
            }
            !locked
        })
        .collect();

    tracing::debug!(
        "found {} {} install(s) in {}",
        installs.len(),
        namespace,
        base.display()
    );

    Ok(installs)
}
