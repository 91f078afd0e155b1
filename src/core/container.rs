//! Containers stored on the host and the metadata needed to launch them.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::core::install::Implementation;
use crate::core::namespace::CONTAINER_DIR_PREFIX;
use crate::error::{Error, Result};

/// How the container gets its MPI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionModel {
    /// The host MPI install is mounted into the container.
    Bind,
    /// MPI is embedded in the image; the host MPI only starts the processes.
    Integrated,
}

impl fmt::Display for ExecutionModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionModel::Bind => write!(f, "bind"),
            ExecutionModel::Integrated => write!(f, "integrated"),
        }
    }
}

impl FromStr for ExecutionModel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "bind" => Ok(ExecutionModel::Bind),
            // Images built by older tooling label the embedded model "hybrid".
            "integrated" | "hybrid" => Ok(ExecutionModel::Integrated),
            other => Err(Error::config(format!(
                "unknown container execution model '{}'",
                other
            ))),
        }
    }
}

/// Metadata extracted from a container image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    /// Container name, as used on the command line
    pub name: String,
    /// Path to the SIF image
    pub image: PathBuf,
    /// Execution model
    pub model: ExecutionModel,
    /// MPI the image was built against
    pub mpi: Implementation,
    /// Application to run inside the container
    pub app_exe: String,
    /// Where the host MPI is mounted in bind mode
    pub mpi_dir: Option<String>,
}

/// Directory holding the container `name`.
pub fn container_dir(base: &Path, name: &str) -> PathBuf {
    base.join(format!("{}{}", CONTAINER_DIR_PREFIX, name))
}

/// Path of the image of container `name`.
pub fn image_path(base: &Path, name: &str) -> PathBuf {
    container_dir(base, name).join(format!("{}.sif", name))
}

/// Names of the containers stored under `base`, sorted.
pub fn discover_containers(base: &Path) -> Result<Vec<String>> {
    let entries = match fs::read_dir(base) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Error::io(base, e)),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(base, e))?;
        let file_name = entry.file_name();
        if let Some(name) = file_name.to_string_lossy().strip_prefix(CONTAINER_DIR_PREFIX) {
            if !name.is_empty() {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}
