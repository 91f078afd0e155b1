//! Container metadata extraction.
//!
//! Images built for sympi carry labels describing the MPI they were built
//! against and how the application should be started:
//!
//! | label                | meaning                                   |
//! |----------------------|-------------------------------------------|
//! | `MPI_Implementation` | MPI implementation id (`openmpi`, `mpich`) |
//! | `MPI_Version`        | MPI version                               |
//! | `Model`              | `bind` or `integrated` (`hybrid`)         |
//! | `App_exe`            | application path inside the image         |
//! | `MPI_Directory`      | mount point of the host MPI (bind only)   |

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::core::{ContainerInfo, ExecutionModel, Implementation};
use crate::error::{Error, Result};
use crate::util::process::ProcessBuilder;

pub const LABEL_MPI_IMPLEMENTATION: &str = "MPI_Implementation";
pub const LABEL_MPI_VERSION: &str = "MPI_Version";
pub const LABEL_MODEL: &str = "Model";
pub const LABEL_APP_EXE: &str = "App_exe";
pub const LABEL_MPI_DIRECTORY: &str = "MPI_Directory";

/// Reads launch metadata from a container image.
pub trait Inspector {
    fn inspect(&self, name: &str, image: &Path) -> Result<ContainerInfo>;
}

/// Inspector backed by `singularity inspect --json`.
#[derive(Debug, Clone)]
pub struct SingularityInspector {
    singularity: PathBuf,
}

impl SingularityInspector {
    pub fn new(singularity: impl Into<PathBuf>) -> Self {
        SingularityInspector {
            singularity: singularity.into(),
        }
    }
}

impl Inspector for SingularityInspector {
    fn inspect(&self, name: &str, image: &Path) -> Result<ContainerInfo> {
        let cmd = ProcessBuilder::new(&self.singularity)
            .args(["inspect", "--json"])
            .arg(image);
        let output = cmd
            .exec_and_check()
            .map_err(|e| Error::config(format!("failed to inspect {}: {:#}", image.display(), e)))?;

        let labels = parse_labels(&String::from_utf8_lossy(&output.stdout))?;
        container_info(name, image, &labels)
    }
}

#[derive(Debug, Deserialize)]
struct InspectOutput {
    data: Option<InspectData>,
    labels: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct InspectData {
    attributes: InspectAttributes,
}

#[derive(Debug, Deserialize)]
struct InspectAttributes {
    #[serde(default)]
    labels: BTreeMap<String, String>,
}

/// Extract the label map from `inspect --json` output.
///
/// Current runtimes nest labels under `data.attributes.labels`; older ones
/// print them at the top level.
pub fn parse_labels(json: &str) -> Result<BTreeMap<String, String>> {
    let output: InspectOutput = serde_json::from_str(json)
        .map_err(|e| Error::config(format!("invalid container metadata: {}", e)))?;

    match (output.data, output.labels) {
        (Some(data), _) => Ok(data.attributes.labels),
        (None, Some(labels)) => Ok(labels),
        (None, None) => Err(Error::config("container metadata has no labels")),
    }
}

/// Build a [`ContainerInfo`] from image labels.
pub fn container_info(
    name: &str,
    image: &Path,
    labels: &BTreeMap<String, String>,
) -> Result<ContainerInfo> {
    let label = |key: &str| -> Result<String> {
        labels
            .get(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                Error::config(format!(
                    "container {} has no {} label",
                    image.display(),
                    key
                ))
            })
    };

    let mpi = Implementation::new(label(LABEL_MPI_IMPLEMENTATION)?, label(LABEL_MPI_VERSION)?);
    let model: ExecutionModel = label(LABEL_MODEL)?.parse()?;
    let app_exe = label(LABEL_APP_EXE)?;
    let mpi_dir = label(LABEL_MPI_DIRECTORY).ok();

    if model == ExecutionModel::Bind && mpi_dir.is_none() {
        return Err(Error::config(format!(
            "container {} uses the bind model but has no {} label",
            image.display(),
            LABEL_MPI_DIRECTORY
        )));
    }

    tracing::debug!("{} is based on {} ({} model)", name, mpi, model);

    Ok(ContainerInfo {
        name: name.to_string(),
        image: image.to_path_buf(),
        model,
        mpi,
        app_exe,
        mpi_dir,
    })
}
