//! Install namespaces - categories of exchangeable installs.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Directory prefix of container installs under the sympi directory.
pub const CONTAINER_DIR_PREFIX: &str = "mpi_container_";

/// Implementation id of the container runtime.
pub const RUNTIME_ID: &str = "singularity";

/// A logical category of installs; at most one install per namespace is
/// active in a shell session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Namespace {
    /// Message-passing runtime (Open MPI, MPICH, ...)
    Mpi,
    /// Container runtime (Singularity)
    Runtime,
}

impl Namespace {
    /// Directory-name prefix shared by every install of this namespace.
    pub fn prefix(&self) -> &'static str {
        match self {
            Namespace::Mpi => "mpi_install_",
            Namespace::Runtime => "singularity_install_",
        }
    }

    /// Human-readable label used in listings.
    pub fn label(&self) -> &'static str {
        match self {
            Namespace::Mpi => "MPI",
            Namespace::Runtime => "Singularity",
        }
    }

    /// Namespace an implementation id belongs to.
    pub fn of_implementation(id: &str) -> Self {
        if id == RUNTIME_ID {
            Namespace::Runtime
        } else {
            Namespace::Mpi
        }
    }

    pub fn all() -> [Namespace; 2] {
        [Namespace::Runtime, Namespace::Mpi]
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Namespace::Mpi => write!(f, "mpi"),
            Namespace::Runtime => write!(f, "singularity"),
        }
    }
}

impl FromStr for Namespace {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mpi" => Ok(Namespace::Mpi),
            "singularity" | "runtime" => Ok(Namespace::Runtime),
            _ => Err(Error::config(format!(
                "invalid namespace '{}'; expected 'mpi' or 'singularity'",
                s
            ))),
        }
    }
}
