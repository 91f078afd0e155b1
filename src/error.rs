//! Tagged error type shared by the core components.
//!
//! Every core operation returns one of these kinds to the top-level
//! dispatcher, which logs it and exits non-zero. Nothing in the core retries.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result alias for core operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error kinds surfaced by sympi.
#[derive(Debug, Error)]
pub enum Error {
    /// A file, image or install is missing.
    #[error("{what} not found: {name}")]
    NotFound { what: &'static str, name: String },

    /// The session identity could not be determined.
    #[error("unable to identify the shell session: {0}")]
    Lookup(String),

    /// Malformed descriptor or missing prerequisite.
    #[error("{0}")]
    Configuration(String),

    /// No compatible install and the on-demand install did not fix it.
    #[error("no compatible {id} for version {version}: {reason}")]
    Compatibility {
        id: String,
        version: String,
        reason: String,
    },

    /// Submission binary missing or the scheduler reported a failure.
    #[error("scheduler error: {0}")]
    Scheduler(String),

    /// Underlying file read/write failure.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub fn not_found(what: &'static str, name: impl Into<String>) -> Self {
        Error::NotFound {
            what,
            name: name.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }

    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Error::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Short tag naming the error kind, used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::NotFound { .. } => "not-found",
            Error::Lookup(_) => "lookup",
            Error::Configuration(_) => "configuration",
            Error::Compatibility { .. } => "compatibility",
            Error::Scheduler(_) => "scheduler",
            Error::Io { .. } => "io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = Error::not_found("container image", "/tmp/x.sif");
        assert_eq!(err.to_string(), "container image not found: /tmp/x.sif");
        assert_eq!(err.kind(), "not-found");

        let err = Error::Compatibility {
            id: "openmpi".to_string(),
            version: "4.0.0".to_string(),
            reason: "nothing installed".to_string(),
        };
        assert!(err.to_string().contains("openmpi"));
        assert_eq!(err.kind(), "compatibility");
    }

    #[test]
    fn test_io_error_keeps_path() {
        let err = Error::io("/nope", io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(err.to_string().contains("/nope"));
        assert_eq!(err.kind(), "io");
    }
}
