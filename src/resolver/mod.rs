//! Compatibility resolution between a container's MPI and the host installs.
//!
//! The resolver is pure and deterministic - all I/O (listing installs)
//! happens before resolution and nothing on the host is modified.

pub mod version;

pub use version::VersionOrder;

use std::cmp::Ordering;

use crate::core::{Implementation, RuntimeInstall};
use crate::error::{Error, Result};

/// What the caller asks for: an implementation id and the version it was built with.
pub type CompatibilityQuery = Implementation;

/// Outcome of a resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompatibilityResult {
    /// A usable install was found.
    Resolved { install: RuntimeInstall, exact: bool },
    /// Nothing compatible is installed.
    NotFound { id: String },
}

impl CompatibilityResult {
    pub fn install(&self) -> Option<&RuntimeInstall> {
        match self {
            CompatibilityResult::Resolved { install, .. } => Some(install),
            CompatibilityResult::NotFound { .. } => None,
        }
    }

    pub fn is_exact(&self) -> bool {
        matches!(self, CompatibilityResult::Resolved { exact: true, .. })
    }
}

/// Find the install to use for `query`.
///
/// An install with the same id and version wins unconditionally. Otherwise
/// the highest install (under `order`) of the same id whose major version is
/// at least the requested major is returned.
pub fn resolve(
    query: &CompatibilityQuery,
    installs: &[RuntimeInstall],
    order: VersionOrder,
) -> CompatibilityResult {
    if let Some(install) = installs
        .iter()
        .find(|i| i.id == query.id && i.version == query.version)
    {
        return CompatibilityResult::Resolved {
            install: install.clone(),
            exact: true,
        };
    }

    let Some(requested_major) = version::major(&query.version) else {
        tracing::debug!("{} has no numeric major version, only exact matches apply", query);
        return CompatibilityResult::NotFound {
            id: query.id.clone(),
        };
    };

    let mut best: Option<&RuntimeInstall> = None;
    for install in installs.iter().filter(|i| i.id == query.id) {
        match version::major(&install.version) {
            Some(major) if major >= requested_major => {}
            _ => continue,
        }
        best = match best {
            Some(current) if order.compare(&install.version, &current.version) != Ordering::Greater => {
                Some(current)
            }
            _ => Some(install),
        };
    }

    match best {
        Some(install) => CompatibilityResult::Resolved {
            install: install.clone(),
            exact: false,
        },
        None => CompatibilityResult::NotFound {
            id: query.id.clone(),
        },
    }
}

/// Like [`resolve`], with `NotFound` reported as a compatibility error.
pub fn resolve_install(
    query: &CompatibilityQuery,
    installs: &[RuntimeInstall],
    order: VersionOrder,
) -> Result<RuntimeInstall> {
    match resolve(query, installs, order) {
        CompatibilityResult::Resolved { install, .. } => Ok(install),
        CompatibilityResult::NotFound { id } => Err(Error::Compatibility {
            id,
            version: query.version.clone(),
            reason: "no install of the same implementation with a compatible major version"
                .to_string(),
        }),
    }
}
