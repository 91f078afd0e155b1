//! Listing the releases that can be installed.

use std::fmt::Write;
use std::path::Path;

use crate::builder::fetch::release_list;
use crate::core::{Implementation, RUNTIME_ID};
use crate::error::{Error, Result};
use crate::util::kv::KvStore;

/// Implementations with download lists, in display order.
pub const KNOWN_IMPLEMENTATIONS: [(&str, &str); 3] = [
    (RUNTIME_ID, "Singularity"),
    ("openmpi", "Open MPI"),
    ("mpich", "MPICH"),
];

/// Installable versions of one implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Releases {
    pub label: &'static str,
    pub versions: Vec<Implementation>,
}

/// Read the download lists in `etc_dir`.
///
/// Implementations without a list are skipped; at least one list must exist.
pub fn available(etc_dir: &Path) -> Result<Vec<Releases>> {
    let mut all = Vec::new();
    for (id, label) in KNOWN_IMPLEMENTATIONS {
        let list = release_list(etc_dir, id);
        let store = match KvStore::load(&list) {
            Ok(store) => store,
            Err(Error::NotFound { .. }) => {
                tracing::debug!("no release list at {}", list.display());
                continue;
            }
            Err(e) => return Err(e),
        };
        all.push(Releases {
            label,
            versions: store.keys().map(|v| Implementation::new(id, v)).collect(),
        });
    }

    if all.is_empty() {
        return Err(Error::not_found(
            "release lists",
            etc_dir.display().to_string(),
        ));
    }
    Ok(all)
}

pub fn render(releases: &[Releases]) -> String {
    let mut out = String::new();
    for r in releases {
        let _ = writeln!(out, "The following versions of {} can be installed:", r.label);
        for v in &r.versions {
            let _ = writeln!(out, "\t{}", v);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_available() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("openmpi.conf"),
            "4.0.2 = https://example.com/openmpi-4.0.2.tar.gz\n\
             3.1.5 = https://example.com/openmpi-3.1.5.tar.gz\n",
        )
        .unwrap();
        fs::write(
            tmp.path().join("singularity.conf"),
            "3.5.3 = https://example.com/singularity-3.5.3.tar.gz\n",
        )
        .unwrap();

        let releases = available(tmp.path()).unwrap();
        assert_eq!(
            render(&releases),
            "The following versions of Singularity can be installed:\n\
             \tsingularity:3.5.3\n\
             The following versions of Open MPI can be installed:\n\
             \topenmpi:4.0.2\n\
             \topenmpi:3.1.5\n"
        );
    }

    #[test]
    fn test_no_lists() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(available(tmp.path()), Err(Error::NotFound { .. })));
    }
}
