//! Listing what is installed on the host.

use std::fmt::Write;
use std::path::Path;

use crate::core::container::discover_containers;
use crate::core::{discover, Implementation, Namespace};
use crate::env::ActiveEnvironment;
use crate::error::Result;

/// Installs and containers found under the sympi directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    pub runtimes: Vec<Implementation>,
    pub mpis: Vec<Implementation>,
    pub containers: Vec<String>,
}

impl Inventory {
    pub fn scan(base: &Path) -> Result<Self> {
        let implementations = |ns| -> Result<Vec<Implementation>> {
            Ok(discover(base, ns)?
                .iter()
                .map(|i| i.implementation())
                .collect())
        };

        Ok(Inventory {
            runtimes: implementations(Namespace::Runtime)?,
            mpis: implementations(Namespace::Mpi)?,
            containers: discover_containers(base)?,
        })
    }

    /// Human-readable listing; the install active in `env` is marked `(L)`.
    pub fn render(&self, env: &ActiveEnvironment) -> String {
        let mut out = String::new();

        for (namespace, installs) in [
            (Namespace::Runtime, &self.runtimes),
            (Namespace::Mpi, &self.mpis),
        ] {
            if installs.is_empty() {
                let _ = writeln!(out, "No {} available on the host\n", namespace.label());
                continue;
            }

            let loaded = env.loaded(namespace);
            let _ = writeln!(
                out,
                "Available {} installation(s) on the host:",
                namespace.label()
            );
            for implementation in installs {
                let marker = if loaded.as_ref() == Some(implementation) {
                    " (L)"
                } else {
                    ""
                };
                let _ = writeln!(out, "\t{}{}", implementation, marker);
            }
            out.push('\n');
        }

        if self.containers.is_empty() {
            out.push_str("No container available\n");
        } else {
            out.push_str("Available container(s):\n");
            for name in &self.containers {
                let _ = writeln!(out, "\t{}", name);
            }
        }

        out
    }
}
