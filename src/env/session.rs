//! Identity of the interactive shell session that invoked sympi.
//!
//! sympi is started through a wrapper script by the user's shell, so the
//! shell is the parent of our parent process. Its pid keys the hand-off file.

use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};

static PPID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^PPid:\s*(\d+)\s*$").expect("valid regex"));

/// Identifier of a shell session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub u32);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Source of the session identity.
pub trait SessionIdentity {
    fn identify(&self) -> Result<SessionId>;
}

/// Reads the session identity from the process tree under `/proc`.
#[derive(Debug, Clone)]
pub struct ProcessTree {
    proc_root: PathBuf,
    parent: Option<u32>,
}

impl ProcessTree {
    /// Look up the real process tree.
    pub fn new() -> Self {
        ProcessTree {
            proc_root: PathBuf::from("/proc"),
            parent: None,
        }
    }

    /// Look up `parent` in a process tree mounted at `proc_root`.
    pub fn with_root(proc_root: impl Into<PathBuf>, parent: u32) -> Self {
        ProcessTree {
            proc_root: proc_root.into(),
            parent: Some(parent),
        }
    }

    fn parent_pid(&self) -> u32 {
        self.parent.unwrap_or_else(std::os::unix::process::parent_id)
    }
}

impl Default for ProcessTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionIdentity for ProcessTree {
    fn identify(&self) -> Result<SessionId> {
        let ppid = self.parent_pid();
        let status_file = self.proc_root.join(ppid.to_string()).join("status");
        let status = fs::read_to_string(&status_file).map_err(|e| {
            Error::Lookup(format!("failed to read {}: {}", status_file.display(), e))
        })?;

        let caps = PPID_RE.captures(&status).ok_or_else(|| {
            Error::Lookup(format!("no PPid entry in {}", status_file.display()))
        })?;
        let pppid = caps[1]
            .parse()
            .map_err(|e| Error::Lookup(format!("invalid PPid in {}: {}", status_file.display(), e)))?;

        tracing::trace!("session of parent {} is {}", ppid, pppid);
        Ok(SessionId(pppid))
    }
}

/// A session identity fixed up front.
#[derive(Debug, Clone, Copy)]
pub struct FixedSession(pub SessionId);

impl SessionIdentity for FixedSession {
    fn identify(&self) -> Result<SessionId> {
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fake_proc(status: &str) -> TempDir {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("4242");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("status"), status).unwrap();
        tmp
    }

    #[test]
    fn test_reads_grandparent() {
        let proc_root = fake_proc("Name:\tsympi.sh\nState:\tS (sleeping)\nPid:\t4242\nPPid:\t1717\n");
        let tree = ProcessTree::with_root(proc_root.path(), 4242);
        assert_eq!(tree.identify().unwrap(), SessionId(1717));
    }

    #[test]
    fn test_missing_status_is_lookup_error() {
        let tmp = TempDir::new().unwrap();
        let tree = ProcessTree::with_root(tmp.path(), 4242);
        assert!(matches!(tree.identify(), Err(Error::Lookup(_))));
    }

    #[test]
    fn test_missing_ppid_line_is_lookup_error() {
        let proc_root = fake_proc("Name:\tsympi.sh\nPid:\t4242\n");
        let tree = ProcessTree::with_root(proc_root.path(), 4242);
        assert!(matches!(tree.identify(), Err(Error::Lookup(_))));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_real_process_tree() {
        assert!(ProcessTree::new().identify().is_ok());
    }
}
