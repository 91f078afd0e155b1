//! Host sanity checks, run in debug mode.
//!
//! - Container runtime available (configured binary or on `PATH`)
//! - An MPI launcher reachable
//! - The sympi directory usable
//!
//! Failures are reported as warnings; none of them stop a command.

use std::path::{Path, PathBuf};

use crate::core::{discover, Namespace};
use crate::core::job::LAUNCHER;
use crate::util::process::find_executable;
use crate::util::shell::{Shell, Status};
use crate::util::GlobalContext;

/// Result of a single check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    pub message: String,
    pub path: Option<PathBuf>,
}

impl CheckResult {
    pub fn pass(name: impl Into<String>, message: impl Into<String>) -> Self {
        CheckResult {
            name: name.into(),
            passed: true,
            message: message.into(),
            path: None,
        }
    }

    pub fn fail(name: impl Into<String>, message: impl Into<String>) -> Self {
        CheckResult {
            name: name.into(),
            passed: false,
            message: message.into(),
            path: None,
        }
    }

    pub fn with_path(mut self, path: PathBuf) -> Self {
        self.path = Some(path);
        self
    }
}

fn check_executable(name: &str, program: &Path) -> CheckResult {
    let found = if program.is_absolute() {
        program.is_file().then(|| program.to_path_buf())
    } else {
        find_executable(program)
    };
    match found {
        Some(path) => CheckResult::pass(name, "found").with_path(path),
        None => CheckResult::fail(name, format!("{} not found", program.display())),
    }
}

fn check_launcher(base: &Path) -> CheckResult {
    if let Some(path) = find_executable(LAUNCHER) {
        return CheckResult::pass("mpi", "launcher on PATH").with_path(path);
    }
    match discover(base, Namespace::Mpi) {
        Ok(installs) if !installs.is_empty() => CheckResult::pass(
            "mpi",
            format!("{} install(s) managed by sympi", installs.len()),
        ),
        Ok(_) => CheckResult::fail("mpi", "no MPI launcher found and nothing installed"),
        Err(e) => CheckResult::fail("mpi", e.to_string()),
    }
}

fn check_sympi_dir(dir: &Path) -> CheckResult {
    if dir.is_dir() {
        CheckResult::pass("sympi directory", "present").with_path(dir.to_path_buf())
    } else if dir.exists() {
        CheckResult::fail("sympi directory", format!("{} is not a directory", dir.display()))
    } else {
        CheckResult::pass("sympi directory", "will be created on first install")
            .with_path(dir.to_path_buf())
    }
}

/// Run every check.
pub fn check_system(ctx: &GlobalContext) -> Vec<CheckResult> {
    vec![
        check_executable("singularity", &ctx.singularity_bin()),
        check_launcher(ctx.sympi_dir()),
        check_sympi_dir(ctx.sympi_dir()),
    ]
}

/// Print failed checks as warnings; passing checks only show up in the log.
pub fn report(results: &[CheckResult], shell: &Shell) {
    for r in results {
        if r.passed {
            tracing::debug!("check {}: {}", r.name, r.message);
        } else {
            shell.status(Status::Warning, format!("{}: {}", r.name, r.message));
        }
    }
}
