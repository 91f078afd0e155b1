//! High-level operations.
//!
//! This module contains the implementation of sympi commands.

pub mod avail;
pub mod check;
pub mod install;
pub mod list;
pub mod run;

pub use avail::{available, Releases};
pub use check::{check_system, CheckResult};
pub use install::{install_runtime, uninstall_runtime, InstallLock};
pub use list::Inventory;
pub use run::{launcher_args, Launch, LaunchOptions};
