//! Core data structures for sympi.
//!
//! - Namespaces and their directory prefixes
//! - Runtime installs and their discovery on the host
//! - Container metadata
//! - Jobs and launch results

pub mod container;
pub mod install;
pub mod job;
pub mod namespace;

pub use container::{ContainerInfo, ExecutionModel};
pub use install::{discover, Implementation, RuntimeInstall};
pub use job::{CapturedOutput, Job, JobState, LaunchResult};
pub use namespace::{Namespace, RUNTIME_ID};
