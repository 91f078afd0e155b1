//! sympi - manage co-installed MPI implementations and container runtimes
//!
//! This crate provides the library behind the `sympi` command: discovering
//! installs, resolving the host MPI compatible with a container, activating
//! it in the invoking shell and dispatching the containerized job.

pub mod builder;
pub mod core;
pub mod env;
pub mod error;
pub mod inspect;
pub mod jobmgr;
pub mod ops;
pub mod resolver;
pub mod util;

/// Fakes and fixtures for unit tests.
#[cfg(test)]
pub mod test_support;

pub use error::{Error, Result};
pub use util::context::GlobalContext;
