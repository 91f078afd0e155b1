//! Shared utilities

pub mod config;
pub mod context;
pub mod fs;
pub mod kv;
pub mod process;
pub mod shell;

pub use config::Config;
pub use context::GlobalContext;
pub use kv::KvStore;
pub use shell::{Shell, Status};
