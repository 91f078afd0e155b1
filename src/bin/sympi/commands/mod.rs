//! Command implementations

pub mod avail;
pub mod completions;
pub mod install;
pub mod list;
pub mod load;
pub mod run;
pub mod uninstall;
pub mod unload;

use sympi::env::{ActiveEnvironment, EnvironmentActivator, ProcessTree};
use sympi::util::GlobalContext;

/// Activator for the shell session that started sympi.
pub(crate) fn session_activator(ctx: &GlobalContext) -> EnvironmentActivator {
    EnvironmentActivator::new(
        Box::new(ProcessTree::new()),
        ctx.handoff_dir(),
        ActiveEnvironment::from_process_env(),
    )
}
