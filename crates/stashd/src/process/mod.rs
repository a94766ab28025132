//! Process lifecycle supervision: singleton election, daemonisation, and
//! shutdown sequencing.

mod errors;
mod guard;
pub(crate) mod launch;
pub(crate) mod shutdown;

pub use errors::LaunchError;
pub use launch::{LaunchMode, run_daemon};
pub(crate) use shutdown::ShutdownCause;

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");
pub(crate) const FOREGROUND_ENV_VAR: &str = "STASHD_FOREGROUND";
