// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for starting the target in a child process and
//! for stopping it again.
//!
//! - [`target`] describes what to run (shell command line or program + args).
//! - [`env`] serializes the triggering changes into `WATCHFILES_CHANGES`.
//! - [`child`] provides the `ChildProcess` trait and the real `OsChild`.
//! - [`backend`] provides the `Launcher` trait and the concrete
//!   `CommandLauncher` the supervisor uses in production, and which tests can
//!   replace with a fake implementation.
//! - [`terminate`] holds the liveness checks and the escalating
//!   SIGINT / SIGKILL shutdown sequence.

pub mod backend;
pub mod child;
pub mod env;
pub mod target;
pub mod terminate;

pub use backend::{CommandLauncher, Launcher};
pub use child::{ChildExit, ChildProcess, OsChild, StopSignal};
pub use env::{changes_env_value, CHANGES_ENV_VAR};
pub use target::Target;
pub use terminate::{RunState, SupervisedProcess, TerminationPolicy, TerminationReport};
