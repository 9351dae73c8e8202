// src/engine/mod.rs

//! Supervision engine for watchrun.
//!
//! This module ties together:
//! - the change source and debouncer (waiting for the next batch)
//! - the launcher and termination controller (the single current child)
//! - the user's reload callback
//! - shutdown requests (e.g. Ctrl-C)
//!
//! The state shared by both scheduling flavors (the current-child slot and
//! the counters) lives in [`core`]. [`supervisor`] drives it on the calling
//! thread; [`runtime`] drives it cooperatively on tokio.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::exec::TerminationPolicy;
use crate::watch::DebounceSettings;

pub mod callback;
pub mod core;
pub mod runtime;
pub mod supervisor;

pub use callback::{AsyncReloadCallback, CallbackFuture, NoCallback, ReloadCallback};
pub use self::core::SupervisorCore;
pub use supervisor::Supervisor;

/// Cloneable stop request shared between the supervisor and whoever may
/// want to stop it (signal handlers, tests, change sources).
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// How a supervision run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The child exited on its own while no changes were pending.
    ChildExited {
        exit_code: Option<i32>,
        restarts: usize,
    },
    /// Supervision was stopped from outside.
    Interrupted { restarts: usize },
}

impl RunOutcome {
    pub fn restarts(&self) -> usize {
        match *self {
            RunOutcome::ChildExited { restarts, .. } | RunOutcome::Interrupted { restarts } => {
                restarts
            }
        }
    }

    /// Exit code of a self-terminated child; `None` when interrupted or when
    /// the platform reported no code.
    pub fn exit_code(&self) -> Option<i32> {
        match *self {
            RunOutcome::ChildExited { exit_code, .. } => exit_code,
            RunOutcome::Interrupted { .. } => None,
        }
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, RunOutcome::Interrupted { .. })
    }
}

/// Counters maintained by [`SupervisorCore`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SupervisorStats {
    pub launches: usize,
    pub restarts: usize,
    /// Termination sequences run: one per restart (even when the old child
    /// was already dead), plus one at the end if the last child was alive.
    pub terminations: usize,
    pub signals_sent: u32,
}

/// Knobs of one supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorOptions {
    pub debounce: DebounceSettings,
    /// How long to wait for changes before re-checking the child's liveness.
    /// `None` uses the debounce window.
    pub timeout: Option<Duration>,
    pub termination: TerminationPolicy,
    /// Stop supervising once the child exits on its own. When false, a dead
    /// child simply stays down until the next change relaunches it.
    pub exit_on_child_exit: bool,
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            debounce: DebounceSettings::default(),
            timeout: None,
            termination: TerminationPolicy::default(),
            exit_on_child_exit: true,
        }
    }
}

impl SupervisorOptions {
    pub fn liveness_timeout(&self) -> Duration {
        self.timeout.unwrap_or(self.debounce.debounce)
    }
}
