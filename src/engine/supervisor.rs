// src/engine/supervisor.rs

use tracing::{debug, info};

use crate::engine::core::SupervisorCore;
use crate::engine::{ReloadCallback, RunOutcome, ShutdownFlag, SupervisorOptions, SupervisorStats};
use crate::errors::{Result, WatchrunError};
use crate::exec::Launcher;
use crate::types::ChangeBatch;
use crate::watch::{ChangeSource, Collected, Debouncer};

/// Restarts a child process whenever the change source reports changes.
///
/// One supervisor runs at most one child at a time. Use
/// [`run_blocking`](Self::run_blocking) to supervise on the calling thread or
/// [`run_async`](Self::run_async) to supervise cooperatively on tokio.
pub struct Supervisor<S: ChangeSource, L: Launcher> {
    pub(crate) source: S,
    pub(crate) debouncer: Debouncer,
    pub(crate) core: SupervisorCore<L>,
    pub(crate) options: SupervisorOptions,
    pub(crate) shutdown: ShutdownFlag,
}

impl<S: ChangeSource, L: Launcher> std::fmt::Debug for Supervisor<S, L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("core", &self.core)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<S: ChangeSource, L: Launcher> Supervisor<S, L> {
    pub fn new(source: S, launcher: L, options: SupervisorOptions) -> Self {
        Self {
            source,
            debouncer: Debouncer::new(options.debounce),
            core: SupervisorCore::new(launcher, options.termination),
            options,
            shutdown: ShutdownFlag::new(),
        }
    }

    /// Use an existing flag, e.g. one a signal handler already holds.
    pub fn with_shutdown(mut self, shutdown: ShutdownFlag) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Flag that stops the supervisor at its next step boundary.
    pub fn shutdown_handle(&self) -> ShutdownFlag {
        self.shutdown.clone()
    }

    pub fn stats(&self) -> SupervisorStats {
        self.core.stats()
    }

    /// Supervise on the calling thread until interrupted, until the child
    /// exits on its own, or until an error occurs.
    ///
    /// The callback runs inline after the old child is stopped and before the
    /// new one starts. Whatever happens, no child is left running when this
    /// returns. A failing callback aborts supervision without relaunching.
    pub fn run_blocking<C: ReloadCallback>(&mut self, mut callback: C) -> Result<RunOutcome> {
        info!(command = %self.core.describe(), "supervisor started (blocking)");

        self.core.start(None)?;
        let result = self.blocking_loop(&mut callback);
        self.core.stop_final();

        self.finish(result)
    }

    fn blocking_loop<C: ReloadCallback>(&mut self, callback: &mut C) -> Result<RunOutcome> {
        let timeout = self.options.liveness_timeout();
        loop {
            let batch = match self
                .debouncer
                .collect(&mut self.source, timeout, &self.shutdown)?
            {
                Collected::Interrupted => return Ok(self.interrupted()),
                Collected::Batch(batch) => batch,
            };

            if batch.is_empty() {
                if let Some(outcome) = self.check_child_exit() {
                    return Ok(outcome);
                }
                continue;
            }

            log_reload(&batch);
            self.core.stop_current();
            callback
                .on_reload(&batch)
                .map_err(WatchrunError::CallbackError)?;
            self.core.restart(&batch)?;
        }
    }

    pub(crate) fn check_child_exit(&mut self) -> Option<RunOutcome> {
        let exit = self.core.child_exit()?;
        if !self.options.exit_on_child_exit {
            return None;
        }
        Some(RunOutcome::ChildExited {
            exit_code: exit.code,
            restarts: self.core.restarts(),
        })
    }

    pub(crate) fn interrupted(&self) -> RunOutcome {
        debug!("shutdown requested");
        RunOutcome::Interrupted {
            restarts: self.core.restarts(),
        }
    }

    pub(crate) fn finish(&self, result: Result<RunOutcome>) -> Result<RunOutcome> {
        let stats = self.core.stats();
        info!(
            launches = stats.launches,
            restarts = stats.restarts,
            terminations = stats.terminations,
            signals_sent = stats.signals_sent,
            "supervisor stopped"
        );
        result
    }
}

pub(crate) fn log_reload(batch: &ChangeBatch) {
    info!("{} files changed, reloading", batch.len());
    for change in batch {
        debug!(kind = %change.kind, path = %change.path.display(), "change");
    }
}
