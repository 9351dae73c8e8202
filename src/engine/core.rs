// src/engine/core.rs

//! The current-child slot and its bookkeeping.
//!
//! [`SupervisorCore`] is the only owner of the running child. Both
//! scheduling flavors go through it to launch, inspect and stop the child,
//! which is what guarantees there is never more than one child alive.

use tracing::{debug, info};

use crate::engine::SupervisorStats;
use crate::errors::Result;
use crate::exec::{ChildExit, Launcher, SupervisedProcess, TerminationPolicy, TerminationReport};
use crate::types::ChangeBatch;

pub struct SupervisorCore<L: Launcher> {
    launcher: L,
    policy: TerminationPolicy,
    current: Option<SupervisedProcess<L::Child>>,
    stats: SupervisorStats,
    exit_reported: bool,
}

impl<L: Launcher> std::fmt::Debug for SupervisorCore<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupervisorCore")
            .field("target", &self.launcher.describe())
            .field("policy", &self.policy)
            .field("running", &self.current.is_some())
            .field("stats", &self.stats)
            .finish()
    }
}

impl<L: Launcher> SupervisorCore<L> {
    pub fn new(launcher: L, policy: TerminationPolicy) -> Self {
        Self {
            launcher,
            policy,
            current: None,
            stats: SupervisorStats::default(),
            exit_reported: false,
        }
    }

    pub fn policy(&self) -> TerminationPolicy {
        self.policy
    }

    pub fn stats(&self) -> SupervisorStats {
        self.stats
    }

    pub fn restarts(&self) -> usize {
        self.stats.restarts
    }

    pub fn has_child(&self) -> bool {
        self.current.is_some()
    }

    pub fn describe(&self) -> String {
        self.launcher.describe()
    }

    /// Launch a new child into the empty slot.
    ///
    /// If a previous child is somehow still in the slot it is terminated
    /// first, so two children never overlap.
    pub fn start(&mut self, changes: Option<&ChangeBatch>) -> Result<()> {
        if let Some(stale) = self.current.take() {
            debug!(pid = stale.pid(), "slot still occupied at launch; terminating previous child");
            let report = self.policy.terminate(stale);
            self.record(report);
        }

        let child = self.launcher.launch(changes)?;
        let process = SupervisedProcess::new(child);
        debug!(pid = process.pid(), "child launched");

        self.current = Some(process);
        self.stats.launches += 1;
        self.exit_reported = false;
        Ok(())
    }

    /// Relaunch after a batch: start the new child and count the restart.
    pub fn restart(&mut self, batch: &ChangeBatch) -> Result<()> {
        self.start(Some(batch))?;
        self.stats.restarts += 1;
        Ok(())
    }

    /// Hand the current child to a termination sequence run elsewhere
    /// (e.g. on a blocking thread). Call [`record`](Self::record) or
    /// [`record_final`](Self::record_final) with the resulting report.
    pub fn take_current(&mut self) -> Option<SupervisedProcess<L::Child>> {
        self.current.take()
    }

    /// Account for a termination sequence run before a relaunch.
    pub fn record(&mut self, report: TerminationReport) {
        self.stats.terminations += 1;
        self.stats.signals_sent += report.signals_sent;
    }

    /// Account for the cleanup when supervision ends. A child that had
    /// already exited was only reaped, which is not a termination sequence.
    pub fn record_final(&mut self, report: TerminationReport) {
        if report.already_exited {
            debug!(pid = report.pid, "final child had already exited");
            self.stats.signals_sent += report.signals_sent;
        } else {
            self.record(report);
        }
    }

    /// Terminate the current child on this thread before a relaunch.
    pub fn stop_current(&mut self) {
        if let Some(process) = self.current.take() {
            let report = self.policy.terminate(process);
            self.record(report);
        }
    }

    /// Terminate or reap the current child on this thread when supervision
    /// ends.
    pub fn stop_final(&mut self) {
        if let Some(process) = self.current.take() {
            let report = self.policy.terminate(process);
            self.record_final(report);
        }
    }

    /// Liveness check of the current child: `Some` once it exited by itself.
    pub fn child_exit(&mut self) -> Option<ChildExit> {
        let process = self.current.as_mut()?;
        let exit = process.exit_status()?;
        if !self.exit_reported {
            info!(pid = process.pid(), exit_code = ?exit.code, "process exited on its own");
            self.exit_reported = true;
        }
        Some(exit)
    }
}
