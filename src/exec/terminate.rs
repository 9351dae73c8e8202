// src/exec/terminate.rs

//! Liveness checks and escalating shutdown of a supervised child.
//!
//! Each child moves through
//! `Running -> GracefulSignaled -> ForceSignaled -> Reaped`. A child that
//! already exited skips straight to `Reaped` without being signalled.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::exec::child::{ChildExit, ChildProcess, StopSignal};

pub const DEFAULT_SIGINT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_SIGKILL_TIMEOUT: Duration = Duration::from_secs(1);

/// Lifecycle of one supervised child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    GracefulSignaled,
    ForceSignaled,
    Reaped,
}

/// One run of the target, exclusively owned by the supervisor.
#[derive(Debug)]
pub struct SupervisedProcess<C: ChildProcess> {
    handle: C,
    pid: Option<u32>,
    started_at: Instant,
    state: RunState,
}

impl<C: ChildProcess> SupervisedProcess<C> {
    pub fn new(handle: C) -> Self {
        let pid = handle.id();
        Self {
            handle,
            pid,
            started_at: Instant::now(),
            state: RunState::Running,
        }
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// `Some` once the child has exited on its own.
    ///
    /// A failing liveness query is treated as "gone": there is nothing left
    /// the supervisor could signal.
    pub fn exit_status(&mut self) -> Option<ChildExit> {
        match self.handle.try_exit() {
            Ok(status) => status,
            Err(err) => {
                warn!(pid = self.pid, error = %err, "liveness check failed; assuming process is gone");
                Some(ChildExit { code: None })
            }
        }
    }

    pub fn is_alive(&mut self) -> bool {
        self.exit_status().is_none()
    }
}

/// Bounded waits of the shutdown sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminationPolicy {
    /// How long to wait after the graceful signal.
    pub sigint_timeout: Duration,
    /// How long to wait after the forceful signal before a final reap.
    pub sigkill_timeout: Duration,
}

impl Default for TerminationPolicy {
    fn default() -> Self {
        Self {
            sigint_timeout: DEFAULT_SIGINT_TIMEOUT,
            sigkill_timeout: DEFAULT_SIGKILL_TIMEOUT,
        }
    }
}

/// What happened while terminating one child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminationReport {
    pub pid: Option<u32>,
    pub signals_sent: u32,
    pub exit: Option<ChildExit>,
    /// Whether the child had already exited before any signal was sent.
    pub already_exited: bool,
    /// Whether processes the child left behind had to be killed.
    pub leftovers_killed: bool,
    pub final_state: RunState,
}

impl TerminationPolicy {
    /// Run the escalation sequence to completion.
    ///
    /// Consumes the process: once this returns the child has been reaped,
    /// anything it left running has been killed, and the handle is released.
    /// Failures to signal a process that is already gone are logged and
    /// tolerated.
    pub fn terminate<C: ChildProcess>(&self, mut process: SupervisedProcess<C>) -> TerminationReport {
        let pid = process.pid;
        let mut signals_sent = 0;

        if let Some(exit) = process.exit_status() {
            warn!(pid, exit_code = ?exit.code, "process already dead");
            process.state = RunState::Reaped;
            let leftovers_killed = kill_leftovers(&mut process);
            return TerminationReport {
                pid,
                signals_sent,
                exit: Some(exit),
                already_exited: true,
                leftovers_killed,
                final_state: process.state,
            };
        }

        debug!(pid, "stopping process...");
        if send(&mut process, StopSignal::Graceful) {
            signals_sent += 1;
        }
        process.state = RunState::GracefulSignaled;

        let mut exit = wait_bounded(&mut process, self.sigint_timeout);

        if exit.is_none() {
            warn!(pid, timeout = ?self.sigint_timeout, "process has not terminated, sending SIGKILL");
            if send(&mut process, StopSignal::Forceful) {
                signals_sent += 1;
            }
            process.state = RunState::ForceSignaled;

            exit = wait_bounded(&mut process, self.sigkill_timeout);
            if exit.is_none() {
                exit = match process.handle.wait() {
                    Ok(status) => Some(status),
                    Err(err) => {
                        warn!(pid, error = %err, "failed to reap process");
                        None
                    }
                };
            }
        } else {
            debug!(pid, "process stopped");
        }

        process.state = RunState::Reaped;
        let leftovers_killed = kill_leftovers(&mut process);
        info!(
            pid,
            exit_code = ?exit.and_then(|e| e.code),
            signals_sent,
            "process terminated"
        );

        TerminationReport {
            pid,
            signals_sent,
            exit,
            already_exited: false,
            leftovers_killed,
            final_state: process.state,
        }
    }
}

fn kill_leftovers<C: ChildProcess>(process: &mut SupervisedProcess<C>) -> bool {
    match process.handle.kill_leftovers() {
        Ok(true) => {
            warn!(pid = process.pid, "killed processes left running by the child");
            true
        }
        Ok(false) => false,
        Err(err) => {
            warn!(pid = process.pid, error = %err, "could not clean up after process");
            false
        }
    }
}

/// Returns whether the signal was delivered.
fn send<C: ChildProcess>(process: &mut SupervisedProcess<C>, signal: StopSignal) -> bool {
    match process.handle.send_signal(signal) {
        Ok(()) => true,
        Err(err) => {
            debug!(pid = process.pid, ?signal, error = %err, "could not signal process; it is probably gone");
            false
        }
    }
}

fn wait_bounded<C: ChildProcess>(process: &mut SupervisedProcess<C>, timeout: Duration) -> Option<ChildExit> {
    match process.handle.wait_timeout(timeout) {
        Ok(exit) => exit,
        Err(err) => {
            warn!(pid = process.pid, error = %err, "waiting for process failed");
            process.handle.try_exit().ok().flatten()
        }
    }
}
