// src/exec/child.rs

//! Handle abstraction over a running child process.

use std::io;
use std::process::Child;
use std::time::{Duration, Instant};

use tracing::debug;

/// How often [`OsChild::wait_timeout`] re-checks the child.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Observed termination of a child.
///
/// `code` is `None` when the platform reports no exit code, e.g. when the
/// child was killed by a signal on unix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildExit {
    pub code: Option<i32>,
}

impl From<std::process::ExitStatus> for ChildExit {
    fn from(status: std::process::ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

/// Signal used by the termination controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopSignal {
    /// Cooperative interrupt (SIGINT on unix).
    Graceful,
    /// Unconditional kill (SIGKILL on unix).
    Forceful,
}

/// Operations the supervisor needs from a child process.
///
/// Production uses [`OsChild`]; tests provide fakes that record signals
/// instead of sending them.
pub trait ChildProcess: Send {
    fn id(&self) -> Option<u32>;

    /// Non-blocking liveness check: `Ok(None)` while the child is running.
    fn try_exit(&mut self) -> io::Result<Option<ChildExit>>;

    fn send_signal(&mut self, signal: StopSignal) -> io::Result<()>;

    /// Wait at most `timeout` for the child to exit.
    fn wait_timeout(&mut self, timeout: Duration) -> io::Result<Option<ChildExit>>;

    /// Wait for the child to exit.
    fn wait(&mut self) -> io::Result<ChildExit>;

    /// Kill whatever the child left running after it was reaped, e.g. the
    /// background jobs of a shell. Returns whether anything was left.
    fn kill_leftovers(&mut self) -> io::Result<bool> {
        Ok(false)
    }
}

/// A real OS process spawned through `std::process::Command`.
#[derive(Debug)]
pub struct OsChild {
    child: Child,
    /// The child leads its own process group; signals go to the whole group.
    group: bool,
}

impl OsChild {
    pub fn new(child: Child) -> Self {
        Self {
            child,
            group: false,
        }
    }

    /// Wrap a child spawned with `process_group(0)`. Only meaningful on unix.
    pub fn group_leader(child: Child) -> Self {
        Self {
            child,
            group: cfg!(unix),
        }
    }
}

impl ChildProcess for OsChild {
    fn id(&self) -> Option<u32> {
        Some(self.child.id())
    }

    fn try_exit(&mut self) -> io::Result<Option<ChildExit>> {
        Ok(self.child.try_wait()?.map(ChildExit::from))
    }

    fn send_signal(&mut self, signal: StopSignal) -> io::Result<()> {
        deliver(&mut self.child, self.group, signal)
    }

    fn wait_timeout(&mut self, timeout: Duration) -> io::Result<Option<ChildExit>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = self.child.try_wait()? {
                return Ok(Some(status.into()));
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            std::thread::sleep(WAIT_POLL_INTERVAL.min(deadline - now));
        }
    }

    fn wait(&mut self) -> io::Result<ChildExit> {
        Ok(self.child.wait()?.into())
    }

    fn kill_leftovers(&mut self) -> io::Result<bool> {
        if !self.group {
            return Ok(false);
        }
        sweep_group(self.child.id())
    }
}

#[cfg(unix)]
fn deliver(child: &mut Child, group: bool, signal: StopSignal) -> io::Result<()> {
    use nix::sys::signal::{kill, killpg, Signal};
    use nix::unistd::Pid;

    let sig = match signal {
        StopSignal::Graceful => Signal::SIGINT,
        StopSignal::Forceful => Signal::SIGKILL,
    };
    let pid = Pid::from_raw(child.id() as i32);
    let sent = if group { killpg(pid, sig) } else { kill(pid, sig) };
    sent.map_err(io::Error::from)
}

#[cfg(not(unix))]
fn deliver(child: &mut Child, _group: bool, signal: StopSignal) -> io::Result<()> {
    if signal == StopSignal::Graceful {
        // No portable cooperative interrupt for an arbitrary child here.
        debug!(pid = child.id(), "no graceful signal on this platform; killing");
    }
    child.kill()
}

/// SIGKILL the group led by an already reaped child.
#[cfg(unix)]
fn sweep_group(pgid: u32) -> io::Result<bool> {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    match killpg(Pid::from_raw(pgid as i32), Signal::SIGKILL) {
        Ok(()) => Ok(true),
        Err(Errno::ESRCH) => Ok(false),
        Err(err) => Err(err.into()),
    }
}

#[cfg(not(unix))]
fn sweep_group(_pgid: u32) -> io::Result<bool> {
    Ok(false)
}

impl Drop for OsChild {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            debug!(pid = self.child.id(), "dropping live child handle; killing");
            let _ = deliver(&mut self.child, self.group, StopSignal::Forceful);
            let _ = self.child.wait();
        }
    }
}
