//! In-memory stand-ins for the change source and the launcher.
//!
//! Fake children never run anything: they record the signals they receive
//! and react according to a [`ChildBehaviour`].

use std::collections::VecDeque;
use std::io;
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use watchrun::engine::ShutdownFlag;
use watchrun::errors::{Result, WatchrunError};
use watchrun::exec::{changes_env_value, ChildExit, ChildProcess, Launcher, StopSignal};
use watchrun::types::{ChangeBatch, ChangeEvent, ChangeKind};
use watchrun::watch::ChangeSource;

pub fn added(path: &str) -> ChangeEvent {
    ChangeEvent::new(ChangeKind::Added, PathBuf::from(path))
}

pub fn modified(path: &str) -> ChangeEvent {
    ChangeEvent::new(ChangeKind::Modified, PathBuf::from(path))
}

pub fn deleted(path: &str) -> ChangeEvent {
    ChangeEvent::new(ChangeKind::Deleted, PathBuf::from(path))
}

/// How a fake child reacts to the termination sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildBehaviour {
    /// Exits with the given code on the first interrupt.
    ExitsOnInterrupt(i32),
    /// Only a kill stops it.
    IgnoresInterrupt,
    /// Already dead by the time anyone looks, with the given code.
    AlreadyExited(i32),
}

/// One launch as seen by the fake launcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRecord {
    /// Value `WATCHFILES_CHANGES` would have had.
    pub changes_env: String,
    pub behaviour: ChildBehaviour,
}

/// Everything the fakes observed, shared between launcher, children and test.
#[derive(Debug, Default)]
pub struct FakeLog {
    pub launches: Vec<LaunchRecord>,
    /// `(launch index, signal)` in delivery order.
    pub signals: Vec<(usize, StopSignal)>,
}

impl FakeLog {
    pub fn launch_count(&self) -> usize {
        self.launches.len()
    }

    pub fn signal_count(&self) -> usize {
        self.signals.len()
    }

    pub fn signals_of(&self, signal: StopSignal) -> usize {
        self.signals.iter().filter(|(_, s)| *s == signal).count()
    }

    pub fn env_values(&self) -> Vec<String> {
        self.launches.iter().map(|l| l.changes_env.clone()).collect()
    }
}

pub type SharedLog = Arc<Mutex<FakeLog>>;

#[derive(Debug)]
pub struct FakeChild {
    index: usize,
    behaviour: ChildBehaviour,
    exit: Option<ChildExit>,
    log: SharedLog,
}

impl FakeChild {
    fn new(index: usize, behaviour: ChildBehaviour, log: SharedLog) -> Self {
        let exit = match behaviour {
            ChildBehaviour::AlreadyExited(code) => Some(ChildExit { code: Some(code) }),
            _ => None,
        };
        Self {
            index,
            behaviour,
            exit,
            log,
        }
    }
}

impl ChildProcess for FakeChild {
    fn id(&self) -> Option<u32> {
        Some(10_000 + self.index as u32)
    }

    fn try_exit(&mut self) -> io::Result<Option<ChildExit>> {
        Ok(self.exit)
    }

    fn send_signal(&mut self, signal: StopSignal) -> io::Result<()> {
        if self.exit.is_some() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no such process"));
        }
        self.log.lock().unwrap().signals.push((self.index, signal));

        match (signal, self.behaviour) {
            (StopSignal::Graceful, ChildBehaviour::ExitsOnInterrupt(code)) => {
                self.exit = Some(ChildExit { code: Some(code) });
            }
            (StopSignal::Graceful, _) => {}
            (StopSignal::Forceful, _) => {
                self.exit = Some(ChildExit { code: None });
            }
        }
        Ok(())
    }

    fn wait_timeout(&mut self, _timeout: Duration) -> io::Result<Option<ChildExit>> {
        Ok(self.exit)
    }

    fn wait(&mut self) -> io::Result<ChildExit> {
        Ok(self.exit.unwrap_or(ChildExit { code: None }))
    }
}

/// Launcher handing out [`FakeChild`]ren.
///
/// Behaviours queued with [`then`](Self::then) are used for successive
/// launches; afterwards every child gets the default behaviour.
#[derive(Debug)]
pub struct FakeLauncher {
    default: ChildBehaviour,
    queued: VecDeque<ChildBehaviour>,
    fail_from: Option<usize>,
    log: SharedLog,
}

impl FakeLauncher {
    pub fn new(default: ChildBehaviour) -> Self {
        Self {
            default,
            queued: VecDeque::new(),
            fail_from: None,
            log: SharedLog::default(),
        }
    }

    pub fn then(mut self, behaviour: ChildBehaviour) -> Self {
        self.queued.push_back(behaviour);
        self
    }

    /// Make launch number `index` (0-based) and every later one fail.
    pub fn failing_from(mut self, index: usize) -> Self {
        self.fail_from = Some(index);
        self
    }

    pub fn log(&self) -> SharedLog {
        Arc::clone(&self.log)
    }
}

impl Launcher for FakeLauncher {
    type Child = FakeChild;

    fn launch(&mut self, changes: Option<&ChangeBatch>) -> Result<FakeChild> {
        let changes_env = changes_env_value(changes)?;
        let mut log = self.log.lock().unwrap();
        let index = log.launches.len();

        if self.fail_from.is_some_and(|from| index >= from) {
            return Err(WatchrunError::LaunchError {
                target: self.describe(),
                source: io::Error::new(io::ErrorKind::NotFound, "fake launch failure"),
            });
        }

        let behaviour = self.queued.pop_front().unwrap_or(self.default);
        log.launches.push(LaunchRecord {
            changes_env,
            behaviour,
        });
        Ok(FakeChild::new(index, behaviour, Arc::clone(&self.log)))
    }

    fn describe(&self) -> String {
        "fake-target".to_string()
    }
}

/// Replays scripted poll results, then raises the shutdown flag.
///
/// Every scripted batch is followed by one quiet poll so it closes its own
/// debounce window. An empty entry blocks for the poll timeout, standing in
/// for an idle stretch.
#[derive(Debug)]
pub struct ScriptedSource {
    script: VecDeque<Vec<ChangeEvent>>,
    quiet_next: bool,
    shutdown: ShutdownFlag,
}

impl ScriptedSource {
    pub fn new(script: Vec<Vec<ChangeEvent>>, shutdown: ShutdownFlag) -> Self {
        Self {
            script: script.into(),
            quiet_next: false,
            shutdown,
        }
    }
}

impl ChangeSource for ScriptedSource {
    fn poll(&mut self, timeout: Duration) -> Result<Vec<ChangeEvent>> {
        if std::mem::take(&mut self.quiet_next) {
            return Ok(Vec::new());
        }
        match self.script.pop_front() {
            Some(events) if events.is_empty() => {
                std::thread::sleep(timeout);
                Ok(events)
            }
            Some(events) => {
                self.quiet_next = true;
                Ok(events)
            }
            None => {
                self.shutdown.trigger();
                Ok(Vec::new())
            }
        }
    }
}

/// Never reports anything; blocks for the requested timeout like a real
/// source would.
#[derive(Debug, Default)]
pub struct IdleSource;

impl ChangeSource for IdleSource {
    fn poll(&mut self, timeout: Duration) -> Result<Vec<ChangeEvent>> {
        std::thread::sleep(timeout);
        Ok(Vec::new())
    }
}

/// Source fed from a channel, for timing tests driven by another thread.
#[derive(Debug)]
pub struct ChannelSource {
    rx: Receiver<ChangeEvent>,
}

impl ChannelSource {
    pub fn new(rx: Receiver<ChangeEvent>) -> Self {
        Self { rx }
    }
}

impl ChangeSource for ChannelSource {
    fn poll(&mut self, timeout: Duration) -> Result<Vec<ChangeEvent>> {
        let mut out = Vec::new();
        match self.rx.recv_timeout(timeout) {
            Ok(event) => out.push(event),
            Err(RecvTimeoutError::Timeout) => return Ok(out),
            Err(RecvTimeoutError::Disconnected) => {
                std::thread::sleep(timeout);
                return Ok(out);
            }
        }
        loop {
            match self.rx.try_recv() {
                Ok(event) => out.push(event),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        Ok(out)
    }
}
