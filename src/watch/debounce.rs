// src/watch/debounce.rs

//! Coalescing of change bursts into one batch per quiet window.
//!
//! Editors often touch a file several times on save; restarting the child for
//! each touch would be wasteful. The [`Debouncer`] keeps polling while events
//! keep arriving and hands out one merged [`ChangeBatch`] once the source has
//! been quiet for a full `step`, or once `debounce` has elapsed since the
//! first change of the window.

use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::engine::ShutdownFlag;
use crate::errors::Result;
use crate::types::{ChangeBatch, ChangeEvent};
use crate::watch::source::ChangeSource;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1_600);
pub const DEFAULT_STEP: Duration = Duration::from_millis(50);

/// The two debounce knobs. `step` must be smaller than `debounce`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceSettings {
    /// Upper bound on how long one window may keep growing.
    pub debounce: Duration,
    /// Polling granularity; also the quiet interval that closes a window.
    pub step: Duration,
}

impl Default for DebounceSettings {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            step: DEFAULT_STEP,
        }
    }
}

/// Result of one [`Debouncer::collect`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Collected {
    /// Changes of one window. Empty when nothing arrived within the timeout.
    Batch(ChangeBatch),
    /// The shutdown flag was raised while waiting.
    Interrupted,
}

#[derive(Debug, Clone, Copy)]
pub struct Debouncer {
    settings: DebounceSettings,
}

impl Debouncer {
    pub fn new(settings: DebounceSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> DebounceSettings {
        self.settings
    }

    /// Block until a window closes, `timeout` passes without any change, or
    /// `shutdown` is raised.
    pub fn collect<S>(
        &self,
        source: &mut S,
        timeout: Duration,
        shutdown: &ShutdownFlag,
    ) -> Result<Collected>
    where
        S: ChangeSource + ?Sized,
    {
        let mut window = Window::new(timeout);
        loop {
            if shutdown.is_triggered() {
                return Ok(Collected::Interrupted);
            }
            let events = source.poll(self.settings.step)?;
            if let Some(batch) = window.absorb(events, &self.settings) {
                return Ok(Collected::Batch(batch));
            }
        }
    }

    /// Cooperative variant of [`collect`](Self::collect).
    ///
    /// The source is polled without blocking and the task suspends for one
    /// `step` between polls, so other work on the same scheduler keeps running.
    pub async fn collect_async<S>(
        &self,
        source: &mut S,
        timeout: Duration,
        shutdown: &ShutdownFlag,
    ) -> Result<Collected>
    where
        S: ChangeSource + ?Sized,
    {
        let mut window = Window::new(timeout);
        loop {
            if shutdown.is_triggered() {
                return Ok(Collected::Interrupted);
            }
            let events = source.poll(Duration::ZERO)?;
            if let Some(batch) = window.absorb(events, &self.settings) {
                return Ok(Collected::Batch(batch));
            }
            tokio::time::sleep(self.settings.step).await;
        }
    }
}

/// Accumulation state of a single debounce window.
struct Window {
    batch: ChangeBatch,
    started: Instant,
    first_change: Option<Instant>,
    timeout: Duration,
}

impl Window {
    fn new(timeout: Duration) -> Self {
        Self {
            batch: ChangeBatch::new(),
            started: Instant::now(),
            first_change: None,
            timeout,
        }
    }

    /// Merge one poll result; returns the batch once the window is closed.
    fn absorb(&mut self, events: Vec<ChangeEvent>, settings: &DebounceSettings) -> Option<ChangeBatch> {
        if !events.is_empty() {
            trace!(count = events.len(), "poll returned changes");
            self.batch.extend(events);
            let first = *self.first_change.get_or_insert_with(Instant::now);
            if first.elapsed() >= settings.debounce {
                debug!(changes = self.batch.len(), "debounce window exceeded; flushing");
                return Some(self.take());
            }
            return None;
        }

        if !self.batch.is_empty() {
            debug!(changes = self.batch.len(), "source quiet; flushing window");
            return Some(self.take());
        }

        if self.started.elapsed() >= self.timeout {
            return Some(ChangeBatch::new());
        }

        None
    }

    fn take(&mut self) -> ChangeBatch {
        std::mem::take(&mut self.batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChangeKind;
    use std::collections::VecDeque;

    /// Returns scripted poll results in order, then nothing.
    struct Script(VecDeque<Vec<ChangeEvent>>);

    impl ChangeSource for Script {
        fn poll(&mut self, _timeout: Duration) -> Result<Vec<ChangeEvent>> {
            Ok(self.0.pop_front().unwrap_or_default())
        }
    }

    fn settings() -> DebounceSettings {
        DebounceSettings {
            debounce: Duration::from_secs(10),
            step: Duration::from_millis(1),
        }
    }

    #[test]
    fn consecutive_polls_merge_until_quiet() {
        let mut source = Script(VecDeque::from(vec![
            vec![ChangeEvent::new(ChangeKind::Added, "a")],
            vec![
                ChangeEvent::new(ChangeKind::Added, "a"),
                ChangeEvent::new(ChangeKind::Modified, "b"),
            ],
            vec![],
            vec![ChangeEvent::new(ChangeKind::Deleted, "c")],
        ]));
        let debouncer = Debouncer::new(settings());
        let flag = ShutdownFlag::new();

        let first = debouncer
            .collect(&mut source, Duration::from_secs(1), &flag)
            .unwrap();
        let expected: ChangeBatch = [
            ChangeEvent::new(ChangeKind::Added, "a"),
            ChangeEvent::new(ChangeKind::Modified, "b"),
        ]
        .into_iter()
        .collect();
        assert_eq!(first, Collected::Batch(expected));

        let second = debouncer
            .collect(&mut source, Duration::from_secs(1), &flag)
            .unwrap();
        let expected: ChangeBatch = [ChangeEvent::new(ChangeKind::Deleted, "c")]
            .into_iter()
            .collect();
        assert_eq!(second, Collected::Batch(expected));
    }

    #[test]
    fn empty_batch_after_timeout() {
        let mut source = Script(VecDeque::new());
        let debouncer = Debouncer::new(settings());
        let out = debouncer
            .collect(&mut source, Duration::from_millis(5), &ShutdownFlag::new())
            .unwrap();
        assert_eq!(out, Collected::Batch(ChangeBatch::new()));
    }

    #[test]
    fn raised_flag_interrupts() {
        let mut source = Script(VecDeque::new());
        let flag = ShutdownFlag::new();
        flag.trigger();
        let out = Debouncer::new(settings())
            .collect(&mut source, Duration::from_secs(60), &flag)
            .unwrap();
        assert_eq!(out, Collected::Interrupted);
    }

    #[test]
    fn debounce_caps_a_never_ending_burst() {
        struct Endless(u32);
        impl ChangeSource for Endless {
            fn poll(&mut self, timeout: Duration) -> Result<Vec<ChangeEvent>> {
                std::thread::sleep(timeout);
                self.0 += 1;
                Ok(vec![ChangeEvent::new(ChangeKind::Modified, format!("f{}", self.0))])
            }
        }

        let debouncer = Debouncer::new(DebounceSettings {
            debounce: Duration::from_millis(20),
            step: Duration::from_millis(2),
        });
        let out = debouncer
            .collect(&mut Endless(0), Duration::from_secs(5), &ShutdownFlag::new())
            .unwrap();
        match out {
            Collected::Batch(batch) => assert!(batch.len() >= 2),
            other => panic!("expected a batch, got {other:?}"),
        }
    }
}
