// src/watch/source.rs

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::time::Duration;

use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, PollWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, warn};

use crate::errors::{Result, WatchrunError};
use crate::types::{ChangeEvent, ChangeKind};
use crate::watch::filter::WatchFilter;

/// Anything that can hand out batches of filesystem changes.
///
/// `poll` blocks for at most `timeout` and returns whatever arrived, possibly
/// nothing. A zero timeout must not block. Errors are reserved for failures
/// the source cannot recover from.
pub trait ChangeSource: Send {
    fn poll(&mut self, timeout: Duration) -> Result<Vec<ChangeEvent>>;
}

impl<S: ChangeSource + ?Sized> ChangeSource for Box<S> {
    fn poll(&mut self, timeout: Duration) -> Result<Vec<ChangeEvent>> {
        (**self).poll(timeout)
    }
}

/// How the underlying `notify` watcher is built.
#[derive(Debug, Clone, Copy)]
pub struct SourceOptions {
    /// Use `notify::PollWatcher` instead of the platform's native backend
    /// (useful on network filesystems and inside some containers).
    pub force_polling: bool,
    pub poll_interval: Duration,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            force_polling: false,
            poll_interval: Duration::from_millis(300),
        }
    }
}

/// [`ChangeSource`] backed by a `notify` watcher.
///
/// The watcher callback runs on notify's own thread and forwards raw events
/// over a std channel; `poll` drains that channel and translates the events.
/// Dropping the source stops watching.
pub struct NotifySource {
    _watcher: Box<dyn Watcher + Send>,
    rx: Receiver<notify::Result<Event>>,
    filter: Option<Box<dyn WatchFilter>>,
}

impl std::fmt::Debug for NotifySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifySource")
            .field("filtered", &self.filter.is_some())
            .finish_non_exhaustive()
    }
}

impl NotifySource {
    /// Start watching every path in `paths` recursively.
    pub fn new(
        paths: &[PathBuf],
        filter: Option<Box<dyn WatchFilter>>,
        options: SourceOptions,
    ) -> Result<Self> {
        let (tx, rx) = mpsc::channel::<notify::Result<Event>>();
        let handler = move |res: notify::Result<Event>| {
            // The receiver only goes away when the source is dropped.
            let _ = tx.send(res);
        };

        let mut watcher: Box<dyn Watcher + Send> = if options.force_polling {
            let config = Config::default().with_poll_interval(options.poll_interval);
            Box::new(PollWatcher::new(handler, config)?)
        } else {
            Box::new(notify::recommended_watcher(handler)?)
        };

        for path in paths {
            watcher.watch(path, RecursiveMode::Recursive)?;
        }

        info!(
            ?paths,
            force_polling = options.force_polling,
            "file watcher started"
        );

        Ok(Self {
            _watcher: watcher,
            rx,
            filter,
        })
    }

    fn absorb(&self, res: notify::Result<Event>, out: &mut Vec<ChangeEvent>) {
        match res {
            Ok(event) => {
                for change in translate_event(&event) {
                    let accepted = self
                        .filter
                        .as_ref()
                        .map_or(true, |f| f.accept(change.kind, &change.path));
                    if accepted {
                        out.push(change);
                    } else {
                        debug!(change = %change, "change rejected by watch filter");
                    }
                }
            }
            Err(err) => {
                // Individual errors (e.g. a path vanishing mid-scan) are not
                // fatal; only a dead channel is.
                warn!(error = %err, "file watch error");
            }
        }
    }
}

impl ChangeSource for NotifySource {
    fn poll(&mut self, timeout: Duration) -> Result<Vec<ChangeEvent>> {
        let mut out = Vec::new();

        let first = if timeout.is_zero() {
            match self.rx.try_recv() {
                Ok(res) => Some(res),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => return Err(watcher_gone()),
            }
        } else {
            match self.rx.recv_timeout(timeout) {
                Ok(res) => Some(res),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => return Err(watcher_gone()),
            }
        };

        let Some(first) = first else {
            return Ok(out);
        };
        self.absorb(first, &mut out);

        // Drain whatever else is already queued.
        loop {
            match self.rx.try_recv() {
                Ok(res) => self.absorb(res, &mut out),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return Err(watcher_gone()),
            }
        }

        Ok(out)
    }
}

fn watcher_gone() -> WatchrunError {
    WatchrunError::WatchError("file watcher channel closed".to_string())
}

/// Translate one raw `notify` event into zero or more changes.
///
/// Renames become a deletion of the old path and an addition of the new one.
/// Access events carry no content change and are dropped.
pub fn translate_event(event: &Event) -> Vec<ChangeEvent> {
    let with_kind = |kind: ChangeKind| -> Vec<ChangeEvent> {
        event
            .paths
            .iter()
            .map(|p| ChangeEvent::new(kind, p.clone()))
            .collect()
    };

    match &event.kind {
        EventKind::Create(_) => with_kind(ChangeKind::Added),
        EventKind::Remove(_) => with_kind(ChangeKind::Deleted),
        EventKind::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::From => with_kind(ChangeKind::Deleted),
            RenameMode::To => with_kind(ChangeKind::Added),
            RenameMode::Both if event.paths.len() == 2 => vec![
                ChangeEvent::new(ChangeKind::Deleted, event.paths[0].clone()),
                ChangeEvent::new(ChangeKind::Added, event.paths[1].clone()),
            ],
            _ => event
                .paths
                .iter()
                .map(|p| ChangeEvent::new(kind_from_existence(p), p.clone()))
                .collect(),
        },
        EventKind::Modify(_) | EventKind::Any => with_kind(ChangeKind::Modified),
        EventKind::Access(_) | EventKind::Other => Vec::new(),
    }
}

fn kind_from_existence(path: &Path) -> ChangeKind {
    if path.exists() {
        ChangeKind::Added
    } else {
        ChangeKind::Deleted
    }
}
