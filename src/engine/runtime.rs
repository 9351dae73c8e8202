// src/engine/runtime.rs

//! Cooperative (tokio) flavor of the supervisor loop.
//!
//! Waiting for changes suspends between polls and callbacks run as spawned
//! tasks. Starting a child stays a plain synchronous call; stopping one runs
//! on the blocking pool so the grace period does not stall the scheduler.

use anyhow::anyhow;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::engine::supervisor::{log_reload, Supervisor};
use crate::engine::{AsyncReloadCallback, RunOutcome};
use crate::errors::{Result, WatchrunError};
use crate::exec::Launcher;
use crate::watch::{ChangeSource, Collected};

type PendingCallbacks = Vec<JoinHandle<anyhow::Result<()>>>;

impl<S: ChangeSource, L: Launcher> Supervisor<S, L> {
    /// Supervise cooperatively until interrupted, until the child exits on
    /// its own, or until an error occurs.
    ///
    /// The callback future is spawned and not awaited before the relaunch. A
    /// callback failure is noticed at the start of the next window and aborts
    /// supervision. Outstanding callbacks are awaited before returning, after
    /// the child has been stopped.
    pub async fn run_async<C: AsyncReloadCallback>(&mut self, mut callback: C) -> Result<RunOutcome> {
        info!(command = %self.core.describe(), "supervisor started (cooperative)");

        self.core.start(None)?;
        let mut pending = PendingCallbacks::new();
        let result = self.cooperative_loop(&mut callback, &mut pending).await;
        let stopped = self.stop_current_async(true).await;
        let drained = drain_callbacks(pending).await;

        let result = result.and_then(|outcome| {
            stopped?;
            drained?;
            Ok(outcome)
        });
        self.finish(result)
    }

    async fn cooperative_loop<C: AsyncReloadCallback>(
        &mut self,
        callback: &mut C,
        pending: &mut PendingCallbacks,
    ) -> Result<RunOutcome> {
        let timeout = self.options.liveness_timeout();
        loop {
            reap_finished(pending).await?;

            let batch = match self
                .debouncer
                .collect_async(&mut self.source, timeout, &self.shutdown)
                .await?
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
            self.stop_current_async(false).await?;
            pending.push(tokio::spawn(callback.on_reload(batch.clone())));
            self.core.restart(&batch)?;
        }
    }

    async fn stop_current_async(&mut self, is_final: bool) -> Result<()> {
        let Some(process) = self.core.take_current() else {
            return Ok(());
        };
        let policy = self.core.policy();
        let report = tokio::task::spawn_blocking(move || policy.terminate(process))
            .await
            .map_err(|e| WatchrunError::Other(anyhow!("termination task failed: {e}")))?;
        if is_final {
            self.core.record_final(report);
        } else {
            self.core.record(report);
        }
        Ok(())
    }
}

/// Surface the result of every callback task that already finished.
async fn reap_finished(pending: &mut PendingCallbacks) -> Result<()> {
    let mut i = 0;
    while i < pending.len() {
        if pending[i].is_finished() {
            let handle = pending.swap_remove(i);
            join_callback(handle).await?;
        } else {
            i += 1;
        }
    }
    Ok(())
}

async fn drain_callbacks(pending: PendingCallbacks) -> Result<()> {
    if !pending.is_empty() {
        debug!(count = pending.len(), "waiting for outstanding reload callbacks");
    }
    let mut first_err = None;
    for handle in pending {
        if let Err(err) = join_callback(handle).await {
            first_err.get_or_insert(err);
        }
    }
    first_err.map_or(Ok(()), Err)
}

async fn join_callback(handle: JoinHandle<anyhow::Result<()>>) -> Result<()> {
    match handle.await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(WatchrunError::CallbackError(err)),
        Err(join_err) => Err(WatchrunError::CallbackError(anyhow!(
            "reload callback panicked: {join_err}"
        ))),
    }
}
