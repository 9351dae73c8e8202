// src/engine/callback.rs

//! Reload callbacks.
//!
//! A callback is invoked once per restart with the batch that caused it. The
//! blocking supervisor calls [`ReloadCallback`] inline; the cooperative one
//! spawns the future returned by [`AsyncReloadCallback`] and moves on without
//! waiting for it. Any closure with the right shape works for either.

use std::future::Future;
use std::pin::Pin;

use crate::types::ChangeBatch;

pub type CallbackFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'static>>;

pub trait ReloadCallback {
    fn on_reload(&mut self, batch: &ChangeBatch) -> anyhow::Result<()>;
}

impl<F> ReloadCallback for F
where
    F: FnMut(&ChangeBatch) -> anyhow::Result<()>,
{
    fn on_reload(&mut self, batch: &ChangeBatch) -> anyhow::Result<()> {
        self(batch)
    }
}

pub trait AsyncReloadCallback {
    fn on_reload(&mut self, batch: ChangeBatch) -> CallbackFuture;
}

impl<F, Fut> AsyncReloadCallback for F
where
    F: FnMut(ChangeBatch) -> Fut,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    fn on_reload(&mut self, batch: ChangeBatch) -> CallbackFuture {
        Box::pin(self(batch))
    }
}

/// Callback that does nothing, for either flavor.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCallback;

impl ReloadCallback for NoCallback {
    fn on_reload(&mut self, _batch: &ChangeBatch) -> anyhow::Result<()> {
        Ok(())
    }
}

impl AsyncReloadCallback for NoCallback {
    fn on_reload(&mut self, _batch: ChangeBatch) -> CallbackFuture {
        Box::pin(async { Ok(()) })
    }
}
