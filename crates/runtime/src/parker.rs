//! A one-shot suspension primitive with notify semantics: a single waiter
//! parks until `notify_one` wakes it or its `Context` is cancelled. General
//! purpose — the verifier's capacity backpressure and the writer queue use
//! `Semaphore`/`mpsc` instead, which fit their multi-waiter/multi-item shape
//! better.

use crate::context::Context;
use crate::error::RuntimeError;
use crate::Result;
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Clone, Debug, Default)]
pub struct Parker {
    notify: Arc<Notify>,
}

impl Parker {
    pub fn new() -> Self {
        Parker {
            notify: Arc::new(Notify::new()),
        }
    }

    /// Suspend until `notify_one` is called or `ctx` is cancelled.
    pub async fn park(&self, ctx: &Context) -> Result<()> {
        tokio::select! {
            _ = self.notify.notified() => Ok(()),
            _ = ctx.cancelled() => Err(RuntimeError::Cancelled),
        }
    }

    /// Wake one parked waiter, or the next one to park if none are waiting.
    pub fn notify_one(&self) {
        self.notify.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn park_wakes_on_notify() {
        let parker = Parker::new();
        let ctx = Context::root();

        let waiter = parker.clone();
        let handle = tokio::spawn(async move { waiter.park(&Context::root()).await });

        tokio::task::yield_now().await;
        parker.notify_one();

        assert!(handle.await.unwrap().is_ok());
        let _ = ctx;
    }

    #[tokio::test]
    async fn park_cancelled() {
        let parker = Parker::new();
        let ctx = Context::root();
        ctx.cancel();
        assert_eq!(parker.park(&ctx).await, Err(RuntimeError::Cancelled));
    }
}
