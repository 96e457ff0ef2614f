//! A `Context` carries cancellation down through every suspension point in
//! a task tree, mirroring the `ctx` parameter threaded through the source
//! system's blocking calls.

use crate::error::RuntimeError;
use crate::Result;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Clone, Debug)]
pub struct Context {
    token: CancellationToken,
}

impl Context {
    /// A fresh root context, typically created once in `main`.
    pub fn root() -> Self {
        Context {
            token: CancellationToken::new(),
        }
    }

    /// A child context that is cancelled both when this one is cancelled
    /// and independently (e.g. one context per connection).
    pub fn child(&self) -> Self {
        Context {
            token: self.token.child_token(),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once this context is cancelled. Await this alongside other
    /// work in a `tokio::select!` to make that work cancellation-aware.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Sleep for `duration`, returning early with `Cancelled` if the
    /// context fires first. This is the adaptive-timer suspension point
    /// used by the proposer and flush loops.
    pub async fn sleep(&self, duration: Duration) -> Result<()> {
        tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            _ = self.cancelled() => Err(RuntimeError::Cancelled),
        }
    }

    /// Race `fut` against `duration` and cancellation.
    pub async fn timeout<F, T>(&self, duration: Duration, fut: F) -> Result<T>
    where
        F: Future<Output = T>,
    {
        tokio::select! {
            out = fut => Ok(out),
            _ = tokio::time::sleep(duration) => Err(RuntimeError::TimedOut),
            _ = self.cancelled() => Err(RuntimeError::Cancelled),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::root()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sleep_completes_without_cancellation() {
        let ctx = Context::root();
        assert!(ctx.sleep(Duration::from_millis(1)).await.is_ok());
    }

    #[tokio::test]
    async fn sleep_cancelled_early() {
        let ctx = Context::root();
        let child = ctx.clone();
        tokio::spawn(async move { child.cancel() });
        let result = ctx.sleep(Duration::from_secs(5)).await;
        assert_eq!(result, Err(RuntimeError::Cancelled));
    }

    #[tokio::test]
    async fn child_cancelled_with_parent() {
        let parent = Context::root();
        let child = parent.child();
        parent.cancel();
        assert!(child.is_cancelled());
    }
}
