//! Request context: deadline and cancellation
//!
//! Every service and storage call takes a [`RequestContext`]. Storage work is
//! raced against the context's deadline and cancellation signal so that an
//! abandoned request never keeps a storage operation alive.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;

/// Why a context stopped work
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextError {
    /// The caller cancelled the request
    #[error("request cancelled")]
    Cancelled,

    /// The request deadline passed
    #[error("request deadline exceeded")]
    DeadlineExceeded,
}

/// Deadline and cancellation signal for one request
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    deadline: Option<Instant>,
    cancel: Option<watch::Receiver<bool>>,
}

/// Cancels every context derived from it
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Signal cancellation. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl RequestContext {
    /// A context with no deadline that is never cancelled
    pub fn background() -> Self {
        Self::default()
    }

    /// A cancellable context and its handle
    pub fn cancellable() -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        (
            Self {
                deadline: None,
                cancel: Some(rx),
            },
            CancelHandle { tx },
        )
    }

    /// Context expiring `timeout` from now
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::background().timeout(timeout)
    }

    /// Tighten the deadline to at most `timeout` from now
    pub fn timeout(self, timeout: Duration) -> Self {
        self.deadline_at(Instant::now() + timeout)
    }

    /// Tighten the deadline to at most `deadline`
    pub fn deadline_at(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        });
        self
    }

    /// The deadline, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fail fast when the context is already done
    pub fn check(&self) -> Result<(), ContextError> {
        if self.cancel.as_ref().is_some_and(|rx| *rx.borrow()) {
            return Err(ContextError::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(ContextError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Run `fut` unless the context finishes first
    ///
    /// `fut` is dropped, and so aborted, when the deadline passes or the
    /// context is cancelled.
    pub async fn run<F, T, E>(&self, fut: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: From<ContextError>,
    {
        self.check()?;

        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancelled() => Err(ContextError::Cancelled.into()),
            _ = deadline => Err(ContextError::DeadlineExceeded.into()),
            result = fut => result,
        }
    }

    /// Resolves once the context is cancelled; never for background contexts
    async fn cancelled(&self) {
        let Some(rx) = &self.cancel else {
            return std::future::pending().await;
        };
        let mut rx = rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                // Handle dropped without cancelling
                return std::future::pending().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn slow() -> Result<u32, ContextError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(1)
    }

    #[tokio::test]
    async fn test_background_runs_to_completion() {
        let ctx = RequestContext::background();
        let value: Result<u32, ContextError> = ctx.run(async { Ok(7) }).await;
        assert_eq!(value, Ok(7));
    }

    #[tokio::test]
    async fn test_deadline_aborts_slow_work() {
        let ctx = RequestContext::with_timeout(Duration::from_millis(50));
        assert_eq!(ctx.run(slow()).await, Err(ContextError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_cancel_aborts_slow_work() {
        let (ctx, handle) = RequestContext::cancellable();
        let task = tokio::spawn(async move { ctx.run(slow()).await });
        tokio::task::yield_now().await;
        handle.cancel();
        assert_eq!(task.await.unwrap(), Err(ContextError::Cancelled));
    }

    #[tokio::test]
    async fn test_already_cancelled_fails_fast() {
        let (ctx, handle) = RequestContext::cancellable();
        handle.cancel();
        assert_eq!(ctx.check(), Err(ContextError::Cancelled));
    }

    #[tokio::test]
    async fn test_dropped_handle_never_cancels() {
        let (ctx, handle) = RequestContext::cancellable();
        drop(handle);
        let value: Result<u32, ContextError> = ctx.run(async { Ok(3) }).await;
        assert_eq!(value, Ok(3));
    }

    #[tokio::test]
    async fn test_deadline_only_tightens() {
        let ctx = RequestContext::with_timeout(Duration::from_millis(10));
        let first = ctx.deadline().unwrap();
        let ctx = ctx.timeout(Duration::from_secs(60));
        assert_eq!(ctx.deadline(), Some(first));
    }
}
