//! # Operation Context
//!
//! Request-scoped cancellation and deadline for store calls.
//!
//! ## How Cancellation Reaches the Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ctx.run("car.create", async { tx.begin → insert → commit })           │
//! │       │                                                                 │
//! │       ├── operation finishes first  → its own Ok / Err                 │
//! │       ├── token cancelled first     → future dropped → Cancelled       │
//! │       └── deadline elapses first    → future dropped → DeadlineExceeded│
//! │                                                                         │
//! │  Dropping the future drops the ScopedTx inside it, which rolls the     │
//! │  transaction back. Nothing partial is ever committed.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{DbError, DbResult};

/// Cancellation signal plus optional deadline, carried by every store call.
///
/// Cloning shares the same cancellation token.
#[derive(Debug, Clone, Default)]
pub struct OpContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl OpContext {
    /// Context with no deadline and a fresh token.
    pub fn new() -> Self {
        OpContext::default()
    }

    /// Context bound to an existing cancellation token.
    pub fn with_token(cancel: CancellationToken) -> Self {
        OpContext {
            cancel,
            deadline: None,
        }
    }

    /// Sets the deadline to `timeout` from now.
    ///
    /// A timeout too large to represent leaves the context without a deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Instant::now().checked_add(timeout);
        self
    }

    /// Sets an absolute deadline.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// The token observed by this context.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Cancels every call running under this context (and its clones).
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Runs `fut` until it completes, the token fires, or the deadline passes.
    ///
    /// On cancellation or deadline the future is dropped without being polled
    /// again.
    pub async fn run<T, F>(&self, op: &'static str, fut: F) -> DbResult<T>
    where
        F: Future<Output = DbResult<T>>,
    {
        if self.cancel.is_cancelled() {
            debug!(op, "Operation cancelled before start");
            return Err(DbError::Cancelled { op });
        }

        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                debug!(op, "Deadline already passed");
                return Err(DbError::DeadlineExceeded { op });
            }
        }

        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!(op, "Operation cancelled, dropping in-flight work");
                Err(DbError::Cancelled { op })
            }
            _ = deadline => {
                debug!(op, "Deadline exceeded, dropping in-flight work");
                Err(DbError::DeadlineExceeded { op })
            }
            result = fut => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn test_unrepresentable_timeout_means_no_deadline() {
        let ctx = OpContext::new().with_timeout(Duration::MAX);
        let value = ctx.run("test", async { Ok::<_, DbError>(1) }).await.unwrap();
        assert_eq!(value, 1);
    }

    #[tokio::test]
    async fn test_run_returns_operation_result() {
        let ctx = OpContext::new();
        let value = ctx.run("test", async { Ok::<_, DbError>(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_pre_cancelled_context_never_polls() {
        let ctx = OpContext::new();
        ctx.cancel();

        let polled = AtomicBool::new(false);
        let result: DbResult<()> = ctx
            .run("test", async {
                polled.store(true, Ordering::SeqCst);
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(DbError::Cancelled { op: "test" })));
        assert!(!polled.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_deadline_interrupts_pending_work() {
        let ctx = OpContext::new().with_timeout(Duration::from_millis(20));

        let started = std::time::Instant::now();
        let result: DbResult<()> = ctx
            .run("test", std::future::pending::<DbResult<()>>())
            .await;

        assert!(matches!(result, Err(DbError::DeadlineExceeded { .. })));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_cancel_from_clone_interrupts() {
        let ctx = OpContext::new();
        let handle = ctx.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            handle.cancel();
        });

        let result: DbResult<()> = ctx
            .run("test", std::future::pending::<DbResult<()>>())
            .await;
        assert!(matches!(result, Err(DbError::Cancelled { .. })));
    }
}
