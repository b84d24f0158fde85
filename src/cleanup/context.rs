//! # Shutdown context handed to every cleanup callback.
//!
//! [`ShutdownContext`] couples a [`CancellationToken`] with an optional deadline.
//! Callbacks are expected to honor it cooperatively: the registry never preempts
//! a slow callback, it only passes the context through.
//!
//! ```text
//! trigger token ──► child token ──┐
//!                                 ├──► ShutdownContext ──► cleanup.shutdown(ctx)
//! timeout (0s = none) ─► deadline ┘         │
//!                                           └─ deadline timer cancels ctx.token()
//! ```

use std::time::Duration;

use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

/// Cancellable, deadline-bearing context for one shutdown pass.
///
/// Cheap to clone; clones observe the same token and deadline.
#[derive(Clone, Debug)]
pub struct ShutdownContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl ShutdownContext {
    /// Creates a context with no deadline bound to `token`.
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Creates a context under `parent` that also expires after `timeout`.
    ///
    /// The context gets its own child token, cancelled when `parent` is or when
    /// the deadline passes, so token-based APIs observe the deadline too.
    /// `Duration::ZERO` means no deadline and no child token.
    ///
    /// Must be called inside a tokio runtime when `timeout` is non-zero.
    pub fn with_timeout(parent: CancellationToken, timeout: Duration) -> Self {
        if timeout == Duration::ZERO {
            return Self::new(parent);
        }

        let deadline = Instant::now() + timeout;
        let token = parent.child_token();
        let timer = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = timer.cancelled() => {}
                _ = time::sleep_until(deadline) => timer.cancel(),
            }
        });

        Self {
            token,
            deadline: Some(deadline),
        }
    }

    /// Context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::new(CancellationToken::new())
    }

    /// Returns the deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left until the deadline (`None` if unbounded).
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Returns the underlying token.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// True once the token is cancelled or the deadline has passed.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Completes when the token is cancelled or the deadline passes.
    pub async fn cancelled(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.token.cancelled() => {}
                    _ = time::sleep_until(deadline) => {}
                }
            }
            None => self.token.cancelled().await,
        }
    }

    /// Cancels the underlying token (and every clone of this context).
    ///
    /// Also stops the deadline timer of a context built with [`Self::with_timeout`].
    pub fn cancel(&self) {
        self.token.cancel();
    }
}

impl Default for ShutdownContext {
    fn default() -> Self {
        Self::background()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_zero_timeout_has_no_deadline() {
        let ctx = ShutdownContext::with_timeout(CancellationToken::new(), Duration::ZERO);
        assert!(ctx.deadline().is_none());
        assert!(ctx.remaining().is_none());
        assert!(!ctx.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_cancels_token() {
        let parent = CancellationToken::new();
        let ctx = ShutdownContext::with_timeout(parent.clone(), Duration::from_secs(5));
        assert!(!ctx.is_cancelled());

        ctx.token().cancelled().await;
        assert!(ctx.is_cancelled());
        assert_eq!(ctx.remaining(), Some(Duration::ZERO));
        assert!(!parent.is_cancelled(), "the deadline stays local to the context");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_deadline_stays_local() {
        let parent = CancellationToken::new();
        let ctx = ShutdownContext::with_timeout(parent.clone(), Duration::from_secs(5));

        ctx.cancel();
        ctx.cancelled().await;
        assert!(ctx.remaining().is_some_and(|left| left > Duration::ZERO));
        assert!(!parent.is_cancelled());
    }

    #[tokio::test]
    async fn test_parent_cancellation_propagates() {
        let parent = CancellationToken::new();
        let ctx = ShutdownContext::with_timeout(parent.child_token(), Duration::from_secs(60));

        parent.cancel();
        ctx.cancelled().await;
        assert!(ctx.is_cancelled());
    }
}
