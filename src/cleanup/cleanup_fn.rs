//! # Function-backed cleanup (`CleanupFn`)
//!
//! [`CleanupFn`] wraps a closure `F: Fn(ShutdownContext) -> Fut`, producing a fresh
//! future per call. Shared state, if any, belongs in an explicit `Arc<...>`
//! captured by the closure.
//!
//! ## Example
//! ```rust
//! use gracevisor::{Cleanup, CleanupError, CleanupFn, CleanupRef, ShutdownContext};
//!
//! let c: CleanupRef = CleanupFn::arc("flush", |_ctx: ShutdownContext| async move {
//!     Ok::<_, CleanupError>(())
//! });
//!
//! assert_eq!(c.name(), "flush");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::cleanup::{Cleanup, ShutdownContext};
use crate::error::CleanupError;

/// Function-backed cleanup implementation.
#[derive(Debug)]
pub struct CleanupFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> CleanupFn<F> {
    /// Creates a new function-backed cleanup.
    ///
    /// Prefer [`CleanupFn::arc`] when you immediately need a handle to register.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the cleanup and returns it behind an `Arc`.
    ///
    /// Registering the returned handle gives the closure a stable identity,
    /// so it can later be unregistered.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Cleanup for CleanupFn<F>
where
    F: Fn(ShutdownContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), CleanupError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn shutdown(&self, ctx: ShutdownContext) -> Result<(), CleanupError> {
        (self.f)(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test]
    async fn test_each_call_builds_fresh_future() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = {
            let calls = Arc::clone(&calls);
            CleanupFn::arc("counter", move |_ctx: ShutdownContext| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<(), CleanupError>(())
                }
            })
        };

        c.shutdown(ShutdownContext::background()).await.unwrap();
        c.shutdown(ShutdownContext::background()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(c.name(), "counter");
    }

    #[tokio::test]
    async fn test_error_is_returned_as_is() {
        let c = CleanupFn::new("broken", |_ctx: ShutdownContext| async {
            Err::<(), _>(CleanupError::fail("boom"))
        });
        let err = c.shutdown(ShutdownContext::background()).await.unwrap_err();
        assert_eq!(err, CleanupError::fail("boom"));
    }
}
