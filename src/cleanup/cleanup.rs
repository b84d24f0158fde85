//! # Cleanup abstraction.
//!
//! A [`Cleanup`] has a human-readable [`name`](Cleanup::name) and an async
//! [`shutdown`](Cleanup::shutdown) method that receives a [`ShutdownContext`].
//! The common handle type is [`CleanupRef`], an `Arc<dyn Cleanup>`; the `Arc`
//! allocation is the unit's identity inside the [`Registry`](crate::Registry).

use std::sync::Arc;

use async_trait::async_trait;

use crate::cleanup::ShutdownContext;
use crate::error::CleanupError;

/// Shared handle to a cleanup unit.
pub type CleanupRef = Arc<dyn Cleanup>;

/// # Unit of cleanup run once during shutdown.
///
/// Implementors release their resources in [`shutdown`](Cleanup::shutdown) and
/// should return promptly once `ctx` is cancelled or its deadline passes.
/// The method is invoked at most once per registration.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use gracevisor::{Cleanup, CleanupError, ShutdownContext};
///
/// struct Pool;
///
/// #[async_trait]
/// impl Cleanup for Pool {
///     fn name(&self) -> &str { "pool" }
///
///     async fn shutdown(&self, ctx: ShutdownContext) -> Result<(), CleanupError> {
///         if ctx.is_cancelled() {
///             return Err(CleanupError::Canceled);
///         }
///         // close connections...
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Cleanup: Send + Sync + 'static {
    /// Returns a human-readable name used in logs and collected errors.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Runs the cleanup.
    async fn shutdown(&self, ctx: ShutdownContext) -> Result<(), CleanupError>;
}
