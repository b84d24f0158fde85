//! # Event subscriber trait.
//!
//! Provides [`Subscribe`] an extension point for observing lifecycle events
//! (status changes, signals, failed cleanups).
//!
//! Each subscriber gets:
//! - **Dedicated worker task** (runs independently of the publisher)
//! - **Per-subscriber bounded queue** (capacity via [`Subscribe::queue_capacity`])
//! - **Panic isolation** (panics are caught and reported as `EventKind::SubscriberPanicked`)
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use gracevisor::{Event, EventKind, Subscribe};
//!
//! struct Readiness;
//!
//! #[async_trait]
//! impl Subscribe for Readiness {
//!     async fn on_event(&self, ev: &Event) {
//!         if matches!(ev.kind, EventKind::StatusChanged) {
//!             // flip a readiness probe, etc.
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "readiness" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Lifecycle event subscriber.
///
/// ### Implementation requirements
/// - Use async I/O; avoid blocking the executor.
/// - Slow processing affects only this subscriber's queue.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Processes a single event, in FIFO order per subscriber.
    async fn on_event(&self, event: &Event);

    /// Returns the subscriber name used in logs and overflow/panic events.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Returns the preferred queue capacity for this subscriber (minimum 1).
    ///
    /// Default: 256.
    fn queue_capacity(&self) -> usize {
        256
    }
}
