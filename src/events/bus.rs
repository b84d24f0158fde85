//! # Event bus for broadcasting lifecycle events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that provides
//! non-blocking event publishing from the trigger and the coordinator.
//!
//! ## Architecture
//! ```text
//! Publishers:                          Consumers:
//!   Trigger ─────┐
//!   Coordinator ─┼──► Bus ──► subscriber listener ──► SubscriberSet
//!   Attempt ─────┘       └──► Bus::subscribe() receivers
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks; it calls `broadcast::Sender::send`.
//! - **Bounded capacity**: a single ring buffer stores recent events for all receivers.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n` oldest items.
//! - **No persistence**: events are lost if there are no active subscribers at send time.

use tokio::sync::broadcast;
use tracing::trace;

use super::event::Event;

/// Broadcast channel for lifecycle events.
///
/// Cheap to clone (internally holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    ///
    /// With no receivers the event is dropped and traced.
    pub fn publish(&self, ev: Event) {
        if let Err(broadcast::error::SendError(ev)) = self.tx.send(ev) {
            trace!(kind = ?ev.kind, seq = ev.seq, "no event receivers, dropped");
        }
    }

    /// Number of live receivers (listeners and `subscribe()` handles).
    pub fn receivers(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Creates a new receiver that will observe subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}
