//! # Lifecycle events emitted by the trigger and the coordinator.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Trigger events**: signals observed, shutdown requested, forced exit, disarm, cancellation
//! - **Shutdown events**: status changes, failed cleanups, completion
//! - **Subscriber events**: overflow and panic of event subscribers
//!
//! The [`Event`] struct carries additional metadata such as timestamps, status,
//! signal, unit name and error text.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use gracevisor::{Event, EventKind, Status};
//!
//! let ev = Event::now(EventKind::StatusChanged).with_status(Status::Draining);
//!
//! assert_eq!(ev.kind, EventKind::StatusChanged);
//! assert_eq!(ev.status, Some(Status::Draining));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::core::{Signal, Status};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Trigger events ===
    /// A qualifying signal arrived.
    ///
    /// Sets:
    /// - `signal`: which source fired
    SignalReceived,

    /// First signal observed; a shutdown attempt is being launched.
    ShutdownRequested,

    /// Repeated signal during shutdown; the process is being terminated.
    ///
    /// Sets:
    /// - `signal`: the repeated signal
    ForcedExit,

    /// Trigger token cancelled before any signal; the trigger stopped listening.
    TriggerDisarmed,

    /// Trigger token cancelled after its first signal; the context of the
    /// attempt it launched is cancelled and the trigger stopped listening.
    ShutdownCancelled,

    // === Shutdown events ===
    /// Lifecycle status moved forward.
    ///
    /// Sets:
    /// - `status`: the new value
    StatusChanged,

    /// A cleanup unit reported an error.
    ///
    /// Sets:
    /// - `unit`: unit name (if the error came from a unit)
    /// - `error`: error text
    CleanupFailed,

    /// The shutdown attempt finished.
    ///
    /// Sets:
    /// - `failures`: number of collected errors
    ShutdownCompleted,

    // === Subscriber events ===
    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `unit`: subscriber name
    /// - `error`: reason
    SubscriberOverflow,

    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `unit`: subscriber name
    /// - `error`: panic info
    SubscriberPanicked,
}

/// Lifecycle event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// New status, for [`EventKind::StatusChanged`].
    pub status: Option<Status>,
    /// Signal that caused the event.
    pub signal: Option<Signal>,
    /// Unit or subscriber name, if applicable.
    pub unit: Option<Arc<str>>,
    /// Human-readable error text.
    pub error: Option<Arc<str>>,
    /// Number of collected errors, for [`EventKind::ShutdownCompleted`].
    pub failures: Option<usize>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn now(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            status: None,
            signal: None,
            unit: None,
            error: None,
            failures: None,
        }
    }

    /// Attaches a status.
    #[inline]
    pub fn with_status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    /// Attaches a signal.
    #[inline]
    pub fn with_signal(mut self, signal: Signal) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Attaches a unit name.
    #[inline]
    pub fn with_unit(mut self, unit: impl Into<Arc<str>>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Attaches an error text.
    #[inline]
    pub fn with_error(mut self, error: impl Into<Arc<str>>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Attaches a failure count.
    #[inline]
    pub fn with_failures(mut self, n: usize) -> Self {
        self.failures = Some(n);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::now(EventKind::SubscriberOverflow)
            .with_unit(subscriber)
            .with_error(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::now(EventKind::SubscriberPanicked)
            .with_unit(subscriber)
            .with_error(info)
    }

    /// True for events about subscribers themselves (overflow, panic).
    ///
    /// Failures while delivering these are logged but not republished.
    #[inline]
    pub fn is_subscriber_event(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}
