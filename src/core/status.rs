//! # Process lifecycle status.
//!
//! [`Status`] advances `Running → Draining → Stopped` and never goes back.
//! [`StatusTracker`] keeps the current value in a [`tokio::sync::watch`] channel:
//! reads are cheap and non-async, writers only notify when the value actually changes.
//!
//! ## Architecture
//! ```text
//! Trigger ──► StatusTracker::advance(to) ──► watch::Sender (send_if_modified)
//!                                              │
//!              request handlers ◄── get() ─────┤
//!              watchers         ◄── subscribe()┘
//! ```
//!
//! ## Rules
//! - Only forward transitions are applied; `advance` to the same or an earlier
//!   value is a no-op and returns `false`.
//! - A write is visible to every reader once `advance` returns.
//! - The tracker is independent from the registry lock.

use std::fmt;

use tokio::sync::watch;

/// Lifecycle value of the process.
#[repr(u8)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Status {
    /// Normal operation; new work is accepted.
    #[default]
    Running = 0,
    /// A shutdown signal was observed; cleanup is in progress.
    Draining = 1,
    /// Cleanup finished.
    Stopped = 2,
}

impl Status {
    /// True only while [`Status::Running`].
    ///
    /// Request-handling code polls this to reject new work once draining began.
    pub fn is_accepting_work(self) -> bool {
        self == Status::Running
    }

    /// Stable name of the status.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Running => "Running",
            Status::Draining => "Draining",
            Status::Stopped => "Stopped",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<u8> for Status {
    type Error = u8;

    /// Converts a raw value; unknown values are handed back as the error.
    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(Status::Running),
            1 => Ok(Status::Draining),
            2 => Ok(Status::Stopped),
            other => Err(other),
        }
    }
}

/// Thread-safe holder of the current [`Status`].
#[derive(Debug)]
pub struct StatusTracker {
    tx: watch::Sender<Status>,
}

impl StatusTracker {
    /// Creates a tracker starting at [`Status::Running`].
    pub fn new() -> Self {
        Self {
            tx: watch::Sender::new(Status::Running),
        }
    }

    /// Returns the current status.
    pub fn get(&self) -> Status {
        *self.tx.borrow()
    }

    /// Moves the status forward to `to`.
    ///
    /// Returns `true` if the value changed; watchers are notified only in that case.
    pub(crate) fn advance(&self, to: Status) -> bool {
        self.tx.send_if_modified(|current| {
            if to > *current {
                *current = to;
                true
            } else {
                false
            }
        })
    }

    /// Returns a receiver that observes every change.
    pub fn subscribe(&self) -> watch::Receiver<Status> {
        self.tx.subscribe()
    }

    /// Waits until the status reaches at least `target`.
    pub async fn wait_for(&self, target: Status) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so the channel cannot close here.
        let _ = rx.wait_for(|s| *s >= target).await;
    }
}

impl Default for StatusTracker {
    fn default() -> Self {
        Self::new()
    }
}
