//! Lifecycle events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted while arming, triggering and running a shutdown.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: the trigger loop, the shutdown attempt, `Coordinator` status
//!   transitions, `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: `Coordinator::spawn_subscribers` (fans out to a `SubscriberSet`)
//!   and any receiver from `Coordinator::events`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
