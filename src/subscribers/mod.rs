//! # Lifecycle event subscribers.
//!
//! This module provides the [`Subscribe`] trait and the [`SubscriberSet`] fan-out
//! used to deliver [`Event`](crate::Event)s published on the coordinator's bus.
//!
//! ## Architecture
//! ```text
//! Trigger / Coordinator ── publish(Event) ──► Bus ──► listener ──► SubscriberSet
//!                                                                    │
//!                                                   ┌────────────────┼──────────┐
//!                                                   ▼                ▼          ▼
//!                                               LogWriter        readiness    custom
//! ```

#[cfg(feature = "logging")]
mod embedded;
mod set;
mod subscriber;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
