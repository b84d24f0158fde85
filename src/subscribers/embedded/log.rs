//! # LogWriter: lifecycle events to `tracing`
//!
//! A minimal subscriber that forwards incoming [`Event`]s to `tracing`
//! under the `gracevisor::events` target.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO gracevisor::events: [signal] signal=Interrupt
//! INFO gracevisor::events: [shutdown-requested]
//! INFO gracevisor::events: [status] status=Draining
//! WARN gracevisor::events: [cleanup-failed] unit="db" err="boom"
//! INFO gracevisor::events: [status] status=Stopped
//! INFO gracevisor::events: [shutdown-completed] failures=1
//! ```

use async_trait::async_trait;
use tracing::{info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::SignalReceived => {
                info!(target: "gracevisor::events", "[signal] signal={:?}", e.signal);
            }
            EventKind::ShutdownRequested => {
                info!(target: "gracevisor::events", "[shutdown-requested]");
            }
            EventKind::ForcedExit => {
                warn!(target: "gracevisor::events", "[forced-exit] signal={:?}", e.signal);
            }
            EventKind::TriggerDisarmed => {
                info!(target: "gracevisor::events", "[trigger-disarmed]");
            }
            EventKind::ShutdownCancelled => {
                warn!(target: "gracevisor::events", "[shutdown-cancelled]");
            }
            EventKind::StatusChanged => {
                info!(target: "gracevisor::events", "[status] status={:?}", e.status);
            }
            EventKind::CleanupFailed => {
                warn!(
                    target: "gracevisor::events",
                    "[cleanup-failed] unit={:?} err={:?}", e.unit, e.error
                );
            }
            EventKind::ShutdownCompleted => {
                info!(
                    target: "gracevisor::events",
                    "[shutdown-completed] failures={:?}", e.failures
                );
            }
            EventKind::SubscriberOverflow => {
                warn!(
                    target: "gracevisor::events",
                    "[subscriber-overflow] subscriber={:?} reason={:?}", e.unit, e.error
                );
            }
            EventKind::SubscriberPanicked => {
                warn!(
                    target: "gracevisor::events",
                    "[subscriber-panicked] subscriber={} info={}",
                    e.unit.as_deref().unwrap_or("unknown"),
                    e.error.as_deref().unwrap_or("unknown"),
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
