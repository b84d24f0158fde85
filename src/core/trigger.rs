//! # Shutdown trigger: signals in, one shutdown attempt out.
//!
//! [`run`] is the body of the background task armed by
//! [`Coordinator::set_shutdown_trigger`](crate::Coordinator::set_shutdown_trigger).
//!
//! ## State machine
//! ```text
//!             ┌──────────── token cancelled ──────────► Disarmed (no shutdown)
//!             │
//!  Listening ─┼── 1st signal ──► status = Draining
//!             │                  latch won? ──► spawn attempt():
//!             │                                   ctx = child token + timeout
//!             │                                   errs = registry.shutdown(ctx)
//!             │                                   accumulate(errs) if non-empty
//!             │                                   status = Stopped
//!             │
//!  Draining ──┬── any later signal ──► ForcedExit: exit_hook(1)
//!             └── token cancelled ──► ShutdownCancelled (attempt context cancelled)
//! ```
//!
//! ## Rules
//! - The "first signal seen" flag is local to the trigger, not the registry's disposed flag:
//!   the forced-exit path stays reachable even with an empty or already disposed registry.
//! - The attempt runs on its own task, so the loop goes straight back to listening.
//! - The launch latch lives on the coordinator; two triggers never launch two attempts.
//! - Sources that end are dropped; with none left the trigger waits for cancellation only.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::config::TriggerConfig;
use super::coordinator::Coordinator;
use super::status::Status;
use crate::cleanup::ShutdownContext;
use crate::error::ShutdownError;
use crate::events::{Event, EventKind};

/// Exit status used when a repeated signal forces termination.
pub const FORCED_EXIT_CODE: i32 = 1;

/// Runs the trigger loop until the token is cancelled or a forced exit happens.
pub(crate) async fn run(coord: Arc<Coordinator>, token: CancellationToken, mut cfg: TriggerConfig) {
    let timeout = cfg.timeout;
    let exit_hook = Arc::clone(&cfg.exit_hook);
    let mut signals = stream::select_all(cfg.take_sources());
    let mut exhausted = signals.is_empty();
    let mut seen_first = false;

    debug!(sources = signals.len(), ?timeout, "shutdown trigger armed");

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                if seen_first {
                    info!("shutdown trigger cancelled during shutdown");
                    coord.publish(Event::now(EventKind::ShutdownCancelled));
                } else {
                    info!("shutdown trigger disarmed");
                    coord.publish(Event::now(EventKind::TriggerDisarmed));
                }
                return;
            }
            next = signals.next(), if !exhausted => {
                let Some(signal) = next else {
                    debug!("every signal source ended; waiting for disarm");
                    exhausted = true;
                    continue;
                };
                coord.publish(Event::now(EventKind::SignalReceived).with_signal(signal));

                if seen_first {
                    warn!(signal = signal.as_label(), "repeated shutdown signal, forcing exit");
                    coord.publish(Event::now(EventKind::ForcedExit).with_signal(signal));
                    exit_hook(FORCED_EXIT_CODE);
                    return;
                }
                seen_first = true;

                info!(signal = signal.as_label(), "shutdown signal received");
                coord.publish(Event::now(EventKind::ShutdownRequested).with_signal(signal));
                coord.advance_status(Status::Draining);

                if coord.try_launch() {
                    let ctx = ShutdownContext::with_timeout(token.child_token(), timeout);
                    tokio::spawn(attempt(Arc::clone(&coord), ctx));
                } else {
                    debug!("shutdown attempt already launched");
                }
            }
        }
    }
}

/// Single shutdown attempt against the coordinator's current registry.
async fn attempt(coord: Arc<Coordinator>, ctx: ShutdownContext) {
    let registry = coord.registry();
    let errs = registry.shutdown(ctx.clone()).await;
    // Stops the deadline timer.
    ctx.cancel();

    for err in &errs {
        let mut ev = Event::now(EventKind::CleanupFailed).with_error(err.to_string());
        if let ShutdownError::Cleanup { unit, .. } = err {
            ev = ev.with_unit(&**unit);
        }
        coord.publish(ev);
    }

    let failures = errs.len();
    coord.accumulate(errs);
    coord.advance_status(Status::Stopped);

    info!(failures, "shutdown attempt finished");
    coord.publish(Event::now(EventKind::ShutdownCompleted).with_failures(failures));
}
