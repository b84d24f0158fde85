//! # gracevisor
//!
//! **Gracevisor** coordinates orderly process termination.
//!
//! Components register cleanup logic; on the first shutdown signal (OS signal
//! or application-level source) every registered cleanup runs exactly once, in
//! registration order, bounded by a timeout. Failures are collected, never fatal.
//! A repeated signal during shutdown terminates the process immediately.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   Cleanup    │   │   Cleanup    │   │  CleanupFn   │
//!     │ (http drain) │   │  (db pool)   │   │   (flush)    │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼ register         ▼ register         ▼ register_fn
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Coordinator (process-wide via the free functions)                │
//! │  - Registry (ordered units, one-shot shutdown, completion signal) │
//! │  - StatusTracker (Running → Draining → Stopped)                   │
//! │  - error accumulator (MultiError)                                 │
//! │  - Bus (broadcast events)                                         │
//! └──────▲──────────────────────────────────────────────────┬────────┘
//!        │ status, registry.shutdown(ctx)                   │ events
//! ┌──────┴────────────────────────┐                         ▼
//! │  Trigger (one per             │              ┌────────────────────┐
//! │  set_shutdown_trigger call)   │              │   SubscriberSet    │
//! │  select_all(OS, user sources) │              │  (per-sub queues)  │
//! └───────────────────────────────┘              └────────────────────┘
//! ```
//!
//! ### Lifecycle
//! ```text
//! signal #1 ──► status = Draining
//!          └──► spawn attempt:
//!                 ctx = ShutdownContext(child token, timeout)
//!                 for unit in registration order { unit.shutdown(ctx) → errs }
//!                 completion signal fires   (wait_shutdown wakes up)
//!                 global errors += errs     (if any)
//!                 status = Stopped
//! signal #2 ──► exit(1)
//! ```
//!
//! ## Features
//! | Area            | Description                                                  | Key types / traits                        |
//! |-----------------|--------------------------------------------------------------|-------------------------------------------|
//! | **Cleanup**     | Define cleanup units as types or closures.                   | [`Cleanup`], [`CleanupFn`], [`CleanupRef`]|
//! | **Registry**    | Ordered, deduplicated, one-shot execution of units.          | [`Registry`]                              |
//! | **Trigger**     | Signal fan-in, timeout and forced exit.                      | [`TriggerConfig`], [`Signal`]             |
//! | **Status**      | Lifecycle value polled by request handlers.                  | [`Status`], [`StatusTracker`]             |
//! | **Errors**      | Typed errors and their ordered collection.                   | [`RegistryError`], [`MultiError`]         |
//! | **Subscribers** | Observe lifecycle events.                                    | [`Subscribe`], [`Event`]                  |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use gracevisor::{CleanupError, Coordinator, ShutdownContext, Status, TriggerConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let coord = Coordinator::new();
//!
//!     coord.register_fn(|ctx: ShutdownContext| async move {
//!         if ctx.is_cancelled() {
//!             return Err(CleanupError::Canceled);
//!         }
//!         println!("flushing buffers");
//!         Ok(())
//!     })?;
//!
//!     // An application-level source; OS signals are left out for the example.
//!     let done = CancellationToken::new();
//!     let cfg = TriggerConfig::default()
//!         .without_system_signals()
//!         .with_user_token(done.clone())
//!         .with_timeout(Duration::from_secs(5));
//!     coord.set_shutdown_trigger(CancellationToken::new(), cfg);
//!
//!     done.cancel();
//!     coord.wait_shutdown().await;
//!
//!     assert_eq!(coord.status(), Status::Stopped);
//!     coord.global_error().into_result()?;
//!     Ok(())
//! }
//! ```
mod cleanup;
mod core;
mod error;
mod events;
mod subscribers;

// ---- Public re-exports ----

pub use cleanup::{Cleanup, CleanupFn, CleanupRef, ShutdownContext};
pub use self::core::{
    Coordinator, CoordinatorBuilder, DEFAULT_BUS_CAPACITY, DEFAULT_SHUTDOWN_TIMEOUT, ExitHook,
    FORCED_EXIT_CODE, Registry, Signal, SignalStream, Status, StatusTracker, TriggerConfig,
};
pub use self::core::{
    global, global_error, must_register, new_instance, register, register_fn, set_global,
    set_shutdown_trigger, status, unregister, wait_shutdown,
};
pub use error::{CleanupError, MultiError, RegistryError, ShutdownError};
pub use events::{Bus, Event, EventKind};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
