//! # Coordinator: the shared shutdown context of a process.
//!
//! [`Coordinator`] bundles everything a shutdown needs to agree on:
//! - the current default [`Registry`] (replaceable, for test isolation)
//! - the lifecycle [`StatusTracker`]
//! - the accumulated errors of trigger-launched attempts
//! - the one-shot launch latch shared by every armed trigger
//! - the event [`Bus`]
//!
//! ## Architecture
//! ```text
//! set_shutdown_trigger(token, cfg) ──► tokio::spawn(trigger::run)
//!                                             │ first signal
//!                                             ▼
//!             status: Running ──► Draining ──► Stopped
//!                                     │           ▲
//!                                     ▼           │
//!                           registry().shutdown(ctx) ──► accumulate(errs)
//!
//! wait_shutdown(): registry completion ──► (if launched) status == Stopped
//! ```
//!
//! The crate-level functions (`gracevisor::register`, ...) use one process-wide
//! coordinator; tests build their own with [`Coordinator::new`].

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::config::TriggerConfig;
use super::registry::Registry;
use super::status::{Status, StatusTracker};
use super::trigger;
use crate::cleanup::{CleanupRef, ShutdownContext};
use crate::error::{CleanupError, MultiError, RegistryError};
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::{Subscribe, SubscriberSet};

/// Default capacity of the event bus.
pub const DEFAULT_BUS_CAPACITY: usize = 256;

/// Shared shutdown state: registry, status, accumulated errors and events.
pub struct Coordinator {
    registry: RwLock<Arc<Registry>>,
    status: StatusTracker,
    errors: Mutex<MultiError>,
    launched: AtomicBool,
    bus: Bus,
}

impl Coordinator {
    /// Creates a coordinator with a fresh registry and default settings.
    pub fn new() -> Arc<Self> {
        Self::builder().build()
    }

    /// Creates a coordinator around an existing registry.
    pub fn with_registry(registry: Arc<Registry>) -> Arc<Self> {
        Self::builder().with_registry(registry).build()
    }

    /// Returns a builder for custom settings.
    pub fn builder() -> CoordinatorBuilder {
        CoordinatorBuilder::default()
    }

    /// Returns the current default registry.
    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry.read())
    }

    /// Replaces the default registry.
    ///
    /// Operations already running against the previous instance keep using it.
    pub fn set_registry(&self, registry: Arc<Registry>) {
        *self.registry.write() = registry;
        debug!("default registry replaced");
    }

    /// Registers `unit` with the current registry.
    pub fn register(&self, unit: CleanupRef) -> Result<(), RegistryError> {
        self.registry().register(unit)
    }

    /// Registers a bare cleanup closure with the current registry.
    pub fn register_fn<F, Fut>(&self, f: F) -> Result<(), RegistryError>
    where
        F: Fn(ShutdownContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), CleanupError>> + Send + 'static,
    {
        self.registry().register_fn(f)
    }

    /// Removes `unit` from the current registry.
    pub fn unregister<T: ?Sized>(&self, unit: &Arc<T>) -> bool {
        self.registry().unregister(unit)
    }

    /// Registers every unit with the current registry.
    ///
    /// # Panics
    /// On the first registration failure.
    #[track_caller]
    pub fn must_register<I>(&self, units: I)
    where
        I: IntoIterator<Item = CleanupRef>,
    {
        self.registry().must_register(units)
    }

    /// Current lifecycle status.
    pub fn status(&self) -> Status {
        self.status.get()
    }

    /// The status tracker (for `subscribe` / `wait_for`).
    pub fn status_tracker(&self) -> &StatusTracker {
        &self.status
    }

    /// Snapshot of every error collected by trigger-launched attempts.
    ///
    /// Reading never drains or duplicates the accumulator.
    pub fn global_error(&self) -> MultiError {
        self.errors.lock().clone()
    }

    /// Arms a shutdown trigger on this coordinator.
    ///
    /// Cancelling `token` before any signal disarms the trigger without shutting
    /// down; cancelling it during an attempt cancels the attempt's context.
    /// Must be called inside a tokio runtime.
    pub fn set_shutdown_trigger(
        self: &Arc<Self>,
        token: CancellationToken,
        cfg: TriggerConfig,
    ) -> JoinHandle<()> {
        tokio::spawn(trigger::run(Arc::clone(self), token, cfg))
    }

    /// Waits until the current registry finished its shutdown.
    ///
    /// If a trigger launched the attempt, also waits until status is
    /// [`Status::Stopped`], so [`Coordinator::global_error`] already holds its errors.
    pub async fn wait_shutdown(&self) {
        self.registry().wait_shutdown().await;
        if self.launched.load(Ordering::Acquire) {
            self.status.wait_for(Status::Stopped).await;
        }
    }

    /// Receiver for lifecycle events published from now on.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Attaches `subs` to the event bus.
    ///
    /// Cancelling `token` delivers what is already queued on the bus, closes
    /// every subscriber queue once and joins the workers.
    /// Must be called inside a tokio runtime.
    pub fn spawn_subscribers(
        &self,
        subs: Vec<Arc<dyn Subscribe>>,
        token: CancellationToken,
    ) -> JoinHandle<()> {
        let set = SubscriberSet::new(subs, self.bus.clone());
        let mut rx = self.bus.subscribe();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    msg = rx.recv() => match msg {
                        Ok(ev) => set.emit(&ev),
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "subscriber listener lagged behind the bus");
                        }
                        Err(RecvError::Closed) => break,
                    },
                    _ = token.cancelled() => {
                        while let Ok(ev) = rx.try_recv() {
                            set.emit(&ev);
                        }
                        break;
                    }
                }
            }
            set.shutdown().await;
        })
    }

    pub(crate) fn publish(&self, ev: Event) {
        self.bus.publish(ev);
    }

    /// Moves status forward, publishing `StatusChanged` on a real change.
    pub(crate) fn advance_status(&self, to: Status) {
        if self.status.advance(to) {
            info!(status = %to, "status changed");
            self.publish(Event::now(EventKind::StatusChanged).with_status(to));
        }
    }

    /// Wins the one-shot launch latch.
    pub(crate) fn try_launch(&self) -> bool {
        self.launched
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Appends a non-empty attempt result to the accumulator.
    pub(crate) fn accumulate(&self, errs: MultiError) {
        if errs.is_empty() {
            return;
        }
        self.errors.lock().extend(errs);
    }
}

/// Builder for [`Coordinator`].
pub struct CoordinatorBuilder {
    registry: Option<Arc<Registry>>,
    bus_capacity: usize,
}

impl CoordinatorBuilder {
    /// Uses `registry` as the initial default registry.
    pub fn with_registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Sets the event bus capacity (minimum 1).
    pub fn with_bus_capacity(mut self, capacity: usize) -> Self {
        self.bus_capacity = capacity;
        self
    }

    /// Builds the coordinator.
    pub fn build(self) -> Arc<Coordinator> {
        Arc::new(Coordinator {
            registry: RwLock::new(self.registry.unwrap_or_default()),
            status: StatusTracker::new(),
            errors: Mutex::new(MultiError::new()),
            launched: AtomicBool::new(false),
            bus: Bus::new(self.bus_capacity),
        })
    }
}

impl Default for CoordinatorBuilder {
    fn default() -> Self {
        Self {
            registry: None,
            bus_capacity: DEFAULT_BUS_CAPACITY,
        }
    }
}
