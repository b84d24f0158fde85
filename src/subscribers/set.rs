//! # Non-blocking event fan-out to multiple subscribers.
//!
//! Provides [`SubscriberSet`], which distributes events to multiple subscribers
//! without blocking the publisher (the trigger or a status transition).
//!
//! ## Architecture
//! ```text
//! emit(event)
//!     │
//!     ├──► [queue 1] ──► worker 1 ──► subscriber1.on_event()
//!     │    (bounded)         └──────► panic → SubscriberPanicked
//!     ├──► [queue 2] ──► worker 2 ──► subscriber2.on_event()
//!     └──► [queue N] ──► worker N ──► subscriberN.on_event()
//! ```
//!
//! ## Rules
//! - `emit()` never waits: a full or closed queue drops the event for that subscriber only.
//! - Each subscriber sees its events in publish order, on its own worker task.
//! - A panic inside `on_event` is caught; the worker keeps serving the queue.
//! - Drops and panics caused by subscriber events are logged, never republished.
//! - [`SubscriberSet::shutdown`] consumes the set, so queues close exactly once.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::warn;

use crate::error::panic_message;
use crate::events::{Bus, Event};
use crate::subscribers::Subscribe;

/// Sending half of one subscriber queue.
struct Queue {
    name: &'static str,
    tx: mpsc::Sender<Arc<Event>>,
}

/// Fan-out over per-subscriber queues and worker tasks.
pub struct SubscriberSet {
    queues: Vec<Queue>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Creates a new set and spawns one worker task per subscriber.
    ///
    /// Must be called inside a tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let (queues, workers): (Vec<Queue>, Vec<JoinHandle<()>>) = subs
            .into_iter()
            .map(|sub| {
                let (tx, rx) = mpsc::channel(sub.queue_capacity().max(1));
                let queue = Queue {
                    name: sub.name(),
                    tx,
                };
                (queue, tokio::spawn(deliver(sub, rx, bus.clone())))
            })
            .unzip();

        Self {
            queues,
            workers,
            bus,
        }
    }

    /// Hands `event` to every subscriber queue without waiting.
    pub fn emit(&self, event: &Event) {
        let shared = Arc::new(event.clone());
        for queue in &self.queues {
            let reason = match queue.tx.try_send(Arc::clone(&shared)) {
                Ok(()) => continue,
                Err(TrySendError::Full(_)) => "full",
                Err(TrySendError::Closed(_)) => "closed",
            };
            warn!(subscriber = queue.name, reason, kind = ?event.kind, "subscriber dropped event");
            if !event.is_subscriber_event() {
                self.bus.publish(Event::subscriber_overflow(queue.name, reason));
            }
        }
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queues.len()
    }

    /// True if there are no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    /// Closes every queue and waits for the workers to drain them.
    pub async fn shutdown(self) {
        drop(self.queues);
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}

/// Worker body: feeds queued events to `sub` until its queue closes.
async fn deliver(sub: Arc<dyn Subscribe>, mut rx: mpsc::Receiver<Arc<Event>>, bus: Bus) {
    let name = sub.name();
    while let Some(ev) = rx.recv().await {
        let Err(panic) = AssertUnwindSafe(sub.on_event(&ev)).catch_unwind().await else {
            continue;
        };
        let info = panic_message(panic.as_ref());
        warn!(subscriber = name, kind = ?ev.kind, %info, "subscriber panicked");
        if !ev.is_subscriber_event() {
            bus.publish(Event::subscriber_panicked(name, info));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::*;
    use crate::events::EventKind;

    #[derive(Default)]
    struct Collect {
        seen: Mutex<Vec<EventKind>>,
    }

    #[async_trait]
    impl Subscribe for Collect {
        async fn on_event(&self, ev: &Event) {
            self.seen.lock().push(ev.kind);
        }

        fn name(&self) -> &'static str {
            "collect"
        }
    }

    struct Explode;

    #[async_trait]
    impl Subscribe for Explode {
        async fn on_event(&self, _ev: &Event) {
            panic!("subscriber bug");
        }

        fn name(&self) -> &'static str {
            "explode"
        }
    }

    #[tokio::test]
    async fn test_fifo_delivery_and_drain_on_shutdown() {
        let collect = Arc::new(Collect::default());
        let subs: Vec<Arc<dyn Subscribe>> = vec![collect.clone()];
        let set = SubscriberSet::new(subs, Bus::new(16));
        assert_eq!(set.len(), 1);

        set.emit(&Event::now(EventKind::SignalReceived));
        set.emit(&Event::now(EventKind::ShutdownRequested));
        set.emit(&Event::now(EventKind::ShutdownCompleted));
        set.shutdown().await;

        assert_eq!(
            *collect.seen.lock(),
            vec![
                EventKind::SignalReceived,
                EventKind::ShutdownRequested,
                EventKind::ShutdownCompleted
            ]
        );
    }

    #[tokio::test]
    async fn test_panic_is_reported_and_isolated() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let collect = Arc::new(Collect::default());
        let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(Explode), collect.clone()];
        let set = SubscriberSet::new(subs, bus);

        set.emit(&Event::now(EventKind::StatusChanged));

        let ev = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("panic event")
            .unwrap();
        assert_eq!(ev.kind, EventKind::SubscriberPanicked);
        assert_eq!(ev.unit.as_deref(), Some("explode"));

        set.shutdown().await;
        assert_eq!(*collect.seen.lock(), vec![EventKind::StatusChanged]);
    }

    #[tokio::test]
    async fn test_panic_on_subscriber_event_is_not_republished() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(Explode)];
        let set = SubscriberSet::new(subs, bus);

        set.emit(&Event::subscriber_panicked("explode", "earlier".to_string()));
        set.emit(&Event::subscriber_overflow("other", "full"));
        set.shutdown().await;

        assert!(rx.try_recv().is_err(), "nothing republished");
    }
}
