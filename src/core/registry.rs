//! # Cleanup registry - ordered, one-shot shutdown of registered units.
//!
//! The [`Registry`] tracks cleanup units under concurrent registration and removal,
//! then runs them all exactly once in [`Registry::shutdown`].
//!
//! ## Architecture
//! ```text
//! register(unit) ───► Mutex<Entries>  (seq → entry, identity → seq)
//! register_fn(f) ───►        │
//! unregister(unit) ─►        │
//!                            ▼
//! shutdown(ctx):  disposed CAS (false → true, exactly one winner)
//!                   ├─► take entries in registration order
//!                   ├─► entry.shutdown(ctx) one by one, errors → MultiError
//!                   └─► done guard drops ──► wakes every wait_shutdown()
//! ```
//!
//! ## Rules
//! - Identity of a unit is the address of its `Arc` allocation.
//! - Function units get a fresh sequence number and no identity; they cannot be unregistered.
//! - Callbacks run sequentially in registration order; a failure never skips later ones.
//! - After disposal every mutation fails and `shutdown` returns the disposal sentinel.
//! - The completion signal fires exactly once: after the last callback returned,
//!   or when an in-flight `shutdown` future is dropped.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::FutureExt;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cleanup::{CleanupFn, CleanupRef, ShutdownContext};
use crate::error::{CleanupError, MultiError, RegistryError, ShutdownError, panic_message};

/// Registered cleanup unit.
struct Entry {
    /// Name used in logs and collected errors.
    name: Cow<'static, str>,
    /// The unit itself.
    unit: CleanupRef,
}

/// Entries in registration order plus the identity index.
#[derive(Default)]
struct Entries {
    /// Sequence number → entry; iteration order is registration order.
    ordered: BTreeMap<u64, Entry>,
    /// Unit identity → sequence number (function units are absent).
    index: HashMap<usize, u64>,
    /// Next sequence number to hand out.
    next_seq: u64,
}

impl Entries {
    fn insert(&mut self, identity: Option<usize>, entry: Entry) {
        let seq = self.next_seq;
        self.next_seq += 1;
        if let Some(id) = identity {
            self.index.insert(id, seq);
        }
        self.ordered.insert(seq, entry);
    }
}

/// Thread-safe registry of cleanup units.
///
/// Create one with [`Registry::new`]; most applications use the process-wide
/// instance through the crate-level functions instead.
pub struct Registry {
    entries: Mutex<Entries>,
    disposed: AtomicBool,
    done: CancellationToken,
}

impl Registry {
    /// Creates an empty, active registry.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Entries::default()),
            disposed: AtomicBool::new(false),
            done: CancellationToken::new(),
        }
    }

    /// Registers `unit` keyed by its `Arc` identity.
    ///
    /// ### Errors
    /// - [`RegistryError::AlreadyRegistered`] if the same `Arc` is already present;
    /// - [`RegistryError::ShutdownCalled`] if the registry was shut down.
    pub fn register(&self, unit: CleanupRef) -> Result<(), RegistryError> {
        self.ensure_active()?;

        let mut entries = self.entries.lock();
        self.ensure_active()?;

        let id = identity(&unit);
        if entries.index.contains_key(&id) {
            return Err(RegistryError::AlreadyRegistered);
        }

        let name: Cow<'static, str> = Cow::Owned(unit.name().to_owned());
        debug!(unit = %name, "cleanup unit registered");
        entries.insert(Some(id), Entry { name, unit });
        Ok(())
    }

    /// Registers a bare cleanup closure.
    ///
    /// Every call creates an independent entry, even for the same closure;
    /// such entries cannot be removed with [`Registry::unregister`].
    ///
    /// ### Errors
    /// [`RegistryError::ShutdownCalled`] if the registry was shut down.
    pub fn register_fn<F, Fut>(&self, f: F) -> Result<(), RegistryError>
    where
        F: Fn(ShutdownContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), CleanupError>> + Send + 'static,
    {
        self.ensure_active()?;

        let mut entries = self.entries.lock();
        self.ensure_active()?;

        let name: Cow<'static, str> = Cow::Owned(format!("cleanup-fn-{}", entries.next_seq));
        let unit: CleanupRef = CleanupFn::arc(name.clone(), f);
        debug!(unit = %name, "cleanup function registered");
        entries.insert(None, Entry { name, unit });
        Ok(())
    }

    /// Removes a previously registered unit.
    ///
    /// Returns `true` if a matching entry existed. Always `false` after shutdown.
    pub fn unregister<T: ?Sized>(&self, unit: &Arc<T>) -> bool {
        if self.ensure_active().is_err() {
            return false;
        }

        let mut entries = self.entries.lock();
        if self.ensure_active().is_err() {
            return false;
        }

        let Some(seq) = entries.index.remove(&identity(unit)) else {
            return false;
        };
        if let Some(entry) = entries.ordered.remove(&seq) {
            debug!(unit = %entry.name, "cleanup unit unregistered");
        }
        true
    }

    /// Registers every unit in turn.
    ///
    /// Intended for startup wiring, where a duplicate or late registration is a
    /// programming error.
    ///
    /// # Panics
    /// On the first registration failure.
    #[track_caller]
    pub fn must_register<I>(&self, units: I)
    where
        I: IntoIterator<Item = CleanupRef>,
    {
        for unit in units {
            if let Err(err) = self.register(unit) {
                panic!("must_register: {err}");
            }
        }
    }

    /// Runs every registered cleanup exactly once, in registration order.
    ///
    /// Only the first caller performs the shutdown; concurrent and later callers
    /// get a [`MultiError`] holding [`RegistryError::ShutdownCalled`].
    /// The returned collection holds one entry per failed callback, in invocation order.
    ///
    /// Dropping the future before it completes skips the units that have not run
    /// yet. The registry stays disposed and the completion signal still fires.
    pub async fn shutdown(&self, ctx: ShutdownContext) -> MultiError {
        if let Err(err) = self.ensure_active() {
            return MultiError::from(err);
        }

        let ordered = {
            let mut entries = self.entries.lock();
            if self
                .disposed
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                return MultiError::from(RegistryError::ShutdownCalled);
            }
            entries.index.clear();
            std::mem::take(&mut entries.ordered)
        };
        // Fires on return, and also if this future is dropped mid-sequence.
        let _done = self.done.clone().drop_guard();

        debug!(units = ordered.len(), "running cleanup units");
        let mut errs = MultiError::new();
        for entry in ordered.into_values() {
            if let Err(err) = run_one(&entry, ctx.clone()).await {
                warn!(unit = %entry.name, error = %err, "cleanup unit failed");
                errs.push(ShutdownError::Cleanup {
                    unit: entry.name,
                    source: err,
                });
            }
        }
        errs
    }

    /// Waits until [`Registry::shutdown`] has finished running every callback.
    ///
    /// Returns immediately if it already did; any number of callers may wait.
    pub async fn wait_shutdown(&self) {
        self.done.cancelled().await;
    }

    /// True once a shutdown has started.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Number of currently registered units.
    pub fn len(&self) -> usize {
        self.entries.lock().ordered.len()
    }

    /// True if no unit is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ensure_active(&self) -> Result<(), RegistryError> {
        if self.is_disposed() {
            Err(RegistryError::ShutdownCalled)
        } else {
            Ok(())
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs one cleanup, turning a panic into [`CleanupError::Panicked`].
async fn run_one(entry: &Entry, ctx: ShutdownContext) -> Result<(), CleanupError> {
    let fut = entry.unit.shutdown(ctx);
    match std::panic::AssertUnwindSafe(fut).catch_unwind().await {
        Ok(res) => res,
        Err(panic) => Err(CleanupError::Panicked {
            info: panic_message(panic.as_ref()),
        }),
    }
}

/// Identity of a unit: the address of its `Arc` allocation.
fn identity<T: ?Sized>(unit: &Arc<T>) -> usize {
    Arc::as_ptr(unit).cast::<()>() as usize
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::cleanup::Cleanup;

    /// Unit that counts its calls and records its label into a shared log.
    struct Probe {
        label: &'static str,
        calls: AtomicUsize,
        fail: Option<&'static str>,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Probe {
        fn new(label: &'static str, log: &Arc<Mutex<Vec<&'static str>>>) -> Arc<Self> {
            Arc::new(Self {
                label,
                calls: AtomicUsize::new(0),
                fail: None,
                log: Arc::clone(log),
            })
        }

        fn failing(
            label: &'static str,
            msg: &'static str,
            log: &Arc<Mutex<Vec<&'static str>>>,
        ) -> Arc<Self> {
            Arc::new(Self {
                label,
                calls: AtomicUsize::new(0),
                fail: Some(msg),
                log: Arc::clone(log),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Cleanup for Probe {
        fn name(&self) -> &str {
            self.label
        }

        async fn shutdown(&self, _ctx: ShutdownContext) -> Result<(), CleanupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.log.lock().push(self.label);
            match self.fail {
                Some(msg) => Err(CleanupError::fail(msg)),
                None => Ok(()),
            }
        }
    }

    fn new_log() -> Arc<Mutex<Vec<&'static str>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[tokio::test]
    async fn test_register_then_duplicate() {
        let reg = Registry::new();
        let log = new_log();
        let a = Probe::new("a", &log);

        assert_eq!(reg.register(a.clone()), Ok(()));
        assert_eq!(
            reg.register(a.clone()),
            Err(RegistryError::AlreadyRegistered)
        );
        assert_eq!(reg.len(), 1);
    }

    #[tokio::test]
    async fn test_distinct_allocations_are_distinct_units() {
        let reg = Registry::new();
        let log = new_log();

        assert!(reg.register(Probe::new("same", &log)).is_ok());
        assert!(reg.register(Probe::new("same", &log)).is_ok());
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn test_concurrent_register_same_unit_single_winner() {
        let reg = Arc::new(Registry::new());
        let unit: CleanupRef = Probe::new("shared", &new_log());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let reg = Arc::clone(&reg);
                let unit = Arc::clone(&unit);
                std::thread::spawn(move || reg.register(unit))
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let ok = results.iter().filter(|r| r.is_ok()).count();
        let dup = results
            .iter()
            .filter(|r| **r == Err(RegistryError::AlreadyRegistered))
            .count();
        assert_eq!(ok, 1);
        assert_eq!(dup, 15);
    }

    #[tokio::test]
    async fn test_unregister_is_idempotent() {
        let reg = Registry::new();
        let log = new_log();
        let a = Probe::new("a", &log);

        assert!(!reg.unregister(&a), "never registered");
        reg.register(a.clone()).unwrap();
        assert!(reg.unregister(&a));
        assert!(!reg.unregister(&a));
        assert!(reg.is_empty());

        reg.shutdown(ShutdownContext::background()).await;
        assert_eq!(a.calls(), 0, "removed unit must not run");
    }

    #[tokio::test]
    async fn test_unregister_then_register_again() {
        let reg = Registry::new();
        let a = Probe::new("a", &new_log());

        reg.register(a.clone()).unwrap();
        assert!(reg.unregister(&a));
        assert_eq!(reg.register(a.clone()), Ok(()));
    }

    #[tokio::test]
    async fn test_register_fn_allows_duplicates_and_is_not_removable() {
        let reg = Registry::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let make = || {
            let calls = Arc::clone(&calls);
            move |_ctx: ShutdownContext| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<(), CleanupError>(())
                }
            }
        };
        let f = make();
        reg.register_fn(f.clone()).unwrap();
        reg.register_fn(f).unwrap();
        assert_eq!(reg.len(), 2);

        let errs = reg.shutdown(ShutdownContext::background()).await;
        assert!(errs.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_shutdown_runs_in_registration_order() {
        let reg = Registry::new();
        let log = new_log();
        let a = Probe::new("a", &log);
        let b = Probe::new("b", &log);
        let c = Probe::new("c", &log);
        let d = Probe::new("d", &log);

        for unit in [&a, &b, &c, &d] {
            reg.register(unit.clone()).unwrap();
        }
        assert!(reg.unregister(&b));

        let errs = reg.shutdown(ShutdownContext::background()).await;
        assert!(errs.is_empty());
        assert_eq!(*log.lock(), vec!["a", "c", "d"]);
        assert_eq!(b.calls(), 0);
    }

    #[tokio::test]
    async fn test_failure_does_not_abort_sequence() {
        let reg = Registry::new();
        let log = new_log();
        let a = Probe::new("a", &log);
        let b = Probe::failing("b", "boom", &log);
        let c = Probe::new("c", &log);

        let units: [CleanupRef; 3] = [a.clone(), b.clone(), c.clone()];
        reg.must_register(units);

        let errs = reg.shutdown(ShutdownContext::background()).await;
        assert_eq!(errs.len(), 1);
        assert!(errs.to_string().contains("boom"));
        match errs.first() {
            Some(ShutdownError::Cleanup { unit, source }) => {
                assert_eq!(unit, "b");
                assert_eq!(*source, CleanupError::fail("boom"));
            }
            other => panic!("unexpected entry: {other:?}"),
        }
        assert_eq!((a.calls(), b.calls(), c.calls()), (1, 1, 1));
        assert_eq!(*log.lock(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_panicking_cleanup_is_collected() {
        let reg = Registry::new();
        let log = new_log();
        let after = Probe::new("after", &log);

        reg.register_fn(|_ctx: ShutdownContext| async move {
            if true {
                panic!("kaboom");
            }
            Ok::<(), CleanupError>(())
        })
        .unwrap();
        reg.register(after.clone()).unwrap();

        let errs = reg.shutdown(ShutdownContext::background()).await;
        assert_eq!(errs.len(), 1);
        assert_eq!(errs.first().map(|e| e.as_label()), Some("cleanup_panicked"));
        assert!(errs.to_string().contains("kaboom"));
        assert_eq!(after.calls(), 1);

        tokio::time::timeout(Duration::from_millis(100), reg.wait_shutdown())
            .await
            .expect("completion signal fires after a panic");
    }

    #[tokio::test]
    async fn test_second_shutdown_returns_sentinel() {
        let reg = Registry::new();
        let a = Probe::new("a", &new_log());
        reg.register(a.clone()).unwrap();

        assert!(reg.shutdown(ShutdownContext::background()).await.is_empty());
        let again = reg.shutdown(ShutdownContext::background()).await;

        assert_eq!(again.len(), 1);
        assert!(again.contains(RegistryError::ShutdownCalled));
        assert_eq!(a.calls(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_shutdown_single_winner() {
        let reg = Arc::new(Registry::new());
        let log = new_log();
        let units: Vec<_> = (0..5).map(|_| Probe::new("u", &log)).collect();
        for u in &units {
            reg.register(u.clone()).unwrap();
        }

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let reg = Arc::clone(&reg);
                tokio::spawn(async move { reg.shutdown(ShutdownContext::background()).await })
            })
            .collect();

        let mut sentinels = 0;
        for h in handles {
            let errs = h.await.unwrap();
            if errs.contains(RegistryError::ShutdownCalled) {
                assert_eq!(errs.len(), 1);
                sentinels += 1;
            } else {
                assert!(errs.is_empty());
            }
        }
        assert_eq!(sentinels, 7);
        assert!(units.iter().all(|u| u.calls() == 1));
    }

    #[tokio::test]
    async fn test_mutations_after_disposal_fail() {
        let reg = Registry::new();
        let log = new_log();
        let a = Probe::new("a", &log);
        reg.register(a.clone()).unwrap();
        reg.shutdown(ShutdownContext::background()).await;

        let b = Probe::new("b", &log);
        assert_eq!(reg.register(b), Err(RegistryError::ShutdownCalled));
        assert_eq!(
            reg.register_fn(|_ctx: ShutdownContext| async { Ok::<(), CleanupError>(()) }),
            Err(RegistryError::ShutdownCalled)
        );
        assert!(!reg.unregister(&a), "frozen state is never mutated");
        assert!(reg.is_disposed());
    }

    #[tokio::test]
    #[should_panic(expected = "must_register")]
    async fn test_must_register_panics_on_duplicate() {
        let reg = Registry::new();
        let a: CleanupRef = Probe::new("a", &new_log());
        reg.must_register([a.clone(), a]);
    }

    #[tokio::test]
    async fn test_wait_shutdown_blocks_until_done() {
        let reg = Arc::new(Registry::new());

        let blocked = tokio::time::timeout(Duration::from_millis(100), reg.wait_shutdown()).await;
        assert!(blocked.is_err(), "must block before shutdown");

        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let reg = Arc::clone(&reg);
                tokio::spawn(async move { reg.wait_shutdown().await })
            })
            .collect();

        reg.shutdown(ShutdownContext::background()).await;
        for w in waiters {
            tokio::time::timeout(Duration::from_secs(1), w)
                .await
                .expect("waiter released")
                .unwrap();
        }
        // Already completed: returns immediately.
        reg.wait_shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_shutdown_still_fires_completion() {
        let reg = Registry::new();
        let late = Probe::new("late", &new_log());
        reg.register_fn(|_ctx: ShutdownContext| async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<(), CleanupError>(())
        })
        .unwrap();
        reg.register(late.clone()).unwrap();

        let cut = tokio::time::timeout(
            Duration::from_millis(50),
            reg.shutdown(ShutdownContext::background()),
        )
        .await;
        assert!(cut.is_err(), "outer timeout drops the shutdown future");
        assert!(reg.is_disposed());
        assert_eq!(late.calls(), 0, "units after the cut are skipped");

        tokio::time::timeout(Duration::from_secs(1), reg.wait_shutdown())
            .await
            .expect("completion signal fires when the future is dropped");
        let again = reg.shutdown(ShutdownContext::background()).await;
        assert!(again.contains(RegistryError::ShutdownCalled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_context_deadline_reaches_callbacks() {
        let reg = Registry::new();
        reg.register_fn(|ctx: ShutdownContext| async move {
            ctx.cancelled().await;
            Err::<(), _>(CleanupError::Timeout {
                timeout: Duration::from_secs(2),
            })
        })
        .unwrap();

        let ctx = ShutdownContext::with_timeout(CancellationToken::new(), Duration::from_secs(2));
        let errs = reg.shutdown(ctx).await;
        assert_eq!(errs.first().map(|e| e.as_label()), Some("cleanup_timeout"));
    }
}
