//! # Process-wide facade.
//!
//! Free functions over one lazily created [`Coordinator`], for applications that
//! do not want to pass a coordinator around. Every function delegates; none has
//! logic of its own.
//!
//! ## Example
//! ```rust,no_run
//! use gracevisor::{CleanupError, ShutdownContext, TriggerConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() {
//!     gracevisor::register_fn(|_ctx: ShutdownContext| async {
//!         // flush buffers, close connections ...
//!         Ok::<(), CleanupError>(())
//!     })
//!     .expect("registry is active");
//!
//!     gracevisor::set_shutdown_trigger(CancellationToken::new(), TriggerConfig::default());
//!     gracevisor::wait_shutdown().await;
//!
//!     let errs = gracevisor::global_error();
//!     if !errs.is_empty() {
//!         eprintln!("shutdown finished with errors: {errs}");
//!     }
//! }
//! ```

use std::future::Future;
use std::sync::{Arc, LazyLock};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::config::TriggerConfig;
use super::coordinator::Coordinator;
use super::registry::Registry;
use super::status::Status;
use crate::cleanup::{Cleanup, CleanupRef, ShutdownContext};
use crate::error::{CleanupError, MultiError, RegistryError};

static GLOBAL: LazyLock<Arc<Coordinator>> = LazyLock::new(Coordinator::new);

/// The process-wide coordinator.
pub fn global() -> &'static Arc<Coordinator> {
    &GLOBAL
}

/// Replaces the default registry of the process-wide coordinator.
///
/// Intended for test isolation. Callers replacing it while other operations are
/// in flight must synchronize themselves.
pub fn set_global(registry: Arc<Registry>) {
    GLOBAL.set_registry(registry);
}

/// See [`Registry::register`].
pub fn register(unit: CleanupRef) -> Result<(), RegistryError> {
    GLOBAL.register(unit)
}

/// See [`Registry::register_fn`].
pub fn register_fn<F, Fut>(f: F) -> Result<(), RegistryError>
where
    F: Fn(ShutdownContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), CleanupError>> + Send + 'static,
{
    GLOBAL.register_fn(f)
}

/// See [`Registry::unregister`].
pub fn unregister<T: ?Sized>(unit: &Arc<T>) -> bool {
    GLOBAL.unregister(unit)
}

/// See [`Registry::must_register`].
///
/// # Panics
/// On the first registration failure.
#[track_caller]
pub fn must_register<I>(units: I)
where
    I: IntoIterator<Item = CleanupRef>,
{
    GLOBAL.must_register(units)
}

/// Builds a unit with `make`, registers it with [`must_register`] and returns it.
///
/// # Panics
/// If the registration fails.
#[track_caller]
pub fn new_instance<T, F>(make: F) -> Arc<T>
where
    T: Cleanup,
    F: FnOnce() -> T,
{
    let unit = Arc::new(make());
    let as_ref: CleanupRef = unit.clone();
    must_register([as_ref]);
    unit
}

/// See [`Coordinator::set_shutdown_trigger`].
pub fn set_shutdown_trigger(token: CancellationToken, cfg: TriggerConfig) -> JoinHandle<()> {
    GLOBAL.set_shutdown_trigger(token, cfg)
}

/// See [`Coordinator::wait_shutdown`].
pub async fn wait_shutdown() {
    GLOBAL.wait_shutdown().await
}

/// Current lifecycle status of the process.
pub fn status() -> Status {
    GLOBAL.status()
}

/// See [`Coordinator::global_error`].
pub fn global_error() -> MultiError {
    GLOBAL.global_error()
}
