//! Runtime core: registry, status and the shutdown trigger.
//!
//! Internal modules:
//! - [`registry`]: ordered, one-shot execution of cleanup units;
//! - [`status`]: monotonic lifecycle status;
//! - [`signals`]: OS and user signal sources;
//! - [`config`]: trigger configuration;
//! - [`trigger`]: signal fan-in, shutdown attempt and forced exit;
//! - [`coordinator`]: shared state tying the above together;
//! - [`global`]: process-wide facade over one coordinator.

mod config;
mod coordinator;
mod global;
mod registry;
mod signals;
mod status;
mod trigger;

pub use config::{DEFAULT_SHUTDOWN_TIMEOUT, ExitHook, TriggerConfig};
pub use coordinator::{Coordinator, CoordinatorBuilder, DEFAULT_BUS_CAPACITY};
pub use global::{
    global, global_error, must_register, new_instance, register, register_fn, set_global,
    set_shutdown_trigger, status, unregister, wait_shutdown,
};
pub use registry::Registry;
pub use signals::{Signal, SignalStream};
pub use status::{Status, StatusTracker};
pub use trigger::FORCED_EXIT_CODE;
