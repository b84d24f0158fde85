//! # Shutdown trigger configuration.
//!
//! Provides [`TriggerConfig`] the settings for one armed trigger
//! (see [`Coordinator::set_shutdown_trigger`](crate::Coordinator::set_shutdown_trigger)).
//!
//! A config is built once and consumed by the trigger; it is immutable after that.
//!
//! ## Sentinel values
//! - `timeout = 0s` → no deadline (the attempt waits for every callback)
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use gracevisor::TriggerConfig;
//!
//! let (tx, rx) = tokio::sync::mpsc::channel::<()>(1);
//! let cfg = TriggerConfig::default()
//!     .with_user_channel(rx)
//!     .with_timeout(Duration::from_secs(30));
//!
//! assert_eq!(cfg.shutdown_timeout(), Some(Duration::from_secs(30)));
//! # drop(tx);
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::signals::{self, Signal, SignalStream};

/// Default bound of a shutdown attempt.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Process exit used on a repeated signal.
pub type ExitHook = Arc<dyn Fn(i32) + Send + Sync>;

/// Where OS-level signals come from.
pub(crate) enum SystemSource {
    /// SIGINT + SIGTERM (Ctrl-C off unix), installed lazily by the trigger task.
    Default,
    /// Caller-provided stream.
    Custom(SignalStream),
    /// No OS signals.
    Disabled,
}

/// Configuration of a shutdown trigger.
///
/// ## Field semantics
/// - `timeout`: bound of the shutdown attempt (`0s` = no deadline)
///
/// Signal sources and the exit hook are set through the `with_*` methods.
pub struct TriggerConfig {
    /// Maximum duration of the shutdown attempt.
    ///
    /// - `Duration::ZERO` = no deadline
    /// - `> 0` = the context handed to every callback expires after this long
    pub timeout: Duration,

    pub(crate) system: SystemSource,
    pub(crate) user: Vec<SignalStream>,
    pub(crate) exit_hook: ExitHook,
}

impl TriggerConfig {
    /// Listens for SIGINT and SIGTERM (Ctrl-C on non-unix platforms).
    pub fn with_system_signals(mut self) -> Self {
        self.system = SystemSource::Default;
        self
    }

    /// Replaces the OS signal source with `stream`.
    pub fn with_custom_system_signal<S>(mut self, stream: S) -> Self
    where
        S: Stream<Item = Signal> + Send + 'static,
    {
        self.system = SystemSource::Custom(stream.boxed());
        self
    }

    /// Ignores OS signals; only user sources can trigger.
    pub fn without_system_signals(mut self) -> Self {
        self.system = SystemSource::Disabled;
        self
    }

    /// Adds a user channel: every message is a signal. Closing the channel
    /// before any message counts as one signal.
    pub fn with_user_channel(mut self, rx: mpsc::Receiver<()>) -> Self {
        self.user.push(signals::from_channel(rx));
        self
    }

    /// Adds a user stream: every item is a signal.
    pub fn with_user_stream<S>(mut self, stream: S) -> Self
    where
        S: Stream<Item = ()> + Send + 'static,
    {
        self.user.push(stream.map(|()| Signal::User).boxed());
        self
    }

    /// Adds a token that signals once when cancelled.
    pub fn with_user_token(mut self, token: CancellationToken) -> Self {
        self.user.push(signals::from_token(token));
        self
    }

    /// Sets the shutdown attempt bound (`Duration::ZERO` = no deadline).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replaces the forced-exit action (default: [`std::process::exit`]).
    pub fn with_exit_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(i32) + Send + Sync + 'static,
    {
        self.exit_hook = Arc::new(hook);
        self
    }

    /// Returns the shutdown bound as an `Option`.
    ///
    /// - `None` → no deadline
    /// - `Some(d)` → attempt bounded by `d`
    #[inline]
    pub fn shutdown_timeout(&self) -> Option<Duration> {
        if self.timeout == Duration::ZERO {
            None
        } else {
            Some(self.timeout)
        }
    }

    /// Number of user sources.
    pub fn user_sources(&self) -> usize {
        self.user.len()
    }

    /// Builds the merged source list. Must run inside a tokio runtime.
    pub(crate) fn take_sources(&mut self) -> Vec<SignalStream> {
        let mut sources = std::mem::take(&mut self.user);
        match std::mem::replace(&mut self.system, SystemSource::Disabled) {
            SystemSource::Default => sources.push(signals::system_signals()),
            SystemSource::Custom(stream) => sources.push(stream),
            SystemSource::Disabled => {}
        }
        sources
    }
}

impl Default for TriggerConfig {
    /// Default configuration:
    /// - OS signals: SIGINT + SIGTERM
    /// - no user sources
    /// - `timeout = 15min`
    /// - exit hook: `std::process::exit`
    fn default() -> Self {
        Self {
            timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            system: SystemSource::Default,
            user: Vec::new(),
            exit_hook: Arc::new(process_exit),
        }
    }
}

fn process_exit(code: i32) {
    std::process::exit(code)
}

impl fmt::Debug for TriggerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let system = match self.system {
            SystemSource::Default => "default",
            SystemSource::Custom(_) => "custom",
            SystemSource::Disabled => "disabled",
        };
        f.debug_struct("TriggerConfig")
            .field("timeout", &self.timeout)
            .field("system", &system)
            .field("user", &self.user.len())
            .finish_non_exhaustive()
    }
}
