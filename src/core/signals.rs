//! # Shutdown signal sources.
//!
//! Provides the [`Signal`] enum and the stream adapters the trigger fans in.
//!
//! ## Signals
//! **Unix platforms:**
//! - `SIGINT` (Ctrl-C in terminal)
//! - `SIGTERM` (default kill signal, used by systemd/Kubernetes)
//!
//! **Other platforms:**
//! - `Ctrl-C` via [`tokio::signal::ctrl_c`]
//!
//! Every source becomes a [`SignalStream`]; the trigger merges them with
//! [`futures::stream::select_all`], so the first arrival among any of them counts.

use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
#[cfg(not(unix))]
use tracing::error;

/// Origin of a shutdown request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// `SIGINT` / Ctrl-C.
    Interrupt,
    /// `SIGTERM`.
    Terminate,
    /// Application-level completion source.
    User,
}

impl Signal {
    /// Stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            Signal::Interrupt => "interrupt",
            Signal::Terminate => "terminate",
            Signal::User => "user",
        }
    }
}

/// Boxed stream of shutdown signals.
pub type SignalStream = BoxStream<'static, Signal>;

/// Installs the default OS listeners.
///
/// Each call creates independent listeners. A listener that fails to install is
/// logged and left out; the remaining ones keep working.
#[cfg(unix)]
pub(crate) fn system_signals() -> SignalStream {
    use tokio::signal::unix::{SignalKind, signal};
    use tracing::error;

    let mut streams: Vec<SignalStream> = Vec::with_capacity(2);
    for (kind, sig) in [
        (SignalKind::interrupt(), Signal::Interrupt),
        (SignalKind::terminate(), Signal::Terminate),
    ] {
        match signal(kind) {
            Ok(listener) => streams.push(
                stream::unfold(listener, move |mut listener| async move {
                    listener.recv().await.map(|()| (sig, listener))
                })
                .boxed(),
            ),
            Err(err) => {
                error!(signal = sig.as_label(), error = %err, "failed to install signal listener");
            }
        }
    }
    stream::select_all(streams).boxed()
}

/// Installs the default OS listeners.
///
/// Each call creates an independent Ctrl-C listener; a failure ends the stream.
#[cfg(not(unix))]
pub(crate) fn system_signals() -> SignalStream {
    stream::unfold((), |()| async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => Some((Signal::Interrupt, ())),
            Err(err) => {
                error!(error = %err, "failed to listen for ctrl-c");
                None
            }
        }
    })
    .boxed()
}

/// Every message is a signal. Closing a channel that never delivered a message
/// counts as one signal; closing after a message just ends the stream.
pub(crate) fn from_channel(rx: mpsc::Receiver<()>) -> SignalStream {
    stream::unfold((Some(rx), false), |(state, fired)| async move {
        let mut rx = state?;
        match rx.recv().await {
            Some(()) => Some((Signal::User, (Some(rx), true))),
            None if !fired => Some((Signal::User, (None, true))),
            None => None,
        }
    })
    .boxed()
}

/// Fires once when `token` is cancelled.
pub(crate) fn from_token(token: CancellationToken) -> SignalStream {
    stream::once(async move { token.cancelled_owned().await })
        .map(|()| Signal::User)
        .boxed()
}
