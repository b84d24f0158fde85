//! # Example: File-backed counter flushed on shutdown
//!
//! A counter increments every 500ms and persists itself every 10 steps.
//! On Ctrl-C / SIGTERM (or after 20 steps) the registered cleanup writes the final value.
//! Press Ctrl-C twice to force an immediate exit.
//!
//! Run with:
//! ```bash
//! RUST_LOG=info cargo run --example counter --features logging
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::info;

use gracevisor::{Cleanup, CleanupError, LogWriter, ShutdownContext, Subscribe, TriggerConfig};

const STEPS_BEFORE_STOP: u64 = 20;

struct Counter {
    path: PathBuf,
    val: AtomicU64,
}

impl Counter {
    async fn load(path: PathBuf) -> Self {
        let val = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text.trim().parse().unwrap_or(0),
            Err(_) => 0,
        };
        Self {
            path,
            val: AtomicU64::new(val),
        }
    }

    fn inc(&self) -> u64 {
        self.val.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn flush(&self) -> std::io::Result<()> {
        let val = self.val.load(Ordering::SeqCst);
        tokio::fs::write(&self.path, val.to_string()).await
    }
}

#[async_trait]
impl Cleanup for Counter {
    fn name(&self) -> &str {
        "counter"
    }

    async fn shutdown(&self, ctx: ShutdownContext) -> Result<(), CleanupError> {
        tokio::select! {
            res = self.flush() => res.map_err(|e| CleanupError::fail(format!("saving counter: {e}"))),
            _ = ctx.cancelled() => Err(CleanupError::Canceled),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let coord = gracevisor::global();
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let events = CancellationToken::new();
    let listener = coord.spawn_subscribers(subs, events.clone());

    let stop = CancellationToken::new();
    gracevisor::set_shutdown_trigger(
        CancellationToken::new(),
        TriggerConfig::default()
            .with_user_token(stop.clone())
            .with_timeout(Duration::from_secs(5)),
    );

    let counter = Arc::new(Counter::load(PathBuf::from("counter.txt")).await);
    gracevisor::register(counter.clone())?;
    info!(value = counter.val.load(Ordering::SeqCst), "last counter");

    let worker = Arc::clone(&counter);
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_millis(500));
        loop {
            tick.tick().await;
            if !gracevisor::status().is_accepting_work() {
                break;
            }
            let val = worker.inc();
            info!(val, "counter");
            if val % 10 == 0 {
                let _ = worker.flush().await;
            }
            if val % STEPS_BEFORE_STOP == 0 {
                stop.cancel();
            }
        }
    });

    gracevisor::wait_shutdown().await;
    events.cancel();
    listener.await?;

    gracevisor::global_error().into_result()?;
    info!("app finished");
    Ok(())
}
