//! Admitq - runs a JSON batch of jobs through a capacity-bounded dispatcher
//!
//! Usage: `admitq [jobs.json]`. Without a file a built-in demo batch runs.

mod handlers;
mod logging;

use admitq_core::{DispatchEvent, Dispatcher, DispatcherConfig, LimitConfig};
use anyhow::{Context, Result};
use tracing::{error, info, warn};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const DEFAULT_LIMIT: usize = 2;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Logging
    logging::init()?;
    info!("Admitq v{} starting...", VERSION);

    // 2. Configuration
    let mut config = DispatcherConfig::from_env().context("Invalid configuration")?;
    if config.limits.is_none() {
        config.limits = Some(LimitConfig::single(DEFAULT_LIMIT));
    }
    info!(
        tick_interval_ms = config.tick_interval.as_millis() as u64,
        limits = ?config.limits,
        "Configuration loaded"
    );

    // 3. Wiring
    let dispatcher = Dispatcher::from_config(config)?;
    dispatcher.configure(handlers::registry(), None)?;

    // 4. Jobs
    let batch = match std::env::args().nth(1) {
        Some(path) => {
            let raw = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read job file {path}"))?;
            serde_json::from_str(&raw).with_context(|| format!("Job file {path} is not JSON"))?
        }
        None => handlers::demo_batch(),
    };
    let queued = dispatcher.enqueue_json(batch)?;
    info!(jobs = queued, "Jobs queued");

    // 5. Run until the queue empties or Ctrl+C
    let mut events = dispatcher.subscribe();
    dispatcher.start()?;
    if queued == 0 {
        info!("Nothing to do");
    } else {
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(DispatchEvent::JobCompleted { category, result }) => {
                        info!(category = %category, result = %result, "Job completed");
                    }
                    Some(DispatchEvent::JobError { category, error }) => {
                        warn!(category = %category, error = %error, "Job failed");
                    }
                    Some(DispatchEvent::EmptyQueue) => {
                        info!("All jobs finished");
                        break;
                    }
                    Some(_) => {}
                    None => break,
                },
                signal = tokio::signal::ctrl_c() => {
                    if let Err(e) = signal {
                        error!(error = %e, "Failed to listen for Ctrl+C");
                    }
                    info!("Shutdown signal received. Draining...");
                    break;
                }
            }
        }
    }

    // 6. Graceful shutdown
    dispatcher.end().await;
    info!(snapshot = ?dispatcher.snapshot(), "Shutdown complete.");
    Ok(())
}
