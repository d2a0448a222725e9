//! Logging setup

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "admitq=info,admitq_core=info";

/// Install the global subscriber.
///
/// # Environment Variables
///
/// - `RUST_LOG`: filter directives (default: `admitq=info,admitq_core=info`)
/// - `ADMITQ_LOG_FORMAT`: `json` for structured output, anything else pretty
pub fn init() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))
        .context("Failed to create env filter")?;

    let format = std::env::var("ADMITQ_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());
    let installed = match format.as_str() {
        "json" => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json())
            .try_init(),
        _ => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().pretty())
            .try_init(),
    };
    installed.context("Failed to install tracing subscriber")
}
