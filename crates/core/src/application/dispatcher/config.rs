// Dispatcher Configuration

use super::constants::{DEFAULT_TICK_INTERVAL, ENV_LIMIT, ENV_TICK_INTERVAL_MS};
use crate::domain::LimitConfig;
use crate::error::{AppError, Result};
use std::time::Duration;

/// Dispatcher configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Interval between admission ticks; must be non-zero
    pub tick_interval: Duration,
    /// Initial limits; also selects the queue variant.
    /// `None` builds a single-limit queue with a ceiling of 0.
    pub limits: Option<LimitConfig>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            limits: None,
        }
    }
}

impl DispatcherConfig {
    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    pub fn with_limits(mut self, limits: LimitConfig) -> Self {
        self.limits = Some(limits);
        self
    }

    /// Load configuration from environment variables
    ///
    /// # Environment Variables
    ///
    /// - `ADMITQ_TICK_INTERVAL_MS`: tick interval in ms (default: 500)
    /// - `ADMITQ_LIMIT`: `4` for a shared ceiling, `{"resize": 2}` per category
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injected variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_TICK_INTERVAL_MS) {
            let ms: u64 = raw.trim().parse().map_err(|_| {
                AppError::Config(format!("{ENV_TICK_INTERVAL_MS} must be an integer, got '{raw}'"))
            })?;
            config.tick_interval = Duration::from_millis(ms);
            validate_tick_interval(config.tick_interval)?;
        }

        if let Some(raw) = lookup(ENV_LIMIT) {
            config.limits = Some(LimitConfig::parse(&raw)?);
        }

        Ok(config)
    }
}

/// A zero interval would re-run admission on every timer wakeup
pub(super) fn validate_tick_interval(tick_interval: Duration) -> Result<()> {
    if tick_interval.is_zero() {
        return Err(AppError::Config(
            "tick interval must be greater than zero".to_string(),
        ));
    }
    Ok(())
}
