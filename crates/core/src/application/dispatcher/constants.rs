// Dispatcher constants (no magic values)
use std::time::Duration;

/// Interval between admission ticks (500ms)
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(500);

/// Environment variable overriding the tick interval, in milliseconds
pub const ENV_TICK_INTERVAL_MS: &str = "ADMITQ_TICK_INTERVAL_MS";

/// Environment variable holding the limit: an integer or a JSON object of
/// per-category integers
pub const ENV_LIMIT: &str = "ADMITQ_LIMIT";
