// Dispatcher Lifecycle

use serde::{Deserialize, Serialize};

/// Dispatcher lifecycle: `Idle -> Running -> Draining -> Closed`,
/// or `Idle -> Closed` when ended before it was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    Idle,
    Running,
    Draining,
    Closed,
}

impl LifecycleState {
    /// Whether new jobs are still accepted
    pub fn accepts_jobs(self) -> bool {
        matches!(self, LifecycleState::Idle | LifecycleState::Running)
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleState::Idle => write!(f, "IDLE"),
            LifecycleState::Running => write!(f, "RUNNING"),
            LifecycleState::Draining => write!(f, "DRAINING"),
            LifecycleState::Closed => write!(f, "CLOSED"),
        }
    }
}
