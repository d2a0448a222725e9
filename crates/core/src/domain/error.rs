// Domain Error Types

use crate::domain::Category;
use thiserror::Error;

/// Errors raised by the admission queue
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// Caller supplied an unusable limit configuration
    #[error("Unsupported value for limit parameter: {0}")]
    Config(String),

    /// A category has pending jobs but no limit to admit them against
    #[error("Limit not set for category: {0}")]
    LimitNotSet(Category),

    #[error("Category not configured in queue: {0}")]
    UnknownCategory(Category),

    /// Internal consistency failure (e.g. active count going negative)
    #[error("Queue invariant violated: {0}")]
    Invariant(String),
}

impl QueueError {
    /// True for errors caused by caller configuration rather than queue state
    pub fn is_config(&self) -> bool {
        matches!(self, QueueError::Config(_) | QueueError::LimitNotSet(_))
    }
}

pub type Result<T> = std::result::Result<T, QueueError>;
