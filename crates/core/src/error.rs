// Central Error Type for the Dispatcher

use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Queue error: {0}")]
    Queue(#[from] crate::domain::QueueError),

    /// A job in an enqueued batch lacks a required field
    #[error("{field} attribute missing in job at index {index}")]
    MissingField { index: usize, field: &'static str },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation not allowed in the dispatcher's current lifecycle state
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl AppError {
    /// Caller mistakes in configuration (bad limits, wrong queue variant)
    pub fn is_config(&self) -> bool {
        match self {
            AppError::Config(_) => true,
            AppError::Queue(e) => e.is_config(),
            _ => false,
        }
    }

    /// Malformed enqueue input
    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::MissingField { .. } | AppError::Validation(_))
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
