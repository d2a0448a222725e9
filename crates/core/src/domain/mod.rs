// Domain Layer - Pure admission logic and entities

pub mod error;
pub mod job;
pub mod limits;
pub mod queue;

// Re-exports
pub use error::QueueError;
pub use job::{Category, JobPayload, JobRecord, JobRequest};
pub use limits::LimitConfig;
pub use queue::{build_queue, CategoryLimitQueue, CategorySnapshot, SingleLimitQueue};
