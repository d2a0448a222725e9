// Admission Queue Implementations

mod per_category;
mod single;

pub use per_category::CategoryLimitQueue;
pub use single::SingleLimitQueue;

use crate::domain::error::Result;
use crate::domain::{Category, LimitConfig};
use crate::port::AdmissionQueue;
use serde::Serialize;

/// Counters for one category at a point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySnapshot {
    pub category: Category,
    /// `None` until a limit has been configured for the category
    pub limit: Option<usize>,
    pub active: usize,
    pub pending: usize,
}

/// Build the queue variant selected by `limits` and apply them
pub fn build_queue(limits: &LimitConfig) -> Result<Box<dyn AdmissionQueue>> {
    let mut queue: Box<dyn AdmissionQueue> = match limits {
        LimitConfig::Single(_) => Box::new(SingleLimitQueue::new()),
        LimitConfig::PerCategory(_) => Box::new(CategoryLimitQueue::new()),
    };
    queue.set_limits(limits)?;
    Ok(queue)
}
