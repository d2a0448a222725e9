// Admission Queue Port (Interface)

use crate::domain::error::Result;
use crate::domain::{Category, CategorySnapshot, JobRecord, LimitConfig};

/// Capacity-bounded job queue driven by the dispatcher.
///
/// Implementations:
/// - SingleLimitQueue: one ceiling shared by all categories
/// - CategoryLimitQueue: independent ceiling per category
///
/// All methods are synchronous; the dispatcher serializes access.
pub trait AdmissionQueue: Send {
    /// Apply a limit configuration
    ///
    /// # Errors
    /// - QueueError::Config if the configuration is invalid or of the wrong
    ///   variant for this queue; prior limits are left untouched
    fn set_limits(&mut self, limits: &LimitConfig) -> Result<()>;

    /// Append jobs to their category's FIFO, preserving submission order
    fn enqueue(&mut self, items: Vec<JobRecord>);

    /// Move every job that fits under its ceiling from pending to active
    ///
    /// # Errors
    /// - QueueError::LimitNotSet if a category with pending jobs has no limit
    fn admit_ready(&mut self) -> Result<Vec<JobRecord>>;

    /// Release one active slot of `category`
    ///
    /// # Errors
    /// - QueueError::UnknownCategory if the category was never seen
    /// - QueueError::Invariant if no job of that category is active
    fn report_complete(&mut self, category: &Category) -> Result<()>;

    /// Ceiling that applies to `category`, or `None` while it has none
    fn limit_for(&self, category: &Category) -> Option<usize>;

    /// Number of admitted jobs not yet reported complete
    fn active_count(&self) -> usize;

    /// Active plus pending: everything not yet reported complete
    fn pending_count(&self) -> usize;

    /// Discard every pending job, returning how many were dropped.
    /// Limits and active counts are untouched.
    fn drain(&mut self) -> usize;

    /// Per-category counters in admission order
    fn snapshot(&self) -> Vec<CategorySnapshot>;
}
