// Concurrency Limit Configuration

use crate::domain::error::{QueueError, Result};
use crate::domain::Category;

/// Capacity configuration for the admission queue.
///
/// The variant also selects the queue implementation: `Single` builds a queue
/// with one shared ceiling, `PerCategory` one with an independent ceiling per
/// category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LimitConfig {
    /// One ceiling shared by every category
    Single(usize),
    /// Independent ceiling per category, in registration order
    PerCategory(Vec<(Category, usize)>),
}

impl LimitConfig {
    pub fn single(limit: usize) -> Self {
        LimitConfig::Single(limit)
    }

    pub fn per_category<I, C>(entries: I) -> Self
    where
        I: IntoIterator<Item = (C, usize)>,
        C: Into<Category>,
    {
        LimitConfig::PerCategory(
            entries
                .into_iter()
                .map(|(category, limit)| (category.into(), limit))
                .collect(),
        )
    }

    /// Parse an untyped limit: an integer selects the single-limit variant,
    /// an object of integers the per-category variant.
    ///
    /// Any invalid entry rejects the whole value. Object keys keep the order
    /// they were written in, which becomes the registration order.
    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::Object(map) => {
                let mut entries = Vec::with_capacity(map.len());
                for (key, limit) in map {
                    let limit = as_limit(limit).ok_or_else(|| {
                        QueueError::Config(format!("category '{key}' has limit {limit}"))
                    })?;
                    entries.push((Category::new(key.as_str()), limit));
                }
                Ok(LimitConfig::PerCategory(entries))
            }
            other => as_limit(other)
                .map(LimitConfig::Single)
                .ok_or_else(|| QueueError::Config(other.to_string())),
        }
    }

    /// Parse a limit from its text form (`"4"` or `{"resize": 2}`)
    pub fn parse(raw: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(raw.trim())
            .map_err(|e| QueueError::Config(format!("'{raw}' is not valid JSON: {e}")))?;
        Self::from_value(&value)
    }

    pub fn is_per_category(&self) -> bool {
        matches!(self, LimitConfig::PerCategory(_))
    }
}

/// Non-negative integers only; fractions, negatives and strings are rejected
fn as_limit(value: &serde_json::Value) -> Option<usize> {
    value.as_u64().and_then(|n| usize::try_from(n).ok())
}
