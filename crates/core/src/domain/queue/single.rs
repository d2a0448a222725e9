// Single-Limit Queue: one FIFO and one ceiling shared by all categories

use std::collections::VecDeque;

use super::CategorySnapshot;
use crate::domain::error::{QueueError, Result};
use crate::domain::{Category, JobRecord, LimitConfig};
use crate::port::AdmissionQueue;

/// Queue with a single concurrency ceiling across every category.
///
/// Jobs are admitted in global submission order. The ceiling starts at 0,
/// so nothing is admitted until a limit is set.
#[derive(Debug, Default)]
pub struct SingleLimitQueue {
    limit: usize,
    pending: VecDeque<JobRecord>,
    active: usize,
    /// Active count per category, in the order categories were first seen
    by_category: Vec<(Category, usize)>,
}

impl SingleLimitQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    fn category_slot(&mut self, category: &Category) -> &mut usize {
        let index = match self.by_category.iter().position(|(c, _)| c == category) {
            Some(index) => index,
            None => {
                self.by_category.push((category.clone(), 0));
                self.by_category.len() - 1
            }
        };
        &mut self.by_category[index].1
    }
}

impl AdmissionQueue for SingleLimitQueue {
    fn set_limits(&mut self, limits: &LimitConfig) -> Result<()> {
        match limits {
            LimitConfig::Single(limit) => {
                self.limit = *limit;
                Ok(())
            }
            LimitConfig::PerCategory(_) => Err(QueueError::Config(
                "single-limit queue expects one integer limit, got a per-category map"
                    .to_string(),
            )),
        }
    }

    fn enqueue(&mut self, items: Vec<JobRecord>) {
        for item in items {
            self.category_slot(&item.category);
            self.pending.push_back(item);
        }
    }

    fn admit_ready(&mut self) -> Result<Vec<JobRecord>> {
        let mut admitted = Vec::new();
        while self.active < self.limit {
            let Some(item) = self.pending.pop_front() else {
                break;
            };
            self.active += 1;
            *self.category_slot(&item.category) += 1;
            admitted.push(item);
        }
        Ok(admitted)
    }

    fn report_complete(&mut self, category: &Category) -> Result<()> {
        let slot = self
            .by_category
            .iter_mut()
            .find(|(c, _)| c == category)
            .map(|(_, active)| active)
            .ok_or_else(|| QueueError::UnknownCategory(category.clone()))?;

        if *slot == 0 || self.active == 0 {
            return Err(QueueError::Invariant(format!(
                "completion reported for '{category}' with no active job"
            )));
        }
        *slot -= 1;
        self.active -= 1;
        Ok(())
    }

    fn limit_for(&self, _category: &Category) -> Option<usize> {
        Some(self.limit)
    }

    fn active_count(&self) -> usize {
        self.active
    }

    fn pending_count(&self) -> usize {
        self.active + self.pending.len()
    }

    fn drain(&mut self) -> usize {
        let discarded = self.pending.len();
        self.pending.clear();
        discarded
    }

    fn snapshot(&self) -> Vec<CategorySnapshot> {
        self.by_category
            .iter()
            .map(|(category, active)| CategorySnapshot {
                category: category.clone(),
                limit: Some(self.limit),
                active: *active,
                pending: self
                    .pending
                    .iter()
                    .filter(|item| &item.category == category)
                    .count(),
            })
            .collect()
    }
}
