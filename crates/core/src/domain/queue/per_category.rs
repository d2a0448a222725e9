// Per-Category Queue: independent FIFO and ceiling per category

use std::collections::{HashMap, VecDeque};

use super::CategorySnapshot;
use crate::domain::error::{QueueError, Result};
use crate::domain::{Category, JobPayload, JobRecord, LimitConfig};
use crate::port::AdmissionQueue;

/// State of one category
#[derive(Debug)]
struct Lane {
    category: Category,
    limit: Option<usize>,
    active: usize,
    pending: VecDeque<JobPayload>,
}

impl Lane {
    fn new(category: Category) -> Self {
        Self {
            category,
            limit: None,
            active: 0,
            pending: VecDeque::new(),
        }
    }
}

/// Queue with an independent concurrency ceiling per category.
///
/// Categories are visited in registration order: the order in which each was
/// first named by `set_limits` or `enqueue`. Within a category, FIFO.
#[derive(Debug, Default)]
pub struct CategoryLimitQueue {
    lanes: Vec<Lane>,
    index: HashMap<Category, usize>,
}

impl CategoryLimitQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lane_mut(&mut self, category: &Category) -> &mut Lane {
        let i = match self.index.get(category) {
            Some(&i) => i,
            None => {
                self.lanes.push(Lane::new(category.clone()));
                let i = self.lanes.len() - 1;
                self.index.insert(category.clone(), i);
                i
            }
        };
        &mut self.lanes[i]
    }
}

impl AdmissionQueue for CategoryLimitQueue {
    fn set_limits(&mut self, limits: &LimitConfig) -> Result<()> {
        let LimitConfig::PerCategory(entries) = limits else {
            return Err(QueueError::Config(
                "per-category queue expects a map of category limits, got a single integer"
                    .to_string(),
            ));
        };
        // Entries are typed as usize, so nothing can fail past this point and
        // the update is all-or-nothing. Active jobs are never evicted.
        for (category, limit) in entries {
            self.lane_mut(category).limit = Some(*limit);
        }
        Ok(())
    }

    fn enqueue(&mut self, items: Vec<JobRecord>) {
        for JobRecord { category, payload } in items {
            self.lane_mut(&category).pending.push_back(payload);
        }
    }

    fn admit_ready(&mut self) -> Result<Vec<JobRecord>> {
        // Check every lane before admitting anything so a failed call has no
        // side effects.
        if let Some(lane) = self
            .lanes
            .iter()
            .find(|lane| lane.limit.is_none() && !lane.pending.is_empty())
        {
            return Err(QueueError::LimitNotSet(lane.category.clone()));
        }

        let mut admitted = Vec::new();
        for lane in &mut self.lanes {
            let limit = lane.limit.unwrap_or(0);
            while lane.active < limit {
                let Some(payload) = lane.pending.pop_front() else {
                    break;
                };
                lane.active += 1;
                admitted.push(JobRecord {
                    category: lane.category.clone(),
                    payload,
                });
            }
        }
        Ok(admitted)
    }

    fn report_complete(&mut self, category: &Category) -> Result<()> {
        let i = *self
            .index
            .get(category)
            .ok_or_else(|| QueueError::UnknownCategory(category.clone()))?;
        let lane = &mut self.lanes[i];
        if lane.active == 0 {
            return Err(QueueError::Invariant(format!(
                "completion reported for '{category}' with no active job"
            )));
        }
        lane.active -= 1;
        Ok(())
    }

    fn limit_for(&self, category: &Category) -> Option<usize> {
        self.index.get(category).and_then(|&i| self.lanes[i].limit)
    }

    fn active_count(&self) -> usize {
        self.lanes.iter().map(|lane| lane.active).sum()
    }

    fn pending_count(&self) -> usize {
        self.lanes
            .iter()
            .map(|lane| lane.active + lane.pending.len())
            .sum()
    }

    fn drain(&mut self) -> usize {
        self.lanes
            .iter_mut()
            .map(|lane| {
                let discarded = lane.pending.len();
                lane.pending.clear();
                discarded
            })
            .sum()
    }

    fn snapshot(&self) -> Vec<CategorySnapshot> {
        self.lanes
            .iter()
            .map(|lane| CategorySnapshot {
                category: lane.category.clone(),
                limit: lane.limit,
                active: lane.active,
                pending: lane.pending.len(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn jobs(category: &str, count: usize) -> Vec<JobRecord> {
        (1..=count)
            .map(|i| JobRecord::new(category, json!(format!("data{i}"))))
            .collect()
    }

    fn queue_with(limits: &[(&str, usize)]) -> CategoryLimitQueue {
        let mut queue = CategoryLimitQueue::new();
        queue
            .set_limits(&LimitConfig::per_category(limits.iter().copied()))
            .unwrap();
        queue
    }

    #[test]
    fn test_rejects_single_limit() {
        let mut queue = CategoryLimitQueue::new();
        let err = queue.set_limits(&LimitConfig::single(3)).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_admits_all_pending_items() {
        let items = vec![
            JobRecord::new("job1", json!("data1")),
            JobRecord::new("job2", json!("data2")),
        ];
        let mut queue = queue_with(&[("job1", 3), ("job2", 4)]);
        queue.enqueue(items.clone());
        assert_eq!(queue.admit_ready().unwrap(), items);
    }

    #[test]
    fn test_admits_within_each_category_limit() {
        let mut queue = queue_with(&[("job1", 2), ("job2", 3)]);
        let mut items = jobs("job1", 5);
        items.extend(jobs("job2", 5));
        queue.enqueue(items);

        let admitted = queue.admit_ready().unwrap();
        let mut expected = jobs("job1", 2);
        expected.extend(jobs("job2", 3));
        assert_eq!(admitted, expected);
        assert_eq!(queue.active_count(), 5);
    }

    #[test]
    fn test_pending_count_after_completions() {
        let mut queue = queue_with(&[("job1", 2), ("job2", 3)]);
        let mut items = jobs("job1", 5);
        items.extend(jobs("job2", 5));
        queue.enqueue(items);
        queue.admit_ready().unwrap();

        queue.report_complete(&Category::from("job1")).unwrap();
        queue.report_complete(&Category::from("job2")).unwrap();
        assert_eq!(queue.pending_count(), 8);
    }

    #[test]
    fn test_capacity_two_of_five_then_one_more() {
        let items = jobs("resize", 5);
        let mut queue = queue_with(&[("resize", 2)]);
        queue.enqueue(items.clone());

        assert_eq!(queue.admit_ready().unwrap(), items[..2].to_vec());
        assert!(queue.admit_ready().unwrap().is_empty());

        queue.report_complete(&Category::from("resize")).unwrap();
        assert_eq!(queue.admit_ready().unwrap(), vec![items[2].clone()]);
    }

    #[test]
    fn test_admission_follows_registration_order() {
        let mut queue = queue_with(&[("zeta", 5), ("alpha", 5)]);
        queue.enqueue(vec![
            JobRecord::new("alpha", json!(1)),
            JobRecord::new("zeta", json!(2)),
        ]);
        let order: Vec<String> = queue
            .admit_ready()
            .unwrap()
            .into_iter()
            .map(|r| r.category.to_string())
            .collect();
        assert_eq!(order, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_missing_limit_blocks_admission_without_side_effects() {
        let mut queue = queue_with(&[("job1", 2)]);
        queue.enqueue(jobs("job1", 1));
        queue.enqueue(jobs("unlimited", 1));

        let err = queue.admit_ready().unwrap_err();
        assert_eq!(err, QueueError::LimitNotSet(Category::from("unlimited")));
        assert_eq!(queue.active_count(), 0);

        queue
            .set_limits(&LimitConfig::per_category([("unlimited", 1)]))
            .unwrap();
        assert_eq!(queue.admit_ready().unwrap().len(), 2);
    }

    #[test]
    fn test_resetting_limit_keeps_active_jobs() {
        let mut queue = queue_with(&[("job1", 3)]);
        queue.enqueue(jobs("job1", 5));
        queue.admit_ready().unwrap();

        queue
            .set_limits(&LimitConfig::per_category([("job1", 1)]))
            .unwrap();
        assert_eq!(queue.active_count(), 3);
        assert_eq!(queue.limit_for(&Category::from("job1")), Some(1));

        // Over the new ceiling: nothing more until active drops below 1
        queue.report_complete(&Category::from("job1")).unwrap();
        queue.report_complete(&Category::from("job1")).unwrap();
        assert!(queue.admit_ready().unwrap().is_empty());
        queue.report_complete(&Category::from("job1")).unwrap();
        assert_eq!(queue.admit_ready().unwrap().len(), 1);
    }

    #[test]
    fn test_zero_limit_admits_nothing() {
        let mut queue = queue_with(&[("paused", 0)]);
        queue.enqueue(jobs("paused", 2));
        assert!(queue.admit_ready().unwrap().is_empty());
        assert_eq!(queue.pending_count(), 2);
    }

    #[test]
    fn test_report_complete_errors() {
        let mut queue = queue_with(&[("job1", 1)]);
        assert_eq!(
            queue.report_complete(&Category::from("ghost")).unwrap_err(),
            QueueError::UnknownCategory(Category::from("ghost"))
        );
        assert!(matches!(
            queue.report_complete(&Category::from("job1")).unwrap_err(),
            QueueError::Invariant(_)
        ));
    }

    #[test]
    fn test_drain_twice() {
        let mut queue = queue_with(&[("a", 1), ("b", 1)]);
        let mut items = jobs("a", 3);
        items.extend(jobs("b", 2));
        queue.enqueue(items);
        queue.admit_ready().unwrap();

        assert_eq!(queue.drain(), 3);
        assert_eq!(queue.drain(), 0);
        assert_eq!(queue.active_count(), 2);
        assert_eq!(queue.pending_count(), 2);
        assert!(queue.admit_ready().unwrap().is_empty());
    }

    #[test]
    fn test_counts_conserved_over_interleaving() {
        let mut queue = queue_with(&[("a", 2), ("b", 1)]);
        let mut pushed = 0;
        let mut completed = 0;
        let mut in_flight: Vec<Category> = Vec::new();

        for round in 0..6 {
            let batch = if round % 2 == 0 { jobs("a", 3) } else { jobs("b", 2) };
            pushed += batch.len();
            queue.enqueue(batch);

            in_flight.extend(queue.admit_ready().unwrap().into_iter().map(|r| r.category));
            for row in queue.snapshot() {
                assert!(row.active <= row.limit.unwrap());
            }

            if let Some(category) = in_flight.pop() {
                queue.report_complete(&category).unwrap();
                completed += 1;
            }
            assert_eq!(queue.pending_count(), pushed - completed);
        }
    }
}
