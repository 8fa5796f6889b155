//! Job registry: the FIFO queue of live job ids plus the `job_id -> Job` map.
//!
//! One `RwLock` at registry scope (spec.md §4.B, §5): readers take a read
//! lock to snapshot the queue or look up a job; `put`/`dequeue` take a write
//! lock. The per-job mutex in `Job::state` is acquired only after the
//! registry lock has been released, per the lock hierarchy in §5.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::job::Job;

#[derive(Default)]
struct RegistryInner {
    jobs: HashMap<String, Arc<Job>>,
    queue: Vec<String>,
}

#[derive(Default)]
pub struct JobRegistry {
    inner: RwLock<RegistryInner>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a job and enqueue it. Overwrites an existing job with the same
    /// id without re-enqueueing — `SubmitTask` on an already-live `job_id` is
    /// a caller error the RPC layer should reject before calling this, but
    /// the registry itself stays simple and total.
    pub fn put(&self, job: Job) {
        let job_id = job.job_id.clone();
        let mut inner = self.inner.write().unwrap();
        let already_queued = inner.jobs.contains_key(&job_id);
        inner.jobs.insert(job_id.clone(), Arc::new(job));
        if !already_queued {
            inner.queue.push(job_id);
        }
    }

    pub fn get(&self, job_id: &str) -> Option<Arc<Job>> {
        self.inner.read().unwrap().jobs.get(job_id).cloned()
    }

    /// Remove a job from both the map and the queue. Called after final
    /// assembly and the post-completion accounting upload have been
    /// attempted (spec.md §4.D step 7, §9).
    pub fn dequeue(&self, job_id: &str) {
        let mut inner = self.inner.write().unwrap();
        inner.jobs.remove(job_id);
        inner.queue.retain(|id| id != job_id);
    }

    /// FIFO snapshot of live job ids, taken under the read lock and then
    /// released — the scheduler never holds the registry lock while
    /// carving a shard (spec.md §4.C step 1, §5).
    pub fn snapshot_queue(&self) -> Vec<String> {
        self.inner.read().unwrap().queue.clone()
    }

    /// All live jobs, used by the reaper sweep (spec.md §4.E). The write
    /// lock is held for the duration of one sweep since the reaper may, in
    /// a future revision, also need to dequeue; today it only mutates
    /// per-job state, which is safe to do under a registry read lock, but
    /// taking the write lock here matches the lock hierarchy described in
    /// §5 ("the reaper acquires the registry write lock and then each job
    /// lock in turn").
    pub fn all_jobs(&self) -> Vec<Arc<Job>> {
        self.inner.write().unwrap().jobs.values().cloned().collect()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.inner.read().unwrap().jobs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::NewJob;

    fn job(id: &str) -> Job {
        Job::new(NewJob {
            job_id: id.into(),
            consumer_id: "c1".into(),
            operation: "scaled_matmul".into(),
            a_data: vec![],
            b_data: vec![],
            m: 0,
            n: 0,
            d: 0,
            row_splits: 1,
            col_splits: 2,
            scale_bytes: None,
            scale_scalar: Some(1.0),
        })
    }

    #[test]
    fn fifo_across_jobs() {
        let registry = JobRegistry::new();
        registry.put(job("job1"));
        registry.put(job("job2"));
        assert_eq!(registry.snapshot_queue(), vec!["job1", "job2"]);
    }

    #[test]
    fn dequeue_removes_from_both_map_and_queue() {
        let registry = JobRegistry::new();
        registry.put(job("job1"));
        registry.dequeue("job1");
        assert!(registry.get("job1").is_none());
        assert!(registry.snapshot_queue().is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn stale_job_id_status_is_missing() {
        let registry = JobRegistry::new();
        assert!(registry.get("never-submitted").is_none());
    }
}
