//! Dispatch scheduler — `FetchTask` (spec.md §4.C).
//!
//! FIFO over the job queue, first-fit over shards. Releases the registry
//! lock before touching any per-job lock, and releases the per-job lock
//! before the (potentially slow) JSON carving work — matching the
//! suspension-point rule in spec.md §5.

use std::time::{Duration, Instant};

use crate::error::TangoError;
use crate::job::PendingTask;
use crate::matmul::{self, Matrix};
use crate::registry::JobRegistry;

/// A carved shard ready to ship to a worker. `row_block`/`col_block`/
/// `grid_rows` are the semantic names for the wire-level `(M, N, D)`
/// overloading described in spec.md §4.C and §9 — the transport layer is
/// responsible for packing these into the `TaskAssignment` proto message's
/// `m`/`n`/`d` fields, so that overloading stays confined to one boundary.
pub struct TaskAssignment {
    pub job_id: String,
    pub task_id: String,
    pub operation: String,
    pub a_data: Vec<u8>,
    pub b_data: Vec<u8>,
    pub row_block: u32,
    pub col_block: u32,
    pub grid_rows: u32,
    pub scale_bytes: Option<Vec<u8>>,
    pub scale_scalar: Option<f32>,
}

/// Scan a single job's shard range for the first assignable index, claim it,
/// and return the index — or `None` if every shard is either completed or
/// live-assigned.
fn claim_next_shard(job: &crate::job::Job, device_id: &str, lease: Duration) -> Option<u32> {
    let now = Instant::now();
    let mut state = job.state.lock().unwrap();

    let mut claimed_idx = None;
    for idx in 1..=job.expected_splits {
        if state.results.contains_key(&idx) {
            continue;
        }
        let assignable = match state.pending_tasks.get(&idx) {
            None => true,
            Some(pending) => now > pending.deadline,
        };
        if assignable {
            claimed_idx = Some(idx);
            break;
        }
    }

    let idx = claimed_idx?;
    let first_assignment = state.ever_assigned.insert(idx);
    state.pending_tasks.insert(
        idx,
        PendingTask {
            deadline: now + lease,
            device_id: device_id.to_string(),
        },
    );
    if first_assignment {
        state.assigned_splits += 1;
    }
    Some(idx)
}

pub fn fetch_task(
    registry: &JobRegistry,
    device_id: &str,
    lease: Duration,
) -> Result<TaskAssignment, TangoError> {
    let snapshot = registry.snapshot_queue();

    for job_id in snapshot {
        let Some(job) = registry.get(&job_id) else {
            continue;
        };

        let Some(idx) = claim_next_shard(&job, device_id, lease) else {
            continue;
        };

        let full_a: Matrix = matmul::parse_matrix(&job.a_data)?;
        let full_b: Matrix = matmul::parse_matrix(&job.b_data)?;
        let shard = matmul::carve(&full_a, &full_b, job.row_splits, job.col_splits, idx)?;
        let (row_block, col_block) = matmul::shard_coords(idx, job.col_splits);

        return Ok(TaskAssignment {
            job_id: job.job_id.clone(),
            task_id: format!("{}_{}", job.job_id, idx),
            operation: job.operation.clone(),
            a_data: matmul::serialize_matrix(&shard.a_slice),
            b_data: matmul::serialize_matrix(&shard.b_slice),
            row_block,
            col_block,
            grid_rows: job.row_splits,
            scale_bytes: job.scale_bytes.clone(),
            scale_scalar: job.scale_scalar,
        });
    }

    Err(TangoError::Exhausted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{Job, NewJob};
    use std::time::Duration;

    fn matrix_bytes(rows: usize, cols: usize) -> Vec<u8> {
        let m: Matrix = (0..rows)
            .map(|r| (0..cols).map(|c| (r * cols + c) as f32).collect())
            .collect();
        matmul::serialize_matrix(&m)
    }

    fn push_job(registry: &JobRegistry, id: &str, row_splits: u32, col_splits: u32) {
        registry.put(Job::new(NewJob {
            job_id: id.into(),
            consumer_id: "c1".into(),
            operation: "scaled_matmul".into(),
            a_data: matrix_bytes(16, 8),
            b_data: matrix_bytes(8, 16),
            m: 16,
            n: 16,
            d: 8,
            row_splits,
            col_splits,
            scale_bytes: None,
            scale_scalar: Some(1.0),
        }));
    }

    #[test]
    fn fifo_across_jobs_returns_shards_in_order() {
        let registry = JobRegistry::new();
        push_job(&registry, "job1", 1, 2);
        push_job(&registry, "job2", 1, 2);

        let lease = Duration::from_secs(1);
        let a1 = fetch_task(&registry, "dev1", lease).unwrap();
        let a2 = fetch_task(&registry, "dev1", lease).unwrap();
        let a3 = fetch_task(&registry, "dev1", lease).unwrap();
        let a4 = fetch_task(&registry, "dev1", lease).unwrap();

        assert_eq!(a1.job_id, "job1");
        assert_eq!(a2.job_id, "job1");
        assert_eq!(a3.job_id, "job2");
        assert_eq!(a4.job_id, "job2");
        assert!(fetch_task(&registry, "dev1", lease).is_err());
    }

    #[test]
    fn concurrent_fetches_never_return_the_same_shard() {
        let registry = JobRegistry::new();
        push_job(&registry, "job1", 2, 2);
        let lease = Duration::from_secs(1);

        let mut seen = std::collections::HashSet::new();
        for _ in 0..4 {
            let assignment = fetch_task(&registry, "dev1", lease).unwrap();
            assert!(seen.insert(assignment.task_id));
        }
    }

    #[test]
    fn expired_lease_is_reclaimed_without_bumping_assigned_splits() {
        let registry = JobRegistry::new();
        push_job(&registry, "job1", 1, 1);
        let short_lease = Duration::from_millis(1);

        let first = fetch_task(&registry, "dev1", short_lease).unwrap();
        std::thread::sleep(Duration::from_millis(5));
        let second = fetch_task(&registry, "dev2", Duration::from_secs(1)).unwrap();

        assert_eq!(first.task_id, second.task_id);
        let job = registry.get("job1").unwrap();
        assert_eq!(job.state.lock().unwrap().assigned_splits, 1);
    }

    #[test]
    fn reaper_cleared_lease_is_reclaimed_without_bumping_assigned_splits() {
        // Mirrors what the reaper actually does (reaper.rs::sweep): it
        // removes the expired pending_tasks entry outright, rather than
        // leaving it for the scheduler to find stale. fetch_task must still
        // recognize shard 1 as already-assigned once, not a fresh claim.
        let registry = JobRegistry::new();
        push_job(&registry, "job1", 1, 1);

        let first = fetch_task(&registry, "dev1", Duration::from_millis(1)).unwrap();
        std::thread::sleep(Duration::from_millis(5));

        let job = registry.get("job1").unwrap();
        job.state.lock().unwrap().pending_tasks.clear();

        let second = fetch_task(&registry, "dev2", Duration::from_secs(1)).unwrap();

        assert_eq!(first.task_id, second.task_id);
        assert_eq!(job.state.lock().unwrap().assigned_splits, 1);
    }
}
