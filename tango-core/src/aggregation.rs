//! Aggregation path — `ReportResult` (spec.md §4.D).
//!
//! Handles the in-memory state transition only: removing the pending
//! record, storing the result, and reassembling on completion. The two
//! external side-effects (accounting-file append, object-store upload) are
//! orchestrated by the caller *after* this function returns, once the job
//! lock has already been released — see `tango_server::service::TangoServer::report_result`.

use crate::error::TangoError;
use crate::matmul;
use crate::registry::JobRegistry;

pub struct ReportOutcome {
    /// `true` the first time a shard reaches completion; always `false` on
    /// an idempotent duplicate or a job still short of `expected_splits`.
    pub just_completed: bool,
    pub final_result: Option<Vec<u8>>,
}

/// Parse a `"<job_id>_<idx>"` task id, returning the 1-based shard index.
/// Malformed ids (no underscore, non-numeric suffix) are rejected without
/// mutating any job state (spec.md §7 "Malformed").
fn parse_shard_index(task_id: &str) -> Result<u32, TangoError> {
    let (_, suffix) = task_id
        .rsplit_once('_')
        .ok_or_else(|| TangoError::Malformed(format!("malformed task_id: {task_id}")))?;
    suffix
        .parse::<u32>()
        .map_err(|_| TangoError::Malformed(format!("malformed task_id: {task_id}")))
}

pub fn report_result(
    registry: &JobRegistry,
    job_id: &str,
    task_id: &str,
    result_data: Vec<u8>,
) -> Result<ReportOutcome, TangoError> {
    let job = registry
        .get(job_id)
        .ok_or_else(|| TangoError::NotFound("Job not found.".to_string()))?;

    let idx = parse_shard_index(task_id)?;

    let mut state = job.state.lock().unwrap();

    // Idempotent duplicate: a second report for an already-stored shard
    // must not advance received_updates or re-trigger completion
    // (spec.md §4.D step 4 clarification, §9 open question — this spec
    // requires dedup, diverging from the original Go's overwrite-and-increment).
    if state.results.contains_key(&idx) {
        return Ok(ReportOutcome {
            just_completed: false,
            final_result: None,
        });
    }

    state.pending_tasks.remove(&idx);
    state.results.insert(idx, result_data);
    state.received_updates += 1;

    if state.received_updates < job.expected_splits {
        return Ok(ReportOutcome {
            just_completed: false,
            final_result: None,
        });
    }

    // All shards are in — reassemble. A reassembly failure is logged here
    // and swallowed, not propagated: the shard this call reported is already
    // stored, so the RPC still succeeds (spec.md §4.D step 8), and the job
    // simply stays "in progress" until a retry supplies consistent shards
    // (spec.md §7 "Reassembly failure").
    match matmul::reassemble(&state.results, job.row_splits, job.col_splits) {
        Ok(assembled) => {
            let bytes = assembled.into_bytes();
            state.final_result = Some(bytes.clone());
            Ok(ReportOutcome {
                just_completed: true,
                final_result: Some(bytes),
            })
        }
        Err(e) => {
            tracing::warn!(job_id = %job.job_id, error = %e, "reassembly failed, job remains in progress");
            Ok(ReportOutcome {
                just_completed: false,
                final_result: None,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{Job, NewJob};
    use crate::matmul::{self, Matrix};

    fn matrix_bytes(rows: usize, cols: usize) -> Vec<u8> {
        let m: Matrix = (0..rows)
            .map(|r| (0..cols).map(|c| (r * cols + c) as f32).collect())
            .collect();
        matmul::serialize_matrix(&m)
    }

    fn push_1x2_job(registry: &JobRegistry) {
        registry.put(Job::new(NewJob {
            job_id: "job1".into(),
            consumer_id: "c1".into(),
            operation: "scaled_matmul".into(),
            a_data: matrix_bytes(4, 2),
            b_data: matrix_bytes(2, 4),
            m: 4,
            n: 4,
            d: 2,
            row_splits: 1,
            col_splits: 2,
            scale_bytes: None,
            scale_scalar: Some(1.0),
        }));
    }

    #[test]
    fn unknown_job_is_not_found() {
        let registry = JobRegistry::new();
        let result = report_result(&registry, "ghost", "ghost_1", b"1 2".to_vec());
        assert!(matches!(result, Err(TangoError::NotFound(_))));
    }

    #[test]
    fn malformed_task_id_is_rejected() {
        let registry = JobRegistry::new();
        push_1x2_job(&registry);
        let result = report_result(&registry, "job1", "job1-nope", b"1 2".to_vec());
        assert!(matches!(result, Err(TangoError::Malformed(_))));
    }

    #[test]
    fn completes_only_once_all_shards_in() {
        let registry = JobRegistry::new();
        push_1x2_job(&registry);

        let first = report_result(&registry, "job1", "job1_1", b"1 2\n3 4".to_vec()).unwrap();
        assert!(!first.just_completed);

        let second = report_result(&registry, "job1", "job1_2", b"5 6\n7 8".to_vec()).unwrap();
        assert!(second.just_completed);
        assert!(second.final_result.is_some());
    }

    #[test]
    fn reassembly_failure_leaves_job_in_progress_but_reports_success() {
        let registry = JobRegistry::new();
        push_1x2_job(&registry);

        // Shard 1 has two output lines, shard 2 has one — inconsistent,
        // so reassemble() fails even though every shard has been reported.
        let first = report_result(&registry, "job1", "job1_1", b"1 2\n3 4".to_vec()).unwrap();
        assert!(!first.just_completed);

        let second = report_result(&registry, "job1", "job1_2", b"5 6".to_vec()).unwrap();
        assert!(!second.just_completed);
        assert!(second.final_result.is_none());

        let job = registry.get("job1").unwrap();
        let state = job.state.lock().unwrap();
        assert_eq!(state.received_updates, 2);
        assert!(state.final_result.is_none());
    }

    #[test]
    fn duplicate_report_is_idempotent() {
        let registry = JobRegistry::new();
        push_1x2_job(&registry);
        report_result(&registry, "job1", "job1_1", b"1 2\n3 4".to_vec()).unwrap();
        let completed = report_result(&registry, "job1", "job1_2", b"5 6\n7 8".to_vec()).unwrap();
        assert!(completed.just_completed);

        // Re-report shard 1 with different bytes — must not re-trigger completion
        // or change received_updates.
        let duplicate =
            report_result(&registry, "job1", "job1_1", b"9 9\n9 9".to_vec()).unwrap();
        assert!(!duplicate.just_completed);

        let job = registry.get("job1").unwrap();
        let state = job.state.lock().unwrap();
        assert_eq!(state.received_updates, 2);
        assert_eq!(state.results.get(&1).unwrap(), b"1 2\n3 4");
    }
}
