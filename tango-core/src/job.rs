//! The `Job` record and its per-job mutable state.
//!
//! Field names and the lock boundary follow spec.md §3 exactly: everything
//! that must change together (`results`, `pending_tasks`, `assigned_splits`,
//! `received_updates`, `final_result`) lives behind one `Mutex<JobState>`.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Instant;

/// One in-flight (or just-claimed) shard assignment.
#[derive(Debug, Clone)]
pub struct PendingTask {
    pub deadline: Instant,
    pub device_id: String,
}

/// Mutable fields guarded by the job's own lock (spec.md §3 invariants 1-6).
#[derive(Debug, Default)]
pub struct JobState {
    pub assigned_splits: u32,
    pub received_updates: u32,
    pub results: HashMap<u32, Vec<u8>>,
    pub pending_tasks: HashMap<u32, PendingTask>,
    /// Every shard index that has ever been claimed, independent of whether
    /// its `pending_tasks` entry is still live. `assigned_splits` increments
    /// only on a shard's first insertion here, so a reaper-cleared then
    /// rescheduled shard (its `pending_tasks` entry already gone) is not
    /// mistaken for a brand-new assignment.
    pub ever_assigned: HashSet<u32>,
    pub final_result: Option<Vec<u8>>,
}

impl JobState {
    /// Invariant 1 & 2, checked defensively in tests and debug assertions.
    #[cfg(test)]
    fn check_invariants(&self, expected_splits: u32) {
        for idx in self.results.keys() {
            assert!(
                !self.pending_tasks.contains_key(idx),
                "shard {idx} present in both results and pending_tasks"
            );
        }
        assert_eq!(self.received_updates as usize, self.results.len());
        assert!(self.results.len() as u32 <= expected_splits);
        assert!(self.assigned_splits >= self.received_updates);
    }
}

/// A submitted job. Immutable fields are plain; mutable fields live behind
/// `state`. `consumer_id` and the operand blobs never change after
/// `SubmitTask`, so they sit outside the lock — readers (the scheduler
/// carving a shard) never need to block writers touching `results`.
pub struct Job {
    pub job_id: String,
    pub consumer_id: String,
    pub operation: String,
    pub a_data: Vec<u8>,
    pub b_data: Vec<u8>,
    pub m: i32,
    pub n: i32,
    pub d: i32,
    pub row_splits: u32,
    pub col_splits: u32,
    pub expected_splits: u32,
    pub scale_bytes: Option<Vec<u8>>,
    pub scale_scalar: Option<f32>,
    pub state: Mutex<JobState>,
}

impl Job {
    pub fn new(spec: NewJob) -> Self {
        let expected_splits = spec.row_splits.saturating_mul(spec.col_splits);
        Self {
            job_id: spec.job_id,
            consumer_id: spec.consumer_id,
            operation: spec.operation,
            a_data: spec.a_data,
            b_data: spec.b_data,
            m: spec.m,
            n: spec.n,
            d: spec.d,
            row_splits: spec.row_splits,
            col_splits: spec.col_splits,
            expected_splits,
            scale_bytes: spec.scale_bytes,
            scale_scalar: spec.scale_scalar,
            state: Mutex::new(JobState::default()),
        }
    }
}

/// Inputs to `SubmitTask`, collected before a `Job` is constructed.
pub struct NewJob {
    pub job_id: String,
    pub consumer_id: String,
    pub operation: String,
    pub a_data: Vec<u8>,
    pub b_data: Vec<u8>,
    pub m: i32,
    pub n: i32,
    pub d: i32,
    pub row_splits: u32,
    pub col_splits: u32,
    pub scale_bytes: Option<Vec<u8>>,
    pub scale_scalar: Option<f32>,
}
