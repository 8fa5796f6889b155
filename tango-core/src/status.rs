//! `GetJobStatus` (spec.md §4.F).

use crate::registry::JobRegistry;

pub enum JobStatus {
    /// Job is absent — either never submitted or already harvested.
    NotFound,
    Complete { final_result: Vec<u8> },
    InProgress,
}

pub fn get_job_status(registry: &JobRegistry, job_id: &str) -> JobStatus {
    let Some(job) = registry.get(job_id) else {
        return JobStatus::NotFound;
    };

    let state = job.state.lock().unwrap();
    if state.received_updates >= job.expected_splits {
        if let Some(final_result) = &state.final_result {
            return JobStatus::Complete {
                final_result: final_result.clone(),
            };
        }
    }
    JobStatus::InProgress
}
