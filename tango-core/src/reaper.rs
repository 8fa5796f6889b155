//! Background expiration reaper (spec.md §4.E).
//!
//! Structured the same way as the teacher's background loops
//! (`entity_gateway::refresh::run_refresh_loop`,
//! `sem_os_server::dispatcher::OutboxDispatcher::run`): a `tokio::time::interval`
//! driving a `loop`, each tick doing one bounded sweep, failures logged and
//! never fatal to the loop.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::registry::JobRegistry;

/// One sweep: for every live job, drop any pending assignment whose
/// deadline has passed. Redundant with the scheduler's own
/// `now > deadline` check by design (spec.md §4.E "Interaction with §4.C");
/// this just bounds how long stale entries sit around during quiet periods.
///
/// Returns the number of pending entries cleared, for logging.
pub fn sweep(registry: &JobRegistry) -> usize {
    let now = Instant::now();
    let mut cleared = 0;
    for job in registry.all_jobs() {
        let mut state = job.state.lock().unwrap();
        let expired: Vec<u32> = state
            .pending_tasks
            .iter()
            .filter(|(_, pending)| pending.deadline < now)
            .map(|(idx, _)| *idx)
            .collect();
        for idx in expired {
            state.pending_tasks.remove(&idx);
            cleared += 1;
        }
    }
    cleared
}

/// Remove every pending assignment held by `device_id`, across all jobs —
/// explicit eviction when a worker is known dead (spec.md §4.E
/// `RemoveDevicePendingTasks`).
pub fn remove_device_pending_tasks(registry: &JobRegistry, device_id: &str) -> usize {
    let mut cleared = 0;
    for job in registry.all_jobs() {
        let mut state = job.state.lock().unwrap();
        let stale: Vec<u32> = state
            .pending_tasks
            .iter()
            .filter(|(_, pending)| pending.device_id == device_id)
            .map(|(idx, _)| *idx)
            .collect();
        for idx in stale {
            state.pending_tasks.remove(&idx);
            cleared += 1;
        }
    }
    cleared
}

/// Run the reaper forever, woken every `interval` (spec.md §4.E default
/// 500ms). Spawn via `tokio::spawn` once at server start-up.
pub async fn run(registry: Arc<JobRegistry>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        let cleared = sweep(&registry);
        if cleared > 0 {
            tracing::debug!(cleared, "reaper cleared expired pending assignments");
        }
    }
}
