//! Drives a single job from `queued` through to a terminal state,
//! ticking the heartbeat curve while work is outstanding.

use crate::progress::{heartbeat_progress, HEARTBEAT_CEILING, HEARTBEAT_START, HEARTBEAT_TAU_SECS, HEARTBEAT_TICK_SECS};
use async_trait::async_trait;
use modelforge_store::{JobUpdate, Store};
use modelforge_utils::types::JobStatus;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use uuid::Uuid;

pub const DEFAULT_SOFT_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_HARD_TIMEOUT_SECS: u64 = 600;

/// The actual phase logic a dispatched job runs. Implemented by each
/// phase agent's adapter in `modelforge-agents`.
#[async_trait]
pub trait PhaseWork: Send + Sync {
    async fn run(&self) -> Result<serde_json::Value, String>;
}

pub struct Executor {
    store: Arc<dyn Store>,
    semaphore: Arc<Semaphore>,
    hard_timeout: Duration,
}

impl Executor {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, max_concurrency: usize, hard_timeout: Duration) -> Self {
        Self { store, semaphore: Arc::new(Semaphore::new(max_concurrency)), hard_timeout }
    }

    /// Dispatch `job_id` (already persisted as `queued`) against `work`,
    /// spawning a background task and returning immediately.
    pub fn dispatch(&self, job_id: Uuid, work: Arc<dyn PhaseWork>) {
        let store = self.store.clone();
        let semaphore = self.semaphore.clone();
        let hard_timeout = self.hard_timeout;
        tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
            if let Err(e) = run_job(store, job_id, work, hard_timeout).await {
                tracing::error!(job_id = %job_id, error = %e, "job executor failed to finalize job");
            }
        });
    }
}

async fn run_job(
    store: Arc<dyn Store>,
    job_id: Uuid,
    work: Arc<dyn PhaseWork>,
    hard_timeout: Duration,
) -> Result<(), modelforge_store::StoreError> {
    store.update_job(job_id, JobUpdate { status: Some(JobStatus::Running), ..Default::default() }).await?;

    let cancelled = Arc::new(AtomicBool::new(false));
    let heartbeat_handle = spawn_heartbeat(store.clone(), job_id, cancelled.clone());

    let outcome = tokio::time::timeout(hard_timeout, work.run()).await;
    cancelled.store(true, Ordering::SeqCst);
    heartbeat_handle.abort();

    let update = match outcome {
        Ok(Ok(result)) => JobUpdate { status: Some(JobStatus::Completed), progress: Some(100), result_data: Some(result), ..Default::default() },
        Ok(Err(msg)) => {
            let truncated = truncate_error(&msg);
            JobUpdate { status: Some(JobStatus::Failed), error_msg: Some(truncated.clone()), log_msg: Some(truncated), ..Default::default() }
        }
        Err(_) => JobUpdate {
            status: Some(JobStatus::Timeout),
            error_msg: Some(format!("phase exceeded hard timeout of {}s", hard_timeout.as_secs())),
            ..Default::default()
        },
    };
    store.update_job(job_id, update).await?;
    Ok(())
}

fn truncate_error(msg: &str) -> String {
    if msg.len() > 500 {
        format!("{}...", &msg[..497])
    } else {
        msg.to_string()
    }
}

fn spawn_heartbeat(store: Arc<dyn Store>, job_id: Uuid, cancelled: Arc<AtomicBool>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let start = Instant::now();
        loop {
            tokio::time::sleep(Duration::from_secs(HEARTBEAT_TICK_SECS)).await;
            if cancelled.load(Ordering::SeqCst) {
                return;
            }
            let elapsed = start.elapsed().as_secs_f64();
            let progress = heartbeat_progress(elapsed, HEARTBEAT_START, HEARTBEAT_CEILING, HEARTBEAT_TAU_SECS);
            if let Ok(job) = store.get_job(job_id).await {
                if job.status != JobStatus::Running {
                    return;
                }
            }
            let _ = store.update_job(job_id, JobUpdate { progress: Some(progress), ..Default::default() }).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelforge_store::MemoryStore;
    use modelforge_utils::types::{Job, PhaseId};

    struct Instant200ms;
    #[async_trait]
    impl PhaseWork for Instant200ms {
        async fn run(&self) -> Result<serde_json::Value, String> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(serde_json::json!({"ok": true}))
        }
    }

    struct AlwaysFails;
    #[async_trait]
    impl PhaseWork for AlwaysFails {
        async fn run(&self) -> Result<serde_json::Value, String> {
            Err("boom".to_string())
        }
    }

    #[tokio::test]
    async fn successful_job_transitions_to_completed_with_result() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let executor = Executor::new(store.clone(), 2, Duration::from_secs(5));
        let job = Job::new(Uuid::new_v4(), PhaseId::Phase2);
        store.create_job(job.clone()).await.unwrap();

        executor.dispatch(job.id, Arc::new(Instant200ms));
        tokio::time::sleep(Duration::from_millis(300)).await;

        let finished = store.get_job(job.id).await.unwrap();
        assert_eq!(finished.status, JobStatus::Completed);
        assert_eq!(finished.progress, 100);
        assert_eq!(finished.result_data, Some(serde_json::json!({"ok": true})));
    }

    #[tokio::test]
    async fn failing_job_transitions_to_failed_with_truncated_error() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let executor = Executor::new(store.clone(), 2, Duration::from_secs(5));
        let job = Job::new(Uuid::new_v4(), PhaseId::Phase3);
        store.create_job(job.clone()).await.unwrap();

        executor.dispatch(job.id, Arc::new(AlwaysFails));
        tokio::time::sleep(Duration::from_millis(200)).await;

        let finished = store.get_job(job.id).await.unwrap();
        assert_eq!(finished.status, JobStatus::Failed);
        assert_eq!(finished.error_msg, Some("boom".to_string()));
    }

    #[tokio::test]
    async fn stale_heartbeat_tick_cannot_revert_a_terminal_job() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let job = Job::new(Uuid::new_v4(), PhaseId::Phase2);
        store.create_job(job.clone()).await.unwrap();

        store
            .update_job(job.id, JobUpdate { status: Some(JobStatus::Completed), progress: Some(100), ..Default::default() })
            .await
            .unwrap();
        // A heartbeat tick that was already in flight when the job finalized.
        store.update_job(job.id, JobUpdate { status: Some(JobStatus::Running), progress: Some(55), ..Default::default() }).await.unwrap();

        let finished = store.get_job(job.id).await.unwrap();
        assert_eq!(finished.status, JobStatus::Completed);
        assert_eq!(finished.progress, 100);
    }
}
