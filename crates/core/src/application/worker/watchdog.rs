// Stalled-job watchdog
//
// ACTIVE jobs whose heartbeat went quiet are treated as a retryable failure:
// requeued with backoff, or failed once attempts run out.

use super::shutdown::ShutdownToken;
use crate::application::queue_store::QueueStore;
use crate::application::retry::RetryPolicy;
use crate::error::Result;
use crate::port::TimeProvider;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

pub struct StalledWatchdog {
    store: Arc<QueueStore>,
    retry_policy: RetryPolicy,
    time_provider: Arc<dyn TimeProvider>,
    stalled_interval_ms: i64,
    check_interval: Duration,
}

impl StalledWatchdog {
    pub fn new(
        store: Arc<QueueStore>,
        time_provider: Arc<dyn TimeProvider>,
        stalled_interval_ms: i64,
        check_interval: Duration,
    ) -> Self {
        Self {
            store,
            retry_policy: RetryPolicy::new(Arc::clone(&time_provider)),
            time_provider,
            stalled_interval_ms,
            check_interval,
        }
    }

    /// One pass over every queue. Returns the number of reclaimed jobs.
    pub async fn sweep_once(&self) -> Result<usize> {
        let repo = self.store.job_repo();
        let cutoff = self.time_provider.now_millis() - self.stalled_interval_ms;
        let mut reclaimed = 0;

        for queue in self.store.queues() {
            for mut job in repo.find_stalled(&queue.name, cutoff).await? {
                let Some(claimed_at) = job.started_at else {
                    continue;
                };
                let reason = format!(
                    "job stalled: no heartbeat for more than {}ms",
                    self.stalled_interval_ms
                );
                self.retry_policy.on_failure(&mut job, true, &reason);

                // The worker may finish first; its outcome then wins
                if repo.update_claimed(&job, claimed_at).await? {
                    warn!(
                        job_id = %job.id,
                        queue = %queue.name,
                        state = %job.state,
                        attempts = job.attempts,
                        "Stalled job reclaimed"
                    );
                    if job.state.is_terminal() {
                        self.store.apply_retention_logged(&queue.name, job.state).await;
                    }
                    reclaimed += 1;
                }
            }
        }
        if reclaimed > 0 {
            info!(reclaimed = reclaimed, "Stalled sweep finished");
        }
        Ok(reclaimed)
    }

    pub async fn run(self: Arc<Self>, mut shutdown: ShutdownToken) {
        debug!(
            stalled_interval_ms = self.stalled_interval_ms,
            check_interval_ms = self.check_interval.as_millis() as u64,
            "Stalled watchdog started"
        );
        loop {
            tokio::select! {
                _ = sleep(self.check_interval) => {},
                _ = shutdown.wait() => break,
            }
            if let Err(e) = self.sweep_once().await {
                error!(error = %e, "Stalled sweep failed");
            }
        }
        debug!("Stalled watchdog stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::queue_store::EnqueueOptions;
    use crate::domain::catalog::{default_queues, kinds, queues};
    use crate::domain::JobState;
    use crate::port::id_provider::mocks::SequentialIdProvider;
    use crate::port::job_repository::mocks::InMemoryJobRepository;
    use crate::port::time_provider::mocks::ManualClock;
    use serde_json::json;

    #[tokio::test]
    async fn test_stalled_job_requeued_then_failed() {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let store = Arc::new(
            QueueStore::new(
                Arc::new(InMemoryJobRepository::new()),
                clock.clone(),
                Arc::new(SequentialIdProvider::new("job")),
                default_queues(),
                16,
            )
            .unwrap(),
        );
        let watchdog =
            StalledWatchdog::new(store.clone(), clock.clone(), 60_000, Duration::from_secs(1));

        // Maintenance queue allows 2 attempts
        let handle = store
            .enqueue(kinds::BACKUP, json!({}), EnqueueOptions::default())
            .await
            .unwrap();
        let repo = store.job_repo();
        repo.pop_next(queues::MAINTENANCE, kinds::BACKUP, clock.now_millis())
            .await
            .unwrap()
            .unwrap();

        clock.advance(30_000);
        assert_eq!(watchdog.sweep_once().await.unwrap(), 0);

        clock.advance(31_000);
        assert_eq!(watchdog.sweep_once().await.unwrap(), 1);
        let job = store.get_job(&handle.id).await.unwrap();
        assert_eq!(job.state, JobState::Delayed);
        assert_eq!(job.attempts, 1);

        clock.advance(30_000);
        repo.pop_next(queues::MAINTENANCE, kinds::BACKUP, clock.now_millis())
            .await
            .unwrap()
            .unwrap();
        clock.advance(61_000);
        watchdog.sweep_once().await.unwrap();
        let job = store.get_job(&handle.id).await.unwrap();
        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.attempts, 2);
    }
}
