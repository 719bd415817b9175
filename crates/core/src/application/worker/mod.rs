// Worker - per-kind dispatch loop

pub mod constants;
pub mod handler;
mod pool;
mod shutdown;
mod watchdog;

use constants::*;
pub use handler::{HandlerError, HandlerResult, JobContext, JobHandler};
pub use pool::WorkerPool;
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
pub use watchdog::StalledWatchdog;

use crate::application::queue_store::QueueStore;
use crate::application::retry::{RetryDecision, RetryPolicy};
use crate::domain::Job;
use crate::error::Result;
use crate::port::{JobRepository, TimeProvider};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Timing knobs shared by every worker of a pool
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub poll_interval: Duration,
    pub heartbeat_interval: Duration,
    pub drain_timeout: Duration,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }
}

/// Worker dispatches one job kind of one queue
///
/// Up to `concurrency` handler invocations run at once, each in its own
/// task so a panicking handler only fails its job.
pub struct Worker {
    queue: String,
    kind: String,
    concurrency: usize,
    handler: Arc<dyn JobHandler>,
    store: Arc<QueueStore>,
    job_repo: Arc<dyn JobRepository>,
    retry_policy: Arc<RetryPolicy>,
    time_provider: Arc<dyn TimeProvider>,
    slots: Arc<Semaphore>,
    settings: WorkerSettings,
}

impl Worker {
    pub fn new(
        queue: impl Into<String>,
        kind: impl Into<String>,
        concurrency: usize,
        handler: Arc<dyn JobHandler>,
        store: Arc<QueueStore>,
        time_provider: Arc<dyn TimeProvider>,
        settings: WorkerSettings,
    ) -> Self {
        let concurrency = concurrency.max(1);
        Self {
            queue: queue.into(),
            kind: kind.into(),
            concurrency,
            handler,
            job_repo: Arc::clone(store.job_repo()),
            store,
            retry_policy: Arc::new(RetryPolicy::new(Arc::clone(&time_provider))),
            time_provider,
            slots: Arc::new(Semaphore::new(concurrency)),
            settings,
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Jobs currently being handled
    pub fn in_flight(&self) -> usize {
        self.concurrency - self.slots.available_permits()
    }

    /// Run the dispatch loop until shutdown, then drain in-flight handlers
    pub async fn run(self: Arc<Self>, mut shutdown: ShutdownToken) -> Result<()> {
        info!(queue = %self.queue, kind = %self.kind, concurrency = self.concurrency, "Worker started");
        loop {
            if shutdown.is_shutdown() {
                break;
            }

            // Wait for a free slot before claiming, so claimed jobs never queue up here
            let permit = tokio::select! {
                permit = Arc::clone(&self.slots).acquire_owned() => match permit {
                    Ok(p) => p,
                    Err(_) => break,
                },
                _ = shutdown.wait() => break,
            };

            let now = self.time_provider.now_millis();
            match self.job_repo.pop_next(&self.queue, &self.kind, now).await {
                Ok(Some(job)) => {
                    let this = Arc::clone(&self);
                    tokio::spawn(async move {
                        this.execute(job).await;
                        drop(permit);
                    });
                }
                Ok(None) => {
                    drop(permit);
                    tokio::select! {
                        _ = sleep(self.settings.poll_interval) => {},
                        _ = shutdown.wait() => break,
                    }
                }
                Err(e) => {
                    drop(permit);
                    error!(queue = %self.queue, kind = %self.kind, error = %e, "Worker error");
                    tokio::select! {
                        _ = sleep(ERROR_RECOVERY_SLEEP_DURATION) => {},
                        _ = shutdown.wait() => break,
                    }
                }
            }
        }

        self.drain().await;
        info!(queue = %self.queue, kind = %self.kind, "Worker stopped");
        Ok(())
    }

    /// Wait for in-flight handlers, bounded by the drain timeout
    async fn drain(&self) {
        let in_flight = self.in_flight();
        if in_flight == 0 {
            return;
        }
        info!(kind = %self.kind, in_flight = in_flight, "Draining in-flight jobs");
        let all = self.slots.acquire_many(self.concurrency as u32);
        match tokio::time::timeout(self.settings.drain_timeout, all).await {
            Ok(_) => debug!(kind = %self.kind, "Drained"),
            Err(_) => warn!(
                kind = %self.kind,
                in_flight = self.in_flight(),
                timeout_secs = self.settings.drain_timeout.as_secs(),
                "Drain timed out, leaving jobs for the stalled watchdog"
            ),
        }
    }

    /// Run one claimed job to an outcome and persist it
    pub async fn execute(&self, mut job: Job) {
        let claimed_at = job.started_at.unwrap_or_else(|| self.time_provider.now_millis());
        info!(job_id = %job.id, kind = %job.kind, attempt = job.attempts + 1, "Processing job");

        if job.repeat.as_ref().is_some_and(|r| !r.successor_enqueued) {
            self.schedule_successor(&mut job, claimed_at).await;
        }

        let heartbeat = self.spawn_heartbeat(&job);

        // Panic isolation: the handler runs in its own task
        let ctx = JobContext::new(
            job.clone(),
            Arc::clone(&self.job_repo),
            Arc::clone(&self.time_provider),
        );
        let handler = Arc::clone(&self.handler);
        let outcome = tokio::spawn(async move { handler.handle(ctx).await }).await;
        heartbeat.abort();

        let now = self.time_provider.now_millis();
        match outcome {
            Ok(Ok(result)) => {
                if let Err(e) = job.complete(now, result) {
                    error!(job_id = %job.id, error = %e, "Cannot complete job");
                    return;
                }
                info!(job_id = %job.id, duration_ms = now - claimed_at, "Job completed");
            }
            Ok(Err(err)) => {
                if let RetryDecision::Failed =
                    self.retry_policy
                        .on_failure(&mut job, err.is_retryable(), &err.to_string())
                {
                    error!(job_id = %job.id, kind = %job.kind, error = %err, "Job failed");
                }
            }
            Err(join_err) => {
                let reason = if join_err.is_panic() {
                    "handler panicked"
                } else {
                    "handler cancelled"
                };
                error!(job_id = %job.id, kind = %job.kind, reason = reason, "Job aborted");
                self.retry_policy.on_failure(&mut job, true, reason);
            }
        }

        match self.job_repo.update_claimed(&job, claimed_at).await {
            Ok(true) => {
                if job.state.is_terminal() {
                    self.store.apply_retention_logged(&job.queue, job.state).await;
                }
            }
            Ok(false) => warn!(
                job_id = %job.id,
                outcome = %job.state,
                "Job was reclaimed while running, discarding late outcome"
            ),
            Err(e) => error!(job_id = %job.id, error = %e, "Failed to persist job outcome"),
        }
    }

    /// Enqueue the next occurrence once per occurrence, then persist the mark
    async fn schedule_successor(&self, job: &mut Job, claimed_at: i64) {
        if let Err(e) = self.store.enqueue_next_repeat(job).await {
            error!(job_id = %job.id, error = %e, "Failed to enqueue next repeat occurrence");
            return;
        }
        if let Some(repeat) = job.repeat.as_mut() {
            repeat.successor_enqueued = true;
        }
        if let Err(e) = self.job_repo.update_claimed(job, claimed_at).await {
            warn!(job_id = %job.id, error = %e, "Failed to record repeat successor");
        }
    }

    fn spawn_heartbeat(&self, job: &Job) -> tokio::task::JoinHandle<()> {
        let repo = Arc::clone(&self.job_repo);
        let time = Arc::clone(&self.time_provider);
        let id = job.id.clone();
        let interval = self.settings.heartbeat_interval;
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(interval);
            tick.tick().await;
            loop {
                tick.tick().await;
                match repo.touch(&id, time.now_millis()).await {
                    Ok(true) => {}
                    // No longer ACTIVE: nothing left to keep alive
                    Ok(false) => break,
                    Err(e) => warn!(job_id = %id, error = %e, "Heartbeat failed"),
                }
            }
        })
    }
}
