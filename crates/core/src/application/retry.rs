// Retry logic applied to a failed attempt
use crate::domain::Job;
use crate::port::TimeProvider;
use std::sync::Arc;
use tracing::{info, warn};

/// Retry decision result
#[derive(Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Rescheduled as DELAYED, runs again at `run_at`
    Retry { run_at: i64, delay_ms: i64 },
    /// Do not retry, job has failed permanently
    Failed,
}

/// Counts the attempt, then reschedules with the job's backoff or fails it.
///
/// Non-retryable errors fail immediately regardless of remaining attempts.
pub struct RetryPolicy {
    time_provider: Arc<dyn TimeProvider>,
}

impl RetryPolicy {
    pub fn new(time_provider: Arc<dyn TimeProvider>) -> Self {
        Self { time_provider }
    }

    /// Apply the outcome of a failed attempt to `job`
    pub fn on_failure(&self, job: &mut Job, retryable: bool, reason: &str) -> RetryDecision {
        let now = self.time_provider.now_millis();
        job.record_attempt();

        if !retryable {
            warn!(
                job_id = %job.id,
                kind = %job.kind,
                attempts = job.attempts,
                error = %reason,
                "Fatal job error, not retrying"
            );
            job.fail(now, reason);
            return RetryDecision::Failed;
        }

        if job.attempts_exhausted() {
            warn!(
                job_id = %job.id,
                kind = %job.kind,
                attempts = job.attempts,
                max_attempts = job.max_attempts,
                error = %reason,
                "Max retry attempts reached"
            );
            job.fail(now, reason);
            return RetryDecision::Failed;
        }

        // First retry waits `initial`, so the exponent is attempts - 1
        let delay_ms = job.backoff.delay_for(job.attempts - 1);
        let run_at = now.saturating_add(delay_ms);
        job.requeue_at(run_at, reason);

        info!(
            job_id = %job.id,
            attempt = job.attempts,
            max_attempts = job.max_attempts,
            delay_ms = delay_ms,
            "Scheduling retry"
        );

        RetryDecision::Retry { run_at, delay_ms }
    }
}
