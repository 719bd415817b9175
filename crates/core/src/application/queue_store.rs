//! Queue Store - routing, validation and admin operations over the job
//! repository.
//!
//! Queues are fixed at construction; `register_all` persists them once at
//! startup. Every kind routes to exactly one queue.

use crate::domain::{
    BackoffPolicy, Job, JobId, JobKind, JobPayload, JobState, QueueConfig, QueueStats,
    RepeatSpec, MAX_PRIORITY, MIN_PRIORITY,
};
use crate::error::{AppError, Result};
use crate::port::{IdProvider, JobRepository, TimeProvider};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Per-envelope overrides
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnqueueOptions {
    pub priority: Option<i32>,
    /// Run no earlier than now + delay
    pub delay_ms: Option<i64>,
    pub repeat: Option<RepeatSpec>,
    pub max_attempts: Option<i32>,
    pub backoff: Option<BackoffPolicy>,
}

impl EnqueueOptions {
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn delay_ms(mut self, delay_ms: i64) -> Self {
        self.delay_ms = Some(delay_ms);
        self
    }

    pub fn repeat(mut self, repeat: RepeatSpec) -> Self {
        self.repeat = Some(repeat);
        self
    }

    pub fn max_attempts(mut self, max_attempts: i32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }
}

/// Returned by enqueue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobHandle {
    pub id: JobId,
    pub queue: String,
    pub kind: String,
    pub state: JobState,
    pub run_at: Option<i64>,
}

impl From<&Job> for JobHandle {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id.clone(),
            queue: job.queue.clone(),
            kind: job.kind.to_string(),
            state: job.state,
            run_at: job.run_at,
        }
    }
}

pub struct QueueStore {
    job_repo: Arc<dyn JobRepository>,
    time_provider: Arc<dyn TimeProvider>,
    id_provider: Arc<dyn IdProvider>,
    queues: Vec<QueueConfig>,
    /// kind -> index into `queues`
    routes: HashMap<String, usize>,
    max_payload_depth: usize,
}

impl QueueStore {
    pub fn new(
        job_repo: Arc<dyn JobRepository>,
        time_provider: Arc<dyn TimeProvider>,
        id_provider: Arc<dyn IdProvider>,
        queues: Vec<QueueConfig>,
        max_payload_depth: usize,
    ) -> Result<Self> {
        let mut routes = HashMap::new();
        for (idx, queue) in queues.iter().enumerate() {
            queue.retry.backoff.validate()?;
            for kind in &queue.kinds {
                if routes.insert(kind.clone(), idx).is_some() {
                    return Err(AppError::Config(format!(
                        "kind '{}' routed to more than one queue",
                        kind
                    )));
                }
            }
        }
        Ok(Self {
            job_repo,
            time_provider,
            id_provider,
            queues,
            routes,
            max_payload_depth,
        })
    }

    /// Persist every queue (startup only)
    pub async fn register_all(&self) -> Result<()> {
        for queue in &self.queues {
            self.job_repo.register_queue(queue).await?;
            debug!(queue = %queue.name, kinds = ?queue.kinds, "Queue registered");
        }
        Ok(())
    }

    pub fn queues(&self) -> &[QueueConfig] {
        &self.queues
    }

    pub fn job_repo(&self) -> &Arc<dyn JobRepository> {
        &self.job_repo
    }

    pub fn queue(&self, name: &str) -> Result<&QueueConfig> {
        self.queues
            .iter()
            .find(|q| q.name == name)
            .ok_or_else(|| AppError::NotFound(format!("queue '{}'", name)))
    }

    pub fn queue_for_kind(&self, kind: &str) -> Result<&QueueConfig> {
        self.routes
            .get(kind)
            .map(|idx| &self.queues[*idx])
            .ok_or_else(|| AppError::InvalidKind(kind.to_string()))
    }

    /// Validate, route and persist a new envelope
    pub async fn enqueue(
        &self,
        kind: &str,
        payload: serde_json::Value,
        options: EnqueueOptions,
    ) -> Result<JobHandle> {
        if kind.trim().is_empty() {
            return Err(AppError::Validation("job kind must not be empty".to_string()));
        }
        let queue = self.queue_for_kind(kind)?;
        self.validate(&payload, &options)?;

        let now = self.time_provider.now_millis();
        let mut job = Job::new(
            self.id_provider.generate_id(),
            now,
            queue.name.clone(),
            JobKind::new(kind),
            JobPayload::new(payload),
        );
        job.priority = options.priority.unwrap_or(0);
        job.max_attempts = options.max_attempts.unwrap_or(queue.retry.max_attempts);
        job.backoff = options.backoff.unwrap_or_else(|| queue.retry.backoff.clone());

        let first_run = match (&options.repeat, options.delay_ms) {
            (_, Some(delay)) if delay > 0 => Some(now + delay),
            (Some(repeat), _) => repeat.rule.to_schedule()?.next_after(now),
            _ => None,
        };
        if let Some(run_at) = first_run {
            job.delay_until(run_at);
        }
        job.repeat = options.repeat;

        self.job_repo.insert(&job).await?;

        info!(
            job_id = %job.id,
            queue = %job.queue,
            kind = %job.kind,
            priority = job.priority,
            run_at = ?job.run_at,
            "Job enqueued"
        );
        Ok(JobHandle::from(&job))
    }

    fn validate(&self, payload: &serde_json::Value, options: &EnqueueOptions) -> Result<()> {
        if let Some(priority) = options.priority {
            if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&priority) {
                return Err(AppError::Validation(format!(
                    "priority {} outside {}..={}",
                    priority, MIN_PRIORITY, MAX_PRIORITY
                )));
            }
        }
        if let Some(max_attempts) = options.max_attempts {
            if max_attempts < 1 {
                return Err(AppError::Validation(
                    "max_attempts must be at least 1".to_string(),
                ));
            }
        }
        if let Some(delay) = options.delay_ms {
            if delay < 0 {
                return Err(AppError::Validation("delay must not be negative".to_string()));
            }
        }
        if let Some(backoff) = &options.backoff {
            backoff.validate()?;
        }
        if let Some(repeat) = &options.repeat {
            repeat.rule.to_schedule()?;
            if repeat.limit == Some(0) {
                return Err(AppError::Validation("repeat limit must be at least 1".to_string()));
            }
        }
        let depth = json_depth(payload);
        if depth > self.max_payload_depth {
            return Err(AppError::Validation(format!(
                "payload nesting depth {} exceeds {}",
                depth, self.max_payload_depth
            )));
        }
        Ok(())
    }

    /// Enqueue the following occurrence of a repeatable job
    ///
    /// Called when an occurrence is dispatched. None once the limit is hit.
    pub async fn enqueue_next_repeat(&self, job: &Job) -> Result<Option<JobHandle>> {
        let Some(next) = job.repeat.as_ref().and_then(|r| r.next_occurrence()) else {
            return Ok(None);
        };
        let now = self.time_provider.now_millis();
        let base = job.run_at.unwrap_or(now).max(now);
        let Some(run_at) = next.rule.to_schedule()?.next_after(base) else {
            return Ok(None);
        };

        let mut occurrence = Job::new(
            self.id_provider.generate_id(),
            now,
            job.queue.clone(),
            job.kind.clone(),
            job.payload.clone(),
        );
        occurrence.priority = job.priority;
        occurrence.max_attempts = job.max_attempts;
        occurrence.backoff = job.backoff.clone();
        occurrence.delay_until(run_at);
        occurrence.repeat = Some(next);

        self.job_repo.insert(&occurrence).await?;
        debug!(
            job_id = %occurrence.id,
            previous = %job.id,
            run_at = run_at,
            "Next repeat occurrence enqueued"
        );
        Ok(Some(JobHandle::from(&occurrence)))
    }

    pub async fn get_job(&self, id: &str) -> Result<Job> {
        self.job_repo
            .find_by_id(&id.to_string())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("job {}", id)))
    }

    pub async fn get_stats(&self, queue: &str) -> Result<QueueStats> {
        let queue = self.queue(queue)?;
        let name = queue.name.as_str();
        Ok(QueueStats {
            queue: name.to_string(),
            waiting: self.job_repo.count_by_state(name, JobState::Waiting).await?,
            active: self.job_repo.count_by_state(name, JobState::Active).await?,
            completed: self.job_repo.count_by_state(name, JobState::Completed).await?,
            failed: self.job_repo.count_by_state(name, JobState::Failed).await?,
            delayed: self.job_repo.count_by_state(name, JobState::Delayed).await?,
            paused: self.job_repo.is_paused(name).await?,
        })
    }

    pub async fn get_all_stats(&self) -> Result<Vec<QueueStats>> {
        let mut all = Vec::with_capacity(self.queues.len());
        for queue in &self.queues {
            all.push(self.get_stats(&queue.name).await?);
        }
        Ok(all)
    }

    /// FAILED -> WAITING with a fresh attempt budget
    pub async fn retry_job(&self, id: &str) -> Result<Job> {
        let mut job = self.get_job(id).await?;
        job.reset_for_retry().map_err(|_| {
            AppError::InvalidState(format!(
                "job {} is {}, only FAILED jobs can be retried",
                id, job.state
            ))
        })?;
        self.job_repo.update(&job).await?;
        info!(job_id = %id, queue = %job.queue, "Job manually retried");
        Ok(job)
    }

    /// Remove a job that has not started
    pub async fn remove_job(&self, id: &str) -> Result<()> {
        let job = self.get_job(id).await?;
        if !matches!(job.state, JobState::Waiting | JobState::Delayed) {
            return Err(AppError::InvalidState(format!(
                "job {} is {}, only WAITING or DELAYED jobs can be removed",
                id, job.state
            )));
        }
        if !self.job_repo.delete_pending(&job.id).await? {
            // Picked up between the read and the delete
            return Err(AppError::Conflict(format!("job {} started before removal", id)));
        }
        info!(job_id = %id, queue = %job.queue, "Job removed");
        Ok(())
    }

    /// Stop new dispatch; in-flight jobs finish
    pub async fn pause(&self, queue: &str) -> Result<()> {
        let queue = self.queue(queue)?;
        self.job_repo.set_paused(&queue.name, true).await?;
        info!(queue = %queue.name, "Queue paused");
        Ok(())
    }

    pub async fn resume(&self, queue: &str) -> Result<()> {
        let queue = self.queue(queue)?;
        self.job_repo.set_paused(&queue.name, false).await?;
        info!(queue = %queue.name, "Queue resumed");
        Ok(())
    }

    /// Purge terminal jobs finished more than `older_than_ms` ago
    pub async fn clean(
        &self,
        queue: &str,
        kind: Option<&str>,
        older_than_ms: i64,
        state: JobState,
    ) -> Result<u64> {
        let queue = self.queue(queue)?;
        if !state.is_terminal() {
            return Err(AppError::Validation(format!(
                "only COMPLETED or FAILED jobs can be cleaned, got {}",
                state
            )));
        }
        if older_than_ms < 0 {
            return Err(AppError::Validation("age must not be negative".to_string()));
        }
        let cutoff = self.time_provider.now_millis() - older_than_ms;
        let removed = self
            .job_repo
            .clean(&queue.name, kind, state, cutoff)
            .await?;
        info!(queue = %queue.name, kind = ?kind, state = %state, removed = removed, "Queue cleaned");
        Ok(removed)
    }

    /// Enforce the queue's keep-completed / keep-failed counts
    pub async fn apply_retention(&self, queue: &str, state: JobState) -> Result<u64> {
        let queue = self.queue(queue)?;
        let keep = match state {
            JobState::Completed => queue.retention.keep_completed,
            JobState::Failed => queue.retention.keep_failed,
            _ => return Ok(0),
        };
        let trimmed = self.job_repo.trim(&queue.name, state, keep).await?;
        if trimmed > 0 {
            debug!(queue = %queue.name, state = %state, trimmed = trimmed, "Retention applied");
        }
        Ok(trimmed)
    }

    /// Best-effort variant for the dispatch path
    pub async fn apply_retention_logged(&self, queue: &str, state: JobState) {
        if let Err(e) = self.apply_retention(queue, state).await {
            warn!(queue = %queue, state = %state, error = %e, "Retention failed");
        }
    }
}

fn json_depth(value: &serde_json::Value) -> usize {
    match value {
        serde_json::Value::Array(items) => 1 + items.iter().map(json_depth).max().unwrap_or(0),
        serde_json::Value::Object(map) => 1 + map.values().map(json_depth).max().unwrap_or(0),
        _ => 0,
    }
}
