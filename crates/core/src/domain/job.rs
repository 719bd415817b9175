// Job Envelope Domain Model

use crate::domain::error::{DomainError, Result};
use crate::domain::schedule::RepeatRule;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Job ID (UUID v4)
pub type JobId = String;

/// Queue identifier
pub type QueueName = String;

/// Priority (higher number = higher priority)
pub type Priority = i32;

/// Lowest/highest priority accepted at enqueue time
pub const MIN_PRIORITY: Priority = -100;
pub const MAX_PRIORITY: Priority = 100;

/// Job State
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Waiting,
    Delayed,
    Active,
    Completed,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Waiting => "WAITING",
            JobState::Delayed => "DELAYED",
            JobState::Active => "ACTIVE",
            JobState::Completed => "COMPLETED",
            JobState::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "WAITING" => Ok(JobState::Waiting),
            "DELAYED" => Ok(JobState::Delayed),
            "ACTIVE" => Ok(JobState::Active),
            "COMPLETED" => Ok(JobState::Completed),
            "FAILED" => Ok(JobState::Failed),
            other => Err(DomainError::ValidationError(format!(
                "unknown job state: {}",
                other
            ))),
        }
    }
}

/// Job Kind (routes an envelope to its queue and handler)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobKind(String);

impl JobKind {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Job Payload (JSON serializable, immutable once enqueued)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPayload(serde_json::Value);

impl JobPayload {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    /// Decode the payload into a typed request
    pub fn decode<T: DeserializeOwned>(&self) -> std::result::Result<T, serde_json::Error> {
        T::deserialize(&self.0)
    }
}

/// Delay policy applied between failed attempts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackoffPolicy {
    /// `initial_ms * multiplier ^ attempts`
    Exponential { initial_ms: i64, multiplier: f64 },
    /// Same delay after every failure
    Fixed { delay_ms: i64 },
}

impl BackoffPolicy {
    pub fn exponential(initial_ms: i64, multiplier: f64) -> Self {
        BackoffPolicy::Exponential {
            initial_ms,
            multiplier,
        }
    }

    pub fn fixed(delay_ms: i64) -> Self {
        BackoffPolicy::Fixed { delay_ms }
    }

    /// Delay before retry number `retry + 1` (zero-based)
    pub fn delay_for(&self, retry: i32) -> i64 {
        match self {
            BackoffPolicy::Exponential {
                initial_ms,
                multiplier,
            } => {
                let delay = *initial_ms as f64 * multiplier.powi(retry.max(0));
                if delay >= i64::MAX as f64 {
                    i64::MAX
                } else {
                    delay as i64
                }
            }
            BackoffPolicy::Fixed { delay_ms } => *delay_ms,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            BackoffPolicy::Exponential {
                initial_ms,
                multiplier,
            } => {
                if *initial_ms <= 0 {
                    return Err(DomainError::ValidationError(
                        "backoff initial delay must be positive".to_string(),
                    ));
                }
                if !multiplier.is_finite() || *multiplier <= 1.0 {
                    return Err(DomainError::ValidationError(
                        "backoff multiplier must be greater than 1".to_string(),
                    ));
                }
                Ok(())
            }
            BackoffPolicy::Fixed { delay_ms } if *delay_ms < 0 => Err(
                DomainError::ValidationError("backoff delay must not be negative".to_string()),
            ),
            BackoffPolicy::Fixed { .. } => Ok(()),
        }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        BackoffPolicy::exponential(2_000, 2.0)
    }
}

/// Recurrence attached to a repeatable job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepeatSpec {
    pub rule: RepeatRule,
    /// Total number of runs, including the first one
    #[serde(default)]
    pub limit: Option<u32>,
    /// Zero-based index of this occurrence
    #[serde(default)]
    pub iteration: u32,
    /// Set once the following occurrence exists, so retries of this one
    /// never schedule it twice
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub successor_enqueued: bool,
}

impl RepeatSpec {
    pub fn new(rule: RepeatRule) -> Self {
        Self {
            rule,
            limit: None,
            iteration: 0,
            successor_enqueued: false,
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Spec for the following occurrence, or None once the limit is reached
    pub fn next_occurrence(&self) -> Option<RepeatSpec> {
        let iteration = self.iteration + 1;
        if let Some(limit) = self.limit {
            if iteration >= limit {
                return None;
            }
        }
        Some(RepeatSpec {
            rule: self.rule.clone(),
            limit: self.limit,
            iteration,
            successor_enqueued: false,
        })
    }
}

/// Job Envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub queue: QueueName,
    pub kind: JobKind,
    pub payload: JobPayload,
    pub priority: Priority,
    pub state: JobState,

    // Retry accounting
    pub attempts: i32,
    pub max_attempts: i32,
    pub backoff: BackoffPolicy,

    // Scheduling
    pub run_at: Option<i64>, // epoch ms, set for delayed jobs
    pub repeat: Option<RepeatSpec>,

    // Timestamps (epoch ms)
    pub created_at: i64,
    pub started_at: Option<i64>,
    pub finished_at: Option<i64>,
    pub heartbeat_at: Option<i64>,

    // Outcome
    pub failed_reason: Option<String>,
    pub result: Option<serde_json::Value>,
}

impl Job {
    /// Create a new job
    ///
    /// # Arguments
    ///
    /// * `id` - Unique job ID (injected, not generated)
    /// * `created_at` - Creation timestamp in epoch ms (injected, not system time)
    /// * `queue` - Owning queue, fixed for the life of the envelope
    /// * `kind` - Job kind
    /// * `payload` - Job payload
    pub fn new(
        id: impl Into<String>,
        created_at: i64,
        queue: impl Into<String>,
        kind: JobKind,
        payload: JobPayload,
    ) -> Self {
        Self {
            id: id.into(),
            queue: queue.into(),
            kind,
            payload,
            priority: 0,
            state: JobState::Waiting,
            attempts: 0,
            max_attempts: 3,
            backoff: BackoffPolicy::default(),
            run_at: None,
            repeat: None,
            created_at,
            started_at: None,
            finished_at: None,
            heartbeat_at: None,
            failed_reason: None,
            result: None,
        }
    }

    /// Create a test job with deterministic ID and timestamp.
    ///
    /// IDs are `test-1`, `test-2`, ...; timestamps start at 1000 and
    /// increment by 1000. Production code injects ID and time via providers.
    pub fn new_test(queue: impl Into<String>, kind: JobKind, payload: JobPayload) -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static TEST_COUNTER: AtomicU64 = AtomicU64::new(1);

        let counter = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        Self::new(
            format!("test-{}", counter),
            (counter * 1000) as i64,
            queue,
            kind,
            payload,
        )
    }

    /// Schedule the first run in the future
    pub fn delay_until(&mut self, run_at: i64) {
        self.state = JobState::Delayed;
        self.run_at = Some(run_at);
    }

    /// Whether the dispatcher may pick this job up at `now_millis`
    pub fn is_eligible(&self, now_millis: i64) -> bool {
        match self.state {
            JobState::Waiting => true,
            JobState::Delayed => self.run_at.map_or(true, |at| at <= now_millis),
            _ => false,
        }
    }

    /// Transition to Active with explicit timestamp
    pub fn start(&mut self, now_millis: i64) -> Result<()> {
        if !matches!(self.state, JobState::Waiting | JobState::Delayed) {
            return Err(DomainError::InvalidStateTransition {
                from: self.state.to_string(),
                to: JobState::Active.to_string(),
            });
        }
        self.state = JobState::Active;
        self.started_at = Some(now_millis);
        self.heartbeat_at = Some(now_millis);
        Ok(())
    }

    /// Transition to Completed with explicit timestamp
    pub fn complete(&mut self, now_millis: i64, result: serde_json::Value) -> Result<()> {
        if self.state != JobState::Active {
            return Err(DomainError::InvalidStateTransition {
                from: self.state.to_string(),
                to: JobState::Completed.to_string(),
            });
        }
        self.state = JobState::Completed;
        self.finished_at = Some(now_millis);
        self.result = Some(result);
        Ok(())
    }

    /// Count a failed attempt. Never exceeds `max_attempts`.
    pub fn record_attempt(&mut self) {
        if self.attempts < self.max_attempts {
            self.attempts += 1;
        }
    }

    pub fn attempts_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    /// Put an active job back as delayed until `run_at`
    pub fn requeue_at(&mut self, run_at: i64, reason: impl Into<String>) {
        self.state = JobState::Delayed;
        self.run_at = Some(run_at);
        self.started_at = None;
        self.heartbeat_at = None;
        self.failed_reason = Some(reason.into());
    }

    /// Mark as Failed with explicit timestamp
    pub fn fail(&mut self, now_millis: i64, reason: impl Into<String>) {
        self.state = JobState::Failed;
        self.finished_at = Some(now_millis);
        self.failed_reason = Some(reason.into());
    }

    /// Manual retry of a failed job: fresh attempt budget, runs immediately
    pub fn reset_for_retry(&mut self) -> Result<()> {
        if self.state != JobState::Failed {
            return Err(DomainError::InvalidStateTransition {
                from: self.state.to_string(),
                to: JobState::Waiting.to_string(),
            });
        }
        self.state = JobState::Waiting;
        self.attempts = 0;
        self.run_at = None;
        self.started_at = None;
        self.finished_at = None;
        self.heartbeat_at = None;
        self.failed_reason = None;
        self.result = None;
        Ok(())
    }
}
