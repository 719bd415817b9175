// Queue Domain Model

use crate::domain::job::BackoffPolicy;
use serde::{Deserialize, Serialize};

/// Queue identifier
pub type QueueId = String;

/// Default retry behaviour for envelopes that don't override it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrySettings {
    pub max_attempts: i32,
    pub backoff: BackoffPolicy,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: BackoffPolicy::default(),
        }
    }
}

/// How many terminal envelopes a queue keeps around
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    pub keep_completed: usize,
    pub keep_failed: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            keep_completed: 100,
            keep_failed: 500,
        }
    }
}

/// Queue configuration. Created once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueConfig {
    pub name: QueueId,
    /// Job kinds routed to this queue
    pub kinds: Vec<String>,
    /// Default concurrency ceiling for each kind
    pub concurrency: usize,
    pub retry: RetrySettings,
    pub retention: RetentionPolicy,
}

impl QueueConfig {
    pub fn new(name: impl Into<String>, concurrency: usize) -> Self {
        Self {
            name: name.into(),
            kinds: Vec::new(),
            concurrency: concurrency.max(1),
            retry: RetrySettings::default(),
            retention: RetentionPolicy::default(),
        }
    }

    pub fn with_kinds(mut self, kinds: &[&str]) -> Self {
        self.kinds = kinds.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn with_retry(mut self, max_attempts: i32, backoff: BackoffPolicy) -> Self {
        self.retry = RetrySettings {
            max_attempts,
            backoff,
        };
        self
    }

    pub fn with_retention(mut self, keep_completed: usize, keep_failed: usize) -> Self {
        self.retention = RetentionPolicy {
            keep_completed,
            keep_failed,
        };
        self
    }

    pub fn handles(&self, kind: &str) -> bool {
        self.kinds.iter().any(|k| k == kind)
    }
}

/// Per-queue envelope counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub queue: QueueId,
    pub waiting: i64,
    pub active: i64,
    pub completed: i64,
    pub failed: i64,
    pub delayed: i64,
    pub paused: bool,
}

impl QueueStats {
    pub fn total(&self) -> i64 {
        self.waiting + self.active + self.completed + self.failed + self.delayed
    }
}
