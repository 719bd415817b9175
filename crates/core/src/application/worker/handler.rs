// Handler contract between dispatch and the workflow processors

use crate::domain::{Job, JobId};
use crate::error::AppError;
use crate::port::{CollaboratorError, JobRepository, TimeProvider};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

/// Typed handler failure: decides whether dispatch retries
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HandlerError {
    /// Transient; retried per the job's backoff until attempts run out
    #[error("{0}")]
    Retryable(String),

    /// Retrying cannot help; the job fails now
    #[error("{0}")]
    Fatal(String),
}

impl HandlerError {
    pub fn retryable(msg: impl Into<String>) -> Self {
        HandlerError::Retryable(msg.into())
    }

    pub fn fatal(msg: impl Into<String>) -> Self {
        HandlerError::Fatal(msg.into())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, HandlerError::Retryable(_))
    }
}

impl From<AppError> for HandlerError {
    fn from(err: AppError) -> Self {
        if err.is_retryable() {
            HandlerError::Retryable(err.to_string())
        } else {
            HandlerError::Fatal(err.to_string())
        }
    }
}

impl From<CollaboratorError> for HandlerError {
    fn from(err: CollaboratorError) -> Self {
        AppError::from(err).into()
    }
}

/// Success value is stored as the job result
pub type HandlerResult = std::result::Result<serde_json::Value, HandlerError>;

/// What a handler sees of the job it runs
#[derive(Clone)]
pub struct JobContext {
    job: Job,
    job_repo: Arc<dyn JobRepository>,
    time_provider: Arc<dyn TimeProvider>,
}

impl JobContext {
    pub fn new(
        job: Job,
        job_repo: Arc<dyn JobRepository>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            job,
            job_repo,
            time_provider,
        }
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    pub fn id(&self) -> &JobId {
        &self.job.id
    }

    /// 1-based number of the attempt now running
    pub fn attempt(&self) -> i32 {
        self.job.attempts + 1
    }

    /// Whether a retryable failure of this attempt would be retried
    pub fn retry_available(&self) -> bool {
        self.attempt() < self.job.max_attempts
    }

    pub fn now_millis(&self) -> i64 {
        self.time_provider.now_millis()
    }

    pub fn time_provider(&self) -> &Arc<dyn TimeProvider> {
        &self.time_provider
    }

    /// Decode the payload. A payload that does not decode never will.
    pub fn payload<T: DeserializeOwned>(&self) -> std::result::Result<T, HandlerError> {
        self.job
            .payload
            .decode()
            .map_err(|e| HandlerError::fatal(format!("invalid {} payload: {}", self.job.kind, e)))
    }

    /// Refresh the heartbeat from inside a long step
    pub async fn heartbeat(&self) {
        let now = self.time_provider.now_millis();
        if let Err(e) = self.job_repo.touch(&self.job.id, now).await {
            warn!(job_id = %self.job.id, error = %e, "Heartbeat failed");
        }
    }
}

/// Processor bound to one or more job kinds
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, ctx: JobContext) -> HandlerResult;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Scripted outcome per call; the last entry repeats
    #[derive(Debug, Clone)]
    pub enum Scripted {
        Ok,
        Retryable,
        Fatal,
        Panic,
        /// Sleep, then succeed
        Slow(Duration),
    }

    pub struct ScriptedHandler {
        script: Mutex<Vec<Scripted>>,
        calls: AtomicU32,
        seen: Mutex<Vec<JobId>>,
    }

    impl ScriptedHandler {
        pub fn new(script: Vec<Scripted>) -> Self {
            Self {
                script: Mutex::new(script),
                calls: AtomicU32::new(0),
                seen: Mutex::new(Vec::new()),
            }
        }

        pub fn succeeding() -> Self {
            Self::new(vec![Scripted::Ok])
        }

        pub fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn seen(&self) -> Vec<JobId> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl JobHandler for ScriptedHandler {
        async fn handle(&self, ctx: JobContext) -> HandlerResult {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
            self.seen.lock().unwrap().push(ctx.id().clone());
            let step = {
                let script = self.script.lock().unwrap();
                script
                    .get(call)
                    .or_else(|| script.last())
                    .cloned()
                    .unwrap_or(Scripted::Ok)
            };
            match step {
                Scripted::Ok => Ok(serde_json::json!({ "call": call })),
                Scripted::Retryable => Err(HandlerError::retryable("transient failure")),
                Scripted::Fatal => Err(HandlerError::fatal("permanent failure")),
                Scripted::Panic => panic!("handler exploded"),
                Scripted::Slow(d) => {
                    tokio::time::sleep(d).await;
                    Ok(serde_json::json!({ "call": call }))
                }
            }
        }
    }
}
