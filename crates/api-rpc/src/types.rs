//! RPC Request/Response Types
//!
//! Parameters travel as a single JSON object (named or wrapped in a
//! one-element array).

use launchpad_core::application::processors::CreateBusinessRequest;
use launchpad_core::application::EnqueueOptions;
use launchpad_core::domain::JobState;
use serde::{Deserialize, Serialize};

/// business.create.v1
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBusinessParams {
    #[serde(flatten)]
    pub request: CreateBusinessRequest,
    #[serde(default)]
    pub options: EnqueueOptions,
}

/// development.monitor.v1, marketing.evaluate.v1
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessJobParams {
    pub business_id: String,
    #[serde(default)]
    pub options: EnqueueOptions,
}

/// admin.job.*.v1
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobParams {
    pub job_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveJobResponse {
    pub job_id: String,
    pub removed: bool,
}

/// admin.queue.pause.v1, admin.queue.resume.v1
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueParams {
    pub queue: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueStateResponse {
    pub queue: String,
    pub paused: bool,
}

/// admin.queue.clean.v1
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanQueueParams {
    pub queue: String,
    #[serde(default)]
    pub kind: Option<String>,
    /// Grace period; terminal jobs finished earlier than this are removed
    #[serde(default)]
    pub older_than_ms: i64,
    #[serde(default = "default_clean_state")]
    pub state: JobState,
}

fn default_clean_state() -> JobState {
    JobState::Completed
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanQueueResponse {
    pub queue: String,
    pub removed: u64,
}
