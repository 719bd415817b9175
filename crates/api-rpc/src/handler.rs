//! RPC Method Handlers
//!
//! Thin adapters from JSON-RPC parameters to orchestrator calls.

use crate::error::to_rpc_error;
use crate::types::{
    BusinessJobParams, CleanQueueParams, CleanQueueResponse, CreateBusinessParams, JobParams,
    QueueParams, QueueStateResponse, RemoveJobResponse,
};
use jsonrpsee::types::ErrorObjectOwned;
use launchpad_core::application::{
    HealthReport, JobHandle, Orchestrator, ScheduledJobInfo, SystemStats,
};
use launchpad_core::domain::Job;
use std::sync::Arc;
use tracing::info;

type RpcResult<T> = Result<T, ErrorObjectOwned>;

/// RPC Handler with injected dependencies
pub struct RpcHandler {
    orchestrator: Arc<Orchestrator>,
}

impl RpcHandler {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }

    /// business.create.v1
    pub async fn create_business(&self, params: CreateBusinessParams) -> RpcResult<JobHandle> {
        let handle = self
            .orchestrator
            .create_business(params.request, params.options)
            .await
            .map_err(to_rpc_error)?;
        info!(job_id = %handle.id, "Business creation accepted");
        Ok(handle)
    }

    /// development.monitor.v1
    pub async fn monitor_development(&self, params: BusinessJobParams) -> RpcResult<JobHandle> {
        self.orchestrator
            .monitor_development(&params.business_id, params.options)
            .await
            .map_err(to_rpc_error)
    }

    /// marketing.evaluate.v1
    pub async fn evaluate_business(&self, params: BusinessJobParams) -> RpcResult<JobHandle> {
        self.orchestrator
            .evaluate_business(&params.business_id, params.options)
            .await
            .map_err(to_rpc_error)
    }

    /// admin.stats.v1
    pub async fn stats(&self) -> RpcResult<SystemStats> {
        self.orchestrator
            .get_system_stats()
            .await
            .map_err(to_rpc_error)
    }

    /// admin.health.v1
    pub async fn health(&self) -> RpcResult<HealthReport> {
        Ok(self.orchestrator.health_check().await)
    }

    /// admin.job.get.v1
    pub async fn get_job(&self, params: JobParams) -> RpcResult<Job> {
        self.orchestrator
            .get_job(&params.job_id)
            .await
            .map_err(to_rpc_error)
    }

    /// admin.job.retry.v1
    pub async fn retry_job(&self, params: JobParams) -> RpcResult<Job> {
        self.orchestrator
            .retry_job(&params.job_id)
            .await
            .map_err(to_rpc_error)
    }

    /// admin.job.remove.v1
    pub async fn remove_job(&self, params: JobParams) -> RpcResult<RemoveJobResponse> {
        self.orchestrator
            .remove_job(&params.job_id)
            .await
            .map_err(to_rpc_error)?;
        Ok(RemoveJobResponse {
            job_id: params.job_id,
            removed: true,
        })
    }

    /// admin.queue.pause.v1
    pub async fn pause_queue(&self, params: QueueParams) -> RpcResult<QueueStateResponse> {
        self.orchestrator
            .pause_queue(&params.queue)
            .await
            .map_err(to_rpc_error)?;
        Ok(QueueStateResponse {
            queue: params.queue,
            paused: true,
        })
    }

    /// admin.queue.resume.v1
    pub async fn resume_queue(&self, params: QueueParams) -> RpcResult<QueueStateResponse> {
        self.orchestrator
            .resume_queue(&params.queue)
            .await
            .map_err(to_rpc_error)?;
        Ok(QueueStateResponse {
            queue: params.queue,
            paused: false,
        })
    }

    /// admin.queue.clean.v1
    pub async fn clean_queue(&self, params: CleanQueueParams) -> RpcResult<CleanQueueResponse> {
        let removed = self
            .orchestrator
            .clean_queue(
                &params.queue,
                params.kind.as_deref(),
                params.older_than_ms,
                params.state,
            )
            .await
            .map_err(to_rpc_error)?;
        Ok(CleanQueueResponse {
            queue: params.queue,
            removed,
        })
    }

    /// admin.schedule.list.v1
    pub async fn list_schedules(&self) -> RpcResult<Vec<ScheduledJobInfo>> {
        self.orchestrator
            .get_scheduled_jobs()
            .await
            .map_err(to_rpc_error)
    }
}
