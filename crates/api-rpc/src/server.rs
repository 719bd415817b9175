//! JSON-RPC Server
//!
//! JSON-RPC 2.0 over HTTP, bound to localhost by default.

use crate::error::RpcServerError;
use crate::handler::RpcHandler;
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::types::{ErrorObjectOwned, Params};
use jsonrpsee::RpcModule;
use launchpad_core::application::Orchestrator;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

const DEFAULT_RPC_HOST: &str = "127.0.0.1";
const DEFAULT_RPC_PORT: u16 = 9527;

pub mod methods {
    pub const BUSINESS_CREATE: &str = "business.create.v1";
    pub const DEVELOPMENT_MONITOR: &str = "development.monitor.v1";
    pub const MARKETING_EVALUATE: &str = "marketing.evaluate.v1";
    pub const ADMIN_STATS: &str = "admin.stats.v1";
    pub const ADMIN_HEALTH: &str = "admin.health.v1";
    pub const JOB_GET: &str = "admin.job.get.v1";
    pub const JOB_RETRY: &str = "admin.job.retry.v1";
    pub const JOB_REMOVE: &str = "admin.job.remove.v1";
    pub const QUEUE_PAUSE: &str = "admin.queue.pause.v1";
    pub const QUEUE_RESUME: &str = "admin.queue.resume.v1";
    pub const QUEUE_CLEAN: &str = "admin.queue.clean.v1";
    pub const SCHEDULE_LIST: &str = "admin.schedule.list.v1";
}

/// RPC Server Configuration
#[derive(Debug, Clone)]
pub struct RpcServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPC_HOST.to_string(),
            port: DEFAULT_RPC_PORT,
        }
    }
}

/// RPC Server
pub struct RpcServer {
    config: RpcServerConfig,
    handler: Arc<RpcHandler>,
}

/// Accepts `{...}` as named params or `[{...}]` as a single positional one
fn parse_params<T: DeserializeOwned>(params: &Params<'_>) -> Result<T, ErrorObjectOwned> {
    match params.as_str().map(str::trim_start) {
        Some(raw) if raw.starts_with('[') => params.one(),
        _ => params.parse(),
    }
}

/// Register a method taking one parameter object
fn register<P, R, F, Fut>(
    module: &mut RpcModule<()>,
    name: &'static str,
    handler: &Arc<RpcHandler>,
    call: F,
) -> Result<(), RpcServerError>
where
    P: DeserializeOwned + Send + 'static,
    R: Serialize + Clone + Send + 'static,
    F: Fn(Arc<RpcHandler>, P) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<R, ErrorObjectOwned>> + Send + 'static,
{
    let handler = handler.clone();
    module
        .register_async_method(name, move |params, _, _| {
            let handler = handler.clone();
            let call = call.clone();
            async move {
                let req: P = parse_params(&params)?;
                call(handler, req).await
            }
        })
        .map_err(|e| RpcServerError::Register(e.to_string()))?;
    Ok(())
}

/// Register a method without parameters
fn register_bare<R, F, Fut>(
    module: &mut RpcModule<()>,
    name: &'static str,
    handler: &Arc<RpcHandler>,
    call: F,
) -> Result<(), RpcServerError>
where
    R: Serialize + Clone + Send + 'static,
    F: Fn(Arc<RpcHandler>) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<R, ErrorObjectOwned>> + Send + 'static,
{
    let handler = handler.clone();
    module
        .register_async_method(name, move |_, _, _| {
            let handler = handler.clone();
            let call = call.clone();
            async move { call(handler).await }
        })
        .map_err(|e| RpcServerError::Register(e.to_string()))?;
    Ok(())
}

impl RpcServer {
    pub fn new(config: RpcServerConfig, orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            config,
            handler: Arc::new(RpcHandler::new(orchestrator)),
        }
    }

    fn module(&self) -> Result<RpcModule<()>, RpcServerError> {
        let mut module = RpcModule::new(());
        let h = &self.handler;

        register(&mut module, methods::BUSINESS_CREATE, h, |h, p| async move {
            h.create_business(p).await
        })?;
        register(&mut module, methods::DEVELOPMENT_MONITOR, h, |h, p| async move {
            h.monitor_development(p).await
        })?;
        register(&mut module, methods::MARKETING_EVALUATE, h, |h, p| async move {
            h.evaluate_business(p).await
        })?;

        register_bare(&mut module, methods::ADMIN_STATS, h, |h| async move {
            h.stats().await
        })?;
        register_bare(&mut module, methods::ADMIN_HEALTH, h, |h| async move {
            h.health().await
        })?;

        register(&mut module, methods::JOB_GET, h, |h, p| async move {
            h.get_job(p).await
        })?;
        register(&mut module, methods::JOB_RETRY, h, |h, p| async move {
            h.retry_job(p).await
        })?;
        register(&mut module, methods::JOB_REMOVE, h, |h, p| async move {
            h.remove_job(p).await
        })?;

        register(&mut module, methods::QUEUE_PAUSE, h, |h, p| async move {
            h.pause_queue(p).await
        })?;
        register(&mut module, methods::QUEUE_RESUME, h, |h, p| async move {
            h.resume_queue(p).await
        })?;
        register(&mut module, methods::QUEUE_CLEAN, h, |h, p| async move {
            h.clean_queue(p).await
        })?;

        register_bare(&mut module, methods::SCHEDULE_LIST, h, |h| async move {
            h.list_schedules().await
        })?;

        Ok(module)
    }

    /// Bind and start serving. Returns the bound address (useful with port 0).
    pub async fn start(self) -> Result<(SocketAddr, ServerHandle), RpcServerError> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let module = self.module()?;

        let bind_err = |source: std::io::Error| RpcServerError::Bind {
            addr: addr.clone(),
            source,
        };
        let server = Server::builder().build(&addr).await.map_err(bind_err)?;
        let local_addr = server.local_addr().map_err(bind_err)?;

        info!(addr = %local_addr, methods = module.method_names().count(), "JSON-RPC server started");
        Ok((local_addr, server.start(module)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::code;
    use jsonrpsee::core::client::{ClientT, Error as ClientError};
    use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
    use jsonrpsee::rpc_params;
    use launchpad_core::application::{Collaborators, OrchestratorDeps};
    use launchpad_core::port::business_repository::mocks::MockBusinessRepository;
    use launchpad_core::port::campaign_analyzer::mocks::MockCampaignAnalyzer;
    use launchpad_core::port::content_generator::mocks::MockContentGenerator;
    use launchpad_core::port::id_provider::mocks::SequentialIdProvider;
    use launchpad_core::port::job_repository::mocks::InMemoryJobRepository;
    use launchpad_core::port::maintenance::mocks::MockMaintenance;
    use launchpad_core::port::notification_sink::mocks::RecordingNotificationSink;
    use launchpad_core::port::payment_gateway::mocks::MockPaymentGateway;
    use launchpad_core::port::project_scaffolder::mocks::MockProjectScaffolder;
    use launchpad_core::port::system_probe::mocks::MockSystemProbe;
    use launchpad_core::port::SystemTimeProvider;
    use launchpad_core::OrchestratorConfig;
    use serde_json::{json, Value};

    async fn start() -> (Arc<Orchestrator>, HttpClient, ServerHandle) {
        let deps = OrchestratorDeps {
            job_repo: Arc::new(InMemoryJobRepository::new()),
            maintenance: Arc::new(MockMaintenance::new()),
            system_probe: Arc::new(MockSystemProbe::new(5.0)),
            collaborators: Collaborators {
                businesses: Arc::new(MockBusinessRepository::new()),
                content: Arc::new(MockContentGenerator::new()),
                scaffolder: Arc::new(MockProjectScaffolder::new()),
                campaigns: Arc::new(MockCampaignAnalyzer::new()),
                payments: Arc::new(MockPaymentGateway::new()),
                notifications: Arc::new(RecordingNotificationSink::new()),
            },
            time_provider: Arc::new(SystemTimeProvider),
            id_provider: Arc::new(SequentialIdProvider::new("rpc")),
        };
        let config = OrchestratorConfig {
            poll_interval_ms: 10,
            shutdown_drain_timeout_secs: 2,
            ..OrchestratorConfig::default()
        };
        let orchestrator = Arc::new(Orchestrator::new(config, deps).unwrap());
        orchestrator.initialize().await.unwrap();

        let server = RpcServer::new(
            RpcServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            orchestrator.clone(),
        );
        let (addr, handle) = server.start().await.unwrap();
        let client = HttpClientBuilder::default()
            .build(format!("http://{}", addr))
            .unwrap();
        (orchestrator, client, handle)
    }

    fn error_code(err: ClientError) -> i32 {
        match err {
            ClientError::Call(e) => e.code(),
            other => panic!("unexpected client error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_health_and_stats() {
        let (orchestrator, client, _handle) = start().await;

        let health: Value = client
            .request(methods::ADMIN_HEALTH, rpc_params![])
            .await
            .unwrap();
        assert_eq!(health["status"], json!("healthy"));

        let stats: Value = client
            .request(methods::ADMIN_STATS, rpc_params![])
            .await
            .unwrap();
        assert_eq!(stats["state"], json!("RUNNING"));
        assert_eq!(stats["queues"].as_array().unwrap().len(), 6);

        let schedules: Vec<Value> = client
            .request(methods::SCHEDULE_LIST, rpc_params![])
            .await
            .unwrap();
        assert_eq!(schedules.len(), 8);

        orchestrator.shutdown().await;
    }

    #[tokio::test]
    async fn test_evaluate_then_get_and_remove_job() {
        let (orchestrator, client, _handle) = start().await;
        orchestrator.pause_queue("marketing").await.unwrap();

        let handle: Value = client
            .request(
                methods::MARKETING_EVALUATE,
                rpc_params![json!({ "businessId": "b1" })],
            )
            .await
            .unwrap();
        let job_id = handle["id"].as_str().unwrap().to_string();

        let job: Value = client
            .request(methods::JOB_GET, rpc_params![json!({ "jobId": job_id })])
            .await
            .unwrap();
        assert_eq!(job["kind"], json!("evaluate-business"));
        assert_eq!(job["payload"]["businessId"], json!("b1"));

        let removed: Value = client
            .request(methods::JOB_REMOVE, rpc_params![json!({ "jobId": job_id })])
            .await
            .unwrap();
        assert_eq!(removed["removed"], json!(true));

        let err = client
            .request::<Value, _>(methods::JOB_GET, rpc_params![json!({ "jobId": job_id })])
            .await
            .unwrap_err();
        assert_eq!(error_code(err), code::NOT_FOUND);

        orchestrator.shutdown().await;
    }

    #[tokio::test]
    async fn test_invalid_create_is_a_validation_error() {
        let (orchestrator, client, _handle) = start().await;

        let err = client
            .request::<Value, _>(
                methods::BUSINESS_CREATE,
                rpc_params![json!({ "userId": "u1", "name": "Acme", "concept": "" })],
            )
            .await
            .unwrap_err();
        assert_eq!(error_code(err), code::VALIDATION_ERROR);

        orchestrator.shutdown().await;
    }

    #[tokio::test]
    async fn test_pause_and_resume_queue() {
        let (orchestrator, client, _handle) = start().await;

        let paused: Value = client
            .request(methods::QUEUE_PAUSE, rpc_params![json!({ "queue": "analytics" })])
            .await
            .unwrap();
        assert_eq!(paused, json!({ "queue": "analytics", "paused": true }));

        let resumed: Value = client
            .request(methods::QUEUE_RESUME, rpc_params![json!({ "queue": "analytics" })])
            .await
            .unwrap();
        assert_eq!(resumed["paused"], json!(false));

        let cleaned: Value = client
            .request(methods::QUEUE_CLEAN, rpc_params![json!({ "queue": "analytics" })])
            .await
            .unwrap();
        assert_eq!(cleaned["removed"], json!(0));

        orchestrator.shutdown().await;
    }

    #[tokio::test]
    async fn test_calls_after_shutdown_are_conflicts() {
        let (orchestrator, client, _handle) = start().await;
        orchestrator.shutdown().await;

        let err = client
            .request::<Value, _>(
                methods::DEVELOPMENT_MONITOR,
                rpc_params![json!({ "businessId": "b1" })],
            )
            .await
            .unwrap_err();
        assert_eq!(error_code(err), code::CONFLICT);
    }
}
