//! Collaborator gateway over JSON-RPC
//!
//! One HTTP client serves every outbound port. Each port method maps to a
//! versioned remote method taking a single object parameter.

use crate::error::{map_client_error, GatewayError};
use async_trait::async_trait;
use jsonrpsee::core::client::ClientT;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::rpc_params;
use launchpad_core::domain::{
    Business, BusinessUpdate, Campaign, NewBusiness, Notification, PerformanceSnapshot,
    ProgressRecord,
};
use launchpad_core::port::{
    BusinessPlan, BusinessRepository, CampaignAnalyzer, CodeQuality, CollaboratorResult,
    ContentGenerator, DevelopmentProgress, FailedPayment, NotificationSink, PaymentGateway,
    PlanInput, ProjectHandle, ProjectScaffolder, ProjectSpec, TestReport,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub mod methods {
    pub const GET_BUSINESS: &str = "businesses.get.v1";
    pub const CREATE_BUSINESS: &str = "businesses.create.v1";
    pub const FIND_BY_CREATION_REQUEST: &str = "businesses.findByCreationRequest.v1";
    pub const UPDATE_BUSINESS: &str = "businesses.update.v1";
    pub const ACTIVE_BUSINESSES: &str = "businesses.active.v1";
    pub const CAMPAIGNS_BY_BUSINESS: &str = "businesses.campaigns.v1";

    pub const RESEARCH_MARKET: &str = "content.research.v1";
    pub const REFINE_CONCEPT: &str = "content.refine.v1";
    pub const GENERATE_PLAN: &str = "content.plan.v1";

    pub const CREATE_PROJECT: &str = "projects.create.v1";
    pub const DEPLOY: &str = "projects.deploy.v1";
    pub const PROGRESS: &str = "projects.progress.v1";
    pub const CODE_QUALITY: &str = "projects.quality.v1";
    pub const RUN_TESTS: &str = "projects.test.v1";

    pub const ANALYZE_CAMPAIGN: &str = "campaigns.analyze.v1";
    pub const SCALE_CAMPAIGN: &str = "campaigns.scale.v1";
    pub const PAUSE_CAMPAIGN: &str = "campaigns.pause.v1";
    pub const OPTIMIZE_CAMPAIGN: &str = "campaigns.optimize.v1";

    pub const FAILED_PAYMENTS: &str = "payments.failed.v1";
    pub const RETRY_PAYMENT: &str = "payments.retry.v1";

    pub const NOTIFY_PROGRESS: &str = "notify.progress.v1";
    pub const NOTIFY_USER: &str = "notify.user.v1";
    pub const NOTIFY_DEVELOPMENT: &str = "notify.development.v1";
}

/// Gateway connection settings
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub url: String,
    pub timeout: Duration,
}

impl GatewayConfig {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }
}

/// JSON-RPC client for every external collaborator
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone)]
pub struct GatewayClient {
    client: Arc<HttpClient>,
    timeout_ms: u64,
}

impl GatewayClient {
    /// Build the client. No request is sent until the first call.
    pub fn connect(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let client = HttpClientBuilder::default()
            .request_timeout(config.timeout)
            .build(&config.url)
            .map_err(|e| GatewayError::InvalidUrl {
                url: config.url.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client: Arc::new(client),
            timeout_ms: u64::try_from(config.timeout.as_millis()).unwrap_or(u64::MAX),
        })
    }

    async fn call<R: DeserializeOwned>(&self, method: &str, params: Value) -> CollaboratorResult<R> {
        debug!(method = %method, "Gateway call");
        self.client
            .request(method, rpc_params![params])
            .await
            .map_err(|e| {
                let err = map_client_error(e, self.timeout_ms);
                warn!(method = %method, error = %err, "Gateway call failed");
                err
            })
    }

    /// Calls whose result carries nothing
    async fn call_unit(&self, method: &str, params: Value) -> CollaboratorResult<()> {
        let _: Value = self.call(method, params).await?;
        Ok(())
    }

    /// Fire-and-forget JSON-RPC notification
    fn notify(&self, method: &'static str, params: Value) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(method = %method, "No runtime, notification dropped");
            return;
        };
        let client = self.client.clone();
        runtime.spawn(async move {
            if let Err(e) = client.notification(method, rpc_params![params]).await {
                warn!(method = %method, error = %e, "Notification not delivered");
            }
        });
    }
}

#[async_trait]
impl BusinessRepository for GatewayClient {
    async fn get_business(&self, id: &str) -> CollaboratorResult<Option<Business>> {
        self.call(methods::GET_BUSINESS, json!({ "id": id })).await
    }

    async fn create_business(&self, input: &NewBusiness) -> CollaboratorResult<Business> {
        self.call(methods::CREATE_BUSINESS, json!(input)).await
    }

    async fn find_by_creation_request(
        &self,
        request_id: &str,
    ) -> CollaboratorResult<Option<Business>> {
        self.call(
            methods::FIND_BY_CREATION_REQUEST,
            json!({ "requestId": request_id }),
        )
        .await
    }

    async fn update_business(&self, id: &str, update: &BusinessUpdate) -> CollaboratorResult<()> {
        self.call_unit(methods::UPDATE_BUSINESS, json!({ "id": id, "update": update }))
            .await
    }

    async fn get_active_businesses(&self) -> CollaboratorResult<Vec<Business>> {
        self.call(methods::ACTIVE_BUSINESSES, json!({})).await
    }

    async fn get_campaigns_by_business(
        &self,
        business_id: &str,
    ) -> CollaboratorResult<Vec<Campaign>> {
        self.call(
            methods::CAMPAIGNS_BY_BUSINESS,
            json!({ "businessId": business_id }),
        )
        .await
    }
}

#[async_trait]
impl ContentGenerator for GatewayClient {
    async fn research_market(&self, concept: &str) -> CollaboratorResult<Value> {
        self.call(methods::RESEARCH_MARKET, json!({ "concept": concept }))
            .await
    }

    async fn refine_concept(&self, concept: &str) -> CollaboratorResult<String> {
        self.call(methods::REFINE_CONCEPT, json!({ "concept": concept }))
            .await
    }

    async fn generate_plan(&self, input: &PlanInput) -> CollaboratorResult<BusinessPlan> {
        self.call(methods::GENERATE_PLAN, json!(input)).await
    }
}

#[async_trait]
impl ProjectScaffolder for GatewayClient {
    async fn create_project(
        &self,
        business_id: &str,
        spec: &ProjectSpec,
    ) -> CollaboratorResult<ProjectHandle> {
        self.call(
            methods::CREATE_PROJECT,
            json!({ "businessId": business_id, "spec": spec }),
        )
        .await
    }

    async fn deploy(&self, business_id: &str) -> CollaboratorResult<String> {
        self.call(methods::DEPLOY, json!({ "businessId": business_id }))
            .await
    }

    async fn get_progress(&self, business_id: &str) -> CollaboratorResult<DevelopmentProgress> {
        self.call(methods::PROGRESS, json!({ "businessId": business_id }))
            .await
    }

    async fn get_code_quality(&self, business_id: &str) -> CollaboratorResult<CodeQuality> {
        self.call(methods::CODE_QUALITY, json!({ "businessId": business_id }))
            .await
    }

    async fn run_tests(&self, business_id: &str) -> CollaboratorResult<TestReport> {
        self.call(methods::RUN_TESTS, json!({ "businessId": business_id }))
            .await
    }
}

#[async_trait]
impl CampaignAnalyzer for GatewayClient {
    async fn analyze(
        &self,
        campaign_id: &str,
        window_days: u32,
    ) -> CollaboratorResult<PerformanceSnapshot> {
        self.call(
            methods::ANALYZE_CAMPAIGN,
            json!({ "campaignId": campaign_id, "windowDays": window_days }),
        )
        .await
    }

    async fn scale(&self, campaign_id: &str, budget_multiplier: f64) -> CollaboratorResult<()> {
        self.call_unit(
            methods::SCALE_CAMPAIGN,
            json!({ "campaignId": campaign_id, "budgetMultiplier": budget_multiplier }),
        )
        .await
    }

    async fn pause(&self, campaign_id: &str) -> CollaboratorResult<()> {
        self.call_unit(methods::PAUSE_CAMPAIGN, json!({ "campaignId": campaign_id }))
            .await
    }

    async fn optimize(&self, campaign_id: &str) -> CollaboratorResult<()> {
        self.call_unit(
            methods::OPTIMIZE_CAMPAIGN,
            json!({ "campaignId": campaign_id }),
        )
        .await
    }
}

#[async_trait]
impl PaymentGateway for GatewayClient {
    async fn list_failed_payments(&self) -> CollaboratorResult<Vec<FailedPayment>> {
        self.call(methods::FAILED_PAYMENTS, json!({})).await
    }

    async fn retry_payment(&self, payment_id: &str) -> CollaboratorResult<bool> {
        self.call(methods::RETRY_PAYMENT, json!({ "paymentId": payment_id }))
            .await
    }
}

impl NotificationSink for GatewayClient {
    fn emit_progress(&self, record: &ProgressRecord) {
        self.notify(methods::NOTIFY_PROGRESS, json!(record));
    }

    fn emit_notification(&self, user_id: &str, notification: &Notification) {
        self.notify(
            methods::NOTIFY_USER,
            json!({ "userId": user_id, "notification": notification }),
        );
    }

    fn emit_development_update(&self, business_id: &str, payload: &Value) {
        self.notify(
            methods::NOTIFY_DEVELOPMENT,
            json!({ "businessId": business_id, "update": payload }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonrpsee::server::{Server, ServerHandle};
    use jsonrpsee::types::{ErrorObject, ErrorObjectOwned};
    use jsonrpsee::RpcModule;
    use launchpad_core::domain::BusinessStatus;
    use launchpad_core::port::CollaboratorError;
    use std::net::SocketAddr;

    /// Fake collaborator service answering a handful of methods
    async fn start_fake() -> (SocketAddr, ServerHandle) {
        let server = Server::builder().build("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap();
        let mut module = RpcModule::new(());

        module
            .register_method(methods::GET_BUSINESS, |params, _, _| {
                let (req,): (Value,) = params.parse()?;
                if req["id"] == "missing" {
                    return Ok::<_, ErrorObjectOwned>(Value::Null);
                }
                Ok(json!({
                    "id": req["id"],
                    "user_id": "u1",
                    "name": "Acme",
                    "concept": "widgets",
                    "status": BusinessStatus::Active,
                    "created_at": "2026-01-01T00:00:00Z",
                }))
            })
            .unwrap();
        module
            .register_method(methods::RETRY_PAYMENT, |params, _, _| {
                let (req,): (Value,) = params.parse()?;
                Ok::<_, ErrorObjectOwned>(req["paymentId"] == "p-ok")
            })
            .unwrap();
        module
            .register_method(methods::PAUSE_CAMPAIGN, |_, _, _| {
                Err::<Value, _>(ErrorObject::owned(4000, "campaign archived", None::<()>))
            })
            .unwrap();
        module
            .register_method(methods::DEPLOY, |_, _, _| {
                Err::<Value, _>(ErrorObject::owned(5000, "builder down", None::<()>))
            })
            .unwrap();

        (addr, server.start(module))
    }

    fn client(addr: SocketAddr) -> GatewayClient {
        GatewayClient::connect(&GatewayConfig::new(
            format!("http://{}", addr),
            Duration::from_secs(5),
        ))
        .unwrap()
    }

    #[tokio::test]
    async fn test_get_business_decodes_record_and_null() {
        let (addr, _handle) = start_fake().await;
        let gateway = client(addr);

        let business = gateway.get_business("b1").await.unwrap().unwrap();
        assert_eq!(business.id, "b1");
        assert_eq!(business.status, BusinessStatus::Active);
        assert!(gateway.get_business("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_retry_payment_result() {
        let (addr, _handle) = start_fake().await;
        let gateway = client(addr);
        assert!(gateway.retry_payment("p-ok").await.unwrap());
        assert!(!gateway.retry_payment("p-declined").await.unwrap());
    }

    #[tokio::test]
    async fn test_remote_errors_are_classified() {
        let (addr, _handle) = start_fake().await;
        let gateway = client(addr);

        let rejected = gateway.pause("c1").await.unwrap_err();
        assert!(matches!(rejected, CollaboratorError::Rejected(_)));
        assert!(!rejected.is_retryable());

        let unavailable = gateway.deploy("b1").await.unwrap_err();
        assert!(matches!(unavailable, CollaboratorError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_unknown_method_is_rejected() {
        let (addr, _handle) = start_fake().await;
        let err = client(addr).list_failed_payments().await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_retryable() {
        let (addr, handle) = start_fake().await;
        handle.stop().unwrap();
        handle.stopped().await;

        let err = client(addr).get_active_businesses().await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_invalid_url_is_reported() {
        let result =
            GatewayClient::connect(&GatewayConfig::new("not a url", Duration::from_secs(1)));
        assert!(matches!(result, Err(GatewayError::InvalidUrl { .. })));
    }

    #[tokio::test]
    async fn test_undeliverable_notification_is_not_surfaced() {
        let gateway = GatewayClient::connect(&GatewayConfig::new(
            "http://127.0.0.1:9",
            Duration::from_secs(1),
        ))
        .unwrap();
        gateway.emit_notification(
            "u1",
            &Notification::new(launchpad_core::domain::NotificationKind::Info, "t", "m"),
        );
    }
}
