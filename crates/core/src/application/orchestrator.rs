//! Orchestrator - owns the queue store, worker pool and scheduler.
//!
//! Lifecycle: UNINITIALIZED -> INITIALIZING -> RUNNING -> SHUTTING_DOWN ->
//! UNINITIALIZED. Lifecycle transitions are serialized; everything else
//! requires RUNNING and fails fast otherwise.

use crate::application::health::{self, HealthReport};
use crate::application::locks::SubjectLocks;
use crate::application::processors::{
    AnalyticsProcessor, BusinessCreationProcessor, Collaborators, CreateBusinessRequest,
    DevelopmentMonitor, MaintenanceProcessor, MarketingProcessor, PaymentsProcessor,
};
use crate::application::queue_store::{EnqueueOptions, JobHandle, QueueStore};
use crate::application::scheduler::{ScheduledJobInfo, Scheduler};
use crate::application::worker::{JobHandler, WorkerPool, WorkerSettings};
use crate::config::OrchestratorConfig;
use crate::domain::catalog::kinds;
use crate::domain::{Job, JobState, QueueStats, Schedule};
use crate::error::{AppError, Result};
use crate::port::{IdProvider, JobRepository, Maintenance, SystemMetrics, SystemProbe, TimeProvider};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrchestratorState {
    Uninitialized,
    Initializing,
    Running,
    ShuttingDown,
}

impl OrchestratorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrchestratorState::Uninitialized => "UNINITIALIZED",
            OrchestratorState::Initializing => "INITIALIZING",
            OrchestratorState::Running => "RUNNING",
            OrchestratorState::ShuttingDown => "SHUTTING_DOWN",
        }
    }
}

impl std::fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Adapters the orchestrator is wired to
#[derive(Clone)]
pub struct OrchestratorDeps {
    pub job_repo: Arc<dyn JobRepository>,
    pub maintenance: Arc<dyn Maintenance>,
    pub system_probe: Arc<dyn SystemProbe>,
    pub collaborators: Collaborators,
    pub time_provider: Arc<dyn TimeProvider>,
    pub id_provider: Arc<dyn IdProvider>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemStats {
    pub state: OrchestratorState,
    pub uptime_secs: u64,
    pub queues: Vec<QueueStats>,
    pub scheduled: Vec<ScheduledJobInfo>,
    pub workers: Vec<String>,
    pub system: SystemMetrics,
}

struct Runtime {
    pool: WorkerPool,
    scheduler: Scheduler,
    started_at: i64,
}

pub struct Orchestrator {
    config: OrchestratorConfig,
    deps: OrchestratorDeps,
    store: Arc<QueueStore>,
    locks: SubjectLocks,
    state: RwLock<OrchestratorState>,
    lifecycle: Mutex<()>,
    runtime: tokio::sync::RwLock<Option<Runtime>>,
}

impl Orchestrator {
    pub fn new(config: OrchestratorConfig, deps: OrchestratorDeps) -> Result<Self> {
        config.validate()?;
        let store = Arc::new(QueueStore::new(
            Arc::clone(&deps.job_repo),
            Arc::clone(&deps.time_provider),
            Arc::clone(&deps.id_provider),
            config.queues(),
            config.max_payload_depth,
        )?);
        Ok(Self {
            config,
            deps,
            store,
            locks: SubjectLocks::new(),
            state: RwLock::new(OrchestratorState::Uninitialized),
            lifecycle: Mutex::new(()),
            runtime: tokio::sync::RwLock::new(None),
        })
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
            .read()
            .map(|s| *s)
            .unwrap_or(OrchestratorState::Uninitialized)
    }

    fn set_state(&self, next: OrchestratorState) {
        if let Ok(mut state) = self.state.write() {
            debug!(from = %*state, to = %next, "Orchestrator state change");
            *state = next;
        }
    }

    pub fn store(&self) -> &Arc<QueueStore> {
        &self.store
    }

    fn ensure_running(&self) -> Result<()> {
        match self.state() {
            OrchestratorState::Running => Ok(()),
            other => Err(AppError::InvalidState(format!(
                "orchestrator is {}, not RUNNING",
                other
            ))),
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Connect, register queues and handlers, start workers and triggers.
    /// No-op when already running.
    pub async fn initialize(&self) -> Result<()> {
        let _lifecycle = self.lifecycle.lock().await;
        self.start_locked().await
    }

    async fn start_locked(&self) -> Result<()> {
        match self.state() {
            OrchestratorState::Running => return Ok(()),
            OrchestratorState::Uninitialized => {}
            other => {
                return Err(AppError::InvalidState(format!(
                    "cannot initialize while {}",
                    other
                )))
            }
        }

        self.set_state(OrchestratorState::Initializing);
        match self.start_runtime().await {
            Ok(runtime) => {
                *self.runtime.write().await = Some(runtime);
                self.set_state(OrchestratorState::Running);
                info!(queues = self.store.queues().len(), "Orchestrator running");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Orchestrator initialization failed");
                self.set_state(OrchestratorState::Uninitialized);
                Err(e)
            }
        }
    }

    async fn start_runtime(&self) -> Result<Runtime> {
        self.deps
            .job_repo
            .ping()
            .await
            .map_err(|e| AppError::Store(format!("broker unavailable: {}", e)))?;
        self.store.register_all().await?;

        let settings = WorkerSettings {
            poll_interval: Duration::from_millis(self.config.poll_interval_ms),
            drain_timeout: Duration::from_secs(self.config.shutdown_drain_timeout_secs),
            ..WorkerSettings::default()
        };
        let pool = WorkerPool::new(
            Arc::clone(&self.store),
            Arc::clone(&self.deps.time_provider),
            settings,
            self.config.stalled_interval_ms,
            Duration::from_millis(self.config.watchdog_interval_ms),
        );
        self.register_handlers(&pool)?;
        pool.start()?;

        let scheduler = Scheduler::new(Arc::clone(&self.store), Arc::clone(&self.deps.time_provider));
        if self.config.scheduler_enabled {
            if let Err(e) = scheduler.initialize() {
                // Unwind what already started
                scheduler.shutdown().await;
                pool.close().await;
                return Err(e);
            }
        }

        Ok(Runtime {
            pool,
            scheduler,
            started_at: self.deps.time_provider.now_millis(),
        })
    }

    fn register_handlers(&self, pool: &WorkerPool) -> Result<()> {
        let collaborators = &self.deps.collaborators;
        let creation: Arc<dyn JobHandler> = Arc::new(BusinessCreationProcessor::new(
            collaborators.clone(),
            Arc::clone(&self.store),
            self.locks.clone(),
            self.config.monitor_poll_delay_ms,
        ));
        let development: Arc<dyn JobHandler> = Arc::new(DevelopmentMonitor::new(
            collaborators.clone(),
            Arc::clone(&self.store),
            self.locks.clone(),
            self.config.monitor_poll_delay_ms,
        ));
        let marketing: Arc<dyn JobHandler> = Arc::new(MarketingProcessor::new(
            collaborators.clone(),
            self.locks.clone(),
            self.config.thresholds.clone(),
            self.config.evaluation_window_days,
        ));
        let analytics: Arc<dyn JobHandler> = Arc::new(AnalyticsProcessor::new(
            collaborators.clone(),
            Arc::clone(&self.store),
        ));
        let payments: Arc<dyn JobHandler> = Arc::new(PaymentsProcessor::new(collaborators.clone()));
        let maintenance: Arc<dyn JobHandler> = Arc::new(MaintenanceProcessor::new(
            Arc::clone(&self.store),
            Arc::clone(&self.deps.maintenance),
            self.config.clean_completed_after_days,
            self.config.clean_failed_after_days,
            self.config.backup_dir.clone(),
        ));

        let bindings = [
            (kinds::CREATE_BUSINESS, &creation),
            (kinds::MONITOR_DEVELOPMENT, &development),
            (kinds::MONITOR_CAMPAIGNS, &marketing),
            (kinds::EVALUATE_BUSINESS, &marketing),
            (kinds::OPTIMIZE_CAMPAIGNS, &marketing),
            (kinds::COLLECT_ALL_ANALYTICS, &analytics),
            (kinds::COLLECT_ANALYTICS, &analytics),
            (kinds::WEEKLY_REPORT, &analytics),
            (kinds::RETRY_FAILED_PAYMENTS, &payments),
            (kinds::CLEANUP, &maintenance),
            (kinds::BACKUP, &maintenance),
            (kinds::HEALTH_CHECK, &maintenance),
        ];
        for (kind, handler) in bindings {
            let queue = self.store.queue_for_kind(kind)?;
            pool.register(kind, self.config.concurrency_for(queue, kind), Arc::clone(handler))?;
        }
        Ok(())
    }

    /// Stop triggers, drain workers and release the store. Step failures
    /// are logged; idempotent when not running.
    pub async fn shutdown(&self) {
        let _lifecycle = self.lifecycle.lock().await;
        self.stop_locked(true).await;
    }

    /// Stop and start again without releasing the store
    pub async fn restart(&self) -> Result<()> {
        let _lifecycle = self.lifecycle.lock().await;
        info!("Orchestrator restarting");
        self.stop_locked(false).await;
        self.start_locked().await
    }

    async fn stop_locked(&self, release_broker: bool) {
        if self.state() == OrchestratorState::Uninitialized {
            debug!("Shutdown requested while uninitialized");
            return;
        }
        self.set_state(OrchestratorState::ShuttingDown);
        info!("Orchestrator shutting down");

        let runtime = self.runtime.write().await.take();
        match runtime {
            Some(runtime) => {
                runtime.scheduler.shutdown().await;
                runtime.pool.close().await;
            }
            None => warn!("Shutdown found no running runtime"),
        }
        if release_broker {
            self.deps.job_repo.close().await;
        }

        self.set_state(OrchestratorState::Uninitialized);
        info!("Orchestrator stopped");
    }

    // ========================================================================
    // Typed enqueue
    // ========================================================================

    fn stamp(&self) -> (String, i64) {
        (
            self.deps.id_provider.generate_id(),
            self.deps.time_provider.now_millis(),
        )
    }

    pub async fn create_business(
        &self,
        mut request: CreateBusinessRequest,
        options: EnqueueOptions,
    ) -> Result<JobHandle> {
        self.ensure_running()?;
        request.validate()?;
        let (request_id, requested_at) = self.stamp();
        if request.request_id.is_empty() {
            request.request_id = request_id;
        }
        request.requested_at = requested_at;
        self.store
            .enqueue(kinds::CREATE_BUSINESS, serde_json::to_value(&request)?, options)
            .await
    }

    pub async fn monitor_development(
        &self,
        business_id: &str,
        options: EnqueueOptions,
    ) -> Result<JobHandle> {
        self.enqueue_for_business(kinds::MONITOR_DEVELOPMENT, business_id, options)
            .await
    }

    pub async fn evaluate_business(
        &self,
        business_id: &str,
        options: EnqueueOptions,
    ) -> Result<JobHandle> {
        self.enqueue_for_business(kinds::EVALUATE_BUSINESS, business_id, options)
            .await
    }

    /// Evaluate every live business now
    pub async fn run_marketing_cycle(&self, options: EnqueueOptions) -> Result<JobHandle> {
        self.ensure_running()?;
        let (request_id, requested_at) = self.stamp();
        self.store
            .enqueue(
                kinds::MONITOR_CAMPAIGNS,
                serde_json::json!({ "requestId": request_id, "requestedAt": requested_at }),
                options,
            )
            .await
    }

    /// One business, or every live business when `business_id` is None
    pub async fn collect_analytics(&self, business_id: Option<&str>) -> Result<JobHandle> {
        match business_id {
            Some(id) => {
                self.enqueue_for_business(kinds::COLLECT_ANALYTICS, id, EnqueueOptions::default())
                    .await
            }
            None => {
                self.enqueue(
                    kinds::COLLECT_ALL_ANALYTICS,
                    serde_json::json!({}),
                    EnqueueOptions::default(),
                )
                .await
            }
        }
    }

    /// Untyped enqueue for any catalogued kind
    pub async fn enqueue(
        &self,
        kind: &str,
        payload: serde_json::Value,
        options: EnqueueOptions,
    ) -> Result<JobHandle> {
        self.ensure_running()?;
        self.store.enqueue(kind, payload, options).await
    }

    async fn enqueue_for_business(
        &self,
        kind: &str,
        business_id: &str,
        options: EnqueueOptions,
    ) -> Result<JobHandle> {
        self.ensure_running()?;
        if business_id.trim().is_empty() {
            return Err(AppError::Validation("businessId must not be empty".to_string()));
        }
        let (request_id, requested_at) = self.stamp();
        self.store
            .enqueue(
                kind,
                serde_json::json!({
                    "businessId": business_id,
                    "requestId": request_id,
                    "requestedAt": requested_at,
                }),
                options,
            )
            .await
    }

    // ========================================================================
    // Observability
    // ========================================================================

    pub async fn get_system_stats(&self) -> Result<SystemStats> {
        self.ensure_running()?;
        let queues = self.store.get_all_stats().await?;
        let system = self.deps.system_probe.get_metrics().await;
        let now = self.deps.time_provider.now_millis();

        let runtime = self.runtime.read().await;
        let (uptime_secs, scheduled, workers) = match runtime.as_ref() {
            Some(rt) => (
                ((now - rt.started_at).max(0) / 1000) as u64,
                rt.scheduler.get_scheduled_jobs(),
                rt.pool.registered_kinds(),
            ),
            None => (0, Vec::new(), Vec::new()),
        };

        Ok(SystemStats {
            state: self.state(),
            uptime_secs,
            queues,
            scheduled,
            workers,
            system,
        })
    }

    /// Never errors; unhealthy when not running or the store is unreachable
    pub async fn health_check(&self) -> HealthReport {
        let now = self.deps.time_provider.now_millis();
        match self.state() {
            OrchestratorState::Running => health::evaluate(&self.store, now).await,
            other => HealthReport::unhealthy(format!("orchestrator is {}", other), now),
        }
    }

    // ========================================================================
    // Admin
    // ========================================================================

    pub async fn get_job(&self, id: &str) -> Result<Job> {
        self.ensure_running()?;
        self.store.get_job(id).await
    }

    pub async fn retry_job(&self, id: &str) -> Result<Job> {
        self.ensure_running()?;
        self.store.retry_job(id).await
    }

    pub async fn remove_job(&self, id: &str) -> Result<()> {
        self.ensure_running()?;
        self.store.remove_job(id).await
    }

    pub async fn pause_queue(&self, queue: &str) -> Result<()> {
        self.ensure_running()?;
        self.store.pause(queue).await
    }

    pub async fn resume_queue(&self, queue: &str) -> Result<()> {
        self.ensure_running()?;
        self.store.resume(queue).await
    }

    pub async fn clean_queue(
        &self,
        queue: &str,
        kind: Option<&str>,
        older_than_ms: i64,
        state: JobState,
    ) -> Result<u64> {
        self.ensure_running()?;
        self.store.clean(queue, kind, older_than_ms, state).await
    }

    pub async fn get_queue_stats(&self, queue: &str) -> Result<QueueStats> {
        self.ensure_running()?;
        self.store.get_stats(queue).await
    }

    pub async fn get_scheduled_jobs(&self) -> Result<Vec<ScheduledJobInfo>> {
        self.ensure_running()?;
        Ok(self
            .runtime
            .read()
            .await
            .as_ref()
            .map(|rt| rt.scheduler.get_scheduled_jobs())
            .unwrap_or_default())
    }

    pub async fn add_scheduled_job(
        &self,
        name: &str,
        schedule: Schedule,
        kind: &str,
        payload: serde_json::Value,
        options: EnqueueOptions,
    ) -> Result<()> {
        self.with_scheduler(|s| s.add_scheduled_job(name, schedule, kind, payload, options))
            .await
    }

    pub async fn remove_scheduled_job(&self, name: &str) -> Result<bool> {
        self.with_scheduler(|s| s.remove_scheduled_job(name)).await
    }

    pub async fn start_scheduled_job(&self, name: &str) -> Result<()> {
        self.with_scheduler(|s| s.start_job(name)).await
    }

    pub async fn stop_scheduled_job(&self, name: &str) -> Result<()> {
        self.with_scheduler(|s| s.stop_job(name)).await
    }

    async fn with_scheduler<T>(&self, f: impl FnOnce(&Scheduler) -> Result<T>) -> Result<T> {
        self.ensure_running()?;
        let runtime = self.runtime.read().await;
        let rt = runtime
            .as_ref()
            .ok_or_else(|| AppError::InvalidState("scheduler not started".to_string()))?;
        f(&rt.scheduler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::health::HealthStatus;
    use crate::domain::catalog::queues;
    use crate::domain::BusinessStatus;
    use crate::port::business_repository::mocks::MockBusinessRepository;
    use crate::port::campaign_analyzer::mocks::MockCampaignAnalyzer;
    use crate::port::content_generator::mocks::MockContentGenerator;
    use crate::port::id_provider::mocks::SequentialIdProvider;
    use crate::port::job_repository::mocks::InMemoryJobRepository;
    use crate::port::maintenance::mocks::MockMaintenance;
    use crate::port::notification_sink::mocks::RecordingNotificationSink;
    use crate::port::payment_gateway::mocks::MockPaymentGateway;
    use crate::port::project_scaffolder::mocks::MockProjectScaffolder;
    use crate::port::system_probe::mocks::MockSystemProbe;
    use crate::port::SystemTimeProvider;

    struct Harness {
        orchestrator: Orchestrator,
        repo: Arc<InMemoryJobRepository>,
        businesses: Arc<MockBusinessRepository>,
    }

    fn harness(scheduler_enabled: bool) -> Harness {
        let repo = Arc::new(InMemoryJobRepository::new());
        let businesses = Arc::new(MockBusinessRepository::new());
        let deps = OrchestratorDeps {
            job_repo: repo.clone(),
            maintenance: Arc::new(MockMaintenance::new()),
            system_probe: Arc::new(MockSystemProbe::new(12.5)),
            collaborators: Collaborators {
                businesses: businesses.clone(),
                content: Arc::new(MockContentGenerator::new()),
                scaffolder: Arc::new(MockProjectScaffolder::new()),
                campaigns: Arc::new(MockCampaignAnalyzer::new()),
                payments: Arc::new(MockPaymentGateway::new()),
                notifications: Arc::new(RecordingNotificationSink::new()),
            },
            time_provider: Arc::new(SystemTimeProvider),
            id_provider: Arc::new(SequentialIdProvider::new("id")),
        };
        let config = OrchestratorConfig {
            poll_interval_ms: 10,
            shutdown_drain_timeout_secs: 2,
            scheduler_enabled,
            ..OrchestratorConfig::default()
        };
        Harness {
            orchestrator: Orchestrator::new(config, deps).unwrap(),
            repo,
            businesses,
        }
    }

    fn request() -> CreateBusinessRequest {
        CreateBusinessRequest {
            request_id: String::new(),
            requested_at: 0,
            user_id: "user-1".to_string(),
            name: "Sock Club".to_string(),
            concept: "monthly socks".to_string(),
            target_market: None,
            skip_research: true,
        }
    }

    #[tokio::test]
    async fn test_lifecycle_round_trip() {
        let h = harness(true);
        assert_eq!(h.orchestrator.state(), OrchestratorState::Uninitialized);

        h.orchestrator.initialize().await.unwrap();
        assert_eq!(h.orchestrator.state(), OrchestratorState::Running);
        assert_eq!(h.repo.registered_queues().len(), 6);

        let stats = h.orchestrator.get_system_stats().await.unwrap();
        assert_eq!(stats.workers.len(), 12);
        assert_eq!(stats.scheduled.len(), 8);
        assert_eq!(stats.queues.len(), 6);

        h.orchestrator.shutdown().await;
        assert_eq!(h.orchestrator.state(), OrchestratorState::Uninitialized);
        assert!(h.repo.is_closed());

        // Second shutdown is a no-op
        h.orchestrator.shutdown().await;
        assert_eq!(h.orchestrator.state(), OrchestratorState::Uninitialized);
    }

    #[tokio::test]
    async fn test_broker_failure_aborts_initialize() {
        let h = harness(false);
        h.repo.set_unavailable(true);

        let err = h.orchestrator.initialize().await.unwrap_err();
        assert!(matches!(err, AppError::Store(_)));
        assert!(err.to_string().contains("broker unavailable"));
        assert_eq!(h.orchestrator.state(), OrchestratorState::Uninitialized);

        h.repo.set_unavailable(false);
        h.orchestrator.initialize().await.unwrap();
        h.orchestrator.shutdown().await;
    }

    #[tokio::test]
    async fn test_operations_require_running() {
        let h = harness(false);
        let err = h
            .orchestrator
            .create_business(request(), EnqueueOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
        assert!(h.orchestrator.get_system_stats().await.is_err());

        let report = h.orchestrator.health_check().await;
        assert_eq!(report.status, HealthStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_invalid_request_rejected_at_enqueue() {
        let h = harness(false);
        h.orchestrator.initialize().await.unwrap();

        let mut bad = request();
        bad.name = String::new();
        let err = h
            .orchestrator
            .create_business(bad, EnqueueOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = h
            .orchestrator
            .evaluate_business(" ", EnqueueOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        h.orchestrator.shutdown().await;
    }

    #[tokio::test]
    async fn test_create_business_runs_to_completion() {
        let h = harness(false);
        h.orchestrator.initialize().await.unwrap();

        let handle = h
            .orchestrator
            .create_business(request(), EnqueueOptions::default())
            .await
            .unwrap();
        assert_eq!(handle.queue, queues::BUSINESS_CREATION);

        let job = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let job = h.orchestrator.get_job(&handle.id).await.unwrap();
                if job.state.is_terminal() {
                    return job;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        assert_eq!(job.state, JobState::Completed);
        let payload: CreateBusinessRequest = job.payload.decode().unwrap();
        assert!(!payload.request_id.is_empty());
        assert!(payload.requested_at > 0);

        let business = h.businesses.business("biz-1").unwrap();
        assert_eq!(business.status, BusinessStatus::Developing);
        assert_eq!(h.repo.jobs_of_kind(kinds::MONITOR_DEVELOPMENT).len(), 1);

        let report = h.orchestrator.health_check().await;
        assert_eq!(report.status, HealthStatus::Healthy);
        h.orchestrator.shutdown().await;
    }

    #[tokio::test]
    async fn test_restart_keeps_store_open() {
        let h = harness(true);
        h.orchestrator.initialize().await.unwrap();
        h.orchestrator.restart().await.unwrap();

        assert_eq!(h.orchestrator.state(), OrchestratorState::Running);
        assert!(!h.repo.is_closed());
        assert_eq!(h.orchestrator.get_scheduled_jobs().await.unwrap().len(), 8);
        h.orchestrator.shutdown().await;
    }

    #[tokio::test]
    async fn test_schedule_admin_pass_through() {
        let h = harness(false);
        h.orchestrator.initialize().await.unwrap();

        h.orchestrator
            .add_scheduled_job(
                "hourly-cleanup",
                Schedule::cron("0 0 * * * *").unwrap(),
                kinds::CLEANUP,
                serde_json::json!({}),
                EnqueueOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(h.orchestrator.get_scheduled_jobs().await.unwrap().len(), 1);

        h.orchestrator.stop_scheduled_job("hourly-cleanup").await.unwrap();
        assert!(h.orchestrator.remove_scheduled_job("hourly-cleanup").await.unwrap());
        assert!(!h.orchestrator.remove_scheduled_job("hourly-cleanup").await.unwrap());
        h.orchestrator.shutdown().await;
    }
}
