//! Shared harness: a real SQLite store with in-process collaborators

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use launchpad_core::application::{Collaborators, Orchestrator, OrchestratorDeps};
use launchpad_core::domain::{Job, JobState};
use launchpad_core::port::business_repository::mocks::MockBusinessRepository;
use launchpad_core::port::campaign_analyzer::mocks::MockCampaignAnalyzer;
use launchpad_core::port::content_generator::mocks::MockContentGenerator;
use launchpad_core::port::notification_sink::mocks::RecordingNotificationSink;
use launchpad_core::port::payment_gateway::mocks::MockPaymentGateway;
use launchpad_core::port::project_scaffolder::mocks::MockProjectScaffolder;
use launchpad_core::port::{SystemTimeProvider, UuidProvider};
use launchpad_core::OrchestratorConfig;
use launchpad_infra_sqlite::{SqliteJobRepository, SqliteMaintenance};
use launchpad_infra_system::SystemProbeImpl;

pub struct TestSystem {
    pub orchestrator: Orchestrator,
    pub businesses: Arc<MockBusinessRepository>,
    pub campaigns: Arc<MockCampaignAnalyzer>,
    pub notifications: Arc<RecordingNotificationSink>,
}

pub fn test_config() -> OrchestratorConfig {
    OrchestratorConfig {
        poll_interval_ms: 10,
        shutdown_drain_timeout_secs: 2,
        scheduler_enabled: false,
        ..OrchestratorConfig::default()
    }
}

pub async fn start(database_url: &str, config: OrchestratorConfig) -> TestSystem {
    let pool = launchpad_infra_sqlite::open(database_url).await.unwrap();
    let time_provider = Arc::new(SystemTimeProvider);
    let businesses = Arc::new(MockBusinessRepository::new());
    let campaigns = Arc::new(MockCampaignAnalyzer::new());
    let notifications = Arc::new(RecordingNotificationSink::new());

    let deps = OrchestratorDeps {
        job_repo: Arc::new(SqliteJobRepository::new(pool.clone(), time_provider.clone())),
        maintenance: Arc::new(SqliteMaintenance::new(pool)),
        system_probe: Arc::new(SystemProbeImpl::new()),
        collaborators: Collaborators {
            businesses: businesses.clone(),
            content: Arc::new(MockContentGenerator::new()),
            scaffolder: Arc::new(MockProjectScaffolder::new()),
            campaigns: campaigns.clone(),
            payments: Arc::new(MockPaymentGateway::new()),
            notifications: notifications.clone(),
        },
        time_provider,
        id_provider: Arc::new(UuidProvider),
    };

    let orchestrator = Orchestrator::new(config, deps).unwrap();
    orchestrator.initialize().await.unwrap();
    TestSystem {
        orchestrator,
        businesses,
        campaigns,
        notifications,
    }
}

pub async fn start_in_memory() -> TestSystem {
    start("sqlite::memory:", test_config()).await
}

/// Poll until the job reaches a terminal state
pub async fn wait_terminal(orchestrator: &Orchestrator, job_id: &str) -> Job {
    wait_for(orchestrator, job_id, |job| job.state.is_terminal()).await
}

pub async fn wait_for(
    orchestrator: &Orchestrator,
    job_id: &str,
    done: impl Fn(&Job) -> bool,
) -> Job {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let job = orchestrator.get_job(job_id).await.unwrap();
            if done(&job) {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("job {} did not settle in time", job_id))
}

pub fn assert_state(job: &Job, state: JobState) {
    assert_eq!(
        job.state, state,
        "job {} ({}) failed_reason={:?}",
        job.id, job.kind, job.failed_reason
    );
}

pub fn temp_db(name: &str) -> (String, std::path::PathBuf) {
    let path = std::env::temp_dir().join(format!("launchpad-it-{}-{}.db", name, std::process::id()));
    remove_db(&path);
    (format!("sqlite://{}", path.display()), path)
}

pub fn remove_db(path: &std::path::Path) {
    let _ = std::fs::remove_file(path);
    for suffix in ["-wal", "-shm"] {
        let mut sidecar = path.as_os_str().to_owned();
        sidecar.push(suffix);
        let _ = std::fs::remove_file(sidecar);
    }
}
