// Workflow processors - one handler per workflow domain
//
// Every processor is re-entrant: overlapping scheduler fires and retried
// envelopes check persisted state before acting.

pub mod analytics;
pub mod business_creation;
pub mod development;
pub mod maintenance;
pub mod marketing;
pub mod payments;

pub use analytics::AnalyticsProcessor;
pub use business_creation::{BusinessCreationProcessor, CreateBusinessRequest, CreationOutcome};
pub use development::{DevelopmentMonitor, MonitorDevelopmentRequest, MonitorOutcome};
pub use maintenance::MaintenanceProcessor;
pub use marketing::{EvaluateBusinessRequest, MarketingProcessor};
pub use payments::{PaymentRetrySummary, PaymentsProcessor};

use crate::port::{
    BusinessRepository, CampaignAnalyzer, ContentGenerator, NotificationSink, PaymentGateway,
    ProjectScaffolder,
};
use std::sync::Arc;

/// External systems the processors call out to
#[derive(Clone)]
pub struct Collaborators {
    pub businesses: Arc<dyn BusinessRepository>,
    pub content: Arc<dyn ContentGenerator>,
    pub scaffolder: Arc<dyn ProjectScaffolder>,
    pub campaigns: Arc<dyn CampaignAnalyzer>,
    pub payments: Arc<dyn PaymentGateway>,
    pub notifications: Arc<dyn NotificationSink>,
}

/// Advisory lock key shared by everything that mutates one business
pub(crate) fn business_lock(business_id: &str) -> String {
    format!("business:{}", business_id)
}

/// Result stored when another run already holds the subject
pub(crate) fn skipped(reason: &str) -> serde_json::Value {
    serde_json::json!({ "skipped": true, "reason": reason })
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::application::locks::SubjectLocks;
    use crate::application::queue_store::{EnqueueOptions, QueueStore};
    use crate::application::worker::JobContext;
    use crate::domain::catalog::default_queues;
    use crate::port::business_repository::mocks::MockBusinessRepository;
    use crate::port::campaign_analyzer::mocks::MockCampaignAnalyzer;
    use crate::port::content_generator::mocks::MockContentGenerator;
    use crate::port::id_provider::mocks::SequentialIdProvider;
    use crate::port::job_repository::mocks::InMemoryJobRepository;
    use crate::port::notification_sink::mocks::RecordingNotificationSink;
    use crate::port::payment_gateway::mocks::MockPaymentGateway;
    use crate::port::project_scaffolder::mocks::MockProjectScaffolder;
    use crate::port::{SystemTimeProvider, TimeProvider};

    /// Mocks wired the way the orchestrator wires the real collaborators
    pub struct Fixture {
        pub businesses: Arc<MockBusinessRepository>,
        pub content: Arc<MockContentGenerator>,
        pub scaffolder: Arc<MockProjectScaffolder>,
        pub campaigns: Arc<MockCampaignAnalyzer>,
        pub payments: Arc<MockPaymentGateway>,
        pub sink: Arc<RecordingNotificationSink>,
        pub repo: Arc<InMemoryJobRepository>,
        pub store: Arc<QueueStore>,
        pub time: Arc<dyn TimeProvider>,
        pub locks: SubjectLocks,
    }

    impl Fixture {
        pub fn new() -> Self {
            let repo = Arc::new(InMemoryJobRepository::new());
            let time: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
            let store = Arc::new(
                QueueStore::new(
                    repo.clone(),
                    Arc::clone(&time),
                    Arc::new(SequentialIdProvider::new("job")),
                    default_queues(),
                    16,
                )
                .unwrap(),
            );
            Self {
                businesses: Arc::new(MockBusinessRepository::new()),
                content: Arc::new(MockContentGenerator::new()),
                scaffolder: Arc::new(MockProjectScaffolder::new()),
                campaigns: Arc::new(MockCampaignAnalyzer::new()),
                payments: Arc::new(MockPaymentGateway::new()),
                sink: Arc::new(RecordingNotificationSink::new()),
                repo,
                store,
                time,
                locks: SubjectLocks::new(),
            }
        }

        pub fn collaborators(&self) -> Collaborators {
            Collaborators {
                businesses: self.businesses.clone(),
                content: self.content.clone(),
                scaffolder: self.scaffolder.clone(),
                campaigns: self.campaigns.clone(),
                payments: self.payments.clone(),
                notifications: self.sink.clone(),
            }
        }

        /// Enqueue an envelope and hand back the context a worker would build
        pub async fn context(&self, kind: &str, payload: serde_json::Value) -> JobContext {
            let handle = self
                .store
                .enqueue(kind, payload, EnqueueOptions::default())
                .await
                .unwrap();
            let job = self.store.get_job(&handle.id).await.unwrap();
            JobContext::new(job, self.repo.clone(), Arc::clone(&self.time))
        }

        /// Same, as the final attempt
        pub async fn last_attempt_context(
            &self,
            kind: &str,
            payload: serde_json::Value,
        ) -> JobContext {
            let handle = self
                .store
                .enqueue(kind, payload, EnqueueOptions::default().max_attempts(1))
                .await
                .unwrap();
            let job = self.store.get_job(&handle.id).await.unwrap();
            JobContext::new(job, self.repo.clone(), Arc::clone(&self.time))
        }
    }
}
