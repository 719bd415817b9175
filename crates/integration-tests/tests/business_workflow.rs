//! End-to-end business workflows over a real SQLite store

mod common;

use common::{assert_state, start_in_memory, wait_terminal};
use launchpad_core::application::processors::CreateBusinessRequest;
use launchpad_core::application::EnqueueOptions;
use launchpad_core::domain::catalog::{kinds, queues};
use launchpad_core::domain::{BusinessStatus, JobState, NotificationKind};

fn request(name: &str) -> CreateBusinessRequest {
    CreateBusinessRequest {
        request_id: String::new(),
        requested_at: 0,
        user_id: "user-1".to_string(),
        name: name.to_string(),
        concept: "subscription box for houseplants".to_string(),
        target_market: Some("urban renters".to_string()),
        skip_research: true,
    }
}

#[tokio::test]
async fn test_create_business_end_to_end() {
    let sys = start_in_memory().await;

    let handle = sys
        .orchestrator
        .create_business(request("Leafy"), EnqueueOptions::default())
        .await
        .unwrap();
    assert_eq!(handle.queue, queues::BUSINESS_CREATION);
    assert_eq!(handle.state, JobState::Waiting);

    let job = wait_terminal(&sys.orchestrator, &handle.id).await;
    assert_state(&job, JobState::Completed);
    assert!(job.result.is_some());

    let business = sys.businesses.business("biz-1").unwrap();
    assert_eq!(business.status, BusinessStatus::Developing);

    // Progress is monotonic and ends at 100
    let progress = sys.notifications.progress();
    assert!(progress.windows(2).all(|w| w[0].percent <= w[1].percent));
    assert_eq!(progress.last().map(|p| p.percent), Some(100));
    assert_eq!(sys.notifications.notifications_of(NotificationKind::Success).len(), 1);

    // Handoff to development monitoring is persisted
    let stats = sys
        .orchestrator
        .get_queue_stats(queues::DEVELOPMENT)
        .await
        .unwrap();
    assert!(stats.total() >= 1, "expected a monitor job, got {:?}", stats);

    sys.orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_failed_creation_can_be_retried() {
    let sys = start_in_memory().await;
    sys.businesses.set_fail_create(true);

    let options = EnqueueOptions {
        max_attempts: Some(1),
        ..EnqueueOptions::default()
    };
    let handle = sys
        .orchestrator
        .create_business(request("Flaky"), options)
        .await
        .unwrap();

    let failed = wait_terminal(&sys.orchestrator, &handle.id).await;
    assert_state(&failed, JobState::Failed);
    assert!(failed.failed_reason.is_some());
    assert_eq!(sys.notifications.notifications_of(NotificationKind::Error).len(), 1);

    sys.businesses.set_fail_create(false);
    let retried = sys.orchestrator.retry_job(&handle.id).await.unwrap();
    assert_eq!(retried.state, JobState::Waiting);
    assert_eq!(retried.attempts, 0);

    let job = wait_terminal(&sys.orchestrator, &handle.id).await;
    assert_state(&job, JobState::Completed);
    assert_eq!(sys.businesses.created_count(), 1);

    sys.orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_evaluating_unknown_business_fails_without_retry() {
    let sys = start_in_memory().await;

    let handle = sys
        .orchestrator
        .evaluate_business("missing", EnqueueOptions::default())
        .await
        .unwrap();
    assert_eq!(handle.kind, kinds::EVALUATE_BUSINESS);

    let job = wait_terminal(&sys.orchestrator, &handle.id).await;
    assert_state(&job, JobState::Failed);
    assert_eq!(job.attempts, 1);
    assert!(job.failed_reason.unwrap().contains("not found"));
    assert!(sys.businesses.updates_for("missing").is_empty());

    sys.orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_live_business_evaluation_records_decision() {
    let sys = start_in_memory().await;
    sys.businesses.add_business("b-live", BusinessStatus::Active, 30);
    sys.businesses.add_campaign("b-live", "c-1");
    sys.campaigns.set_performance("c-1", 92.0, 4.5);

    let handle = sys
        .orchestrator
        .evaluate_business("b-live", EnqueueOptions::default())
        .await
        .unwrap();

    let job = wait_terminal(&sys.orchestrator, &handle.id).await;
    assert_state(&job, JobState::Completed);
    let result = job.result.unwrap();
    assert!(result.get("action").is_some(), "unexpected result {}", result);
    assert!(!sys.campaigns.calls().is_empty());

    sys.orchestrator.shutdown().await;
}
