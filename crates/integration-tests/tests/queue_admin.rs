//! Queue administration against a real SQLite store

mod common;

use common::{
    assert_state, remove_db, start, start_in_memory, temp_db, test_config, wait_terminal,
};
use launchpad_core::application::{EnqueueOptions, HealthStatus};
use launchpad_core::domain::catalog::{kinds, queues};
use launchpad_core::domain::JobState;
use launchpad_core::AppError;
use std::time::Duration;

#[tokio::test]
async fn test_paused_queue_holds_jobs_until_resumed() {
    let sys = start_in_memory().await;
    sys.orchestrator.pause_queue(queues::ANALYTICS).await.unwrap();

    let handle = sys
        .orchestrator
        .collect_analytics(Some("b1"))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    let stats = sys
        .orchestrator
        .get_queue_stats(queues::ANALYTICS)
        .await
        .unwrap();
    assert!(stats.paused);
    assert_eq!(stats.waiting, 1);
    assert_eq!(stats.active, 0);

    sys.orchestrator.resume_queue(queues::ANALYTICS).await.unwrap();
    let job = wait_terminal(&sys.orchestrator, &handle.id).await;
    assert!(job.state.is_terminal());

    let stats = sys
        .orchestrator
        .get_queue_stats(queues::ANALYTICS)
        .await
        .unwrap();
    assert!(!stats.paused);
    assert_eq!(stats.waiting, 0);

    sys.orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_remove_waiting_job() {
    let sys = start_in_memory().await;
    sys.orchestrator.pause_queue(queues::MARKETING).await.unwrap();

    let handle = sys
        .orchestrator
        .evaluate_business("b1", EnqueueOptions::default())
        .await
        .unwrap();
    sys.orchestrator.remove_job(&handle.id).await.unwrap();

    assert!(matches!(
        sys.orchestrator.get_job(&handle.id).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        sys.orchestrator.remove_job(&handle.id).await,
        Err(AppError::NotFound(_))
    ));

    sys.orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_delayed_job_waits_for_run_at() {
    let sys = start_in_memory().await;

    let handle = sys
        .orchestrator
        .enqueue(
            kinds::HEALTH_CHECK,
            serde_json::json!({}),
            EnqueueOptions::default().delay_ms(300),
        )
        .await
        .unwrap();
    assert_eq!(handle.state, JobState::Delayed);
    assert!(handle.run_at.is_some());

    tokio::time::sleep(Duration::from_millis(50)).await;
    let job = sys.orchestrator.get_job(&handle.id).await.unwrap();
    assert_eq!(job.state, JobState::Delayed);

    let job = wait_terminal(&sys.orchestrator, &handle.id).await;
    assert_state(&job, JobState::Completed);
    assert!(job.started_at.unwrap() >= handle.run_at.unwrap());

    sys.orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_clean_removes_finished_jobs_of_one_kind() {
    let sys = start_in_memory().await;

    let mut ids = Vec::new();
    for kind in [kinds::HEALTH_CHECK, kinds::HEALTH_CHECK, kinds::CLEANUP] {
        let handle = sys
            .orchestrator
            .enqueue(kind, serde_json::json!({}), EnqueueOptions::default())
            .await
            .unwrap();
        ids.push(handle.id);
    }
    for id in &ids {
        let job = wait_terminal(&sys.orchestrator, id).await;
        assert_state(&job, JobState::Completed);
    }
    // Cutoff is exclusive
    tokio::time::sleep(Duration::from_millis(20)).await;

    let removed = sys
        .orchestrator
        .clean_queue(
            queues::MAINTENANCE,
            Some(kinds::HEALTH_CHECK),
            0,
            JobState::Completed,
        )
        .await
        .unwrap();
    assert_eq!(removed, 2);

    let stats = sys
        .orchestrator
        .get_queue_stats(queues::MAINTENANCE)
        .await
        .unwrap();
    assert_eq!(stats.completed, 1);

    sys.orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_unknown_kind_rejected() {
    let sys = start_in_memory().await;

    let err = sys
        .orchestrator
        .enqueue("mine-bitcoin", serde_json::json!({}), EnqueueOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidKind(_)));

    let report = sys.orchestrator.health_check().await;
    assert_eq!(report.status, HealthStatus::Healthy);
    assert_eq!(report.queues.len(), 6);

    sys.orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_jobs_and_pause_survive_restart() {
    let (url, path) = temp_db("restart");

    let job_id = {
        let sys = start(&url, test_config()).await;
        sys.orchestrator.pause_queue(queues::MARKETING).await.unwrap();
        let handle = sys
            .orchestrator
            .evaluate_business("b1", EnqueueOptions::default())
            .await
            .unwrap();
        sys.orchestrator.shutdown().await;
        handle.id
    };

    let sys = start(&url, test_config()).await;
    let job = sys.orchestrator.get_job(&job_id).await.unwrap();
    assert_eq!(job.state, JobState::Waiting);
    assert_eq!(job.payload.as_value()["businessId"], serde_json::json!("b1"));

    let stats = sys
        .orchestrator
        .get_queue_stats(queues::MARKETING)
        .await
        .unwrap();
    assert!(stats.paused);
    assert_eq!(stats.waiting, 1);

    sys.orchestrator.shutdown().await;
    remove_db(&path);
}
