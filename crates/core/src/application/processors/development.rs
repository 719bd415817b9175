//! Development monitoring: a polling state machine.
//!
//! Each invocation looks at the persisted business first, so a duplicate or
//! late envelope for an already deployed business is a no-op. While the
//! build is not deployable the processor re-enqueues itself with a delay.

use super::{business_lock, skipped, Collaborators};
use crate::application::locks::SubjectLocks;
use crate::application::queue_store::{EnqueueOptions, QueueStore};
use crate::application::worker::{HandlerError, HandlerResult, JobContext, JobHandler};
use crate::domain::catalog::kinds;
use crate::domain::{Business, BusinessStatus, BusinessUpdate, Notification, NotificationKind};
use crate::error::AppError;
use crate::port::{CodeQuality, DevelopmentProgress, TestReport};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Deploy only at or below these
pub const MAX_LINT_ERRORS: u32 = 10;
pub const MAX_TYPE_ERRORS: u32 = 0;

/// Above these the owner gets a quality warning
pub const WARN_LINT_ERRORS: u32 = 50;
pub const WARN_TYPE_ERRORS: u32 = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorDevelopmentRequest {
    pub business_id: String,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub requested_at: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MonitorOutcome {
    Deployed { deployment_url: String },
    AlreadyDeployed,
    /// Business left the development path (closed or failed)
    Stopped { status: BusinessStatus },
    Rescheduled {
        next_job_id: String,
        stage: String,
        percent: u8,
    },
}

/// Whether a build may go live
pub fn is_deployable(
    progress: &DevelopmentProgress,
    quality: &CodeQuality,
    tests: Option<&TestReport>,
) -> bool {
    progress.is_complete()
        && quality.lint_errors <= MAX_LINT_ERRORS
        && quality.type_errors <= MAX_TYPE_ERRORS
        && tests.map_or(true, |t| t.failed == 0)
}

fn needs_quality_warning(quality: &CodeQuality) -> bool {
    quality.lint_errors > WARN_LINT_ERRORS || quality.type_errors > WARN_TYPE_ERRORS
}

pub struct DevelopmentMonitor {
    collaborators: Collaborators,
    store: Arc<QueueStore>,
    locks: SubjectLocks,
    poll_delay_ms: i64,
}

impl DevelopmentMonitor {
    pub fn new(
        collaborators: Collaborators,
        store: Arc<QueueStore>,
        locks: SubjectLocks,
        poll_delay_ms: i64,
    ) -> Self {
        Self {
            collaborators,
            store,
            locks,
            poll_delay_ms,
        }
    }

    async fn check(&self, ctx: &JobContext, business: Business) -> Result<MonitorOutcome, HandlerError> {
        let id = business.id.as_str();
        let scaffolder = &self.collaborators.scaffolder;

        let progress = scaffolder.get_progress(id).await?;
        let quality = scaffolder.get_code_quality(id).await?;
        let tests = if progress.has_testable_components {
            Some(scaffolder.run_tests(id).await?)
        } else {
            None
        };

        self.collaborators.notifications.emit_development_update(
            id,
            &serde_json::json!({
                "stage": progress.stage,
                "percent": progress.percent,
                "quality": quality,
                "tests": tests,
            }),
        );
        self.collaborators
            .businesses
            .update_business(
                id,
                &BusinessUpdate {
                    development_stage: Some(progress.stage.clone()),
                    development_progress: Some(progress.percent),
                    ..Default::default()
                },
            )
            .await?;

        if is_deployable(&progress, &quality, tests.as_ref()) {
            let url = self.deploy(ctx, &business).await?;
            return Ok(MonitorOutcome::Deployed {
                deployment_url: url,
            });
        }

        if needs_quality_warning(&quality) {
            self.collaborators.notifications.emit_notification(
                &business.user_id,
                &Notification::new(
                    NotificationKind::Warning,
                    "Code quality needs attention",
                    format!(
                        "{} has {} lint errors and {} type errors",
                        business.name, quality.lint_errors, quality.type_errors
                    ),
                )
                .for_business(id),
            );
        }

        let next = self
            .store
            .enqueue(
                kinds::MONITOR_DEVELOPMENT,
                serde_json::json!({ "businessId": id }),
                EnqueueOptions::default().delay_ms(self.poll_delay_ms),
            )
            .await?;
        debug!(
            business_id = %id,
            stage = %progress.stage,
            percent = progress.percent,
            next_job_id = %next.id,
            "Development not ready, polling again"
        );
        Ok(MonitorOutcome::Rescheduled {
            next_job_id: next.id,
            stage: progress.stage,
            percent: progress.percent,
        })
    }

    async fn deploy(&self, ctx: &JobContext, business: &Business) -> Result<String, HandlerError> {
        let id = business.id.as_str();
        let businesses = &self.collaborators.businesses;

        let deploying = business
            .status
            .transition_to(BusinessStatus::Deploying)
            .map_err(AppError::from)?;
        businesses
            .update_business(id, &BusinessUpdate::status(deploying))
            .await?;

        let url = self.collaborators.scaffolder.deploy(id).await?;
        let active = deploying
            .transition_to(BusinessStatus::Active)
            .map_err(AppError::from)?;
        businesses
            .update_business(
                id,
                &BusinessUpdate {
                    status: Some(active),
                    deployment_url: Some(url.clone()),
                    deployed_at: Some(ctx.time_provider().now()),
                    development_stage: Some("deployed".to_string()),
                    development_progress: Some(100),
                    ..Default::default()
                },
            )
            .await?;

        self.collaborators.notifications.emit_notification(
            &business.user_id,
            &Notification::new(
                NotificationKind::Success,
                "Business is live",
                format!("{} is deployed at {}", business.name, url),
            )
            .for_business(id),
        );
        info!(business_id = %id, deployment_url = %url, "Business deployed");
        Ok(url)
    }
}

#[async_trait]
impl JobHandler for DevelopmentMonitor {
    async fn handle(&self, ctx: JobContext) -> HandlerResult {
        let request: MonitorDevelopmentRequest = ctx.payload()?;
        let Some(_guard) = self.locks.try_acquire(&business_lock(&request.business_id)) else {
            debug!(business_id = %request.business_id, "Business busy, skipping poll");
            return Ok(skipped("business is being processed"));
        };

        let business = self
            .collaborators
            .businesses
            .get_business(&request.business_id)
            .await?
            .ok_or_else(|| {
                HandlerError::fatal(format!("business {} not found", request.business_id))
            })?;

        let outcome = if business.is_deployed() {
            MonitorOutcome::AlreadyDeployed
        } else if matches!(
            business.status,
            BusinessStatus::Closed | BusinessStatus::Failed
        ) {
            warn!(business_id = %business.id, status = %business.status, "Monitoring stopped");
            MonitorOutcome::Stopped {
                status: business.status,
            }
        } else {
            self.check(&ctx, business).await?
        };

        serde_json::to_value(outcome).map_err(|e| HandlerError::fatal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::Fixture;
    use super::*;
    use crate::port::project_scaffolder::STAGE_COMPLETE;
    use serde_json::json;

    fn monitor(fx: &Fixture) -> DevelopmentMonitor {
        DevelopmentMonitor::new(fx.collaborators(), fx.store.clone(), fx.locks.clone(), 300_000)
    }

    async fn poll(fx: &Fixture, business_id: &str) -> MonitorOutcome {
        let ctx = fx
            .context(kinds::MONITOR_DEVELOPMENT, json!({ "businessId": business_id }))
            .await;
        serde_json::from_value(monitor(fx).handle(ctx).await.unwrap()).unwrap()
    }

    #[test]
    fn test_deployable_boundaries() {
        let complete = DevelopmentProgress {
            stage: STAGE_COMPLETE.to_string(),
            percent: 100,
            has_testable_components: true,
        };
        let clean = CodeQuality::default();
        let at_ceiling = CodeQuality {
            lint_errors: 10,
            ..Default::default()
        };
        let over = CodeQuality {
            lint_errors: 11,
            ..Default::default()
        };
        let type_error = CodeQuality {
            type_errors: 1,
            ..Default::default()
        };

        assert!(is_deployable(&complete, &clean, None));
        assert!(is_deployable(&complete, &at_ceiling, None));
        assert!(!is_deployable(&complete, &over, None));
        assert!(!is_deployable(&complete, &type_error, None));
        assert!(!is_deployable(
            &complete,
            &clean,
            Some(&TestReport { passed: 9, failed: 1 })
        ));
    }

    #[tokio::test]
    async fn test_incomplete_build_reschedules() {
        let fx = Fixture::new();
        fx.businesses.add_business("b1", BusinessStatus::Developing, 1);

        let (next_job_id, percent) = match poll(&fx, "b1").await {
            MonitorOutcome::Rescheduled {
                next_job_id,
                percent,
                ..
            } => (next_job_id, percent),
            other => panic!("expected reschedule, got {:?}", other),
        };
        assert_eq!(percent, 40);
        let next = fx.store.get_job(&next_job_id).await.unwrap();
        assert!(next.run_at.is_some());

        let business = fx.businesses.business("b1").unwrap();
        assert_eq!(business.development_progress, 40);
        assert_eq!(fx.sink.development_updates().len(), 1);
        assert_eq!(fx.scaffolder.deploy_calls(), 0);
    }

    #[tokio::test]
    async fn test_complete_clean_build_deploys() {
        let fx = Fixture::new();
        fx.businesses.add_business("b1", BusinessStatus::Developing, 1);
        fx.scaffolder.set_progress(STAGE_COMPLETE, 100, true);
        fx.scaffolder.set_tests(12, 0);

        let outcome = poll(&fx, "b1").await;
        assert!(matches!(outcome, MonitorOutcome::Deployed { .. }));

        let business = fx.businesses.business("b1").unwrap();
        assert_eq!(business.status, BusinessStatus::Active);
        assert!(business.deployment_url.is_some());
        assert!(business.deployed_at.is_some());
        assert_eq!(fx.scaffolder.test_runs(), 1);
        assert_eq!(fx.sink.notifications_of(NotificationKind::Success).len(), 1);
    }

    #[tokio::test]
    async fn test_failing_tests_block_deploy() {
        let fx = Fixture::new();
        fx.businesses.add_business("b1", BusinessStatus::Developing, 1);
        fx.scaffolder.set_progress(STAGE_COMPLETE, 100, true);
        fx.scaffolder.set_tests(10, 2);

        let outcome = poll(&fx, "b1").await;
        assert!(matches!(outcome, MonitorOutcome::Rescheduled { .. }));
        assert_eq!(fx.scaffolder.deploy_calls(), 0);
    }

    #[tokio::test]
    async fn test_repeated_polls_deploy_at_most_once() {
        let fx = Fixture::new();
        fx.businesses.add_business("b1", BusinessStatus::Developing, 1);
        fx.scaffolder.set_progress(STAGE_COMPLETE, 100, false);

        let first = poll(&fx, "b1").await;
        let second = poll(&fx, "b1").await;

        assert!(matches!(first, MonitorOutcome::Deployed { .. }));
        assert_eq!(second, MonitorOutcome::AlreadyDeployed);
        assert_eq!(fx.scaffolder.deploy_calls(), 1);
    }

    #[tokio::test]
    async fn test_poor_quality_warns_owner() {
        let fx = Fixture::new();
        fx.businesses.add_business("b1", BusinessStatus::Developing, 1);
        fx.scaffolder.set_quality(75, 3);

        poll(&fx, "b1").await;
        let warnings = fx.sink.notifications_of(NotificationKind::Warning);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("75 lint errors"));
    }

    #[tokio::test]
    async fn test_closed_business_stops_polling() {
        let fx = Fixture::new();
        fx.businesses.add_business("b1", BusinessStatus::Closed, 30);

        let outcome = poll(&fx, "b1").await;
        assert_eq!(
            outcome,
            MonitorOutcome::Stopped {
                status: BusinessStatus::Closed
            }
        );
        assert!(fx.sink.development_updates().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_business_is_fatal() {
        let fx = Fixture::new();
        let ctx = fx
            .context(kinds::MONITOR_DEVELOPMENT, json!({ "businessId": "ghost" }))
            .await;
        let err = monitor(&fx).handle(ctx).await.unwrap_err();
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_locked_business_is_skipped() {
        let fx = Fixture::new();
        fx.businesses.add_business("b1", BusinessStatus::Developing, 1);
        let _held = fx.locks.try_acquire(&business_lock("b1")).unwrap();

        let ctx = fx
            .context(kinds::MONITOR_DEVELOPMENT, json!({ "businessId": "b1" }))
            .await;
        let result = monitor(&fx).handle(ctx).await.unwrap();
        assert_eq!(result["skipped"], json!(true));
    }
}
