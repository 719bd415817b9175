//! Business-creation workflow.
//!
//! Stages run in a fixed order, each announcing itself with a progress
//! record: setup, research (optional), record, plan, scaffold, handoff.
//!
//! Nothing is rolled back on failure. A business record created by a failed
//! attempt is marked FAILED and picked up again by the next attempt of the
//! same request, so a retry never creates a second record.

use super::{skipped, Collaborators};
use crate::application::locks::SubjectLocks;
use crate::application::progress::ProgressTracker;
use crate::application::queue_store::{EnqueueOptions, QueueStore};
use crate::application::worker::{HandlerError, HandlerResult, JobContext, JobHandler};
use crate::domain::catalog::kinds;
use crate::domain::{
    Business, BusinessStatus, BusinessUpdate, NewBusiness, Notification, NotificationKind,
};
use crate::error::{AppError, Result};
use crate::port::{PlanInput, ProjectSpec};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBusinessRequest {
    /// Stamped at enqueue; the job id stands in when absent
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub requested_at: i64,
    pub user_id: String,
    pub name: String,
    pub concept: String,
    #[serde(default)]
    pub target_market: Option<String>,
    #[serde(default)]
    pub skip_research: bool,
}

impl CreateBusinessRequest {
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("userId", &self.user_id),
            ("name", &self.name),
            ("concept", &self.concept),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::Validation(format!("{} must not be empty", field)));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreationOutcome {
    pub business_id: String,
    pub repository_url: String,
    pub monitoring_job_id: String,
    pub processing_ms: i64,
}

/// State carried across the stages of one attempt
struct CreationRun {
    tracker: ProgressTracker,
    stage: &'static str,
    business: Option<Business>,
}

impl CreationRun {
    fn enter(&mut self, stage: &'static str, percent: u8, message: impl Into<String>) {
        self.stage = stage;
        self.tracker.report(stage, percent, message);
    }
}

pub struct BusinessCreationProcessor {
    collaborators: Collaborators,
    store: Arc<QueueStore>,
    locks: SubjectLocks,
    monitor_poll_delay_ms: i64,
}

impl BusinessCreationProcessor {
    pub fn new(
        collaborators: Collaborators,
        store: Arc<QueueStore>,
        locks: SubjectLocks,
        monitor_poll_delay_ms: i64,
    ) -> Self {
        Self {
            collaborators,
            store,
            locks,
            monitor_poll_delay_ms,
        }
    }

    async fn run(
        &self,
        ctx: &JobContext,
        request: &CreateBusinessRequest,
        request_id: &str,
        run: &mut CreationRun,
    ) -> std::result::Result<(String, String), HandlerError> {
        let businesses = &self.collaborators.businesses;
        let content = &self.collaborators.content;

        run.enter("setup", 5, format!("Starting creation of {}", request.name));

        let research = if request.skip_research {
            None
        } else {
            run.enter("research", 15, "Researching the market");
            let research = match content.research_market(&request.concept).await {
                Ok(research) => Some(research),
                Err(e) => {
                    warn!(request_id = %request_id, error = %e, "Market research unavailable, continuing without it");
                    None
                }
            };
            run.enter("research", 25, "Market research complete");
            research
        };

        run.enter("record", 30, "Creating business record");
        let business = match businesses.find_by_creation_request(request_id).await? {
            Some(mut existing) => {
                if existing.status == BusinessStatus::Failed {
                    let status = existing
                        .status
                        .transition_to(BusinessStatus::Planning)
                        .map_err(AppError::from)?;
                    businesses
                        .update_business(&existing.id, &BusinessUpdate::status(status))
                        .await?;
                    existing.status = status;
                }
                info!(request_id = %request_id, business_id = %existing.id, "Resuming earlier creation attempt");
                existing
            }
            None => {
                businesses
                    .create_business(&NewBusiness {
                        user_id: request.user_id.clone(),
                        name: request.name.clone(),
                        concept: request.concept.clone(),
                        creation_request_id: request_id.to_string(),
                    })
                    .await?
            }
        };
        run.business = Some(business.clone());
        run.enter("record", 35, format!("Business record {} ready", business.id));
        ctx.heartbeat().await;

        run.enter("plan", 45, "Refining the concept");
        let concept = content.refine_concept(&request.concept).await?;
        let plan = content
            .generate_plan(&PlanInput {
                business_name: request.name.clone(),
                concept: concept.clone(),
                target_market: request.target_market.clone(),
                research,
            })
            .await?;
        businesses
            .update_business(
                &business.id,
                &BusinessUpdate {
                    concept: Some(concept.clone()),
                    plan: Some(serde_json::to_value(&plan).map_err(AppError::from)?),
                    ..Default::default()
                },
            )
            .await?;
        run.enter("plan", 55, "Business plan generated");
        ctx.heartbeat().await;

        run.enter("scaffold", 65, "Scaffolding the project");
        let status = business
            .status
            .transition_to(BusinessStatus::Developing)
            .map_err(AppError::from)?;
        let repository_url = match &business.repository_url {
            Some(url) => url.clone(),
            None => {
                let spec = ProjectSpec {
                    name: request.name.clone(),
                    concept,
                    plan,
                };
                self.collaborators
                    .scaffolder
                    .create_project(&business.id, &spec)
                    .await?
                    .repository_url
            }
        };
        businesses
            .update_business(
                &business.id,
                &BusinessUpdate {
                    status: Some(status),
                    repository_url: Some(repository_url.clone()),
                    development_stage: Some("scaffolded".to_string()),
                    ..Default::default()
                },
            )
            .await?;
        run.enter("scaffold", 75, "Project scaffolded");

        run.enter("handoff", 85, "Handing off to development monitoring");
        let monitor = self
            .store
            .enqueue(
                kinds::MONITOR_DEVELOPMENT,
                serde_json::json!({ "businessId": business.id }),
                EnqueueOptions::default().delay_ms(self.monitor_poll_delay_ms),
            )
            .await?;

        self.collaborators.notifications.emit_notification(
            &request.user_id,
            &Notification::new(
                NotificationKind::Success,
                "Business created",
                format!("{} is set up and development has started", request.name),
            )
            .for_business(&business.id),
        );
        run.enter("handoff", 100, "Business created");

        Ok((repository_url, monitor.id))
    }

    async fn on_failure(
        &self,
        ctx: &JobContext,
        request: &CreateBusinessRequest,
        request_id: &str,
        run: &CreationRun,
        err: &HandlerError,
        processing_ms: i64,
    ) {
        let retry_scheduled = err.is_retryable() && ctx.retry_available();
        warn!(
            job_id = %ctx.id(),
            request_id = %request_id,
            stage = run.stage,
            attempt = ctx.attempt(),
            processing_ms = processing_ms,
            retry_scheduled = retry_scheduled,
            error = %err,
            "Business creation failed"
        );

        let mut notification = Notification::new(
            NotificationKind::Error,
            "Business creation failed",
            if retry_scheduled {
                format!("{} failed at the {} stage; retrying shortly", request.name, run.stage)
            } else {
                format!("{} failed at the {} stage: {}", request.name, run.stage, err)
            },
        );

        if let Some(business) = &run.business {
            let update = BusinessUpdate::failed(format!("{}: {}", run.stage, err));
            if let Err(e) = self
                .collaborators
                .businesses
                .update_business(&business.id, &update)
                .await
            {
                warn!(business_id = %business.id, error = %e, "Could not mark business failed");
            }
            notification = notification.for_business(&business.id);
        }

        self.collaborators
            .notifications
            .emit_notification(&request.user_id, &notification);
    }
}

#[async_trait]
impl JobHandler for BusinessCreationProcessor {
    async fn handle(&self, ctx: JobContext) -> HandlerResult {
        let request: CreateBusinessRequest = ctx.payload()?;
        request.validate()?;
        let request_id = if request.request_id.is_empty() {
            ctx.id().clone()
        } else {
            request.request_id.clone()
        };

        let Some(_guard) = self.locks.try_acquire(&format!("creation:{}", request_id)) else {
            info!(request_id = %request_id, "Creation already running for request");
            return Ok(skipped("creation already in progress"));
        };

        let started = ctx.now_millis();
        let mut run = CreationRun {
            tracker: ProgressTracker::new(
                request_id.clone(),
                Arc::clone(&self.collaborators.notifications),
                Arc::clone(ctx.time_provider()),
            ),
            stage: "setup",
            business: None,
        };

        match self.run(&ctx, &request, &request_id, &mut run).await {
            Ok((repository_url, monitoring_job_id)) => {
                let outcome = CreationOutcome {
                    business_id: run.business.map(|b| b.id).unwrap_or_default(),
                    repository_url,
                    monitoring_job_id,
                    processing_ms: ctx.now_millis() - started,
                };
                info!(
                    request_id = %request_id,
                    business_id = %outcome.business_id,
                    processing_ms = outcome.processing_ms,
                    "Business creation completed"
                );
                serde_json::to_value(outcome).map_err(|e| HandlerError::fatal(e.to_string()))
            }
            Err(err) => {
                let processing_ms = ctx.now_millis() - started;
                self.on_failure(&ctx, &request, &request_id, &run, &err, processing_ms)
                    .await;
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::Fixture;
    use super::*;
    use crate::domain::JobState;
    use serde_json::json;

    fn processor(fx: &Fixture) -> BusinessCreationProcessor {
        BusinessCreationProcessor::new(fx.collaborators(), fx.store.clone(), fx.locks.clone(), 300_000)
    }

    fn payload(request_id: &str) -> serde_json::Value {
        json!({
            "requestId": request_id,
            "requestedAt": 1,
            "userId": "user-7",
            "name": "Sock Club",
            "concept": "monthly sock subscription"
        })
    }

    #[tokio::test]
    async fn test_successful_creation_hands_off_to_monitoring() {
        let fx = Fixture::new();
        let ctx = fx.context(kinds::CREATE_BUSINESS, payload("req-1")).await;

        let result = processor(&fx).handle(ctx).await.unwrap();
        let outcome: CreationOutcome = serde_json::from_value(result).unwrap();

        let business = fx.businesses.business(&outcome.business_id).unwrap();
        assert_eq!(business.status, BusinessStatus::Developing);
        assert_eq!(business.concept, "monthly sock subscription (refined)");
        assert_eq!(business.repository_url.as_deref(), Some(outcome.repository_url.as_str()));

        let monitor = fx.store.get_job(&outcome.monitoring_job_id).await.unwrap();
        assert_eq!(monitor.kind.as_str(), kinds::MONITOR_DEVELOPMENT);
        assert_eq!(monitor.state, JobState::Delayed);

        assert_eq!(fx.sink.notifications_of(NotificationKind::Success).len(), 1);
    }

    #[tokio::test]
    async fn test_progress_is_monotonic_and_ends_at_100() {
        let fx = Fixture::new();
        let ctx = fx.context(kinds::CREATE_BUSINESS, payload("req-1")).await;
        processor(&fx).handle(ctx).await.unwrap();

        let progress = fx.sink.progress();
        let stages: Vec<&str> = progress.iter().map(|r| r.stage.as_str()).collect();
        assert_eq!(stages.first(), Some(&"setup"));
        assert!(stages.contains(&"research"));
        assert!(progress.windows(2).all(|w| w[0].percent <= w[1].percent));
        assert_eq!(progress.last().unwrap().percent, 100);
        assert!(progress.iter().all(|r| r.subject_id == "req-1"));
    }

    #[tokio::test]
    async fn test_skip_research_omits_stage() {
        let fx = Fixture::new();
        let mut body = payload("req-2");
        body["skipResearch"] = json!(true);
        let ctx = fx.context(kinds::CREATE_BUSINESS, body).await;
        processor(&fx).handle(ctx).await.unwrap();

        assert!(fx.sink.progress().iter().all(|r| r.stage != "research"));
    }

    #[tokio::test]
    async fn test_empty_concept_is_fatal() {
        let fx = Fixture::new();
        let mut body = payload("req-3");
        body["concept"] = json!("  ");
        let ctx = fx.context(kinds::CREATE_BUSINESS, body).await;

        let err = processor(&fx).handle(ctx).await.unwrap_err();
        assert!(!err.is_retryable());
        assert_eq!(fx.businesses.created_count(), 0);
    }

    #[tokio::test]
    async fn test_failure_marks_record_failed_and_notifies() {
        let fx = Fixture::new();
        fx.content.set_fail_plan(true);
        let ctx = fx.context(kinds::CREATE_BUSINESS, payload("req-4")).await;

        let err = processor(&fx).handle(ctx).await.unwrap_err();
        assert!(err.is_retryable());

        let business = fx.businesses.business("biz-1").unwrap();
        assert_eq!(business.status, BusinessStatus::Failed);

        let errors = fx.sink.notifications_of(NotificationKind::Error);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("retrying"));
        assert_eq!(errors[0].business_id.as_deref(), Some("biz-1"));
    }

    #[tokio::test]
    async fn test_final_attempt_failure_reports_no_retry() {
        let fx = Fixture::new();
        fx.content.set_fail_plan(true);
        let ctx = fx
            .last_attempt_context(kinds::CREATE_BUSINESS, payload("req-5"))
            .await;

        processor(&fx).handle(ctx).await.unwrap_err();
        let errors = fx.sink.notifications_of(NotificationKind::Error);
        assert!(!errors[0].message.contains("retrying"));
        assert!(errors[0].message.contains("plan"));
    }

    #[tokio::test]
    async fn test_retry_reuses_record_from_earlier_attempt() {
        let fx = Fixture::new();
        fx.scaffolder.set_fail_create(true);
        let first = fx.context(kinds::CREATE_BUSINESS, payload("req-6")).await;
        processor(&fx).handle(first).await.unwrap_err();
        assert_eq!(
            fx.businesses.business("biz-1").unwrap().status,
            BusinessStatus::Failed
        );

        fx.scaffolder.set_fail_create(false);
        let second = fx.context(kinds::CREATE_BUSINESS, payload("req-6")).await;
        let result = processor(&fx).handle(second).await.unwrap();
        let outcome: CreationOutcome = serde_json::from_value(result).unwrap();

        assert_eq!(outcome.business_id, "biz-1");
        assert_eq!(fx.businesses.created_count(), 1);
        assert_eq!(
            fx.businesses.business("biz-1").unwrap().status,
            BusinessStatus::Developing
        );
    }

    #[tokio::test]
    async fn test_concurrent_run_for_same_request_is_skipped() {
        let fx = Fixture::new();
        let _held = fx.locks.try_acquire("creation:req-7").unwrap();
        let ctx = fx.context(kinds::CREATE_BUSINESS, payload("req-7")).await;

        let result = processor(&fx).handle(ctx).await.unwrap();
        assert_eq!(result["skipped"], json!(true));
        assert_eq!(fx.businesses.created_count(), 0);
    }
}
