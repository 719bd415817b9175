//! Marketing automation: campaign monitoring cycles, single-business
//! evaluation and the biweekly optimization sweep.
//!
//! The decision itself is the pure `domain::decision::decide`; this
//! processor gathers its inputs and carries out what it returns.

use super::{business_lock, skipped, Collaborators};
use crate::application::locks::SubjectLocks;
use crate::application::worker::{HandlerError, HandlerResult, JobContext, JobHandler};
use crate::domain::catalog::kinds;
use crate::domain::decision::{self, MIN_BUDGET_MULTIPLIER};
use crate::domain::{
    Business, BusinessDecision, BusinessStatus, BusinessUpdate, CycleSummary, DecisionAction,
    DecisionThresholds, Notification, NotificationKind,
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateBusinessRequest {
    pub business_id: String,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub requested_at: Option<i64>,
}

pub struct MarketingProcessor {
    collaborators: Collaborators,
    locks: SubjectLocks,
    thresholds: DecisionThresholds,
    window_days: u32,
}

impl MarketingProcessor {
    pub fn new(
        collaborators: Collaborators,
        locks: SubjectLocks,
        thresholds: DecisionThresholds,
        window_days: u32,
    ) -> Self {
        Self {
            collaborators,
            locks,
            thresholds,
            window_days,
        }
    }

    /// Evaluate every live business; one failure never stops the cycle
    pub async fn run_cycle(&self, ctx: &JobContext) -> Result<CycleSummary, HandlerError> {
        let businesses = self.collaborators.businesses.get_active_businesses().await?;
        let now = ctx.time_provider().now();
        let mut summary = CycleSummary::default();

        for business in &businesses {
            match self.evaluate(business, now).await {
                Ok(Some(decision)) => summary.record(&decision),
                Ok(None) => summary.record_skipped(),
                Err(e) => {
                    warn!(business_id = %business.id, error = %e, "Business evaluation failed");
                    summary.record_failure();
                }
            }
            ctx.heartbeat().await;
        }

        info!(
            evaluated = summary.evaluated,
            failed = summary.failed,
            skipped = summary.skipped,
            scale = summary.scale,
            pause = summary.pause,
            optimize = summary.optimize,
            close = summary.close,
            maintain = summary.maintain,
            average_confidence = summary.average_confidence,
            "Marketing cycle complete"
        );
        Ok(summary)
    }

    /// Decide and act for one business. None when another run holds it.
    pub async fn evaluate(
        &self,
        business: &Business,
        now: DateTime<Utc>,
    ) -> Result<Option<BusinessDecision>, HandlerError> {
        let Some(_guard) = self.locks.try_acquire(&business_lock(&business.id)) else {
            return Ok(None);
        };

        let campaigns = &self.collaborators.campaigns;
        let listed = self
            .collaborators
            .businesses
            .get_campaigns_by_business(&business.id)
            .await?;
        let mut snapshots = Vec::with_capacity(listed.len());
        for campaign in &listed {
            snapshots.push(campaigns.analyze(&campaign.id, self.window_days).await?);
        }

        let decision = decision::decide(
            &business.id,
            business.age_days(now),
            &snapshots,
            &self.thresholds,
        )
        .map_err(AppError::from)?;

        for action in &decision.campaign_actions {
            match action.action {
                DecisionAction::Scale => {
                    let multiplier = action.budget_multiplier.unwrap_or(MIN_BUDGET_MULTIPLIER);
                    campaigns.scale(&action.campaign_id, multiplier).await?
                }
                DecisionAction::Pause | DecisionAction::Close => {
                    campaigns.pause(&action.campaign_id).await?
                }
                DecisionAction::Optimize => campaigns.optimize(&action.campaign_id).await?,
                DecisionAction::Maintain => {}
            }
        }

        let next_status = match decision.action {
            DecisionAction::Pause => Some(BusinessStatus::Paused),
            DecisionAction::Close => Some(BusinessStatus::Closed),
            _ => None,
        };
        if let Some(next) = next_status.filter(|s| *s != business.status) {
            let status = business.status.transition_to(next).map_err(AppError::from)?;
            self.collaborators
                .businesses
                .update_business(&business.id, &BusinessUpdate::status(status))
                .await?;
        }

        self.notify_owner(business, &decision);
        info!(
            business_id = %business.id,
            action = %decision.action,
            confidence = decision.confidence,
            campaigns = decision.campaign_actions.len(),
            "Business evaluated"
        );
        Ok(Some(decision))
    }

    fn notify_owner(&self, business: &Business, decision: &BusinessDecision) {
        let (kind, title) = match decision.action {
            DecisionAction::Scale => (NotificationKind::Success, "Campaigns scaled up"),
            DecisionAction::Pause => (NotificationKind::Warning, "Campaigns paused"),
            DecisionAction::Close => (NotificationKind::Warning, "Business closed"),
            DecisionAction::Optimize => (NotificationKind::Info, "Campaigns being optimized"),
            DecisionAction::Maintain => (NotificationKind::Info, "Campaigns on track"),
        };
        self.collaborators.notifications.emit_notification(
            &business.user_id,
            &Notification::new(kind, title, decision.reasons.join("; ")).for_business(&business.id),
        );
    }

    /// Ask the campaign collaborator to optimize every live campaign
    async fn optimize_all(&self, ctx: &JobContext) -> HandlerResult {
        let businesses = self.collaborators.businesses.get_active_businesses().await?;
        let mut optimized = 0usize;
        let mut failed = 0usize;

        for business in &businesses {
            let campaigns = match self
                .collaborators
                .businesses
                .get_campaigns_by_business(&business.id)
                .await
            {
                Ok(campaigns) => campaigns,
                Err(e) => {
                    warn!(business_id = %business.id, error = %e, "Could not list campaigns");
                    failed += 1;
                    continue;
                }
            };
            for campaign in &campaigns {
                match self.collaborators.campaigns.optimize(&campaign.id).await {
                    Ok(()) => optimized += 1,
                    Err(e) => {
                        warn!(campaign_id = %campaign.id, error = %e, "Campaign optimization failed");
                        failed += 1;
                    }
                }
            }
            ctx.heartbeat().await;
        }

        info!(optimized = optimized, failed = failed, "Optimization sweep complete");
        Ok(serde_json::json!({ "optimized": optimized, "failed": failed }))
    }
}

#[async_trait]
impl JobHandler for MarketingProcessor {
    async fn handle(&self, ctx: JobContext) -> HandlerResult {
        match ctx.job().kind.as_str() {
            kinds::MONITOR_CAMPAIGNS => {
                let summary = self.run_cycle(&ctx).await?;
                serde_json::to_value(summary).map_err(|e| HandlerError::fatal(e.to_string()))
            }
            kinds::EVALUATE_BUSINESS => {
                let request: EvaluateBusinessRequest = ctx.payload()?;
                let business = self
                    .collaborators
                    .businesses
                    .get_business(&request.business_id)
                    .await?
                    .ok_or_else(|| {
                        HandlerError::fatal(format!("business {} not found", request.business_id))
                    })?;
                if !business.status.is_live() {
                    return Ok(skipped("business is not live"));
                }
                match self.evaluate(&business, ctx.time_provider().now()).await? {
                    Some(decision) => serde_json::to_value(decision)
                        .map_err(|e| HandlerError::fatal(e.to_string())),
                    None => Ok(skipped("business is being processed")),
                }
            }
            kinds::OPTIMIZE_CAMPAIGNS => self.optimize_all(&ctx).await,
            other => Err(HandlerError::fatal(format!(
                "marketing processor cannot handle '{}'",
                other
            ))),
        }
    }
}
