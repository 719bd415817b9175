// Analytics: daily per-business collection and the weekly owner report

use super::Collaborators;
use crate::application::queue_store::{EnqueueOptions, QueueStore};
use crate::application::worker::{HandlerError, HandlerResult, JobContext, JobHandler};
use crate::domain::catalog::kinds;
use crate::domain::{Business, Notification, NotificationKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Window for the daily collection
pub const DAILY_WINDOW_DAYS: u32 = 1;
/// Window for the weekly report
pub const WEEKLY_WINDOW_DAYS: u32 = 7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectAnalyticsRequest {
    pub business_id: String,
}

/// Campaign performance rolled up to one business
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessAnalytics {
    pub business_id: String,
    pub window_days: u32,
    pub campaigns: usize,
    /// Score weighted by daily budget
    pub weighted_score: f64,
    pub conversions: u64,
    pub average_roas: f64,
}

pub struct AnalyticsProcessor {
    collaborators: Collaborators,
    store: Arc<QueueStore>,
}

impl AnalyticsProcessor {
    pub fn new(collaborators: Collaborators, store: Arc<QueueStore>) -> Self {
        Self {
            collaborators,
            store,
        }
    }

    pub async fn aggregate(
        &self,
        business_id: &str,
        window_days: u32,
    ) -> Result<BusinessAnalytics, HandlerError> {
        let campaigns = self
            .collaborators
            .businesses
            .get_campaigns_by_business(business_id)
            .await?;

        let mut budget_total = 0.0;
        let mut weighted = 0.0;
        let mut roas_total = 0.0;
        let mut conversions = 0u64;
        for campaign in &campaigns {
            let snapshot = self
                .collaborators
                .campaigns
                .analyze(&campaign.id, window_days)
                .await?;
            let budget = campaign.daily_budget.max(0.0);
            budget_total += budget;
            weighted += snapshot.score * budget;
            roas_total += snapshot.metrics.return_on_ad_spend;
            conversions += snapshot.metrics.conversions;
        }

        let n = campaigns.len();
        Ok(BusinessAnalytics {
            business_id: business_id.to_string(),
            window_days,
            campaigns: n,
            weighted_score: if budget_total > 0.0 {
                weighted / budget_total
            } else {
                0.0
            },
            conversions,
            average_roas: if n > 0 { roas_total / n as f64 } else { 0.0 },
        })
    }

    /// One collect envelope per live business
    async fn fan_out(&self) -> HandlerResult {
        let businesses = self.collaborators.businesses.get_active_businesses().await?;
        let mut enqueued = 0usize;
        for business in &businesses {
            self.store
                .enqueue(
                    kinds::COLLECT_ANALYTICS,
                    serde_json::json!({ "businessId": business.id }),
                    EnqueueOptions::default(),
                )
                .await?;
            enqueued += 1;
        }
        info!(businesses = enqueued, "Analytics collection fanned out");
        Ok(serde_json::json!({ "enqueued": enqueued }))
    }

    async fn collect(&self, ctx: &JobContext) -> HandlerResult {
        let request: CollectAnalyticsRequest = ctx.payload()?;
        let analytics = self
            .aggregate(&request.business_id, DAILY_WINDOW_DAYS)
            .await?;
        let value =
            serde_json::to_value(&analytics).map_err(|e| HandlerError::fatal(e.to_string()))?;
        self.collaborators
            .notifications
            .emit_development_update(&request.business_id, &serde_json::json!({ "analytics": value }));
        Ok(value)
    }

    async fn weekly_report(&self, ctx: &JobContext) -> HandlerResult {
        let businesses = self.collaborators.businesses.get_active_businesses().await?;
        let mut reported = 0usize;
        let mut failed = 0usize;

        for business in &businesses {
            match self.aggregate(&business.id, WEEKLY_WINDOW_DAYS).await {
                Ok(analytics) => {
                    self.send_report(business, &analytics);
                    reported += 1;
                }
                Err(e) => {
                    warn!(business_id = %business.id, error = %e, "Weekly report failed");
                    failed += 1;
                }
            }
            ctx.heartbeat().await;
        }

        info!(reported = reported, failed = failed, "Weekly reports sent");
        Ok(serde_json::json!({ "reported": reported, "failed": failed }))
    }

    fn send_report(&self, business: &Business, analytics: &BusinessAnalytics) {
        let message = format!(
            "{} campaign(s), weighted score {:.1}, {} conversions, average ROAS {:.2}",
            analytics.campaigns, analytics.weighted_score, analytics.conversions, analytics.average_roas
        );
        self.collaborators.notifications.emit_notification(
            &business.user_id,
            &Notification::new(
                NotificationKind::Info,
                format!("Weekly report for {}", business.name),
                message,
            )
            .for_business(&business.id),
        );
    }
}

#[async_trait]
impl JobHandler for AnalyticsProcessor {
    async fn handle(&self, ctx: JobContext) -> HandlerResult {
        match ctx.job().kind.as_str() {
            kinds::COLLECT_ALL_ANALYTICS => self.fan_out().await,
            kinds::COLLECT_ANALYTICS => self.collect(&ctx).await,
            kinds::WEEKLY_REPORT => self.weekly_report(&ctx).await,
            other => Err(HandlerError::fatal(format!(
                "analytics processor cannot handle '{}'",
                other
            ))),
        }
    }
}
