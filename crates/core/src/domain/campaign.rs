// Campaign Performance Snapshot (produced by the campaign-analysis collaborator)

use crate::domain::business::CampaignId;
use crate::domain::error::{DomainError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CampaignRecommendation {
    Scale,
    Pause,
    Optimize,
    Maintain,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignMetrics {
    pub click_through_rate: f64,
    pub cost_per_click: f64,
    pub conversions: u64,
    pub return_on_ad_spend: f64,
    pub cost_per_conversion: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    pub campaign_id: CampaignId,
    /// Derived score, 0-100
    pub score: f64,
    pub metrics: CampaignMetrics,
    pub recommendation: CampaignRecommendation,
}

impl PerformanceSnapshot {
    /// Reject snapshots the decision engine cannot reason about
    pub fn validate(&self) -> Result<()> {
        let malformed = |reason: &str| DomainError::MalformedSnapshot {
            campaign_id: self.campaign_id.clone(),
            reason: reason.to_string(),
        };

        if self.campaign_id.trim().is_empty() {
            return Err(malformed("missing campaign id"));
        }
        if !self.score.is_finite() || !(0.0..=100.0).contains(&self.score) {
            return Err(malformed("score outside 0-100"));
        }
        let m = &self.metrics;
        let rates = [
            m.click_through_rate,
            m.cost_per_click,
            m.return_on_ad_spend,
            m.cost_per_conversion,
        ];
        if rates.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(malformed("negative or non-finite metric"));
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn snapshot(campaign_id: &str, score: f64, roas: f64) -> PerformanceSnapshot {
    PerformanceSnapshot {
        campaign_id: campaign_id.to_string(),
        score,
        metrics: CampaignMetrics {
            click_through_rate: 0.02,
            cost_per_click: 1.1,
            conversions: 12,
            return_on_ad_spend: roas,
            cost_per_conversion: 18.0,
        },
        recommendation: CampaignRecommendation::Maintain,
    }
}
