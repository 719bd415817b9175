// Campaign analysis & control port (external collaborator)

use crate::domain::PerformanceSnapshot;
use crate::port::collaborator::CollaboratorResult;
use async_trait::async_trait;

#[async_trait]
pub trait CampaignAnalyzer: Send + Sync {
    /// Performance over the last `window_days`
    async fn analyze(
        &self,
        campaign_id: &str,
        window_days: u32,
    ) -> CollaboratorResult<PerformanceSnapshot>;

    async fn scale(&self, campaign_id: &str, budget_multiplier: f64) -> CollaboratorResult<()>;

    async fn pause(&self, campaign_id: &str) -> CollaboratorResult<()>;

    async fn optimize(&self, campaign_id: &str) -> CollaboratorResult<()>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::domain::{CampaignMetrics, CampaignRecommendation};
    use crate::port::collaborator::CollaboratorError;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    /// Campaign side effects recorded by the mock
    #[derive(Debug, Clone, PartialEq)]
    pub enum CampaignCall {
        Scale(String, f64),
        Pause(String),
        Optimize(String),
    }

    #[derive(Default)]
    pub struct MockCampaignAnalyzer {
        snapshots: Mutex<HashMap<String, PerformanceSnapshot>>,
        failing: Mutex<HashSet<String>>,
        calls: Mutex<Vec<CampaignCall>>,
    }

    impl MockCampaignAnalyzer {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_performance(&self, campaign_id: &str, score: f64, roas: f64) {
            self.snapshots.lock().unwrap().insert(
                campaign_id.to_string(),
                PerformanceSnapshot {
                    campaign_id: campaign_id.to_string(),
                    score,
                    metrics: CampaignMetrics {
                        click_through_rate: 0.03,
                        cost_per_click: 0.9,
                        conversions: 20,
                        return_on_ad_spend: roas,
                        cost_per_conversion: 12.0,
                    },
                    recommendation: CampaignRecommendation::Maintain,
                },
            );
        }

        /// Make `analyze` fail for one campaign
        pub fn fail_analysis(&self, campaign_id: &str) {
            self.failing.lock().unwrap().insert(campaign_id.to_string());
        }

        pub fn calls(&self) -> Vec<CampaignCall> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CampaignAnalyzer for MockCampaignAnalyzer {
        async fn analyze(
            &self,
            campaign_id: &str,
            _window_days: u32,
        ) -> CollaboratorResult<PerformanceSnapshot> {
            if self.failing.lock().unwrap().contains(campaign_id) {
                return Err(CollaboratorError::Unavailable(format!(
                    "ads api down for {}",
                    campaign_id
                )));
            }
            self.snapshots
                .lock()
                .unwrap()
                .get(campaign_id)
                .cloned()
                .ok_or_else(|| CollaboratorError::Rejected(format!("unknown campaign {}", campaign_id)))
        }

        async fn scale(&self, campaign_id: &str, budget_multiplier: f64) -> CollaboratorResult<()> {
            self.calls
                .lock()
                .unwrap()
                .push(CampaignCall::Scale(campaign_id.to_string(), budget_multiplier));
            Ok(())
        }

        async fn pause(&self, campaign_id: &str) -> CollaboratorResult<()> {
            self.calls
                .lock()
                .unwrap()
                .push(CampaignCall::Pause(campaign_id.to_string()));
            Ok(())
        }

        async fn optimize(&self, campaign_id: &str) -> CollaboratorResult<()> {
            self.calls
                .lock()
                .unwrap()
                .push(CampaignCall::Optimize(campaign_id.to_string()));
            Ok(())
        }
    }
}
