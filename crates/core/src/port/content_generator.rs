// AI content generation port (external collaborator)
//
// Failures propagate unchanged; output quality is not our concern.

use crate::port::collaborator::CollaboratorResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Input for plan generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanInput {
    pub business_name: String,
    pub concept: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_market: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub research: Option<serde_json::Value>,
}

/// Structured plan handed to the scaffolder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessPlan {
    pub summary: String,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub tech_stack: Vec<String>,
    #[serde(default)]
    pub monetization: Option<String>,
}

#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Optional market research for a concept
    async fn research_market(&self, concept: &str) -> CollaboratorResult<serde_json::Value>;

    async fn refine_concept(&self, concept: &str) -> CollaboratorResult<String>;

    async fn generate_plan(&self, input: &PlanInput) -> CollaboratorResult<BusinessPlan>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::port::collaborator::CollaboratorError;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    #[derive(Default)]
    pub struct MockContentGenerator {
        fail_plan: AtomicBool,
        plan_calls: AtomicU32,
    }

    impl MockContentGenerator {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_fail_plan(&self, fail: bool) {
            self.fail_plan.store(fail, Ordering::SeqCst);
        }

        pub fn plan_calls(&self) -> u32 {
            self.plan_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ContentGenerator for MockContentGenerator {
        async fn research_market(&self, concept: &str) -> CollaboratorResult<serde_json::Value> {
            Ok(serde_json::json!({ "concept": concept, "competitors": 3 }))
        }

        async fn refine_concept(&self, concept: &str) -> CollaboratorResult<String> {
            Ok(format!("{} (refined)", concept))
        }

        async fn generate_plan(&self, input: &PlanInput) -> CollaboratorResult<BusinessPlan> {
            self.plan_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_plan.load(Ordering::SeqCst) {
                return Err(CollaboratorError::Timeout(30_000));
            }
            Ok(BusinessPlan {
                summary: format!("Plan for {}", input.business_name),
                features: vec!["landing page".to_string(), "checkout".to_string()],
                tech_stack: vec!["web".to_string()],
                monetization: Some("subscription".to_string()),
            })
        }
    }
}
