// Business & Campaign Domain Model
//
// Records are owned by the persistence collaborator and only mutated through
// explicit update calls.

use crate::domain::error::{DomainError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type BusinessId = String;
pub type CampaignId = String;

/// Business lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BusinessStatus {
    Planning,
    Developing,
    Deploying,
    Active,
    Paused,
    Closed,
    /// Set through the side channel when creation fails
    Failed,
}

impl BusinessStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BusinessStatus::Planning => "PLANNING",
            BusinessStatus::Developing => "DEVELOPING",
            BusinessStatus::Deploying => "DEPLOYING",
            BusinessStatus::Active => "ACTIVE",
            BusinessStatus::Paused => "PAUSED",
            BusinessStatus::Closed => "CLOSED",
            BusinessStatus::Failed => "FAILED",
        }
    }

    /// Allowed lifecycle moves. Staying in place is always allowed.
    pub fn can_transition_to(&self, next: BusinessStatus) -> bool {
        use BusinessStatus::*;
        if *self == next {
            return true;
        }
        match (self, next) {
            (Closed, _) => false,
            (_, Failed) => true,
            (Failed, Planning) => true,
            (Planning, Developing) => true,
            (Developing, Deploying) => true,
            (Deploying, Active) | (Deploying, Developing) => true,
            (Active, Paused) | (Paused, Active) => true,
            (Active, Closed) | (Paused, Closed) => true,
            _ => false,
        }
    }

    pub fn transition_to(&self, next: BusinessStatus) -> Result<BusinessStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(DomainError::InvalidStatusTransition {
                from: self.as_str().to_string(),
                to: next.as_str().to_string(),
            })
        }
    }

    /// Running businesses whose campaigns are evaluated each cycle
    pub fn is_live(&self) -> bool {
        matches!(self, BusinessStatus::Active | BusinessStatus::Paused)
    }
}

impl std::fmt::Display for BusinessStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Business {
    pub id: BusinessId,
    pub user_id: String,
    pub name: String,
    pub concept: String,
    pub status: BusinessStatus,
    #[serde(default)]
    pub repository_url: Option<String>,
    #[serde(default)]
    pub deployment_url: Option<String>,
    #[serde(default)]
    pub development_stage: Option<String>,
    #[serde(default)]
    pub development_progress: u8,
    /// Request that created this record, used to resume retried creations
    #[serde(default)]
    pub creation_request_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub deployed_at: Option<DateTime<Utc>>,
}

impl Business {
    /// Whole days since creation
    pub fn age_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_days().max(0)
    }

    pub fn is_deployed(&self) -> bool {
        self.status.is_live() && self.deployment_url.is_some()
    }
}

/// Input for the record-creation stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBusiness {
    pub user_id: String,
    pub name: String,
    pub concept: String,
    pub creation_request_id: String,
}

/// Partial update; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BusinessUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<BusinessStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concept: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub development_stage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub development_progress: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl BusinessUpdate {
    pub fn status(status: BusinessStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Side-channel update recording a failed workflow
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            status: Some(BusinessStatus::Failed),
            failure_reason: Some(reason.into()),
            ..Default::default()
        }
    }

    /// Apply to an in-memory record (used by in-process stores)
    pub fn apply_to(&self, business: &mut Business) {
        if let Some(status) = self.status {
            business.status = status;
        }
        if let Some(concept) = &self.concept {
            business.concept = concept.clone();
        }
        if let Some(url) = &self.repository_url {
            business.repository_url = Some(url.clone());
        }
        if let Some(url) = &self.deployment_url {
            business.deployment_url = Some(url.clone());
        }
        if let Some(stage) = &self.development_stage {
            business.development_stage = Some(stage.clone());
        }
        if let Some(progress) = self.development_progress {
            business.development_progress = progress.min(100);
        }
        if let Some(at) = self.deployed_at {
            business.deployed_at = Some(at);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub business_id: BusinessId,
    pub name: String,
    pub platform: String,
    pub daily_budget: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_lifecycle_forward_path() {
        use BusinessStatus::*;
        let path = [Planning, Developing, Deploying, Active, Paused, Closed];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{:?}", pair);
        }
    }

    #[test]
    fn test_closed_is_final() {
        assert!(!BusinessStatus::Closed.can_transition_to(BusinessStatus::Active));
        assert!(BusinessStatus::Closed
            .transition_to(BusinessStatus::Failed)
            .is_err());
    }

    #[test]
    fn test_failed_can_restart_planning() {
        assert!(BusinessStatus::Failed.can_transition_to(BusinessStatus::Planning));
        assert!(!BusinessStatus::Planning.can_transition_to(BusinessStatus::Active));
    }

    #[test]
    fn test_age_days() {
        let now = Utc::now();
        let business = Business {
            id: "b1".into(),
            user_id: "u1".into(),
            name: "Shop".into(),
            concept: "socks".into(),
            status: BusinessStatus::Active,
            repository_url: None,
            deployment_url: Some("https://shop.example".into()),
            development_stage: None,
            development_progress: 100,
            creation_request_id: None,
            created_at: now - Duration::days(21) - Duration::hours(3),
            deployed_at: None,
        };
        assert_eq!(business.age_days(now), 21);
        assert!(business.is_deployed());
    }

    #[test]
    fn test_update_applies_only_set_fields() {
        let mut business = Business {
            id: "b1".into(),
            user_id: "u1".into(),
            name: "Shop".into(),
            concept: "socks".into(),
            status: BusinessStatus::Developing,
            repository_url: Some("git://repo".into()),
            deployment_url: None,
            development_stage: None,
            development_progress: 10,
            creation_request_id: None,
            created_at: Utc::now(),
            deployed_at: None,
        };
        let update = BusinessUpdate {
            development_progress: Some(140),
            ..BusinessUpdate::status(BusinessStatus::Deploying)
        };
        update.apply_to(&mut business);
        assert_eq!(business.status, BusinessStatus::Deploying);
        assert_eq!(business.development_progress, 100);
        assert_eq!(business.repository_url.as_deref(), Some("git://repo"));
    }
}
