// Business persistence port (external collaborator)
//
// Eventually consistent, no transactional guarantees across calls.

use crate::domain::{Business, BusinessUpdate, Campaign, NewBusiness};
use crate::port::collaborator::CollaboratorResult;
use async_trait::async_trait;

#[async_trait]
pub trait BusinessRepository: Send + Sync {
    async fn get_business(&self, id: &str) -> CollaboratorResult<Option<Business>>;

    /// Create a business record in PLANNING
    async fn create_business(&self, input: &NewBusiness) -> CollaboratorResult<Business>;

    /// Record created by an earlier attempt of the same creation request
    async fn find_by_creation_request(
        &self,
        request_id: &str,
    ) -> CollaboratorResult<Option<Business>>;

    async fn update_business(&self, id: &str, update: &BusinessUpdate) -> CollaboratorResult<()>;

    /// Businesses in ACTIVE or PAUSED
    async fn get_active_businesses(&self) -> CollaboratorResult<Vec<Business>>;

    async fn get_campaigns_by_business(&self, business_id: &str)
        -> CollaboratorResult<Vec<Campaign>>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::domain::BusinessStatus;
    use crate::port::collaborator::CollaboratorError;
    use chrono::{Duration, Utc};
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockBusinessRepository {
        businesses: Mutex<HashMap<String, Business>>,
        campaigns: Mutex<Vec<Campaign>>,
        updates: Mutex<Vec<(String, BusinessUpdate)>>,
        created: Mutex<u32>,
        fail_create: Mutex<bool>,
    }

    impl MockBusinessRepository {
        pub fn new() -> Self {
            Self::default()
        }

        /// Seed a business of the given status and age
        pub fn add_business(&self, id: &str, status: BusinessStatus, age_days: i64) -> Business {
            let business = Business {
                id: id.to_string(),
                user_id: format!("owner-{}", id),
                name: format!("Business {}", id),
                concept: "subscription socks".to_string(),
                status,
                repository_url: Some(format!("https://git.example/{}", id)),
                deployment_url: None,
                development_stage: None,
                development_progress: 0,
                creation_request_id: None,
                created_at: Utc::now() - Duration::days(age_days) - Duration::minutes(1),
                deployed_at: None,
            };
            self.businesses
                .lock()
                .unwrap()
                .insert(id.to_string(), business.clone());
            business
        }

        pub fn add_campaign(&self, business_id: &str, campaign_id: &str) {
            self.campaigns.lock().unwrap().push(Campaign {
                id: campaign_id.to_string(),
                business_id: business_id.to_string(),
                name: format!("Campaign {}", campaign_id),
                platform: "search".to_string(),
                daily_budget: 50.0,
            });
        }

        pub fn set_fail_create(&self, fail: bool) {
            *self.fail_create.lock().unwrap() = fail;
        }

        pub fn business(&self, id: &str) -> Option<Business> {
            self.businesses.lock().unwrap().get(id).cloned()
        }

        pub fn updates_for(&self, id: &str) -> Vec<BusinessUpdate> {
            self.updates
                .lock()
                .unwrap()
                .iter()
                .filter(|(bid, _)| bid == id)
                .map(|(_, u)| u.clone())
                .collect()
        }

        pub fn created_count(&self) -> u32 {
            *self.created.lock().unwrap()
        }
    }

    #[async_trait]
    impl BusinessRepository for MockBusinessRepository {
        async fn get_business(&self, id: &str) -> CollaboratorResult<Option<Business>> {
            Ok(self.business(id))
        }

        async fn create_business(&self, input: &NewBusiness) -> CollaboratorResult<Business> {
            if *self.fail_create.lock().unwrap() {
                return Err(CollaboratorError::Unavailable("database offline".to_string()));
            }
            let mut created = self.created.lock().unwrap();
            *created += 1;
            let business = Business {
                id: format!("biz-{}", *created),
                user_id: input.user_id.clone(),
                name: input.name.clone(),
                concept: input.concept.clone(),
                status: BusinessStatus::Planning,
                repository_url: None,
                deployment_url: None,
                development_stage: None,
                development_progress: 0,
                creation_request_id: Some(input.creation_request_id.clone()),
                created_at: Utc::now(),
                deployed_at: None,
            };
            self.businesses
                .lock()
                .unwrap()
                .insert(business.id.clone(), business.clone());
            Ok(business)
        }

        async fn find_by_creation_request(
            &self,
            request_id: &str,
        ) -> CollaboratorResult<Option<Business>> {
            Ok(self
                .businesses
                .lock()
                .unwrap()
                .values()
                .find(|b| b.creation_request_id.as_deref() == Some(request_id))
                .cloned())
        }

        async fn update_business(
            &self,
            id: &str,
            update: &BusinessUpdate,
        ) -> CollaboratorResult<()> {
            let mut businesses = self.businesses.lock().unwrap();
            let business = businesses
                .get_mut(id)
                .ok_or_else(|| CollaboratorError::Rejected(format!("unknown business {}", id)))?;
            update.apply_to(business);
            self.updates
                .lock()
                .unwrap()
                .push((id.to_string(), update.clone()));
            Ok(())
        }

        async fn get_active_businesses(&self) -> CollaboratorResult<Vec<Business>> {
            let mut live: Vec<Business> = self
                .businesses
                .lock()
                .unwrap()
                .values()
                .filter(|b| b.status.is_live())
                .cloned()
                .collect();
            live.sort_by(|a, b| a.id.cmp(&b.id));
            Ok(live)
        }

        async fn get_campaigns_by_business(
            &self,
            business_id: &str,
        ) -> CollaboratorResult<Vec<Campaign>> {
            Ok(self
                .campaigns
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.business_id == business_id)
                .cloned()
                .collect())
        }
    }
}
