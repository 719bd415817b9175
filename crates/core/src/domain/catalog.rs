//! Catalog of the queues and job kinds the platform runs.
//!
//! One queue per workflow domain; kinds sharing a queue share its retry and
//! retention policy but get their own concurrency ceiling at registration.

use crate::domain::job::BackoffPolicy;
use crate::domain::queue::QueueConfig;

pub mod queues {
    pub const BUSINESS_CREATION: &str = "business-creation";
    pub const DEVELOPMENT: &str = "development";
    pub const MARKETING: &str = "marketing";
    pub const ANALYTICS: &str = "analytics";
    pub const PAYMENTS: &str = "payments";
    pub const MAINTENANCE: &str = "maintenance";
}

pub mod kinds {
    pub const CREATE_BUSINESS: &str = "create-business";

    pub const MONITOR_DEVELOPMENT: &str = "monitor-development";

    pub const MONITOR_CAMPAIGNS: &str = "monitor-campaigns";
    pub const EVALUATE_BUSINESS: &str = "evaluate-business";
    pub const OPTIMIZE_CAMPAIGNS: &str = "optimize-campaigns";

    pub const COLLECT_ALL_ANALYTICS: &str = "collect-all-analytics";
    pub const COLLECT_ANALYTICS: &str = "collect-analytics";
    pub const WEEKLY_REPORT: &str = "weekly-report";

    pub const RETRY_FAILED_PAYMENTS: &str = "retry-failed-payments";

    pub const CLEANUP: &str = "cleanup";
    pub const BACKUP: &str = "backup";
    pub const HEALTH_CHECK: &str = "health-check";
}

/// Default queue set
pub fn default_queues() -> Vec<QueueConfig> {
    vec![
        QueueConfig::new(queues::BUSINESS_CREATION, 2)
            .with_kinds(&[kinds::CREATE_BUSINESS])
            .with_retry(3, BackoffPolicy::exponential(5_000, 2.0))
            .with_retention(100, 500),
        QueueConfig::new(queues::DEVELOPMENT, 5)
            .with_kinds(&[kinds::MONITOR_DEVELOPMENT])
            .with_retry(3, BackoffPolicy::exponential(10_000, 2.0))
            .with_retention(200, 200),
        QueueConfig::new(queues::MARKETING, 3)
            .with_kinds(&[
                kinds::MONITOR_CAMPAIGNS,
                kinds::EVALUATE_BUSINESS,
                kinds::OPTIMIZE_CAMPAIGNS,
            ])
            .with_retry(3, BackoffPolicy::exponential(5_000, 2.0))
            .with_retention(100, 200),
        QueueConfig::new(queues::ANALYTICS, 5)
            .with_kinds(&[
                kinds::COLLECT_ALL_ANALYTICS,
                kinds::COLLECT_ANALYTICS,
                kinds::WEEKLY_REPORT,
            ])
            .with_retry(3, BackoffPolicy::exponential(2_000, 2.0))
            .with_retention(100, 100),
        QueueConfig::new(queues::PAYMENTS, 1)
            .with_kinds(&[kinds::RETRY_FAILED_PAYMENTS])
            .with_retry(5, BackoffPolicy::fixed(60_000))
            .with_retention(50, 500),
        QueueConfig::new(queues::MAINTENANCE, 1)
            .with_kinds(&[kinds::CLEANUP, kinds::BACKUP, kinds::HEALTH_CHECK])
            .with_retry(2, BackoffPolicy::fixed(30_000))
            .with_retention(20, 50),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_every_kind_routes_to_exactly_one_queue() {
        let queues = default_queues();
        let mut seen = HashSet::new();
        for queue in &queues {
            for kind in &queue.kinds {
                assert!(seen.insert(kind.clone()), "kind {} routed twice", kind);
            }
        }
        assert_eq!(seen.len(), 12);
    }

    #[test]
    fn test_default_retry_policies_are_valid() {
        for queue in default_queues() {
            assert!(queue.retry.max_attempts >= 1);
            queue.retry.backoff.validate().unwrap();
        }
    }
}
