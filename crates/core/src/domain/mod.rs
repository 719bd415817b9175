// Domain Layer - Pure business logic and entities

pub mod business;
pub mod campaign;
pub mod catalog;
pub mod decision;
pub mod error;
pub mod job;
pub mod progress;
pub mod queue;
pub mod schedule;

// Re-exports
pub use business::{
    Business, BusinessId, BusinessStatus, BusinessUpdate, Campaign, CampaignId, NewBusiness,
};
pub use campaign::{CampaignMetrics, CampaignRecommendation, PerformanceSnapshot};
pub use decision::{
    BusinessDecision, CampaignDecision, CycleSummary, DecisionAction, DecisionThresholds,
};
pub use error::DomainError;
pub use job::{
    BackoffPolicy, Job, JobId, JobKind, JobPayload, JobState, Priority, QueueName, RepeatSpec,
    MAX_PRIORITY, MIN_PRIORITY,
};
pub use progress::{Notification, NotificationKind, ProgressRecord};
pub use queue::{QueueConfig, QueueId, QueueStats, RetentionPolicy, RetrySettings};
pub use schedule::{RepeatRule, Schedule};
