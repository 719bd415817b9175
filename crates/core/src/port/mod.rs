// Port Layer - Interfaces for external dependencies

pub mod business_repository;
pub mod campaign_analyzer;
pub mod collaborator;
pub mod content_generator;
pub mod id_provider; // For deterministic testing
pub mod job_repository;
pub mod maintenance;
pub mod notification_sink;
pub mod payment_gateway;
pub mod project_scaffolder;
pub mod system_probe;
pub mod time_provider;

// Re-exports
pub use business_repository::BusinessRepository;
pub use campaign_analyzer::CampaignAnalyzer;
pub use collaborator::{CollaboratorError, CollaboratorResult};
pub use content_generator::{BusinessPlan, ContentGenerator, PlanInput};
pub use id_provider::{IdProvider, UuidProvider};
pub use job_repository::JobRepository;
pub use maintenance::{BackupInfo, Maintenance, MaintenanceConfig, MaintenanceStats};
pub use notification_sink::{LogNotificationSink, NotificationSink};
pub use payment_gateway::{FailedPayment, PaymentGateway};
pub use project_scaffolder::{
    CodeQuality, DevelopmentProgress, ProjectHandle, ProjectScaffolder, ProjectSpec, TestReport,
};
pub use system_probe::{SystemMetrics, SystemProbe};
pub use time_provider::{SystemTimeProvider, TimeProvider};
