// Application Layer - Use Cases and Workflow Services

pub mod health;
pub mod locks;
pub mod orchestrator;
pub mod processors;
pub mod progress;
pub mod queue_store;
pub mod retry;
pub mod scheduler;
pub mod worker;

// Re-exports
pub use health::{HealthReport, HealthStatus, QueueHealth};
pub use locks::SubjectLocks;
pub use orchestrator::{Orchestrator, OrchestratorDeps, OrchestratorState, SystemStats};
pub use processors::Collaborators;
pub use queue_store::{EnqueueOptions, JobHandle, QueueStore};
pub use scheduler::{ScheduledJobInfo, Scheduler};
pub use worker::{shutdown_channel, HandlerError, JobHandler, ShutdownSender, ShutdownToken};
