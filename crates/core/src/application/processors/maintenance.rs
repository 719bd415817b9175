// Store upkeep: cleanup, backup and queue health checks

use crate::application::health;
use crate::application::queue_store::QueueStore;
use crate::application::worker::{HandlerError, HandlerResult, JobContext, JobHandler};
use crate::domain::catalog::kinds;
use crate::domain::JobState;
use crate::port::{Maintenance, MaintenanceConfig};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

pub struct MaintenanceProcessor {
    store: Arc<QueueStore>,
    maintenance: Arc<dyn Maintenance>,
    config: MaintenanceConfig,
    clean_completed_after_days: i64,
    clean_failed_after_days: i64,
    backup_dir: PathBuf,
}

impl MaintenanceProcessor {
    pub fn new(
        store: Arc<QueueStore>,
        maintenance: Arc<dyn Maintenance>,
        clean_completed_after_days: i64,
        clean_failed_after_days: i64,
        backup_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            maintenance,
            config: MaintenanceConfig::default(),
            clean_completed_after_days,
            clean_failed_after_days,
            backup_dir: backup_dir.into(),
        }
    }

    async fn cleanup(&self) -> HandlerResult {
        let mut completed = 0u64;
        let mut failed = 0u64;
        for queue in self.store.queues() {
            completed += self
                .store
                .clean(
                    &queue.name,
                    None,
                    self.clean_completed_after_days * DAY_MS,
                    JobState::Completed,
                )
                .await?;
            failed += self
                .store
                .clean(
                    &queue.name,
                    None,
                    self.clean_failed_after_days * DAY_MS,
                    JobState::Failed,
                )
                .await?;
        }
        let reclaimed_mb = self.maintenance.vacuum_if_needed(&self.config).await?;

        info!(
            completed = completed,
            failed = failed,
            reclaimed_mb = reclaimed_mb,
            "Cleanup complete"
        );
        Ok(serde_json::json!({
            "completedRemoved": completed,
            "failedRemoved": failed,
            "reclaimedMb": reclaimed_mb,
        }))
    }

    async fn backup(&self, ctx: &JobContext) -> HandlerResult {
        let stamp = ctx.time_provider().now().format("%Y%m%d-%H%M%S");
        let path = self.backup_dir.join(format!("launchpad-{}.db", stamp));
        let path = path
            .to_str()
            .ok_or_else(|| HandlerError::fatal(format!("backup path {:?} is not UTF-8", path)))?;

        let backup = self.maintenance.backup(path).await?;
        info!(path = %backup.path, size_bytes = backup.size_bytes, "Backup written");
        serde_json::to_value(backup).map_err(|e| HandlerError::fatal(e.to_string()))
    }

    async fn health_check(&self, ctx: &JobContext) -> HandlerResult {
        let report = health::evaluate(&self.store, ctx.now_millis()).await;
        info!(status = ?report.status, queues = report.queues.len(), "Health check");
        serde_json::to_value(report).map_err(|e| HandlerError::fatal(e.to_string()))
    }
}

#[async_trait]
impl JobHandler for MaintenanceProcessor {
    async fn handle(&self, ctx: JobContext) -> HandlerResult {
        match ctx.job().kind.as_str() {
            kinds::CLEANUP => self.cleanup().await,
            kinds::BACKUP => self.backup(&ctx).await,
            kinds::HEALTH_CHECK => self.health_check(&ctx).await,
            other => Err(HandlerError::fatal(format!(
                "maintenance processor cannot handle '{}'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::Fixture;
    use super::*;
    use crate::application::queue_store::EnqueueOptions;
    use crate::domain::catalog::queues;
    use crate::port::maintenance::mocks::MockMaintenance;
    use crate::port::{JobRepository, TimeProvider};
    use serde_json::json;

    fn processor(fx: &Fixture, maintenance: Arc<MockMaintenance>) -> MaintenanceProcessor {
        MaintenanceProcessor::new(fx.store.clone(), maintenance, 7, 30, "/var/backups/launchpad")
    }

    #[tokio::test]
    async fn test_cleanup_removes_old_terminal_jobs() {
        let fx = Fixture::new();
        let maintenance = Arc::new(MockMaintenance::new());
        maintenance.set_fragmentation(40.0);

        let handle = fx
            .store
            .enqueue(kinds::COLLECT_ANALYTICS, json!({ "businessId": "b1" }), EnqueueOptions::default())
            .await
            .unwrap();
        let mut job = fx.store.get_job(&handle.id).await.unwrap();
        let long_ago = fx.time.now_millis() - 8 * DAY_MS;
        job.start(long_ago).unwrap();
        job.complete(long_ago, json!({})).unwrap();
        fx.repo.update(&job).await.unwrap();

        let ctx = fx.context(kinds::CLEANUP, json!({})).await;
        let result = processor(&fx, maintenance.clone()).handle(ctx).await.unwrap();

        assert_eq!(result["completedRemoved"], json!(1));
        assert_eq!(maintenance.vacuum_count(), 1);
        assert_eq!(fx.store.get_stats(queues::ANALYTICS).await.unwrap().completed, 0);
    }

    #[tokio::test]
    async fn test_backup_uses_timestamped_path() {
        let fx = Fixture::new();
        let maintenance = Arc::new(MockMaintenance::new());
        let ctx = fx.context(kinds::BACKUP, json!({})).await;

        processor(&fx, maintenance.clone()).handle(ctx).await.unwrap();

        let backups = maintenance.backups();
        assert_eq!(backups.len(), 1);
        assert!(backups[0].starts_with("/var/backups/launchpad/launchpad-"));
        assert!(backups[0].ends_with(".db"));
    }

    #[tokio::test]
    async fn test_health_check_reports_queues() {
        let fx = Fixture::new();
        let ctx = fx.context(kinds::HEALTH_CHECK, json!({})).await;
        let result = processor(&fx, Arc::new(MockMaintenance::new()))
            .handle(ctx)
            .await
            .unwrap();

        assert_eq!(result["status"], json!("healthy"));
        assert_eq!(result["queues"].as_array().unwrap().len(), 6);
    }
}
