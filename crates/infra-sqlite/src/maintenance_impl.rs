// SQLite Maintenance Implementation
use crate::error::map_sqlx_error;
use async_trait::async_trait;
use launchpad_core::error::{AppError, Result};
use launchpad_core::port::{BackupInfo, Maintenance, MaintenanceStats};
use sqlx::SqlitePool;
use std::path::Path;
use tracing::info;

/// SQLite maintenance implementation
pub struct SqliteMaintenance {
    pool: SqlitePool,
}

impl SqliteMaintenance {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn pragma(&self, name: &str) -> Result<i64> {
        let sql = format!("PRAGMA {}", name);
        sqlx::query_scalar(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    /// (total bytes, free-page bytes)
    async fn page_usage(&self) -> Result<(i64, i64)> {
        let page_size = self.pragma("page_size").await?;
        let page_count = self.pragma("page_count").await?;
        let freelist = self.pragma("freelist_count").await?;
        Ok((page_count * page_size, freelist * page_size))
    }
}

fn bytes_to_mb(bytes: i64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

#[async_trait]
impl Maintenance for SqliteMaintenance {
    async fn vacuum(&self) -> Result<f64> {
        let (before, _) = self.page_usage().await?;

        sqlx::query("VACUUM")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let (after, _) = self.page_usage().await?;
        let reclaimed = bytes_to_mb((before - after).max(0));

        info!(
            size_before_mb = bytes_to_mb(before),
            size_after_mb = bytes_to_mb(after),
            reclaimed_mb = reclaimed,
            "VACUUM completed"
        );
        Ok(reclaimed)
    }

    async fn backup(&self, path: &str) -> Result<BackupInfo> {
        let target = Path::new(path);
        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        // VACUUM INTO refuses to overwrite
        if tokio::fs::try_exists(target).await? {
            return Err(AppError::Conflict(format!("backup {} already exists", path)));
        }

        sqlx::query("VACUUM INTO ?")
            .bind(path)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let size_bytes = tokio::fs::metadata(target).await?.len();
        info!(path = %path, size_bytes = size_bytes, "Backup written");
        Ok(BackupInfo {
            path: path.to_string(),
            size_bytes,
        })
    }

    async fn get_stats(&self) -> Result<MaintenanceStats> {
        let (db_size_bytes, free_bytes) = self.page_usage().await?;

        let job_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jobs")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let finished_job_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE state IN ('COMPLETED', 'FAILED')")
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        let fragmentation_percent = if db_size_bytes > 0 {
            free_bytes as f64 / db_size_bytes as f64 * 100.0
        } else {
            0.0
        };

        Ok(MaintenanceStats {
            db_size_mb: bytes_to_mb(db_size_bytes),
            db_size_bytes,
            job_count,
            finished_job_count,
            fragmentation_percent,
        })
    }
}
