// Store maintenance port (vacuum, backup, size stats)
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Store size statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceStats {
    pub db_size_mb: f64,
    pub db_size_bytes: i64,
    pub job_count: i64,
    pub finished_job_count: i64,
    pub fragmentation_percent: f64,
}

/// When a vacuum is worth it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceConfig {
    /// Maximum DB size before forcing VACUUM (MB)
    pub max_db_size_mb: f64,

    /// Free-page share that triggers VACUUM
    pub max_fragmentation_percent: f64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            max_db_size_mb: 1000.0,
            max_fragmentation_percent: 20.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupInfo {
    pub path: String,
    pub size_bytes: u64,
}

#[async_trait]
pub trait Maintenance: Send + Sync {
    /// Run VACUUM to reclaim space
    ///
    /// # Returns
    /// Space reclaimed in MB
    async fn vacuum(&self) -> Result<f64>;

    /// Write a consistent snapshot of the store to `path`
    async fn backup(&self, path: &str) -> Result<BackupInfo>;

    async fn get_stats(&self) -> Result<MaintenanceStats>;

    /// VACUUM only when the store is large or fragmented
    ///
    /// # Returns
    /// Space reclaimed in MB (0 when skipped)
    async fn vacuum_if_needed(&self, config: &MaintenanceConfig) -> Result<f64> {
        let stats = self.get_stats().await?;
        if stats.db_size_mb <= config.max_db_size_mb
            && stats.fragmentation_percent <= config.max_fragmentation_percent
        {
            return Ok(0.0);
        }

        let reclaimed_mb = self.vacuum().await?;
        tracing::info!(
            db_size_mb = stats.db_size_mb,
            fragmentation_percent = stats.fragmentation_percent,
            reclaimed_mb = reclaimed_mb,
            "Vacuum completed"
        );
        Ok(reclaimed_mb)
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockMaintenance {
        stats: Mutex<MaintenanceStats>,
        vacuums: AtomicU32,
        backups: Mutex<Vec<String>>,
    }

    impl MockMaintenance {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_fragmentation(&self, percent: f64) {
            self.stats.lock().unwrap().fragmentation_percent = percent;
        }

        pub fn vacuum_count(&self) -> u32 {
            self.vacuums.load(Ordering::SeqCst)
        }

        pub fn backups(&self) -> Vec<String> {
            self.backups.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Maintenance for MockMaintenance {
        async fn vacuum(&self) -> Result<f64> {
            self.vacuums.fetch_add(1, Ordering::SeqCst);
            self.stats.lock().unwrap().fragmentation_percent = 0.0;
            Ok(1.5)
        }

        async fn backup(&self, path: &str) -> Result<BackupInfo> {
            self.backups.lock().unwrap().push(path.to_string());
            Ok(BackupInfo {
                path: path.to_string(),
                size_bytes: 4096,
            })
        }

        async fn get_stats(&self) -> Result<MaintenanceStats> {
            Ok(self.stats.lock().unwrap().clone())
        }
    }
}
