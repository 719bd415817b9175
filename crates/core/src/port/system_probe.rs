// Process resource probe port (reported in system stats)
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Resource usage of the orchestrator process and its host
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemMetrics {
    pub cpu_usage_percent: f32,
    pub process_memory_mb: u64,
    pub memory_used_mb: u64,
    pub memory_total_mb: u64,
    pub uptime_secs: u64,
}

/// System probe port for resource monitoring
#[async_trait]
pub trait SystemProbe: Send + Sync {
    /// Get current metrics
    ///
    /// # Example
    /// ```text
    /// let metrics = probe.get_metrics().await;
    /// println!("rss: {} MB", metrics.process_memory_mb);
    /// ```
    async fn get_metrics(&self) -> SystemMetrics;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Mock SystemProbe for testing
    pub struct MockSystemProbe {
        metrics: Arc<Mutex<SystemMetrics>>,
    }

    impl MockSystemProbe {
        pub fn new(cpu_usage_percent: f32) -> Self {
            Self {
                metrics: Arc::new(Mutex::new(SystemMetrics {
                    cpu_usage_percent,
                    process_memory_mb: 64,
                    memory_used_mb: 1024,
                    memory_total_mb: 2048,
                    uptime_secs: 10,
                })),
            }
        }

        pub fn set_cpu_usage(&self, cpu_usage_percent: f32) {
            self.metrics.lock().unwrap().cpu_usage_percent = cpu_usage_percent;
        }
    }

    #[async_trait]
    impl SystemProbe for MockSystemProbe {
        async fn get_metrics(&self) -> SystemMetrics {
            self.metrics.lock().unwrap().clone()
        }
    }
}
