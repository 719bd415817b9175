// System probe implementation
// reason: sysinfo for cross-platform process and host monitoring
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Instant;
use sysinfo::{Pid, System};
use tracing::debug;

use launchpad_core::port::system_probe::{SystemMetrics, SystemProbe};

const BYTES_PER_MB: u64 = 1024 * 1024;

/// System probe implementation using sysinfo
///
/// CPU usage is the delta between two refreshes, so the first reading after
/// startup reports 0.
pub struct SystemProbeImpl {
    system: Mutex<System>,
    pid: Option<Pid>,
    started: Instant,
}

impl SystemProbeImpl {
    pub fn new() -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                debug!(error = %e, "Process id unavailable, process memory will read 0");
                None
            }
        };
        Self {
            system: Mutex::new(System::new()),
            pid,
            started: Instant::now(),
        }
    }
}

impl Default for SystemProbeImpl {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SystemProbe for SystemProbeImpl {
    async fn get_metrics(&self) -> SystemMetrics {
        // A poisoned lock only means another reader panicked mid-refresh
        let mut sys = self.system.lock().unwrap_or_else(|e| e.into_inner());

        sys.refresh_cpu();
        sys.refresh_memory();

        let process_memory_mb = match self.pid {
            Some(pid) if sys.refresh_process(pid) => sys
                .process(pid)
                .map(|p| p.memory() / BYTES_PER_MB)
                .unwrap_or(0),
            _ => 0,
        };

        let metrics = SystemMetrics {
            cpu_usage_percent: sys.global_cpu_info().cpu_usage(),
            process_memory_mb,
            memory_used_mb: sys.used_memory() / BYTES_PER_MB,
            memory_total_mb: sys.total_memory() / BYTES_PER_MB,
            uptime_secs: self.started.elapsed().as_secs(),
        };

        debug!(
            cpu = %metrics.cpu_usage_percent,
            rss_mb = metrics.process_memory_mb,
            mem_used_mb = metrics.memory_used_mb,
            mem_total_mb = metrics.memory_total_mb,
            "System metrics collected"
        );

        metrics
    }
}
