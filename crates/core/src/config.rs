// Orchestrator configuration (deserialized by the daemon's settings layer)

use crate::domain::catalog::default_queues;
use crate::domain::decision::DecisionThresholds;
use crate::domain::queue::QueueConfig;
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Decision engine cut-offs
    pub thresholds: DecisionThresholds,

    /// Campaign analysis window for marketing evaluation
    pub evaluation_window_days: u32,

    /// ACTIVE envelopes with an older heartbeat are reclaimed
    pub stalled_interval_ms: i64,

    /// How often the stalled watchdog sweeps
    pub watchdog_interval_ms: u64,

    /// Worker idle sleep when nothing is eligible
    pub poll_interval_ms: u64,

    /// Delay between development-monitoring polls
    pub monitor_poll_delay_ms: i64,

    /// Max wait for in-flight handlers during shutdown
    pub shutdown_drain_timeout_secs: u64,

    /// Concurrency overrides keyed by queue name or job kind
    pub concurrency: HashMap<String, usize>,

    /// Terminal envelopes older than this are cleaned by maintenance
    pub clean_completed_after_days: i64,
    pub clean_failed_after_days: i64,

    /// Deepest payload nesting accepted at enqueue
    pub max_payload_depth: usize,

    /// Where `backup` jobs write snapshots (`~` expanded by the daemon)
    pub backup_dir: String,

    /// Register the built-in recurring triggers
    pub scheduler_enabled: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            thresholds: DecisionThresholds::default(),
            evaluation_window_days: 7,
            stalled_interval_ms: 60_000,
            watchdog_interval_ms: 30_000,
            poll_interval_ms: 1_000,
            monitor_poll_delay_ms: 5 * 60 * 1_000,
            shutdown_drain_timeout_secs: 30,
            concurrency: HashMap::new(),
            clean_completed_after_days: 7,
            clean_failed_after_days: 30,
            max_payload_depth: 32,
            backup_dir: "~/.launchpad/backups".to_string(),
            scheduler_enabled: true,
        }
    }
}

impl OrchestratorConfig {
    pub fn validate(&self) -> Result<()> {
        self.thresholds
            .validate()
            .map_err(|e| AppError::Config(e.to_string()))?;

        if self.stalled_interval_ms <= 0 {
            return Err(AppError::Config(
                "stalled_interval_ms must be positive".to_string(),
            ));
        }
        if self.monitor_poll_delay_ms <= 0 {
            return Err(AppError::Config(
                "monitor_poll_delay_ms must be positive".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 || self.watchdog_interval_ms == 0 {
            return Err(AppError::Config(
                "poll and watchdog intervals must be positive".to_string(),
            ));
        }
        if let Some((name, _)) = self.concurrency.iter().find(|(_, c)| **c == 0) {
            return Err(AppError::Config(format!(
                "concurrency override for '{}' must be at least 1",
                name
            )));
        }
        Ok(())
    }

    /// Catalog queues with queue-level concurrency overrides applied
    pub fn queues(&self) -> Vec<QueueConfig> {
        default_queues()
            .into_iter()
            .map(|mut queue| {
                if let Some(c) = self.concurrency.get(&queue.name) {
                    queue.concurrency = *c;
                }
                queue
            })
            .collect()
    }

    /// Ceiling for one kind: kind override, else the queue's
    pub fn concurrency_for(&self, queue: &QueueConfig, kind: &str) -> usize {
        self.concurrency
            .get(kind)
            .copied()
            .unwrap_or(queue.concurrency)
            .max(1)
    }
}
