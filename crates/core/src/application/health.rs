// Queue health assessment

use crate::application::queue_store::QueueStore;
use crate::domain::QueueStats;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Failed jobs above this mark a queue degraded
pub const MAX_FAILED: i64 = 10;
/// Backlog size above which the waiting/active balance is checked
pub const MAX_BACKLOG: i64 = 100;
/// Allowed waiting-to-active ratio for a large backlog
pub const MAX_BACKLOG_RATIO: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    /// Orchestrator not running or store unreachable
    Unhealthy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueHealth {
    pub queue: String,
    pub status: HealthStatus,
    pub issues: Vec<String>,
    pub stats: QueueStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub queues: Vec<QueueHealth>,
    pub checked_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthReport {
    pub fn from_queues(queues: Vec<QueueHealth>, checked_at: i64) -> Self {
        let status = if queues.iter().any(|q| q.status != HealthStatus::Healthy) {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };
        Self {
            status,
            queues,
            checked_at,
            error: None,
        }
    }

    pub fn unhealthy(error: impl Into<String>, checked_at: i64) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            queues: Vec::new(),
            checked_at,
            error: Some(error.into()),
        }
    }

    pub fn degraded_queues(&self) -> impl Iterator<Item = &QueueHealth> {
        self.queues
            .iter()
            .filter(|q| q.status != HealthStatus::Healthy)
    }
}

/// Degraded when too many failures pile up or a large backlog is not
/// being worked off
pub fn assess_queue(stats: QueueStats) -> QueueHealth {
    let mut issues = Vec::new();
    if stats.failed > MAX_FAILED {
        issues.push(format!("{} failed jobs (limit {})", stats.failed, MAX_FAILED));
    }
    if stats.waiting > MAX_BACKLOG {
        if stats.active == 0 {
            issues.push(format!("{} waiting jobs and none active", stats.waiting));
        } else if stats.waiting > stats.active * MAX_BACKLOG_RATIO {
            issues.push(format!(
                "{} waiting jobs for {} active",
                stats.waiting, stats.active
            ));
        }
    }
    QueueHealth {
        queue: stats.queue.clone(),
        status: if issues.is_empty() {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        },
        issues,
        stats,
    }
}

/// Health of every queue. Store errors yield an unhealthy report.
pub async fn evaluate(store: &QueueStore, now_millis: i64) -> HealthReport {
    match store.get_all_stats().await {
        Ok(all) => {
            let report =
                HealthReport::from_queues(all.into_iter().map(assess_queue).collect(), now_millis);
            for queue in report.degraded_queues() {
                warn!(queue = %queue.queue, issues = ?queue.issues, "Queue degraded");
            }
            report
        }
        Err(e) => {
            warn!(error = %e, "Health check could not read queue stats");
            HealthReport::unhealthy(e.to_string(), now_millis)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(waiting: i64, active: i64, failed: i64) -> QueueStats {
        QueueStats {
            queue: "marketing".to_string(),
            waiting,
            active,
            failed,
            ..Default::default()
        }
    }

    #[test]
    fn test_quiet_queue_is_healthy() {
        assert_eq!(assess_queue(stats(3, 0, 2)).status, HealthStatus::Healthy);
    }

    #[test]
    fn test_failures_degrade() {
        assert_eq!(assess_queue(stats(0, 0, 11)).status, HealthStatus::Degraded);
        assert_eq!(assess_queue(stats(0, 0, 10)).status, HealthStatus::Healthy);
    }

    #[test]
    fn test_stuck_backlog_degrades() {
        assert_eq!(assess_queue(stats(101, 0, 0)).status, HealthStatus::Degraded);
        assert_eq!(assess_queue(stats(150, 10, 0)).status, HealthStatus::Healthy);
        assert_eq!(assess_queue(stats(150, 5, 0)).status, HealthStatus::Degraded);
    }

    #[test]
    fn test_report_rolls_up() {
        let report = HealthReport::from_queues(
            vec![assess_queue(stats(1, 1, 0)), assess_queue(stats(0, 0, 30))],
            42,
        );
        assert_eq!(report.status, HealthStatus::Degraded);
        assert_eq!(report.degraded_queues().count(), 1);
    }
}
