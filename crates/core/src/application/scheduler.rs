//! Scheduler - wall-clock triggers that enqueue recurring work
//!
//! Each trigger runs its own timer task. A fire only enqueues and never
//! waits on the resulting job, so overlapping runs of the same workflow
//! are possible; processors check persisted state before acting.

use crate::application::queue_store::{EnqueueOptions, JobHandle, QueueStore};
use crate::application::worker::{shutdown_channel, ShutdownSender, ShutdownToken};
use crate::domain::catalog::kinds;
use crate::domain::Schedule;
use crate::error::{AppError, Result};
use crate::port::TimeProvider;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Built-in triggers: (name, six-field cron in UTC, kind)
pub const BUILTIN_TRIGGERS: [(&str, &str, &str); 8] = [
    ("daily-cleanup", "0 0 3 * * *", kinds::CLEANUP),
    ("weekly-backup", "0 0 2 * * Sun", kinds::BACKUP),
    ("daily-analytics", "0 0 1 * * *", kinds::COLLECT_ALL_ANALYTICS),
    ("weekly-report", "0 0 9 * * Mon", kinds::WEEKLY_REPORT),
    ("daily-campaign-monitoring", "0 0 10 * * *", kinds::MONITOR_CAMPAIGNS),
    ("biweekly-optimization", "0 0 11 1,15 * *", kinds::OPTIMIZE_CAMPAIGNS),
    ("daily-payment-retry", "0 0 12 * * *", kinds::RETRY_FAILED_PAYMENTS),
    ("health-check", "0 */5 * * * *", kinds::HEALTH_CHECK),
];

/// Listing entry for one trigger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledJobInfo {
    pub name: String,
    pub schedule: String,
    pub kind: String,
    pub running: bool,
    pub next_run: Option<i64>,
    pub last_fired: Option<i64>,
    pub fire_count: u64,
}

struct TriggerDef {
    name: String,
    schedule: Schedule,
    kind: String,
    payload: serde_json::Value,
    options: EnqueueOptions,
    last_fired: AtomicI64,
    fire_count: AtomicU64,
}

struct Trigger {
    def: Arc<TriggerDef>,
    running: Option<(ShutdownSender, JoinHandle<()>)>,
}

pub struct Scheduler {
    store: Arc<QueueStore>,
    time_provider: Arc<dyn TimeProvider>,
    triggers: Mutex<BTreeMap<String, Trigger>>,
}

impl Scheduler {
    pub fn new(store: Arc<QueueStore>, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            store,
            time_provider,
            triggers: Mutex::new(BTreeMap::new()),
        }
    }

    /// Register and start the built-in triggers
    pub fn initialize(&self) -> Result<()> {
        for (name, expression, kind) in BUILTIN_TRIGGERS {
            self.add_scheduled_job(
                name,
                Schedule::cron(expression)?,
                kind,
                serde_json::json!({ "trigger": name }),
                EnqueueOptions::default(),
            )?;
        }
        info!(triggers = BUILTIN_TRIGGERS.len(), "Scheduler initialized");
        Ok(())
    }

    /// Register a trigger and start it
    pub fn add_scheduled_job(
        &self,
        name: &str,
        schedule: Schedule,
        kind: &str,
        payload: serde_json::Value,
        options: EnqueueOptions,
    ) -> Result<()> {
        if name.trim().is_empty() {
            return Err(AppError::Validation("trigger name must not be empty".to_string()));
        }
        self.store.queue_for_kind(kind)?;

        let mut triggers = self.lock()?;
        if triggers.contains_key(name) {
            return Err(AppError::Conflict(format!("trigger '{}' already exists", name)));
        }
        let def = Arc::new(TriggerDef {
            name: name.to_string(),
            schedule,
            kind: kind.to_string(),
            payload,
            options,
            last_fired: AtomicI64::new(0),
            fire_count: AtomicU64::new(0),
        });
        let running = Some(self.spawn(Arc::clone(&def)));
        debug!(trigger = %name, schedule = %def.schedule, kind = %kind, "Trigger added");
        triggers.insert(name.to_string(), Trigger { def, running });
        Ok(())
    }

    /// Stop and forget a trigger. Returns false if unknown.
    pub fn remove_scheduled_job(&self, name: &str) -> Result<bool> {
        let removed = self.lock()?.remove(name);
        match removed {
            Some(trigger) => {
                if let Some((stop, _)) = trigger.running {
                    stop.shutdown();
                }
                info!(trigger = %name, "Trigger removed");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn start_job(&self, name: &str) -> Result<()> {
        let mut triggers = self.lock()?;
        let trigger = triggers
            .get_mut(name)
            .ok_or_else(|| AppError::NotFound(format!("trigger '{}'", name)))?;
        if trigger.running.is_none() {
            trigger.running = Some(self.spawn(Arc::clone(&trigger.def)));
            debug!(trigger = %name, "Trigger started");
        }
        Ok(())
    }

    pub fn stop_job(&self, name: &str) -> Result<()> {
        let mut triggers = self.lock()?;
        let trigger = triggers
            .get_mut(name)
            .ok_or_else(|| AppError::NotFound(format!("trigger '{}'", name)))?;
        if let Some((stop, _)) = trigger.running.take() {
            stop.shutdown();
            debug!(trigger = %name, "Trigger stopped");
        }
        Ok(())
    }

    pub fn get_scheduled_jobs(&self) -> Vec<ScheduledJobInfo> {
        let now = self.time_provider.now_millis();
        let Ok(triggers) = self.triggers.lock() else {
            return Vec::new();
        };
        triggers
            .values()
            .map(|t| {
                let last_fired = t.def.last_fired.load(Ordering::SeqCst);
                ScheduledJobInfo {
                    name: t.def.name.clone(),
                    schedule: t.def.schedule.to_string(),
                    kind: t.def.kind.clone(),
                    running: t.running.is_some(),
                    next_run: t
                        .running
                        .as_ref()
                        .and_then(|_| t.def.schedule.next_after(now)),
                    last_fired: (last_fired > 0).then_some(last_fired),
                    fire_count: t.def.fire_count.load(Ordering::SeqCst),
                }
            })
            .collect()
    }

    /// Fire a trigger now (outside its schedule)
    pub async fn fire(&self, name: &str) -> Result<JobHandle> {
        let def = self
            .lock()?
            .get(name)
            .map(|t| Arc::clone(&t.def))
            .ok_or_else(|| AppError::NotFound(format!("trigger '{}'", name)))?;
        fire(&self.store, &def, self.time_provider.now_millis()).await
    }

    /// Stop and drop every trigger, waiting for timer tasks to exit
    pub async fn shutdown(&self) {
        let drained: Vec<Trigger> = match self.triggers.lock() {
            Ok(mut triggers) => std::mem::take(&mut *triggers).into_values().collect(),
            Err(_) => Vec::new(),
        };
        let count = drained.len();
        for trigger in drained {
            if let Some((stop, handle)) = trigger.running {
                stop.shutdown();
                if let Err(e) = handle.await {
                    warn!(trigger = %trigger.def.name, error = %e, "Trigger task failed");
                }
            }
        }
        info!(triggers = count, "Scheduler shut down");
    }

    fn spawn(&self, def: Arc<TriggerDef>) -> (ShutdownSender, JoinHandle<()>) {
        let (stop, token) = shutdown_channel();
        let handle = tokio::spawn(run_trigger(
            Arc::clone(&self.store),
            Arc::clone(&self.time_provider),
            def,
            token,
        ));
        (stop, handle)
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, Trigger>>> {
        self.triggers
            .lock()
            .map_err(|_| AppError::Internal("scheduler lock poisoned".to_string()))
    }
}

async fn run_trigger(
    store: Arc<QueueStore>,
    time_provider: Arc<dyn TimeProvider>,
    def: Arc<TriggerDef>,
    mut token: ShutdownToken,
) {
    loop {
        let now = time_provider.now_millis();
        let Some(next) = def.schedule.next_after(now) else {
            warn!(trigger = %def.name, "Schedule has no future fire time, stopping");
            break;
        };
        let wait = Duration::from_millis((next - now).max(0) as u64);
        tokio::select! {
            _ = sleep(wait) => {},
            _ = token.wait() => break,
        }

        // Fire-and-forget: a slow enqueue never delays the next tick
        let store = Arc::clone(&store);
        let def = Arc::clone(&def);
        let fired_at = time_provider.now_millis();
        tokio::spawn(async move {
            if let Err(e) = fire(&store, &def, fired_at).await {
                error!(trigger = %def.name, kind = %def.kind, error = %e, "Scheduled enqueue failed");
            }
        });
    }
}

async fn fire(store: &QueueStore, def: &TriggerDef, fired_at: i64) -> Result<JobHandle> {
    def.last_fired.store(fired_at, Ordering::SeqCst);
    def.fire_count.fetch_add(1, Ordering::SeqCst);
    let handle = store
        .enqueue(&def.kind, def.payload.clone(), def.options.clone())
        .await?;
    debug!(trigger = %def.name, job_id = %handle.id, "Trigger fired");
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::{default_queues, queues};
    use crate::port::id_provider::mocks::SequentialIdProvider;
    use crate::port::job_repository::mocks::InMemoryJobRepository;
    use crate::port::time_provider::SystemTimeProvider;
    use serde_json::json;

    fn scheduler() -> (Scheduler, Arc<QueueStore>, Arc<InMemoryJobRepository>) {
        let repo = Arc::new(InMemoryJobRepository::new());
        let time: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
        let store = Arc::new(
            QueueStore::new(
                repo.clone(),
                Arc::clone(&time),
                Arc::new(SequentialIdProvider::new("job")),
                default_queues(),
                16,
            )
            .unwrap(),
        );
        (Scheduler::new(store.clone(), time), store, repo)
    }

    #[tokio::test]
    async fn test_initialize_registers_builtins() {
        let (scheduler, _, _) = scheduler();
        scheduler.initialize().unwrap();

        let jobs = scheduler.get_scheduled_jobs();
        assert_eq!(jobs.len(), BUILTIN_TRIGGERS.len());
        assert!(jobs.iter().all(|j| j.running && j.next_run.is_some()));
        scheduler.shutdown().await;
        assert!(scheduler.get_scheduled_jobs().is_empty());
    }

    #[tokio::test]
    async fn test_interval_trigger_enqueues() {
        let (scheduler, store, _) = scheduler();
        scheduler
            .add_scheduled_job(
                "fast-health",
                Schedule::every_ms(30).unwrap(),
                kinds::HEALTH_CHECK,
                json!({}),
                EnqueueOptions::default(),
            )
            .unwrap();

        tokio::time::timeout(Duration::from_secs(5), async {
            while store.get_stats(queues::MAINTENANCE).await.unwrap().waiting < 2 {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        scheduler.stop_job("fast-health").unwrap();
        let info = &scheduler.get_scheduled_jobs()[0];
        assert!(!info.running);
        assert!(info.fire_count >= 2);
        scheduler.shutdown().await;
    }

    #[tokio::test]
    async fn test_duplicate_and_unknown_kind_rejected() {
        let (scheduler, _, _) = scheduler();
        let every = || Schedule::every_ms(60_000).unwrap();
        scheduler
            .add_scheduled_job("t", every(), kinds::CLEANUP, json!({}), EnqueueOptions::default())
            .unwrap();
        assert!(matches!(
            scheduler.add_scheduled_job("t", every(), kinds::CLEANUP, json!({}), EnqueueOptions::default()),
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            scheduler.add_scheduled_job("u", every(), "nope", json!({}), EnqueueOptions::default()),
            Err(AppError::InvalidKind(_))
        ));
        assert!(scheduler.remove_scheduled_job("t").unwrap());
        assert!(!scheduler.remove_scheduled_job("t").unwrap());
        scheduler.shutdown().await;
    }

    #[tokio::test]
    async fn test_fire_enqueues_immediately() {
        let (scheduler, _, repo) = scheduler();
        scheduler.initialize().unwrap();
        let handle = scheduler.fire("daily-payment-retry").await.unwrap();
        assert_eq!(handle.queue, queues::PAYMENTS);
        assert_eq!(repo.jobs_of_kind(kinds::RETRY_FAILED_PAYMENTS).len(), 1);
        scheduler.shutdown().await;
    }

    #[tokio::test]
    async fn test_failed_fire_does_not_stop_trigger() {
        let (scheduler, _, repo) = scheduler();
        repo.set_unavailable(true);
        scheduler
            .add_scheduled_job(
                "flaky",
                Schedule::every_ms(20).unwrap(),
                kinds::CLEANUP,
                json!({}),
                EnqueueOptions::default(),
            )
            .unwrap();
        sleep(Duration::from_millis(80)).await;
        repo.set_unavailable(false);

        tokio::time::timeout(Duration::from_secs(5), async {
            while repo.jobs_of_kind(kinds::CLEANUP).is_empty() {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
        scheduler.shutdown().await;
    }
}
