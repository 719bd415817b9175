// Worker pool - owns every worker and the stalled watchdog

use super::shutdown::{shutdown_channel, ShutdownSender};
use super::watchdog::StalledWatchdog;
use super::{JobHandler, Worker, WorkerSettings};
use crate::application::queue_store::QueueStore;
use crate::error::{AppError, Result};
use crate::port::TimeProvider;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

struct Running {
    sender: ShutdownSender,
    workers: Vec<JoinHandle<Result<()>>>,
    watchdog: JoinHandle<()>,
}

/// Registered kinds and their workers
pub struct WorkerPool {
    store: Arc<QueueStore>,
    time_provider: Arc<dyn TimeProvider>,
    settings: WorkerSettings,
    stalled_interval_ms: i64,
    watchdog_interval: Duration,
    workers: Mutex<Vec<Arc<Worker>>>,
    running: Mutex<Option<Running>>,
}

impl WorkerPool {
    pub fn new(
        store: Arc<QueueStore>,
        time_provider: Arc<dyn TimeProvider>,
        settings: WorkerSettings,
        stalled_interval_ms: i64,
        watchdog_interval: Duration,
    ) -> Self {
        Self {
            store,
            time_provider,
            settings,
            stalled_interval_ms,
            watchdog_interval,
            workers: Mutex::new(Vec::new()),
            running: Mutex::new(None),
        }
    }

    /// Bind a handler to a kind with its own concurrency ceiling
    pub fn register(
        &self,
        kind: &str,
        concurrency: usize,
        handler: Arc<dyn JobHandler>,
    ) -> Result<()> {
        let queue = self.store.queue_for_kind(kind)?.name.clone();
        let mut workers = self.lock_workers()?;
        if workers.iter().any(|w| w.kind() == kind) {
            return Err(AppError::Conflict(format!(
                "a handler is already registered for '{}'",
                kind
            )));
        }
        workers.push(Arc::new(Worker::new(
            queue.clone(),
            kind,
            concurrency,
            handler,
            Arc::clone(&self.store),
            Arc::clone(&self.time_provider),
            self.settings.clone(),
        )));
        info!(queue = %queue, kind = %kind, concurrency = concurrency, "Handler registered");
        Ok(())
    }

    pub fn registered_kinds(&self) -> Vec<String> {
        match self.workers.lock() {
            Ok(workers) => workers.iter().map(|w| w.kind().to_string()).collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().map(|r| r.is_some()).unwrap_or(false)
    }

    /// Spawn every worker and the watchdog
    pub fn start(&self) -> Result<()> {
        let mut running = self
            .running
            .lock()
            .map_err(|_| AppError::Internal("worker pool lock poisoned".to_string()))?;
        if running.is_some() {
            return Err(AppError::InvalidState("worker pool already running".to_string()));
        }

        let (sender, _token) = shutdown_channel();
        let workers: Vec<JoinHandle<Result<()>>> = self
            .lock_workers()?
            .iter()
            .map(|w| tokio::spawn(Arc::clone(w).run(sender.token())))
            .collect();
        let watchdog = Arc::new(StalledWatchdog::new(
            Arc::clone(&self.store),
            Arc::clone(&self.time_provider),
            self.stalled_interval_ms,
            self.watchdog_interval,
        ));
        let watchdog = tokio::spawn(watchdog.run(sender.token()));

        info!(workers = workers.len(), "Worker pool started");
        *running = Some(Running {
            sender,
            workers,
            watchdog,
        });
        Ok(())
    }

    /// Stop dispatch and wait for workers to drain. No-op when stopped.
    pub async fn close(&self) {
        let running = match self.running.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };
        let Some(running) = running else {
            return;
        };

        running.sender.shutdown();
        for joined in futures::future::join_all(running.workers).await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(error = %e, "Worker exited with error"),
                Err(e) => error!(error = %e, "Worker task failed"),
            }
        }
        if let Err(e) = running.watchdog.await {
            error!(error = %e, "Watchdog task failed");
        }
        info!("Worker pool closed");
    }

    fn lock_workers(&self) -> Result<std::sync::MutexGuard<'_, Vec<Arc<Worker>>>> {
        self.workers
            .lock()
            .map_err(|_| AppError::Internal("worker registry lock poisoned".to_string()))
    }
}
