// Job Repository Port (Interface)

use crate::domain::{Job, JobId, JobState, QueueConfig};
use crate::error::Result;
use async_trait::async_trait;

/// Durable store for job envelopes and queue registrations
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Cheap round trip proving the store is reachable
    async fn ping(&self) -> Result<()>;

    /// Register (or refresh) a queue. Pause state survives re-registration.
    async fn register_queue(&self, queue: &QueueConfig) -> Result<()>;

    async fn set_paused(&self, queue: &str, paused: bool) -> Result<()>;

    async fn is_paused(&self, queue: &str) -> Result<bool>;

    /// Insert a new job
    async fn insert(&self, job: &Job) -> Result<()>;

    /// Find job by ID
    async fn find_by_id(&self, id: &JobId) -> Result<Option<Job>>;

    /// Unconditional update
    async fn update(&self, job: &Job) -> Result<()>;

    /// Update a job only while it is still the ACTIVE claim started at
    /// `claimed_at`. Returns false when the claim was reclaimed meanwhile.
    async fn update_claimed(&self, job: &Job, claimed_at: i64) -> Result<bool>;

    /// Atomically claim the next eligible job of `kind` in `queue`
    ///
    /// Eligible: WAITING, or DELAYED with `run_at <= now`. Order: priority
    /// desc, then enqueue time. Paused queues yield nothing. The claimed job
    /// comes back ACTIVE with `started_at = heartbeat_at = now`.
    async fn pop_next(&self, queue: &str, kind: &str, now_millis: i64) -> Result<Option<Job>>;

    /// Refresh the heartbeat of an ACTIVE job
    async fn touch(&self, id: &JobId, now_millis: i64) -> Result<bool>;

    /// Count jobs by state
    async fn count_by_state(&self, queue: &str, state: JobState) -> Result<i64>;

    /// ACTIVE jobs whose heartbeat is older than `heartbeat_before`
    async fn find_stalled(&self, queue: &str, heartbeat_before: i64) -> Result<Vec<Job>>;

    /// Delete a job that has not started (WAITING or DELAYED)
    async fn delete_pending(&self, id: &JobId) -> Result<bool>;

    /// Delete terminal jobs finished before `finished_before`
    async fn clean(
        &self,
        queue: &str,
        kind: Option<&str>,
        state: JobState,
        finished_before: i64,
    ) -> Result<u64>;

    /// Keep only the newest `keep` jobs in a terminal state
    async fn trim(&self, queue: &str, state: JobState, keep: usize) -> Result<u64>;

    /// Release store resources
    async fn close(&self) {}
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    /// In-memory store. Vector order is enqueue order.
    #[derive(Default)]
    pub struct InMemoryJobRepository {
        jobs: Mutex<Vec<Job>>,
        queues: Mutex<HashMap<String, QueueConfig>>,
        paused: Mutex<HashSet<String>>,
        unavailable: AtomicBool,
        closed: AtomicBool,
    }

    impl InMemoryJobRepository {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make every call fail with a store error
        pub fn set_unavailable(&self, unavailable: bool) {
            self.unavailable.store(unavailable, Ordering::SeqCst);
        }

        pub fn is_closed(&self) -> bool {
            self.closed.load(Ordering::SeqCst)
        }

        pub fn registered_queues(&self) -> Vec<String> {
            let mut names: Vec<String> = self.queues.lock().unwrap().keys().cloned().collect();
            names.sort();
            names
        }

        pub fn all_jobs(&self) -> Vec<Job> {
            self.jobs.lock().unwrap().clone()
        }

        pub fn jobs_of_kind(&self, kind: &str) -> Vec<Job> {
            self.jobs
                .lock()
                .unwrap()
                .iter()
                .filter(|j| j.kind.as_str() == kind)
                .cloned()
                .collect()
        }

        fn check(&self) -> Result<()> {
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(AppError::Store("store unavailable".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl JobRepository for InMemoryJobRepository {
        async fn ping(&self) -> Result<()> {
            self.check()
        }

        async fn register_queue(&self, queue: &QueueConfig) -> Result<()> {
            self.check()?;
            self.queues
                .lock()
                .unwrap()
                .insert(queue.name.clone(), queue.clone());
            Ok(())
        }

        async fn set_paused(&self, queue: &str, paused: bool) -> Result<()> {
            self.check()?;
            let mut set = self.paused.lock().unwrap();
            if paused {
                set.insert(queue.to_string());
            } else {
                set.remove(queue);
            }
            Ok(())
        }

        async fn is_paused(&self, queue: &str) -> Result<bool> {
            self.check()?;
            Ok(self.paused.lock().unwrap().contains(queue))
        }

        async fn insert(&self, job: &Job) -> Result<()> {
            self.check()?;
            let mut jobs = self.jobs.lock().unwrap();
            if jobs.iter().any(|j| j.id == job.id) {
                return Err(AppError::Conflict(format!("job {} exists", job.id)));
            }
            jobs.push(job.clone());
            Ok(())
        }

        async fn find_by_id(&self, id: &JobId) -> Result<Option<Job>> {
            self.check()?;
            Ok(self.jobs.lock().unwrap().iter().find(|j| &j.id == id).cloned())
        }

        async fn update(&self, job: &Job) -> Result<()> {
            self.check()?;
            let mut jobs = self.jobs.lock().unwrap();
            match jobs.iter_mut().find(|j| j.id == job.id) {
                Some(slot) => {
                    *slot = job.clone();
                    Ok(())
                }
                None => Err(AppError::NotFound(format!("job {}", job.id))),
            }
        }

        async fn update_claimed(&self, job: &Job, claimed_at: i64) -> Result<bool> {
            self.check()?;
            let mut jobs = self.jobs.lock().unwrap();
            match jobs.iter_mut().find(|j| j.id == job.id) {
                Some(slot)
                    if slot.state == JobState::Active && slot.started_at == Some(claimed_at) =>
                {
                    *slot = job.clone();
                    Ok(true)
                }
                _ => Ok(false),
            }
        }

        async fn pop_next(&self, queue: &str, kind: &str, now_millis: i64) -> Result<Option<Job>> {
            self.check()?;
            if self.paused.lock().unwrap().contains(queue) {
                return Ok(None);
            }
            let mut jobs = self.jobs.lock().unwrap();
            let mut best: Option<usize> = None;
            for (idx, job) in jobs.iter().enumerate() {
                if job.queue != queue || job.kind.as_str() != kind || !job.is_eligible(now_millis) {
                    continue;
                }
                best = match best {
                    None => Some(idx),
                    Some(b) => {
                        let current = &jobs[b];
                        let better = job.priority > current.priority
                            || (job.priority == current.priority
                                && job.created_at < current.created_at);
                        Some(if better { idx } else { b })
                    }
                };
            }
            let Some(idx) = best else {
                return Ok(None);
            };
            let job = &mut jobs[idx];
            job.start(now_millis)?;
            Ok(Some(job.clone()))
        }

        async fn touch(&self, id: &JobId, now_millis: i64) -> Result<bool> {
            self.check()?;
            let mut jobs = self.jobs.lock().unwrap();
            match jobs
                .iter_mut()
                .find(|j| &j.id == id && j.state == JobState::Active)
            {
                Some(job) => {
                    job.heartbeat_at = Some(now_millis);
                    Ok(true)
                }
                None => Ok(false),
            }
        }

        async fn count_by_state(&self, queue: &str, state: JobState) -> Result<i64> {
            self.check()?;
            Ok(self
                .jobs
                .lock()
                .unwrap()
                .iter()
                .filter(|j| j.queue == queue && j.state == state)
                .count() as i64)
        }

        async fn find_stalled(&self, queue: &str, heartbeat_before: i64) -> Result<Vec<Job>> {
            self.check()?;
            Ok(self
                .jobs
                .lock()
                .unwrap()
                .iter()
                .filter(|j| {
                    j.queue == queue
                        && j.state == JobState::Active
                        && j.heartbeat_at.unwrap_or(0) < heartbeat_before
                })
                .cloned()
                .collect())
        }

        async fn delete_pending(&self, id: &JobId) -> Result<bool> {
            self.check()?;
            let mut jobs = self.jobs.lock().unwrap();
            let before = jobs.len();
            jobs.retain(|j| {
                !(&j.id == id && matches!(j.state, JobState::Waiting | JobState::Delayed))
            });
            Ok(jobs.len() < before)
        }

        async fn clean(
            &self,
            queue: &str,
            kind: Option<&str>,
            state: JobState,
            finished_before: i64,
        ) -> Result<u64> {
            self.check()?;
            let mut jobs = self.jobs.lock().unwrap();
            let before = jobs.len();
            jobs.retain(|j| {
                let matches = j.queue == queue
                    && j.state == state
                    && kind.map_or(true, |k| j.kind.as_str() == k)
                    && j.finished_at.map_or(false, |at| at < finished_before);
                !matches
            });
            Ok((before - jobs.len()) as u64)
        }

        async fn trim(&self, queue: &str, state: JobState, keep: usize) -> Result<u64> {
            self.check()?;
            let mut jobs = self.jobs.lock().unwrap();
            let mut finished: Vec<(i64, String)> = jobs
                .iter()
                .filter(|j| j.queue == queue && j.state == state)
                .map(|j| (j.finished_at.unwrap_or(0), j.id.clone()))
                .collect();
            if finished.len() <= keep {
                return Ok(0);
            }
            // Newest first; everything past `keep` goes
            finished.sort_by(|a, b| b.0.cmp(&a.0));
            let doomed: HashSet<String> = finished.into_iter().skip(keep).map(|(_, id)| id).collect();
            jobs.retain(|j| !doomed.contains(&j.id));
            Ok(doomed.len() as u64)
        }

        async fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }
}
