// SQLite JobRepository Implementation

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use launchpad_core::domain::{
    BackoffPolicy, Job, JobId, JobKind, JobPayload, JobState, QueueConfig, RepeatSpec,
};
use launchpad_core::error::{AppError, Result};
use launchpad_core::port::{JobRepository, TimeProvider};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

pub struct SqliteJobRepository {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteJobRepository {
    pub fn new(pool: SqlitePool, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            pool,
            time_provider,
        }
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

fn to_json_opt<T: serde::Serialize>(value: Option<&T>) -> Result<Option<String>> {
    value.map(to_json).transpose()
}

#[async_trait]
impl JobRepository for SqliteJobRepository {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn register_queue(&self, queue: &QueueConfig) -> Result<()> {
        // Re-registration refreshes the config and keeps the pause flag
        sqlx::query(
            r#"
            INSERT INTO queues (name, config, paused, registered_at)
            VALUES (?, ?, 0, ?)
            ON CONFLICT(name) DO UPDATE SET config = excluded.config
            "#,
        )
        .bind(&queue.name)
        .bind(to_json(queue)?)
        .bind(self.time_provider.now_millis())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        debug!(queue = %queue.name, "Queue registered");
        Ok(())
    }

    async fn set_paused(&self, queue: &str, paused: bool) -> Result<()> {
        let result = sqlx::query("UPDATE queues SET paused = ? WHERE name = ?")
            .bind(paused)
            .bind(queue)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("queue {}", queue)));
        }
        Ok(())
    }

    async fn is_paused(&self, queue: &str) -> Result<bool> {
        let paused: Option<bool> = sqlx::query_scalar("SELECT paused FROM queues WHERE name = ?")
            .bind(queue)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(paused.unwrap_or(false))
    }

    async fn insert(&self, job: &Job) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO jobs (
                id, queue, kind, payload, priority, state,
                attempts, max_attempts, backoff,
                run_at, repeat,
                created_at, started_at, finished_at, heartbeat_at,
                failed_reason, result
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&job.id)
        .bind(&job.queue)
        .bind(job.kind.as_str())
        .bind(job.payload.as_value().to_string())
        .bind(job.priority)
        .bind(job.state.as_str())
        .bind(job.attempts)
        .bind(job.max_attempts)
        .bind(to_json(&job.backoff)?)
        .bind(job.run_at)
        .bind(to_json_opt(job.repeat.as_ref())?)
        .bind(job.created_at)
        .bind(job.started_at)
        .bind(job.finished_at)
        .bind(job.heartbeat_at)
        .bind(&job.failed_reason)
        .bind(to_json_opt(job.result.as_ref())?)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn find_by_id(&self, id: &JobId) -> Result<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(JobRow::into_job).transpose()
    }

    async fn update(&self, job: &Job) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET state = ?, attempts = ?, run_at = ?, repeat = ?,
                started_at = ?, finished_at = ?, heartbeat_at = ?,
                failed_reason = ?, result = ?
            WHERE id = ?
            "#,
        )
        .bind(job.state.as_str())
        .bind(job.attempts)
        .bind(job.run_at)
        .bind(to_json_opt(job.repeat.as_ref())?)
        .bind(job.started_at)
        .bind(job.finished_at)
        .bind(job.heartbeat_at)
        .bind(&job.failed_reason)
        .bind(to_json_opt(job.result.as_ref())?)
        .bind(&job.id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("job {}", job.id)));
        }
        Ok(())
    }

    async fn update_claimed(&self, job: &Job, claimed_at: i64) -> Result<bool> {
        // Compare-and-set: the watchdog may have requeued the claim meanwhile
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET state = ?, attempts = ?, run_at = ?, repeat = ?,
                started_at = ?, finished_at = ?, heartbeat_at = ?,
                failed_reason = ?, result = ?
            WHERE id = ? AND state = 'ACTIVE' AND started_at = ?
            "#,
        )
        .bind(job.state.as_str())
        .bind(job.attempts)
        .bind(job.run_at)
        .bind(to_json_opt(job.repeat.as_ref())?)
        .bind(job.started_at)
        .bind(job.finished_at)
        .bind(job.heartbeat_at)
        .bind(&job.failed_reason)
        .bind(to_json_opt(job.result.as_ref())?)
        .bind(&job.id)
        .bind(claimed_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn pop_next(&self, queue: &str, kind: &str, now_millis: i64) -> Result<Option<Job>> {
        // Single statement, so two workers can never claim the same row
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            UPDATE jobs
            SET state = 'ACTIVE', started_at = ?, heartbeat_at = ?
            WHERE id = (
                SELECT j.id FROM jobs j
                WHERE j.queue = ? AND j.kind = ?
                  AND (
                      j.state = 'WAITING'
                      OR (j.state = 'DELAYED' AND (j.run_at IS NULL OR j.run_at <= ?))
                  )
                  AND NOT EXISTS (
                      SELECT 1 FROM queues q WHERE q.name = j.queue AND q.paused = 1
                  )
                ORDER BY j.priority DESC, j.created_at ASC, j.rowid ASC
                LIMIT 1
            )
            AND state IN ('WAITING', 'DELAYED')
            RETURNING *
            "#,
        )
        .bind(now_millis)
        .bind(now_millis)
        .bind(queue)
        .bind(kind)
        .bind(now_millis)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(JobRow::into_job).transpose()
    }

    async fn touch(&self, id: &JobId, now_millis: i64) -> Result<bool> {
        let result =
            sqlx::query("UPDATE jobs SET heartbeat_at = ? WHERE id = ? AND state = 'ACTIVE'")
                .bind(now_millis)
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_by_state(&self, queue: &str, state: JobState) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE queue = ? AND state = ?")
                .bind(queue)
                .bind(state.as_str())
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        Ok(count)
    }

    async fn find_stalled(&self, queue: &str, heartbeat_before: i64) -> Result<Vec<Job>> {
        let rows: Vec<JobRow> = sqlx::query_as(
            r#"
            SELECT * FROM jobs
            WHERE queue = ? AND state = 'ACTIVE' AND COALESCE(heartbeat_at, 0) < ?
            ORDER BY started_at ASC
            "#,
        )
        .bind(queue)
        .bind(heartbeat_before)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(JobRow::into_job).collect()
    }

    async fn delete_pending(&self, id: &JobId) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM jobs WHERE id = ? AND state IN ('WAITING', 'DELAYED')")
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn clean(
        &self,
        queue: &str,
        kind: Option<&str>,
        state: JobState,
        finished_before: i64,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM jobs
            WHERE queue = ? AND state = ?
              AND (? IS NULL OR kind = ?)
              AND finished_at IS NOT NULL AND finished_at < ?
            "#,
        )
        .bind(queue)
        .bind(state.as_str())
        .bind(kind)
        .bind(kind)
        .bind(finished_before)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn trim(&self, queue: &str, state: JobState, keep: usize) -> Result<u64> {
        let keep = i64::try_from(keep).unwrap_or(i64::MAX);
        let result = sqlx::query(
            r#"
            DELETE FROM jobs
            WHERE queue = ? AND state = ?
              AND id NOT IN (
                  SELECT id FROM jobs
                  WHERE queue = ? AND state = ?
                  ORDER BY finished_at DESC, id DESC
                  LIMIT ?
              )
            "#,
        )
        .bind(queue)
        .bind(state.as_str())
        .bind(queue)
        .bind(state.as_str())
        .bind(keep)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn close(&self) {
        self.pool.close().await;
        debug!("SQLite pool closed");
    }
}

/// SQLite row representation
#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: String,
    queue: String,
    kind: String,
    payload: String,
    priority: i32,
    state: String,
    attempts: i32,
    max_attempts: i32,
    backoff: String,
    run_at: Option<i64>,
    repeat: Option<String>,
    created_at: i64,
    started_at: Option<i64>,
    finished_at: Option<i64>,
    heartbeat_at: Option<i64>,
    failed_reason: Option<String>,
    result: Option<String>,
}

impl JobRow {
    /// Rows written by this adapter always decode; anything else is corruption
    fn into_job(self) -> Result<Job> {
        let state = JobState::from_str(&self.state)?;
        let payload: serde_json::Value = serde_json::from_str(&self.payload)?;
        let backoff: BackoffPolicy = serde_json::from_str(&self.backoff)?;
        let repeat: Option<RepeatSpec> = self
            .repeat
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;
        let result: Option<serde_json::Value> = self
            .result
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;

        Ok(Job {
            id: self.id,
            queue: self.queue,
            kind: JobKind::new(self.kind),
            payload: JobPayload::new(payload),
            priority: self.priority,
            state,
            attempts: self.attempts,
            max_attempts: self.max_attempts,
            backoff,
            run_at: self.run_at,
            repeat,
            created_at: self.created_at,
            started_at: self.started_at,
            finished_at: self.finished_at,
            heartbeat_at: self.heartbeat_at,
            failed_reason: self.failed_reason,
            result,
        })
    }
}
