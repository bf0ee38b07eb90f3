//! Durable job queue repository.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value as JsonValue;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use mentora_core::{
    new_v7, EnqueueOptions, Error, Job, JobRepository, JobStatus, QueueCounts, QueueName, Result,
};

/// PostgreSQL implementation of [`JobRepository`].
///
/// Jobs are leased with `FOR UPDATE SKIP LOCKED` so concurrent workers never
/// claim the same row, and deduplicated enqueue uses an atomic
/// `INSERT … WHERE NOT EXISTS` to avoid check-then-insert races.
#[derive(Clone)]
pub struct PgJobRepository {
    pool: Pool<Postgres>,
}

const JOB_COLUMNS: &str = "id, queue::text, entity_id, status::text, payload, error_message, \
     retry_count, max_retries, remove_on_complete, scheduled_at, \
     created_at, started_at, completed_at";

impl PgJobRepository {
    /// Create a new PgJobRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Parse a job row into a Job struct.
    fn parse_job_row(row: sqlx::postgres::PgRow) -> Job {
        let queue: String = row.get("queue");
        let status: String = row.get("status");
        Job {
            id: row.get("id"),
            queue: QueueName::parse(&queue).unwrap_or(QueueName::ChapterContent),
            entity_id: row.get("entity_id"),
            status: JobStatus::parse(&status).unwrap_or(JobStatus::Pending),
            payload: row.get("payload"),
            error_message: row.get("error_message"),
            retry_count: row.get("retry_count"),
            max_retries: row.get("max_retries"),
            remove_on_complete: row.get("remove_on_complete"),
            scheduled_at: row.get("scheduled_at"),
            created_at: row.get("created_at"),
            started_at: row.get("started_at"),
            completed_at: row.get("completed_at"),
        }
    }
}

#[async_trait]
impl JobRepository for PgJobRepository {
    async fn enqueue(
        &self,
        queue: QueueName,
        entity_id: Option<Uuid>,
        payload: Option<JsonValue>,
        opts: EnqueueOptions,
    ) -> Result<Uuid> {
        let job_id = new_v7();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO job_queue \
                 (id, queue, entity_id, status, payload, max_retries, remove_on_complete, scheduled_at, created_at) \
             VALUES ($1, $2::job_queue_name, $3, 'pending'::job_status, $4, $5, $6, $7, $8)",
        )
        .bind(job_id)
        .bind(queue.as_str())
        .bind(entity_id)
        .bind(&payload)
        .bind(opts.max_attempts)
        .bind(opts.remove_on_complete)
        .bind(opts.scheduled_at)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(job_id)
    }

    async fn enqueue_deduplicated(
        &self,
        queue: QueueName,
        entity_id: Uuid,
        payload: Option<JsonValue>,
        opts: EnqueueOptions,
    ) -> Result<Option<Uuid>> {
        let job_id = new_v7();
        let now = Utc::now();

        // Atomic check-and-insert: a pending/running job for the same
        // (queue, entity_id) suppresses the insert entirely, so concurrent
        // enqueues for one chapter collapse to a single outstanding job.
        let inserted = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO job_queue \
                 (id, queue, entity_id, status, payload, max_retries, remove_on_complete, scheduled_at, created_at) \
             SELECT $1, $2::job_queue_name, $3, 'pending'::job_status, $4, $5, $6, $7, $8 \
             WHERE NOT EXISTS ( \
                 SELECT 1 FROM job_queue \
                 WHERE queue = $2::job_queue_name AND entity_id = $3 \
                   AND status IN ('pending'::job_status, 'running'::job_status) \
             ) \
             RETURNING id",
        )
        .bind(job_id)
        .bind(queue.as_str())
        .bind(entity_id)
        .bind(&payload)
        .bind(opts.max_attempts)
        .bind(opts.remove_on_complete)
        .bind(opts.scheduled_at)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(inserted)
    }

    async fn claim_next(&self, queue: QueueName) -> Result<Option<Job>> {
        let now = Utc::now();

        let query = format!(
            "UPDATE job_queue \
             SET status = 'running'::job_status, started_at = $1 \
             WHERE id = ( \
                 SELECT id FROM job_queue \
                 WHERE queue = $2::job_queue_name \
                   AND status = 'pending'::job_status \
                   AND (scheduled_at IS NULL OR scheduled_at <= $1) \
                 ORDER BY created_at ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {JOB_COLUMNS}"
        );

        let row = sqlx::query(&query)
            .bind(now)
            .bind(queue.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(row.map(Self::parse_job_row))
    }

    async fn complete(&self, job_id: Uuid) -> Result<()> {
        let now = Utc::now();

        let removed = sqlx::query(
            "DELETE FROM job_queue WHERE id = $1 AND remove_on_complete",
        )
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if removed.rows_affected() == 0 {
            sqlx::query(
                "UPDATE job_queue \
                 SET status = 'completed'::job_status, completed_at = $1 \
                 WHERE id = $2",
            )
            .bind(now)
            .bind(job_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        }

        Ok(())
    }

    async fn fail(&self, job_id: Uuid, error: &str) -> Result<()> {
        let now = Utc::now();

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let (retry_count, max_retries): (i32, i32) =
            sqlx::query_as("SELECT retry_count, max_retries FROM job_queue WHERE id = $1")
                .bind(job_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(Error::Database)?;

        if retry_count + 1 < max_retries {
            // Retry: return to pending with incremented attempt counter.
            sqlx::query(
                "UPDATE job_queue \
                 SET status = 'pending'::job_status, retry_count = $1, error_message = $2, \
                     started_at = NULL \
                 WHERE id = $3",
            )
            .bind(retry_count + 1)
            .bind(error)
            .bind(job_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        } else {
            // Attempts exhausted: park as failed, keep the last error for
            // operator inspection.
            sqlx::query(
                "UPDATE job_queue \
                 SET status = 'failed'::job_status, retry_count = $1, completed_at = $2, \
                     error_message = $3 \
                 WHERE id = $4",
            )
            .bind(retry_count + 1)
            .bind(now)
            .bind(error)
            .bind(job_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        }

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn counts(&self, queue: QueueName) -> Result<QueueCounts> {
        let row = sqlx::query(
            "SELECT \
                COUNT(*) FILTER (WHERE status = 'pending' \
                    AND (scheduled_at IS NULL OR scheduled_at <= now())) AS waiting, \
                COUNT(*) FILTER (WHERE status = 'running') AS active, \
                COUNT(*) FILTER (WHERE status = 'completed') AS completed, \
                COUNT(*) FILTER (WHERE status = 'failed') AS failed, \
                COUNT(*) FILTER (WHERE status = 'pending' \
                    AND scheduled_at > now()) AS delayed \
             FROM job_queue \
             WHERE queue = $1::job_queue_name",
        )
        .bind(queue.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(QueueCounts {
            waiting: row.get::<i64, _>("waiting"),
            active: row.get::<i64, _>("active"),
            completed: row.get::<i64, _>("completed"),
            failed: row.get::<i64, _>("failed"),
            delayed: row.get::<i64, _>("delayed"),
        })
    }

    async fn list(
        &self,
        queue: QueueName,
        statuses: &[JobStatus],
        limit: i64,
    ) -> Result<Vec<Job>> {
        let status_strings: Vec<String> =
            statuses.iter().map(|s| s.as_str().to_string()).collect();

        let query = format!(
            "SELECT {JOB_COLUMNS} FROM job_queue \
             WHERE queue = $1::job_queue_name \
               AND (cardinality($2::text[]) = 0 OR status::text = ANY($2)) \
             ORDER BY created_at DESC \
             LIMIT $3"
        );

        let rows = sqlx::query(&query)
            .bind(queue.as_str())
            .bind(&status_strings)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(rows.into_iter().map(Self::parse_job_row).collect())
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<Job>> {
        let query = format!("SELECT {JOB_COLUMNS} FROM job_queue WHERE id = $1");

        let row = sqlx::query(&query)
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(row.map(Self::parse_job_row))
    }

    async fn remove(&self, job_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM job_queue WHERE id = $1")
            .bind(job_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(result.rows_affected() > 0)
    }

    async fn clear(&self, queue: QueueName, statuses: &[JobStatus]) -> Result<Vec<i64>> {
        let mut deleted = Vec::with_capacity(statuses.len());
        for status in statuses {
            let result = sqlx::query(
                "DELETE FROM job_queue \
                 WHERE queue = $1::job_queue_name AND status::text = $2",
            )
            .bind(queue.as_str())
            .bind(status.as_str())
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
            deleted.push(result.rows_affected() as i64);
        }
        Ok(deleted)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
