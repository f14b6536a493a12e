//! Repository for the `queue_entries` table: a durable, at-least-once
//! work queue on Postgres.
//!
//! Claiming uses `FOR UPDATE SKIP LOCKED` so that multiple worker
//! processes can race on `claim_next` without double-dispatching a live
//! entry. An entry whose claim is older than the visibility timeout is
//! considered abandoned (worker crash mid-job) and becomes claimable
//! again. That redelivery is what makes delivery at-least-once: a job
//! interrupted after persisting some artifacts can run twice and append
//! duplicates. The store does not deduplicate by `(job_id, index)`.

use sqlx::PgPool;

use atelier_core::types::JobId;

use crate::models::queue_entry::QueueEntry;

/// Column list for `queue_entries` queries.
const COLUMNS: &str =
    "id, job_id, payload, enqueued_at, claimed_at, claimed_by, delivery_count";

/// Provides enqueue/claim/ack operations for the work queue.
pub struct QueueRepo;

impl QueueRepo {
    /// Enqueue work for a job.
    ///
    /// Failure here must not orphan the queued job row: the submission
    /// endpoint reacts by failing the job before responding.
    pub async fn enqueue(
        pool: &PgPool,
        job_id: JobId,
        payload: &serde_json::Value,
    ) -> Result<QueueEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO queue_entries (job_id, payload) \
             VALUES ($1, $2) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, QueueEntry>(&query)
            .bind(job_id)
            .bind(payload)
            .fetch_one(pool)
            .await
    }

    /// Atomically claim the oldest deliverable entry for a worker.
    ///
    /// Deliverable means never claimed, or claimed longer ago than
    /// `visibility_timeout_secs` (abandoned by a crashed worker).
    pub async fn claim_next(
        pool: &PgPool,
        worker_name: &str,
        visibility_timeout_secs: i64,
    ) -> Result<Option<QueueEntry>, sqlx::Error> {
        let query = format!(
            "UPDATE queue_entries \
             SET claimed_at = NOW(), claimed_by = $1, delivery_count = delivery_count + 1 \
             WHERE id = ( \
                 SELECT id FROM queue_entries \
                 WHERE claimed_at IS NULL \
                    OR claimed_at < NOW() - make_interval(secs => $2) \
                 ORDER BY enqueued_at ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, QueueEntry>(&query)
            .bind(worker_name)
            .bind(visibility_timeout_secs as f64)
            .fetch_optional(pool)
            .await
    }

    /// Remove an entry after its job reached a terminal status.
    pub async fn ack(pool: &PgPool, entry_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM queue_entries WHERE id = $1")
            .bind(entry_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Number of entries waiting for a first delivery.
    pub async fn depth(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM queue_entries WHERE claimed_at IS NULL")
                .fetch_one(pool)
                .await?;
        Ok(count)
    }
}
