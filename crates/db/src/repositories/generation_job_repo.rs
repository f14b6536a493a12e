//! Repository for the `generation_jobs` table.
//!
//! The status guards in these queries are the SQL half of the state
//! machine in `atelier_core::generation`: every transition query matches
//! only the rows its source states allow, so a late or duplicate write
//! (for example after a queue redelivery) affects zero rows instead of
//! rewriting a terminal job. Callers observe that as `None` while the
//! row still exists, and log it.
//!
//! Unknown job ids are a soft `None` everywhere, never an error.

use sqlx::PgPool;

use atelier_core::generation::{GenerationStatus, StatusId};
use atelier_core::types::JobId;

use crate::models::generation_job::{CreateGenerationJob, GenerationJob, JobImageRef};

/// Column list for `generation_jobs` queries.
const COLUMNS: &str = "\
    id, prompt, seed, width, height, steps, batch, model, provider, extra, \
    status_id, error, images, created_at, started_at, finished_at";

/// Maximum page size for job listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for job listing.
const DEFAULT_LIMIT: i64 = 50;

/// Terminal statuses: success, failed, aborted.
const TERMINAL_STATUSES: [StatusId; 3] = [
    GenerationStatus::Success as StatusId,
    GenerationStatus::Failed as StatusId,
    GenerationStatus::Aborted as StatusId,
];

/// Provides persistence for generation jobs and their lifecycle.
pub struct GenerationJobRepo;

impl GenerationJobRepo {
    /// Insert a new job with status queued.
    ///
    /// The id is supplied by the caller (the submission endpoint). A
    /// duplicate id violates the primary key and surfaces as a database
    /// error with code 23505, classified as a conflict upstream.
    pub async fn create(
        pool: &PgPool,
        id: JobId,
        input: &CreateGenerationJob,
    ) -> Result<GenerationJob, sqlx::Error> {
        let query = format!(
            "INSERT INTO generation_jobs \
                 (id, prompt, seed, width, height, steps, batch, model, provider, extra, status_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GenerationJob>(&query)
            .bind(id)
            .bind(&input.prompt)
            .bind(input.seed)
            .bind(input.width)
            .bind(input.height)
            .bind(input.steps)
            .bind(input.batch)
            .bind(&input.model)
            .bind(&input.provider)
            .bind(&input.extra)
            .bind(GenerationStatus::Queued.id())
            .fetch_one(pool)
            .await
    }

    /// Find a job by its ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: JobId,
    ) -> Result<Option<GenerationJob>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM generation_jobs WHERE id = $1");
        sqlx::query_as::<_, GenerationJob>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Transition a queued job to running, stamping `started_at`.
    ///
    /// Guarded on the queued status, so `started_at` is written at most
    /// once and a redelivered job that already ran is left untouched.
    pub async fn mark_running(
        pool: &PgPool,
        id: JobId,
    ) -> Result<Option<GenerationJob>, sqlx::Error> {
        let query = format!(
            "UPDATE generation_jobs \
             SET status_id = $2, started_at = NOW() \
             WHERE id = $1 AND status_id = $3 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GenerationJob>(&query)
            .bind(id)
            .bind(GenerationStatus::Running.id())
            .bind(GenerationStatus::Queued.id())
            .fetch_optional(pool)
            .await
    }

    /// Transition a running job to success, stamping `finished_at`.
    pub async fn complete(
        pool: &PgPool,
        id: JobId,
    ) -> Result<Option<GenerationJob>, sqlx::Error> {
        let query = format!(
            "UPDATE generation_jobs \
             SET status_id = $2, finished_at = NOW() \
             WHERE id = $1 AND status_id = $3 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GenerationJob>(&query)
            .bind(id)
            .bind(GenerationStatus::Success.id())
            .bind(GenerationStatus::Running.id())
            .fetch_optional(pool)
            .await
    }

    /// Transition a non-terminal job to failed, recording the error
    /// message verbatim and stamping `finished_at`.
    ///
    /// No automatic retry exists anywhere in the pipeline; a failed job
    /// stays failed until the client resubmits.
    pub async fn fail(
        pool: &PgPool,
        id: JobId,
        error: &str,
    ) -> Result<Option<GenerationJob>, sqlx::Error> {
        Self::finish(pool, id, GenerationStatus::Failed, Some(error)).await
    }

    /// Transition a non-terminal job to aborted, stamping `finished_at`.
    pub async fn abort(
        pool: &PgPool,
        id: JobId,
        error: Option<&str>,
    ) -> Result<Option<GenerationJob>, sqlx::Error> {
        Self::finish(pool, id, GenerationStatus::Aborted, error).await
    }

    /// Shared terminal transition, guarded against terminal sources.
    async fn finish(
        pool: &PgPool,
        id: JobId,
        status: GenerationStatus,
        error: Option<&str>,
    ) -> Result<Option<GenerationJob>, sqlx::Error> {
        let query = format!(
            "UPDATE generation_jobs \
             SET status_id = $2, error = COALESCE($3, error), finished_at = NOW() \
             WHERE id = $1 AND status_id NOT IN ($4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GenerationJob>(&query)
            .bind(id)
            .bind(status.id())
            .bind(error)
            .bind(TERMINAL_STATUSES[0])
            .bind(TERMINAL_STATUSES[1])
            .bind(TERMINAL_STATUSES[2])
            .fetch_optional(pool)
            .await
    }

    /// Append one image reference to the job's `images` array.
    ///
    /// Appends strictly in call order and never disturbs earlier
    /// entries; no deduplication is performed. Only non-terminal jobs
    /// accept appends (the result list must not grow after the job is
    /// finished).
    pub async fn append_image(
        pool: &PgPool,
        id: JobId,
        image: &JobImageRef,
    ) -> Result<Option<GenerationJob>, sqlx::Error> {
        let value = serde_json::to_value(image).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
        let query = format!(
            "UPDATE generation_jobs \
             SET images = images || jsonb_build_array($2::jsonb) \
             WHERE id = $1 AND status_id NOT IN ($3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GenerationJob>(&query)
            .bind(id)
            .bind(value)
            .bind(TERMINAL_STATUSES[0])
            .bind(TERMINAL_STATUSES[1])
            .bind(TERMINAL_STATUSES[2])
            .fetch_optional(pool)
            .await
    }

    /// List recent jobs, newest first.
    pub async fn list_recent(
        pool: &PgPool,
        limit: Option<i64>,
    ) -> Result<Vec<GenerationJob>, sqlx::Error> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let query = format!(
            "SELECT {COLUMNS} FROM generation_jobs \
             ORDER BY created_at DESC \
             LIMIT $1"
        );
        sqlx::query_as::<_, GenerationJob>(&query)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
