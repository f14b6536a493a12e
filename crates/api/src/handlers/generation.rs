//! Handlers for the generation job surface.
//!
//! Routes:
//! - `POST /generate`           — submit a job, enqueue work
//! - `GET  /generate/{job_id}`  — poll a job's status and images
//! - `GET  /generate`           — list recent jobs

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use atelier_core::error::CoreError;
use atelier_core::generation::{
    self, GenerationStatus, DEFAULT_BATCH, DEFAULT_HEIGHT, DEFAULT_PROVIDER, DEFAULT_STEPS,
    DEFAULT_WIDTH,
};
use atelier_core::types::{JobId, Timestamp};
use atelier_db::models::generation_job::{CreateGenerationJob, GenerationJob};
use atelier_db::repositories::{GenerationJobRepo, QueueRepo};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Body of `POST /generate`. Everything except the prompt is optional
/// and falls back to the service defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
    pub seed: Option<i64>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub steps: Option<i32>,
    pub batch: Option<i32>,
    pub model: Option<String>,
    pub provider: Option<String>,
    /// Overrides the server's base URL in generated artifact links,
    /// e.g. when the service sits behind a proxy the client reaches
    /// under a different host.
    pub base_url: Option<String>,
    /// Provider-specific parameters forwarded verbatim; named fields
    /// above win on key collision.
    pub extra: Option<serde_json::Value>,
}

/// Response of `POST /generate`.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub job_id: JobId,
    pub queued: bool,
}

/// Response of `GET /generate/{job_id}`.
#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub id: JobId,
    pub status: GenerationStatus,
    pub error: Option<String>,
    /// Ordered image references appended by the worker; empty until the
    /// first artifact is persisted.
    pub images: serde_json::Value,
}

/// One row of the `GET /generate` listing.
#[derive(Debug, Serialize)]
pub struct JobSummary {
    pub id: JobId,
    pub status: GenerationStatus,
    pub prompt: String,
    pub error: Option<String>,
    pub created_at: Timestamp,
    pub finished_at: Option<Timestamp>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

/// POST /generate
///
/// Validates the submission, inserts the job with a fresh v4 id, and
/// enqueues it. If the enqueue fails the job is immediately failed (so
/// no row sits in queued forever with no queue entry backing it) and
/// the client gets a 500.
pub async fn submit_generation(
    State(state): State<AppState>,
    Json(input): Json<GenerateRequest>,
) -> AppResult<impl IntoResponse> {
    let create = create_input(&input);
    generation::validate_request(
        &create.prompt,
        create.width,
        create.height,
        create.steps,
        create.batch,
    )
    .map_err(AppError::Core)?;

    let job_id = Uuid::new_v4();
    let job = GenerationJobRepo::create(&state.pool, job_id, &create).await?;
    tracing::info!(job_id = %job.id, provider = %job.provider, "Generation job created");

    let payload = queue_payload(input.base_url.as_deref(), &state.config.base_url);
    if let Err(err) = QueueRepo::enqueue(&state.pool, job.id, &payload).await {
        tracing::error!(job_id = %job.id, error = %err, "Failed to enqueue generation job");
        let message = format!("Failed to enqueue generation job: {err}");
        if let Err(fail_err) = GenerationJobRepo::fail(&state.pool, job.id, &message).await {
            tracing::error!(job_id = %job.id, error = %fail_err, "Failed to mark job failed");
        }
        return Err(AppError::InternalError(
            "Failed to enqueue generation job".into(),
        ));
    }

    Ok(Json(SubmitResponse {
        job_id: job.id,
        queued: true,
    }))
}

/// GET /generate/{job_id}
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
) -> AppResult<Json<JobStatusResponse>> {
    let job = GenerationJobRepo::find_by_id(&state.pool, job_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "GenerationJob",
            id: job_id,
        }))?;

    Ok(Json(JobStatusResponse {
        id: job.id,
        status: decode_status(&job)?,
        error: job.error,
        images: job.images,
    }))
}

/// GET /generate
///
/// Recent jobs, newest first. Intended for operator polling; the page
/// size is clamped by the repository.
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<JobSummary>>> {
    let jobs = GenerationJobRepo::list_recent(&state.pool, query.limit).await?;

    let mut summaries = Vec::with_capacity(jobs.len());
    for job in jobs {
        summaries.push(JobSummary {
            id: job.id,
            status: decode_status(&job)?,
            prompt: job.prompt,
            error: job.error,
            created_at: job.created_at,
            finished_at: job.finished_at,
        });
    }
    Ok(Json(summaries))
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Apply service defaults to an incoming submission.
fn create_input(input: &GenerateRequest) -> CreateGenerationJob {
    CreateGenerationJob {
        prompt: input.prompt.clone(),
        seed: input.seed,
        width: input.width.unwrap_or(DEFAULT_WIDTH),
        height: input.height.unwrap_or(DEFAULT_HEIGHT),
        steps: input.steps.unwrap_or(DEFAULT_STEPS),
        batch: input.batch.unwrap_or(DEFAULT_BATCH),
        model: input.model.clone(),
        provider: input
            .provider
            .clone()
            .unwrap_or_else(|| DEFAULT_PROVIDER.to_string()),
        extra: input.extra.clone(),
    }
}

/// Build the queue payload for a submission.
///
/// The job's parameters live on its row; the payload only carries the
/// base URL the worker should build artifact links against.
fn queue_payload(override_base_url: Option<&str>, default_base_url: &str) -> serde_json::Value {
    let base_url = override_base_url
        .filter(|s| !s.is_empty())
        .unwrap_or(default_base_url);
    json!({ "base_url": base_url })
}

/// Decode a row's status id, treating an unknown id as an internal
/// error (it indicates a migration bug, not client misuse).
fn decode_status(job: &GenerationJob) -> Result<GenerationStatus, AppError> {
    job.status().ok_or_else(|| {
        AppError::Core(CoreError::Internal(format!(
            "Job {} has unknown status id {}",
            job.id, job.status_id
        )))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use atelier_core::generation::MAX_DIMENSION;

    fn request(prompt: &str) -> GenerateRequest {
        GenerateRequest {
            prompt: prompt.to_string(),
            seed: None,
            width: None,
            height: None,
            steps: None,
            batch: None,
            model: None,
            provider: None,
            base_url: None,
            extra: None,
        }
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let create = create_input(&request("a lighthouse at dusk"));
        assert_eq!(create.width, DEFAULT_WIDTH);
        assert_eq!(create.height, DEFAULT_HEIGHT);
        assert_eq!(create.steps, DEFAULT_STEPS);
        assert_eq!(create.batch, DEFAULT_BATCH);
        assert_eq!(create.provider, DEFAULT_PROVIDER);
        assert_eq!(create.seed, None);
        assert_eq!(create.model, None);
    }

    #[test]
    fn explicit_fields_are_kept() {
        let mut input = request("a lighthouse at dusk");
        input.width = Some(768);
        input.height = Some(1024);
        input.provider = Some("stub".into());
        input.seed = Some(42);

        let create = create_input(&input);
        assert_eq!(create.width, 768);
        assert_eq!(create.height, 1024);
        assert_eq!(create.provider, "stub");
        assert_eq!(create.seed, Some(42));
    }

    #[test]
    fn defaulted_submission_passes_validation() {
        let create = create_input(&request("a lighthouse at dusk"));
        assert!(generation::validate_request(
            &create.prompt,
            create.width,
            create.height,
            create.steps,
            create.batch
        )
        .is_ok());
    }

    #[test]
    fn oversized_dimensions_are_rejected() {
        let mut input = request("a lighthouse at dusk");
        input.width = Some(MAX_DIMENSION + 1);
        let create = create_input(&input);
        assert!(generation::validate_request(
            &create.prompt,
            create.width,
            create.height,
            create.steps,
            create.batch
        )
        .is_err());
    }

    #[test]
    fn queue_payload_prefers_override() {
        let payload = queue_payload(Some("https://cdn.example.com"), "http://127.0.0.1:8000");
        assert_eq!(payload["base_url"], "https://cdn.example.com");
    }

    #[test]
    fn queue_payload_ignores_empty_override() {
        let payload = queue_payload(Some(""), "http://127.0.0.1:8000");
        assert_eq!(payload["base_url"], "http://127.0.0.1:8000");
    }
}
