//! Generation job entity and DTOs.

use atelier_core::generation::{GenerationStatus, StatusId};
use atelier_core::types::{JobId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `generation_jobs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GenerationJob {
    pub id: JobId,
    pub prompt: String,
    pub seed: Option<i64>,
    pub width: i32,
    pub height: i32,
    pub steps: i32,
    pub batch: i32,
    pub model: Option<String>,
    pub provider: String,
    pub extra: Option<serde_json::Value>,
    pub status_id: StatusId,
    pub error: Option<String>,
    /// Ordered, append-only array of [`JobImageRef`] values.
    pub images: serde_json::Value,
    pub created_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub finished_at: Option<Timestamp>,
}

impl GenerationJob {
    /// Decode the stored status ID. `None` only if the row predates the
    /// current status vocabulary, which indicates a migration bug.
    pub fn status(&self) -> Option<GenerationStatus> {
        GenerationStatus::from_id(self.status_id)
    }
}

/// Parameters for inserting a new job. Status always starts at queued;
/// the id comes from the submission endpoint, not from here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGenerationJob {
    pub prompt: String,
    pub seed: Option<i64>,
    pub width: i32,
    pub height: i32,
    pub steps: i32,
    pub batch: i32,
    pub model: Option<String>,
    pub provider: String,
    pub extra: Option<serde_json::Value>,
}

/// One entry of a job's `images` array: the public-facing reference to a
/// persisted artifact, appended by the worker in provider-return order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobImageRef {
    pub image_id: JobId,
    pub url: String,
    pub thumbnail_url: Option<String>,
    pub metadata: serde_json::Value,
    pub flagged: bool,
}
