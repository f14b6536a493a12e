//! Generated image entity and create DTO.
//!
//! One row per artifact produced by a job. Rows are written once by the
//! worker after a successful provider call and never mutated afterwards.

use atelier_core::types::{JobId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `generated_images` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GeneratedImage {
    pub id: JobId,
    pub job_id: JobId,
    pub filename: String,
    pub url: String,
    pub thumbnail_url: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub size_bytes: Option<i64>,
    pub metadata: Option<serde_json::Value>,
    pub flagged: bool,
    pub created_at: Timestamp,
}

/// Parameters for inserting a generated image record.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateGeneratedImage {
    pub job_id: JobId,
    pub filename: String,
    pub url: String,
    pub thumbnail_url: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub size_bytes: Option<i64>,
    pub metadata: Option<serde_json::Value>,
    pub flagged: bool,
}
