//! Repository for the `generated_images` table.

use sqlx::PgPool;

use atelier_core::types::JobId;

use crate::models::generated_image::{CreateGeneratedImage, GeneratedImage};

/// Column list for `generated_images` queries.
const COLUMNS: &str = "\
    id, job_id, filename, url, thumbnail_url, width, height, size_bytes, \
    metadata, flagged, created_at";

/// Provides persistence for generated image records.
///
/// Rows are insert-only: nothing updates or deletes them, including when
/// the owning job later fails (partial results stay queryable).
pub struct GeneratedImageRepo;

impl GeneratedImageRepo {
    /// Insert a new image record. The id is generated by the caller.
    pub async fn create(
        pool: &PgPool,
        id: JobId,
        input: &CreateGeneratedImage,
    ) -> Result<GeneratedImage, sqlx::Error> {
        let query = format!(
            "INSERT INTO generated_images \
                 (id, job_id, filename, url, thumbnail_url, width, height, \
                  size_bytes, metadata, flagged) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GeneratedImage>(&query)
            .bind(id)
            .bind(input.job_id)
            .bind(&input.filename)
            .bind(&input.url)
            .bind(&input.thumbnail_url)
            .bind(input.width)
            .bind(input.height)
            .bind(input.size_bytes)
            .bind(&input.metadata)
            .bind(input.flagged)
            .fetch_one(pool)
            .await
    }

    /// List all images for a job in creation order.
    pub async fn list_by_job(
        pool: &PgPool,
        job_id: JobId,
    ) -> Result<Vec<GeneratedImage>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM generated_images \
             WHERE job_id = $1 \
             ORDER BY created_at ASC"
        );
        sqlx::query_as::<_, GeneratedImage>(&query)
            .bind(job_id)
            .fetch_all(pool)
            .await
    }
}
