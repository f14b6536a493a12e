//! Work queue entity.

use atelier_core::types::{JobId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `queue_entries` table.
///
/// `delivery_count` is incremented on every claim, so a value above 1
/// means the entry was redelivered after a visibility timeout expired.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QueueEntry {
    pub id: i64,
    pub job_id: JobId,
    pub payload: serde_json::Value,
    pub enqueued_at: Timestamp,
    pub claimed_at: Option<Timestamp>,
    pub claimed_by: Option<String>,
    pub delivery_count: i32,
}
