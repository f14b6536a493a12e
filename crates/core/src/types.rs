/// Generation jobs and images are keyed by client-generated UUIDs,
/// never by database-assigned sequences.
pub type JobId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
