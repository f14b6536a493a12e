//! Generation job lifecycle rules, request defaults, and naming.
//!
//! Pure functions and constants used by both the API and the worker.
//! The repositories enforce the same transition guards in SQL; this module
//! is the single place where the state machine is written down.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::JobId;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default output width in pixels.
pub const DEFAULT_WIDTH: i32 = 512;

/// Default output height in pixels.
pub const DEFAULT_HEIGHT: i32 = 512;

/// Default number of inference steps.
pub const DEFAULT_STEPS: i32 = 20;

/// Default batch size (artifacts per job).
pub const DEFAULT_BATCH: i32 = 1;

/// Provider used when a submission does not name one.
pub const DEFAULT_PROVIDER: &str = "replicate";

/// Largest accepted output dimension. Requests beyond this are rejected
/// at submission time rather than passed to a provider that will bill
/// for them and time out.
pub const MAX_DIMENSION: i32 = 2048;

/// Largest accepted batch size per job.
pub const MAX_BATCH: i32 = 8;

/// Largest accepted step count.
pub const MAX_STEPS: i32 = 150;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Status ID type matching SMALLINT in the database.
pub type StatusId = i16;

/// Lifecycle status of a generation job.
///
/// Discriminants match the seed order of the `generation_jobs.status_id`
/// column. `Success`, `Failed`, and `Aborted` are terminal; no transition
/// is defined out of them.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    Queued = 1,
    Running = 2,
    Success = 3,
    Failed = 4,
    Aborted = 5,
}

impl GenerationStatus {
    /// Return the database status ID.
    pub fn id(self) -> StatusId {
        self as StatusId
    }

    /// Map a database status ID back to the enum.
    pub fn from_id(id: StatusId) -> Option<Self> {
        match id {
            1 => Some(Self::Queued),
            2 => Some(Self::Running),
            3 => Some(Self::Success),
            4 => Some(Self::Failed),
            5 => Some(Self::Aborted),
            _ => None,
        }
    }

    /// Lowercase wire name, as exposed by the status endpoint.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Aborted => "aborted",
        }
    }

    /// Whether this status admits no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed | Self::Aborted)
    }
}

impl From<GenerationStatus> for StatusId {
    fn from(value: GenerationStatus) -> Self {
        value as StatusId
    }
}

impl std::fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validate a status transition.
///
/// Legal transitions:
/// - `queued -> running`
/// - `running -> success | failed | aborted`
/// - `queued -> failed | aborted` (enqueue failure, abort before start)
///
/// Transitions out of a terminal state are rejected explicitly so that
/// a late or duplicate worker write shows up in logs instead of silently
/// rewriting history.
pub fn validate_transition(
    from: GenerationStatus,
    to: GenerationStatus,
) -> Result<(), CoreError> {
    use GenerationStatus::*;

    let ok = match (from, to) {
        (Queued, Running) => true,
        (Queued, Failed) | (Queued, Aborted) => true,
        (Running, Success) | (Running, Failed) | (Running, Aborted) => true,
        _ => false,
    };

    if ok {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition(format!(
            "cannot move a job from '{from}' to '{to}'"
        )))
    }
}

// ---------------------------------------------------------------------------
// Request validation
// ---------------------------------------------------------------------------

/// Validate submission parameters before a job row is created.
pub fn validate_request(
    prompt: &str,
    width: i32,
    height: i32,
    steps: i32,
    batch: i32,
) -> Result<(), CoreError> {
    if prompt.trim().is_empty() {
        return Err(CoreError::Validation("prompt must not be empty".into()));
    }
    for (name, value) in [("width", width), ("height", height)] {
        if value <= 0 || value > MAX_DIMENSION {
            return Err(CoreError::Validation(format!(
                "{name} must be between 1 and {MAX_DIMENSION}, got {value}"
            )));
        }
    }
    if steps <= 0 || steps > MAX_STEPS {
        return Err(CoreError::Validation(format!(
            "steps must be between 1 and {MAX_STEPS}, got {steps}"
        )));
    }
    if batch <= 0 || batch > MAX_BATCH {
        return Err(CoreError::Validation(format!(
            "batch must be between 1 and {MAX_BATCH}, got {batch}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Artifact naming and URLs
// ---------------------------------------------------------------------------

/// Filename for the `index`-th artifact of a job.
///
/// Deterministic: persisting the same `(job_id, index)` pair twice
/// overwrites instead of accumulating duplicates.
pub fn artifact_filename(job_id: JobId, index: usize) -> String {
    format!("{job_id}_{index}.png")
}

/// Filename for the thumbnail of the `index`-th artifact of a job.
pub fn thumbnail_filename(job_id: JobId, index: usize) -> String {
    format!("{job_id}_{index}_thumb.jpg")
}

/// Public URL for a persisted artifact.
pub fn artifact_url(base_url: &str, filename: &str) -> String {
    format!("{}/generated/{filename}", base_url.trim_end_matches('/'))
}

/// Public URL for a persisted thumbnail.
pub fn thumbnail_url(base_url: &str, filename: &str) -> String {
    format!(
        "{}/generated/thumbs/{filename}",
        base_url.trim_end_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job_id() -> JobId {
        uuid::Uuid::parse_str("a1b2c3d4-0000-0000-0000-000000000001").unwrap()
    }

    #[test]
    fn status_ids_round_trip() {
        for status in [
            GenerationStatus::Queued,
            GenerationStatus::Running,
            GenerationStatus::Success,
            GenerationStatus::Failed,
            GenerationStatus::Aborted,
        ] {
            assert_eq!(GenerationStatus::from_id(status.id()), Some(status));
        }
        assert_eq!(GenerationStatus::from_id(0), None);
        assert_eq!(GenerationStatus::from_id(6), None);
    }

    #[test]
    fn wire_names_are_lowercase() {
        assert_eq!(GenerationStatus::Queued.as_str(), "queued");
        assert_eq!(GenerationStatus::Running.as_str(), "running");
        assert_eq!(GenerationStatus::Success.as_str(), "success");
        assert_eq!(GenerationStatus::Failed.as_str(), "failed");
        assert_eq!(GenerationStatus::Aborted.as_str(), "aborted");
    }

    #[test]
    fn terminal_statuses() {
        assert!(!GenerationStatus::Queued.is_terminal());
        assert!(!GenerationStatus::Running.is_terminal());
        assert!(GenerationStatus::Success.is_terminal());
        assert!(GenerationStatus::Failed.is_terminal());
        assert!(GenerationStatus::Aborted.is_terminal());
    }

    #[test]
    fn legal_transitions_accepted() {
        use GenerationStatus::*;
        for (from, to) in [
            (Queued, Running),
            (Queued, Failed),
            (Queued, Aborted),
            (Running, Success),
            (Running, Failed),
            (Running, Aborted),
        ] {
            assert!(validate_transition(from, to).is_ok(), "{from} -> {to}");
        }
    }

    #[test]
    fn transitions_out_of_terminal_rejected() {
        use GenerationStatus::*;
        for from in [Success, Failed, Aborted] {
            for to in [Queued, Running, Success, Failed, Aborted] {
                assert!(
                    validate_transition(from, to).is_err(),
                    "{from} -> {to} should be rejected"
                );
            }
        }
    }

    #[test]
    fn queued_cannot_skip_to_success() {
        let err = validate_transition(GenerationStatus::Queued, GenerationStatus::Success)
            .unwrap_err();
        assert!(err.to_string().contains("queued"));
        assert!(err.to_string().contains("success"));
    }

    #[test]
    fn request_validation_accepts_defaults() {
        assert!(validate_request(
            "a cat",
            DEFAULT_WIDTH,
            DEFAULT_HEIGHT,
            DEFAULT_STEPS,
            DEFAULT_BATCH
        )
        .is_ok());
    }

    #[test]
    fn request_validation_rejects_bad_input() {
        assert!(validate_request("", 512, 512, 20, 1).is_err());
        assert!(validate_request("   ", 512, 512, 20, 1).is_err());
        assert!(validate_request("x", 0, 512, 20, 1).is_err());
        assert!(validate_request("x", 512, MAX_DIMENSION + 1, 20, 1).is_err());
        assert!(validate_request("x", 512, 512, 0, 1).is_err());
        assert!(validate_request("x", 512, 512, 20, MAX_BATCH + 1).is_err());
    }

    #[test]
    fn artifact_names_are_deterministic() {
        let id = job_id();
        assert_eq!(artifact_filename(id, 0), format!("{id}_0.png"));
        assert_eq!(thumbnail_filename(id, 0), format!("{id}_0_thumb.jpg"));
        assert_eq!(artifact_filename(id, 0), artifact_filename(id, 0));
    }

    #[test]
    fn urls_join_cleanly() {
        let id = job_id();
        let file = artifact_filename(id, 0);
        let url = artifact_url("http://127.0.0.1:8000/", &file);
        assert_eq!(url, format!("http://127.0.0.1:8000/generated/{id}_0.png"));
        assert!(url.ends_with(&format!("/{id}_0.png")));

        let thumb = thumbnail_url("http://127.0.0.1:8000", &thumbnail_filename(id, 0));
        assert_eq!(
            thumb,
            format!("http://127.0.0.1:8000/generated/thumbs/{id}_0_thumb.jpg")
        );
    }
}
