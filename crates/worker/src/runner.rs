//! The per-job processing algorithm and the claim/process/ack loop.
//!
//! Every error raised while a job is being processed is caught here and
//! converted into a terminal failed status with the error's display
//! text; nothing escapes the loop to crash the process. There is no
//! automatic retry: a failed job requires resubmission by the client.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use atelier_core::artifacts::ArtifactStore;
use atelier_core::error::CoreError;
use atelier_core::generation::{artifact_url, thumbnail_url};
use atelier_core::safety::{PermissiveClassifier, SafetyClassifier};
use atelier_db::models::generated_image::CreateGeneratedImage;
use atelier_db::models::generation_job::{GenerationJob, JobImageRef};
use atelier_db::models::queue_entry::QueueEntry;
use atelier_db::repositories::{GeneratedImageRepo, GenerationJobRepo, QueueRepo};
use atelier_providers::{GenerationRequest, ImageProvider, ProviderRegistry};

use crate::config::WorkerConfig;

/// One worker process: a sequential consumer over the queue.
pub struct Worker {
    pool: PgPool,
    config: WorkerConfig,
    registry: Arc<ProviderRegistry>,
    store: ArtifactStore,
    classifier: Arc<dyn SafetyClassifier>,
}

impl Worker {
    /// Build a worker, creating the artifact directories if missing.
    ///
    /// Uses the permissive safety classifier; swap in a real one with
    /// [`with_classifier`](Self::with_classifier).
    pub fn new(
        pool: PgPool,
        config: WorkerConfig,
        registry: Arc<ProviderRegistry>,
    ) -> Result<Self, CoreError> {
        let store = ArtifactStore::new(&config.artifact_root)?;
        Ok(Self {
            pool,
            config,
            registry,
            store,
            classifier: Arc::new(PermissiveClassifier),
        })
    }

    /// Replace the safety classifier.
    pub fn with_classifier(mut self, classifier: Arc<dyn SafetyClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Run the claim/process/ack loop until cancelled.
    ///
    /// One job is processed to completion (or failure) before the next
    /// claim; cancellation is honoured between jobs, never mid-job.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(
            worker = %self.config.worker_name,
            providers = ?self.registry.names(),
            "Worker loop started"
        );

        loop {
            if cancel.is_cancelled() {
                break;
            }

            match QueueRepo::claim_next(
                &self.pool,
                &self.config.worker_name,
                self.config.visibility_timeout_secs,
            )
            .await
            {
                Ok(Some(entry)) => self.process_entry(entry).await,
                Ok(None) => self.idle(&cancel).await,
                Err(err) => {
                    tracing::error!(error = %err, "Failed to poll the queue");
                    self.idle(&cancel).await;
                }
            }
        }

        tracing::info!(worker = %self.config.worker_name, "Worker loop stopped");
    }

    /// Sleep one poll interval, waking early on cancellation.
    async fn idle(&self, cancel: &CancellationToken) {
        tokio::select! {
            () = cancel.cancelled() => {}
            () = tokio::time::sleep(Duration::from_secs(self.config.poll_interval_secs)) => {}
        }
    }

    /// Process one claimed queue entry end to end, then acknowledge it.
    async fn process_entry(&self, entry: QueueEntry) {
        if entry.delivery_count > 1 {
            // At-least-once: a redelivered entry may duplicate artifacts
            // already persisted by a crashed run. Not deduplicated.
            tracing::warn!(
                job_id = %entry.job_id,
                delivery_count = entry.delivery_count,
                "Queue entry redelivered"
            );
        }

        let job = match GenerationJobRepo::mark_running(&self.pool, entry.job_id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                // Absent, already terminal, or already running elsewhere.
                // Rejected explicitly by the status guard; drop the entry.
                tracing::warn!(
                    job_id = %entry.job_id,
                    "Skipping entry: job is not in the queued state"
                );
                self.ack(entry.id).await;
                return;
            }
            Err(err) => {
                // Leave the entry claimed; the visibility timeout will
                // redeliver it once the database is reachable again.
                tracing::error!(job_id = %entry.job_id, error = %err, "Failed to mark job running");
                return;
            }
        };

        tracing::info!(job_id = %job.id, provider = %job.provider, "Processing generation job");

        let base_url = payload_base_url(&entry.payload, &self.config.base_url);

        match self.execute(&job, &base_url).await {
            Ok(count) => {
                match GenerationJobRepo::complete(&self.pool, job.id).await {
                    Ok(Some(_)) => {
                        tracing::info!(job_id = %job.id, artifacts = count, "Job succeeded");
                    }
                    Ok(None) => {
                        tracing::warn!(job_id = %job.id, "Success transition rejected");
                    }
                    Err(err) => {
                        tracing::error!(job_id = %job.id, error = %err, "Failed to record success");
                    }
                }
            }
            Err(message) => {
                tracing::warn!(job_id = %job.id, error = %message, "Job failed");
                match GenerationJobRepo::fail(&self.pool, job.id, &message).await {
                    Ok(Some(_)) => {}
                    Ok(None) => {
                        tracing::warn!(job_id = %job.id, "Failure transition rejected");
                    }
                    Err(err) => {
                        tracing::error!(job_id = %job.id, error = %err, "Failed to record failure");
                    }
                }
            }
        }

        self.ack(entry.id).await;
    }

    /// Steps 2-4 of the per-job algorithm: resolve the provider, invoke
    /// it, and persist every returned artifact in provider order.
    ///
    /// Returns the number of artifacts persisted. On error, artifacts
    /// persisted before the failure stay on disk and in the database,
    /// attached to the soon-to-be-failed job (best-effort partial
    /// results, deliberately not rolled back).
    async fn execute(&self, job: &GenerationJob, base_url: &str) -> Result<usize, String> {
        let provider = self
            .registry
            .get(&job.provider)
            .map_err(|err| err.to_string())?;

        let request = request_from_job(job);
        let artifacts = provider
            .generate(&request)
            .await
            .map_err(|err| err.to_string())?;

        for (index, artifact) in artifacts.iter().enumerate() {
            let persisted = self
                .store
                .persist(job.id, index, &artifact.bytes)
                .map_err(|err| err.to_string())?;

            let verdict = self.classifier.classify(&artifact.bytes);

            let mut metadata = artifact.metadata.clone();
            if let Some(object) = metadata.as_object_mut() {
                object
                    .entry("mime_type")
                    .or_insert_with(|| serde_json::json!(artifact.mime_type));
            }

            let url = artifact_url(base_url, &persisted.filename);
            let thumb_url = persisted
                .thumbnail_filename
                .as_deref()
                .map(|name| thumbnail_url(base_url, name));

            let image = GeneratedImageRepo::create(
                &self.pool,
                Uuid::new_v4(),
                &CreateGeneratedImage {
                    job_id: job.id,
                    filename: persisted.filename.clone(),
                    url: url.clone(),
                    thumbnail_url: thumb_url.clone(),
                    width: persisted.width.map(|w| w as i32),
                    height: persisted.height.map(|h| h as i32),
                    size_bytes: Some(persisted.size_bytes as i64),
                    metadata: Some(metadata.clone()),
                    flagged: verdict.flagged,
                },
            )
            .await
            .map_err(|err| err.to_string())?;

            let appended = GenerationJobRepo::append_image(
                &self.pool,
                job.id,
                &JobImageRef {
                    image_id: image.id,
                    url,
                    thumbnail_url: thumb_url,
                    metadata,
                    flagged: verdict.flagged,
                },
            )
            .await
            .map_err(|err| err.to_string())?;

            if appended.is_none() {
                tracing::warn!(
                    job_id = %job.id,
                    index,
                    "Image append rejected: job reached a terminal status mid-run"
                );
            }
        }

        Ok(artifacts.len())
    }

    /// Delete a processed queue entry, logging instead of failing.
    async fn ack(&self, entry_id: i64) {
        if let Err(err) = QueueRepo::ack(&self.pool, entry_id).await {
            tracing::error!(entry_id, error = %err, "Failed to acknowledge queue entry");
        }
    }
}

/// Map a stored job row to the provider request.
pub fn request_from_job(job: &GenerationJob) -> GenerationRequest {
    GenerationRequest {
        prompt: job.prompt.clone(),
        seed: job.seed,
        width: job.width,
        height: job.height,
        steps: job.steps,
        batch: job.batch,
        model: job.model.clone(),
        extra: job.extra.clone(),
    }
}

/// Per-request base URL override carried in the queue payload, falling
/// back to the worker's configured base URL.
pub fn payload_base_url(payload: &serde_json::Value, default: &str) -> String {
    payload
        .get("base_url")
        .and_then(|value| value.as_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(default)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use atelier_core::generation::GenerationStatus;

    fn job() -> GenerationJob {
        GenerationJob {
            id: Uuid::parse_str("a1b2c3d4-0000-0000-0000-000000000003").unwrap(),
            prompt: "a cat".into(),
            seed: Some(7),
            width: 256,
            height: 256,
            steps: 10,
            batch: 1,
            model: Some("sd-v1.5".into()),
            provider: "replicate".into(),
            extra: Some(serde_json::json!({ "guidance_scale": 7.5 })),
            status_id: GenerationStatus::Queued.id(),
            error: None,
            images: serde_json::json!([]),
            created_at: chrono::Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    #[test]
    fn request_mirrors_stored_job() {
        let job = job();
        let request = request_from_job(&job);
        assert_eq!(request.prompt, "a cat");
        assert_eq!(request.seed, Some(7));
        assert_eq!(request.width, 256);
        assert_eq!(request.height, 256);
        assert_eq!(request.steps, 10);
        assert_eq!(request.batch, 1);
        assert_eq!(request.model.as_deref(), Some("sd-v1.5"));
        assert_eq!(
            request.extra,
            Some(serde_json::json!({ "guidance_scale": 7.5 }))
        );
    }

    #[test]
    fn payload_base_url_prefers_override() {
        let payload = serde_json::json!({ "base_url": "https://cdn.example.com" });
        assert_eq!(
            payload_base_url(&payload, "http://127.0.0.1:8000"),
            "https://cdn.example.com"
        );
    }

    #[test]
    fn payload_base_url_falls_back_to_default() {
        for payload in [
            serde_json::json!({}),
            serde_json::json!({ "base_url": "" }),
            serde_json::json!({ "base_url": 42 }),
        ] {
            assert_eq!(
                payload_base_url(&payload, "http://127.0.0.1:8000"),
                "http://127.0.0.1:8000"
            );
        }
    }
}
