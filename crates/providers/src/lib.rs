//! Provider adapters for external image-generation services.
//!
//! [`ImageProvider`] is the seam between the worker and any generation
//! backend: it takes the stored request parameters and returns a list of
//! normalized [`Artifact`]s. Adapters are constructed once at startup and
//! registered in a [`ProviderRegistry`]; a job naming an unregistered
//! provider fails hard without a network call.

pub mod error;
pub mod output;
pub mod payload;
pub mod registry;
pub mod replicate;

pub use error::ProviderError;
pub use registry::ProviderRegistry;
pub use replicate::ReplicateProvider;

use async_trait::async_trait;

/// One raw output produced by a provider for a job.
#[derive(Debug, Clone)]
pub struct Artifact {
    /// Raw payload bytes (image data, or opaque text for entries the
    /// adapter could not interpret).
    pub bytes: Vec<u8>,
    /// Best-known MIME type of the payload.
    pub mime_type: String,
    /// Provider-specific metadata carried through to the image record.
    pub metadata: serde_json::Value,
}

/// Generation parameters handed to a provider, mirroring the stored job.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub seed: Option<i64>,
    pub width: i32,
    pub height: i32,
    pub steps: i32,
    pub batch: i32,
    pub model: Option<String>,
    /// Arbitrary extra parameters merged into the provider payload.
    /// Named fields always win on key collision.
    pub extra: Option<serde_json::Value>,
}

/// An external image-generation service.
#[async_trait]
pub trait ImageProvider: Send + Sync + std::fmt::Debug {
    /// Registry key for this provider (e.g. `"replicate"`).
    fn name(&self) -> &'static str;

    /// Run one generation request to completion and return the produced
    /// artifacts in provider order.
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<Artifact>, ProviderError>;

    /// Best-effort cancellation of a provider-side job.
    ///
    /// Advisory only: providers without a cancel capability return
    /// `false`, which is not an error.
    async fn abort(&self, job_identifier: &str) -> bool;
}
