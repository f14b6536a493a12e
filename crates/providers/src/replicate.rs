//! Adapter for the Replicate predictions API.
//!
//! Uses the synchronous-ish `Prefer: wait` mode: the POST blocks up to
//! 60 seconds server-side, so a finished prediction comes back with its
//! output in the same response. Output entries are remote URLs in the
//! common case; inline base64 and opaque fallbacks are handled by
//! [`classify_output_entry`](crate::output::classify_output_entry).

use std::time::Duration;

use serde_json::json;

use crate::error::ProviderError;
use crate::output::{classify_output_entry, OutputEntry};
use crate::payload::build_input_payload;
use crate::{Artifact, GenerationRequest, ImageProvider};

/// Registry name of this provider.
pub const PROVIDER_NAME: &str = "replicate";

/// Environment variable holding the API token.
pub const ENV_API_TOKEN: &str = "REPLICATE_API_TOKEN";

/// Environment variable holding the model version identifier.
pub const ENV_MODEL_VERSION: &str = "REPLICATE_MODEL_VERSION";

/// Default predictions endpoint.
const PREDICTIONS_URL: &str = "https://api.replicate.com/v1/predictions";

/// Overall timeout for the prediction request (server holds up to 60s).
const PREDICTION_TIMEOUT: Duration = Duration::from_secs(120);

/// Timeout for fetching one remote artifact URL.
const ARTIFACT_FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// MIME type assumed for inline payloads and missing content-type headers.
const DEFAULT_MIME: &str = "image/png";

/// HTTP adapter for Replicate.
#[derive(Debug)]
pub struct ReplicateProvider {
    client: reqwest::Client,
    api_token: String,
    model_version: String,
    predictions_url: String,
}

impl ReplicateProvider {
    /// Create an adapter with explicit credentials.
    ///
    /// Fails fast with [`ProviderError::Auth`] when either value is
    /// empty; no network call is made here.
    pub fn new(api_token: String, model_version: String) -> Result<Self, ProviderError> {
        if api_token.trim().is_empty() {
            return Err(ProviderError::Auth(format!(
                "{ENV_API_TOKEN} is not set"
            )));
        }
        if model_version.trim().is_empty() {
            return Err(ProviderError::Auth(format!(
                "{ENV_MODEL_VERSION} is not set"
            )));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            api_token,
            model_version,
            predictions_url: PREDICTIONS_URL.to_string(),
        })
    }

    /// Create an adapter from `REPLICATE_API_TOKEN` and
    /// `REPLICATE_MODEL_VERSION`.
    pub fn from_env() -> Result<Self, ProviderError> {
        let token = std::env::var(ENV_API_TOKEN).unwrap_or_default();
        let version = std::env::var(ENV_MODEL_VERSION).unwrap_or_default();
        Self::new(token, version)
    }

    /// Override the predictions endpoint (self-hosted gateways).
    pub fn with_predictions_url(mut self, url: String) -> Self {
        self.predictions_url = url;
        self
    }

    /// Fetch one remote artifact URL with a bounded timeout.
    async fn fetch_remote(
        &self,
        url: &str,
        provider_job: &serde_json::Value,
    ) -> Result<Artifact, ProviderError> {
        let response = self
            .client
            .get(url)
            .timeout(ARTIFACT_FETCH_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body: format!("fetching artifact {url}"),
            });
        }

        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(DEFAULT_MIME)
            .to_string();
        let bytes = response.bytes().await?.to_vec();

        Ok(Artifact {
            bytes,
            mime_type,
            metadata: json!({ "provider_job": provider_job }),
        })
    }
}

#[async_trait::async_trait]
impl ImageProvider for ReplicateProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<Artifact>, ProviderError> {
        let model_version = request
            .model
            .as_deref()
            .unwrap_or(self.model_version.as_str());

        let body = json!({
            "version": model_version,
            "input": build_input_payload(request),
        });

        tracing::debug!(
            provider = PROVIDER_NAME,
            model_version,
            "Submitting prediction"
        );

        let response = self
            .client
            .post(&self.predictions_url)
            .header(reqwest::header::AUTHORIZATION, format!("Token {}", self.api_token))
            .header("Prefer", "wait=60")
            .json(&body)
            .timeout(PREDICTION_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let prediction: serde_json::Value = response.json().await?;
        let provider_job = prediction.get("id").cloned().unwrap_or(json!(null));

        let output = match prediction.get("output") {
            Some(serde_json::Value::Array(entries)) => entries.as_slice(),
            Some(serde_json::Value::Null) | None => &[],
            Some(other) => {
                return Err(ProviderError::Response(format!(
                    "expected output array, got {other}"
                )));
            }
        };

        let mut artifacts = Vec::with_capacity(output.len());
        for entry in output {
            let artifact = match classify_output_entry(entry) {
                OutputEntry::Url(url) => self.fetch_remote(&url, &provider_job).await?,
                OutputEntry::Inline(bytes) => Artifact {
                    bytes,
                    mime_type: DEFAULT_MIME.to_string(),
                    metadata: json!({ "provider_job": provider_job }),
                },
                OutputEntry::Opaque(bytes) => Artifact {
                    bytes,
                    mime_type: "text/plain".to_string(),
                    metadata: json!({ "provider_job": provider_job }),
                },
            };
            artifacts.push(artifact);
        }

        tracing::info!(
            provider = PROVIDER_NAME,
            artifacts = artifacts.len(),
            "Prediction finished"
        );

        Ok(artifacts)
    }

    async fn abort(&self, _job_identifier: &str) -> bool {
        // Replicate has no reliable cancel for predictions.
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_token_fails_fast() {
        let err = ReplicateProvider::new(String::new(), "v1".into()).unwrap_err();
        assert!(matches!(err, ProviderError::Auth(_)));
        assert!(err.to_string().contains(ENV_API_TOKEN));
    }

    #[test]
    fn missing_model_version_fails_fast() {
        let err = ReplicateProvider::new("tok".into(), "  ".into()).unwrap_err();
        assert!(matches!(err, ProviderError::Auth(_)));
        assert!(err.to_string().contains(ENV_MODEL_VERSION));
    }

    #[test]
    fn constructs_with_credentials() {
        let provider = ReplicateProvider::new("tok".into(), "v1".into()).unwrap();
        assert_eq!(provider.name(), "replicate");
    }

    #[tokio::test]
    async fn abort_is_advisory_and_returns_false() {
        let provider = ReplicateProvider::new("tok".into(), "v1".into()).unwrap();
        assert!(!provider.abort("some-prediction").await);
    }
}
