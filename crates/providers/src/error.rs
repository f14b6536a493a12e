/// Errors from the provider adapter layer.
///
/// `Auth` is raised at construction time, before any network call, so a
/// misconfigured worker fails at startup instead of failing every job.
/// Everything else propagates to the worker and terminates the current
/// job as failed with the error's display text.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Required credentials were absent at construction time.
    #[error("Provider credentials missing: {0}")]
    Auth(String),

    /// The provider returned a non-success HTTP status.
    #[error("Provider request failed ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider response did not have the expected shape.
    #[error("Malformed provider response: {0}")]
    Response(String),

    /// The requested provider is not registered.
    #[error("Unsupported provider '{0}'")]
    Unsupported(String),

    /// A provider with the same name was registered twice.
    #[error("Provider '{0}' is already registered")]
    DuplicateRegistration(String),
}
