//! Static provider registration, resolved once at startup.
//!
//! The registry replaces ad-hoc provider lookup: every adapter the
//! deployment supports is constructed and registered when the worker
//! boots, so a missing credential fails the process loudly at startup
//! and an unknown provider name in a job fails that job without any
//! network call.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::ProviderError;
use crate::ImageProvider;

/// Lookup table from provider name to adapter.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<&'static str, Arc<dyn ImageProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under its own name.
    ///
    /// Registering the same name twice is a startup bug and is rejected
    /// rather than silently replacing the earlier adapter.
    pub fn register(&mut self, provider: Arc<dyn ImageProvider>) -> Result<(), ProviderError> {
        let name = provider.name();
        if self.providers.contains_key(name) {
            return Err(ProviderError::DuplicateRegistration(name.to_string()));
        }
        self.providers.insert(name, provider);
        Ok(())
    }

    /// Resolve a provider by name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn ImageProvider>, ProviderError> {
        self.providers
            .get(name)
            .cloned()
            .ok_or_else(|| ProviderError::Unsupported(name.to_string()))
    }

    /// Names of all registered providers, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.providers.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Artifact, GenerationRequest};
    use async_trait::async_trait;

    #[derive(Debug)]
    struct StubProvider;

    #[async_trait]
    impl ImageProvider for StubProvider {
        fn name(&self) -> &'static str {
            "stub"
        }

        async fn generate(
            &self,
            _request: &GenerationRequest,
        ) -> Result<Vec<Artifact>, ProviderError> {
            Ok(Vec::new())
        }

        async fn abort(&self, _job_identifier: &str) -> bool {
            false
        }
    }

    #[test]
    fn lookup_hits_registered_provider() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(StubProvider)).unwrap();
        assert!(registry.get("stub").is_ok());
        assert_eq!(registry.names(), vec!["stub"]);
    }

    #[test]
    fn unknown_provider_is_unsupported() {
        let registry = ProviderRegistry::new();
        let err = registry.get("automatic1111").unwrap_err();
        assert!(matches!(err, ProviderError::Unsupported(_)));
        assert!(err.to_string().contains("Unsupported provider"));
        assert!(err.to_string().contains("automatic1111"));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(StubProvider)).unwrap();
        let err = registry.register(Arc::new(StubProvider)).unwrap_err();
        assert!(matches!(err, ProviderError::DuplicateRegistration(_)));
    }
}
