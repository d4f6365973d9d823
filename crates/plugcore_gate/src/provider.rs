//! Authorization provider interface and registry
//!
//! The provider (PlugCore) is an external collaborator. It may be missing
//! entirely; that case is surfaced as [`ProviderAvailability::Missing`]
//! rather than discovered by a failed call.

use crate::error::{GateError, ProviderError};
use crate::host::FeatureHandle;
use async_trait::async_trait;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Licensing service that answers link and authorization queries.
#[async_trait]
pub trait AuthorizationProvider: Send + Sync {
    /// Name the provider registers under (e.g. "PlugCore")
    fn name(&self) -> &str;

    /// Whether this server instance is linked to the provider. Cheap and local.
    fn is_server_linked(&self) -> Result<bool, ProviderError>;

    /// Asks whether `consumer_id` is authorized. May suspend on a network round trip.
    async fn is_plugin_authorized(&self, consumer_id: &str) -> Result<bool, ProviderError>;

    /// Link check followed by the authorization query.
    ///
    /// Returns `Ok(false)` without querying when the server is not linked.
    async fn require_authorization(&self, consumer: &FeatureHandle) -> Result<bool, ProviderError> {
        if !self.is_server_linked()? {
            return Ok(false);
        }
        self.is_plugin_authorized(consumer.name()).await
    }

    /// Fails with [`ProviderError::NotLinked`] if the server is not linked.
    fn validate_server_link_sync(&self) -> Result<(), ProviderError> {
        if self.is_server_linked()? {
            Ok(())
        } else {
            Err(ProviderError::NotLinked)
        }
    }
}

/// Result of resolving a provider through the host.
#[derive(Clone)]
pub enum ProviderAvailability {
    /// The provider is installed
    Available(Arc<dyn AuthorizationProvider>),
    /// No provider with this name is installed
    Missing { name: String },
}

impl ProviderAvailability {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }
}

impl fmt::Debug for ProviderAvailability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available(provider) => f.debug_tuple("Available").field(&provider.name()).finish(),
            Self::Missing { name } => f.debug_struct("Missing").field("name", name).finish(),
        }
    }
}

/// Installed providers by name.
///
/// Plays the role of the host's module resolution: a feature asks for a
/// provider by name and gets a typed answer whether or not it is present.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: DashMap<String, Arc<dyn AuthorizationProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a provider under its own name
    pub fn register(&self, provider: Arc<dyn AuthorizationProvider>) -> Result<(), GateError> {
        let name = provider.name().to_string();
        if self.providers.contains_key(&name) {
            return Err(GateError::ProviderAlreadyRegistered(name));
        }

        info!("🔑 Authorization provider registered: {}", name);
        self.providers.insert(name, provider);
        Ok(())
    }

    /// Removes a provider; returns whether one was installed
    pub fn unregister(&self, name: &str) -> bool {
        let removed = self.providers.remove(name).is_some();
        if removed {
            info!("🔌 Authorization provider removed: {}", name);
        }
        removed
    }

    pub fn resolve(&self, name: &str) -> ProviderAvailability {
        match self.providers.get(name) {
            Some(entry) => ProviderAvailability::Available(entry.value().clone()),
            None => {
                debug!("Provider '{}' is not installed", name);
                ProviderAvailability::Missing { name: name.to_string() }
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.providers.iter().map(|entry| entry.key().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedProvider;

    #[test]
    fn test_registry_resolution() {
        let registry = ProviderRegistry::new();
        assert!(registry.is_empty());
        assert!(!registry.resolve("PlugCore").is_available());

        registry.register(ScriptedProvider::linked(true).into_arc()).unwrap();
        assert!(registry.contains("PlugCore"));
        assert!(registry.resolve("PlugCore").is_available());
        assert_eq!(registry.names(), vec!["PlugCore".to_string()]);

        let err = registry.register(ScriptedProvider::linked(false).into_arc()).unwrap_err();
        assert!(matches!(err, GateError::ProviderAlreadyRegistered(name) if name == "PlugCore"));

        assert!(registry.unregister("PlugCore"));
        assert!(!registry.unregister("PlugCore"));
        match registry.resolve("PlugCore") {
            ProviderAvailability::Missing { name } => assert_eq!(name, "PlugCore"),
            other => panic!("expected missing, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_require_authorization_skips_query_when_unlinked() {
        let provider = ScriptedProvider::linked(false).authorizing("ExamplePlugin");
        let handle = FeatureHandle::new("ExamplePlugin", "1.0.0");

        assert!(!provider.require_authorization(&handle).await.unwrap());
        assert_eq!(provider.authorization_queries(), 0);
        assert_eq!(provider.validate_server_link_sync(), Err(ProviderError::NotLinked));
    }

    #[tokio::test]
    async fn test_require_authorization_when_linked() {
        let provider = ScriptedProvider::linked(true).authorizing("ExamplePlugin");

        let allowed = FeatureHandle::new("ExamplePlugin", "1.0.0");
        let other = FeatureHandle::new("OtherPlugin", "1.0.0");

        assert!(provider.require_authorization(&allowed).await.unwrap());
        assert!(!provider.require_authorization(&other).await.unwrap());
        assert_eq!(provider.authorization_queries(), 2);
        assert!(provider.validate_server_link_sync().is_ok());
    }
}
