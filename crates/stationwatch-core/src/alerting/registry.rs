//! Provider registry

use parking_lot::RwLock;
use std::sync::Arc;

use crate::error::{Error, Result};

use super::provider::NotificationProvider;

/// Available notification providers, keyed by their self-reported name.
///
/// Populated at startup and read-only afterwards in normal operation; the
/// interior lock allows registration at runtime without changing callers.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: RwLock<Vec<Arc<dyn NotificationProvider>>>,
}

impl ProviderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry from a provider list, registering in order
    pub fn with_providers(providers: impl IntoIterator<Item = Arc<dyn NotificationProvider>>) -> Self {
        let registry = Self::new();
        for provider in providers {
            registry.register(provider);
        }
        registry
    }

    /// Register a provider. A later registration under the same name replaces
    /// the earlier one and keeps its position.
    pub fn register(&self, provider: Arc<dyn NotificationProvider>) {
        let mut providers = self.providers.write();
        match providers.iter_mut().find(|p| p.name() == provider.name()) {
            Some(slot) => *slot = provider,
            None => providers.push(provider),
        }
    }

    /// Remove a provider, returning it if present
    pub fn unregister(&self, name: &str) -> Option<Arc<dyn NotificationProvider>> {
        let mut providers = self.providers.write();
        let index = providers.iter().position(|p| p.name() == name)?;
        Some(providers.remove(index))
    }

    /// Look up a provider by name
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn NotificationProvider>> {
        self.providers
            .read()
            .iter()
            .find(|p| p.name() == name)
            .cloned()
            .ok_or_else(|| Error::unknown_provider(name))
    }

    /// All providers in registration order
    pub fn all(&self) -> Vec<Arc<dyn NotificationProvider>> {
        self.providers.read().clone()
    }

    /// Registered names in registration order
    pub fn names(&self) -> Vec<String> {
        self.providers
            .read()
            .iter()
            .map(|p| p.name().to_string())
            .collect()
    }

    /// Number of registered providers
    pub fn len(&self) -> usize {
        self.providers.read().len()
    }

    /// Whether no provider is registered
    pub fn is_empty(&self) -> bool {
        self.providers.read().is_empty()
    }
}
