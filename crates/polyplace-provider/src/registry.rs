//! Provider registry — owns the name → provider map and builds providers
//! from declarative config.
//!
//! Construction is isolated per entry: a provider that fails to build is
//! recorded in the [`RegistrationReport`] and the rest of the batch is
//! still registered. Callers decide whether a partial registry is fatal.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use polyplace_core::ProviderConfig;

use crate::error::{ProviderError, ProviderResult};
use crate::provider::Provider;
use crate::static_provider::{STATIC_PROVIDER_TYPE, StaticProvider};

/// Builds a provider from its name and adapter-specific settings.
pub type ProviderFactory = Arc<
    dyn Fn(&str, &HashMap<String, String>) -> ProviderResult<Arc<dyn Provider>> + Send + Sync,
>;

/// Outcome of [`ProviderRegistry::register_from_configs`].
#[derive(Debug, Default)]
pub struct RegistrationReport {
    /// Names registered successfully, in config order.
    pub registered: Vec<String>,
    /// Names skipped because `enabled = false`.
    pub skipped: Vec<String>,
    /// Names whose construction failed, with the reason.
    pub failed: Vec<(String, ProviderError)>,
}

impl RegistrationReport {
    /// True when nothing failed.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Named provider instances plus the factories used to build them.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: RwLock<HashMap<String, Arc<dyn Provider>>>,
    factories: RwLock<HashMap<String, ProviderFactory>>,
}

impl ProviderRegistry {
    /// An empty registry with no factories.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in `static` factory installed.
    pub async fn with_builtin_factories() -> Self {
        let registry = Self::new();
        registry
            .register_factory(STATIC_PROVIDER_TYPE, |name, config| {
                Ok(Arc::new(StaticProvider::from_config(name, config)?) as Arc<dyn Provider>)
            })
            .await;
        registry
    }

    /// Register (or replace) a provider under its own name.
    pub async fn register_provider(&self, provider: Arc<dyn Provider>) {
        let name = provider.name().to_string();
        let mut providers = self.providers.write().await;
        if providers.insert(name.clone(), provider).is_some() {
            warn!(provider = %name, "replaced existing provider registration");
        } else {
            info!(provider = %name, "provider registered");
        }
    }

    /// Remove a provider. Returns it if it was registered.
    pub async fn unregister_provider(&self, name: &str) -> Option<Arc<dyn Provider>> {
        let removed = self.providers.write().await.remove(name);
        if removed.is_some() {
            info!(provider = %name, "provider unregistered");
        }
        removed
    }

    pub async fn get_provider(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.read().await.get(name).cloned()
    }

    /// All providers, sorted by name.
    pub async fn list_providers(&self) -> Vec<Arc<dyn Provider>> {
        let providers = self.providers.read().await;
        let mut list: Vec<Arc<dyn Provider>> = providers.values().cloned().collect();
        list.sort_by(|a, b| a.name().cmp(b.name()));
        list
    }

    pub async fn len(&self) -> usize {
        self.providers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.providers.read().await.is_empty()
    }

    /// Associate a provider type tag with a constructor.
    pub async fn register_factory<F>(&self, provider_type: &str, factory: F)
    where
        F: Fn(&str, &HashMap<String, String>) -> ProviderResult<Arc<dyn Provider>>
            + Send
            + Sync
            + 'static,
    {
        self.factories
            .write()
            .await
            .insert(provider_type.to_string(), Arc::new(factory));
        debug!(%provider_type, "provider factory registered");
    }

    /// Build and register one provider.
    ///
    /// Returns `Ok(None)` when the entry is disabled.
    pub async fn register_from_config(
        &self,
        config: &ProviderConfig,
    ) -> ProviderResult<Option<Arc<dyn Provider>>> {
        if !config.enabled {
            debug!(provider = %config.name, "provider disabled, skipping");
            return Ok(None);
        }

        let factory = self
            .factories
            .read()
            .await
            .get(&config.provider_type)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownProviderType(config.provider_type.clone()))?;

        let provider = factory(&config.name, &config.config)?;
        self.register_provider(provider.clone()).await;
        Ok(Some(provider))
    }

    /// Build and register every entry, continuing past failures.
    pub async fn register_from_configs(&self, configs: &[ProviderConfig]) -> RegistrationReport {
        let mut report = RegistrationReport::default();

        for config in configs {
            match self.register_from_config(config).await {
                Ok(Some(_)) => report.registered.push(config.name.clone()),
                Ok(None) => report.skipped.push(config.name.clone()),
                Err(e) => {
                    warn!(
                        provider = %config.name,
                        provider_type = %config.provider_type,
                        error = %e,
                        "failed to register provider, continuing"
                    );
                    report.failed.push((config.name.clone(), e));
                }
            }
        }

        info!(
            registered = report.registered.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "provider registration complete"
        );
        report
    }
}
