use super::zarinpal::ZarinpalProvider;
use super::zibal::ZibalProvider;
use crate::config::GatewayConfig;
use crate::domain::gateway::GatewayProviderRef;
use crate::error::{PaymentError, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// Builds a ready-to-use gateway from the process configuration.
pub type ProviderFactory = Box<dyn Fn(&GatewayConfig) -> Result<GatewayProviderRef> + Send + Sync>;

/// Named gateway constructors, consulted once at startup.
pub struct ProviderRegistry {
    factories: BTreeMap<String, ProviderFactory>,
}

impl ProviderRegistry {
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registry holding the Zarinpal and Zibal integrations.
    pub fn with_builtin() -> Self {
        let mut registry = Self::empty();
        registry.register("zarinpal", Box::new(zarinpal));
        registry.register("zibal", Box::new(zibal));
        registry
    }

    /// Adds or replaces the factory for `name` (case-insensitive).
    pub fn register(&mut self, name: &str, factory: ProviderFactory) {
        self.factories.insert(name.to_ascii_lowercase(), factory);
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn resolve(&self, name: &str, config: &GatewayConfig) -> Result<GatewayProviderRef> {
        let key = name.trim().to_ascii_lowercase();
        let factory = self
            .factories
            .get(&key)
            .ok_or_else(|| PaymentError::UnsupportedProvider(name.to_string()))?;
        let provider = factory(config)?;
        info!(gateway = provider.name(), environment = ?config.environment, "Payment gateway resolved");
        Ok(provider)
    }
}

fn zarinpal(config: &GatewayConfig) -> Result<GatewayProviderRef> {
    Ok(Arc::new(ZarinpalProvider::from_config(config)?))
}

fn zibal(config: &GatewayConfig) -> Result<GatewayProviderRef> {
    Ok(Arc::new(ZibalProvider::from_config(config)?))
}
