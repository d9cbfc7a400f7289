use crate::{ChannelLayer, InMemoryChannelLayer, LayerError, Result};

use cl_config::{Config, DEFAULT_LAYER_ALIAS, LayerBackend, LayerConfig, LayerEntry};

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use log::info;

/// Named channel layers, built lazily from configuration on first use.
///
/// Constructed once at startup and handed to whatever needs a layer; there
/// is no process-global instance.
pub struct LayerRegistry {
    configs: BTreeMap<String, LayerEntry>,
    layers: RwLock<HashMap<String, Arc<dyn ChannelLayer>>>,
}

impl LayerRegistry {
    /// Registry with no configured aliases; layers must be added with `set`.
    pub fn new() -> Self {
        Self::with_configs(BTreeMap::new())
    }

    pub fn from_config(config: &Config) -> Self {
        Self::with_configs(config.layers.clone())
    }

    pub fn with_configs(configs: BTreeMap<String, LayerEntry>) -> Self {
        Self {
            configs,
            layers: RwLock::new(HashMap::new()),
        }
    }

    /// True when `alias` is configured or has been set explicitly.
    pub fn contains(&self, alias: &str) -> bool {
        self.configs.contains_key(alias)
            || self
                .layers
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .contains_key(alias)
    }

    /// The layer for `alias`, building it from its configuration the first time.
    pub fn get(&self, alias: &str) -> Result<Arc<dyn ChannelLayer>> {
        if let Some(layer) = self
            .layers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(alias)
        {
            return Ok(Arc::clone(layer));
        }

        let entry = self
            .configs
            .get(alias)
            .ok_or_else(|| LayerError::invalid_layer(alias, "no configuration for alias"))?;

        let mut layers = self.layers.write().unwrap_or_else(PoisonError::into_inner);
        // Another caller may have built it while we waited for the write lock.
        if let Some(layer) = layers.get(alias) {
            return Ok(Arc::clone(layer));
        }

        let layer = Self::build(&entry.config)?;
        info!(
            "Built {:?} channel layer for alias '{}'",
            entry.config.backend, alias
        );
        layers.insert(alias.to_string(), Arc::clone(&layer));
        Ok(layer)
    }

    /// The `default` alias
    pub fn default_layer(&self) -> Result<Arc<dyn ChannelLayer>> {
        self.get(DEFAULT_LAYER_ALIAS)
    }

    /// Point `alias` at `layer`, returning the layer it replaced.
    pub fn set(
        &self,
        alias: &str,
        layer: Arc<dyn ChannelLayer>,
    ) -> Option<Arc<dyn ChannelLayer>> {
        self.layers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(alias.to_string(), layer)
    }

    /// A fresh, unshared layer built from the alias's `test` configuration.
    pub fn make_test_layer(&self, alias: &str) -> Result<Arc<dyn ChannelLayer>> {
        let test = self
            .configs
            .get(alias)
            .and_then(|entry| entry.test.as_ref())
            .ok_or_else(|| LayerError::invalid_layer(alias, "no test configuration for alias"))?;
        Self::build(test)
    }

    pub fn build(config: &LayerConfig) -> Result<Arc<dyn ChannelLayer>> {
        match config.backend {
            LayerBackend::InMemory => Ok(Arc::new(InMemoryChannelLayer::from_config(config)?)),
        }
    }
}

impl Default for LayerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
