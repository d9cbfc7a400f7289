use crate::{
    ConfigError, ConfigErrorResult, DEFAULT_LAYER_ALIAS, DispatchConfig, LayerEntry,
    LoggingConfig, MultiplexConfig, ServerConfig,
};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::info;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub layers: BTreeMap<String, LayerEntry>,
    pub dispatch: DispatchConfig,
    pub multiplex: MultiplexConfig,
}

impl Config {
    /// Load config with full error handling.
    ///
    /// Loading order:
    /// 1. Check for CL_CONFIG_DIR env var, else use ./.cl/
    /// 2. Auto-create config directory if it doesn't exist
    /// 3. Load config.toml if it exists, else use defaults
    /// 4. Ensure the `default` layer alias exists
    /// 5. Apply CL_* environment variable overrides
    ///
    /// Does NOT validate - call validate() after load().
    pub fn load() -> ConfigErrorResult<Self> {
        let config_dir = Self::config_dir()?;

        if !config_dir.exists() {
            std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::Io {
                path: config_dir.clone(),
                source: e,
            })?;
        }

        let config_path = config_dir.join("config.toml");

        let mut config = if config_path.exists() {
            Self::load_toml(&config_path)?
        } else {
            Config::default()
        };

        config.ensure_default_layer();
        config.apply_env_overrides();

        Ok(config)
    }

    fn load_toml(path: &Path) -> ConfigErrorResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::Toml {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the config directory.
    /// Priority: CL_CONFIG_DIR env var > ./.cl/ (relative to cwd)
    pub fn config_dir() -> ConfigErrorResult<PathBuf> {
        if let Ok(dir) = std::env::var("CL_CONFIG_DIR") {
            return Ok(PathBuf::from(dir));
        }

        let cwd = std::env::current_dir()
            .map_err(|_| ConfigError::config("Cannot determine current working directory"))?;
        Ok(cwd.join(".cl"))
    }

    /// Validate all configuration.
    /// Call after load() to catch all errors at startup.
    pub fn validate(&self) -> ConfigErrorResult<()> {
        self.server.validate()?;
        self.logging.validate()?;
        self.dispatch.validate()?;
        self.multiplex.validate()?;

        if !self.layers.contains_key(DEFAULT_LAYER_ALIAS) {
            return Err(ConfigError::layer(format!(
                "layers.{DEFAULT_LAYER_ALIAS} must be configured"
            )));
        }

        for (alias, entry) in &self.layers {
            entry.validate(alias)?;
        }

        Ok(())
    }

    /// Get bind address as string.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Settings of the `default` layer alias.
    pub fn default_layer(&self) -> Option<&LayerEntry> {
        self.layers.get(DEFAULT_LAYER_ALIAS)
    }

    /// Log configuration summary.
    pub fn log_summary(&self) {
        info!("Configuration loaded:");
        info!(
            "  server: {}:{} (ws path {}, metrics port {})",
            self.server.host, self.server.port, self.server.ws_path, self.server.metrics_port
        );
        info!(
            "  logging: {} (colored: {}, file: {})",
            *self.logging.level,
            self.logging.colored,
            self.logging.file.as_deref().unwrap_or("stdout")
        );

        for (alias, entry) in &self.layers {
            info!(
                "  layer '{}': {:?}, expiry={}s, group_expiry={}s, capacity={} ({} overrides, test config: {})",
                alias,
                entry.config.backend,
                entry.config.expiry_secs,
                entry.config.group_expiry_secs,
                entry.config.capacity,
                entry.config.channel_capacity.len(),
                entry.test.is_some()
            );
        }

        info!(
            "  dispatch: priority types [{}]",
            self.dispatch.priority_types.join(", ")
        );
        info!(
            "  multiplex: close timeout {}ms",
            self.multiplex.close_timeout_ms
        );
    }

    fn ensure_default_layer(&mut self) {
        self.layers
            .entry(String::from(DEFAULT_LAYER_ALIAS))
            .or_default();
    }

    fn apply_env_overrides(&mut self) {
        // Server
        Self::apply_env_string("CL_SERVER_HOST", &mut self.server.host);
        Self::apply_env_parse("CL_SERVER_PORT", &mut self.server.port);
        Self::apply_env_parse("CL_SERVER_METRICS_PORT", &mut self.server.metrics_port);

        // Logging
        Self::apply_env_parse("CL_LOG_LEVEL", &mut self.logging.level);
        Self::apply_env_bool("CL_LOG_COLORED", &mut self.logging.colored);
        Self::apply_env_option_string("CL_LOG_FILE", &mut self.logging.file);

        // Default layer
        if let Some(entry) = self.layers.get_mut(DEFAULT_LAYER_ALIAS) {
            Self::apply_env_parse("CL_LAYER_EXPIRY_SECS", &mut entry.config.expiry_secs);
            Self::apply_env_parse(
                "CL_LAYER_GROUP_EXPIRY_SECS",
                &mut entry.config.group_expiry_secs,
            );
            Self::apply_env_parse("CL_LAYER_CAPACITY", &mut entry.config.capacity);
        }

        // Dispatch
        Self::apply_env_list(
            "CL_DISPATCH_PRIORITY_TYPES",
            &mut self.dispatch.priority_types,
        );

        // Multiplex
        Self::apply_env_parse(
            "CL_MUX_CLOSE_TIMEOUT_MS",
            &mut self.multiplex.close_timeout_ms,
        );
    }

    /// Helper: Apply environment variable override for String values
    fn apply_env_string(var_name: &str, target: &mut String) {
        if let Ok(val) = std::env::var(var_name) {
            *target = val;
        }
    }

    /// Helper: Apply environment variable override for bool values (accepts "true"/"1")
    fn apply_env_bool(var_name: &str, target: &mut bool) {
        if let Ok(val) = std::env::var(var_name) {
            *target = val == "true" || val == "1";
        }
    }

    /// Helper: Apply environment variable override for parseable values
    fn apply_env_parse<T: std::str::FromStr>(var_name: &str, target: &mut T) {
        if let Ok(val) = std::env::var(var_name)
            && let Ok(parsed) = val.parse()
        {
            *target = parsed;
        }
    }

    /// Helper: Apply environment variable override for Option<String> values
    fn apply_env_option_string(var_name: &str, target: &mut Option<String>) {
        if let Ok(val) = std::env::var(var_name) {
            *target = Some(val);
        }
    }

    /// Helper: Apply comma-separated environment variable override for lists
    fn apply_env_list(var_name: &str, target: &mut Vec<String>) {
        if let Ok(val) = std::env::var(var_name) {
            *target = val
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(String::from)
                .collect();
        }
    }
}
