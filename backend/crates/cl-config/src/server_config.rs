use crate::{ConfigError, ConfigErrorResult, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_WS_PATH, MIN_PORT};

use serde::Deserialize;

/// Where the demo server listens.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Route the WebSocket endpoint is mounted on
    pub ws_path: String,
    /// Prometheus exporter port; 0 disables the exporter
    pub metrics_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::from(DEFAULT_HOST),
            port: DEFAULT_PORT,
            ws_path: String::from(DEFAULT_WS_PATH),
            metrics_port: 0,
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> ConfigErrorResult<()> {
        if self.port != 0 && self.port < MIN_PORT {
            return Err(ConfigError::server(format!(
                "server.port must be 0 or >= {}, got {}",
                MIN_PORT, self.port
            )));
        }

        if self.metrics_port != 0 && self.metrics_port < MIN_PORT {
            return Err(ConfigError::server(format!(
                "server.metrics_port must be 0 or >= {}, got {}",
                MIN_PORT, self.metrics_port
            )));
        }

        if self.metrics_port != 0 && self.metrics_port == self.port {
            return Err(ConfigError::server(
                "server.metrics_port must differ from server.port",
            ));
        }

        if !self.ws_path.starts_with('/') {
            return Err(ConfigError::server(format!(
                "server.ws_path must start with '/', got '{}'",
                self.ws_path
            )));
        }

        Ok(())
    }
}
