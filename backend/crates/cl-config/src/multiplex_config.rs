use crate::{ConfigError, ConfigErrorResult};

use std::time::Duration;

use serde::Deserialize;

// Application close timeout constraints (milliseconds)
pub const MIN_CLOSE_TIMEOUT_MS: u64 = 10;
pub const MAX_CLOSE_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_CLOSE_TIMEOUT_MS: u64 = 10_000;

/// Multiplexing supervisor settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MultiplexConfig {
    /// How long stream children get to finish after a disconnect
    pub close_timeout_ms: u64,
}

impl Default for MultiplexConfig {
    fn default() -> Self {
        Self {
            close_timeout_ms: DEFAULT_CLOSE_TIMEOUT_MS,
        }
    }
}

impl MultiplexConfig {
    pub fn close_timeout(&self) -> Duration {
        Duration::from_millis(self.close_timeout_ms)
    }

    pub fn validate(&self) -> ConfigErrorResult<()> {
        if self.close_timeout_ms < MIN_CLOSE_TIMEOUT_MS
            || self.close_timeout_ms > MAX_CLOSE_TIMEOUT_MS
        {
            return Err(ConfigError::config(format!(
                "multiplex.close_timeout_ms must be {}-{}, got {}",
                MIN_CLOSE_TIMEOUT_MS, MAX_CLOSE_TIMEOUT_MS, self.close_timeout_ms
            )));
        }

        Ok(())
    }
}
