use crate::{ConfigError, ConfigErrorResult};

use serde::Deserialize;

pub const DEFAULT_PRIORITY_TYPE: &str = "websocket.disconnect";

/// Dispatch core settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Message types that preempt the handler currently running
    pub priority_types: Vec<String>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            priority_types: vec![String::from(DEFAULT_PRIORITY_TYPE)],
        }
    }
}

impl DispatchConfig {
    pub fn validate(&self) -> ConfigErrorResult<()> {
        for message_type in &self.priority_types {
            if message_type.trim().is_empty() {
                return Err(ConfigError::config(
                    "dispatch.priority_types cannot contain empty entries",
                ));
            }
            if message_type.starts_with('_') {
                return Err(ConfigError::config(format!(
                    "dispatch.priority_types entry '{message_type}' cannot start with '_'"
                )));
            }
        }

        Ok(())
    }
}
