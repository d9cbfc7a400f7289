use crate::{ConfigError, ConfigErrorResult};

use std::time::Duration;

use serde::Deserialize;

// Message expiry constraints (seconds)
pub const MIN_EXPIRY_SECS: u64 = 1;
pub const MAX_EXPIRY_SECS: u64 = 3600;
pub const DEFAULT_EXPIRY_SECS: u64 = 60;

// Group membership expiry constraints (seconds)
pub const MIN_GROUP_EXPIRY_SECS: u64 = 1;
pub const MAX_GROUP_EXPIRY_SECS: u64 = 7 * 86_400;
pub const DEFAULT_GROUP_EXPIRY_SECS: u64 = 86_400;

// Per-channel capacity constraints
pub const MIN_CAPACITY: usize = 1;
pub const MAX_CAPACITY: usize = 1_000_000;
pub const DEFAULT_CAPACITY: usize = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerBackend {
    #[default]
    InMemory,
}

/// How a capacity override pattern is matched against channel names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    /// Shell-style glob over the whole name (`*`, `?`, `[..]`)
    #[default]
    Glob,
    /// Regular expression that must match at the start of the name
    Regex,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CapacityOverride {
    pub pattern: String,
    pub capacity: usize,
    #[serde(default)]
    pub kind: PatternKind,
}

/// Settings for one channel layer instance.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LayerConfig {
    pub backend: LayerBackend,
    /// Seconds a message survives unconsumed
    pub expiry_secs: u64,
    /// Seconds a group membership survives without a refresh
    pub group_expiry_secs: u64,
    /// Default bound on unexpired messages per channel
    pub capacity: usize,
    /// Ordered overrides; the first matching pattern wins
    pub channel_capacity: Vec<CapacityOverride>,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            backend: LayerBackend::InMemory,
            expiry_secs: DEFAULT_EXPIRY_SECS,
            group_expiry_secs: DEFAULT_GROUP_EXPIRY_SECS,
            capacity: DEFAULT_CAPACITY,
            channel_capacity: Vec::new(),
        }
    }
}

impl LayerConfig {
    pub fn expiry(&self) -> Duration {
        Duration::from_secs(self.expiry_secs)
    }

    pub fn group_expiry(&self) -> Duration {
        Duration::from_secs(self.group_expiry_secs)
    }

    /// Validate all fields are within acceptable ranges.
    ///
    /// Patterns are only checked for emptiness here; they are compiled when
    /// the layer is built.
    pub fn validate(&self, alias: &str) -> ConfigErrorResult<()> {
        if self.expiry_secs < MIN_EXPIRY_SECS || self.expiry_secs > MAX_EXPIRY_SECS {
            return Err(ConfigError::layer(format!(
                "layers.{}.expiry_secs must be {}-{}, got {}",
                alias, MIN_EXPIRY_SECS, MAX_EXPIRY_SECS, self.expiry_secs
            )));
        }

        if self.group_expiry_secs < MIN_GROUP_EXPIRY_SECS
            || self.group_expiry_secs > MAX_GROUP_EXPIRY_SECS
        {
            return Err(ConfigError::layer(format!(
                "layers.{}.group_expiry_secs must be {}-{}, got {}",
                alias, MIN_GROUP_EXPIRY_SECS, MAX_GROUP_EXPIRY_SECS, self.group_expiry_secs
            )));
        }

        Self::validate_capacity(alias, "capacity", self.capacity)?;

        for entry in &self.channel_capacity {
            if entry.pattern.is_empty() {
                return Err(ConfigError::layer(format!(
                    "layers.{alias}.channel_capacity patterns cannot be empty"
                )));
            }
            Self::validate_capacity(alias, &entry.pattern, entry.capacity)?;
        }

        Ok(())
    }

    fn validate_capacity(alias: &str, field: &str, capacity: usize) -> ConfigErrorResult<()> {
        if !(MIN_CAPACITY..=MAX_CAPACITY).contains(&capacity) {
            return Err(ConfigError::layer(format!(
                "layers.{}.{} capacity must be {}-{}, got {}",
                alias, field, MIN_CAPACITY, MAX_CAPACITY, capacity
            )));
        }
        Ok(())
    }
}

/// One `[layers.<alias>]` table: the live settings plus an optional
/// configuration used when tests build a throwaway layer for the alias.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LayerEntry {
    #[serde(flatten)]
    pub config: LayerConfig,
    pub test: Option<LayerConfig>,
}

impl LayerEntry {
    pub fn validate(&self, alias: &str) -> ConfigErrorResult<()> {
        self.config.validate(alias)?;
        if let Some(test) = &self.test {
            test.validate(&format!("{alias}.test"))?;
        }
        Ok(())
    }
}
