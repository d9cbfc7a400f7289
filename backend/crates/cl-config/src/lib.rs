mod config;
mod dispatch_config;
mod error;
mod layer_config;
mod log_level;
mod logging_config;
mod multiplex_config;
mod server_config;

pub use config::Config;
pub use dispatch_config::{DEFAULT_PRIORITY_TYPE, DispatchConfig};
pub use error::{ConfigError, ConfigErrorResult};
pub use layer_config::{
    CapacityOverride, DEFAULT_CAPACITY, DEFAULT_EXPIRY_SECS, DEFAULT_GROUP_EXPIRY_SECS,
    LayerBackend, LayerConfig, LayerEntry, PatternKind,
};
pub use log_level::LogLevel;
pub use logging_config::LoggingConfig;
pub use multiplex_config::{DEFAULT_CLOSE_TIMEOUT_MS, MultiplexConfig};
pub use server_config::ServerConfig;

#[cfg(test)]
mod tests;

/// Alias every deployment has, used when a component does not name one.
pub const DEFAULT_LAYER_ALIAS: &str = "default";

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8000;
const MIN_PORT: u16 = 1024;
const DEFAULT_WS_PATH: &str = "/ws/";
const DEFAULT_LOG_LEVEL_STRING: &str = "info";
const DEFAULT_LOG_LEVEL: log::LevelFilter = log::LevelFilter::Info;
const DEFAULT_LOG_DIRECTORY: &str = "log";
