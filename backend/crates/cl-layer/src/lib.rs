pub mod capacity;
pub mod channel_layer;
pub mod delivery;
pub mod error;
pub mod in_memory;
pub mod metrics;
pub mod names;
pub mod registry;

pub use capacity::CapacityTable;
pub use channel_layer::{ChannelLayer, Extension};
pub use delivery::{Delivery, GroupDelivery};
pub use error::{LayerError, NameKind, Result};
pub use in_memory::InMemoryChannelLayer;
pub use metrics::LayerMetrics;
pub use names::{
    DEFAULT_CHANNEL_PREFIX, MAX_NAME_LENGTH, non_local_name, validate_channel_name,
    validate_group_name,
};
pub use registry::LayerRegistry;

#[cfg(test)]
mod tests;
