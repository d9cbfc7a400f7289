mod capacity;

use crate::{CapacityTable, InMemoryChannelLayer};

use cl_core::Message;

use std::time::Duration;

use serde_json::Value;

pub(crate) const EXPIRY: Duration = Duration::from_secs(60);
pub(crate) const GROUP_EXPIRY: Duration = Duration::from_secs(600);

pub(crate) fn layer_with_capacity(capacity: usize) -> InMemoryChannelLayer {
    InMemoryChannelLayer::new(EXPIRY, GROUP_EXPIRY, CapacityTable::new(capacity))
}

pub(crate) fn message(text: &str) -> Message {
    let mut message = cl_core::typed("test.message");
    message.insert("text".to_string(), Value::from(text));
    message
}

pub(crate) fn text_of(message: &Message) -> Option<&str> {
    message.get("text").and_then(Value::as_str)
}
