use serde_json::{Map, Value};

/// Opaque key/value message passed through channels and handlers.
///
/// Anything that enters dispatch must carry a string `"type"` entry.
pub type Message = Map<String, Value>;

/// Key holding the dot-segmented message type.
pub const TYPE_KEY: &str = "type";

/// Routing key reserved for the layer itself; callers must never supply it.
pub const RESERVED_CHANNEL_KEY: &str = "__asgi_channel__";

/// Returns the message type if present and a string.
pub fn message_type(message: &Message) -> Option<&str> {
    message.get(TYPE_KEY).and_then(Value::as_str)
}

/// Create an otherwise empty message of the given type.
pub fn typed(message_type: &str) -> Message {
    let mut message = Map::new();
    message.insert(TYPE_KEY.to_string(), Value::String(message_type.to_string()));
    message
}
