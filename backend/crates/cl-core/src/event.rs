//! WebSocket event vocabulary shared by transports, consumers and the multiplexer.
//!
//! Inbound (peer -> application): `websocket.connect`, `websocket.receive`,
//! `websocket.disconnect`. Outbound (application -> peer): `websocket.accept`,
//! `websocket.send`, `websocket.close`.

use crate::{Message, typed};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;

pub const CONNECT: &str = "websocket.connect";
pub const RECEIVE: &str = "websocket.receive";
pub const DISCONNECT: &str = "websocket.disconnect";
pub const ACCEPT: &str = "websocket.accept";
pub const SEND: &str = "websocket.send";
pub const CLOSE: &str = "websocket.close";

const TEXT_KEY: &str = "text";
const BYTES_KEY: &str = "bytes";
const CODE_KEY: &str = "code";
const REASON_KEY: &str = "reason";
const SUBPROTOCOL_KEY: &str = "subprotocol";

pub fn connect() -> Message {
    typed(CONNECT)
}

pub fn receive_text(text: impl Into<String>) -> Message {
    let mut message = typed(RECEIVE);
    message.insert(TEXT_KEY.into(), Value::String(text.into()));
    message
}

/// Binary payloads travel base64-encoded so messages stay plain JSON maps.
pub fn receive_bytes(bytes: &[u8]) -> Message {
    let mut message = typed(RECEIVE);
    message.insert(BYTES_KEY.into(), Value::String(STANDARD.encode(bytes)));
    message
}

pub fn disconnect(code: u16) -> Message {
    let mut message = typed(DISCONNECT);
    message.insert(CODE_KEY.into(), Value::from(code));
    message
}

pub fn accept(subprotocol: Option<&str>) -> Message {
    let mut message = typed(ACCEPT);
    if let Some(subprotocol) = subprotocol {
        message.insert(SUBPROTOCOL_KEY.into(), Value::String(subprotocol.to_string()));
    }
    message
}

pub fn send_text(text: impl Into<String>) -> Message {
    let mut message = typed(SEND);
    message.insert(TEXT_KEY.into(), Value::String(text.into()));
    message
}

pub fn send_bytes(bytes: &[u8]) -> Message {
    let mut message = typed(SEND);
    message.insert(BYTES_KEY.into(), Value::String(STANDARD.encode(bytes)));
    message
}

pub fn close(code: Option<u16>, reason: Option<&str>) -> Message {
    let mut message = typed(CLOSE);
    if let Some(code) = code {
        message.insert(CODE_KEY.into(), Value::from(code));
    }
    if let Some(reason) = reason {
        message.insert(REASON_KEY.into(), Value::String(reason.to_string()));
    }
    message
}

pub fn text(message: &Message) -> Option<&str> {
    message.get(TEXT_KEY).and_then(Value::as_str)
}

/// Decoded binary payload; `None` when absent or not valid base64.
pub fn bytes(message: &Message) -> Option<Vec<u8>> {
    message
        .get(BYTES_KEY)
        .and_then(Value::as_str)
        .and_then(|encoded| STANDARD.decode(encoded).ok())
}

pub fn code(message: &Message) -> Option<u16> {
    message
        .get(CODE_KEY)
        .and_then(Value::as_u64)
        .and_then(|code| u16::try_from(code).ok())
}

pub fn reason(message: &Message) -> Option<&str> {
    message.get(REASON_KEY).and_then(Value::as_str)
}

pub fn subprotocol(message: &Message) -> Option<&str> {
    message.get(SUBPROTOCOL_KEY).and_then(Value::as_str)
}
