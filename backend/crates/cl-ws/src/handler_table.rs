use crate::{ConsumerContext, Result, WsError};

use cl_core::{Message, message_type};

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use log::debug;

/// What the dispatch loop does after a handler returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// End the loop cleanly
    Stop,
}

pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = Result<Flow>> + Send + 'a>>;

/// A consumer method bound to one message type.
pub type Handler<C> =
    for<'a> fn(&'a mut C, &'a ConsumerContext, Message) -> HandlerFuture<'a>;

/// Handler name for a message type: dots become underscores.
/// Names starting with an underscore are private and never dispatched.
pub fn handler_name(message_type: &str) -> Result<String> {
    let name = message_type.replace('.', "_");
    if name.is_empty() {
        return Err(WsError::malformed_type(Some(message_type), "empty type"));
    }
    if name.starts_with('_') {
        return Err(WsError::malformed_type(
            Some(message_type),
            "leading underscore",
        ));
    }
    Ok(name)
}

/// Explicit message-type to handler mapping for a consumer type.
pub struct HandlerTable<C> {
    handlers: HashMap<String, Handler<C>>,
}

impl<C> HandlerTable<C> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Bind `handler` to `message_type`, replacing any earlier binding.
    pub fn on(mut self, message_type: &str, handler: Handler<C>) -> Result<Self> {
        let name = handler_name(message_type)?;
        if self.handlers.insert(name, handler).is_some() {
            debug!("Replaced handler for {}", message_type);
        }
        Ok(self)
    }

    pub fn handles(&self, message_type: &str) -> bool {
        handler_name(message_type)
            .map(|name| self.handlers.contains_key(&name))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Find the handler for `message`, failing on a missing or malformed type
    /// or an unbound one.
    pub fn resolve(&self, message: &Message) -> Result<Handler<C>> {
        let message_type = message_type(message)
            .ok_or_else(|| WsError::malformed_type(None, "message has no string 'type'"))?;
        let name = handler_name(message_type)?;
        self.handlers
            .get(&name)
            .copied()
            .ok_or_else(|| WsError::unknown_handler(message_type))
    }
}

impl<C> Default for HandlerTable<C> {
    fn default() -> Self {
        Self::new()
    }
}
