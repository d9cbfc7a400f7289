//! Generic websocket consumer behaviour on top of [`ConsumerContext`].

use crate::{ConsumerContext, Flow, HandlerFuture, HandlerTable, Result, WsError};

use cl_core::{Message, event};
use cl_layer::GroupDelivery;

use serde::Serialize;
use serde_json::Value;

impl ConsumerContext {
    /// Accept the connection, optionally selecting a subprotocol.
    pub async fn accept(&self, subprotocol: Option<&str>) -> Result<()> {
        self.send(event::accept(subprotocol)).await
    }

    pub async fn send_text(&self, text: impl Into<String> + Send) -> Result<()> {
        self.send(event::send_text(text)).await
    }

    pub async fn send_bytes(&self, bytes: &[u8]) -> Result<()> {
        self.send(event::send_bytes(bytes)).await
    }

    /// Serialize `value` and send it as a text frame.
    pub async fn send_json<T: Serialize + Sync>(&self, value: &T) -> Result<()> {
        let text = serde_json::to_string(value)?;
        self.send_text(text).await
    }

    /// Close (or, before accepting, deny) the connection.
    pub async fn close(&self, code: Option<u16>) -> Result<()> {
        self.send(event::close(code, None)).await
    }

    /// Relay `message` to every member of `group` as a `websocket.send`.
    pub async fn broadcast_text(&self, group: &str, text: &str) -> Result<GroupDelivery> {
        self.group_send(group, event::send_text(text)).await
    }
}

/// Parse the text payload of a `websocket.receive` as JSON.
pub fn decode_json(message: &Message) -> Result<Value> {
    let text = event::text(message)
        .ok_or_else(|| WsError::handler("websocket.receive carries no text payload"))?;
    Ok(serde_json::from_str(text)?)
}

/// A consumer driven by websocket events.
///
/// `groups` lists the groups the connection's mailbox joins on connect and
/// leaves on disconnect.
pub trait WebsocketConsumer: Send + Sized + 'static {
    fn groups(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Default `websocket.connect`: join groups, then accept.
pub fn websocket_connect<'a, C: WebsocketConsumer>(
    consumer: &'a mut C,
    context: &'a ConsumerContext,
    _message: Message,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        context.join_groups(&consumer.groups()).await?;
        context.accept(None).await?;
        Ok(Flow::Continue)
    })
}

/// Default `websocket.disconnect`: leave groups, then stop.
pub fn websocket_disconnect<'a, C: WebsocketConsumer>(
    consumer: &'a mut C,
    context: &'a ConsumerContext,
    _message: Message,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        context.leave_groups(&consumer.groups()).await?;
        Ok(Flow::Stop)
    })
}

impl<C: WebsocketConsumer> HandlerTable<C> {
    /// Table with the default connect and disconnect handlers bound.
    pub fn websocket() -> Result<Self> {
        Self::new()
            .on(event::CONNECT, websocket_connect::<C>)?
            .on(event::DISCONNECT, websocket_disconnect::<C>)
    }
}
