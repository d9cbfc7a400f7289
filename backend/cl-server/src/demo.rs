//! Stream consumers served by the bundled server: `echo` and `chat`.

use cl_core::{Message, Scope, event, typed};
use cl_ws::{
    CONNECTION_ID_KEY, ConsumerContext, Flow, HandlerFuture, HandlerTable, Result,
    WebsocketConsumer, decode_json,
};

use serde_json::{Value, json};

pub const CHAT_GROUP: &str = "chat";
const CHAT_MESSAGE: &str = "chat.message";

/// Sends every payload straight back.
pub struct EchoConsumer;

impl WebsocketConsumer for EchoConsumer {}

fn echo_receive<'a>(
    _consumer: &'a mut EchoConsumer,
    context: &'a ConsumerContext,
    message: Message,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let payload = decode_json(&message)?;
        context.send_json(&json!({ "echo": payload })).await?;
        Ok(Flow::Continue)
    })
}

pub fn echo_handlers() -> Result<HandlerTable<EchoConsumer>> {
    HandlerTable::websocket()?.on(event::RECEIVE, echo_receive)
}

/// Relays each payload's `text` to everyone in the chat group.
pub struct ChatConsumer {
    name: String,
}

impl ChatConsumer {
    pub fn from_scope(scope: &Scope) -> Self {
        Self {
            name: scope
                .str_value(CONNECTION_ID_KEY)
                .unwrap_or("anonymous")
                .to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl WebsocketConsumer for ChatConsumer {
    fn groups(&self) -> Vec<String> {
        vec![CHAT_GROUP.to_string()]
    }
}

/// Group message carrying one chat line.
pub fn chat_message(from: &str, text: &str) -> Message {
    let mut message = typed(CHAT_MESSAGE);
    message.insert("from".to_string(), Value::from(from));
    message.insert("text".to_string(), Value::from(text));
    message
}

fn chat_receive<'a>(
    consumer: &'a mut ChatConsumer,
    context: &'a ConsumerContext,
    message: Message,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let payload = decode_json(&message)?;
        let Some(text) = payload.get("text").and_then(Value::as_str) else {
            context
                .send_json(&json!({ "error": "payload needs a 'text' string" }))
                .await?;
            return Ok(Flow::Continue);
        };
        let delivery = context
            .group_send(CHAT_GROUP, chat_message(&consumer.name, text))
            .await?;
        if delivery.full() > 0 {
            log::warn!(
                "Chat line from {} skipped {} full mailboxes",
                consumer.name,
                delivery.full()
            );
        }
        Ok(Flow::Continue)
    })
}

fn chat_relay<'a>(
    _consumer: &'a mut ChatConsumer,
    context: &'a ConsumerContext,
    message: Message,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        context
            .send_json(&json!({
                "from": message.get("from"),
                "text": message.get("text"),
            }))
            .await?;
        Ok(Flow::Continue)
    })
}

pub fn chat_handlers() -> Result<HandlerTable<ChatConsumer>> {
    HandlerTable::websocket()?
        .on(event::RECEIVE, chat_receive)?
        .on(CHAT_MESSAGE, chat_relay)
}
