#![allow(dead_code)]

use cl_core::{Message, Scope, event, message_type};
use cl_ws::{
    Application, ConsumerContext, Flow, HandlerFuture, HandlerTable, Result, Transport,
    WebsocketConsumer, WsError,
};

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::timeout;

pub const WAIT: Duration = Duration::from_secs(5);

/// Next message the application sent to the peer.
pub async fn next_sent(receiver: &mut UnboundedReceiver<Message>) -> Message {
    timeout(WAIT, receiver.recv())
        .await
        .expect("Timed out waiting for the application")
        .expect("Application dropped its outbound")
}

/// True when nothing arrives within a short quiet period.
pub async fn nothing_sent(receiver: &mut UnboundedReceiver<Message>) -> bool {
    timeout(Duration::from_millis(50), receiver.recv())
        .await
        .is_err()
}

pub fn scope(connection_id: &str) -> Scope {
    Scope::websocket("/ws/").with_value("connection_id", connection_id.into())
}

/// Accepts on connect, echoes text back, stops on disconnect.
pub struct Echo;

impl WebsocketConsumer for Echo {}

fn echo_receive<'a>(
    _consumer: &'a mut Echo,
    context: &'a ConsumerContext,
    message: Message,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let text = event::text(&message).unwrap_or_default().to_string();
        context.send_text(text).await?;
        Ok(Flow::Continue)
    })
}

pub fn echo_handlers() -> HandlerTable<Echo> {
    HandlerTable::websocket()
        .and_then(|table| table.on(event::RECEIVE, echo_receive))
        .expect("Echo handlers should register")
}

/// Receive handler announces itself, then takes a minute.
#[derive(Default)]
pub struct Slow {
    pub started: bool,
    pub finished: bool,
}

fn slow_receive<'a>(
    consumer: &'a mut Slow,
    context: &'a ConsumerContext,
    _message: Message,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        consumer.started = true;
        context.send_text("started").await?;
        tokio::time::sleep(Duration::from_secs(60)).await;
        consumer.finished = true;
        context.send_text("done").await?;
        Ok(Flow::Continue)
    })
}

fn slow_disconnect<'a>(
    _consumer: &'a mut Slow,
    context: &'a ConsumerContext,
    _message: Message,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        context.send_text("bye").await?;
        Ok(Flow::Stop)
    })
}

pub fn slow_handlers() -> HandlerTable<Slow> {
    HandlerTable::new()
        .on(event::RECEIVE, slow_receive)
        .and_then(|table| table.on(event::DISCONNECT, slow_disconnect))
        .expect("Slow handlers should register")
}

/// Child application steered by the test: whatever is pushed through
/// `commands` is sent outward, everything received is reported on `seen`.
/// A `test.fail` command makes it fail.
pub struct Puppet {
    commands: Mutex<Option<UnboundedReceiver<Message>>>,
    seen: UnboundedSender<Message>,
    disconnect_delay: Duration,
    fail_on_disconnect: bool,
}

impl Puppet {
    /// Return an error instead of finishing cleanly once disconnected.
    pub fn failing_on_disconnect(mut self) -> Self {
        self.fail_on_disconnect = true;
        self
    }
}

pub struct PuppetHandle {
    pub commands: UnboundedSender<Message>,
    pub seen: UnboundedReceiver<Message>,
}

pub const FAIL: &str = "test.fail";

pub fn puppet(disconnect_delay: Duration) -> (Puppet, PuppetHandle) {
    let (commands_tx, commands) = mpsc::unbounded_channel();
    let (seen, seen_rx) = mpsc::unbounded_channel();
    (
        Puppet {
            commands: Mutex::new(Some(commands)),
            seen,
            disconnect_delay,
            fail_on_disconnect: false,
        },
        PuppetHandle {
            commands: commands_tx,
            seen: seen_rx,
        },
    )
}

#[async_trait]
impl Application for Puppet {
    async fn run(&self, _scope: Scope, mut transport: Transport) -> Result<()> {
        let mut commands = self
            .commands
            .lock()
            .expect("Puppet lock poisoned")
            .take()
            .ok_or_else(|| WsError::handler("puppet already running"))?;

        loop {
            tokio::select! {
                Some(command) = commands.recv() => {
                    if message_type(&command) == Some(FAIL) {
                        return Err(WsError::handler("puppet told to fail"));
                    }
                    transport.outbound.send(command).await?;
                }
                message = transport.inbound.recv() => {
                    let Some(message) = message else {
                        return Ok(());
                    };
                    let disconnect = message_type(&message) == Some(event::DISCONNECT);
                    let _ = self.seen.send(message);
                    if disconnect {
                        tokio::time::sleep(self.disconnect_delay).await;
                        if self.fail_on_disconnect {
                            return Err(WsError::handler("puppet failed while disconnecting"));
                        }
                        return Ok(());
                    }
                }
            }
        }
    }
}

/// Accepts and immediately finishes.
pub struct AcceptAndLeave;

#[async_trait]
impl Application for AcceptAndLeave {
    async fn run(&self, _scope: Scope, transport: Transport) -> Result<()> {
        transport.outbound.send(event::accept(None)).await
    }
}
