use crate::{Result, WsError};

use cl_core::{Message, Scope};

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Messages flowing from the peer into an application.
pub type Inbound = mpsc::UnboundedReceiver<Message>;

/// Where an application's outgoing messages go.
#[async_trait]
pub trait Outbound: Send + Sync {
    async fn send(&self, message: Message) -> Result<()>;
}

/// Outbound half backed by an unbounded channel.
#[derive(Clone)]
pub struct ChannelOutbound {
    sender: mpsc::UnboundedSender<Message>,
}

impl ChannelOutbound {
    pub fn new(sender: mpsc::UnboundedSender<Message>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl Outbound for ChannelOutbound {
    async fn send(&self, message: Message) -> Result<()> {
        self.sender
            .send(message)
            .map_err(|_| WsError::transport_closed())
    }
}

/// The two directions of one connection as seen by an application.
pub struct Transport {
    pub inbound: Inbound,
    pub outbound: Arc<dyn Outbound>,
}

/// The far end of a [`Transport::pair`]: feeds the application and observes
/// what it sends.
pub struct Peer {
    pub sender: mpsc::UnboundedSender<Message>,
    pub receiver: mpsc::UnboundedReceiver<Message>,
}

impl Transport {
    pub fn new(inbound: Inbound, outbound: Arc<dyn Outbound>) -> Self {
        Self { inbound, outbound }
    }

    /// A transport wired to an in-process peer.
    pub fn pair() -> (Self, Peer) {
        let (to_app, inbound) = mpsc::unbounded_channel();
        let (outbound, from_app) = mpsc::unbounded_channel();
        (
            Self::new(inbound, Arc::new(ChannelOutbound::new(outbound))),
            Peer {
                sender: to_app,
                receiver: from_app,
            },
        )
    }
}

/// Anything that can serve one connection given its scope and transport.
#[async_trait]
pub trait Application: Send + Sync {
    async fn run(&self, scope: Scope, transport: Transport) -> Result<()>;
}
