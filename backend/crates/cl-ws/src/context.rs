use crate::{Outbound, Result, WsError};

use cl_core::{Message, Scope};
use cl_layer::{ChannelLayer, GroupDelivery, LayerError};

use std::sync::Arc;

/// Scope key the server stores its connection id under
pub const CONNECTION_ID_KEY: &str = "connection_id";

/// Everything a handler can reach besides its own consumer state.
pub struct ConsumerContext {
    scope: Scope,
    outbound: Arc<dyn Outbound>,
    layer: Option<Arc<dyn ChannelLayer>>,
    channel_name: Option<String>,
}

impl ConsumerContext {
    pub fn new(
        scope: Scope,
        outbound: Arc<dyn Outbound>,
        layer: Option<Arc<dyn ChannelLayer>>,
    ) -> Self {
        Self {
            scope,
            outbound,
            layer,
            channel_name: None,
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn layer(&self) -> Option<&Arc<dyn ChannelLayer>> {
        self.layer.as_ref()
    }

    /// This connection's private mailbox, once the loop has started
    pub fn channel_name(&self) -> Option<&str> {
        self.channel_name.as_deref()
    }

    pub(crate) fn set_layer(&mut self, layer: Arc<dyn ChannelLayer>) {
        self.layer = Some(layer);
    }

    pub(crate) fn set_channel_name(&mut self, channel_name: String) {
        self.channel_name = Some(channel_name);
    }

    /// Identity used in log lines
    pub fn label(&self) -> &str {
        self.scope
            .str_value(CONNECTION_ID_KEY)
            .or_else(|| self.scope.str_value(crate::STREAM_SCOPE_KEY))
            .unwrap_or("-")
    }

    /// Send a raw message to the peer.
    pub async fn send(&self, message: Message) -> Result<()> {
        self.outbound.send(message).await
    }

    /// The layer and mailbox, or an error when the consumer runs without one.
    pub fn mailbox(&self) -> Result<(&Arc<dyn ChannelLayer>, &str)> {
        match (&self.layer, &self.channel_name) {
            (Some(layer), Some(channel)) => Ok((layer, channel)),
            _ => Err(WsError::from(LayerError::invalid_layer(
                "-",
                "consumer has no channel layer",
            ))),
        }
    }

    pub async fn join_groups(&self, groups: &[String]) -> Result<()> {
        if groups.is_empty() {
            return Ok(());
        }
        let (layer, channel) = self.mailbox()?;
        for group in groups {
            layer.group_add(group, channel).await?;
        }
        Ok(())
    }

    pub async fn leave_groups(&self, groups: &[String]) -> Result<()> {
        if groups.is_empty() {
            return Ok(());
        }
        let (layer, channel) = self.mailbox()?;
        for group in groups {
            layer.group_discard(group, channel).await?;
        }
        Ok(())
    }

    pub async fn group_send(&self, group: &str, message: Message) -> Result<GroupDelivery> {
        let layer = self.layer.as_ref().ok_or_else(|| {
            WsError::from(LayerError::invalid_layer("-", "consumer has no channel layer"))
        })?;
        Ok(layer.group_send(group, message).await?)
    }
}
