use crate::{GroupDelivery, LayerError, Result};

use cl_core::Message;

use std::fmt;

use async_trait::async_trait;

/// Optional capabilities a layer may implement on top of send/receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Extension {
    Groups,
    Flush,
}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Groups => write!(f, "groups"),
            Self::Flush => write!(f, "flush"),
        }
    }
}

/// Contract every channel layer backend fulfils.
///
/// Layers are shared by every connection in the process, so implementations
/// must be safe to call concurrently through an `Arc<dyn ChannelLayer>`.
/// Group and flush operations default to [`LayerError::Unsupported`]; a
/// backend that implements them lists the matching [`Extension`].
#[async_trait]
pub trait ChannelLayer: Send + Sync {
    fn extensions(&self) -> &'static [Extension];

    fn supports(&self, extension: Extension) -> bool {
        self.extensions().contains(&extension)
    }

    /// Enqueue `message` on `channel`.
    async fn send(&self, channel: &str, message: Message) -> Result<()>;

    /// Wait for the next message on `channel`.
    async fn receive(&self, channel: &str) -> Result<Message>;

    /// A fresh process-unique channel name under `prefix`.
    async fn new_channel(&self, prefix: &str) -> Result<String>;

    async fn group_add(&self, _group: &str, _channel: &str) -> Result<()> {
        Err(LayerError::unsupported(Extension::Groups))
    }

    async fn group_discard(&self, _group: &str, _channel: &str) -> Result<()> {
        Err(LayerError::unsupported(Extension::Groups))
    }

    /// Best-effort fan-out to every member of `group`.
    async fn group_send(&self, _group: &str, _message: Message) -> Result<GroupDelivery> {
        Err(LayerError::unsupported(Extension::Groups))
    }

    /// Drop every channel and group.
    async fn flush(&self) -> Result<()> {
        Err(LayerError::unsupported(Extension::Flush))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
