pub mod context;
pub mod dispatch_core;
pub mod error;
pub mod handler_table;
pub mod metrics;
pub mod multiplexer;
pub mod transport;
pub mod websocket;

pub use context::{CONNECTION_ID_KEY, ConsumerContext};
pub use dispatch_core::{ConsumerApp, DispatchCore, DispatchState};
pub use error::{Result, WsError};
pub use handler_table::{Flow, Handler, HandlerFuture, HandlerTable, handler_name};
pub use metrics::WsMetrics;
pub use multiplexer::{Multiplexer, STREAM_SCOPE_KEY};
pub use transport::{Application, ChannelOutbound, Inbound, Outbound, Peer, Transport};
pub use websocket::{WebsocketConsumer, decode_json, websocket_connect, websocket_disconnect};

#[cfg(test)]
mod tests;
