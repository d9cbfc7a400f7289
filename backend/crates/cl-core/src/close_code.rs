//! WebSocket close codes used on the peer-facing side of a connection.

/// Normal closure
pub const NORMAL: u16 = 1000;

/// Endpoint is going away (peer navigated off, server shutdown)
pub const GOING_AWAY: u16 = 1001;

/// Protocol error detected by the endpoint
pub const PROTOCOL_ERROR: u16 = 1002;

/// Connection dropped without a close frame
pub const ABNORMAL: u16 = 1006;

/// Server hit an unexpected condition while handling the connection
pub const SERVER_ERROR: u16 = 1011;
