use cl_layer::LayerError;

use std::panic::Location;

use error_location::ErrorLocation;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WsError {
    #[error("Channel layer error: {source} {location}")]
    Layer {
        #[source]
        source: LayerError,
        location: ErrorLocation,
    },

    #[error("Malformed message type {message_type:?}: {reason} {location}")]
    MalformedType {
        message_type: Option<String>,
        reason: &'static str,
        location: ErrorLocation,
    },

    #[error("No handler for message type {message_type} {location}")]
    UnknownHandler {
        message_type: String,
        location: ErrorLocation,
    },

    #[error("Invalid multiplexed frame: {message} {location}")]
    ProtocolViolation {
        message: String,
        location: ErrorLocation,
    },

    #[error("Dispatch loop already started {location}")]
    AlreadyStarted { location: ErrorLocation },

    #[error("Transport closed {location}")]
    TransportClosed { location: ErrorLocation },

    #[error("Handler failed: {message} {location}")]
    Handler {
        message: String,
        location: ErrorLocation,
    },

    #[error("Stream {stream} failed: {message} {location}")]
    ChildFailed {
        stream: String,
        message: String,
        location: ErrorLocation,
    },

    #[error("JSON error: {source} {location}")]
    Json {
        #[source]
        source: serde_json::Error,
        location: ErrorLocation,
    },
}

impl WsError {
    #[track_caller]
    pub fn malformed_type(message_type: Option<&str>, reason: &'static str) -> Self {
        Self::MalformedType {
            message_type: message_type.map(String::from),
            reason,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn unknown_handler(message_type: &str) -> Self {
        Self::UnknownHandler {
            message_type: message_type.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn protocol<S: Into<String>>(message: S) -> Self {
        Self::ProtocolViolation {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn already_started() -> Self {
        Self::AlreadyStarted {
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn transport_closed() -> Self {
        Self::TransportClosed {
            location: ErrorLocation::from(Location::caller()),
        }
    }

    /// Failure raised by application code inside a handler
    #[track_caller]
    pub fn handler<S: Into<String>>(message: S) -> Self {
        Self::Handler {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn child_failed<S: Into<String>>(stream: &str, message: S) -> Self {
        Self::ChildFailed {
            stream: stream.to_string(),
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Layer { source, .. } => source.error_code(),
            Self::MalformedType { .. } => "MALFORMED_TYPE",
            Self::UnknownHandler { .. } => "UNKNOWN_HANDLER",
            Self::ProtocolViolation { .. } => "PROTOCOL_VIOLATION",
            Self::AlreadyStarted { .. } => "ALREADY_STARTED",
            Self::TransportClosed { .. } => "TRANSPORT_CLOSED",
            Self::Handler { .. } => "HANDLER_ERROR",
            Self::ChildFailed { .. } => "CHILD_FAILED",
            Self::Json { .. } => "JSON_ERROR",
        }
    }
}

impl From<LayerError> for WsError {
    #[track_caller]
    fn from(source: LayerError) -> Self {
        Self::Layer {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<serde_json::Error> for WsError {
    #[track_caller]
    fn from(source: serde_json::Error) -> Self {
        Self::Json {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

pub type Result<T> = std::result::Result<T, WsError>;
