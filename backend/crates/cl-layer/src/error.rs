use crate::Extension;

use std::fmt;
use std::panic::Location;

use error_location::ErrorLocation;
use thiserror::Error;

/// Which naming grammar a rejected name was checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    Channel,
    Group,
}

impl fmt::Display for NameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Channel => write!(f, "Channel"),
            Self::Group => write!(f, "Group"),
        }
    }
}

#[derive(Error, Debug)]
pub enum LayerError {
    #[error("Channel {channel} is full {location}")]
    ChannelFull {
        channel: String,
        location: ErrorLocation,
    },

    #[error(
        "{kind} name must be shorter than {max} characters and contain only ASCII alphanumerics, hyphens, underscores, or periods, not '{name}' {location}"
    )]
    InvalidName {
        kind: NameKind,
        name: String,
        max: usize,
        location: ErrorLocation,
    },

    #[error("Message must not contain reserved key '{key}' {location}")]
    ReservedKey {
        key: &'static str,
        location: ErrorLocation,
    },

    #[error("Channel layer does not support the {extension} extension {location}")]
    Unsupported {
        extension: Extension,
        location: ErrorLocation,
    },

    #[error("Invalid channel layer '{alias}': {message} {location}")]
    InvalidLayer {
        alias: String,
        message: String,
        location: ErrorLocation,
    },

    #[error("Invalid capacity pattern '{pattern}': {message} {location}")]
    InvalidPattern {
        pattern: String,
        message: String,
        location: ErrorLocation,
    },
}

impl LayerError {
    #[track_caller]
    pub fn channel_full(channel: &str) -> Self {
        Self::ChannelFull {
            channel: channel.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn invalid_name(kind: NameKind, name: &str) -> Self {
        Self::InvalidName {
            kind,
            name: name.to_string(),
            max: crate::MAX_NAME_LENGTH,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn reserved_key() -> Self {
        Self::ReservedKey {
            key: cl_core::RESERVED_CHANNEL_KEY,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn unsupported(extension: Extension) -> Self {
        Self::Unsupported {
            extension,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn invalid_layer<S: Into<String>>(alias: &str, message: S) -> Self {
        Self::InvalidLayer {
            alias: alias.to_string(),
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn invalid_pattern<S: Into<String>>(pattern: &str, message: S) -> Self {
        Self::InvalidPattern {
            pattern: pattern.to_string(),
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    pub fn is_channel_full(&self) -> bool {
        matches!(self, Self::ChannelFull { .. })
    }

    /// Stable code used in log lines and metrics labels
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ChannelFull { .. } => "CHANNEL_FULL",
            Self::InvalidName { .. } => "INVALID_NAME",
            Self::ReservedKey { .. } => "RESERVED_KEY",
            Self::Unsupported { .. } => "UNSUPPORTED",
            Self::InvalidLayer { .. } => "INVALID_LAYER",
            Self::InvalidPattern { .. } => "INVALID_PATTERN",
        }
    }
}

pub type Result<T> = std::result::Result<T, LayerError>;
