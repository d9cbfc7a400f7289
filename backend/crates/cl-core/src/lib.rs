pub mod close_code;
pub mod event;
pub mod message;
pub mod scope;

pub use error_location::ErrorLocation;
pub use message::{Message, RESERVED_CHANNEL_KEY, TYPE_KEY, message_type, typed};
pub use scope::Scope;

#[cfg(test)]
mod tests;
