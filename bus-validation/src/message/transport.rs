//! Raw transport-level messages.

use super::{headers, Headers};
use serde::{Deserialize, Serialize};

/// A serialized message as it travels over the transport.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransportMessage {
    /// Transport headers.
    pub headers: Headers,
    /// Serialized body.
    pub body: Vec<u8>,
}

impl TransportMessage {
    /// Creates a new transport message.
    #[must_use]
    pub fn new(headers: Headers, body: Vec<u8>) -> Self {
        Self { headers, body }
    }

    /// Returns a header value.
    #[must_use]
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }

    /// Returns the message id header, if present.
    #[must_use]
    pub fn message_id(&self) -> Option<&str> {
        self.header(headers::MESSAGE_ID)
    }

    /// Returns the message type header, if present.
    #[must_use]
    pub fn message_type(&self) -> Option<&str> {
        self.header(headers::MESSAGE_TYPE)
    }
}
