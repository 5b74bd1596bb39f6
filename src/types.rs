//! Core types shared across the crate

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Unique identifier for socket connections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Raw data frame as handed up by the transport.
///
/// Both variants are decoded as JSON; the envelope layer does not care
/// which frame type carried the bytes.
#[derive(Debug, Clone, PartialEq)]
pub enum WireMessage {
    Text(String),
    Binary(Vec<u8>),
}

impl WireMessage {
    pub fn text<T: Into<String>>(content: T) -> Self {
        Self::Text(content.into())
    }

    pub fn binary<T: Into<Vec<u8>>>(data: T) -> Self {
        Self::Binary(data.into())
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, Self::Binary(_))
    }

    /// Size of the payload in bytes
    pub fn len(&self) -> usize {
        match self {
            Self::Text(s) => s.len(),
            Self::Binary(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Close frame information
#[derive(Debug, Clone, PartialEq)]
pub struct CloseFrame {
    pub code: u16,
    pub reason: String,
}

impl CloseFrame {
    pub fn new(code: u16) -> Self {
        Self {
            code,
            reason: String::new(),
        }
    }

    pub fn with_reason<T: Into<String>>(code: u16, reason: T) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }
}

/// Standard WebSocket close codes used by the session runtime
pub mod close_code {
    /// Normal closure
    pub const NORMAL: u16 = 1000;
    /// Going away (server shutdown)
    pub const GOING_AWAY: u16 = 1001;
    /// Policy violation - used when a connect hook rejects the connection
    pub const POLICY_VIOLATION: u16 = 1008;
    /// Internal server error - used when a hook fails
    pub const SERVER_ERROR: u16 = 1011;
}

/// Connection-scoped context supplied by the routing layer.
///
/// The core reads this but never populates it: path parameters, the
/// matched path and any metadata the routing or auth layer attached.
#[derive(Debug, Clone, Default)]
pub struct ConnectionInfo {
    /// Request path the connection was routed on
    pub path: String,
    /// Path parameters extracted by the router
    pub params: HashMap<String, String>,
    /// Remote address if the transport knows it
    pub remote_addr: Option<String>,
    /// Free-form metadata (e.g. authenticated user id)
    pub metadata: HashMap<String, String>,
}

impl ConnectionInfo {
    pub fn new<T: Into<String>>(path: T) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_param<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_metadata<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

/// Why a session ended.
///
/// Passed to the consumer's disconnect hook; the hook runs exactly once
/// per connection no matter which signal ended it.
#[derive(Debug, Clone, PartialEq)]
pub enum DisconnectReason {
    /// The peer closed the connection or the stream ended
    ClientClosed,
    /// A hook requested the close via the context
    ServerClosed(CloseFrame),
    /// The connect phase ended without accepting the connection
    Refused(String),
    /// A handler, middleware or lifecycle hook failed
    HookFailed(String),
    /// The transport reported a fatal error
    TransportFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_unique() {
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wire_message_len() {
        assert_eq!(WireMessage::text("hello").len(), 5);
        assert_eq!(WireMessage::binary(vec![1u8, 2, 3]).len(), 3);
        assert!(WireMessage::text("").is_empty());
    }

    #[test]
    fn test_connection_info_builder() {
        let info = ConnectionInfo::new("/chat/lobby")
            .with_param("room", "lobby")
            .with_metadata("user", "alice");

        assert_eq!(info.path, "/chat/lobby");
        assert_eq!(info.param("room"), Some("lobby"));
        assert_eq!(info.param("missing"), None);
        assert_eq!(info.metadata.get("user").map(String::as_str), Some("alice"));
    }
}
