//! Error types for the sockhub core
//!
//! Three failure families with different consequences for the connection:
//! [`DecodeError`] (malformed inbound frame, connection stays open),
//! [`HookError`] (failure raised by application code, connection is closed
//! with a server-error code) and [`SocketError`] (transport or
//! infrastructure fault).

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Result type for socket operations
pub type SocketResult<T> = Result<T, SocketError>;

/// Result type for consumer and middleware hooks
pub type HookResult = Result<(), HookError>;

/// Transport and infrastructure errors
#[derive(Debug, Error)]
pub enum SocketError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Delivery queue closed")]
    DeliveryQueueClosed,

    #[error("Group transport error: {0}")]
    GroupTransport(String),
}

impl From<tungstenite::Error> for SocketError {
    fn from(err: tungstenite::Error) -> Self {
        match err {
            tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
                Self::ConnectionClosed
            }
            tungstenite::Error::Protocol(msg) => Self::Protocol(msg.to_string()),
            tungstenite::Error::Io(io_err) => Self::Io(io_err),
            other => Self::Connection(other.to_string()),
        }
    }
}

/// Inbound frame failed structural decoding.
///
/// Never fatal: the frame is reported to the consumer's
/// `on_decode_error` hook and the connection stays open.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Payload is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Payload is not a JSON object")]
    NotAnObject,

    #[error("Missing \"event\" field")]
    MissingEvent,

    #[error("\"event\" field is not a string")]
    NonStringEvent,

    #[error("Message of {size} bytes exceeds the {limit} byte limit")]
    Oversized { size: usize, limit: usize },
}

/// Unrecovered error raised inside a handler, middleware hook or
/// lifecycle hook.
///
/// Propagates to the transport layer: the session closes the connection
/// with a server-error close code, then still runs group cleanup and the
/// disconnect hook.
#[derive(Debug, Error)]
pub enum HookError {
    /// A connect hook declined the connection; closes with a policy code
    /// instead of a server-error code.
    #[error("Connection rejected: {reason}")]
    Rejected { reason: String },

    #[error("{message}")]
    Message { message: String },

    #[error("{0}")]
    Source(Box<dyn std::error::Error + Send + Sync>),
}

impl HookError {
    /// Create a generic hook failure
    pub fn new<T: Into<String>>(message: T) -> Self {
        HookError::Message {
            message: message.into(),
        }
    }

    /// Create a connection rejection (connect hooks only)
    pub fn rejected<T: Into<String>>(reason: T) -> Self {
        HookError::Rejected {
            reason: reason.into(),
        }
    }

    /// Wrap an arbitrary error source
    pub fn from_source<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        HookError::Source(Box::new(source))
    }
}

impl From<serde_json::Error> for HookError {
    fn from(err: serde_json::Error) -> Self {
        HookError::from_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hook_error_creation() {
        let error = HookError::new("boom");
        assert!(matches!(error, HookError::Message { .. }));
        assert_eq!(error.to_string(), "boom");

        let error = HookError::rejected("not allowed");
        assert!(matches!(error, HookError::Rejected { .. }));
        assert_eq!(error.to_string(), "Connection rejected: not allowed");
    }

    #[test]
    fn test_decode_error_display() {
        let error = DecodeError::MissingEvent;
        assert_eq!(error.to_string(), "Missing \"event\" field");

        let error = DecodeError::Oversized {
            size: 2048,
            limit: 1024,
        };
        assert!(error.to_string().contains("2048"));
    }

    #[test]
    fn test_serde_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{nope").unwrap_err();
        let hook_err: HookError = json_err.into();
        assert!(matches!(hook_err, HookError::Source(_)));
    }
}
