//! The transport seam the core consumes
//!
//! The accept/handshake machinery, TLS and routing all live on the other
//! side of this trait; the core only needs the four operations below plus
//! the guarantee that `recv` is cancel-safe.

pub mod ws;

pub use ws::WebSocketTransport;

use crate::errors::SocketResult;
use crate::types::{CloseFrame, WireMessage};
use async_trait::async_trait;

/// One accepted, already-routed bidirectional connection.
#[async_trait]
pub trait Transport: Send {
    /// Complete the application-level handshake. Transports that finished
    /// the handshake before handing the connection over implement this as
    /// a no-op.
    async fn accept(&mut self) -> SocketResult<()>;

    /// Close the connection with the given frame. Closing an
    /// already-closed connection is not an error.
    async fn close(&mut self, frame: CloseFrame) -> SocketResult<()>;

    /// Send one encoded frame to the peer. Awaits while the write buffer
    /// is full — this is where per-connection backpressure applies.
    async fn send(&mut self, raw: String) -> SocketResult<()>;

    /// Receive the next inbound frame. `None` signals disconnect; an
    /// error is fatal for the connection.
    ///
    /// Must be cancel-safe: the session polls this inside a select loop
    /// and drops the future whenever a delivery wins the race.
    async fn recv(&mut self) -> Option<SocketResult<WireMessage>>;
}
