//! # sockhub
//!
//! Event-dispatching WebSocket consumer core with middleware and group
//! fan-out.
//!
//! Inbound frames carry a mandatory `event` field; the session runtime
//! decodes each frame, runs the connection's middleware chain, and
//! dispatches to the handler registered for that event on the
//! per-connection [`Consumer`]. Handlers publish to named groups of
//! connections through an injected [`GroupRegistry`], so one send fans
//! out to every member — including members owned by other processes when
//! the registry is backed by a relay transport.
//!
//! The crate deliberately stops at a narrow seam on both sides: the
//! transport handshake, authentication and URL routing happen outside and
//! hand in accepted connections; applications only implement consumers.
//!
//! ```rust
//! use serde_json::{json, Value};
//! use sockhub::{Consumer, ConsumerContext, EventRoutes, HookResult};
//!
//! #[derive(Default)]
//! struct ChatConsumer {
//!     name: Option<String>,
//! }
//!
//! impl ChatConsumer {
//!     async fn on_join(&mut self, ctx: &mut ConsumerContext, data: Value) -> HookResult {
//!         self.name = data["name"].as_str().map(String::from);
//!         ctx.group_add("lobby").await;
//!         ctx.group_send("lobby", "joined", json!({"name": self.name})).await;
//!         Ok(())
//!     }
//! }
//!
//! impl Consumer for ChatConsumer {
//!     fn register(routes: &mut EventRoutes<Self>) {
//!         routes.on("join", |c, ctx, data| Box::pin(c.on_join(ctx, data)));
//!     }
//! }
//! ```

pub mod config;
pub mod connection;
pub mod consumer;
pub mod dispatch;
pub mod envelope;
pub mod errors;
pub mod groups;
pub mod hub;
pub mod logging;
pub mod middleware;
pub mod session;
pub mod testing;
pub mod transport;
pub mod types;

pub use config::SessionConfig;
pub use connection::{ConnectionHandle, Delivery};
pub use consumer::{Consumer, ConsumerContext};
pub use dispatch::{BoxFuture, BoxedHandler, EventRoutes};
pub use envelope::Envelope;
pub use errors::{DecodeError, HookError, HookResult, SocketError, SocketResult};
pub use groups::{
    GroupRegistry, GroupStats, GroupTransport, LocalGroups, RelayFrame, RelayKind, RelayedGroups,
};
pub use hub::{SocketHub, SocketHubBuilder};
pub use logging::{init_logging, LoggingConfig};
pub use middleware::{Middleware, MiddlewareStack};
pub use session::ConsumerSession;
pub use transport::{Transport, WebSocketTransport};
pub use types::{
    close_code, CloseFrame, ConnectionId, ConnectionInfo, DisconnectReason, WireMessage,
};
