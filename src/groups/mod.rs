//! Group membership and publish/fan-out
//!
//! Groups are named, unordered sets of connections with weak membership:
//! the registry routes to members but never owns them. The registry is an
//! injected abstraction so the core stays testable without a real
//! transport — [`LocalGroups`] covers a single process, [`RelayedGroups`]
//! bridges processes over a pluggable pub/sub transport with the same
//! public contract.

pub mod local;
pub mod relay;


pub use local::{GroupStats, LocalGroups};
pub use relay::{GroupTransport, RelayFrame, RelayKind, RelayedGroups};

use crate::connection::ConnectionHandle;
use crate::types::ConnectionId;
use async_trait::async_trait;
use serde_json::Value;

/// Mapping from group name to member connections.
///
/// All operations are safe under concurrent access from arbitrary
/// connection tasks. `send` and `call_event` operate on a membership
/// snapshot taken at call time and never block on slow members; partial
/// delivery is not an error.
#[async_trait]
pub trait GroupRegistry: Send + Sync {
    /// Register a connection as a member. Idempotent; the group is
    /// created implicitly on first add.
    async fn add(&self, group: &str, member: ConnectionHandle);

    /// Remove a connection from a group. Idempotent; never errors if the
    /// connection is not a member. An emptied group is dropped.
    async fn discard(&self, group: &str, member: ConnectionId);

    /// Remove a connection from every group it belongs to (teardown path)
    async fn discard_all(&self, member: ConnectionId);

    /// Encode one outbound frame and enqueue it to every current member.
    /// Returns the number of members reached; zero members is a no-op.
    async fn send(&self, group: &str, event: &str, data: Value) -> usize;

    /// Enqueue a group-internal event that each member's session runs
    /// through its own dispatcher. Registry semantics are identical to
    /// [`send`](Self::send); only the delivery kind differs.
    async fn call_event(&self, group: &str, event: &str, data: Value) -> usize;

    /// Current member count of a group (zero if the group does not exist)
    async fn member_count(&self, group: &str) -> usize;
}
