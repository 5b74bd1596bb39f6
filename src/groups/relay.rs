//! Cross-process group fan-out over a pluggable pub/sub transport
//!
//! [`RelayedGroups`] keeps the exact contract of [`LocalGroups`] while
//! forwarding every publish to a [`GroupTransport`] so members connected
//! to other processes are reached too. Each frame crosses the transport
//! once per process, not once per member: the receiving process applies
//! it to its own local members. Frames carry the origin process id so a
//! process never re-applies its own publications.

use super::{GroupRegistry, LocalGroups};
use crate::connection::ConnectionHandle;
use crate::errors::SocketResult;
use crate::types::ConnectionId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

/// How a relayed frame is delivered on the receiving process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelayKind {
    /// Forward to each member's peer (`send`)
    Send,
    /// Run through each member's dispatcher (`call_event`)
    CallEvent,
}

/// One group publication on the inter-process wire
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayFrame {
    /// Id of the publishing process, for echo suppression
    pub origin: Uuid,
    pub group: String,
    pub kind: RelayKind,
    pub event: String,
    pub data: Value,
}

/// Pub/sub seam to whatever carries frames between processes.
///
/// The transport only needs to broadcast a frame to every process
/// (including, harmlessly, the publisher — echoes are suppressed by
/// origin id). Incoming frames are pushed into the channel given to
/// [`RelayedGroups::attach`].
#[async_trait]
pub trait GroupTransport: Send + Sync {
    async fn publish(&self, frame: RelayFrame) -> SocketResult<()>;
}

/// Group registry spanning processes.
///
/// Membership stays process-local (a process only ever holds handles to
/// its own connections); only publications travel.
pub struct RelayedGroups {
    origin: Uuid,
    local: LocalGroups,
    transport: Arc<dyn GroupTransport>,
}

impl RelayedGroups {
    pub fn new(transport: Arc<dyn GroupTransport>) -> Arc<Self> {
        Arc::new(Self {
            origin: Uuid::new_v4(),
            local: LocalGroups::new(),
            transport,
        })
    }

    /// This process's origin id
    pub fn origin(&self) -> Uuid {
        self.origin
    }

    /// Spawn the task applying frames arriving from other processes.
    ///
    /// The task ends when the transport drops its sender.
    pub fn attach(self: &Arc<Self>, mut incoming: mpsc::UnboundedReceiver<RelayFrame>) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(frame) = incoming.recv().await {
                registry.apply(frame).await;
            }
            debug!(origin = %registry.origin, "relay listener finished");
        })
    }

    /// Apply a frame from the transport to local members
    pub async fn apply(&self, frame: RelayFrame) {
        if frame.origin == self.origin {
            return;
        }
        let reached = match frame.kind {
            RelayKind::Send => {
                self.local
                    .send(&frame.group, &frame.event, frame.data)
                    .await
            }
            RelayKind::CallEvent => {
                self.local
                    .call_event(&frame.group, &frame.event, frame.data)
                    .await
            }
        };
        debug!(group = %frame.group, event = %frame.event, reached, "applied relayed frame");
    }

    async fn publish(&self, group: &str, kind: RelayKind, event: &str, data: Value) {
        let frame = RelayFrame {
            origin: self.origin,
            group: group.to_string(),
            kind,
            event: event.to_string(),
            data,
        };
        // Best-effort: a transport fault degrades to local-only delivery,
        // it never surfaces to the sending handler.
        if let Err(error) = self.transport.publish(frame).await {
            warn!(group, event, %error, "group relay publish failed");
        }
    }
}

#[async_trait]
impl GroupRegistry for RelayedGroups {
    async fn add(&self, group: &str, member: ConnectionHandle) {
        self.local.add(group, member).await;
    }

    async fn discard(&self, group: &str, member: ConnectionId) {
        self.local.discard(group, member).await;
    }

    async fn discard_all(&self, member: ConnectionId) {
        self.local.discard_all(member).await;
    }

    async fn send(&self, group: &str, event: &str, data: Value) -> usize {
        let reached = self.local.send(group, event, data.clone()).await;
        self.publish(group, RelayKind::Send, event, data).await;
        reached
    }

    async fn call_event(&self, group: &str, event: &str, data: Value) -> usize {
        let reached = self.local.call_event(group, event, data.clone()).await;
        self.publish(group, RelayKind::CallEvent, event, data).await;
        reached
    }

    async fn member_count(&self, group: &str) -> usize {
        self.local.member_count(group).await
    }
}
