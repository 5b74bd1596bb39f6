//! Connection handles and the per-connection delivery queue
//!
//! A [`ConnectionHandle`] is the capability the rest of the system holds
//! for a connection: its id plus a sender into the session's delivery
//! queue. The group registry stores clones of it for routing only — a
//! handle never keeps a session alive, and delivering to a finished
//! session simply fails and lets the caller prune the member.

use crate::envelope::Envelope;
use crate::types::ConnectionId;
use tokio::sync::mpsc;

/// An item queued for a connection's session task
#[derive(Debug, Clone)]
pub enum Delivery {
    /// An encoded frame to forward to the remote peer
    Client(String),
    /// A group-internal event to run through the session's own dispatcher
    Event(Envelope),
}

/// Cheap, cloneable capability for enqueueing deliveries to one connection
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    deliveries: mpsc::UnboundedSender<Delivery>,
}

impl ConnectionHandle {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Whether the session task is still draining its queue
    pub fn is_open(&self) -> bool {
        !self.deliveries.is_closed()
    }

    /// Enqueue an outbound event frame for the remote peer.
    ///
    /// Returns `false` if the session has finished; the frame is dropped.
    pub fn send(&self, event: &str, data: serde_json::Value) -> bool {
        self.deliver(Delivery::Client(Envelope::new(event, data).encode()))
    }

    /// Enqueue a delivery, reporting whether the queue was still open.
    pub(crate) fn deliver(&self, delivery: Delivery) -> bool {
        self.deliveries.send(delivery).is_ok()
    }
}

/// Create a delivery queue and the handle feeding it.
///
/// The queue is unbounded: group fan-out must never block on a slow
/// member, so backpressure is applied only where the session writes to
/// its own transport.
pub(crate) fn delivery_channel(id: ConnectionId) -> (ConnectionHandle, mpsc::UnboundedReceiver<Delivery>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        ConnectionHandle {
            id,
            deliveries: tx,
        },
        rx,
    )
}
