//! Consumer trait and the per-connection handler surface
//!
//! A consumer is the stateful object living for exactly one connection.
//! It registers event handlers in an explicit route table, optionally
//! attaches middleware, and reacts to lifecycle events. Everything a hook
//! can do to the outside world goes through the [`ConsumerContext`].

use crate::connection::ConnectionHandle;
use crate::dispatch::EventRoutes;
use crate::envelope::Envelope;
use crate::errors::{DecodeError, HookResult};
use crate::groups::GroupRegistry;
use crate::middleware::MiddlewareStack;
use crate::types::{close_code, CloseFrame, ConnectionId, ConnectionInfo, DisconnectReason};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

/// Per-connection stateful object with lifecycle hooks and event handlers.
///
/// One instance is created per accepted connection and destroyed on
/// disconnect; all of its group memberships are released at teardown even
/// on abnormal termination.
#[async_trait]
pub trait Consumer: Send + Sized + 'static {
    /// Register event handlers for this consumer type.
    ///
    /// Called once per type; dispatch afterwards is a map lookup on the
    /// event name. An event with no registered handler is ignored by
    /// design, so a consumer may implement only the subset of group
    /// events it cares about.
    fn register(routes: &mut EventRoutes<Self>);

    /// Build the middleware stack for a new connection.
    ///
    /// Called once per connection; the default stack is empty.
    fn middleware() -> MiddlewareStack<Self> {
        MiddlewareStack::new()
    }

    /// Runs once after the middleware connect chain, before any message
    /// is processed. The default accepts the connection.
    ///
    /// Returning an error (or neither accepting nor closing) refuses the
    /// handshake.
    async fn on_connect(&mut self, ctx: &mut ConsumerContext) -> HookResult {
        ctx.accept();
        Ok(())
    }

    /// Runs exactly once when the session ends, after the connection has
    /// been removed from every group.
    async fn on_disconnect(&mut self, _ctx: &mut ConsumerContext, _reason: &DisconnectReason) {}

    /// Called when an inbound frame fails structural decoding. The
    /// connection stays open; the default logs and moves on.
    async fn on_decode_error(&mut self, ctx: &mut ConsumerContext, error: &DecodeError) {
        warn!(connection = %ctx.id(), %error, "discarding malformed message");
    }
}

/// The operations available to consumer and middleware hooks.
///
/// Accept/close are intents applied by the session runtime when the hook
/// returns; sends are enqueued immediately and flushed by the session in
/// order.
pub struct ConsumerContext {
    handle: ConnectionHandle,
    info: ConnectionInfo,
    groups: Arc<dyn GroupRegistry>,
    accepted: bool,
    accept_pending: bool,
    close_pending: Option<CloseFrame>,
}

impl ConsumerContext {
    pub(crate) fn new(
        handle: ConnectionHandle,
        info: ConnectionInfo,
        groups: Arc<dyn GroupRegistry>,
    ) -> Self {
        Self {
            handle,
            info,
            groups,
            accepted: false,
            accept_pending: false,
            close_pending: None,
        }
    }

    /// This connection's id
    pub fn id(&self) -> ConnectionId {
        self.handle.id()
    }

    /// The delivery capability for this connection
    pub fn handle(&self) -> &ConnectionHandle {
        &self.handle
    }

    /// Routing-supplied connection context
    pub fn info(&self) -> &ConnectionInfo {
        &self.info
    }

    /// The group registry this connection participates in
    pub fn groups(&self) -> &Arc<dyn GroupRegistry> {
        &self.groups
    }

    /// Accept the connection. Only meaningful during the connect phase;
    /// idempotent afterwards.
    pub fn accept(&mut self) {
        if !self.accepted {
            self.accept_pending = true;
        }
    }

    /// Whether the connection has completed the accept handshake
    pub fn is_accepted(&self) -> bool {
        self.accepted
    }

    /// Request the connection be closed. Applied by the session when the
    /// current connect sequence or dispatch completes; nothing queued
    /// after that point is processed.
    pub fn close(&mut self, code: u16) {
        self.close_pending = Some(CloseFrame::new(code));
    }

    /// Request a close with an explanatory reason
    pub fn close_with_reason<T: Into<String>>(&mut self, code: u16, reason: T) {
        self.close_pending = Some(CloseFrame::with_reason(code, reason));
    }

    /// Close normally (code 1000)
    pub fn close_normal(&mut self) {
        self.close(close_code::NORMAL);
    }

    /// Enqueue an event frame to this connection's own peer.
    ///
    /// Returns `false` if the session is already gone, which only happens
    /// when a handle outlives its connection.
    pub fn send(&self, event: &str, data: Value) -> bool {
        self.handle.send(event, data)
    }

    /// Join a named group
    pub async fn group_add(&self, group: &str) {
        self.groups.add(group, self.handle.clone()).await;
    }

    /// Leave a named group; never errors if not a member
    pub async fn group_discard(&self, group: &str) {
        self.groups.discard(group, self.id()).await;
    }

    /// Fan an event frame out to every current member of a group,
    /// including this connection if it is a member. Returns the number of
    /// members the frame was enqueued to.
    pub async fn group_send(&self, group: &str, event: &str, data: Value) -> usize {
        self.groups.send(group, event, data).await
    }

    /// Fan a group-internal event out to every member's dispatcher, so
    /// members handle it with their own registered handlers instead of
    /// forwarding it to their peers.
    pub async fn group_call_event(&self, group: &str, event: &str, data: Value) -> usize {
        self.groups.call_event(group, event, data).await
    }

    /// Dispatch an envelope locally on a single connection (the
    /// point-to-point analogue of [`group_call_event`](Self::group_call_event)).
    pub fn notify(&self, target: &ConnectionHandle, event: &str, data: Value) -> bool {
        target.deliver(crate::connection::Delivery::Event(Envelope::new(event, data)))
    }

    pub(crate) fn take_accept(&mut self) -> bool {
        let pending = self.accept_pending;
        self.accept_pending = false;
        if pending {
            self.accepted = true;
        }
        pending
    }

    pub(crate) fn take_close(&mut self) -> Option<CloseFrame> {
        self.close_pending.take()
    }
}
