//! Per-connection session runtime
//!
//! One session task drives one connection: the connect sequence
//! (middleware chain in order, consumer hook last), then a strictly
//! sequential loop over inbound frames and the delivery queue. Handlers
//! for the same consumer never overlap — dispatch of frame N+1 does not
//! begin until the handler for frame N has returned — while sessions for
//! different connections run concurrently. Teardown (group cleanup, then
//! the disconnect hook) runs exactly once on every exit path.

use crate::config::SessionConfig;
use crate::connection::{delivery_channel, ConnectionHandle, Delivery};
use crate::consumer::{Consumer, ConsumerContext};
use crate::dispatch::EventRoutes;
use crate::envelope::Envelope;
use crate::errors::{DecodeError, HookError, HookResult, SocketResult};
use crate::groups::GroupRegistry;
use crate::middleware::MiddlewareStack;
use crate::transport::Transport;
use crate::types::{CloseFrame, ConnectionId, ConnectionInfo, DisconnectReason, WireMessage};
use std::sync::Arc;
use tracing::{debug, error};

/// The state driving a single connection
pub struct ConsumerSession<C: Consumer, T: Transport> {
    id: ConnectionId,
    consumer: C,
    ctx: ConsumerContext,
    middleware: MiddlewareStack<C>,
    routes: Arc<EventRoutes<C>>,
    transport: T,
    deliveries: tokio::sync::mpsc::UnboundedReceiver<Delivery>,
    config: SessionConfig,
    finished: bool,
}

enum Step {
    Inbound(Option<SocketResult<WireMessage>>),
    Delivery(Option<Delivery>),
}

impl<C: Consumer, T: Transport> ConsumerSession<C, T> {
    /// Build a session, constructing the consumer type's route table.
    ///
    /// Prefer [`SocketHub::spawn`](crate::hub::SocketHub::spawn), which
    /// reuses a cached route table per consumer type.
    pub fn new(
        consumer: C,
        transport: T,
        info: ConnectionInfo,
        groups: Arc<dyn GroupRegistry>,
        config: SessionConfig,
    ) -> Self {
        Self::with_routes(
            consumer,
            transport,
            info,
            groups,
            config,
            Arc::new(EventRoutes::build()),
        )
    }

    /// Build a session around an already-built route table
    pub fn with_routes(
        consumer: C,
        transport: T,
        info: ConnectionInfo,
        groups: Arc<dyn GroupRegistry>,
        config: SessionConfig,
        routes: Arc<EventRoutes<C>>,
    ) -> Self {
        let id = ConnectionId::new();
        let (handle, deliveries) = delivery_channel(id);
        Self {
            id,
            consumer,
            ctx: ConsumerContext::new(handle, info, groups),
            middleware: C::middleware(),
            routes,
            transport,
            deliveries,
            config,
            finished: false,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Delivery capability for this connection, e.g. for server-side push
    pub fn handle(&self) -> ConnectionHandle {
        self.ctx.handle().clone()
    }

    /// Drive the connection to completion.
    ///
    /// Consumes the session; teardown has run by the time this returns.
    pub async fn run(mut self) -> DisconnectReason {
        let reason = match self.connect_phase().await {
            Some(reason) => reason,
            None => self.message_loop().await,
        };
        self.teardown(&reason).await;
        reason
    }

    /// Run the connect chain and apply the resulting accept/close intent.
    /// Returns `Some` when the session must end without a message loop.
    async fn connect_phase(&mut self) -> Option<DisconnectReason> {
        let mut failure: Option<HookError> = None;

        for mw in self.middleware.iter_mut() {
            if let Err(e) = mw.on_connect(&mut self.consumer, &mut self.ctx).await {
                failure = Some(e);
                break;
            }
        }
        if failure.is_none() {
            if let Err(e) = self.consumer.on_connect(&mut self.ctx).await {
                failure = Some(e);
            }
        }
        if let Some(e) = failure {
            return Some(self.hook_failure(e).await);
        }

        if let Some(frame) = self.ctx.take_close() {
            let _ = self.transport.close(frame.clone()).await;
            return Some(DisconnectReason::ServerClosed(frame));
        }

        if self.ctx.take_accept() {
            if let Err(e) = self.transport.accept().await {
                return Some(DisconnectReason::TransportFailed(e.to_string()));
            }
            None
        } else {
            // Neither accepted nor closed: refuse the handshake.
            let frame = CloseFrame::with_reason(
                self.config.refusal_close_code,
                "connection not accepted",
            );
            let _ = self.transport.close(frame).await;
            Some(DisconnectReason::Refused(
                "connect hook did not accept the connection".to_string(),
            ))
        }
    }

    async fn message_loop(&mut self) -> DisconnectReason {
        loop {
            // Deliveries drain before the next inbound frame is read, so a
            // disconnect signal cannot overtake frames already queued for
            // this connection. Inbound FIFO is unaffected.
            let step = tokio::select! {
                biased;
                delivery = self.deliveries.recv() => Step::Delivery(delivery),
                inbound = self.transport.recv() => Step::Inbound(inbound),
            };

            match step {
                Step::Inbound(Some(Ok(raw))) => {
                    if let Some(reason) = self.handle_frame(raw).await {
                        return reason;
                    }
                }
                Step::Inbound(Some(Err(e))) => {
                    error!(connection = %self.id, error = %e, "transport failed");
                    return DisconnectReason::TransportFailed(e.to_string());
                }
                Step::Inbound(None) => return DisconnectReason::ClientClosed,
                Step::Delivery(Some(Delivery::Client(frame))) => {
                    if let Err(e) = self.transport.send(frame).await {
                        return DisconnectReason::TransportFailed(e.to_string());
                    }
                }
                Step::Delivery(Some(Delivery::Event(envelope))) => {
                    if let Some(reason) = self.dispatch_checked(envelope).await {
                        return reason;
                    }
                }
                Step::Delivery(None) => {
                    // Unreachable while the context holds a handle; kept as
                    // a defined exit rather than a panic.
                    debug!(connection = %self.id, "delivery queue closed");
                    return DisconnectReason::ClientClosed;
                }
            }
        }
    }

    /// Decode one inbound frame and run the receive pipeline.
    async fn handle_frame(&mut self, raw: WireMessage) -> Option<DisconnectReason> {
        if let Some(limit) = self.config.max_message_size {
            if raw.len() > limit {
                let error = DecodeError::Oversized {
                    size: raw.len(),
                    limit,
                };
                self.consumer.on_decode_error(&mut self.ctx, &error).await;
                return self.apply_close().await;
            }
        }

        match Envelope::decode(&raw) {
            Ok(envelope) => self.dispatch_checked(envelope).await,
            Err(error) => {
                self.consumer.on_decode_error(&mut self.ctx, &error).await;
                self.apply_close().await
            }
        }
    }

    async fn dispatch_checked(&mut self, envelope: Envelope) -> Option<DisconnectReason> {
        match self.dispatch(envelope).await {
            Ok(()) => self.apply_close().await,
            Err(error) => Some(self.hook_failure(error).await),
        }
    }

    /// The receive pipeline: middleware chain in order, then the handler
    /// resolved from the route table. An unregistered event is a handled
    /// no-op so consumers can implement just the subset of group events
    /// they care about.
    async fn dispatch(&mut self, envelope: Envelope) -> HookResult {
        for mw in self.middleware.iter_mut() {
            mw.on_receive(&mut self.consumer, &mut self.ctx, &envelope)
                .await?;
        }

        let routes = Arc::clone(&self.routes);
        match routes.get(envelope.event()) {
            Some(handler) => handler(&mut self.consumer, &mut self.ctx, envelope.into_data()).await,
            None => {
                debug!(connection = %self.id, event = %envelope.event(), "no handler for event");
                Ok(())
            }
        }
    }

    /// Apply a close requested through the context, if any
    async fn apply_close(&mut self) -> Option<DisconnectReason> {
        let frame = self.ctx.take_close()?;
        let _ = self.transport.close(frame.clone()).await;
        Some(DisconnectReason::ServerClosed(frame))
    }

    /// Close the connection after a failed hook and map the failure to a
    /// disconnect reason. Rejections close with the refusal code, every
    /// other failure with the server-error code.
    async fn hook_failure(&mut self, error: HookError) -> DisconnectReason {
        error!(connection = %self.id, %error, "hook failed");
        let (code, reason) = match &error {
            HookError::Rejected { reason } => (
                self.config.refusal_close_code,
                DisconnectReason::Refused(reason.clone()),
            ),
            _ => (
                self.config.error_close_code,
                DisconnectReason::HookFailed(error.to_string()),
            ),
        };
        let _ = self
            .transport
            .close(CloseFrame::with_reason(code, error.to_string()))
            .await;
        reason
    }

    /// Release group memberships and run the disconnect hook. Guarded so
    /// concurrent closure signals can only ever tear down once.
    async fn teardown(&mut self, reason: &DisconnectReason) {
        if self.finished {
            return;
        }
        self.finished = true;

        self.ctx.groups().discard_all(self.id).await;
        self.consumer.on_disconnect(&mut self.ctx, reason).await;
        debug!(connection = %self.id, ?reason, "session finished");
    }
}
