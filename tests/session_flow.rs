//! Full session flows through the hub and scripted transport

use async_trait::async_trait;
use serde_json::{json, Value};
use sockhub::testing::scripted;
use sockhub::{
    close_code, Consumer, ConsumerContext, ConnectionInfo, EventRoutes, HookResult, SocketHub,
};
use std::time::Duration;

async fn settle() {
    tokio::time::sleep(Duration::from_millis(25)).await;
}

struct Echo;

impl Echo {
    async fn on_echo(&mut self, ctx: &mut ConsumerContext, data: Value) -> HookResult {
        ctx.send("echo", data);
        Ok(())
    }

    async fn on_whoami(&mut self, ctx: &mut ConsumerContext, _data: Value) -> HookResult {
        ctx.send("room", json!({"room": ctx.info().param("room")}));
        Ok(())
    }

    async fn on_goodbye(&mut self, ctx: &mut ConsumerContext, _data: Value) -> HookResult {
        ctx.close_with_reason(close_code::NORMAL, "goodbye");
        Ok(())
    }
}

impl Consumer for Echo {
    fn register(routes: &mut EventRoutes<Self>) {
        routes.on("echo", |c, ctx, data| Box::pin(c.on_echo(ctx, data)));
        routes.on("whoami", |c, ctx, data| Box::pin(c.on_whoami(ctx, data)));
        routes.on("goodbye", |c, ctx, data| Box::pin(c.on_goodbye(ctx, data)));
    }
}

#[tokio::test]
async fn test_echo_round_trip_through_hub() {
    let hub = SocketHub::new();
    let (transport, control) = scripted();
    let log = transport.log();

    hub.spawn(Echo, transport, ConnectionInfo::new("/echo"));
    settle().await;
    assert!(log.accepted());

    control.push_event("echo", json!({"n": 1}));
    control.push_event("echo", json!(["a", "b"]));
    settle().await;

    assert_eq!(
        log.sent_events(),
        vec![
            ("echo".to_string(), json!({"n": 1})),
            ("echo".to_string(), json!(["a", "b"])),
        ]
    );

    control.finish();
    settle().await;
    assert!(log.close_frame().is_none());
}

#[tokio::test]
async fn test_routing_context_is_readable_from_handlers() {
    let hub = SocketHub::new();
    let (transport, control) = scripted();
    let log = transport.log();

    hub.spawn(
        Echo,
        transport,
        ConnectionInfo::new("/rooms/lobby").with_param("room", "lobby"),
    );
    settle().await;

    control.push_event("whoami", Value::Null);
    settle().await;

    assert_eq!(
        log.sent_events(),
        vec![("room".to_string(), json!({"room": "lobby"}))]
    );

    control.finish();
}

#[tokio::test]
async fn test_server_push_through_connection_handle() {
    let hub = SocketHub::new();
    let (transport, control) = scripted();
    let log = transport.log();

    let handle = hub.spawn(Echo, transport, ConnectionInfo::new("/echo"));
    settle().await;
    assert!(handle.is_open());

    assert!(handle.send("sys", json!({"notice": "maintenance"})));
    settle().await;

    assert_eq!(
        log.sent_events(),
        vec![("sys".to_string(), json!({"notice": "maintenance"}))]
    );

    control.finish();
    settle().await;
    assert!(!handle.is_open());
}

#[tokio::test]
async fn test_handler_requested_close_reaches_the_wire() {
    let hub = SocketHub::new();
    let (transport, control) = scripted();
    let log = transport.log();

    hub.spawn(Echo, transport, ConnectionInfo::new("/echo"));
    control.push_event("goodbye", Value::Null);
    settle().await;

    let frame = log.close_frame().expect("close frame sent");
    assert_eq!(frame.code, close_code::NORMAL);
    assert_eq!(frame.reason, "goodbye");

    control.finish();
}

/// Middleware-authenticated consumer: the middleware stamps identity on
/// the consumer before its connect hook announces it
struct Stamped {
    user: Option<String>,
}

impl Stamped {
    async fn on_who(&mut self, ctx: &mut ConsumerContext, _data: Value) -> HookResult {
        ctx.send("user", json!({"user": self.user}));
        Ok(())
    }
}

#[async_trait]
impl Consumer for Stamped {
    fn register(routes: &mut EventRoutes<Self>) {
        routes.on("who", |c, ctx, data| Box::pin(c.on_who(ctx, data)));
    }

    fn middleware() -> sockhub::MiddlewareStack<Self> {
        sockhub::MiddlewareStack::new().with(IdentityStamp)
    }

    async fn on_connect(&mut self, ctx: &mut ConsumerContext) -> HookResult {
        // Identity was populated by the middleware before this hook ran.
        if self.user.is_none() {
            return Err(sockhub::HookError::rejected("anonymous"));
        }
        ctx.accept();
        Ok(())
    }
}

struct IdentityStamp;

#[async_trait]
impl sockhub::Middleware<Stamped> for IdentityStamp {
    async fn on_connect(&mut self, consumer: &mut Stamped, ctx: &mut ConsumerContext) -> HookResult {
        consumer.user = ctx.info().metadata.get("user").cloned();
        Ok(())
    }

    fn name(&self) -> &'static str {
        "IdentityStamp"
    }
}

#[tokio::test]
async fn test_middleware_seeds_consumer_state_before_connect() {
    let hub = SocketHub::new();
    let (transport, control) = scripted();
    let log = transport.log();

    hub.spawn(
        Stamped { user: None },
        transport,
        ConnectionInfo::new("/ws").with_metadata("user", "alice"),
    );
    settle().await;
    assert!(log.accepted());

    control.push_event("who", Value::Null);
    settle().await;

    assert_eq!(
        log.sent_events(),
        vec![("user".to_string(), json!({"user": "alice"}))]
    );

    control.finish();
}

#[tokio::test]
async fn test_unauthenticated_connection_is_refused() {
    let hub = SocketHub::new();
    let (transport, control) = scripted();
    let log = transport.log();

    hub.spawn(Stamped { user: None }, transport, ConnectionInfo::new("/ws"));
    settle().await;

    assert!(!log.accepted());
    assert_eq!(
        log.close_frame().map(|f| f.code),
        Some(close_code::POLICY_VIOLATION)
    );

    control.finish();
}
