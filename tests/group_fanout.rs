//! Group membership and fan-out scenarios across full sessions

use async_trait::async_trait;
use serde_json::{json, Value};
use sockhub::testing::scripted;
use sockhub::{
    Consumer, ConsumerContext, ConnectionInfo, EventRoutes, GroupRegistry, HookResult, SocketHub,
};
use std::time::Duration;

async fn settle() {
    tokio::time::sleep(Duration::from_millis(25)).await;
}

/// Joins "g" on connect and rebroadcasts pings to the whole group
struct Member;

impl Member {
    async fn on_ping_all(&mut self, ctx: &mut ConsumerContext, data: Value) -> HookResult {
        ctx.group_send("g", "ping", data).await;
        Ok(())
    }
}

#[async_trait]
impl Consumer for Member {
    fn register(routes: &mut EventRoutes<Self>) {
        routes.on("ping_all", |c, ctx, data| Box::pin(c.on_ping_all(ctx, data)));
    }

    async fn on_connect(&mut self, ctx: &mut ConsumerContext) -> HookResult {
        ctx.group_add("g").await;
        ctx.accept();
        Ok(())
    }
}

#[tokio::test]
async fn test_group_send_fans_out_and_respects_disconnect() {
    let hub = SocketHub::new();

    let (transport_a, control_a) = scripted();
    let log_a = transport_a.log();
    hub.spawn(Member, transport_a, ConnectionInfo::new("/ws"));

    let (transport_b, control_b) = scripted();
    let log_b = transport_b.log();
    hub.spawn(Member, transport_b, ConnectionInfo::new("/ws"));

    settle().await;
    assert_eq!(hub.groups().member_count("g").await, 2);

    // One send from A reaches both members' outbound queues.
    control_a.push_event("ping_all", json!({"n": 1}));
    settle().await;

    let expected = ("ping".to_string(), json!({"n": 1}));
    assert_eq!(log_a.sent_events(), vec![expected.clone()]);
    assert_eq!(log_b.sent_events(), vec![expected]);

    // B disconnects; its membership is released with no action from B.
    control_b.finish();
    settle().await;
    assert_eq!(hub.groups().member_count("g").await, 1);

    // A repeat send reaches only A.
    control_a.push_event("ping_all", json!({"n": 2}));
    settle().await;

    assert_eq!(log_a.sent_events().len(), 2);
    assert_eq!(log_b.sent_events().len(), 1);

    control_a.finish();
}

/// Triggers group-internal events without carrying any payload itself
struct Notifier;

impl Notifier {
    async fn on_trigger(&mut self, ctx: &mut ConsumerContext, _data: Value) -> HookResult {
        ctx.group_call_event("g", "refresh", Value::Null).await;
        Ok(())
    }
}

#[async_trait]
impl Consumer for Notifier {
    fn register(routes: &mut EventRoutes<Self>) {
        routes.on("trigger", |c, ctx, data| Box::pin(c.on_trigger(ctx, data)));
    }

    async fn on_connect(&mut self, ctx: &mut ConsumerContext) -> HookResult {
        ctx.group_add("g").await;
        ctx.accept();
        Ok(())
    }
}

/// Responds to group-internal refresh events with data the triggering
/// connection never saw
struct Worker {
    secret: String,
}

impl Worker {
    async fn on_refresh(&mut self, ctx: &mut ConsumerContext, _data: Value) -> HookResult {
        ctx.send("refreshed", json!({"secret": self.secret}));
        Ok(())
    }
}

#[async_trait]
impl Consumer for Worker {
    fn register(routes: &mut EventRoutes<Self>) {
        routes.on("refresh", |c, ctx, data| Box::pin(c.on_refresh(ctx, data)));
    }

    async fn on_connect(&mut self, ctx: &mut ConsumerContext) -> HookResult {
        ctx.group_add("g").await;
        ctx.accept();
        Ok(())
    }
}

#[tokio::test]
async fn test_call_event_runs_member_dispatchers_asymmetrically() {
    let hub = SocketHub::new();

    let (worker_transport, worker_control) = scripted();
    let worker_log = worker_transport.log();
    hub.spawn(
        Worker {
            secret: "local-only".to_string(),
        },
        worker_transport,
        ConnectionInfo::new("/ws"),
    );

    let (notifier_transport, notifier_control) = scripted();
    let notifier_log = notifier_transport.log();
    hub.spawn(Notifier, notifier_transport, ConnectionInfo::new("/ws"));

    settle().await;
    assert_eq!(hub.groups().member_count("g").await, 2);

    notifier_control.push_event("trigger", Value::Null);
    settle().await;

    // The worker handled the group-internal event with its own data; the
    // notifier, which registers no refresh handler, silently ignored the
    // event it also received as a group member.
    assert_eq!(
        worker_log.sent_events(),
        vec![("refreshed".to_string(), json!({"secret": "local-only"}))]
    );
    assert!(notifier_log.sent_events().is_empty());

    worker_control.finish();
    notifier_control.finish();
}

#[tokio::test]
async fn test_server_initiated_group_send() {
    let hub = SocketHub::new();

    let (transport, control) = scripted();
    let log = transport.log();
    hub.spawn(Member, transport, ConnectionInfo::new("/ws"));
    settle().await;

    let reached = hub.group_send("g", "announce", json!({"msg": "hi"})).await;
    settle().await;

    assert_eq!(reached, 1);
    assert_eq!(
        log.sent_events(),
        vec![("announce".to_string(), json!({"msg": "hi"}))]
    );

    control.finish();
}
