//! Event routing: explicit event-name to handler mapping
//!
//! Handlers are registered once per consumer type in
//! [`Consumer::register`](crate::consumer::Consumer::register) — dispatch
//! is a plain map lookup on the event string, never a per-message dynamic
//! resolution. The hub caches the built table per consumer type.

use crate::consumer::{Consumer, ConsumerContext};
use crate::errors::HookResult;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

/// Boxed future with a borrow lifetime, used by handler and hook signatures
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A registered event handler for consumer type `C`
pub type BoxedHandler<C> = Box<
    dyn for<'a> Fn(&'a mut C, &'a mut ConsumerContext, Value) -> BoxFuture<'a, HookResult>
        + Send
        + Sync,
>;

/// Event-name to handler table for one consumer type.
///
/// ```rust
/// use serde_json::Value;
/// use sockhub::{Consumer, ConsumerContext, EventRoutes, HookResult};
///
/// struct Echo;
///
/// impl Echo {
///     async fn on_echo(&mut self, ctx: &mut ConsumerContext, data: Value) -> HookResult {
///         ctx.send("echo", data);
///         Ok(())
///     }
/// }
///
/// impl Consumer for Echo {
///     fn register(routes: &mut EventRoutes<Self>) {
///         routes.on("echo", |c, ctx, data| Box::pin(c.on_echo(ctx, data)));
///     }
/// }
/// ```
pub struct EventRoutes<C> {
    handlers: HashMap<String, BoxedHandler<C>>,
}

impl<C> EventRoutes<C> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler for an event name.
    ///
    /// Registering the same event twice replaces the earlier handler.
    pub fn on<F>(&mut self, event: impl Into<String>, handler: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut C, &'a mut ConsumerContext, Value) -> BoxFuture<'a, HookResult>
            + Send
            + Sync
            + 'static,
    {
        self.handlers.insert(event.into(), Box::new(handler));
        self
    }

    /// Look up the handler for an event name
    pub fn get(&self, event: &str) -> Option<&BoxedHandler<C>> {
        self.handlers.get(event)
    }

    pub fn contains(&self, event: &str) -> bool {
        self.handlers.contains_key(event)
    }

    /// Registered event names, in no particular order
    pub fn events(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<C> Default for EventRoutes<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Consumer> EventRoutes<C> {
    /// Build the route table for a consumer type
    pub fn build() -> Self {
        let mut routes = Self::new();
        C::register(&mut routes);
        routes
    }
}
