//! Middleware chain for connection lifecycle and message interception
//!
//! Middleware runs around the consumer: connect hooks fire in stack order
//! before the consumer's own connect hook, and receive hooks fire in the
//! same order before every dispatch. Hooks observe and may mutate the
//! consumer through the passed-in reference, but cannot swallow or
//! redirect an event — dispatch always proceeds after the chain unless a
//! hook fails, which is treated like any other hook failure.

use crate::consumer::{Consumer, ConsumerContext};
use crate::envelope::Envelope;
use crate::errors::HookResult;
use async_trait::async_trait;

/// Interceptor around a consumer's lifecycle and message events.
///
/// Both hooks are optional capabilities with inert defaults; a middleware
/// implementing neither is legal. One middleware stack is constructed per
/// connection, so implementations may keep per-connection state in
/// `&mut self`.
#[async_trait]
pub trait Middleware<C: Consumer>: Send {
    /// Runs before the consumer's connect hook, in stack order.
    ///
    /// Full mutable access to the consumer lets a middleware seed state
    /// the consumer's own connect logic relies on. An error refuses the
    /// handshake.
    async fn on_connect(&mut self, _consumer: &mut C, _ctx: &mut ConsumerContext) -> HookResult {
        Ok(())
    }

    /// Runs before every dispatch, in stack order, with the decoded
    /// envelope. Dispatch to the resolved handler proceeds afterwards.
    async fn on_receive(
        &mut self,
        _consumer: &mut C,
        _ctx: &mut ConsumerContext,
        _envelope: &Envelope,
    ) -> HookResult {
        Ok(())
    }

    /// Middleware name for debugging
    fn name(&self) -> &'static str {
        "Middleware"
    }
}

/// Ordered middleware list attached to a consumer instance
pub struct MiddlewareStack<C: Consumer> {
    stack: Vec<Box<dyn Middleware<C>>>,
}

impl<C: Consumer> MiddlewareStack<C> {
    pub fn new() -> Self {
        Self { stack: Vec::new() }
    }

    /// Append a middleware to the stack
    pub fn with<M: Middleware<C> + 'static>(mut self, middleware: M) -> Self {
        self.stack.push(Box::new(middleware));
        self
    }

    /// Append an already-boxed middleware
    pub fn with_boxed(mut self, middleware: Box<dyn Middleware<C>>) -> Self {
        self.stack.push(middleware);
        self
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn Middleware<C>>> {
        self.stack.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Middleware names for debugging
    pub fn names(&self) -> Vec<&'static str> {
        self.stack.iter().map(|m| m.name()).collect()
    }
}

impl<C: Consumer> Default for MiddlewareStack<C> {
    fn default() -> Self {
        Self::new()
    }
}
