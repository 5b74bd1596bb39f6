//! Process-wide entry point wiring consumers, groups and sessions
//!
//! The hub is what the routing layer talks to: it owns the injected group
//! registry and session config, caches each consumer type's route table
//! (built once per type, on first use), and spawns one task per accepted
//! connection.

use crate::config::SessionConfig;
use crate::connection::ConnectionHandle;
use crate::consumer::Consumer;
use crate::dispatch::EventRoutes;
use crate::groups::{GroupRegistry, LocalGroups};
use crate::session::ConsumerSession;
use crate::transport::Transport;
use crate::types::ConnectionInfo;
use serde_json::Value;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Shared entry point for a process's socket connections
pub struct SocketHub {
    groups: Arc<dyn GroupRegistry>,
    config: SessionConfig,
    routes: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl SocketHub {
    /// Hub with an in-memory group registry
    pub fn new() -> Self {
        Self::with_groups(Arc::new(LocalGroups::new()))
    }

    /// Hub over an injected group registry (e.g. a relayed one)
    pub fn with_groups(groups: Arc<dyn GroupRegistry>) -> Self {
        Self {
            groups,
            config: SessionConfig::default(),
            routes: RwLock::new(HashMap::new()),
        }
    }

    pub fn builder() -> SocketHubBuilder {
        SocketHubBuilder::new()
    }

    /// The group registry sessions spawned from this hub share
    pub fn groups(&self) -> &Arc<dyn GroupRegistry> {
        &self.groups
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The route table for a consumer type, built on first use and cached
    pub fn routes_for<C: Consumer>(&self) -> Arc<EventRoutes<C>> {
        if let Some(routes) = self.routes.read().expect("route cache lock poisoned").get(&TypeId::of::<C>()) {
            return Arc::clone(routes)
                .downcast::<EventRoutes<C>>()
                .ok()
                .expect("route table cached under its own TypeId");
        }

        let mut table = self.routes.write().expect("route cache lock poisoned");
        let entry = table
            .entry(TypeId::of::<C>())
            .or_insert_with(|| Arc::new(EventRoutes::<C>::build()) as Arc<dyn Any + Send + Sync>);
        Arc::clone(entry)
            .downcast::<EventRoutes<C>>()
            .ok()
            .expect("route table cached under its own TypeId")
    }

    /// Build a session for an accepted, routed connection
    pub fn session<C: Consumer, T: Transport>(
        &self,
        consumer: C,
        transport: T,
        info: ConnectionInfo,
    ) -> ConsumerSession<C, T> {
        ConsumerSession::with_routes(
            consumer,
            transport,
            info,
            Arc::clone(&self.groups),
            self.config.clone(),
            self.routes_for::<C>(),
        )
    }

    /// Spawn the connection's task and hand back its delivery capability
    pub fn spawn<C: Consumer, T: Transport + 'static>(
        &self,
        consumer: C,
        transport: T,
        info: ConnectionInfo,
    ) -> ConnectionHandle {
        let session = self.session(consumer, transport, info);
        let handle = session.handle();
        tokio::spawn(session.run());
        handle
    }

    /// Server-initiated group fan-out (no originating connection)
    pub async fn group_send(&self, group: &str, event: &str, data: Value) -> usize {
        self.groups.send(group, event, data).await
    }

    /// Server-initiated group event dispatch
    pub async fn group_call_event(&self, group: &str, event: &str, data: Value) -> usize {
        self.groups.call_event(group, event, data).await
    }
}

impl Default for SocketHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for hub configuration
pub struct SocketHubBuilder {
    groups: Option<Arc<dyn GroupRegistry>>,
    config: SessionConfig,
}

impl SocketHubBuilder {
    pub fn new() -> Self {
        Self {
            groups: None,
            config: SessionConfig::default(),
        }
    }

    /// Use an injected group registry
    pub fn groups(mut self, groups: Arc<dyn GroupRegistry>) -> Self {
        self.groups = Some(groups);
        self
    }

    /// Cap inbound frame size
    pub fn max_message_size(mut self, size: usize) -> Self {
        self.config.max_message_size = Some(size);
        self
    }

    /// Remove the inbound frame size cap
    pub fn no_message_size_limit(mut self) -> Self {
        self.config.max_message_size = None;
        self
    }

    /// Close code used when a hook fails
    pub fn error_close_code(mut self, code: u16) -> Self {
        self.config.error_close_code = code;
        self
    }

    /// Close code used when the connect phase declines a connection
    pub fn refusal_close_code(mut self, code: u16) -> Self {
        self.config.refusal_close_code = code;
        self
    }

    pub fn build(self) -> SocketHub {
        let mut hub = match self.groups {
            Some(groups) => SocketHub::with_groups(groups),
            None => SocketHub::new(),
        };
        hub.config = self.config;
        hub
    }
}

impl Default for SocketHubBuilder {
    fn default() -> Self {
        Self::new()
    }
}
