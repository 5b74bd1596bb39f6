//! In-memory group registry for single-process deployments

use super::GroupRegistry;
use crate::connection::{ConnectionHandle, Delivery};
use crate::envelope::Envelope;
use crate::types::ConnectionId;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::debug;

/// Process-local group registry.
///
/// A single lock guards the group table and the reverse membership index
/// so the two can never disagree; fan-out snapshots the member list under
/// a read lock and enqueues after releasing it, so one slow fan-out never
/// serializes unrelated connections.
pub struct LocalGroups {
    state: RwLock<Tables>,
}

#[derive(Default)]
struct Tables {
    /// group name -> members
    groups: HashMap<String, HashMap<ConnectionId, ConnectionHandle>>,
    /// connection -> groups it belongs to, for O(1) teardown
    memberships: HashMap<ConnectionId, HashSet<String>>,
}

impl Tables {
    fn remove_member(&mut self, group: &str, member: ConnectionId) {
        if let Some(members) = self.groups.get_mut(group) {
            members.remove(&member);
            if members.is_empty() {
                self.groups.remove(group);
            }
        }
        if let Some(joined) = self.memberships.get_mut(&member) {
            joined.remove(group);
            if joined.is_empty() {
                self.memberships.remove(&member);
            }
        }
    }

    fn remove_everywhere(&mut self, member: ConnectionId) -> usize {
        let joined = self.memberships.remove(&member).unwrap_or_default();
        let count = joined.len();
        for group in joined {
            if let Some(members) = self.groups.get_mut(&group) {
                members.remove(&member);
                if members.is_empty() {
                    self.groups.remove(&group);
                }
            }
        }
        count
    }
}

impl LocalGroups {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(Tables::default()),
        }
    }

    /// Snapshot of the current members of a group
    async fn snapshot(&self, group: &str) -> Vec<ConnectionHandle> {
        let state = self.state.read().await;
        state
            .groups
            .get(group)
            .map(|members| members.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Deliver to every member in the snapshot, lazily pruning members
    /// whose sessions are already gone.
    async fn fan_out<F>(&self, group: &str, members: Vec<ConnectionHandle>, make: F) -> usize
    where
        F: Fn() -> Delivery,
    {
        let mut dead = Vec::new();
        let mut reached = 0;

        for member in &members {
            if member.deliver(make()) {
                reached += 1;
            } else {
                dead.push(member.id());
            }
        }

        if !dead.is_empty() {
            let mut state = self.state.write().await;
            for id in dead {
                debug!(connection = %id, group, "pruning dead group member");
                state.remove_everywhere(id);
            }
        }

        reached
    }

    /// Registry statistics
    pub async fn stats(&self) -> GroupStats {
        let state = self.state.read().await;
        GroupStats {
            groups: state.groups.len(),
            connections: state.memberships.len(),
        }
    }
}

impl Default for LocalGroups {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GroupRegistry for LocalGroups {
    async fn add(&self, group: &str, member: ConnectionHandle) {
        let id = member.id();
        let mut state = self.state.write().await;
        state
            .groups
            .entry(group.to_string())
            .or_default()
            .insert(id, member);
        state
            .memberships
            .entry(id)
            .or_default()
            .insert(group.to_string());
        debug!(connection = %id, group, "joined group");
    }

    async fn discard(&self, group: &str, member: ConnectionId) {
        let mut state = self.state.write().await;
        state.remove_member(group, member);
        debug!(connection = %member, group, "left group");
    }

    async fn discard_all(&self, member: ConnectionId) {
        let mut state = self.state.write().await;
        let count = state.remove_everywhere(member);
        if count > 0 {
            debug!(connection = %member, groups = count, "left all groups");
        }
    }

    async fn send(&self, group: &str, event: &str, data: Value) -> usize {
        let members = self.snapshot(group).await;
        if members.is_empty() {
            return 0;
        }
        let frame = Envelope::new(event, data).encode();
        self.fan_out(group, members, || Delivery::Client(frame.clone()))
            .await
    }

    async fn call_event(&self, group: &str, event: &str, data: Value) -> usize {
        let members = self.snapshot(group).await;
        if members.is_empty() {
            return 0;
        }
        let envelope = Envelope::new(event, data);
        self.fan_out(group, members, || Delivery::Event(envelope.clone()))
            .await
    }

    async fn member_count(&self, group: &str) -> usize {
        let state = self.state.read().await;
        state.groups.get(group).map(HashMap::len).unwrap_or(0)
    }
}

/// Point-in-time registry statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupStats {
    /// Number of non-empty groups
    pub groups: usize,
    /// Number of connections belonging to at least one group
    pub connections: usize,
}
