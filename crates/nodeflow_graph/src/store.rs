// SPDX-License-Identifier: MIT OR Apache-2.0
//! Transactional graph store.
//!
//! [`GraphStore`] owns the canonical [`Graph`]. All writes go through a
//! [`Transaction`], which checks invariants before each change and records it.
//! A transaction that fails part way is rolled back by replaying the inverse of
//! what it had already applied, so callers and subscribers never observe a
//! partially applied batch.

use crate::connection::{Connection, Endpoint};
use crate::diff::{GraphChange, GraphDiff};
use crate::error::{EndpointFault, GraphConstraintViolation};
use crate::graph::Graph;
use crate::history::{self, History, HistoryStats, MAX_HISTORY};
use crate::id::{ConnectionId, NodeId};
use crate::node::{Node, NodePatch};
use crate::port::PortDirection;
use serde::{Deserialize, Serialize};

type Result<T> = std::result::Result<T, GraphConstraintViolation>;

fn check_geometry(node: &Node) -> Result<()> {
    if node.has_valid_geometry() {
        return Ok(());
    }
    Err(GraphConstraintViolation::InvalidGeometry {
        node: node.id.clone(),
        x: node.position.x,
        y: node.position.y,
        w: node.size.w,
        h: node.size.h,
    })
}

/// What happens when a connection targets a port that is already full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityPolicy {
    /// Refuse the new connection
    #[default]
    Reject,
    /// Evict the oldest connection(s) on the port in the same transaction
    Replace,
}

/// Store behaviour knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreSettings {
    /// Capacity of input ports without an explicit `max_connections`
    pub max_input_connections: usize,
    /// Full-port policy
    pub capacity_policy: CapacityPolicy,
    /// Undo depth (0 disables history)
    pub history_depth: usize,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            max_input_connections: 1,
            capacity_policy: CapacityPolicy::Reject,
            history_depth: MAX_HISTORY,
        }
    }
}

/// Handle returned by [`GraphStore::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&GraphDiff)>;

/// A batch of mutations committed as one unit
pub struct Transaction<'a> {
    graph: &'a mut Graph,
    settings: StoreSettings,
    changes: Vec<GraphChange>,
    cleared: bool,
}

impl<'a> Transaction<'a> {
    fn new(graph: &'a mut Graph, settings: StoreSettings) -> Self {
        Self {
            graph,
            settings,
            changes: Vec::new(),
            cleared: false,
        }
    }

    /// The graph as it stands inside the transaction
    pub fn graph(&self) -> &Graph {
        self.graph
    }

    /// Add a node
    pub fn add_node(&mut self, node: Node) -> Result<()> {
        if self.graph.contains_node(&node.id) {
            return Err(GraphConstraintViolation::DuplicateNodeId(node.id));
        }
        check_geometry(&node)?;
        if let Some(port) = node.duplicate_port() {
            return Err(GraphConstraintViolation::DuplicatePortId {
                node: node.id.clone(),
                port: port.clone(),
            });
        }
        self.graph.insert_node(node.clone());
        self.changes.push(GraphChange::NodeAdded { node });
        Ok(())
    }

    /// Remove a node and every connection touching it.
    ///
    /// Returns `false` (and records nothing) when the node does not exist.
    pub fn remove_node(&mut self, node_id: &NodeId) -> bool {
        if !self.graph.contains_node(node_id) {
            return false;
        }
        let attached: Vec<ConnectionId> = self
            .graph
            .connections_for_node(node_id)
            .map(|c| c.id.clone())
            .collect();
        for id in &attached {
            self.remove_connection(id);
        }
        if let Some((node, index, stamp)) = self.graph.take_node(node_id) {
            self.changes.push(GraphChange::NodeRemoved { node, index, stamp });
        }
        true
    }

    /// Replace a node snapshot with a patched copy.
    ///
    /// Returns `Ok(false)` when the patch leaves the node unchanged.
    pub fn update_node(&mut self, node_id: &NodeId, patch: &NodePatch) -> Result<bool> {
        let current = self
            .graph
            .node(node_id)
            .ok_or_else(|| GraphConstraintViolation::UnknownNode(node_id.clone()))?;
        let updated = current.patched(patch);
        if updated.same_as(current) {
            return Ok(false);
        }
        check_geometry(&updated)?;
        if patch.changes_ports() {
            if let Some(port) = updated.duplicate_port() {
                return Err(GraphConstraintViolation::DuplicatePortId {
                    node: updated.id.clone(),
                    port: port.clone(),
                });
            }
            self.check_ports_still_resolve(&updated)?;
        }
        let old = self
            .graph
            .replace_node(updated.clone())
            .ok_or_else(|| GraphConstraintViolation::UnknownNode(node_id.clone()))?;
        self.changes.push(GraphChange::NodeUpdated { old, new: updated });
        Ok(true)
    }

    /// Move a node to the top of its placement layer
    pub fn raise_node(&mut self, node_id: &NodeId) -> bool {
        let Some(((from_index, from_stamp), (to_index, to_stamp))) = self.graph.raise_node(node_id) else {
            return false;
        };
        self.changes.push(GraphChange::NodeReordered {
            id: node_id.clone(),
            from_index,
            from_stamp,
            to_index,
            to_stamp,
        });
        true
    }

    /// Add a connection from an output port to an input port
    pub fn add_connection(&mut self, connection: Connection) -> Result<()> {
        if self.graph.connection(&connection.id).is_some() {
            return Err(GraphConstraintViolation::DuplicateConnectionId(connection.id));
        }
        self.resolve(&connection, &connection.source, PortDirection::Output)?;
        self.resolve(&connection, &connection.target, PortDirection::Input)?;
        if let Some(existing) = self.graph.find_connection(&connection.source, &connection.target) {
            return Err(GraphConstraintViolation::DuplicateConnection {
                existing: existing.id.clone(),
                source_endpoint: connection.source.clone(),
                target_endpoint: connection.target.clone(),
            });
        }

        let mut evicted = self.make_room(&connection.target, PortDirection::Input)?;
        evicted.extend(self.make_room(&connection.source, PortDirection::Output)?);
        for id in &evicted {
            tracing::debug!(connection = %id, "evicting connection from full port");
            self.remove_connection(id);
        }

        self.graph.insert_connection(connection.clone());
        self.changes.push(GraphChange::ConnectionAdded { connection });
        Ok(())
    }

    /// Remove a connection; `false` when it does not exist
    pub fn remove_connection(&mut self, connection_id: &ConnectionId) -> bool {
        match self.graph.take_connection(connection_id) {
            Some((connection, index)) => {
                self.changes.push(GraphChange::ConnectionRemoved { connection, index });
                true
            }
            None => false,
        }
    }

    /// Remove every connection and node
    pub fn clear(&mut self) {
        let connections: Vec<ConnectionId> = self.graph.connections().map(|c| c.id.clone()).collect();
        for id in &connections {
            self.remove_connection(id);
        }
        let nodes: Vec<NodeId> = self.graph.node_ids().cloned().collect();
        for id in &nodes {
            self.remove_node(id);
        }
        self.cleared = true;
    }

    fn resolve(&self, connection: &Connection, endpoint: &Endpoint, expected: PortDirection) -> Result<()> {
        let fault = match self.graph.node(&endpoint.node) {
            None => Some(EndpointFault::MissingNode),
            Some(node) => match node.port(&endpoint.port) {
                None => Some(EndpointFault::MissingPort),
                Some(port) if port.direction != expected => Some(EndpointFault::WrongDirection),
                Some(_) => None,
            },
        };
        match fault {
            Some(fault) => Err(GraphConstraintViolation::DanglingEndpoint {
                connection: connection.id.clone(),
                endpoint: endpoint.clone(),
                fault,
            }),
            None => Ok(()),
        }
    }

    /// Connections that must go for one more to fit on `endpoint`
    fn make_room(&self, endpoint: &Endpoint, direction: PortDirection) -> Result<Vec<ConnectionId>> {
        let Some(port) = self.graph.port(endpoint) else {
            return Ok(Vec::new());
        };
        let Some(capacity) = port.capacity(self.settings.max_input_connections) else {
            return Ok(Vec::new());
        };
        let attached: Vec<ConnectionId> = match direction {
            PortDirection::Input => self.graph.connections_to(endpoint).map(|c| c.id.clone()).collect(),
            PortDirection::Output => self.graph.connections_from(endpoint).map(|c| c.id.clone()).collect(),
        };
        if attached.len() < capacity {
            return Ok(Vec::new());
        }
        match self.settings.capacity_policy {
            CapacityPolicy::Replace if capacity > 0 => {
                let excess = attached.len() + 1 - capacity;
                Ok(attached.into_iter().take(excess).collect())
            }
            _ => Err(GraphConstraintViolation::PortCapacityExceeded {
                endpoint: endpoint.clone(),
                capacity,
            }),
        }
    }

    /// Connections of a node about to be replaced must still fit its new ports
    fn check_ports_still_resolve(&self, updated: &Node) -> Result<()> {
        for connection in self.graph.connections_for_node(&updated.id) {
            let ends = [
                (&connection.source, PortDirection::Output),
                (&connection.target, PortDirection::Input),
            ];
            for (endpoint, expected) in ends {
                if endpoint.node != updated.id {
                    continue;
                }
                let fault = match updated.port(&endpoint.port) {
                    None => Some(EndpointFault::MissingPort),
                    Some(port) if port.direction != expected => Some(EndpointFault::WrongDirection),
                    Some(_) => None,
                };
                if let Some(fault) = fault {
                    return Err(GraphConstraintViolation::DanglingEndpoint {
                        connection: connection.id.clone(),
                        endpoint: endpoint.clone(),
                        fault,
                    });
                }
            }
        }

        for port in updated.ports() {
            let Some(capacity) = port.capacity(self.settings.max_input_connections) else {
                continue;
            };
            let endpoint = Endpoint::new(updated.id.clone(), port.id.clone());
            let attached = match port.direction {
                PortDirection::Input => self.graph.connections_to(&endpoint).count(),
                PortDirection::Output => self.graph.connections_from(&endpoint).count(),
            };
            if attached > capacity {
                return Err(GraphConstraintViolation::PortCapacityExceeded { endpoint, capacity });
            }
        }
        Ok(())
    }
}

/// Undo one recorded change; returns the change actually performed
fn revert(graph: &mut Graph, change: &GraphChange) -> Option<GraphChange> {
    match change {
        GraphChange::NodeAdded { node } => {
            let (node, index, stamp) = graph.take_node(&node.id)?;
            Some(GraphChange::NodeRemoved { node, index, stamp })
        }
        GraphChange::NodeRemoved { node, index, stamp } => {
            if graph.contains_node(&node.id) {
                return None;
            }
            graph.restore_node(node.clone(), *index, *stamp);
            Some(GraphChange::NodeAdded { node: node.clone() })
        }
        GraphChange::NodeUpdated { old, new } => {
            graph.replace_node(old.clone())?;
            Some(GraphChange::NodeUpdated {
                old: new.clone(),
                new: old.clone(),
            })
        }
        GraphChange::NodeReordered {
            id,
            from_index,
            from_stamp,
            to_index,
            to_stamp,
        } => graph
            .move_node(id, *from_index, *from_stamp)
            .then(|| GraphChange::NodeReordered {
                id: id.clone(),
                from_index: *to_index,
                from_stamp: *to_stamp,
                to_index: *from_index,
                to_stamp: *from_stamp,
            }),
        GraphChange::ConnectionAdded { connection } => {
            let (connection, index) = graph.take_connection(&connection.id)?;
            Some(GraphChange::ConnectionRemoved { connection, index })
        }
        GraphChange::ConnectionRemoved { connection, index } => {
            if graph.connection(&connection.id).is_some() {
                return None;
            }
            graph.restore_connection(connection.clone(), *index);
            Some(GraphChange::ConnectionAdded {
                connection: connection.clone(),
            })
        }
    }
}

/// Re-apply one recorded change; returns the change actually performed
fn reapply(graph: &mut Graph, change: &GraphChange) -> Option<GraphChange> {
    match change {
        GraphChange::NodeAdded { node } => {
            if graph.contains_node(&node.id) {
                return None;
            }
            graph.insert_node(node.clone());
            Some(change.clone())
        }
        GraphChange::NodeRemoved { node, .. } => {
            let (node, index, stamp) = graph.take_node(&node.id)?;
            Some(GraphChange::NodeRemoved { node, index, stamp })
        }
        GraphChange::NodeUpdated { new, .. } => {
            let old = graph.replace_node(new.clone())?;
            Some(GraphChange::NodeUpdated { old, new: new.clone() })
        }
        GraphChange::NodeReordered {
            id, to_index, to_stamp, ..
        } => graph.move_node(id, *to_index, *to_stamp).then(|| change.clone()),
        GraphChange::ConnectionAdded { connection } => {
            if graph.connection(&connection.id).is_some() {
                return None;
            }
            graph.insert_connection(connection.clone());
            Some(change.clone())
        }
        GraphChange::ConnectionRemoved { connection, .. } => {
            let (connection, index) = graph.take_connection(&connection.id)?;
            Some(GraphChange::ConnectionRemoved { connection, index })
        }
    }
}

fn rollback(graph: &mut Graph, changes: &[GraphChange]) {
    for change in changes.iter().rev() {
        if revert(graph, change).is_none() {
            tracing::warn!(?change, "rollback skipped a change that no longer applies");
        }
    }
}

/// The single writer of graph state
pub struct GraphStore {
    graph: Graph,
    settings: StoreSettings,
    revision: u64,
    history: History,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
}

impl GraphStore {
    /// Create an empty store
    pub fn new(settings: StoreSettings) -> Self {
        Self {
            graph: Graph::default(),
            settings,
            revision: 0,
            history: History::new(settings.history_depth),
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    /// Current graph
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Revision of the last committed transaction
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Active settings
    pub fn settings(&self) -> StoreSettings {
        self.settings
    }

    /// Change the full-port policy for subsequent mutations
    pub fn set_capacity_policy(&mut self, policy: CapacityPolicy) {
        self.settings.capacity_policy = policy;
    }

    /// Change the default input capacity for subsequent mutations
    pub fn set_max_input_connections(&mut self, max: usize) {
        self.settings.max_input_connections = max;
    }

    /// Run `f` as one transaction.
    ///
    /// On success the combined diff is published once and recorded for undo.
    /// On error every change made so far is reverted and nothing is published.
    pub fn transaction<R>(
        &mut self,
        label: impl Into<String>,
        f: impl FnOnce(&mut Transaction<'_>) -> Result<R>,
    ) -> Result<(R, GraphDiff)> {
        let label = label.into();
        let mut tx = Transaction::new(&mut self.graph, self.settings);
        match f(&mut tx) {
            Ok(value) => {
                let Transaction { changes, cleared, .. } = tx;
                if changes.is_empty() {
                    let diff = GraphDiff {
                        revision: self.revision,
                        label: Some(label),
                        changes,
                        cleared,
                    };
                    return Ok((value, diff));
                }
                let diff = self.publish(changes, Some(label), cleared);
                self.history.record(diff.clone());
                Ok((value, diff))
            }
            Err(err) => {
                let changes = std::mem::take(&mut tx.changes);
                rollback(tx.graph, &changes);
                tracing::debug!(%err, %label, "transaction rejected");
                Err(err)
            }
        }
    }

    /// Add a node
    pub fn add_node(&mut self, node: Node) -> Result<GraphDiff> {
        self.transaction("Add node", |tx| tx.add_node(node))
            .map(|(_, diff)| diff)
    }

    /// Remove a node and its connections; a missing id yields an empty diff
    pub fn remove_node(&mut self, node_id: &NodeId) -> GraphDiff {
        self.infallible("Remove node", |tx| {
            tx.remove_node(node_id);
        })
    }

    /// Patch a node
    pub fn update_node(&mut self, node_id: &NodeId, patch: &NodePatch) -> Result<GraphDiff> {
        self.transaction("Update node", |tx| tx.update_node(node_id, patch))
            .map(|(_, diff)| diff)
    }

    /// Bring a node to the top of its layer
    pub fn raise_node(&mut self, node_id: &NodeId) -> GraphDiff {
        self.infallible("Raise node", |tx| {
            tx.raise_node(node_id);
        })
    }

    /// Add a connection
    pub fn add_connection(&mut self, connection: Connection) -> Result<GraphDiff> {
        self.transaction("Add connection", |tx| tx.add_connection(connection))
            .map(|(_, diff)| diff)
    }

    /// Remove a connection; a missing id yields an empty diff
    pub fn remove_connection(&mut self, connection_id: &ConnectionId) -> GraphDiff {
        self.infallible("Remove connection", |tx| {
            tx.remove_connection(connection_id);
        })
    }

    /// Remove everything
    pub fn clear(&mut self) -> GraphDiff {
        self.infallible("Clear graph", |tx| tx.clear())
    }

    /// Replace the whole graph with validated content.
    ///
    /// The content is validated against a scratch graph first, with full ports
    /// rejected regardless of the configured policy. On error the store is
    /// untouched. On success history is reset.
    pub fn load(&mut self, nodes: Vec<Node>, connections: Vec<Connection>) -> Result<GraphDiff> {
        let mut scratch = Graph::new(self.graph.name.clone());
        let strict = StoreSettings {
            capacity_policy: CapacityPolicy::Reject,
            ..self.settings
        };
        {
            let mut tx = Transaction::new(&mut scratch, strict);
            for node in &nodes {
                tx.add_node(node.clone())?;
            }
            for connection in &connections {
                tx.add_connection(connection.clone())?;
            }
        }

        let (_, diff) = self.transaction("Load graph", |tx| {
            tx.clear();
            for node in nodes {
                tx.add_node(node)?;
            }
            for connection in connections {
                tx.add_connection(connection)?;
            }
            Ok(())
        })?;
        self.history.clear();
        tracing::info!(
            nodes = self.graph.node_count(),
            connections = self.graph.connection_count(),
            "graph loaded"
        );
        Ok(diff)
    }

    /// Register a callback receiving every committed diff
    pub fn subscribe(&mut self, callback: impl FnMut(&GraphDiff) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Drop a subscription; `false` when it was not registered
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        self.subscribers.len() != before
    }

    /// Revert the most recent recorded transaction
    pub fn undo(&mut self) -> history::Result<GraphDiff> {
        let original = self.history.pop_undo()?;
        let mut changes = Vec::with_capacity(original.changes.len());
        for change in original.changes.iter().rev() {
            match revert(&mut self.graph, change) {
                Some(done) => changes.push(done),
                None => tracing::warn!(?change, "undo skipped a change that no longer applies"),
            }
        }
        let label = original.label.as_ref().map(|l| format!("Undo {l}"));
        self.history.push_redo(original);
        Ok(self.publish(changes, label, false))
    }

    /// Re-apply the most recently undone transaction
    pub fn redo(&mut self) -> history::Result<GraphDiff> {
        let original = self.history.pop_redo()?;
        let mut changes = Vec::with_capacity(original.changes.len());
        for change in &original.changes {
            match reapply(&mut self.graph, change) {
                Some(done) => changes.push(done),
                None => tracing::warn!(?change, "redo skipped a change that no longer applies"),
            }
        }
        let diff = self.publish(changes, original.label.clone(), original.cleared);
        self.history.push_undo(GraphDiff {
            label: original.label,
            ..diff.clone()
        });
        Ok(diff)
    }

    /// Whether undo is possible
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Whether redo is possible
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Label of the next undo
    pub fn undo_label(&self) -> Option<&str> {
        self.history.undo_label()
    }

    /// History statistics
    pub fn history_stats(&self) -> HistoryStats {
        self.history.stats()
    }

    fn infallible(&mut self, label: &str, f: impl FnOnce(&mut Transaction<'_>)) -> GraphDiff {
        match self.transaction(label, |tx| {
            f(tx);
            Ok(())
        }) {
            Ok((_, diff)) => diff,
            Err(_) => GraphDiff::default(),
        }
    }

    fn publish(&mut self, changes: Vec<GraphChange>, label: Option<String>, cleared: bool) -> GraphDiff {
        self.revision += 1;
        let diff = GraphDiff {
            revision: self.revision,
            label,
            changes,
            cleared,
        };
        tracing::debug!(
            revision = diff.revision,
            label = diff.label.as_deref().unwrap_or(""),
            changes = diff.len(),
            "transaction committed"
        );
        for (_, callback) in &mut self.subscribers {
            callback(&diff);
        }
        diff
    }
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new(StoreSettings::default())
    }
}

impl std::fmt::Debug for GraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphStore")
            .field("graph", &self.graph)
            .field("settings", &self.settings)
            .field("revision", &self.revision)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
