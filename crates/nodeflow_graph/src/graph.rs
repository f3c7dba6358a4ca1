// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph data structure containing nodes and connections.
//!
//! [`Graph`] is the read side of the store. Its mutators are crate-private:
//! everything outside the crate writes through [`crate::store::GraphStore`],
//! which checks invariants and records diffs.

use crate::connection::{Connection, Endpoint};
use crate::id::{ConnectionId, NodeId};
use crate::node::{Anchor, Node, Placement};
use crate::port::Port;
use indexmap::IndexMap;
use std::collections::HashMap;

/// Paint order key: layer first, then the stamp assigned on insert/raise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ZOrder {
    /// Paint layer
    pub placement: Placement,
    /// Monotonic stamp, higher paints above
    pub stamp: u64,
}

/// A node graph
#[derive(Debug, Clone)]
pub struct Graph {
    /// Graph name
    pub name: String,
    /// Nodes in insertion order
    nodes: IndexMap<NodeId, Node>,
    /// Paint stamps per node
    stamps: HashMap<NodeId, u64>,
    /// Next stamp to hand out
    next_stamp: u64,
    /// Connections between nodes
    connections: IndexMap<ConnectionId, Connection>,
}

impl Graph {
    /// Create a new empty graph
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: IndexMap::new(),
            stamps: HashMap::new(),
            next_stamp: 0,
            connections: IndexMap::new(),
        }
    }

    /// Get a node by ID
    pub fn node(&self, node_id: &NodeId) -> Option<&Node> {
        self.nodes.get(node_id)
    }

    /// Whether a node exists
    pub fn contains_node(&self, node_id: &NodeId) -> bool {
        self.nodes.contains_key(node_id)
    }

    /// Get all nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get all node IDs in insertion order
    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> + '_ {
        self.nodes.keys()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph holds no nodes and no connections
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.connections.is_empty()
    }

    /// Paint order key of a node
    pub fn z_order(&self, node_id: &NodeId) -> Option<ZOrder> {
        let node = self.nodes.get(node_id)?;
        let stamp = *self.stamps.get(node_id)?;
        Some(ZOrder {
            placement: node.placement,
            stamp,
        })
    }

    /// Nodes sorted bottom to top
    pub fn paint_order(&self) -> Vec<&Node> {
        let mut nodes: Vec<&Node> = self.nodes.values().collect();
        nodes.sort_by_key(|n| self.z_order(&n.id));
        nodes
    }

    /// Resolve an endpoint to its port
    pub fn port(&self, endpoint: &Endpoint) -> Option<&Port> {
        self.nodes.get(&endpoint.node)?.port(&endpoint.port)
    }

    /// World-space anchor of an endpoint
    pub fn anchor(&self, endpoint: &Endpoint, outset: f32) -> Option<Anchor> {
        self.nodes.get(&endpoint.node)?.anchor(&endpoint.port, outset)
    }

    /// Get a connection by ID
    pub fn connection(&self, connection_id: &ConnectionId) -> Option<&Connection> {
        self.connections.get(connection_id)
    }

    /// Get all connections in insertion order
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Get connections leaving a specific port
    pub fn connections_from<'a>(&'a self, endpoint: &'a Endpoint) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections.values().filter(move |c| c.source == *endpoint)
    }

    /// Get connections terminating at a specific port
    pub fn connections_to<'a>(&'a self, endpoint: &'a Endpoint) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections.values().filter(move |c| c.target == *endpoint)
    }

    /// Get connections attached to a port on either end
    pub fn connections_at<'a>(&'a self, endpoint: &'a Endpoint) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections.values().filter(move |c| c.involves_port(endpoint))
    }

    /// Get connections involving a node
    pub fn connections_for_node<'a>(&'a self, node_id: &'a NodeId) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections.values().filter(move |c| c.involves_node(node_id))
    }

    /// Find the connection linking exactly these two ports
    pub fn find_connection(&self, source: &Endpoint, target: &Endpoint) -> Option<&Connection> {
        self.connections
            .values()
            .find(|c| c.source == *source && c.target == *target)
    }

    /// Get the number of connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub(crate) fn insert_node(&mut self, node: Node) {
        let stamp = self.take_stamp();
        self.stamps.insert(node.id.clone(), stamp);
        self.nodes.insert(node.id.clone(), node);
    }

    pub(crate) fn restore_node(&mut self, node: Node, index: usize, stamp: u64) {
        self.stamps.insert(node.id.clone(), stamp);
        let index = index.min(self.nodes.len());
        self.nodes.shift_insert(index, node.id.clone(), node);
    }

    pub(crate) fn take_node(&mut self, node_id: &NodeId) -> Option<(Node, usize, u64)> {
        let (index, _, node) = self.nodes.shift_remove_full(node_id)?;
        let stamp = self.stamps.remove(node_id).unwrap_or_default();
        Some((node, index, stamp))
    }

    pub(crate) fn replace_node(&mut self, node: Node) -> Option<Node> {
        let slot = self.nodes.get_mut(&node.id)?;
        Some(std::mem::replace(slot, node))
    }

    /// Move a node to the top of its layer; returns `(index, stamp)` before and after
    pub(crate) fn raise_node(&mut self, node_id: &NodeId) -> Option<((usize, u64), (usize, u64))> {
        let (index, id, node) = self.nodes.shift_remove_full(node_id)?;
        let new_stamp = self.take_stamp();
        let old_stamp = self.stamps.insert(id.clone(), new_stamp).unwrap_or_default();
        self.nodes.insert(id, node);
        Some(((index, old_stamp), (self.nodes.len() - 1, new_stamp)))
    }

    /// Put a node back at an exact insertion index with an exact stamp
    pub(crate) fn move_node(&mut self, node_id: &NodeId, index: usize, stamp: u64) -> bool {
        let Some((_, id, node)) = self.nodes.shift_remove_full(node_id) else {
            return false;
        };
        self.stamps.insert(id.clone(), stamp);
        let index = index.min(self.nodes.len());
        self.nodes.shift_insert(index, id, node);
        true
    }

    pub(crate) fn insert_connection(&mut self, connection: Connection) {
        self.connections.insert(connection.id.clone(), connection);
    }

    pub(crate) fn restore_connection(&mut self, connection: Connection, index: usize) {
        let index = index.min(self.connections.len());
        self.connections
            .shift_insert(index, connection.id.clone(), connection);
    }

    pub(crate) fn take_connection(&mut self, connection_id: &ConnectionId) -> Option<(Connection, usize)> {
        let (index, _, connection) = self.connections.shift_remove_full(connection_id)?;
        Some((connection, index))
    }

    fn take_stamp(&mut self) -> u64 {
        let stamp = self.next_stamp;
        self.next_stamp += 1;
        stamp
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::Port;

    fn sample() -> Graph {
        let mut graph = Graph::default();
        graph.insert_node(Node::new("a", "t").with_output(Port::output("o", "Out")));
        graph.insert_node(Node::new("b", "t").with_input(Port::input("i", "In")));
        graph.insert_node(Node::new("c", "t").with_placement(Placement::Back));
        graph.insert_connection(Connection::new(
            "ab",
            Endpoint::new("a", "o"),
            Endpoint::new("b", "i"),
        ));
        graph
    }

    #[test]
    fn test_paint_order_respects_layers() {
        let graph = sample();
        let order: Vec<&str> = graph.paint_order().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_raise_and_unraise() {
        let mut graph = sample();
        let ((index, stamp), (new_index, _)) = graph.raise_node(&NodeId::from("a")).unwrap();
        assert_eq!(index, 0);
        assert_eq!(new_index, 2);
        let order: Vec<&str> = graph.paint_order().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(order, vec!["c", "b", "a"]);

        assert!(graph.move_node(&NodeId::from("a"), index, stamp));
        let ids: Vec<&str> = graph.node_ids().map(NodeId::as_str).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_take_and_restore_keeps_order() {
        let mut graph = sample();
        let (node, index, stamp) = graph.take_node(&NodeId::from("b")).unwrap();
        assert_eq!(index, 1);
        graph.restore_node(node, index, stamp);
        let ids: Vec<&str> = graph.node_ids().map(NodeId::as_str).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_connection_queries() {
        let graph = sample();
        let output = Endpoint::new("a", "o");
        let input = Endpoint::new("b", "i");
        assert_eq!(graph.connections_from(&output).count(), 1);
        assert_eq!(graph.connections_to(&input).count(), 1);
        assert_eq!(graph.connections_for_node(&NodeId::from("c")).count(), 0);
        assert!(graph.find_connection(&output, &input).is_some());
        assert!(graph.port(&input).is_some());
    }
}
