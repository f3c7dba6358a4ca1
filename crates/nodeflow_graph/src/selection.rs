// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node and connection selection.

use crate::diff::GraphDiff;
use crate::graph::Graph;
use crate::id::{ConnectionId, NodeId};
use indexmap::IndexSet;

/// Current selection, in selection order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    nodes: IndexSet<NodeId>,
    connections: IndexSet<ConnectionId>,
}

impl Selection {
    /// Empty selection
    pub fn new() -> Self {
        Self::default()
    }

    /// Selected nodes
    pub fn nodes(&self) -> &IndexSet<NodeId> {
        &self.nodes
    }

    /// Selected connections
    pub fn connections(&self) -> &IndexSet<ConnectionId> {
        &self.connections
    }

    /// Whether a node is selected
    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.nodes.contains(id)
    }

    /// Whether a connection is selected
    pub fn contains_connection(&self, id: &ConnectionId) -> bool {
        self.connections.contains(id)
    }

    /// Whether nothing is selected
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.connections.is_empty()
    }

    /// Number of selected items
    pub fn len(&self) -> usize {
        self.nodes.len() + self.connections.len()
    }

    /// Clear selection
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.connections.clear();
    }

    /// Select a node (optionally add to selection)
    pub fn select_node(&mut self, id: NodeId, add_to_selection: bool) {
        if !add_to_selection {
            self.clear();
        }
        self.nodes.insert(id);
    }

    /// Select a connection (optionally add to selection)
    pub fn select_connection(&mut self, id: ConnectionId, add_to_selection: bool) {
        if !add_to_selection {
            self.clear();
        }
        self.connections.insert(id);
    }

    /// Toggle node selection
    pub fn toggle_node(&mut self, id: NodeId) {
        if !self.nodes.shift_remove(&id) {
            self.nodes.insert(id);
        }
    }

    /// Replace the node selection (or extend it)
    pub fn set_nodes(&mut self, ids: impl IntoIterator<Item = NodeId>, add_to_selection: bool) {
        if !add_to_selection {
            self.clear();
        }
        self.nodes.extend(ids);
    }

    /// Drop ids that no longer exist after a diff; returns whether anything changed
    pub fn prune(&mut self, graph: &Graph, diff: &GraphDiff) -> bool {
        let before = self.len();
        if diff.cleared {
            self.clear();
        } else {
            for id in diff.touched_nodes() {
                if !graph.contains_node(&id) {
                    self.nodes.shift_remove(&id);
                }
            }
            for id in diff.touched_connections() {
                if graph.connection(&id).is_none() {
                    self.connections.shift_remove(&id);
                }
            }
        }
        self.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;
    use crate::store::GraphStore;

    #[test]
    fn test_select_replace_and_add() {
        let mut selection = Selection::new();
        selection.select_node(NodeId::from("a"), false);
        selection.select_node(NodeId::from("b"), true);
        assert_eq!(selection.len(), 2);
        selection.select_node(NodeId::from("c"), false);
        assert_eq!(selection.nodes().len(), 1);
        selection.toggle_node(NodeId::from("c"));
        assert!(selection.is_empty());
    }

    #[test]
    fn test_prune_after_removal() {
        let mut store = GraphStore::default();
        store.add_node(Node::new("a", "t")).unwrap();
        store.add_node(Node::new("b", "t")).unwrap();
        let mut selection = Selection::new();
        selection.set_nodes([NodeId::from("a"), NodeId::from("b")], false);

        let diff = store.remove_node(&NodeId::from("a"));
        assert!(selection.prune(store.graph(), &diff));
        assert!(!selection.contains_node(&NodeId::from("a")));
        assert!(selection.contains_node(&NodeId::from("b")));
    }
}
