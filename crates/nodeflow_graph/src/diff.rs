// SPDX-License-Identifier: MIT OR Apache-2.0
//! Minimal change records emitted by committed transactions.
//!
//! Observers replay a [`GraphDiff`] instead of rescanning the graph. The
//! records carry enough of the old state (indices, paint stamps) to be inverted,
//! which is what undo/redo and transaction rollback build on.

use crate::connection::Connection;
use crate::id::{ConnectionId, NodeId};
use crate::node::Node;
use indexmap::IndexSet;

/// One recorded mutation
#[derive(Debug, Clone, PartialEq)]
pub enum GraphChange {
    /// A node was inserted on top of its layer
    NodeAdded {
        /// The new node
        node: Node,
    },
    /// A node was removed
    NodeRemoved {
        /// The removed snapshot
        node: Node,
        /// Its position in insertion order
        index: usize,
        /// Its paint stamp
        stamp: u64,
    },
    /// A node snapshot was replaced
    NodeUpdated {
        /// Snapshot before the patch
        old: Node,
        /// Snapshot after the patch
        new: Node,
    },
    /// A node changed its place in paint order (raise, or the undo of one)
    NodeReordered {
        /// Moved node
        id: NodeId,
        /// Insertion index before the move
        from_index: usize,
        /// Paint stamp before the move
        from_stamp: u64,
        /// Insertion index after the move
        to_index: usize,
        /// Paint stamp after the move
        to_stamp: u64,
    },
    /// A connection was inserted
    ConnectionAdded {
        /// The new connection
        connection: Connection,
    },
    /// A connection was removed
    ConnectionRemoved {
        /// The removed connection
        connection: Connection,
        /// Its position in insertion order
        index: usize,
    },
}

impl GraphChange {
    /// Node touched by this change, if any
    pub fn node_id(&self) -> Option<&NodeId> {
        match self {
            Self::NodeAdded { node } | Self::NodeRemoved { node, .. } => Some(&node.id),
            Self::NodeUpdated { new, .. } => Some(&new.id),
            Self::NodeReordered { id, .. } => Some(id),
            Self::ConnectionAdded { .. } | Self::ConnectionRemoved { .. } => None,
        }
    }

    /// Connection touched by this change, if any
    pub fn connection_id(&self) -> Option<&ConnectionId> {
        match self {
            Self::ConnectionAdded { connection } | Self::ConnectionRemoved { connection, .. } => {
                Some(&connection.id)
            }
            _ => None,
        }
    }
}

/// Everything one committed transaction changed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphDiff {
    /// Store revision produced by this transaction
    pub revision: u64,
    /// Optional human-readable label ("Delete selection", ...)
    pub label: Option<String>,
    /// Changes in the order they were applied
    pub changes: Vec<GraphChange>,
    /// Set when the transaction emptied the whole graph
    pub cleared: bool,
}

impl GraphDiff {
    /// Whether nothing changed
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Number of recorded changes
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Distinct nodes touched, in first-touch order
    pub fn touched_nodes(&self) -> IndexSet<NodeId> {
        self.changes.iter().filter_map(GraphChange::node_id).cloned().collect()
    }

    /// Distinct connections added or removed, in first-touch order
    pub fn touched_connections(&self) -> IndexSet<ConnectionId> {
        self.changes
            .iter()
            .filter_map(GraphChange::connection_id)
            .cloned()
            .collect()
    }

    /// Connections added by this diff
    pub fn added_connections(&self) -> impl Iterator<Item = &Connection> {
        self.changes.iter().filter_map(|c| match c {
            GraphChange::ConnectionAdded { connection } => Some(connection),
            _ => None,
        })
    }

    /// Connections removed by this diff (including cascades)
    pub fn removed_connections(&self) -> impl Iterator<Item = &Connection> {
        self.changes.iter().filter_map(|c| match c {
            GraphChange::ConnectionRemoved { connection, .. } => Some(connection),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Endpoint;

    #[test]
    fn test_touched_sets_are_deduplicated() {
        let node = Node::new("n1", "t");
        let moved = node.clone().with_position(5.0, 5.0);
        let conn = Connection::new("c1", Endpoint::new("n1", "o"), Endpoint::new("n2", "i"));
        let diff = GraphDiff {
            revision: 1,
            label: None,
            changes: vec![
                GraphChange::NodeAdded { node: node.clone() },
                GraphChange::NodeUpdated { old: node, new: moved },
                GraphChange::ConnectionAdded { connection: conn },
            ],
            cleared: false,
        };
        assert_eq!(diff.touched_nodes().len(), 1);
        assert_eq!(diff.touched_connections().len(), 1);
        assert_eq!(diff.added_connections().count(), 1);
        assert_eq!(diff.removed_connections().count(), 0);
    }
}
