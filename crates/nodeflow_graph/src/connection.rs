// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection (edge) definitions for the graph.

use crate::id::{ConnectionId, NodeId, PortId};
use crate::routing::LinkStyle;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One end of a connection: a port on a node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    /// Owning node
    pub node: NodeId,
    /// Port on that node
    pub port: PortId,
}

impl Endpoint {
    /// Create a new endpoint
    pub fn new(node: impl Into<NodeId>, port: impl Into<PortId>) -> Self {
        Self {
            node: node.into(),
            port: port.into(),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node, self.port)
    }
}

/// A connection from an output port to an input port
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    /// Unique connection ID
    pub id: ConnectionId,
    /// Source (output) endpoint
    pub source: Endpoint,
    /// Target (input) endpoint
    pub target: Endpoint,
    /// Per-connection style override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<LinkStyle>,
}

impl Connection {
    /// Create a new connection
    pub fn new(id: impl Into<ConnectionId>, source: Endpoint, target: Endpoint) -> Self {
        Self {
            id: id.into(),
            source,
            target,
            style: None,
        }
    }

    /// Create a connection with a generated id
    pub fn between(source: Endpoint, target: Endpoint) -> Self {
        Self::new(ConnectionId::new(), source, target)
    }

    /// Override the router style for this connection
    pub fn with_style(mut self, style: LinkStyle) -> Self {
        self.style = Some(style);
        self
    }

    /// Check if this connection involves a specific node
    pub fn involves_node(&self, node_id: &NodeId) -> bool {
        self.source.node == *node_id || self.target.node == *node_id
    }

    /// Check if this connection involves a specific port
    pub fn involves_port(&self, endpoint: &Endpoint) -> bool {
        self.source == *endpoint || self.target == *endpoint
    }

    /// Whether both connections link the same pair of ports
    pub fn same_ports(&self, other: &Connection) -> bool {
        self.source == other.source && self.target == other.target
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_involvement() {
        let conn = Connection::new("c", Endpoint::new("n1", "o"), Endpoint::new("n2", "i"));
        assert!(conn.involves_node(&NodeId::from("n1")));
        assert!(conn.involves_node(&NodeId::from("n2")));
        assert!(!conn.involves_node(&NodeId::from("n3")));
        assert!(conn.involves_port(&Endpoint::new("n2", "i")));
        assert!(!conn.involves_port(&Endpoint::new("n2", "o")));
    }

    #[test]
    fn test_same_ports_ignores_id_and_style() {
        let a = Connection::new("a", Endpoint::new("n1", "o"), Endpoint::new("n2", "i"));
        let b = Connection::new("b", Endpoint::new("n1", "o"), Endpoint::new("n2", "i"))
            .with_style(LinkStyle::Step);
        assert!(a.same_ports(&b));
    }
}
