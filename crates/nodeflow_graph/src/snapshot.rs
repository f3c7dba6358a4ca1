// SPDX-License-Identifier: MIT OR Apache-2.0
//! Serializable graph snapshots.
//!
//! A snapshot is `{ version, nodes, connections }` in JSON or RON. Decoding
//! checks the format version; loading into a store re-validates every graph
//! invariant and rejects the payload as a whole rather than repairing it.

use crate::connection::Connection;
use crate::diff::GraphDiff;
use crate::error::SerializationError;
use crate::graph::Graph;
use crate::node::Node;
use crate::store::{GraphStore, StoreSettings};
use serde::{Deserialize, Serialize};

type Result<T> = std::result::Result<T, SerializationError>;

/// Persisted form of a graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    /// Format version
    pub version: u32,
    /// Nodes in insertion order
    pub nodes: Vec<Node>,
    /// Connections in insertion order
    pub connections: Vec<Connection>,
}

impl GraphSnapshot {
    /// Current snapshot format version
    pub const FORMAT_VERSION: u32 = 1;

    /// Capture the current state of a graph
    pub fn from_graph(graph: &Graph) -> Self {
        Self {
            version: Self::FORMAT_VERSION,
            nodes: graph.nodes().cloned().collect(),
            connections: graph.connections().cloned().collect(),
        }
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize from JSON
    pub fn from_json(s: &str) -> Result<Self> {
        let snapshot: Self = serde_json::from_str(s)?;
        snapshot.check_version()?;
        Ok(snapshot)
    }

    /// Serialize to pretty RON
    pub fn to_ron(&self) -> Result<String> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    /// Deserialize from RON
    pub fn from_ron(s: &str) -> Result<Self> {
        let snapshot: Self = ron::from_str(s)?;
        snapshot.check_version()?;
        Ok(snapshot)
    }

    /// Check every invariant without touching a live store
    pub fn validate(&self, settings: StoreSettings) -> Result<()> {
        let mut scratch = GraphStore::new(StoreSettings {
            history_depth: 0,
            ..settings
        });
        scratch.load(self.nodes.clone(), self.connections.clone())?;
        Ok(())
    }

    /// Replace the store's graph with this snapshot
    pub fn load_into(self, store: &mut GraphStore) -> Result<GraphDiff> {
        Ok(store.load(self.nodes, self.connections)?)
    }

    fn check_version(&self) -> Result<()> {
        if self.version != Self::FORMAT_VERSION {
            return Err(SerializationError::Version {
                found: self.version,
                expected: Self::FORMAT_VERSION,
            });
        }
        Ok(())
    }
}
