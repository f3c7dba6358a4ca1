// SPDX-License-Identifier: MIT OR Apache-2.0
//! Running graph statistics.

use super::STATS;
use crate::diff::GraphDiff;
use crate::extension::{Extension, ExtensionContext, ExtensionEffect, Overlay, OverlayPrimitive, OverlaySpace};
use crate::geometry::Point;
use crate::graph::Graph;
use serde::Serialize;
use std::any::Any;

/// Counters maintained from committed diffs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    /// Nodes in the graph
    pub nodes: usize,
    /// Connections in the graph
    pub connections: usize,
    /// Transactions observed since attach
    pub transactions: u64,
    /// Changes in the most recent diff
    pub last_diff_size: usize,
    /// Revision of the most recent diff
    pub revision: u64,
}

impl GraphStats {
    /// Counts of a graph, with no transaction history
    pub fn of(graph: &Graph) -> Self {
        Self {
            nodes: graph.node_count(),
            connections: graph.connection_count(),
            ..Self::default()
        }
    }
}

/// Statistics extension
#[derive(Debug, Clone, Default)]
pub struct Stats {
    stats: GraphStats,
}

impl Stats {
    /// Current counters
    pub fn stats(&self) -> GraphStats {
        self.stats
    }
}

impl Extension for Stats {
    fn key(&self) -> &str {
        STATS
    }

    fn on_attach(&mut self, ctx: &ExtensionContext<'_>) {
        self.stats = GraphStats::of(ctx.graph);
    }

    fn on_graph_change(&mut self, diff: &GraphDiff, ctx: &ExtensionContext<'_>) -> Vec<ExtensionEffect> {
        self.stats = GraphStats {
            transactions: self.stats.transactions + 1,
            last_diff_size: diff.len(),
            revision: diff.revision,
            ..GraphStats::of(ctx.graph)
        };
        Vec::new()
    }

    fn overlay(&self, _ctx: &ExtensionContext<'_>) -> Option<Overlay> {
        let s = &self.stats;
        Some(Overlay {
            key: STATS.to_string(),
            space: OverlaySpace::Screen,
            primitives: vec![OverlayPrimitive::Label {
                at: Point::new(8.0, 8.0),
                text: format!(
                    "nodes {} | connections {} | transactions {} | last diff {}",
                    s.nodes, s.connections, s.transactions, s.last_diff_size
                ),
            }],
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{Connection, Endpoint};
    use crate::node::Node;
    use crate::port::Port;
    use crate::spatial::SpatialIndex;
    use crate::store::GraphStore;
    use crate::viewport::Viewport;

    #[test]
    fn test_counts_follow_diffs() {
        let viewport = Viewport::default();
        let spatial = SpatialIndex::default();
        let mut store = GraphStore::default();
        let mut stats = Stats::default();
        stats.on_attach(&ExtensionContext {
            graph: store.graph(),
            viewport: &viewport,
            spatial: &spatial,
        });
        assert_eq!(stats.stats(), GraphStats::default());

        store.add_node(Node::new("a", "t").with_output(Port::output("out", "Out"))).unwrap();
        store.add_node(Node::new("b", "t").with_input(Port::input("in", "In"))).unwrap();
        store
            .add_connection(Connection::new("c", Endpoint::new("a", "out"), Endpoint::new("b", "in")))
            .unwrap();
        let diff = store.remove_node(&"b".into());
        stats.on_graph_change(
            &diff,
            &ExtensionContext {
                graph: store.graph(),
                viewport: &viewport,
                spatial: &spatial,
            },
        );

        let s = stats.stats();
        assert_eq!((s.nodes, s.connections), (1, 0));
        assert_eq!(s.transactions, 1);
        assert_eq!(s.last_diff_size, 2);
        assert_eq!(s.revision, 4);
    }
}
