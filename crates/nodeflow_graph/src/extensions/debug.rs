// SPDX-License-Identifier: MIT OR Apache-2.0
//! Spatial-index cells and hit rectangles drawn over the graph.

use super::DEBUG;
use crate::extension::{
    parse_options, Extension, ExtensionContext, Overlay, OverlayPrimitive, OverlayRole, OverlaySpace,
};
use crate::spatial::EntityKey;
use serde::{Deserialize, Serialize};
use std::any::Any;

/// What the debug overlay shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugOptions {
    /// Occupied spatial-hash cells, labelled with their entry count
    pub cells: bool,
    /// Indexed node rectangles
    pub hit_rects: bool,
}

impl Default for DebugOptions {
    fn default() -> Self {
        Self {
            cells: true,
            hit_rects: true,
        }
    }
}

/// Debug overlay extension
#[derive(Debug, Clone, Default)]
pub struct DebugOverlay {
    options: DebugOptions,
}

impl DebugOverlay {
    /// Build from registry options
    pub fn from_options(options: &serde_json::Value) -> Self {
        Self {
            options: parse_options(DEBUG, options),
        }
    }
}

impl Extension for DebugOverlay {
    fn key(&self) -> &str {
        DEBUG
    }

    fn overlay(&self, ctx: &ExtensionContext<'_>) -> Option<Overlay> {
        let mut primitives = Vec::new();
        if self.options.cells {
            for cell in ctx.spatial.occupied_cells() {
                primitives.push(OverlayPrimitive::Rect {
                    rect: cell.rect,
                    role: OverlayRole::Cell,
                });
                primitives.push(OverlayPrimitive::Label {
                    at: cell.rect.min,
                    text: cell.entries.to_string(),
                });
            }
        }
        if self.options.hit_rects {
            for node in ctx.graph.paint_order() {
                if let Some(rect) = ctx.spatial.bounds(&EntityKey::Node(node.id.clone())) {
                    primitives.push(OverlayPrimitive::Rect {
                        rect,
                        role: OverlayRole::HitRect,
                    });
                }
            }
        }
        if primitives.is_empty() {
            return None;
        }
        Some(Overlay {
            key: DEBUG.to_string(),
            space: OverlaySpace::World,
            primitives,
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;
    use crate::spatial::SpatialIndex;
    use crate::store::GraphStore;
    use crate::viewport::Viewport;

    #[test]
    fn test_cells_and_hit_rects() {
        let mut store = GraphStore::default();
        store
            .add_node(Node::new("a", "t").with_position(10.0, 10.0).with_size(50.0, 50.0))
            .unwrap();
        let mut spatial = SpatialIndex::new(100.0);
        spatial.sync_node(store.graph(), &"a".into(), 0.0, 4.0);
        let viewport = Viewport::default();
        let ctx = ExtensionContext {
            graph: store.graph(),
            viewport: &viewport,
            spatial: &spatial,
        };

        let overlay = DebugOverlay::default().overlay(&ctx).unwrap();
        assert_eq!(overlay.space, OverlaySpace::World);
        let hit_rects = overlay
            .primitives
            .iter()
            .filter(|p| matches!(p, OverlayPrimitive::Rect { role: OverlayRole::HitRect, .. }))
            .count();
        assert_eq!(hit_rects, 1);
        assert!(overlay
            .primitives
            .iter()
            .any(|p| matches!(p, OverlayPrimitive::Rect { role: OverlayRole::Cell, .. })));

        let hidden = DebugOverlay::from_options(&serde_json::json!({ "cells": false, "hit_rects": false }));
        assert!(hidden.overlay(&ctx).is_none());
    }
}
