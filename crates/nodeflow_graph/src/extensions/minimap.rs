// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scaled overview of the whole graph with a viewport indicator.

use super::MINIMAP;
use crate::extension::{
    parse_options, Extension, ExtensionContext, Overlay, OverlayPrimitive, OverlayRole, OverlaySpace,
};
use crate::geometry::{Point, Rect, Size};
use crate::graph::Graph;
use crate::viewport::Viewport;
use serde::{Deserialize, Serialize};
use std::any::Any;

/// Minimap frame settings (screen pixels, padding in world units)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinimapOptions {
    /// Frame width
    pub width: f32,
    /// Frame height
    pub height: f32,
    /// Gap between the frame and the bottom-right canvas corner
    pub margin: f32,
    /// World-space padding around the node bounds
    pub padding: f32,
}

impl Default for MinimapOptions {
    fn default() -> Self {
        Self {
            width: 150.0,
            height: 100.0,
            margin: 10.0,
            padding: 50.0,
        }
    }
}

/// World -> minimap mapping for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinimapLayout {
    /// Frame in screen pixels
    pub frame: Rect,
    /// Padded world bounds shown in the frame
    pub world: Rect,
    /// Minimap pixels per world unit
    pub scale: f32,
}

impl MinimapLayout {
    /// Fit the graph into the frame; `None` for an empty graph
    pub fn compute(graph: &Graph, viewport: &Viewport, options: &MinimapOptions) -> Option<Self> {
        let size = Size::new(options.width, options.height);
        let origin = Point::new(
            viewport.canvas.w - size.w - options.margin,
            viewport.canvas.h - size.h - options.margin,
        );
        let frame = Rect::from_origin_size(origin, size);

        let bounds = graph.nodes().map(|node| node.bounds()).reduce(|a, b| a.union(&b))?;
        let world = bounds.inflate(options.padding);
        let scale = (frame.width() / world.width().max(1.0)).min(frame.height() / world.height().max(1.0));
        Some(Self { frame, world, scale })
    }

    /// Map a world point into the frame
    pub fn to_minimap(&self, world: Point) -> Point {
        self.frame.min + (world - self.world.min) * self.scale
    }

    /// Map a frame point back to world units (click-to-navigate)
    pub fn to_world(&self, minimap: Point) -> Point {
        self.world.min + (minimap - self.frame.min) * (1.0 / self.scale)
    }

    /// Map a world rectangle into the frame
    pub fn map_rect(&self, world: &Rect) -> Rect {
        Rect::from_points(self.to_minimap(world.min), self.to_minimap(world.max))
    }
}

/// Minimap extension
#[derive(Debug, Clone, Default)]
pub struct Minimap {
    options: MinimapOptions,
}

impl Minimap {
    /// Build from registry options
    pub fn from_options(options: &serde_json::Value) -> Self {
        Self {
            options: parse_options(MINIMAP, options),
        }
    }

    /// Active options
    pub fn options(&self) -> &MinimapOptions {
        &self.options
    }

    /// Current layout
    pub fn layout(&self, ctx: &ExtensionContext<'_>) -> Option<MinimapLayout> {
        MinimapLayout::compute(ctx.graph, ctx.viewport, &self.options)
    }
}

impl Extension for Minimap {
    fn key(&self) -> &str {
        MINIMAP
    }

    fn overlay(&self, ctx: &ExtensionContext<'_>) -> Option<Overlay> {
        let layout = self.layout(ctx)?;
        let mut primitives = vec![OverlayPrimitive::Rect {
            rect: layout.frame,
            role: OverlayRole::Frame,
        }];
        primitives.extend(ctx.graph.paint_order().into_iter().map(|node| OverlayPrimitive::Rect {
            rect: layout.map_rect(&node.bounds()),
            role: OverlayRole::Node,
        }));
        primitives.push(OverlayPrimitive::Rect {
            rect: layout.map_rect(&ctx.viewport.visible_world()),
            role: OverlayRole::Viewport,
        });
        Some(Overlay {
            key: MINIMAP.to_string(),
            space: OverlaySpace::Screen,
            primitives,
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
