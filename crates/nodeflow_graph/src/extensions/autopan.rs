// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scrolls the canvas while a gesture cursor sits near its edge.

use super::AUTOPAN;
use crate::extension::{parse_options, Extension, ExtensionContext, ExtensionEffect, GestureEvent, GestureKind};
use crate::geometry::Point;
use serde::{Deserialize, Serialize};
use std::any::Any;

/// Edge band and speed, in screen pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutopanOptions {
    /// Width of the active band along each canvas edge
    pub margin: f32,
    /// Pan speed at the very edge, per second
    pub speed: f32,
}

impl Default for AutopanOptions {
    fn default() -> Self {
        Self {
            margin: 40.0,
            speed: 600.0,
        }
    }
}

/// Autopan extension
#[derive(Debug, Clone, Default)]
pub struct Autopan {
    options: AutopanOptions,
    cursor: Option<Point>,
}

impl Autopan {
    /// Build from registry options
    pub fn from_options(options: &serde_json::Value) -> Self {
        Self {
            options: parse_options(AUTOPAN, options),
            cursor: None,
        }
    }

    /// Whether a gesture is being tracked
    pub fn is_active(&self) -> bool {
        self.cursor.is_some()
    }

    /// Screen-space pan velocity (px/s) for a cursor on a canvas of `width` x `height`
    pub fn velocity(&self, cursor: Point, width: f32, height: f32) -> Point {
        let margin = self.options.margin;
        if margin <= 0.0 || !cursor.is_finite() {
            return Point::ZERO;
        }
        let axis = |pos: f32, extent: f32| -> f32 {
            let near_start = margin - pos;
            let near_end = pos - (extent - margin);
            if near_start > 0.0 {
                self.options.speed * (near_start / margin).min(1.0)
            } else if near_end > 0.0 {
                -self.options.speed * (near_end / margin).min(1.0)
            } else {
                0.0
            }
        };
        Point::new(axis(cursor.x, width), axis(cursor.y, height))
    }
}

fn follows(kind: GestureKind) -> bool {
    !matches!(kind, GestureKind::Pan)
}

impl Extension for Autopan {
    fn key(&self) -> &str {
        AUTOPAN
    }

    fn on_gesture(&mut self, event: &GestureEvent, _ctx: &ExtensionContext<'_>) -> Vec<ExtensionEffect> {
        match *event {
            GestureEvent::Started { kind, cursor } | GestureEvent::Moved { kind, cursor } if follows(kind) => {
                self.cursor = Some(cursor);
            }
            GestureEvent::Ended { .. } => self.cursor = None,
            _ => {}
        }
        Vec::new()
    }

    fn on_frame(&mut self, dt: f32, ctx: &ExtensionContext<'_>) -> Vec<ExtensionEffect> {
        let Some(cursor) = self.cursor else {
            return Vec::new();
        };
        if !(dt.is_finite() && dt > 0.0) {
            return Vec::new();
        }
        let velocity = self.velocity(cursor, ctx.viewport.canvas.w, ctx.viewport.canvas.h);
        if velocity == Point::ZERO {
            return Vec::new();
        }
        vec![ExtensionEffect::PanViewport(velocity * dt)]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::spatial::SpatialIndex;
    use crate::viewport::Viewport;

    fn frame(autopan: &mut Autopan, dt: f32) -> Vec<ExtensionEffect> {
        let graph = Graph::default();
        let viewport = Viewport::default();
        let spatial = SpatialIndex::default();
        let ctx = ExtensionContext {
            graph: &graph,
            viewport: &viewport,
            spatial: &spatial,
        };
        autopan.on_frame(dt, &ctx)
    }

    fn gesture(autopan: &mut Autopan, event: GestureEvent) {
        let graph = Graph::default();
        let viewport = Viewport::default();
        let spatial = SpatialIndex::default();
        let ctx = ExtensionContext {
            graph: &graph,
            viewport: &viewport,
            spatial: &spatial,
        };
        autopan.on_gesture(&event, &ctx);
    }

    #[test]
    fn test_pans_near_right_edge_every_frame() {
        let mut autopan = Autopan::default();
        gesture(
            &mut autopan,
            GestureEvent::Started {
                kind: GestureKind::DragNodes,
                cursor: Point::new(1270.0, 300.0),
            },
        );
        for _ in 0..3 {
            let effects = frame(&mut autopan, 0.5);
            match effects.as_slice() {
                [ExtensionEffect::PanViewport(delta)] => {
                    assert!(delta.x < 0.0);
                    assert_eq!(delta.y, 0.0);
                }
                other => panic!("unexpected effects: {other:?}"),
            }
        }
    }

    #[test]
    fn test_idle_in_center_and_after_end() {
        let mut autopan = Autopan::default();
        gesture(
            &mut autopan,
            GestureEvent::Moved {
                kind: GestureKind::Connect,
                cursor: Point::new(600.0, 300.0),
            },
        );
        assert!(frame(&mut autopan, 0.016).is_empty());

        gesture(
            &mut autopan,
            GestureEvent::Moved {
                kind: GestureKind::Connect,
                cursor: Point::new(5.0, 5.0),
            },
        );
        assert_eq!(frame(&mut autopan, 0.016).len(), 1);

        gesture(
            &mut autopan,
            GestureEvent::Ended {
                kind: GestureKind::Connect,
                committed: false,
            },
        );
        assert!(!autopan.is_active());
        assert!(frame(&mut autopan, 0.016).is_empty());
    }

    #[test]
    fn test_velocity_scales_with_depth() {
        let autopan = Autopan::default();
        let shallow = autopan.velocity(Point::new(30.0, 300.0), 1280.0, 720.0);
        let deep = autopan.velocity(Point::new(0.0, 300.0), 1280.0, 720.0);
        assert!(shallow.x > 0.0 && deep.x > shallow.x);
        assert_eq!(deep.x, 600.0);
    }
}
