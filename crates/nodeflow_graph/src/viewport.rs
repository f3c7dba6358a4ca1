// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pan/zoom state and the screen <-> world transform.
//!
//! `screen = world * zoom + pan`, with `pan` in screen pixels.

use crate::geometry::{Point, Rect, Size};
use serde::{Deserialize, Serialize};

/// Default zoom clamp bounds
pub const DEFAULT_MIN_ZOOM: f32 = 0.1;
/// Default zoom clamp bounds
pub const DEFAULT_MAX_ZOOM: f32 = 4.0;

/// Canvas camera
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Screen offset of the world origin
    pub pan: Point,
    /// Scale factor (screen px per world unit)
    pub zoom: f32,
    /// Lower zoom bound
    pub min_zoom: f32,
    /// Upper zoom bound
    pub max_zoom: f32,
    /// Size of the canvas widget in screen pixels
    pub canvas: Size,
}

impl Viewport {
    /// Identity viewport with the given zoom bounds
    pub fn new(min_zoom: f32, max_zoom: f32) -> Self {
        Self {
            pan: Point::ZERO,
            zoom: 1.0_f32.clamp(min_zoom, max_zoom),
            min_zoom,
            max_zoom,
            canvas: Size::new(1280.0, 720.0),
        }
    }

    /// Convert a screen position to world units
    pub fn screen_to_world(&self, screen: Point) -> Point {
        Point::new((screen.x - self.pan.x) / self.zoom, (screen.y - self.pan.y) / self.zoom)
    }

    /// Convert a world position to screen pixels
    pub fn world_to_screen(&self, world: Point) -> Point {
        Point::new(world.x * self.zoom + self.pan.x, world.y * self.zoom + self.pan.y)
    }

    /// Convert a screen-space length to world units
    pub fn screen_len_to_world(&self, len: f32) -> f32 {
        len / self.zoom
    }

    /// World rectangle currently visible on the canvas
    pub fn visible_world(&self) -> Rect {
        Rect::from_points(
            self.screen_to_world(Point::ZERO),
            self.screen_to_world(Point::new(self.canvas.w, self.canvas.h)),
        )
    }

    /// Translate by a screen-space delta
    pub fn pan_by(&mut self, delta: Point) {
        if delta.is_finite() {
            self.pan = self.pan + delta;
        }
    }

    /// Set the zoom, clamped, keeping the world point under `screen_anchor` fixed.
    ///
    /// Returns whether the viewport changed.
    pub fn zoom_at(&mut self, screen_anchor: Point, zoom: f32) -> bool {
        if !zoom.is_finite() || !screen_anchor.is_finite() {
            return false;
        }
        let zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        if (zoom - self.zoom).abs() <= f32::EPSILON {
            return false;
        }
        let world = self.screen_to_world(screen_anchor);
        self.zoom = zoom;
        self.pan = screen_anchor - world * zoom;
        true
    }

    /// Multiply the zoom around a screen point
    pub fn zoom_by(&mut self, screen_anchor: Point, factor: f32) -> bool {
        self.zoom_at(screen_anchor, self.zoom * factor)
    }

    /// Re-clamp after the bounds change
    pub fn set_zoom_bounds(&mut self, min_zoom: f32, max_zoom: f32) {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self.zoom = self.zoom.clamp(min_zoom, max_zoom);
    }

    /// Center and scale so that `world` fits the canvas with a screen margin
    pub fn fit(&mut self, world: Rect, margin: f32) {
        let avail_w = (self.canvas.w - 2.0 * margin).max(1.0);
        let avail_h = (self.canvas.h - 2.0 * margin).max(1.0);
        let zoom = (avail_w / world.width().max(1.0)).min(avail_h / world.height().max(1.0));
        self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        let center = world.center();
        self.pan = Point::new(self.canvas.w / 2.0, self.canvas.h / 2.0) - center * self.zoom;
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_ZOOM, DEFAULT_MAX_ZOOM)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_transform() {
        let mut viewport = Viewport::default();
        viewport.pan = Point::new(40.0, -10.0);
        viewport.zoom = 2.0;
        let world = Point::new(12.5, 7.0);
        let back = viewport.screen_to_world(viewport.world_to_screen(world));
        assert!(back.approx_eq(world));
    }

    #[test]
    fn test_zoom_at_keeps_anchor() {
        let mut viewport = Viewport::default();
        let anchor = Point::new(300.0, 200.0);
        let before = viewport.screen_to_world(anchor);
        assert!(viewport.zoom_at(anchor, 2.0));
        assert!(viewport.screen_to_world(anchor).approx_eq(before));
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut viewport = Viewport::new(0.5, 2.0);
        viewport.zoom_at(Point::ZERO, 10.0);
        assert_eq!(viewport.zoom, 2.0);
        viewport.zoom_at(Point::ZERO, 0.01);
        assert_eq!(viewport.zoom, 0.5);
        assert!(!viewport.zoom_at(Point::ZERO, f32::NAN));
    }
}
