// SPDX-License-Identifier: MIT OR Apache-2.0
//! Drag-position snapping through pluggable delegates.

use crate::geometry::{Point, Rect, Size};
use serde::{Deserialize, Serialize};

/// Default grid cell in world units
pub const DEFAULT_GRID_SIZE: f32 = 20.0;

/// Input to a snap delegate
#[derive(Debug, Clone, Copy)]
pub struct SnapContext<'a> {
    /// Candidate top-left position of the dragged node
    pub position: Point,
    /// Size of the dragged node
    pub size: Size,
    /// Bounds of nearby nodes that are not being dragged
    pub others: &'a [Rect],
    /// Current viewport zoom
    pub zoom: f32,
}

impl SnapContext<'_> {
    fn candidate(&self) -> Rect {
        Rect::from_origin_size(self.position, self.size)
    }
}

/// Guide line to render while a snap is active (world units)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Guide {
    /// Line start
    pub from: Point,
    /// Line end
    pub to: Point,
}

/// Snapped position plus optional guides
#[derive(Debug, Clone, PartialEq)]
pub struct SnapResult {
    /// Adjusted top-left position
    pub position: Point,
    /// Guides explaining the snap
    pub guides: Vec<Guide>,
}

/// A snapping strategy
pub trait SnapDelegate {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Snap the candidate, or `None` when this delegate has nothing to say
    fn snap(&self, ctx: &SnapContext<'_>) -> Option<SnapResult>;
}

/// Rounds positions to a grid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSnap {
    /// Cell size in world units
    pub cell: f32,
}

impl GridSnap {
    /// Create a grid snap
    pub fn new(cell: f32) -> Self {
        Self { cell }
    }
}

impl SnapDelegate for GridSnap {
    fn name(&self) -> &'static str {
        "grid"
    }

    fn snap(&self, ctx: &SnapContext<'_>) -> Option<SnapResult> {
        if !(self.cell.is_finite() && self.cell > 0.0) || !ctx.position.is_finite() {
            return None;
        }
        let position = Point::new(
            (ctx.position.x / self.cell).round() * self.cell,
            (ctx.position.y / self.cell).round() * self.cell,
        );
        Some(SnapResult {
            position,
            guides: Vec::new(),
        })
    }
}

/// Matches edges and centers against neighbouring nodes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignmentSnap {
    /// Tolerance in screen pixels
    pub tolerance_px: f32,
}

impl AlignmentSnap {
    /// Create an alignment snap
    pub fn new(tolerance_px: f32) -> Self {
        Self { tolerance_px }
    }
}

/// Best correction on one axis: (delta, aligned coordinate, matching rect)
fn best_alignment(
    candidate: [f32; 3],
    others: &[Rect],
    tolerance: f32,
    axis: fn(&Rect) -> [f32; 3],
) -> Option<(f32, f32, Rect)> {
    let mut best: Option<(f32, f32, Rect)> = None;
    for other in others {
        for target in axis(other) {
            for value in candidate {
                let delta = target - value;
                if delta.abs() <= tolerance && best.map_or(true, |(d, _, _)| delta.abs() < d.abs()) {
                    best = Some((delta, target, *other));
                }
            }
        }
    }
    best
}

fn x_lines(r: &Rect) -> [f32; 3] {
    [r.min.x, r.center().x, r.max.x]
}

fn y_lines(r: &Rect) -> [f32; 3] {
    [r.min.y, r.center().y, r.max.y]
}

impl SnapDelegate for AlignmentSnap {
    fn name(&self) -> &'static str {
        "alignment"
    }

    fn snap(&self, ctx: &SnapContext<'_>) -> Option<SnapResult> {
        let zoom = if ctx.zoom.is_finite() && ctx.zoom > 0.0 { ctx.zoom } else { 1.0 };
        let tolerance = self.tolerance_px.max(0.0) / zoom;
        let candidate = ctx.candidate();

        let x = best_alignment(x_lines(&candidate), ctx.others, tolerance, x_lines);
        let y = best_alignment(y_lines(&candidate), ctx.others, tolerance, y_lines);
        if x.is_none() && y.is_none() {
            return None;
        }

        let mut position = ctx.position;
        let mut guides = Vec::new();
        if let Some((dx, line, other)) = x {
            position.x += dx;
            let moved = candidate.translate(Point::new(dx, 0.0));
            guides.push(Guide {
                from: Point::new(line, moved.min.y.min(other.min.y)),
                to: Point::new(line, moved.max.y.max(other.max.y)),
            });
        }
        if let Some((dy, line, other)) = y {
            position.y += dy;
            let moved = candidate.translate(Point::new(0.0, dy));
            guides.push(Guide {
                from: Point::new(moved.min.x.min(other.min.x), line),
                to: Point::new(moved.max.x.max(other.max.x), line),
            });
        }
        Some(SnapResult { position, guides })
    }
}

/// Serializable snap settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapConfig {
    /// Whether snapping starts enabled
    pub enabled: bool,
    /// Grid cell; `None` disables the grid delegate
    pub grid_size: Option<f32>,
    /// Alignment tolerance in pixels; `None` disables the alignment delegate
    pub alignment_tolerance_px: Option<f32>,
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            grid_size: Some(DEFAULT_GRID_SIZE),
            alignment_tolerance_px: None,
        }
    }
}

/// Ordered delegate chain with a runtime toggle
pub struct SnapEngine {
    delegates: Vec<Box<dyn SnapDelegate>>,
    enabled: bool,
}

impl SnapEngine {
    /// Empty, enabled engine
    pub fn new() -> Self {
        Self {
            delegates: Vec::new(),
            enabled: true,
        }
    }

    /// Build the chain from config; alignment runs before the grid
    pub fn from_config(config: &SnapConfig) -> Self {
        let mut engine = Self::new();
        if let Some(tolerance) = config.alignment_tolerance_px {
            engine.push(AlignmentSnap::new(tolerance));
        }
        if let Some(cell) = config.grid_size {
            engine.push(GridSnap::new(cell));
        }
        engine.enabled = config.enabled;
        engine
    }

    /// Append a delegate
    pub fn push(&mut self, delegate: impl SnapDelegate + 'static) {
        self.delegates.push(Box::new(delegate));
    }

    /// Drop every delegate
    pub fn clear(&mut self) {
        self.delegates.clear();
    }

    /// Delegate names in run order
    pub fn delegate_names(&self) -> Vec<&'static str> {
        self.delegates.iter().map(|d| d.name()).collect()
    }

    /// Enable or disable snapping without touching the chain
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Whether snapping is active
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// First delegate result, or `None` when disabled or nothing snapped
    pub fn snap(&self, ctx: &SnapContext<'_>) -> Option<SnapResult> {
        if !self.enabled {
            return None;
        }
        self.delegates.iter().find_map(|delegate| {
            let result = delegate.snap(ctx)?;
            tracing::trace!(delegate = delegate.name(), position = ?result.position, "snapped");
            Some(result)
        })
    }
}

impl Default for SnapEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SnapEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapEngine")
            .field("delegates", &self.delegate_names())
            .field("enabled", &self.enabled)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(position: Point, others: &[Rect]) -> SnapContext<'_> {
        SnapContext {
            position,
            size: Size::new(100.0, 50.0),
            others,
            zoom: 1.0,
        }
    }

    #[test]
    fn test_grid_rounds_to_nearest_cell() {
        let grid = GridSnap::new(20.0);
        let result = grid.snap(&ctx(Point::new(117.0, 103.0), &[])).unwrap();
        assert_eq!(result.position, Point::new(120.0, 100.0));
    }

    #[test]
    fn test_alignment_matches_left_edge() {
        let others = [Rect::from_origin_size(Point::new(200.0, 0.0), Size::new(80.0, 40.0))];
        let align = AlignmentSnap::new(6.0);
        let result = align.snap(&ctx(Point::new(203.0, 300.0), &others)).unwrap();
        assert_eq!(result.position, Point::new(200.0, 300.0));
        assert_eq!(result.guides.len(), 1);
        assert_eq!(result.guides[0].from.x, 200.0);
    }

    #[test]
    fn test_alignment_tolerance_scales_with_zoom() {
        let others = [Rect::from_origin_size(Point::new(200.0, 0.0), Size::new(80.0, 40.0))];
        let align = AlignmentSnap::new(6.0);
        let mut zoomed = ctx(Point::new(203.0, 300.0), &others);
        zoomed.zoom = 4.0;
        assert!(align.snap(&zoomed).is_none());
    }

    #[test]
    fn test_first_delegate_wins_and_toggle() {
        let others = [Rect::from_origin_size(Point::new(203.0, 0.0), Size::new(80.0, 40.0))];
        let mut engine = SnapEngine::from_config(&SnapConfig {
            enabled: true,
            grid_size: Some(20.0),
            alignment_tolerance_px: Some(6.0),
        });
        assert_eq!(engine.delegate_names(), vec!["alignment", "grid"]);

        let result = engine.snap(&ctx(Point::new(201.0, 300.0), &others)).unwrap();
        assert_eq!(result.position.x, 203.0);

        let result = engine.snap(&ctx(Point::new(501.0, 300.0), &others)).unwrap();
        assert_eq!(result.position, Point::new(500.0, 300.0));

        engine.set_enabled(false);
        assert!(engine.snap(&ctx(Point::new(501.0, 300.0), &others)).is_none());
        assert_eq!(engine.delegate_names().len(), 2);
    }
}
