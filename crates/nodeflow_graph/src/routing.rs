// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection routing.
//!
//! The router is a pure function of the two anchors, the zoom and the link
//! style. Every [`RoutedPath`] carries an arc-length table so renderers can
//! sample position and tangent at a normalized offset along the link.

use crate::connection::Connection;
use crate::geometry::{distance_to_segment_sq, Point, Rect, EPSILON};
use crate::graph::Graph;
use crate::node::Anchor;
use crate::port::PortSide;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Link path family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStyle {
    /// Direct line segment
    Straight,
    /// Orthogonal route with optional corner radius
    Step,
    /// Orthogonal route with rounded corners
    SmoothStep,
    /// Cubic curve
    #[default]
    Bezier,
}

/// Router tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Length of the straight stub leaving each port (world units)
    pub step_offset: f32,
    /// Corner radius of `step` links; 0 keeps sharp corners
    pub step_corner_radius: f32,
    /// Corner radius of `smooth_step` links, never below 1
    pub smooth_corner_radius: f32,
    /// Control point distance as a fraction of the endpoint distance
    pub bezier_curvature: f32,
    /// Minimum control point distance in screen pixels
    pub bezier_min_offset: f32,
    /// Maximum control point distance in screen pixels
    pub bezier_max_offset: f32,
    /// Flattening steps per curved segment
    pub curve_samples: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            step_offset: 20.0,
            step_corner_radius: 0.0,
            smooth_corner_radius: 8.0,
            bezier_curvature: 0.5,
            bezier_min_offset: 50.0,
            bezier_max_offset: 400.0,
            curve_samples: 24,
        }
    }
}

/// One drawable piece of a routed path
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathSegment {
    /// Straight line
    Line {
        /// Start
        from: Point,
        /// End
        to: Point,
    },
    /// Quadratic curve (rounded corners)
    Quad {
        /// Start
        from: Point,
        /// Control point
        ctrl: Point,
        /// End
        to: Point,
    },
    /// Cubic curve
    Cubic {
        /// Start
        from: Point,
        /// First control point
        c1: Point,
        /// Second control point
        c2: Point,
        /// End
        to: Point,
    },
}

impl PathSegment {
    /// First point
    pub fn start(&self) -> Point {
        match *self {
            Self::Line { from, .. } | Self::Quad { from, .. } | Self::Cubic { from, .. } => from,
        }
    }

    /// Last point
    pub fn end(&self) -> Point {
        match *self {
            Self::Line { to, .. } | Self::Quad { to, .. } | Self::Cubic { to, .. } => to,
        }
    }

    /// Point at curve parameter `t`
    pub fn point(&self, t: f32) -> Point {
        match *self {
            Self::Line { from, to } => from.lerp(to, t),
            Self::Quad { from, ctrl, to } => {
                let mt = 1.0 - t;
                from * (mt * mt) + ctrl * (2.0 * mt * t) + to * (t * t)
            }
            Self::Cubic { from, c1, c2, to } => {
                let mt = 1.0 - t;
                from * (mt * mt * mt) + c1 * (3.0 * mt * mt * t) + c2 * (3.0 * mt * t * t) + to * (t * t * t)
            }
        }
    }

    /// Derivative at curve parameter `t`
    pub fn derivative(&self, t: f32) -> Point {
        match *self {
            Self::Line { from, to } => to - from,
            Self::Quad { from, ctrl, to } => (ctrl - from) * (2.0 * (1.0 - t)) + (to - ctrl) * (2.0 * t),
            Self::Cubic { from, c1, c2, to } => {
                let mt = 1.0 - t;
                (c1 - from) * (3.0 * mt * mt) + (c2 - c1) * (6.0 * mt * t) + (to - c2) * (3.0 * t * t)
            }
        }
    }

    fn is_curved(&self) -> bool {
        !matches!(self, Self::Line { .. })
    }
}

/// Position and unit tangent at an arc-length offset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathSample {
    /// Point on the path
    pub position: Point,
    /// Unit direction of travel
    pub tangent: Point,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ArcStop {
    len: f32,
    segment: usize,
    t: f32,
    point: Point,
}

/// Geometry of one link
#[derive(Debug, Clone, PartialEq)]
pub struct RoutedPath {
    style: LinkStyle,
    segments: Vec<PathSegment>,
    stops: Vec<ArcStop>,
    length: f32,
    start_dir: Point,
}

impl RoutedPath {
    fn build(style: LinkStyle, segments: Vec<PathSegment>, start_dir: Point, curve_samples: usize) -> Self {
        let mut stops = Vec::new();
        let mut length = 0.0_f32;
        for (index, segment) in segments.iter().enumerate() {
            let steps = if segment.is_curved() { curve_samples.max(2) } else { 1 };
            let mut prev = segment.start();
            stops.push(ArcStop {
                len: length,
                segment: index,
                t: 0.0,
                point: prev,
            });
            for step in 1..=steps {
                let t = step as f32 / steps as f32;
                let point = segment.point(t);
                length += prev.distance(point);
                stops.push(ArcStop {
                    len: length,
                    segment: index,
                    t,
                    point,
                });
                prev = point;
            }
        }
        Self {
            style,
            segments,
            stops,
            length,
            start_dir,
        }
    }

    /// Style actually used (degenerate input falls back to straight)
    pub fn style(&self) -> LinkStyle {
        self.style
    }

    /// Drawable segments in order
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Total arc length
    pub fn length(&self) -> f32 {
        self.length
    }

    /// First point
    pub fn start(&self) -> Point {
        self.segments.first().map_or(Point::ZERO, PathSegment::start)
    }

    /// Last point
    pub fn end(&self) -> Point {
        self.segments.last().map_or(Point::ZERO, PathSegment::end)
    }

    /// Bounds of the flattened path
    pub fn bounds(&self) -> Rect {
        Rect::bounding(self.stops.iter().map(|s| s.point)).unwrap_or_else(|| Rect::from_point(self.start()))
    }

    /// Position and tangent at normalized arc length `t` (clamped to `[0, 1]`)
    pub fn sample(&self, t: f32) -> PathSample {
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        if self.length <= EPSILON || self.stops.is_empty() {
            return PathSample {
                position: self.start(),
                tangent: self.start_dir,
            };
        }

        let target = t * self.length;
        let index = self.stops.partition_point(|s| s.len < target);
        let (segment, local, chord) = if index == 0 {
            let first = self.stops[0];
            (first.segment, first.t, None)
        } else {
            let hi = self.stops[index.min(self.stops.len() - 1)];
            let lo = self.stops[index - 1];
            if lo.segment == hi.segment {
                let span = hi.len - lo.len;
                let frac = if span > f32::EPSILON { (target - lo.len) / span } else { 1.0 };
                (hi.segment, lo.t + (hi.t - lo.t) * frac, Some(hi.point - lo.point))
            } else {
                (hi.segment, hi.t, None)
            }
        };

        let Some(seg) = self.segments.get(segment) else {
            return PathSample {
                position: self.end(),
                tangent: self.start_dir,
            };
        };
        let tangent = seg
            .derivative(local)
            .normalized()
            .or_else(|| chord.and_then(Point::normalized))
            .unwrap_or(self.start_dir);
        PathSample {
            position: seg.point(local),
            tangent,
        }
    }

    /// Distance from `p` to the flattened path
    pub fn distance_to(&self, p: Point) -> f32 {
        match self.stops.as_slice() {
            [] => f32::INFINITY,
            [only] => only.point.distance(p),
            stops => stops
                .windows(2)
                .map(|w| distance_to_segment_sq(p, w[0].point, w[1].point))
                .fold(f32::INFINITY, f32::min)
                .sqrt(),
        }
    }

    /// SVG path data (`M`, `L`, `Q`, `C` commands)
    pub fn to_svg(&self) -> String {
        let mut out = String::new();
        let start = self.start();
        let _ = write!(out, "M {} {}", start.x, start.y);
        for segment in &self.segments {
            let _ = match *segment {
                PathSegment::Line { to, .. } => write!(out, " L {} {}", to.x, to.y),
                PathSegment::Quad { ctrl, to, .. } => write!(out, " Q {} {} {} {}", ctrl.x, ctrl.y, to.x, to.y),
                PathSegment::Cubic { c1, c2, to, .. } => {
                    write!(out, " C {} {} {} {} {} {}", c1.x, c1.y, c2.x, c2.y, to.x, to.y)
                }
            };
        }
        out
    }
}

/// Computes link geometry
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Router {
    /// Tuning
    pub config: RouterConfig,
}

impl Router {
    /// Create a router
    pub fn new(config: RouterConfig) -> Self {
        Self { config }
    }

    /// Route between two anchors
    pub fn route(&self, style: LinkStyle, from: Anchor, to: Anchor, zoom: f32) -> RoutedPath {
        let (s, t) = (from.point, to.point);
        let ds = from.side.direction();
        let dt = to.side.direction();
        let zoom = if zoom.is_finite() && zoom > EPSILON { zoom } else { 1.0 };

        if !s.is_finite() || !t.is_finite() || s.approx_eq(t) {
            return self.straight(s, t, ds);
        }

        match style {
            LinkStyle::Straight => self.straight(s, t, ds),
            LinkStyle::Step => {
                let points = step_points(s, from.side, t, to.side, self.config.step_offset.max(1.0));
                let segments = round_corners(&points, self.config.step_corner_radius.max(0.0));
                RoutedPath::build(LinkStyle::Step, segments, ds, self.config.curve_samples)
            }
            LinkStyle::SmoothStep => {
                let points = step_points(s, from.side, t, to.side, self.config.step_offset.max(1.0));
                let segments = round_corners(&points, self.config.smooth_corner_radius.max(1.0));
                RoutedPath::build(LinkStyle::SmoothStep, segments, ds, self.config.curve_samples)
            }
            LinkStyle::Bezier => {
                let distance = s.distance(t);
                let lo = self.config.bezier_min_offset.max(0.0) / zoom;
                let hi = (self.config.bezier_max_offset / zoom).max(lo);
                let offset = (distance * self.config.bezier_curvature)
                    .clamp(lo, hi)
                    .min(distance)
                    .max(distance.min(1.0));
                let segment = PathSegment::Cubic {
                    from: s,
                    c1: s + ds * offset,
                    c2: t + dt * offset,
                    to: t,
                };
                RoutedPath::build(LinkStyle::Bezier, vec![segment], ds, self.config.curve_samples)
            }
        }
    }

    /// Route a temporary link from a port to a free cursor position
    pub fn route_to_cursor(&self, style: LinkStyle, from: Anchor, cursor: Point, zoom: f32) -> RoutedPath {
        let to = Anchor {
            point: cursor,
            side: from.side.opposite(),
        };
        self.route(style, from, to, zoom)
    }

    /// Route a stored connection; `None` when an endpoint does not resolve
    pub fn route_connection(
        &self,
        graph: &Graph,
        connection: &Connection,
        default_style: LinkStyle,
        port_outset: f32,
        zoom: f32,
    ) -> Option<RoutedPath> {
        let from = graph.anchor(&connection.source, port_outset)?;
        let to = graph.anchor(&connection.target, port_outset)?;
        Some(self.route(connection.style.unwrap_or(default_style), from, to, zoom))
    }

    fn straight(&self, s: Point, t: Point, ds: Point) -> RoutedPath {
        RoutedPath::build(
            LinkStyle::Straight,
            vec![PathSegment::Line { from: s, to: t }],
            ds,
            self.config.curve_samples,
        )
    }
}

fn swap(p: Point) -> Point {
    Point::new(p.y, p.x)
}

/// Shortest straight run kept at either end of an orthogonal route
const MIN_STUB: f32 = 1.0;

/// Orthogonal polyline from `s` to `t`, stubs included, simplified
fn step_points(s: Point, s_side: PortSide, t: Point, t_side: PortSide, offset: f32) -> Vec<Point> {
    let vertical_source = !s_side.is_horizontal();
    let frame = |p: Point| if vertical_source { swap(p) } else { p };

    let (fs, ft) = (frame(s), frame(t));
    let (ds, dt) = (frame(s_side.direction()), frame(t_side.direction()));
    let inner = if s_side.is_horizontal() == t_side.is_horizontal() {
        parallel_route(fs, ds, ft, dt, offset)
    } else {
        crossing_route(fs, ds, ft, dt, offset)
    };

    let mut points = Vec::with_capacity(inner.len() + 2);
    points.push(s);
    points.extend(inner.into_iter().map(frame));
    points.push(t);
    simplify(points)
}

/// Both ports on horizontal sides (in the local frame)
fn parallel_route(s: Point, ds: Point, t: Point, dt: Point, offset: f32) -> Vec<Point> {
    let a = s + ds * offset;
    let b = t + dt * offset;
    let same_direction = (ds.x - dt.x).abs() < EPSILON;

    if same_direction {
        let x = if ds.x > 0.0 { a.x.max(b.x) } else { a.x.min(b.x) };
        return vec![Point::new(x, s.y), Point::new(x, t.y)];
    }

    let facing = (t.x - s.x) * ds.x >= 2.0 * MIN_STUB;
    if facing {
        let mid = (s.x + t.x) / 2.0;
        return vec![Point::new(mid, s.y), Point::new(mid, t.y)];
    }

    let mid_y = if (s.y - t.y).abs() >= 2.0 * offset {
        (s.y + t.y) / 2.0
    } else {
        s.y.max(t.y) + 2.0 * offset
    };
    vec![a, Point::new(a.x, mid_y), Point::new(b.x, mid_y), b]
}

/// Source on a horizontal side, target on a vertical one (in the local frame)
fn crossing_route(s: Point, ds: Point, t: Point, dt: Point, offset: f32) -> Vec<Point> {
    let corner = Point::new(t.x, s.y);
    if (corner - s).dot(ds) >= MIN_STUB && (corner - t).dot(dt) >= MIN_STUB {
        return vec![corner];
    }
    let a = s + ds * offset;
    let b = t + dt * offset;
    vec![a, Point::new(a.x, b.y), b]
}

/// Drop duplicate points and points in the middle of a straight run
fn simplify(points: Vec<Point>) -> Vec<Point> {
    let mut out: Vec<Point> = Vec::with_capacity(points.len());
    for p in points {
        if out.last().is_some_and(|last| last.approx_eq(p)) {
            continue;
        }
        if let [.., before, last] = out.as_slice() {
            let d1 = *last - *before;
            let d2 = p - *last;
            let cross = d1.x * d2.y - d1.y * d2.x;
            if cross.abs() <= EPSILON && d1.dot(d2) > 0.0 {
                out.pop();
            }
        }
        out.push(p);
    }
    out
}

/// Turn a polyline into segments, rounding interior corners with quadratic curves
fn round_corners(points: &[Point], radius: f32) -> Vec<PathSegment> {
    let mut segments = Vec::with_capacity(points.len() * 2);
    let Some(&first) = points.first() else {
        return segments;
    };
    let mut cursor = first;
    for window in points.windows(3) {
        let (prev, vertex, next) = (window[0], window[1], window[2]);
        let len_in = prev.distance(vertex);
        let len_out = vertex.distance(next);
        let r = radius.min(len_in / 2.0).min(len_out / 2.0);
        let dirs = (vertex - prev).normalized().zip((next - vertex).normalized());
        match dirs {
            Some((d_in, d_out)) if r > EPSILON => {
                let enter = vertex - d_in * r;
                let exit = vertex + d_out * r;
                if !cursor.approx_eq(enter) {
                    segments.push(PathSegment::Line { from: cursor, to: enter });
                }
                segments.push(PathSegment::Quad {
                    from: enter,
                    ctrl: vertex,
                    to: exit,
                });
                cursor = exit;
            }
            _ => {
                segments.push(PathSegment::Line { from: cursor, to: vertex });
                cursor = vertex;
            }
        }
    }
    if let Some(&last) = points.last() {
        if !cursor.approx_eq(last) || segments.is_empty() {
            segments.push(PathSegment::Line { from: cursor, to: last });
        }
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchor(x: f32, y: f32, side: PortSide) -> Anchor {
        Anchor {
            point: Point::new(x, y),
            side,
        }
    }

    const ALL: [LinkStyle; 4] = [LinkStyle::Straight, LinkStyle::Step, LinkStyle::SmoothStep, LinkStyle::Bezier];

    #[test]
    fn test_endpoints_match_anchors() {
        let router = Router::default();
        let from = anchor(10.0, 20.0, PortSide::Right);
        let to = anchor(300.0, 140.0, PortSide::Left);
        for style in ALL {
            let path = router.route(style, from, to, 1.0);
            assert!(path.sample(0.0).position.approx_eq(from.point), "{style:?}");
            assert!(path.sample(1.0).position.approx_eq(to.point), "{style:?}");
        }
    }

    #[test]
    fn test_end_tangents_follow_port_sides() {
        let router = Router::default();
        let from = anchor(0.0, 0.0, PortSide::Right);
        let to = anchor(-200.0, 80.0, PortSide::Top);
        for style in [LinkStyle::Step, LinkStyle::SmoothStep, LinkStyle::Bezier] {
            let path = router.route(style, from, to, 1.0);
            let start = path.sample(0.0).tangent;
            let end = path.sample(1.0).tangent;
            assert!(start.approx_eq(PortSide::Right.direction()), "{style:?} start {start:?}");
            assert!((-end).approx_eq(PortSide::Top.direction()), "{style:?} end {end:?}");
        }
    }

    #[test]
    fn test_facing_ports_route_through_middle() {
        let points = step_points(
            Point::new(0.0, 0.0),
            PortSide::Right,
            Point::new(100.0, 50.0),
            PortSide::Left,
            20.0,
        );
        assert_eq!(
            points,
            vec![
                Point::new(0.0, 0.0),
                Point::new(50.0, 0.0),
                Point::new(50.0, 50.0),
                Point::new(100.0, 50.0),
            ]
        );
    }

    #[test]
    fn test_aligned_facing_ports_are_a_single_line() {
        let router = Router::default();
        let path = router.route(
            LinkStyle::SmoothStep,
            anchor(0.0, 0.0, PortSide::Right),
            anchor(100.0, 0.0, PortSide::Left),
            1.0,
        );
        assert_eq!(path.segments().len(), 1);
        assert!((path.length() - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_nearly_touching_facing_ports_keep_their_stubs() {
        let router = Router::default();
        let from = anchor(0.0, 0.0, PortSide::Right);
        let to = anchor(0.00015, 100.0, PortSide::Left);
        for style in [LinkStyle::Step, LinkStyle::SmoothStep] {
            let path = router.route(style, from, to, 1.0);
            let start = path.sample(0.0).tangent;
            let end = path.sample(1.0).tangent;
            assert!(start.approx_eq(Point::new(1.0, 0.0)), "{style:?} start {start:?}");
            assert!(end.approx_eq(Point::new(1.0, 0.0)), "{style:?} end {end:?}");
        }
    }

    #[test]
    fn test_corner_too_close_to_port_takes_the_detour() {
        let points = step_points(
            Point::new(0.0, 0.0),
            PortSide::Right,
            Point::new(0.5, 100.0),
            PortSide::Top,
            20.0,
        );
        assert_eq!(points[1], Point::new(20.0, 0.0));
        assert_eq!(points[points.len() - 2], Point::new(0.5, 80.0));
    }

    #[test]
    fn test_smoothstep_tangent_is_continuous() {
        let router = Router::default();
        let path = router.route(
            LinkStyle::SmoothStep,
            anchor(0.0, 0.0, PortSide::Right),
            anchor(200.0, 120.0, PortSide::Left),
            1.0,
        );
        let mut prev = path.sample(0.0).tangent;
        for i in 1..=400 {
            let tangent = path.sample(i as f32 / 400.0).tangent;
            assert!(prev.dot(tangent) > 0.9, "tangent jump at step {i}");
            prev = tangent;
        }
    }

    #[test]
    fn test_bezier_offset_is_clamped_by_distance() {
        let router = Router::default();
        let path = router.route(
            LinkStyle::Bezier,
            anchor(0.0, 0.0, PortSide::Right),
            anchor(10.0, 0.0, PortSide::Left),
            1.0,
        );
        match path.segments()[0] {
            PathSegment::Cubic { c1, .. } => assert!((c1.x - 10.0).abs() < 1e-4),
            other => panic!("unexpected segment {other:?}"),
        }
    }

    #[test]
    fn test_degenerate_input_falls_back_to_straight() {
        let router = Router::default();
        let p = anchor(5.0, 5.0, PortSide::Right);
        let path = router.route(LinkStyle::Bezier, p, anchor(5.0, 5.0, PortSide::Left), 1.0);
        assert_eq!(path.style(), LinkStyle::Straight);
        let sample = path.sample(0.5);
        assert!(sample.position.is_finite());
        assert!(sample.tangent.approx_eq(PortSide::Right.direction()));

        let nan = router.route(LinkStyle::Step, p, anchor(f32::NAN, 0.0, PortSide::Left), 0.0);
        assert_eq!(nan.style(), LinkStyle::Straight);
    }

    #[test]
    fn test_distance_and_svg() {
        let router = Router::default();
        let path = router.route(
            LinkStyle::Straight,
            anchor(0.0, 0.0, PortSide::Right),
            anchor(100.0, 0.0, PortSide::Left),
            1.0,
        );
        assert!((path.distance_to(Point::new(50.0, 3.0)) - 3.0).abs() < 1e-4);
        assert_eq!(path.to_svg(), "M 0 0 L 100 0");
    }
}
