// SPDX-License-Identifier: MIT OR Apache-2.0
//! World/screen geometry primitives shared by every engine component.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Neg, Sub};

/// Values closer than this are treated as equal by the geometry helpers.
pub const EPSILON: f32 = 1e-4;

/// A 2D point (or vector) in world or screen units
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate
    pub x: f32,
    /// Vertical coordinate (grows downwards)
    pub y: f32,
}

impl Point {
    /// The origin
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Create a new point
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean length when used as a vector
    pub fn length(self) -> f32 {
        self.x.hypot(self.y)
    }

    /// Distance to another point
    pub fn distance(self, other: Point) -> f32 {
        (other - self).length()
    }

    /// Dot product
    pub fn dot(self, other: Point) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Unit vector in the same direction, or `None` for a (near) zero vector
    pub fn normalized(self) -> Option<Point> {
        let len = self.length();
        if len.is_finite() && len > EPSILON {
            Some(Point::new(self.x / len, self.y / len))
        } else {
            None
        }
    }

    /// Linear interpolation towards `other`
    pub fn lerp(self, other: Point, t: f32) -> Point {
        Point::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }

    /// Whether both coordinates are finite
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Approximate equality within [`EPSILON`]
    pub fn approx_eq(self, other: Point) -> bool {
        (self.x - other.x).abs() <= EPSILON && (self.y - other.y).abs() <= EPSILON
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Point {
    type Output = Point;

    fn mul(self, rhs: f32) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Point {
    type Output = Point;

    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

/// Width and height of a node or canvas
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    /// Width
    pub w: f32,
    /// Height
    pub h: f32,
}

impl Size {
    /// Create a new size
    pub const fn new(w: f32, h: f32) -> Self {
        Self { w, h }
    }

    /// Whether both extents are finite and non-negative
    pub fn is_valid(self) -> bool {
        self.w.is_finite() && self.h.is_finite() && self.w >= 0.0 && self.h >= 0.0
    }
}

/// Axis-aligned rectangle.
///
/// Invariant: `min` components are less than or equal to `max` components.
/// Every constructor normalizes its corners so the invariant always holds.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Top-left corner
    pub min: Point,
    /// Bottom-right corner
    pub max: Point,
}

impl Rect {
    /// Build a rectangle from two arbitrary corners
    pub fn from_points(a: Point, b: Point) -> Self {
        Self {
            min: Point::new(a.x.min(b.x), a.y.min(b.y)),
            max: Point::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// Build a rectangle from its top-left corner and size
    pub fn from_origin_size(origin: Point, size: Size) -> Self {
        Self::from_points(origin, Point::new(origin.x + size.w, origin.y + size.h))
    }

    /// Degenerate rectangle covering one point
    pub fn from_point(p: Point) -> Self {
        Self { min: p, max: p }
    }

    /// Smallest rectangle containing every point, `None` when empty
    pub fn bounding<I: IntoIterator<Item = Point>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        Some(iter.fold(Rect::from_point(first), |acc, p| acc.include(p)))
    }

    /// Width
    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    /// Height
    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    /// Size of the rectangle
    pub fn size(&self) -> Size {
        Size::new(self.width(), self.height())
    }

    /// Center point
    pub fn center(&self) -> Point {
        self.min.lerp(self.max, 0.5)
    }

    /// Inclusive point containment
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// Whether `other` lies fully inside this rectangle
    pub fn contains_rect(&self, other: &Rect) -> bool {
        self.contains(other.min) && self.contains(other.max)
    }

    /// Inclusive overlap test (touching edges count as overlap)
    pub fn intersects(&self, other: &Rect) -> bool {
        !(self.max.x < other.min.x
            || self.min.x > other.max.x
            || self.max.y < other.min.y
            || self.min.y > other.max.y)
    }

    /// Union of two rectangles
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            min: Point::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Point::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }

    /// Grow the rectangle so that it contains `p`
    pub fn include(&self, p: Point) -> Rect {
        self.union(&Rect::from_point(p))
    }

    /// Inflate by a uniform margin on every side
    pub fn inflate(&self, margin: f32) -> Rect {
        let delta = Point::new(margin, margin);
        Rect::from_points(self.min - delta, self.max + delta)
    }

    /// Move the rectangle by `delta`
    pub fn translate(&self, delta: Point) -> Rect {
        Rect {
            min: self.min + delta,
            max: self.max + delta,
        }
    }

    /// Distance from `p` to the rectangle, zero when inside
    pub fn distance_to(&self, p: Point) -> f32 {
        let dx = (self.min.x - p.x).max(0.0).max(p.x - self.max.x);
        let dy = (self.min.y - p.y).max(0.0).max(p.y - self.max.y);
        dx.hypot(dy)
    }
}

/// Squared distance from `p` to the segment `a`-`b`
pub fn distance_to_segment_sq(p: Point, a: Point, b: Point) -> f32 {
    let ab = b - a;
    let len_sq = ab.dot(ab);
    if len_sq <= f32::EPSILON {
        let d = p - a;
        return d.dot(d);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    let closest = a + ab * t;
    let d = p - closest;
    d.dot(d)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_normalizes_corners() {
        let rect = Rect::from_points(Point::new(10.0, 5.0), Point::new(0.0, 20.0));
        assert_eq!(rect.min, Point::new(0.0, 5.0));
        assert_eq!(rect.max, Point::new(10.0, 20.0));
        assert_eq!(rect.size(), Size::new(10.0, 15.0));
    }

    #[test]
    fn test_rect_containment_and_overlap() {
        let outer = Rect::from_origin_size(Point::ZERO, Size::new(100.0, 100.0));
        let inner = Rect::from_origin_size(Point::new(10.0, 10.0), Size::new(20.0, 20.0));
        let touching = Rect::from_origin_size(Point::new(100.0, 0.0), Size::new(5.0, 5.0));

        assert!(outer.contains_rect(&inner));
        assert!(!inner.contains_rect(&outer));
        assert!(outer.intersects(&touching));
        assert!(!inner.intersects(&touching));
    }

    #[test]
    fn test_rect_distance() {
        let rect = Rect::from_origin_size(Point::ZERO, Size::new(10.0, 10.0));
        assert_eq!(rect.distance_to(Point::new(5.0, 5.0)), 0.0);
        assert!((rect.distance_to(Point::new(13.0, 14.0)) - 5.0).abs() < EPSILON);
    }

    #[test]
    fn test_normalized_rejects_zero_vector() {
        assert!(Point::ZERO.normalized().is_none());
        let unit = Point::new(3.0, 4.0).normalized().unwrap();
        assert!(unit.approx_eq(Point::new(0.6, 0.8)));
    }

    #[test]
    fn test_segment_distance() {
        let d = distance_to_segment_sq(Point::new(5.0, 3.0), Point::ZERO, Point::new(10.0, 0.0));
        assert!((d - 9.0).abs() < EPSILON);
        let end = distance_to_segment_sq(Point::new(13.0, 4.0), Point::ZERO, Point::new(10.0, 0.0));
        assert!((end - 25.0).abs() < EPSILON);
    }
}
