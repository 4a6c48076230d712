//! Core geometry types for scene construction and painting
//!
//! This module provides the fundamental geometric primitives used throughout
//! the renderer. All units are user-space pixels; the coordinate system has
//! its origin at the top-left corner with positive Y extending downward,
//! matching the SVG coordinate system.
//!
//! Affine transforms use `tiny_skia::Transform` directly rather than a
//! custom matrix type, since every transform ultimately ends up on the
//! canvas anyway.

use std::fmt;
use tiny_skia::Transform;

/// A 2D point in user-space pixels
///
/// # Examples
///
/// ```
/// use svgscene::geometry::Point;
///
/// let p = Point::new(10.0, 20.0);
/// assert_eq!(p.x, 10.0);
/// assert_eq!(p.y, 20.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
  /// X coordinate (increases to the right)
  pub x: f32,
  /// Y coordinate (increases downward)
  pub y: f32,
}

impl Point {
  /// The origin (0, 0)
  pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

  /// Creates a new point at the given coordinates
  pub const fn new(x: f32, y: f32) -> Self {
    Self { x, y }
  }

  /// Maps this point through an affine transform
  pub fn transform(self, ts: Transform) -> Self {
    Self {
      x: ts.sx * self.x + ts.kx * self.y + ts.tx,
      y: ts.ky * self.x + ts.sy * self.y + ts.ty,
    }
  }
}

impl fmt::Display for Point {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "({}, {})", self.x, self.y)
  }
}

/// A 2D size in user-space pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
  /// Width (horizontal extent)
  pub width: f32,
  /// Height (vertical extent)
  pub height: f32,
}

impl Size {
  /// A size with zero width and height
  pub const ZERO: Self = Self {
    width: 0.0,
    height: 0.0,
  };

  /// Creates a new size with the given dimensions
  pub const fn new(width: f32, height: f32) -> Self {
    Self { width, height }
  }

  /// Returns true if either dimension is zero or negative
  pub fn is_empty(self) -> bool {
    self.width <= 0.0 || self.height <= 0.0
  }
}

impl fmt::Display for Size {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}×{}", self.width, self.height)
  }
}

/// An axis-aligned rectangle in user-space pixels
///
/// A rectangle with zero (or negative) width or height is *degenerate*:
/// it unions as the identity and contains no points. Degenerate bounds are
/// how the scene graph represents "nothing drawable here".
///
/// # Examples
///
/// ```
/// use svgscene::geometry::Rect;
///
/// let a = Rect::from_xywh(0.0, 0.0, 10.0, 10.0);
/// let b = Rect::from_xywh(20.0, 5.0, 10.0, 10.0);
/// let u = a.union(b);
/// assert_eq!(u, Rect::from_xywh(0.0, 0.0, 30.0, 15.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
  /// The top-left corner
  pub origin: Point,
  /// Width and height
  pub size: Size,
}

impl Rect {
  /// A zero-sized rectangle at the origin
  pub const ZERO: Self = Self {
    origin: Point::ZERO,
    size: Size::ZERO,
  };

  /// Creates a rectangle from an origin point and size
  pub const fn new(origin: Point, size: Size) -> Self {
    Self { origin, size }
  }

  /// Creates a rectangle from x, y, width, height
  pub const fn from_xywh(x: f32, y: f32, width: f32, height: f32) -> Self {
    Self {
      origin: Point::new(x, y),
      size: Size::new(width, height),
    }
  }

  /// Creates the smallest rectangle containing both corner points
  pub fn from_points(a: Point, b: Point) -> Self {
    let x0 = a.x.min(b.x);
    let y0 = a.y.min(b.y);
    let x1 = a.x.max(b.x);
    let y1 = a.y.max(b.y);
    Self::from_xywh(x0, y0, x1 - x0, y1 - y0)
  }

  /// X coordinate of the left edge
  #[inline]
  pub fn x(&self) -> f32 {
    self.origin.x
  }

  /// Y coordinate of the top edge
  #[inline]
  pub fn y(&self) -> f32 {
    self.origin.y
  }

  /// Width of the rectangle
  #[inline]
  pub fn width(&self) -> f32 {
    self.size.width
  }

  /// Height of the rectangle
  #[inline]
  pub fn height(&self) -> f32 {
    self.size.height
  }

  /// X coordinate of the right edge
  #[inline]
  pub fn max_x(&self) -> f32 {
    self.origin.x + self.size.width
  }

  /// Y coordinate of the bottom edge
  #[inline]
  pub fn max_y(&self) -> f32 {
    self.origin.y + self.size.height
  }

  /// Returns true if this rectangle has zero or negative area
  #[inline]
  pub fn is_empty(&self) -> bool {
    self.size.is_empty()
  }

  /// Returns true if the point lies inside this rectangle
  ///
  /// Edges are inclusive on the top-left, exclusive on the bottom-right,
  /// so adjacent rectangles do not both claim their shared edge.
  pub fn contains(&self, point: Point) -> bool {
    !self.is_empty()
      && point.x >= self.x()
      && point.x < self.max_x()
      && point.y >= self.y()
      && point.y < self.max_y()
  }

  /// Returns the union of two rectangles
  ///
  /// A degenerate rectangle is the identity: `empty.union(r) == r`.
  pub fn union(self, other: Rect) -> Rect {
    if self.is_empty() {
      return other;
    }
    if other.is_empty() {
      return self;
    }
    let x0 = self.x().min(other.x());
    let y0 = self.y().min(other.y());
    let x1 = self.max_x().max(other.max_x());
    let y1 = self.max_y().max(other.max_y());
    Rect::from_xywh(x0, y0, x1 - x0, y1 - y0)
  }

  /// Returns the intersection of two rectangles, or a degenerate rect
  /// if they do not overlap
  pub fn intersection(self, other: Rect) -> Rect {
    let x0 = self.x().max(other.x());
    let y0 = self.y().max(other.y());
    let x1 = self.max_x().min(other.max_x());
    let y1 = self.max_y().min(other.max_y());
    if x1 <= x0 || y1 <= y0 {
      return Rect::ZERO;
    }
    Rect::from_xywh(x0, y0, x1 - x0, y1 - y0)
  }

  /// Grows the rectangle by `d` on every side
  pub fn inflate(self, d: f32) -> Rect {
    Rect::from_xywh(
      self.x() - d,
      self.y() - d,
      self.width() + 2.0 * d,
      self.height() + 2.0 * d,
    )
  }

  /// Maps this rectangle through an affine transform
  ///
  /// The result is the axis-aligned bounding box of the four transformed
  /// corners. Degenerate rectangles stay degenerate.
  pub fn transform(self, ts: Transform) -> Rect {
    if self.is_empty() {
      return Rect::ZERO;
    }
    let corners = [
      Point::new(self.x(), self.y()).transform(ts),
      Point::new(self.max_x(), self.y()).transform(ts),
      Point::new(self.max_x(), self.max_y()).transform(ts),
      Point::new(self.x(), self.max_y()).transform(ts),
    ];
    let mut x0 = corners[0].x;
    let mut y0 = corners[0].y;
    let mut x1 = corners[0].x;
    let mut y1 = corners[0].y;
    for c in &corners[1..] {
      x0 = x0.min(c.x);
      y0 = y0.min(c.y);
      x1 = x1.max(c.x);
      y1 = y1.max(c.y);
    }
    Rect::from_xywh(x0, y0, x1 - x0, y1 - y0)
  }

  /// Converts to a `tiny_skia::Rect`, if non-degenerate and finite
  pub fn to_skia(self) -> Option<tiny_skia::Rect> {
    tiny_skia::Rect::from_xywh(self.x(), self.y(), self.width(), self.height())
  }

  /// Converts from a `tiny_skia::Rect`
  pub fn from_skia(rect: tiny_skia::Rect) -> Self {
    Self::from_xywh(rect.x(), rect.y(), rect.width(), rect.height())
  }
}

impl fmt::Display for Rect {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} {}", self.origin, self.size)
  }
}
