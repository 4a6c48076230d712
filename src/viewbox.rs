//! Nested viewport and aspect-ratio mapping
//!
//! Implements the `viewBox`/`preserveAspectRatio` coordinate mapping used
//! by `<svg>`, `<symbol>`, `<marker>` and `<image>`: given a content
//! rectangle and the viewport it must fit into, produce the affine
//! transform selected by the alignment policy (9 alignments × meet/slice,
//! or `none` for non-uniform scaling).

use crate::geometry::Rect;
use svgtypes::Align;
use svgtypes::AspectRatio;
use tiny_skia::Transform;

/// Parses a `viewBox` attribute value
///
/// Returns `None` for malformed lists and for non-positive sizes, which
/// per the SVG spec disable rendering of the referencing element's
/// viewport mapping rather than erroring.
pub fn parse_view_box(value: &str) -> Option<Rect> {
  let vb = value.parse::<svgtypes::ViewBox>().ok()?;
  let rect = Rect::from_xywh(vb.x as f32, vb.y as f32, vb.w as f32, vb.h as f32);
  if !rect.x().is_finite() || !rect.y().is_finite() || rect.is_empty() {
    return None;
  }
  Some(rect)
}

/// Parses a `preserveAspectRatio` attribute value
///
/// Malformed values fall back to the SVG default `xMidYMid meet`.
pub fn parse_aspect_ratio(value: Option<&str>) -> AspectRatio {
  value
    .and_then(|v| v.parse::<AspectRatio>().ok())
    .unwrap_or_default()
}

/// Computes the content-to-viewport transform for an aspect-ratio policy
///
/// `content` is the coordinate space being mapped (a `viewBox`, or an
/// image's intrinsic pixel rectangle); `viewport` is where it lands in the
/// parent's user space. With `Align::None` the content is stretched
/// non-uniformly; otherwise a uniform scale is chosen by meet (fit) or
/// slice (cover) and the remainder distributed by the alignment.
pub fn view_box_transform(content: Rect, viewport: Rect, ratio: AspectRatio) -> Transform {
  let sx = viewport.width() / content.width();
  let sy = viewport.height() / content.height();

  if ratio.align == Align::None {
    return Transform::from_row(
      sx,
      0.0,
      0.0,
      sy,
      viewport.x() - content.x() * sx,
      viewport.y() - content.y() * sy,
    );
  }

  let scale = if ratio.slice { sx.max(sy) } else { sx.min(sy) };
  let scaled_w = content.width() * scale;
  let scaled_h = content.height() * scale;

  let extra_x = viewport.width() - scaled_w;
  let extra_y = viewport.height() - scaled_h;
  let (align_x, align_y) = match ratio.align {
    Align::None | Align::XMinYMin => (0.0, 0.0),
    Align::XMidYMin => (extra_x * 0.5, 0.0),
    Align::XMaxYMin => (extra_x, 0.0),
    Align::XMinYMid => (0.0, extra_y * 0.5),
    Align::XMidYMid => (extra_x * 0.5, extra_y * 0.5),
    Align::XMaxYMid => (extra_x, extra_y * 0.5),
    Align::XMinYMax => (0.0, extra_y),
    Align::XMidYMax => (extra_x * 0.5, extra_y),
    Align::XMaxYMax => (extra_x, extra_y),
  };

  Transform::from_row(
    scale,
    0.0,
    0.0,
    scale,
    viewport.x() + align_x - content.x() * scale,
    viewport.y() + align_y - content.y() * scale,
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::geometry::Point;

  fn map(ts: Transform, x: f32, y: f32) -> Point {
    Point::new(x, y).transform(ts)
  }

  #[test]
  fn test_parse_view_box_rejects_degenerate() {
    assert!(parse_view_box("0 0 100 50").is_some());
    assert!(parse_view_box("0 0 0 50").is_none());
    assert!(parse_view_box("0 0 -10 50").is_none());
    assert!(parse_view_box("garbage").is_none());
  }

  #[test]
  fn test_default_ratio_is_mid_meet() {
    let ratio = parse_aspect_ratio(None);
    assert_eq!(ratio.align, Align::XMidYMid);
    assert!(!ratio.slice);
  }

  #[test]
  fn test_meet_centers_content() {
    // 100x100 content into a 200x100 viewport: scale 1, centered in x.
    let ts = view_box_transform(
      Rect::from_xywh(0.0, 0.0, 100.0, 100.0),
      Rect::from_xywh(0.0, 0.0, 200.0, 100.0),
      parse_aspect_ratio(Some("xMidYMid meet")),
    );
    assert_eq!(map(ts, 0.0, 0.0), Point::new(50.0, 0.0));
    assert_eq!(map(ts, 100.0, 100.0), Point::new(150.0, 100.0));
  }

  #[test]
  fn test_slice_covers_viewport() {
    // 100x100 content into 200x100: slice scales by 2, overflowing in y.
    let ts = view_box_transform(
      Rect::from_xywh(0.0, 0.0, 100.0, 100.0),
      Rect::from_xywh(0.0, 0.0, 200.0, 100.0),
      parse_aspect_ratio(Some("xMidYMid slice")),
    );
    assert_eq!(map(ts, 0.0, 0.0), Point::new(0.0, -50.0));
    assert_eq!(map(ts, 100.0, 100.0), Point::new(200.0, 150.0));
  }

  #[test]
  fn test_none_stretches() {
    let ts = view_box_transform(
      Rect::from_xywh(0.0, 0.0, 100.0, 100.0),
      Rect::from_xywh(10.0, 20.0, 200.0, 50.0),
      parse_aspect_ratio(Some("none")),
    );
    assert_eq!(map(ts, 0.0, 0.0), Point::new(10.0, 20.0));
    assert_eq!(map(ts, 100.0, 100.0), Point::new(210.0, 70.0));
  }

  #[test]
  fn test_min_and_max_alignment() {
    let content = Rect::from_xywh(0.0, 0.0, 100.0, 100.0);
    let viewport = Rect::from_xywh(0.0, 0.0, 200.0, 100.0);

    let min = view_box_transform(content, viewport, parse_aspect_ratio(Some("xMinYMin meet")));
    assert_eq!(map(min, 0.0, 0.0), Point::new(0.0, 0.0));

    let max = view_box_transform(content, viewport, parse_aspect_ratio(Some("xMaxYMax meet")));
    assert_eq!(map(max, 100.0, 100.0), Point::new(200.0, 100.0));
  }

  #[test]
  fn test_view_box_offset_translates() {
    let ts = view_box_transform(
      Rect::from_xywh(50.0, 50.0, 100.0, 100.0),
      Rect::from_xywh(0.0, 0.0, 100.0, 100.0),
      parse_aspect_ratio(None),
    );
    assert_eq!(map(ts, 50.0, 50.0), Point::new(0.0, 0.0));
  }
}
