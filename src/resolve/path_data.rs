//! Shape-to-path resolution
//!
//! Every geometry-bearing element (`path`, `rect`, `circle`, `ellipse`,
//! `line`, `polyline`, `polygon`) resolves to a `tiny_skia::Path` in the
//! element's user space. Percent lengths resolve against the owner
//! bounds supplied by the caller.

use crate::dom::Document;
use crate::dom::DomId;
use crate::dom::ElementKind;
use crate::geometry::Rect;
use crate::resolve::attribute_length;
use crate::resolve::LengthAxis;
use log::debug;
use svgtypes::SimplePathSegment;
use svgtypes::SimplifyingPathParser;
use tiny_skia::Path;
use tiny_skia::PathBuilder;

/// Circle-to-cubic control point ratio
const KAPPA: f32 = 0.552_284_8;

/// Resolves an element's geometry to a path, if it has any
///
/// Returns `None` for non-shape elements, for degenerate sizes (zero
/// width/height/radius) and for path data that fails to parse at its
/// first segment.
pub fn resolve_path(doc: &Document, id: DomId, owner: Rect) -> Option<Path> {
  match doc.kind(id) {
    ElementKind::Path => path_from_data(doc.attribute(id, "d")?),
    ElementKind::Rect => rect_path(doc, id, owner),
    ElementKind::Circle => circle_path(doc, id, owner),
    ElementKind::Ellipse => ellipse_path(doc, id, owner),
    ElementKind::Line => line_path(doc, id, owner),
    ElementKind::Polyline => poly_path(doc, id, false),
    ElementKind::Polygon => poly_path(doc, id, true),
    _ => None,
  }
}

/// Parses SVG path data
///
/// Arcs, shorthand and relative segments are normalized by the parser;
/// parsing stops at the first malformed segment, keeping everything
/// before it, per SVG error handling.
pub fn path_from_data(data: &str) -> Option<Path> {
  let mut pb = PathBuilder::new();
  for segment in SimplifyingPathParser::from(data) {
    let segment = match segment {
      Ok(seg) => seg,
      Err(e) => {
        debug!("path data truncated at parse error: {e}");
        break;
      }
    };
    match segment {
      SimplePathSegment::MoveTo { x, y } => pb.move_to(x as f32, y as f32),
      SimplePathSegment::LineTo { x, y } => pb.line_to(x as f32, y as f32),
      SimplePathSegment::Quadratic { x1, y1, x, y } => {
        pb.quad_to(x1 as f32, y1 as f32, x as f32, y as f32)
      }
      SimplePathSegment::CurveTo {
        x1,
        y1,
        x2,
        y2,
        x,
        y,
      } => pb.cubic_to(
        x1 as f32, y1 as f32, x2 as f32, y2 as f32, x as f32, y as f32,
      ),
      SimplePathSegment::ClosePath => pb.close(),
    }
  }
  pb.finish()
}

fn rect_path(doc: &Document, id: DomId, owner: Rect) -> Option<Path> {
  let x = attribute_length(doc, id, "x", owner, LengthAxis::Horizontal, 0.0);
  let y = attribute_length(doc, id, "y", owner, LengthAxis::Vertical, 0.0);
  let w = attribute_length(doc, id, "width", owner, LengthAxis::Horizontal, 0.0);
  let h = attribute_length(doc, id, "height", owner, LengthAxis::Vertical, 0.0);
  if w <= 0.0 || h <= 0.0 {
    return None;
  }

  // rx/ry default to each other when only one is present.
  let rx_attr = doc.attribute(id, "rx");
  let ry_attr = doc.attribute(id, "ry");
  let mut rx = attribute_length(doc, id, "rx", owner, LengthAxis::Horizontal, 0.0);
  let mut ry = attribute_length(doc, id, "ry", owner, LengthAxis::Vertical, 0.0);
  if rx_attr.is_none() {
    rx = ry;
  }
  if ry_attr.is_none() {
    ry = rx;
  }
  rx = rx.clamp(0.0, w / 2.0);
  ry = ry.clamp(0.0, h / 2.0);

  if rx <= 0.0 || ry <= 0.0 {
    return PathBuilder::from_rect(tiny_skia::Rect::from_xywh(x, y, w, h)?).into();
  }

  // Rounded rectangle via one cubic per corner.
  let (cx, cy) = (rx * KAPPA, ry * KAPPA);
  let mut pb = PathBuilder::new();
  pb.move_to(x + rx, y);
  pb.line_to(x + w - rx, y);
  pb.cubic_to(x + w - rx + cx, y, x + w, y + ry - cy, x + w, y + ry);
  pb.line_to(x + w, y + h - ry);
  pb.cubic_to(x + w, y + h - ry + cy, x + w - rx + cx, y + h, x + w - rx, y + h);
  pb.line_to(x + rx, y + h);
  pb.cubic_to(x + rx - cx, y + h, x, y + h - ry + cy, x, y + h - ry);
  pb.line_to(x, y + ry);
  pb.cubic_to(x, y + ry - cy, x + rx - cx, y, x + rx, y);
  pb.close();
  pb.finish()
}

fn circle_path(doc: &Document, id: DomId, owner: Rect) -> Option<Path> {
  let cx = attribute_length(doc, id, "cx", owner, LengthAxis::Horizontal, 0.0);
  let cy = attribute_length(doc, id, "cy", owner, LengthAxis::Vertical, 0.0);
  let r = attribute_length(doc, id, "r", owner, LengthAxis::Other, 0.0);
  if r <= 0.0 {
    return None;
  }
  ellipse_arcs(cx, cy, r, r)
}

fn ellipse_path(doc: &Document, id: DomId, owner: Rect) -> Option<Path> {
  let cx = attribute_length(doc, id, "cx", owner, LengthAxis::Horizontal, 0.0);
  let cy = attribute_length(doc, id, "cy", owner, LengthAxis::Vertical, 0.0);
  let rx = attribute_length(doc, id, "rx", owner, LengthAxis::Horizontal, 0.0);
  let ry = attribute_length(doc, id, "ry", owner, LengthAxis::Vertical, 0.0);
  if rx <= 0.0 || ry <= 0.0 {
    return None;
  }
  ellipse_arcs(cx, cy, rx, ry)
}

fn ellipse_arcs(cx: f32, cy: f32, rx: f32, ry: f32) -> Option<Path> {
  let (dx, dy) = (rx * KAPPA, ry * KAPPA);
  let mut pb = PathBuilder::new();
  pb.move_to(cx + rx, cy);
  pb.cubic_to(cx + rx, cy + dy, cx + dx, cy + ry, cx, cy + ry);
  pb.cubic_to(cx - dx, cy + ry, cx - rx, cy + dy, cx - rx, cy);
  pb.cubic_to(cx - rx, cy - dy, cx - dx, cy - ry, cx, cy - ry);
  pb.cubic_to(cx + dx, cy - ry, cx + rx, cy - dy, cx + rx, cy);
  pb.close();
  pb.finish()
}

fn line_path(doc: &Document, id: DomId, owner: Rect) -> Option<Path> {
  let x1 = attribute_length(doc, id, "x1", owner, LengthAxis::Horizontal, 0.0);
  let y1 = attribute_length(doc, id, "y1", owner, LengthAxis::Vertical, 0.0);
  let x2 = attribute_length(doc, id, "x2", owner, LengthAxis::Horizontal, 0.0);
  let y2 = attribute_length(doc, id, "y2", owner, LengthAxis::Vertical, 0.0);
  let mut pb = PathBuilder::new();
  pb.move_to(x1, y1);
  pb.line_to(x2, y2);
  pb.finish()
}

fn poly_path(doc: &Document, id: DomId, close: bool) -> Option<Path> {
  let points = doc.attribute(id, "points")?;
  let mut pb = PathBuilder::new();
  let mut first = true;
  for pair in svgtypes::PointsParser::from(points) {
    let (x, y) = pair;
    if first {
      pb.move_to(x as f32, y as f32);
      first = false;
    } else {
      pb.line_to(x as f32, y as f32);
    }
  }
  if first {
    return None;
  }
  if close {
    pb.close();
  }
  pb.finish()
}
