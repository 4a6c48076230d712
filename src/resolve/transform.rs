//! Transform attribute resolution

use crate::dom::Document;
use crate::dom::DomId;
use log::debug;
use tiny_skia::Transform;

/// Resolves a node's `transform` attribute
///
/// Malformed transform lists resolve to identity rather than erroring,
/// so one bad attribute never knocks out a subtree.
pub fn resolve_transform(doc: &Document, id: DomId) -> Transform {
  let Some(value) = doc.attribute(id, "transform") else {
    return Transform::identity();
  };
  parse_transform(value)
}

/// Parses an SVG transform list into a single affine matrix
pub fn parse_transform(value: &str) -> Transform {
  match value.parse::<svgtypes::Transform>() {
    Ok(ts) => Transform::from_row(
      ts.a as f32,
      ts.b as f32,
      ts.c as f32,
      ts.d as f32,
      ts.e as f32,
      ts.f as f32,
    ),
    Err(e) => {
      debug!("ignoring malformed transform {value:?}: {e}");
      Transform::identity()
    }
  }
}
