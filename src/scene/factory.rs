//! Drawable factory dispatch
//!
//! A pure lookup from element kind to the constructor for the matching
//! drawable variant. Unknown kinds — and kinds that are only ever
//! instantiated through references, like `<symbol>`, `<marker>` and
//! `<mask>` — dispatch to nothing, and the parent simply omits the child.

use crate::dom::DomId;
use crate::dom::ElementKind;
use crate::scene::build::TreeBuilder;
use crate::scene::node::NodeId;

/// Constructor for one drawable variant
pub(crate) type Constructor<'a> = fn(&mut TreeBuilder<'a>, DomId, Option<NodeId>) -> Option<NodeId>;

/// Looks up the constructor for an element kind
pub(crate) fn constructor_for<'a>(kind: ElementKind) -> Option<Constructor<'a>> {
  match kind {
    ElementKind::Group | ElementKind::Anchor => Some(TreeBuilder::build_group),
    ElementKind::Svg => Some(TreeBuilder::build_fragment),
    ElementKind::Switch => Some(TreeBuilder::build_switch),
    ElementKind::Use => Some(TreeBuilder::build_use),
    ElementKind::Image => Some(TreeBuilder::build_image),
    ElementKind::Text => Some(TreeBuilder::build_text),
    ElementKind::Path
    | ElementKind::Rect
    | ElementKind::Circle
    | ElementKind::Ellipse
    | ElementKind::Line
    | ElementKind::Polyline
    | ElementKind::Polygon => Some(TreeBuilder::build_path),
    // Reference-only and non-rendered kinds.
    ElementKind::Defs
    | ElementKind::Symbol
    | ElementKind::Marker
    | ElementKind::Mask
    | ElementKind::ClipPath
    | ElementKind::Filter
    | ElementKind::FeFlood
    | ElementKind::FeGaussianBlur
    | ElementKind::FeOffset
    | ElementKind::TextSpan
    | ElementKind::Title
    | ElementKind::Desc
    | ElementKind::Metadata
    | ElementKind::Style
    | ElementKind::Unknown => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_reference_only_kinds_dispatch_to_nothing() {
    assert!(constructor_for(ElementKind::Defs).is_none());
    assert!(constructor_for(ElementKind::Symbol).is_none());
    assert!(constructor_for(ElementKind::Unknown).is_none());
    assert!(constructor_for(ElementKind::Rect).is_some());
    assert!(constructor_for(ElementKind::Svg).is_some());
  }
}
