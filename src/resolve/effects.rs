//! Effect reference resolution: clip-path, mask, opacity, filter
//!
//! These resolvers run during the PostProcess pass, after the whole tree
//! exists. Failure semantics differ deliberately:
//!
//! - dangling `clip-path` / `mask` references resolve to "no effect";
//! - a present but unresolvable `filter` is *invalid* and vetoes the
//!   node's drawability, which [`FilterResolution`] makes explicit.

use crate::dom::Document;
use crate::dom::DomId;
use crate::dom::ElementKind;
use crate::dom::ParentOverrides;
use crate::geometry::Rect;
use crate::paint::FilterPrimitive;
use crate::paint::FilterSpec;
use crate::resolve::paint::parse_color;
use crate::resolve::parse_func_iri;
use crate::resolve::parse_opacity;
use crate::resolve::path_data::resolve_path;
use crate::resolve::transform::resolve_transform;
use log::debug;
use tiny_skia::Color;
use tiny_skia::FillRule;
use tiny_skia::Path;
use tiny_skia::PathBuilder;
use tiny_skia::Transform;

/// A resolved clip
///
/// `path: None` means the referenced `<clipPath>` produced no geometry,
/// which clips *everything* (an empty clip region), not nothing.
#[derive(Debug, Clone)]
pub struct ResolvedClip {
  pub path: Option<Path>,
  pub rule: FillRule,
}

/// Outcome of filter resolution
#[derive(Debug, Clone, PartialEq)]
pub enum FilterResolution {
  /// No filter attribute (or `filter="none"`)
  Absent,
  /// A filter is referenced but cannot be resolved; the node must not draw
  Invalid,
  /// A usable filter
  Resolved(FilterSpec),
}

/// Resolves a node's `clip-path` attribute against its bounds
///
/// The referenced `<clipPath>`'s shape children are flattened into a
/// single path, honoring `clipPathUnits="objectBoundingBox"`, the clip
/// element's own transform, and per-child transforms.
pub fn resolve_clip_path(
  doc: &Document,
  parents: &ParentOverrides,
  id: DomId,
  bounds: Rect,
) -> Option<ResolvedClip> {
  let raw = doc.attribute(id, "clip-path")?;
  if raw.trim().eq_ignore_ascii_case("none") {
    return None;
  }
  let Some((fragment, _)) = parse_func_iri(raw) else {
    debug!("unparseable clip-path value {raw:?}");
    return None;
  };
  let Some(clip) = doc.node_by_id(fragment) else {
    debug!("dangling clip-path reference '#{fragment}'");
    return None;
  };
  if doc.kind(clip) != ElementKind::ClipPath {
    debug!("clip-path reference '#{fragment}' is not a <clipPath>");
    return None;
  }

  let unit_transform = if doc.attribute(clip, "clipPathUnits") == Some("objectBoundingBox") {
    Transform::from_row(
      bounds.width(),
      0.0,
      0.0,
      bounds.height(),
      bounds.x(),
      bounds.y(),
    )
  } else {
    Transform::identity()
  };
  let clip_transform = unit_transform.pre_concat(resolve_transform(doc, clip));

  let mut pb = PathBuilder::new();
  let mut rule = FillRule::Winding;
  let mut first_shape = true;
  for &child in doc.children(clip) {
    if !doc.kind(child).is_shape() {
      continue;
    }
    let Some(path) = resolve_path(doc, child, bounds) else {
      continue;
    };
    let total = clip_transform.pre_concat(resolve_transform(doc, child));
    let Some(transformed) = path.transform(total) else {
      continue;
    };
    if first_shape {
      if parents.inherited_attribute(doc, child, "clip-rule") == Some("evenodd") {
        rule = FillRule::EvenOdd;
      }
      first_shape = false;
    }
    append_path(&mut pb, &transformed);
  }

  Some(ResolvedClip {
    path: pb.finish(),
    rule,
  })
}

/// Appends a finished path's segments onto a builder
fn append_path(pb: &mut PathBuilder, path: &Path) {
  use tiny_skia::PathSegment;
  for segment in path.segments() {
    match segment {
      PathSegment::MoveTo(p) => pb.move_to(p.x, p.y),
      PathSegment::LineTo(p) => pb.line_to(p.x, p.y),
      PathSegment::QuadTo(p1, p) => pb.quad_to(p1.x, p1.y, p.x, p.y),
      PathSegment::CubicTo(p1, p2, p) => pb.cubic_to(p1.x, p1.y, p2.x, p2.y, p.x, p.y),
      PathSegment::Close => pb.close(),
    }
  }
}

/// Resolves a node's `mask` attribute to the referenced `<mask>` element
///
/// The mask's sub-tree is built by the scene layer; this only validates
/// the reference.
pub fn resolve_mask_reference(doc: &Document, id: DomId) -> Option<DomId> {
  let raw = doc.attribute(id, "mask")?;
  if raw.trim().eq_ignore_ascii_case("none") {
    return None;
  }
  let Some((fragment, _)) = parse_func_iri(raw) else {
    debug!("unparseable mask value {raw:?}");
    return None;
  };
  let target = doc.node_by_id(fragment);
  match target {
    Some(mask) if doc.kind(mask) == ElementKind::Mask => Some(mask),
    Some(_) => {
      debug!("mask reference '#{fragment}' is not a <mask>");
      None
    }
    None => {
      debug!("dangling mask reference '#{fragment}'");
      None
    }
  }
}

/// Resolves a node's group `opacity`, if it actually reduces alpha
pub fn resolve_opacity(doc: &Document, id: DomId) -> Option<f32> {
  let opacity = parse_opacity(doc.attribute(id, "opacity")?)?;
  (opacity < 1.0).then_some(opacity)
}

/// Resolves a node's `filter` attribute
pub fn resolve_filter(doc: &Document, id: DomId) -> FilterResolution {
  let Some(raw) = doc.attribute(id, "filter") else {
    return FilterResolution::Absent;
  };
  if raw.trim().eq_ignore_ascii_case("none") {
    return FilterResolution::Absent;
  }
  let Some((fragment, _)) = parse_func_iri(raw) else {
    debug!("unparseable filter value {raw:?}");
    return FilterResolution::Invalid;
  };
  let Some(filter) = doc.node_by_id(fragment) else {
    debug!("dangling filter reference '#{fragment}'");
    return FilterResolution::Invalid;
  };
  if doc.kind(filter) != ElementKind::Filter {
    debug!("filter reference '#{fragment}' is not a <filter>");
    return FilterResolution::Invalid;
  }

  let mut primitives = Vec::new();
  for &child in doc.children(filter) {
    match doc.kind(child) {
      ElementKind::FeGaussianBlur => {
        let std_dev = doc
          .attribute(child, "stdDeviation")
          .and_then(first_number)
          .unwrap_or(0.0);
        if std_dev < 0.0 {
          // Negative deviation is an error that disables the element.
          return FilterResolution::Invalid;
        }
        if std_dev > 0.0 {
          primitives.push(FilterPrimitive::GaussianBlur { std_dev });
        }
      }
      ElementKind::FeOffset => {
        let dx = doc.attribute(child, "dx").and_then(first_number).unwrap_or(0.0);
        let dy = doc.attribute(child, "dy").and_then(first_number).unwrap_or(0.0);
        primitives.push(FilterPrimitive::Offset { dx, dy });
      }
      ElementKind::FeFlood => {
        let color = doc
          .attribute(child, "flood-color")
          .and_then(parse_color)
          .unwrap_or(Color::BLACK);
        let opacity = doc
          .attribute(child, "flood-opacity")
          .and_then(parse_opacity)
          .unwrap_or(1.0);
        let flood = Color::from_rgba(
          color.red(),
          color.green(),
          color.blue(),
          color.alpha() * opacity,
        )
        .unwrap_or(color);
        primitives.push(FilterPrimitive::Flood { color: flood });
      }
      _ => {}
    }
  }

  FilterResolution::Resolved(FilterSpec { primitives })
}

fn first_number(value: &str) -> Option<f32> {
  value
    .split(|c: char| c == ',' || c.is_whitespace())
    .find(|s| !s.is_empty())?
    .parse::<f32>()
    .ok()
    .filter(|n| n.is_finite())
}
