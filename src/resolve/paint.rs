//! Fill and stroke resolution
//!
//! Paint attributes inherit through the (possibly reparented) ancestor
//! chain, so every function here takes the build-time
//! [`ParentOverrides`] next to the document. Paint servers (gradients,
//! patterns) are out of scope: a `url(#...)` paint falls back to its
//! fallback color when one is given, otherwise it resolves to no paint.

use crate::dom::Document;
use crate::dom::DomId;
use crate::dom::ParentOverrides;
use crate::geometry::Rect;
use crate::paint::FillPaint;
use crate::paint::StrokePaint;
use crate::resolve::parse_func_iri;
use crate::resolve::parse_opacity;
use crate::resolve::resolve_length;
use crate::resolve::LengthAxis;
use log::debug;
use smallvec::SmallVec;
use tiny_skia::Color;
use tiny_skia::FillRule;
use tiny_skia::LineCap;
use tiny_skia::LineJoin;
use tiny_skia::Stroke;
use tiny_skia::StrokeDash;

/// Resolves the effective fill paint of a node
///
/// The SVG initial value paints black; `fill="none"` and unresolvable
/// paint servers without a fallback yield `None`.
pub fn resolve_fill(doc: &Document, parents: &ParentOverrides, id: DomId) -> Option<FillPaint> {
  let raw = parents.inherited_attribute(doc, id, "fill").unwrap_or("black");
  let color = resolve_paint_color(doc, parents, id, raw)?;

  let opacity = parents
    .inherited_attribute(doc, id, "fill-opacity")
    .and_then(parse_opacity)
    .unwrap_or(1.0);
  if opacity <= 0.0 && color.alpha() <= 0.0 {
    return None;
  }

  let rule = match parents.inherited_attribute(doc, id, "fill-rule") {
    Some("evenodd") => FillRule::EvenOdd,
    _ => FillRule::Winding,
  };

  Some(FillPaint {
    color: multiply_alpha(color, opacity),
    rule,
    anti_alias: anti_alias(doc, parents, id),
  })
}

/// Resolves the effective stroke paint of a node
///
/// The SVG initial stroke is `none`; a zero or negative `stroke-width`
/// also disables stroking.
pub fn resolve_stroke(
  doc: &Document,
  parents: &ParentOverrides,
  id: DomId,
  owner: Rect,
) -> Option<StrokePaint> {
  let raw = parents.inherited_attribute(doc, id, "stroke")?;
  let color = resolve_paint_color(doc, parents, id, raw)?;

  let width = parents
    .inherited_attribute(doc, id, "stroke-width")
    .and_then(|v| resolve_length(v, owner, LengthAxis::Other))
    .unwrap_or(1.0);
  if width <= 0.0 {
    return None;
  }

  let opacity = parents
    .inherited_attribute(doc, id, "stroke-opacity")
    .and_then(parse_opacity)
    .unwrap_or(1.0);

  let line_cap = match parents.inherited_attribute(doc, id, "stroke-linecap") {
    Some("round") => LineCap::Round,
    Some("square") => LineCap::Square,
    _ => LineCap::Butt,
  };
  let line_join = match parents.inherited_attribute(doc, id, "stroke-linejoin") {
    Some("round") => LineJoin::Round,
    Some("bevel") => LineJoin::Bevel,
    _ => LineJoin::Miter,
  };
  let miter_limit = parents
    .inherited_attribute(doc, id, "stroke-miterlimit")
    .and_then(|v| v.trim().parse::<f32>().ok())
    .filter(|m| m.is_finite() && *m >= 1.0)
    .unwrap_or(4.0);

  let dash = resolve_dash(doc, parents, id, owner);

  Some(StrokePaint {
    color: multiply_alpha(color, opacity),
    stroke: Stroke {
      width,
      miter_limit,
      line_cap,
      line_join,
      dash,
    },
    anti_alias: anti_alias(doc, parents, id),
  })
}

/// Resolves a paint value string to a concrete color
///
/// Handles `none`, `currentColor`, functional IRIs with fallbacks, and
/// plain CSS colors.
fn resolve_paint_color(
  doc: &Document,
  parents: &ParentOverrides,
  id: DomId,
  raw: &str,
) -> Option<Color> {
  let value = raw.trim();
  if value.eq_ignore_ascii_case("none") {
    return None;
  }
  if value == "currentColor" {
    let current = parents
      .inherited_attribute(doc, id, "color")
      .unwrap_or("black");
    return parse_color(current);
  }
  if let Some((fragment, fallback)) = parse_func_iri(value) {
    // Paint servers are unsupported; honor the fallback color if present.
    debug!("paint server reference '#{fragment}' unsupported, using fallback");
    if fallback.is_empty() || fallback.eq_ignore_ascii_case("none") {
      return None;
    }
    return parse_color(fallback);
  }
  parse_color(value)
}

/// Parses a CSS color string
pub fn parse_color(value: &str) -> Option<Color> {
  let parsed = csscolorparser::parse(value).ok()?;
  let [r, g, b, a] = parsed.to_rgba8();
  Some(Color::from_rgba8(r, g, b, a))
}

fn multiply_alpha(color: Color, opacity: f32) -> Color {
  if opacity >= 1.0 {
    return color;
  }
  let alpha = (color.alpha() * opacity).clamp(0.0, 1.0);
  Color::from_rgba(color.red(), color.green(), color.blue(), alpha).unwrap_or(color)
}

/// Anti-aliasing from `shape-rendering`
///
/// `crispEdges` and `optimizeSpeed` disable it; everything else keeps it.
pub fn anti_alias(doc: &Document, parents: &ParentOverrides, id: DomId) -> bool {
  !matches!(
    parents.inherited_attribute(doc, id, "shape-rendering"),
    Some("crispEdges") | Some("optimizeSpeed")
  )
}

/// Parses a `stroke-dasharray` value into an even-length dash list
///
/// Returns `None` for `none`, negative entries, and lists that never
/// paint a gap. Odd-length lists repeat doubled per SVG.
pub fn parse_dash_array(raw: &str, owner: Rect) -> Option<Vec<f32>> {
  if raw.trim().eq_ignore_ascii_case("none") {
    return None;
  }

  let mut dashes: SmallVec<[f32; 8]> = SmallVec::new();
  for part in raw.split(|c: char| c == ',' || c.is_whitespace()) {
    if part.is_empty() {
      continue;
    }
    let value = resolve_length(part, owner, LengthAxis::Other)?;
    if value < 0.0 {
      return None;
    }
    dashes.push(value);
  }
  if dashes.is_empty() || dashes.iter().sum::<f32>() <= 0.0 {
    return None;
  }
  if dashes.len() % 2 == 1 {
    let doubled: Vec<f32> = dashes.iter().chain(dashes.iter()).copied().collect();
    return Some(doubled);
  }
  Some(dashes.into_vec())
}

fn resolve_dash(
  doc: &Document,
  parents: &ParentOverrides,
  id: DomId,
  owner: Rect,
) -> Option<StrokeDash> {
  let raw = parents.inherited_attribute(doc, id, "stroke-dasharray")?;
  let dashes = parse_dash_array(raw, owner)?;

  let offset = parents
    .inherited_attribute(doc, id, "stroke-dashoffset")
    .and_then(|v| resolve_length(v, owner, LengthAxis::Other))
    .unwrap_or(0.0);

  StrokeDash::new(dashes, offset)
}
