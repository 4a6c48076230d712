//! Geometry and paint resolution
//!
//! This module turns raw document attributes into backend values: path
//! geometry, fill/stroke paints, transforms, and effect descriptors
//! (clip, mask, opacity, filter). Every function here is pure with
//! respect to the document — failures resolve to `None` (or an explicit
//! invalidity marker for filters) and are logged, never raised.

pub mod effects;
pub mod image_href;
pub mod paint;
pub mod path_data;
pub mod transform;

use crate::geometry::Rect;

/// Percentage basis for a length, per the SVG length axis rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthAxis {
  /// Percentages resolve against the owner width
  Horizontal,
  /// Percentages resolve against the owner height
  Vertical,
  /// Percentages resolve against the normalized diagonal
  Other,
}

/// Nominal font size used for `em`/`ex` units; font resolution is
/// outside this crate.
const NOMINAL_FONT_SIZE: f32 = 16.0;

/// Resolves a length attribute value against an owner rectangle
///
/// Absolute units convert at 96 dpi, matching CSS. Returns `None` for
/// malformed or non-finite values.
pub fn resolve_length(value: &str, owner: Rect, axis: LengthAxis) -> Option<f32> {
  use svgtypes::LengthUnit;

  let length = value.trim().parse::<svgtypes::Length>().ok()?;
  let number = length.number as f32;
  let px = match length.unit {
    LengthUnit::None | LengthUnit::Px => number,
    LengthUnit::Em => number * NOMINAL_FONT_SIZE,
    LengthUnit::Ex => number * NOMINAL_FONT_SIZE * 0.5,
    LengthUnit::In => number * 96.0,
    LengthUnit::Cm => number * (96.0 / 2.54),
    LengthUnit::Mm => number * (96.0 / 25.4),
    LengthUnit::Pt => number * (96.0 / 72.0),
    LengthUnit::Pc => number * (96.0 / 6.0),
    LengthUnit::Percent => {
      let base = match axis {
        LengthAxis::Horizontal => owner.width(),
        LengthAxis::Vertical => owner.height(),
        LengthAxis::Other => {
          let w = owner.width();
          let h = owner.height();
          ((w * w + h * h) / 2.0).sqrt()
        }
      };
      number / 100.0 * base
    }
  };
  px.is_finite().then_some(px)
}

/// Resolves a length attribute on a node, with a default
pub fn attribute_length(
  doc: &crate::dom::Document,
  id: crate::dom::DomId,
  name: &str,
  owner: Rect,
  axis: LengthAxis,
  default: f32,
) -> f32 {
  doc
    .attribute(id, name)
    .and_then(|v| resolve_length(v, owner, axis))
    .unwrap_or(default)
}

/// Extracts the fragment id from a `url(#...)` functional IRI
///
/// Returns the remainder of the value after the closing parenthesis as
/// well, so paint values can fall back (`fill="url(#missing) red"`).
pub fn parse_func_iri(value: &str) -> Option<(&str, &str)> {
  let trimmed = value.trim();
  let rest = trimmed.strip_prefix("url(")?;
  let close = rest.find(')')?;
  let mut target = rest[..close].trim();
  target = target
    .strip_prefix('"')
    .and_then(|t| t.strip_suffix('"'))
    .or_else(|| {
      target
        .strip_prefix('\'')
        .and_then(|t| t.strip_suffix('\''))
    })
    .unwrap_or(target);
  let fragment = target.strip_prefix('#')?;
  Some((fragment, rest[close + 1..].trim()))
}

/// Parses an opacity value, accepting numbers and percentages
pub fn parse_opacity(value: &str) -> Option<f32> {
  let trimmed = value.trim();
  let number = if let Some(pct) = trimmed.strip_suffix('%') {
    pct.trim().parse::<f32>().ok()? / 100.0
  } else {
    trimmed.parse::<f32>().ok()?
  };
  number.is_finite().then(|| number.clamp(0.0, 1.0))
}
