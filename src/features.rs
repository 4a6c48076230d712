//! Conditional-processing predicates and build configuration
//!
//! SVG's `<switch>` element and the `requiredFeatures` /
//! `requiredExtensions` / `systemLanguage` attributes gate which subtrees
//! are instantiated at all. The allow-lists and language used by those
//! predicates are explicit configuration on [`BuildOptions`] rather than
//! process-wide state, so tests (and embedders) can override each one
//! independently.

use crate::dom::Document;
use crate::dom::DomId;
use crate::geometry::Size;
use rustc_hash::FxHashSet;

/// SVG 1.1 feature strings this renderer implements
///
/// Used to seed the default `supported_features` set.
const SUPPORTED_FEATURES: &[&str] = &[
  "http://www.w3.org/TR/SVG11/feature#CoreAttribute",
  "http://www.w3.org/TR/SVG11/feature#Structure",
  "http://www.w3.org/TR/SVG11/feature#BasicStructure",
  "http://www.w3.org/TR/SVG11/feature#ConditionalProcessing",
  "http://www.w3.org/TR/SVG11/feature#Image",
  "http://www.w3.org/TR/SVG11/feature#Shape",
  "http://www.w3.org/TR/SVG11/feature#BasicText",
  "http://www.w3.org/TR/SVG11/feature#BasicPaintAttribute",
  "http://www.w3.org/TR/SVG11/feature#OpacityAttribute",
  "http://www.w3.org/TR/SVG11/feature#BasicGraphicsAttribute",
  "http://www.w3.org/TR/SVG11/feature#Marker",
  "http://www.w3.org/TR/SVG11/feature#Mask",
  "http://www.w3.org/TR/SVG11/feature#BasicFilter",
  "http://www.w3.org/TR/SVG11/feature#BasicClip",
  "http://www.w3.org/TR/SVG11/feature#Hyperlinking",
  "http://www.w3.org/TR/SVG11/feature#XlinkAttribute",
  "http://www.w3.org/TR/SVG11/feature#ViewportAttribute",
];

/// Configuration threaded through scene construction
///
/// # Examples
///
/// ```
/// use svgscene::features::BuildOptions;
///
/// let mut options = BuildOptions::default();
/// options.language = "fr".to_string();
/// assert!(options.supported_features.iter().any(|f| f.ends_with("#Shape")));
/// ```
#[derive(Debug, Clone)]
pub struct BuildOptions {
  /// Feature URIs accepted by `requiredFeatures`
  pub supported_features: FxHashSet<String>,
  /// Extension URIs accepted by `requiredExtensions`
  pub supported_extensions: FxHashSet<String>,
  /// BCP 47 tag matched against `systemLanguage`
  pub language: String,
  /// Viewport used when the root `<svg>` has no usable width/height
  pub default_viewport: Size,
}

impl Default for BuildOptions {
  fn default() -> Self {
    Self {
      supported_features: SUPPORTED_FEATURES.iter().map(|s| s.to_string()).collect(),
      supported_extensions: FxHashSet::default(),
      language: "en".to_string(),
      // The replaced-element fallback size used by HTML renderers.
      default_viewport: Size::new(300.0, 150.0),
    }
  }
}

impl BuildOptions {
  /// Evaluates all three conditional-processing attributes on a node
  ///
  /// A missing attribute passes; a present-but-empty attribute fails,
  /// which is what makes `requiredFeatures=""` a reliable way to disable
  /// a `<switch>` branch.
  pub fn conditionals_pass(&self, doc: &Document, id: DomId) -> bool {
    self.required_features_pass(doc.attribute(id, "requiredFeatures"))
      && self.required_extensions_pass(doc.attribute(id, "requiredExtensions"))
      && self.system_language_passes(doc.attribute(id, "systemLanguage"))
  }

  /// `requiredFeatures`: every listed URI must be supported
  pub fn required_features_pass(&self, value: Option<&str>) -> bool {
    match value {
      None => true,
      Some(list) => {
        let mut features = list.split_whitespace().peekable();
        features.peek().is_some()
          && features.all(|f| self.supported_features.contains(f))
      }
    }
  }

  /// `requiredExtensions`: every listed URI must be supported
  pub fn required_extensions_pass(&self, value: Option<&str>) -> bool {
    match value {
      None => true,
      Some(list) => {
        let mut extensions = list.split_whitespace().peekable();
        extensions.peek().is_some()
          && extensions.all(|e| self.supported_extensions.contains(e))
      }
    }
  }

  /// `systemLanguage`: at least one listed tag must match the configured
  /// language, either exactly or by primary-subtag prefix (`en` matches
  /// `en-US`)
  pub fn system_language_passes(&self, value: Option<&str>) -> bool {
    let Some(list) = value else {
      return true;
    };
    list
      .split(',')
      .map(str::trim)
      .filter(|tag| !tag.is_empty())
      .any(|tag| language_matches(tag, &self.language))
  }
}

fn language_matches(tag: &str, configured: &str) -> bool {
  if tag.eq_ignore_ascii_case(configured) {
    return true;
  }
  let tag_primary = tag.split('-').next().unwrap_or(tag);
  let configured_primary = configured.split('-').next().unwrap_or(configured);
  tag_primary.eq_ignore_ascii_case(configured_primary)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_missing_attributes_pass() {
    let options = BuildOptions::default();
    assert!(options.required_features_pass(None));
    assert!(options.required_extensions_pass(None));
    assert!(options.system_language_passes(None));
  }

  #[test]
  fn test_empty_attributes_fail() {
    let options = BuildOptions::default();
    assert!(!options.required_features_pass(Some("")));
    assert!(!options.required_extensions_pass(Some("  ")));
    assert!(!options.system_language_passes(Some("")));
  }

  #[test]
  fn test_unknown_feature_fails() {
    let options = BuildOptions::default();
    assert!(options.required_features_pass(Some(
      "http://www.w3.org/TR/SVG11/feature#Shape"
    )));
    assert!(!options.required_features_pass(Some(
      "http://www.w3.org/TR/SVG11/feature#Shape http://example.com/feature#Teleport"
    )));
  }

  #[test]
  fn test_extensions_default_empty() {
    let mut options = BuildOptions::default();
    assert!(!options.required_extensions_pass(Some("http://example.com/ext")));
    options
      .supported_extensions
      .insert("http://example.com/ext".to_string());
    assert!(options.required_extensions_pass(Some("http://example.com/ext")));
  }

  #[test]
  fn test_language_primary_subtag_match() {
    let mut options = BuildOptions::default();
    assert!(options.system_language_passes(Some("en-GB, fr")));
    assert!(!options.system_language_passes(Some("de, ja")));
    options.language = "de-CH".to_string();
    assert!(options.system_language_passes(Some("de")));
  }
}
