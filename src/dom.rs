//! Owned SVG document tree
//!
//! This module converts a `roxmltree` parse into an owned node arena so the
//! scene graph never borrows the input string. Nodes are addressed by
//! [`DomId`] indices; elements with an `id` attribute are indexed for
//! same-document reference resolution (`<use>`, `clip-path`, `mask`,
//! `filter`, markers).
//!
//! The DOM is deliberately dumb: it stores element kinds, raw attribute
//! strings and tree shape. All interpretation of attribute values lives in
//! the `resolve` module.

use crate::error::ParseError;
use crate::error::Result;
use rustc_hash::FxHashMap;

/// Index of a node within a [`Document`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DomId(pub(crate) u32);

impl DomId {
  /// Returns the raw arena index
  #[inline]
  pub fn index(self) -> usize {
    self.0 as usize
  }
}

/// The element vocabulary the scene builder understands
///
/// Unknown elements are preserved in the tree (their children may still be
/// referenced by id) but the drawable factory dispatches them to nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
  Svg,
  Group,
  Anchor,
  Defs,
  Switch,
  Symbol,
  Use,
  Image,
  Marker,
  Mask,
  ClipPath,
  Filter,
  FeFlood,
  FeGaussianBlur,
  FeOffset,
  Path,
  Rect,
  Circle,
  Ellipse,
  Line,
  Polyline,
  Polygon,
  Text,
  TextSpan,
  Title,
  Desc,
  Metadata,
  Style,
  Unknown,
}

impl ElementKind {
  /// Maps an XML local tag name onto the known vocabulary
  pub fn from_tag_name(name: &str) -> Self {
    match name {
      "svg" => Self::Svg,
      "g" => Self::Group,
      "a" => Self::Anchor,
      "defs" => Self::Defs,
      "switch" => Self::Switch,
      "symbol" => Self::Symbol,
      "use" => Self::Use,
      "image" => Self::Image,
      "marker" => Self::Marker,
      "mask" => Self::Mask,
      "clipPath" => Self::ClipPath,
      "filter" => Self::Filter,
      "feFlood" => Self::FeFlood,
      "feGaussianBlur" => Self::FeGaussianBlur,
      "feOffset" => Self::FeOffset,
      "path" => Self::Path,
      "rect" => Self::Rect,
      "circle" => Self::Circle,
      "ellipse" => Self::Ellipse,
      "line" => Self::Line,
      "polyline" => Self::Polyline,
      "polygon" => Self::Polygon,
      "text" => Self::Text,
      "tspan" => Self::TextSpan,
      "title" => Self::Title,
      "desc" => Self::Desc,
      "metadata" => Self::Metadata,
      "style" => Self::Style,
      _ => Self::Unknown,
    }
  }

  /// Returns true for elements carrying renderable path geometry
  pub fn is_shape(self) -> bool {
    matches!(
      self,
      Self::Path
        | Self::Rect
        | Self::Circle
        | Self::Ellipse
        | Self::Line
        | Self::Polyline
        | Self::Polygon
    )
  }

  /// Returns true for element kinds a `<switch>` considers at all
  ///
  /// Per SVG conditional processing, `<switch>` only evaluates direct
  /// children that are graphics or container elements; anything else is
  /// skipped without consuming the "first match" slot.
  pub fn is_switch_candidate(self) -> bool {
    self.is_shape()
      || matches!(
        self,
        Self::Svg
          | Self::Group
          | Self::Anchor
          | Self::Switch
          | Self::Use
          | Self::Image
          | Self::Text
      )
  }
}

/// A single element node in the owned document arena
#[derive(Debug)]
pub struct DomNode {
  /// Element kind derived from the tag name
  pub kind: ElementKind,
  /// Raw attribute name/value pairs, namespaces stripped
  attributes: Vec<(String, String)>,
  /// Parent element, `None` for the root
  pub parent: Option<DomId>,
  /// Child elements in document order
  pub children: Vec<DomId>,
  /// Concatenated direct text content (text/tspan/title/desc)
  pub text: String,
}

impl DomNode {
  /// Looks up an attribute by local name
  pub fn attribute(&self, name: &str) -> Option<&str> {
    self
      .attributes
      .iter()
      .find(|(n, _)| n == name)
      .map(|(_, v)| v.as_str())
  }
}

/// An owned, id-indexed SVG document
///
/// # Examples
///
/// ```
/// use svgscene::dom::Document;
///
/// let doc = Document::parse_str(
///   r##"<svg xmlns="http://www.w3.org/2000/svg"><rect id="r" width="10" height="10"/></svg>"##,
/// )
/// .unwrap();
/// let rect = doc.node_by_id("r").unwrap();
/// assert_eq!(doc.attribute(rect, "width"), Some("10"));
/// ```
#[derive(Debug)]
pub struct Document {
  nodes: Vec<DomNode>,
  root: DomId,
  ids: FxHashMap<String, DomId>,
}

impl Document {
  /// Parses an SVG string into an owned document
  ///
  /// # Errors
  ///
  /// Returns `ParseError::InvalidXml` when the XML is malformed and
  /// `ParseError::NotAnSvgDocument` when the root element is not `<svg>`.
  pub fn parse_str(input: &str) -> Result<Self> {
    let xml = roxmltree::Document::parse(input).map_err(|e| ParseError::InvalidXml {
      message: e.to_string(),
    })?;

    let xml_root = xml.root_element();
    if !xml_root.tag_name().name().eq_ignore_ascii_case("svg") {
      return Err(
        ParseError::NotAnSvgDocument {
          found: xml_root.tag_name().name().to_string(),
        }
        .into(),
      );
    }

    let mut doc = Self {
      nodes: Vec::new(),
      root: DomId(0),
      ids: FxHashMap::default(),
    };
    doc.convert_element(xml_root, None);
    Ok(doc)
  }

  fn convert_element(&mut self, element: roxmltree::Node<'_, '_>, parent: Option<DomId>) -> DomId {
    let id = DomId(self.nodes.len() as u32);
    let kind = ElementKind::from_tag_name(element.tag_name().name());

    let attributes = element
      .attributes()
      .map(|a| (a.name().to_string(), a.value().to_string()))
      .collect();

    let mut text = String::new();
    for child in element.children() {
      if child.is_text() {
        if let Some(t) = child.text() {
          text.push_str(t);
        }
      }
    }

    self.nodes.push(DomNode {
      kind,
      attributes,
      parent,
      children: Vec::new(),
      text,
    });

    // First occurrence of an id wins, matching reference resolution in
    // documents with duplicate ids.
    if let Some(element_id) = element.attribute("id") {
      if !element_id.is_empty() && !self.ids.contains_key(element_id) {
        self.ids.insert(element_id.to_string(), id);
      }
    }

    let mut children = Vec::new();
    for child in element.children().filter(|c| c.is_element()) {
      children.push(self.convert_element(child, Some(id)));
    }
    self.nodes[id.index()].children = children;

    id
  }

  /// The root `<svg>` element
  #[inline]
  pub fn root(&self) -> DomId {
    self.root
  }

  /// Total number of element nodes
  #[inline]
  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  /// Returns true when the document holds no nodes
  ///
  /// A successfully parsed document always has at least the root.
  #[inline]
  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  /// Borrows a node by id
  #[inline]
  pub fn get(&self, id: DomId) -> &DomNode {
    &self.nodes[id.index()]
  }

  /// Element kind of a node
  #[inline]
  pub fn kind(&self, id: DomId) -> ElementKind {
    self.nodes[id.index()].kind
  }

  /// Structural parent of a node, ignoring any build-time reparenting
  #[inline]
  pub fn parent(&self, id: DomId) -> Option<DomId> {
    self.nodes[id.index()].parent
  }

  /// Children of a node in document order
  #[inline]
  pub fn children(&self, id: DomId) -> &[DomId] {
    &self.nodes[id.index()].children
  }

  /// Looks up an attribute by local name on a node
  pub fn attribute(&self, id: DomId, name: &str) -> Option<&str> {
    self.nodes[id.index()].attribute(name)
  }

  /// Looks up a node by its `id` attribute
  pub fn node_by_id(&self, element_id: &str) -> Option<DomId> {
    self.ids.get(element_id).copied()
  }

  /// Resolves an `href`/`xlink:href` local reference on a node
  ///
  /// Only same-document fragments (`#id`) resolve; anything else is treated
  /// as a dangling reference.
  pub fn href_target(&self, id: DomId) -> Option<DomId> {
    let href = self.attribute(id, "href")?;
    let fragment = href.strip_prefix('#')?;
    self.node_by_id(fragment)
  }

  /// Concatenated direct text content of a node
  pub fn text(&self, id: DomId) -> &str {
    &self.nodes[id.index()].text
  }
}

/// Build-time parent overrides for reference instancing
///
/// While a `<use>` subtree is constructed, the referenced node's parent is
/// temporarily redirected to the `<use>` element so inherited presentation
/// attributes and owner bounds resolve against the referencing site. The
/// override table lives outside [`Document`] so a built scene tree stays
/// shareable across threads.
#[derive(Debug, Default)]
pub struct ParentOverrides {
  map: FxHashMap<DomId, DomId>,
}

impl ParentOverrides {
  /// Creates an empty override table
  pub fn new() -> Self {
    Self::default()
  }

  /// Installs an override, returning the previously installed one (if any)
  pub fn install(&mut self, node: DomId, parent: DomId) -> Option<DomId> {
    self.map.insert(node, parent)
  }

  /// Removes an override, restoring `previous` if one was displaced
  pub fn restore(&mut self, node: DomId, previous: Option<DomId>) {
    match previous {
      Some(prev) => {
        self.map.insert(node, prev);
      }
      None => {
        self.map.remove(&node);
      }
    }
  }

  /// Effective parent of a node: the override if installed, otherwise the
  /// structural parent
  pub fn parent(&self, doc: &Document, id: DomId) -> Option<DomId> {
    self.map.get(&id).copied().or_else(|| doc.parent(id))
  }

  /// Walks the effective ancestor chain looking for an attribute value
  ///
  /// Used for inherited presentation attributes (`fill`, `stroke`,
  /// `stroke-width`, ...). The walk is bounded by the arena size so a
  /// cyclic override can never loop forever.
  pub fn inherited_attribute<'a>(
    &self,
    doc: &'a Document,
    id: DomId,
    name: &str,
  ) -> Option<&'a str> {
    let mut current = Some(id);
    let mut steps = doc.len();
    while let Some(node) = current {
      if let Some(value) = doc.attribute(node, name) {
        if value != "inherit" {
          return Some(value);
        }
      }
      current = self.parent(doc, node);
      if steps == 0 {
        return None;
      }
      steps -= 1;
    }
    None
  }
}
