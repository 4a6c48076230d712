//! Scene graph node model
//!
//! Drawables live in an arena owned by the [`SceneTree`](super::SceneTree)
//! and address each other by [`NodeId`] indices. `children` expresses
//! ownership (a child's lifetime is its container's); `parent` is a
//! non-owning back-reference used for ancestor queries such as the
//! background search. Effect bindings start unset and are populated by
//! exactly one PostProcess application per node.

use crate::dom::DomId;
use crate::geometry::Rect;
use crate::paint::FillPaint;
use crate::paint::LayerPaint;
use crate::paint::RasterImage;
use crate::paint::StrokePaint;
use crate::paint::TextItem;
use crate::resolve::effects::ResolvedClip;
use std::ops::BitOr;
use std::sync::Arc;
use tiny_skia::Path;
use tiny_skia::Transform;

/// Index of a drawable within a scene tree arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
  /// Returns the raw arena index
  #[inline]
  pub fn index(self) -> usize {
    self.0 as usize
  }
}

/// Bitset of effect categories a draw traversal must skip
///
/// Carried per node from construction and OR-ed with the flags passed to
/// `draw`, so the union applies to a node and its whole subtree. The
/// filter-input recorder draws with [`IgnoreAttributes::FILTER`] to keep
/// a filter from recursively consuming its own output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IgnoreAttributes(u8);

impl IgnoreAttributes {
  /// Skip nothing
  pub const NONE: Self = Self(0);
  /// Skip clip paths
  pub const CLIP: Self = Self(1 << 0);
  /// Skip masks
  pub const MASK: Self = Self(1 << 1);
  /// Skip group opacity
  pub const OPACITY: Self = Self(1 << 2);
  /// Skip filters
  pub const FILTER: Self = Self(1 << 3);

  /// Returns true if every category in `other` is also in `self`
  #[inline]
  pub fn contains(self, other: Self) -> bool {
    self.0 & other.0 == other.0
  }

  /// Returns true if no category is set
  #[inline]
  pub fn is_empty(self) -> bool {
    self.0 == 0
  }
}

impl BitOr for IgnoreAttributes {
  type Output = Self;

  fn bitor(self, rhs: Self) -> Self {
    Self(self.0 | rhs.0)
  }
}

impl Default for IgnoreAttributes {
  fn default() -> Self {
    Self::NONE
  }
}

/// A mask bound to a node by PostProcess
///
/// The mask's own sub-tree is constructed as a container in the same
/// arena, reachable only through this binding; normal child traversal
/// never visits it.
#[derive(Debug, Clone)]
pub struct MaskBinding {
  /// The `<mask>` element this binding was resolved from
  pub mask_element: DomId,
  /// Root of the constructed mask sub-tree
  pub subtree: NodeId,
  /// Layer paint the masked content is drawn into
  pub apply: LayerPaint,
  /// Layer paint the mask sub-tree composites with (luminance-to-alpha,
  /// destination-in)
  pub compose: LayerPaint,
}

/// Variant-specific data of a drawable
#[derive(Debug)]
pub enum DrawableKind {
  /// Ordered children, drawn in construction order
  ///
  /// `content_transform` maps the children's coordinate space into the
  /// node's own space after the node clip; markers use it for their
  /// viewBox mapping.
  Container { content_transform: Option<Transform> },

  /// Leaf path geometry; `children` holds the owned marker drawables
  Path {
    path: Path,
    fill: Option<FillPaint>,
    stroke: Option<StrokePaint>,
  },

  /// Raster image content mapped into the node's viewport
  RasterImage {
    image: Arc<RasterImage>,
    content_transform: Transform,
  },

  /// Nested-fragment image content; `children` holds the instantiated
  /// fragment sub-tree
  FragmentImage { content_transform: Transform },

  /// A text run with nominal metrics
  Text { item: TextItem },
}

/// A constructed scene-graph node
///
/// Fields up to `accumulates_background` are fixed at construction; the
/// effect bindings are populated by PostProcess.
#[derive(Debug)]
pub struct Drawable {
  /// Originating document node (back-reference, never owning)
  pub element: DomId,
  /// Parent drawable, `None` for the root
  pub parent: Option<NodeId>,
  /// Owned children (container contents, or a path's markers)
  pub children: Vec<NodeId>,
  /// Variant data
  pub kind: DrawableKind,

  /// Once false, the node and its bindings are permanently inert
  pub is_drawable: bool,
  /// Local-to-parent transform
  pub transform: Transform,
  /// Bounds in parent space: the union of drawable descendants' bounds
  /// mapped through `transform` exactly once
  pub transformed_bounds: Rect,
  /// Effect categories this node and its descendants skip
  pub ignore_attributes: IgnoreAttributes,
  /// Anti-aliasing for clip paths on this node
  pub anti_alias: bool,

  /// Viewport clip in *parent* space, applied before the transform
  /// (nested viewport semantics)
  pub overflow_clip: Option<Rect>,
  /// Plain clip in the node's own space, applied after the transform
  pub clip_rect: Option<Rect>,
  /// Marks an `enable-background: new` container for background search
  pub accumulates_background: bool,

  /// Clip path bound by PostProcess
  pub clip: Option<ResolvedClip>,
  /// Mask bound by PostProcess
  pub mask: Option<MaskBinding>,
  /// Opacity layer paint bound by PostProcess
  pub opacity: Option<LayerPaint>,
  /// Filter layer paint bound by PostProcess
  pub filter: Option<LayerPaint>,
  /// Guards against double application within one PostProcess pass
  pub(crate) post_processed: bool,
}

impl Drawable {
  /// Creates a node with unset effects and empty bounds
  pub(crate) fn new(element: DomId, parent: Option<NodeId>, kind: DrawableKind) -> Self {
    Self {
      element,
      parent,
      children: Vec::new(),
      kind,
      is_drawable: false,
      transform: Transform::identity(),
      transformed_bounds: Rect::ZERO,
      ignore_attributes: IgnoreAttributes::NONE,
      anti_alias: true,
      overflow_clip: None,
      clip_rect: None,
      accumulates_background: false,
      clip: None,
      mask: None,
      opacity: None,
      filter: None,
      post_processed: false,
    }
  }

  /// Returns true for container-like variants whose children are drawn
  /// by recursion
  pub fn is_container(&self) -> bool {
    matches!(
      self.kind,
      DrawableKind::Container { .. } | DrawableKind::FragmentImage { .. }
    )
  }

  /// The transform mapping children's space into the parent's space
  ///
  /// This is the node transform with any content transform folded in;
  /// bounds and hit-testing must use it so child coordinates round-trip.
  pub fn child_transform(&self) -> Transform {
    match &self.kind {
      DrawableKind::Container {
        content_transform: Some(content),
      } => self.transform.pre_concat(*content),
      DrawableKind::FragmentImage { content_transform } => {
        self.transform.pre_concat(*content_transform)
      }
      _ => self.transform,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_ignore_attribute_union() {
    let flags = IgnoreAttributes::CLIP | IgnoreAttributes::FILTER;
    assert!(flags.contains(IgnoreAttributes::CLIP));
    assert!(flags.contains(IgnoreAttributes::FILTER));
    assert!(!flags.contains(IgnoreAttributes::MASK));
    assert!(IgnoreAttributes::NONE.is_empty());
  }

  #[test]
  fn test_new_node_has_unset_effects() {
    let node = Drawable::new(
      DomId(0),
      None,
      DrawableKind::Container {
        content_transform: None,
      },
    );
    assert!(node.clip.is_none());
    assert!(node.mask.is_none());
    assert!(node.opacity.is_none());
    assert!(node.filter.is_none());
    assert!(!node.is_drawable);
  }
}
