//! Scene tree construction and the PostProcess pass
//!
//! Construction is a recursive, depth-first, bottom-up build: containers
//! instantiate their document children through the factory, collect the
//! non-null results as owned children, and only then compute their own
//! bounds and drawability. PostProcess is a distinct second pass over the
//! finished arena, binding clip, mask, opacity and filter in that order —
//! the order matters because filter validity is resolved last and may
//! veto a node that already built geometry.
//!
//! Reference safety: a single stack of document ids guards every element
//! currently under construction, so `<use>` (and `<image>` fragment)
//! chains that reach back into themselves are refused instead of
//! recursing. Temporary reparenting during `<use>` resolution is scoped
//! by a drop guard and restored on every exit path.

use crate::dom::Document;
use crate::dom::DomId;
use crate::dom::ElementKind;
use crate::dom::ParentOverrides;
use crate::features::BuildOptions;
use crate::geometry::Point;
use crate::geometry::Rect;
use crate::paint::LayerPaint;
use crate::paint::TextItem;
use crate::resolve::attribute_length;
use crate::resolve::effects::resolve_clip_path;
use crate::resolve::effects::resolve_filter;
use crate::resolve::effects::resolve_mask_reference;
use crate::resolve::effects::resolve_opacity;
use crate::resolve::effects::FilterResolution;
use crate::resolve::image_href::resolve_image_reference;
use crate::resolve::image_href::ImageReference;
use crate::resolve::paint::anti_alias;
use crate::resolve::paint::resolve_fill;
use crate::resolve::paint::resolve_stroke;
use crate::resolve::path_data::resolve_path;
use crate::resolve::resolve_length;
use crate::resolve::transform::resolve_transform;
use crate::resolve::LengthAxis;
use crate::scene::factory;
use crate::scene::node::Drawable;
use crate::scene::node::DrawableKind;
use crate::scene::node::IgnoreAttributes;
use crate::scene::node::MaskBinding;
use crate::scene::node::NodeId;
use crate::scene::SceneTree;
use crate::viewbox::parse_aspect_ratio;
use crate::viewbox::parse_view_box;
use crate::viewbox::view_box_transform;
use log::debug;
use log::warn;
use tiny_skia::Path;
use tiny_skia::Transform;

impl SceneTree {
  /// Builds a scene tree from a parsed document
  ///
  /// The returned tree is fully post-processed and immutable; it can be
  /// drawn and hit-tested repeatedly, including concurrently with
  /// per-thread canvases. Mutating the document afterwards has no effect
  /// on an already-built tree — rebuilding is the only update path.
  pub fn build(doc: &Document, options: &BuildOptions) -> SceneTree {
    let mut builder = TreeBuilder::new(doc, options);
    let root = builder.build_root();
    builder.post_process_all();
    SceneTree {
      nodes: builder.nodes,
      root,
      viewport: builder.viewport,
    }
  }

  /// Re-runs the PostProcess pass over the whole tree
  ///
  /// Rebinding is idempotent: effects end up set-equivalent to a single
  /// application. Mask sub-trees are reused when they resolve to the
  /// same `<mask>` element.
  pub fn post_process(&mut self, doc: &Document, options: &BuildOptions) {
    let mut builder = TreeBuilder::new(doc, options);
    builder.viewport = self.viewport;
    builder.nodes = std::mem::take(&mut self.nodes);
    for node in &mut builder.nodes {
      node.post_processed = false;
    }
    builder.post_process_all();
    self.nodes = builder.nodes;
  }
}

/// Build-time state threaded through construction and PostProcess
pub(crate) struct TreeBuilder<'a> {
  doc: &'a Document,
  options: &'a BuildOptions,
  pub(crate) nodes: Vec<Drawable>,
  /// Temporary reparenting installed during `<use>` resolution
  parents: ParentOverrides,
  /// Document ids currently under construction (reference-cycle guard)
  build_stack: Vec<DomId>,
  /// Viewport rectangles for percentage resolution, innermost last
  owner_stack: Vec<Rect>,
  pub(crate) viewport: Rect,
}

impl<'a> TreeBuilder<'a> {
  pub(crate) fn new(doc: &'a Document, options: &'a BuildOptions) -> Self {
    Self {
      doc,
      options,
      nodes: Vec::new(),
      parents: ParentOverrides::new(),
      build_stack: Vec::new(),
      owner_stack: Vec::new(),
      viewport: Rect::ZERO,
    }
  }

  fn alloc(&mut self, node: Drawable) -> NodeId {
    let id = NodeId(self.nodes.len() as u32);
    self.nodes.push(node);
    id
  }

  fn node(&self, id: NodeId) -> &Drawable {
    &self.nodes[id.index()]
  }

  fn node_mut(&mut self, id: NodeId) -> &mut Drawable {
    &mut self.nodes[id.index()]
  }

  /// Innermost viewport for percentage resolution
  fn owner(&self) -> Rect {
    self.owner_stack.last().copied().unwrap_or(self.viewport)
  }

  fn visible(&self, dom: DomId) -> bool {
    !matches!(
      self.parents.inherited_attribute(self.doc, dom, "visibility"),
      Some("hidden") | Some("collapse")
    )
  }

  // ==========================================================================
  // Construction pass
  // ==========================================================================

  /// Builds the root `<svg>` viewport node
  fn build_root(&mut self) -> NodeId {
    let root_dom = self.doc.root();
    let fallback = self.options.default_viewport;
    let fallback_rect = Rect::from_xywh(0.0, 0.0, fallback.width, fallback.height);
    let width = self
      .doc
      .attribute(root_dom, "width")
      .and_then(|v| resolve_length(v, fallback_rect, LengthAxis::Horizontal))
      .unwrap_or(fallback.width);
    let height = self
      .doc
      .attribute(root_dom, "height")
      .and_then(|v| resolve_length(v, fallback_rect, LengthAxis::Vertical))
      .unwrap_or(fallback.height);
    self.viewport = Rect::from_xywh(0.0, 0.0, width, height);

    if width <= 0.0 || height <= 0.0 {
      // A zero-sized root viewport disables rendering outright.
      return self.alloc(Drawable::new(
        root_dom,
        None,
        DrawableKind::Container {
          content_transform: None,
        },
      ));
    }

    let viewport = self.viewport;
    self.build_viewport(root_dom, None, viewport)
  }

  /// Dispatches one document child through the factory
  ///
  /// Returns `None` for unknown kinds, `display: none`, failed
  /// conditional processing, and reference cycles — the parent simply
  /// omits the child.
  fn build_child(&mut self, dom: DomId, parent: Option<NodeId>) -> Option<NodeId> {
    if self.doc.attribute(dom, "display") == Some("none") {
      return None;
    }
    if !self.options.conditionals_pass(self.doc, dom) {
      return None;
    }
    let constructor = factory::constructor_for(self.doc.kind(dom))?;

    self.build_stack.push(dom);
    let built = constructor(self, dom, parent);
    self.build_stack.pop();
    built
  }

  /// Builds children for a container and derives its bounds/drawability
  fn populate_container(&mut self, id: NodeId, dom: DomId) {
    let mut children = Vec::new();
    for &child_dom in self.doc.children(dom) {
      if let Some(child) = self.build_child(child_dom, Some(id)) {
        children.push(child);
      }
    }
    self.node_mut(id).children = children;
    self.finish_container(id);
  }

  /// Computes a container's bounds as the union of its drawable
  /// children's bounds, mapped through its own transform exactly once
  fn finish_container(&mut self, id: NodeId) {
    let mut union = Rect::ZERO;
    let mut any_drawable = false;
    for &child in &self.node(id).children {
      let child_node = self.node(child);
      if child_node.is_drawable {
        any_drawable = true;
        union = union.union(child_node.transformed_bounds);
      }
    }
    let node = self.node_mut(id);
    node.transformed_bounds = union.transform(node.child_transform());
    node.is_drawable = any_drawable;
  }

  pub(crate) fn build_group(&mut self, dom: DomId, parent: Option<NodeId>) -> Option<NodeId> {
    let id = self.alloc(Drawable::new(
      dom,
      parent,
      DrawableKind::Container {
        content_transform: None,
      },
    ));
    {
      let transform = resolve_transform(self.doc, dom);
      let aa = anti_alias(self.doc, &self.parents, dom);
      let background = self
        .doc
        .attribute(dom, "enable-background")
        .is_some_and(|v| v.trim().starts_with("new"));
      let node = self.node_mut(id);
      node.transform = transform;
      node.anti_alias = aa;
      node.accumulates_background = background;
    }
    self.populate_container(id, dom);
    if !self.visible(dom) {
      self.node_mut(id).is_drawable = false;
    }
    Some(id)
  }

  /// Builds a nested `<svg>` viewport
  pub(crate) fn build_fragment(&mut self, dom: DomId, parent: Option<NodeId>) -> Option<NodeId> {
    let owner = self.owner();
    let x = attribute_length(self.doc, dom, "x", owner, LengthAxis::Horizontal, 0.0);
    let y = attribute_length(self.doc, dom, "y", owner, LengthAxis::Vertical, 0.0);
    let width = attribute_length(
      self.doc,
      dom,
      "width",
      owner,
      LengthAxis::Horizontal,
      owner.width(),
    );
    let height = attribute_length(
      self.doc,
      dom,
      "height",
      owner,
      LengthAxis::Vertical,
      owner.height(),
    );
    if width <= 0.0 || height <= 0.0 {
      return None;
    }
    Some(self.build_viewport(dom, parent, Rect::from_xywh(x, y, width, height)))
  }

  /// Shared `<svg>` viewport construction for the root and nested cases
  fn build_viewport(&mut self, dom: DomId, parent: Option<NodeId>, viewport: Rect) -> NodeId {
    let id = self.alloc(Drawable::new(
      dom,
      parent,
      DrawableKind::Container {
        content_transform: None,
      },
    ));

    let local = Rect::from_xywh(0.0, 0.0, viewport.width(), viewport.height());
    let view_box = self
      .doc
      .attribute(dom, "viewBox")
      .and_then(parse_view_box);
    let content_map = match view_box {
      Some(vb) => view_box_transform(
        vb,
        local,
        parse_aspect_ratio(self.doc.attribute(dom, "preserveAspectRatio")),
      ),
      None => Transform::identity(),
    };

    let clips = !matches!(self.doc.attribute(dom, "overflow"), Some("visible"));
    {
      let background = self
        .doc
        .attribute(dom, "enable-background")
        .is_some_and(|v| v.trim().starts_with("new"));
      let node = self.node_mut(id);
      node.transform = Transform::from_translate(viewport.x(), viewport.y()).pre_concat(content_map);
      if clips {
        node.overflow_clip = Some(viewport);
      }
      node.accumulates_background = background;
    }

    self.owner_stack.push(view_box.unwrap_or(local));
    self.populate_container(id, dom);
    self.owner_stack.pop();

    if !self.visible(dom) {
      self.node_mut(id).is_drawable = false;
    }
    id
  }

  /// Builds a shape leaf with optional markers
  pub(crate) fn build_path(&mut self, dom: DomId, parent: Option<NodeId>) -> Option<NodeId> {
    let owner = self.owner();
    let transform = resolve_transform(self.doc, dom);

    // Geometry first; a shape that resolves to nothing stays in the tree
    // but is permanently inert.
    let Some(path) = resolve_path(self.doc, dom, owner) else {
      let id = self.alloc(Drawable::new(
        dom,
        parent,
        DrawableKind::Container {
          content_transform: None,
        },
      ));
      self.node_mut(id).transform = transform;
      return Some(id);
    };

    let fill = resolve_fill(self.doc, &self.parents, dom);
    let stroke = resolve_stroke(self.doc, &self.parents, dom, owner);
    let stroke_width = stroke.as_ref().map(|s| s.stroke.width).unwrap_or(1.0);

    let mut geometry_bounds = Rect::from_skia(path.bounds());
    if stroke.is_some() {
      geometry_bounds = geometry_bounds.inflate(stroke_width / 2.0);
    }
    // Zero-area geometry (a fill-only line, an empty subpath) is inert.
    let drawable = (fill.is_some() || stroke.is_some()) && !geometry_bounds.is_empty();
    let vertices = marker_vertices(&path);
    let id = self.alloc(Drawable::new(
      dom,
      parent,
      DrawableKind::Path { path, fill, stroke },
    ));
    {
      let aa = anti_alias(self.doc, &self.parents, dom);
      let node = self.node_mut(id);
      node.transform = transform;
      node.anti_alias = aa;
    }

    if !drawable {
      // Neither fill nor stroke can be drawn: stop before marker work.
      self.node_mut(id).transformed_bounds = geometry_bounds.transform(transform);
      return Some(id);
    }

    self.build_markers(id, dom, &vertices, stroke_width);

    let mut local = geometry_bounds;
    for &marker in &self.node(id).children.clone() {
      let marker_node = self.node(marker);
      if marker_node.is_drawable {
        local = local.union(marker_node.transformed_bounds);
      }
    }
    {
      let node = self.node_mut(id);
      node.transformed_bounds = local.transform(transform);
      node.is_drawable = true;
    }
    if !self.visible(dom) {
      self.node_mut(id).is_drawable = false;
    }
    Some(id)
  }

  /// Instantiates marker drawables at a path's vertices
  fn build_markers(
    &mut self,
    path_node: NodeId,
    dom: DomId,
    vertices: &[MarkerVertex],
    stroke_width: f32,
  ) {
    if vertices.is_empty() {
      return;
    }
    let start = self.marker_target(dom, "marker-start");
    let mid = self.marker_target(dom, "marker-mid");
    let end = self.marker_target(dom, "marker-end");
    if start.is_none() && mid.is_none() && end.is_none() {
      return;
    }

    let last = vertices.len() - 1;
    let mut children = Vec::new();
    for (i, vertex) in vertices.iter().enumerate() {
      let marker = if i == 0 {
        start
      } else if i == last {
        end
      } else {
        mid
      };
      let Some(marker_dom) = marker else {
        continue;
      };
      if let Some(instance) =
        self.build_marker_instance(marker_dom, path_node, vertex, i == 0, stroke_width)
      {
        children.push(instance);
      }
    }
    self.node_mut(path_node).children = children;
  }

  fn marker_target(&self, dom: DomId, attribute: &str) -> Option<DomId> {
    let raw = self.parents.inherited_attribute(self.doc, dom, attribute)?;
    if raw.trim().eq_ignore_ascii_case("none") {
      return None;
    }
    let (fragment, _) = crate::resolve::parse_func_iri(raw)?;
    let target = self.doc.node_by_id(fragment)?;
    (self.doc.kind(target) == ElementKind::Marker).then_some(target)
  }

  fn build_marker_instance(
    &mut self,
    marker_dom: DomId,
    parent: NodeId,
    vertex: &MarkerVertex,
    is_start: bool,
    stroke_width: f32,
  ) -> Option<NodeId> {
    if self.build_stack.contains(&marker_dom) {
      warn!("refusing recursive marker reference");
      return None;
    }

    let owner = self.owner();
    let marker_width =
      attribute_length(self.doc, marker_dom, "markerWidth", owner, LengthAxis::Horizontal, 3.0);
    let marker_height =
      attribute_length(self.doc, marker_dom, "markerHeight", owner, LengthAxis::Vertical, 3.0);
    if marker_width <= 0.0 || marker_height <= 0.0 {
      return None;
    }
    let viewport = Rect::from_xywh(0.0, 0.0, marker_width, marker_height);

    let view_box = self
      .doc
      .attribute(marker_dom, "viewBox")
      .and_then(parse_view_box);
    let content_map = view_box.map(|vb| {
      view_box_transform(
        vb,
        viewport,
        parse_aspect_ratio(self.doc.attribute(marker_dom, "preserveAspectRatio")),
      )
    });

    let ref_x = attribute_length(self.doc, marker_dom, "refX", owner, LengthAxis::Horizontal, 0.0);
    let ref_y = attribute_length(self.doc, marker_dom, "refY", owner, LengthAxis::Vertical, 0.0);
    let reference = Point::new(ref_x, ref_y)
      .transform(content_map.unwrap_or_default());

    let angle = match self.doc.attribute(marker_dom, "orient") {
      Some("auto") => vertex.angle,
      Some("auto-start-reverse") => {
        if is_start {
          vertex.angle + 180.0
        } else {
          vertex.angle
        }
      }
      Some(value) => value.trim().parse::<f32>().unwrap_or(0.0),
      None => 0.0,
    };

    let scale = match self.doc.attribute(marker_dom, "markerUnits") {
      Some("userSpaceOnUse") => 1.0,
      _ => stroke_width,
    };

    let transform = Transform::from_translate(vertex.position.x, vertex.position.y)
      .pre_concat(Transform::from_rotate(angle))
      .pre_concat(Transform::from_scale(scale, scale))
      .pre_concat(Transform::from_translate(-reference.x, -reference.y));

    let id = self.alloc(Drawable::new(
      marker_dom,
      Some(parent),
      DrawableKind::Container {
        content_transform: content_map,
      },
    ));
    {
      let clips = !matches!(self.doc.attribute(marker_dom, "overflow"), Some("visible"));
      let node = self.node_mut(id);
      node.transform = transform;
      if clips {
        node.clip_rect = Some(viewport);
      }
    }

    self.build_stack.push(marker_dom);
    self.owner_stack.push(view_box.unwrap_or(viewport));
    self.populate_container(id, marker_dom);
    self.owner_stack.pop();
    self.build_stack.pop();
    Some(id)
  }

  /// Builds a `<use>` reference instance
  pub(crate) fn build_use(&mut self, dom: DomId, parent: Option<NodeId>) -> Option<NodeId> {
    let id = self.alloc(Drawable::new(
      dom,
      parent,
      DrawableKind::Container {
        content_transform: None,
      },
    ));
    self.node_mut(id).transform = resolve_transform(self.doc, dom);

    let Some(target) = self.doc.href_target(dom) else {
      debug!("dangling use reference leaves node inert");
      return Some(id);
    };
    if self.build_stack.contains(&target) {
      warn!("refusing recursive use reference");
      return Some(id);
    }

    let owner = self.owner();
    let x = attribute_length(self.doc, dom, "x", owner, LengthAxis::Horizontal, 0.0);
    let y = attribute_length(self.doc, dom, "y", owner, LengthAxis::Vertical, 0.0);

    self.with_reparented(target, dom, |builder| {
      let child = if builder.doc.kind(target) == ElementKind::Symbol {
        builder.build_symbol_instance(target, dom, id, x, y)
      } else {
        // Ordinary dispatch plus the use element's coordinate translation.
        let translated = builder
          .node(id)
          .transform
          .pre_concat(Transform::from_translate(x, y));
        builder.node_mut(id).transform = translated;
        builder.build_child(target, Some(id))
      };
      if let Some(child) = child {
        builder.node_mut(id).children = vec![child];
      }
    });

    self.finish_container(id);
    if !self.visible(dom) {
      self.node_mut(id).is_drawable = false;
    }
    Some(id)
  }

  /// Scoped temporary reparenting with guaranteed restoration
  fn with_reparented<F>(&mut self, node: DomId, new_parent: DomId, f: F)
  where
    F: FnOnce(&mut Self),
  {
    struct Scope<'b, 'a> {
      builder: &'b mut TreeBuilder<'a>,
      node: DomId,
      previous: Option<DomId>,
    }
    impl Drop for Scope<'_, '_> {
      fn drop(&mut self) {
        self.builder.parents.restore(self.node, self.previous);
      }
    }

    let previous = self.parents.install(node, new_parent);
    let scope = Scope {
      builder: self,
      node,
      previous,
    };
    f(&mut *scope.builder);
  }

  /// Builds a `<symbol>` instance under a `<use>`
  fn build_symbol_instance(
    &mut self,
    symbol_dom: DomId,
    use_dom: DomId,
    parent: NodeId,
    x: f32,
    y: f32,
  ) -> Option<NodeId> {
    let owner = self.owner();
    let width = attribute_length(
      self.doc,
      use_dom,
      "width",
      owner,
      LengthAxis::Horizontal,
      owner.width(),
    );
    let height = attribute_length(
      self.doc,
      use_dom,
      "height",
      owner,
      LengthAxis::Vertical,
      owner.height(),
    );
    if width <= 0.0 || height <= 0.0 {
      return None;
    }
    let viewport = Rect::from_xywh(x, y, width, height);
    let local = Rect::from_xywh(0.0, 0.0, width, height);

    let view_box = self
      .doc
      .attribute(symbol_dom, "viewBox")
      .and_then(parse_view_box);
    let content_map = match view_box {
      Some(vb) => view_box_transform(
        vb,
        local,
        parse_aspect_ratio(self.doc.attribute(symbol_dom, "preserveAspectRatio")),
      ),
      None => Transform::identity(),
    };

    let id = self.alloc(Drawable::new(
      symbol_dom,
      Some(parent),
      DrawableKind::Container {
        content_transform: None,
      },
    ));
    {
      let clips = !matches!(self.doc.attribute(symbol_dom, "overflow"), Some("visible"));
      let node = self.node_mut(id);
      node.transform = Transform::from_translate(x, y).pre_concat(content_map);
      if clips {
        node.overflow_clip = Some(viewport);
      }
    }

    self.build_stack.push(symbol_dom);
    self.owner_stack.push(view_box.unwrap_or(local));
    self.populate_container(id, symbol_dom);
    self.owner_stack.pop();
    self.build_stack.pop();
    Some(id)
  }

  /// Builds a `<switch>`: the first structurally-known child passing all
  /// three conditional predicates is instantiated; the rest never exist
  pub(crate) fn build_switch(&mut self, dom: DomId, parent: Option<NodeId>) -> Option<NodeId> {
    let id = self.alloc(Drawable::new(
      dom,
      parent,
      DrawableKind::Container {
        content_transform: None,
      },
    ));
    self.node_mut(id).transform = resolve_transform(self.doc, dom);

    for &child_dom in self.doc.children(dom) {
      if !self.doc.kind(child_dom).is_switch_candidate() {
        continue;
      }
      if !self.options.conditionals_pass(self.doc, child_dom) {
        continue;
      }
      if let Some(child) = self.build_child(child_dom, Some(id)) {
        self.node_mut(id).children = vec![child];
      }
      break;
    }

    self.finish_container(id);
    if !self.visible(dom) {
      self.node_mut(id).is_drawable = false;
    }
    Some(id)
  }

  /// Builds an `<image>`: raster or nested fragment, never both
  pub(crate) fn build_image(&mut self, dom: DomId, parent: Option<NodeId>) -> Option<NodeId> {
    let owner = self.owner();
    let x = attribute_length(self.doc, dom, "x", owner, LengthAxis::Horizontal, 0.0);
    let y = attribute_length(self.doc, dom, "y", owner, LengthAxis::Vertical, 0.0);
    let width = attribute_length(self.doc, dom, "width", owner, LengthAxis::Horizontal, 0.0);
    let height = attribute_length(self.doc, dom, "height", owner, LengthAxis::Vertical, 0.0);

    let transform = resolve_transform(self.doc, dom);
    let inert = |builder: &mut Self| {
      let id = builder.alloc(Drawable::new(
        dom,
        parent,
        DrawableKind::Container {
          content_transform: None,
        },
      ));
      builder.node_mut(id).transform = transform;
      Some(id)
    };

    if width <= 0.0 || height <= 0.0 {
      return inert(self);
    }
    let viewport = Rect::from_xywh(x, y, width, height);
    let ratio = parse_aspect_ratio(self.doc.attribute(dom, "preserveAspectRatio"));

    let id = match resolve_image_reference(self.doc, dom) {
      Some(ImageReference::Raster(image)) => {
        let content = Rect::from_xywh(0.0, 0.0, image.width() as f32, image.height() as f32);
        if content.is_empty() {
          return inert(self);
        }
        let content_transform = view_box_transform(content, viewport, ratio);
        let id = self.alloc(Drawable::new(
          dom,
          parent,
          DrawableKind::RasterImage {
            image,
            content_transform,
          },
        ));
        self.node_mut(id).is_drawable = true;
        id
      }
      Some(ImageReference::Fragment(fragment)) => {
        if self.build_stack.contains(&fragment) {
          warn!("refusing recursive image fragment reference");
          return inert(self);
        }
        let id = self.alloc(Drawable::new(
          dom,
          parent,
          DrawableKind::FragmentImage {
            content_transform: Transform::identity(),
          },
        ));
        let child = self.build_child(fragment, Some(id));
        let Some(child) = child else {
          return Some(id);
        };
        let content = self.node(child).transformed_bounds;
        let content_transform = if content.is_empty() {
          Transform::identity()
        } else {
          view_box_transform(content, viewport, ratio)
        };
        {
          let drawable = self.node(child).is_drawable;
          let node = self.node_mut(id);
          node.children = vec![child];
          node.kind = DrawableKind::FragmentImage { content_transform };
          node.is_drawable = drawable;
        }
        id
      }
      None => return inert(self),
    };

    {
      let node = self.node_mut(id);
      node.transform = transform;
      node.clip_rect = Some(viewport);
      node.transformed_bounds = viewport.transform(transform);
    }
    if !self.visible(dom) {
      self.node_mut(id).is_drawable = false;
    }
    Some(id)
  }

  /// Builds a text leaf with nominal advance-based metrics
  pub(crate) fn build_text(&mut self, dom: DomId, parent: Option<NodeId>) -> Option<NodeId> {
    let owner = self.owner();
    let x = attribute_length(self.doc, dom, "x", owner, LengthAxis::Horizontal, 0.0);
    let y = attribute_length(self.doc, dom, "y", owner, LengthAxis::Vertical, 0.0);
    let font_size = self
      .parents
      .inherited_attribute(self.doc, dom, "font-size")
      .and_then(|v| resolve_length(v, owner, LengthAxis::Vertical))
      .unwrap_or(16.0);

    let mut text = String::new();
    collect_text(self.doc, dom, &mut text);
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");

    let fill = resolve_fill(self.doc, &self.parents, dom);
    let drawable = !text.is_empty() && fill.is_some();
    let color = fill
      .map(|f| f.color)
      .unwrap_or(tiny_skia::Color::BLACK);

    let item = TextItem {
      text: text.clone(),
      origin: Point::new(x, y),
      font_size,
      color,
    };
    let id = self.alloc(Drawable::new(dom, parent, DrawableKind::Text { item }));
    {
      let transform = resolve_transform(self.doc, dom);
      // Nominal metrics: half-em advance per character, one em tall.
      let bounds = Rect::from_xywh(
        x,
        y - 0.8 * font_size,
        0.5 * font_size * text.chars().count() as f32,
        font_size,
      );
      let node = self.node_mut(id);
      node.transform = transform;
      node.transformed_bounds = bounds.transform(transform);
      node.is_drawable = drawable;
    }
    if !self.visible(dom) {
      self.node_mut(id).is_drawable = false;
    }
    Some(id)
  }

  // ==========================================================================
  // PostProcess pass
  // ==========================================================================

  /// Binds effects for every node in arena (document) order
  pub(crate) fn post_process_all(&mut self) {
    let mut mask_stack = Vec::new();
    let mut index = 0;
    while index < self.nodes.len() {
      self.post_process_node(NodeId(index as u32), &mut mask_stack);
      index += 1;
    }
  }

  /// Binds clip, mask, opacity and filter — in that order — for one node
  fn post_process_node(&mut self, id: NodeId, mask_stack: &mut Vec<DomId>) {
    if self.node(id).post_processed || !self.node(id).is_drawable {
      return;
    }
    self.node_mut(id).post_processed = true;

    let element = self.node(id).element;
    let bounds = self.node(id).transformed_bounds;
    let ignore = self.node(id).ignore_attributes;

    // (1) clip path, resolved against the node's own transformed bounds;
    // only nodes bearing renderable geometry get one.
    if !ignore.contains(IgnoreAttributes::CLIP) && !bounds.is_empty() {
      self.nodes[id.index()].clip = resolve_clip_path(self.doc, &self.parents, element, bounds);
    }

    // (2) mask
    if !ignore.contains(IgnoreAttributes::MASK) {
      self.bind_mask(id, element, mask_stack);
    }

    // (3) opacity
    if !ignore.contains(IgnoreAttributes::OPACITY) {
      self.nodes[id.index()].opacity =
        resolve_opacity(self.doc, element).map(LayerPaint::opacity);
    }

    // (4) filter, last: it can veto drawability after the fact.
    if !ignore.contains(IgnoreAttributes::FILTER) {
      match resolve_filter(self.doc, element) {
        FilterResolution::Absent => self.nodes[id.index()].filter = None,
        FilterResolution::Resolved(spec) => {
          self.nodes[id.index()].filter = Some(LayerPaint::filter(spec));
        }
        FilterResolution::Invalid => {
          warn!("invalid filter reference makes node non-drawable");
          let node = self.node_mut(id);
          node.filter = None;
          node.is_drawable = false;
        }
      }
    }
  }

  fn bind_mask(&mut self, id: NodeId, element: DomId, mask_stack: &mut Vec<DomId>) {
    let Some(mask_dom) = resolve_mask_reference(self.doc, element) else {
      self.node_mut(id).mask = None;
      return;
    };
    if mask_stack.contains(&mask_dom) {
      debug!("refusing recursive mask reference");
      self.node_mut(id).mask = None;
      return;
    }

    // Reuse the sub-tree when rebinding resolves to the same element.
    let subtree = match &self.node(id).mask {
      Some(existing) if existing.mask_element == mask_dom => existing.subtree,
      _ => self.build_mask_subtree(mask_dom, id),
    };

    mask_stack.push(mask_dom);
    self.post_process_subtree(subtree, mask_stack);
    mask_stack.pop();

    self.node_mut(id).mask = Some(MaskBinding {
      mask_element: mask_dom,
      subtree,
      apply: LayerPaint::mask_apply(),
      compose: LayerPaint::mask_compose(),
    });
  }

  /// Constructs the referenced `<mask>`'s content as a container
  ///
  /// The sub-tree lives in the same arena but is reachable only through
  /// the owning node's mask binding.
  fn build_mask_subtree(&mut self, mask_dom: DomId, owner: NodeId) -> NodeId {
    let id = self.alloc(Drawable::new(
      mask_dom,
      Some(owner),
      DrawableKind::Container {
        content_transform: None,
      },
    ));
    self.owner_stack.push(self.viewport);
    self.populate_container(id, mask_dom);
    self.owner_stack.pop();
    id
  }

  fn post_process_subtree(&mut self, id: NodeId, mask_stack: &mut Vec<DomId>) {
    self.post_process_node(id, mask_stack);
    for child in self.node(id).children.clone() {
      self.post_process_subtree(child, mask_stack);
    }
  }
}

/// A marker attachment point on a path
#[derive(Debug, Clone, Copy)]
struct MarkerVertex {
  position: Point,
  /// Tangent direction in degrees
  angle: f32,
}

/// Extracts marker vertices and tangent angles from path geometry
fn marker_vertices(path: &Path) -> Vec<MarkerVertex> {
  use tiny_skia::PathSegment;

  let mut vertices: Vec<MarkerVertex> = Vec::new();
  let mut previous: Option<Point> = None;

  let mut push = |position: Point, from: Option<Point>| {
    let angle = from
      .map(|p| (position.y - p.y).atan2(position.x - p.x).to_degrees())
      .unwrap_or(0.0);
    vertices.push(MarkerVertex { position, angle });
  };

  for segment in path.segments() {
    match segment {
      PathSegment::MoveTo(p) => {
        let position = Point::new(p.x, p.y);
        push(position, None);
        previous = Some(position);
      }
      PathSegment::LineTo(p) => {
        let position = Point::new(p.x, p.y);
        push(position, previous);
        previous = Some(position);
      }
      PathSegment::QuadTo(ctrl, p) => {
        let position = Point::new(p.x, p.y);
        push(position, Some(Point::new(ctrl.x, ctrl.y)));
        previous = Some(position);
      }
      PathSegment::CubicTo(_, ctrl2, p) => {
        let position = Point::new(p.x, p.y);
        push(position, Some(Point::new(ctrl2.x, ctrl2.y)));
        previous = Some(position);
      }
      PathSegment::Close => {}
    }
  }

  // The start vertex points along the first outgoing segment.
  if vertices.len() >= 2 {
    vertices[0].angle = vertices[1].angle;
  }
  vertices
}

fn collect_text(doc: &Document, dom: DomId, out: &mut String) {
  out.push_str(doc.text(dom));
  for &child in doc.children(dom) {
    if doc.kind(child) == ElementKind::TextSpan {
      collect_text(doc, child, out);
    }
  }
}
