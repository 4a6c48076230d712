//! The draw-time canvas protocol
//!
//! Every node draws as one fixed, order-significant sequence of canvas
//! operations, symmetric around the variant-specific content:
//!
//! 1. bail out when inert or when the `until` sentinel is reached
//! 2. save state
//! 3. viewport overflow clip (parent space)
//! 4. replace the canvas transform with the concatenation of the current
//!    total and this node's transform
//! 5. plain clip rect (node space)
//! 6. clip path
//! 7. mask "apply" layer
//! 8. opacity layer
//! 9. filter layer
//! 10. variant content
//! 11–12. close filter, then opacity
//! 13. mask: open the "compose" layer, draw the mask sub-tree, close it,
//!     then close the "apply" layer
//! 14. restore state
//!
//! The nesting is load-bearing: the mask is drawn *after* the masked
//! content but composited destination-in against it, so mask handling
//! wraps two layers where opacity and filter wrap one each. Reaching the
//! `until` node stops the remainder of the traversal, which is what lets
//! the background recorder render "everything before this node".

use crate::geometry::Rect;
use crate::paint::canvas::Canvas;
use crate::scene::node::DrawableKind;
use crate::scene::node::IgnoreAttributes;
use crate::scene::node::NodeId;
use crate::scene::SceneTree;

impl SceneTree {
  /// Draws the whole tree onto a canvas
  ///
  /// `ignore` skips whole effect categories for this traversal; `until`
  /// stops the traversal just before the given node draws.
  pub fn draw(&self, canvas: &mut dyn Canvas, ignore: IgnoreAttributes, until: Option<NodeId>) {
    self.draw_node(self.root, canvas, ignore, until);
  }

  /// Draws one node's full sequence; returns false once `until` is hit
  pub(crate) fn draw_node(
    &self,
    id: NodeId,
    canvas: &mut dyn Canvas,
    inherited: IgnoreAttributes,
    until: Option<NodeId>,
  ) -> bool {
    if until == Some(id) {
      return false;
    }
    let node = &self[id];
    if !node.is_drawable {
      return true;
    }
    let ignore = inherited | node.ignore_attributes;

    canvas.save();

    if let Some(viewport) = node.overflow_clip {
      canvas.clip_rect(viewport);
    }

    // Replace, don't push: the canvas matrix becomes the concatenation of
    // the current total transform and this node's local transform.
    let total = canvas.transform().pre_concat(node.transform);
    canvas.set_transform(total);

    if let Some(rect) = node.clip_rect {
      canvas.clip_rect(rect);
    }

    if !ignore.contains(IgnoreAttributes::CLIP) {
      if let Some(clip) = &node.clip {
        match &clip.path {
          Some(path) => canvas.clip_path(path, clip.rule, node.anti_alias),
          // An empty clip region excludes everything.
          None => canvas.clip_rect(Rect::ZERO),
        }
      }
    }

    let mask = node
      .mask
      .as_ref()
      .filter(|_| !ignore.contains(IgnoreAttributes::MASK));
    if let Some(binding) = mask {
      canvas.push_layer(&binding.apply);
    }

    let opacity = node
      .opacity
      .as_ref()
      .filter(|_| !ignore.contains(IgnoreAttributes::OPACITY));
    if let Some(paint) = opacity {
      canvas.push_layer(paint);
    }

    let filter = node
      .filter
      .as_ref()
      .filter(|_| !ignore.contains(IgnoreAttributes::FILTER));
    if let Some(paint) = filter {
      canvas.push_layer(paint);
    }

    let mut proceed = self.on_draw(id, canvas, ignore, until);

    if filter.is_some() {
      canvas.pop_layer();
    }
    if opacity.is_some() {
      canvas.pop_layer();
    }

    if let Some(binding) = mask {
      canvas.push_layer(&binding.compose);
      proceed &= self.draw_node(binding.subtree, canvas, ignore, until);
      canvas.pop_layer();
      canvas.pop_layer();
    }

    canvas.restore();
    proceed
  }

  /// Variant-specific content drawing
  fn on_draw(
    &self,
    id: NodeId,
    canvas: &mut dyn Canvas,
    ignore: IgnoreAttributes,
    until: Option<NodeId>,
  ) -> bool {
    let node = &self[id];
    match &node.kind {
      DrawableKind::Container { content_transform } => {
        if let Some(content) = content_transform {
          canvas.save();
          let total = canvas.transform().pre_concat(*content);
          canvas.set_transform(total);
        }
        let proceed = self.draw_children(id, canvas, ignore, until);
        if content_transform.is_some() {
          canvas.restore();
        }
        proceed
      }

      DrawableKind::Path { path, fill, stroke } => {
        canvas.draw_path(path, fill.as_ref(), stroke.as_ref());
        // Markers draw over their path.
        self.draw_children(id, canvas, ignore, until)
      }

      DrawableKind::RasterImage {
        image,
        content_transform,
      } => {
        canvas.save();
        let total = canvas.transform().pre_concat(*content_transform);
        canvas.set_transform(total);
        canvas.draw_image(image);
        canvas.restore();
        true
      }

      DrawableKind::FragmentImage { content_transform } => {
        canvas.save();
        let total = canvas.transform().pre_concat(*content_transform);
        canvas.set_transform(total);
        let proceed = self.draw_children(id, canvas, ignore, until);
        canvas.restore();
        proceed
      }

      DrawableKind::Text { item } => {
        canvas.draw_text(item);
        true
      }
    }
  }

  fn draw_children(
    &self,
    id: NodeId,
    canvas: &mut dyn Canvas,
    ignore: IgnoreAttributes,
    until: Option<NodeId>,
  ) -> bool {
    for &child in &self[id].children {
      if !self.draw_node(child, canvas, ignore, until) {
        return false;
      }
    }
    true
  }
}
