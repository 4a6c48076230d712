//! Filter-input recording
//!
//! A filter needs "the graphic this element would have produced" as a
//! source image, and sometimes the accumulated backdrop behind it. Both
//! are captured by replaying the normal draw protocol into a
//! [`RecordingCanvas`] instead of a rasterizer:
//!
//! - [`SceneTree::record_graphic`] records the node's own full draw
//!   sequence, with filters skipped so the filter never consumes its own
//!   output;
//! - [`SceneTree::record_background`] walks up to the nearest ancestor
//!   flagged `enable-background: new` and records *that* node's sequence
//!   with the requesting node as the `until` sentinel, producing
//!   everything drawn before it.

use crate::paint::Picture;
use crate::paint::RecordingCanvas;
use crate::scene::node::IgnoreAttributes;
use crate::scene::node::NodeId;
use crate::scene::SceneTree;

impl SceneTree {
  /// Records the picture this node would draw, for use as filter input
  ///
  /// Returns `None` when the node's bounds are degenerate — a zero-area
  /// recording has no pixels to offer a filter.
  pub fn record_graphic(&self, id: NodeId) -> Option<Picture> {
    let bounds = self[id].transformed_bounds;
    if bounds.is_empty() {
      return None;
    }
    let mut recorder = RecordingCanvas::new(bounds);
    self.draw_node(id, &mut recorder, IgnoreAttributes::FILTER, None);
    Some(recorder.finish())
  }

  /// Records the accumulated background behind this node
  ///
  /// Searches up the parent chain for the nearest container that
  /// accumulates a background image and records its draw sequence,
  /// stopping just before this node so the requester never sees itself.
  pub fn record_background(&self, id: NodeId) -> Option<Picture> {
    let ancestor = self.background_ancestor(id)?;
    let bounds = self[ancestor].transformed_bounds;
    if bounds.is_empty() {
      return None;
    }
    let mut recorder = RecordingCanvas::new(bounds);
    self.draw_node(ancestor, &mut recorder, IgnoreAttributes::FILTER, Some(id));
    Some(recorder.finish())
  }

  /// The nearest ancestor flagged to accumulate a background image
  pub fn background_ancestor(&self, id: NodeId) -> Option<NodeId> {
    let mut current = self[id].parent;
    while let Some(ancestor) = current {
      if self[ancestor].accumulates_background {
        return Some(ancestor);
      }
      current = self[ancestor].parent;
    }
    None
  }
}
