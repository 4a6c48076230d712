//! The scene graph: construction, effects, drawing and hit-testing
//!
//! A [`SceneTree`] is the central artifact of this crate. It is built
//! once from a parsed [`Document`](crate::dom::Document) in two phases
//! (geometry/bounds construction, then the PostProcess effect-binding
//! pass) and is immutable afterwards: rendering and hit-testing are
//! read-only traversals, safe to repeat and to run concurrently with
//! per-thread canvases.
//!
//! Nodes live in an arena addressed by [`NodeId`] indices; every backend
//! resource a node owns (paths, layer paints, raster images, recorded
//! sub-trees) is dropped with the arena, containers before nothing and
//! after everything they own.

pub mod build;
pub mod draw;
pub mod factory;
pub mod node;
pub mod record;

pub use node::Drawable;
pub use node::DrawableKind;
pub use node::IgnoreAttributes;
pub use node::MaskBinding;
pub use node::NodeId;

use crate::geometry::Rect;
use std::ops::Index;

/// An immutable-after-construction drawable tree
#[derive(Debug)]
pub struct SceneTree {
  pub(crate) nodes: Vec<node::Drawable>,
  pub(crate) root: NodeId,
  pub(crate) viewport: Rect,
}

impl SceneTree {
  /// The root viewport node
  #[inline]
  pub fn root(&self) -> NodeId {
    self.root
  }

  /// The root viewport rectangle in user space
  #[inline]
  pub fn viewport(&self) -> Rect {
    self.viewport
  }

  /// Total number of nodes in the arena, mask sub-trees included
  #[inline]
  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  /// Returns true when the arena holds no nodes
  #[inline]
  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  /// Borrows a node by id
  #[inline]
  pub fn get(&self, id: NodeId) -> &node::Drawable {
    &self.nodes[id.index()]
  }

  /// Iterates all node ids in arena order
  pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
    (0..self.nodes.len() as u32).map(NodeId)
  }
}

impl Index<NodeId> for SceneTree {
  type Output = node::Drawable;

  #[inline]
  fn index(&self, id: NodeId) -> &node::Drawable {
    &self.nodes[id.index()]
  }
}
