//! Construction and PostProcess properties of the scene tree.

use svgscene::dom::Document;
use svgscene::features::BuildOptions;
use svgscene::geometry::Rect;
use svgscene::scene::DrawableKind;
use svgscene::scene::NodeId;
use svgscene::scene::SceneTree;

fn build(svg: &str) -> (Document, SceneTree) {
  let doc = Document::parse_str(svg).unwrap();
  let tree = SceneTree::build(&doc, &BuildOptions::default());
  (doc, tree)
}

/// Finds the scene node built from the element with the given id.
fn node_for<'a>(doc: &Document, tree: &'a SceneTree, id: &str) -> Option<NodeId> {
  let dom = doc.node_by_id(id)?;
  tree.node_ids().find(|&n| tree[n].element == dom)
}

fn approx(a: Rect, b: Rect) -> bool {
  (a.x() - b.x()).abs() < 1e-3
    && (a.y() - b.y()).abs() < 1e-3
    && (a.width() - b.width()).abs() < 1e-3
    && (a.height() - b.height()).abs() < 1e-3
}

#[test]
fn container_bounds_are_transformed_union_of_drawable_children() {
  let (doc, tree) = build(
    r##"<svg xmlns="http://www.w3.org/2000/svg" width="200" height="200">
      <g id="layer" transform="translate(10 20)">
        <rect x="0" y="0" width="10" height="10" fill="red"/>
        <rect x="30" y="5" width="10" height="10" fill="blue"/>
        <rect x="90" y="90" width="10" height="10" fill="none"/>
      </g>
    </svg>"##,
  );
  let layer = node_for(&doc, &tree, "layer").unwrap();
  let node = &tree[layer];

  // The unpainted rect is not drawable and must not contribute.
  assert!(approx(
    node.transformed_bounds,
    Rect::from_xywh(10.0, 20.0, 40.0, 15.0)
  ));

  // Property: bounds equal the transform-mapped union of the current
  // drawable children's bounds.
  let mut union = Rect::ZERO;
  for &child in &node.children {
    if tree[child].is_drawable {
      union = union.union(tree[child].transformed_bounds);
    }
  }
  assert!(approx(node.transformed_bounds, union.transform(node.transform)));
}

#[test]
fn empty_container_has_empty_bounds_and_is_inert() {
  let (doc, tree) = build(
    r##"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100">
      <g id="empty"/>
    </svg>"##,
  );
  let empty = node_for(&doc, &tree, "empty").unwrap();
  assert!(tree[empty].transformed_bounds.is_empty());
  assert!(!tree[empty].is_drawable);
}

#[test]
fn use_of_self_is_refused_without_recursion() {
  let (doc, tree) = build(
    r##"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100">
      <use id="loop" href="#loop"/>
      <rect id="ok" width="10" height="10" fill="red"/>
    </svg>"##,
  );
  let looped = node_for(&doc, &tree, "loop").unwrap();
  assert!(!tree[looped].is_drawable);
  assert!(tree[looped].children.is_empty());
  // Siblings are unaffected.
  let ok = node_for(&doc, &tree, "ok").unwrap();
  assert!(tree[ok].is_drawable);
}

#[test]
fn use_of_own_ancestor_is_refused_without_recursion() {
  let (doc, tree) = build(
    r##"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100">
      <g id="outer">
        <rect width="5" height="5" fill="red"/>
        <use id="backref" href="#outer"/>
      </g>
    </svg>"##,
  );
  let backref = node_for(&doc, &tree, "backref").unwrap();
  assert!(!tree[backref].is_drawable);
  assert!(tree[backref].children.is_empty());

  let outer = node_for(&doc, &tree, "outer").unwrap();
  assert!(tree[outer].is_drawable);
}

#[test]
fn use_chain_cycle_terminates() {
  let (doc, tree) = build(
    r##"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100">
      <g id="a"><use id="to-b" href="#b"/></g>
      <g id="b"><use id="to-a" href="#a"/></g>
    </svg>"##,
  );
  // Build terminated; somewhere along the chain the cycle was cut.
  let a = node_for(&doc, &tree, "a").unwrap();
  assert!(!tree[a].is_drawable);
}

#[test]
fn dangling_use_is_inert_not_an_error() {
  let (doc, tree) = build(
    r##"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100">
      <use id="ghost" href="#nothing"/>
    </svg>"##,
  );
  let ghost = node_for(&doc, &tree, "ghost").unwrap();
  assert!(!tree[ghost].is_drawable);
}

#[test]
fn use_instantiates_symbol_with_viewport_scaling() {
  let (doc, tree) = build(
    r##"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100">
      <symbol id="icon" viewBox="0 0 10 10">
        <rect width="10" height="10" fill="red"/>
      </symbol>
      <use id="instance" href="#icon" x="20" y="20" width="40" height="40"/>
    </svg>"##,
  );
  let instance = node_for(&doc, &tree, "instance").unwrap();
  assert!(tree[instance].is_drawable);
  // The 10x10 symbol content fills the 40x40 viewport at (20, 20).
  assert!(approx(
    tree[instance].transformed_bounds,
    Rect::from_xywh(20.0, 20.0, 40.0, 40.0)
  ));
}

#[test]
fn two_builds_are_identical() {
  let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" width="120" height="80">
    <defs><clipPath id="c"><rect width="60" height="60"/></clipPath></defs>
    <g clip-path="url(#c)" opacity="0.5">
      <rect width="40" height="40" fill="red"/>
      <circle cx="50" cy="50" r="10" fill="blue" transform="rotate(15)"/>
    </g>
    <use href="#missing"/>
  </svg>"##;
  let doc = Document::parse_str(svg).unwrap();
  let options = BuildOptions::default();
  let first = SceneTree::build(&doc, &options);
  let second = SceneTree::build(&doc, &options);

  assert_eq!(first.len(), second.len());
  for (a, b) in first.node_ids().zip(second.node_ids()) {
    assert_eq!(first[a].is_drawable, second[b].is_drawable);
    assert_eq!(first[a].transformed_bounds, second[b].transformed_bounds);
  }
}

#[test]
fn post_process_twice_is_set_equivalent() {
  let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100">
    <defs>
      <clipPath id="c"><rect width="50" height="50"/></clipPath>
      <mask id="m"><rect width="100" height="100" fill="white"/></mask>
      <filter id="f"><feGaussianBlur stdDeviation="2"/></filter>
    </defs>
    <rect id="r" clip-path="url(#c)" mask="url(#m)" opacity="0.5" filter="url(#f)"
          width="80" height="80" fill="red"/>
  </svg>"##;
  let doc = Document::parse_str(svg).unwrap();
  let options = BuildOptions::default();
  let mut tree = SceneTree::build(&doc, &options);

  let r = node_for(&doc, &tree, "r").unwrap();
  let before_opacity = tree[r].opacity.clone();
  let before_filter = tree[r].filter.clone();
  let before_mask_element = tree[r].mask.as_ref().unwrap().mask_element;
  let before_len = tree.len();

  tree.post_process(&doc, &options);

  assert_eq!(tree[r].opacity, before_opacity);
  assert_eq!(tree[r].filter, before_filter);
  assert!(tree[r].clip.is_some());
  let mask = tree[r].mask.as_ref().unwrap();
  assert_eq!(mask.mask_element, before_mask_element);
  // The mask sub-tree was reused, not duplicated.
  assert_eq!(tree.len(), before_len);
}

#[test]
fn invalid_filter_vetoes_drawability_late() {
  let (doc, tree) = build(
    r##"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100">
      <rect id="vetoed" filter="url(#missing)" width="10" height="10" fill="red"/>
      <rect id="kept" width="10" height="10" fill="red"/>
    </svg>"##,
  );
  let vetoed = node_for(&doc, &tree, "vetoed").unwrap();
  assert!(!tree[vetoed].is_drawable);
  // Geometry was already built before the veto.
  assert!(matches!(tree[vetoed].kind, DrawableKind::Path { .. }));
  assert!(!tree[vetoed].transformed_bounds.is_empty());

  let kept = node_for(&doc, &tree, "kept").unwrap();
  assert!(tree[kept].is_drawable);
}

#[test]
fn dangling_clip_and_mask_resolve_to_absent() {
  let (doc, tree) = build(
    r##"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100">
      <rect id="r" clip-path="url(#nope)" mask="url(#nada)" width="10" height="10" fill="red"/>
    </svg>"##,
  );
  let r = node_for(&doc, &tree, "r").unwrap();
  assert!(tree[r].is_drawable);
  assert!(tree[r].clip.is_none());
  assert!(tree[r].mask.is_none());
}

#[test]
fn degenerate_geometry_is_not_drawable() {
  let (doc, tree) = build(
    r##"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100">
      <rect id="flat" width="0" height="10" fill="red"/>
      <circle id="dot" r="0" fill="red"/>
    </svg>"##,
  );
  for id in ["flat", "dot"] {
    let node = node_for(&doc, &tree, id).unwrap();
    assert!(!tree[node].is_drawable, "{id} should be inert");
  }
}

#[test]
fn unpainted_shape_is_not_drawable_but_exists() {
  let (doc, tree) = build(
    r##"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100">
      <rect id="r" width="10" height="10" fill="none"/>
    </svg>"##,
  );
  let r = node_for(&doc, &tree, "r").unwrap();
  assert!(!tree[r].is_drawable);
  assert!(matches!(tree[r].kind, DrawableKind::Path { .. }));
}

#[test]
fn switch_takes_first_passing_child() {
  let (doc, tree) = build(
    r##"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100">
      <switch id="s">
        <rect id="gated" requiredFeatures="http://example.com/feature#Unsupported"
              width="10" height="10" fill="red"/>
        <rect id="chosen" width="20" height="20" fill="blue"/>
        <rect id="never" width="30" height="30" fill="green"/>
      </switch>
    </svg>"##,
  );
  let switch = node_for(&doc, &tree, "s").unwrap();
  assert_eq!(tree[switch].children.len(), 1);

  // Skipped and trailing children were never constructed.
  assert!(node_for(&doc, &tree, "gated").is_none());
  assert!(node_for(&doc, &tree, "never").is_none());
  let chosen = node_for(&doc, &tree, "chosen").unwrap();
  assert!(tree[chosen].is_drawable);
}

#[test]
fn switch_with_no_match_is_not_drawable() {
  let (doc, tree) = build(
    r##"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100">
      <switch id="s">
        <rect requiredExtensions="http://example.com/ext" width="10" height="10" fill="red"/>
        <rect systemLanguage="zz" width="10" height="10" fill="red"/>
      </switch>
    </svg>"##,
  );
  let switch = node_for(&doc, &tree, "s").unwrap();
  assert!(!tree[switch].is_drawable);
  assert!(tree[switch].children.is_empty());
}

#[test]
fn switch_honors_language_override() {
  let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100">
    <switch id="s">
      <rect id="french" systemLanguage="fr" width="10" height="10" fill="red"/>
      <rect id="english" systemLanguage="en" width="10" height="10" fill="blue"/>
    </switch>
  </svg>"##;
  let doc = Document::parse_str(svg).unwrap();
  let mut options = BuildOptions::default();
  options.language = "fr-FR".to_string();
  let tree = SceneTree::build(&doc, &options);
  assert!(node_for(&doc, &tree, "french").is_some());
  assert!(node_for(&doc, &tree, "english").is_none());
}

#[test]
fn display_none_prunes_subtree() {
  let (doc, tree) = build(
    r##"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100">
      <g id="gone" display="none"><rect id="inner" width="10" height="10" fill="red"/></g>
    </svg>"##,
  );
  assert!(node_for(&doc, &tree, "gone").is_none());
  assert!(node_for(&doc, &tree, "inner").is_none());
}

#[test]
fn visibility_hidden_keeps_children_but_not_drawable() {
  let (doc, tree) = build(
    r##"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100">
      <rect id="hidden" visibility="hidden" width="10" height="10" fill="red"/>
    </svg>"##,
  );
  let hidden = node_for(&doc, &tree, "hidden").unwrap();
  assert!(!tree[hidden].is_drawable);
}

#[test]
fn mask_subtree_is_outside_normal_children() {
  let (doc, tree) = build(
    r##"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100">
      <mask id="m"><rect width="50" height="100" fill="white"/></mask>
      <rect id="r" mask="url(#m)" width="100" height="100" fill="red"/>
    </svg>"##,
  );
  let r = node_for(&doc, &tree, "r").unwrap();
  let binding = tree[r].mask.as_ref().unwrap();
  assert!(tree[binding.subtree].is_drawable);
  // The mask sub-tree hangs off the binding, not the child list.
  assert!(!tree[r].children.contains(&binding.subtree));
  // Back-reference for ancestor queries points at the masked node.
  assert_eq!(tree[binding.subtree].parent, Some(r));
}

#[test]
fn nested_viewport_gets_overflow_clip() {
  let (doc, tree) = build(
    r##"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100">
      <svg id="inner" x="10" y="10" width="50" height="40">
        <rect width="100" height="100" fill="red"/>
      </svg>
    </svg>"##,
  );
  let inner = node_for(&doc, &tree, "inner").unwrap();
  assert_eq!(
    tree[inner].overflow_clip,
    Some(Rect::from_xywh(10.0, 10.0, 50.0, 40.0))
  );
}
