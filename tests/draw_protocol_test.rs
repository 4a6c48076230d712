//! Draw-sequence properties, observed through a recording canvas.

use svgscene::dom::Document;
use svgscene::features::BuildOptions;
use svgscene::geometry::Rect;
use svgscene::paint::picture::PictureCommand;
use svgscene::paint::Picture;
use svgscene::paint::RecordingCanvas;
use svgscene::scene::IgnoreAttributes;
use svgscene::scene::NodeId;
use svgscene::scene::SceneTree;
use tiny_skia::BlendMode;

fn record(svg: &str) -> Picture {
  record_with(svg, IgnoreAttributes::NONE, None).1
}

fn record_with(
  svg: &str,
  ignore: IgnoreAttributes,
  until: Option<&str>,
) -> (SceneTree, Picture) {
  let doc = Document::parse_str(svg).unwrap();
  let tree = SceneTree::build(&doc, &BuildOptions::default());
  let until = until.map(|id| {
    let dom = doc.node_by_id(id).unwrap();
    tree
      .node_ids()
      .find(|&n| tree[n].element == dom)
      .expect("no scene node for element")
  });
  let mut recorder = RecordingCanvas::new(Rect::from_xywh(0.0, 0.0, 100.0, 100.0));
  tree.draw(&mut recorder, ignore, until);
  (tree, recorder.finish())
}

/// Compact view of the layer/draw event stream.
#[derive(Debug, PartialEq, Clone, Copy)]
enum Event {
  OpenPlain,
  OpenCompose,
  Close,
  DrawPath,
}

fn layer_events(picture: &Picture) -> Vec<Event> {
  picture
    .commands()
    .iter()
    .filter_map(|c| match c {
      PictureCommand::PushLayer(paint) => {
        if paint.blend == BlendMode::DestinationIn {
          Some(Event::OpenCompose)
        } else {
          Some(Event::OpenPlain)
        }
      }
      PictureCommand::PopLayer => Some(Event::Close),
      PictureCommand::DrawPath { .. } => Some(Event::DrawPath),
      _ => None,
    })
    .collect()
}

#[test]
fn opacity_scenario_emits_exactly_one_layer() {
  // fill=red, no stroke, 50% opacity, no mask/filter/clip.
  let picture = record(
    r##"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100">
      <rect width="10" height="10" fill="red" opacity="0.5"/>
    </svg>"##,
  );

  assert_eq!(
    layer_events(&picture),
    vec![Event::OpenPlain, Event::DrawPath, Event::Close]
  );

  // The single layer is the opacity layer, and the path carries a fill
  // but no stroke.
  let opacity_layers: Vec<_> = picture
    .commands()
    .iter()
    .filter_map(|c| match c {
      PictureCommand::PushLayer(paint) => Some(paint),
      _ => None,
    })
    .collect();
  assert_eq!(opacity_layers.len(), 1);
  assert!((opacity_layers[0].opacity - 0.5).abs() < 1e-3);
  assert!(opacity_layers[0].color_filter.is_none());
  assert!(opacity_layers[0].filter.is_none());

  match picture
    .commands()
    .iter()
    .find(|c| matches!(c, PictureCommand::DrawPath { .. }))
  {
    Some(PictureCommand::DrawPath { fill, stroke, .. }) => {
      assert!(fill.is_some());
      assert!(stroke.is_none());
    }
    _ => unreachable!(),
  }
}

#[test]
fn fully_opaque_rect_opens_no_layer() {
  let picture = record(
    r##"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100">
      <rect width="10" height="10" fill="red"/>
    </svg>"##,
  );
  assert_eq!(layer_events(&picture), vec![Event::DrawPath]);
}

#[test]
fn mask_and_opacity_nest_in_the_required_order() {
  let picture = record(
    r##"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100">
      <mask id="m"><rect width="100" height="100" fill="white"/></mask>
      <rect width="10" height="10" fill="red" opacity="0.5" mask="url(#m)"/>
    </svg>"##,
  );

  // mask-apply opens first; the opacity layer opens and closes strictly
  // inside it; the mask-compose layer (destination-in) opens only after
  // the opacity layer closed, draws the mask sub-tree, and both mask
  // layers close.
  assert_eq!(
    layer_events(&picture),
    vec![
      Event::OpenPlain,   // mask apply
      Event::OpenPlain,   // opacity
      Event::DrawPath,    // content
      Event::Close,       // opacity
      Event::OpenCompose, // mask compose
      Event::DrawPath,    // mask sub-tree
      Event::Close,       // compose
      Event::Close,       // apply
    ]
  );
}

#[test]
fn filter_layer_nests_inside_opacity() {
  let picture = record(
    r##"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100">
      <filter id="f"><feGaussianBlur stdDeviation="1"/></filter>
      <rect width="10" height="10" fill="red" opacity="0.5" filter="url(#f)"/>
    </svg>"##,
  );
  // Opacity opens first, filter is innermost relative to content.
  let events = layer_events(&picture);
  assert_eq!(
    events,
    vec![
      Event::OpenPlain, // opacity
      Event::OpenPlain, // filter
      Event::DrawPath,
      Event::Close, // filter
      Event::Close, // opacity
    ]
  );

  let layers: Vec<_> = picture
    .commands()
    .iter()
    .filter_map(|c| match c {
      PictureCommand::PushLayer(paint) => Some(paint),
      _ => None,
    })
    .collect();
  assert!(layers[0].filter.is_none());
  assert!(layers[1].filter.is_some());
}

#[test]
fn clip_path_emits_before_layers() {
  let picture = record(
    r##"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100">
      <clipPath id="c"><rect width="5" height="5"/></clipPath>
      <rect width="10" height="10" fill="red" opacity="0.5" clip-path="url(#c)"/>
    </svg>"##,
  );
  let clip_index = picture
    .commands()
    .iter()
    .position(|c| matches!(c, PictureCommand::ClipPath { .. }))
    .expect("clip path command");
  let layer_index = picture
    .commands()
    .iter()
    .position(|c| matches!(c, PictureCommand::PushLayer(_)))
    .expect("layer command");
  assert!(clip_index < layer_index);
}

#[test]
fn until_sentinel_stops_before_the_node() {
  let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100">
    <rect id="before" width="10" height="10" fill="red"/>
    <rect id="stop" x="20" width="10" height="10" fill="green"/>
    <rect id="after" x="40" width="10" height="10" fill="blue"/>
  </svg>"##;

  let (_, full) = record_with(svg, IgnoreAttributes::NONE, None);
  assert_eq!(
    full
      .commands()
      .iter()
      .filter(|c| matches!(c, PictureCommand::DrawPath { .. }))
      .count(),
    3
  );

  let (_, partial) = record_with(svg, IgnoreAttributes::NONE, Some("stop"));
  assert_eq!(
    partial
      .commands()
      .iter()
      .filter(|c| matches!(c, PictureCommand::DrawPath { .. }))
      .count(),
    1
  );
}

#[test]
fn ignore_flags_suppress_effect_layers() {
  let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100">
    <mask id="m"><rect width="100" height="100" fill="white"/></mask>
    <rect width="10" height="10" fill="red" opacity="0.5" mask="url(#m)"/>
  </svg>"##;

  let all = IgnoreAttributes::MASK | IgnoreAttributes::OPACITY;
  let (_, picture) = record_with(svg, all, None);
  assert_eq!(layer_events(&picture), vec![Event::DrawPath]);
}

#[test]
fn record_graphic_skips_filters_and_degenerate_bounds() {
  let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100">
    <filter id="f"><feGaussianBlur stdDeviation="2"/></filter>
    <rect id="r" width="10" height="10" fill="red" opacity="0.5" filter="url(#f)"/>
  </svg>"##;
  let doc = Document::parse_str(svg).unwrap();
  let tree = SceneTree::build(&doc, &BuildOptions::default());
  let r: NodeId = tree
    .node_ids()
    .find(|&n| tree[n].element == doc.node_by_id("r").unwrap())
    .unwrap();

  let picture = tree.record_graphic(r).unwrap();
  // The node's own sequence, minus the filter layer: exactly the opacity
  // layer remains.
  let layers: Vec<_> = picture
    .commands()
    .iter()
    .filter_map(|c| match c {
      PictureCommand::PushLayer(paint) => Some(paint),
      _ => None,
    })
    .collect();
  assert_eq!(layers.len(), 1);
  assert!(layers[0].filter.is_none());

  // Degenerate bounds record nothing.
  let inert = tree
    .node_ids()
    .find(|&n| !tree[n].is_drawable)
    .map(|n| tree.record_graphic(n));
  if let Some(result) = inert {
    assert!(result.is_none());
  }
}

#[test]
fn record_background_stops_at_the_requesting_node() {
  let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100">
    <g id="backdrop" enable-background="new">
      <rect id="under" width="50" height="50" fill="red"/>
      <rect id="self" x="10" y="10" width="10" height="10" fill="blue"/>
      <rect id="over" x="60" y="60" width="10" height="10" fill="green"/>
    </g>
  </svg>"##;
  let doc = Document::parse_str(svg).unwrap();
  let tree = SceneTree::build(&doc, &BuildOptions::default());
  let node = |id: &str| {
    tree
      .node_ids()
      .find(|&n| tree[n].element == doc.node_by_id(id).unwrap())
      .unwrap()
  };

  let picture = tree.record_background(node("self")).unwrap();
  // Only the content before the requesting node is present.
  assert_eq!(
    picture
      .commands()
      .iter()
      .filter(|c| matches!(c, PictureCommand::DrawPath { .. }))
      .count(),
    1
  );

  // No background ancestor: nothing to record.
  assert!(tree.record_background(node("backdrop")).is_none());
}
