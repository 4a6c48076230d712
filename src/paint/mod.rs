//! Painting backends for the scene graph
//!
//! The scene graph draws against the abstract [`Canvas`](canvas::Canvas)
//! trait. Two implementations exist:
//!
//! - [`PixmapCanvas`](canvas::PixmapCanvas) rasterizes into a tiny-skia
//!   `Pixmap`, maintaining a graphics-state stack and an offscreen layer
//!   stack for grouped compositing (opacity, masks, filters).
//! - [`RecordingCanvas`](picture::RecordingCanvas) records the command
//!   stream into an immutable [`Picture`](picture::Picture) that can be
//!   replayed later — this is how filter inputs are captured, and how
//!   tests observe the draw protocol.
//!
//! The value types below describe *what* to paint; resolving document
//! attributes into them is the `resolve` module's job.

pub mod blur;
pub mod canvas;
pub mod picture;

pub use canvas::Canvas;
pub use canvas::PixmapCanvas;
pub use picture::Picture;
pub use picture::RecordingCanvas;

use crate::geometry::Point;
use tiny_skia::BlendMode;
use tiny_skia::Color;
use tiny_skia::FillRule;
use tiny_skia::Pixmap;
use tiny_skia::Stroke;

/// A resolved fill for path geometry
#[derive(Debug, Clone)]
pub struct FillPaint {
  /// Fill color with `fill-opacity` already multiplied in
  pub color: Color,
  /// Winding rule from `fill-rule`
  pub rule: FillRule,
  /// Anti-aliasing from `shape-rendering`
  pub anti_alias: bool,
}

/// A resolved stroke for path geometry
#[derive(Debug, Clone)]
pub struct StrokePaint {
  /// Stroke color with `stroke-opacity` already multiplied in
  pub color: Color,
  /// Width, caps, joins and dashing
  pub stroke: Stroke,
  /// Anti-aliasing from `shape-rendering`
  pub anti_alias: bool,
}

/// A color filter applied when a layer is composited
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColorFilter {
  /// Replaces each pixel with transparent black whose alpha is the
  /// luminance of the unpremultiplied color — the "mask-compose" half of
  /// luminance masking
  LuminanceToAlpha,
}

/// A resolved filter effect, applied to a layer before compositing
///
/// An empty primitive list is valid and yields a fully transparent
/// result, matching a `<filter>` element with no primitives.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpec {
  /// Primitives applied in document order
  pub primitives: Vec<FilterPrimitive>,
}

/// A single supported filter primitive
#[derive(Debug, Clone, PartialEq)]
pub enum FilterPrimitive {
  /// `feGaussianBlur`
  GaussianBlur {
    /// Standard deviation in user-space units
    std_dev: f32,
  },
  /// `feOffset`
  Offset { dx: f32, dy: f32 },
  /// `feFlood`
  Flood { color: Color },
}

/// Compositing parameters for an offscreen layer
///
/// Opened with `Canvas::push_layer`; everything drawn until the matching
/// `pop_layer` is composited as a unit using these parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerPaint {
  /// Uniform alpha applied at composite time
  pub opacity: f32,
  /// Blend mode used to composite the layer into its parent
  pub blend: BlendMode,
  /// Optional per-pixel color filter applied before compositing
  pub color_filter: Option<ColorFilter>,
  /// Optional filter effect applied before compositing
  pub filter: Option<FilterSpec>,
}

impl LayerPaint {
  /// A plain group layer at the given opacity
  pub fn opacity(opacity: f32) -> Self {
    Self {
      opacity,
      blend: BlendMode::SourceOver,
      color_filter: None,
      filter: None,
    }
  }

  /// The "mask-apply" paint: a full-opacity group the masked content is
  /// drawn into
  pub fn mask_apply() -> Self {
    Self::opacity(1.0)
  }

  /// The "mask-compose" paint: luminance-to-alpha plus destination-in, so
  /// the mask sub-tree multiplies into the already-drawn content
  pub fn mask_compose() -> Self {
    Self {
      opacity: 1.0,
      blend: BlendMode::DestinationIn,
      color_filter: Some(ColorFilter::LuminanceToAlpha),
      filter: None,
    }
  }

  /// A filter layer
  pub fn filter(spec: FilterSpec) -> Self {
    Self {
      opacity: 1.0,
      blend: BlendMode::SourceOver,
      color_filter: None,
      filter: Some(spec),
    }
  }
}

/// A decoded raster image ready for drawing
#[derive(Debug)]
pub struct RasterImage {
  /// Premultiplied pixel data
  pub pixmap: Pixmap,
}

impl RasterImage {
  /// Width in pixels
  pub fn width(&self) -> u32 {
    self.pixmap.width()
  }

  /// Height in pixels
  pub fn height(&self) -> u32 {
    self.pixmap.height()
  }
}

/// A text run handed to the canvas
///
/// Glyph shaping and font selection are outside this crate; the pixmap
/// backend only logs text runs, while recordings preserve them so an
/// embedder with a text stack can replay them.
#[derive(Debug, Clone)]
pub struct TextItem {
  /// The character content
  pub text: String,
  /// Baseline-start position in user space
  pub origin: Point,
  /// Font size in user-space units
  pub font_size: f32,
  /// Fill color
  pub color: Color,
}
