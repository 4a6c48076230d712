//! Abstract canvas and the tiny-skia rasterizing implementation
//!
//! The scene graph's draw protocol talks to the [`Canvas`] trait: a
//! save/restore state stack, a *total* transform that is replaced (not
//! pushed) on every node entry, intersecting clips, and offscreen
//! compositing layers opened with a [`LayerPaint`].
//!
//! [`PixmapCanvas`] executes that protocol against a tiny-skia `Pixmap`.
//! Layers follow the pixmap-swap scheme: pushing a layer parks the current
//! pixmap and installs a fresh transparent one, popping applies the
//! layer's color filter and filter primitives and composites the result
//! into the parked parent.

use crate::error::RenderError;
use crate::error::Result;
use crate::geometry::Rect;
use crate::paint::blur::apply_gaussian_blur;
use crate::paint::picture::Picture;
use crate::paint::ColorFilter;
use crate::paint::FillPaint;
use crate::paint::FilterPrimitive;
use crate::paint::FilterSpec;
use crate::paint::LayerPaint;
use crate::paint::RasterImage;
use crate::paint::StrokePaint;
use crate::paint::TextItem;
use log::debug;
use log::warn;
use std::sync::Arc;
use tiny_skia::BlendMode;
use tiny_skia::Color;
use tiny_skia::FillRule;
use tiny_skia::Mask;
use tiny_skia::MaskType;
use tiny_skia::Paint;
use tiny_skia::Path;
use tiny_skia::PathBuilder;
use tiny_skia::Pixmap;
use tiny_skia::PixmapPaint;
use tiny_skia::PremultipliedColorU8;
use tiny_skia::Transform;

/// The abstract drawing surface the scene graph renders against
///
/// Implementations must treat the transform as a *total* transform:
/// `set_transform` replaces the current matrix outright, because the draw
/// walker composes each node's local transform onto the value returned by
/// [`Canvas::transform`] itself. Clips intersect; they only widen again
/// when a `restore` pops the state they were applied in.
pub trait Canvas {
  /// Saves the current graphics state (transform and clip)
  fn save(&mut self);

  /// Restores the most recently saved graphics state
  fn restore(&mut self);

  /// Returns the current total transform
  fn transform(&self) -> Transform;

  /// Replaces the current total transform
  fn set_transform(&mut self, ts: Transform);

  /// Intersects the clip with a rectangle in the current user space
  fn clip_rect(&mut self, rect: Rect);

  /// Intersects the clip with a path in the current user space
  fn clip_path(&mut self, path: &Path, rule: FillRule, anti_alias: bool);

  /// Opens an offscreen compositing layer
  fn push_layer(&mut self, paint: &LayerPaint);

  /// Closes the most recent layer and composites it
  fn pop_layer(&mut self);

  /// Fills and/or strokes a path in the current user space
  fn draw_path(&mut self, path: &Path, fill: Option<&FillPaint>, stroke: Option<&StrokePaint>);

  /// Draws a raster image with its pixel grid mapped by the current
  /// transform
  fn draw_image(&mut self, image: &Arc<RasterImage>);

  /// Draws a text run
  fn draw_text(&mut self, item: &TextItem);

  /// Replays a recorded picture
  fn draw_picture(&mut self, picture: &Picture);
}

#[derive(Debug, Clone)]
struct CanvasState {
  transform: Transform,
  /// Alpha-coverage pixmap the size of the canvas; `None` means unclipped
  clip: Option<Pixmap>,
}

impl CanvasState {
  fn new() -> Self {
    Self {
      transform: Transform::identity(),
      clip: None,
    }
  }
}

#[derive(Debug)]
struct LayerRecord {
  /// The parked parent pixmap
  pixmap: Pixmap,
  state_stack: Vec<CanvasState>,
  current_state: CanvasState,
  paint: LayerPaint,
}

/// Canvas implementation rasterizing into a tiny-skia [`Pixmap`]
///
/// Not thread-safe; create one canvas per thread for concurrent renders
/// of the same scene tree.
pub struct PixmapCanvas {
  pixmap: Pixmap,
  state_stack: Vec<CanvasState>,
  current_state: CanvasState,
  layer_stack: Vec<LayerRecord>,
}

impl PixmapCanvas {
  /// Creates a canvas with the given dimensions and background color
  ///
  /// # Errors
  ///
  /// Returns `RenderError::InvalidParameters` when either dimension is
  /// zero or the allocation fails.
  pub fn new(width: u32, height: u32, background: Color) -> Result<Self> {
    let mut pixmap = Pixmap::new(width, height).ok_or_else(|| RenderError::InvalidParameters {
      message: format!("Failed to create canvas {}x{}", width, height),
    })?;
    pixmap.fill(background);

    Ok(Self {
      pixmap,
      state_stack: Vec::new(),
      current_state: CanvasState::new(),
      layer_stack: Vec::new(),
    })
  }

  /// Creates a canvas with a transparent background
  pub fn new_transparent(width: u32, height: u32) -> Result<Self> {
    Self::new(width, height, Color::TRANSPARENT)
  }

  /// Canvas width in pixels
  #[inline]
  pub fn width(&self) -> u32 {
    self.pixmap.width()
  }

  /// Canvas height in pixels
  #[inline]
  pub fn height(&self) -> u32 {
    self.pixmap.height()
  }

  /// Consumes the canvas and returns the pixel buffer
  ///
  /// Unbalanced layers are composited down first so content is never
  /// silently dropped.
  pub fn into_pixmap(mut self) -> Pixmap {
    while !self.layer_stack.is_empty() {
      warn!("canvas dropped with {} open layer(s)", self.layer_stack.len());
      self.pop_layer();
    }
    self.pixmap
  }

  /// Rasterizes alpha coverage for a clip shape into a canvas-sized pixmap
  fn rasterize_cover(&self, path: &Path, rule: FillRule, anti_alias: bool) -> Option<Pixmap> {
    let mut cover = Pixmap::new(self.pixmap.width(), self.pixmap.height())?;
    let mut paint = Paint::default();
    paint.set_color(Color::WHITE);
    paint.anti_alias = anti_alias;
    cover.fill_path(path, &paint, rule, self.current_state.transform, None);
    Some(cover)
  }

  /// Intersects the current clip with new coverage
  fn intersect_clip(&mut self, cover: Pixmap) {
    match &mut self.current_state.clip {
      Some(existing) => {
        let mut paint = PixmapPaint::default();
        paint.blend_mode = BlendMode::DestinationIn;
        existing.draw_pixmap(0, 0, cover.as_ref(), &paint, Transform::identity(), None);
      }
      None => self.current_state.clip = Some(cover),
    }
  }

  fn clip_mask(&self) -> Option<Mask> {
    self
      .current_state
      .clip
      .as_ref()
      .map(|clip| Mask::from_pixmap(clip.as_ref(), MaskType::Alpha))
  }

  fn scale_factor(&self) -> f32 {
    let ts = self.current_state.transform;
    let sx = (ts.sx * ts.sx + ts.ky * ts.ky).sqrt();
    let sy = (ts.kx * ts.kx + ts.sy * ts.sy).sqrt();
    (sx + sy) * 0.5
  }
}

impl Canvas for PixmapCanvas {
  fn save(&mut self) {
    self.state_stack.push(self.current_state.clone());
  }

  fn restore(&mut self) {
    if let Some(state) = self.state_stack.pop() {
      self.current_state = state;
    }
  }

  #[inline]
  fn transform(&self) -> Transform {
    self.current_state.transform
  }

  fn set_transform(&mut self, ts: Transform) {
    self.current_state.transform = ts;
  }

  fn clip_rect(&mut self, rect: Rect) {
    let Some(skia_rect) = rect.to_skia() else {
      // A degenerate clip rect excludes everything.
      if let Some(empty) = Pixmap::new(self.pixmap.width(), self.pixmap.height()) {
        self.current_state.clip = Some(empty);
      }
      return;
    };
    let path = PathBuilder::from_rect(skia_rect);
    self.clip_path(&path, FillRule::Winding, true);
  }

  fn clip_path(&mut self, path: &Path, rule: FillRule, anti_alias: bool) {
    if let Some(cover) = self.rasterize_cover(path, rule, anti_alias) {
      self.intersect_clip(cover);
    }
  }

  fn push_layer(&mut self, paint: &LayerPaint) {
    let Some(fresh) = Pixmap::new(self.pixmap.width(), self.pixmap.height()) else {
      warn!("failed to allocate layer pixmap; layer will be a no-op");
      return;
    };

    let record = LayerRecord {
      pixmap: std::mem::replace(&mut self.pixmap, fresh),
      state_stack: self.state_stack.clone(),
      current_state: self.current_state.clone(),
      paint: paint.clone(),
    };
    self.layer_stack.push(record);
  }

  fn pop_layer(&mut self) {
    let Some(record) = self.layer_stack.pop() else {
      warn!("pop_layer without matching push");
      return;
    };

    let mut layer = std::mem::replace(&mut self.pixmap, record.pixmap);
    self.state_stack = record.state_stack;
    self.current_state = record.current_state;

    if let Some(filter) = &record.paint.color_filter {
      apply_color_filter(&mut layer, *filter);
    }
    if let Some(spec) = &record.paint.filter {
      self.apply_filter(&mut layer, spec);
    }

    let mut paint = PixmapPaint::default();
    paint.opacity = record.paint.opacity.clamp(0.0, 1.0);
    paint.blend_mode = record.paint.blend;
    let mask = self.clip_mask();
    self.pixmap.draw_pixmap(
      0,
      0,
      layer.as_ref(),
      &paint,
      Transform::identity(),
      mask.as_ref(),
    );
  }

  fn draw_path(&mut self, path: &Path, fill: Option<&FillPaint>, stroke: Option<&StrokePaint>) {
    let mask = self.clip_mask();
    let transform = self.current_state.transform;

    if let Some(fill) = fill {
      let mut paint = Paint::default();
      paint.set_color(fill.color);
      paint.anti_alias = fill.anti_alias;
      self
        .pixmap
        .fill_path(path, &paint, fill.rule, transform, mask.as_ref());
    }

    if let Some(stroke) = stroke {
      let mut paint = Paint::default();
      paint.set_color(stroke.color);
      paint.anti_alias = stroke.anti_alias;
      self
        .pixmap
        .stroke_path(path, &paint, &stroke.stroke, transform, mask.as_ref());
    }
  }

  fn draw_image(&mut self, image: &Arc<RasterImage>) {
    let mut paint = PixmapPaint::default();
    paint.quality = tiny_skia::FilterQuality::Bilinear;
    let mask = self.clip_mask();
    self.pixmap.draw_pixmap(
      0,
      0,
      image.pixmap.as_ref(),
      &paint,
      self.current_state.transform,
      mask.as_ref(),
    );
  }

  fn draw_text(&mut self, item: &TextItem) {
    // Glyph shaping lives outside this crate; raster output skips text.
    debug!(
      "skipping text run {:?} at {} (no glyph backend)",
      item.text, item.origin
    );
  }

  fn draw_picture(&mut self, picture: &Picture) {
    picture.replay(self);
  }
}

impl PixmapCanvas {
  fn apply_filter(&self, layer: &mut Pixmap, spec: &FilterSpec) {
    if spec.primitives.is_empty() {
      // A valid filter with no primitives produces transparent black.
      layer.fill(Color::TRANSPARENT);
      return;
    }

    let scale = self.scale_factor();
    for primitive in &spec.primitives {
      match primitive {
        FilterPrimitive::GaussianBlur { std_dev } => {
          apply_gaussian_blur(layer, std_dev * scale);
        }
        FilterPrimitive::Offset { dx, dy } => {
          offset_pixels(layer, dx * scale, dy * scale);
        }
        FilterPrimitive::Flood { color } => {
          layer.fill(*color);
        }
      }
    }
  }
}

/// Applies a per-pixel color filter in place
fn apply_color_filter(pixmap: &mut Pixmap, filter: ColorFilter) {
  match filter {
    ColorFilter::LuminanceToAlpha => {
      for pixel in pixmap.pixels_mut() {
        let alpha = pixel.alpha() as f32 / 255.0;
        if alpha <= 0.0 {
          *pixel = PremultipliedColorU8::TRANSPARENT;
          continue;
        }
        // Luminance of the unpremultiplied color, scaled back by alpha.
        let r = pixel.red() as f32 / 255.0 / alpha;
        let g = pixel.green() as f32 / 255.0 / alpha;
        let b = pixel.blue() as f32 / 255.0 / alpha;
        let luma = (0.2126 * r + 0.7152 * g + 0.0722 * b).clamp(0.0, 1.0);
        let out = (luma * alpha * 255.0).round() as u8;
        *pixel =
          PremultipliedColorU8::from_rgba(0, 0, 0, out).unwrap_or(PremultipliedColorU8::TRANSPARENT);
      }
    }
  }
}

/// Translates pixel content by a device-space offset
fn offset_pixels(pixmap: &mut Pixmap, dx: f32, dy: f32) {
  let dx = dx.round() as i32;
  let dy = dy.round() as i32;
  if dx == 0 && dy == 0 {
    return;
  }
  let Some(mut shifted) = Pixmap::new(pixmap.width(), pixmap.height()) else {
    return;
  };
  shifted.draw_pixmap(
    dx,
    dy,
    pixmap.as_ref(),
    &PixmapPaint::default(),
    Transform::identity(),
    None,
  );
  *pixmap = shifted;
}
