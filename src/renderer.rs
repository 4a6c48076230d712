//! SVG to image renderer
//!
//! This module provides the main entry point for rendering an SVG string
//! to pixels.
//!
//! # Pipeline
//!
//! 1. **Parse**: SVG string → owned document arena
//! 2. **Build**: document → scene tree (construction + PostProcess)
//! 3. **Draw**: scene tree → tiny-skia pixmap
//! 4. **Encode**: pixmap → PNG
//!
//! The scene tree is rebuilt per call; callers that render the same
//! document repeatedly should use [`Document`], [`SceneTree`] and
//! [`PixmapCanvas`] directly and keep the tree.

use crate::dom::Document;
use crate::error::RenderError;
use crate::error::Result;
use crate::error::SceneError;
use crate::features::BuildOptions;
use crate::paint::Canvas;
use crate::paint::PixmapCanvas;
use crate::scene::IgnoreAttributes;
use crate::scene::SceneTree;
use tiny_skia::Color;
use tiny_skia::Pixmap;
use tiny_skia::Transform;

/// Renderer for converting SVG markup into raster images
///
/// # Examples
///
/// ```
/// use svgscene::Renderer;
///
/// let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10">
///   <rect width="10" height="10" fill="red"/>
/// </svg>"##;
/// let pixmap = Renderer::new().render_str(svg).unwrap();
/// assert_eq!((pixmap.width(), pixmap.height()), (10, 10));
/// ```
#[derive(Debug, Clone)]
pub struct Renderer {
  background: Color,
  target_width: Option<u32>,
  target_height: Option<u32>,
  options: BuildOptions,
}

impl Renderer {
  /// Creates a renderer with a transparent background at document size
  pub fn new() -> Self {
    Self {
      background: Color::TRANSPARENT,
      target_width: None,
      target_height: None,
      options: BuildOptions::default(),
    }
  }

  /// Sets the canvas background color
  pub fn with_background(mut self, background: Color) -> Self {
    self.background = background;
    self
  }

  /// Overrides the output width; the document scales uniformly
  pub fn with_width(mut self, width: u32) -> Self {
    self.target_width = Some(width);
    self
  }

  /// Overrides the output height; the document scales uniformly
  pub fn with_height(mut self, height: u32) -> Self {
    self.target_height = Some(height);
    self
  }

  /// Replaces the build configuration (features, extensions, language)
  pub fn with_options(mut self, options: BuildOptions) -> Self {
    self.options = options;
    self
  }

  /// Renders an SVG string into a pixmap
  pub fn render_str(&self, svg: &str) -> Result<Pixmap> {
    let doc = Document::parse_str(svg)?;
    let tree = SceneTree::build(&doc, &self.options);
    self.render_tree(&tree)
  }

  /// Renders a built scene tree into a pixmap
  pub fn render_tree(&self, tree: &SceneTree) -> Result<Pixmap> {
    let viewport = tree.viewport();
    if viewport.is_empty() {
      return Err(SceneError::NoRootViewport.into());
    }

    let scale = match (self.target_width, self.target_height) {
      (None, None) => 1.0,
      (Some(w), None) => w as f32 / viewport.width(),
      (None, Some(h)) => h as f32 / viewport.height(),
      (Some(w), Some(h)) => {
        (w as f32 / viewport.width()).min(h as f32 / viewport.height())
      }
    };
    let width = (viewport.width() * scale).round().max(1.0) as u32;
    let height = (viewport.height() * scale).round().max(1.0) as u32;

    let mut canvas = PixmapCanvas::new(width, height, self.background)?;
    if scale != 1.0 {
      canvas.set_transform(Transform::from_scale(scale, scale));
    }
    tree.draw(&mut canvas, IgnoreAttributes::NONE, None);
    Ok(canvas.into_pixmap())
  }

  /// Renders an SVG string and encodes it as PNG bytes
  pub fn render_to_png(&self, svg: &str) -> Result<Vec<u8>> {
    let pixmap = self.render_str(svg)?;
    pixmap.encode_png().map_err(|e| {
      RenderError::PngEncode {
        message: e.to_string(),
      }
      .into()
    })
  }
}

impl Default for Renderer {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn pixel(pixmap: &Pixmap, x: u32, y: u32) -> (u8, u8, u8, u8) {
    let px = pixmap.pixel(x, y).unwrap();
    (px.red(), px.green(), px.blue(), px.alpha())
  }

  #[test]
  fn test_render_red_rect() {
    let pixmap = Renderer::new()
      .render_str(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="20" height="20">
          <rect x="5" y="5" width="10" height="10" fill="red"/>
        </svg>"##,
      )
      .unwrap();
    assert_eq!(pixel(&pixmap, 10, 10), (255, 0, 0, 255));
    assert_eq!(pixel(&pixmap, 1, 1).3, 0);
  }

  #[test]
  fn test_render_scaled_width() {
    let pixmap = Renderer::new()
      .with_width(40)
      .render_str(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="20" height="10">
          <rect width="20" height="10" fill="#00ff00"/>
        </svg>"##,
      )
      .unwrap();
    assert_eq!((pixmap.width(), pixmap.height()), (40, 20));
    assert_eq!(pixel(&pixmap, 39, 19), (0, 255, 0, 255));
  }

  #[test]
  fn test_view_box_maps_user_space() {
    // viewBox 0 0 10 10 in a 20x20 viewport doubles everything.
    let pixmap = Renderer::new()
      .render_str(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="20" height="20" viewBox="0 0 10 10">
          <rect width="5" height="5" fill="blue"/>
        </svg>"##,
      )
      .unwrap();
    assert_eq!(pixel(&pixmap, 8, 8), (0, 0, 255, 255));
    assert_eq!(pixel(&pixmap, 12, 12).3, 0);
  }

  #[test]
  fn test_background_fill() {
    let pixmap = Renderer::new()
      .with_background(Color::WHITE)
      .render_str(r##"<svg xmlns="http://www.w3.org/2000/svg" width="4" height="4"/>"##)
      .unwrap();
    assert_eq!(pixel(&pixmap, 0, 0), (255, 255, 255, 255));
  }
}
