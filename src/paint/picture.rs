//! Recorded pictures
//!
//! A [`Picture`] is an immutable recording of the canvas command stream a
//! subtree produced. Pictures serve two purposes:
//!
//! - filter inputs: "the graphic this element would have produced" is
//!   captured once and handed to filter evaluation, independent of where
//!   it is later composited;
//! - observability: tests assert on the exact open/close-layer nesting of
//!   the draw protocol by recording instead of rasterizing.
//!
//! Recorded transforms are totals relative to the recording's origin; on
//! replay they are rebased onto the destination canvas's transform at the
//! moment `replay` was entered.

use crate::geometry::Rect;
use crate::paint::FillPaint;
use crate::paint::LayerPaint;
use crate::paint::RasterImage;
use crate::paint::StrokePaint;
use crate::paint::TextItem;
use crate::paint::canvas::Canvas;
use std::sync::Arc;
use tiny_skia::FillRule;
use tiny_skia::Path;
use tiny_skia::Transform;

/// One recorded canvas operation
#[derive(Debug, Clone)]
pub enum PictureCommand {
  Save,
  Restore,
  SetTransform(Transform),
  ClipRect(Rect),
  ClipPath {
    path: Path,
    rule: FillRule,
    anti_alias: bool,
  },
  PushLayer(LayerPaint),
  PopLayer,
  DrawPath {
    path: Path,
    fill: Option<FillPaint>,
    stroke: Option<StrokePaint>,
  },
  DrawImage(Arc<RasterImage>),
  DrawText(TextItem),
  DrawPicture(Arc<Picture>),
}

/// An immutable recording of canvas commands
#[derive(Debug, Clone)]
pub struct Picture {
  commands: Vec<PictureCommand>,
  bounds: Rect,
}

impl Picture {
  /// The bounds the recording surface was sized to
  #[inline]
  pub fn bounds(&self) -> Rect {
    self.bounds
  }

  /// The recorded command stream
  #[inline]
  pub fn commands(&self) -> &[PictureCommand] {
    &self.commands
  }

  /// Returns true if nothing was recorded
  #[inline]
  pub fn is_empty(&self) -> bool {
    self.commands.is_empty()
  }

  /// Replays the recording onto another canvas
  ///
  /// The canvas's transform at entry becomes the recording's root: every
  /// recorded total transform is re-rooted onto it.
  pub fn replay(&self, canvas: &mut dyn Canvas) {
    let base = canvas.transform();
    canvas.save();
    for command in &self.commands {
      match command {
        PictureCommand::Save => canvas.save(),
        PictureCommand::Restore => canvas.restore(),
        PictureCommand::SetTransform(ts) => canvas.set_transform(base.pre_concat(*ts)),
        PictureCommand::ClipRect(rect) => canvas.clip_rect(*rect),
        PictureCommand::ClipPath {
          path,
          rule,
          anti_alias,
        } => canvas.clip_path(path, *rule, *anti_alias),
        PictureCommand::PushLayer(paint) => canvas.push_layer(paint),
        PictureCommand::PopLayer => canvas.pop_layer(),
        PictureCommand::DrawPath { path, fill, stroke } => {
          canvas.draw_path(path, fill.as_ref(), stroke.as_ref())
        }
        PictureCommand::DrawImage(image) => canvas.draw_image(image),
        PictureCommand::DrawText(item) => canvas.draw_text(item),
        PictureCommand::DrawPicture(picture) => canvas.draw_picture(picture),
      }
    }
    canvas.restore();
  }
}

/// Canvas implementation that records instead of rasterizing
#[derive(Debug)]
pub struct RecordingCanvas {
  commands: Vec<PictureCommand>,
  transform_stack: Vec<Transform>,
  current_transform: Transform,
  bounds: Rect,
}

impl RecordingCanvas {
  /// Creates a recorder for a surface logically sized to `bounds`
  pub fn new(bounds: Rect) -> Self {
    Self {
      commands: Vec::new(),
      transform_stack: Vec::new(),
      current_transform: Transform::identity(),
      bounds,
    }
  }

  /// Finalizes the recording into an immutable picture
  pub fn finish(self) -> Picture {
    Picture {
      commands: self.commands,
      bounds: self.bounds,
    }
  }
}

impl Canvas for RecordingCanvas {
  fn save(&mut self) {
    self.transform_stack.push(self.current_transform);
    self.commands.push(PictureCommand::Save);
  }

  fn restore(&mut self) {
    if let Some(ts) = self.transform_stack.pop() {
      self.current_transform = ts;
    }
    self.commands.push(PictureCommand::Restore);
  }

  #[inline]
  fn transform(&self) -> Transform {
    self.current_transform
  }

  fn set_transform(&mut self, ts: Transform) {
    self.current_transform = ts;
    self.commands.push(PictureCommand::SetTransform(ts));
  }

  fn clip_rect(&mut self, rect: Rect) {
    self.commands.push(PictureCommand::ClipRect(rect));
  }

  fn clip_path(&mut self, path: &Path, rule: FillRule, anti_alias: bool) {
    self.commands.push(PictureCommand::ClipPath {
      path: path.clone(),
      rule,
      anti_alias,
    });
  }

  fn push_layer(&mut self, paint: &LayerPaint) {
    self.commands.push(PictureCommand::PushLayer(paint.clone()));
  }

  fn pop_layer(&mut self) {
    self.commands.push(PictureCommand::PopLayer);
  }

  fn draw_path(&mut self, path: &Path, fill: Option<&FillPaint>, stroke: Option<&StrokePaint>) {
    self.commands.push(PictureCommand::DrawPath {
      path: path.clone(),
      fill: fill.cloned(),
      stroke: stroke.cloned(),
    });
  }

  fn draw_image(&mut self, image: &Arc<RasterImage>) {
    self.commands.push(PictureCommand::DrawImage(image.clone()));
  }

  fn draw_text(&mut self, item: &TextItem) {
    self.commands.push(PictureCommand::DrawText(item.clone()));
  }

  fn draw_picture(&mut self, picture: &Picture) {
    self
      .commands
      .push(PictureCommand::DrawPicture(Arc::new(picture.clone())));
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_recording_preserves_order() {
    let mut recorder = RecordingCanvas::new(Rect::from_xywh(0.0, 0.0, 10.0, 10.0));
    recorder.save();
    recorder.push_layer(&LayerPaint::opacity(0.5));
    recorder.pop_layer();
    recorder.restore();
    let picture = recorder.finish();

    let kinds: Vec<_> = picture
      .commands()
      .iter()
      .map(|c| std::mem::discriminant(c))
      .collect();
    assert_eq!(kinds.len(), 4);
    assert!(matches!(picture.commands()[1], PictureCommand::PushLayer(_)));
    assert!(matches!(picture.commands()[2], PictureCommand::PopLayer));
  }

  #[test]
  fn test_restore_recovers_transform() {
    let mut recorder = RecordingCanvas::new(Rect::ZERO);
    recorder.save();
    recorder.set_transform(Transform::from_translate(5.0, 5.0));
    assert_eq!(recorder.transform(), Transform::from_translate(5.0, 5.0));
    recorder.restore();
    assert_eq!(recorder.transform(), Transform::identity());
  }

  #[test]
  fn test_replay_rebases_transforms() {
    let mut recorder = RecordingCanvas::new(Rect::ZERO);
    recorder.set_transform(Transform::from_translate(1.0, 0.0));
    let picture = recorder.finish();

    let mut target = RecordingCanvas::new(Rect::ZERO);
    target.set_transform(Transform::from_translate(0.0, 2.0));
    picture.replay(&mut target);
    let replayed = target.finish();

    let set: Vec<_> = replayed
      .commands()
      .iter()
      .filter_map(|c| match c {
        PictureCommand::SetTransform(ts) => Some(*ts),
        _ => None,
      })
      .collect();
    // First the target's own transform, then the rebased recorded one.
    assert_eq!(set.last(), Some(&Transform::from_translate(1.0, 2.0)));
  }
}
