//! Gaussian blur for filter layers
//!
//! Separable two-pass convolution over premultiplied RGBA, with edge
//! clamping. Quality over speed: filter layers are composited rarely
//! compared to ordinary fills.

use tiny_skia::Pixmap;
use tiny_skia::PremultipliedColorU8;

pub(crate) fn gaussian_kernel(sigma: f32) -> (Vec<f32>, usize) {
  let radius = (sigma.abs() * 3.0).ceil() as usize;
  if radius == 0 {
    return (Vec::new(), 0);
  }

  let sigma_sq = sigma * sigma;
  let mut kernel = Vec::with_capacity(radius * 2 + 1);
  let mut sum = 0.0;
  for i in 0..=radius * 2 {
    let x = i as f32 - radius as f32;
    let value = (-x * x / (2.0 * sigma_sq)).exp();
    kernel.push(value);
    sum += value;
  }
  for k in &mut kernel {
    *k /= sum;
  }
  (kernel, radius)
}

/// Convolves one axis; `stride`/`lanes` select rows vs columns.
fn blur_axis(
  src: &[[f32; 4]],
  dst: &mut [[f32; 4]],
  kernel: &[f32],
  radius: usize,
  lanes: usize,
  length: usize,
  index: impl Fn(usize, usize) -> usize,
) {
  for lane in 0..lanes {
    for pos in 0..length {
      let mut accum = [0.0f32; 4];
      for (k, weight) in kernel.iter().enumerate() {
        let offset = k as isize - radius as isize;
        let sample_pos = (pos as isize + offset).clamp(0, length as isize - 1) as usize;
        let sample = src[index(lane, sample_pos)];
        for c in 0..4 {
          accum[c] += sample[c] * weight;
        }
      }
      dst[index(lane, pos)] = accum;
    }
  }
}

pub(crate) fn apply_gaussian_blur(pixmap: &mut Pixmap, sigma: f32) {
  let (kernel, radius) = gaussian_kernel(sigma);
  if kernel.is_empty() {
    return;
  }

  let width = pixmap.width() as usize;
  let height = pixmap.height() as usize;

  let src: Vec<[f32; 4]> = pixmap
    .pixels()
    .iter()
    .map(|p| {
      [
        p.red() as f32 / 255.0,
        p.green() as f32 / 255.0,
        p.blue() as f32 / 255.0,
        p.alpha() as f32 / 255.0,
      ]
    })
    .collect();

  let mut temp = vec![[0.0f32; 4]; src.len()];
  let mut out = vec![[0.0f32; 4]; src.len()];

  // Horizontal: one lane per row, then vertical: one lane per column.
  blur_axis(&src, &mut temp, &kernel, radius, height, width, |row, x| {
    row * width + x
  });
  blur_axis(&temp, &mut out, &kernel, radius, width, height, |col, y| {
    y * width + col
  });

  for (pixel, vals) in pixmap.pixels_mut().iter_mut().zip(out.iter()) {
    let a = (vals[3] * 255.0).round().clamp(0.0, 255.0) as u8;
    // Premultiplied channels can never exceed alpha.
    let r = ((vals[0] * 255.0).round().clamp(0.0, 255.0) as u8).min(a);
    let g = ((vals[1] * 255.0).round().clamp(0.0, 255.0) as u8).min(a);
    let b = ((vals[2] * 255.0).round().clamp(0.0, 255.0) as u8).min(a);
    *pixel = PremultipliedColorU8::from_rgba(r, g, b, a).unwrap_or(PremultipliedColorU8::TRANSPARENT);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_kernel_is_normalized() {
    let (kernel, radius) = gaussian_kernel(2.0);
    assert_eq!(kernel.len(), radius * 2 + 1);
    let sum: f32 = kernel.iter().sum();
    assert!((sum - 1.0).abs() < 1e-4);
  }

  #[test]
  fn test_zero_sigma_is_noop() {
    let mut pixmap = Pixmap::new(4, 4).unwrap();
    pixmap.fill(tiny_skia::Color::from_rgba8(10, 20, 30, 255));
    let before: Vec<_> = pixmap.pixels().to_vec();
    apply_gaussian_blur(&mut pixmap, 0.0);
    assert_eq!(pixmap.pixels(), &before[..]);
  }

  #[test]
  fn test_blur_spreads_energy() {
    let mut pixmap = Pixmap::new(9, 9).unwrap();
    // Single bright pixel in the middle.
    let idx = 4 * 9 + 4;
    pixmap.pixels_mut()[idx] = PremultipliedColorU8::from_rgba(255, 255, 255, 255).unwrap();
    apply_gaussian_blur(&mut pixmap, 1.0);
    let center = pixmap.pixels()[idx];
    let neighbor = pixmap.pixels()[idx + 1];
    assert!(center.alpha() < 255);
    assert!(neighbor.alpha() > 0);
    assert!(center.alpha() > neighbor.alpha());
  }
}
