//! `<image>` reference resolution
//!
//! An image href resolves to exactly one of two things: a decoded raster
//! image (`data:` URL or local file) or a same-document fragment to
//! render as a nested sub-tree. Anything unresolvable is a dangling
//! reference: no error, no image.

use crate::dom::Document;
use crate::dom::DomId;
use crate::paint::RasterImage;
use base64::Engine;
use log::debug;
use log::warn;
use std::sync::Arc;
use tiny_skia::IntSize;
use tiny_skia::Pixmap;

/// What an `<image>` href resolved to
#[derive(Debug, Clone)]
pub enum ImageReference {
  /// A decoded raster image
  Raster(Arc<RasterImage>),
  /// A nested fragment of this document
  Fragment(DomId),
}

/// Resolves an `<image>` element's href
pub fn resolve_image_reference(doc: &Document, id: DomId) -> Option<ImageReference> {
  let href = doc.attribute(id, "href")?.trim();
  if href.is_empty() {
    return None;
  }

  if let Some(fragment) = href.strip_prefix('#') {
    return match doc.node_by_id(fragment) {
      Some(target) => Some(ImageReference::Fragment(target)),
      None => {
        debug!("dangling image fragment reference '#{fragment}'");
        None
      }
    };
  }

  let bytes = if let Some(rest) = href.strip_prefix("data:") {
    decode_data_url(rest)?
  } else if href.contains("://") {
    debug!("remote image href {href:?} is not fetched");
    return None;
  } else {
    match std::fs::read(href) {
      Ok(bytes) => bytes,
      Err(e) => {
        warn!("failed to read image file {href:?}: {e}");
        return None;
      }
    }
  };

  decode_raster(&bytes).map(|image| ImageReference::Raster(Arc::new(image)))
}

/// Decodes the payload of a `data:` URL
fn decode_data_url(rest: &str) -> Option<Vec<u8>> {
  let (header, payload) = rest.split_once(',')?;
  let is_base64 = header
    .split(';')
    .any(|seg| seg.eq_ignore_ascii_case("base64"));
  if is_base64 {
    match base64::engine::general_purpose::STANDARD.decode(payload.trim()) {
      Ok(bytes) => Some(bytes),
      Err(e) => {
        debug!("invalid base64 data URL: {e}");
        None
      }
    }
  } else {
    percent_decode(payload)
  }
}

/// Percent-decodes a URL payload without treating '+' specially
fn percent_decode(input: &str) -> Option<Vec<u8>> {
  let bytes = input.as_bytes();
  let mut out = Vec::with_capacity(bytes.len());
  let mut i = 0;

  while i < bytes.len() {
    match bytes[i] {
      b'%' => {
        if i + 2 >= bytes.len() {
          debug!("incomplete percent-escape in data URL");
          return None;
        }
        let hi = (bytes[i + 1] as char).to_digit(16)?;
        let lo = (bytes[i + 2] as char).to_digit(16)?;
        out.push(((hi << 4) | lo) as u8);
        i += 3;
      }
      byte => {
        out.push(byte);
        i += 1;
      }
    }
  }

  Some(out)
}

/// Decodes raster bytes into a premultiplied pixmap
pub fn decode_raster(bytes: &[u8]) -> Option<RasterImage> {
  let decoded = match image::load_from_memory(bytes) {
    Ok(img) => img.to_rgba8(),
    Err(e) => {
      debug!("failed to decode raster image: {e}");
      return None;
    }
  };

  let (width, height) = decoded.dimensions();
  let size = IntSize::from_wh(width, height)?;

  let mut data = decoded.into_raw();
  // tiny-skia wants premultiplied RGBA.
  for pixel in data.chunks_exact_mut(4) {
    let a = pixel[3] as u16;
    if a < 255 {
      pixel[0] = ((pixel[0] as u16 * a) / 255) as u8;
      pixel[1] = ((pixel[1] as u16 * a) / 255) as u8;
      pixel[2] = ((pixel[2] as u16 * a) / 255) as u8;
    }
  }

  let pixmap = Pixmap::from_vec(data, size)?;
  Some(RasterImage { pixmap })
}

#[cfg(test)]
mod tests {
  use super::*;

  // A 5x5 opaque red PNG.
  const RED_DOT: &str = "iVBORw0KGgoAAAANSUhEUgAAAAUAAAAFCAYAAACNbyblAAAAHElEQVQI12P4//8/w38GIAXDIBKE0DHxgljNBAAO9TXL0Y4OHwAAAABJRU5ErkJggg==";

  fn doc_with(body: &str) -> Document {
    Document::parse_str(&format!(
      r#"<svg xmlns="http://www.w3.org/2000/svg">{body}</svg>"#
    ))
    .unwrap()
  }

  #[test]
  fn test_data_url_decodes_to_raster() {
    let doc = doc_with(&format!(
      r#"<image id="i" href="data:image/png;base64,{RED_DOT}" width="10" height="10"/>"#
    ));
    match resolve_image_reference(&doc, doc.node_by_id("i").unwrap()) {
      Some(ImageReference::Raster(raster)) => {
        assert_eq!((raster.width(), raster.height()), (5, 5));
      }
      other => panic!("expected raster, got {other:?}"),
    }
  }

  #[test]
  fn test_fragment_reference() {
    let doc = doc_with(
      r##"<g id="frag"><rect width="1" height="1"/></g>
          <image id="i" href="#frag" width="10" height="10"/>"##,
    );
    assert!(matches!(
      resolve_image_reference(&doc, doc.node_by_id("i").unwrap()),
      Some(ImageReference::Fragment(_))
    ));
  }

  #[test]
  fn test_percent_decode() {
    assert_eq!(
      percent_decode("a%20b%3Cc").as_deref(),
      Some("a b<c".as_bytes())
    );
    assert_eq!(percent_decode("broken%2"), None);
    assert_eq!(percent_decode("broken%zz"), None);
  }

  #[test]
  fn test_dangling_and_missing_hrefs() {
    let doc = doc_with(
      r##"<image id="a" href="#ghost" width="10" height="10"/>
          <image id="b" width="10" height="10"/>
          <image id="c" href="data:image/png;base64,@@@" width="10" height="10"/>"##,
    );
    assert!(resolve_image_reference(&doc, doc.node_by_id("a").unwrap()).is_none());
    assert!(resolve_image_reference(&doc, doc.node_by_id("b").unwrap()).is_none());
    assert!(resolve_image_reference(&doc, doc.node_by_id("c").unwrap()).is_none());
  }
}
