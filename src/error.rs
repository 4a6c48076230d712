//! Error types for svgscene
//!
//! This module provides error types for all subsystems:
//! - Parse errors (XML / SVG microsyntax)
//! - Scene errors (tree construction, reference resolution)
//! - Render errors (canvas, rasterization)
//!
//! All errors use the `thiserror` crate for minimal boilerplate and
//! proper error trait implementations.
//!
//! Note that most per-node failures during scene construction are *not*
//! errors: dangling references, recursive references, degenerate geometry
//! and unknown element kinds all resolve locally to "effect absent" or
//! "not drawable" (see the scene module). The types below cover the
//! failures that genuinely abort an operation, such as unparseable input
//! or an invalid canvas configuration.

use thiserror::Error;

/// Result type alias for svgscene operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for svgscene
///
/// Each variant wraps a more specific error type for that subsystem.
#[derive(Error, Debug)]
pub enum Error {
  /// XML or SVG value parsing error
  #[error("Parse error: {0}")]
  Parse(#[from] ParseError),

  /// Scene tree construction error
  #[error("Scene error: {0}")]
  Scene(#[from] SceneError),

  /// Rendering or rasterization error
  #[error("Render error: {0}")]
  Render(#[from] RenderError),

  /// I/O error (file reading, PNG encoding, etc.)
  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),

  /// Generic error for miscellaneous issues
  #[error("{0}")]
  Other(String),
}

/// Errors that occur while parsing the source document
#[derive(Error, Debug, Clone)]
pub enum ParseError {
  /// The XML itself could not be parsed
  #[error("Invalid XML: {message}")]
  InvalidXml { message: String },

  /// The document's root element is not `<svg>`
  #[error("Document root is <{found}>, expected <svg>")]
  NotAnSvgDocument { found: String },
}

/// Errors that occur during scene tree construction or traversal
#[derive(Error, Debug, Clone)]
pub enum SceneError {
  /// The document has no renderable root viewport
  #[error("Document has no usable root viewport")]
  NoRootViewport,
}

/// Errors that occur during painting and rasterization
#[derive(Error, Debug, Clone)]
pub enum RenderError {
  /// Invalid canvas or surface parameters
  #[error("Invalid parameters: {message}")]
  InvalidParameters { message: String },

  /// PNG encoding failed
  #[error("PNG encoding failed: {message}")]
  PngEncode { message: String },
}
