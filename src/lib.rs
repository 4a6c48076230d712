//! svgscene — an SVG scene-graph renderer
//!
//! Builds an immutable-after-construction drawable tree from a parsed
//! SVG document and executes it against an abstract 2D canvas,
//! reproducing layered compositing semantics (clipping, masking, group
//! opacity, filter effects, markers, nested viewports, `use`/`symbol`
//! instancing) while guarding against malformed and cyclic documents.
//! The same tree serves rendering, filter-input recording, and
//! hit-testing.
//!
//! # Pipeline
//!
//! ```text
//! SVG string → Document → SceneTree (build + PostProcess) → Canvas
//! ```
//!
//! # Example
//!
//! ```
//! use svgscene::Renderer;
//!
//! let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" width="64" height="64">
//!   <circle cx="32" cy="32" r="24" fill="#3a7" stroke="black"/>
//! </svg>"##;
//! let pixmap = Renderer::new().render_str(svg).unwrap();
//! assert_eq!(pixmap.width(), 64);
//! ```

pub mod dom;
pub mod error;
pub mod features;
pub mod geometry;
pub mod paint;
pub mod renderer;
pub mod resolve;
pub mod scene;
pub mod viewbox;

pub use error::{Error, Result};
pub use features::BuildOptions;
pub use geometry::{Point, Rect, Size};
pub use renderer::Renderer;
pub use scene::{IgnoreAttributes, NodeId, SceneTree};
