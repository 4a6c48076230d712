//! Renders an SVG file to PNG.

use clap::Parser;
use std::path::PathBuf;
use svgscene::Renderer;
use tiny_skia::Color;

#[derive(Parser, Debug)]
#[command(name = "rasterize", about = "Render an SVG file to PNG")]
struct Args {
  /// Input SVG file
  input: PathBuf,

  /// Output PNG file
  #[arg(short, long)]
  output: PathBuf,

  /// Output width in pixels (scales the document uniformly)
  #[arg(long)]
  width: Option<u32>,

  /// Output height in pixels (scales the document uniformly)
  #[arg(long)]
  height: Option<u32>,

  /// Background color (CSS syntax), transparent by default
  #[arg(long)]
  background: Option<String>,
}

fn main() -> svgscene::Result<()> {
  env_logger::Builder::from_env(env_logger::Env::default()).init();
  let args = Args::parse();

  let svg = std::fs::read_to_string(&args.input)?;

  let mut renderer = Renderer::new();
  if let Some(width) = args.width {
    renderer = renderer.with_width(width);
  }
  if let Some(height) = args.height {
    renderer = renderer.with_height(height);
  }
  if let Some(raw) = &args.background {
    let background = svgscene::resolve::paint::parse_color(raw)
      .ok_or_else(|| svgscene::Error::Other(format!("invalid background color {raw:?}")))?;
    renderer = renderer.with_background(background);
  } else {
    renderer = renderer.with_background(Color::TRANSPARENT);
  }

  let png = renderer.render_to_png(&svg)?;
  std::fs::write(&args.output, png)?;
  Ok(())
}
