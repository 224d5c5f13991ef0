mod canvas_triangle;
mod webgl_triangle;

use image::{ImageFormat, RgbaImage};
use std::{error::Error, path::PathBuf};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "glint-examples")]
pub struct CLIOpts {
  #[structopt(short, long)]
  /// List available examples.
  list_examples: bool,

  #[structopt(short, long, parse(from_os_str))]
  /// PNG file to write; defaults to `<example>.png`.
  output: Option<PathBuf>,

  #[structopt(long, default_value = "300")]
  /// Width of the surface, in pixels.
  width: u32,

  #[structopt(long, default_value = "150")]
  /// Height of the surface, in pixels.
  height: u32,

  #[structopt(short, long, parse(from_os_str))]
  /// JSON scene to render instead of the default triangle.
  scene: Option<PathBuf>,

  #[structopt(long)]
  /// Show the scene in a window through the OpenGL backend (requires the `glfw` feature).
  window: bool,

  #[structopt(short, long, parse(from_occurrences))]
  /// Raise the default log level; repeat for more.
  verbose: u8,

  /// Example to run.
  example: Option<String>,
}

impl CLIOpts {
  fn output_path(&self, name: &str) -> PathBuf {
    self
      .output
      .clone()
      .unwrap_or_else(|| PathBuf::from(format!("{}.png", name)))
  }
}

/// Macro to declaratively add examples.
macro_rules! examples {
  ($($ex_name:literal, $ex_mod:ident),* $(,)?) => {
    fn show_available_examples() {
      println!("available examples:");
      $( println!("  - {}", $ex_name); )*
    }

    // run an example based on its name
    fn pick_and_run_example(cli_opts: &CLIOpts) -> Result<(), Box<dyn Error>> {
      let example_name = cli_opts.example.as_deref();
      match example_name {
        $(
          Some($ex_name) => $ex_mod::run(cli_opts, $ex_name),
        )*

        Some(name) => {
          show_available_examples();
          Err(format!("no example named {}", name).into())
        }

        None => {
          show_available_examples();
          Err("no example given".into())
        }
      }
    }
  }
}

examples! {
  "webgl-triangle", webgl_triangle,
  "canvas-triangle", canvas_triangle,
}

// Write the rendered pixels to `opts.output` (or `<name>.png`).
fn save_image(image: &RgbaImage, cli_opts: &CLIOpts, name: &str) -> Result<(), Box<dyn Error>> {
  let path = cli_opts.output_path(name);
  image.save_with_format(&path, ImageFormat::Png)?;
  log::info!(
    "{}: wrote {}×{} image to {}",
    name,
    image.width(),
    image.height(),
    path.display()
  );

  Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
  let cli_opts = CLIOpts::from_args();

  let level = match cli_opts.verbose {
    0 => log::LevelFilter::Info,
    1 => log::LevelFilter::Debug,
    _ => log::LevelFilter::Trace,
  };
  env_logger::builder()
    .filter_level(level)
    .parse_default_env()
    .init();

  if cli_opts.list_examples {
    show_available_examples();
    return Ok(());
  }

  pick_and_run_example(&cli_opts).map_err(|e| {
    log::error!("{}", e);
    e
  })
}
