//! A red triangle drawn with the 2D canvas over a black background.

use glint_soft::canvas::{Canvas2d, Color};
use std::error::Error;

use crate::{save_image, CLIOpts};

/// Draw the triangle (150, 75), (150, 25), (220, 75) on a canvas of the given size.
pub fn draw(width: u32, height: u32) -> Canvas2d {
  let mut canvas = Canvas2d::new(width, height);

  canvas.begin_path();
  canvas.set_fill_style(Color::BLACK);
  canvas.fill_rect(0., 0., width as f32, height as f32);

  canvas.set_fill_style(Color::RED);
  canvas.move_to(150., 75.);
  canvas.line_to(150., 25.);
  canvas.line_to(220., 75.);
  canvas.line_to(150., 75.);
  canvas.fill();
  canvas.close_path();

  canvas
}

pub fn run(cli_opts: &CLIOpts, name: &str) -> Result<(), Box<dyn Error>> {
  if cli_opts.scene.is_some() {
    log::warn!("{}: scene files only apply to the shader pipeline; ignored", name);
  }

  if cli_opts.window {
    log::warn!("{}: the canvas is only rendered offscreen; --window ignored", name);
  }

  let canvas = draw(cli_opts.width, cli_opts.height);
  save_image(&canvas.to_image(), cli_opts, name)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_size_canvas() {
    let canvas = draw(300, 150);
    let surface = canvas.surface();

    assert_eq!(surface.pixel(160, 70), Some([255, 0, 0, 255]));
    assert_eq!(surface.pixel(0, 0), Some([0, 0, 0, 255]));
    assert_eq!(surface.pixel(230, 70), Some([0, 0, 0, 255]));
  }

  #[test]
  fn small_canvas_clips_the_triangle() {
    let canvas = draw(100, 50);
    assert!(canvas
      .surface()
      .pixels()
      .iter()
      .all(|&p| p == [0, 0, 0, 255]));
  }
}
