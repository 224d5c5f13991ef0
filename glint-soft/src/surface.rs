//! Color surfaces.

use std::path::Path;

use image::{ImageBuffer, ImageFormat, ImageResult, Rgba, RgbaImage};

/// A width × height RGBA8 color buffer.
///
/// Rows are stored top-down: `(0, 0)` is the top-left pixel, like in an image file. Window
/// coordinates used by the rasterizer have their origin at the bottom-left corner and are flipped
/// when written.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Surface {
  width: u32,
  height: u32,
  pixels: Vec<[u8; 4]>,
}

impl Surface {
  /// New surface filled with transparent black.
  pub fn new(width: u32, height: u32) -> Self {
    Surface {
      width,
      height,
      pixels: vec![[0; 4]; width as usize * height as usize],
    }
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  /// `[width, height]`.
  pub fn size(&self) -> [u32; 2] {
    [self.width, self.height]
  }

  fn index(&self, x: u32, y: u32) -> Option<usize> {
    if x < self.width && y < self.height {
      Some(y as usize * self.width as usize + x as usize)
    } else {
      None
    }
  }

  /// Color of the pixel at `(x, y)`, origin at the top-left corner.
  pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
    self.index(x, y).map(|i| self.pixels[i])
  }

  /// Write a pixel; out-of-bounds writes are ignored.
  pub fn set_pixel(&mut self, x: u32, y: u32, color: [u8; 4]) {
    if let Some(i) = self.index(x, y) {
      self.pixels[i] = color;
    }
  }

  /// Set every pixel to `color`.
  pub fn fill(&mut self, color: [u8; 4]) {
    for p in &mut self.pixels {
      *p = color;
    }
  }

  /// Pixels, row after row from the top.
  pub fn pixels(&self) -> &[[u8; 4]] {
    &self.pixels
  }

  /// Copy the surface into an image.
  pub fn to_image(&self) -> RgbaImage {
    ImageBuffer::from_fn(self.width, self.height, |x, y| {
      Rgba(self.pixels[y as usize * self.width as usize + x as usize])
    })
  }

  /// Save the surface as a PNG file.
  pub fn save_png(&self, path: impl AsRef<Path>) -> ImageResult<()> {
    self.to_image().save_with_format(path, ImageFormat::Png)
  }
}

/// Quantize a color with components in [0, 1] to RGBA8, rounding to the nearest value.
///
/// Components are clamped first; NaN maps to 0.
pub fn quantize(color: [f32; 4]) -> [u8; 4] {
  let q = |c: f32| {
    if c.is_nan() {
      0
    } else {
      (c.max(0.).min(1.) * 255.).round() as u8
    }
  };

  [q(color[0]), q(color[1]), q(color[2]), q(color[3])]
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn pixels_are_addressed_from_the_top_left() {
    let mut surface = Surface::new(4, 2);
    surface.set_pixel(3, 0, [1, 2, 3, 4]);
    surface.set_pixel(4, 0, [9; 4]);

    assert_eq!(surface.pixel(3, 0), Some([1, 2, 3, 4]));
    assert_eq!(surface.pixels()[3], [1, 2, 3, 4]);
    assert_eq!(surface.pixel(4, 0), None);
    assert_eq!(surface.pixel(0, 2), None);

    let image = surface.to_image();
    assert_eq!(image.dimensions(), (4, 2));
    assert_eq!(image.get_pixel(3, 0).0, [1, 2, 3, 4]);
    assert_eq!(image.get_pixel(0, 1).0, [0; 4]);
  }

  #[test]
  fn quantization() {
    assert_eq!(quantize([1., 0., 0.5, 1.]), [255, 0, 128, 255]);
    assert_eq!(quantize([2., -1., f32::NAN, 0.2]), [255, 0, 0, 51]);
  }
}
