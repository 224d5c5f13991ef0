//! Immediate-mode 2D drawing.
//!
//! [`Canvas2d`] mirrors the small subset of the HTML canvas 2D context needed to draw filled
//! shapes: a fill style, rectangles and polygonal paths. Coordinates are in pixels with the origin
//! at the top-left corner; pixels are covered when their center is inside the shape.

use std::error;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use image::{ImageResult, RgbaImage};

use crate::surface::Surface;

/// Default canvas width, in pixels.
pub const DEFAULT_WIDTH: u32 = 300;

/// Default canvas height, in pixels.
pub const DEFAULT_HEIGHT: u32 = 150;

/// A non-premultiplied RGBA8 color.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Color {
  pub r: u8,
  pub g: u8,
  pub b: u8,
  pub a: u8,
}

impl Color {
  pub const TRANSPARENT: Color = Color::new(0, 0, 0, 0);
  pub const BLACK: Color = Color::new(0, 0, 0, 255);
  pub const WHITE: Color = Color::new(255, 255, 255, 255);
  pub const RED: Color = Color::new(255, 0, 0, 255);
  pub const GREEN: Color = Color::new(0, 128, 0, 255);
  pub const BLUE: Color = Color::new(0, 0, 255, 255);

  pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
    Color { r, g, b, a }
  }

  pub fn to_rgba8(self) -> [u8; 4] {
    [self.r, self.g, self.b, self.a]
  }

  /// Composite `self` over `dst`.
  pub fn over(self, dst: [u8; 4]) -> [u8; 4] {
    let sa = self.a as f32 / 255.;
    let da = dst[3] as f32 / 255.;
    let a = sa + da * (1. - sa);

    if a == 0. {
      return [0; 4];
    }

    let blend = |s: u8, d: u8| {
      let c = (s as f32 * sa + d as f32 * da * (1. - sa)) / a;
      c.round() as u8
    };

    [
      blend(self.r, dst[0]),
      blend(self.g, dst[1]),
      blend(self.b, dst[2]),
      (a * 255.).round() as u8,
    ]
  }
}

impl Default for Color {
  fn default() -> Self {
    Color::BLACK
  }
}

const NAMED: &[(&str, Color)] = &[
  ("transparent", Color::TRANSPARENT),
  ("black", Color::BLACK),
  ("white", Color::WHITE),
  ("red", Color::RED),
  ("green", Color::GREEN),
  ("lime", Color::new(0, 255, 0, 255)),
  ("blue", Color::BLUE),
  ("yellow", Color::new(255, 255, 0, 255)),
  ("cyan", Color::new(0, 255, 255, 255)),
  ("magenta", Color::new(255, 0, 255, 255)),
  ("gray", Color::new(128, 128, 128, 255)),
  ("grey", Color::new(128, 128, 128, 255)),
];

/// Errors that can occur when parsing a [`Color`].
#[non_exhaustive]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ColorParseError {
  /// The text is not a color in any supported syntax.
  InvalidSyntax(String),
  /// A component is not a number.
  InvalidComponent(String),
  /// The color name is not known.
  UnknownName(String),
}

impl fmt::Display for ColorParseError {
  fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
    match *self {
      ColorParseError::InvalidSyntax(ref s) => write!(f, "invalid color syntax: {}", s),
      ColorParseError::InvalidComponent(ref s) => write!(f, "invalid color component: {}", s),
      ColorParseError::UnknownName(ref s) => write!(f, "unknown color name: {}", s),
    }
  }
}

impl error::Error for ColorParseError {}

impl FromStr for Color {
  type Err = ColorParseError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let text = s.trim().to_ascii_lowercase();

    if let Some(hex) = text.strip_prefix('#') {
      return parse_hex(hex).ok_or_else(|| ColorParseError::InvalidSyntax(s.to_owned()));
    }

    if let Some(args) = function_args(&text, "rgba") {
      return parse_components(&args, 4, s);
    }

    if let Some(args) = function_args(&text, "rgb") {
      return parse_components(&args, 3, s);
    }

    if text.chars().all(|c| c.is_ascii_alphabetic()) && !text.is_empty() {
      return NAMED
        .iter()
        .find(|&&(name, _)| name == text)
        .map(|&(_, color)| color)
        .ok_or_else(|| ColorParseError::UnknownName(s.to_owned()));
    }

    Err(ColorParseError::InvalidSyntax(s.to_owned()))
  }
}

fn parse_hex(hex: &str) -> Option<Color> {
  if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
    return None;
  }

  let digit = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok();
  let pair = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();

  match hex.len() {
    3 => Some(Color::new(
      digit(0)? * 17,
      digit(1)? * 17,
      digit(2)? * 17,
      255,
    )),
    6 => Some(Color::new(pair(0)?, pair(2)?, pair(4)?, 255)),
    _ => None,
  }
}

// Arguments of `name(a, b, …)`.
fn function_args(text: &str, name: &str) -> Option<Vec<String>> {
  let inner = text
    .strip_prefix(name)?
    .trim_start()
    .strip_prefix('(')?
    .strip_suffix(')')?;

  Some(inner.split(',').map(|a| a.trim().to_owned()).collect())
}

fn parse_components(args: &[String], expected: usize, src: &str) -> Result<Color, ColorParseError> {
  if args.len() != expected {
    return Err(ColorParseError::InvalidSyntax(src.to_owned()));
  }

  let number = |a: &String| {
    a.parse::<f32>()
      .ok()
      .filter(|x| x.is_finite())
      .ok_or_else(|| ColorParseError::InvalidComponent(a.clone()))
  };

  let channel = |a: &String| number(a).map(|x| x.max(0.).min(255.).round() as u8);

  let alpha = match args.get(3) {
    Some(a) => (number(a)?.max(0.).min(1.) * 255.).round() as u8,
    None => 255,
  };

  Ok(Color::new(
    channel(&args[0])?,
    channel(&args[1])?,
    channel(&args[2])?,
    alpha,
  ))
}

/// A 2D drawing surface.
#[derive(Clone, Debug)]
pub struct Canvas2d {
  surface: Surface,
  fill_style: Color,
  // closed implicitly when filled
  subpaths: Vec<Vec<[f32; 2]>>,
}

impl Default for Canvas2d {
  fn default() -> Self {
    Canvas2d::new(DEFAULT_WIDTH, DEFAULT_HEIGHT)
  }
}

impl Canvas2d {
  /// New transparent canvas; the fill style is black.
  pub fn new(width: u32, height: u32) -> Self {
    Canvas2d {
      surface: Surface::new(width, height),
      fill_style: Color::BLACK,
      subpaths: Vec::new(),
    }
  }

  pub fn width(&self) -> u32 {
    self.surface.width()
  }

  pub fn height(&self) -> u32 {
    self.surface.height()
  }

  pub fn fill_style(&self) -> Color {
    self.fill_style
  }

  pub fn set_fill_style(&mut self, color: Color) {
    self.fill_style = color;
  }

  /// Fill a rectangle with the fill style; negative sizes extend to the left or top.
  pub fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
    let (x0, x1) = (x.min(x + width), x.max(x + width));
    let (y0, y1) = (y.min(y + height), y.max(y + height));

    let [cx0, cx1] = self.columns(x0, x1);
    let [cy0, cy1] = self.rows(y0, y1);

    for py in cy0..cy1 {
      for px in cx0..cx1 {
        self.blend(px, py);
      }
    }
  }

  /// Forget the current path.
  pub fn begin_path(&mut self) {
    self.subpaths.clear();
  }

  /// Start a new subpath at `(x, y)`.
  pub fn move_to(&mut self, x: f32, y: f32) {
    self.subpaths.push(vec![[x, y]]);
  }

  /// Add a straight line to `(x, y)`; acts like [`Canvas2d::move_to`] on an empty path.
  pub fn line_to(&mut self, x: f32, y: f32) {
    match self.subpaths.last_mut() {
      Some(subpath) => subpath.push([x, y]),
      None => self.move_to(x, y),
    }
  }

  /// Close the current subpath and start a new one at its first point.
  pub fn close_path(&mut self) {
    let first = self
      .subpaths
      .last()
      .filter(|p| p.len() > 1)
      .and_then(|p| p.first().copied());

    if let Some([x, y]) = first {
      if let Some(subpath) = self.subpaths.last_mut() {
        subpath.push([x, y]);
      }

      self.move_to(x, y);
    }
  }

  /// Fill the current path with the fill style, using the nonzero winding rule.
  pub fn fill(&mut self) {
    let edges: Vec<([f32; 2], [f32; 2])> = self
      .subpaths
      .iter()
      .filter(|p| p.len() > 2)
      .flat_map(|p| {
        p.iter()
          .zip(p.iter().cycle().skip(1))
          .map(|(&a, &b)| (a, b))
      })
      .collect();

    if edges.is_empty() {
      return;
    }

    let (mut x0, mut y0, mut x1, mut y1) = (f32::MAX, f32::MAX, f32::MIN, f32::MIN);
    for &([x, y], _) in &edges {
      x0 = x0.min(x);
      y0 = y0.min(y);
      x1 = x1.max(x);
      y1 = y1.max(y);
    }

    let [cx0, cx1] = self.columns(x0, x1);
    let [cy0, cy1] = self.rows(y0, y1);

    for py in cy0..cy1 {
      for px in cx0..cx1 {
        if winding(&edges, px as f32 + 0.5, py as f32 + 0.5) != 0 {
          self.blend(px, py);
        }
      }
    }
  }

  pub fn surface(&self) -> &Surface {
    &self.surface
  }

  pub fn into_surface(self) -> Surface {
    self.surface
  }

  pub fn to_image(&self) -> RgbaImage {
    self.surface.to_image()
  }

  pub fn save_png(&self, path: impl AsRef<Path>) -> ImageResult<()> {
    self.surface.save_png(path)
  }

  // Pixel columns which centers lie in [a, b).
  fn columns(&self, a: f32, b: f32) -> [u32; 2] {
    span(a, b, self.surface.width())
  }

  fn rows(&self, a: f32, b: f32) -> [u32; 2] {
    span(a, b, self.surface.height())
  }

  fn blend(&mut self, x: u32, y: u32) {
    if let Some(dst) = self.surface.pixel(x, y) {
      self.surface.set_pixel(x, y, self.fill_style.over(dst));
    }
  }
}

fn span(a: f32, b: f32, max: u32) -> [u32; 2] {
  let clamp = |v: f32| v.max(0.).min(max as f32) as u32;
  [clamp((a - 0.5).ceil()), clamp((b - 0.5).ceil())]
}

// Nonzero winding number of the point (x, y).
fn winding(edges: &[([f32; 2], [f32; 2])], x: f32, y: f32) -> i32 {
  let mut w = 0;

  for &(a, b) in edges {
    let side = (b[0] - a[0]) * (y - a[1]) - (x - a[0]) * (b[1] - a[1]);

    if a[1] <= y {
      if b[1] > y && side > 0. {
        w += 1;
      }
    } else if b[1] <= y && side < 0. {
      w -= 1;
    }
  }

  w
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn color_syntax() {
    assert_eq!("rgba(255, 0, 0, 1)".parse(), Ok(Color::RED));
    assert_eq!("rgba(0,0,0,0.5)".parse(), Ok(Color::new(0, 0, 0, 128)));
    assert_eq!("rgb(10, 20, 30)".parse(), Ok(Color::new(10, 20, 30, 255)));
    assert_eq!("#f00".parse(), Ok(Color::RED));
    assert_eq!("#0080FF".parse(), Ok(Color::new(0, 128, 255, 255)));
    assert_eq!(" Black ".parse(), Ok(Color::BLACK));
    assert_eq!("rgb(300, -2, 7.6)".parse(), Ok(Color::new(255, 0, 8, 255)));
  }

  #[test]
  fn color_errors() {
    assert_eq!(
      "#ff".parse::<Color>(),
      Err(ColorParseError::InvalidSyntax("#ff".to_owned()))
    );
    assert_eq!(
      "rgba(1, 2, 3)".parse::<Color>(),
      Err(ColorParseError::InvalidSyntax("rgba(1, 2, 3)".to_owned()))
    );
    assert_eq!(
      "rgb(1, x, 3)".parse::<Color>(),
      Err(ColorParseError::InvalidComponent("x".to_owned()))
    );
    assert_eq!(
      "chartreuse".parse::<Color>(),
      Err(ColorParseError::UnknownName("chartreuse".to_owned()))
    );
    assert!("".parse::<Color>().is_err());
  }

  #[test]
  fn source_over() {
    let half_red = Color::new(255, 0, 0, 128);
    assert_eq!(half_red.over([0, 0, 255, 255]), [128, 0, 127, 255]);
    assert_eq!(Color::BLUE.over([255, 0, 0, 255]), [0, 0, 255, 255]);
    assert_eq!(Color::TRANSPARENT.over([0; 4]), [0; 4]);
  }

  #[test]
  fn fill_rect_covers_pixel_centers() {
    let mut canvas = Canvas2d::new(10, 10);
    canvas.set_fill_style(Color::WHITE);
    canvas.fill_rect(1.5, 2., 2., -2.);

    let lit: Vec<(u32, u32)> = (0..10)
      .flat_map(|y| (0..10).map(move |x| (x, y)))
      .filter(|&(x, y)| canvas.surface().pixel(x, y) == Some([255; 4]))
      .collect();

    assert_eq!(lit, [(1, 0), (2, 0), (1, 1), (2, 1)]);
  }

  #[test]
  fn nonzero_winding() {
    let mut canvas = Canvas2d::new(10, 10);
    canvas.set_fill_style(Color::WHITE);

    // two nested squares wound the same way: the inner one stays filled
    canvas.begin_path();
    for &(a, b) in &[(0., 10.), (3., 7.)] {
      canvas.move_to(a, a);
      canvas.line_to(b, a);
      canvas.line_to(b, b);
      canvas.line_to(a, b);
      canvas.close_path();
    }
    canvas.fill();
    assert_eq!(canvas.surface().pixel(5, 5), Some([255; 4]));

    // wound the other way, the inner square is a hole
    let mut canvas = Canvas2d::new(10, 10);
    canvas.set_fill_style(Color::WHITE);
    canvas.move_to(0., 0.);
    canvas.line_to(10., 0.);
    canvas.line_to(10., 10.);
    canvas.line_to(0., 10.);
    canvas.move_to(3., 3.);
    canvas.line_to(3., 7.);
    canvas.line_to(7., 7.);
    canvas.line_to(7., 3.);
    canvas.fill();

    assert_eq!(canvas.surface().pixel(5, 5), Some([0; 4]));
    assert_eq!(canvas.surface().pixel(1, 1), Some([255; 4]));
  }

  #[test]
  fn begin_path_forgets_previous_shapes() {
    let mut canvas = Canvas2d::new(4, 4);
    canvas.set_fill_style(Color::WHITE);
    canvas.move_to(0., 0.);
    canvas.line_to(4., 0.);
    canvas.line_to(0., 4.);
    canvas.begin_path();
    canvas.fill();

    assert!(canvas.surface().pixels().iter().all(|&p| p == [0; 4]));
  }
}
