//! Software backend for glint.
//!
//! This crate implements the glint backend traits without any GPU: shaders are compiled by a small
//! front end for a subset of GLSL ES 1.00 ([`glsl`]), programs are linked by [`linker`] and draw
//! calls run an edge-function rasterizer ([`raster`]) that executes the shaders once per vertex and
//! once per covered pixel. Pixels end up in a [`Surface`], which can be inspected or saved as PNG.
//!
//! The backend type is [`Soft`]; [`SoftContext`] is the graphics context giving access to it.
//!
//! ```
//! use glint::scene::Scene;
//! use glint_soft::SoftContext;
//!
//! let mut ctx = SoftContext::new(300, 150);
//! Scene::default().render(&mut ctx).expect("render");
//!
//! // inside the triangle
//! assert_eq!(ctx.surface().pixel(160, 70), Some([255, 0, 0, 255]));
//! ```
//!
//! A [`Canvas2d`](canvas::Canvas2d) is also provided to draw simple filled shapes in the style of
//! the HTML canvas 2D context.

mod buffer;
pub mod canvas;
pub mod glsl;
pub mod linker;
mod pipeline;
pub mod raster;
mod shader;
mod state;
pub mod surface;

use std::cell::{Ref, RefCell};
use std::path::Path;
use std::rc::Rc;

use glint::context::GraphicsContext;
use image::{ImageResult, RgbaImage};

pub use crate::buffer::Buffer;
pub use crate::shader::{Program, Stage};
pub use crate::state::{AttribPointer, SoftState};
pub use crate::surface::Surface;

/// The software backend.
#[derive(Debug)]
pub struct Soft {
  pub(crate) state: Rc<RefCell<SoftState>>,
}

impl Soft {
  /// New backend rendering into a `width` × `height` surface.
  pub fn new(width: u32, height: u32) -> Self {
    Soft {
      state: Rc::new(RefCell::new(SoftState::new(width, height))),
    }
  }

  /// Current state of the backend.
  ///
  /// The borrow must be released before issuing any other operation on the backend.
  pub fn state(&self) -> Ref<SoftState> {
    self.state.borrow()
  }
}

/// Graphics context of the software backend.
#[derive(Debug)]
pub struct SoftContext {
  backend: Soft,
}

unsafe impl GraphicsContext for SoftContext {
  type Backend = Soft;

  fn backend(&mut self) -> &mut Self::Backend {
    &mut self.backend
  }
}

impl SoftContext {
  /// New context rendering into a `width` × `height` surface.
  pub fn new(width: u32, height: u32) -> Self {
    SoftContext {
      backend: Soft::new(width, height),
    }
  }

  /// See [`Soft::state`].
  pub fn state(&self) -> Ref<SoftState> {
    self.backend.state()
  }

  /// The color surface.
  pub fn surface(&self) -> Ref<Surface> {
    Ref::map(self.backend.state(), SoftState::surface)
  }

  /// Copy the color surface into an image.
  pub fn to_image(&self) -> RgbaImage {
    self.surface().to_image()
  }

  /// Save the color surface as a PNG file.
  pub fn save_png(&self, path: impl AsRef<Path>) -> ImageResult<()> {
    self.surface().save_png(path)
  }
}
