//! WebGL backend for glint.
//!
//! This crate provides a glint backend for [WebGL] 1.0, [`WebGl`], and [`WebGlSurface`], a graphics
//! context bound to a `<canvas>` element of the page.
//!
//! ```ignore
//! use glint::scene::Scene;
//! use glint_webgl::WebGlSurface;
//!
//! let mut surface = WebGlSurface::from_canvas_id("glCanvas")?;
//! let scene = Scene::default().render(&mut surface)?;
//! ```
//!
//! [WebGL]: https://www.khronos.org/webgl

mod buffer;
mod pipeline;
mod shader;
mod state;

pub use crate::buffer::Buffer;
pub use crate::shader::{Program, Stage};
pub use crate::state::{StateQueryError, WebGlState};
use glint::context::GraphicsContext;
use std::{cell::RefCell, fmt, rc::Rc};
use wasm_bindgen::JsCast;
use web_sys::{HtmlCanvasElement, WebGlRenderingContext};

/// The WebGL backend.
#[derive(Debug)]
pub struct WebGl {
  pub(crate) state: Rc<RefCell<WebGlState>>,
}

impl WebGl {
  pub fn new(ctx: WebGlRenderingContext) -> Result<Self, StateQueryError> {
    WebGlState::new(ctx).map(|state| WebGl {
      state: Rc::new(RefCell::new(state)),
    })
  }

  /// Internal access to the backend state.
  pub fn state(&self) -> &Rc<RefCell<WebGlState>> {
    &self.state
  }
}

/// web-sys errors that might occur while grabbing the canvas and its context.
#[non_exhaustive]
#[derive(Debug)]
pub enum WebGlSurfaceError {
  CannotGrabWindow,
  CannotGrabDocument,
  NoSuchCanvasElement(String),
  NotACanvasElement(String),
  CannotGrabWebGlContext,
  NoAvailableWebGlContext,
  StateQueryError(StateQueryError),
}

impl WebGlSurfaceError {
  fn no_such_canvas_element(name: impl Into<String>) -> Self {
    WebGlSurfaceError::NoSuchCanvasElement(name.into())
  }

  fn not_a_canvas_element(name: impl Into<String>) -> Self {
    WebGlSurfaceError::NotACanvasElement(name.into())
  }
}

impl fmt::Display for WebGlSurfaceError {
  fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
    match *self {
      WebGlSurfaceError::CannotGrabWindow => f.write_str("cannot grab the window node"),
      WebGlSurfaceError::CannotGrabDocument => f.write_str("cannot grab the document node"),
      WebGlSurfaceError::NoSuchCanvasElement(ref name) => {
        write!(f, "cannot grab canvas named {}", name)
      }
      WebGlSurfaceError::NotACanvasElement(ref name) => {
        write!(f, "element {} is not a canvas", name)
      }
      WebGlSurfaceError::CannotGrabWebGlContext => f.write_str("cannot grab WebGL context"),
      WebGlSurfaceError::NoAvailableWebGlContext => f.write_str("no available WebGL context"),
      WebGlSurfaceError::StateQueryError(ref e) => {
        write!(f, "failed to get graphics state: {}", e)
      }
    }
  }
}

impl std::error::Error for WebGlSurfaceError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      WebGlSurfaceError::StateQueryError(e) => Some(e),
      _ => None,
    }
  }
}

impl From<StateQueryError> for WebGlSurfaceError {
  fn from(e: StateQueryError) -> Self {
    WebGlSurfaceError::StateQueryError(e)
  }
}

/// Graphics context rendering into a `<canvas>` element.
#[derive(Debug)]
pub struct WebGlSurface {
  canvas: HtmlCanvasElement,
  backend: WebGl,
}

impl WebGlSurface {
  /// Grab the canvas with the given `id` in the current document and its `webgl` context.
  pub fn from_canvas_id(id: &str) -> Result<Self, WebGlSurfaceError> {
    let window = web_sys::window().ok_or(WebGlSurfaceError::CannotGrabWindow)?;
    let document = window
      .document()
      .ok_or(WebGlSurfaceError::CannotGrabDocument)?;

    let canvas = document
      .get_element_by_id(id)
      .ok_or_else(|| WebGlSurfaceError::no_such_canvas_element(id))?
      .dyn_into::<HtmlCanvasElement>()
      .map_err(|_| WebGlSurfaceError::not_a_canvas_element(id))?;

    Self::from_canvas(canvas)
  }

  /// Grab the `webgl` context of `canvas`.
  pub fn from_canvas(canvas: HtmlCanvasElement) -> Result<Self, WebGlSurfaceError> {
    let context = canvas
      .get_context("webgl")
      .map_err(|_| WebGlSurfaceError::CannotGrabWebGlContext)?
      .ok_or(WebGlSurfaceError::NoAvailableWebGlContext)?
      .dyn_into::<WebGlRenderingContext>()
      .map_err(|_| WebGlSurfaceError::CannotGrabWebGlContext)?;

    let backend = WebGl::new(context)?;
    log::info!(
      "WebGL context ready ({}×{} canvas)",
      canvas.width(),
      canvas.height()
    );

    Ok(WebGlSurface { canvas, backend })
  }

  /// The canvas element.
  pub fn canvas(&self) -> &HtmlCanvasElement {
    &self.canvas
  }
}

unsafe impl GraphicsContext for WebGlSurface {
  type Backend = WebGl;

  fn backend(&mut self) -> &mut Self::Backend {
    &mut self.backend
  }
}
