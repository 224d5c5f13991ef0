//! [GLFW](https://crates.io/crates/glfw) surface for glint.
//!
//! [`GlfwSurface`] opens a window with an OpenGL context and wraps it in a [`GlfwContext`], a
//! [`GraphicsContext`] whose backend is [`glint_gl::Gl`].

#![deny(missing_docs)]

use glfw::{self, Context as _, Glfw, InitError, Window, WindowEvent, WindowMode};
use glint::context::GraphicsContext;
pub use glint_gl::StateQueryError;
use glint_gl::{gl, Gl};
use std::{error, fmt, os::raw::c_void, sync::mpsc::Receiver};

/// Error that can be risen while creating a surface.
#[non_exhaustive]
#[derive(Debug)]
pub enum GlfwSurfaceError {
  /// Initialization of the surface went wrong.
  ///
  /// This variant exposes a **glfw** error for further information about what went wrong.
  InitError(InitError),

  /// The window (and its OpenGL context) could not be created.
  WindowCreationFailed,

  /// The graphics state is not available.
  ///
  /// This error is generated when the initialization code is called on a thread on which the
  /// graphics state has already been acquired.
  GraphicsStateError(StateQueryError),
}

impl fmt::Display for GlfwSurfaceError {
  fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
    match *self {
      GlfwSurfaceError::InitError(ref e) => write!(f, "initialization error: {}", e),
      GlfwSurfaceError::WindowCreationFailed => f.write_str("failed to create the window"),
      GlfwSurfaceError::GraphicsStateError(ref e) => {
        write!(f, "failed to get graphics state: {}", e)
      }
    }
  }
}

impl From<InitError> for GlfwSurfaceError {
  fn from(e: InitError) -> Self {
    GlfwSurfaceError::InitError(e)
  }
}

impl From<StateQueryError> for GlfwSurfaceError {
  fn from(e: StateQueryError) -> Self {
    GlfwSurfaceError::GraphicsStateError(e)
  }
}

impl error::Error for GlfwSurfaceError {
  fn source(&self) -> Option<&(dyn error::Error + 'static)> {
    match self {
      GlfwSurfaceError::InitError(e) => Some(e),
      GlfwSurfaceError::WindowCreationFailed => None,
      GlfwSurfaceError::GraphicsStateError(e) => Some(e),
    }
  }
}

/// GLFW surface.
///
/// This type is a helper that exposes two important concepts: the GLFW event receiver that you can
/// use to poll events and the [`GlfwContext`], which allows you to perform the rendering part.
#[derive(Debug)]
pub struct GlfwSurface {
  /// Wrapped GLFW events queue.
  pub events_rx: Receiver<(f64, WindowEvent)>,

  /// Wrapped glint context.
  pub context: GlfwContext,
}

impl GlfwSurface {
  /// Initialize GLFW and let `create_window` open the window.
  ///
  /// The OpenGL hints are set before `create_window` runs; the context of the returned window is
  /// made current and the OpenGL function pointers are loaded from it.
  pub fn new(
    create_window: impl FnOnce(
      &mut Glfw,
    ) -> Result<(Window, Receiver<(f64, WindowEvent)>), GlfwSurfaceError>,
  ) -> Result<Self, GlfwSurfaceError> {
    let mut glfw = glfw::init(glfw::FAIL_ON_ERRORS)?;

    // OpenGL hints; 4.1 is the first core version accepting GLSL ES 1.00 shaders
    glfw.window_hint(glfw::WindowHint::OpenGlProfile(
      glfw::OpenGlProfileHint::Core,
    ));
    glfw.window_hint(glfw::WindowHint::OpenGlForwardCompat(true));
    glfw.window_hint(glfw::WindowHint::ContextVersionMajor(4));
    glfw.window_hint(glfw::WindowHint::ContextVersionMinor(1));

    let (mut window, events_rx) = create_window(&mut glfw)?;
    window.make_current();
    window.set_all_polling(true);

    // init OpenGL
    gl::load_with(|s| window.get_proc_address(s) as *const c_void);

    let (w, h) = window.get_framebuffer_size();
    let gl = Gl::new([w.max(0) as u32, h.max(0) as u32])?;
    log::info!("OpenGL context ready ({}×{} framebuffer)", w, h);

    let context = GlfwContext { gl, window };
    let surface = GlfwSurface { events_rx, context };

    Ok(surface)
  }

  /// Open a windowed surface of `width` × `height` screen coordinates.
  pub fn new_windowed(
    title: &str,
    width: u32,
    height: u32,
  ) -> Result<Self, GlfwSurfaceError> {
    Self::new(|glfw| {
      glfw
        .create_window(width, height, title, WindowMode::Windowed)
        .ok_or(GlfwSurfaceError::WindowCreationFailed)
    })
  }
}

/// Glint context backed by a GLFW window.
///
/// This type also re-exports the GLFW window, if you need access to it.
#[derive(Debug)]
pub struct GlfwContext {
  // must drop before `window`
  gl: Gl,

  /// Wrapped GLFW window.
  pub window: Window,
}

impl GlfwContext {
  /// Query the framebuffer size of the window and forward it to the backend.
  ///
  /// Call this when the window reports a framebuffer resize.
  pub fn refresh_surface_size(&mut self) {
    let (w, h) = self.window.get_framebuffer_size();
    let size = [w.max(0) as u32, h.max(0) as u32];

    unsafe { self.gl.state().borrow_mut().set_surface_size(size) };
  }

  /// Present the rendered frame.
  pub fn swap_buffers(&mut self) {
    self.window.swap_buffers();
  }
}

unsafe impl GraphicsContext for GlfwContext {
  type Backend = Gl;

  fn backend(&mut self) -> &mut Self::Backend {
    &mut self.gl
  }
}
