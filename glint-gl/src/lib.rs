//! OpenGL backend.
//!
//! This crate exports an [OpenGL](https://www.khronos.org/opengl/) backend for glint. The backend
//! type is [`Gl`]. It doesn’t create any context: the host (for instance `glint-glfw`) makes an
//! OpenGL context current on the thread, loads the function pointers with [`gl::load_with`] and
//! then creates the backend with the size of the default framebuffer.
//!
//! Shader sources without a `#version` directive are compiled as GLSL ES 1.00 (`#version 100`),
//! which requires a driver supporting `GL_ARB_ES2_compatibility` (any OpenGL 4.1 context).

mod buffer;
mod pipeline;
mod shader;
mod state;

pub use gl;

pub use crate::buffer::Buffer;
pub use crate::shader::{Program, Stage};
pub use crate::state::{GlState, StateQueryError};
use std::cell::RefCell;
use std::rc::Rc;

/// An OpenGL backend.
///
/// This type is to be used as a glint backend type. It implements the whole backend interface.
#[derive(Debug)]
pub struct Gl {
  pub(crate) state: Rc<RefCell<GlState>>,
}

impl Gl {
  /// Create a new OpenGL backend over the context current on this thread.
  ///
  /// Only one backend can be created per thread; any other attempt fails with
  /// [`StateQueryError::UnavailableGlState`].
  pub fn new(surface_size: [u32; 2]) -> Result<Self, StateQueryError> {
    GlState::new(surface_size).map(|state| Gl {
      state: Rc::new(RefCell::new(state)),
    })
  }

  /// Internal access to the backend state.
  ///
  /// # Unsafety
  ///
  /// This method is unsafe as it exposes the internals of the backend. Mutating it out of sync with
  /// the driver breaks the cache.
  pub unsafe fn state(&self) -> &Rc<RefCell<GlState>> {
    &self.state
  }
}
