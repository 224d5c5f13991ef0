//! Graphics state.

use gl::types::*;
use std::cell::RefCell;
use std::error;
use std::fmt;
use std::marker::PhantomData;

// TLS synchronization barrier for `GlState`.
thread_local!(static TLS_ACQUIRE_GFX_STATE: RefCell<Option<()>> = RefCell::new(Some(())));

/// Cached value.
///
/// A cached value is used to prevent issuing costly driver commands if we know the target value is
/// already set to what the command tries to set. An empty cache is always considered stale.
#[derive(Debug)]
struct Cached<T>(Option<T>)
where
  T: PartialEq;

impl<T> Cached<T>
where
  T: PartialEq,
{
  /// Cache a value.
  fn new(initial: T) -> Self {
    Cached(Some(initial))
  }

  /// Explicitly invalidate a value.
  ///
  /// This is necessary when we want to be able to force a driver command to run.
  fn invalidate(&mut self) {
    self.0 = None;
  }

  fn set(&mut self, value: T) {
    self.0 = Some(value);
  }

  /// Check if the cached value is invalid regarding a value.
  fn is_invalid(&self, new_val: &T) -> bool {
    match &self.0 {
      Some(ref t) => t != new_val,
      _ => true,
    }
  }
}

/// The graphics state.
///
/// This type represents the current state of the OpenGL context the backend drives. Every setter
/// goes through a small cache layer so that the same call with the same parameters is issued only
/// once.
#[derive(Debug)]
pub struct GlState {
  _a: PhantomData<*const ()>, // !Send and !Sync

  // size of the default framebuffer, supplied by the host
  surface_size: [u32; 2],

  viewport: Cached<[GLint; 4]>,
  clear_color: Cached<[GLfloat; 4]>,

  bound_array_buffer: GLuint,
  bound_vertex_array: GLuint,
  current_program: GLuint,

  // vertex array object holding the attribute configuration
  vertex_array: GLuint,
  enabled_attribs: Vec<bool>,
}

impl GlState {
  /// Create a new `GlState` for the OpenGL context current on this thread.
  ///
  /// > Note: keep in mind you can create only one per thread.
  pub(crate) fn new(surface_size: [u32; 2]) -> Result<Self, StateQueryError> {
    TLS_ACQUIRE_GFX_STATE.with(|rc| {
      let mut inner = rc.borrow_mut();

      match *inner {
        Some(_) => {
          inner.take();
          Self::get_from_context(surface_size)
        }

        None => Err(StateQueryError::UnavailableGlState),
      }
    })
  }

  fn get_from_context(surface_size: [u32; 2]) -> Result<Self, StateQueryError> {
    unsafe {
      let viewport = Cached::new(get_ctx_viewport()?);
      let clear_color = Cached::new(get_ctx_clear_color()?);
      let bound_array_buffer = get_ctx_bound_array_buffer()?;
      let current_program = get_ctx_current_program()?;
      let max_attribs = get_ctx_max_vertex_attribs()?;

      let mut vertex_array = 0;
      gl::GenVertexArrays(1, &mut vertex_array);

      if vertex_array == 0 {
        return Err(StateQueryError::NoVertexArray);
      }

      gl::BindVertexArray(vertex_array);

      Ok(GlState {
        _a: PhantomData,
        surface_size,
        viewport,
        clear_color,
        bound_array_buffer,
        bound_vertex_array: vertex_array,
        current_program,
        vertex_array,
        enabled_attribs: vec![false; max_attribs],
      })
    }
  }

  /// Size of the default framebuffer.
  pub fn surface_size(&self) -> [u32; 2] {
    self.surface_size
  }

  /// Change the size of the default framebuffer, typically after the host window got resized.
  pub fn set_surface_size(&mut self, size: [u32; 2]) {
    self.surface_size = size;
  }

  /// Currently bound array buffer, if any.
  pub fn bound_array_buffer(&self) -> Option<GLuint> {
    Some(self.bound_array_buffer).filter(|&h| h != 0)
  }

  /// Currently used program, if any.
  pub fn current_program(&self) -> Option<GLuint> {
    Some(self.current_program).filter(|&h| h != 0)
  }

  /// Whether the attribute at `location` is enabled.
  pub fn is_attrib_enabled(&self, location: u32) -> bool {
    self
      .enabled_attribs
      .get(location as usize)
      .copied()
      .unwrap_or(false)
  }

  /// Number of vertex attribute locations the driver supports.
  pub fn max_vertex_attribs(&self) -> usize {
    self.enabled_attribs.len()
  }

  /// Invalidate the cached viewport and clear color, e.g. after foreign code touched the context.
  pub fn invalidate(&mut self) {
    self.viewport.invalidate();
    self.clear_color.invalidate();
  }

  pub(crate) unsafe fn set_viewport(&mut self, viewport: [GLint; 4]) {
    if self.viewport.is_invalid(&viewport) {
      gl::Viewport(viewport[0], viewport[1], viewport[2], viewport[3]);
      self.viewport.set(viewport);
    }
  }

  pub(crate) unsafe fn set_clear_color(&mut self, clear_color: [GLfloat; 4]) {
    if self.clear_color.is_invalid(&clear_color) {
      gl::ClearColor(
        clear_color[0],
        clear_color[1],
        clear_color[2],
        clear_color[3],
      );
      self.clear_color.set(clear_color);
    }
  }

  pub(crate) unsafe fn bind_array_buffer(&mut self, handle: GLuint, bind: Bind) {
    if bind == Bind::Forced || self.bound_array_buffer != handle {
      gl::BindBuffer(gl::ARRAY_BUFFER, handle);
      self.bound_array_buffer = handle;
    }
  }

  pub(crate) unsafe fn unbind_buffer(&mut self, handle: GLuint) {
    if self.bound_array_buffer == handle {
      self.bind_array_buffer(0, Bind::Cached);
    }
  }

  /// Bind the vertex array object of the state.
  pub(crate) unsafe fn bind_vertex_array(&mut self, bind: Bind) {
    if bind == Bind::Forced || self.bound_vertex_array != self.vertex_array {
      gl::BindVertexArray(self.vertex_array);
      self.bound_vertex_array = self.vertex_array;
    }
  }

  pub(crate) unsafe fn enable_vertex_attrib(&mut self, location: u32) {
    if let Some(enabled) = self.enabled_attribs.get_mut(location as usize) {
      if !*enabled {
        gl::EnableVertexAttribArray(location);
        *enabled = true;
      }
    }
  }

  pub(crate) unsafe fn use_program(&mut self, handle: GLuint) {
    if self.current_program != handle {
      gl::UseProgram(handle);
      self.current_program = handle;
    }
  }

  pub(crate) unsafe fn unuse_program(&mut self, handle: GLuint) {
    if self.current_program == handle {
      self.use_program(0);
    }
  }
}

impl Drop for GlState {
  fn drop(&mut self) {
    unsafe {
      gl::DeleteVertexArrays(1, &self.vertex_array);
    }
  }
}

/// Should the binding be cached or forced to the provided value?
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub(crate) enum Bind {
  Forced,
  Cached,
}

/// An error that might happen when the context is queried.
#[non_exhaustive]
#[derive(Debug, Eq, PartialEq)]
pub enum StateQueryError {
  /// The [`GlState`] object is unavailable.
  ///
  /// That might occur if the current thread doesn’t support allocating a new graphics state. It
  /// might happen if you try to have more than one state on the same thread, for instance.
  UnavailableGlState,
  /// The driver refused to allocate the vertex array object.
  NoVertexArray,
  /// The driver reported a nonsensical number of vertex attributes.
  UnknownMaxVertexAttribs(GLint),
}

impl fmt::Display for StateQueryError {
  fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
    match *self {
      StateQueryError::UnavailableGlState => write!(f, "unavailable graphics state"),
      StateQueryError::NoVertexArray => write!(f, "cannot allocate the vertex array object"),
      StateQueryError::UnknownMaxVertexAttribs(ref n) => {
        write!(f, "unknown maximum number of vertex attributes: {}", n)
      }
    }
  }
}

impl error::Error for StateQueryError {}

unsafe fn get_ctx_viewport() -> Result<[GLint; 4], StateQueryError> {
  let mut data = [0; 4];
  gl::GetIntegerv(gl::VIEWPORT, data.as_mut_ptr());
  Ok(data)
}

unsafe fn get_ctx_clear_color() -> Result<[GLfloat; 4], StateQueryError> {
  let mut data = [0.; 4];
  gl::GetFloatv(gl::COLOR_CLEAR_VALUE, data.as_mut_ptr());
  Ok(data)
}

unsafe fn get_ctx_bound_array_buffer() -> Result<GLuint, StateQueryError> {
  let mut bound = 0 as GLint;
  gl::GetIntegerv(gl::ARRAY_BUFFER_BINDING, &mut bound);
  Ok(bound as GLuint)
}

unsafe fn get_ctx_current_program() -> Result<GLuint, StateQueryError> {
  let mut used = 0 as GLint;
  gl::GetIntegerv(gl::CURRENT_PROGRAM, &mut used);
  Ok(used as GLuint)
}

unsafe fn get_ctx_max_vertex_attribs() -> Result<usize, StateQueryError> {
  let mut max = 0 as GLint;
  gl::GetIntegerv(gl::MAX_VERTEX_ATTRIBS, &mut max);

  if max > 0 {
    Ok(max as usize)
  } else {
    Err(StateQueryError::UnknownMaxVertexAttribs(max))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn cached_values_are_only_stale_when_different() {
    let mut viewport = Cached::new([0, 0, 300, 150]);

    assert!(!viewport.is_invalid(&[0, 0, 300, 150]));
    assert!(viewport.is_invalid(&[0, 0, 150, 150]));

    viewport.set([0, 0, 150, 150]);
    assert!(!viewport.is_invalid(&[0, 0, 150, 150]));

    viewport.invalidate();
    assert!(viewport.is_invalid(&[0, 0, 150, 150]));
  }

  #[test]
  fn state_query_errors_display() {
    assert_eq!(
      StateQueryError::UnavailableGlState.to_string(),
      "unavailable graphics state"
    );
    assert_eq!(
      StateQueryError::UnknownMaxVertexAttribs(-1).to_string(),
      "unknown maximum number of vertex attributes: -1"
    );
  }
}
