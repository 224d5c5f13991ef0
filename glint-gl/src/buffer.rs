//! OpenGL buffer implementation.

use gl::types::*;
use glint::backend::buffer::Buffer as BufferBackend;
use glint::buffer::{BufferError, BufferUsage};
use std::cell::RefCell;
use std::rc::Rc;

use crate::state::{Bind, GlState};
use crate::Gl;

/// OpenGL buffer.
///
/// The buffer is unbound and deleted when dropped.
#[derive(Debug)]
pub struct Buffer {
  handle: GLuint,
  len: usize,
  state: Rc<RefCell<GlState>>,
}

impl Buffer {
  pub fn handle(&self) -> GLuint {
    self.handle
  }
}

impl Drop for Buffer {
  fn drop(&mut self) {
    unsafe {
      self.state.borrow_mut().unbind_buffer(self.handle);
      gl::DeleteBuffers(1, &self.handle);
    }
  }
}

unsafe impl BufferBackend for Gl {
  type BufferRepr = Buffer;

  unsafe fn new_buffer(
    &mut self,
    bytes: &[u8],
    usage: BufferUsage,
  ) -> Result<Self::BufferRepr, BufferError> {
    let mut handle: GLuint = 0;
    gl::GenBuffers(1, &mut handle);

    if handle == 0 {
      return Err(BufferError::creation_failed(
        "unable to create buffer object",
      ));
    }

    self
      .state
      .borrow_mut()
      .bind_array_buffer(handle, Bind::Forced);

    gl::BufferData(
      gl::ARRAY_BUFFER,
      bytes.len() as GLsizeiptr,
      bytes.as_ptr() as _,
      opengl_buffer_usage(usage),
    );

    Ok(Buffer {
      handle,
      len: bytes.len(),
      state: self.state.clone(),
    })
  }

  unsafe fn bind_array_buffer(&mut self, buffer: &Self::BufferRepr) {
    self
      .state
      .borrow_mut()
      .bind_array_buffer(buffer.handle, Bind::Cached);
  }

  unsafe fn buffer_size(buffer: &Self::BufferRepr) -> usize {
    buffer.len
  }
}

fn opengl_buffer_usage(usage: BufferUsage) -> GLenum {
  match usage {
    BufferUsage::StaticDraw => gl::STATIC_DRAW,
    BufferUsage::DynamicDraw => gl::DYNAMIC_DRAW,
    BufferUsage::StreamDraw => gl::STREAM_DRAW,
  }
}
