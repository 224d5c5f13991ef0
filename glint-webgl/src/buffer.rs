//! WebGL buffer implementation.

use glint::backend::buffer::Buffer as BufferBackend;
use glint::buffer::{BufferError, BufferUsage};
use std::{cell::RefCell, rc::Rc};
use web_sys::{WebGlBuffer, WebGlRenderingContext};

use crate::state::{Bind, WebGlState};
use crate::WebGl;

/// WebGL buffer.
///
/// The buffer is unbound and deleted when dropped.
#[derive(Debug)]
pub struct Buffer {
  gl_buf: WebGlBuffer,
  len: usize,
  state: Rc<RefCell<WebGlState>>,
}

impl Buffer {
  pub fn handle(&self) -> &WebGlBuffer {
    &self.gl_buf
  }
}

impl Drop for Buffer {
  fn drop(&mut self) {
    let mut state = self.state.borrow_mut();
    state.unbind_buffer(&self.gl_buf);
    state.ctx.delete_buffer(Some(&self.gl_buf));
  }
}

unsafe impl BufferBackend for WebGl {
  type BufferRepr = Buffer;

  unsafe fn new_buffer(
    &mut self,
    bytes: &[u8],
    usage: BufferUsage,
  ) -> Result<Self::BufferRepr, BufferError> {
    let mut state = self.state.borrow_mut();

    // the context refuses to create buffers once lost
    let gl_buf = state
      .ctx
      .create_buffer()
      .ok_or_else(|| BufferError::creation_failed("unable to create buffer"))?;
    state.bind_array_buffer(Some(&gl_buf), Bind::Forced);

    state.ctx.buffer_data_with_u8_array(
      WebGlRenderingContext::ARRAY_BUFFER,
      bytes,
      webgl_buffer_usage(usage),
    );

    Ok(Buffer {
      gl_buf,
      len: bytes.len(),
      state: self.state.clone(),
    })
  }

  unsafe fn bind_array_buffer(&mut self, buffer: &Self::BufferRepr) {
    self
      .state
      .borrow_mut()
      .bind_array_buffer(Some(&buffer.gl_buf), Bind::Cached);
  }

  unsafe fn buffer_size(buffer: &Self::BufferRepr) -> usize {
    buffer.len
  }
}

fn webgl_buffer_usage(usage: BufferUsage) -> u32 {
  match usage {
    BufferUsage::StaticDraw => WebGlRenderingContext::STATIC_DRAW,
    BufferUsage::DynamicDraw => WebGlRenderingContext::DYNAMIC_DRAW,
    BufferUsage::StreamDraw => WebGlRenderingContext::STREAM_DRAW,
  }
}
