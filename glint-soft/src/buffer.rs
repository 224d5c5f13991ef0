use std::cell::RefCell;
use std::rc::Rc;

use glint::backend::buffer::Buffer as BufferBackend;
use glint::buffer::{BufferError, BufferUsage};

use crate::state::{BufferObject, SoftState};
use crate::Soft;

/// Software buffer.
///
/// The buffer object is deleted from the state when dropped.
#[derive(Debug)]
pub struct Buffer {
  handle: usize,
  len: usize,
  state: Rc<RefCell<SoftState>>,
}

impl Buffer {
  pub fn handle(&self) -> usize {
    self.handle
  }
}

impl Drop for Buffer {
  fn drop(&mut self) {
    self.state.borrow_mut().delete_buffer(self.handle);
  }
}

unsafe impl BufferBackend for Soft {
  type BufferRepr = Buffer;

  unsafe fn new_buffer(
    &mut self,
    bytes: &[u8],
    usage: BufferUsage,
  ) -> Result<Self::BufferRepr, BufferError> {
    let mut state = self.state.borrow_mut();
    let handle = state.buffers.insert(BufferObject {
      data: bytes.to_vec(),
      usage,
    });
    state.bind_array_buffer(handle);

    Ok(Buffer {
      handle,
      len: bytes.len(),
      state: self.state.clone(),
    })
  }

  unsafe fn bind_array_buffer(&mut self, buffer: &Self::BufferRepr) {
    self.state.borrow_mut().bind_array_buffer(buffer.handle);
  }

  unsafe fn buffer_size(buffer: &Self::BufferRepr) -> usize {
    buffer.len
  }
}
