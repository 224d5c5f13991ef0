//! Buffer backend interface.
//!
//! This interface defines the low-level API vertex buffers must implement to be usable.

use crate::buffer::{BufferError, BufferUsage};

/// Buffer backend.
///
/// You want to implement that trait on your backend type to support vertex buffers.
///
/// # Safety
///
/// [`Buffer::new_buffer`] must leave the new buffer bound as the array buffer. Dropping a
/// representation that is currently bound must clear the bound array buffer slot.
pub unsafe trait Buffer {
  /// The inner representation of the buffer for this backend.
  type BufferRepr;

  /// Allocate a buffer object, bind it as the array buffer and copy `bytes` into it.
  unsafe fn new_buffer(
    &mut self,
    bytes: &[u8],
    usage: BufferUsage,
  ) -> Result<Self::BufferRepr, BufferError>;

  /// Bind a buffer as the array buffer.
  unsafe fn bind_array_buffer(&mut self, buffer: &Self::BufferRepr);

  /// Size of the buffer, in bytes.
  unsafe fn buffer_size(buffer: &Self::BufferRepr) -> usize;
}
