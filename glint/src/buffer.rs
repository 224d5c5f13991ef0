//! Vertex buffers.
//!
//! A vertex buffer is a region of context memory holding vertex data. It is filled once, at
//! creation, and read by draw calls through an [`AttributeBinding`](crate::vertex::AttributeBinding).

use std::error;
use std::fmt;
use std::marker::PhantomData;

use crate::backend::buffer::Buffer;
use crate::context::GraphicsContext;

/// Usage hint given to the context when uploading buffer data.
///
/// Hints don’t change the semantics of a buffer; they let the context pick a suitable memory
/// location.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BufferUsage {
  /// Written once, read many times (the default).
  StaticDraw,
  /// Written repeatedly, read many times.
  DynamicDraw,
  /// Written once, read a few times.
  StreamDraw,
}

impl Default for BufferUsage {
  fn default() -> Self {
    BufferUsage::StaticDraw
  }
}

impl fmt::Display for BufferUsage {
  fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
    match *self {
      BufferUsage::StaticDraw => f.write_str("static draw"),
      BufferUsage::DynamicDraw => f.write_str("dynamic draw"),
      BufferUsage::StreamDraw => f.write_str("stream draw"),
    }
  }
}

/// Buffer errors.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum BufferError {
  /// The context refused to allocate a buffer object.
  CreationFailed(String),
}

impl BufferError {
  /// The context refused to allocate a buffer object.
  pub fn creation_failed(reason: impl Into<String>) -> Self {
    BufferError::CreationFailed(reason.into())
  }
}

impl fmt::Display for BufferError {
  fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
    match *self {
      BufferError::CreationFailed(ref reason) => write!(f, "cannot create buffer: {}", reason),
    }
  }
}

impl error::Error for BufferError {}

/// A vertex buffer.
///
/// The buffer object is released when the [`VertexBuffer`] is dropped.
pub struct VertexBuffer<B>
where
  B: ?Sized + Buffer,
{
  repr: B::BufferRepr,
  len: usize,
  _b: PhantomData<*const ()>,
}

impl<B> VertexBuffer<B>
where
  B: ?Sized + Buffer,
{
  /// Allocate a new buffer, bind it as the array buffer and copy `data` into it.
  ///
  /// `data` is copied as raw bytes; elements are typically `f32` or small arrays of `f32`.
  pub fn new<C, T>(ctx: &mut C, data: &[T], usage: BufferUsage) -> Result<Self, BufferError>
  where
    C: GraphicsContext<Backend = B>,
    T: bytemuck::Pod,
  {
    let bytes: &[u8] = bytemuck::cast_slice(data);
    let repr = unsafe { ctx.backend().new_buffer(bytes, usage)? };

    log::debug!(
      "uploaded {} bytes ({} elements, {})",
      bytes.len(),
      data.len(),
      usage
    );

    Ok(VertexBuffer {
      repr,
      len: data.len(),
      _b: PhantomData,
    })
  }

  /// Number of elements the buffer was created with.
  pub fn len(&self) -> usize {
    self.len
  }

  /// Whether the buffer is empty.
  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  /// Size of the buffer, in bytes.
  pub fn size_in_bytes(&self) -> usize {
    unsafe { B::buffer_size(&self.repr) }
  }

  /// Bind this buffer as the array buffer.
  pub fn bind<C>(&self, ctx: &mut C)
  where
    C: GraphicsContext<Backend = B>,
  {
    unsafe { ctx.backend().bind_array_buffer(&self.repr) }
  }

  /// Backend representation of the buffer.
  pub fn repr(&self) -> &B::BufferRepr {
    &self.repr
  }
}

impl<B> fmt::Debug for VertexBuffer<B>
where
  B: ?Sized + Buffer,
{
  fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
    f.debug_struct("VertexBuffer")
      .field("len", &self.len)
      .finish_non_exhaustive()
  }
}
