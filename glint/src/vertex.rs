//! Vertex attribute layouts.
//!
//! Vertex buffers are plain bytes. An [`AttributeBinding`] gives the runtime hints needed to read a
//! named vertex shader input out of them: how many components per vertex, of which type, whether
//! integers are normalized, and where the first element and the next one are.

use std::fmt;

/// Possible type of vertex attribute components.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VertexAttribType {
  /// Signed 8-bit integer.
  Byte,
  /// Unsigned 8-bit integer.
  UnsignedByte,
  /// Signed 16-bit integer.
  Short,
  /// Unsigned 16-bit integer.
  UnsignedShort,
  /// 32-bit floating-point number.
  Float,
}

impl VertexAttribType {
  /// Size in bytes of a single component.
  pub fn size(self) -> usize {
    match self {
      VertexAttribType::Byte | VertexAttribType::UnsignedByte => 1,
      VertexAttribType::Short | VertexAttribType::UnsignedShort => 2,
      VertexAttribType::Float => 4,
    }
  }
}

impl Default for VertexAttribType {
  fn default() -> Self {
    VertexAttribType::Float
  }
}

impl fmt::Display for VertexAttribType {
  fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
    match *self {
      VertexAttribType::Byte => f.write_str("byte"),
      VertexAttribType::UnsignedByte => f.write_str("unsigned byte"),
      VertexAttribType::Short => f.write_str("short"),
      VertexAttribType::UnsignedShort => f.write_str("unsigned short"),
      VertexAttribType::Float => f.write_str("float"),
    }
  }
}

/// How a named vertex shader input reads from the bound array buffer.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttributeBinding {
  /// Name of the attribute in the vertex shader.
  pub name: String,
  /// Number of components per vertex, in 1–4.
  pub components: u8,
  /// Type of each component.
  pub ty: VertexAttribType,
  /// Whether integer components are mapped to [0, 1] (unsigned) or [-1, 1] (signed).
  pub normalized: bool,
  /// Bytes between two consecutive vertices; 0 means tightly packed.
  pub stride: usize,
  /// Offset in bytes of the first component in the buffer.
  pub offset: usize,
}

impl AttributeBinding {
  /// Tightly packed, non-normalized `f32` components starting at the beginning of the buffer.
  pub fn new(name: impl Into<String>, components: u8) -> Self {
    AttributeBinding {
      name: name.into(),
      components,
      ty: VertexAttribType::Float,
      normalized: false,
      stride: 0,
      offset: 0,
    }
  }

  /// Change the component type.
  pub fn set_type(self, ty: VertexAttribType) -> Self {
    AttributeBinding { ty, ..self }
  }

  /// Change the normalization flag.
  pub fn set_normalized(self, normalized: bool) -> Self {
    AttributeBinding { normalized, ..self }
  }

  /// Change the stride.
  pub fn set_stride(self, stride: usize) -> Self {
    AttributeBinding { stride, ..self }
  }

  /// Change the offset.
  pub fn set_offset(self, offset: usize) -> Self {
    AttributeBinding { offset, ..self }
  }

  /// Size in bytes of the data read for a single vertex.
  pub fn element_size(&self) -> usize {
    self.components as usize * self.ty.size()
  }

  /// Bytes between two consecutive vertices, resolving a 0 stride to the element size.
  pub fn effective_stride(&self) -> usize {
    if self.stride == 0 {
      self.element_size()
    } else {
      self.stride
    }
  }

  /// Number of bytes a draw of `first..first + count` vertices reads, measured from the start of
  /// the buffer. `None` on arithmetic overflow.
  pub fn required_bytes(&self, first: usize, count: usize) -> Option<usize> {
    if count == 0 {
      return Some(0);
    }

    let last = first.checked_add(count - 1)?;
    last
      .checked_mul(self.effective_stride())?
      .checked_add(self.offset)?
      .checked_add(self.element_size())
  }

  /// Byte offset of the data of vertex `index`.
  pub fn vertex_offset(&self, index: usize) -> usize {
    self.offset + index * self.effective_stride()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn tightly_packed_stride() {
    let binding = AttributeBinding::new("a_position", 2);
    assert_eq!(binding.element_size(), 8);
    assert_eq!(binding.effective_stride(), 8);
    assert_eq!(binding.vertex_offset(2), 16);
  }

  #[test]
  fn explicit_stride_and_offset() {
    let binding = AttributeBinding::new("a_color", 3)
      .set_type(VertexAttribType::UnsignedByte)
      .set_normalized(true)
      .set_stride(12)
      .set_offset(8);

    assert_eq!(binding.element_size(), 3);
    assert_eq!(binding.effective_stride(), 12);
    assert_eq!(binding.vertex_offset(1), 20);
    assert_eq!(binding.required_bytes(0, 2), Some(23));
  }

  #[test]
  fn required_bytes_for_the_triangle() {
    let binding = AttributeBinding::new("a_position", 2);
    assert_eq!(binding.required_bytes(0, 3), Some(24));
    assert_eq!(binding.required_bytes(0, 0), Some(0));
    assert_eq!(binding.required_bytes(usize::MAX, 2), None);
  }
}
