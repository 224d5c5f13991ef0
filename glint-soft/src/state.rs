//! Software context state.
//!
//! Everything a draw depends on lives in [`SoftState`]: object tables, the bound array buffer,
//! the active program, attribute pointers and the color surface. Resources created by a context
//! share its state and update it when dropped.

use std::marker::PhantomData;
use std::rc::Rc;

use glint::buffer::BufferUsage;
use glint::vertex::{AttributeBinding, VertexAttribType};
use slab::Slab;

use crate::glsl::ir::Shader;
use crate::linker::{LinkedProgram, MAX_VERTEX_ATTRIBS};
use crate::surface::Surface;

#[derive(Debug)]
pub(crate) struct ShaderObject {
  /// `None` until compiled successfully.
  pub(crate) compiled: Option<Rc<Shader>>,
}

#[derive(Debug)]
pub(crate) struct ProgramObject {
  /// `None` until linked successfully.
  pub(crate) linked: Option<Rc<LinkedProgram>>,
}

#[derive(Debug)]
pub(crate) struct BufferObject {
  pub(crate) data: Vec<u8>,
  pub(crate) usage: BufferUsage,
}

/// How an attribute location reads from a buffer.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AttribPointer {
  /// Handle of the buffer bound when the pointer was set.
  pub buffer: usize,
  pub components: u8,
  pub ty: VertexAttribType,
  pub normalized: bool,
  /// Resolved stride, never 0.
  pub stride: usize,
  pub offset: usize,
}

impl AttribPointer {
  pub(crate) fn new(buffer: usize, binding: &AttributeBinding) -> Self {
    AttribPointer {
      buffer,
      components: binding.components,
      ty: binding.ty,
      normalized: binding.normalized,
      stride: binding.effective_stride(),
      offset: binding.offset,
    }
  }
}

/// State of a software context.
#[derive(Debug)]
pub struct SoftState {
  _a: PhantomData<*const ()>, // !Send and !Sync

  pub(crate) shaders: Slab<ShaderObject>,
  pub(crate) programs: Slab<ProgramObject>,
  pub(crate) buffers: Slab<BufferObject>,

  viewport: [u32; 4],
  clear_color: [f32; 4],

  bound_array_buffer: Option<usize>,
  current_program: Option<usize>,

  attrib_pointers: [Option<AttribPointer>; MAX_VERTEX_ATTRIBS],
  attrib_enabled: [bool; MAX_VERTEX_ATTRIBS],

  surface: Surface,
}

impl SoftState {
  /// Fresh state drawing to a `width` × `height` surface.
  ///
  /// The viewport covers the whole surface and the clear color is transparent black.
  pub fn new(width: u32, height: u32) -> Self {
    SoftState {
      _a: PhantomData,
      shaders: Slab::new(),
      programs: Slab::new(),
      buffers: Slab::new(),
      viewport: [0, 0, width, height],
      clear_color: [0.; 4],
      bound_array_buffer: None,
      current_program: None,
      attrib_pointers: [None; MAX_VERTEX_ATTRIBS],
      attrib_enabled: [false; MAX_VERTEX_ATTRIBS],
      surface: Surface::new(width, height),
    }
  }

  /// Viewport, `[x, y, width, height]` from the bottom-left corner.
  pub fn viewport(&self) -> [u32; 4] {
    self.viewport
  }

  pub(crate) fn set_viewport(&mut self, viewport: [u32; 4]) {
    self.viewport = viewport;
  }

  pub fn clear_color(&self) -> [f32; 4] {
    self.clear_color
  }

  pub(crate) fn set_clear_color(&mut self, color: [f32; 4]) {
    self.clear_color = color;
  }

  /// Handle of the buffer bound as the array buffer.
  pub fn bound_array_buffer(&self) -> Option<usize> {
    self.bound_array_buffer
  }

  pub(crate) fn bind_array_buffer(&mut self, handle: usize) {
    self.bound_array_buffer = Some(handle);
  }

  /// Handle of the active program.
  pub fn current_program(&self) -> Option<usize> {
    self.current_program
  }

  pub(crate) fn use_program(&mut self, handle: usize) {
    self.current_program = Some(handle);
  }

  /// Linked program in use, if any.
  pub(crate) fn current_linked_program(&self) -> Option<Rc<LinkedProgram>> {
    let handle = self.current_program?;
    self.programs.get(handle)?.linked.clone()
  }

  pub fn attrib_pointer(&self, location: u32) -> Option<AttribPointer> {
    self
      .attrib_pointers
      .get(location as usize)
      .copied()
      .flatten()
  }

  pub(crate) fn set_attrib_pointer(&mut self, location: u32, pointer: AttribPointer) {
    if let Some(slot) = self.attrib_pointers.get_mut(location as usize) {
      *slot = Some(pointer);
    }
  }

  pub fn is_attrib_enabled(&self, location: u32) -> bool {
    self
      .attrib_enabled
      .get(location as usize)
      .copied()
      .unwrap_or(false)
  }

  pub(crate) fn enable_attrib(&mut self, location: u32) {
    if let Some(enabled) = self.attrib_enabled.get_mut(location as usize) {
      *enabled = true;
    }
  }

  /// Number of live shader objects.
  pub fn shader_count(&self) -> usize {
    self.shaders.len()
  }

  /// Number of live program objects.
  pub fn program_count(&self) -> usize {
    self.programs.len()
  }

  /// Number of live buffer objects.
  pub fn buffer_count(&self) -> usize {
    self.buffers.len()
  }

  /// Contents of a buffer.
  pub fn buffer_data(&self, handle: usize) -> Option<&[u8]> {
    self.buffers.get(handle).map(|b| b.data.as_slice())
  }

  /// Usage hint a buffer was created with.
  pub fn buffer_usage(&self, handle: usize) -> Option<BufferUsage> {
    self.buffers.get(handle).map(|b| b.usage)
  }

  pub fn surface(&self) -> &Surface {
    &self.surface
  }

  pub(crate) fn surface_mut(&mut self) -> &mut Surface {
    &mut self.surface
  }

  pub(crate) fn delete_shader(&mut self, handle: usize) {
    if self.shaders.contains(handle) {
      self.shaders.remove(handle);
    }
  }

  pub(crate) fn delete_program(&mut self, handle: usize) {
    if self.programs.contains(handle) {
      self.programs.remove(handle);
    }

    if self.current_program == Some(handle) {
      self.current_program = None;
    }
  }

  pub(crate) fn delete_buffer(&mut self, handle: usize) {
    if self.buffers.contains(handle) {
      self.buffers.remove(handle);
    }

    if self.bound_array_buffer == Some(handle) {
      self.bound_array_buffer = None;
    }

    // handles are reused by later buffers
    for slot in &mut self.attrib_pointers {
      if slot.map_or(false, |p| p.buffer == handle) {
        *slot = None;
      }
    }
  }
}
