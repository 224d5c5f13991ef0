//! Graphics context.
//!
//! A graphics context is an object that abstracts all the low-level operations that happen on a
//! graphics device (it can be a GPU or a software implementation, for instance).
//!
//! This crate doesn’t provide you with creating such contexts. Instead, you must do it yourself
//! or rely on crates doing it for you (`glint-soft`, `glint-glfw`, `glint-webgl`).
//!
//! # On context and threads
//!
//! A context carries the global state of the device: the bound array buffer, the active program,
//! the enabled vertex attributes, the viewport and the clear color. Every operation mutates that
//! state, so operations must run in program order on the thread that owns the context:
//!
//!   - An object which type implements `GraphicsContext` must be `!Send` and `!Sync`.
//!   - State is never hidden in globals; backends expose it so that it can be inspected.

use crate::backend::buffer::Buffer;
use crate::backend::shader::Shader;
use crate::buffer::{BufferError, BufferUsage, VertexBuffer};
use crate::shader::{Program, ProgramError, ShaderSource, Stage, StageError, StageType};

/// Class of graphics context.
///
/// # Safety
///
/// Such a context must not be Send nor Sync, which means that you cannot share it between
/// threads in any way (move / borrow).
pub unsafe trait GraphicsContext: Sized {
  /// Backend type this context gives access to.
  type Backend: ?Sized;

  /// Access the underlying backend.
  fn backend(&mut self) -> &mut Self::Backend;

  /// Compile a new shader stage.
  ///
  /// See [`Stage::new`].
  fn new_shader_stage(
    &mut self,
    ty: StageType,
    src: impl AsRef<str>,
  ) -> Result<Stage<Self::Backend>, StageError>
  where
    Self::Backend: Shader,
  {
    Stage::new(self, ty, src)
  }

  /// Compile a new shader stage out of a [`ShaderSource`].
  fn new_shader_stage_from_source(
    &mut self,
    source: &ShaderSource,
  ) -> Result<Stage<Self::Backend>, StageError>
  where
    Self::Backend: Shader,
  {
    Stage::from_source(self, source)
  }

  /// Link a new program.
  ///
  /// See [`Program::new`].
  fn new_program(
    &mut self,
    vertex: &Stage<Self::Backend>,
    fragment: &Stage<Self::Backend>,
  ) -> Result<Program<Self::Backend>, ProgramError>
  where
    Self::Backend: Shader,
  {
    Program::new(self, vertex, fragment)
  }

  /// Upload vertex data into a new vertex buffer.
  ///
  /// See [`VertexBuffer::new`].
  fn new_vertex_buffer<T>(
    &mut self,
    data: &[T],
    usage: BufferUsage,
  ) -> Result<VertexBuffer<Self::Backend>, BufferError>
  where
    Self::Backend: Buffer,
    T: bytemuck::Pod,
  {
    VertexBuffer::new(self, data, usage)
  }
}
