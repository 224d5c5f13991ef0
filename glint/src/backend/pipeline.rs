//! Pipeline backend interface.
//!
//! This interface defines the low-level API the draw orchestrator relies on: viewport, clearing,
//! vertex attribute configuration and draw calls.

use crate::backend::buffer::Buffer;
use crate::backend::shader::Shader;
use crate::pipeline::{Mode, PipelineError};
use crate::vertex::AttributeBinding;

/// Pipeline backend.
///
/// # Safety
///
/// Every method mutates the context global state and must be observable in it afterwards (e.g.
/// [`Pipeline::enable_vertex_attrib`] marks the location enabled).
pub unsafe trait Pipeline: Shader + Buffer {
  /// Size of the target surface, in pixels (`[width, height]`).
  unsafe fn surface_size(&self) -> [u32; 2];

  /// Set the viewport rectangle (`[x, y, width, height]`, origin at the bottom-left corner).
  unsafe fn set_viewport(&mut self, viewport: [u32; 4]);

  /// Set the color used by [`Pipeline::clear_color_buffer`].
  unsafe fn set_clear_color(&mut self, color: [f32; 4]);

  /// Clear the color buffer of the surface with the current clear color.
  unsafe fn clear_color_buffer(&mut self);

  /// Make the attribute at `location` read from the currently bound array buffer, using `binding`.
  unsafe fn vertex_attrib_pointer(
    &mut self,
    location: u32,
    binding: &AttributeBinding,
  ) -> Result<(), PipelineError>;

  /// Enable the attribute at `location` so that it is fed per-vertex.
  unsafe fn enable_vertex_attrib(&mut self, location: u32);

  /// Assemble `count` vertices starting at `first` into `mode` primitives and render them with the
  /// active program.
  unsafe fn draw_arrays(&mut self, mode: Mode, first: usize, count: usize)
    -> Result<(), PipelineError>;
}
