use glint::backend::pipeline::Pipeline;
use glint::pipeline::{Mode, PipelineError};
use glint::vertex::AttributeBinding;

use crate::linker::MAX_VERTEX_ATTRIBS;
use crate::raster::{self, Rasterizer};
use crate::state::AttribPointer;
use crate::surface::quantize;
use crate::Soft;

unsafe impl Pipeline for Soft {
  unsafe fn surface_size(&self) -> [u32; 2] {
    self.state.borrow().surface().size()
  }

  unsafe fn set_viewport(&mut self, viewport: [u32; 4]) {
    self.state.borrow_mut().set_viewport(viewport);
  }

  unsafe fn set_clear_color(&mut self, color: [f32; 4]) {
    self.state.borrow_mut().set_clear_color(color);
  }

  unsafe fn clear_color_buffer(&mut self) {
    let mut state = self.state.borrow_mut();
    let color = quantize(state.clear_color());
    state.surface_mut().fill(color);
  }

  unsafe fn vertex_attrib_pointer(
    &mut self,
    location: u32,
    binding: &AttributeBinding,
  ) -> Result<(), PipelineError> {
    let mut state = self.state.borrow_mut();

    if location as usize >= MAX_VERTEX_ATTRIBS {
      return Err(PipelineError::execution_failed(format!(
        "attribute location {} out of range",
        location
      )));
    }

    let buffer = state
      .bound_array_buffer()
      .ok_or_else(|| PipelineError::execution_failed("no array buffer bound"))?;

    state.set_attrib_pointer(location, AttribPointer::new(buffer, binding));
    Ok(())
  }

  unsafe fn enable_vertex_attrib(&mut self, location: u32) {
    self.state.borrow_mut().enable_attrib(location);
  }

  unsafe fn draw_arrays(
    &mut self,
    mode: Mode,
    first: usize,
    count: usize,
  ) -> Result<(), PipelineError> {
    let mut state = self.state.borrow_mut();

    let program = state
      .current_linked_program()
      .ok_or_else(|| PipelineError::execution_failed("no program in use"))?;

    let vertices = raster::shade_vertices(&state, &program, first, count)?;
    let viewport = state.viewport();

    Rasterizer::new(&program, viewport, state.surface_mut()).draw(mode, &vertices)
  }
}
