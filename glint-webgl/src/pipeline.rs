use glint::backend::pipeline::Pipeline;
use glint::pipeline::{Mode, PipelineError};
use glint::vertex::{AttributeBinding, VertexAttribType};
use web_sys::WebGlRenderingContext;

use crate::WebGl;

unsafe impl Pipeline for WebGl {
  unsafe fn surface_size(&self) -> [u32; 2] {
    self.state.borrow().surface_size()
  }

  unsafe fn set_viewport(&mut self, viewport: [u32; 4]) {
    self.state.borrow_mut().set_viewport([
      viewport[0] as i32,
      viewport[1] as i32,
      viewport[2] as i32,
      viewport[3] as i32,
    ]);
  }

  unsafe fn set_clear_color(&mut self, color: [f32; 4]) {
    self.state.borrow_mut().set_clear_color(color);
  }

  unsafe fn clear_color_buffer(&mut self) {
    self
      .state
      .borrow()
      .ctx
      .clear(WebGlRenderingContext::COLOR_BUFFER_BIT);
  }

  unsafe fn vertex_attrib_pointer(
    &mut self,
    location: u32,
    binding: &AttributeBinding,
  ) -> Result<(), PipelineError> {
    let state = self.state.borrow();

    if location as usize >= state.max_vertex_attribs() {
      return Err(PipelineError::execution_failed(format!(
        "attribute location {} out of range",
        location
      )));
    }

    if state.bound_array_buffer().is_none() {
      return Err(PipelineError::execution_failed("no array buffer bound"));
    }

    state.ctx.vertex_attrib_pointer_with_i32(
      location,
      binding.components as i32,
      webgl_attrib_type(binding.ty),
      binding.normalized,
      binding.stride as i32,
      binding.offset as i32,
    );

    Ok(())
  }

  unsafe fn enable_vertex_attrib(&mut self, location: u32) {
    self.state.borrow_mut().enable_vertex_attrib(location);
  }

  unsafe fn draw_arrays(
    &mut self,
    mode: Mode,
    first: usize,
    count: usize,
  ) -> Result<(), PipelineError> {
    let state = self.state.borrow();

    state
      .ctx
      .draw_arrays(webgl_mode(mode), first as i32, count as i32);

    match state.ctx.get_error() {
      WebGlRenderingContext::NO_ERROR => Ok(()),
      e => Err(PipelineError::execution_failed(format!(
        "WebGL error 0x{:x}",
        e
      ))),
    }
  }
}

fn webgl_mode(mode: Mode) -> u32 {
  match mode {
    Mode::Point => WebGlRenderingContext::POINTS,
    Mode::Line => WebGlRenderingContext::LINES,
    Mode::LineStrip => WebGlRenderingContext::LINE_STRIP,
    Mode::LineLoop => WebGlRenderingContext::LINE_LOOP,
    Mode::Triangle => WebGlRenderingContext::TRIANGLES,
    Mode::TriangleStrip => WebGlRenderingContext::TRIANGLE_STRIP,
    Mode::TriangleFan => WebGlRenderingContext::TRIANGLE_FAN,
  }
}

fn webgl_attrib_type(ty: VertexAttribType) -> u32 {
  match ty {
    VertexAttribType::Byte => WebGlRenderingContext::BYTE,
    VertexAttribType::UnsignedByte => WebGlRenderingContext::UNSIGNED_BYTE,
    VertexAttribType::Short => WebGlRenderingContext::SHORT,
    VertexAttribType::UnsignedShort => WebGlRenderingContext::UNSIGNED_SHORT,
    VertexAttribType::Float => WebGlRenderingContext::FLOAT,
  }
}
