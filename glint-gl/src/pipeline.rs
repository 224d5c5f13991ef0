use gl::types::*;
use glint::backend::pipeline::Pipeline;
use glint::pipeline::{Mode, PipelineError};
use glint::vertex::{AttributeBinding, VertexAttribType};

use crate::state::Bind;
use crate::Gl;

unsafe impl Pipeline for Gl {
  unsafe fn surface_size(&self) -> [u32; 2] {
    self.state.borrow().surface_size()
  }

  unsafe fn set_viewport(&mut self, viewport: [u32; 4]) {
    self.state.borrow_mut().set_viewport([
      viewport[0] as GLint,
      viewport[1] as GLint,
      viewport[2] as GLint,
      viewport[3] as GLint,
    ]);
  }

  unsafe fn set_clear_color(&mut self, color: [f32; 4]) {
    self.state.borrow_mut().set_clear_color(color);
  }

  unsafe fn clear_color_buffer(&mut self) {
    gl::Clear(gl::COLOR_BUFFER_BIT);
  }

  unsafe fn vertex_attrib_pointer(
    &mut self,
    location: u32,
    binding: &AttributeBinding,
  ) -> Result<(), PipelineError> {
    let mut state = self.state.borrow_mut();

    if location as usize >= state.max_vertex_attribs() {
      return Err(PipelineError::execution_failed(format!(
        "attribute location {} out of range",
        location
      )));
    }

    if state.bound_array_buffer().is_none() {
      return Err(PipelineError::execution_failed("no array buffer bound"));
    }

    state.bind_vertex_array(Bind::Cached);

    gl::VertexAttribPointer(
      location,
      binding.components as GLint,
      opengl_attrib_type(binding.ty),
      if binding.normalized {
        gl::TRUE
      } else {
        gl::FALSE
      },
      binding.stride as GLsizei,
      binding.offset as *const _,
    );

    Ok(())
  }

  unsafe fn enable_vertex_attrib(&mut self, location: u32) {
    let mut state = self.state.borrow_mut();
    state.bind_vertex_array(Bind::Cached);
    state.enable_vertex_attrib(location);
  }

  unsafe fn draw_arrays(
    &mut self,
    mode: Mode,
    first: usize,
    count: usize,
  ) -> Result<(), PipelineError> {
    self.state.borrow_mut().bind_vertex_array(Bind::Cached);

    gl::DrawArrays(opengl_mode(mode), first as GLint, count as GLsizei);

    match gl::GetError() {
      gl::NO_ERROR => Ok(()),
      e => Err(PipelineError::execution_failed(format!(
        "driver error 0x{:x}",
        e
      ))),
    }
  }
}

fn opengl_mode(mode: Mode) -> GLenum {
  match mode {
    Mode::Point => gl::POINTS,
    Mode::Line => gl::LINES,
    Mode::LineStrip => gl::LINE_STRIP,
    Mode::LineLoop => gl::LINE_LOOP,
    Mode::Triangle => gl::TRIANGLES,
    Mode::TriangleStrip => gl::TRIANGLE_STRIP,
    Mode::TriangleFan => gl::TRIANGLE_FAN,
  }
}

fn opengl_attrib_type(ty: VertexAttribType) -> GLenum {
  match ty {
    VertexAttribType::Byte => gl::BYTE,
    VertexAttribType::UnsignedByte => gl::UNSIGNED_BYTE,
    VertexAttribType::Short => gl::SHORT,
    VertexAttribType::UnsignedShort => gl::UNSIGNED_SHORT,
    VertexAttribType::Float => gl::FLOAT,
  }
}
