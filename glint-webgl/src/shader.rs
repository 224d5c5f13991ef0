//! Shader support for WebGL.

use glint::backend::shader::Shader;
use glint::shader::{ProgramError, StageError, StageType};
use std::{cell::RefCell, rc::Rc};
use web_sys::{WebGlProgram, WebGlRenderingContext, WebGlShader};

use crate::state::WebGlState;
use crate::WebGl;

#[derive(Debug)]
pub struct Stage {
  handle: WebGlShader,
  ty: StageType,
  state: Rc<RefCell<WebGlState>>,
}

impl Drop for Stage {
  fn drop(&mut self) {
    self.state.borrow().ctx.delete_shader(Some(&self.handle));
  }
}

impl Stage {
  pub fn handle(&self) -> &WebGlShader {
    &self.handle
  }

  pub fn ty(&self) -> StageType {
    self.ty
  }
}

#[derive(Debug)]
pub struct Program {
  handle: WebGlProgram,
  state: Rc<RefCell<WebGlState>>,
}

impl Drop for Program {
  fn drop(&mut self) {
    let mut state = self.state.borrow_mut();
    state.unuse_program(&self.handle);
    state.ctx.delete_program(Some(&self.handle));
  }
}

impl Program {
  pub fn handle(&self) -> &WebGlProgram {
    &self.handle
  }
}

unsafe impl Shader for WebGl {
  type StageRepr = Stage;

  type ProgramRepr = Program;

  unsafe fn new_stage(&mut self, ty: StageType, src: &str) -> Result<Self::StageRepr, StageError> {
    let state = self.state.borrow();

    let handle = state
      .ctx
      .create_shader(webgl_shader_type(ty))
      .ok_or_else(|| StageError::unsupported_type(ty))?;

    state.ctx.shader_source(&handle, src);
    state.ctx.compile_shader(&handle);

    let compiled = state
      .ctx
      .get_shader_parameter(&handle, WebGlRenderingContext::COMPILE_STATUS)
      .as_bool()
      .unwrap_or(false);

    if compiled {
      Ok(Stage {
        handle,
        ty,
        state: self.state.clone(),
      })
    } else {
      let log = state
        .ctx
        .get_shader_info_log(&handle)
        .unwrap_or_else(|| "cannot determine compilation status".to_owned());

      state.ctx.delete_shader(Some(&handle));

      Err(StageError::compilation_failed(ty, log))
    }
  }

  unsafe fn compile_status(stage: &Self::StageRepr) -> bool {
    stage
      .state
      .borrow()
      .ctx
      .get_shader_parameter(&stage.handle, WebGlRenderingContext::COMPILE_STATUS)
      .as_bool()
      .unwrap_or(false)
  }

  unsafe fn new_program(
    &mut self,
    vertex: &Self::StageRepr,
    fragment: &Self::StageRepr,
  ) -> Result<Self::ProgramRepr, ProgramError> {
    let state = self.state.borrow();

    let handle = state
      .ctx
      .create_program()
      .ok_or_else(|| ProgramError::creation_failed("unable to create program"))?;

    state.ctx.attach_shader(&handle, &vertex.handle);
    state.ctx.attach_shader(&handle, &fragment.handle);
    state.ctx.link_program(&handle);

    let linked = state
      .ctx
      .get_program_parameter(&handle, WebGlRenderingContext::LINK_STATUS)
      .as_bool()
      .unwrap_or(false);

    if linked {
      Ok(Program {
        handle,
        state: self.state.clone(),
      })
    } else {
      let log = state
        .ctx
        .get_program_info_log(&handle)
        .unwrap_or_else(|| "cannot determine link status".to_owned());

      state.ctx.delete_program(Some(&handle));

      Err(ProgramError::link_failed(log))
    }
  }

  unsafe fn link_status(program: &Self::ProgramRepr) -> bool {
    program
      .state
      .borrow()
      .ctx
      .get_program_parameter(&program.handle, WebGlRenderingContext::LINK_STATUS)
      .as_bool()
      .unwrap_or(false)
  }

  unsafe fn use_program(&mut self, program: &Self::ProgramRepr) {
    self.state.borrow_mut().use_program(Some(&program.handle));
  }

  unsafe fn attrib_location(program: &Self::ProgramRepr, name: &str) -> Option<u32> {
    let location = program
      .state
      .borrow()
      .ctx
      .get_attrib_location(&program.handle, name);

    if location < 0 {
      None
    } else {
      Some(location as u32)
    }
  }
}

fn webgl_shader_type(ty: StageType) -> u32 {
  match ty {
    StageType::VertexShader => WebGlRenderingContext::VERTEX_SHADER,
    StageType::FragmentShader => WebGlRenderingContext::FRAGMENT_SHADER,
  }
}
