use gl::types::*;
use glint::backend::shader::Shader;
use glint::shader::{ProgramError, StageError, StageType};
use std::cell::RefCell;
use std::ffi::CString;
use std::ptr::{null, null_mut};
use std::rc::Rc;

use crate::state::GlState;
use crate::Gl;

const GLSL_PRAGMA: &str = "#version 100\n";

#[derive(Debug)]
pub struct Stage {
  handle: GLuint,
  ty: StageType,
}

impl Stage {
  pub fn handle(&self) -> GLuint {
    self.handle
  }

  pub fn ty(&self) -> StageType {
    self.ty
  }
}

impl Drop for Stage {
  fn drop(&mut self) {
    unsafe {
      gl::DeleteShader(self.handle);
    }
  }
}

#[derive(Debug)]
pub struct Program {
  handle: GLuint,
  state: Rc<RefCell<GlState>>,
}

impl Program {
  pub fn handle(&self) -> GLuint {
    self.handle
  }
}

impl Drop for Program {
  fn drop(&mut self) {
    unsafe {
      self.state.borrow_mut().unuse_program(self.handle);
      gl::DeleteProgram(self.handle);
    }
  }
}

unsafe impl Shader for Gl {
  type StageRepr = Stage;

  type ProgramRepr = Program;

  unsafe fn new_stage(&mut self, ty: StageType, src: &str) -> Result<Self::StageRepr, StageError> {
    let handle = gl::CreateShader(opengl_shader_type(ty));

    if handle == 0 {
      return Err(StageError::unsupported_type(ty));
    }

    let c_src = match CString::new(glsl_pragma_src(src)) {
      Ok(c_src) => c_src,
      Err(_) => {
        gl::DeleteShader(handle);
        return Err(StageError::compilation_failed(
          ty,
          "source contains a NUL byte",
        ));
      }
    };

    gl::ShaderSource(handle, 1, [c_src.as_ptr()].as_ptr(), null());
    gl::CompileShader(handle);

    let stage = Stage { handle, ty };

    if Self::compile_status(&stage) {
      Ok(stage)
    } else {
      let log = shader_info_log(handle);
      // deletes the shader
      drop(stage);

      Err(StageError::compilation_failed(ty, log))
    }
  }

  unsafe fn compile_status(stage: &Self::StageRepr) -> bool {
    let mut compiled: GLint = gl::FALSE.into();
    gl::GetShaderiv(stage.handle, gl::COMPILE_STATUS, &mut compiled);
    compiled == gl::TRUE.into()
  }

  unsafe fn new_program(
    &mut self,
    vertex: &Self::StageRepr,
    fragment: &Self::StageRepr,
  ) -> Result<Self::ProgramRepr, ProgramError> {
    let handle = gl::CreateProgram();

    if handle == 0 {
      return Err(ProgramError::creation_failed(
        "unable to create program object",
      ));
    }

    gl::AttachShader(handle, vertex.handle);
    gl::AttachShader(handle, fragment.handle);
    gl::LinkProgram(handle);

    let program = Program {
      handle,
      state: self.state.clone(),
    };

    if Self::link_status(&program) {
      gl::DetachShader(handle, vertex.handle);
      gl::DetachShader(handle, fragment.handle);
      Ok(program)
    } else {
      let log = program_info_log(handle);
      // deletes the program
      drop(program);

      Err(ProgramError::link_failed(log))
    }
  }

  unsafe fn link_status(program: &Self::ProgramRepr) -> bool {
    let mut linked: GLint = gl::FALSE.into();
    gl::GetProgramiv(program.handle, gl::LINK_STATUS, &mut linked);
    linked == gl::TRUE.into()
  }

  unsafe fn use_program(&mut self, program: &Self::ProgramRepr) {
    self.state.borrow_mut().use_program(program.handle);
  }

  unsafe fn attrib_location(program: &Self::ProgramRepr, name: &str) -> Option<u32> {
    let c_name = CString::new(name.as_bytes()).ok()?;
    let location = gl::GetAttribLocation(program.handle, c_name.as_ptr() as *const GLchar);

    if location < 0 {
      None
    } else {
      Some(location as u32)
    }
  }
}

fn opengl_shader_type(t: StageType) -> GLenum {
  match t {
    StageType::VertexShader => gl::VERTEX_SHADER,
    StageType::FragmentShader => gl::FRAGMENT_SHADER,
  }
}

/// Prepend the GLSL ES 1.00 version directive to sources that don’t carry one.
fn glsl_pragma_src(src: &str) -> String {
  if src.trim_start().starts_with("#version") {
    src.to_owned()
  } else {
    let mut pragma = String::from(GLSL_PRAGMA);
    pragma.push_str(src);
    pragma
  }
}

unsafe fn shader_info_log(handle: GLuint) -> String {
  let mut log_len: GLint = 0;
  gl::GetShaderiv(handle, gl::INFO_LOG_LENGTH, &mut log_len);

  let mut log = vec![0u8; log_len.max(0) as usize];
  gl::GetShaderInfoLog(handle, log_len, null_mut(), log.as_mut_ptr() as *mut GLchar);

  info_log_to_string(log)
}

unsafe fn program_info_log(handle: GLuint) -> String {
  let mut log_len: GLint = 0;
  gl::GetProgramiv(handle, gl::INFO_LOG_LENGTH, &mut log_len);

  let mut log = vec![0u8; log_len.max(0) as usize];
  gl::GetProgramInfoLog(handle, log_len, null_mut(), log.as_mut_ptr() as *mut GLchar);

  info_log_to_string(log)
}

// the driver writes a NUL-terminated string
fn info_log_to_string(mut log: Vec<u8>) -> String {
  if let Some(end) = log.iter().position(|&b| b == 0) {
    log.truncate(end);
  }

  String::from_utf8_lossy(&log).into_owned()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn version_directive_is_added_once() {
    assert_eq!(
      glsl_pragma_src("void main() {}"),
      "#version 100\nvoid main() {}"
    );
    assert_eq!(
      glsl_pragma_src("  #version 100\nvoid main() {}"),
      "  #version 100\nvoid main() {}"
    );
  }

  #[test]
  fn info_logs_stop_at_the_terminator() {
    assert_eq!(info_log_to_string(b"ERROR: 0:3\0\0".to_vec()), "ERROR: 0:3");
    assert_eq!(info_log_to_string(Vec::new()), "");
  }
}
