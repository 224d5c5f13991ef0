use std::cell::RefCell;
use std::rc::Rc;

use glint::backend::shader::Shader;
use glint::shader::{ProgramError, StageError, StageType};

use crate::glsl;
use crate::linker;
use crate::state::{ProgramObject, ShaderObject, SoftState};
use crate::Soft;

#[derive(Debug)]
pub struct Stage {
  handle: usize,
  ty: StageType,
  state: Rc<RefCell<SoftState>>,
}

impl Stage {
  pub fn handle(&self) -> usize {
    self.handle
  }

  pub fn ty(&self) -> StageType {
    self.ty
  }
}

impl Drop for Stage {
  fn drop(&mut self) {
    self.state.borrow_mut().delete_shader(self.handle);
  }
}

#[derive(Debug)]
pub struct Program {
  handle: usize,
  state: Rc<RefCell<SoftState>>,
}

impl Program {
  pub fn handle(&self) -> usize {
    self.handle
  }

  fn linked(&self) -> Option<Rc<linker::LinkedProgram>> {
    self.state.borrow().programs.get(self.handle)?.linked.clone()
  }
}

impl Drop for Program {
  fn drop(&mut self) {
    self.state.borrow_mut().delete_program(self.handle);
  }
}

unsafe impl Shader for Soft {
  type StageRepr = Stage;

  type ProgramRepr = Program;

  unsafe fn new_stage(&mut self, ty: StageType, src: &str) -> Result<Self::StageRepr, StageError> {
    let mut state = self.state.borrow_mut();
    let handle = state.shaders.insert(ShaderObject { compiled: None });

    match glsl::compile(ty, src) {
      Ok(shader) => {
        state.shaders[handle].compiled = Some(Rc::new(shader));
        log::debug!("compiled {} #{}", ty, handle);

        Ok(Stage {
          handle,
          ty,
          state: self.state.clone(),
        })
      }

      Err(compile_log) => {
        state.delete_shader(handle);
        Err(StageError::compilation_failed(ty, compile_log.to_string()))
      }
    }
  }

  unsafe fn compile_status(stage: &Self::StageRepr) -> bool {
    stage
      .state
      .borrow()
      .shaders
      .get(stage.handle)
      .map_or(false, |s| s.compiled.is_some())
  }

  unsafe fn new_program(
    &mut self,
    vertex: &Self::StageRepr,
    fragment: &Self::StageRepr,
  ) -> Result<Self::ProgramRepr, ProgramError> {
    let mut state = self.state.borrow_mut();
    let handle = state.programs.insert(ProgramObject { linked: None });

    let compiled = |stage: &Stage| {
      state
        .shaders
        .get(stage.handle)
        .and_then(|s| s.compiled.clone())
    };

    let linked = match (compiled(vertex), compiled(fragment)) {
      (Some(vs), Some(fs)) => linker::link(&vs, &fs),
      _ => Err("ERROR: attached shaders are not compiled".to_owned()),
    };

    match linked {
      Ok(linked) => {
        log::debug!(
          "linked program #{} ({} active attributes, {} varyings)",
          handle,
          linked.attributes.len(),
          linked.varyings.len()
        );
        state.programs[handle].linked = Some(Rc::new(linked));

        Ok(Program {
          handle,
          state: self.state.clone(),
        })
      }

      Err(link_log) => {
        state.delete_program(handle);
        Err(ProgramError::link_failed(link_log))
      }
    }
  }

  unsafe fn link_status(program: &Self::ProgramRepr) -> bool {
    program.linked().is_some()
  }

  unsafe fn use_program(&mut self, program: &Self::ProgramRepr) {
    let mut state = self.state.borrow_mut();

    if state.current_program() != Some(program.handle) {
      log::debug!("using program #{}", program.handle);
      state.use_program(program.handle);
    }
  }

  unsafe fn attrib_location(program: &Self::ProgramRepr, name: &str) -> Option<u32> {
    program
      .linked()?
      .attribute(name)
      .map(|attr| attr.location)
  }
}
