//! Shader backend.

use crate::shader::{ProgramError, StageError, StageType};

/// Shader stages and programs.
///
/// # Safety
///
/// On failure, [`Shader::new_stage`] and [`Shader::new_program`] must release the object they
/// allocated in the context before returning. Representations must release their context object
/// when dropped.
pub unsafe trait Shader {
  /// Backend representation of a compiled shader stage.
  type StageRepr;

  /// Backend representation of a linked program.
  type ProgramRepr;

  /// Allocate a shader object of type `ty`, upload `src` into it and compile it.
  unsafe fn new_stage(&mut self, ty: StageType, src: &str) -> Result<Self::StageRepr, StageError>;

  /// Query the compile status of a stage.
  unsafe fn compile_status(stage: &Self::StageRepr) -> bool;

  /// Allocate a program object, attach both stages and link it.
  unsafe fn new_program(
    &mut self,
    vertex: &Self::StageRepr,
    fragment: &Self::StageRepr,
  ) -> Result<Self::ProgramRepr, ProgramError>;

  /// Query the link status of a program.
  unsafe fn link_status(program: &Self::ProgramRepr) -> bool;

  /// Make `program` the active program, deactivating any previous one.
  unsafe fn use_program(&mut self, program: &Self::ProgramRepr);

  /// Location of an active vertex attribute, if `name` is one.
  unsafe fn attrib_location(program: &Self::ProgramRepr, name: &str) -> Option<u32>;
}
