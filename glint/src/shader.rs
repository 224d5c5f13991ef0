//! Shader API.
//!
//! A shader program is made of two shader stages: a vertex shader, run once per vertex, and a
//! fragment shader, run once per covered pixel. Stages are compiled separately ([`Stage`]) and then
//! linked together into a [`Program`].
//!
//! Compilation and link failures are reported as typed errors carrying the log produced by the
//! graphics context. They are also written to the `log` facade at the error level.

use std::borrow::Cow;
use std::error;
use std::fmt;

use crate::backend::shader::Shader;
use crate::context::GraphicsContext;

/// A shader stage type.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StageType {
  /// Vertex shader.
  VertexShader,
  /// Fragment shader.
  FragmentShader,
}

impl fmt::Display for StageType {
  fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
    match *self {
      StageType::VertexShader => f.write_str("vertex shader"),
      StageType::FragmentShader => f.write_str("fragment shader"),
    }
  }
}

/// Shader source text tagged with the stage it is meant for.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ShaderSource {
  ty: StageType,
  text: Cow<'static, str>,
}

impl ShaderSource {
  /// Tag `text` with a stage type.
  pub fn new(ty: StageType, text: impl Into<Cow<'static, str>>) -> Self {
    ShaderSource {
      ty,
      text: text.into(),
    }
  }

  /// Vertex shader source.
  pub fn vertex(text: impl Into<Cow<'static, str>>) -> Self {
    Self::new(StageType::VertexShader, text)
  }

  /// Fragment shader source.
  pub fn fragment(text: impl Into<Cow<'static, str>>) -> Self {
    Self::new(StageType::FragmentShader, text)
  }

  /// Stage type this source is meant for.
  pub fn ty(&self) -> StageType {
    self.ty
  }

  /// Source text.
  pub fn text(&self) -> &str {
    &self.text
  }
}

/// Errors that shader stages can emit.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StageError {
  /// Occurs when a shader fails to compile. Contains the stage type and the compilation log.
  CompilationFailed(StageType, String),
  /// Occurs when you try to create a shader which type is not supported by the context.
  UnsupportedType(StageType),
}

impl StageError {
  /// Occurs when a shader fails to compile.
  pub fn compilation_failed(ty: StageType, reason: impl Into<String>) -> Self {
    StageError::CompilationFailed(ty, reason.into())
  }

  /// Occurs when you try to create a shader which type is not supported by the context.
  pub fn unsupported_type(ty: StageType) -> Self {
    StageError::UnsupportedType(ty)
  }
}

impl fmt::Display for StageError {
  fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
    match *self {
      StageError::CompilationFailed(ref ty, ref r) => write!(f, "{} compilation error: {}", ty, r),

      StageError::UnsupportedType(ty) => write!(f, "unsupported {}", ty),
    }
  }
}

impl error::Error for StageError {}

/// Errors that a [`Program`] can generate.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ProgramError {
  /// The context could not allocate a program object.
  CreationFailed(String),
  /// A shader stage failed to compile.
  StageError(StageError),
  /// Program link failed. You can inspect the reason by looking at the contained `String`.
  LinkFailed(String),
}

impl ProgramError {
  /// The context could not allocate a program object.
  pub fn creation_failed(reason: impl Into<String>) -> Self {
    ProgramError::CreationFailed(reason.into())
  }

  /// A shader stage failed to compile.
  pub fn stage_error(e: StageError) -> Self {
    ProgramError::StageError(e)
  }

  /// Program link failed.
  pub fn link_failed(reason: impl Into<String>) -> Self {
    ProgramError::LinkFailed(reason.into())
  }
}

impl fmt::Display for ProgramError {
  fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
    match *self {
      ProgramError::CreationFailed(ref e) => write!(f, "cannot create shader program: {}", e),

      ProgramError::StageError(ref e) => write!(f, "shader program has stage error: {}", e),

      ProgramError::LinkFailed(ref s) => write!(f, "shader program failed to link: {}", s),
    }
  }
}

impl error::Error for ProgramError {
  fn source(&self) -> Option<&(dyn error::Error + 'static)> {
    match self {
      ProgramError::StageError(e) => Some(e),
      _ => None,
    }
  }
}

impl From<StageError> for ProgramError {
  fn from(e: StageError) -> Self {
    ProgramError::StageError(e)
  }
}

/// A compiled shader stage.
///
/// A [`Stage`] only exists if compilation succeeded. The underlying shader object is released when
/// the [`Stage`] is dropped.
pub struct Stage<B>
where
  B: ?Sized + Shader,
{
  repr: B::StageRepr,
  ty: StageType,
}

impl<B> Stage<B>
where
  B: ?Sized + Shader,
{
  /// Compile a new shader stage of type `ty` out of `src`.
  ///
  /// On failure, the shader object allocated for the compilation is released, the compilation log
  /// is logged at the error level and returned in [`StageError::CompilationFailed`].
  pub fn new<C>(ctx: &mut C, ty: StageType, src: impl AsRef<str>) -> Result<Self, StageError>
  where
    C: GraphicsContext<Backend = B>,
  {
    let repr = unsafe { ctx.backend().new_stage(ty, src.as_ref()) }.map_err(|e| {
      log::error!("{}", e);
      e
    })?;

    Ok(Stage { repr, ty })
  }

  /// Compile a new shader stage out of a [`ShaderSource`].
  pub fn from_source<C>(ctx: &mut C, source: &ShaderSource) -> Result<Self, StageError>
  where
    C: GraphicsContext<Backend = B>,
  {
    Self::new(ctx, source.ty(), source.text())
  }

  /// Type of this stage.
  pub fn ty(&self) -> StageType {
    self.ty
  }

  /// Compile status of the stage, as reported by the context.
  pub fn is_compiled(&self) -> bool {
    unsafe { B::compile_status(&self.repr) }
  }

  /// Backend representation of the stage.
  pub fn repr(&self) -> &B::StageRepr {
    &self.repr
  }
}

impl<B> fmt::Debug for Stage<B>
where
  B: ?Sized + Shader,
{
  fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
    f.debug_struct("Stage").field("ty", &self.ty).finish()
  }
}

/// A linked shader program.
///
/// A [`Program`] only exists if both of its stages compiled and the link succeeded. The underlying
/// program object is released when the [`Program`] is dropped; stages can be dropped as soon as the
/// program is linked.
pub struct Program<B>
where
  B: ?Sized + Shader,
{
  repr: B::ProgramRepr,
}

impl<B> Program<B>
where
  B: ?Sized + Shader,
{
  /// Link a vertex stage and a fragment stage into a new program.
  ///
  /// On failure, the allocated program object is released, the link log is logged at the error
  /// level and returned in [`ProgramError::LinkFailed`].
  pub fn new<C>(ctx: &mut C, vertex: &Stage<B>, fragment: &Stage<B>) -> Result<Self, ProgramError>
  where
    C: GraphicsContext<Backend = B>,
  {
    let repr = unsafe { ctx.backend().new_program(&vertex.repr, &fragment.repr) }.map_err(|e| {
      log::error!("{}", e);
      e
    })?;

    Ok(Program { repr })
  }

  /// Compile both stages and link them.
  ///
  /// Compilation failures are reported as [`ProgramError::StageError`]; the pipeline stops at the
  /// first failing stage.
  pub fn from_strings<C>(
    ctx: &mut C,
    vertex: impl AsRef<str>,
    fragment: impl AsRef<str>,
  ) -> Result<Self, ProgramError>
  where
    C: GraphicsContext<Backend = B>,
  {
    let vs = Stage::new(ctx, StageType::VertexShader, vertex)?;
    let fs = Stage::new(ctx, StageType::FragmentShader, fragment)?;

    Self::new(ctx, &vs, &fs)
  }

  /// Link status of the program, as reported by the context.
  pub fn is_linked(&self) -> bool {
    unsafe { B::link_status(&self.repr) }
  }

  /// Location of the active vertex attribute `name`, if any.
  pub fn attrib_location(&self, name: &str) -> Option<u32> {
    unsafe { B::attrib_location(&self.repr, name) }
  }

  /// Make this program the active one.
  ///
  /// There is a single active program slot: selecting a program deactivates the previous one.
  pub fn select<C>(&self, ctx: &mut C)
  where
    C: GraphicsContext<Backend = B>,
  {
    unsafe { ctx.backend().use_program(&self.repr) }
  }

  /// Backend representation of the program.
  pub fn repr(&self) -> &B::ProgramRepr {
    &self.repr
  }
}

impl<B> fmt::Debug for Program<B>
where
  B: ?Sized + Shader,
{
  fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
    f.debug_struct("Program").finish_non_exhaustive()
  }
}
