//! Draw orchestration.
//!
//! [`draw`] is the single way glint renders something. It runs a fixed sequence of state changes
//! on the graphics context:
//!
//! 1. Set the viewport (the whole surface by default).
//! 2. Set the clear color.
//! 3. Clear the color buffer.
//! 4. Configure the named vertex attribute to read from the vertex buffer.
//! 5. Enable that attribute.
//! 6. Issue the draw call.
//!
//! There is no frame concept: calling [`draw`] again with the same inputs renders the same image.

use std::error;
use std::fmt;

use crate::backend::pipeline::Pipeline as PipelineBackend;
use crate::buffer::VertexBuffer;
use crate::context::GraphicsContext;
use crate::shader::Program;
use crate::vertex::AttributeBinding;

/// Primitive mode used to assemble vertices.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Mode {
  /// A single point per vertex.
  Point,
  /// A line per pair of vertices.
  Line,
  /// A connected line going through every vertex.
  LineStrip,
  /// A line strip with its last vertex connected back to the first one.
  LineLoop,
  /// A triangle per triplet of vertices.
  Triangle,
  /// A triangle for every vertex past the second one, sharing an edge with the previous one.
  TriangleStrip,
  /// A triangle for every vertex past the second one, sharing the first vertex.
  TriangleFan,
}

impl fmt::Display for Mode {
  fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
    match *self {
      Mode::Point => f.write_str("points"),
      Mode::Line => f.write_str("lines"),
      Mode::LineStrip => f.write_str("line strip"),
      Mode::LineLoop => f.write_str("line loop"),
      Mode::Triangle => f.write_str("triangles"),
      Mode::TriangleStrip => f.write_str("triangle strip"),
      Mode::TriangleFan => f.write_str("triangle fan"),
    }
  }
}

/// The viewport being part of the [`PipelineState`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Viewport {
  /// The whole surface is used.
  Whole,
  /// The viewport is specific and the rectangle area is user-defined.
  Specific {
    /// The lower position on the X axis to start the viewport rectangle at.
    x: u32,
    /// The lower position on the Y axis to start the viewport rectangle at.
    y: u32,
    /// The width of the viewport.
    width: u32,
    /// The height of the viewport.
    height: u32,
  },
}

impl Viewport {
  /// Resolve the viewport against a surface size, as `[x, y, width, height]`.
  pub fn resolve(&self, surface_size: [u32; 2]) -> [u32; 4] {
    match *self {
      Viewport::Whole => [0, 0, surface_size[0], surface_size[1]],
      Viewport::Specific {
        x,
        y,
        width,
        height,
      } => [x, y, width, height],
    }
  }
}

/// Various customization options for pipelines.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineState {
  /// Color to use when clearing the color buffer.
  ///
  /// Set this to `None` not to clear the surface before drawing.
  pub clear_color: Option<[f32; 4]>,

  /// Viewport to use when rendering.
  pub viewport: Viewport,
}

impl Default for PipelineState {
  /// Default [`PipelineState`]:
  ///
  /// - Clear color is `Some([0., 0., 0., 1.])`.
  /// - The viewport uses the whole surface.
  fn default() -> Self {
    PipelineState {
      clear_color: Some([0., 0., 0., 1.]),
      viewport: Viewport::Whole,
    }
  }
}

impl PipelineState {
  /// Create a default [`PipelineState`].
  pub fn new() -> Self {
    Self::default()
  }

  /// Get the clear color, if any.
  pub fn clear_color(&self) -> Option<&[f32; 4]> {
    self.clear_color.as_ref()
  }

  /// Set the clear color.
  pub fn set_clear_color(self, clear_color: impl Into<Option<[f32; 4]>>) -> Self {
    Self {
      clear_color: clear_color.into(),
      ..self
    }
  }

  /// Get the viewport.
  pub fn viewport(&self) -> Viewport {
    self.viewport
  }

  /// Set the viewport.
  pub fn set_viewport(self, viewport: Viewport) -> Self {
    Self { viewport, ..self }
  }
}

/// What to draw: one attribute layout, a vertex count and a primitive mode.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawCall {
  /// Layout of the attribute fed from the vertex buffer.
  pub binding: AttributeBinding,
  /// Number of vertices to draw, starting at vertex 0.
  pub vertex_count: usize,
  /// How vertices are assembled into primitives.
  pub mode: Mode,
}

impl DrawCall {
  /// Draw `vertex_count` vertices as `mode` primitives, fed through `binding`.
  pub fn new(binding: AttributeBinding, vertex_count: usize, mode: Mode) -> Self {
    DrawCall {
      binding,
      vertex_count,
      mode,
    }
  }
}

/// Errors that the draw orchestrator can emit.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PipelineError {
  /// The attribute is not an active attribute of the program.
  InactiveAttribute(String),
  /// The attribute layout is invalid. Contains the attribute name and the reason.
  InvalidAttributeBinding(String, String),
  /// The draw call reads past the end of the bound buffer.
  VertexOutOfRange {
    /// Number of bytes the draw call reads.
    required: usize,
    /// Size of the buffer, in bytes.
    available: usize,
  },
  /// The context failed while executing the draw call.
  ExecutionFailed(String),
}

impl PipelineError {
  /// The attribute is not an active attribute of the program.
  pub fn inactive_attribute(name: impl Into<String>) -> Self {
    PipelineError::InactiveAttribute(name.into())
  }

  /// The attribute layout is invalid.
  pub fn invalid_attribute_binding(name: impl Into<String>, reason: impl Into<String>) -> Self {
    PipelineError::InvalidAttributeBinding(name.into(), reason.into())
  }

  /// The context failed while executing the draw call.
  pub fn execution_failed(reason: impl Into<String>) -> Self {
    PipelineError::ExecutionFailed(reason.into())
  }
}

impl fmt::Display for PipelineError {
  fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
    match *self {
      PipelineError::InactiveAttribute(ref name) => write!(f, "inactive {} vertex attribute", name),

      PipelineError::InvalidAttributeBinding(ref name, ref reason) => {
        write!(f, "invalid binding for vertex attribute {}: {}", name, reason)
      }

      PipelineError::VertexOutOfRange {
        required,
        available,
      } => write!(
        f,
        "draw call reads out of the vertex buffer (required = {} bytes, size = {} bytes)",
        required, available
      ),

      PipelineError::ExecutionFailed(ref reason) => write!(f, "draw call failed: {}", reason),
    }
  }
}

impl error::Error for PipelineError {}

/// Check that an attribute layout is usable.
pub fn validate_binding(binding: &AttributeBinding) -> Result<(), PipelineError> {
  if !(1..=4).contains(&binding.components) {
    return Err(PipelineError::invalid_attribute_binding(
      &binding.name,
      format!("{} components (expected 1 to 4)", binding.components),
    ));
  }

  let size = binding.ty.size();

  if binding.stride % size != 0 {
    return Err(PipelineError::invalid_attribute_binding(
      &binding.name,
      format!("stride {} is not a multiple of {} bytes", binding.stride, size),
    ));
  }

  if binding.offset % size != 0 {
    return Err(PipelineError::invalid_attribute_binding(
      &binding.name,
      format!("offset {} is not a multiple of {} bytes", binding.offset, size),
    ));
  }

  Ok(())
}

/// Draw the content of `buffer` with `program`.
///
/// The program is selected and the buffer bound before the attribute is configured; both are
/// no-ops when already current.
///
/// The binding, the attribute location and the buffer range are checked before the first state
/// change; when one of them fails, the context is left untouched and nothing is drawn. An error
/// the backend reports afterwards (attribute pointer or draw) is returned as is: by then the
/// viewport, the clear, the program and the buffer binding have already been applied.
pub fn draw<C, B>(
  ctx: &mut C,
  program: &Program<B>,
  buffer: &VertexBuffer<B>,
  call: &DrawCall,
  state: &PipelineState,
) -> Result<(), PipelineError>
where
  C: GraphicsContext<Backend = B>,
  B: ?Sized + PipelineBackend,
{
  let binding = &call.binding;

  validate_binding(binding)?;

  let location = program
    .attrib_location(&binding.name)
    .ok_or_else(|| PipelineError::inactive_attribute(&binding.name))?;

  let available = buffer.size_in_bytes();
  let required = binding
    .required_bytes(0, call.vertex_count)
    .unwrap_or(usize::MAX);

  if required > available {
    return Err(PipelineError::VertexOutOfRange {
      required,
      available,
    });
  }

  if binding.stride == 0 && available % binding.element_size() != 0 {
    log::warn!(
      "vertex buffer size ({} bytes) is not a multiple of the {} element size ({} bytes)",
      available,
      binding.name,
      binding.element_size()
    );
  }

  let backend = ctx.backend();

  unsafe {
    let viewport = state.viewport.resolve(backend.surface_size());
    backend.set_viewport(viewport);

    if let Some(color) = state.clear_color {
      backend.set_clear_color(color);
      backend.clear_color_buffer();
    }

    backend.use_program(program.repr());
    backend.bind_array_buffer(buffer.repr());
    backend.vertex_attrib_pointer(location, binding)?;
    backend.enable_vertex_attrib(location);

    log::debug!(
      "drawing {} vertices as {} ({} at location {})",
      call.vertex_count,
      call.mode,
      binding.name,
      location
    );

    backend.draw_arrays(call.mode, 0, call.vertex_count)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::backend::buffer::Buffer;
  use crate::backend::shader::Shader;
  use crate::buffer::{BufferError, BufferUsage};
  use crate::shader::{ProgramError, StageError, StageType};

  // A backend recording every state change it is asked for.
  #[derive(Default)]
  struct Recorder {
    calls: Vec<String>,
    reject_attrib_pointer: bool,
  }

  struct Ctx(Recorder);

  unsafe impl GraphicsContext for Ctx {
    type Backend = Recorder;

    fn backend(&mut self) -> &mut Self::Backend {
      &mut self.0
    }
  }

  unsafe impl Shader for Recorder {
    type StageRepr = StageType;
    type ProgramRepr = ();

    unsafe fn new_stage(&mut self, ty: StageType, src: &str) -> Result<StageType, StageError> {
      self.calls.push(format!("compile {}", ty));

      if src.is_empty() {
        Err(StageError::compilation_failed(ty, "empty source"))
      } else {
        Ok(ty)
      }
    }

    unsafe fn compile_status(_: &StageType) -> bool {
      true
    }

    unsafe fn new_program(&mut self, _: &StageType, _: &StageType) -> Result<(), ProgramError> {
      self.calls.push("link".to_owned());
      Ok(())
    }

    unsafe fn link_status(_: &()) -> bool {
      true
    }

    unsafe fn use_program(&mut self, _: &()) {
      self.calls.push("use program".to_owned());
    }

    unsafe fn attrib_location(_: &(), name: &str) -> Option<u32> {
      if name == "a_position" {
        Some(0)
      } else {
        None
      }
    }
  }

  unsafe impl Buffer for Recorder {
    type BufferRepr = usize;

    unsafe fn new_buffer(&mut self, bytes: &[u8], usage: BufferUsage) -> Result<usize, BufferError> {
      self.calls.push(format!("upload {} bytes ({})", bytes.len(), usage));
      Ok(bytes.len())
    }

    unsafe fn bind_array_buffer(&mut self, _: &usize) {
      self.calls.push("bind buffer".to_owned());
    }

    unsafe fn buffer_size(buffer: &usize) -> usize {
      *buffer
    }
  }

  unsafe impl PipelineBackend for Recorder {
    unsafe fn surface_size(&self) -> [u32; 2] {
      [300, 150]
    }

    unsafe fn set_viewport(&mut self, viewport: [u32; 4]) {
      self.calls.push(format!("viewport {:?}", viewport));
    }

    unsafe fn set_clear_color(&mut self, color: [f32; 4]) {
      self.calls.push(format!("clear color {:?}", color));
    }

    unsafe fn clear_color_buffer(&mut self) {
      self.calls.push("clear".to_owned());
    }

    unsafe fn vertex_attrib_pointer(
      &mut self,
      location: u32,
      binding: &AttributeBinding,
    ) -> Result<(), PipelineError> {
      if self.reject_attrib_pointer {
        return Err(PipelineError::execution_failed("attribute pointer rejected"));
      }

      self.calls.push(format!(
        "attrib pointer {} ({} x {})",
        location, binding.components, binding.ty
      ));
      Ok(())
    }

    unsafe fn enable_vertex_attrib(&mut self, location: u32) {
      self.calls.push(format!("enable attrib {}", location));
    }

    unsafe fn draw_arrays(
      &mut self,
      mode: Mode,
      first: usize,
      count: usize,
    ) -> Result<(), PipelineError> {
      self.calls.push(format!("draw {} {}..{}", mode, first, first + count));
      Ok(())
    }
  }

  fn setup() -> (Ctx, Program<Recorder>, VertexBuffer<Recorder>) {
    let mut ctx = Ctx(Recorder::default());
    let program = Program::from_strings(&mut ctx, "vs", "fs").unwrap();
    let positions: [f32; 6] = [0., 0., 0., 0.5, 0.7, 0.];
    let buffer = VertexBuffer::new(&mut ctx, &positions, BufferUsage::StaticDraw).unwrap();
    ctx.0.calls.clear();

    (ctx, program, buffer)
  }

  #[test]
  fn draw_runs_steps_in_order() {
    let (mut ctx, program, buffer) = setup();
    let call = DrawCall::new(AttributeBinding::new("a_position", 2), 3, Mode::Triangle);

    draw(&mut ctx, &program, &buffer, &call, &PipelineState::default()).unwrap();

    assert_eq!(
      ctx.0.calls,
      vec![
        "viewport [0, 0, 300, 150]",
        "clear color [0.0, 0.0, 0.0, 1.0]",
        "clear",
        "use program",
        "bind buffer",
        "attrib pointer 0 (2 x float)",
        "enable attrib 0",
        "draw triangles 0..3",
      ]
    );
  }

  #[test]
  fn no_clear_color_skips_clearing() {
    let (mut ctx, program, buffer) = setup();
    let call = DrawCall::new(AttributeBinding::new("a_position", 2), 3, Mode::Triangle);
    let state = PipelineState::new()
      .set_clear_color(None)
      .set_viewport(Viewport::Specific {
        x: 10,
        y: 20,
        width: 30,
        height: 40,
      });

    draw(&mut ctx, &program, &buffer, &call, &state).unwrap();

    assert_eq!(ctx.0.calls[0], "viewport [10, 20, 30, 40]");
    assert!(!ctx.0.calls.iter().any(|c| c == "clear"));
  }

  #[test]
  fn inactive_attribute_does_not_touch_the_context() {
    let (mut ctx, program, buffer) = setup();
    let call = DrawCall::new(AttributeBinding::new("a_color", 2), 3, Mode::Triangle);

    let r = draw(&mut ctx, &program, &buffer, &call, &PipelineState::default());

    assert_eq!(r, Err(PipelineError::inactive_attribute("a_color")));
    assert!(ctx.0.calls.is_empty());
  }

  #[test]
  fn backend_failures_keep_the_applied_state() {
    let (mut ctx, program, buffer) = setup();
    ctx.0.reject_attrib_pointer = true;
    let call = DrawCall::new(AttributeBinding::new("a_position", 2), 3, Mode::Triangle);

    let r = draw(&mut ctx, &program, &buffer, &call, &PipelineState::default());

    assert_eq!(
      r,
      Err(PipelineError::execution_failed("attribute pointer rejected"))
    );
    assert_eq!(
      ctx.0.calls,
      vec![
        "viewport [0, 0, 300, 150]",
        "clear color [0.0, 0.0, 0.0, 1.0]",
        "clear",
        "use program",
        "bind buffer",
      ]
    );
  }

  #[test]
  fn out_of_range_draw_is_rejected() {
    let (mut ctx, program, buffer) = setup();
    let call = DrawCall::new(AttributeBinding::new("a_position", 2), 4, Mode::Triangle);

    let r = draw(&mut ctx, &program, &buffer, &call, &PipelineState::default());

    assert_eq!(
      r,
      Err(PipelineError::VertexOutOfRange {
        required: 32,
        available: 24
      })
    );
    assert!(ctx.0.calls.is_empty());
  }

  #[test]
  fn invalid_bindings() {
    let zero = AttributeBinding::new("a", 0);
    let five = AttributeBinding::new("a", 5);
    let stride = AttributeBinding::new("a", 2).set_stride(6);
    let offset = AttributeBinding::new("a", 2).set_offset(2);

    assert!(validate_binding(&zero).is_err());
    assert!(validate_binding(&five).is_err());
    assert!(validate_binding(&stride).is_err());
    assert!(validate_binding(&offset).is_err());
    assert!(validate_binding(&AttributeBinding::new("a", 4)).is_ok());
  }

  #[test]
  fn failed_compile_stops_program_creation() {
    let mut ctx = Ctx(Recorder::default());
    let r = Program::from_strings(&mut ctx, "vs", "");

    assert_eq!(
      r.err(),
      Some(ProgramError::StageError(StageError::compilation_failed(
        StageType::FragmentShader,
        "empty source"
      )))
    );
    assert!(!ctx.0.calls.iter().any(|c| c == "link"));
  }
}
