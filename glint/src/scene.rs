//! One-shot scenes.
//!
//! A [`Scene`] bundles everything needed to go from shader sources and vertex positions to pixels:
//! compile both stages, link them, upload the positions and issue a single draw call. The default
//! scene renders a red triangle over a black background.

use std::error;
use std::fmt;

use crate::backend::pipeline::Pipeline;
use crate::buffer::{BufferError, BufferUsage, VertexBuffer};
use crate::context::GraphicsContext;
use crate::pipeline::{draw, DrawCall, Mode, PipelineError, PipelineState};
use crate::shader::{Program, ProgramError};
use crate::vertex::AttributeBinding;

/// Vertex shader of the default scene: forwards its input position.
pub const VERTEX_SHADER: &str = "attribute vec4 a_position;

void main() {
  gl_Position = a_position;
}
";

/// Fragment shader of the default scene: paints everything red.
pub const FRAGMENT_SHADER: &str = "precision mediump float;

void main() {
  gl_FragColor = vec4(1, 0, 0, 1);
}
";

/// Vertex positions of the default scene, in clip space.
pub const TRIANGLE_POSITIONS: [[f32; 2]; 3] = [[0., 0.], [0., 0.5], [0.7, 0.]];

/// Name of the position attribute of the default scene.
pub const POSITION_ATTRIBUTE: &str = "a_position";

/// Clear color of the default scene.
pub const CLEAR_COLOR: [f32; 4] = [0., 0., 0., 1.];

/// A single draw call worth of configuration.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
  feature = "serde",
  derive(serde::Serialize, serde::Deserialize),
  serde(default)
)]
pub struct Scene {
  /// Vertex shader source.
  pub vertex_shader: String,
  /// Fragment shader source.
  pub fragment_shader: String,
  /// 2D positions, one per vertex.
  pub positions: Vec<[f32; 2]>,
  /// Vertex shader input fed with `positions`.
  pub attribute: String,
  /// Color the surface is cleared with before drawing.
  pub clear_color: [f32; 4],
  /// How vertices are assembled.
  pub mode: Mode,
  /// Usage hint of the vertex buffer.
  pub usage: BufferUsage,
}

impl Default for Scene {
  fn default() -> Self {
    Scene {
      vertex_shader: VERTEX_SHADER.to_owned(),
      fragment_shader: FRAGMENT_SHADER.to_owned(),
      positions: TRIANGLE_POSITIONS.to_vec(),
      attribute: POSITION_ATTRIBUTE.to_owned(),
      clear_color: CLEAR_COLOR,
      mode: Mode::Triangle,
      usage: BufferUsage::StaticDraw,
    }
  }
}

impl Scene {
  /// Draw call described by this scene.
  pub fn draw_call(&self) -> DrawCall {
    DrawCall::new(
      AttributeBinding::new(self.attribute.clone(), 2),
      self.positions.len(),
      self.mode,
    )
  }

  /// Pipeline state described by this scene.
  pub fn pipeline_state(&self) -> PipelineState {
    PipelineState::default().set_clear_color(self.clear_color)
  }

  /// Build the program and the vertex buffer, then draw once.
  ///
  /// The returned [`RenderedScene`] keeps the resources alive so that the scene can be drawn
  /// again.
  pub fn render<C, B>(&self, ctx: &mut C) -> Result<RenderedScene<B>, SceneError>
  where
    C: GraphicsContext<Backend = B>,
    B: ?Sized + Pipeline,
  {
    let program = Program::from_strings(ctx, &self.vertex_shader, &self.fragment_shader)?;
    let buffer = VertexBuffer::new(ctx, &self.positions, self.usage)?;

    let rendered = RenderedScene {
      program,
      buffer,
      call: self.draw_call(),
      state: self.pipeline_state(),
    };

    rendered.redraw(ctx)?;
    Ok(rendered)
  }
}

/// Resources of a scene that has been drawn.
pub struct RenderedScene<B>
where
  B: ?Sized + Pipeline,
{
  program: Program<B>,
  buffer: VertexBuffer<B>,
  call: DrawCall,
  state: PipelineState,
}

impl<B> RenderedScene<B>
where
  B: ?Sized + Pipeline,
{
  /// Run the draw sequence again.
  pub fn redraw<C>(&self, ctx: &mut C) -> Result<(), PipelineError>
  where
    C: GraphicsContext<Backend = B>,
  {
    draw(ctx, &self.program, &self.buffer, &self.call, &self.state)
  }

  /// Linked program.
  pub fn program(&self) -> &Program<B> {
    &self.program
  }

  /// Uploaded vertex buffer.
  pub fn buffer(&self) -> &VertexBuffer<B> {
    &self.buffer
  }
}

impl<B> fmt::Debug for RenderedScene<B>
where
  B: ?Sized + Pipeline,
{
  fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
    f.debug_struct("RenderedScene")
      .field("program", &self.program)
      .field("buffer", &self.buffer)
      .field("call", &self.call)
      .field("state", &self.state)
      .finish()
  }
}

/// Errors a [`Scene`] can fail with.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SceneError {
  /// The program could not be built.
  Program(ProgramError),
  /// The vertex buffer could not be created.
  Buffer(BufferError),
  /// The draw call failed.
  Pipeline(PipelineError),
}

impl fmt::Display for SceneError {
  fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
    match *self {
      SceneError::Program(ref e) => write!(f, "scene program error: {}", e),
      SceneError::Buffer(ref e) => write!(f, "scene buffer error: {}", e),
      SceneError::Pipeline(ref e) => write!(f, "scene pipeline error: {}", e),
    }
  }
}

impl error::Error for SceneError {
  fn source(&self) -> Option<&(dyn error::Error + 'static)> {
    match self {
      SceneError::Program(e) => Some(e),
      SceneError::Buffer(e) => Some(e),
      SceneError::Pipeline(e) => Some(e),
    }
  }
}

impl From<ProgramError> for SceneError {
  fn from(e: ProgramError) -> Self {
    SceneError::Program(e)
  }
}

impl From<BufferError> for SceneError {
  fn from(e: BufferError) -> Self {
    SceneError::Buffer(e)
  }
}

impl From<PipelineError> for SceneError {
  fn from(e: PipelineError) -> Self {
    SceneError::Pipeline(e)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_scene_is_the_red_triangle() {
    let scene = Scene::default();
    let call = scene.draw_call();

    assert_eq!(call.vertex_count, 3);
    assert_eq!(call.mode, Mode::Triangle);
    assert_eq!(call.binding, AttributeBinding::new("a_position", 2));
    assert_eq!(scene.pipeline_state().clear_color(), Some(&[0., 0., 0., 1.]));
    assert!(scene.vertex_shader.contains("attribute vec4 a_position;"));
  }

  #[cfg(feature = "serde")]
  #[test]
  fn partial_scene_file_falls_back_to_defaults() {
    let scene: Scene = serde_json::from_str(r#"{ "clear_color": [0, 0, 1, 1] }"#).unwrap();

    assert_eq!(scene.clear_color, [0., 0., 1., 1.]);
    assert_eq!(scene.positions, TRIANGLE_POSITIONS.to_vec());
    assert_eq!(scene.mode, Mode::Triangle);
  }
}
