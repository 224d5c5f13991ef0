//! Graphics state.

use js_sys::{Float32Array, Int32Array};
use std::{fmt, marker::PhantomData};
use web_sys::{WebGlBuffer, WebGlProgram, WebGlRenderingContext};

/// The graphics state.
///
/// This type represents the current state of a given WebGL context. It acts as a forward-gate to
/// the context and skips calls that would set a value the context already holds.
#[derive(Debug)]
pub struct WebGlState {
  _a: PhantomData<*const ()>, // !Send and !Sync

  // WebGL context
  pub(crate) ctx: WebGlRenderingContext,

  viewport: [i32; 4],
  clear_color: [f32; 4],

  bound_array_buffer: Option<WebGlBuffer>,
  current_program: Option<WebGlProgram>,

  enabled_attribs: Vec<bool>,
}

impl WebGlState {
  pub(crate) fn new(ctx: WebGlRenderingContext) -> Result<Self, StateQueryError> {
    Self::get_from_context(ctx)
  }

  fn get_from_context(mut ctx: WebGlRenderingContext) -> Result<Self, StateQueryError> {
    let viewport = get_ctx_viewport(&mut ctx)?;
    let clear_color = get_ctx_clear_color(&mut ctx)?;
    let max_attribs: usize = ctx
      .get_webgl_param(WebGlRenderingContext::MAX_VERTEX_ATTRIBS)
      .ok_or(StateQueryError::UnknownMaxVertexAttribs)?;

    Ok(WebGlState {
      _a: PhantomData,
      ctx,
      viewport,
      clear_color,
      bound_array_buffer: None,
      current_program: None,
      enabled_attribs: vec![false; max_attribs],
    })
  }

  /// Size of the drawing buffer of the canvas.
  pub fn surface_size(&self) -> [u32; 2] {
    [
      self.ctx.drawing_buffer_width().max(0) as u32,
      self.ctx.drawing_buffer_height().max(0) as u32,
    ]
  }

  /// Currently bound array buffer, if any.
  pub fn bound_array_buffer(&self) -> Option<&WebGlBuffer> {
    self.bound_array_buffer.as_ref()
  }

  /// Currently used program, if any.
  pub fn current_program(&self) -> Option<&WebGlProgram> {
    self.current_program.as_ref()
  }

  /// Whether the attribute at `location` is enabled.
  pub fn is_attrib_enabled(&self, location: u32) -> bool {
    self
      .enabled_attribs
      .get(location as usize)
      .copied()
      .unwrap_or(false)
  }

  /// Number of vertex attribute locations the context supports.
  pub fn max_vertex_attribs(&self) -> usize {
    self.enabled_attribs.len()
  }

  pub(crate) fn set_viewport(&mut self, viewport: [i32; 4]) {
    if self.viewport != viewport {
      self
        .ctx
        .viewport(viewport[0], viewport[1], viewport[2], viewport[3]);
      self.viewport = viewport;
    }
  }

  pub(crate) fn set_clear_color(&mut self, clear_color: [f32; 4]) {
    if self.clear_color != clear_color {
      self.ctx.clear_color(
        clear_color[0],
        clear_color[1],
        clear_color[2],
        clear_color[3],
      );
      self.clear_color = clear_color;
    }
  }

  pub(crate) fn bind_array_buffer(&mut self, buffer: Option<&WebGlBuffer>, bind: Bind) {
    if bind == Bind::Forced || self.bound_array_buffer.as_ref() != buffer {
      self
        .ctx
        .bind_buffer(WebGlRenderingContext::ARRAY_BUFFER, buffer);
      self.bound_array_buffer = buffer.cloned();
    }
  }

  pub(crate) fn unbind_buffer(&mut self, buffer: &WebGlBuffer) {
    if self.bound_array_buffer.as_ref() == Some(buffer) {
      self.bind_array_buffer(None, Bind::Cached);
    }
  }

  pub(crate) fn use_program(&mut self, handle: Option<&WebGlProgram>) {
    if self.current_program.as_ref() != handle {
      self.ctx.use_program(handle);
      self.current_program = handle.cloned();
    }
  }

  pub(crate) fn unuse_program(&mut self, handle: &WebGlProgram) {
    if self.current_program.as_ref() == Some(handle) {
      self.use_program(None);
    }
  }

  pub(crate) fn enable_vertex_attrib(&mut self, location: u32) {
    if let Some(enabled) = self.enabled_attribs.get_mut(location as usize) {
      if !*enabled {
        self.ctx.enable_vertex_attrib_array(location);
        *enabled = true;
      }
    }
  }
}

/// Should the binding be cached or forced to the provided value?
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub(crate) enum Bind {
  Forced,
  Cached,
}

/// An error that might happen when the context is queried.
#[non_exhaustive]
#[derive(Debug, Eq, PartialEq)]
pub enum StateQueryError {
  /// Unknown viewport initial state.
  UnknownViewportInitialState,
  /// Unknown clear color initial state.
  UnknownClearColorInitialState,
  /// The maximum number of vertex attributes couldn’t be retrieved.
  UnknownMaxVertexAttribs,
}

impl fmt::Display for StateQueryError {
  fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
    match *self {
      StateQueryError::UnknownViewportInitialState => f.write_str("unknown viewport initial state"),
      StateQueryError::UnknownClearColorInitialState => {
        f.write_str("unknown clear color initial state")
      }
      StateQueryError::UnknownMaxVertexAttribs => {
        f.write_str("unknown maximum number of vertex attributes")
      }
    }
  }
}

impl std::error::Error for StateQueryError {}

fn get_ctx_viewport(ctx: &mut WebGlRenderingContext) -> Result<[i32; 4], StateQueryError> {
  let array: Int32Array = ctx
    .get_webgl_param(WebGlRenderingContext::VIEWPORT)
    .ok_or(StateQueryError::UnknownViewportInitialState)?;

  if array.length() != 4 {
    return Err(StateQueryError::UnknownViewportInitialState);
  }

  let mut viewport = [0; 4];
  array.copy_to(&mut viewport); // length checked above

  Ok(viewport)
}

fn get_ctx_clear_color(ctx: &mut WebGlRenderingContext) -> Result<[f32; 4], StateQueryError> {
  let array: Float32Array = ctx
    .get_webgl_param(WebGlRenderingContext::COLOR_CLEAR_VALUE)
    .ok_or(StateQueryError::UnknownClearColorInitialState)?;

  if array.length() != 4 {
    return Err(StateQueryError::UnknownClearColorInitialState);
  }

  let mut color = [0.0; 4];
  array.copy_to(&mut color); // length checked above

  Ok(color)
}

trait GetWebGlParam<T> {
  fn get_webgl_param(&mut self, param: u32) -> Option<T>;
}

impl GetWebGlParam<usize> for WebGlRenderingContext {
  fn get_webgl_param(&mut self, param: u32) -> Option<usize> {
    self
      .get_parameter(param)
      .ok()
      .and_then(|x| x.as_f64())
      .map(|x| x as usize)
  }
}

macro_rules! impl_GetWebGlParam_array {
  ($($arr_ty:ty),*) => {
    $(
      impl GetWebGlParam<$arr_ty> for WebGlRenderingContext {
        fn get_webgl_param(&mut self, param: u32) -> Option<$arr_ty> {
          self
            .get_parameter(param)
            .ok()
            .map(|a| a.into())
        }
      }
    )*
  }
}

impl_GetWebGlParam_array!(Int32Array, Float32Array);
