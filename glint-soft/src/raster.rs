//! Vertex processing and rasterization.
//!
//! A draw runs in two passes: every vertex of the range is fetched and shaded first, then
//! primitives are assembled, clipped against `w > 0`, mapped to window coordinates and filled, one
//! fragment shader invocation per covered pixel.

use glint::pipeline::{Mode, PipelineError};
use glint::vertex::VertexAttribType;

use crate::glsl::interp::Invocation;
use crate::glsl::ir::{BuiltinVar, Shader};
use crate::glsl::types::Value;
use crate::linker::LinkedProgram;
use crate::state::{AttribPointer, SoftState};
use crate::surface::{quantize, Surface};

/// A shaded vertex.
#[derive(Clone, Debug, PartialEq)]
pub struct ShadedVertex {
  /// Clip-space position.
  pub position: [f32; 4],
  pub point_size: f32,
  /// Varying values, in the order of [`LinkedProgram::varyings`].
  pub varyings: Vec<Value>,
}

/// Fetch and shade vertices `first..first + count`.
pub fn shade_vertices(
  state: &SoftState,
  program: &LinkedProgram,
  first: usize,
  count: usize,
) -> Result<Vec<ShadedVertex>, PipelineError> {
  let shader = &*program.vertex;
  let position = shader.builtin(BuiltinVar::Position);
  let point_size = shader.builtin(BuiltinVar::PointSize);

  (first..first + count)
    .map(|index| -> Result<ShadedVertex, PipelineError> {
      let mut inv = Invocation::new(shader);

      for attr in &program.attributes {
        let raw = fetch(state, attr.location, index)?;
        let n = shader.globals[attr.global].ty.components();
        inv.globals[attr.global] = Value::from_floats(n, raw);
      }

      inv
        .run()
        .map_err(|e| PipelineError::execution_failed(format!("vertex shader: {}", e)))?;

      Ok(ShadedVertex {
        position: position.map_or([0., 0., 0., 1.], |i| inv.globals[i].to_vec4()),
        point_size: point_size.map_or(1., |i| inv.globals[i].as_float()),
        varyings: program
          .varyings
          .iter()
          .map(|link| inv.globals[link.vertex])
          .collect(),
      })
    })
    .collect()
}

/// Read the value of attribute `location` for vertex `index`, expanded to four components.
///
/// Disabled attributes read the generic default `(0, 0, 0, 1)`.
pub fn fetch(state: &SoftState, location: u32, index: usize) -> Result<[f32; 4], PipelineError> {
  let mut out = [0., 0., 0., 1.];

  let pointer = match state.attrib_pointer(location) {
    Some(p) if state.is_attrib_enabled(location) => p,
    _ => return Ok(out),
  };

  let data = state.buffer_data(pointer.buffer).unwrap_or(&[]);
  let size = pointer.ty.size();
  let start = pointer.offset + index * pointer.stride;

  for (c, o) in out.iter_mut().enumerate().take(pointer.components as usize) {
    let at = start + c * size;
    let bytes = data.get(at..at + size).ok_or_else(|| {
      PipelineError::execution_failed(format!(
        "vertex {} reads past the end of buffer {} ({} bytes)",
        index,
        pointer.buffer,
        data.len()
      ))
    })?;

    *o = component(&pointer, bytes);
  }

  Ok(out)
}

// Decode a single component, normalizing integers when asked to.
fn component(pointer: &AttribPointer, bytes: &[u8]) -> f32 {
  let (value, max) = match pointer.ty {
    VertexAttribType::Byte => (bytes[0] as i8 as f32, i8::MAX as f32),
    VertexAttribType::UnsignedByte => (bytes[0] as f32, u8::MAX as f32),
    VertexAttribType::Short => (i16::from_ne_bytes([bytes[0], bytes[1]]) as f32, i16::MAX as f32),
    VertexAttribType::UnsignedShort => {
      (u16::from_ne_bytes([bytes[0], bytes[1]]) as f32, u16::MAX as f32)
    }
    VertexAttribType::Float => {
      return f32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    }
  };

  if pointer.normalized {
    (value / max).max(-1.)
  } else {
    value
  }
}

/// Vertex indices of the primitives `mode` assembles out of `count` vertices.
pub fn assemble(mode: Mode, count: usize) -> Vec<Vec<usize>> {
  match mode {
    Mode::Point => (0..count).map(|i| vec![i]).collect(),

    Mode::Line => (0..count / 2).map(|i| vec![2 * i, 2 * i + 1]).collect(),

    Mode::LineStrip => (1..count.max(1)).map(|i| vec![i - 1, i]).collect(),

    Mode::LineLoop => {
      let mut lines = assemble(Mode::LineStrip, count);
      if count >= 2 {
        lines.push(vec![count - 1, 0]);
      }
      lines
    }

    Mode::Triangle => (0..count / 3)
      .map(|i| vec![3 * i, 3 * i + 1, 3 * i + 2])
      .collect(),

    // every other triangle is flipped to keep the winding of the first one
    Mode::TriangleStrip => (2..count.max(2))
      .map(|i| {
        if i % 2 == 0 {
          vec![i - 2, i - 1, i]
        } else {
          vec![i - 1, i - 2, i]
        }
      })
      .collect(),

    Mode::TriangleFan => (2..count.max(2)).map(|i| vec![0, i - 1, i]).collect(),
  }
}

// A vertex after perspective division and viewport mapping.
#[derive(Clone, Copy, Debug)]
struct WindowVertex {
  x: f32,
  y: f32,
  /// Depth in [0, 1] when inside the clip volume.
  z: f32,
  /// 1 / w_clip.
  inv_w: f32,
}

/// Fills primitives into a surface.
pub struct Rasterizer<'a> {
  program: &'a LinkedProgram,
  viewport: [u32; 4],
  // window-space rectangle fragments are kept in, [x0, y0, x1, y1)
  bounds: [i64; 4],
  target: &'a mut Surface,
}

impl<'a> Rasterizer<'a> {
  pub fn new(program: &'a LinkedProgram, viewport: [u32; 4], target: &'a mut Surface) -> Self {
    let [x, y, w, h] = viewport;
    let [sw, sh] = target.size();
    let bounds = [
      x as i64,
      y as i64,
      (x as i64 + w as i64).min(sw as i64),
      (y as i64 + h as i64).min(sh as i64),
    ];

    Rasterizer {
      program,
      viewport,
      bounds,
      target,
    }
  }

  /// Rasterize every primitive of `mode` made of `vertices`.
  pub fn draw(&mut self, mode: Mode, vertices: &[ShadedVertex]) -> Result<(), PipelineError> {
    for primitive in assemble(mode, vertices.len()) {
      let vs: Vec<&ShadedVertex> = primitive.iter().map(|&i| &vertices[i]).collect();

      if vs.iter().any(|v| v.position[3] <= 0.) {
        continue;
      }

      let ws: Vec<WindowVertex> = vs.iter().map(|v| self.to_window(v.position)).collect();

      match *ws.as_slice() {
        [a] => self.point(a, vs[0])?,
        [a, b] => self.line([a, b], [vs[0], vs[1]])?,
        [a, b, c] => self.triangle([a, b, c], [vs[0], vs[1], vs[2]])?,
        _ => (),
      }
    }

    Ok(())
  }

  fn to_window(&self, clip: [f32; 4]) -> WindowVertex {
    let [vx, vy, vw, vh] = self.viewport;
    let inv_w = 1. / clip[3];
    let ndc = [clip[0] * inv_w, clip[1] * inv_w, clip[2] * inv_w];

    WindowVertex {
      x: vx as f32 + (ndc[0] + 1.) * 0.5 * vw as f32,
      y: vy as f32 + (ndc[1] + 1.) * 0.5 * vh as f32,
      z: (ndc[2] + 1.) * 0.5,
      inv_w,
    }
  }

  fn point(&mut self, v: WindowVertex, shaded: &ShadedVertex) -> Result<(), PipelineError> {
    let half = shaded.point_size.max(1.) * 0.5;

    // pixels which center lies in [c - half, c + half)
    let [bx0, by0, bx1, by1] = self.bounds;
    let x0 = ((v.x - half - 0.5).ceil() as i64).max(bx0);
    let x1 = ((v.x + half - 0.5).ceil() as i64).min(bx1);
    let y0 = ((v.y - half - 0.5).ceil() as i64).max(by0);
    let y1 = ((v.y + half - 0.5).ceil() as i64).min(by1);

    for py in y0..y1 {
      for px in x0..x1 {
        self.fragment(px, py, v.z, v.inv_w, &shaded.varyings)?;
      }
    }

    Ok(())
  }

  fn line(
    &mut self,
    [a, b]: [WindowVertex; 2],
    [va, vb]: [&ShadedVertex; 2],
  ) -> Result<(), PipelineError> {
    let dx = b.x - a.x;
    let dy = b.y - a.y;

    if !(dx.is_finite() && dy.is_finite()) {
      return Ok(());
    }

    let steps = dx.abs().max(dy.abs()).round().max(1.) as f64;

    // parametric span [t0, t1] of the segment inside the bounds
    let [bx0, by0, bx1, by1] = self.bounds;
    let (mut t0, mut t1) = (0f64, 1f64);

    for (p, d, lo, hi) in [(a.x, dx, bx0, bx1), (a.y, dy, by0, by1)] {
      let (p, d, lo, hi) = (p as f64, d as f64, lo as f64, hi as f64);

      if d == 0. {
        if p < lo || p >= hi {
          return Ok(());
        }
      } else {
        let (ta, tb) = ((lo - p) / d, (hi - p) / d);
        t0 = t0.max(ta.min(tb));
        t1 = t1.min(ta.max(tb));
      }
    }

    if t0 > t1 {
      return Ok(());
    }

    // samples sit at t = (i + 0.5) / steps; strays at either end are dropped by the fragment test
    let first = (t0 * steps - 0.5).floor().max(0.) as usize;
    let last = ((t1 * steps - 0.5).ceil() + 1.).min(steps) as usize;

    for i in first..last {
      let t64 = (i as f64 + 0.5) / steps;
      let x = a.x as f64 + t64 * dx as f64;
      let y = a.y as f64 + t64 * dy as f64;

      let t = t64 as f32;
      let z = a.z + t * (b.z - a.z);

      // perspective-correct weights
      let wa = (1. - t) * a.inv_w;
      let wb = t * b.inv_w;
      let inv_w = wa + wb;
      let varyings = interpolate(&[&va.varyings, &vb.varyings], &[wa / inv_w, wb / inv_w]);

      self.fragment(x.floor() as i64, y.floor() as i64, z, inv_w, &varyings)?;
    }

    Ok(())
  }

  fn triangle(
    &mut self,
    [a, mut b, mut c]: [WindowVertex; 3],
    [va, mut vb, mut vc]: [&ShadedVertex; 3],
  ) -> Result<(), PipelineError> {
    let mut area = edge(a, b, c.x, c.y);

    if area == 0. || area.is_nan() {
      return Ok(());
    }

    // counter-clockwise from here on
    if area < 0. {
      std::mem::swap(&mut b, &mut c);
      std::mem::swap(&mut vb, &mut vc);
      area = -area;
    }

    let [bx0, by0, bx1, by1] = self.bounds;
    let x0 = (a.x.min(b.x).min(c.x).floor() as i64).max(bx0);
    let x1 = (a.x.max(b.x).max(c.x).ceil() as i64).min(bx1);
    let y0 = (a.y.min(b.y).min(c.y).floor() as i64).max(by0);
    let y1 = (a.y.max(b.y).max(c.y).ceil() as i64).min(by1);

    let edges = [(b, c), (c, a), (a, b)];
    let top_left = edges.map(|(p, q)| is_top_left(p, q));

    for py in y0..y1 {
      for px in x0..x1 {
        let (x, y) = (px as f32 + 0.5, py as f32 + 0.5);
        let e = edges.map(|(p, q)| edge(p, q, x, y));

        let inside = e
          .iter()
          .zip(&top_left)
          .all(|(&e, &tl)| e > 0. || (e == 0. && tl));

        if !inside {
          continue;
        }

        // barycentric weights of a, b and c
        let l = e.map(|e| e / area);
        let z = l[0] * a.z + l[1] * b.z + l[2] * c.z;

        let p = [l[0] * a.inv_w, l[1] * b.inv_w, l[2] * c.inv_w];
        let inv_w = p[0] + p[1] + p[2];
        let varyings = interpolate(
          &[&va.varyings, &vb.varyings, &vc.varyings],
          &p.map(|p| p / inv_w),
        );

        self.fragment(px, py, z, inv_w, &varyings)?;
      }
    }

    Ok(())
  }

  // Shade and write a single fragment at window pixel (px, py).
  fn fragment(
    &mut self,
    px: i64,
    py: i64,
    z: f32,
    inv_w: f32,
    varyings: &[Value],
  ) -> Result<(), PipelineError> {
    let [x0, y0, x1, y1] = self.bounds;

    if px < x0 || px >= x1 || py < y0 || py >= y1 || !(0. ..=1.).contains(&z) {
      return Ok(());
    }

    let shader: &Shader = &self.program.fragment;
    let mut inv = Invocation::new(shader);

    if let Some(i) = shader.builtin(BuiltinVar::FragCoord) {
      inv.globals[i] = Value::Vec(4, [px as f32 + 0.5, py as f32 + 0.5, z, inv_w]);
    }

    for (link, value) in self.program.varyings.iter().zip(varyings) {
      inv.globals[link.fragment] = *value;
    }

    let kept = inv
      .run()
      .map_err(|e| PipelineError::execution_failed(format!("fragment shader: {}", e)))?;

    if kept {
      let color = shader
        .builtin(BuiltinVar::FragColor)
        .map_or([0.; 4], |i| inv.globals[i].to_vec4());

      // surface rows go top-down
      let row = self.target.height() as i64 - 1 - py;
      self.target.set_pixel(px as u32, row as u32, quantize(color));
    }

    Ok(())
  }
}

// Twice the signed area of (a, b, p); positive when p is on the left of a → b.
fn edge(a: WindowVertex, b: WindowVertex, px: f32, py: f32) -> f32 {
  (b.x - a.x) * (py - a.y) - (b.y - a.y) * (px - a.x)
}

// Top and left edges of a counter-clockwise triangle in a y-up space.
fn is_top_left(a: WindowVertex, b: WindowVertex) -> bool {
  let dx = b.x - a.x;
  let dy = b.y - a.y;
  dy < 0. || (dy == 0. && dx < 0.)
}

// Weighted sum of per-vertex varyings.
fn interpolate(sources: &[&Vec<Value>], weights: &[f32]) -> Vec<Value> {
  let count = sources.first().map_or(0, |s| s.len());

  (0..count)
    .map(|i| {
      let (n, _) = sources[0][i].floats();
      let mut out = [0.; 4];

      for (source, &w) in sources.iter().zip(weights) {
        let (_, c) = source[i].floats();

        for (o, c) in out.iter_mut().zip(c).take(n) {
          *o += w * c;
        }
      }

      Value::from_floats(n, out)
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::rc::Rc;

  use glint::shader::StageType;

  use crate::glsl::compile;
  use crate::linker::link;

  fn program(vs: &str, fs: &str) -> LinkedProgram {
    let vs = Rc::new(compile(StageType::VertexShader, vs).unwrap());
    let fs = Rc::new(compile(StageType::FragmentShader, fs).unwrap());
    link(&vs, &fs).unwrap()
  }

  fn vertex(x: f32, y: f32) -> ShadedVertex {
    ShadedVertex {
      position: [x, y, 0., 1.],
      point_size: 1.,
      varyings: Vec::new(),
    }
  }

  fn white() -> LinkedProgram {
    program(
      "void main() { gl_Position = vec4(0.0); }",
      "precision mediump float; void main() { gl_FragColor = vec4(1.0); }",
    )
  }

  fn lit(surface: &Surface) -> usize {
    surface.pixels().iter().filter(|p| p[0] != 0).count()
  }

  #[test]
  fn primitive_assembly() {
    assert_eq!(assemble(Mode::Triangle, 7).len(), 2);
    assert_eq!(assemble(Mode::Line, 3), [vec![0, 1]]);
    assert_eq!(assemble(Mode::LineStrip, 1).len(), 0);
    assert_eq!(
      assemble(Mode::LineLoop, 3),
      [vec![0, 1], vec![1, 2], vec![2, 0]]
    );
    assert_eq!(
      assemble(Mode::TriangleStrip, 4),
      [vec![0, 1, 2], vec![2, 1, 3]]
    );
    assert_eq!(assemble(Mode::TriangleFan, 4), [vec![0, 1, 2], vec![0, 2, 3]]);
    assert_eq!(assemble(Mode::TriangleFan, 1).len(), 0);
  }

  #[test]
  fn split_quad_has_no_gaps() {
    let program = program(
      "void main() { gl_Position = vec4(0.0); }",
      "precision mediump float; void main() { gl_FragColor = vec4(0.5, 0.0, 0.0, 1.0); }",
    );
    let vertices = [
      vertex(-1., -1.),
      vertex(1., -1.),
      vertex(1., 1.),
      vertex(-1., -1.),
      vertex(1., 1.),
      vertex(-1., 1.),
    ];

    let mut surface = Surface::new(8, 8);
    Rasterizer::new(&program, [0, 0, 8, 8], &mut surface)
      .draw(Mode::Triangle, &vertices)
      .unwrap();

    assert_eq!(lit(&surface), 64);
  }

  #[test]
  fn winding_does_not_matter() {
    let program = white();
    let cw = [vertex(-1., -1.), vertex(-1., 1.), vertex(1., -1.)];
    let ccw = [vertex(-1., -1.), vertex(1., -1.), vertex(-1., 1.)];

    let mut a = Surface::new(10, 10);
    let mut b = Surface::new(10, 10);
    Rasterizer::new(&program, [0, 0, 10, 10], &mut a)
      .draw(Mode::Triangle, &cw)
      .unwrap();
    Rasterizer::new(&program, [0, 0, 10, 10], &mut b)
      .draw(Mode::Triangle, &ccw)
      .unwrap();

    assert_eq!(a, b);
    assert!(lit(&a) > 0);
  }

  #[test]
  fn window_origin_is_bottom_left() {
    let program = white();
    // lower-left quarter of the clip space
    let vertices = [vertex(-1., -1.), vertex(0., -1.), vertex(-1., 0.)];

    let mut surface = Surface::new(4, 4);
    Rasterizer::new(&program, [0, 0, 4, 4], &mut surface)
      .draw(Mode::Triangle, &vertices)
      .unwrap();

    // bottom row of the image, leftmost pixel
    assert_eq!(surface.pixel(0, 3), Some([255; 4]));
    assert_eq!(surface.pixel(0, 0), Some([0; 4]));
  }

  #[test]
  fn behind_the_eye_is_dropped() {
    let program = white();
    let mut vertices = [vertex(-1., -1.), vertex(1., -1.), vertex(-1., 1.)];
    vertices[1].position[3] = 0.;

    let mut surface = Surface::new(4, 4);
    Rasterizer::new(&program, [0, 0, 4, 4], &mut surface)
      .draw(Mode::Triangle, &vertices)
      .unwrap();

    assert_eq!(lit(&surface), 0);
  }

  #[test]
  fn depth_outside_the_clip_volume_is_discarded() {
    let program = white();
    let mut vertices = [vertex(-1., -1.), vertex(1., -1.), vertex(-1., 1.)];
    for v in &mut vertices {
      v.position[2] = 2.;
    }

    let mut surface = Surface::new(4, 4);
    Rasterizer::new(&program, [0, 0, 4, 4], &mut surface)
      .draw(Mode::Triangle, &vertices)
      .unwrap();

    assert_eq!(lit(&surface), 0);
  }

  #[test]
  fn fragments_stay_in_the_viewport() {
    let program = white();
    let vertices = [vertex(-1., -1.), vertex(3., -1.), vertex(-1., 3.)];

    let mut surface = Surface::new(8, 8);
    Rasterizer::new(&program, [0, 0, 4, 4], &mut surface)
      .draw(Mode::Triangle, &vertices)
      .unwrap();

    assert_eq!(lit(&surface), 16);
  }

  #[test]
  fn points_and_lines() {
    let program = white();

    let mut surface = Surface::new(8, 8);
    let mut big = vertex(0., 0.);
    big.point_size = 2.;
    Rasterizer::new(&program, [0, 0, 8, 8], &mut surface)
      .draw(Mode::Point, &[big])
      .unwrap();
    assert_eq!(lit(&surface), 4);

    let mut surface = Surface::new(8, 8);
    Rasterizer::new(&program, [0, 0, 8, 8], &mut surface)
      .draw(Mode::Line, &[vertex(-1., 0.125), vertex(1., 0.125)])
      .unwrap();
    assert_eq!(lit(&surface), 8);
    // window row 4 is image row 3
    assert!((0..8).all(|x| surface.pixel(x, 3) == Some([255; 4])));
  }

  #[test]
  fn long_lines_only_step_over_the_bounds() {
    let program = white();

    let mut surface = Surface::new(8, 8);
    Rasterizer::new(&program, [0, 0, 8, 8], &mut surface)
      .draw(Mode::Line, &[vertex(-1., 0.125), vertex(1e12, 0.125)])
      .unwrap();
    assert_eq!(lit(&surface), 8);
    assert!((0..8).all(|x| surface.pixel(x, 3) == Some([255; 4])));

    let mut surface = Surface::new(8, 8);
    Rasterizer::new(&program, [0, 0, 8, 8], &mut surface)
      .draw(
        Mode::LineStrip,
        &[vertex(-1e12, 5.), vertex(1e12, 5.), vertex(1e12, -1e12)],
      )
      .unwrap();
    assert_eq!(lit(&surface), 0);
  }

  #[test]
  fn varyings_are_interpolated() {
    let program = program(
      "attribute vec4 p; varying float v; void main() { v = p.z; gl_Position = vec4(p.xy, 0.0, 1.0); }",
      "precision mediump float; varying float v; void main() { gl_FragColor = vec4(v, 0.0, 0.0, 1.0); }",
    );

    let mut vertices = [vertex(-1., -1.), vertex(3., -1.), vertex(-1., 3.)];
    vertices[0].varyings = vec![Value::Float(0.)];
    vertices[1].varyings = vec![Value::Float(1.)];
    vertices[2].varyings = vec![Value::Float(0.)];

    let mut surface = Surface::new(4, 1);
    Rasterizer::new(&program, [0, 0, 4, 1], &mut surface)
      .draw(Mode::Triangle, &vertices)
      .unwrap();

    // v = x / 8 at pixel centers
    let reds: Vec<u8> = (0..4).map(|x| surface.pixel(x, 0).unwrap()[0]).collect();
    assert_eq!(reds, [16, 48, 80, 112]);
  }
}
