//! Program linking.
//!
//! Linking matches the interface of a vertex shader with the one of a fragment shader and assigns
//! attribute locations. Failures are reported as a single log, one `ERROR:` line per problem.

use std::rc::Rc;

use glint::shader::StageType;

use crate::glsl::ir::{BuiltinVar, GlobalKind, Shader};

/// Maximum number of vertex attributes a program can declare.
pub const MAX_VERTEX_ATTRIBS: usize = 16;

/// An attribute statically used by the vertex shader.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ActiveAttribute {
  pub name: String,
  /// Index of the attribute among the vertex shader globals.
  pub global: usize,
  pub location: u32,
}

/// A varying written by the vertex shader and read by the fragment shader.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct VaryingLink {
  pub vertex: usize,
  pub fragment: usize,
}

/// Result of a successful link.
#[derive(Debug)]
pub struct LinkedProgram {
  pub vertex: Rc<Shader>,
  pub fragment: Rc<Shader>,
  pub attributes: Vec<ActiveAttribute>,
  pub varyings: Vec<VaryingLink>,
}

impl LinkedProgram {
  pub fn attribute(&self, name: &str) -> Option<&ActiveAttribute> {
    self.attributes.iter().find(|a| a.name == name)
  }
}

/// Link two compiled stages.
pub fn link(vertex: &Rc<Shader>, fragment: &Rc<Shader>) -> Result<LinkedProgram, String> {
  let mut errors = Vec::new();

  if vertex.stage != StageType::VertexShader || fragment.stage != StageType::FragmentShader {
    errors.push(format!(
      "program needs one vertex shader and one fragment shader, got a {} and a {}",
      vertex.stage, fragment.stage
    ));

    return Err(log(&errors));
  }

  let position = vertex.builtin(BuiltinVar::Position);
  if !position.map_or(false, |i| vertex.written[i]) {
    errors.push("vertex shader does not write to gl_Position".to_owned());
  }

  let declared = vertex.globals_of(GlobalKind::Attribute).count();
  if declared > MAX_VERTEX_ATTRIBS {
    errors.push(format!(
      "too many vertex attributes ({} declared, at most {} supported)",
      declared, MAX_VERTEX_ATTRIBS
    ));
  }

  let mut varyings = Vec::new();

  for (f, g) in fragment.globals_of(GlobalKind::Varying) {
    match vertex.global(&g.name) {
      Some(v) if vertex.globals[v].kind == GlobalKind::Varying => {
        if vertex.globals[v].ty != g.ty {
          errors.push(format!(
            "varying '{}' has type {} in the vertex shader and {} in the fragment shader",
            g.name, vertex.globals[v].ty, g.ty
          ));
        } else {
          varyings.push(VaryingLink {
            vertex: v,
            fragment: f,
          });
        }
      }

      _ if fragment.used[f] => {
        errors.push(format!(
          "varying '{}' is read by the fragment shader but not declared in the vertex shader",
          g.name
        ));
      }

      _ => (),
    }
  }

  for (_, g) in fragment.globals_of(GlobalKind::Uniform) {
    let other = vertex
      .global(&g.name)
      .map(|v| &vertex.globals[v])
      .filter(|v| v.kind == GlobalKind::Uniform);

    if let Some(v) = other {
      if v.ty != g.ty {
        errors.push(format!(
          "uniform '{}' has type {} in the vertex shader and {} in the fragment shader",
          g.name, v.ty, g.ty
        ));
      }
    }
  }

  if !errors.is_empty() {
    return Err(log(&errors));
  }

  let attributes = vertex
    .globals_of(GlobalKind::Attribute)
    .filter(|&(i, _)| vertex.used[i])
    .enumerate()
    .map(|(location, (global, g))| ActiveAttribute {
      name: g.name.clone(),
      global,
      location: location as u32,
    })
    .collect();

  Ok(LinkedProgram {
    vertex: vertex.clone(),
    fragment: fragment.clone(),
    attributes,
    varyings,
  })
}

fn log(errors: &[String]) -> String {
  errors
    .iter()
    .map(|e| format!("ERROR: {}", e))
    .collect::<Vec<_>>()
    .join("\n")
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::glsl::compile;

  fn stage(ty: StageType, src: &str) -> Rc<Shader> {
    Rc::new(compile(ty, src).unwrap())
  }

  fn vs(src: &str) -> Rc<Shader> {
    stage(StageType::VertexShader, src)
  }

  fn fs(src: &str) -> Rc<Shader> {
    stage(StageType::FragmentShader, src)
  }

  const RED: &str = "precision mediump float; void main() { gl_FragColor = vec4(1, 0, 0, 1); }";

  #[test]
  fn active_attributes_in_declaration_order() {
    let program = link(
      &vs(
        "attribute vec2 unused;
         attribute vec4 a_position;
         attribute float a_size;
         void main() { gl_Position = a_position; gl_PointSize = a_size; }",
      ),
      &fs(RED),
    )
    .unwrap();

    let names: Vec<_> = program
      .attributes
      .iter()
      .map(|a| (a.name.as_str(), a.location))
      .collect();
    assert_eq!(names, [("a_position", 0), ("a_size", 1)]);
    assert!(program.attribute("unused").is_none());
  }

  #[test]
  fn gl_position_must_be_written() {
    let log = link(&vs("attribute vec4 p; void main() { vec4 q = p; }"), &fs(RED)).unwrap_err();
    assert_eq!(log, "ERROR: vertex shader does not write to gl_Position");
  }

  #[test]
  fn stages_must_be_vertex_then_fragment() {
    let v = vs("void main() { gl_Position = vec4(0.0); }");
    assert!(link(&v, &v).unwrap_err().starts_with("ERROR: program needs"));
  }

  #[test]
  fn varyings() {
    let v = vs("varying vec2 v_uv; void main() { v_uv = vec2(1.0); gl_Position = vec4(v_uv, 0.0, 1.0); }");
    let program = link(
      &v,
      &fs("precision mediump float; varying vec2 v_uv; void main() { gl_FragColor = vec4(v_uv, 0.0, 1.0); }"),
    )
    .unwrap();
    assert_eq!(program.varyings.len(), 1);

    let missing = link(
      &v,
      &fs("precision mediump float; varying float v_t; void main() { gl_FragColor = vec4(v_t); }"),
    )
    .unwrap_err();
    assert!(missing.contains("'v_t' is read by the fragment shader"));

    // declared but never read
    assert!(link(
      &v,
      &fs("precision mediump float; varying float v_t; void main() { gl_FragColor = vec4(1.0); }"),
    )
    .is_ok());

    let mismatch = link(
      &v,
      &fs("precision mediump float; varying vec3 v_uv; void main() { gl_FragColor = vec4(v_uv, 1.0); }"),
    )
    .unwrap_err();
    assert!(mismatch.contains("varying 'v_uv' has type vec2 in the vertex shader and vec3"));
  }

  #[test]
  fn uniform_types_must_agree() {
    let log = link(
      &vs("uniform float u; void main() { gl_Position = vec4(u); }"),
      &fs("precision mediump float; uniform vec4 u; void main() { gl_FragColor = u; }"),
    )
    .unwrap_err();

    assert!(log.contains("uniform 'u'"));
  }

  #[test]
  fn too_many_attributes() {
    let decls: String = (0..17).map(|i| format!("attribute float a{};\n", i)).collect();
    let log = link(
      &vs(&format!("{}void main() {{ gl_Position = vec4(a0); }}", decls)),
      &fs(RED),
    )
    .unwrap_err();

    assert!(log.contains("too many vertex attributes (17 declared"));
  }

  #[test]
  fn errors_are_collected() {
    let log = link(
      &vs("void main() { }"),
      &fs("precision mediump float; varying float v; void main() { gl_FragColor = vec4(v); }"),
    )
    .unwrap_err();

    assert_eq!(log.lines().count(), 2);
  }
}
