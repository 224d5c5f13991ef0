//! Shading language front end.
//!
//! The accepted language is a subset of GLSL ES 1.00, large enough for the shaders found in
//! WebGL tutorials: scalar and float vector types, user functions, the usual control flow and the
//! common built-in functions. Matrices, samplers, arrays and structures are rejected.
//!
//! [`compile`] turns a source string into a typed [`Shader`](ir::Shader) that
//! [`Invocation`](interp::Invocation) can execute, or into a [`CompileLog`] shaped like the info
//! log of an OpenGL driver.

pub mod ast;
pub mod builtins;
pub mod checker;
pub mod interp;
pub mod ir;
pub mod lexer;
pub mod parser;
pub mod types;

use std::error;
use std::fmt;

use glint::shader::StageType;

/// A single compilation error.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Diagnostic {
  pub line: u32,
  /// Offending token; can be empty.
  pub token: String,
  pub message: String,
}

impl Diagnostic {
  pub fn new(line: u32, token: &str, message: impl Into<String>) -> Self {
    Diagnostic {
      line,
      token: token.to_owned(),
      message: message.into(),
    }
  }
}

impl fmt::Display for Diagnostic {
  fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
    write!(
      f,
      "ERROR: 0:{}: '{}' : {}",
      self.line, self.token, self.message
    )
  }
}

/// Errors of a failed compilation, displayed as a driver info log.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CompileLog {
  pub diagnostics: Vec<Diagnostic>,
}

impl fmt::Display for CompileLog {
  fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
    for d in &self.diagnostics {
      writeln!(f, "{}", d)?;
    }

    write!(
      f,
      "ERROR: {} compilation errors.  No code generated.",
      self.diagnostics.len()
    )
  }
}

impl error::Error for CompileLog {}

impl From<Diagnostic> for CompileLog {
  fn from(d: Diagnostic) -> Self {
    CompileLog {
      diagnostics: vec![d],
    }
  }
}

/// Compile the source of a shader stage.
pub fn compile(stage: StageType, src: &str) -> Result<ir::Shader, CompileLog> {
  let tokens = lexer::tokenize(src)?;
  let unit = parser::parse(tokens)?;

  checker::check(stage, &unit).map_err(|diagnostics| CompileLog { diagnostics })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn log_shape() {
    let log = compile(
      StageType::VertexShader,
      "attribute vec4 a_position;\nvoid main() {\n  gl_Position = a_position\n}\n",
    )
    .unwrap_err();

    assert_eq!(
      log.to_string(),
      "ERROR: 0:4: '}' : syntax error, expecting ';'\nERROR: 1 compilation errors.  No code generated."
    );
  }

  #[test]
  fn original_shaders_compile() {
    let vs = compile(
      StageType::VertexShader,
      "attribute vec4 a_position;\nvoid main() {\n  gl_Position = a_position;\n}\n",
    )
    .unwrap();
    let fs = compile(
      StageType::FragmentShader,
      "precision mediump float;\nvoid main() {\n  gl_FragColor = vec4(1, 0, 0, 1);\n}\n",
    )
    .unwrap();

    assert_eq!(vs.stage, StageType::VertexShader);
    assert!(vs.global("a_position").is_some());
    assert_eq!(fs.stage, StageType::FragmentShader);
  }
}
