//! Types and runtime values of the shading language.

use std::fmt;

/// A type the shading language can manipulate.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Type {
  Void,
  Bool,
  Int,
  Float,
  Vec2,
  Vec3,
  Vec4,
}

impl Type {
  /// Float vector type of `n` components; `n == 1` is `float`.
  pub fn float_vector(n: usize) -> Option<Self> {
    match n {
      1 => Some(Type::Float),
      2 => Some(Type::Vec2),
      3 => Some(Type::Vec3),
      4 => Some(Type::Vec4),
      _ => None,
    }
  }

  /// Number of scalar components; 0 for `void`.
  pub fn components(self) -> usize {
    match self {
      Type::Void => 0,
      Type::Bool | Type::Int | Type::Float => 1,
      Type::Vec2 => 2,
      Type::Vec3 => 3,
      Type::Vec4 => 4,
    }
  }

  pub fn is_scalar(self) -> bool {
    matches!(self, Type::Bool | Type::Int | Type::Float)
  }

  pub fn is_vector(self) -> bool {
    matches!(self, Type::Vec2 | Type::Vec3 | Type::Vec4)
  }

  /// `float` or a float vector.
  pub fn is_float_based(self) -> bool {
    matches!(self, Type::Float | Type::Vec2 | Type::Vec3 | Type::Vec4)
  }

  pub fn is_numeric(self) -> bool {
    self == Type::Int || self.is_float_based()
  }
}

impl fmt::Display for Type {
  fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
    let name = match *self {
      Type::Void => "void",
      Type::Bool => "bool",
      Type::Int => "int",
      Type::Float => "float",
      Type::Vec2 => "vec2",
      Type::Vec3 => "vec3",
      Type::Vec4 => "vec4",
    };

    f.write_str(name)
  }
}

/// A runtime value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
  Void,
  Bool(bool),
  Int(i32),
  Float(f32),
  /// A float vector: component count and storage.
  Vec(u8, [f32; 4]),
}

impl Value {
  /// Zero value of a type (`false` for `bool`).
  pub fn zero(ty: Type) -> Self {
    match ty {
      Type::Void => Value::Void,
      Type::Bool => Value::Bool(false),
      Type::Int => Value::Int(0),
      Type::Float => Value::Float(0.),
      _ => Value::Vec(ty.components() as u8, [0.; 4]),
    }
  }

  /// Build a float-based value out of up to four components.
  pub fn from_floats(n: usize, c: [f32; 4]) -> Self {
    if n == 1 {
      Value::Float(c[0])
    } else {
      Value::Vec(n as u8, c)
    }
  }

  pub fn ty(&self) -> Type {
    match *self {
      Value::Void => Type::Void,
      Value::Bool(_) => Type::Bool,
      Value::Int(_) => Type::Int,
      Value::Float(_) => Type::Float,
      Value::Vec(n, _) => Type::float_vector(n as usize).unwrap_or(Type::Void),
    }
  }

  /// Components converted to floats, with the count of meaningful ones.
  pub fn floats(&self) -> (usize, [f32; 4]) {
    match *self {
      Value::Void => (0, [0.; 4]),
      Value::Bool(b) => (1, [if b { 1. } else { 0. }, 0., 0., 0.]),
      Value::Int(i) => (1, [i as f32, 0., 0., 0.]),
      Value::Float(x) => (1, [x, 0., 0., 0.]),
      Value::Vec(n, c) => (n as usize, c),
    }
  }

  pub fn as_bool(&self) -> bool {
    match *self {
      Value::Bool(b) => b,
      Value::Int(i) => i != 0,
      Value::Float(x) => x != 0.,
      Value::Vec(_, c) => c[0] != 0.,
      Value::Void => false,
    }
  }

  pub fn as_int(&self) -> i32 {
    match *self {
      Value::Bool(b) => b as i32,
      Value::Int(i) => i,
      Value::Float(x) => x as i32,
      Value::Vec(_, c) => c[0] as i32,
      Value::Void => 0,
    }
  }

  pub fn as_float(&self) -> f32 {
    self.floats().1[0]
  }

  /// Components as a vec4, missing ones taken from `(0, 0, 0, 1)`.
  pub fn to_vec4(&self) -> [f32; 4] {
    let (n, c) = self.floats();
    let mut out = [0., 0., 0., 1.];
    out[..n].copy_from_slice(&c[..n]);
    out
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn zero_values() {
    assert_eq!(Value::zero(Type::Vec3), Value::Vec(3, [0.; 4]));
    assert_eq!(Value::zero(Type::Bool), Value::Bool(false));
    assert_eq!(Value::zero(Type::Vec3).ty(), Type::Vec3);
  }

  #[test]
  fn vec4_expansion() {
    assert_eq!(Value::Vec(2, [0.5, 0.25, 9., 9.]).to_vec4(), [0.5, 0.25, 0., 1.]);
    assert_eq!(Value::Int(3).to_vec4(), [3., 0., 0., 1.]);
  }
}
