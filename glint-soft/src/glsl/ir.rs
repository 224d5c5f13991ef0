//! Typed intermediate representation.
//!
//! Names are resolved: variables are global slots or slots of the current call frame, calls point
//! at function indices. Every expression carries its type.

use glint::shader::StageType;

use super::builtins::Builtin;
use super::types::{Type, Value};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VarRef {
  Global(usize),
  Local(usize),
}

/// Component selection, such as `.xy` or `.bgra`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Swizzle {
  pub indices: [u8; 4],
  pub len: u8,
}

impl Swizzle {
  /// Apply `self` on top of `base`: the result selects directly out of `base`’s operand.
  pub fn compose(base: Swizzle, s: Swizzle) -> Swizzle {
    let mut indices = [0; 4];

    for i in 0..s.len as usize {
      indices[i] = base.indices[s.indices[i] as usize];
    }

    Swizzle { indices, len: s.len }
  }

  pub fn has_repeats(&self) -> bool {
    let n = self.len as usize;
    (0..n).any(|i| (i + 1..n).any(|j| self.indices[i] == self.indices[j]))
  }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LValue {
  pub var: VarRef,
  pub swizzle: Option<Swizzle>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ArithOp {
  Add,
  Sub,
  Mul,
  Div,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CompareOp {
  Lt,
  Le,
  Gt,
  Ge,
  Eq,
  Ne,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
  pub ty: Type,
  pub kind: ExprKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
  Const(Value),
  Load(VarRef),
  Swizzle(Box<Expr>, Swizzle),
  Construct(Type, Vec<Expr>),
  Call(usize, Vec<Expr>),
  Builtin(Builtin, Vec<Expr>),
  Neg(Box<Expr>),
  Not(Box<Expr>),
  Arith(ArithOp, Box<Expr>, Box<Expr>),
  Compare(CompareOp, Box<Expr>, Box<Expr>),
  And(Box<Expr>, Box<Expr>),
  Or(Box<Expr>, Box<Expr>),
  Xor(Box<Expr>, Box<Expr>),
  Select(Box<Expr>, Box<Expr>, Box<Expr>),
  /// Plain assignment when the operator is `None`.
  Assign(LValue, Option<ArithOp>, Box<Expr>),
  /// `++` / `--`; the value of the expression is the new one when `prefix`.
  Step {
    target: LValue,
    increment: bool,
    prefix: bool,
  },
}

#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
  Expr(Expr),
  Store(VarRef, Expr),
  Block(Vec<Stmt>),
  If(Expr, Box<Stmt>, Option<Box<Stmt>>),
  Loop {
    init: Option<Box<Stmt>>,
    cond: Option<Expr>,
    step: Option<Expr>,
    body: Box<Stmt>,
    /// `false` for `do`/`while`.
    test_first: bool,
  },
  Break,
  Continue,
  Return(Option<Expr>),
  Discard,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BuiltinVar {
  Position,
  PointSize,
  FragColor,
  FragCoord,
}

impl BuiltinVar {
  pub fn name(self) -> &'static str {
    match self {
      BuiltinVar::Position => "gl_Position",
      BuiltinVar::PointSize => "gl_PointSize",
      BuiltinVar::FragColor => "gl_FragColor",
      BuiltinVar::FragCoord => "gl_FragCoord",
    }
  }

  pub fn ty(self) -> Type {
    match self {
      BuiltinVar::PointSize => Type::Float,
      _ => Type::Vec4,
    }
  }

  pub fn of_stage(stage: StageType) -> &'static [BuiltinVar] {
    match stage {
      StageType::VertexShader => &[BuiltinVar::Position, BuiltinVar::PointSize],
      StageType::FragmentShader => &[BuiltinVar::FragColor, BuiltinVar::FragCoord],
    }
  }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GlobalKind {
  Plain,
  Const,
  Attribute,
  Varying,
  Uniform,
  Builtin(BuiltinVar),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Global {
  pub name: String,
  pub ty: Type,
  pub kind: GlobalKind,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Function {
  pub name: String,
  pub params: Vec<Type>,
  pub ret: Type,
  pub frame_size: usize,
  /// `None` while only a prototype has been seen.
  pub body: Option<Vec<Stmt>>,
}

/// A compiled shader stage.
#[derive(Clone, Debug, PartialEq)]
pub struct Shader {
  pub stage: StageType,
  pub globals: Vec<Global>,
  /// Whether each global is statically read or written anywhere in the code.
  pub used: Vec<bool>,
  /// Whether each global is statically written anywhere in the code.
  pub written: Vec<bool>,
  pub functions: Vec<Function>,
  /// Global initializers, run before `main`.
  pub init: Vec<Stmt>,
  pub main: usize,
}

impl Shader {
  /// Index of the global variable `name`.
  pub fn global(&self, name: &str) -> Option<usize> {
    self.globals.iter().position(|g| g.name == name)
  }

  /// Index of a built-in variable, if the stage has it.
  pub fn builtin(&self, var: BuiltinVar) -> Option<usize> {
    self
      .globals
      .iter()
      .position(|g| g.kind == GlobalKind::Builtin(var))
  }

  /// Globals of a given kind, in declaration order.
  pub fn globals_of(&self, kind: GlobalKind) -> impl Iterator<Item = (usize, &Global)> {
    self
      .globals
      .iter()
      .enumerate()
      .filter(move |(_, g)| g.kind == kind)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn swizzle_composition() {
    // v.zyx.xz == v.zx
    let zyx = Swizzle {
      indices: [2, 1, 0, 0],
      len: 3,
    };
    let xz = Swizzle {
      indices: [0, 2, 0, 0],
      len: 2,
    };

    let composed = Swizzle::compose(zyx, xz);
    assert_eq!(&composed.indices[..2], &[2, 0]);
    assert_eq!(composed.len, 2);
    assert!(!composed.has_repeats());
    assert!(Swizzle {
      indices: [0, 0, 0, 0],
      len: 2
    }
    .has_repeats());
  }
}
