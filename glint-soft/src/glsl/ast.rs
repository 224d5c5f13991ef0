//! Syntax tree produced by the parser, before any type checking.

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Precision {
  Low,
  Medium,
  High,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Storage {
  None,
  Const,
  Attribute,
  Varying,
  Uniform,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParamQualifier {
  In,
  Out,
  InOut,
}

/// A type name as written, resolved by the checker.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeName {
  pub name: String,
  pub line: u32,
}

/// Qualifiers and type of a declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct FullType {
  pub storage: Storage,
  pub precision: Option<Precision>,
  pub ty: TypeName,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Declarator {
  pub name: String,
  pub line: u32,
  pub init: Option<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Declaration {
  pub ty: FullType,
  pub vars: Vec<Declarator>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
  pub qualifier: ParamQualifier,
  pub precision: Option<Precision>,
  pub ty: TypeName,
  pub name: Option<String>,
  pub line: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Prototype {
  pub ret: FullType,
  pub name: String,
  pub params: Vec<Param>,
  pub line: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub enum External {
  Precision(Precision, TypeName),
  Declaration(Declaration),
  Prototype(Prototype),
  Function(Prototype, Vec<Stmt>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
  Precision(Precision, TypeName),
  Declaration(Declaration),
  Expr(Expr),
  Block(Vec<Stmt>),
  If(Expr, Box<Stmt>, Option<Box<Stmt>>),
  For {
    init: Option<Box<Stmt>>,
    cond: Option<Expr>,
    step: Option<Expr>,
    body: Box<Stmt>,
  },
  While(Expr, Box<Stmt>),
  DoWhile(Box<Stmt>, Expr),
  Break(u32),
  Continue(u32),
  Return(u32, Option<Expr>),
  Discard(u32),
  Empty,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UnaryOp {
  Plus,
  Minus,
  Not,
  PreInc,
  PreDec,
  PostInc,
  PostDec,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BinaryOp {
  Add,
  Sub,
  Mul,
  Div,
  Lt,
  Le,
  Gt,
  Ge,
  Eq,
  Ne,
  And,
  Or,
  Xor,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
  pub kind: ExprKind,
  pub line: u32,
  /// Token reported in diagnostics about this expression.
  pub token: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
  Int(i32),
  Float(f32),
  Bool(bool),
  Ident(String),
  /// Function call or constructor.
  Call(String, Vec<Expr>),
  Field(Box<Expr>, String),
  Unary(UnaryOp, Box<Expr>),
  Binary(BinaryOp, Box<Expr>, Box<Expr>),
  Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
  /// Plain assignment when the operator is `None`.
  Assign(Option<BinaryOp>, Box<Expr>, Box<Expr>),
}
