//! Semantic analysis: name resolution and type checking, producing the typed IR.
//!
//! Errors are collected per statement so that a single compilation reports as many of them as
//! possible.

use std::collections::HashMap;

use glint::shader::StageType;

use super::ast::{self, External, Precision, Storage};
use super::builtins;
use super::ir::{
  ArithOp, BuiltinVar, CompareOp, Expr, ExprKind, Function, Global, GlobalKind, LValue, Shader,
  Stmt, Swizzle, VarRef,
};
use super::types::{Type, Value};
use super::Diagnostic;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Access {
  ReadWrite,
  /// Read-only, with what the variable is for diagnostics.
  ReadOnly(&'static str),
}

#[derive(Clone, Copy, Debug)]
struct Symbol {
  var: VarRef,
  ty: Type,
  access: Access,
}

#[derive(Debug, Default)]
struct Scope {
  vars: HashMap<String, Symbol>,
  float_precision: bool,
}

#[derive(Debug)]
struct FunctionContext {
  ret: Type,
  frame_size: usize,
  loop_depth: usize,
}

struct Checker {
  stage: StageType,
  globals: Vec<Global>,
  used: Vec<bool>,
  written: Vec<bool>,
  functions: Vec<Function>,
  overloads: HashMap<String, Vec<usize>>,
  calls: Vec<(usize, u32)>,
  scopes: Vec<Scope>,
  current: Option<FunctionContext>,
  init: Vec<Stmt>,
  errors: Vec<Diagnostic>,
  last_line: u32,
}

/// Check a parsed translation unit.
pub fn check(stage: StageType, unit: &[External]) -> Result<Shader, Vec<Diagnostic>> {
  let mut checker = Checker::new(stage);

  for external in unit {
    if let Err(e) = checker.external(external) {
      checker.errors.push(e);
    }
  }

  checker.finish()
}

fn konst(value: Value) -> Expr {
  Expr {
    ty: value.ty(),
    kind: ExprKind::Const(value),
  }
}

fn resolve_type(name: &ast::TypeName) -> Result<Type, Diagnostic> {
  match name.name.as_str() {
    "void" => Ok(Type::Void),
    "bool" => Ok(Type::Bool),
    "int" => Ok(Type::Int),
    "float" => Ok(Type::Float),
    "vec2" => Ok(Type::Vec2),
    "vec3" => Ok(Type::Vec3),
    "vec4" => Ok(Type::Vec4),
    other => Err(Diagnostic::new(name.line, other, "type not supported")),
  }
}

fn storage_name(storage: Storage) -> &'static str {
  match storage {
    Storage::None => "",
    Storage::Const => "const",
    Storage::Attribute => "attribute",
    Storage::Varying => "varying",
    Storage::Uniform => "uniform",
  }
}

// Result type of `a op b` for the arithmetic operators.
fn arith_type(a: Type, b: Type) -> Option<Type> {
  match (a, b) {
    (Type::Int, Type::Int) => Some(Type::Int),
    (a, b) if a == b && a.is_float_based() => Some(a),
    (Type::Float, v) | (v, Type::Float) if v.is_vector() => Some(v),
    _ => None,
  }
}

fn arith_op(op: ast::BinaryOp) -> ArithOp {
  match op {
    ast::BinaryOp::Add => ArithOp::Add,
    ast::BinaryOp::Sub => ArithOp::Sub,
    ast::BinaryOp::Mul => ArithOp::Mul,
    _ => ArithOp::Div,
  }
}

fn wrong_operands(e: &ast::Expr, a: Type, b: Type) -> Diagnostic {
  Diagnostic::new(
    e.line,
    &e.token,
    format!(
      "wrong operand types - no operation '{}' exists that takes a left-hand operand of type '{}' \
       and a right operand of type '{}' (or there is no acceptable conversion)",
      e.token, a, b
    ),
  )
}

fn no_matching_function(line: u32, name: &str) -> Diagnostic {
  Diagnostic::new(line, name, "no matching overloaded function found")
}

impl Checker {
  fn new(stage: StageType) -> Self {
    let global_scope = Scope {
      vars: HashMap::new(),
      // vertex shaders have a default float precision
      float_precision: stage == StageType::VertexShader,
    };

    let mut checker = Checker {
      stage,
      globals: Vec::new(),
      used: Vec::new(),
      written: Vec::new(),
      functions: Vec::new(),
      overloads: HashMap::new(),
      calls: Vec::new(),
      scopes: vec![global_scope],
      current: None,
      init: Vec::new(),
      errors: Vec::new(),
      last_line: 1,
    };

    for &var in BuiltinVar::of_stage(stage) {
      let access = if var == BuiltinVar::FragCoord {
        Access::ReadOnly("a built-in input")
      } else {
        Access::ReadWrite
      };

      checker.declare_global(var.name(), var.ty(), GlobalKind::Builtin(var), access);
    }

    checker
  }

  fn finish(mut self) -> Result<Shader, Vec<Diagnostic>> {
    for &(index, line) in &self.calls {
      if self.functions[index].body.is_none() {
        let name = &self.functions[index].name;
        self.errors.push(Diagnostic::new(
          line,
          name,
          "function is declared but never defined",
        ));
      }
    }

    let main = self.overloads.get("main").and_then(|indices| {
      indices
        .iter()
        .copied()
        .find(|&i| self.functions[i].params.is_empty() && self.functions[i].body.is_some())
    });

    let main = match main {
      Some(main) => main,
      None => {
        self.errors.push(Diagnostic::new(
          self.last_line,
          "main",
          "missing entry point: void main() must be defined",
        ));
        0
      }
    };

    if !self.errors.is_empty() {
      return Err(self.errors);
    }

    Ok(Shader {
      stage: self.stage,
      globals: self.globals,
      used: self.used,
      written: self.written,
      functions: self.functions,
      init: self.init,
      main,
    })
  }

  fn declare_global(&mut self, name: &str, ty: Type, kind: GlobalKind, access: Access) -> usize {
    let index = self.globals.len();

    self.globals.push(Global {
      name: name.to_owned(),
      ty,
      kind,
    });
    self.used.push(false);
    self.written.push(false);

    self.scopes[0].vars.insert(
      name.to_owned(),
      Symbol {
        var: VarRef::Global(index),
        ty,
        access,
      },
    );

    index
  }

  fn declare_local(&mut self, name: &str, ty: Type, access: Access) -> usize {
    let slot = match self.current {
      Some(ref mut f) => {
        f.frame_size += 1;
        f.frame_size - 1
      }
      None => 0,
    };

    if let Some(scope) = self.scopes.last_mut() {
      scope.vars.insert(
        name.to_owned(),
        Symbol {
          var: VarRef::Local(slot),
          ty,
          access,
        },
      );
    }

    slot
  }

  fn lookup(&self, name: &str) -> Option<Symbol> {
    self
      .scopes
      .iter()
      .rev()
      .find_map(|scope| scope.vars.get(name).copied())
  }

  fn mark(&mut self, var: VarRef, write: bool) {
    if let VarRef::Global(i) = var {
      self.used[i] = true;

      if write {
        self.written[i] = true;
      }
    }
  }

  fn check_new_name(&self, name: &str, line: u32) -> Result<(), Diagnostic> {
    if name.starts_with("gl_") {
      return Err(Diagnostic::new(
        line,
        name,
        "identifiers starting with \"gl_\" are reserved",
      ));
    }

    let redefined = self
      .scopes
      .last()
      .map_or(false, |scope| scope.vars.contains_key(name));

    if redefined {
      Err(Diagnostic::new(line, name, "redefinition"))
    } else {
      Ok(())
    }
  }

  fn require_precision(
    &self,
    ty: Type,
    explicit: Option<Precision>,
    line: u32,
  ) -> Result<(), Diagnostic> {
    let missing = self.stage == StageType::FragmentShader
      && ty.is_float_based()
      && explicit.is_none()
      && !self.scopes.iter().any(|s| s.float_precision);

    if missing {
      Err(Diagnostic::new(line, "", "No precision specified for (float)"))
    } else {
      Ok(())
    }
  }

  fn precision_statement(&mut self, ty: &ast::TypeName) -> Result<(), Diagnostic> {
    match ty.name.as_str() {
      "float" => {
        if let Some(scope) = self.scopes.last_mut() {
          scope.float_precision = true;
        }
        Ok(())
      }

      "int" | "sampler2D" | "samplerCube" => Ok(()),

      other => Err(Diagnostic::new(
        ty.line,
        other,
        "precision can only be set for float, int and sampler types",
      )),
    }
  }

  fn external(&mut self, external: &External) -> Result<(), Diagnostic> {
    match *external {
      External::Precision(_, ref ty) => {
        self.last_line = ty.line;
        self.precision_statement(ty)
      }

      External::Declaration(ref decl) => {
        self.last_line = decl.ty.ty.line;
        self.global_declaration(decl)
      }

      External::Prototype(ref proto) => {
        self.last_line = proto.line;
        self.declare_function(proto).map(|_| ())
      }

      External::Function(ref proto, ref body) => {
        self.last_line = proto.line;
        self.define_function(proto, body)
      }
    }
  }

  fn declared_type(&self, ty: &ast::FullType) -> Result<Type, Diagnostic> {
    let resolved = resolve_type(&ty.ty)?;

    if resolved == Type::Void {
      return Err(Diagnostic::new(
        ty.ty.line,
        "void",
        "illegal use of type 'void'",
      ));
    }

    self.require_precision(resolved, ty.precision, ty.ty.line)?;
    Ok(resolved)
  }

  fn global_declaration(&mut self, decl: &ast::Declaration) -> Result<(), Diagnostic> {
    let line = decl.ty.ty.line;
    let storage = decl.ty.storage;

    if storage == Storage::Attribute && self.stage != StageType::VertexShader {
      return Err(Diagnostic::new(
        line,
        "attribute",
        "supported in vertex shaders only",
      ));
    }

    let ty = self.declared_type(&decl.ty)?;

    if matches!(storage, Storage::Attribute | Storage::Varying) && !ty.is_float_based() {
      return Err(Diagnostic::new(
        line,
        storage_name(storage),
        "cannot be bool or int",
      ));
    }

    for var in &decl.vars {
      if let Err(e) = self.global_variable(storage, ty, var) {
        self.errors.push(e);
      }
    }

    Ok(())
  }

  fn global_variable(
    &mut self,
    storage: Storage,
    ty: Type,
    var: &ast::Declarator,
  ) -> Result<(), Diagnostic> {
    self.check_new_name(&var.name, var.line)?;

    let (kind, access) = match storage {
      Storage::None => (GlobalKind::Plain, Access::ReadWrite),
      Storage::Const => (GlobalKind::Const, Access::ReadOnly("a const variable")),
      Storage::Attribute => (GlobalKind::Attribute, Access::ReadOnly("an attribute")),
      Storage::Uniform => (GlobalKind::Uniform, Access::ReadOnly("a uniform")),
      Storage::Varying if self.stage == StageType::FragmentShader => (
        GlobalKind::Varying,
        Access::ReadOnly("a varying in a fragment shader"),
      ),
      Storage::Varying => (GlobalKind::Varying, Access::ReadWrite),
    };

    match (&var.init, storage) {
      (Some(_), Storage::Attribute | Storage::Varying | Storage::Uniform) => {
        return Err(Diagnostic::new(
          var.line,
          &var.name,
          "cannot initialize this type of qualifier",
        ));
      }

      (None, Storage::Const) => {
        return Err(Diagnostic::new(
          var.line,
          &var.name,
          "variables with qualifier 'const' must be initialized",
        ));
      }

      _ => (),
    }

    let init = match var.init {
      Some(ref e) => Some(self.initializer(e, ty)),
      None => None,
    };

    let index = self.declare_global(&var.name, ty, kind, access);

    if let Some(init) = init {
      self
        .init
        .push(Stmt::Store(VarRef::Global(index), init?));
    }

    Ok(())
  }

  fn initializer(&mut self, e: &ast::Expr, ty: Type) -> Result<Expr, Diagnostic> {
    let value = self.expr(e)?;

    if value.ty != ty {
      return Err(Diagnostic::new(
        e.line,
        "=",
        format!("cannot convert from '{}' to '{}'", value.ty, ty),
      ));
    }

    Ok(value)
  }

  fn signature(&self, proto: &ast::Prototype) -> Result<(Type, Vec<Type>), Diagnostic> {
    if proto.ret.storage != Storage::None {
      return Err(Diagnostic::new(
        proto.line,
        storage_name(proto.ret.storage),
        "no qualifiers allowed for function return",
      ));
    }

    let ret = resolve_type(&proto.ret.ty)?;
    self.require_precision(ret, proto.ret.precision, proto.line)?;

    let mut params = Vec::with_capacity(proto.params.len());

    for p in &proto.params {
      let ty = resolve_type(&p.ty)?;

      if ty == Type::Void {
        return Err(Diagnostic::new(p.line, "void", "illegal use of type 'void'"));
      }

      match p.qualifier {
        ast::ParamQualifier::In => (),
        ast::ParamQualifier::Out => {
          return Err(Diagnostic::new(p.line, "out", "only 'in' parameters are supported"));
        }
        ast::ParamQualifier::InOut => {
          return Err(Diagnostic::new(p.line, "inout", "only 'in' parameters are supported"));
        }
      }

      self.require_precision(ty, p.precision, p.line)?;
      params.push(ty);
    }

    Ok((ret, params))
  }

  fn find_overload(&self, name: &str, params: &[Type]) -> Option<usize> {
    self.overloads.get(name).and_then(|indices| {
      indices
        .iter()
        .copied()
        .find(|&i| self.functions[i].params == params)
    })
  }

  fn declare_function(&mut self, proto: &ast::Prototype) -> Result<usize, Diagnostic> {
    if builtins::is_builtin(&proto.name) {
      return Err(Diagnostic::new(
        proto.line,
        &proto.name,
        "cannot redefine a built-in function",
      ));
    }

    if proto.name.starts_with("gl_") {
      return Err(Diagnostic::new(
        proto.line,
        &proto.name,
        "identifiers starting with \"gl_\" are reserved",
      ));
    }

    let (ret, params) = self.signature(proto)?;

    if let Some(index) = self.find_overload(&proto.name, &params) {
      if self.functions[index].ret != ret {
        return Err(Diagnostic::new(
          proto.line,
          &proto.name,
          "overloaded functions must have the same return type",
        ));
      }

      return Ok(index);
    }

    if proto.name == "main" && (ret != Type::Void || !params.is_empty()) {
      return Err(Diagnostic::new(
        proto.line,
        "main",
        "main function must return void and take no parameters",
      ));
    }

    let index = self.functions.len();
    self.functions.push(Function {
      name: proto.name.clone(),
      params,
      ret,
      frame_size: 0,
      body: None,
    });
    self
      .overloads
      .entry(proto.name.clone())
      .or_default()
      .push(index);

    Ok(index)
  }

  fn define_function(
    &mut self,
    proto: &ast::Prototype,
    body: &[ast::Stmt],
  ) -> Result<(), Diagnostic> {
    let index = self.declare_function(proto)?;

    if self.functions[index].body.is_some() {
      return Err(Diagnostic::new(
        proto.line,
        &proto.name,
        "function already has a body",
      ));
    }

    let params = self.functions[index].params.clone();
    let ret = self.functions[index].ret;

    self.scopes.push(Scope::default());
    self.current = Some(FunctionContext {
      ret,
      frame_size: 0,
      loop_depth: 0,
    });

    for (p, ty) in proto.params.iter().zip(params) {
      match p.name {
        Some(ref name) => {
          if let Err(e) = self.check_new_name(name, p.line) {
            self.errors.push(e);
          }

          self.declare_local(name, ty, Access::ReadWrite);
        }

        // unnamed parameters still take a slot
        None => {
          self.declare_local("", ty, Access::ReadWrite);
        }
      }
    }

    let stmts = self.statements(body);
    let frame_size = self.current.take().map_or(0, |f| f.frame_size);
    self.scopes.pop();

    let function = &mut self.functions[index];
    function.body = Some(stmts);
    function.frame_size = frame_size;

    Ok(())
  }

  fn statements(&mut self, stmts: &[ast::Stmt]) -> Vec<Stmt> {
    let mut out = Vec::with_capacity(stmts.len());

    for s in stmts {
      match self.stmt(s) {
        Ok(s) => out.push(s),
        Err(e) => self.errors.push(e),
      }
    }

    out
  }

  fn scoped_stmt(&mut self, s: &ast::Stmt) -> Result<Stmt, Diagnostic> {
    self.scopes.push(Scope::default());
    let r = self.stmt(s);
    self.scopes.pop();
    r
  }

  fn loop_body(&mut self, s: &ast::Stmt) -> Result<Stmt, Diagnostic> {
    if let Some(ref mut f) = self.current {
      f.loop_depth += 1;
    }

    let r = self.scoped_stmt(s);

    if let Some(ref mut f) = self.current {
      f.loop_depth -= 1;
    }

    r
  }

  fn in_loop(&self) -> bool {
    self.current.as_ref().map_or(false, |f| f.loop_depth > 0)
  }

  fn condition(&mut self, e: &ast::Expr) -> Result<Expr, Diagnostic> {
    let cond = self.expr(e)?;

    if cond.ty != Type::Bool {
      return Err(Diagnostic::new(
        e.line,
        &e.token,
        "boolean expression expected",
      ));
    }

    Ok(cond)
  }

  fn stmt(&mut self, s: &ast::Stmt) -> Result<Stmt, Diagnostic> {
    match *s {
      ast::Stmt::Precision(_, ref ty) => {
        self.precision_statement(ty)?;
        Ok(Stmt::Block(Vec::new()))
      }

      ast::Stmt::Declaration(ref decl) => self.local_declaration(decl),

      ast::Stmt::Expr(ref e) => Ok(Stmt::Expr(self.expr(e)?)),

      ast::Stmt::Block(ref stmts) => {
        self.scopes.push(Scope::default());
        let block = self.statements(stmts);
        self.scopes.pop();

        Ok(Stmt::Block(block))
      }

      ast::Stmt::If(ref cond, ref then, ref otherwise) => {
        let cond = self.condition(cond)?;
        let then = self.scoped_stmt(then)?;
        let otherwise = match otherwise {
          Some(s) => Some(Box::new(self.scoped_stmt(s)?)),
          None => None,
        };

        Ok(Stmt::If(cond, Box::new(then), otherwise))
      }

      ast::Stmt::For {
        ref init,
        ref cond,
        ref step,
        ref body,
      } => {
        self.scopes.push(Scope::default());
        let r = self.for_loop(init.as_deref(), cond.as_ref(), step.as_ref(), body);
        self.scopes.pop();
        r
      }

      ast::Stmt::While(ref cond, ref body) => {
        let cond = self.condition(cond)?;
        let body = self.loop_body(body)?;

        Ok(Stmt::Loop {
          init: None,
          cond: Some(cond),
          step: None,
          body: Box::new(body),
          test_first: true,
        })
      }

      ast::Stmt::DoWhile(ref body, ref cond) => {
        let body = self.loop_body(body)?;
        let cond = self.condition(cond)?;

        Ok(Stmt::Loop {
          init: None,
          cond: Some(cond),
          step: None,
          body: Box::new(body),
          test_first: false,
        })
      }

      ast::Stmt::Break(line) => {
        if self.in_loop() {
          Ok(Stmt::Break)
        } else {
          Err(Diagnostic::new(
            line,
            "break",
            "break statement only allowed in loops",
          ))
        }
      }

      ast::Stmt::Continue(line) => {
        if self.in_loop() {
          Ok(Stmt::Continue)
        } else {
          Err(Diagnostic::new(
            line,
            "continue",
            "continue statement only allowed in loops",
          ))
        }
      }

      ast::Stmt::Return(line, ref value) => {
        let ret = self.current.as_ref().map_or(Type::Void, |f| f.ret);

        match (value, ret) {
          (None, Type::Void) => Ok(Stmt::Return(None)),

          (None, _) => Err(Diagnostic::new(
            line,
            "return",
            "non-void function must return a value",
          )),

          (Some(_), Type::Void) => Err(Diagnostic::new(
            line,
            "return",
            "void function cannot return a value",
          )),

          (Some(e), ret) => {
            let value = self.expr(e)?;

            if value.ty != ret {
              return Err(Diagnostic::new(
                line,
                "return",
                format!(
                  "function return is not matching type: '{}' returned, '{}' expected",
                  value.ty, ret
                ),
              ));
            }

            Ok(Stmt::Return(Some(value)))
          }
        }
      }

      ast::Stmt::Discard(line) => {
        if self.stage == StageType::VertexShader {
          Err(Diagnostic::new(
            line,
            "discard",
            "not supported in vertex shaders",
          ))
        } else {
          Ok(Stmt::Discard)
        }
      }

      ast::Stmt::Empty => Ok(Stmt::Block(Vec::new())),
    }
  }

  fn for_loop(
    &mut self,
    init: Option<&ast::Stmt>,
    cond: Option<&ast::Expr>,
    step: Option<&ast::Expr>,
    body: &ast::Stmt,
  ) -> Result<Stmt, Diagnostic> {
    let init = match init {
      Some(s) => Some(Box::new(self.stmt(s)?)),
      None => None,
    };

    let cond = match cond {
      Some(e) => Some(self.condition(e)?),
      None => None,
    };

    let step = match step {
      Some(e) => Some(self.expr(e)?),
      None => None,
    };

    let body = self.loop_body(body)?;

    Ok(Stmt::Loop {
      init,
      cond,
      step,
      body: Box::new(body),
      test_first: true,
    })
  }

  fn local_declaration(&mut self, decl: &ast::Declaration) -> Result<Stmt, Diagnostic> {
    let storage = decl.ty.storage;

    if storage != Storage::None && storage != Storage::Const {
      return Err(Diagnostic::new(
        decl.ty.ty.line,
        storage_name(storage),
        "only allowed at global scope",
      ));
    }

    let ty = self.declared_type(&decl.ty)?;
    let mut stores = Vec::with_capacity(decl.vars.len());

    for var in &decl.vars {
      match self.local_variable(storage, ty, var) {
        Ok(s) => stores.push(s),
        Err(e) => self.errors.push(e),
      }
    }

    Ok(Stmt::Block(stores))
  }

  fn local_variable(
    &mut self,
    storage: Storage,
    ty: Type,
    var: &ast::Declarator,
  ) -> Result<Stmt, Diagnostic> {
    self.check_new_name(&var.name, var.line)?;

    let access = if storage == Storage::Const {
      Access::ReadOnly("a const variable")
    } else {
      Access::ReadWrite
    };

    let init = match var.init {
      Some(ref e) => self.initializer(e, ty),
      None if storage == Storage::Const => Err(Diagnostic::new(
        var.line,
        &var.name,
        "variables with qualifier 'const' must be initialized",
      )),
      None => Ok(konst(Value::zero(ty))),
    };

    // declared even when the initializer is wrong, to avoid cascading errors
    let slot = self.declare_local(&var.name, ty, access);

    Ok(Stmt::Store(VarRef::Local(slot), init?))
  }

  fn expr(&mut self, e: &ast::Expr) -> Result<Expr, Diagnostic> {
    match e.kind {
      ast::ExprKind::Int(i) => Ok(konst(Value::Int(i))),
      ast::ExprKind::Float(x) => Ok(konst(Value::Float(x))),
      ast::ExprKind::Bool(b) => Ok(konst(Value::Bool(b))),

      ast::ExprKind::Ident(ref name) => {
        let sym = self
          .lookup(name)
          .ok_or_else(|| Diagnostic::new(e.line, name, "undeclared identifier"))?;
        self.mark(sym.var, false);

        Ok(Expr {
          ty: sym.ty,
          kind: ExprKind::Load(sym.var),
        })
      }

      ast::ExprKind::Call(ref name, ref args) => self.call(e, name, args),

      ast::ExprKind::Field(ref base, ref field) => {
        let base = self.expr(base)?;
        let swizzle = swizzle(base.ty, field, e.line)?;
        let ty = Type::float_vector(swizzle.len as usize).unwrap_or(Type::Float);

        Ok(Expr {
          ty,
          kind: ExprKind::Swizzle(Box::new(base), swizzle),
        })
      }

      ast::ExprKind::Unary(op, ref operand) => self.unary(e, op, operand),

      ast::ExprKind::Binary(op, ref a, ref b) => self.binary(e, op, a, b),

      ast::ExprKind::Ternary(ref cond, ref a, ref b) => {
        let cond = self.condition(cond)?;
        let a = self.expr(a)?;
        let b = self.expr(b)?;

        if a.ty != b.ty {
          return Err(Diagnostic::new(
            e.line,
            "?",
            format!(
              "wrong operand types - no operation '?:' exists that takes a second operand of type \
               '{}' and a third operand of type '{}'",
              a.ty, b.ty
            ),
          ));
        }

        Ok(Expr {
          ty: a.ty,
          kind: ExprKind::Select(Box::new(cond), Box::new(a), Box::new(b)),
        })
      }

      ast::ExprKind::Assign(op, ref lhs, ref rhs) => self.assignment(e, op, lhs, rhs),
    }
  }

  fn call(&mut self, e: &ast::Expr, name: &str, args: &[ast::Expr]) -> Result<Expr, Diagnostic> {
    let args = args
      .iter()
      .map(|a| self.expr(a))
      .collect::<Result<Vec<_>, _>>()?;

    match name {
      "bool" | "int" | "float" | "vec2" | "vec3" | "vec4" => return constructor(e, name, args),

      "void" | "ivec2" | "ivec3" | "ivec4" | "bvec2" | "bvec3" | "bvec4" | "mat2" | "mat3"
      | "mat4" | "sampler2D" | "samplerCube" => {
        return Err(Diagnostic::new(e.line, name, "type not supported"));
      }

      _ => (),
    }

    let types = args.iter().map(|a| a.ty).collect::<Vec<_>>();

    if let Some(resolved) = builtins::resolve(name, &types) {
      let (builtin, ty) = resolved.ok_or_else(|| no_matching_function(e.line, name))?;

      return Ok(Expr {
        ty,
        kind: ExprKind::Builtin(builtin, args),
      });
    }

    let index = self
      .find_overload(name, &types)
      .ok_or_else(|| no_matching_function(e.line, name))?;
    self.calls.push((index, e.line));

    Ok(Expr {
      ty: self.functions[index].ret,
      kind: ExprKind::Call(index, args),
    })
  }

  fn unary(
    &mut self,
    e: &ast::Expr,
    op: ast::UnaryOp,
    operand: &ast::Expr,
  ) -> Result<Expr, Diagnostic> {
    let wrong_operand = |ty: Type| {
      Diagnostic::new(
        e.line,
        &e.token,
        format!(
          "wrong operand type - no operation '{}' exists that takes an operand of type '{}' \
           (or there is no acceptable conversion)",
          e.token, ty
        ),
      )
    };

    match op {
      ast::UnaryOp::Plus | ast::UnaryOp::Minus => {
        let value = self.expr(operand)?;

        if !value.ty.is_numeric() {
          return Err(wrong_operand(value.ty));
        }

        if op == ast::UnaryOp::Plus {
          Ok(value)
        } else {
          Ok(Expr {
            ty: value.ty,
            kind: ExprKind::Neg(Box::new(value)),
          })
        }
      }

      ast::UnaryOp::Not => {
        let value = self.expr(operand)?;

        if value.ty != Type::Bool {
          return Err(wrong_operand(value.ty));
        }

        Ok(Expr {
          ty: Type::Bool,
          kind: ExprKind::Not(Box::new(value)),
        })
      }

      ast::UnaryOp::PreInc
      | ast::UnaryOp::PreDec
      | ast::UnaryOp::PostInc
      | ast::UnaryOp::PostDec => {
        let (target, ty) = self.lvalue(operand)?;

        if !ty.is_numeric() {
          return Err(wrong_operand(ty));
        }

        Ok(Expr {
          ty,
          kind: ExprKind::Step {
            target,
            increment: matches!(op, ast::UnaryOp::PreInc | ast::UnaryOp::PostInc),
            prefix: matches!(op, ast::UnaryOp::PreInc | ast::UnaryOp::PreDec),
          },
        })
      }
    }
  }

  fn binary(
    &mut self,
    e: &ast::Expr,
    op: ast::BinaryOp,
    a: &ast::Expr,
    b: &ast::Expr,
  ) -> Result<Expr, Diagnostic> {
    use ast::BinaryOp::*;

    let a = self.expr(a)?;
    let b = self.expr(b)?;

    let (ty, kind) = match op {
      Add | Sub | Mul | Div => {
        let ty = arith_type(a.ty, b.ty).ok_or_else(|| wrong_operands(e, a.ty, b.ty))?;
        (ty, ExprKind::Arith(arith_op(op), Box::new(a), Box::new(b)))
      }

      Lt | Le | Gt | Ge => {
        if a.ty != b.ty || !(a.ty == Type::Int || a.ty == Type::Float) {
          return Err(wrong_operands(e, a.ty, b.ty));
        }

        let op = match op {
          Lt => CompareOp::Lt,
          Le => CompareOp::Le,
          Gt => CompareOp::Gt,
          _ => CompareOp::Ge,
        };

        (
          Type::Bool,
          ExprKind::Compare(op, Box::new(a), Box::new(b)),
        )
      }

      Eq | Ne => {
        if a.ty != b.ty || a.ty == Type::Void {
          return Err(wrong_operands(e, a.ty, b.ty));
        }

        let op = if op == Eq { CompareOp::Eq } else { CompareOp::Ne };
        (
          Type::Bool,
          ExprKind::Compare(op, Box::new(a), Box::new(b)),
        )
      }

      And | Or | Xor => {
        if a.ty != Type::Bool || b.ty != Type::Bool {
          return Err(wrong_operands(e, a.ty, b.ty));
        }

        let (a, b) = (Box::new(a), Box::new(b));
        let kind = match op {
          And => ExprKind::And(a, b),
          Or => ExprKind::Or(a, b),
          _ => ExprKind::Xor(a, b),
        };

        (Type::Bool, kind)
      }
    };

    Ok(Expr { ty, kind })
  }

  fn assignment(
    &mut self,
    e: &ast::Expr,
    op: Option<ast::BinaryOp>,
    lhs: &ast::Expr,
    rhs: &ast::Expr,
  ) -> Result<Expr, Diagnostic> {
    let (target, ty) = self.lvalue(lhs)?;
    let value = self.expr(rhs)?;

    match op {
      None if value.ty != ty => {
        return Err(Diagnostic::new(
          e.line,
          "=",
          format!("cannot convert from '{}' to '{}'", value.ty, ty),
        ));
      }

      Some(_) if arith_type(ty, value.ty) != Some(ty) => {
        return Err(wrong_operands(e, ty, value.ty));
      }

      _ => (),
    }

    Ok(Expr {
      ty,
      kind: ExprKind::Assign(target, op.map(arith_op), Box::new(value)),
    })
  }

  fn lvalue(&mut self, e: &ast::Expr) -> Result<(LValue, Type), Diagnostic> {
    match e.kind {
      ast::ExprKind::Ident(ref name) => {
        let sym = self
          .lookup(name)
          .ok_or_else(|| Diagnostic::new(e.line, name, "undeclared identifier"))?;

        if let Access::ReadOnly(what) = sym.access {
          return Err(Diagnostic::new(
            e.line,
            name,
            format!("l-value required (can't modify {})", what),
          ));
        }

        self.mark(sym.var, true);

        Ok((
          LValue {
            var: sym.var,
            swizzle: None,
          },
          sym.ty,
        ))
      }

      ast::ExprKind::Field(ref base, ref field) => {
        let (target, base_ty) = self.lvalue(base)?;
        let s = swizzle(base_ty, field, e.line)?;

        if s.has_repeats() {
          return Err(Diagnostic::new(
            e.line,
            field,
            "l-value of swizzle cannot have duplicate components",
          ));
        }

        let composed = match target.swizzle {
          Some(base) => Swizzle::compose(base, s),
          None => s,
        };
        let ty = Type::float_vector(s.len as usize).unwrap_or(Type::Float);

        Ok((
          LValue {
            var: target.var,
            swizzle: Some(composed),
          },
          ty,
        ))
      }

      _ => Err(Diagnostic::new(e.line, &e.token, "l-value required")),
    }
  }
}

fn swizzle(ty: Type, field: &str, line: u32) -> Result<Swizzle, Diagnostic> {
  const SETS: [&str; 3] = ["xyzw", "rgba", "stpq"];

  if !ty.is_vector() {
    return Err(Diagnostic::new(
      line,
      field,
      "field selection requires a vector on the left hand side",
    ));
  }

  if field.is_empty() || field.len() > 4 {
    return Err(Diagnostic::new(line, field, "illegal vector field selection"));
  }

  let first = field.chars().next().unwrap_or('x');
  let set = SETS
    .iter()
    .find(|set| set.contains(first))
    .ok_or_else(|| Diagnostic::new(line, field, "illegal vector field selection"))?;

  let mut indices = [0; 4];

  for (i, c) in field.chars().enumerate() {
    let index = set
      .find(c)
      .ok_or_else(|| Diagnostic::new(line, field, "illegal vector field selection"))?;

    if index >= ty.components() {
      return Err(Diagnostic::new(
        line,
        field,
        "vector field selection out of range",
      ));
    }

    indices[i] = index as u8;
  }

  Ok(Swizzle {
    indices,
    len: field.len() as u8,
  })
}

fn constructor(e: &ast::Expr, name: &str, args: Vec<Expr>) -> Result<Expr, Diagnostic> {
  let target = resolve_type(&ast::TypeName {
    name: name.to_owned(),
    line: e.line,
  })?;

  if args.is_empty() {
    return Err(Diagnostic::new(
      e.line,
      name,
      "constructor does not have any arguments",
    ));
  }

  if args.iter().any(|a| a.ty == Type::Void) {
    return Err(Diagnostic::new(e.line, name, "cannot construct from 'void'"));
  }

  if target.is_scalar() {
    if args.len() > 1 {
      return Err(Diagnostic::new(e.line, name, "too many arguments"));
    }
  } else if !(args.len() == 1 && args[0].ty.is_scalar()) {
    let mut remaining = target.components();

    for a in &args {
      if remaining == 0 {
        return Err(Diagnostic::new(e.line, name, "too many arguments"));
      }

      remaining = remaining.saturating_sub(a.ty.components());
    }

    if remaining > 0 {
      return Err(Diagnostic::new(
        e.line,
        name,
        "not enough data provided for construction",
      ));
    }
  }

  Ok(Expr {
    ty: target,
    kind: ExprKind::Construct(target, args),
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::glsl::{lexer, parser};

  fn check_src(stage: StageType, src: &str) -> Result<Shader, Vec<Diagnostic>> {
    let unit = parser::parse(lexer::tokenize(src).unwrap()).unwrap();
    check(stage, &unit)
  }

  fn vertex(src: &str) -> Result<Shader, Vec<Diagnostic>> {
    check_src(StageType::VertexShader, src)
  }

  fn fragment(src: &str) -> Result<Shader, Vec<Diagnostic>> {
    check_src(StageType::FragmentShader, src)
  }

  fn first_error(r: Result<Shader, Vec<Diagnostic>>) -> Diagnostic {
    r.unwrap_err().remove(0)
  }

  #[test]
  fn static_use_tracking() {
    let shader = vertex(
      "attribute vec4 a_position;\nattribute vec4 a_unused;\nvarying vec2 v_uv;\n\
       void main() { v_uv = a_position.xy; gl_Position = a_position; }",
    )
    .unwrap();

    let pos = shader.global("a_position").unwrap();
    let unused = shader.global("a_unused").unwrap();
    let uv = shader.global("v_uv").unwrap();
    let gl_position = shader.builtin(BuiltinVar::Position).unwrap();

    assert!(shader.used[pos]);
    assert!(!shader.used[unused]);
    assert!(shader.written[uv]);
    assert!(shader.written[gl_position]);
    assert!(!shader.written[pos]);
  }

  #[test]
  fn fragment_float_precision_is_required() {
    let e = first_error(fragment("void main() { float x = 1.0; gl_FragColor = vec4(x); }"));
    assert_eq!(e.message, "No precision specified for (float)");
    assert_eq!(e.token, "");

    assert!(fragment("void main() { mediump float x = 1.0; gl_FragColor = vec4(x); }").is_ok());
    assert!(fragment("void main() { gl_FragColor = vec4(1, 0, 0, 1); }").is_ok());
    assert!(vertex("void main() { float x = 1.0; gl_Position = vec4(x); }").is_ok());
  }

  #[test]
  fn no_implicit_int_to_float() {
    let e = first_error(vertex("void main() { float x = 1; gl_Position = vec4(x); }"));
    assert_eq!(e.token, "=");
    assert_eq!(e.message, "cannot convert from 'int' to 'float'");

    let e = first_error(vertex("void main() { gl_Position = vec4(1.0) * 2; }"));
    assert_eq!(e.token, "*");

    // constructors convert
    assert!(vertex("void main() { gl_Position = vec4(1, 0, 0, 1) * float(2); }").is_ok());
  }

  #[test]
  fn read_only_variables() {
    let e = first_error(vertex(
      "attribute vec4 a; void main() { a = vec4(0.0); gl_Position = a; }",
    ));
    assert_eq!(e.token, "a");
    assert!(e.message.starts_with("l-value required"));

    let e = first_error(fragment(
      "precision mediump float; varying vec4 v; void main() { v.x = 1.0; gl_FragColor = v; }",
    ));
    assert_eq!(e.token, "v");

    let e = first_error(vertex("void main() { gl_Position.xx = vec2(0.0); }"));
    assert_eq!(e.token, "xx");
  }

  #[test]
  fn swizzles() {
    assert!(vertex("void main() { vec4 p = vec4(1.0); p.zx = p.xy; gl_Position = p.wzyx; }").is_ok());

    let e = first_error(vertex("void main() { vec2 p = vec2(1.0); gl_Position = vec4(p.xyz, 1.0); }"));
    assert_eq!(e.token, "xyz");

    let e = first_error(vertex("void main() { vec4 p = vec4(1.0); gl_Position = p.xg.xxxy; }"));
    assert_eq!(e.token, "xg");
  }

  #[test]
  fn functions_and_overloads() {
    let shader = vertex(
      "float twice(float x) { return x * 2.0; }\n\
       vec2 twice(vec2 x) { return x * 2.0; }\n\
       void main() { gl_Position = vec4(twice(vec2(0.25)), twice(0.5), 1.0); }",
    )
    .unwrap();

    assert_eq!(shader.functions.len(), 3);
    assert_eq!(shader.functions[shader.main].name, "main");

    let e = first_error(vertex("void main() { gl_Position = vec4(twice(1.0)); }"));
    assert_eq!(e.token, "twice");
    assert_eq!(e.message, "no matching overloaded function found");

    let e = first_error(vertex("float f(float x);\nvoid main() { gl_Position = vec4(f(1.0)); }"));
    assert_eq!(e.message, "function is declared but never defined");
  }

  #[test]
  fn missing_main() {
    let e = first_error(vertex("float f() { return 1.0; }"));
    assert_eq!(e.token, "main");
  }

  #[test]
  fn errors_are_collected() {
    let errors = vertex(
      "void main() {\n  float a = b;\n  int c = 1.0;\n  gl_Position = vec4(a);\n}",
    )
    .unwrap_err();

    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0].line, 2);
    assert_eq!(errors[0].token, "b");
    assert_eq!(errors[1].line, 3);
  }

  #[test]
  fn unsupported_types_and_qualifiers() {
    assert_eq!(first_error(vertex("uniform mat4 m; void main() {}")).token, "mat4");
    assert_eq!(
      first_error(fragment("attribute float a; void main() {}")).token,
      "attribute"
    );
    assert_eq!(first_error(vertex("varying int v; void main() {}")).token, "varying");
    assert_eq!(
      first_error(vertex("void main() { break; }")).token,
      "break"
    );
    assert_eq!(
      first_error(vertex("void main() { discard; }")).token,
      "discard"
    );
    assert_eq!(
      first_error(vertex("void main() { const float k; }")).token,
      "k"
    );
  }

  #[test]
  fn constructors() {
    assert!(vertex("void main() { gl_Position = vec4(vec2(0.0), 0.0, 1.0); }").is_ok());
    assert!(vertex("void main() { gl_Position = vec4(vec3(0.0).xy, vec4(1.0)); }").is_ok());
    assert!(vertex("void main() { gl_Position = vec4(vec4(1.0), 1.0); }").is_err());
    assert!(vertex("void main() { gl_Position = vec4(vec2(0.0), 1.0); }").is_err());
    assert!(vertex("void main() { gl_Position = vec4(vec2(1.0).xyy, true); }").is_ok());
  }
}
