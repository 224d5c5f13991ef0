//! Tree-walking interpreter over the typed IR.

use std::fmt;

use super::builtins;
use super::ir::{ArithOp, CompareOp, Expr, ExprKind, LValue, Shader, Stmt, Swizzle, VarRef};
use super::types::Value;

/// Maximum number of iterations a single loop can run.
pub const MAX_LOOP_ITERATIONS: usize = 65_536;

/// Maximum depth of nested function calls.
pub const MAX_CALL_DEPTH: usize = 64;

/// Runtime failures.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ExecError {
  LoopLimit,
  CallDepth,
  UndefinedFunction(String),
}

impl fmt::Display for ExecError {
  fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
    match *self {
      ExecError::LoopLimit => write!(f, "loop exceeded {} iterations", MAX_LOOP_ITERATIONS),
      ExecError::CallDepth => write!(f, "function calls nested deeper than {}", MAX_CALL_DEPTH),
      ExecError::UndefinedFunction(ref name) => write!(f, "call to undefined function {}", name),
    }
  }
}

// Why an invocation stopped early.
enum Halt {
  Discard,
  Fault(ExecError),
}

impl From<ExecError> for Halt {
  fn from(e: ExecError) -> Self {
    Halt::Fault(e)
  }
}

enum Flow {
  Next,
  Break,
  Continue,
  Return(Value),
}

/// One execution of a shader.
///
/// Inputs are written into [`Invocation::globals`] before [`Invocation::run`]; outputs are read
/// from there afterwards.
pub struct Invocation<'a> {
  shader: &'a Shader,
  pub globals: Vec<Value>,
  depth: usize,
}

impl<'a> Invocation<'a> {
  /// New invocation with every global set to zero.
  pub fn new(shader: &'a Shader) -> Self {
    let globals = shader.globals.iter().map(|g| Value::zero(g.ty)).collect();

    Invocation {
      shader,
      globals,
      depth: 0,
    }
  }

  /// Run global initializers then `main`.
  ///
  /// Returns `Ok(false)` if the invocation executed `discard`.
  pub fn run(&mut self) -> Result<bool, ExecError> {
    let shader = self.shader;
    let mut frame = Vec::new();

    let r = self
      .block(&shader.init, &mut frame)
      .and_then(|_| self.call(shader.main, Vec::new()));

    match r {
      Ok(_) => Ok(true),
      Err(Halt::Discard) => Ok(false),
      Err(Halt::Fault(e)) => Err(e),
    }
  }

  fn call(&mut self, index: usize, args: Vec<Value>) -> Result<Value, Halt> {
    let shader = self.shader;
    let function = &shader.functions[index];

    let body = function
      .body
      .as_ref()
      .ok_or_else(|| ExecError::UndefinedFunction(function.name.clone()))?;

    if self.depth >= MAX_CALL_DEPTH {
      return Err(ExecError::CallDepth.into());
    }

    let mut frame = args;
    frame.resize(function.frame_size.max(frame.len()), Value::Void);

    self.depth += 1;
    let flow = self.block(body, &mut frame);
    self.depth -= 1;

    match flow? {
      Flow::Return(v) => Ok(v),
      _ => Ok(Value::zero(function.ret)),
    }
  }

  fn block(&mut self, stmts: &[Stmt], frame: &mut Vec<Value>) -> Result<Flow, Halt> {
    for s in stmts {
      match self.stmt(s, frame)? {
        Flow::Next => (),
        flow => return Ok(flow),
      }
    }

    Ok(Flow::Next)
  }

  fn stmt(&mut self, s: &Stmt, frame: &mut Vec<Value>) -> Result<Flow, Halt> {
    match *s {
      Stmt::Expr(ref e) => {
        self.eval(e, frame)?;
        Ok(Flow::Next)
      }

      Stmt::Store(var, ref e) => {
        let v = self.eval(e, frame)?;
        self.store_var(var, v, frame);
        Ok(Flow::Next)
      }

      Stmt::Block(ref stmts) => self.block(stmts, frame),

      Stmt::If(ref cond, ref then, ref otherwise) => {
        if self.eval(cond, frame)?.as_bool() {
          self.stmt(then, frame)
        } else if let Some(otherwise) = otherwise {
          self.stmt(otherwise, frame)
        } else {
          Ok(Flow::Next)
        }
      }

      Stmt::Loop {
        ref init,
        ref cond,
        ref step,
        ref body,
        test_first,
      } => {
        if let Some(init) = init {
          self.stmt(init, frame)?;
        }

        let mut iterations = 0;

        loop {
          if test_first || iterations > 0 {
            if let Some(cond) = cond {
              if !self.eval(cond, frame)?.as_bool() {
                break;
              }
            }
          }

          iterations += 1;
          if iterations > MAX_LOOP_ITERATIONS {
            return Err(ExecError::LoopLimit.into());
          }

          match self.stmt(body, frame)? {
            Flow::Break => break,
            Flow::Return(v) => return Ok(Flow::Return(v)),
            Flow::Next | Flow::Continue => (),
          }

          if let Some(step) = step {
            self.eval(step, frame)?;
          }
        }

        Ok(Flow::Next)
      }

      Stmt::Break => Ok(Flow::Break),
      Stmt::Continue => Ok(Flow::Continue),

      Stmt::Return(ref value) => {
        let v = match value {
          Some(e) => self.eval(e, frame)?,
          None => Value::Void,
        };

        Ok(Flow::Return(v))
      }

      Stmt::Discard => Err(Halt::Discard),
    }
  }

  fn load_var(&self, var: VarRef, frame: &[Value]) -> Value {
    match var {
      VarRef::Global(i) => self.globals[i],
      VarRef::Local(i) => frame[i],
    }
  }

  fn store_var(&mut self, var: VarRef, v: Value, frame: &mut [Value]) {
    match var {
      VarRef::Global(i) => self.globals[i] = v,
      VarRef::Local(i) => frame[i] = v,
    }
  }

  fn load(&self, target: &LValue, frame: &[Value]) -> Value {
    let v = self.load_var(target.var, frame);

    match target.swizzle {
      Some(s) => swizzle(&v, s),
      None => v,
    }
  }

  fn store(&mut self, target: &LValue, v: Value, frame: &mut [Value]) {
    let v = match target.swizzle {
      Some(s) => {
        let (n, mut dest) = self.load_var(target.var, frame).floats();
        let (_, src) = v.floats();

        for i in 0..s.len as usize {
          dest[s.indices[i] as usize] = src[i];
        }

        Value::from_floats(n, dest)
      }

      None => v,
    };

    self.store_var(target.var, v, frame);
  }

  fn eval(&mut self, e: &Expr, frame: &mut Vec<Value>) -> Result<Value, Halt> {
    let v = match e.kind {
      ExprKind::Const(v) => v,

      ExprKind::Load(var) => self.load_var(var, frame),

      ExprKind::Swizzle(ref base, s) => swizzle(&self.eval(base, frame)?, s),

      ExprKind::Construct(ty, ref args) => {
        let args = self.eval_all(args, frame)?;
        construct(ty.components(), ty, &args)
      }

      ExprKind::Call(index, ref args) => {
        let args = self.eval_all(args, frame)?;
        self.call(index, args)?
      }

      ExprKind::Builtin(builtin, ref args) => {
        let args = self.eval_all(args, frame)?;
        builtins::eval(builtin, &args)
      }

      ExprKind::Neg(ref a) => match self.eval(a, frame)? {
        Value::Int(i) => Value::Int(i.wrapping_neg()),
        v => {
          let (n, mut c) = v.floats();
          c.iter_mut().take(n).for_each(|x| *x = -*x);
          Value::from_floats(n, c)
        }
      },

      ExprKind::Not(ref a) => Value::Bool(!self.eval(a, frame)?.as_bool()),

      ExprKind::Arith(op, ref a, ref b) => {
        let a = self.eval(a, frame)?;
        let b = self.eval(b, frame)?;
        arith(op, a, b)
      }

      ExprKind::Compare(op, ref a, ref b) => {
        let a = self.eval(a, frame)?;
        let b = self.eval(b, frame)?;
        Value::Bool(compare(op, a, b))
      }

      ExprKind::And(ref a, ref b) => {
        Value::Bool(self.eval(a, frame)?.as_bool() && self.eval(b, frame)?.as_bool())
      }

      ExprKind::Or(ref a, ref b) => {
        Value::Bool(self.eval(a, frame)?.as_bool() || self.eval(b, frame)?.as_bool())
      }

      ExprKind::Xor(ref a, ref b) => {
        let a = self.eval(a, frame)?.as_bool();
        let b = self.eval(b, frame)?.as_bool();
        Value::Bool(a != b)
      }

      ExprKind::Select(ref cond, ref a, ref b) => {
        if self.eval(cond, frame)?.as_bool() {
          self.eval(a, frame)?
        } else {
          self.eval(b, frame)?
        }
      }

      ExprKind::Assign(ref target, op, ref value) => {
        let value = self.eval(value, frame)?;
        let value = match op {
          Some(op) => arith(op, self.load(target, frame), value),
          None => value,
        };

        self.store(target, value, frame);
        value
      }

      ExprKind::Step {
        ref target,
        increment,
        prefix,
      } => {
        let old = self.load(target, frame);
        let one = if old.ty() == super::types::Type::Int {
          Value::Int(1)
        } else {
          Value::Float(1.)
        };
        let op = if increment { ArithOp::Add } else { ArithOp::Sub };
        let new = arith(op, old, one);

        self.store(target, new, frame);

        if prefix {
          new
        } else {
          old
        }
      }
    };

    Ok(v)
  }

  fn eval_all(&mut self, args: &[Expr], frame: &mut Vec<Value>) -> Result<Vec<Value>, Halt> {
    args.iter().map(|a| self.eval(a, frame)).collect()
  }
}

fn swizzle(v: &Value, s: Swizzle) -> Value {
  let (_, c) = v.floats();
  let mut out = [0.; 4];

  for i in 0..s.len as usize {
    out[i] = c[s.indices[i] as usize];
  }

  Value::from_floats(s.len as usize, out)
}

fn construct(n: usize, ty: super::types::Type, args: &[Value]) -> Value {
  use super::types::Type;

  match ty {
    Type::Bool => Value::Bool(args[0].as_bool()),
    Type::Int => Value::Int(args[0].as_int()),
    Type::Float => Value::Float(args[0].as_float()),

    _ => {
      let mut out = [0.; 4];

      if let [single] = args {
        let (m, c) = single.floats();

        if m == 1 {
          out.iter_mut().take(n).for_each(|x| *x = c[0]);
          return Value::from_floats(n, out);
        }
      }

      let components = args.iter().flat_map(|a| {
        let (m, c) = a.floats();
        c.into_iter().take(m)
      });

      for (x, c) in out.iter_mut().take(n).zip(components) {
        *x = c;
      }

      Value::from_floats(n, out)
    }
  }
}

fn arith(op: ArithOp, a: Value, b: Value) -> Value {
  if let (Value::Int(x), Value::Int(y)) = (a, b) {
    return Value::Int(match op {
      ArithOp::Add => x.wrapping_add(y),
      ArithOp::Sub => x.wrapping_sub(y),
      ArithOp::Mul => x.wrapping_mul(y),
      // division by zero is undefined; pick 0
      ArithOp::Div => x.checked_div(y).unwrap_or(0),
    });
  }

  let (na, ca) = a.floats();
  let (nb, cb) = b.floats();
  let n = na.max(nb);
  let mut out = [0.; 4];

  for (i, o) in out.iter_mut().enumerate().take(n) {
    let x = if na == 1 { ca[0] } else { ca[i] };
    let y = if nb == 1 { cb[0] } else { cb[i] };

    *o = match op {
      ArithOp::Add => x + y,
      ArithOp::Sub => x - y,
      ArithOp::Mul => x * y,
      ArithOp::Div => x / y,
    };
  }

  Value::from_floats(n, out)
}

fn compare(op: CompareOp, a: Value, b: Value) -> bool {
  match op {
    CompareOp::Eq => equal(a, b),
    CompareOp::Ne => !equal(a, b),

    _ => {
      let ord = match (a, b) {
        (Value::Int(x), Value::Int(y)) => x.partial_cmp(&y),
        _ => a.as_float().partial_cmp(&b.as_float()),
      };

      match (op, ord) {
        (_, None) => false,
        (CompareOp::Lt, Some(o)) => o.is_lt(),
        (CompareOp::Le, Some(o)) => o.is_le(),
        (CompareOp::Gt, Some(o)) => o.is_gt(),
        (_, Some(o)) => o.is_ge(),
      }
    }
  }
}

fn equal(a: Value, b: Value) -> bool {
  match (a, b) {
    (Value::Vec(n, x), Value::Vec(m, y)) => n == m && x[..n as usize] == y[..n as usize],
    _ => a == b,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::glsl::compile;
  use crate::glsl::ir::BuiltinVar;
  use glint::shader::StageType;

  // Run a vertex shader and return gl_Position.
  fn position(src: &str) -> Result<[f32; 4], ExecError> {
    let shader = compile(StageType::VertexShader, src).unwrap();
    let mut inv = Invocation::new(&shader);
    inv.run()?;

    let i = shader.builtin(BuiltinVar::Position).unwrap();
    Ok(inv.globals[i].to_vec4())
  }

  #[test]
  fn forwards_attribute() {
    let shader = compile(
      StageType::VertexShader,
      "attribute vec4 a_position; void main() { gl_Position = a_position; }",
    )
    .unwrap();

    let mut inv = Invocation::new(&shader);
    let a = shader.global("a_position").unwrap();
    inv.globals[a] = Value::Vec(4, [0.7, 0., 0., 1.]);

    assert_eq!(inv.run(), Ok(true));
    assert_eq!(
      inv.globals[shader.builtin(BuiltinVar::Position).unwrap()],
      Value::Vec(4, [0.7, 0., 0., 1.])
    );
  }

  #[test]
  fn loops_and_functions() {
    let p = position(
      "float sum(int n) {
         float s = 0.0;
         for (int i = 1; i <= n; i++) {
           if (i == 3) continue;
           s += float(i);
         }
         return s;
       }
       void main() {
         int k = 0;
         while (true) { k += 1; if (k >= 5) break; }
         int j = 0;
         do { j++; } while (j < 0);
         gl_Position = vec4(sum(4), float(k), float(j), 1.0);
       }",
    )
    .unwrap();

    assert_eq!(p, [7., 5., 1., 1.]);
  }

  #[test]
  fn swizzle_writes_and_compound_assignments() {
    let p = position(
      "void main() {
         vec4 v = vec4(1.0, 2.0, 3.0, 4.0);
         v.wx = v.xw;
         v.yz *= 2.0;
         v.x -= 0.5;
         gl_Position = v;
       }",
    )
    .unwrap();

    assert_eq!(p, [3.5, 4., 6., 1.]);
  }

  #[test]
  fn operators() {
    let p = position(
      "void main() {
         int a = 7 / 2;
         int b = 7 / 0;
         bool t = (1.0 < 2.0) ^^ false;
         float c = t ? 0.25 : 0.5;
         vec2 d = 1.0 - vec2(0.5, 0.25);
         gl_Position = vec4(float(a), float(b), c, d.y == 0.75 && !(d.x != 0.5) ? 1.0 : 0.0);
       }",
    )
    .unwrap();

    assert_eq!(p, [3., 0., 0.25, 1.]);
  }

  #[test]
  fn pre_and_post_increments() {
    let p = position(
      "void main() {
         float x = 1.0;
         float a = x++;
         float b = ++x;
         float c = x--;
         gl_Position = vec4(a, b, c, x);
       }",
    )
    .unwrap();

    assert_eq!(p, [1., 3., 3., 2.]);
  }

  #[test]
  fn constructors() {
    let p = position("void main() { vec2 a = vec2(2); gl_Position = vec4(a, vec3(true).x, 1); }").unwrap();
    assert_eq!(p, [2., 2., 1., 1.]);

    let p = position("void main() { gl_Position = vec4(vec3(0.5).xy, vec4(0.25, 9.0, 9.0, 9.0)); }").unwrap();
    assert_eq!(p, [0.5, 0.5, 0.25, 9.]);
  }

  #[test]
  fn global_initializers_run_first() {
    let p = position(
      "const float k = 0.5;
       float g = k * 2.0;
       void main() { gl_Position = vec4(k, g, 0.0, 1.0); }",
    )
    .unwrap();

    assert_eq!(p, [0.5, 1., 0., 1.]);
  }

  #[test]
  fn runaway_loop_is_stopped() {
    let r = position("void main() { float x = 0.0; for (;;) { x += 1.0; } gl_Position = vec4(x); }");
    assert_eq!(r, Err(ExecError::LoopLimit));
  }

  #[test]
  fn runaway_recursion_is_stopped() {
    let r = position(
      "float f(float x) { return f(x + 1.0); }
       void main() { gl_Position = vec4(f(0.0)); }",
    );
    assert_eq!(r, Err(ExecError::CallDepth));
  }

  #[test]
  fn discard_stops_the_invocation() {
    let shader = compile(
      StageType::FragmentShader,
      "precision mediump float;
       void kill() { discard; }
       void main() { gl_FragColor = vec4(1.0); if (gl_FragCoord.x > 1.0) kill(); }",
    )
    .unwrap();

    let coord = shader.builtin(BuiltinVar::FragCoord).unwrap();

    let mut inv = Invocation::new(&shader);
    inv.globals[coord] = Value::Vec(4, [0.5, 0.5, 0., 1.]);
    assert_eq!(inv.run(), Ok(true));

    let mut inv = Invocation::new(&shader);
    inv.globals[coord] = Value::Vec(4, [2.5, 0.5, 0., 1.]);
    assert_eq!(inv.run(), Ok(false));
  }
}
