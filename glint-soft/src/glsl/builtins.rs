//! Built-in functions: overload resolution and evaluation.

use super::types::{Type, Value};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Builtin {
  Radians,
  Degrees,
  Sin,
  Cos,
  Tan,
  Asin,
  Acos,
  Atan,
  Atan2,
  Pow,
  Exp,
  Log,
  Exp2,
  Log2,
  Sqrt,
  InverseSqrt,
  Abs,
  Sign,
  Floor,
  Ceil,
  Fract,
  Mod,
  Min,
  Max,
  Clamp,
  Mix,
  Step,
  Smoothstep,
  Length,
  Distance,
  Dot,
  Cross,
  Normalize,
  Reflect,
}

// Component-wise functions of one argument, `genType f(genType)`.
const UNARY: &[(&str, Builtin)] = &[
  ("radians", Builtin::Radians),
  ("degrees", Builtin::Degrees),
  ("sin", Builtin::Sin),
  ("cos", Builtin::Cos),
  ("tan", Builtin::Tan),
  ("asin", Builtin::Asin),
  ("acos", Builtin::Acos),
  ("exp", Builtin::Exp),
  ("log", Builtin::Log),
  ("exp2", Builtin::Exp2),
  ("log2", Builtin::Log2),
  ("sqrt", Builtin::Sqrt),
  ("inversesqrt", Builtin::InverseSqrt),
  ("abs", Builtin::Abs),
  ("sign", Builtin::Sign),
  ("floor", Builtin::Floor),
  ("ceil", Builtin::Ceil),
  ("fract", Builtin::Fract),
  ("normalize", Builtin::Normalize),
];

const OTHERS: &[&str] = &[
  "atan",
  "pow",
  "mod",
  "min",
  "max",
  "clamp",
  "mix",
  "step",
  "smoothstep",
  "length",
  "distance",
  "dot",
  "cross",
  "reflect",
];

pub fn is_builtin(name: &str) -> bool {
  UNARY.iter().any(|&(n, _)| n == name) || OTHERS.contains(&name)
}

/// Resolve a call to a built-in function.
///
/// `None` if `name` is not a built-in function; `Some(None)` if no overload accepts `args`.
pub fn resolve(name: &str, args: &[Type]) -> Option<Option<(Builtin, Type)>> {
  if !is_builtin(name) {
    return None;
  }

  let g = |t: Type| t.is_float_based();

  let resolved = if let Some(&(_, b)) = UNARY.iter().find(|&&(n, _)| n == name) {
    match *args {
      [a] if g(a) => Some((b, a)),
      _ => None,
    }
  } else {
    match (name, args) {
      ("atan", &[a]) if g(a) => Some((Builtin::Atan, a)),
      ("atan", &[y, x]) if g(y) && y == x => Some((Builtin::Atan2, y)),
      ("pow", &[a, b]) if g(a) && a == b => Some((Builtin::Pow, a)),
      ("mod", &[a, b]) if g(a) && (a == b || b == Type::Float) => Some((Builtin::Mod, a)),
      ("min", &[a, b]) if g(a) && (a == b || b == Type::Float) => Some((Builtin::Min, a)),
      ("max", &[a, b]) if g(a) && (a == b || b == Type::Float) => Some((Builtin::Max, a)),
      ("clamp", &[x, lo, hi]) if g(x) && lo == hi && (lo == x || lo == Type::Float) => {
        Some((Builtin::Clamp, x))
      }
      ("mix", &[x, y, a]) if g(x) && x == y && (a == x || a == Type::Float) => {
        Some((Builtin::Mix, x))
      }
      ("step", &[edge, x]) if g(x) && (edge == x || edge == Type::Float) => {
        Some((Builtin::Step, x))
      }
      ("smoothstep", &[e0, e1, x]) if g(x) && e0 == e1 && (e0 == x || e0 == Type::Float) => {
        Some((Builtin::Smoothstep, x))
      }
      ("length", &[a]) if g(a) => Some((Builtin::Length, Type::Float)),
      ("distance", &[a, b]) if g(a) && a == b => Some((Builtin::Distance, Type::Float)),
      ("dot", &[a, b]) if g(a) && a == b => Some((Builtin::Dot, Type::Float)),
      ("cross", &[Type::Vec3, Type::Vec3]) => Some((Builtin::Cross, Type::Vec3)),
      ("reflect", &[i, n]) if g(i) && i == n => Some((Builtin::Reflect, i)),
      _ => None,
    }
  };

  Some(resolved)
}

// Apply `f` component-wise; scalar arguments are broadcast to the widest one.
fn zip(args: &[Value], f: impl Fn(&[f32]) -> f32) -> Value {
  let n = args.iter().map(|a| a.floats().0).max().unwrap_or(1);
  let mut out = [0.; 4];
  let mut xs = [0.; 3];

  for (i, o) in out.iter_mut().enumerate().take(n) {
    for (x, a) in xs.iter_mut().zip(args) {
      let (m, c) = a.floats();
      *x = if m == 1 { c[0] } else { c[i] };
    }

    *o = f(&xs[..args.len()]);
  }

  Value::from_floats(n, out)
}

fn dot(a: &Value, b: &Value) -> f32 {
  let (n, x) = a.floats();
  let (_, y) = b.floats();
  (0..n).map(|i| x[i] * y[i]).sum()
}

fn glsl_mod(x: f32, y: f32) -> f32 {
  x - y * (x / y).floor()
}

fn sign(x: f32) -> f32 {
  if x > 0. {
    1.
  } else if x < 0. {
    -1.
  } else {
    0.
  }
}

/// Evaluate a built-in function on arguments already checked by [`resolve`].
pub fn eval(builtin: Builtin, args: &[Value]) -> Value {
  match builtin {
    Builtin::Radians => zip(args, |x| x[0].to_radians()),
    Builtin::Degrees => zip(args, |x| x[0].to_degrees()),
    Builtin::Sin => zip(args, |x| x[0].sin()),
    Builtin::Cos => zip(args, |x| x[0].cos()),
    Builtin::Tan => zip(args, |x| x[0].tan()),
    Builtin::Asin => zip(args, |x| x[0].asin()),
    Builtin::Acos => zip(args, |x| x[0].acos()),
    Builtin::Atan => zip(args, |x| x[0].atan()),
    Builtin::Atan2 => zip(args, |x| x[0].atan2(x[1])),
    Builtin::Pow => zip(args, |x| x[0].powf(x[1])),
    Builtin::Exp => zip(args, |x| x[0].exp()),
    Builtin::Log => zip(args, |x| x[0].ln()),
    Builtin::Exp2 => zip(args, |x| x[0].exp2()),
    Builtin::Log2 => zip(args, |x| x[0].log2()),
    Builtin::Sqrt => zip(args, |x| x[0].sqrt()),
    Builtin::InverseSqrt => zip(args, |x| 1. / x[0].sqrt()),
    Builtin::Abs => zip(args, |x| x[0].abs()),
    Builtin::Sign => zip(args, |x| sign(x[0])),
    Builtin::Floor => zip(args, |x| x[0].floor()),
    Builtin::Ceil => zip(args, |x| x[0].ceil()),
    Builtin::Fract => zip(args, |x| x[0] - x[0].floor()),
    Builtin::Mod => zip(args, |x| glsl_mod(x[0], x[1])),
    Builtin::Min => zip(args, |x| x[0].min(x[1])),
    Builtin::Max => zip(args, |x| x[0].max(x[1])),
    Builtin::Clamp => zip(args, |x| x[0].max(x[1]).min(x[2])),
    Builtin::Mix => zip(args, |x| x[0] * (1. - x[2]) + x[1] * x[2]),
    Builtin::Step => zip(args, |x| if x[1] < x[0] { 0. } else { 1. }),

    Builtin::Smoothstep => zip(args, |x| {
      let t = ((x[2] - x[0]) / (x[1] - x[0])).max(0.).min(1.);
      t * t * (3. - 2. * t)
    }),

    Builtin::Length => Value::Float(dot(&args[0], &args[0]).sqrt()),

    Builtin::Distance => {
      let d = zip(args, |x| x[0] - x[1]);
      Value::Float(dot(&d, &d).sqrt())
    }

    Builtin::Dot => Value::Float(dot(&args[0], &args[1])),

    Builtin::Cross => {
      let (_, a) = args[0].floats();
      let (_, b) = args[1].floats();

      Value::Vec(
        3,
        [
          a[1] * b[2] - b[1] * a[2],
          a[2] * b[0] - b[2] * a[0],
          a[0] * b[1] - b[0] * a[1],
          0.,
        ],
      )
    }

    Builtin::Normalize => {
      let len = dot(&args[0], &args[0]).sqrt();
      zip(&args[..1], |x| x[0] / len)
    }

    Builtin::Reflect => {
      let d = dot(&args[1], &args[0]);
      zip(args, |x| x[0] - 2. * d * x[1])
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn overloads() {
    assert_eq!(resolve("sin", &[Type::Vec2]), Some(Some((Builtin::Sin, Type::Vec2))));
    assert_eq!(resolve("sin", &[Type::Int]), Some(None));
    assert_eq!(
      resolve("max", &[Type::Vec3, Type::Float]),
      Some(Some((Builtin::Max, Type::Vec3)))
    );
    assert_eq!(resolve("max", &[Type::Float, Type::Vec3]), Some(None));
    assert_eq!(
      resolve("step", &[Type::Float, Type::Vec4]),
      Some(Some((Builtin::Step, Type::Vec4)))
    );
    assert_eq!(
      resolve("dot", &[Type::Vec3, Type::Vec3]),
      Some(Some((Builtin::Dot, Type::Float)))
    );
    assert_eq!(resolve("texture2D", &[Type::Vec2]), None);
  }

  #[test]
  fn evaluation() {
    let v = Value::Vec(2, [3., 4., 0., 0.]);

    assert_eq!(eval(Builtin::Length, &[v]), Value::Float(5.));
    assert_eq!(
      eval(Builtin::Normalize, &[v]),
      Value::Vec(2, [0.6, 0.8, 0., 0.])
    );
    assert_eq!(
      eval(Builtin::Max, &[v, Value::Float(3.5)]),
      Value::Vec(2, [3.5, 4., 0., 0.])
    );
    assert_eq!(
      eval(Builtin::Mod, &[Value::Float(-1.), Value::Float(3.)]),
      Value::Float(2.)
    );
    assert_eq!(
      eval(
        Builtin::Clamp,
        &[Value::Float(2.), Value::Float(0.), Value::Float(1.)]
      ),
      Value::Float(1.)
    );

    let x = Value::Vec(3, [1., 0., 0., 0.]);
    let y = Value::Vec(3, [0., 1., 0., 0.]);
    assert_eq!(eval(Builtin::Cross, &[x, y]), Value::Vec(3, [0., 0., 1., 0.]));
  }
}
