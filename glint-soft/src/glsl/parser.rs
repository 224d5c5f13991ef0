//! Recursive descent parser.
//!
//! Parsing stops at the first syntax error.

use super::ast::*;
use super::lexer::{Token, TokenKind};
use super::Diagnostic;

const TYPE_NAMES: &[&str] = &[
  "void",
  "bool",
  "int",
  "float",
  "vec2",
  "vec3",
  "vec4",
  "ivec2",
  "ivec3",
  "ivec4",
  "bvec2",
  "bvec3",
  "bvec4",
  "mat2",
  "mat3",
  "mat4",
  "sampler2D",
  "samplerCube",
];

const KEYWORDS: &[&str] = &[
  "attribute",
  "const",
  "uniform",
  "varying",
  "invariant",
  "precision",
  "lowp",
  "mediump",
  "highp",
  "in",
  "out",
  "inout",
  "struct",
  "if",
  "else",
  "for",
  "while",
  "do",
  "break",
  "continue",
  "return",
  "discard",
  "asm",
  "class",
  "union",
  "enum",
  "typedef",
  "template",
  "this",
  "packed",
  "goto",
  "switch",
  "default",
  "inline",
  "noinline",
  "volatile",
  "public",
  "static",
  "extern",
  "external",
  "interface",
  "flat",
  "long",
  "short",
  "double",
  "half",
  "fixed",
  "unsigned",
  "superp",
  "input",
  "output",
  "sizeof",
  "cast",
  "namespace",
  "using",
];

fn is_type_name(name: &str) -> bool {
  TYPE_NAMES.contains(&name)
}

fn is_reserved(name: &str) -> bool {
  is_type_name(name) || KEYWORDS.contains(&name)
}

fn precision_of(name: &str) -> Option<Precision> {
  match name {
    "lowp" => Some(Precision::Low),
    "mediump" => Some(Precision::Medium),
    "highp" => Some(Precision::High),
    _ => None,
  }
}

fn storage_of(name: &str) -> Option<Storage> {
  match name {
    "const" => Some(Storage::Const),
    "attribute" => Some(Storage::Attribute),
    "varying" => Some(Storage::Varying),
    "uniform" => Some(Storage::Uniform),
    _ => None,
  }
}

// Statements, parenthesized expressions and operator chains may nest this deep.
const MAX_NESTING: usize = 32;

struct Parser {
  tokens: Vec<Token>,
  pos: usize,
  depth: usize,
}

/// Parse a whole translation unit.
pub fn parse(tokens: Vec<Token>) -> Result<Vec<External>, Diagnostic> {
  let mut parser = Parser {
    tokens,
    pos: 0,
    depth: 0,
  };
  let mut externals = Vec::new();

  while parser.peek().kind != TokenKind::Eof {
    externals.push(parser.external()?);
  }

  Ok(externals)
}

fn syntax_error(token: &Token) -> Diagnostic {
  if token.kind == TokenKind::Eof {
    Diagnostic::new(token.line, "", "syntax error, unexpected end of file")
  } else {
    Diagnostic::new(token.line, &token.text, "syntax error")
  }
}

fn too_complex(token: &Token) -> Diagnostic {
  Diagnostic::new(token.line, &token.text, "expression too complex")
}

impl Parser {
  // Run a recursive production one nesting level deeper.
  fn nested<T>(
    &mut self,
    production: impl FnOnce(&mut Self) -> Result<T, Diagnostic>,
  ) -> Result<T, Diagnostic> {
    if self.depth >= MAX_NESTING {
      return Err(too_complex(self.peek()));
    }

    self.depth += 1;
    let r = production(self);
    self.depth -= 1;

    r
  }

  fn peek(&self) -> &Token {
    self.peek_at(0)
  }

  fn peek_at(&self, offset: usize) -> &Token {
    let last = self.tokens.len() - 1;
    &self.tokens[(self.pos + offset).min(last)]
  }

  fn advance(&mut self) -> Token {
    let token = self.peek().clone();

    if self.pos < self.tokens.len() - 1 {
      self.pos += 1;
    }

    token
  }

  fn eat_punct(&mut self, p: &str) -> bool {
    if self.peek().is_punct(p) {
      self.pos += 1;
      true
    } else {
      false
    }
  }

  fn eat_ident(&mut self, name: &str) -> bool {
    if self.peek().is_ident(name) {
      self.pos += 1;
      true
    } else {
      false
    }
  }

  fn expect_punct(&mut self, p: &str) -> Result<Token, Diagnostic> {
    if self.peek().is_punct(p) {
      Ok(self.advance())
    } else {
      let token = self.peek();

      if token.kind == TokenKind::Eof {
        Err(syntax_error(token))
      } else {
        Err(Diagnostic::new(
          token.line,
          &token.text,
          format!("syntax error, expecting '{}'", p),
        ))
      }
    }
  }

  // A user identifier (not a keyword nor a type name).
  fn identifier(&mut self) -> Result<(String, u32), Diagnostic> {
    let token = self.peek();

    match token.kind {
      TokenKind::Ident(ref name) if !is_reserved(name) => {
        let r = (name.clone(), token.line);
        self.pos += 1;
        Ok(r)
      }
      _ => Err(syntax_error(token)),
    }
  }

  fn ident_text(&self) -> Option<&str> {
    match self.peek().kind {
      TokenKind::Ident(ref name) => Some(name),
      _ => None,
    }
  }

  fn precision_statement(&mut self) -> Result<(Precision, TypeName), Diagnostic> {
    // "precision" already consumed
    let token = self.advance();
    let precision = precision_of(&token.text).ok_or_else(|| syntax_error(&token))?;
    let ty = self.type_name()?;
    self.expect_punct(";")?;

    Ok((precision, ty))
  }

  fn type_name(&mut self) -> Result<TypeName, Diagnostic> {
    let token = self.peek();

    match token.kind {
      TokenKind::Ident(ref name) if is_type_name(name) => {
        let ty = TypeName {
          name: name.clone(),
          line: token.line,
        };
        self.pos += 1;
        Ok(ty)
      }

      TokenKind::Ident(ref name) if name == "struct" => Err(Diagnostic::new(
        token.line,
        "struct",
        "structures are not supported",
      )),

      _ => Err(syntax_error(token)),
    }
  }

  fn full_type(&mut self) -> Result<FullType, Diagnostic> {
    if self.peek().is_ident("invariant") {
      let token = self.peek();
      return Err(Diagnostic::new(
        token.line,
        "invariant",
        "invariant qualifier is not supported",
      ));
    }

    let storage = match self.ident_text().and_then(storage_of) {
      Some(storage) => {
        self.pos += 1;
        storage
      }
      None => Storage::None,
    };

    let precision = self.ident_text().and_then(precision_of);
    if precision.is_some() {
      self.pos += 1;
    }

    let ty = self.type_name()?;

    Ok(FullType {
      storage,
      precision,
      ty,
    })
  }

  fn reject_array(&self) -> Result<(), Diagnostic> {
    let token = self.peek();

    if token.is_punct("[") {
      Err(Diagnostic::new(token.line, "[", "arrays are not supported"))
    } else {
      Ok(())
    }
  }

  fn external(&mut self) -> Result<External, Diagnostic> {
    if self.eat_ident("precision") {
      let (precision, ty) = self.precision_statement()?;
      return Ok(External::Precision(precision, ty));
    }

    let ty = self.full_type()?;

    if self.eat_punct(";") {
      return Ok(External::Declaration(Declaration { ty, vars: Vec::new() }));
    }

    if matches!(self.peek().kind, TokenKind::Ident(_)) && self.peek_at(1).is_punct("(") {
      let (name, line) = self.identifier()?;
      let params = self.parameters()?;
      let proto = Prototype {
        ret: ty,
        name,
        params,
        line,
      };

      if self.eat_punct(";") {
        return Ok(External::Prototype(proto));
      }

      self.expect_punct("{")?;
      let body = self.block_rest()?;
      return Ok(External::Function(proto, body));
    }

    let vars = self.declarators()?;
    Ok(External::Declaration(Declaration { ty, vars }))
  }

  fn parameters(&mut self) -> Result<Vec<Param>, Diagnostic> {
    self.expect_punct("(")?;

    let mut params = Vec::new();

    if self.eat_punct(")") {
      return Ok(params);
    }

    if self.peek().is_ident("void") && self.peek_at(1).is_punct(")") {
      self.pos += 2;
      return Ok(params);
    }

    loop {
      let line = self.peek().line;
      self.eat_ident("const");

      let qualifier = if self.eat_ident("in") {
        ParamQualifier::In
      } else if self.eat_ident("out") {
        ParamQualifier::Out
      } else if self.eat_ident("inout") {
        ParamQualifier::InOut
      } else {
        ParamQualifier::In
      };

      let precision = self.ident_text().and_then(precision_of);
      if precision.is_some() {
        self.pos += 1;
      }

      let ty = self.type_name()?;
      let name = if matches!(self.peek().kind, TokenKind::Ident(_)) {
        Some(self.identifier()?.0)
      } else {
        None
      };
      self.reject_array()?;

      params.push(Param {
        qualifier,
        precision,
        ty,
        name,
        line,
      });

      if self.eat_punct(")") {
        return Ok(params);
      }

      self.expect_punct(",")?;
    }
  }

  // Declarators after the type, up to and including the semicolon.
  fn declarators(&mut self) -> Result<Vec<Declarator>, Diagnostic> {
    let mut vars = Vec::new();

    loop {
      let (name, line) = self.identifier()?;
      self.reject_array()?;

      let init = if self.eat_punct("=") {
        Some(self.assignment()?)
      } else {
        None
      };

      vars.push(Declarator { name, line, init });

      if self.eat_punct(";") {
        return Ok(vars);
      }

      self.expect_punct(",")?;
    }
  }

  // Statements up to the closing brace, which is consumed.
  fn block_rest(&mut self) -> Result<Vec<Stmt>, Diagnostic> {
    let mut stmts = Vec::new();

    while !self.eat_punct("}") {
      if self.peek().kind == TokenKind::Eof {
        return Err(syntax_error(self.peek()));
      }

      stmts.push(self.statement()?);
    }

    Ok(stmts)
  }

  fn starts_declaration(&self) -> bool {
    match self.ident_text() {
      Some(name) if storage_of(name).is_some() || precision_of(name).is_some() => true,
      Some("invariant") | Some("struct") => true,
      Some(name) if is_type_name(name) => !self.peek_at(1).is_punct("("),
      _ => false,
    }
  }

  fn statement(&mut self) -> Result<Stmt, Diagnostic> {
    self.nested(Self::bare_statement)
  }

  fn bare_statement(&mut self) -> Result<Stmt, Diagnostic> {
    if self.eat_punct("{") {
      return Ok(Stmt::Block(self.block_rest()?));
    }

    if self.eat_punct(";") {
      return Ok(Stmt::Empty);
    }

    let line = self.peek().line;
    let keyword = self.ident_text().map(str::to_owned);

    match keyword.as_deref() {
      Some("precision") => {
        self.pos += 1;
        let (precision, ty) = self.precision_statement()?;
        Ok(Stmt::Precision(precision, ty))
      }

      Some("if") => {
        self.pos += 1;
        self.expect_punct("(")?;
        let cond = self.expression()?;
        self.expect_punct(")")?;
        let then = Box::new(self.statement()?);
        let otherwise = if self.eat_ident("else") {
          Some(Box::new(self.statement()?))
        } else {
          None
        };

        Ok(Stmt::If(cond, then, otherwise))
      }

      Some("for") => {
        self.pos += 1;
        self.expect_punct("(")?;

        let init = if self.eat_punct(";") {
          None
        } else if self.starts_declaration() {
          Some(Box::new(self.declaration_statement()?))
        } else {
          let e = self.expression()?;
          self.expect_punct(";")?;
          Some(Box::new(Stmt::Expr(e)))
        };

        let cond = if self.peek().is_punct(";") {
          None
        } else {
          Some(self.expression()?)
        };
        self.expect_punct(";")?;

        let step = if self.peek().is_punct(")") {
          None
        } else {
          Some(self.expression()?)
        };
        self.expect_punct(")")?;

        let body = Box::new(self.statement()?);

        Ok(Stmt::For {
          init,
          cond,
          step,
          body,
        })
      }

      Some("while") => {
        self.pos += 1;
        self.expect_punct("(")?;
        let cond = self.expression()?;
        self.expect_punct(")")?;
        let body = Box::new(self.statement()?);

        Ok(Stmt::While(cond, body))
      }

      Some("do") => {
        self.pos += 1;
        let body = Box::new(self.statement()?);

        if !self.eat_ident("while") {
          return Err(syntax_error(self.peek()));
        }

        self.expect_punct("(")?;
        let cond = self.expression()?;
        self.expect_punct(")")?;
        self.expect_punct(";")?;

        Ok(Stmt::DoWhile(body, cond))
      }

      Some("break") => {
        self.pos += 1;
        self.expect_punct(";")?;
        Ok(Stmt::Break(line))
      }

      Some("continue") => {
        self.pos += 1;
        self.expect_punct(";")?;
        Ok(Stmt::Continue(line))
      }

      Some("discard") => {
        self.pos += 1;
        self.expect_punct(";")?;
        Ok(Stmt::Discard(line))
      }

      Some("return") => {
        self.pos += 1;

        let value = if self.peek().is_punct(";") {
          None
        } else {
          Some(self.expression()?)
        };
        self.expect_punct(";")?;

        Ok(Stmt::Return(line, value))
      }

      _ if self.starts_declaration() => self.declaration_statement(),

      _ => {
        let e = self.expression()?;
        self.expect_punct(";")?;
        Ok(Stmt::Expr(e))
      }
    }
  }

  fn declaration_statement(&mut self) -> Result<Stmt, Diagnostic> {
    let ty = self.full_type()?;

    if self.eat_punct(";") {
      return Ok(Stmt::Declaration(Declaration { ty, vars: Vec::new() }));
    }

    let vars = self.declarators()?;
    Ok(Stmt::Declaration(Declaration { ty, vars }))
  }

  fn expression(&mut self) -> Result<Expr, Diagnostic> {
    self.nested(Self::bare_expression)
  }

  fn bare_expression(&mut self) -> Result<Expr, Diagnostic> {
    let e = self.assignment()?;

    let token = self.peek();
    if token.is_punct(",") {
      return Err(Diagnostic::new(
        token.line,
        ",",
        "comma operator is not supported",
      ));
    }

    Ok(e)
  }

  fn assignment(&mut self) -> Result<Expr, Diagnostic> {
    let lhs = self.conditional()?;

    let op = match self.peek().kind {
      TokenKind::Punct("=") => None,
      TokenKind::Punct("+=") => Some(BinaryOp::Add),
      TokenKind::Punct("-=") => Some(BinaryOp::Sub),
      TokenKind::Punct("*=") => Some(BinaryOp::Mul),
      TokenKind::Punct("/=") => Some(BinaryOp::Div),
      _ => return Ok(lhs),
    };

    let token = self.advance();
    let rhs = self.nested(Self::assignment)?;

    Ok(Expr {
      kind: ExprKind::Assign(op, Box::new(lhs), Box::new(rhs)),
      line: token.line,
      token: token.text,
    })
  }

  fn conditional(&mut self) -> Result<Expr, Diagnostic> {
    let cond = self.binary(0)?;

    if !self.peek().is_punct("?") {
      return Ok(cond);
    }

    let token = self.advance();
    let a = self.expression()?;
    self.expect_punct(":")?;
    let b = self.nested(Self::assignment)?;

    Ok(Expr {
      kind: ExprKind::Ternary(Box::new(cond), Box::new(a), Box::new(b)),
      line: token.line,
      token: token.text,
    })
  }

  // Precedence climbing over the left-associative binary operators.
  fn binary(&mut self, min_level: usize) -> Result<Expr, Diagnostic> {
    const LEVELS: &[&[(&str, BinaryOp)]] = &[
      &[("||", BinaryOp::Or)],
      &[("^^", BinaryOp::Xor)],
      &[("&&", BinaryOp::And)],
      &[("==", BinaryOp::Eq), ("!=", BinaryOp::Ne)],
      &[
        ("<", BinaryOp::Lt),
        (">", BinaryOp::Gt),
        ("<=", BinaryOp::Le),
        (">=", BinaryOp::Ge),
      ],
      &[("+", BinaryOp::Add), ("-", BinaryOp::Sub)],
      &[("*", BinaryOp::Mul), ("/", BinaryOp::Div)],
    ];

    if min_level == LEVELS.len() {
      return self.unary();
    }

    // every folded operator deepens the left operand
    let outer = self.depth;
    let mut lhs = self.binary(min_level + 1)?;

    loop {
      let op = LEVELS[min_level]
        .iter()
        .find(|(p, _)| self.peek().is_punct(p))
        .map(|&(_, op)| op);

      match op {
        Some(op) => {
          if self.depth >= MAX_NESTING {
            return Err(too_complex(self.peek()));
          }

          self.depth += 1;
          let token = self.advance();
          let rhs = self.binary(min_level + 1)?;

          lhs = Expr {
            kind: ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)),
            line: token.line,
            token: token.text,
          };
        }

        None => {
          self.depth = outer;
          return Ok(lhs);
        }
      }
    }
  }

  fn unary(&mut self) -> Result<Expr, Diagnostic> {
    let op = match self.peek().kind {
      TokenKind::Punct("+") => UnaryOp::Plus,
      TokenKind::Punct("-") => UnaryOp::Minus,
      TokenKind::Punct("!") => UnaryOp::Not,
      TokenKind::Punct("++") => UnaryOp::PreInc,
      TokenKind::Punct("--") => UnaryOp::PreDec,
      _ => return self.postfix(),
    };

    let token = self.advance();
    let operand = self.nested(Self::unary)?;

    Ok(Expr {
      kind: ExprKind::Unary(op, Box::new(operand)),
      line: token.line,
      token: token.text,
    })
  }

  fn postfix(&mut self) -> Result<Expr, Diagnostic> {
    let mut e = self.primary()?;

    loop {
      let token = self.peek().clone();

      if token.is_punct(".") {
        self.pos += 1;

        let field = self.peek().clone();
        let name = match field.kind {
          TokenKind::Ident(ref name) => name.clone(),
          _ => return Err(syntax_error(&field)),
        };
        self.pos += 1;

        e = Expr {
          kind: ExprKind::Field(Box::new(e), name.clone()),
          line: field.line,
          token: name,
        };
      } else if token.is_punct("++") || token.is_punct("--") {
        self.pos += 1;

        let op = if token.is_punct("++") {
          UnaryOp::PostInc
        } else {
          UnaryOp::PostDec
        };

        e = Expr {
          kind: ExprKind::Unary(op, Box::new(e)),
          line: token.line,
          token: token.text,
        };
      } else if token.is_punct("[") {
        return Err(Diagnostic::new(token.line, "[", "indexing is not supported"));
      } else {
        return Ok(e);
      }
    }
  }

  fn primary(&mut self) -> Result<Expr, Diagnostic> {
    let token = self.advance();

    let kind = match token.kind {
      TokenKind::IntConst(i) => ExprKind::Int(i),
      TokenKind::FloatConst(x) => ExprKind::Float(x),
      TokenKind::BoolConst(b) => ExprKind::Bool(b),

      TokenKind::Punct("(") => {
        let e = self.expression()?;
        self.expect_punct(")")?;
        return Ok(e);
      }

      TokenKind::Ident(ref name) if self.peek().is_punct("(") => {
        if KEYWORDS.contains(&name.as_str()) {
          return Err(syntax_error(&token));
        }

        self.pos += 1;
        ExprKind::Call(name.clone(), self.arguments()?)
      }

      TokenKind::Ident(ref name) if !is_reserved(name) => ExprKind::Ident(name.clone()),

      _ => return Err(syntax_error(&token)),
    };

    Ok(Expr {
      kind,
      line: token.line,
      token: token.text,
    })
  }

  // Call arguments after the opening parenthesis, up to and including the closing one.
  fn arguments(&mut self) -> Result<Vec<Expr>, Diagnostic> {
    let mut args = Vec::new();

    if self.eat_punct(")") {
      return Ok(args);
    }

    if self.peek().is_ident("void") && self.peek_at(1).is_punct(")") {
      self.pos += 2;
      return Ok(args);
    }

    loop {
      args.push(self.nested(Self::assignment)?);

      if self.eat_punct(")") {
        return Ok(args);
      }

      self.expect_punct(",")?;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::glsl::lexer::tokenize;

  fn parse_src(src: &str) -> Result<Vec<External>, Diagnostic> {
    parse(tokenize(src)?)
  }

  fn parse_expr(src: &str) -> Expr {
    let mut parser = Parser {
      tokens: tokenize(src).unwrap(),
      pos: 0,
      depth: 0,
    };
    parser.expression().unwrap()
  }

  #[test]
  fn vertex_shader() {
    let unit = parse_src("attribute vec4 a_position;\nvoid main() {\n  gl_Position = a_position;\n}").unwrap();

    assert_eq!(unit.len(), 2);
    assert!(matches!(unit[0], External::Declaration(ref d) if d.ty.storage == Storage::Attribute));

    match unit[1] {
      External::Function(ref proto, ref body) => {
        assert_eq!(proto.name, "main");
        assert!(proto.params.is_empty());
        assert_eq!(body.len(), 1);
      }
      _ => panic!("expected a function"),
    }
  }

  #[test]
  fn precedence() {
    let e = parse_expr("a + b * c");

    match e.kind {
      ExprKind::Binary(BinaryOp::Add, _, ref rhs) => {
        assert!(matches!(rhs.kind, ExprKind::Binary(BinaryOp::Mul, _, _)));
      }
      _ => panic!("bad tree: {:?}", e),
    }

    let e = parse_expr("a = b = c");
    match e.kind {
      ExprKind::Assign(None, _, ref rhs) => {
        assert!(matches!(rhs.kind, ExprKind::Assign(None, _, _)))
      }
      _ => panic!("bad tree: {:?}", e),
    }
  }

  #[test]
  fn constructor_statement_is_not_a_declaration() {
    let unit = parse_src("void main() { vec4(1.0); vec4 v = vec4(0.0); }").unwrap();

    match unit[0] {
      External::Function(_, ref body) => {
        assert!(matches!(body[0], Stmt::Expr(_)));
        assert!(matches!(body[1], Stmt::Declaration(_)));
      }
      _ => panic!("expected a function"),
    }
  }

  #[test]
  fn missing_semicolon_names_the_next_token() {
    let err = parse_src("void main() {\n  gl_Position = vec4(0.0)\n}").unwrap_err();

    assert_eq!(err.line, 3);
    assert_eq!(err.token, "}");
  }

  #[test]
  fn control_flow() {
    let unit = parse_src(
      "void main() {
        for (int i = 0; i < 4; ++i) { if (i == 2) break; else continue; }
        while (true) { discard; }
        do { } while (false);
        return;
      }",
    )
    .unwrap();

    match unit[0] {
      External::Function(_, ref body) => {
        assert!(matches!(body[0], Stmt::For { .. }));
        assert!(matches!(body[1], Stmt::While(..)));
        assert!(matches!(body[2], Stmt::DoWhile(..)));
        assert!(matches!(body[3], Stmt::Return(_, None)));
      }
      _ => panic!("expected a function"),
    }
  }

  #[test]
  fn deep_nesting_is_rejected() {
    let parens = format!("{}1.0{}", "(".repeat(200), ")".repeat(200));
    let err = parse_src(&format!("void main() {{ float x = {}; }}", parens)).unwrap_err();
    assert_eq!(err.message, "expression too complex");
    assert_eq!(err.token, "(");

    let negations = format!("void main() {{ float x = {}1.0; }}", "-".repeat(200));
    assert_eq!(parse_src(&negations).unwrap_err().message, "expression too complex");

    let blocks = format!("void main() {}{}", "{".repeat(200), "}".repeat(200));
    assert_eq!(parse_src(&blocks).unwrap_err().message, "expression too complex");

    let sum = vec!["1.0"; 200].join(" + ");
    let err = parse_src(&format!("void main() {{ float x = {}; }}", sum)).unwrap_err();
    assert_eq!(err.message, "expression too complex");
  }

  #[test]
  fn moderate_nesting_is_accepted() {
    let parens = format!("{}1.0{}", "(".repeat(20), ")".repeat(20));
    assert!(parse_src(&format!("void main() {{ float x = {}; }}", parens)).is_ok());

    let sum = vec!["1.0"; 16].join(" + ");
    assert!(parse_src(&format!("void main() {{ float x = {}; }}", sum)).is_ok());
  }

  #[test]
  fn unsupported_syntax() {
    assert_eq!(parse_src("float a[2];").unwrap_err().token, "[");
    assert_eq!(parse_src("struct S { float x; };").unwrap_err().token, "struct");
    assert_eq!(parse_src("void main() { a = 1, b = 2; }").unwrap_err().token, ",");
  }
}
