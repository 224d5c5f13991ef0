//! Tokenizer.
//!
//! Comments are stripped and the only preprocessor directive understood is `#version 100`.

use super::Diagnostic;

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
  Ident(String),
  IntConst(i32),
  FloatConst(f32),
  BoolConst(bool),
  Punct(&'static str),
  Eof,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
  pub kind: TokenKind,
  /// Source spelling, used in diagnostics.
  pub text: String,
  pub line: u32,
}

impl Token {
  pub fn is_punct(&self, p: &str) -> bool {
    matches!(self.kind, TokenKind::Punct(q) if q == p)
  }

  pub fn is_ident(&self, name: &str) -> bool {
    matches!(self.kind, TokenKind::Ident(ref n) if n == name)
  }
}

// Longest first.
const PUNCTUATORS: &[&str] = &[
  "++", "--", "<=", ">=", "==", "!=", "&&", "||", "^^", "+=", "-=", "*=", "/=", "(", ")", "[", "]",
  "{", "}", ".", ",", ";", ":", "?", "+", "-", "*", "/", "!", "<", ">", "=",
];

// Operators reserved by the language but not usable.
const RESERVED_OPERATORS: &[&str] = &[
  "<<=", ">>=", "%=", "&=", "|=", "^=", "<<", ">>", "%", "&", "|", "^", "~",
];

struct Lexer<'a> {
  src: &'a [u8],
  pos: usize,
  line: u32,
  tokens: Vec<Token>,
}

/// Split `src` into tokens, the last one being [`TokenKind::Eof`].
pub fn tokenize(src: &str) -> Result<Vec<Token>, Diagnostic> {
  let mut lexer = Lexer {
    src: src.as_bytes(),
    pos: 0,
    line: 1,
    tokens: Vec::new(),
  };

  lexer.run()?;

  let line = lexer.line;
  lexer.tokens.push(Token {
    kind: TokenKind::Eof,
    text: String::new(),
    line,
  });

  Ok(lexer.tokens)
}

impl<'a> Lexer<'a> {
  fn peek(&self, offset: usize) -> u8 {
    self.src.get(self.pos + offset).copied().unwrap_or(0)
  }

  fn text(&self, start: usize) -> String {
    String::from_utf8_lossy(&self.src[start..self.pos]).into_owned()
  }

  fn push(&mut self, kind: TokenKind, start: usize) {
    let text = self.text(start);
    let line = self.line;
    self.tokens.push(Token { kind, text, line });
  }

  fn run(&mut self) -> Result<(), Diagnostic> {
    // whether only whitespace has been seen on the current line
    let mut line_start = true;

    while self.pos < self.src.len() {
      let c = self.peek(0);

      match c {
        b'\n' => {
          self.line += 1;
          self.pos += 1;
          line_start = true;
        }

        b' ' | b'\t' | b'\r' | 0x0b | 0x0c => self.pos += 1,

        b'/' if self.peek(1) == b'/' => {
          while self.pos < self.src.len() && self.peek(0) != b'\n' {
            self.pos += 1;
          }
        }

        b'/' if self.peek(1) == b'*' => self.block_comment()?,

        b'#' if line_start => self.directive()?,

        _ => {
          line_start = false;

          if c.is_ascii_alphabetic() || c == b'_' {
            self.identifier();
          } else if c.is_ascii_digit() || (c == b'.' && self.peek(1).is_ascii_digit()) {
            self.number()?;
          } else {
            self.punctuator()?;
          }
        }
      }
    }

    Ok(())
  }

  fn block_comment(&mut self) -> Result<(), Diagnostic> {
    let line = self.line;
    self.pos += 2;

    loop {
      match self.peek(0) {
        0 if self.pos >= self.src.len() => {
          return Err(Diagnostic::new(line, "/*", "unterminated comment"));
        }
        b'*' if self.peek(1) == b'/' => {
          self.pos += 2;
          return Ok(());
        }
        b'\n' => {
          self.line += 1;
          self.pos += 1;
        }
        _ => self.pos += 1,
      }
    }
  }

  fn directive(&mut self) -> Result<(), Diagnostic> {
    let start = self.pos;

    while self.pos < self.src.len() && self.peek(0) != b'\n' {
      self.pos += 1;
    }

    let text = self.text(start);
    let mut words = text[1..].split_whitespace();

    match words.next() {
      // null directive
      None => Ok(()),

      Some("version") => {
        if !self.tokens.is_empty() {
          return Err(Diagnostic::new(
            self.line,
            "#version",
            "must occur before any other statement in the program",
          ));
        }

        match (words.next(), words.next()) {
          (Some("100"), None) => Ok(()),
          (Some(v), _) => Err(Diagnostic::new(self.line, v, "version number not supported")),
          (None, _) => Err(Diagnostic::new(self.line, "#version", "version number expected")),
        }
      }

      Some(name) => Err(Diagnostic::new(
        self.line,
        &format!("#{}", name),
        "preprocessor directive not supported",
      )),
    }
  }

  fn identifier(&mut self) {
    let start = self.pos;

    while self.peek(0).is_ascii_alphanumeric() || self.peek(0) == b'_' {
      self.pos += 1;
    }

    let text = self.text(start);
    let kind = match text.as_str() {
      "true" => TokenKind::BoolConst(true),
      "false" => TokenKind::BoolConst(false),
      _ => TokenKind::Ident(text),
    };

    self.push(kind, start);
  }

  fn number(&mut self) -> Result<(), Diagnostic> {
    let start = self.pos;

    if self.peek(0) == b'0' && matches!(self.peek(1), b'x' | b'X') {
      self.pos += 2;

      while self.peek(0).is_ascii_hexdigit() {
        self.pos += 1;
      }

      let digits = self.text(start + 2);
      let value = i64::from_str_radix(&digits, 16).ok();
      return self.finish_int(start, value);
    }

    let mut is_float = false;

    while self.peek(0).is_ascii_digit() {
      self.pos += 1;
    }

    if self.peek(0) == b'.' {
      is_float = true;
      self.pos += 1;

      while self.peek(0).is_ascii_digit() {
        self.pos += 1;
      }
    }

    if matches!(self.peek(0), b'e' | b'E') {
      let save = self.pos;
      self.pos += 1;

      if matches!(self.peek(0), b'+' | b'-') {
        self.pos += 1;
      }

      if self.peek(0).is_ascii_digit() {
        is_float = true;

        while self.peek(0).is_ascii_digit() {
          self.pos += 1;
        }
      } else {
        self.pos = save;
      }
    }

    if is_float {
      self.reject_suffix(start)?;

      let text = self.text(start);
      let value = text
        .parse::<f32>()
        .map_err(|_| Diagnostic::new(self.line, &text, "invalid floating-point constant"))?;
      self.push(TokenKind::FloatConst(value), start);
      Ok(())
    } else {
      let text = self.text(start);
      let value = if text.len() > 1 && text.starts_with('0') {
        i64::from_str_radix(&text[1..], 8).ok()
      } else {
        text.parse::<i64>().ok()
      };

      self.finish_int(start, value)
    }
  }

  fn finish_int(&mut self, start: usize, value: Option<i64>) -> Result<(), Diagnostic> {
    self.reject_suffix(start)?;

    let text = self.text(start);

    match value {
      Some(v) if v <= i32::MAX as i64 => {
        self.push(TokenKind::IntConst(v as i32), start);
        Ok(())
      }
      Some(_) => Err(Diagnostic::new(self.line, &text, "integer constant overflow")),
      None => Err(Diagnostic::new(self.line, &text, "invalid integer constant")),
    }
  }

  // Numeric literals cannot be directly followed by identifier characters (no suffixes).
  fn reject_suffix(&mut self, start: usize) -> Result<(), Diagnostic> {
    if self.peek(0).is_ascii_alphanumeric() || self.peek(0) == b'_' {
      while self.peek(0).is_ascii_alphanumeric() || self.peek(0) == b'_' {
        self.pos += 1;
      }

      let text = self.text(start);
      return Err(Diagnostic::new(self.line, &text, "invalid numeric literal"));
    }

    Ok(())
  }

  fn punctuator(&mut self) -> Result<(), Diagnostic> {
    let rest = &self.src[self.pos..];

    if let Some(op) = RESERVED_OPERATORS
      .iter()
      .find(|op| rest.starts_with(op.as_bytes()))
    {
      return Err(Diagnostic::new(self.line, op, "reserved operator"));
    }

    match PUNCTUATORS.iter().find(|p| rest.starts_with(p.as_bytes())) {
      Some(p) => {
        let start = self.pos;
        self.pos += p.len();
        self.push(TokenKind::Punct(*p), start);
        Ok(())
      }

      None => {
        // the whole character, which may span several bytes
        let c: String = String::from_utf8_lossy(rest).chars().take(1).collect();
        Err(Diagnostic::new(self.line, &c, "unexpected character"))
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn kinds(src: &str) -> Vec<TokenKind> {
    tokenize(src).unwrap().into_iter().map(|t| t.kind).collect()
  }

  #[test]
  fn declaration() {
    assert_eq!(
      kinds("attribute vec4 a_position;"),
      vec![
        TokenKind::Ident("attribute".to_owned()),
        TokenKind::Ident("vec4".to_owned()),
        TokenKind::Ident("a_position".to_owned()),
        TokenKind::Punct(";"),
        TokenKind::Eof,
      ]
    );
  }

  #[test]
  fn numbers() {
    assert_eq!(
      kinds("1 0.5 .25 2e1 1.5E-1 0x1F 010 true"),
      vec![
        TokenKind::IntConst(1),
        TokenKind::FloatConst(0.5),
        TokenKind::FloatConst(0.25),
        TokenKind::FloatConst(20.),
        TokenKind::FloatConst(0.15),
        TokenKind::IntConst(31),
        TokenKind::IntConst(8),
        TokenKind::BoolConst(true),
        TokenKind::Eof,
      ]
    );
  }

  #[test]
  fn comments_and_lines() {
    let tokens = tokenize("// hello\n/* multi\nline */ x\n#version 100\ny").unwrap_err();
    assert_eq!(tokens.line, 4);
    assert_eq!(tokens.token, "#version");

    let tokens = tokenize("#version 100\n// hello\n/* multi\nline */ x").unwrap();
    assert_eq!(tokens[0].line, 4);
    assert!(tokens[0].is_ident("x"));
  }

  #[test]
  fn operators() {
    let tokens = tokenize("a += b++ && !c").unwrap();
    assert!(tokens[1].is_punct("+="));
    assert!(tokens[3].is_punct("++"));
    assert!(tokens[4].is_punct("&&"));
    assert!(tokens[5].is_punct("!"));
  }

  #[test]
  fn rejections() {
    assert_eq!(tokenize("a % b").unwrap_err().token, "%");
    assert_eq!(tokenize("1.0f").unwrap_err().token, "1.0f");
    assert_eq!(tokenize("#define X 1").unwrap_err().token, "#define");
    assert_eq!(tokenize("#version 300 es").unwrap_err().token, "300");
    assert_eq!(tokenize("a @ b").unwrap_err().token, "@");
    assert_eq!(tokenize("float é;").unwrap_err().token, "é");
    assert_eq!(
      tokenize("x\n  aé").unwrap_err().to_string(),
      "ERROR: 0:2: 'é' : unexpected character"
    );
    assert_eq!(tokenize("/* open").unwrap_err().token, "/*");
  }
}
