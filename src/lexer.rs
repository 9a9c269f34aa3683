//! The lexer: a peekable token stream over one ASCII source buffer (§4.5).
//!
//! `peek()` is a one-token lookahead buffer rather than a re-lex from a
//! saved position — idempotent and free of redundant work, unlike the
//! original's save-position-and-rescan approach (REDESIGN NOTES); the
//! sequence of tokens produced is identical either way.

use crate::diagnostics::CompileError;
use crate::intern::{Interner, Symbol};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
  Eof,
  Ident(Symbol),
  IntLit(u32),
  LParen,
  RParen,
  LBrace,
  RBrace,
  Semi,
  Comma,
  Star,
  Slash,
  Percent,
  Plus,
  Minus,
  Equal,
  KwInt,
  KwReturn,
  /// Recognized but never produced by the parser (§9 Open Question (d)).
  KwIf,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Token {
  pub kind: TokenKind,
  pub line: u32,
}

/// Pre-interned identities for the three keywords, so keyword recognition
/// is a `Symbol` comparison rather than a string comparison.
struct Keywords {
  int: Symbol,
  return_: Symbol,
  if_: Symbol,
}

impl Keywords {
  fn new(interner: &mut Interner) -> Self {
    Self { int: interner.intern("int"), return_: interner.intern("return"), if_: interner.intern("if") }
  }
}

pub struct Lexer<'a> {
  src: &'a [u8],
  pos: usize,
  line: u32,
  keywords: Keywords,
  peeked: Option<Token>,
}

impl<'a> Lexer<'a> {
  pub fn new(src: &'a str, interner: &mut Interner) -> Self {
    Self { src: src.as_bytes(), pos: 0, line: 1, keywords: Keywords::new(interner), peeked: None }
  }

  #[must_use] pub fn line(&self) -> u32 { self.line }

  fn byte(&self) -> Option<u8> { self.src.get(self.pos).copied() }

  fn bump(&mut self) -> Option<u8> {
    let b = self.byte()?;
    self.pos += 1;
    if b == b'\n' { self.line += 1; }
    Some(b)
  }

  fn skip_trivia(&mut self) -> Result<(), CompileError> {
    while let Some(b) = self.byte() {
      if b.is_ascii_whitespace() {
        self.bump();
      } else {
        break;
      }
    }
    Ok(())
  }

  fn scan_ident(&mut self, interner: &mut Interner) -> TokenKind {
    let start = self.pos;
    while matches!(self.byte(), Some(b) if b.is_ascii_alphanumeric() || b == b'_') {
      self.bump();
    }
    let text = std::str::from_utf8(&self.src[start..self.pos]).expect("ASCII-checked above");
    let sym = interner.intern(text);
    if sym == self.keywords.int { TokenKind::KwInt }
    else if sym == self.keywords.return_ { TokenKind::KwReturn }
    else if sym == self.keywords.if_ { TokenKind::KwIf }
    else { TokenKind::Ident(sym) }
  }

  fn scan_int(&mut self) -> Result<TokenKind, CompileError> {
    let start = self.pos;
    while matches!(self.byte(), Some(b) if b.is_ascii_digit()) {
      self.bump();
    }
    let text = std::str::from_utf8(&self.src[start..self.pos]).expect("ASCII-checked above");
    let value = text.parse::<u32>()
      .map_err(|_| CompileError::lexical(format!("integer literal '{text}' out of range"), self.line))?;
    Ok(TokenKind::IntLit(value))
  }

  fn scan(&mut self, interner: &mut Interner) -> Result<Token, CompileError> {
    self.skip_trivia()?;
    let line = self.line;
    let Some(b) = self.byte() else { return Ok(Token { kind: TokenKind::Eof, line }) };

    if !b.is_ascii() {
      return Err(CompileError::lexical(format!("non-ASCII byte 0x{b:02x}"), line));
    }

    let kind = match b {
      b'(' => { self.bump(); TokenKind::LParen }
      b')' => { self.bump(); TokenKind::RParen }
      b'{' => { self.bump(); TokenKind::LBrace }
      b'}' => { self.bump(); TokenKind::RBrace }
      b';' => { self.bump(); TokenKind::Semi }
      b',' => { self.bump(); TokenKind::Comma }
      b'*' => { self.bump(); TokenKind::Star }
      b'/' => { self.bump(); TokenKind::Slash }
      b'%' => { self.bump(); TokenKind::Percent }
      b'+' => { self.bump(); TokenKind::Plus }
      b'-' => { self.bump(); TokenKind::Minus }
      b'=' => { self.bump(); TokenKind::Equal }
      b'0'..=b'9' => self.scan_int()?,
      b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.scan_ident(interner),
      other => return Err(CompileError::lexical(format!("unexpected character '{}'", other as char), line)),
    };
    Ok(Token { kind, line })
  }

  /// Return the next token without consuming it. Repeated calls without an
  /// intervening [`next`](Self::next) return the same token.
  pub fn peek(&mut self, interner: &mut Interner) -> Result<Token, CompileError> {
    if self.peeked.is_none() {
      self.peeked = Some(self.scan(interner)?);
    }
    Ok(self.peeked.expect("just filled"))
  }

  /// Consume and return the next token.
  pub fn next(&mut self, interner: &mut Interner) -> Result<Token, CompileError> {
    if let Some(tok) = self.peeked.take() { return Ok(tok) }
    self.scan(interner)
  }
}
