//! Recursive-descent parser with precedence climbing (§4.6).
//!
//! Grammar (EBNF, normative):
//!
//! ```text
//! unit        := glob_decl*
//! glob_decl   := base_type ptr_suffix ident
//!                ( ';'
//!                | '(' params? ')' ( block | ';' ) )
//! params      := param ( ',' param )*
//! param       := base_type ptr_suffix ident
//! block       := '{' stmt* '}'
//! stmt        := ';'+ stmt | decl ';' | block | 'return' expr? ';' | expr ';'
//! decl        := base_type ptr_suffix ident
//! expr        := assign
//! assign      := binary ( '=' binary )?
//! binary      := unary ( binop unary )*
//! unary       := '-' unary | '+' postfix | postfix
//! postfix     := primary ( '(' arglist? ')' )*
//! primary     := integer | ident | '(' expr ')'
//! base_type   := 'int'
//! ptr_suffix  := '*'*
//! ```

use smallvec::SmallVec;
use crate::ast::{BinOp, Decl, Expr, ExprList, GlobDecl, Stmt, TranslationUnit, UnOp};
use crate::diagnostics::CompileError;
use crate::intern::{Interner, Symbol};
use crate::lexer::{Lexer, Token, TokenKind};
use crate::types::Types;

/// Ceiling used by `assign` to parse its left operand and, on the
/// right-associative path, its right operand — both at the same
/// artificially-high ceiling so no binary operator is consumed by either
/// call; only `=` itself is (§9 Open Question (b)).
const ASSIGN_CEILING: u32 = 999;

fn binop_prec(kind: TokenKind) -> Option<(BinOp, u32)> {
  match kind {
    TokenKind::Star => Some((BinOp::Mul, 0)),
    TokenKind::Slash => Some((BinOp::Div, 0)),
    TokenKind::Percent => Some((BinOp::Mod, 0)),
    TokenKind::Plus => Some((BinOp::Add, 1)),
    TokenKind::Minus => Some((BinOp::Sub, 1)),
    _ => None,
  }
}

pub struct Parser<'a, 'b> {
  lexer: Lexer<'a>,
  interner: &'b mut Interner,
  types: &'b mut Types,
}

impl<'a, 'b> Parser<'a, 'b> {
  pub fn new(src: &'a str, interner: &'b mut Interner, types: &'b mut Types) -> Self {
    Self { lexer: Lexer::new(src, interner), interner, types }
  }

  /// Peeks the next token's kind only. Never swallows a lexical error
  /// silently — any error here also surfaces from the `bump` that follows,
  /// since a failing scan never advances past the offending input.
  fn peek(&mut self) -> Result<TokenKind, CompileError> {
    Ok(self.lexer.peek(self.interner)?.kind)
  }

  /// Consumes and returns the full next token, line included. This is the
  /// only way the parser advances — every line number used in a
  /// diagnostic comes from the token actually consumed, never from a
  /// separate peek, so there's no risk of a peek's error silently
  /// advancing past input a later call then fails to re-observe.
  fn bump(&mut self) -> Result<Token, CompileError> {
    self.lexer.next(self.interner)
  }

  fn expect(&mut self, want: TokenKind, what: &str) -> Result<(), CompileError> {
    let got = self.bump()?;
    if got.kind == want { Ok(()) } else { Err(CompileError::syntax(format!("expected {what}, found {:?}", got.kind), got.line)) }
  }

  fn expect_ident(&mut self, what: &str) -> Result<Symbol, CompileError> {
    let got = self.bump()?;
    match got.kind {
      TokenKind::Ident(sym) => Ok(sym),
      other => Err(CompileError::syntax(format!("expected {what}, found {other:?}"), got.line)),
    }
  }

  /// `unit := glob_decl*`
  pub fn parse_unit(&mut self) -> Result<TranslationUnit, CompileError> {
    let mut decls = Vec::new();
    while self.peek()? != TokenKind::Eof {
      decls.push(self.parse_glob_decl()?);
    }
    Ok(TranslationUnit { decls })
  }

  /// `base_type ptr_suffix` — `crate::types::Type` for the declared base,
  /// already wrapped in as many `ptr()` layers as leading `*`s.
  fn parse_base_type(&mut self) -> Result<crate::types::Type, CompileError> {
    let got = self.bump()?;
    match got.kind {
      TokenKind::KwInt => {}
      other => return Err(CompileError::syntax(format!("expected type, found {other:?}"), got.line)),
    }
    let mut ty = self.types.int();
    while self.peek()? == TokenKind::Star {
      self.bump()?;
      ty = self.types.ptr(ty);
    }
    Ok(ty)
  }

  /// `glob_decl := base_type ptr_suffix ident ( ';' | '(' params? ')' ( block | ';' ) )`
  fn parse_glob_decl(&mut self) -> Result<GlobDecl, CompileError> {
    let ty = self.parse_base_type()?;
    let id = self.expect_ident("a declared name")?;
    if self.peek()? == TokenKind::LParen {
      self.bump()?;
      let params = if self.peek()? == TokenKind::RParen { Vec::new() } else { self.parse_params()? };
      self.expect(TokenKind::RParen, "')'")?;
      let func_ty = self.types.func(ty, params);
      let body = if self.peek()? == TokenKind::LBrace {
        Some(self.parse_block()?)
      } else {
        self.expect(TokenKind::Semi, "';'")?;
        None
      };
      Ok(GlobDecl::Func { id, ty: func_ty, body })
    } else {
      self.expect(TokenKind::Semi, "';'")?;
      Ok(GlobDecl::Var { id, ty })
    }
  }

  /// `params := param ( ',' param )*`
  fn parse_params(&mut self) -> Result<Vec<crate::types::FuncParam>, CompileError> {
    let mut params = Vec::new();
    loop {
      let ty = self.parse_base_type()?;
      let id = self.expect_ident("a parameter name")?;
      params.push(crate::types::FuncParam { id, ty });
      if self.peek()? == TokenKind::Comma { self.bump()?; } else { break }
    }
    Ok(params)
  }

  /// `block := '{' stmt* '}'`
  fn parse_block(&mut self) -> Result<Vec<Stmt>, CompileError> {
    self.expect(TokenKind::LBrace, "'{'")?;
    let mut stmts = Vec::new();
    while self.peek()? != TokenKind::RBrace {
      stmts.push(self.parse_stmt()?);
    }
    self.bump()?;
    Ok(stmts)
  }

  /// `stmt := ';'+ stmt | decl ';' | block | 'return' expr? ';' | expr ';'`
  fn parse_stmt(&mut self) -> Result<Stmt, CompileError> {
    while self.peek()? == TokenKind::Semi {
      self.bump()?;
    }
    match self.peek()? {
      TokenKind::LBrace => Ok(Stmt::Block(self.parse_block()?)),
      TokenKind::KwReturn => {
        self.bump()?;
        let value = if self.peek()? == TokenKind::Semi { None } else { Some(self.parse_expr()?) };
        self.expect(TokenKind::Semi, "';'")?;
        Ok(Stmt::Return(value))
      }
      TokenKind::KwInt => {
        let decl = self.parse_decl()?;
        self.expect(TokenKind::Semi, "';'")?;
        Ok(Stmt::Decl(decl))
      }
      _ => {
        let e = self.parse_expr()?;
        self.expect(TokenKind::Semi, "';'")?;
        Ok(Stmt::Expr(e))
      }
    }
  }

  /// `decl := base_type ptr_suffix ident`
  fn parse_decl(&mut self) -> Result<Decl, CompileError> {
    let ty = self.parse_base_type()?;
    let id = self.expect_ident("a declared name")?;
    Ok(Decl { ty, id })
  }

  /// `expr := assign`
  fn parse_expr(&mut self) -> Result<Expr, CompileError> {
    self.parse_assign()
  }

  /// `assign := binary ( '=' binary )?`, right-associative, via the
  /// ceiling-999 double call (§9 Open Question (b)): neither the left nor
  /// the right operand of `=` will itself greedily consume a further `=`,
  /// so chained assignment `a = b = c` parses as `a = (b = c)` only because
  /// this function recurses into itself for the right-hand side, not
  /// because `binary` does.
  fn parse_assign(&mut self) -> Result<Expr, CompileError> {
    let lhs = self.parse_binary(ASSIGN_CEILING)?;
    if self.peek()? == TokenKind::Equal {
      self.bump()?;
      let rhs = self.parse_assign()?;
      Ok(Expr::Binary(BinOp::Assign, Box::new(lhs), Box::new(rhs)))
    } else {
      Ok(lhs)
    }
  }

  /// `binary := unary ( binop unary )*`, precedence climbing: an operator
  /// is consumed only when its precedence is strictly less than `ceiling`.
  fn parse_binary(&mut self, ceiling: u32) -> Result<Expr, CompileError> {
    let mut lhs = self.parse_unary()?;
    loop {
      let Some((op, prec)) = binop_prec(self.peek()?) else { break };
      if prec >= ceiling { break }
      self.bump()?;
      let rhs = self.parse_binary(prec)?;
      lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
    }
    Ok(lhs)
  }

  /// `unary := '-' unary | '+' postfix | postfix`
  fn parse_unary(&mut self) -> Result<Expr, CompileError> {
    match self.peek()? {
      TokenKind::Minus => {
        self.bump()?;
        Ok(Expr::Unary(UnOp::Neg, Box::new(self.parse_unary()?)))
      }
      TokenKind::Plus => {
        self.bump()?;
        self.parse_postfix()
      }
      _ => self.parse_postfix(),
    }
  }

  /// `postfix := primary ( '(' arglist? ')' )*`
  fn parse_postfix(&mut self) -> Result<Expr, CompileError> {
    let mut e = self.parse_primary()?;
    while self.peek()? == TokenKind::LParen {
      self.bump()?;
      let args: ExprList = if self.peek()? == TokenKind::RParen {
        SmallVec::new()
      } else {
        self.parse_arglist()?
      };
      self.expect(TokenKind::RParen, "')'")?;
      e = Expr::Call(Box::new(e), args);
    }
    Ok(e)
  }

  /// Each argument parses at the assignment ceiling, so a bare `,`
  /// terminates it; built in source order (no reversal pass — REDESIGN).
  fn parse_arglist(&mut self) -> Result<ExprList, CompileError> {
    let mut args = SmallVec::new();
    loop {
      args.push(self.parse_binary(ASSIGN_CEILING)?);
      if self.peek()? == TokenKind::Comma { self.bump()?; } else { break }
    }
    Ok(args)
  }

  /// `primary := integer | ident | '(' expr ')'`
  fn parse_primary(&mut self) -> Result<Expr, CompileError> {
    let got = self.bump()?;
    match got.kind {
      TokenKind::IntLit(v) => Ok(Expr::IntLit(v)),
      TokenKind::Ident(sym) => Ok(Expr::Id(sym)),
      TokenKind::LParen => {
        let e = self.parse_expr()?;
        self.expect(TokenKind::RParen, "')'")?;
        Ok(e)
      }
      other => Err(CompileError::syntax(format!("expected an expression, found {other:?}"), got.line)),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn parse(src: &str) -> (TranslationUnit, Interner) {
    let mut interner = Interner::new();
    let mut types = Types::new();
    let unit = {
      let mut parser = Parser::new(src, &mut interner, &mut types);
      parser.parse_unit().unwrap()
    };
    (unit, interner)
  }

  #[test]
  fn empty_unit() {
    let (unit, _) = parse("");
    assert!(unit.decls.is_empty());
  }

  #[test]
  fn global_var_decl() {
    let (unit, _) = parse("int x;");
    assert!(matches!(&unit.decls[0], GlobDecl::Var { .. }));
  }

  #[test]
  fn pointer_suffix_nests_type() {
    let (unit, _) = parse("int *p;");
    let GlobDecl::Var { ty, .. } = &unit.decls[0] else { panic!() };
    assert!(matches!(ty, crate::types::Type::Ptr(_)));
  }

  #[test]
  fn function_forward_decl_has_no_body() {
    let (unit, _) = parse("int putchar(int c);");
    let GlobDecl::Func { body, .. } = &unit.decls[0] else { panic!() };
    assert!(body.is_none());
  }

  #[test]
  fn function_with_body() {
    let (unit, _) = parse("int main() { return 0; }");
    let GlobDecl::Func { body, .. } = &unit.decls[0] else { panic!() };
    assert_eq!(body.as_ref().unwrap().len(), 1);
  }

  #[test]
  fn arithmetic_precedence() {
    let (unit, _) = parse("int main() { return 1+2*3; }");
    let GlobDecl::Func { body, .. } = &unit.decls[0] else { panic!() };
    let Stmt::Return(Some(Expr::Binary(BinOp::Add, l, r))) = &body.as_ref().unwrap()[0] else { panic!() };
    assert!(matches!(**l, Expr::IntLit(1)));
    assert!(matches!(**r, Expr::Binary(BinOp::Mul, _, _)));
  }

  #[test]
  fn assignment_is_right_associative() {
    let (unit, _) = parse("int main() { a = b = c; }");
    let GlobDecl::Func { body, .. } = &unit.decls[0] else { panic!() };
    let Stmt::Expr(Expr::Binary(BinOp::Assign, _, rhs)) = &body.as_ref().unwrap()[0] else { panic!() };
    assert!(matches!(**rhs, Expr::Binary(BinOp::Assign, _, _)));
  }

  #[test]
  fn call_arguments_preserve_source_order() {
    let (unit, interner) = parse("int main() { f(1, 2, 3); }");
    let GlobDecl::Func { body, .. } = &unit.decls[0] else { panic!() };
    let Stmt::Expr(Expr::Call(_, args)) = &body.as_ref().unwrap()[0] else { panic!() };
    let vals: Vec<_> = args.iter().map(|a| match a { Expr::IntLit(v) => *v, _ => panic!() }).collect();
    assert_eq!(vals, vec![1, 2, 3]);
    let _ = interner;
  }

  #[test]
  fn stray_semicolons_are_skipped_before_a_statement() {
    let (unit, _) = parse("int main() { ; return 0; }");
    let GlobDecl::Func { body, .. } = &unit.decls[0] else { panic!() };
    let body = body.as_ref().unwrap();
    assert_eq!(body.len(), 1);
    assert!(matches!(body[0], Stmt::Return(Some(Expr::IntLit(0)))));

    let (unit, _) = parse("int main() { x = 1;; return x; }");
    let GlobDecl::Func { body, .. } = &unit.decls[0] else { panic!() };
    let body = body.as_ref().unwrap();
    assert_eq!(body.len(), 2);
    assert!(matches!(body[0], Stmt::Expr(Expr::Binary(BinOp::Assign, _, _))));
    assert!(matches!(body[1], Stmt::Return(Some(Expr::Id(_)))));
  }

  #[test]
  fn if_keyword_is_not_a_production() {
    let mut interner = Interner::new();
    let mut types = Types::new();
    let mut parser = Parser::new("int main() { if; }", &mut interner, &mut types);
    assert!(parser.parse_unit().is_err());
  }

  #[test]
  fn unexpected_token_is_syntax_error_with_line() {
    let mut interner = Interner::new();
    let mut types = Types::new();
    let mut parser = Parser::new("int main() {\n  +;\n}", &mut interner, &mut types);
    let err = parser.parse_unit().unwrap_err();
    assert!(matches!(err, CompileError::Syntax { line: 2, .. }));
  }
}
