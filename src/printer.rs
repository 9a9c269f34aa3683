//! A deterministic s-expression printer for any AST stage (parsed,
//! checked, or lowered — the shape never changes between stages).
//!
//! This is what parse-then-print determinism exercises, and what
//! `CompileOptions::dump_ast`/`dump_irc` render for debugging.

use std::fmt::Write as _;
use itertools::Itertools as _;
use crate::ast::{BinOp, Decl, Expr, GlobDecl, Stmt, TranslationUnit, UnOp};
use crate::intern::Interner;
use crate::types::Type;

/// Renders AST nodes to a deterministic parenthesized text form.
pub struct Printer<'a> {
  interner: &'a Interner,
}

impl<'a> Printer<'a> {
  #[must_use] pub fn new(interner: &'a Interner) -> Self { Self { interner } }

  #[must_use] pub fn print_unit(&self, unit: &TranslationUnit) -> String {
    let mut out = String::new();
    for decl in &unit.decls {
      self.print_glob_decl(&mut out, decl);
      out.push('\n');
    }
    out
  }

  fn print_type(&self, out: &mut String, ty: &Type) {
    match ty {
      Type::Void => out.push_str("void"),
      Type::Char => out.push_str("char"),
      Type::Int => out.push_str("int"),
      Type::Ptr(base) => { out.push_str("ptr to "); self.print_type(out, base) }
      Type::Func(sig) => { out.push_str("func -> "); self.print_type(out, &sig.ret) }
    }
  }

  fn print_decl(&self, out: &mut String, decl: &Decl) {
    let _ = write!(out, "(var {} ", self.interner.resolve(decl.id));
    self.print_type(out, &decl.ty);
    out.push(')');
  }

  fn print_expr(&self, out: &mut String, expr: &Expr) {
    match expr {
      Expr::Id(id) => out.push_str(self.interner.resolve(*id)),
      Expr::IntLit(v) => { let _ = write!(out, "{v}"); }
      Expr::Call(callee, args) => {
        out.push_str("(call ");
        self.print_expr(out, callee);
        let rendered: String = args
          .iter()
          .map(|arg| { let mut s = String::new(); self.print_expr(&mut s, arg); s })
          .join(" ");
        if !rendered.is_empty() {
          out.push(' ');
          out.push_str(&rendered);
        }
        out.push(')');
      }
      Expr::Unary(UnOp::Neg, l) => {
        out.push_str("(- ");
        self.print_expr(out, l);
        out.push(')');
      }
      Expr::Binary(op, l, r) => {
        let _ = write!(out, "({} ", op.as_str());
        self.print_expr(out, l);
        out.push(' ');
        self.print_expr(out, r);
        out.push(')');
      }
    }
  }

  fn print_stmt(&self, out: &mut String, indent: usize, stmt: &Stmt) {
    for _ in 0..indent { out.push_str("  "); }
    match stmt {
      Stmt::Decl(d) => self.print_decl(out, d),
      Stmt::Expr(e) => self.print_expr(out, e),
      Stmt::Block(stmts) => {
        out.push_str("(\n");
        for s in stmts {
          self.print_stmt(out, indent + 1, s);
          out.push('\n');
        }
        for _ in 0..indent { out.push_str("  "); }
        out.push(')');
      }
      Stmt::Return(e) => {
        out.push_str("(ret");
        if let Some(e) = e {
          out.push(' ');
          self.print_expr(out, e);
        }
        out.push(')');
      }
    }
  }

  fn print_glob_decl(&self, out: &mut String, decl: &GlobDecl) {
    match decl {
      GlobDecl::Var { id, ty } => {
        let _ = write!(out, "(var {} ", self.interner.resolve(*id));
        self.print_type(out, ty);
        out.push(')');
      }
      GlobDecl::Func { id, ty, body } => {
        let ret = ty.as_func().map_or(ty.clone(), |sig| sig.ret.clone());
        let _ = write!(out, "(func {} ", self.interner.resolve(*id));
        self.print_type(out, &ret);
        if let Some(body) = body {
          out.push('\n');
          self.print_stmt(out, 0, &Stmt::Block(body.clone()));
        }
        out.push(')');
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::compiler::Compiler;

  #[test]
  fn printing_is_deterministic() {
    let src = "int main() { return 1+2*3; }";
    let mut c1 = Compiler::default();
    let unit1 = c1.parse(src).unwrap();
    let mut c2 = Compiler::default();
    let unit2 = c2.parse(src).unwrap();
    let p1 = Printer::new(c1.interner()).print_unit(&unit1);
    let p2 = Printer::new(c2.interner()).print_unit(&unit2);
    assert_eq!(p1, p2);
  }
}
