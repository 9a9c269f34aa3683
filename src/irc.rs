//! IR-C lowering: normalizes the checked AST into a three-address-like
//! form where every unary/binary/call operand is an atom (§4.8).
//!
//! The output reuses the same [`crate::ast`] node types as the parsed
//! AST — only the normal-form invariant (no nested non-atomic operands)
//! distinguishes "lowered" from "checked".

use crate::ast::{BinOp, Expr, GlobDecl, Stmt, TranslationUnit};
use crate::diagnostics::CompileError;
use crate::intern::{Interner, Symbol};
use crate::sema::{init_builtin_syms, Analyzer};
use crate::sym_table::SymTable;
use crate::types::{Type, Types};

/// Lowers a checked [`TranslationUnit`] to IR-C normal form.
///
/// Rebuilds its own symbol table while walking (mirroring the code
/// generator's from-scratch rebuild, one stage earlier) purely to recover
/// each subexpression's type for freshly-allocated temporaries — the AST
/// itself carries no type annotations.
pub struct IrcLowerer<'a> {
  interner: &'a mut Interner,
  types: &'a mut Types,
  syms: SymTable,
  /// Shared across the whole unit; never reset between functions, so every
  /// `___t<N>` name is globally unique (testable property: temporary
  /// freshness).
  temp_counter: u32,
}

impl<'a> IrcLowerer<'a> {
  pub fn new(interner: &'a mut Interner, types: &'a mut Types) -> Self {
    let mut syms = SymTable::new();
    init_builtin_syms(interner, types, &mut syms);
    Self { interner, types, syms, temp_counter: 0 }
  }

  pub fn lower_unit(&mut self, unit: &TranslationUnit) -> Result<TranslationUnit, CompileError> {
    for decl in &unit.decls {
      let (id, ty) = match decl {
        GlobDecl::Var { id, ty } => (*id, ty.clone()),
        GlobDecl::Func { id, ty, .. } => (*id, ty.clone()),
      };
      if self.syms.get(id).is_none() {
        let idx = self.syms.add(id, ty);
        self.syms.get_at_mut(idx).global = true;
      }
    }
    let mut decls = Vec::with_capacity(unit.decls.len());
    for decl in &unit.decls {
      decls.push(self.lower_glob_decl(decl)?);
    }
    Ok(TranslationUnit { decls })
  }

  fn lower_glob_decl(&mut self, decl: &GlobDecl) -> Result<GlobDecl, CompileError> {
    match decl {
      GlobDecl::Var { id, ty } => Ok(GlobDecl::Var { id: *id, ty: ty.clone() }),
      GlobDecl::Func { id, ty, body } => {
        let body = body.as_ref().map(|stmts| self.lower_block(stmts)).transpose()?;
        Ok(GlobDecl::Func { id: *id, ty: ty.clone(), body })
      }
    }
  }

  fn fresh_temp(&mut self) -> Symbol {
    let name = format!("___t{}", self.temp_counter);
    self.temp_counter += 1;
    self.interner.intern(&name)
  }

  fn expr_type(&mut self, expr: &Expr) -> Result<Type, CompileError> {
    Analyzer::new(self.interner, self.types, &mut self.syms).eval_expr_type(expr)
  }

  /// Opens a nested emission context: statements produced while lowering
  /// this block append to a fresh buffer, not the caller's.
  fn lower_block(&mut self, stmts: &[Stmt]) -> Result<Vec<Stmt>, CompileError> {
    let mark = self.syms.mark();
    let mut out = Vec::new();
    for stmt in stmts {
      self.lower_stmt(&mut out, stmt)?;
    }
    self.syms.rewind(mark);
    Ok(out)
  }

  fn lower_stmt(&mut self, out: &mut Vec<Stmt>, stmt: &Stmt) -> Result<(), CompileError> {
    match stmt {
      Stmt::Decl(decl) => {
        self.syms.add(decl.id, decl.ty.clone());
        out.push(Stmt::Decl(decl.clone()));
      }
      Stmt::Expr(e) => {
        self.store(out, e, true)?;
      }
      Stmt::Block(stmts) => {
        out.push(Stmt::Block(self.lower_block(stmts)?));
      }
      Stmt::Return(Some(e)) => {
        let atom = self.atomize(out, e)?;
        out.push(Stmt::Return(Some(atom)));
      }
      Stmt::Return(None) => out.push(Stmt::Return(None)),
    }
    Ok(())
  }

  /// Reduces `expr` to an atom, emitting whatever temporaries are needed
  /// into `out` first. Atoms pass through unchanged.
  fn atomize(&mut self, out: &mut Vec<Stmt>, expr: &Expr) -> Result<Expr, CompileError> {
    if expr.is_atom() { return Ok(expr.clone()) }
    self.store(out, expr, false)?.ok_or_else(||
      CompileError::internal("store(expr, false) on a non-atom must return an atom"))
  }

  /// `store(expr, first)`: rebuilds `expr` with every operand atomized,
  /// then either emits it as a bare expression statement (`first`) or
  /// binds it to a fresh temporary and returns that temporary.
  fn store(&mut self, out: &mut Vec<Stmt>, expr: &Expr, first: bool) -> Result<Option<Expr>, CompileError> {
    if expr.is_atom() {
      return Ok(if first { out.push(Stmt::Expr(expr.clone())); None } else { Some(expr.clone()) });
    }
    let rebuilt = match expr {
      Expr::Unary(op, operand) => Expr::Unary(*op, Box::new(self.atomize(out, operand)?)),
      Expr::Binary(op, l, r) => {
        let l = self.atomize(out, l)?;
        let r = self.atomize(out, r)?;
        Expr::Binary(*op, Box::new(l), Box::new(r))
      }
      Expr::Call(callee, args) => {
        let callee = self.atomize(out, callee)?;
        let mut flat_args = crate::ast::ExprList::new();
        for arg in args {
          flat_args.push(self.atomize(out, arg)?);
        }
        Expr::Call(Box::new(callee), flat_args)
      }
      Expr::IntLit(_) | Expr::Id(_) => unreachable!("handled by the is_atom guard above"),
    };
    if first {
      out.push(Stmt::Expr(rebuilt));
      Ok(None)
    } else {
      let ty = self.expr_type(&rebuilt)?;
      let temp = self.fresh_temp();
      self.syms.add(temp, ty.clone());
      out.push(Stmt::Decl(crate::ast::Decl { ty, id: temp }));
      out.push(Stmt::Expr(Expr::Binary(BinOp::Assign, Box::new(Expr::Id(temp)), Box::new(rebuilt))));
      Ok(Some(Expr::Id(temp)))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::parser::Parser;

  fn lower(src: &str) -> (TranslationUnit, Interner) {
    let mut interner = Interner::new();
    let mut types = Types::new();
    let unit = Parser::new(src, &mut interner, &mut types).parse_unit().unwrap();
    let lowered = IrcLowerer::new(&mut interner, &mut types).lower_unit(&unit).unwrap();
    (lowered, interner)
  }

  fn func_body(unit: &TranslationUnit) -> &[Stmt] {
    let GlobDecl::Func { body, .. } = &unit.decls[0] else { panic!("expected a function") };
    body.as_ref().unwrap()
  }

  #[test]
  fn compound_expression_is_atomized() {
    let (unit, _) = lower("int main() { return 1+2*3; }");
    let body = func_body(&unit);
    // decl ___t0; ___t0 = 2*3; decl ___t1; ___t1 = 1+___t0; return ___t1 —
    // the outer `+` is non-atomic too, so it gets its own temporary rather
    // than being returned directly (only a bare literal or identifier can
    // be a `return` operand).
    assert_eq!(body.len(), 5);
    assert!(matches!(body[0], Stmt::Decl(_)));
    let Stmt::Expr(Expr::Binary(BinOp::Assign, _, rhs)) = &body[1] else { panic!() };
    assert!(matches!(**rhs, Expr::Binary(BinOp::Mul, _, _)));
    assert!(matches!(body[2], Stmt::Decl(_)));
    let Stmt::Expr(Expr::Binary(BinOp::Assign, _, rhs)) = &body[3] else { panic!() };
    let Expr::Binary(BinOp::Add, l, r) = rhs.as_ref() else { panic!() };
    assert!(matches!(**l, Expr::IntLit(1)));
    assert!(matches!(**r, Expr::Id(_)));
    assert!(matches!(body[4], Stmt::Return(Some(Expr::Id(_)))));
  }

  #[test]
  fn atoms_need_no_temporary() {
    let (unit, _) = lower("int main() { return 1; }");
    let body = func_body(&unit);
    assert_eq!(body.len(), 1);
    assert!(matches!(body[0], Stmt::Return(Some(Expr::IntLit(1)))));
  }

  #[test]
  fn temporaries_are_unique_across_functions() {
    let (unit, interner) = lower("int f() { return 1+2; } int g() { return 3+4; }");
    let GlobDecl::Func { body: Some(fb), .. } = &unit.decls[0] else { panic!() };
    let GlobDecl::Func { body: Some(gb), .. } = &unit.decls[1] else { panic!() };
    let Stmt::Decl(d1) = &fb[0] else { panic!() };
    let Stmt::Decl(d2) = &gb[0] else { panic!() };
    assert_ne!(d1.id, d2.id);
    assert_eq!(interner.resolve(d1.id), "___t0");
    assert_eq!(interner.resolve(d2.id), "___t1");
  }

  #[test]
  fn call_arguments_are_atomized_left_to_right() {
    let (unit, _) = lower("int main() { putchar(1+2); return 0; }");
    let body = func_body(&unit);
    assert!(matches!(body[0], Stmt::Decl(_)));
    let Stmt::Expr(Expr::Call(_, args)) = &body[2] else { panic!() };
    assert!(matches!(args[0], Expr::Id(_)));
  }

  #[test]
  fn nested_blocks_lower_into_their_own_context() {
    let (unit, _) = lower("int main() { { return 1+2; } }");
    let body = func_body(&unit);
    let Stmt::Block(inner) = &body[0] else { panic!() };
    // decl ___t0; ___t0 = 1+2; return ___t0 — emitted into the inner
    // block's own statement buffer, not the outer function body's.
    assert_eq!(inner.len(), 3);
    assert!(matches!(inner[2], Stmt::Return(Some(Expr::Id(_)))));
  }
}
