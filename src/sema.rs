//! Semantic analysis: symbol installation, type evaluation, lvalue
//! checking (§4.7).
//!
//! Walks the parsed AST and returns it unchanged in shape — only the
//! as-built symbol table (left behind in the `Compiler`'s `SymTable`) and
//! the absence of a `CompileError` distinguish "checked" from "parsed".

use if_chain::if_chain;
use crate::ast::{BinOp, Decl, Expr, GlobDecl, Stmt, TranslationUnit, UnOp};
use crate::diagnostics::CompileError;
use crate::intern::{Interner, Symbol};
use crate::sym_table::SymTable;
use crate::types::{FuncParam, Type, Types};

/// Installs the one builtin the core knows about: `putchar`, typed as a
/// proper `func(int, [int])` (§9 Open Question (a) — not the source's bare
/// `int`).
pub fn init_builtin_syms(interner: &mut Interner, types: &mut Types, syms: &mut SymTable) {
  let putchar = interner.intern("putchar");
  let param = interner.intern("c");
  let ty = types.func(types.int(), vec![FuncParam { id: param, ty: types.int() }]);
  let idx = syms.add(putchar, ty);
  syms.get_at_mut(idx).global = true;
}

pub struct Analyzer<'a> {
  interner: &'a mut Interner,
  types: &'a mut Types,
  syms: &'a mut SymTable,
}

impl<'a> Analyzer<'a> {
  pub fn new(interner: &'a mut Interner, types: &'a mut Types, syms: &'a mut SymTable) -> Self {
    Self { interner, types, syms }
  }

  pub fn check_unit(&mut self, unit: &TranslationUnit) -> Result<(), CompileError> {
    for decl in &unit.decls {
      self.check_glob_decl(decl)?;
    }
    Ok(())
  }

  fn declare_global(&mut self, id: Symbol, ty: Type) -> Result<(), CompileError> {
    if self.syms.get(id).is_some() {
      return Err(CompileError::name(format!("redeclaration of '{}'", self.interner.resolve(id))));
    }
    let idx = self.syms.add(id, ty);
    self.syms.get_at_mut(idx).global = true;
    Ok(())
  }

  fn check_glob_decl(&mut self, decl: &GlobDecl) -> Result<(), CompileError> {
    match decl {
      GlobDecl::Var { id, ty } => self.declare_global(*id, ty.clone()),
      GlobDecl::Func { id, ty, body } => {
        self.declare_global(*id, ty.clone())?;
        if let Some(body) = body {
          // Function parameters are parsed and typed (carried in `ty`) but
          // intentionally not bound as body-visible locals (§9 Open
          // Question (f)) — the source's actual behavior, preserved.
          let mark = self.syms.mark();
          self.check_block(body)?;
          self.syms.rewind(mark);
        }
        Ok(())
      }
    }
  }

  fn check_block(&mut self, stmts: &[Stmt]) -> Result<(), CompileError> {
    let mark = self.syms.mark();
    for stmt in stmts {
      self.check_stmt(stmt)?;
    }
    self.syms.rewind(mark);
    Ok(())
  }

  fn check_stmt(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
    match stmt {
      Stmt::Decl(decl) => self.check_decl(decl),
      Stmt::Expr(e) => self.eval_expr_type(e).map(|_| ()),
      Stmt::Block(stmts) => self.check_block(stmts),
      Stmt::Return(Some(e)) => self.eval_expr_type(e).map(|_| ()),
      Stmt::Return(None) => Ok(()),
    }
  }

  fn check_decl(&mut self, decl: &Decl) -> Result<(), CompileError> {
    if self.syms.get(decl.id).is_some() {
      return Err(CompileError::name(format!("redeclaration of '{}'", self.interner.resolve(decl.id))));
    }
    self.syms.add(decl.id, decl.ty.clone());
    Ok(())
  }

  /// `eval_expr_type`: the type-evaluation rules of §4.7. Exposed to
  /// `crate::irc`, which re-derives types over its own symbol table while
  /// lowering (it needs a temporary's type, not just a yes/no check).
  pub(crate) fn eval_expr_type(&mut self, expr: &Expr) -> Result<Type, CompileError> {
    match expr {
      Expr::Id(id) => {
        let sym = self.syms.get(*id)
          .ok_or_else(|| CompileError::name(format!("use of undeclared identifier '{}'", self.interner.resolve(*id))))?;
        Ok(sym.ty.clone())
      }
      Expr::IntLit(v) => Ok(if *v < 256 { self.types.char_() } else { self.types.int() }),
      Expr::Call(callee, args) => {
        if_chain! {
          if let Expr::Id(id) = callee.as_ref();
          if let Some(sym) = self.syms.get(*id);
          if sym.global;
          if let Some(sig) = sym.ty.as_func();
          then {
            let ret = sig.ret.clone();
            // Argument arity/type checking is intentionally not implemented
            // (§9 Open Question (g)) — only that each argument type-checks
            // on its own is verified.
            for arg in args {
              self.eval_expr_type(arg)?;
            }
            Ok(ret)
          } else {
            let Expr::Id(id) = callee.as_ref() else {
              return Err(CompileError::ty("call target must be a named function"));
            };
            let sym = self.syms.get(*id)
              .ok_or_else(|| CompileError::name(format!("use of undeclared identifier '{}'", self.interner.resolve(*id))))?;
            if !sym.global {
              return Err(CompileError::ty(format!("'{}' is not callable", self.interner.resolve(*id))));
            }
            Err(CompileError::ty(format!("'{}' is not a function", self.interner.resolve(*id))))
          }
        }
      }
      Expr::Unary(UnOp::Neg, operand) => self.eval_expr_type(operand),
      Expr::Binary(BinOp::Assign, lhs, rhs) => {
        if !matches!(lhs.as_ref(), Expr::Id(_)) {
          return Err(CompileError::ty("assignment target must be an identifier"));
        }
        let lty = self.eval_expr_type(lhs)?;
        let rty = self.eval_expr_type(rhs)?;
        self.combine_arith(&lty, &rty)
      }
      Expr::Binary(_, lhs, rhs) => {
        let lty = self.eval_expr_type(lhs)?;
        let rty = self.eval_expr_type(rhs)?;
        self.combine_arith(&lty, &rty)
      }
    }
  }

  fn combine_arith(&self, lhs: &Type, rhs: &Type) -> Result<Type, CompileError> {
    if lhs.is_void() || rhs.is_void() {
      return Err(CompileError::ty("'void' may not appear in an expression"));
    }
    if matches!(lhs, Type::Char) && matches!(rhs, Type::Char) {
      Ok(Type::Char)
    } else {
      Ok(Type::Int)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::parser::Parser;

  fn check(src: &str) -> Result<(), CompileError> {
    let mut interner = Interner::new();
    let mut types = Types::new();
    let mut syms = SymTable::new();
    init_builtin_syms(&mut interner, &mut types, &mut syms);
    let unit = Parser::new(src, &mut interner, &mut types).parse_unit().unwrap();
    Analyzer::new(&mut interner, &mut types, &mut syms).check_unit(&unit)
  }

  #[test]
  fn putchar_is_a_proper_function_type() {
    let mut interner = Interner::new();
    let mut types = Types::new();
    let mut syms = SymTable::new();
    init_builtin_syms(&mut interner, &mut types, &mut syms);
    let putchar = interner.intern("putchar");
    let sig = syms.get(putchar).unwrap().ty.as_func().unwrap();
    assert_eq!(sig.ret, types.int());
    assert_eq!(sig.params.len(), 1);
    assert_eq!(sig.params[0].ty, types.int());
  }

  #[test]
  fn well_typed_program_checks() {
    assert!(check("int main() { int x; x = 1; return x; }").is_ok());
  }

  #[test]
  fn undeclared_identifier_is_name_error() {
    let err = check("int main() { return y; }").unwrap_err();
    assert!(matches!(err, CompileError::Name { .. }));
  }

  #[test]
  fn redeclaration_is_name_error() {
    let err = check("int main() { int x; int x; return 0; }").unwrap_err();
    assert!(matches!(err, CompileError::Name { .. }));
  }

  #[test]
  fn assigning_to_non_identifier_is_type_error() {
    let err = check("int main() { 1 = 2; return 0; }").unwrap_err();
    assert!(matches!(err, CompileError::Type { .. }));
  }

  #[test]
  fn calling_putchar_checks() {
    assert!(check("int main() { putchar(65); return 0; }").is_ok());
  }

  #[test]
  fn calling_a_non_function_is_type_error() {
    let err = check("int main() { int x; x(); return 0; }").unwrap_err();
    assert!(matches!(err, CompileError::Type { .. }));
  }

  #[test]
  fn call_arity_is_not_checked() {
    // §9 Open Question (g): extra/missing arguments are not rejected.
    assert!(check("int main() { putchar(1, 2, 3); return 0; }").is_ok());
  }

  #[test]
  fn function_parameters_are_not_visible_in_body() {
    // §9 Open Question (f): `c` is parsed as a parameter but not bound as a
    // body-visible local, so referencing it by name is a name error.
    let err = check("int f(int c) { return c; }").unwrap_err();
    assert!(matches!(err, CompileError::Name { .. }));
  }

  #[test]
  fn block_scope_is_rewound() {
    assert!(check("int main() { { int x; } int x; return 0; }").is_ok());
  }

  #[test]
  fn both_char_operands_yield_char() {
    // `1` and `2` are both below 256, so they're `char`, and `char + char`
    // stays `char` per the combine rule.
    let mut interner = Interner::new();
    let mut types = Types::new();
    let mut syms = SymTable::new();
    init_builtin_syms(&mut interner, &mut types, &mut syms);
    let unit = Parser::new("int main() { return 1+2; }", &mut interner, &mut types).parse_unit().unwrap();
    let GlobDecl::Func { body, .. } = &unit.decls[0] else { panic!() };
    let Stmt::Return(Some(expr)) = &body.as_ref().unwrap()[0] else { panic!() };
    let ty = Analyzer::new(&mut interner, &mut types, &mut syms).eval_expr_type(expr).unwrap();
    assert_eq!(ty, Type::Char);
  }
}
