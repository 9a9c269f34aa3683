//! Code generation: IR-C normal-form AST to 32-bit x86 AT&T-syntax
//! assembly text (§4.9).
//!
//! Fixed-register, caller-saves emission: every expression leaves its
//! rvalue in `%eax`; binary operators stage the right operand through
//! `%ecx` so the left operand can be re-evaluated into `%eax` without
//! clobbering it. No register allocator — the whole point of this stage
//! is that it needs none.

use std::fmt::Write as _;
use crate::ast::{BinOp, Decl, Expr, GlobDecl, Stmt, TranslationUnit, UnOp};
use crate::diagnostics::CompileError;
use crate::intern::{Interner, Symbol};
use crate::sema::init_builtin_syms;
use crate::sym_table::SymTable;
use crate::types::Types;

/// Prepended to every compilation unit. Sets up a frame, calls the user's
/// `main`, and exits via `syscall` with the return value relayed through
/// `%ebx` (exit code) and `%eax` (syscall number 1 = `sys_exit`).
const ENTRY_STUB: &str = "\
___entry:
\tpushl %ebp
\tmovl %esp, %ebp
\tcall main
\tmovl %eax, %ebx
\tmovl $1, %eax
\tsyscall
\tleave
\tret
";

pub struct CodeGenerator<'a> {
  interner: &'a mut Interner,
  syms: SymTable,
  frame_offset: i32,
  /// `.L<N>` compiler-label counter (§6), starting at 0. Unused by this
  /// language subset — there is no control flow to branch over — but kept
  /// as part of the emitter's state so a future `if`/`while` lowering pass
  /// has somewhere to draw fresh labels from without renumbering anything
  /// already emitted.
  label_counter: u32,
}

impl<'a> CodeGenerator<'a> {
  pub fn new(interner: &'a mut Interner) -> Self {
    Self { interner, syms: SymTable::new(), frame_offset: 0, label_counter: 0 }
  }

  #[must_use] pub fn fresh_label(&mut self) -> String {
    let label = format!(".L{}", self.label_counter);
    self.label_counter += 1;
    label
  }

  /// Emits the whole unit: the entry stub, an optional runtime stub
  /// spliced in verbatim, then every top-level declaration in source
  /// order.
  pub fn generate(&mut self, types: &mut Types, unit: &TranslationUnit, runtime_stub: Option<&str>) -> Result<String, CompileError> {
    self.syms.reset();
    self.install_globals(types, unit);

    let mut out = String::new();
    out.push_str(ENTRY_STUB);
    if let Some(stub) = runtime_stub {
      out.push_str(stub);
      if !stub.ends_with('\n') { out.push('\n'); }
    }
    for decl in &unit.decls {
      self.gen_glob_decl(&mut out, decl)?;
    }
    Ok(out)
  }

  /// Rebuilds the global symbol table from scratch, independent of
  /// whatever order semantic analysis or lowering left behind (§4.9).
  fn install_globals(&mut self, types: &mut Types, unit: &TranslationUnit) {
    init_builtin_syms(self.interner, types, &mut self.syms);
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
  }

  fn gen_glob_decl(&mut self, out: &mut String, decl: &GlobDecl) -> Result<(), CompileError> {
    match decl {
      GlobDecl::Var { id, ty } => {
        let _ = writeln!(out, "{}:", self.interner.resolve(*id));
        let _ = writeln!(out, "\t.zero {}", ty.size());
        Ok(())
      }
      GlobDecl::Func { body: None, .. } => Ok(()),
      GlobDecl::Func { id, body: Some(stmts), .. } => self.gen_function(out, *id, stmts),
    }
  }

  fn gen_function(&mut self, out: &mut String, id: Symbol, stmts: &[Stmt]) -> Result<(), CompileError> {
    let _ = writeln!(out, "{}:", self.interner.resolve(id));
    let _ = writeln!(out, "\tpushl %ebp");
    let _ = writeln!(out, "\tmovl %esp, %ebp");

    self.frame_offset = -4;
    let mark = self.syms.mark();
    for stmt in stmts {
      self.gen_stmt(out, stmt)?;
    }
    self.syms.rewind(mark);

    // Safety epilogue, reached if control falls off the end without an
    // explicit `return`.
    let _ = writeln!(out, "\tleave");
    let _ = writeln!(out, "\tret");
    Ok(())
  }

  fn gen_stmt(&mut self, out: &mut String, stmt: &Stmt) -> Result<(), CompileError> {
    match stmt {
      Stmt::Decl(decl) => { self.declare_local(decl); Ok(()) }
      Stmt::Expr(e) => self.gen_expr(out, e),
      Stmt::Block(stmts) => {
        let mark = self.syms.mark();
        for s in stmts { self.gen_stmt(out, s)?; }
        self.syms.rewind(mark);
        Ok(())
      }
      Stmt::Return(value) => {
        if let Some(e) = value { self.gen_expr(out, e)?; }
        let _ = writeln!(out, "\tleave");
        let _ = writeln!(out, "\tret");
        Ok(())
      }
    }
  }

  fn declare_local(&mut self, decl: &Decl) {
    let offset = self.frame_offset;
    self.frame_offset -= decl.ty.size() as i32;
    let idx = self.syms.add(decl.id, decl.ty.clone());
    self.syms.get_at_mut(idx).offset = offset;
  }

  /// Leaves `expr`'s rvalue in `%eax`.
  fn gen_expr(&mut self, out: &mut String, expr: &Expr) -> Result<(), CompileError> {
    match expr {
      Expr::IntLit(v) => { let _ = writeln!(out, "\tmovl ${v}, %eax"); Ok(()) }
      Expr::Id(id) => self.gen_id_rvalue(out, *id),
      Expr::Unary(UnOp::Neg, operand) => {
        self.gen_expr(out, operand)?;
        let _ = writeln!(out, "\tnegl %eax");
        Ok(())
      }
      Expr::Binary(BinOp::Assign, lhs, rhs) => self.gen_assign(out, lhs, rhs),
      Expr::Binary(op, l, r) => self.gen_binary(out, *op, l, r),
      Expr::Call(callee, args) => self.gen_call(out, callee, args),
    }
  }

  fn gen_id_rvalue(&mut self, out: &mut String, id: Symbol) -> Result<(), CompileError> {
    let sym = self.syms.get(id)
      .ok_or_else(|| CompileError::internal("identifier missing from the code generator's symbol table"))?;
    if sym.global {
      let _ = writeln!(out, "\tmovl ${}, %eax", self.interner.resolve(id));
      let _ = writeln!(out, "\tmovl (%eax), %eax");
    } else {
      let _ = writeln!(out, "\tmovl {}(%ebp), %eax", sym.offset);
    }
    Ok(())
  }

  /// Leaves `id`'s address in `%eax`.
  fn gen_lval_addr(&mut self, out: &mut String, id: Symbol) -> Result<(), CompileError> {
    let sym = self.syms.get(id)
      .ok_or_else(|| CompileError::internal("identifier missing from the code generator's symbol table"))?;
    if sym.global {
      let _ = writeln!(out, "\tmovl ${}, %eax", self.interner.resolve(id));
    } else {
      let _ = writeln!(out, "\tmovl %ebp, %eax");
      let _ = writeln!(out, "\taddl ${}, %eax", sym.offset);
    }
    Ok(())
  }

  fn gen_assign(&mut self, out: &mut String, lhs: &Expr, rhs: &Expr) -> Result<(), CompileError> {
    let Expr::Id(id) = lhs else {
      return Err(CompileError::internal("assignment target was not an identifier by code generation time"));
    };
    self.gen_expr(out, rhs)?;
    let _ = writeln!(out, "\tmovl %eax, %ecx");
    self.gen_lval_addr(out, *id)?;
    let _ = writeln!(out, "\tmovl %ecx, (%eax)");
    Ok(())
  }

  /// Right operand first, staged through `%ecx`, then the left operand
  /// re-evaluated into `%eax` before the instruction applies against
  /// `%ecx` (§4.9).
  fn gen_binary(&mut self, out: &mut String, op: BinOp, l: &Expr, r: &Expr) -> Result<(), CompileError> {
    self.gen_expr(out, r)?;
    let _ = writeln!(out, "\tmovl %eax, %ecx");
    self.gen_expr(out, l)?;
    match op {
      BinOp::Add => { let _ = writeln!(out, "\taddl %ecx, %eax"); }
      BinOp::Sub => { let _ = writeln!(out, "\tsubl %ecx, %eax"); }
      BinOp::Mul => { let _ = writeln!(out, "\timull %ecx, %eax"); }
      BinOp::Div => {
        // `idivl` with stale `%edx` is undefined at the hardware level;
        // `cltd` sign-extends `%eax` into `%edx` first (§9 Open Question
        // (h), a correctness fix over the source).
        let _ = writeln!(out, "\tcltd");
        let _ = writeln!(out, "\tidivl %ecx");
      }
      BinOp::Mod => {
        let _ = writeln!(out, "\tcltd");
        let _ = writeln!(out, "\tidivl %ecx");
        let _ = writeln!(out, "\tmovl %edx, %eax");
      }
      BinOp::Assign => unreachable!("assignment is handled by gen_assign"),
    }
    Ok(())
  }

  fn gen_call(&mut self, out: &mut String, callee: &Expr, args: &[Expr]) -> Result<(), CompileError> {
    let Expr::Id(id) = callee else {
      return Err(CompileError::internal("call target was not an identifier by code generation time"));
    };
    for arg in args {
      self.gen_expr(out, arg)?;
      let _ = writeln!(out, "\tpushl %eax");
    }
    let _ = writeln!(out, "\tcall {}", self.interner.resolve(*id));
    for _ in args {
      let _ = writeln!(out, "\tpopl %eax");
    }
    Ok(())
  }
}
