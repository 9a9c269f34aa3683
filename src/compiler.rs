//! Pipeline orchestration and configuration (§4.11).
//!
//! `Compiler` bundles everything the source kept as process-wide globals —
//! the interner, the type-hash-consing context, and the symbol table — so
//! that two independent compilations (e.g. two `#[test]` functions running
//! in parallel) never interfere with each other.

use std::io;
use log::debug;

use crate::ast::TranslationUnit;
use crate::codegen::CodeGenerator;
use crate::diagnostics::CompileError;
use crate::intern::Interner;
use crate::irc::IrcLowerer;
use crate::parser::Parser;
use crate::printer::Printer;
use crate::sema::{init_builtin_syms, Analyzer};
use crate::sym_table::SymTable;
use crate::types::Types;

/// Runtime configuration, replacing the source's `#if PRINT`-style
/// compile-time flags and CWD-relative `libc.asm` lookup (§6) with an
/// explicit, testable surface.
#[derive(Clone, Debug, Default)]
pub struct CompileOptions {
  /// Print the parsed AST via [`Printer`] as it's produced.
  pub dump_ast: bool,
  /// Print the IR-C lowered AST via [`Printer`] as it's produced.
  pub dump_irc: bool,
  /// Assembly text spliced in verbatim after the `___entry` stub. Reading
  /// `libc.asm` (or equivalent) from disk is a driver concern, out of
  /// scope for the core.
  pub runtime_stub: Option<String>,
}

/// One compilation session: owns every piece of state a full
/// parse-check-lower-codegen run needs.
pub struct Compiler {
  interner: Interner,
  types: Types,
  syms: SymTable,
  options: CompileOptions,
}

impl Default for Compiler {
  fn default() -> Self { Self::new(CompileOptions::default()) }
}

impl Compiler {
  pub fn new(options: CompileOptions) -> Self {
    let mut interner = Interner::new();
    let mut types = Types::new();
    let mut syms = SymTable::new();
    init_builtin_syms(&mut interner, &mut types, &mut syms);
    Self { interner, types, syms, options }
  }

  #[must_use] pub fn interner(&self) -> &Interner { &self.interner }

  /// Drops every installed symbol and reinstalls the builtins, for reusing
  /// one `Compiler` across independent `check` calls (mirrors the
  /// source's `sym_reset`).
  pub fn reset_symbols(&mut self) {
    self.syms.reset();
    init_builtin_syms(&mut self.interner, &mut self.types, &mut self.syms);
  }

  pub fn parse(&mut self, src: &str) -> Result<TranslationUnit, CompileError> {
    debug!("parsing {} bytes of source", src.len());
    let unit = Parser::new(src, &mut self.interner, &mut self.types).parse_unit()?;
    debug!("parsed {} top-level declarations", unit.decls.len());
    if self.options.dump_ast {
      println!("{}", Printer::new(&self.interner).print_unit(&unit));
    }
    Ok(unit)
  }

  pub fn check(&mut self, unit: &TranslationUnit) -> Result<(), CompileError> {
    debug!("checking {} top-level declarations", unit.decls.len());
    Analyzer::new(&mut self.interner, &mut self.types, &mut self.syms).check_unit(unit)
  }

  pub fn lower(&mut self, unit: &TranslationUnit) -> Result<TranslationUnit, CompileError> {
    debug!("lowering to IR-C normal form");
    let lowered = IrcLowerer::new(&mut self.interner, &mut self.types).lower_unit(unit)?;
    if self.options.dump_irc {
      println!("{}", Printer::new(&self.interner).print_unit(&lowered));
    }
    Ok(lowered)
  }

  pub fn codegen(&mut self, unit: &TranslationUnit) -> Result<String, CompileError> {
    debug!("generating assembly");
    let asm = CodeGenerator::new(&mut self.interner)
      .generate(&mut self.types, unit, self.options.runtime_stub.as_deref())?;
    debug!("generated {} bytes of assembly", asm.len());
    Ok(asm)
  }

  /// Runs the full pipeline — parse, check, lower, codegen — and writes
  /// the resulting assembly text to `sink`.
  pub fn compile_str(&mut self, src: &str, sink: &mut impl io::Write) -> Result<(), CompileError> {
    let unit = self.parse(src)?;
    self.check(&unit)?;
    let lowered = self.lower(&unit)?;
    let asm = self.codegen(&lowered)?;
    sink.write_all(asm.as_bytes())
      .map_err(|e| CompileError::internal(format!("failed writing assembly output: {e}")))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn full_pipeline_produces_assembly() {
    let mut compiler = Compiler::default();
    let mut out = Vec::new();
    compiler.compile_str("int main() { return 0; }", &mut out).unwrap();
    let asm = String::from_utf8(out).unwrap();
    assert!(asm.starts_with("___entry:\n"));
    assert!(asm.contains("main:\n"));
  }

  #[test]
  fn two_compilers_do_not_interfere() {
    let mut c1 = Compiler::default();
    let mut c2 = Compiler::default();
    let u1 = c1.parse("int a;").unwrap();
    let u2 = c2.parse("int b;").unwrap();
    assert!(c1.check(&u1).is_ok());
    assert!(c2.check(&u2).is_ok());
  }

  #[test]
  fn reset_symbols_allows_rechecking_the_same_name() {
    let mut compiler = Compiler::default();
    let unit = compiler.parse("int x;").unwrap();
    assert!(compiler.check(&unit).is_ok());
    assert!(compiler.check(&unit).is_err(), "redeclaring without a reset should fail");
    compiler.reset_symbols();
    assert!(compiler.check(&unit).is_ok());
  }

  #[test]
  fn runtime_stub_is_threaded_through_to_codegen() {
    let options = CompileOptions { runtime_stub: Some("; stub\n".to_owned()), ..Default::default() };
    let mut compiler = Compiler::new(options);
    let unit = compiler.parse("int main() { return 0; }").unwrap();
    compiler.check(&unit).unwrap();
    let lowered = compiler.lower(&unit).unwrap();
    let asm = compiler.codegen(&lowered).unwrap();
    assert!(asm.contains("; stub\n"));
  }

  #[test]
  fn syntax_error_propagates_through_compile_str() {
    let mut compiler = Compiler::default();
    let mut out = Vec::new();
    let err = compiler.compile_str("int main() { return ; }", &mut out);
    assert!(err.is_ok(), "bare `return;` is valid — return with no operand");

    let mut out2 = Vec::new();
    let err2 = compiler.compile_str("int main() { +; }", &mut out2);
    assert!(matches!(err2, Err(CompileError::Syntax { .. })));
  }
}
