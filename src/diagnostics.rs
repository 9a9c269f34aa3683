//! The error taxonomy (§7) and the `[!] ... ERROR` stdout diagnostic
//! protocol (§6). Every fallible pipeline stage returns
//! `Result<T, CompileError>`; the first error propagates via `?` and
//! aborts compilation. No recovery is attempted anywhere in the core.

use std::fmt;

/// One compile-time error. Each variant corresponds to a row of the §7
/// error taxonomy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompileError {
  /// Unrecognized byte, over-long identifier, or other lexical failure.
  Lexical { message: String, line: u32 },
  /// Token mismatch against the grammar.
  Syntax { message: String, line: u32 },
  /// Unknown identifier or redeclaration.
  Name { message: String },
  /// `void` in an expression, non-lvalue assignment target, calling a
  /// non-function, calling a non-global.
  Type { message: String },
  /// Unexpected AST shape reached during lowering or code generation.
  /// Reachable only via a pipeline bug; never expected on valid input.
  Internal { message: String },
}

impl fmt::Display for CompileError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      CompileError::Lexical { message, line } =>
        write!(f, "[!] SYNTAX ERROR: Line {line}: {message}"),
      CompileError::Syntax { message, line } =>
        write!(f, "[!] SYNTAX ERROR: Line {line}: {message}"),
      CompileError::Name { message } => write!(f, "[!] SEMANTIC ERROR: {message}"),
      CompileError::Type { message } => write!(f, "[!] SEMANTIC ERROR: {message}"),
      CompileError::Internal { message } => write!(f, "[!] ERROR: {message}"),
    }
  }
}

impl std::error::Error for CompileError {}

impl CompileError {
  #[must_use] pub fn lexical(message: impl Into<String>, line: u32) -> Self {
    CompileError::Lexical { message: message.into(), line }
  }
  #[must_use] pub fn syntax(message: impl Into<String>, line: u32) -> Self {
    CompileError::Syntax { message: message.into(), line }
  }
  #[must_use] pub fn name(message: impl Into<String>) -> Self {
    CompileError::Name { message: message.into() }
  }
  #[must_use] pub fn ty(message: impl Into<String>) -> Self {
    CompileError::Type { message: message.into() }
  }
  #[must_use] pub fn internal(message: impl Into<String>) -> Self {
    CompileError::Internal { message: message.into() }
  }
}

/// A non-fatal diagnostic sink: prints the `[!] ...` text to stdout but
/// does not abort compilation.
///
/// The core pipeline never calls this — every fatal condition is reported
/// by returning `Err(CompileError)` and letting `?` unwind — but the
/// reporter is kept alongside the fatal path (mirroring the source's
/// `error`/`fatal` pair) for a future driver or REPL-style front end that
/// wants to surface warnings without stopping.
#[derive(Default)]
pub struct Diagnostics {
  reported: Vec<CompileError>,
}

impl Diagnostics {
  pub fn new() -> Self { Self::default() }

  /// Print the diagnostic and record it, without aborting.
  pub fn report(&mut self, err: CompileError) {
    println!("{err}");
    self.reported.push(err);
  }

  #[must_use] pub fn reported(&self) -> &[CompileError] { &self.reported }
  #[must_use] pub fn is_empty(&self) -> bool { self.reported.is_empty() }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn display_matches_protocol_prefixes() {
    assert!(CompileError::syntax("bad token", 3).to_string().starts_with("[!] SYNTAX ERROR: Line 3:"));
    assert!(CompileError::name("unknown x").to_string().starts_with("[!] SEMANTIC ERROR:"));
    assert!(CompileError::ty("void in expr").to_string().starts_with("[!] SEMANTIC ERROR:"));
    assert!(CompileError::internal("unreachable").to_string().starts_with("[!] ERROR:"));
  }

  #[test]
  fn non_fatal_reporter_accumulates_without_aborting() {
    let mut diags = Diagnostics::new();
    assert!(diags.is_empty());
    diags.report(CompileError::name("unused variable"));
    assert_eq!(diags.reported().len(), 1);
  }
}
