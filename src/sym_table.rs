//! The symbol table: a flat, ordered sequence of declared names with
//! scope-by-index rewind.

use crate::intern::Symbol;
use crate::types::Type;

/// A declared name. `offset` is meaningful only when `global` is false: it
/// is the local's frame offset in bytes, negative for locals declared
/// after the frame pointer (see the code generator, §4.9).
#[derive(Clone, Debug)]
pub struct Sym {
  pub id: Symbol,
  pub ty: Type,
  pub global: bool,
  pub offset: i32,
}

/// A flat ordered sequence of [`Sym`]s, supporting scope emulation via a
/// saved length (`mark`) and truncation (`rewind`).
///
/// [`SymTable::get`] returns the *last* matching entry, so a declaration in
/// an inner scope correctly shadows one in an outer scope for as long as
/// the inner scope's entries haven't been rewound away.
#[derive(Default)]
pub struct SymTable {
  syms: Vec<Sym>,
}

impl SymTable {
  pub fn new() -> Self { Self::default() }

  /// Append a new symbol (not global, offset 0) and return its index.
  pub fn add(&mut self, id: Symbol, ty: Type) -> usize {
    self.syms.push(Sym { id, ty, global: false, offset: 0 });
    self.syms.len() - 1
  }

  /// Look up the innermost (last-added, not-yet-rewound) binding for `id`.
  #[must_use] pub fn get(&self, id: Symbol) -> Option<&Sym> {
    self.syms.iter().rev().find(|s| s.id == id)
  }

  #[must_use] pub fn get_mut(&mut self, id: Symbol) -> Option<&mut Sym> {
    self.syms.iter_mut().rev().find(|s| s.id == id)
  }

  pub fn get_at(&self, index: usize) -> &Sym { &self.syms[index] }
  pub fn get_at_mut(&mut self, index: usize) -> &mut Sym { &mut self.syms[index] }

  /// Save the current length, to [`rewind`](Self::rewind) back to on scope
  /// exit.
  #[must_use] pub fn mark(&self) -> usize { self.syms.len() }

  /// Truncate back to a previously-saved [`mark`](Self::mark).
  pub fn rewind(&mut self, mark: usize) { self.syms.truncate(mark) }

  /// Drop all entries. Called between semantic analysis and code
  /// generation so that the code generator assigns offsets from a clean
  /// slate, in exactly the order it walks declarations.
  pub fn reset(&mut self) { self.syms.clear() }

  #[must_use] pub fn len(&self) -> usize { self.syms.len() }
  #[must_use] pub fn is_empty(&self) -> bool { self.syms.is_empty() }
}
