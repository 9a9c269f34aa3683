//! The abstract syntax tree: expressions, statements, declarations, and
//! the translation unit. The same node shapes are reused, unchanged, for
//! the parsed AST, the checked AST (symbols resolved, same shape) and the
//! IR-C AST (same node types, stricter normal-form invariants) — only the
//! invariants that hold over the tree differ between stages.
//!
//! Sibling sequences are owned `Vec`s rather than the source's
//! singly-linked `next` chains (REDESIGN NOTES): this changes
//! representation, not the source-order semantics the rest of this
//! crate depends on.

use smallvec::SmallVec;
use crate::intern::Symbol;
use crate::types::Type;

/// The only unary operator surfaced as an AST node; unary `+` is
/// syntactic only and produces no node (§4.6).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnOp {
  Neg,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
  Mul,
  Div,
  Mod,
  Add,
  Sub,
  Assign,
}

impl BinOp {
  #[must_use] pub fn as_str(self) -> &'static str {
    match self {
      BinOp::Mul => "*",
      BinOp::Div => "/",
      BinOp::Mod => "%",
      BinOp::Add => "+",
      BinOp::Sub => "-",
      BinOp::Assign => "=",
    }
  }
}

/// Most call/unary/binary argument lists top out at a handful of elements;
/// `SmallVec` keeps the common case inline without heap allocation.
pub type ExprList = SmallVec<[Expr; 4]>;

#[derive(Clone, Debug)]
pub enum Expr {
  IntLit(u32),
  Id(Symbol),
  Unary(UnOp, Box<Expr>),
  Binary(BinOp, Box<Expr>, Box<Expr>),
  /// `callee(args...)`. The grammar only ever produces an `Id` callee; any
  /// other shape reaching code generation is an internal error (§4.9).
  Call(Box<Expr>, ExprList),
}

impl Expr {
  /// An atom is the only operand shape IR-C allows: a literal or an
  /// identifier (§4.8).
  #[must_use] pub fn is_atom(&self) -> bool {
    matches!(self, Expr::IntLit(_) | Expr::Id(_))
  }
}

/// A local variable declaration: `base_type ptr_suffix ident`.
#[derive(Clone, Debug)]
pub struct Decl {
  pub ty: Type,
  pub id: Symbol,
}

#[derive(Clone, Debug)]
pub enum Stmt {
  Decl(Decl),
  Expr(Expr),
  Block(Vec<Stmt>),
  Return(Option<Expr>),
}

/// A top-level declaration: a global variable or a function (with an
/// optional body — absent for a forward declaration like `int putchar(int
/// c);`).
#[derive(Clone, Debug)]
pub enum GlobDecl {
  Var { id: Symbol, ty: Type },
  Func { id: Symbol, ty: Type, body: Option<Vec<Stmt>> },
}

/// The whole program: an ordered sequence of top-level declarations,
/// exclusively owned.
#[derive(Clone, Debug, Default)]
pub struct TranslationUnit {
  pub decls: Vec<GlobDecl>,
}
