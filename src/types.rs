//! The type system: a small closed set of value categories plus
//! hash-consed pointer and function types.

use hashbrown::HashMap;
use std::rc::Rc;
use crate::intern::Symbol;

/// An ordered, named parameter belonging to exactly one function [`Type`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FuncParam {
  pub id: Symbol,
  pub ty: Type,
}

/// A type. Basic types (`void`, `char`, `int`) are cheap `Copy` singletons;
/// `Ptr` and `Func` wrap shared, reference-counted payloads so that
/// `Type` itself stays small and `Clone` is O(1).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
  Void,
  Char,
  Int,
  /// Hash-consed: two `Ptr` types with the same base compare `Rc::ptr_eq`
  /// as well as structurally, so `==` is effectively an identity check.
  Ptr(Rc<Type>),
  Func(Rc<FuncSig>),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FuncSig {
  pub ret: Type,
  pub params: Vec<FuncParam>,
}

impl Type {
  /// Size in bytes for storage types. Querying the size of `Func` is an
  /// internal error: function types carry no runtime representation.
  #[must_use] pub fn size(&self) -> u32 {
    match self {
      Type::Void => 0,
      Type::Char => 1,
      Type::Int | Type::Ptr(_) => 4,
      Type::Func(_) => unreachable!("Type::size queried on a function type"),
    }
  }

  #[must_use] pub fn is_void(&self) -> bool { matches!(self, Type::Void) }

  #[must_use] pub fn as_func(&self) -> Option<&FuncSig> {
    if let Type::Func(sig) = self { Some(sig) } else { None }
  }
}

/// Hash-consing context for pointer types and the basic-type singletons.
///
/// Replaces the source's fixed-size `type_ptr_cache` array (DESIGN NOTES)
/// with a proper map keyed by the base type.
#[derive(Default)]
pub struct Types {
  ptr_cache: HashMap<Type, Type>,
}

impl Types {
  pub fn new() -> Self { Self::default() }

  #[must_use] pub fn void(&self) -> Type { Type::Void }
  #[must_use] pub fn char_(&self) -> Type { Type::Char }
  #[must_use] pub fn int(&self) -> Type { Type::Int }

  /// Returns the same `Type` value (by `==`, and transitively by
  /// `Rc::ptr_eq` on the inner base) for the same base type on every call.
  pub fn ptr(&mut self, base: Type) -> Type {
    if let Some(ty) = self.ptr_cache.get(&base) { return ty.clone() }
    let ty = Type::Ptr(Rc::new(base.clone()));
    self.ptr_cache.insert(base, ty.clone());
    ty
  }

  /// Constructs a fresh function type. Function types are never
  /// deduplicated: two calls with structurally-equal signatures return
  /// distinct (though `==`-equal) `Type` values.
  #[must_use] pub fn func(&self, ret: Type, params: Vec<FuncParam>) -> Type {
    Type::Func(Rc::new(FuncSig { ret, params }))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn ptr_uniqueness() {
    let mut types = Types::new();
    let p1 = types.ptr(types.int());
    let p2 = types.ptr(types.int());
    assert_eq!(p1, p2);
  }

  #[test]
  fn distinct_base_distinct_ptr() {
    let mut types = Types::new();
    let p_int = types.ptr(types.int());
    let p_char = types.ptr(types.char_());
    assert_ne!(p_int, p_char);
  }

  #[test]
  fn basic_sizes() {
    let types = Types::new();
    assert_eq!(types.void().size(), 0);
    assert_eq!(types.char_().size(), 1);
    assert_eq!(types.int().size(), 4);
    assert_eq!(Type::Ptr(Rc::new(Type::Int)).size(), 4);
  }

  #[test]
  #[should_panic]
  fn func_size_is_internal_error() {
    let types = Types::new();
    let f = types.func(types.int(), vec![]);
    let _ = f.size();
  }

  #[test]
  fn func_types_not_deduped() {
    let types = Types::new();
    let f1 = types.func(types.int(), vec![]);
    let f2 = types.func(types.int(), vec![]);
    // Structurally equal but not required to be the same allocation.
    assert_eq!(f1, f2);
  }
}
