#![forbid(unsafe_code)]

use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;
use std::hash::Hasher;
use std::rc::Rc;

use crate::TermPool;
use crate::storage::SymbolIndex;

/// The public interface for a function symbol. Can be used to write generic
/// functions that accept both [Symbol] and [SymbolRef].
///
/// See [crate::Term] for more information on how to use this trait with two lifetimes.
pub trait Symb<'a, 'b> {
    /// Create a copy of the symbol reference.
    fn copy(&'b self) -> SymbolRef<'a>;

    /// Returns the index of the symbol in the symbol pool.
    fn index(&self) -> SymbolIndex;

    /// Returns the pool that the symbol belongs to.
    fn pool(&self) -> &TermPool;

    /// Obtain the symbol's name.
    fn name(&self) -> Rc<str> {
        self.pool().store().symbols.name(self.index()).clone()
    }

    /// Obtain the symbol's arity.
    fn arity(&self) -> usize {
        self.pool().store().symbols.arity(self.index())
    }
}

/// A reference to a function symbol in the symbol pool, which does not keep the symbol alive.
#[derive(Clone, Copy)]
pub struct SymbolRef<'a> {
    pool: &'a TermPool,
    index: SymbolIndex,
}

impl<'a> SymbolRef<'a> {
    pub(crate) fn from_index(pool: &'a TermPool, index: SymbolIndex) -> SymbolRef<'a> {
        SymbolRef { pool, index }
    }

    /// Protects the symbol, yielding a [Symbol] that keeps it alive.
    pub fn protect(&self) -> Symbol {
        self.pool.protect_symbol(self.index)
    }
}

impl<'a> Symb<'a, '_> for SymbolRef<'a> {
    fn copy(&self) -> SymbolRef<'a> {
        *self
    }

    fn index(&self) -> SymbolIndex {
        self.index
    }

    fn pool(&self) -> &TermPool {
        self.pool
    }
}

impl fmt::Display for SymbolRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl fmt::Debug for SymbolRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl PartialEq for SymbolRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.pool.ptr_eq(other.pool)
    }
}

impl Eq for SymbolRef<'_> {}

impl Hash for SymbolRef<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state)
    }
}

impl PartialOrd for SymbolRef<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SymbolRef<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.index
            .cmp(&other.index)
            .then_with(|| self.pool.id().cmp(&other.pool.id()))
    }
}

/// A protected function symbol, with the same interface as [SymbolRef].
///
/// The symbol is removed from the pool when the last [Symbol] and the last
/// term with this head symbol are dropped.
pub struct Symbol {
    pool: TermPool,
    index: SymbolIndex,
}

impl Symbol {
    /// Create a new symbol with the given name and arity.
    pub fn new(pool: &TermPool, name: &str, arity: usize) -> Symbol {
        pool.create_symbol(name, arity)
    }

    /// Takes ownership of a reference to the symbol.
    pub(crate) fn from_index(pool: TermPool, index: SymbolIndex) -> Symbol {
        Symbol { pool, index }
    }

    /// Returns a borrow from the symbol.
    pub fn get(&self) -> SymbolRef<'_> {
        SymbolRef::from_index(&self.pool, self.index)
    }
}

impl<'a, 'b> Symb<'a, 'b> for Symbol
where
    'b: 'a,
{
    fn copy(&'b self) -> SymbolRef<'a> {
        self.get()
    }

    fn index(&self) -> SymbolIndex {
        self.index
    }

    fn pool(&self) -> &TermPool {
        &self.pool
    }
}

/// Allows passing borrowed symbols where a [Symb] is expected.
impl<'a, 'b, S: Symb<'a, 'b>> Symb<'a, 'b> for &'b S {
    fn copy(&'b self) -> SymbolRef<'a> {
        (*self).copy()
    }

    fn index(&self) -> SymbolIndex {
        (*self).index()
    }

    fn pool(&self) -> &TermPool {
        (*self).pool()
    }
}

impl Drop for Symbol {
    fn drop(&mut self) {
        self.pool.release_symbol(self.index);
    }
}

impl From<&SymbolRef<'_>> for Symbol {
    fn from(value: &SymbolRef) -> Self {
        value.protect()
    }
}

impl Clone for Symbol {
    fn clone(&self) -> Self {
        self.get().protect()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.get().hash(state)
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.get().eq(&other.get())
    }
}

impl PartialEq<SymbolRef<'_>> for Symbol {
    fn eq(&self, other: &SymbolRef<'_>) -> bool {
        self.get().eq(other)
    }
}

impl PartialEq<Symbol> for SymbolRef<'_> {
    fn eq(&self, other: &Symbol) -> bool {
        self.eq(&other.get())
    }
}

impl PartialOrd for Symbol {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Symbol {
    fn cmp(&self, other: &Self) -> Ordering {
        self.get().cmp(&other.get())
    }
}

impl Eq for Symbol {}

#[cfg(test)]
mod tests {
    use merc_utilities::test_logger;

    use super::*;

    #[test]
    fn test_symbol_lifetime() {
        test_logger();
        let pool = TermPool::new();
        let builtins = pool.symbol_count();

        let f = Symbol::new(&pool, "f", 2);
        let g = f.clone();
        assert_eq!(f, g);
        assert_eq!(pool.symbol_reference_count(&f), 2);
        assert_eq!(pool.symbol_count(), builtins + 1);

        drop(f);
        assert_eq!(pool.symbol_reference_count(&g), 1);
        assert!(pool.find_symbol("f", 2).is_some());

        drop(g);
        assert!(pool.find_symbol("f", 2).is_none(), "The symbol should be removed");
        assert_eq!(pool.symbol_count(), builtins);
    }

    #[test]
    fn test_symbol_name_and_arity() {
        test_logger();
        let pool = TermPool::new();

        let f = Symbol::new(&pool, "f", 3);
        let f_ref = f.copy();
        assert_eq!(&*f_ref.name(), "f");
        assert_eq!(f_ref.arity(), 3);
        assert_eq!(f_ref, f);
        assert_ne!(Symbol::new(&pool, "f", 2), f);
        assert_eq!(format!("{f}"), "f");
    }
}
