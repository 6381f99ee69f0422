#![forbid(unsafe_code)]

use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;
use std::hash::Hasher;

use crate::Symb;
use crate::SymbolRef;
use crate::TermError;
use crate::TermPool;
use crate::error::contract;
use crate::is_annotated;
use crate::is_empty_list_term;
use crate::is_list_term;
use crate::storage::TermIndex;

/// The ATerm trait represents a first-order term in the ATerm library.
/// It provides methods to manipulate and access the term's properties.
///
/// # Details
///
/// This trait is rather complicated with two lifetimes, but this is used
/// to support both the [ATerm], which has no lifetimes, and [ATermRef<'a>]
/// whose lifetime is bound by `'a`. Because now we can be require that `'b: 'a`
/// for the implementation of [Term<'a, 'b>] for [ATerm], we can safely return
/// [ATermRef<'a>] from methods of [Term<'a, 'b>].
///
/// Only [Term::copy], [Term::protect], [Term::index] and [Term::pool] have to
/// be implemented, the other methods are derived from them.
pub trait Term<'a, 'b> {
    /// Protects the term, yielding a counted handle.
    fn protect(&self) -> ATerm;

    /// Makes a copy of the term with the same lifetime as itself.
    fn copy(&'b self) -> ATermRef<'a>;

    /// Returns the index of the term in the term pool, equal terms have equal indices.
    fn index(&self) -> TermIndex;

    /// Returns the pool that the term belongs to.
    fn pool(&self) -> &TermPool;

    /// Returns the indexed argument of the term.
    ///
    /// # Panics
    ///
    /// When the index is not smaller than the arity of the head symbol.
    fn arg(&'b self, index: usize) -> ATermRef<'a> {
        self.copy().arg(index)
    }

    /// Returns the indexed argument of the term, or an error when it does not exist.
    fn try_arg(&'b self, index: usize) -> Result<ATermRef<'a>, TermError> {
        self.copy().try_arg(index)
    }

    /// Returns the list of arguments as a collection.
    fn arguments(&'b self) -> ATermArgs<'a> {
        ATermArgs::new(self.copy())
    }

    /// Returns the head symbol of the term.
    fn get_head_symbol(&'b self) -> SymbolRef<'a> {
        self.copy().get_head_symbol()
    }

    /// Returns an iterator over all subterms of the term in pre order traversal of the term trees.
    fn iter(&'b self) -> TermIterator<'a> {
        TermIterator::new(self.copy())
    }

    /// Returns true iff this is an integer term.
    fn is_int(&self) -> bool {
        self.pool().store().terms.int_value(self.index()).is_some()
    }

    /// Returns the value of an integer term.
    ///
    /// # Panics
    ///
    /// When this is not an integer term.
    fn int_value(&'b self) -> usize {
        contract(self.try_int_value())
    }

    /// Returns the value of an integer term, or an error for other terms.
    fn try_int_value(&'b self) -> Result<usize, TermError> {
        let value = self.pool().store().terms.int_value(self.index());
        value.ok_or_else(|| TermError::NotAnInteger {
            symbol: self.get_head_symbol().name().to_string(),
        })
    }
}

/// This represents a lifetime bound reference to an existing [ATerm].
///
/// A reference does not keep the term alive, but its lifetime is bound to a
/// handle that does. As such a reference cannot outlive the term:
///
/// ```compile_fail
/// use merc_aterm::ATermRef;
/// use merc_aterm::Term;
/// use merc_aterm::TermPool;
///
/// let pool = TermPool::new();
/// let reference: ATermRef<'_>;
/// {
///     let term = pool.create_int(5);
///     reference = term.copy();
/// }
///
/// println!("{reference}");
/// ```
#[derive(Clone, Copy)]
pub struct ATermRef<'a> {
    pool: &'a TermPool,
    index: TermIndex,
}

impl<'a> ATermRef<'a> {
    pub(crate) fn from_index(pool: &'a TermPool, index: TermIndex) -> ATermRef<'a> {
        ATermRef { pool, index }
    }
}

impl<'a> Term<'a, '_> for ATermRef<'a> {
    fn protect(&self) -> ATerm {
        self.pool.protect(self.index)
    }

    fn copy(&self) -> ATermRef<'a> {
        *self
    }

    fn index(&self) -> TermIndex {
        self.index
    }

    fn pool(&self) -> &TermPool {
        self.pool
    }

    fn arg(&self, index: usize) -> ATermRef<'a> {
        contract(self.try_arg(index))
    }

    fn try_arg(&self, index: usize) -> Result<ATermRef<'a>, TermError> {
        let (argument, arity) = {
            let store = self.pool.store();
            let arguments = store.terms.arguments(self.index);
            (arguments.get(index).copied(), arguments.len())
        };

        match argument {
            Some(argument) => Ok(ATermRef::from_index(self.pool, argument)),
            None => Err(TermError::ArgumentOutOfRange {
                symbol: self.get_head_symbol().name().to_string(),
                index,
                arity,
            }),
        }
    }

    fn arguments(&self) -> ATermArgs<'a> {
        ATermArgs::new(*self)
    }

    fn get_head_symbol(&self) -> SymbolRef<'a> {
        let symbol = self.pool.store().terms.symbol(self.index);
        SymbolRef::from_index(self.pool, symbol)
    }

    fn iter(&self) -> TermIterator<'a> {
        TermIterator::new(*self)
    }
}

impl PartialEq for ATermRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.pool.ptr_eq(other.pool)
    }
}

impl Eq for ATermRef<'_> {}

impl Hash for ATermRef<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state)
    }
}

impl PartialOrd for ATermRef<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Terms are ordered by their index, and terms of different pools by the pool.
impl Ord for ATermRef<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.index
            .cmp(&other.index)
            .then_with(|| self.pool.id().cmp(&other.pool.id()))
    }
}

impl fmt::Display for ATermRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl fmt::Debug for ATermRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Uses an explicit stack such that deeply nested terms can be printed.
        let mut stack = vec![Fragment::Term(*self)];

        while let Some(fragment) = stack.pop() {
            let term = match fragment {
                Fragment::Text(text) => {
                    write!(f, "{text}")?;
                    continue;
                }
                Fragment::Term(term) => term,
            };

            let mut fragments = Vec::new();
            if term.is_int() {
                write!(f, "{}", term.int_value())?;
            } else if is_list_term(&term) || is_empty_list_term(&term) {
                write!(f, "[")?;

                let mut list = term;
                while is_list_term(&list) {
                    if !fragments.is_empty() {
                        fragments.push(Fragment::Text(", "));
                    }
                    fragments.push(Fragment::Term(list.arg(0)));
                    list = list.arg(1);
                }
                fragments.push(Fragment::Text("]"));
            } else if is_annotated(&term) {
                fragments.push(Fragment::Term(term.arg(0)));
                fragments.push(Fragment::Text("{"));

                let mut list = term.arg(1);
                while is_list_term(&list) {
                    if fragments.len() > 2 {
                        fragments.push(Fragment::Text(", "));
                    }

                    let annotation = list.arg(0);
                    fragments.push(Fragment::Term(annotation.arg(0)));
                    fragments.push(Fragment::Text(": "));
                    fragments.push(Fragment::Term(annotation.arg(1)));
                    list = list.arg(1);
                }
                fragments.push(Fragment::Text("}"));
            } else if term.arguments().is_empty() {
                write!(f, "{}", term.get_head_symbol().name())?;
            } else {
                write!(f, "{}(", term.get_head_symbol().name())?;

                // Separate the arguments, avoiding a trailing comma
                for (index, arg) in term.arguments().enumerate() {
                    if index > 0 {
                        fragments.push(Fragment::Text(", "));
                    }
                    fragments.push(Fragment::Term(arg));
                }
                fragments.push(Fragment::Text(")"));
            }

            stack.extend(fragments.into_iter().rev());
        }

        Ok(())
    }
}

/// A part of the textual representation of a term that remains to be written.
enum Fragment<'a> {
    Term(ATermRef<'a>),
    Text(&'static str),
}

/// The counted version of [ATermRef], the term stays in the pool as long as
/// there is a handle or a parent term that refers to it.
pub struct ATerm {
    pool: TermPool,
    index: TermIndex,
}

impl ATerm {
    /// Takes ownership of a reference to the term.
    pub(crate) fn from_index(pool: TermPool, index: TermIndex) -> ATerm {
        ATerm { pool, index }
    }

    /// Returns a borrow from the term
    pub fn get(&self) -> ATermRef<'_> {
        ATermRef::from_index(&self.pool, self.index)
    }
}

impl<'a, 'b> Term<'a, 'b> for ATerm
where
    'b: 'a,
{
    fn protect(&self) -> ATerm {
        self.clone()
    }

    fn copy(&'b self) -> ATermRef<'a> {
        self.get()
    }

    fn index(&self) -> TermIndex {
        self.index
    }

    fn pool(&self) -> &TermPool {
        &self.pool
    }
}

impl Drop for ATerm {
    fn drop(&mut self) {
        self.pool.release(self.index)
    }
}

impl Clone for ATerm {
    fn clone(&self) -> Self {
        self.pool.protect(self.index)
    }
}

impl<'a> From<ATermRef<'a>> for ATerm {
    fn from(value: ATermRef<'a>) -> Self {
        value.protect()
    }
}

impl fmt::Display for ATerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

impl fmt::Debug for ATerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.get())
    }
}

impl Hash for ATerm {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.get().hash(state)
    }
}

impl PartialEq for ATerm {
    fn eq(&self, other: &Self) -> bool {
        self.get().eq(&other.get())
    }
}

impl PartialEq<ATermRef<'_>> for ATerm {
    fn eq(&self, other: &ATermRef<'_>) -> bool {
        self.get().eq(other)
    }
}

impl PartialEq<ATerm> for ATermRef<'_> {
    fn eq(&self, other: &ATerm) -> bool {
        self.eq(&other.get())
    }
}

impl PartialOrd for ATerm {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ATerm {
    fn cmp(&self, other: &Self) -> Ordering {
        self.get().cmp(&other.get())
    }
}

impl Eq for ATerm {}

/// An iterator over the arguments of a term.
pub struct ATermArgs<'a> {
    term: ATermRef<'a>,
    front: usize,
    back: usize,
}

impl<'a> ATermArgs<'a> {
    fn new(term: ATermRef<'a>) -> ATermArgs<'a> {
        let arity = term.pool.store().terms.arguments(term.index).len();
        ATermArgs {
            term,
            front: 0,
            back: arity,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.front == self.back
    }
}

impl<'a> Iterator for ATermArgs<'a> {
    type Item = ATermRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front < self.back {
            let result = self.term.arg(self.front);
            self.front += 1;
            Some(result)
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let length = self.back - self.front;
        (length, Some(length))
    }
}

impl DoubleEndedIterator for ATermArgs<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front < self.back {
            self.back -= 1;
            Some(self.term.arg(self.back))
        } else {
            None
        }
    }
}

impl ExactSizeIterator for ATermArgs<'_> {}

/// An iterator over all subterms of the given [ATerm] in preorder traversal, i.e.,
/// for f(g(a), b) we visit f(g(a), b), g(a), a, b.
pub struct TermIterator<'a> {
    stack: Vec<ATermRef<'a>>,
}

impl<'a> TermIterator<'a> {
    pub fn new(term: ATermRef<'a>) -> TermIterator<'a> {
        TermIterator { stack: vec![term] }
    }
}

impl<'a> Iterator for TermIterator<'a> {
    type Item = ATermRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let term = self.stack.pop()?;

        // Put subterms on the stack in reverse, such that the first argument is visited first.
        self.stack.extend(term.arguments().rev());
        Some(term)
    }
}

/// Blanket implementation allowing passing borrowed terms as references.
impl<'a, 'b, T: Term<'a, 'b>> Term<'a, 'b> for &'b T {
    fn protect(&self) -> ATerm {
        (*self).protect()
    }

    fn copy(&'b self) -> ATermRef<'a> {
        (*self).copy()
    }

    fn index(&self) -> TermIndex {
        (*self).index()
    }

    fn pool(&self) -> &TermPool {
        (*self).pool()
    }
}

#[cfg(test)]
mod tests {
    use merc_utilities::test_logger;

    use crate::Symbol;

    use super::*;

    #[test]
    fn test_term_arguments() {
        test_logger();
        let pool = TermPool::new();

        let f = Symbol::new(&pool, "f", 2);
        let a = pool.create_constant(&Symbol::new(&pool, "a", 0));
        let b = pool.create_constant(&Symbol::new(&pool, "b", 0));
        let t = pool.create_term(&f, &[a.copy(), b.copy()]);

        assert_eq!(t.get_head_symbol(), f);
        assert_eq!(t.arg(0), a);
        assert_eq!(t.arg(1), b);
        assert_eq!(t.arguments().len(), 2);
        assert_eq!(t.arguments().rev().collect::<Vec<_>>(), vec![b.copy(), a.copy()]);
        assert_eq!(
            t.try_arg(2),
            Err(TermError::ArgumentOutOfRange {
                symbol: "f".to_string(),
                index: 2,
                arity: 2
            })
        );
    }

    #[test]
    #[should_panic(expected = "argument 1 does not exist for a term with head symbol a of arity 0")]
    fn test_arg_out_of_range() {
        let pool = TermPool::new();
        let a = pool.create_constant(&Symbol::new(&pool, "a", 0));
        a.arg(1);
    }

    #[test]
    fn test_term_iterator() {
        test_logger();
        let pool = TermPool::new();

        let f = Symbol::new(&pool, "f", 2);
        let g = Symbol::new(&pool, "g", 1);
        let a = pool.create_constant(&Symbol::new(&pool, "a", 0));
        let b = pool.create_constant(&Symbol::new(&pool, "b", 0));

        let g_a = pool.create_term(&g, &[a.copy()]);
        let t = pool.create_term(&f, &[g_a.copy(), b.copy()]);

        let subterms: Vec<String> = t.iter().map(|term| term.to_string()).collect();
        assert_eq!(subterms, vec!["f(g(a), b)", "g(a)", "a", "b"]);
    }

    #[test]
    fn test_int_value() {
        test_logger();
        let pool = TermPool::new();

        let five = pool.create_int(5);
        let a = pool.create_constant(&Symbol::new(&pool, "a", 0));

        assert!(five.is_int());
        assert_eq!(five.int_value(), 5);
        assert!(!a.is_int());
        assert_eq!(
            a.try_int_value(),
            Err(TermError::NotAnInteger { symbol: "a".to_string() })
        );
    }

    #[test]
    fn test_order_of_different_pools() {
        test_logger();
        let pool = TermPool::new();
        let other = TermPool::new();

        let a = pool.create_constant(&Symbol::new(&pool, "a", 0));
        let b = other.create_constant(&Symbol::new(&other, "a", 0));
        assert_eq!(a.index(), b.index());
        assert_ne!(a, b);
        assert_ne!(a.cmp(&b), Ordering::Equal);
        assert_eq!(a.cmp(&b), b.cmp(&a).reverse());
        assert_ne!(a.get_head_symbol().cmp(&b.get_head_symbol()), Ordering::Equal);
    }

    #[test]
    fn test_clone_and_drop() {
        test_logger();
        let pool = TermPool::new();

        let a = pool.create_constant(&Symbol::new(&pool, "a", 0));
        let copy = a.clone();
        assert_eq!(pool.reference_count(&a), 2);

        drop(copy);
        assert_eq!(pool.reference_count(&a), 1);

        let protected = a.copy().protect();
        assert_eq!(protected, a);
        assert_eq!(pool.reference_count(&a), 2);
    }
}
