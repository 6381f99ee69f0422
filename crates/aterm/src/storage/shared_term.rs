#![forbid(unsafe_code)]

use std::fmt;

use equivalent::Equivalent;

use crate::hash::ATermEquals;
use crate::hash::ATermHasher;
use crate::hash::DYNAMIC_ARITY;
use crate::storage::ArgumentSlice;
use crate::storage::Chained;
use crate::storage::SymbolIndex;

/// The index of a term node in the term storage.
///
/// Because terms are maximally shared, two indices (of the same pool) are
/// equal iff the terms that they refer to are structurally equal.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TermIndex(usize);

impl TermIndex {
    pub(crate) fn new(index: usize) -> Self {
        TermIndex(index)
    }

    /// Returns the underlying index.
    pub fn value(self) -> usize {
        self.0
    }
}

impl fmt::Debug for TermIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TermIndex({})", self.0)
    }
}

/// The node that is stored for every term.
///
/// # Details
///
/// Integer terms and application terms share this header. The head symbol of
/// an integer term is the built-in `<aterm_int>` symbol, but the node is only
/// identified by its value.
pub(crate) struct SharedTerm {
    pub(crate) symbol: SymbolIndex,
    pub(crate) kind: SharedTermKind,

    /// The number of handles and parent terms that refer to this node.
    pub(crate) reference_count: usize,

    /// The next node in the same bucket.
    pub(crate) next: Option<usize>,
}

#[derive(Clone, Copy, Debug)]
pub(crate) enum SharedTermKind {
    /// An application term with its arguments in the argument store.
    Application(ArgumentSlice),

    /// An integer term.
    Int(usize),
}

impl Chained for SharedTerm {
    fn next(&self) -> Option<usize> {
        self.next
    }

    fn set_next(&mut self, next: Option<usize>) {
        self.next = next;
    }
}

impl fmt::Debug for SharedTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SharedTerm {{ symbol: {:?}, kind: {:?}, reference_count: {} }}",
            self.symbol, self.kind, self.reference_count
        )
    }
}

/// A view on a stored application term, with its arguments resolved.
#[derive(Clone, Copy, Debug)]
pub struct SharedTermView<'a> {
    pub(crate) symbol: SymbolIndex,
    pub(crate) arguments: &'a [TermIndex],
}

/// A key by which an application term can be found without constructing it.
pub(crate) trait TermKey: for<'a> Equivalent<SharedTermView<'a>> {
    /// The head symbol of the term.
    fn symbol(&self) -> SymbolIndex;

    /// The arguments of the term.
    fn arguments(&self) -> &[TermIndex];

    /// The hash of the term, must be the same as [ATermHasher::hash] of the symbol and arguments.
    fn term_hash(&self) -> u64;
}

/// A cheap reference to the elements of a shared term that can be used for
/// lookup of terms without allocating.
pub(crate) struct SharedTermLookup<'a> {
    pub(crate) symbol: SymbolIndex,
    pub(crate) arguments: &'a [TermIndex],
}

impl Equivalent<SharedTermView<'_>> for SharedTermLookup<'_> {
    fn equivalent(&self, other: &SharedTermView<'_>) -> bool {
        ATermEquals::<DYNAMIC_ARITY>::equals(other, self.symbol, self.arguments)
    }
}

impl TermKey for SharedTermLookup<'_> {
    fn symbol(&self) -> SymbolIndex {
        self.symbol
    }

    fn arguments(&self) -> &[TermIndex] {
        self.arguments
    }

    fn term_hash(&self) -> u64 {
        ATermHasher::<DYNAMIC_ARITY>::hash(self.symbol, self.arguments)
    }
}

/// Same as [SharedTermLookup], but for a number of arguments that is known at compile time.
pub(crate) struct SharedTermLookupFixed<const N: usize> {
    pub(crate) symbol: SymbolIndex,
    pub(crate) arguments: [TermIndex; N],
}

impl<const N: usize> Equivalent<SharedTermView<'_>> for SharedTermLookupFixed<N> {
    fn equivalent(&self, other: &SharedTermView<'_>) -> bool {
        ATermEquals::<N>::equals(other, self.symbol, &self.arguments)
    }
}

impl<const N: usize> TermKey for SharedTermLookupFixed<N> {
    fn symbol(&self) -> SymbolIndex {
        self.symbol
    }

    fn arguments(&self) -> &[TermIndex] {
        &self.arguments
    }

    fn term_hash(&self) -> u64 {
        ATermHasher::<N>::hash_array(self.symbol, &self.arguments)
    }
}
