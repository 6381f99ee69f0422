#![forbid(unsafe_code)]

use std::fmt;

use merc_utilities::debug_trace;

use crate::hash::ATermHasher;
use crate::hash::ATermIntHasher;
use crate::hash::DYNAMIC_ARITY;
use crate::storage::ArgumentSlice;
use crate::storage::ArgumentStore;
use crate::storage::BlockStore;
use crate::storage::ChainedTable;
use crate::storage::SharedTerm;
use crate::storage::SharedTermKind;
use crate::storage::SharedTermView;
use crate::storage::SymbolIndex;
use crate::storage::SymbolPool;
use crate::storage::TermIndex;
use crate::storage::TermKey;
use crate::term_pool::TermPoolConfig;

/// Unique table of all terms, i.e., the hash-consing index.
///
/// # Details
///
/// The nodes are stored in a [BlockStore], and the arguments of application
/// terms in an [ArgumentStore]. There are two bucket indices over the nodes:
/// one for application terms keyed by their symbol and arguments, and one for
/// integer terms keyed by their value.
///
/// Every node keeps a reference count that includes the references from its
/// parents. When a count drops to zero the node is removed, which releases
/// its arguments in turn. This cascade uses an explicit stack so that
/// releasing deeply nested terms cannot overflow the call stack.
pub(crate) struct ATermStorage {
    terms: BlockStore<SharedTerm>,
    arguments: ArgumentStore,

    /// Index of the application terms.
    table: ChainedTable,

    /// Index of the integer terms.
    int_table: ChainedTable,

    /// The terms of which the reference count dropped to zero, reused between releases.
    stack: Vec<TermIndex>,

    /// The number of live application and integer terms.
    application_count: usize,
    int_count: usize,

    /// The number of terms that have been created and deleted.
    created: usize,
    deleted: usize,

    /// The number of times that one of the indices has been resized.
    resizes: usize,
}

impl ATermStorage {
    pub fn new(config: &TermPoolConfig) -> Self {
        Self {
            terms: BlockStore::new(config.block_size),
            arguments: ArgumentStore::new(config.block_size),
            table: ChainedTable::new(
                "term",
                config.term_table_size,
                config.max_load_percent,
                config.maximum_table_size,
            ),
            int_table: ChainedTable::new(
                "integer term",
                config.term_table_size,
                config.max_load_percent,
                config.maximum_table_size,
            ),
            stack: Vec::new(),
            application_count: 0,
            int_count: 0,
            created: 0,
            deleted: 0,
            resizes: 0,
        }
    }

    /// Returns the application term for the given key, creating it when it
    /// does not exist yet. The returned reference is owned by the caller.
    /// Returns true iff the term was inserted.
    ///
    /// The arguments of the key must be live terms, and their number must
    /// match the arity of the symbol.
    pub fn create_term(&mut self, symbols: &mut SymbolPool, key: &impl TermKey) -> (TermIndex, bool) {
        debug_assert_eq!(
            symbols.arity(key.symbol()),
            key.arguments().len(),
            "The number of arguments does not match the arity of the symbol"
        );

        let hash = key.term_hash();
        let arguments = &self.arguments;
        if let Some(index) = self
            .table
            .find(&self.terms, hash, |term| key.equivalent(&term.view(arguments)))
        {
            self.terms.get_mut(index).reference_count += 1;
            return (TermIndex::new(index), false);
        }

        // The new term is a parent of each of its arguments.
        for argument in key.arguments() {
            self.terms.get_mut(argument.value()).reference_count += 1;
        }
        symbols.increment(key.symbol());

        let arguments = &self.arguments;
        if self
            .table
            .grow_if_needed(&mut self.terms, self.application_count + 1, |term| {
                term_hash(term, arguments)
            })
        {
            self.resizes += 1;
        }

        let slice = self.arguments.allocate(key.arguments());
        let index = self.terms.allocate(SharedTerm {
            symbol: key.symbol(),
            kind: SharedTermKind::Application(slice),
            reference_count: 1,
            next: None,
        });
        self.table.insert(&mut self.terms, hash, index);
        self.application_count += 1;
        self.created += 1;

        debug_trace!("Created term {index} with symbol {:?} and arguments {:?}", key.symbol(), key.arguments());

        if cfg!(debug_assertions) {
            let arguments = &self.arguments;
            let count = self
                .table
                .count(&self.terms, hash, |term| key.equivalent(&term.view(arguments)));
            assert_eq!(count, 1, "Term {index} is not maximally shared");
        }

        (TermIndex::new(index), true)
    }

    /// Returns the integer term for the given value, creating it when it does
    /// not exist yet. The returned reference is owned by the caller.
    pub fn create_int(&mut self, symbols: &mut SymbolPool, int_symbol: SymbolIndex, value: usize) -> (TermIndex, bool) {
        let hash = ATermIntHasher::hash(value);
        if let Some(index) = self.int_table.find(&self.terms, hash, |term| term.int_value() == Some(value)) {
            self.terms.get_mut(index).reference_count += 1;
            return (TermIndex::new(index), false);
        }

        symbols.increment(int_symbol);

        let arguments = &self.arguments;
        if self
            .int_table
            .grow_if_needed(&mut self.terms, self.int_count + 1, |term| {
                term_hash(term, arguments)
            })
        {
            self.resizes += 1;
        }

        let index = self.terms.allocate(SharedTerm {
            symbol: int_symbol,
            kind: SharedTermKind::Int(value),
            reference_count: 1,
            next: None,
        });
        self.int_table.insert(&mut self.terms, hash, index);
        self.int_count += 1;
        self.created += 1;

        debug_trace!("Created integer term {index} with value {value}");
        debug_assert_eq!(
            self.int_table
                .count(&self.terms, hash, |term| term.int_value() == Some(value)),
            1,
            "Integer term {index} is not maximally shared"
        );

        (TermIndex::new(index), true)
    }

    /// Adds a reference to the given term.
    pub fn increment(&mut self, term: TermIndex) {
        debug_assert!(self.contains(term), "Term {term:?} was already deleted");
        self.terms.get_mut(term.value()).reference_count += 1;
    }

    /// Removes a reference to the given term. Deletes the term when this was
    /// the last reference, together with all its arguments that are no longer
    /// referenced.
    pub fn release(&mut self, symbols: &mut SymbolPool, term: TermIndex) {
        let shared = self.terms.get_mut(term.value());
        debug_assert!(shared.reference_count > 0, "Term {term:?} was released too often");

        shared.reference_count -= 1;
        if shared.reference_count > 0 {
            return;
        }

        self.stack.push(term);
        while let Some(index) = self.stack.pop() {
            let shared = self.terms.get(index.value());
            let hash = term_hash(shared, &self.arguments);
            let kind = shared.kind;

            match kind {
                SharedTermKind::Application(_) => {
                    self.table.remove(&mut self.terms, hash, index.value());
                    self.application_count -= 1;
                }
                SharedTermKind::Int(_) => {
                    self.int_table.remove(&mut self.terms, hash, index.value());
                    self.int_count -= 1;
                }
            }

            let shared = self.terms.free(index.value());
            if let SharedTermKind::Application(slice) = shared.kind {
                for argument in self.arguments.get(slice) {
                    let child = self.terms.get_mut(argument.value());
                    child.reference_count -= 1;
                    if child.reference_count == 0 {
                        self.stack.push(*argument);
                    }
                }

                self.arguments.free(slice);
            }

            symbols.release(shared.symbol);
            self.deleted += 1;
            debug_trace!("Deleted term {}", index.value());
        }
    }

    /// Returns the head symbol of the term.
    pub fn symbol(&self, term: TermIndex) -> SymbolIndex {
        self.terms.get(term.value()).symbol
    }

    /// Returns the arguments of the term, which are empty for integer terms.
    pub fn arguments(&self, term: TermIndex) -> &[TermIndex] {
        match self.terms.get(term.value()).kind {
            SharedTermKind::Application(slice) => self.arguments.get(slice),
            SharedTermKind::Int(_) => &[],
        }
    }

    /// Returns the value of an integer term.
    pub fn int_value(&self, term: TermIndex) -> Option<usize> {
        self.terms.get(term.value()).int_value()
    }

    /// Returns the number of references to the term.
    pub fn reference_count(&self, term: TermIndex) -> usize {
        self.terms.get(term.value()).reference_count
    }

    /// Returns true iff the given index refers to a live term.
    pub fn contains(&self, term: TermIndex) -> bool {
        self.terms.contains(term.value())
    }

    /// Returns the number of live terms.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Returns the number of terms that have been created so far.
    pub fn created(&self) -> usize {
        self.created
    }

    /// Returns the number of terms that have been deleted so far.
    pub fn deleted(&self) -> usize {
        self.deleted
    }

    /// Returns the number of resizes of the term indices.
    pub fn resizes(&self) -> usize {
        self.resizes
    }

    /// Returns the number of buckets of the application and integer indices.
    pub fn table_sizes(&self) -> (usize, usize) {
        (self.table.size(), self.int_table.size())
    }

    /// Returns the number of node slots and argument slots that have been allocated.
    pub fn capacity(&self) -> (usize, usize) {
        (self.terms.capacity(), self.arguments.capacity())
    }
}

impl fmt::Debug for ATermStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ATermStorage {{ terms: {:?}, arguments: {}, created: {}, deleted: {} }}",
            self.terms,
            self.arguments.len(),
            self.created,
            self.deleted
        )
    }
}

impl SharedTerm {
    /// Resolves the arguments of the term.
    pub(crate) fn view<'a>(&self, arguments: &'a ArgumentStore) -> SharedTermView<'a> {
        SharedTermView {
            symbol: self.symbol,
            arguments: match self.kind {
                SharedTermKind::Application(slice) => arguments.get(slice),
                SharedTermKind::Int(_) => &[],
            },
        }
    }

    pub(crate) fn int_value(&self) -> Option<usize> {
        match self.kind {
            SharedTermKind::Int(value) => Some(value),
            SharedTermKind::Application(_) => None,
        }
    }
}

/// Recomputes the hash under which the term is stored in its index.
fn term_hash(term: &SharedTerm, arguments: &ArgumentStore) -> u64 {
    match term.kind {
        SharedTermKind::Application(slice) => slice_hash(term.symbol, slice, arguments),
        SharedTermKind::Int(value) => ATermIntHasher::hash(value),
    }
}

fn slice_hash(symbol: SymbolIndex, slice: ArgumentSlice, arguments: &ArgumentStore) -> u64 {
    ATermHasher::<DYNAMIC_ARITY>::hash(symbol, arguments.get(slice))
}

#[cfg(test)]
mod tests {
    use merc_utilities::random_test;
    use merc_utilities::test_logger;
    use rand::Rng;

    use crate::storage::SharedTermLookup;
    use crate::storage::SharedTermLookupFixed;

    use super::*;

    fn create(storage: &mut ATermStorage, symbols: &mut SymbolPool, symbol: SymbolIndex, arguments: &[TermIndex]) -> TermIndex {
        storage.create_term(symbols, &SharedTermLookup { symbol, arguments }).0
    }

    #[test]
    fn test_maximal_sharing() {
        test_logger();
        let config = TermPoolConfig::default();
        let mut symbols = SymbolPool::new(&config);
        let mut storage = ATermStorage::new(&config);

        let a = symbols.create("a", 0);
        let f = symbols.create("f", 2);

        let a_term = create(&mut storage, &mut symbols, a, &[]);
        let t1 = create(&mut storage, &mut symbols, f, &[a_term, a_term]);
        let (t2, inserted) = storage.create_term(
            &mut symbols,
            &SharedTermLookupFixed {
                symbol: f,
                arguments: [a_term, a_term],
            },
        );

        assert_eq!(t1, t2);
        assert!(!inserted, "The fixed arity lookup should find the existing term");
        assert_eq!(storage.reference_count(t1), 2);
        assert_eq!(storage.reference_count(a_term), 3, "One handle and two parent references");
        assert_eq!(storage.len(), 2);
    }

    #[test]
    fn test_release_cascade() {
        test_logger();
        let config = TermPoolConfig::default();
        let mut symbols = SymbolPool::new(&config);
        let mut storage = ATermStorage::new(&config);

        let a = symbols.create("a", 0);
        let g = symbols.create("g", 1);

        let mut term = create(&mut storage, &mut symbols, a, &[]);
        for _ in 0..100 {
            let parent = create(&mut storage, &mut symbols, g, &[term]);
            storage.release(&mut symbols, term);
            term = parent;
        }

        assert_eq!(storage.len(), 101);
        assert_eq!(symbols.reference_count(g), 101);

        storage.release(&mut symbols, term);
        assert_eq!(storage.len(), 0, "All terms should be deleted");
        assert_eq!(storage.deleted(), 101);
        assert_eq!(symbols.reference_count(g), 1, "Only the symbol handle remains");
    }

    #[test]
    fn test_int_terms() {
        test_logger();
        let config = TermPoolConfig::default();
        let mut symbols = SymbolPool::new(&config);
        let mut storage = ATermStorage::new(&config);
        let int_symbol = symbols.create("<aterm_int>", 0);

        let (x, inserted) = storage.create_int(&mut symbols, int_symbol, 42);
        assert!(inserted);
        let (y, inserted) = storage.create_int(&mut symbols, int_symbol, 42);
        assert!(!inserted);
        assert_eq!(x, y);
        assert_eq!(storage.int_value(x), Some(42));
        assert!(storage.arguments(x).is_empty());

        storage.release(&mut symbols, x);
        storage.release(&mut symbols, y);
        assert!(!storage.contains(x));
        assert_eq!(symbols.reference_count(int_symbol), 1);
    }

    #[test]
    fn test_random_storage_resize() {
        random_test(10, |rng| {
            let config = TermPoolConfig {
                term_table_size: 2,
                block_size: 2,
                ..TermPoolConfig::default()
            };
            let mut symbols = SymbolPool::new(&config);
            let mut storage = ATermStorage::new(&config);

            let a = symbols.create("a", 0);
            let f = symbols.create("f", 2);
            let mut terms = vec![create(&mut storage, &mut symbols, a, &[])];

            for _ in 0..500 {
                let left = terms[rng.random_range(0..terms.len())];
                let right = terms[rng.random_range(0..terms.len())];
                terms.push(create(&mut storage, &mut symbols, f, &[left, right]));
            }
            assert!(storage.resizes() > 0, "The term index should have been resized");

            // Every term can still be found, and creating it again yields the same index.
            for term in terms.clone() {
                let arguments: Vec<TermIndex> = storage.arguments(term).to_vec();
                let symbol = storage.symbol(term);
                assert_eq!(create(&mut storage, &mut symbols, symbol, &arguments), term);
                storage.release(&mut symbols, term);
            }

            for term in terms {
                storage.release(&mut symbols, term);
            }
            assert_eq!(storage.len(), 0);
        });
    }
}
