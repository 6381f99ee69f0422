#![forbid(unsafe_code)]

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use equivalent::Equivalent;
use rustc_hash::FxHashMap;

use merc_utilities::debug_trace;

use crate::hash::symbol_hash;
use crate::storage::BlockStore;
use crate::storage::Chained;
use crate::storage::ChainedTable;
use crate::term_pool::TermPoolConfig;

/// The index of a function symbol in the [SymbolPool].
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolIndex(usize);

impl SymbolIndex {
    #[cfg(test)]
    pub(crate) fn new(index: usize) -> Self {
        SymbolIndex(index)
    }

    /// Returns the underlying index.
    pub fn value(self) -> usize {
        self.0
    }
}

impl fmt::Debug for SymbolIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymbolIndex({})", self.0)
    }
}

/// Pool for maximal sharing of function symbols. Ensures that function symbols
/// with the same name and arity have the same [SymbolIndex].
///
/// Every symbol has a reference count, which counts both the symbol handles
/// and the terms that have the symbol as head. A symbol whose count drops to
/// zero is removed, and its slot is reused for a later symbol.
pub struct SymbolPool {
    /// Storage of all function symbols.
    symbols: BlockStore<SharedSymbol>,

    /// Hash index from name and arity to the symbol.
    table: ChainedTable,

    /// A map from prefixes to counters that track the next available numeric suffix.
    prefixes: FxHashMap<String, Rc<Cell<usize>>>,
}

impl SymbolPool {
    /// Creates a new empty symbol pool.
    pub(crate) fn new(config: &TermPoolConfig) -> Self {
        Self {
            symbols: BlockStore::new(config.block_size),
            table: ChainedTable::new(
                "function symbol",
                config.symbol_table_size,
                config.max_load_percent,
                config.maximum_table_size,
            ),
            prefixes: FxHashMap::default(),
        }
    }

    /// Returns the symbol with the given name and arity, creating it when it
    /// does not exist yet, and increments its reference count.
    pub fn create(&mut self, name: &str, arity: usize) -> SymbolIndex {
        let hash = symbol_hash(name, arity);
        let lookup = SharedSymbolLookup { name, arity };

        if let Some(index) = self.table.find(&self.symbols, hash, |symbol| lookup.equivalent(symbol)) {
            self.symbols.get_mut(index).reference_count += 1;
            return SymbolIndex(index);
        }

        let len = self.symbols.len() + 1;
        self.table.grow_if_needed(&mut self.symbols, len, |symbol| symbol.hash);

        let index = self.symbols.allocate(SharedSymbol {
            name: Rc::from(name),
            arity,
            hash,
            reference_count: 1,
            next: None,
        });
        self.table.insert(&mut self.symbols, hash, index);

        debug_trace!("Created symbol {name}/{arity} at {index}");
        self.update_prefix(name);
        SymbolIndex(index)
    }

    /// Increments the reference count of the symbol.
    pub fn increment(&mut self, symbol: SymbolIndex) {
        self.symbols.get_mut(symbol.0).reference_count += 1;
    }

    /// Decrements the reference count of the symbol, and removes the symbol when it reaches zero.
    pub fn release(&mut self, symbol: SymbolIndex) {
        let shared = self.symbols.get_mut(symbol.0);
        debug_assert!(shared.reference_count > 0, "Symbol {} was released too often", shared.name);

        shared.reference_count -= 1;
        if shared.reference_count == 0 {
            let hash = shared.hash;
            self.table.remove(&mut self.symbols, hash, symbol.0);

            let _removed = self.symbols.free(symbol.0);
            debug_trace!("Removed symbol {}/{} at {}", _removed.name, _removed.arity, symbol.0);
        }
    }

    /// Returns the name of the symbol.
    pub fn name(&self, symbol: SymbolIndex) -> &Rc<str> {
        &self.symbols.get(symbol.0).name
    }

    /// Returns the arity of the symbol.
    pub fn arity(&self, symbol: SymbolIndex) -> usize {
        self.symbols.get(symbol.0).arity
    }

    /// Returns the reference count of the symbol.
    pub fn reference_count(&self, symbol: SymbolIndex) -> usize {
        self.symbols.get(symbol.0).reference_count
    }

    /// Returns the index of the symbol with the given name and arity, without creating it.
    pub fn find(&self, name: &str, arity: usize) -> Option<SymbolIndex> {
        let lookup = SharedSymbolLookup { name, arity };
        self.table
            .find(&self.symbols, symbol_hash(name, arity), |symbol| lookup.equivalent(symbol))
            .map(SymbolIndex)
    }

    /// Returns true iff the symbol with the given index exists.
    pub fn contains(&self, symbol: SymbolIndex) -> bool {
        self.symbols.contains(symbol.0)
    }

    /// Returns the number of symbols in the pool.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Returns true if the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.symbols.len() == 0
    }

    /// Returns the number of buckets of the hash index.
    pub fn table_size(&self) -> usize {
        self.table.size()
    }

    /// Returns a counter for the next numeric suffix of `prefix` such that
    /// `prefix` followed by the counter is not the name of any symbol.
    pub fn create_prefix(&mut self, prefix: &str) -> Rc<Cell<usize>> {
        if let Some(counter) = self.prefixes.get(prefix) {
            return counter.clone();
        }

        // Start beyond the largest numeric suffix of the existing symbols.
        let counter = Rc::new(Cell::new(0));
        for (_, symbol) in self.symbols.iter() {
            if let Some(number) = numeric_suffix(&symbol.name, prefix) {
                counter.set(counter.get().max(number.saturating_add(1)));
            }
        }

        self.prefixes.insert(prefix.to_string(), counter.clone());
        counter
    }

    /// Removes the counter for the given prefix.
    pub fn remove_prefix(&mut self, prefix: &str) {
        self.prefixes.remove(prefix);
    }

    /// Makes sure that no registered prefix counter will generate `name`.
    fn update_prefix(&self, name: &str) {
        for (prefix, counter) in &self.prefixes {
            if let Some(number) = numeric_suffix(name, prefix) {
                counter.set(counter.get().max(number.saturating_add(1)));
            }
        }
    }
}

impl fmt::Debug for SymbolPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymbolPool {{ symbols: {}, buckets: {} }}", self.len(), self.table_size())
    }
}

/// Returns `n` when `name` is `prefix` followed by the decimal number `n`.
fn numeric_suffix(name: &str, prefix: &str) -> Option<usize> {
    let suffix = name.strip_prefix(prefix)?;
    if suffix.is_empty() || !suffix.bytes().all(|c| c.is_ascii_digit()) {
        return None;
    }

    suffix.parse().ok()
}

/// A function symbol with a name and arity.
pub(crate) struct SharedSymbol {
    name: Rc<str>,
    arity: usize,

    /// Cached result of [symbol_hash] for rehashing.
    hash: u64,

    reference_count: usize,

    /// The next symbol in the same bucket.
    next: Option<usize>,
}

impl Chained for SharedSymbol {
    fn next(&self) -> Option<usize> {
        self.next
    }

    fn set_next(&mut self, next: Option<usize>) {
        self.next = next;
    }
}

/// A borrowed key to look up a [SharedSymbol] without allocating its name.
struct SharedSymbolLookup<'a> {
    name: &'a str,
    arity: usize,
}

impl Equivalent<SharedSymbol> for SharedSymbolLookup<'_> {
    fn equivalent(&self, other: &SharedSymbol) -> bool {
        self.arity == other.arity && self.name == &*other.name
    }
}

#[cfg(test)]
mod tests {
    use merc_utilities::test_logger;

    use super::*;

    #[test]
    fn test_symbol_sharing() {
        test_logger();
        let mut pool = SymbolPool::new(&TermPoolConfig::default());

        let f1 = pool.create("f", 2);
        let f2 = pool.create("f", 2);
        let f3 = pool.create("f", 3);

        assert_eq!(f1, f2);
        assert_ne!(f1, f3);
        assert_eq!(pool.reference_count(f1), 2);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_symbol_release_reuses_slot() {
        test_logger();
        let mut pool = SymbolPool::new(&TermPoolConfig::default());

        let f = pool.create("f", 1);
        let g = pool.create("g", 0);
        pool.release(f);

        assert!(!pool.contains(f));
        assert_eq!(pool.find("f", 1), None);
        assert_eq!(pool.find("g", 0), Some(g));

        let h = pool.create("h", 4);
        assert_eq!(h, f, "The slot of the removed symbol should be reused");
        assert_eq!(&**pool.name(h), "h");
        assert_eq!(pool.arity(h), 4);
    }

    #[test]
    fn test_symbol_pool_resize() {
        test_logger();
        let config = TermPoolConfig {
            symbol_table_size: 2,
            block_size: 2,
            ..TermPoolConfig::default()
        };
        let mut pool = SymbolPool::new(&config);

        let symbols: Vec<SymbolIndex> = (0..5000).map(|i| pool.create(&format!("s{i}"), i % 3)).collect();
        assert!(pool.table_size() > 2, "The table should have been resized");

        for (i, symbol) in symbols.iter().enumerate() {
            assert_eq!(pool.find(&format!("s{i}"), i % 3), Some(*symbol));
            assert_eq!(pool.reference_count(*symbol), 1);
        }
        assert_eq!(pool.len(), 5000);
    }

    #[test]
    fn test_prefix_counter() {
        test_logger();
        let mut pool = SymbolPool::new(&TermPoolConfig::default());

        pool.create("x69", 0);
        pool.create("x_y", 0);

        let value = pool.create_prefix("x");
        assert_eq!(value.get(), 70);

        pool.create("x_no_effect", 0);
        pool.create("x130", 0);
        assert_eq!(value.get(), 131);

        pool.remove_prefix("x");
        pool.create("x500", 0);
        assert_eq!(value.get(), 131, "A removed prefix is no longer updated");
    }
}
