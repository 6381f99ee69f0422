#![forbid(unsafe_code)]

use std::cell::Cell;
use std::cell::Ref;
use std::cell::RefCell;
use std::cell::RefMut;
use std::fmt;
use std::rc::Rc;

use log::debug;
use log::warn;
use smallvec::SmallVec;

use merc_utilities::MercError;

use crate::ATerm;
use crate::ATermRef;
use crate::Symb;
use crate::Symbol;
use crate::SymbolRef;
use crate::Term;
use crate::TermError;
use crate::error::contract;
use crate::storage::ATermStorage;
use crate::storage::SharedTermLookup;
use crate::storage::SharedTermLookupFixed;
use crate::storage::SymbolIndex;
use crate::storage::SymbolPool;
use crate::storage::TermIndex;
use crate::storage::TermKey;

/// The parameters of the tables of a [TermPool].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TermPoolConfig {
    /// The initial number of buckets of the symbol index, rounded up to a power of two.
    pub symbol_table_size: usize,

    /// The initial number of buckets of the term indices, rounded up to a power of two.
    pub term_table_size: usize,

    /// The number of slots in the first block of the node stores, later blocks double in size.
    pub block_size: usize,

    /// The load, as a percentage of the number of buckets, at which an index is doubled.
    pub max_load_percent: usize,

    /// The number of buckets beyond which an index does not grow.
    pub maximum_table_size: usize,
}

impl Default for TermPoolConfig {
    fn default() -> Self {
        Self {
            symbol_table_size: 16384,
            term_table_size: 16384,
            block_size: 1024,
            max_load_percent: 75,
            maximum_table_size: usize::MAX,
        }
    }
}

/// The function symbols that are created together with the pool.
#[derive(Clone, Copy)]
struct BuiltinSymbols {
    int: SymbolIndex,
    list: SymbolIndex,
    empty_list: SymbolIndex,
    annotated: SymbolIndex,
    annotation: SymbolIndex,
}

/// The symbol pool and the term storage, which are always borrowed together.
pub(crate) struct TermStore {
    pub(crate) symbols: SymbolPool,
    pub(crate) terms: ATermStorage,
}

impl TermStore {
    fn metrics(&self) -> TermPoolMetrics {
        let (term_buckets, int_term_buckets) = self.terms.table_sizes();
        let (term_capacity, argument_capacity) = self.terms.capacity();

        TermPoolMetrics {
            terms: self.terms.len(),
            symbols: self.symbols.len(),
            created_terms: self.terms.created(),
            deleted_terms: self.terms.deleted(),
            resizes: self.terms.resizes(),
            term_buckets,
            int_term_buckets,
            symbol_buckets: self.symbols.table_size(),
            term_capacity,
            argument_capacity,
        }
    }
}

impl Drop for TermStore {
    fn drop(&mut self) {
        debug!("Dropping term pool. {}", self.metrics());
    }
}

struct SharedTermPool {
    store: RefCell<TermStore>,
    builtins: BuiltinSymbols,
}

/// The explicit context that owns all function symbols and terms.
///
/// # Details
///
/// Cloning a pool is cheap and yields a handle to the same pool. Every
/// [ATerm] and [Symbol] keeps its pool alive, and terms of different pools
/// cannot be combined. Terms are maximally shared within a pool, so two terms
/// of the same pool are equal iff they have the same [TermIndex].
///
/// The pool is single threaded, it uses interior mutability so that terms can
/// be created through a shared reference.
#[derive(Clone)]
pub struct TermPool {
    shared: Rc<SharedTermPool>,
}

impl TermPool {
    /// Creates a pool with the default configuration.
    pub fn new() -> TermPool {
        TermPool::with_config(TermPoolConfig::default())
    }

    /// Creates a pool with the given configuration.
    pub fn with_config(config: TermPoolConfig) -> TermPool {
        let mut symbols = SymbolPool::new(&config);

        // The built-in symbols are never released.
        let builtins = BuiltinSymbols {
            int: symbols.create("<aterm_int>", 0),
            list: symbols.create("<list_constructor>", 2),
            empty_list: symbols.create("<empty_list>", 0),
            annotated: symbols.create("<annotated>", 2),
            annotation: symbols.create("<annotation>", 2),
        };

        let terms = ATermStorage::new(&config);
        debug!("Created term pool with {config:?}");

        TermPool {
            shared: Rc::new(SharedTermPool {
                store: RefCell::new(TermStore { symbols, terms }),
                builtins,
            }),
        }
    }

    /// Returns true iff both handles refer to the same pool.
    pub fn ptr_eq(&self, other: &TermPool) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }

    /// Returns an identifier of the pool that is unique among the live pools.
    pub(crate) fn id(&self) -> usize {
        Rc::as_ptr(&self.shared) as usize
    }

    /// Creates a function symbol with the given name and arity, or returns the existing one.
    pub fn create_symbol(&self, name: &str, arity: usize) -> Symbol {
        let index = self.store_mut().symbols.create(name, arity);
        Symbol::from_index(self.clone(), index)
    }

    /// Creates a function symbol whose name consists of the prefix followed by
    /// a number, such that the name is not used by any existing symbol.
    ///
    /// The prefix stays registered, see [TermPool::register_prefix].
    pub fn create_fresh_symbol(&self, prefix: &str, arity: usize) -> Symbol {
        let index = {
            let mut store = self.store_mut();
            let counter = store.symbols.create_prefix(prefix);
            let name = format!("{prefix}{}", counter.get());

            // Creating the symbol increments the counter.
            store.symbols.create(&name, arity)
        };

        Symbol::from_index(self.clone(), index)
    }

    /// Returns a counter for the prefix, for which the name `prefix` followed
    /// by the value of the counter is not used by any symbol. The counter is
    /// increased whenever such a symbol is created.
    pub fn register_prefix(&self, prefix: &str) -> Rc<Cell<usize>> {
        self.store_mut().symbols.create_prefix(prefix)
    }

    /// Stops maintaining the counter of the given prefix.
    pub fn remove_prefix(&self, prefix: &str) {
        self.store_mut().symbols.remove_prefix(prefix)
    }

    /// Creates the term with the given head symbol and arguments.
    ///
    /// # Panics
    ///
    /// When the number of arguments does not match the arity of the symbol, or
    /// when the symbol or one of the arguments belongs to another pool.
    pub fn create_term<'a, 'b, 'c, 'd, T>(&self, symbol: &'b impl Symb<'a, 'b>, arguments: &[T]) -> ATerm
    where
        T: Term<'c, 'd>,
    {
        contract(self.try_create_term(symbol, arguments))
    }

    /// Same as [TermPool::create_term], but returns an error when the contract is violated.
    pub fn try_create_term<'a, 'b, 'c, 'd, T>(
        &self,
        symbol: &'b impl Symb<'a, 'b>,
        arguments: &[T],
    ) -> Result<ATerm, TermError>
    where
        T: Term<'c, 'd>,
    {
        let symbol = self.own_symbol(symbol)?;
        let arguments = arguments
            .iter()
            .map(|argument| self.own_term(argument))
            .collect::<Result<SmallVec<[TermIndex; 8]>, TermError>>()?;

        self.create(
            symbol,
            &SharedTermLookup {
                symbol,
                arguments: &arguments,
            },
        )
    }

    /// Creates a term of which the number of arguments is known at compile time.
    pub fn create_term_fixed<'a, 'b, 'c, 'd, T, const N: usize>(
        &self,
        symbol: &'b impl Symb<'a, 'b>,
        arguments: &[T; N],
    ) -> ATerm
    where
        T: Term<'c, 'd>,
    {
        let symbol = contract(self.own_symbol(symbol));

        let mut indices = [TermIndex::default(); N];
        for (index, argument) in indices.iter_mut().zip(arguments) {
            *index = contract(self.own_term(argument));
        }

        contract(self.create(
            symbol,
            &SharedTermLookupFixed {
                symbol,
                arguments: indices,
            },
        ))
    }

    /// Creates a term with the given head symbol and the arguments produced by the iterator.
    pub fn create_term_iter<'a, 'b, 'c, 'd, I, T>(&self, symbol: &'b impl Symb<'a, 'b>, iter: I) -> ATerm
    where
        I: IntoIterator<Item = T>,
        T: Term<'c, 'd>,
    {
        let arguments: SmallVec<[T; 8]> = iter.into_iter().collect();
        self.create_term(symbol, &arguments)
    }

    /// Creates a term with the given head symbol from an iterator of which
    /// every argument can fail. Stops at the first error.
    pub fn try_create_term_iter<'a, 'b, 'c, 'd, I, T>(
        &self,
        symbol: &'b impl Symb<'a, 'b>,
        iter: I,
    ) -> Result<ATerm, MercError>
    where
        I: IntoIterator<Item = Result<T, MercError>>,
        T: Term<'c, 'd>,
    {
        let arguments = iter.into_iter().collect::<Result<SmallVec<[T; 8]>, MercError>>()?;
        Ok(self.try_create_term(symbol, &arguments)?)
    }

    /// Creates the constant term for a symbol of arity zero.
    pub fn create_constant<'a, 'b>(&self, symbol: &'b impl Symb<'a, 'b>) -> ATerm {
        let arguments: &[ATermRef<'_>] = &[];
        self.create_term(symbol, arguments)
    }

    /// Creates the integer term with the given value.
    pub fn create_int(&self, value: usize) -> ATerm {
        let index = {
            let mut store = self.store_mut();
            let store = &mut *store;
            store
                .terms
                .create_int(&mut store.symbols, self.shared.builtins.int, value)
                .0
        };

        ATerm::from_index(self.clone(), index)
    }

    /// Returns the number of live terms.
    pub fn len(&self) -> usize {
        self.store().terms.len()
    }

    /// Returns true iff there are no live terms.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of function symbols, including the built-in ones.
    pub fn symbol_count(&self) -> usize {
        self.store().symbols.len()
    }

    /// Returns the number of handles and parent terms that refer to the term.
    pub fn reference_count<'a, 'b>(&self, term: &'b impl Term<'a, 'b>) -> usize {
        let index = contract(self.own_term(term));
        self.store().terms.reference_count(index)
    }

    /// Returns the number of handles and terms that refer to the symbol.
    pub fn symbol_reference_count<'a, 'b>(&self, symbol: &'b impl Symb<'a, 'b>) -> usize {
        let index = contract(self.own_symbol(symbol));
        self.store().symbols.reference_count(index)
    }

    /// Returns the function symbol with the given name and arity when it
    /// exists. The returned handle keeps the symbol alive.
    pub fn find_symbol(&self, name: &str, arity: usize) -> Option<Symbol> {
        let index = self.store().symbols.find(name, arity)?;
        Some(self.protect_symbol(index))
    }

    /// Returns the metrics of the term pool, can be formatted and written to output.
    pub fn metrics(&self) -> TermPoolMetrics {
        self.store().metrics()
    }

    /// Returns the head symbol of integer terms.
    pub fn int_symbol(&self) -> SymbolRef<'_> {
        SymbolRef::from_index(self, self.shared.builtins.int)
    }

    /// Returns the head symbol of non-empty lists.
    pub fn list_symbol(&self) -> SymbolRef<'_> {
        SymbolRef::from_index(self, self.shared.builtins.list)
    }

    /// Returns the symbol of the empty list.
    pub fn empty_list_symbol(&self) -> SymbolRef<'_> {
        SymbolRef::from_index(self, self.shared.builtins.empty_list)
    }

    /// Returns the head symbol of annotated terms.
    pub fn annotated_symbol(&self) -> SymbolRef<'_> {
        SymbolRef::from_index(self, self.shared.builtins.annotated)
    }

    /// Returns the head symbol of a single annotation.
    pub fn annotation_symbol(&self) -> SymbolRef<'_> {
        SymbolRef::from_index(self, self.shared.builtins.annotation)
    }

    /// Adds a reference to the term and returns it as a handle.
    pub(crate) fn protect(&self, term: TermIndex) -> ATerm {
        self.store_mut().terms.increment(term);
        ATerm::from_index(self.clone(), term)
    }

    /// Adds a reference to the symbol and returns it as a handle.
    pub(crate) fn protect_symbol(&self, symbol: SymbolIndex) -> Symbol {
        self.store_mut().symbols.increment(symbol);
        Symbol::from_index(self.clone(), symbol)
    }

    /// Removes the reference of a dropped handle.
    pub(crate) fn release(&self, term: TermIndex) {
        match self.shared.store.try_borrow_mut() {
            Ok(mut store) => {
                let store = &mut *store;
                store.terms.release(&mut store.symbols, term);
            }
            Err(_) => warn!("Leaking term {term:?}, the pool is in use while the handle is dropped"),
        }
    }

    /// Removes the reference of a dropped symbol handle.
    pub(crate) fn release_symbol(&self, symbol: SymbolIndex) {
        match self.shared.store.try_borrow_mut() {
            Ok(mut store) => store.symbols.release(symbol),
            Err(_) => warn!("Leaking symbol {symbol:?}, the pool is in use while the handle is dropped"),
        }
    }

    pub(crate) fn store(&self) -> Ref<'_, TermStore> {
        self.shared.store.borrow()
    }

    fn store_mut(&self) -> RefMut<'_, TermStore> {
        self.shared.store.borrow_mut()
    }

    /// Returns the index of a symbol that belongs to this pool.
    fn own_symbol<'a, 'b>(&self, symbol: &'b impl Symb<'a, 'b>) -> Result<SymbolIndex, TermError> {
        if self.ptr_eq(symbol.pool()) {
            Ok(symbol.index())
        } else {
            Err(TermError::ForeignPool)
        }
    }

    /// Returns the index of a term that belongs to this pool.
    fn own_term<'a, 'b>(&self, term: &impl Term<'a, 'b>) -> Result<TermIndex, TermError> {
        if self.ptr_eq(term.pool()) {
            Ok(term.index())
        } else {
            Err(TermError::ForeignPool)
        }
    }

    /// Looks up or inserts the application term after checking the arity of its symbol.
    fn create(&self, symbol: SymbolIndex, key: &impl TermKey) -> Result<ATerm, TermError> {
        let index = {
            let mut store = self.store_mut();
            let store = &mut *store;

            let arity = store.symbols.arity(symbol);
            if arity != key.arguments().len() {
                return Err(TermError::ArityMismatch {
                    symbol: store.symbols.name(symbol).to_string(),
                    arity,
                    arguments: key.arguments().len(),
                });
            }

            store.terms.create_term(&mut store.symbols, key).0
        };

        Ok(ATerm::from_index(self.clone(), index))
    }
}

impl Default for TermPool {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TermPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TermPool {{ {} }}", self.metrics())
    }
}

/// A snapshot of the sizes and counters of a [TermPool].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TermPoolMetrics {
    /// The number of live terms.
    pub terms: usize,

    /// The number of live function symbols.
    pub symbols: usize,

    /// The number of terms that have been created since the pool was created.
    pub created_terms: usize,

    /// The number of terms that have been deleted since the pool was created.
    pub deleted_terms: usize,

    /// The number of times that a term index was resized.
    pub resizes: usize,

    pub term_buckets: usize,
    pub int_term_buckets: usize,
    pub symbol_buckets: usize,

    /// The number of node slots and argument slots that have been allocated.
    pub term_capacity: usize,
    pub argument_capacity: usize,
}

impl fmt::Display for TermPoolMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "There are {} terms ({} created, {} deleted), and {} symbols. The indices have {} term, {} integer and {} symbol buckets after {} resizes. Allocated {} node and {} argument slots.",
            self.terms,
            self.created_terms,
            self.deleted_terms,
            self.symbols,
            self.term_buckets,
            self.int_term_buckets,
            self.symbol_buckets,
            self.resizes,
            self.term_capacity,
            self.argument_capacity
        )
    }
}
