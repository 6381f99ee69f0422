//! Implementation of the storage behind the [crate::TermPool].
//!
//! A term is either an integer or a function symbol applied to a number of
//! argument terms:
//!
//! t := n | f(t1, ..., tn)
//!
//! where `f` is a function symbol with arity `n` and a name, and constants are
//! applications of function symbols with arity zero. Function symbols are
//! stored in the [SymbolPool], and terms are stored maximally shared in the
//! `ATermStorage`, meaning that structurally equal terms are stored exactly
//! once. Both are reference counted, and terms and symbols are removed as soon
//! as they are no longer referenced.
//!
//! All records are addressed by indices into blocks that are never moved, so
//! the storage uses only safe Rust.

mod argument_store;
mod aterm_storage;
mod block_store;
mod chained_table;
mod shared_term;
mod symbol_pool;

pub(crate) use argument_store::*;
pub(crate) use aterm_storage::*;
pub(crate) use block_store::*;
pub(crate) use chained_table::*;
pub use chained_table::TableGrowError;
pub use shared_term::*;
pub use symbol_pool::*;
