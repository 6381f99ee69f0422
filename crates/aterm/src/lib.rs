#![doc = include_str!("../README.md")]

mod annotation;
mod aterm;
mod aterm_int;
mod aterm_list;
mod aterm_string;
mod error;
mod random_term;
mod symbol;
mod term_pool;

pub mod hash;
pub mod storage;

pub use annotation::*;
pub use aterm::*;
pub use aterm_int::*;
pub use aterm_list::*;
pub use aterm_string::*;
pub use error::*;
pub use random_term::*;
pub use symbol::*;
pub use term_pool::*;
