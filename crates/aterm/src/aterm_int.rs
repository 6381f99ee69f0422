#![forbid(unsafe_code)]

use std::fmt;

use delegate::delegate;

use crate::ATerm;
use crate::ATermRef;
use crate::Term;
use crate::TermPool;
use crate::storage::TermIndex;

/// Returns true if the term is an [ATermInt] term.
pub fn is_int_term<'a, 'b>(t: &'b impl Term<'a, 'b>) -> bool {
    t.is_int()
}

/// This is a wrapper around the [ATerm] type for terms that store a single `usize`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ATermInt {
    term: ATerm,
}

impl ATermInt {
    /// Creates the integer term with the given value.
    pub fn new(pool: &TermPool, value: usize) -> ATermInt {
        ATermInt {
            term: pool.create_int(value),
        }
    }

    /// Returns the value of the integer term.
    pub fn value(&self) -> usize {
        self.term.int_value()
    }
}

impl<'a, 'b> Term<'a, 'b> for ATermInt
where
    'b: 'a,
{
    delegate! {
        to self.term {
            fn protect(&self) -> ATerm;
            fn copy(&'b self) -> ATermRef<'a>;
            fn index(&self) -> TermIndex;
            fn pool(&self) -> &TermPool;
        }
    }
}

impl From<ATerm> for ATermInt {
    fn from(term: ATerm) -> Self {
        debug_assert!(is_int_term(&term), "Term {term:?} is not an integer term");
        ATermInt { term }
    }
}

impl From<ATermInt> for ATerm {
    fn from(value: ATermInt) -> Self {
        value.term
    }
}

impl fmt::Display for ATermInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

impl fmt::Debug for ATermInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}
