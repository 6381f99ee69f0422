#![forbid(unsafe_code)]

use std::fmt;
use std::rc::Rc;

use delegate::delegate;

use crate::ATerm;
use crate::ATermRef;
use crate::Symb;
use crate::Term;
use crate::TermPool;
use crate::storage::TermIndex;

/// Returns true if the term is a string term, i.e., a constant that is not an integer.
pub fn is_string_term<'a, 'b>(t: &'b impl Term<'a, 'b>) -> bool {
    !t.is_int() && t.get_head_symbol().arity() == 0
}

/// A constant term whose head symbol has the string as its name.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ATermString {
    term: ATerm,
}

impl ATermString {
    pub fn new(pool: &TermPool, string: &str) -> Self {
        ATermString {
            term: pool.create_constant(&pool.create_symbol(string, 0)),
        }
    }

    /// Get the value of the string
    pub fn value(&self) -> Rc<str> {
        self.term.get_head_symbol().name()
    }
}

impl<'a, 'b> Term<'a, 'b> for ATermString
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

impl From<ATerm> for ATermString {
    fn from(term: ATerm) -> Self {
        debug_assert!(is_string_term(&term), "Term {term:?} is not a string term");
        ATermString { term }
    }
}

impl From<ATermString> for ATerm {
    fn from(value: ATermString) -> Self {
        value.term
    }
}

impl PartialEq<str> for ATermString {
    fn eq(&self, other: &str) -> bool {
        *self.value() == *other
    }
}

impl PartialEq<&str> for ATermString {
    fn eq(&self, other: &&str) -> bool {
        *self.value() == **other
    }
}

impl fmt::Display for ATermString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

impl fmt::Debug for ATermString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.value())
    }
}
