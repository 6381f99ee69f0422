//!
//! A list of terms, where T is the type of the elements in the list.
//!
#![forbid(unsafe_code)]

use std::fmt;
use std::marker::PhantomData;

use delegate::delegate;
use itertools::Itertools;

use merc_utilities::MercError;

use crate::ATerm;
use crate::ATermRef;
use crate::Term;
use crate::TermPool;
use crate::storage::TermIndex;

/// Returns true iff the term is a list term.
pub fn is_list_term<'a, 'b>(t: &'b impl Term<'a, 'b>) -> bool {
    t.get_head_symbol() == t.pool().list_symbol()
}

/// Returns true iff the term is an empty list.
pub fn is_empty_list_term<'a, 'b>(t: &'b impl Term<'a, 'b>) -> bool {
    t.get_head_symbol() == t.pool().empty_list_symbol()
}

/// Represents a list of ATerms of type T.
///
/// # Details
///
/// Internally, uses two standard function symbols `cons` and `[]` to represent
/// lists. The `cons` function symbol has arity 2, where the first argument is
/// the head of the list and the second argument is the tail of the list. The
/// `[]` function symbol has arity 0 and represents the empty list.
pub struct ATermList<T> {
    term: ATerm,
    _marker: PhantomData<T>,
}

impl<T: From<ATerm>> ATermList<T> {
    /// Obtain the head, i.e. the first element, of the list.
    pub fn head(&self) -> T {
        self.term.arg(0).protect().into()
    }

    /// Converts the list into a vector.
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }
}

impl<T> ATermList<T> {
    /// Constructs a new list from an iterator that is consumed.
    pub fn from_double_iter(pool: &TermPool, iter: impl DoubleEndedIterator<Item = T>) -> Self
    where
        T: Into<ATerm>,
    {
        let mut list = Self::empty(pool);
        for item in iter.rev() {
            list = list.cons(item);
        }
        list
    }

    /// Constructs a new list from an iterator that is consumed.
    pub fn try_from_double_iter(
        pool: &TermPool,
        iter: impl DoubleEndedIterator<Item = Result<T, MercError>>,
    ) -> Result<Self, MercError>
    where
        T: Into<ATerm>,
    {
        let mut list = Self::empty(pool);
        for item in iter.rev() {
            list = list.cons(item?);
        }
        Ok(list)
    }

    /// Constructs a new list with the given item as the head and the current list as the tail.
    pub fn cons(&self, item: T) -> Self
    where
        T: Into<ATerm>,
    {
        let item: ATerm = item.into();
        let pool = self.term.pool();

        ATermList {
            term: pool.create_term(&pool.list_symbol(), &[item.copy(), self.term.copy()]),
            _marker: PhantomData,
        }
    }

    /// Constructs the empty list.
    pub fn empty(pool: &TermPool) -> Self {
        ATermList {
            term: pool.create_constant(&pool.empty_list_symbol()),
            _marker: PhantomData,
        }
    }

    /// Returns true iff the list is empty.
    pub fn is_empty(&self) -> bool {
        is_empty_list_term(&self.term)
    }

    /// Obtain the tail, i.e. the remainder, of the list.
    pub fn tail(&self) -> ATermList<T> {
        self.term.arg(1).into()
    }

    /// Returns an iterator over all elements in the list.
    pub fn iter(&self) -> ATermListIter<T> {
        ATermListIter { current: self.clone() }
    }
}

impl<'a, 'b, T> Term<'a, 'b> for ATermList<T>
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

impl<T> Clone for ATermList<T> {
    fn clone(&self) -> Self {
        ATermList {
            term: self.term.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> PartialEq for ATermList<T> {
    fn eq(&self, other: &Self) -> bool {
        self.term == other.term
    }
}

impl<T> Eq for ATermList<T> {}

impl<T> From<ATermList<T>> for ATerm {
    fn from(value: ATermList<T>) -> Self {
        value.term
    }
}

impl<T: From<ATerm>> Iterator for ATermListIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current.is_empty() {
            None
        } else {
            let head = self.current.head();
            self.current = self.current.tail();
            Some(head)
        }
    }
}

impl<T> From<ATerm> for ATermList<T> {
    fn from(value: ATerm) -> Self {
        debug_assert!(
            is_list_term(&value) || is_empty_list_term(&value),
            "Can only convert an aterm_list"
        );
        ATermList::<T> {
            term: value,
            _marker: PhantomData,
        }
    }
}

impl<'a, T> From<ATermRef<'a>> for ATermList<T> {
    fn from(value: ATermRef<'a>) -> Self {
        value.protect().into()
    }
}

impl<T: From<ATerm>> IntoIterator for ATermList<T> {
    type IntoIter = ATermListIter<T>;
    type Item = T;

    fn into_iter(self) -> Self::IntoIter {
        ATermListIter { current: self }
    }
}

impl<T: From<ATerm>> IntoIterator for &ATermList<T> {
    type IntoIter = ATermListIter<T>;
    type Item = T;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: From<ATerm> + fmt::Display> fmt::Display for ATermList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.iter().format(", "))
    }
}

impl<T: From<ATerm> + fmt::Display> fmt::Debug for ATermList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

/// The iterator over the elements of an [ATermList].
pub struct ATermListIter<T> {
    current: ATermList<T>,
}

#[cfg(test)]
mod tests {
    use merc_utilities::test_logger;

    use crate::ATermInt;

    use super::*;

    #[test]
    fn test_list_term() {
        test_logger();
        let pool = TermPool::new();

        let list = ATermList::from_double_iter(
            &pool,
            vec![ATermInt::new(&pool, 1), ATermInt::new(&pool, 2), ATermInt::new(&pool, 3)].into_iter(),
        );
        assert_eq!(list.head().value(), 1);
        assert_eq!(list.tail().head().value(), 2);
        assert_eq!(list.tail().tail().head().value(), 3);
        assert!(list.tail().tail().tail().is_empty());
        assert_eq!(list.to_string(), "[1, 2, 3]");
        assert_eq!(ATerm::from(list).to_string(), "[1, 2, 3]");
    }

    #[test]
    fn test_list_sharing() {
        test_logger();
        let pool = TermPool::new();

        let empty = ATermList::<ATermInt>::empty(&pool);
        let first = empty.cons(ATermInt::new(&pool, 5));
        let second = ATermList::from_double_iter(&pool, [ATermInt::new(&pool, 5)].into_iter());

        assert_eq!(first, second);
        assert_eq!(first.tail(), empty);
        assert_eq!(empty.to_string(), "[]");
    }

    #[test]
    fn test_try_from_double_iter() {
        test_logger();
        let pool = TermPool::new();

        let items: Vec<Result<ATermInt, MercError>> = vec![Ok(ATermInt::new(&pool, 1)), Err("invalid".into())];
        assert!(ATermList::try_from_double_iter(&pool, items.into_iter()).is_err());

        let items: Vec<Result<ATermInt, MercError>> = vec![Ok(ATermInt::new(&pool, 1))];
        let list = ATermList::try_from_double_iter(&pool, items.into_iter()).expect("All items are valid");
        assert_eq!(list.to_vec(), vec![ATermInt::new(&pool, 1)]);
    }
}
