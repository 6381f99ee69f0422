//! The hash functions and equality comparators used by the symbol pool and
//! the term storage.
//!
//! Application terms are hashed by combining the index of their head symbol
//! with the indices of their arguments. Because terms are maximally shared,
//! two terms are equal iff their symbols and arguments are identical, so
//! neither hashing nor comparison ever has to look into the arguments.

#![forbid(unsafe_code)]

use crate::storage::SharedTermView;
use crate::storage::SymbolIndex;
use crate::storage::TermIndex;

/// Indicates that the number of arguments is only known at run time.
pub const DYNAMIC_ARITY: usize = usize::MAX;

/// Combines the `seed` with `value`, computed as `value + floor(2.5 * seed)`.
///
/// Addition is used instead of xor, because xor maps equal inputs to zero. The
/// seed is scaled to prevent the symmetry of addition, such that `f(a, b)` and
/// `f(b, a)` have different hashes.
#[inline]
pub fn combine(seed: u64, value: u64) -> u64 {
    value.wrapping_add(seed << 1).wrapping_add(seed >> 1)
}

/// The hash of a function symbol with the given name and arity.
///
/// The UTF-8 bytes of the name are added as unsigned values, so names with
/// non-ASCII characters hash differently than with a signed `char` fold.
pub fn symbol_hash(name: &str, arity: usize) -> u64 {
    const MAGIC_PRIME: u64 = 7;

    let mut hnr = (arity as u64).wrapping_mul(3);
    for c in name.bytes() {
        hnr = hnr.wrapping_mul(251).wrapping_add(c as u64);
    }

    hnr.wrapping_mul(MAGIC_PRIME)
}

/// Computes the hash of an application term from its head symbol and arguments.
///
/// When `N` is not [DYNAMIC_ARITY] the number of arguments is fixed at compile
/// time, which lets the compiler unroll the loop. Both variants yield the same
/// hash for the same term.
pub struct ATermHasher<const N: usize = DYNAMIC_ARITY>;

impl<const N: usize> ATermHasher<N> {
    /// Hashes a term whose arguments are given as a slice.
    #[inline]
    pub fn hash(symbol: SymbolIndex, arguments: &[TermIndex]) -> u64 {
        let arity = if N == DYNAMIC_ARITY { arguments.len() } else { N };
        debug_assert_eq!(arity, arguments.len(), "The number of arguments should be {arity}");

        let mut hnr = Self::hash_symbol(symbol);
        for argument in &arguments[..arity] {
            hnr = combine(hnr, argument.value() as u64);
        }

        hnr
    }

    /// Hashes a term of which the number of arguments is known at compile time.
    #[inline]
    pub fn hash_array(symbol: SymbolIndex, arguments: &[TermIndex; N]) -> u64 {
        arguments
            .iter()
            .fold(Self::hash_symbol(symbol), |hnr, argument| combine(hnr, argument.value() as u64))
    }

    /// Symbols are maximally shared, so their index identifies them.
    #[inline]
    pub fn hash_symbol(symbol: SymbolIndex) -> u64 {
        symbol.value() as u64
    }
}

/// Integer terms are hashed by their value.
pub struct ATermIntHasher;

impl ATermIntHasher {
    #[inline]
    pub fn hash(value: usize) -> u64 {
        value as u64
    }
}

/// Compares a stored term with a term that is given by its parts, without
/// constructing it first. See [ATermHasher] for the meaning of `N`.
pub struct ATermEquals<const N: usize = DYNAMIC_ARITY>;

impl<const N: usize> ATermEquals<N> {
    /// Returns true iff the stored term has the given symbol and arguments.
    #[inline]
    pub fn equals(term: &SharedTermView<'_>, symbol: SymbolIndex, arguments: &[TermIndex]) -> bool {
        if term.symbol != symbol {
            return false;
        }

        let arity = if N == DYNAMIC_ARITY { arguments.len() } else { N };
        term.arguments.len() == arity && term.arguments[..arity] == arguments[..arity]
    }
}

#[cfg(test)]
mod tests {
    use rand::Rng;
    use test_case::test_case;

    use merc_utilities::random_test;

    use super::*;

    #[test_case(0, 1, 2 ; "small values")]
    #[test_case(17, 3, 1_000_000 ; "large value")]
    #[test_case(u64::MAX, 5, 6 ; "overflowing seed")]
    fn test_combine_is_not_commutative(seed: u64, a: u64, b: u64) {
        assert_ne!(combine(combine(seed, a), b), combine(combine(seed, b), a));
    }

    #[test]
    fn test_combine_collision_rate() {
        random_test(1, |rng| {
            let samples = 10_000;
            let mut collisions = 0;

            for _ in 0..samples {
                let seed: u64 = rng.random();
                let a: u64 = rng.random_range(0..1 << 20);
                let b: u64 = rng.random_range(0..1 << 20);
                if a != b && combine(combine(seed, a), b) == combine(combine(seed, b), a) {
                    collisions += 1;
                }
            }

            assert!(collisions * 100 < samples, "{collisions} of {samples} swapped pairs collide");
        });
    }

    #[test]
    fn test_symbol_hash() {
        assert_ne!(symbol_hash("f", 1), symbol_hash("f", 2));
        assert_ne!(symbol_hash("ab", 0), symbol_hash("ba", 0));
        assert_eq!(symbol_hash("", 0), 0);
        assert_eq!(symbol_hash("a", 0), 97 * 7);
    }

    #[test]
    fn test_symbol_hash_non_ascii() {
        // The two bytes of "é" are 0xC3 and 0xA9.
        assert_eq!(symbol_hash("é", 0), (0xC3 * 251 + 0xA9) * 7);
        assert_ne!(symbol_hash("é", 1), symbol_hash("é", 0));
    }

    #[test]
    fn test_fixed_and_dynamic_hash_agree() {
        let symbol = SymbolIndex::new(3);
        let arguments = [TermIndex::new(10), TermIndex::new(20), TermIndex::new(30)];

        assert_eq!(
            ATermHasher::<DYNAMIC_ARITY>::hash(symbol, &arguments),
            ATermHasher::<3>::hash_array(symbol, &arguments)
        );
        assert_eq!(
            ATermHasher::<3>::hash(symbol, &arguments),
            ATermHasher::<3>::hash_array(symbol, &arguments)
        );
    }

    #[test]
    fn test_swapped_arguments_hash_differently() {
        let symbol = SymbolIndex::new(1);
        let a = TermIndex::new(5);
        let b = TermIndex::new(9);

        assert_ne!(ATermHasher::<2>::hash_array(symbol, &[a, b]), ATermHasher::<2>::hash_array(symbol, &[b, a]));
    }

    #[test]
    fn test_equals() {
        let symbol = SymbolIndex::new(1);
        let arguments = [TermIndex::new(5), TermIndex::new(9)];
        let view = SharedTermView {
            symbol,
            arguments: &arguments,
        };

        assert!(ATermEquals::<DYNAMIC_ARITY>::equals(&view, symbol, &arguments));
        assert!(ATermEquals::<2>::equals(&view, symbol, &arguments));
        assert!(!ATermEquals::<2>::equals(&view, SymbolIndex::new(2), &arguments));
        assert!(!ATermEquals::<DYNAMIC_ARITY>::equals(&view, symbol, &arguments[..1]));
    }
}
