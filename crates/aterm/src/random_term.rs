#![forbid(unsafe_code)]

use rand::Rng;
use rand::prelude::IteratorRandom;
use rustc_hash::FxHashSet;

use crate::ATerm;
use crate::TermPool;

/// Create a random term consisting of the given symbols and constants.
/// Performs `iterations` number of constructions, where the arguments of every
/// construction are chosen among the terms that were constructed before.
///
/// # Panics
///
/// When there are no constants, or no symbols while at least one iteration is requested.
pub fn random_term(
    pool: &TermPool,
    rng: &mut impl Rng,
    symbols: &[(String, usize)],
    constants: &[String],
    iterations: usize,
) -> ATerm {
    assert!(!constants.is_empty(), "We need constants to be able to create a term");

    let mut subterms = FxHashSet::<ATerm>::from_iter(
        constants
            .iter()
            .map(|name| pool.create_constant(&pool.create_symbol(name, 0))),
    );

    let mut result = subterms
        .iter()
        .choose(rng)
        .cloned()
        .expect("There is at least one constant");

    for _ in 0..iterations {
        let (name, arity) = symbols
            .iter()
            .choose(rng)
            .expect("We need symbols to be able to create a term");

        let mut arguments = Vec::with_capacity(*arity);
        for _ in 0..*arity {
            arguments.push(
                subterms
                    .iter()
                    .choose(rng)
                    .cloned()
                    .expect("There is at least one subterm"),
            );
        }

        let symbol = pool.create_symbol(name, *arity);
        let term = pool.create_term(&symbol, &arguments);

        // Make this term available as another subterm that can be used.
        subterms.insert(term.clone());
        result = term;
    }

    result
}
