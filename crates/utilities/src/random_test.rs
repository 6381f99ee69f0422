use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::test_logger;

/// Runs `test_function` the given number of times with a seeded random number
/// generator. The seed is printed so that failures can be reproduced by setting
/// `MERC_SEED=<seed>`.
pub fn random_test<F>(iterations: usize, test_function: F)
where
    F: FnMut(&mut StdRng),
{
    let seed = match std::env::var("MERC_SEED") {
        Ok(value) => value.parse::<u64>().expect("MERC_SEED must be a valid u64"),
        Err(_) => rand::random(),
    };

    random_test_seeded(seed, iterations, test_function);
}

/// Same as [random_test], but with a fixed seed.
pub fn random_test_seeded<F>(seed: u64, iterations: usize, mut test_function: F)
where
    F: FnMut(&mut StdRng),
{
    test_logger();

    println!("seed: {seed} (use MERC_SEED=<seed> to reproduce)");
    let mut rng = StdRng::seed_from_u64(seed);

    for _ in 0..iterations {
        test_function(&mut rng);
    }
}
