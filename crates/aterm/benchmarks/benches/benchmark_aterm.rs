//!
//! These benchmarks follow the term creation and inspection benchmarks of the
//! mCRL2 toolset, for comparison purposes.
//!

use std::array::from_fn;
use std::collections::VecDeque;
use std::hint::black_box;

use criterion::Criterion;
use criterion::criterion_group;
use criterion::criterion_main;
use merc_aterm::ATerm;
use merc_aterm::ATermList;
use merc_aterm::ATermRef;
use merc_aterm::Symb;
use merc_aterm::Term;
use merc_aterm::TermPool;

/// Creates a nested function application where f_0 = c and f_i = f(f_{i-1}, ..., f_{i-1}). The parameter `depth` sets `i` and `c` is given by `leaf_name`.
/// The arity of the function symbols is a constant.
fn create_nested_function<const ARITY: usize>(pool: &TermPool, function_name: &str, leaf_name: &str, depth: usize) -> ATerm {
    debug_assert!(depth > 0, "Depth must be greater than 0");

    // Create function symbols
    let f_symbol = pool.create_symbol(function_name, ARITY);
    let c_symbol = pool.create_symbol(leaf_name, 0);

    // Create the leaf term c
    let c_term = pool.create_constant(&c_symbol);

    // Initialize with f(c, ..., c)
    let mut f_term = pool.create_term_fixed(&f_symbol, &from_fn::<_, ARITY, _>(|_| c_term.copy()));

    // Build nested structure: f(f_term, ..., f_term) for each level
    for _ in 0..depth {
        let next = pool.create_term_fixed(&f_symbol, &from_fn::<_, ARITY, _>(|_| f_term.copy()));
        f_term = next;
    }

    debug_assert_eq!(&*f_term.get_head_symbol().name(), function_name);
    debug_assert_eq!(f_term.get_head_symbol().arity(), ARITY);

    f_term
}

/// Local function to count the number of subterms in a term.
fn inspect<'a>(term: &'a ATermRef<'a>, iterations: usize) -> u64 {
    let mut queue: VecDeque<ATermRef<'a>> = VecDeque::new();

    let mut count = 0;

    for _ in 0..iterations {
        // Simple breadth-first search to count elements
        queue.push_back(term.copy());

        while let Some(current_term) = queue.pop_front() {
            // Iterate through all arguments of the current term
            for arg in current_term.arguments() {
                count += 1;
                queue.push_back(arg);
            }
        }
    }

    count
}

fn benchmark_creation(c: &mut Criterion) {
    const SIZE: usize = 400000;

    let pool = TermPool::new();
    c.bench_function("creation", |b| {
        b.iter(|| {
            black_box(create_nested_function::<2>(&pool, "f", "c", SIZE));
        });
    });
}

fn benchmark_inspect(c: &mut Criterion) {
    const SIZE: usize = 20;
    const ITERATIONS: usize = 100;

    let pool = TermPool::new();
    let term = create_nested_function::<2>(&pool, "f", "c", SIZE);
    assert_eq!(inspect(&term.copy(), 1), 4194302);

    c.bench_function("inspect", |b| {
        b.iter(|| {
            black_box(inspect(&term.copy(), ITERATIONS));
        });
    });
}

fn benchmark_lookup(c: &mut Criterion) {
    let _ = env_logger::try_init();

    const SIZE: usize = 400000;
    const ITERATIONS: usize = 10;

    let pool = TermPool::new();

    // Keep one protected instance, such that every creation is a lookup.
    let term = create_nested_function::<2>(&pool, "f", "c", SIZE);

    c.bench_function("lookup", |b| {
        b.iter(|| {
            for _ in 0..ITERATIONS {
                black_box(create_nested_function::<2>(&pool, "f", "c", SIZE));
            }
        })
    });

    drop(term);
}

fn benchmark_list_release(c: &mut Criterion) {
    const LENGTH: usize = 1000000;

    let pool = TermPool::new();
    let a = pool.create_constant(&pool.create_symbol("a", 0));

    c.bench_function("list_release", |b| {
        b.iter(|| {
            let list = ATermList::<ATerm>::from_double_iter(&pool, (0..LENGTH).map(|_| a.clone()));
            drop(black_box(list));
        })
    });

    println!("{}", pool.metrics());
}

criterion_group!(
    name = benches;
    config = Criterion::default().sample_size(10);
    targets = benchmark_creation,
        benchmark_inspect,
        benchmark_lookup,
        benchmark_list_release,
);
criterion_main!(benches);
