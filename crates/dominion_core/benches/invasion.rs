//! Invasion benchmarks for dominion_core.
//!
//! Run with: `cargo bench -p dominion_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use dominion_core::queue::TickQueue;
use dominion_test_utils::fixtures::{self, World};

/// Resolve one invasion per iteration against a fresh queue.
pub fn invasion_benchmark(c: &mut Criterion) {
    let world = World::new();
    let engine = world.engine();
    let context = world.context(fixtures::TICK);
    let attacker = fixtures::attacker();

    let mut group = c.benchmark_group("invade");
    for (name, op, dp) in [("victory", 1000, 800), ("raze", 700, 800), ("overwhelmed", 500, 650)] {
        let defender = fixtures::defender(dp);
        let deployment = fixtures::deployment(op);
        group.bench_with_input(BenchmarkId::from_parameter(name), &deployment, |b, deployment| {
            b.iter(|| {
                let mut queue = TickQueue::new();
                black_box(engine.invade(&attacker, &defender, deployment, &mut queue, &context))
            });
        });
    }
    group.finish();
}

/// Full store round trip: lock, resolve, commit.
pub fn store_benchmark(c: &mut Criterion) {
    let world = World::new();
    let deployment = fixtures::deployment(1000);
    c.bench_function("store_invade", |b| {
        b.iter_batched(
            || world.store([fixtures::attacker(), fixtures::defender(800)]),
            |store| black_box(store.invade(fixtures::ATTACKER, fixtures::DEFENDER, &deployment, fixtures::TICK)),
            criterion::BatchSize::SmallInput,
        );
    });
}

/// Validation gate alone.
pub fn validation_benchmark(c: &mut Criterion) {
    let world = World::new();
    let engine = world.engine();
    let context = world.context(fixtures::TICK);
    let attacker = fixtures::attacker();
    let defender = fixtures::defender(800);
    let deployment = fixtures::deployment(1000);
    c.bench_function("validate", |b| {
        b.iter(|| black_box(engine.validate(&attacker, &defender, &deployment, &context)));
    });
}

criterion_group!(benches, invasion_benchmark, store_benchmark, validation_benchmark);
criterion_main!(benches);
