//! Criterion micro-benchmarks for the open-addressing hash map.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use strata_arena::{Arena, ArenaConfig, ArenaFlags};
use strata_collections::HashMap;
use strata_test_utils::fixtures::{distinct_keys, distinct_words};

/// Benchmark: insert 10K integer keys into a fresh heap-backed map.
fn bench_map_insert_10k(c: &mut Criterion) {
    let keys = distinct_keys(7, 10_000);
    c.bench_function("map_insert_10k", |b| {
        b.iter(|| {
            let mut map = HashMap::new();
            for &key in &keys {
                map.put(key, key).unwrap();
            }
            black_box(map.len());
        });
    });
}

/// Benchmark: the same inserts with the table in an arena.
fn bench_map_insert_10k_arena(c: &mut Criterion) {
    let keys = distinct_keys(7, 10_000);
    let config = ArenaConfig::new().with_flags(ArenaFlags::FLEXIBLE_PAGE);
    let mut arena = Arena::new(config).unwrap();
    c.bench_function("map_insert_10k_arena", |b| {
        b.iter(|| {
            {
                let mut map = HashMap::new_in(&arena);
                for &key in &keys {
                    map.put(key, key).unwrap();
                }
                black_box(map.len());
            }
            arena.reset();
        });
    });
}

/// Benchmark: 10K hits on a map of string keys.
fn bench_map_lookup_words(c: &mut Criterion) {
    let words = distinct_words(3, 10_000);
    let mut map = HashMap::new();
    for (i, word) in words.iter().enumerate() {
        map.put(word.clone(), i).unwrap();
    }
    c.bench_function("map_lookup_words_10k", |b| {
        b.iter(|| {
            let mut sum = 0;
            for word in &words {
                sum += map.get(word.as_str()).copied().unwrap_or(0);
            }
            black_box(sum);
        });
    });
}

/// Benchmark: delete and reinsert half the keys, exercising tombstone reuse.
fn bench_map_churn(c: &mut Criterion) {
    let keys = distinct_keys(11, 4096);
    let mut map = HashMap::new();
    for &key in &keys {
        map.put(key, 0u32).unwrap();
    }
    c.bench_function("map_churn_2k", |b| {
        b.iter(|| {
            for key in keys.iter().step_by(2) {
                black_box(map.delete(key));
            }
            for &key in keys.iter().step_by(2) {
                map.put(key, 1).unwrap();
            }
        });
    });
}

criterion_group!(
    benches,
    bench_map_insert_10k,
    bench_map_insert_10k_arena,
    bench_map_lookup_words,
    bench_map_churn
);
criterion_main!(benches);
