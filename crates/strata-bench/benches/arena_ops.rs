//! Criterion micro-benchmarks for arena allocation, reallocation and reset.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use strata_arena::{Arena, ArenaConfig, ArenaFlags, TempAllocator};
use strata_bench::workload::{fill_arena, request_sizes};
use strata_collections::Array;
use strata_core::{Allocator, Heap};

/// Benchmark: 10K mixed-size allocations, then reset (pages are reused).
fn bench_arena_alloc_10k(c: &mut Criterion) {
    let sizes = request_sizes(42, 10_000, 256);
    let mut arena = Arena::new(ArenaConfig::default()).unwrap();
    c.bench_function("arena_alloc_10k", |b| {
        b.iter(|| {
            let total = fill_arena(&arena, black_box(&sizes)).unwrap();
            black_box(total);
            arena.reset();
        });
    });
}

/// Benchmark: the same 10K requests against the global heap, for reference.
fn bench_heap_alloc_10k(c: &mut Criterion) {
    let sizes = request_sizes(42, 10_000, 256);
    c.bench_function("heap_alloc_10k", |b| {
        b.iter(|| {
            for &size in &sizes {
                let ptr = Heap.allocate(black_box(size)).unwrap();
                unsafe { Heap.deallocate(ptr, size).unwrap() };
            }
        });
    });
}

/// Benchmark: grow an array one element at a time at the arena tail.
fn bench_tail_growth(c: &mut Criterion) {
    let config = ArenaConfig::new()
        .with_page_size(1 << 20)
        .with_flags(ArenaFlags::FLEXIBLE_PAGE);
    let mut arena = Arena::new(config).unwrap();
    c.bench_function("arena_tail_growth_16k", |b| {
        b.iter(|| {
            {
                let mut xs = Array::new_in(&arena);
                for i in 0..16_384u32 {
                    xs.push(i).unwrap();
                }
                black_box(xs.len());
            }
            arena.reset();
        });
    });
}

/// Benchmark: checkpoint, allocate 1K blocks, rewind.
fn bench_checkpoint_rewind(c: &mut Criterion) {
    let mut arena = Arena::new(ArenaConfig::default()).unwrap();
    c.bench_function("arena_checkpoint_rewind_1k", |b| {
        b.iter(|| {
            let checkpoint = arena.checkpoint();
            for _ in 0..1024 {
                black_box(arena.alloc(48).unwrap());
            }
            arena.rewind(checkpoint).unwrap();
        });
    });
}

/// Benchmark: formatted strings in a temp allocator.
fn bench_temp_fmt(c: &mut Criterion) {
    let mut temp = TempAllocator::new();
    c.bench_function("temp_fmt_1k", |b| {
        b.iter(|| {
            for i in 0..1024 {
                black_box(temp.alloc_fmt(format_args!("key-{i}")).unwrap());
            }
            temp.reset();
        });
    });
}

criterion_group!(
    benches,
    bench_arena_alloc_10k,
    bench_heap_alloc_10k,
    bench_tail_growth,
    bench_checkpoint_rewind,
    bench_temp_fmt
);
criterion_main!(benches);
