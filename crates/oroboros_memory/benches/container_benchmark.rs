//! # Container Benchmark
//!
//! Measures the cost of the inline-first policies against plain heap storage:
//! 1. Array append, heap-only vs inline
//! 2. String construction below and above the inline threshold
//! 3. Substring search through `StringView`

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use oroboros_memory::{Array, InlineArray, SmallString, StringOps, StringView};

// =============================================================================
// ARRAY BENCHMARKS
// =============================================================================

fn bench_array_add(c: &mut Criterion) {
    let mut group = c.benchmark_group("array_add");

    for count in [4usize, 16, 256] {
        group.bench_with_input(BenchmarkId::new("heap", count), &count, |b, &count| {
            b.iter(|| {
                let mut array: Array<u32> = Array::new();
                for i in 0..count {
                    array.add(black_box(i as u32));
                }
                black_box(array.len())
            });
        });

        group.bench_with_input(BenchmarkId::new("inline_16", count), &count, |b, &count| {
            b.iter(|| {
                let mut array: InlineArray<u32, 16> = InlineArray::new();
                for i in 0..count {
                    array.add(black_box(i as u32));
                }
                black_box(array.len())
            });
        });
    }

    group.finish();
}

fn bench_array_reserved(c: &mut Criterion) {
    c.bench_function("array_reserve_then_add_1024", |b| {
        b.iter(|| {
            let mut array: Array<u64> = Array::with_capacity(1024);
            for i in 0..1024u64 {
                array.add(black_box(i));
            }
            black_box(array.len())
        });
    });
}

// =============================================================================
// STRING BENCHMARKS
// =============================================================================

fn bench_string_construct(c: &mut Criterion) {
    let mut group = c.benchmark_group("string_construct");

    group.bench_function("small_15", |b| {
        b.iter(|| black_box(SmallString::from(black_box("123456789abcdef"))));
    });
    group.bench_function("heap_16", |b| {
        b.iter(|| black_box(SmallString::from(black_box("0123456789abcdef"))));
    });
    group.bench_function("append_256", |b| {
        b.iter(|| {
            let mut string = SmallString::new();
            for _ in 0..256 {
                string.push(black_box(b'x'));
            }
            black_box(string.len())
        });
    });

    group.finish();
}

fn bench_view_find(c: &mut Criterion) {
    let text = "entity:4096/component:position/archetype:moving".repeat(16);
    let view = StringView::from(text.as_str());

    c.bench_function("view_find_index_tail", |b| {
        b.iter(|| black_box(view.find_index(black_box("archetype:static"))));
    });
}

criterion_group!(
    benches,
    bench_array_add,
    bench_array_reserved,
    bench_string_construct,
    bench_view_find,
);

criterion_main!(benches);
