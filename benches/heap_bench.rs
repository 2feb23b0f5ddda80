use chainheap::{Heap, HeapKind};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use std::time::Duration;

fn lcg(mut s: u64) -> impl Iterator<Item = i64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s as i64)
    })
}

fn bench_push_100k(c: &mut Criterion) {
    c.bench_function("heap::push_random_100k", |b| {
        b.iter_batched(
            || Heap::new(HeapKind::Min),
            |mut h| {
                for (i, k) in lcg(1).take(100_000).enumerate() {
                    h.push(k, i).unwrap();
                }
                black_box(h)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_push_from_tiny_capacity(c: &mut Criterion) {
    c.bench_function("heap::push_grow_from_1_100k", |b| {
        b.iter_batched(
            || Heap::with_capacity(HeapKind::Max, 1).unwrap(),
            |mut h| {
                for (i, k) in lcg(2).take(100_000).enumerate() {
                    h.push(k, i).unwrap();
                }
                black_box(h)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_pop_drain_100k(c: &mut Criterion) {
    c.bench_function("heap::pop_drain_100k", |b| {
        b.iter_batched(
            || {
                let mut h = Heap::new(HeapKind::Max);
                for (i, k) in lcg(3).take(100_000).enumerate() {
                    h.push(k, i).unwrap();
                }
                h
            },
            |mut h| {
                while let Some(e) = h.pop() {
                    black_box(e);
                }
            },
            BatchSize::SmallInput,
        )
    });
}

fn config() -> Criterion {
    Criterion::default()
        .warm_up_time(Duration::from_millis(500))
        .measurement_time(Duration::from_secs(3))
}

criterion_group! {
    name = benches;
    config = config();
    targets = bench_push_100k, bench_push_from_tiny_capacity, bench_pop_drain_100k
}
criterion_main!(benches);
