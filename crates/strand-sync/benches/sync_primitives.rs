use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use strand_sync::{Discipline, Regime, ResourceGuard, ShutdownableQueue};

fn bench_guard_acquire(c: &mut Criterion) {
    let mut group = c.benchmark_group("guard_acquire");

    for regime in [Regime::Parallel, Regime::Cooperative] {
        let guard = ResourceGuard::with_regime("using", regime);
        group.bench_with_input(
            BenchmarkId::new("uncontended", regime),
            &guard,
            |b, guard| {
                b.iter(|| {
                    let handle = guard.acquire().unwrap();
                    black_box(&handle);
                });
            },
        );
    }

    let guard = ResourceGuard::with_regime("using", Regime::Parallel);
    let _held = guard.acquire().unwrap();
    group.bench_function("busy", |b| {
        b.iter(|| black_box(guard.acquire().is_err()));
    });

    group.finish();
}

fn bench_queue_put_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_put_get");

    for discipline in [Discipline::Fifo, Discipline::Lifo, Discipline::Priority] {
        group.bench_with_input(
            BenchmarkId::new("batch_64", format!("{:?}", discipline)),
            &discipline,
            |b, &discipline| {
                let queue = ShutdownableQueue::new(discipline);
                b.iter(|| {
                    for item in 0..64i64 {
                        queue.put_with_priority(item, 64 - item).unwrap();
                    }
                    for _ in 0..64 {
                        black_box(queue.try_get().unwrap());
                    }
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_guard_acquire, bench_queue_put_get);
criterion_main!(benches);
