use criterion::{criterion_group, criterion_main, Criterion};
use rand::prelude::*;
use workpool::ThreadPool;

fn submit_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("submit");

    let mut thread_counts = vec![1, 2, num_cpus::get()];
    thread_counts.sort_unstable();
    thread_counts.dedup();

    for threads in thread_counts {
        group.bench_function(format!("{threads}-threads"), |b| {
            b.iter_batched(
                || ThreadPool::new(threads),
                |pool| {
                    let tasks: Vec<_> = (0..100u64)
                        .map(|i| pool.submit(move || i * i).unwrap())
                        .collect();
                    for task in &tasks {
                        task.result().unwrap();
                    }
                    pool.shutdown();
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn continuation_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("continue_with");

    group.bench_function("chain-of-8", |b| {
        b.iter_batched(
            || ThreadPool::new(4),
            |pool| {
                let mut rng = thread_rng();
                let seed = rng.gen_range(1u64..1000);
                let mut task = pool.submit(move || seed).unwrap();
                for _ in 0..8 {
                    task = task.continue_with(|x| x.wrapping_mul(31)).unwrap();
                }
                task.result().unwrap();
                pool.shutdown();
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, submit_bench, continuation_bench);
criterion_main!(benches);
