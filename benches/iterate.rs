use criterion::*;
use std::hint::black_box;
use std::sync::atomic::{AtomicU64, Ordering};

use strata_ecs::prelude::*;

mod common;
use common::*;

fn iterate_benchmark(c: &mut Criterion) {
    let mut world = World::with_capacity(AGENTS_MED as usize);
    populate(&mut world, AGENTS_MED);

    let mut group = c.benchmark_group("iterate");

    group.bench_function("for_each_read2_100k", |b| {
        b.iter(|| {
            let sum = AtomicU64::new(0);
            world.for_each::<(Read<Position>, Read<Velocity>)>(|(position, velocity)| {
                sum.fetch_add((position.x + velocity.x) as u64, Ordering::Relaxed);
            });
            black_box(sum.load(Ordering::Relaxed));
        });
    });

    group.bench_function("for_each_write_100k", |b| {
        b.iter(|| {
            world.for_each::<(Write<Position>, Read<Velocity>)>(|(position, velocity)| {
                position.x += velocity.x;
            });
        });
    });

    group.bench_function("for_each_sequential_100k", |b| {
        b.iter(|| {
            let mut sum = 0f32;
            world.for_each_sequential::<(Read<Position>,)>(|(position,)| {
                sum += position.x;
            });
            black_box(sum);
        });
    });

    group.bench_function("view_iteration_100k", |b| {
        b.iter(|| {
            world.for_each_chunk::<(Write<Position>, Read<Velocity>)>(|view| {
                for (position, velocity) in &view {
                    position.x += velocity.x;
                }
            });
        });
    });

    group.finish();
}

criterion_group!(benches, iterate_benchmark);
criterion_main!(benches);
