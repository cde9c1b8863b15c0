use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use trisolve::{grad_fn, jit, jit_grad, JitCache};

#[path = "common/mod.rs"]
mod common;
use common::*;

fn bench_orderings(c: &mut Criterion) {
    let mut group = c.benchmark_group("gradient_ordering");
    let params = make_params(5);
    for n in [10, 100, 1000] {
        let objective = make_objective(n);

        group.bench_with_input(BenchmarkId::new("grad", n), &params, |b, x| {
            b.iter(|| black_box(grad_fn(&objective, black_box(x))))
        });

        let cache = JitCache::new();
        let compiled = jit(objective, &cache);
        // Compile outside the timed loop.
        let _ = compiled.grad(&params);
        group.bench_with_input(BenchmarkId::new("grad_of_jit", n), &params, |b, x| {
            b.iter(|| black_box(compiled.grad(black_box(x))))
        });

        cache.clear();
        let compiled_grad = jit_grad(objective, &cache);
        let _ = compiled_grad.call(&params);
        group.bench_with_input(BenchmarkId::new("jit_of_grad", n), &params, |b, x| {
            b.iter(|| black_box(compiled_grad.call(black_box(x))))
        });
    }
    group.finish();
}

fn bench_compilation(c: &mut Criterion) {
    let mut group = c.benchmark_group("compilation");
    let params = make_params(5);
    for n in [10, 100, 1000] {
        let objective = make_objective(n);
        group.bench_with_input(BenchmarkId::new("primal", n), &params, |b, x| {
            b.iter(|| {
                let cache = JitCache::new();
                black_box(jit(objective, &cache).program(black_box(x)).is_ok())
            })
        });
        group.bench_with_input(BenchmarkId::new("adjoint", n), &params, |b, x| {
            b.iter(|| {
                let cache = JitCache::new();
                black_box(jit_grad(objective, &cache).program(black_box(x)).is_ok())
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_orderings, bench_compilation);
criterion_main!(benches);
