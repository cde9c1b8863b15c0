//! Compilation operator and cache lifecycle.

use std::sync::Arc;

use approx::assert_relative_eq;
use trisolve::jit::{CacheKey, Signature, Transform};
use trisolve::{
    grad_fn, jit, jit_grad, record, CacheStats, JitCache, NormObjective, Scalar, ScalarFn,
};

#[derive(Clone, Copy)]
struct Quadratic;

impl ScalarFn<f64> for Quadratic {
    fn eval<T: Scalar<Float = f64>>(&self, x: &[T]) -> trisolve::Result<T> {
        Ok(x.iter().fold(T::zero(), |acc, &v| acc + v * v))
    }
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn cache_counts_hits_misses_and_compilations() {
    init_logging();
    let cache = JitCache::new();
    let f = jit(Quadratic, &cache);

    assert_eq!(f.call(&[1.0, 2.0]).unwrap(), 5.0);
    assert_eq!(f.call(&[3.0, 4.0]).unwrap(), 25.0);
    assert_eq!(f.grad(&[3.0, 4.0]).unwrap(), vec![6.0, 8.0]);

    assert_eq!(
        cache.stats(),
        CacheStats {
            hits: 2,
            misses: 1,
            compilations: 1,
            entries: 1,
            invalidations: 0,
        }
    );
}

#[test]
fn input_length_is_part_of_the_key() {
    let cache = JitCache::new();
    let f = jit(Quadratic, &cache);
    f.call(&[1.0]).unwrap();
    f.call(&[1.0, 2.0]).unwrap();
    f.call(&[1.0, 2.0, 3.0]).unwrap();
    assert_eq!(cache.len(), 3);
    assert_eq!(cache.stats().compilations, 3);
}

#[test]
fn wrappers_of_the_same_function_do_not_share_entries() {
    let cache = JitCache::new();
    let f = jit(Quadratic, &cache);
    let g = jit(Quadratic, &cache);
    assert_ne!(f.id(), g.id());
    f.call(&[1.0]).unwrap();
    g.call(&[1.0]).unwrap();
    assert_eq!(cache.len(), 2);
}

#[test]
fn clear_forces_recompilation() {
    init_logging();
    let cache = JitCache::new();
    let g = jit_grad(Quadratic, &cache);
    g.call(&[1.0, 1.0]).unwrap();
    let before = g.program(&[1.0, 1.0]).unwrap();

    cache.clear();
    assert!(cache.is_empty());
    let after = g.program(&[1.0, 1.0]).unwrap();
    assert!(!Arc::ptr_eq(&before, &after));

    let stats = cache.stats();
    assert_eq!(stats.invalidations, 1);
    assert_eq!(stats.compilations, 2);
}

#[test]
fn keys_can_be_inspected_directly() {
    let cache = JitCache::<f64>::new();
    let f = jit(Quadratic, &cache);
    f.call(&[2.0, 2.0]).unwrap();

    let key = CacheKey {
        function: f.id(),
        transform: Transform::Primal,
        signature: Signature::of(&[0.0_f64, 0.0]),
    };
    assert!(cache.get(&key).is_some());
    assert!(cache
        .get(&CacheKey {
            transform: Transform::Adjoint,
            ..key
        })
        .is_none());
    assert_eq!(Signature::of(&[0.0_f32]).dtype, "f32");
}

#[test]
fn failed_compilation_surfaces_and_is_not_cached() {
    init_logging();
    let cache = JitCache::new();
    let f = jit(NormObjective::<f64>::default(), &cache);
    assert!(matches!(
        f.call(&[]),
        Err(trisolve::Error::ShapeMismatch { name: "params", .. })
    ));
    assert!(cache.is_empty());
    assert_eq!(cache.stats().compilations, 0);
}

#[test]
fn adjoint_program_has_one_output_per_input() {
    let cache = JitCache::new();
    let g = jit_grad(NormObjective::<f64>::default(), &cache);
    let program = g.program(&[0.1, 0.2, 0.3]).unwrap();
    assert_eq!(program.num_inputs(), 3);
    assert_eq!(program.num_outputs(), 3);
    assert!(!program.guards().is_empty());
}

#[test]
fn compiled_programs_are_shared_across_threads() {
    init_logging();
    let cache = JitCache::new();
    let objective = NormObjective::<f64>::default();
    let compiled = jit_grad(objective, &cache);
    compiled.call(&[0.1, 0.2, 0.3]).unwrap();

    let points: Vec<Vec<f64>> = (0..4)
        .map(|k| vec![0.1 * k as f64, 0.2, -0.1])
        .collect();
    let shared = &compiled;
    let results: Vec<Vec<f64>> = std::thread::scope(|s| {
        let handles: Vec<_> = points
            .iter()
            .map(|x| s.spawn(move || shared.call(x).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for (x, g) in points.iter().zip(&results) {
        let (_, expected) = grad_fn(&objective, x).unwrap();
        for k in 0..3 {
            assert_relative_eq!(g[k], expected[k], max_relative = 1e-12, epsilon = 1e-14);
        }
    }
    assert_eq!(cache.stats().compilations, 1);
}

#[test]
fn recorded_tape_and_compiled_call_agree() {
    let x = [0.05, -0.1, 0.2, 0.15];
    let objective = NormObjective::<f64>::default();
    let (tape, value) = record(|v| objective.eval(v), &x).unwrap();

    let cache = JitCache::new();
    let compiled = jit(objective, &cache);
    assert_eq!(compiled.call(&x).unwrap(), value);
    assert_eq!(tape.eval_scalar(&x).unwrap(), value);
}
