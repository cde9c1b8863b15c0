//! Property-based tests for the solver and its derivatives.

use proptest::prelude::*;
use trisolve::thomas::residual;
use trisolve::{grad_fn, jit_grad, solve, JitCache, NormObjective};

/// Strictly diagonally dominant systems of size `1..max_n`.
fn dominant_system(
    max_n: usize,
) -> impl Strategy<Value = (Vec<f64>, Vec<f64>, Vec<f64>, Vec<f64>)> {
    (1..max_n).prop_flat_map(|n| {
        (
            prop::collection::vec(-1.0..1.0f64, n),
            prop::collection::vec(-1.0..1.0f64, n),
            prop::collection::vec(-10.0..10.0f64, n),
            prop::collection::vec(prop::bool::ANY, n),
        )
            .prop_map(|(a, c, f, neg)| {
                let b = a
                    .iter()
                    .zip(&c)
                    .zip(&neg)
                    .map(|((ai, ci), &ng)| {
                        let d = ai.abs() + ci.abs() + 0.5;
                        if ng {
                            -d
                        } else {
                            d
                        }
                    })
                    .collect();
                (a, b, c, f)
            })
    })
}

proptest! {
    /// Ax = f within tolerance for any strictly diagonally dominant system.
    #[test]
    fn solution_satisfies_every_row((a, b, c, f) in dominant_system(60)) {
        let x = solve(&a, &b, &c, &f).unwrap();
        prop_assert_eq!(x.len(), b.len());
        let r = residual(&a, &b, &c, &f, &x).unwrap();
        for (i, ri) in r.iter().enumerate() {
            prop_assert!(ri.abs() <= 1e-10 * f[i].abs().max(1.0),
                "row {}: residual {}", i, ri);
        }
    }

    /// Identity system (b=1, a=c=0) returns the right-hand side.
    #[test]
    fn identity_returns_rhs(f in prop::collection::vec(-100.0..100.0f64, 1..50)) {
        let n = f.len();
        let x = solve(&vec![0.0; n], &vec![1.0; n], &vec![0.0; n], &f).unwrap();
        prop_assert_eq!(x, f);
    }

    /// The compiled gradient matches the taped one at any point in the
    /// well-posed domain.
    #[test]
    fn compiled_gradient_matches_taped(
        params in prop::collection::vec(-0.25..0.25f64, 1..8)
    ) {
        let objective = NormObjective::<f64>::default();
        let cache = JitCache::new();
        let compiled = jit_grad(objective, &cache).call(&params).unwrap();
        let (_, taped) = grad_fn(&objective, &params).unwrap();
        for (g, t) in compiled.iter().zip(&taped) {
            prop_assert!((g - t).abs() <= 1e-10 * t.abs().max(1.0),
                "compiled {} vs taped {}", g, t);
        }
    }
}
