#![allow(dead_code)]

use trisolve::{NormObjective, ProblemConfig, SolverConfig, TridiagonalSystem};

// ─── Systems ───────────────────────────────────────────────────────────────

/// Diagonally dominant system of size `n` with slowly varying coefficients.
pub fn make_system(n: usize) -> TridiagonalSystem<f64> {
    let a = (0..n).map(|i| 0.3 + 0.1 * ((i as f64) * 0.7).cos()).collect();
    let b = (0..n).map(|i| 2.5 + 0.1 * ((i as f64) * 0.3).sin()).collect();
    let c = (0..n).map(|i| -0.4 + 0.1 * ((i as f64) * 1.1).sin()).collect();
    let f = (0..n).map(|i| ((i + 1) as f64).sqrt()).collect();
    // Lengths agree by construction.
    TridiagonalSystem::new(a, b, c, f).unwrap_or_else(|e| panic!("{e}"))
}

pub fn make_batch(count: usize, n: usize) -> Vec<TridiagonalSystem<f64>> {
    (0..count).map(|_| make_system(n)).collect()
}

// ─── Objective ─────────────────────────────────────────────────────────────

pub fn make_objective(n: usize) -> NormObjective<f64> {
    NormObjective::new(ProblemConfig::default().with_size(n), SolverConfig::default())
}

// ─── Helpers ───────────────────────────────────────────────────────────────

pub fn make_params(d: usize) -> Vec<f64> {
    (0..d).map(|i| 0.2 * ((i as f64) * 1.7).sin()).collect()
}
