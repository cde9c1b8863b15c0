//! Test workload: a tridiagonal system assembled from a short parameter
//! vector, solved, and reduced to the Euclidean norm of its solution.

use crate::api::ScalarFn;
use crate::error::{Error, Result};
use crate::float::Float;
use crate::scalar::Scalar;
use crate::thomas::{solve_system, SolverConfig, TridiagonalSystem};

/// Rotation applied to the parameters for each of `a`, `b`, `c`, `f`.
const SHIFTS: [usize; 4] = [0, 1, 2, 3];

/// Problem size and diagonal offsets.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProblemConfig<F> {
    /// Number of equations `n`.
    pub size: usize,
    /// Added to every sub-diagonal entry.
    pub sub_offset: F,
    /// Added to every main-diagonal entry.
    pub diag_offset: F,
    /// Added to every super-diagonal entry.
    pub super_offset: F,
}

impl Default for ProblemConfig<f64> {
    fn default() -> Self {
        ProblemConfig {
            size: 100,
            sub_offset: 0.5,
            diag_offset: 2.0,
            super_offset: 0.5,
        }
    }
}

impl Default for ProblemConfig<f32> {
    fn default() -> Self {
        ProblemConfig {
            size: 100,
            sub_offset: 0.5,
            diag_offset: 2.0,
            super_offset: 0.5,
        }
    }
}

impl<F> ProblemConfig<F> {
    /// Same offsets, different size.
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }
}

/// Rotate `params` right by `shift`, repeat it cyclically and truncate to `n`.
///
/// `out[j] = params[(j - shift) mod d]`. Returns an empty vector for empty
/// `params`.
pub fn tile_rolled<T: Copy>(params: &[T], shift: usize, n: usize) -> Vec<T> {
    let d = params.len();
    if d == 0 {
        return Vec::new();
    }
    let shift = shift % d;
    (0..n).map(|j| params[(j % d + d - shift) % d]).collect()
}

fn offset<T: Scalar>(xs: Vec<T>, by: T::Float) -> Vec<T> {
    let by = T::from_f(by);
    xs.into_iter().map(|x| x + by).collect()
}

/// Build the diagonals and right-hand side from `params`.
///
/// Requires `1 ≤ params.len() ≤ config.size`.
pub fn assemble<T: Scalar>(
    params: &[T],
    config: &ProblemConfig<T::Float>,
) -> Result<TridiagonalSystem<T>> {
    let n = config.size;
    let d = params.len();
    if d == 0 || d > n {
        return Err(Error::shape("params", format!("1..={n}"), d));
    }
    let [sa, sb, sc, sf] = SHIFTS;
    TridiagonalSystem::new(
        offset(tile_rolled(params, sa, n), config.sub_offset),
        offset(tile_rolled(params, sb, n), config.diag_offset),
        offset(tile_rolled(params, sc, n), config.super_offset),
        tile_rolled(params, sf, n),
    )
}

/// Euclidean norm.
pub fn l2_norm<T: Scalar>(x: &[T]) -> T {
    x.iter().fold(T::zero(), |acc, &v| acc + v * v).sqrt()
}

/// Assemble, solve and reduce to `‖x‖₂`.
pub fn assemble_and_reduce<T: Scalar>(
    params: &[T],
    problem: &ProblemConfig<T::Float>,
    solver: &SolverConfig<T::Float>,
) -> Result<T> {
    let system = assemble(params, problem)?;
    let x = solve_system(&system, solver)?;
    Ok(l2_norm(&x))
}

/// [`assemble_and_reduce`] packaged as a [`ScalarFn`], ready for the
/// gradient and compilation operators.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NormObjective<F> {
    pub problem: ProblemConfig<F>,
    pub solver: SolverConfig<F>,
}

impl<F: Float> NormObjective<F> {
    pub fn new(problem: ProblemConfig<F>, solver: SolverConfig<F>) -> Self {
        NormObjective { problem, solver }
    }
}

impl<F> Default for NormObjective<F>
where
    ProblemConfig<F>: Default,
    SolverConfig<F>: Default,
{
    fn default() -> Self {
        NormObjective {
            problem: ProblemConfig::default(),
            solver: SolverConfig::default(),
        }
    }
}

impl<F: Float> ScalarFn<F> for NormObjective<F> {
    fn eval<T: Scalar<Float = F>>(&self, x: &[T]) -> Result<T> {
        assemble_and_reduce(x, &self.problem, &self.solver)
    }
}
