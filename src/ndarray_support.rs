//! ndarray adapters for the tridiagonal solver.
//!
//! Thin wrappers accepting array views. Views need not be contiguous.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

use crate::batch::solve_batch;
use crate::error::{Error, Result};
use crate::float::Float;
use crate::scalar::Scalar;
use crate::thomas::{solve_with, SolverConfig, TridiagonalSystem};

/// Solve one system given as 1-D views.
pub fn solve_array<F: Float + Scalar<Float = F>>(
    a: ArrayView1<F>,
    b: ArrayView1<F>,
    c: ArrayView1<F>,
    f: ArrayView1<F>,
    config: &SolverConfig<F>,
) -> Result<Array1<F>> {
    let x = solve_with(&a.to_vec(), &b.to_vec(), &c.to_vec(), &f.to_vec(), config)?;
    Ok(Array1::from_vec(x))
}

/// Solve a batch of systems; row `k` of each view is system `k`.
///
/// Returns an `(m, n)` array whose rows are the solutions.
pub fn solve_batch_array<F: Float + Scalar<Float = F>>(
    a: ArrayView2<F>,
    b: ArrayView2<F>,
    c: ArrayView2<F>,
    f: ArrayView2<F>,
    config: &SolverConfig<F>,
) -> Result<Array2<F>> {
    let (m, n) = b.dim();
    for (name, (rows, cols)) in [("a", a.dim()), ("c", c.dim()), ("f", f.dim())] {
        if rows != m {
            return Err(Error::shape(name, format!("{m} rows"), rows));
        }
        if cols != n {
            return Err(Error::shape(name, format!("{n} columns"), cols));
        }
    }

    let systems = (0..m)
        .map(|k| {
            TridiagonalSystem::new(
                a.row(k).to_vec(),
                b.row(k).to_vec(),
                c.row(k).to_vec(),
                f.row(k).to_vec(),
            )
        })
        .collect::<Result<Vec<_>>>()?;
    let solutions = solve_batch(&systems, config)?;

    let mut out = Array2::zeros((m, n));
    for (mut row, x) in out.rows_mut().into_iter().zip(solutions) {
        for (dst, v) in row.iter_mut().zip(x) {
            *dst = v;
        }
    }
    Ok(out)
}
