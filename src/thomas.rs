//! Thomas algorithm for tridiagonal systems, written as two scans.
//!
//! Row `i` of the system reads `a[i]*x[i-1] + b[i]*x[i] + c[i]*x[i+1] = f[i]`,
//! with `a[0]` and `c[n-1]` ignored. Forward elimination carries
//! `(f_{i-1}, q_{i-1})` down the rows; back substitution carries `x_{i+1}`
//! back up. Every routine is generic over [`Scalar`], so the same solve runs
//! on plain floats, on the Adept tape and while being traced for compilation.

use crate::error::{Error, Result};
use crate::float::Float;
use crate::scalar::Scalar;
use crate::scan::{scan, try_scan};

/// Solver configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolverConfig<F> {
    /// Smallest pivot magnitude accepted during forward elimination.
    pub pivot_epsilon: F,
}

impl Default for SolverConfig<f64> {
    fn default() -> Self {
        SolverConfig {
            pivot_epsilon: 1e-12,
        }
    }
}

impl Default for SolverConfig<f32> {
    fn default() -> Self {
        SolverConfig {
            pivot_epsilon: 1e-6,
        }
    }
}

/// A validated tridiagonal system: four sequences of equal length `n ≥ 1`.
#[derive(Clone, Debug, PartialEq)]
pub struct TridiagonalSystem<T> {
    a: Vec<T>,
    b: Vec<T>,
    c: Vec<T>,
    f: Vec<T>,
}

impl<T: Copy> TridiagonalSystem<T> {
    /// Build a system, rejecting empty or disagreeing sequences.
    pub fn new(a: Vec<T>, b: Vec<T>, c: Vec<T>, f: Vec<T>) -> Result<Self> {
        check_lengths(&a, &b, &c, &f)?;
        Ok(TridiagonalSystem { a, b, c, f })
    }

    /// Number of equations.
    pub fn len(&self) -> usize {
        self.b.len()
    }

    /// Always `false`: construction rejects empty systems.
    pub fn is_empty(&self) -> bool {
        self.b.is_empty()
    }

    /// Sub-diagonal.
    pub fn a(&self) -> &[T] {
        &self.a
    }

    /// Main diagonal.
    pub fn b(&self) -> &[T] {
        &self.b
    }

    /// Super-diagonal.
    pub fn c(&self) -> &[T] {
        &self.c
    }

    /// Right-hand side.
    pub fn f(&self) -> &[T] {
        &self.f
    }

    /// Consume the system, returning `(a, b, c, f)`.
    pub fn into_parts(self) -> (Vec<T>, Vec<T>, Vec<T>, Vec<T>) {
        (self.a, self.b, self.c, self.f)
    }
}

/// Output of the forward elimination scan.
///
/// `f[i]` is the eliminated right-hand side and `q[i]` the super-diagonal
/// multiplier of row `i`, so that `x[i] = f[i] + q[i] * x[i+1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Elimination<T> {
    /// Eliminated right-hand side, one entry per row.
    pub f: Vec<T>,
    /// Super-diagonal multipliers; `q[n-1]` is never read.
    pub q: Vec<T>,
}

fn check_lengths<T>(a: &[T], b: &[T], c: &[T], f: &[T]) -> Result<usize> {
    let n = b.len();
    if n == 0 {
        return Err(Error::shape("b", "at least 1", 0));
    }
    for (name, len) in [("a", a.len()), ("c", c.len()), ("f", f.len())] {
        if len != n {
            return Err(Error::shape(name, n, len));
        }
    }
    Ok(n)
}

/// Forward elimination scan.
///
/// Seeds `(f_0, q_0) = (f[0]/b[0], -c[0]/b[0])`, then for `i = 1..n`
/// divides by the pivot `b[i] + a[i]*q_{i-1}`. Every pivot, `b[0]` included,
/// must pass [`Scalar::check_pivot`]; the first one that does not aborts the
/// scan with [`Error::SingularSystem`].
pub fn forward_elimination<T: Scalar>(
    a: &[T],
    b: &[T],
    c: &[T],
    f: &[T],
    config: &SolverConfig<T::Float>,
) -> Result<Elimination<T>> {
    let n = check_lengths(a, b, c, f)?;
    let eps = config.pivot_epsilon;

    let b0 = b[0].check_pivot(0, eps)?;
    let seed = (f[0] / b0, -c[0] / b0);

    let rows = a[1..]
        .iter()
        .zip(&b[1..])
        .zip(&c[1..])
        .zip(&f[1..])
        .enumerate();
    let (_, tail) = try_scan(
        seed,
        rows,
        |(f_prev, q_prev), (k, (((&ai, &bi), &ci), &fi))| {
            let pivot = (bi + ai * q_prev).check_pivot(k + 1, eps)?;
            let cff = T::one() / pivot;
            let fk = cff * (fi - ai * f_prev);
            let qk = -cff * ci;
            Ok::<_, Error>(((fk, qk), (fk, qk)))
        },
    )?;

    let mut elim = Elimination {
        f: Vec::with_capacity(n),
        q: Vec::with_capacity(n),
    };
    elim.f.push(seed.0);
    elim.q.push(seed.1);
    for (fk, qk) in tail {
        elim.f.push(fk);
        elim.q.push(qk);
    }
    Ok(elim)
}

/// Backward substitution scan.
///
/// Walks rows `n-2` down to `0` with carry `x_{i+1}`, seeded from
/// `x_{n-1} = f_{n-1}`, and returns the solution in natural index order.
pub fn back_substitution<T: Scalar>(elim: &Elimination<T>) -> Vec<T> {
    let Some(&last) = elim.f.last() else {
        return Vec::new();
    };
    let n = elim.f.len();
    let rows = elim.q[..n - 1].iter().zip(&elim.f[..n - 1]).rev();
    let (_, mut x) = scan(last, rows, |x_next, (&q, &f)| {
        let xi = f + q * x_next;
        (xi, xi)
    });
    x.reverse();
    x.push(last);
    x
}

/// Solve with an explicit configuration.
pub fn solve_with<T: Scalar>(
    a: &[T],
    b: &[T],
    c: &[T],
    f: &[T],
    config: &SolverConfig<T::Float>,
) -> Result<Vec<T>> {
    let elim = forward_elimination(a, b, c, f, config)?;
    Ok(back_substitution(&elim))
}

/// Solve `A x = f` for tridiagonal `A` with the default pivot epsilon.
///
/// ```
/// let x = trisolve::solve(&[0.0_f64, 1.0], &[2.0, 2.0], &[1.0, 0.0], &[1.0, 3.0]).unwrap();
/// assert!((x[0] + 1.0 / 3.0).abs() < 1e-12);
/// assert!((x[1] - 5.0 / 3.0).abs() < 1e-12);
/// ```
pub fn solve<T: Scalar>(a: &[T], b: &[T], c: &[T], f: &[T]) -> Result<Vec<T>>
where
    SolverConfig<T::Float>: Default,
{
    solve_with(a, b, c, f, &SolverConfig::default())
}

/// Solve a validated system.
pub fn solve_system<T: Scalar>(
    system: &TridiagonalSystem<T>,
    config: &SolverConfig<T::Float>,
) -> Result<Vec<T>> {
    solve_with(&system.a, &system.b, &system.c, &system.f, config)
}

/// `A·x − f`, with out-of-range neighbour terms taken as zero.
pub fn residual<F: Float>(a: &[F], b: &[F], c: &[F], f: &[F], x: &[F]) -> Result<Vec<F>> {
    let n = check_lengths(a, b, c, f)?;
    if x.len() != n {
        return Err(Error::shape("x", n, x.len()));
    }
    Ok((0..n)
        .map(|i| {
            let mut row = b[i] * x[i] - f[i];
            if i > 0 {
                row = row + a[i] * x[i - 1];
            }
            if i + 1 < n {
                row = row + c[i] * x[i + 1];
            }
            row
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn two_by_two_known_solution() {
        let x = solve(&[0.0, 1.0], &[2.0, 2.0], &[1.0, 0.0], &[1.0, 3.0]).unwrap();
        assert_relative_eq!(x[0], -1.0 / 3.0, epsilon = 1e-14);
        assert_relative_eq!(x[1], 5.0 / 3.0, epsilon = 1e-14);
    }

    #[test]
    fn single_equation_is_the_seed() {
        let x = solve(&[9.0], &[4.0], &[9.0], &[2.0]).unwrap();
        assert_eq!(x, vec![0.5]);

        let elim = forward_elimination(&[9.0], &[4.0], &[8.0], &[2.0], &SolverConfig::default())
            .unwrap();
        assert_eq!(elim.q, vec![-2.0]);
    }

    #[test]
    fn zero_pivot_is_singular() {
        let err = solve(&[0.0], &[0.0], &[0.0], &[1.0]).unwrap_err();
        assert_eq!(err, Error::SingularSystem { row: 0, pivot: 0.0 });
    }

    #[test]
    fn interior_breakdown_reports_its_row() {
        // Row 1 pivot: b[1] + a[1]*q_0 = 1 + 1*(-1) = 0.
        let err = solve(&[0.0, 1.0, 1.0], &[1.0, 1.0, 4.0], &[1.0, 1.0, 0.0], &[1.0; 3])
            .unwrap_err();
        assert!(matches!(err, Error::SingularSystem { row: 1, .. }));
    }

    #[test]
    fn epsilon_is_configurable() {
        let cfg = SolverConfig { pivot_epsilon: 0.5 };
        assert!(solve_with(&[0.0], &[0.25], &[0.0], &[1.0], &cfg).is_err());
        assert!(solve_with(&[0.0], &[0.75], &[0.0], &[1.0], &cfg).is_ok());
    }

    #[test]
    fn shape_mismatch_is_reported() {
        let err = solve(&[0.0, 1.0], &[2.0, 2.0], &[1.0], &[1.0, 3.0]).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { name: "c", actual: 1, .. }));

        let empty: [f64; 0] = [];
        assert!(matches!(
            solve(&empty, &empty, &empty, &empty),
            Err(Error::ShapeMismatch { name: "b", .. })
        ));
        assert!(TridiagonalSystem::new(vec![1.0], vec![1.0, 2.0], vec![1.0, 2.0], vec![1.0, 2.0])
            .is_err());
    }

    #[test]
    fn residual_vanishes() {
        let a = [0.0_f64, 1.0, -0.5, 0.3];
        let b = [4.0, 5.0, 3.0, 2.5];
        let c = [1.0, -1.0, 0.2, 0.0];
        let f = [1.0, 2.0, 3.0, 4.0];
        let x = solve(&a, &b, &c, &f).unwrap();
        for r in residual(&a, &b, &c, &f, &x).unwrap() {
            assert!(r.abs() < 1e-12);
        }
    }

    #[test]
    fn f32_solve() {
        let x = solve(&[0.0_f32, 1.0], &[2.0, 2.0], &[1.0, 0.0], &[1.0, 3.0]).unwrap();
        assert_relative_eq!(x[1], 5.0 / 3.0, epsilon = 1e-6);
    }

    #[test]
    fn repeated_solves_are_bit_identical() {
        let a = [0.0_f64, 0.7, 0.1];
        let b = [3.0, 2.1, 5.5];
        let c = [0.3, 0.9, 0.0];
        let f = [1.1, -2.0, 0.4];
        let first = solve(&a, &b, &c, &f).unwrap();
        let second = solve(&a, &b, &c, &f).unwrap();
        assert_eq!(
            first.iter().map(|v| v.to_bits()).collect::<Vec<_>>(),
            second.iter().map(|v| v.to_bits()).collect::<Vec<_>>()
        );
    }
}
