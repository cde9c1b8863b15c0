use crate::breverse::BReverse;
use crate::bytecode_tape::{BtapeScope, BtapeThreadLocal, BytecodeTape, CONSTANT};
use crate::error::{Error, Result};
use crate::float::Float;
use crate::reverse::Reverse;
use crate::scalar::Scalar;
use crate::tape::{Tape, TapeScope, TapeThreadLocal};

/// A fallible scalar function `R^n → R` that is generic over the scalar type.
///
/// Closures cannot be generic, so functions that must run both under the
/// gradient operator ([`Reverse`]) and under the compilation operator
/// ([`BReverse`]) implement this trait instead.
///
/// ```
/// use trisolve::{Result, Scalar, ScalarFn};
///
/// struct SumOfSquares;
///
/// impl ScalarFn<f64> for SumOfSquares {
///     fn eval<T: Scalar<Float = f64>>(&self, x: &[T]) -> Result<T> {
///         Ok(x.iter().fold(T::zero(), |acc, &v| acc + v * v))
///     }
/// }
///
/// let (value, g) = trisolve::grad_fn(&SumOfSquares, &[1.0, 2.0]).unwrap();
/// assert_eq!(value, 5.0);
/// assert_eq!(g, vec![2.0, 4.0]);
/// ```
pub trait ScalarFn<F: Float> {
    /// Evaluate the function on any scalar type over `F`.
    fn eval<T: Scalar<Float = F>>(&self, x: &[T]) -> Result<T>;
}

impl<F: Float, G: ScalarFn<F> + ?Sized> ScalarFn<F> for &G {
    #[inline]
    fn eval<T: Scalar<Float = F>>(&self, x: &[T]) -> Result<T> {
        (**self).eval(x)
    }
}

/// Register `x` as independent variables on a fresh Adept tape.
fn adept_inputs<F: Float>(tape: &mut Tape<F>, x: &[F]) -> Vec<Reverse<F>> {
    x.iter()
        .map(|&val| Reverse::from_tape(val, tape.new_variable()))
        .collect()
}

/// Compute the gradient of a scalar function `f : R^n → R` using reverse mode.
///
/// ```
/// let g = trisolve::grad(|x: &[trisolve::Reverse<f64>]| {
///     x[0] * x[0] + x[1] * x[1]
/// }, &[3.0, 4.0]);
/// assert!((g[0] - 6.0).abs() < 1e-10);
/// assert!((g[1] - 8.0).abs() < 1e-10);
/// ```
pub fn grad<F: Float + TapeThreadLocal>(
    f: impl FnOnce(&[Reverse<F>]) -> Reverse<F>,
    x: &[F],
) -> Vec<F> {
    let n = x.len();
    let mut tape = Tape::with_capacity(n * 10);
    let inputs = adept_inputs(&mut tape, x);

    let scope = TapeScope::new(tape);
    let output = f(&inputs);
    let tape = scope.finish();

    let adjoints = tape.reverse(output.index);
    adjoints[..n].to_vec()
}

/// Reverse-mode value and gradient of a fallible scalar function.
///
/// The tape is recorded afresh on every call; this is the uncompiled
/// gradient path.
pub fn value_and_grad<F: Float + TapeThreadLocal>(
    f: impl FnOnce(&[Reverse<F>]) -> Result<Reverse<F>>,
    x: &[F],
) -> Result<(F, Vec<F>)> {
    let n = x.len();
    let mut tape = Tape::with_capacity(n * 10);
    let inputs = adept_inputs(&mut tape, x);

    let scope = TapeScope::new(tape);
    let output = f(&inputs);
    let tape = scope.finish();
    let output = output?;

    let adjoints = tape.reverse(output.index);
    Ok((output.value, adjoints[..n].to_vec()))
}

/// Gradient of a fallible scalar function.
pub fn try_grad<F: Float + TapeThreadLocal>(
    f: impl FnOnce(&[Reverse<F>]) -> Result<Reverse<F>>,
    x: &[F],
) -> Result<Vec<F>> {
    value_and_grad(f, x).map(|(_, g)| g)
}

/// Value and gradient of a [`ScalarFn`] on the Adept tape.
pub fn grad_fn<F: Float + TapeThreadLocal, G: ScalarFn<F> + ?Sized>(
    func: &G,
    x: &[F],
) -> Result<(F, Vec<F>)> {
    value_and_grad(|v| func.eval(v), x)
}

/// Vector-Jacobian product (reverse mode): `(f(x), wᵀ·J)`.
///
/// Lets a vector-valued function such as the solver itself be
/// differentiated against a cotangent `w`.
pub fn vjp<F: Float + TapeThreadLocal>(
    f: impl FnOnce(&[Reverse<F>]) -> Result<Vec<Reverse<F>>>,
    x: &[F],
    w: &[F],
) -> Result<(Vec<F>, Vec<F>)> {
    let n = x.len();
    let mut tape = Tape::with_capacity(n * 10);
    let inputs = adept_inputs(&mut tape, x);

    let scope = TapeScope::new(tape);
    let outputs = f(&inputs);
    let tape = scope.finish();
    let outputs = outputs?;

    if outputs.len() != w.len() {
        return Err(Error::shape("cotangent", outputs.len(), w.len()));
    }

    let values: Vec<F> = outputs.iter().map(|r| r.value).collect();
    let seeds: Vec<(u32, F)> = outputs
        .iter()
        .zip(w.iter())
        .map(|(r, &wi)| (r.index, wi))
        .collect();
    let adjoints = tape.reverse_seeded(&seeds);

    Ok((values, adjoints[..n].to_vec()))
}

/// Trace `f` at `x` into a fresh bytecode tape whose inputs are registered.
fn trace<F: Float + BtapeThreadLocal, R>(
    f: impl FnOnce(&[BReverse<F>]) -> Result<R>,
    x: &[F],
) -> (BytecodeTape<F>, Result<R>) {
    let mut tape = BytecodeTape::with_capacity(x.len() * 10);
    let inputs: Vec<BReverse<F>> = x
        .iter()
        .map(|&val| BReverse::from_tape(val, tape.new_input(val)))
        .collect();

    let scope = BtapeScope::new(tape);
    let output = f(&inputs);
    (scope.finish(), output)
}

/// Promote a traced output to a tape index, materialising constants.
fn output_index<F: Float>(tape: &mut BytecodeTape<F>, out: &BReverse<F>) -> u32 {
    if out.index == CONSTANT {
        tape.push_const(out.value)
    } else {
        out.index
    }
}

/// Record a function into a [`BytecodeTape`] that can be re-evaluated at
/// different inputs without re-recording.
///
/// Returns the tape and the output value from the recording pass. Errors
/// raised by `f` while tracing are returned unchanged; a tape that cannot be
/// replayed yields [`Error::Compilation`].
///
/// # Limitations
///
/// The tape records one execution path. Branches on traced values are frozen
/// at their recording-time outcome; only pivot checks made through
/// [`Scalar::check_pivot`] are re-evaluated on replay.
///
/// ```
/// let (tape, val) = trisolve::record(
///     |x| Ok(x[0] * x[0] + x[1] * x[1]),
///     &[3.0_f64, 4.0],
/// ).unwrap();
/// assert!((val - 25.0).abs() < 1e-10);
///
/// let g = tape.gradient(&[1.0, 2.0]).unwrap();
/// assert!((g[0] - 2.0).abs() < 1e-10);
/// assert!((g[1] - 4.0).abs() < 1e-10);
/// ```
pub fn record<F: Float + BtapeThreadLocal>(
    f: impl FnOnce(&[BReverse<F>]) -> Result<BReverse<F>>,
    x: &[F],
) -> Result<(BytecodeTape<F>, F)> {
    let (mut tape, output) = trace(f, x);
    let output = output?;
    let index = output_index(&mut tape, &output);
    tape.set_output(index);
    tape.validate()?;
    Ok((tape, output.value))
}

/// Record a multi-output function into a [`BytecodeTape`].
///
/// Like [`record`] but for vector-valued functions `f : R^n → R^m`; the
/// returned tape supports [`vjp`](BytecodeTape::vjp) and
/// [`eval`](BytecodeTape::eval).
pub fn record_multi<F: Float + BtapeThreadLocal>(
    f: impl FnOnce(&[BReverse<F>]) -> Result<Vec<BReverse<F>>>,
    x: &[F],
) -> Result<(BytecodeTape<F>, Vec<F>)> {
    let (mut tape, outputs) = trace(f, x);
    let outputs = outputs?;
    let indices: Vec<u32> = outputs
        .iter()
        .map(|o| output_index(&mut tape, o))
        .collect();
    tape.set_outputs(&indices);
    tape.validate()?;
    Ok((tape, outputs.iter().map(|o| o.value).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_output_records_a_const() {
        let (tape, value) = record(|_x: &[BReverse<f64>]| Ok(BReverse::constant(7.0)), &[1.0])
            .unwrap();
        assert_eq!(value, 7.0);
        assert_eq!(tape.gradient(&[2.0]).unwrap(), vec![0.0]);
        assert_eq!(tape.eval_scalar(&[5.0]).unwrap(), 7.0);
    }

    #[test]
    fn tracing_errors_propagate() {
        let err = record(
            |_x: &[BReverse<f64>]| Err(Error::SingularSystem { row: 1, pivot: 0.0 }),
            &[1.0],
        )
        .unwrap_err();
        assert_eq!(err, Error::SingularSystem { row: 1, pivot: 0.0 });
        // The failed trace must not leave a tape active.
        let again = record(|x| Ok(x[0] + x[0]), &[1.0_f64]).unwrap();
        assert_eq!(again.1, 2.0);
    }

    #[test]
    fn vjp_checks_cotangent_length() {
        let res = vjp(|x: &[Reverse<f64>]| Ok(vec![x[0], x[0] * x[0]]), &[3.0], &[1.0]);
        assert!(matches!(res, Err(Error::ShapeMismatch { .. })));

        let (values, g) =
            vjp(|x: &[Reverse<f64>]| Ok(vec![x[0], x[0] * x[0]]), &[3.0], &[1.0, 2.0]).unwrap();
        assert_eq!(values, vec![3.0, 9.0]);
        assert_eq!(g, vec![13.0]);
    }

    #[test]
    fn nested_gradients_are_isolated() {
        let outer = grad(
            |x: &[Reverse<f64>]| {
                let inner = grad(|y: &[Reverse<f64>]| y[0] * y[0], &[5.0]);
                x[0] * Reverse::constant(inner[0])
            },
            &[1.0],
        );
        assert_eq!(outer, vec![10.0]);
    }
}
