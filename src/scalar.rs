//! The [`Scalar`] trait for writing AD-generic numeric code.
//!
//! Functions written as `fn f<T: Scalar>(x: &[T]) -> Result<T>` run unchanged on
//! plain `f64`, on [`Reverse<f64>`](crate::Reverse) (taped for one gradient)
//! and on [`BReverse<f64>`](crate::BReverse) (traced into a replayable
//! program). The solver and the problem assembler are written this way.

use std::fmt::{Debug, Display};
use std::ops::{Add, Div, Mul, Neg, Sub};

use num_traits::Float as NumFloat;
use num_traits::{One, Zero};

use crate::breverse::BReverse;
use crate::bytecode_tape::BtapeThreadLocal;
use crate::error::{Error, Result};
use crate::float::Float;
use crate::reverse::Reverse;
use crate::tape::TapeThreadLocal;

/// The central trait for AD-generic numeric code.
///
/// Only the operations the recurrences need are required: the four
/// arithmetic operators, negation and square root. Everything else is built
/// from those, which keeps every AD type's derivative rules small and exact.
pub trait Scalar:
    Copy
    + Debug
    + Display
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + 'static
{
    /// The underlying primitive float type.
    type Float: Float;

    /// Lift a plain float to this scalar (constant, zero derivative).
    fn from_f(val: Self::Float) -> Self;

    /// Extract the primal value.
    fn value(&self) -> Self::Float;

    /// Square root.
    fn sqrt(self) -> Self;

    /// Additive identity as a constant.
    #[inline]
    fn zero() -> Self {
        Self::from_f(<Self::Float as Zero>::zero())
    }

    /// Multiplicative identity as a constant.
    #[inline]
    fn one() -> Self {
        Self::from_f(<Self::Float as One>::one())
    }

    /// Check that `self`, used as the elimination pivot of `row`, has
    /// magnitude at least `epsilon` and is finite.
    ///
    /// Traced scalars additionally record the check so that replaying the
    /// compiled program at other inputs re-applies it.
    #[inline]
    fn check_pivot(self, row: usize, epsilon: Self::Float) -> Result<Self> {
        pivot_ok(self.value(), row, epsilon)?;
        Ok(self)
    }
}

/// Shared pivot predicate: fails on `|pivot| < epsilon`, NaN and infinities.
#[inline]
pub(crate) fn pivot_ok<F: Float>(pivot: F, row: usize, epsilon: F) -> Result<()> {
    if pivot.is_finite() && pivot.abs() >= epsilon {
        Ok(())
    } else {
        Err(Error::SingularSystem {
            row,
            pivot: pivot.to_f64_lossy(),
        })
    }
}

macro_rules! impl_scalar_for_primitive {
    ($f:ty) => {
        impl Scalar for $f {
            type Float = $f;

            #[inline]
            fn from_f(val: $f) -> Self {
                val
            }

            #[inline]
            fn value(&self) -> $f {
                *self
            }

            #[inline]
            fn sqrt(self) -> Self {
                NumFloat::sqrt(self)
            }
        }
    };
}

impl_scalar_for_primitive!(f32);
impl_scalar_for_primitive!(f64);

impl<F: Float + TapeThreadLocal> Scalar for Reverse<F> {
    type Float = F;

    #[inline]
    fn from_f(val: F) -> Self {
        Reverse::constant(val)
    }

    #[inline]
    fn value(&self) -> F {
        self.value
    }

    #[inline]
    fn sqrt(self) -> Self {
        Reverse::sqrt(self)
    }
}

impl<F: Float + BtapeThreadLocal> Scalar for BReverse<F> {
    type Float = F;

    #[inline]
    fn from_f(val: F) -> Self {
        BReverse::constant(val)
    }

    #[inline]
    fn value(&self) -> F {
        self.value
    }

    #[inline]
    fn sqrt(self) -> Self {
        BReverse::sqrt(self)
    }

    fn check_pivot(self, row: usize, epsilon: F) -> Result<Self> {
        pivot_ok(self.value, row, epsilon)?;
        self.record_pivot_guard(row, epsilon);
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hypot<T: Scalar>(x: T, y: T) -> T {
        (x * x + y * y).sqrt()
    }

    #[test]
    fn primitive_scalars_are_plain_floats() {
        assert_eq!(hypot(3.0_f64, 4.0), 5.0);
        assert_eq!(hypot(3.0_f32, 4.0), 5.0);
        assert_eq!(<f64 as Scalar>::one().value(), 1.0);
    }

    #[test]
    fn pivot_check_rejects_small_and_non_finite() {
        assert!(2.0_f64.check_pivot(0, 1e-12).is_ok());
        assert!((-2.0_f64).check_pivot(0, 1e-12).is_ok());
        assert_eq!(
            0.0_f64.check_pivot(3, 1e-12),
            Err(Error::SingularSystem { row: 3, pivot: 0.0 })
        );
        assert!(1e-13_f64.check_pivot(0, 1e-12).is_err());
        assert!(f64::NAN.check_pivot(0, 1e-12).is_err());
        assert!(f64::INFINITY.check_pivot(0, 1e-12).is_err());
    }
}
