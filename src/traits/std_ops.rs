//! `std::ops` implementations for [`Reverse<F>`].
//!
//! Each operator computes its primal value and pushes the local partials to
//! the active Adept tape.

use std::ops::{Add, Div, Mul, Neg, Sub};

use crate::float::Float;
use crate::reverse::Reverse;
use crate::tape::{self, TapeThreadLocal};

impl<F: Float + TapeThreadLocal> Add for Reverse<F> {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        let value = self.value + rhs.value;
        let index =
            tape::with_active_tape(|t| t.push_binary(self.index, F::one(), rhs.index, F::one()));
        Reverse { value, index }
    }
}

impl<F: Float + TapeThreadLocal> Sub for Reverse<F> {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        let value = self.value - rhs.value;
        let index =
            tape::with_active_tape(|t| t.push_binary(self.index, F::one(), rhs.index, -F::one()));
        Reverse { value, index }
    }
}

impl<F: Float + TapeThreadLocal> Mul for Reverse<F> {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: Self) -> Self {
        let value = self.value * rhs.value;
        let index =
            tape::with_active_tape(|t| t.push_binary(self.index, rhs.value, rhs.index, self.value));
        Reverse { value, index }
    }
}

impl<F: Float + TapeThreadLocal> Div for Reverse<F> {
    type Output = Self;
    #[inline]
    fn div(self, rhs: Self) -> Self {
        let value = self.value / rhs.value;
        let index = tape::with_active_tape(|t| {
            t.push_binary(
                self.index,
                F::one() / rhs.value,
                rhs.index,
                -value / rhs.value,
            )
        });
        Reverse { value, index }
    }
}

impl<F: Float + TapeThreadLocal> Neg for Reverse<F> {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        let value = -self.value;
        let index = tape::with_active_tape(|t| t.push_unary(self.index, -F::one()));
        Reverse { value, index }
    }
}

#[cfg(test)]
mod tests {
    use crate::{grad, Reverse};

    #[test]
    fn quotient_rule() {
        // d/dx (x / y) = 1/y, d/dy = -x/y^2
        let g = grad(|v: &[Reverse<f64>]| v[0] / v[1], &[3.0, 2.0]);
        assert_eq!(g, vec![0.5, -0.75]);
    }

    #[test]
    fn constants_carry_no_adjoint() {
        let g = grad(
            |v: &[Reverse<f64>]| -(v[0] - Reverse::constant(1.0)) * Reverse::constant(4.0),
            &[2.0],
        );
        assert_eq!(g, vec![-4.0]);
    }
}
