//! Bytecode opcodes for the bytecode tape.
//!
//! Each opcode represents an elementary operation. The [`eval_forward`] and
//! [`reverse_partials`] functions evaluate / differentiate a single opcode.

use num_traits::Float;

/// Sentinel used in `arg_indices[1]` for unary ops (the second argument slot is unused).
pub const UNUSED: u32 = u32::MAX;

/// Elementary operation codes for the bytecode tape.
///
/// Binary ops use both `arg_indices` slots; unary ops use slot 0 only
/// (slot 1 = [`UNUSED`]).
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OpCode {
    // ── Structural ──
    /// Input variable (leaf node).
    Input,
    /// Scalar constant.
    Const,

    // ── Binary arithmetic ──
    Add,
    Sub,
    Mul,
    Div,

    // ── Unary ──
    Neg,
    Sqrt,
}

impl OpCode {
    /// Whether the op reads its second argument slot.
    #[inline]
    pub fn is_binary(self) -> bool {
        matches!(self, OpCode::Add | OpCode::Sub | OpCode::Mul | OpCode::Div)
    }
}

/// Evaluate a single opcode in the forward direction.
///
/// For unary ops `b` is ignored.
#[inline]
pub fn eval_forward<T: Float>(op: OpCode, a: T, b: T) -> T {
    match op {
        OpCode::Input | OpCode::Const => {
            // values are already set during tape setup
            unreachable!("Input/Const should not be re-evaluated via eval_forward")
        }
        OpCode::Add => a + b,
        OpCode::Sub => a - b,
        OpCode::Mul => a * b,
        OpCode::Div => a / b,
        OpCode::Neg => -a,
        OpCode::Sqrt => a.sqrt(),
    }
}

/// Compute reverse-mode partial derivatives for a single opcode.
///
/// Returns `(∂result/∂arg0, ∂result/∂arg1)`; for unary ops the second
/// partial is zero. `a`, `b` are the operand values and `r` is the result.
#[inline]
pub fn reverse_partials<T: Float>(op: OpCode, a: T, b: T, r: T) -> (T, T) {
    let zero = T::zero();
    let one = T::one();
    match op {
        OpCode::Input | OpCode::Const => (zero, zero),
        OpCode::Add => (one, one),
        OpCode::Sub => (one, -one),
        OpCode::Mul => (b, a),
        OpCode::Div => {
            let inv = one / b;
            (inv, -r * inv)
        }
        OpCode::Neg => (-one, zero),
        // d/da sqrt(a) = 1 / (2 sqrt(a))
        OpCode::Sqrt => (one / (r + r), zero),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partials_match_difference_quotients() {
        let (a, b) = (1.7_f64, 0.6_f64);
        let h = 1e-7;
        for op in [OpCode::Add, OpCode::Sub, OpCode::Mul, OpCode::Div] {
            let r = eval_forward(op, a, b);
            let (da, db) = reverse_partials(op, a, b, r);
            let fd_a = (eval_forward(op, a + h, b) - eval_forward(op, a - h, b)) / (2.0 * h);
            let fd_b = (eval_forward(op, a, b + h) - eval_forward(op, a, b - h)) / (2.0 * h);
            assert!((da - fd_a).abs() < 1e-6, "{op:?}: {da} vs {fd_a}");
            assert!((db - fd_b).abs() < 1e-6, "{op:?}: {db} vs {fd_b}");
        }
        for op in [OpCode::Neg, OpCode::Sqrt] {
            let r = eval_forward(op, a, 0.0);
            let (da, db) = reverse_partials(op, a, 0.0, r);
            let fd = (eval_forward(op, a + h, 0.0) - eval_forward(op, a - h, 0.0)) / (2.0 * h);
            assert!((da - fd).abs() < 1e-6, "{op:?}: {da} vs {fd}");
            assert_eq!(db, 0.0);
        }
    }

    #[test]
    fn binary_classification() {
        assert!(OpCode::Div.is_binary());
        assert!(!OpCode::Sqrt.is_binary());
        assert!(!OpCode::Input.is_binary());
    }
}
