//! Bytecode-tape reverse-mode AD variable.
//!
//! [`BReverse<F>`] is analogous to [`Reverse<F>`](crate::Reverse) but records
//! opcodes to a [`BytecodeTape`](crate::bytecode_tape::BytecodeTape) instead
//! of precomputed multipliers. This is the tracing type used when a function
//! is compiled: the tape can be replayed at different inputs without
//! re-recording.

use std::fmt::{self, Display};

use crate::bytecode_tape::{self, BtapeThreadLocal, CONSTANT};
use crate::float::Float;
use crate::opcode::OpCode;

/// Bytecode-tape reverse-mode AD variable.
///
/// Same layout as [`Reverse<F>`](crate::Reverse) (12 bytes for `f64`, `Copy`).
#[derive(Clone, Copy, Debug)]
pub struct BReverse<F: Float> {
    pub(crate) value: F,
    pub(crate) index: u32,
}

impl<F: Float> BReverse<F> {
    /// Create a constant (not tracked on tape).
    #[inline]
    pub fn constant(value: F) -> Self {
        BReverse {
            value,
            index: CONSTANT,
        }
    }

    /// Create from a tape allocation (internal use).
    #[inline]
    pub fn from_tape(value: F, index: u32) -> Self {
        BReverse { value, index }
    }

    /// Get the tape index.
    #[inline]
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Value observed while tracing.
    #[inline]
    pub fn value(&self) -> F {
        self.value
    }
}

impl<F: Float + BtapeThreadLocal> BReverse<F> {
    /// Square root.
    #[inline]
    pub fn sqrt(self) -> Self {
        crate::traits::breverse_ops::brev_unary_op(self, OpCode::Sqrt, self.value.sqrt())
    }

    /// Record a pivot guard for this value on the active tape.
    pub(crate) fn record_pivot_guard(self, row: usize, epsilon: F) {
        if self.index != CONSTANT {
            bytecode_tape::with_active_btape(|t| t.push_guard(self.index, row, epsilon));
        }
    }
}

impl<F: Float> Display for BReverse<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl<F: Float> Default for BReverse<F> {
    fn default() -> Self {
        BReverse::constant(F::zero())
    }
}
