//! Bytecode tape: the compiled form of a traced scalar function.
//!
//! Unlike the Adept-style [`Tape`](crate::tape::Tape), this tape stores opcodes
//! rather than precomputed multipliers. It is recorded once and then replayed
//! at different inputs without re-tracing, which is what
//! [`jit`](crate::jit::jit) caches.
//!
//! Data-dependent decisions made while tracing are not replayed, with one
//! exception: elimination pivots are recorded as [`PivotGuard`]s and
//! re-checked on every replay, so a compiled solve fails with
//! [`Error::SingularSystem`](crate::Error::SingularSystem) exactly where the
//! uncompiled one would.

use crate::error::{Error, Result};
use crate::float::Float;
use crate::opcode::{OpCode, UNUSED};

mod adjoint;
mod forward;
mod reverse;
#[cfg(feature = "serde")]
mod serde_support;
mod thread_local;

pub use self::thread_local::{with_active_btape, BtapeScope, BtapeThreadLocal};

/// Sentinel index for constant entries (not tracked).
pub const CONSTANT: u32 = u32::MAX;

/// A pivot check recorded while tracing.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PivotGuard<F> {
    /// Tape entry holding the pivot value.
    pub index: u32,
    /// Equation row the pivot belongs to.
    pub row: usize,
    /// Minimum admissible pivot magnitude.
    pub epsilon: F,
}

/// A bytecode tape that can be re-evaluated at different inputs.
///
/// Created via [`crate::api::record`]. Replaying goes through `&self`
/// ([`eval`](Self::eval), [`value_and_gradient`](Self::value_and_gradient)),
/// so one recorded program can be shared across threads.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BytecodeTape<F: Float> {
    pub(crate) opcodes: Vec<OpCode>,
    pub(crate) arg_indices: Vec<[u32; 2]>,
    /// Values from the recording pass; constants are read from here on replay.
    pub(crate) values: Vec<F>,
    pub(crate) num_inputs: u32,
    pub(crate) output_indices: Vec<u32>,
    pub(crate) guards: Vec<PivotGuard<F>>,
    #[cfg_attr(feature = "serde", serde(skip))]
    overflowed: bool,
}

impl<F: Float> Default for BytecodeTape<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Float> BytecodeTape<F> {
    /// Create an empty bytecode tape.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create a bytecode tape with pre-allocated capacity.
    pub fn with_capacity(est_ops: usize) -> Self {
        BytecodeTape {
            opcodes: Vec::with_capacity(est_ops),
            arg_indices: Vec::with_capacity(est_ops),
            values: Vec::with_capacity(est_ops),
            num_inputs: 0,
            output_indices: Vec::new(),
            guards: Vec::new(),
            overflowed: false,
        }
    }

    /// Number of tape entries (inputs, constants and operations).
    #[inline]
    pub fn len(&self) -> usize {
        self.opcodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.opcodes.is_empty()
    }

    /// Number of input variables.
    #[inline]
    pub fn num_inputs(&self) -> usize {
        self.num_inputs as usize
    }

    /// Number of marked outputs.
    #[inline]
    pub fn num_outputs(&self) -> usize {
        self.output_indices.len()
    }

    /// Recorded pivot guards, in recording order.
    #[inline]
    pub fn guards(&self) -> &[PivotGuard<F>] {
        &self.guards
    }

    /// Opcode at tape entry `index`.
    #[inline]
    pub fn opcode(&self, index: u32) -> OpCode {
        self.opcodes[index as usize]
    }

    /// Output values as of the recording pass.
    pub fn recorded_outputs(&self) -> Vec<F> {
        self.output_indices
            .iter()
            .map(|&i| self.values[i as usize])
            .collect()
    }

    #[inline]
    fn next_index(&mut self) -> Option<u32> {
        match u32::try_from(self.opcodes.len()) {
            Ok(idx) if idx < CONSTANT => Some(idx),
            _ => {
                self.overflowed = true;
                None
            }
        }
    }

    #[inline]
    fn push_entry(&mut self, op: OpCode, args: [u32; 2], value: F) -> u32 {
        match self.next_index() {
            Some(idx) => {
                self.opcodes.push(op);
                self.arg_indices.push(args);
                self.values.push(value);
                idx
            }
            None => CONSTANT,
        }
    }

    /// Register a new input variable. Returns its index.
    ///
    /// Inputs must be registered before anything else so that input `k`
    /// lives at tape index `k`.
    #[inline]
    pub fn new_input(&mut self, value: F) -> u32 {
        debug_assert_eq!(
            self.opcodes.len(),
            self.num_inputs as usize,
            "inputs must precede all other tape entries"
        );
        let idx = self.push_entry(OpCode::Input, [UNUSED, UNUSED], value);
        if idx != CONSTANT {
            self.num_inputs += 1;
        }
        idx
    }

    /// Register a scalar constant. Returns its index.
    #[inline]
    pub fn push_const(&mut self, value: F) -> u32 {
        self.push_entry(OpCode::Const, [UNUSED, UNUSED], value)
    }

    /// Record an operation. Returns the result index.
    ///
    /// **Constant folding**: if every operand is a `Const` entry the operation
    /// becomes a single `Const` holding the already-computed value.
    ///
    /// **Identity simplification**: `x + 0`, `0 + x`, `x - 0`, `x * 1`,
    /// `1 * x` and `x / 1` return the index of `x` without recording.
    #[inline]
    pub fn push_op(&mut self, op: OpCode, arg0: u32, arg1: u32, value: F) -> u32 {
        if arg0 == CONSTANT || (op.is_binary() && arg1 == CONSTANT) {
            // An operand was dropped after an overflow; the tape is unusable.
            self.overflowed = true;
            return CONSTANT;
        }
        let arg0_const = self.opcodes[arg0 as usize] == OpCode::Const;
        let arg1_const = !op.is_binary() || self.opcodes[arg1 as usize] == OpCode::Const;
        if arg0_const && arg1_const {
            return self.push_const(value);
        }

        if op.is_binary() && (arg0_const || arg1_const) {
            if let Some(idx) = self.try_identity_simplify(op, arg0, arg1, arg0_const, arg1_const)
            {
                return idx;
            }
        }

        let arg1 = if op.is_binary() { arg1 } else { UNUSED };
        self.push_entry(op, [arg0, arg1], value)
    }

    fn try_identity_simplify(
        &self,
        op: OpCode,
        arg0: u32,
        arg1: u32,
        arg0_const: bool,
        arg1_const: bool,
    ) -> Option<u32> {
        let is = |idx: u32, v: F| self.values[idx as usize] == v;
        let (zero, one) = (F::zero(), F::one());
        match op {
            OpCode::Add if arg1_const && is(arg1, zero) => Some(arg0),
            OpCode::Add if arg0_const && is(arg0, zero) => Some(arg1),
            OpCode::Sub if arg1_const && is(arg1, zero) => Some(arg0),
            OpCode::Mul if arg1_const && is(arg1, one) => Some(arg0),
            OpCode::Mul if arg0_const && is(arg0, one) => Some(arg1),
            OpCode::Div if arg1_const && is(arg1, one) => Some(arg0),
            _ => None,
        }
    }

    /// Record a pivot check on tape entry `index`.
    #[inline]
    pub fn push_guard(&mut self, index: u32, row: usize, epsilon: F) {
        if index == CONSTANT || self.opcodes[index as usize] == OpCode::Const {
            // Constant pivots were already checked while tracing.
            return;
        }
        self.guards.push(PivotGuard {
            index,
            row,
            epsilon,
        });
    }

    /// Mark a single output variable.
    #[inline]
    pub fn set_output(&mut self, index: u32) {
        self.output_indices.clear();
        self.output_indices.push(index);
    }

    /// Mark several output variables.
    pub fn set_outputs(&mut self, indices: &[u32]) {
        self.output_indices.clear();
        self.output_indices.extend_from_slice(indices);
    }

    /// Index of the single output.
    pub(crate) fn single_output(&self) -> Result<u32> {
        match self.output_indices.as_slice() {
            [idx] => Ok(*idx),
            other => Err(Error::shape("outputs", 1, other.len())),
        }
    }

    /// Fail if the tape ran out of index space or is not replayable.
    ///
    /// A replayable tape has parallel entry arrays, its inputs first, and
    /// every operand, output and guard pointing at an entry that exists.
    /// Operands must precede the entry that reads them.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.overflowed {
            return Err(Error::compilation(format!(
                "tape exceeds the maximum of {} entries",
                CONSTANT
            )));
        }
        let len = self.opcodes.len();
        if self.arg_indices.len() != len || self.values.len() != len {
            return Err(Error::compilation(format!(
                "entry arrays disagree: {len} opcodes, {} argument pairs, {} values",
                self.arg_indices.len(),
                self.values.len()
            )));
        }
        let ni = self.num_inputs as usize;
        if ni > len {
            return Err(Error::compilation(format!(
                "{ni} inputs declared but only {len} entries"
            )));
        }
        for (i, (&op, &[a, b])) in self.opcodes.iter().zip(&self.arg_indices).enumerate() {
            let is_input = op == OpCode::Input;
            if is_input != (i < ni) {
                return Err(Error::compilation(format!(
                    "entry {i} is {op:?} but the tape declares {ni} leading inputs"
                )));
            }
            if is_input || op == OpCode::Const {
                continue;
            }
            let dangling = a as usize >= i || (op.is_binary() && b as usize >= i);
            if dangling {
                return Err(Error::compilation(format!(
                    "entry {i} ({op:?}) reads operands [{a}, {b}] that do not precede it"
                )));
            }
        }
        if let Some(&bad) = self.output_indices.iter().find(|&&i| i as usize >= len) {
            return Err(Error::compilation(format!(
                "output index {bad} was not recorded on this tape ({len} entries)"
            )));
        }
        if let Some(guard) = self.guards.iter().find(|g| g.index as usize >= len) {
            return Err(Error::compilation(format!(
                "pivot guard for row {} points at entry {} ({len} entries)",
                guard.row, guard.index
            )));
        }
        Ok(())
    }
}
