//! Adept-style two-stack tape for reverse-mode AD.
//!
//! Stores precomputed partial derivatives (multipliers) and operand indices
//! during the forward pass. The reverse sweep is a single multiply-accumulate
//! loop with zero-adjoint skipping. Used by [`crate::Reverse`], i.e. by the
//! uncompiled gradient path: a fresh tape is recorded on every call.

use std::cell::RefCell;
use std::thread::LocalKey;

use crate::Float;

/// Sentinel index indicating a constant (not recorded on tape).
pub const CONSTANT: u32 = u32::MAX;

/// A recorded operation: its result lives at `lhs_index`, and its operands'
/// multipliers/indices span `[prev.end_plus_one .. self.end_plus_one)`.
#[derive(Clone, Copy, Debug)]
struct Statement {
    lhs_index: u32,
    end_plus_one: u32,
}

/// Multiplier tape for one reverse-mode evaluation.
pub struct Tape<F: Float> {
    statements: Vec<Statement>,
    multipliers: Vec<F>,
    indices: Vec<u32>,
    num_variables: u32,
}

impl<F: Float> Default for Tape<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Float> Tape<F> {
    /// Create an empty tape.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create a tape with room for about `est_ops` operations.
    pub fn with_capacity(est_ops: usize) -> Self {
        let mut statements = Vec::with_capacity(est_ops + 1);
        // Sentinel so that `statements[i - 1].end_plus_one` is valid for i >= 1.
        statements.push(Statement {
            lhs_index: 0,
            end_plus_one: 0,
        });
        Tape {
            statements,
            multipliers: Vec::with_capacity(est_ops * 2),
            indices: Vec::with_capacity(est_ops * 2),
            num_variables: 0,
        }
    }

    /// Number of recorded variables (inputs plus intermediate results).
    #[inline]
    pub fn num_variables(&self) -> usize {
        self.num_variables as usize
    }

    /// Register a new independent variable and return its index.
    ///
    /// Inputs get no statement: they are leaves whose adjoints are never
    /// reset during the sweep.
    #[inline]
    pub fn new_variable(&mut self) -> u32 {
        let idx = self.num_variables;
        self.num_variables += 1;
        idx
    }

    /// Record `result = f(operand)` with `multiplier = df/d(operand)`.
    #[inline]
    pub fn push_unary(&mut self, operand_idx: u32, multiplier: F) -> u32 {
        self.push_operands(&[(operand_idx, multiplier)])
    }

    /// Record a binary operation with precomputed partial derivatives.
    #[inline]
    pub fn push_binary(&mut self, lhs_idx: u32, lhs_mult: F, rhs_idx: u32, rhs_mult: F) -> u32 {
        self.push_operands(&[(lhs_idx, lhs_mult), (rhs_idx, rhs_mult)])
    }

    #[inline]
    fn push_operands(&mut self, operands: &[(u32, F)]) -> u32 {
        if operands.iter().all(|&(idx, _)| idx == CONSTANT) {
            return CONSTANT;
        }
        let result_idx = self.num_variables;
        self.num_variables += 1;

        for &(idx, mult) in operands {
            if idx != CONSTANT {
                self.multipliers.push(mult);
                self.indices.push(idx);
            }
        }
        self.statements.push(Statement {
            lhs_index: result_idx,
            end_plus_one: self.multipliers.len() as u32,
        });
        result_idx
    }

    /// Run the reverse sweep with the adjoint of `seed_index` set to one.
    /// Returns the full adjoint vector.
    pub fn reverse(&self, seed_index: u32) -> Vec<F> {
        self.reverse_seeded(&[(seed_index, F::one())])
    }

    /// Run the reverse sweep with custom adjoint seeds.
    ///
    /// Seeds on [`CONSTANT`] indices are ignored.
    pub fn reverse_seeded(&self, seeds: &[(u32, F)]) -> Vec<F> {
        let mut adjoints = vec![F::zero(); self.num_variables as usize];
        for &(idx, seed) in seeds {
            if idx != CONSTANT {
                adjoints[idx as usize] = adjoints[idx as usize] + seed;
            }
        }

        for i in (1..self.statements.len()).rev() {
            let stmt = self.statements[i];
            let a = adjoints[stmt.lhs_index as usize];
            if a == F::zero() {
                continue;
            }
            adjoints[stmt.lhs_index as usize] = F::zero();
            let start = self.statements[i - 1].end_plus_one as usize;
            let end = stmt.end_plus_one as usize;
            for j in start..end {
                let target = self.indices[j] as usize;
                adjoints[target] = adjoints[target] + self.multipliers[j] * a;
            }
        }
        adjoints
    }
}

// Stack of recording tapes per thread; the top is the active one. A stack
// rather than a single slot keeps nested `grad` calls isolated.
thread_local! {
    static TAPES_F32: RefCell<Vec<Tape<f32>>> = const { RefCell::new(Vec::new()) };
    static TAPES_F64: RefCell<Vec<Tape<f64>>> = const { RefCell::new(Vec::new()) };
}

/// Selects the thread-local tape stack for a float type.
pub trait TapeThreadLocal: Float {
    fn tape_stack() -> &'static LocalKey<RefCell<Vec<Tape<Self>>>>;
}

impl TapeThreadLocal for f32 {
    fn tape_stack() -> &'static LocalKey<RefCell<Vec<Tape<Self>>>> {
        &TAPES_F32
    }
}

impl TapeThreadLocal for f64 {
    fn tape_stack() -> &'static LocalKey<RefCell<Vec<Tape<Self>>>> {
        &TAPES_F64
    }
}

/// Access the active tape for the current thread.
///
/// # Panics
///
/// Panics if no recording scope is open, i.e. a [`crate::Reverse`] value is
/// combined outside of [`crate::grad`] and friends.
#[inline]
pub fn with_active_tape<F: TapeThreadLocal, R>(f: impl FnOnce(&mut Tape<F>) -> R) -> R {
    F::tape_stack().with(|stack| {
        let mut stack = stack.borrow_mut();
        let tape = stack
            .last_mut()
            .unwrap_or_else(|| panic!("no active tape; use trisolve::grad() or similar API"));
        f(tape)
    })
}

/// RAII recording scope: pushes a tape as the thread's active tape and pops
/// it again on [`finish`](Self::finish) or drop.
pub struct TapeScope<F: TapeThreadLocal> {
    depth: usize,
    finished: bool,
    _marker: std::marker::PhantomData<*const F>,
}

impl<F: TapeThreadLocal> TapeScope<F> {
    /// Make `tape` the active tape until the scope ends.
    pub fn new(tape: Tape<F>) -> Self {
        let depth = F::tape_stack().with(|stack| {
            let mut stack = stack.borrow_mut();
            stack.push(tape);
            stack.len()
        });
        TapeScope {
            depth,
            finished: false,
            _marker: std::marker::PhantomData,
        }
    }

    /// Close the scope and hand back the recorded tape.
    pub fn finish(mut self) -> Tape<F> {
        self.finished = true;
        self.pop()
    }

    fn pop(&self) -> Tape<F> {
        F::tape_stack().with(|stack| {
            let mut stack = stack.borrow_mut();
            debug_assert_eq!(stack.len(), self.depth, "tape scopes closed out of order");
            stack
                .pop()
                .unwrap_or_else(|| panic!("tape stack underflow"))
        })
    }
}

impl<F: TapeThreadLocal> Drop for TapeScope<F> {
    fn drop(&mut self) {
        if !self.finished {
            // Unwinding out of a recording: discard the partial tape.
            let _ = self.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_only_operations_are_not_recorded() {
        let mut tape = Tape::<f64>::new();
        assert_eq!(tape.push_binary(CONSTANT, 1.0, CONSTANT, 1.0), CONSTANT);
        assert_eq!(tape.num_variables(), 0);
    }

    #[test]
    fn reverse_accumulates_multipliers() {
        // z = 3x + 4y
        let mut tape = Tape::<f64>::new();
        let x = tape.new_variable();
        let y = tape.new_variable();
        let z = tape.push_binary(x, 3.0, y, 4.0);
        let adj = tape.reverse(z);
        assert_eq!(adj[x as usize], 3.0);
        assert_eq!(adj[y as usize], 4.0);
    }

    #[test]
    fn scopes_nest() {
        let outer = TapeScope::<f64>::new(Tape::new());
        let inner = TapeScope::<f64>::new(Tape::with_capacity(8));
        with_active_tape::<f64, _>(|t| {
            t.new_variable();
        });
        let inner_tape = inner.finish();
        assert_eq!(inner_tape.num_variables(), 1);
        let outer_tape = outer.finish();
        assert_eq!(outer_tape.num_variables(), 0);
    }
}
