//! Adjoint-program generation.
//!
//! Turns a recorded single-output tape into a second tape whose forward
//! replay computes the gradient. The new tape starts with a verbatim copy of
//! the primal entries (same indices, same guards) followed by the adjoint
//! accumulation, emitted entry by entry in reverse order. Compiling the
//! gradient this way means a cached gradient call is one forward replay, with
//! no reverse sweep at call time.

use log::debug;

use crate::error::Result;
use crate::float::Float;
use crate::opcode::{self, OpCode, UNUSED};

use super::BytecodeTape;

impl<F: Float> BytecodeTape<F> {
    /// Build the adjoint program of this tape.
    ///
    /// The returned tape has the same inputs and one output per input:
    /// `∂y/∂x_k`. Inputs the output does not depend on get a constant zero.
    pub fn adjoint_program(&self) -> Result<BytecodeTape<F>> {
        self.validate()?;
        let out = self.single_output()?;

        let len = self.opcodes.len();
        let mut prog = BytecodeTape::with_capacity(len * 3);
        prog.opcodes.extend_from_slice(&self.opcodes);
        prog.arg_indices.extend_from_slice(&self.arg_indices);
        prog.values.extend_from_slice(&self.values);
        prog.num_inputs = self.num_inputs;
        prog.guards.extend_from_slice(&self.guards);

        // adjoint[i] = tape entry holding ∂y/∂(entry i), if any contribution exists
        let mut adjoint: Vec<Option<u32>> = vec![None; len];
        adjoint[out as usize] = Some(prog.push_const(F::one()));

        for i in (0..len).rev() {
            let Some(adj) = adjoint[i] else { continue };
            let op = self.opcodes[i];
            let [a, b] = self.arg_indices[i];
            let r = i as u32;
            match op {
                OpCode::Input | OpCode::Const => {}
                OpCode::Add => {
                    prog.accumulate(&mut adjoint, a, adj);
                    prog.accumulate(&mut adjoint, b, adj);
                }
                OpCode::Sub => {
                    prog.accumulate(&mut adjoint, a, adj);
                    let neg = prog.emit(OpCode::Neg, adj, UNUSED);
                    prog.accumulate(&mut adjoint, b, neg);
                }
                OpCode::Mul => {
                    let da = prog.emit(OpCode::Mul, adj, b);
                    prog.accumulate(&mut adjoint, a, da);
                    let db = prog.emit(OpCode::Mul, adj, a);
                    prog.accumulate(&mut adjoint, b, db);
                }
                OpCode::Div => {
                    // ∂(a/b)/∂a = 1/b, ∂(a/b)/∂b = -(a/b)/b
                    let da = prog.emit(OpCode::Div, adj, b);
                    prog.accumulate(&mut adjoint, a, da);
                    let t = prog.emit(OpCode::Mul, da, r);
                    let db = prog.emit(OpCode::Neg, t, UNUSED);
                    prog.accumulate(&mut adjoint, b, db);
                }
                OpCode::Neg => {
                    let da = prog.emit(OpCode::Neg, adj, UNUSED);
                    prog.accumulate(&mut adjoint, a, da);
                }
                OpCode::Sqrt => {
                    let two_r = prog.emit(OpCode::Add, r, r);
                    let da = prog.emit(OpCode::Div, adj, two_r);
                    prog.accumulate(&mut adjoint, a, da);
                }
            }
        }

        let outputs: Vec<u32> = (0..self.num_inputs as usize)
            .map(|k| match adjoint[k] {
                Some(idx) => idx,
                None => prog.push_const(F::zero()),
            })
            .collect();
        prog.set_outputs(&outputs);
        prog.validate()?;

        debug!(
            "adjoint program: {} primal entries -> {} entries, {} outputs",
            len,
            prog.len(),
            outputs.len()
        );
        Ok(prog)
    }

    /// Record `op` on this tape, computing its value from recorded values.
    fn emit(&mut self, op: OpCode, a: u32, b: u32) -> u32 {
        let va = self.values[a as usize];
        let vb = if op.is_binary() {
            self.values[b as usize]
        } else {
            F::zero()
        };
        let value = opcode::eval_forward(op, va, vb);
        self.push_op(op, a, b, value)
    }

    /// `adjoint[target] += contribution`, emitting an `Add` only when the
    /// target already has a contribution.
    fn accumulate(&mut self, adjoint: &mut [Option<u32>], target: u32, contribution: u32) {
        let slot = &mut adjoint[target as usize];
        *slot = Some(match *slot {
            None => contribution,
            Some(prev) => self.emit(OpCode::Add, prev, contribution),
        });
    }
}
