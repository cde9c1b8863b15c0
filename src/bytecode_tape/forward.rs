use crate::error::{Error, Result};
use crate::float::Float;
use crate::opcode::{self, OpCode};
use crate::scalar::pivot_ok;

impl<F: Float> super::BytecodeTape<F> {
    /// Replay the tape at `inputs`, writing every entry's value into `values_buf`.
    ///
    /// Reads opcodes, constants and argument indices from `self` only, so the
    /// same tape can be replayed concurrently with separate buffers. After
    /// the sweep every pivot guard is re-checked in recording order; the first
    /// violated guard is reported and the buffer must not be used.
    pub fn forward_into(&self, inputs: &[F], values_buf: &mut Vec<F>) -> Result<()> {
        let ni = self.num_inputs as usize;
        if inputs.len() != ni {
            return Err(Error::shape("inputs", ni, inputs.len()));
        }

        values_buf.clear();
        values_buf.extend_from_slice(&self.values);
        values_buf[..ni].copy_from_slice(inputs);

        for i in ni..self.opcodes.len() {
            let op = self.opcodes[i];
            if matches!(op, OpCode::Input | OpCode::Const) {
                continue;
            }
            let [a_idx, b_idx] = self.arg_indices[i];
            let a = values_buf[a_idx as usize];
            let b = if op.is_binary() {
                values_buf[b_idx as usize]
            } else {
                F::zero()
            };
            values_buf[i] = opcode::eval_forward(op, a, b);
        }

        for guard in &self.guards {
            pivot_ok(values_buf[guard.index as usize], guard.row, guard.epsilon)?;
        }
        Ok(())
    }

    /// Replay the tape and return the output values.
    pub fn eval(&self, inputs: &[F]) -> Result<Vec<F>> {
        let mut buf = Vec::with_capacity(self.values.len());
        self.forward_into(inputs, &mut buf)?;
        Ok(self
            .output_indices
            .iter()
            .map(|&i| buf[i as usize])
            .collect())
    }

    /// Replay a single-output tape and return its value.
    pub fn eval_scalar(&self, inputs: &[F]) -> Result<F> {
        let out = self.single_output()?;
        let mut buf = Vec::with_capacity(self.values.len());
        self.forward_into(inputs, &mut buf)?;
        Ok(buf[out as usize])
    }
}
