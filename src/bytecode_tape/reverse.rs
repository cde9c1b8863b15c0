use crate::error::{Error, Result};
use crate::float::Float;
use crate::opcode::{self, OpCode};

impl<F: Float> super::BytecodeTape<F> {
    /// Reverse sweep over primal `values` (as produced by
    /// [`forward_into`](Self::forward_into)), starting from `seeds`.
    ///
    /// Returns the full adjoint vector (one entry per tape entry).
    pub fn reverse_from(&self, values: &[F], seeds: &[(u32, F)]) -> Vec<F> {
        debug_assert_eq!(values.len(), self.opcodes.len(), "values buffer has wrong length");
        let mut adjoints = vec![F::zero(); self.opcodes.len()];
        for &(idx, seed) in seeds {
            adjoints[idx as usize] = adjoints[idx as usize] + seed;
        }

        for i in (0..self.opcodes.len()).rev() {
            let adj = adjoints[i];
            if adj == F::zero() {
                continue;
            }
            let op = self.opcodes[i];
            if matches!(op, OpCode::Input | OpCode::Const) {
                continue;
            }
            adjoints[i] = F::zero();

            let [a_idx, b_idx] = self.arg_indices[i];
            let a = values[a_idx as usize];
            let b = if op.is_binary() {
                values[b_idx as usize]
            } else {
                F::zero()
            };
            let (da, db) = opcode::reverse_partials(op, a, b, values[i]);

            adjoints[a_idx as usize] = adjoints[a_idx as usize] + da * adj;
            if op.is_binary() {
                adjoints[b_idx as usize] = adjoints[b_idx as usize] + db * adj;
            }
        }
        adjoints
    }

    /// Replay at `x` and return `(f(x), ∇f(x))` for a single-output tape.
    pub fn value_and_gradient(&self, x: &[F]) -> Result<(F, Vec<F>)> {
        let out = self.single_output()?;
        let mut values = Vec::with_capacity(self.values.len());
        self.forward_into(x, &mut values)?;
        let adjoints = self.reverse_from(&values, &[(out, F::one())]);
        Ok((
            values[out as usize],
            adjoints[..self.num_inputs as usize].to_vec(),
        ))
    }

    /// Replay at `x` and return `∇f(x)` for a single-output tape.
    pub fn gradient(&self, x: &[F]) -> Result<Vec<F>> {
        self.value_and_gradient(x).map(|(_, g)| g)
    }

    /// Vector-Jacobian product: replay at `x`, return `(f(x), wᵀ·J)`.
    pub fn vjp(&self, x: &[F], w: &[F]) -> Result<(Vec<F>, Vec<F>)> {
        if w.len() != self.output_indices.len() {
            return Err(Error::shape("cotangent", self.output_indices.len(), w.len()));
        }
        let mut values = Vec::with_capacity(self.values.len());
        self.forward_into(x, &mut values)?;
        let seeds: Vec<(u32, F)> = self
            .output_indices
            .iter()
            .copied()
            .zip(w.iter().copied())
            .collect();
        let adjoints = self.reverse_from(&values, &seeds);
        let outputs = self
            .output_indices
            .iter()
            .map(|&i| values[i as usize])
            .collect();
        Ok((outputs, adjoints[..self.num_inputs as usize].to_vec()))
    }
}
