use serde::{Deserialize, Deserializer};

use crate::float::Float;
use crate::opcode::OpCode;

use super::{BytecodeTape, PivotGuard};

/// Deserialized programs are validated before they are handed out, so a
/// malformed or hand-edited program fails to load instead of at replay.
impl<'de, F: Float + Deserialize<'de>> Deserialize<'de> for BytecodeTape<F> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct TapeData<F> {
            opcodes: Vec<OpCode>,
            arg_indices: Vec<[u32; 2]>,
            values: Vec<F>,
            num_inputs: u32,
            output_indices: Vec<u32>,
            #[serde(default)]
            guards: Vec<PivotGuard<F>>,
        }

        let data = TapeData::<F>::deserialize(deserializer)?;
        let tape = BytecodeTape {
            opcodes: data.opcodes,
            arg_indices: data.arg_indices,
            values: data.values,
            num_inputs: data.num_inputs,
            output_indices: data.output_indices,
            guards: data.guards,
            overflowed: false,
        };
        tape.validate().map_err(serde::de::Error::custom)?;
        Ok(tape)
    }
}
