//! Independent problems along a single batch axis.
//!
//! The batch axis is embarrassingly parallel; with the `parallel` feature it
//! is spread over rayon's pool. Each system is still solved sequentially
//! along its index axis.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::bytecode_tape::BytecodeTape;
use crate::error::Result;
use crate::float::Float;
use crate::scalar::Scalar;
use crate::thomas::{solve_system, SolverConfig, TridiagonalSystem};

/// Solve every system in `systems`.
///
/// Returns one solution per system, in order, or an error if any system
/// fails. With `parallel` enabled the reported error is one of the failures,
/// not necessarily the one with the lowest batch index.
pub fn solve_batch<F: Float + Scalar<Float = F>>(
    systems: &[TridiagonalSystem<F>],
    config: &SolverConfig<F>,
) -> Result<Vec<Vec<F>>> {
    #[cfg(feature = "parallel")]
    {
        systems
            .par_iter()
            .map(|sys| solve_system(sys, config))
            .collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        systems.iter().map(|sys| solve_system(sys, config)).collect()
    }
}

/// Replay one compiled scalar program at many inputs and return each
/// gradient.
///
/// The tape is only read, so a program shared out of a
/// [`JitCache`](crate::JitCache) can be used directly.
pub fn gradient_batch<F: Float>(
    tape: &BytecodeTape<F>,
    inputs: &[Vec<F>],
) -> Result<Vec<Vec<F>>> {
    #[cfg(feature = "parallel")]
    {
        inputs.par_iter().map(|x| tape.gradient(x)).collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        inputs.iter().map(|x| tape.gradient(x)).collect()
    }
}
