//! Tridiagonal solves as differentiable, compilable scans.
//!
//! The Thomas algorithm is written as a forward elimination scan and a
//! backward substitution scan over any [`Scalar`]. The same code therefore
//! runs on plain floats, under reverse-mode AD ([`grad`], [`value_and_grad`])
//! and traced into a replayable [`BytecodeTape`] ([`jit`], [`jit_grad`]).

pub mod api;
pub mod batch;
pub mod breverse;
pub mod bytecode_tape;
pub mod error;
pub mod float;
pub mod jit;
#[cfg(feature = "ndarray")]
pub mod ndarray_support;
pub mod opcode;
pub mod problem;
pub mod reverse;
pub mod scalar;
pub mod scan;
pub mod tape;
pub mod thomas;
mod traits;

pub use api::{grad, grad_fn, record, record_multi, try_grad, value_and_grad, vjp, ScalarFn};
pub use batch::{gradient_batch, solve_batch};
pub use breverse::BReverse;
pub use bytecode_tape::BytecodeTape;
pub use error::{Error, Result};
pub use float::Float;
pub use jit::{jit, jit_grad, CacheStats, JitCache};
pub use problem::{assemble, assemble_and_reduce, l2_norm, NormObjective, ProblemConfig};
pub use reverse::Reverse;
pub use scalar::Scalar;
pub use thomas::{solve, solve_system, solve_with, SolverConfig, TridiagonalSystem};

/// Type alias for reverse-mode variables over `f64`.
pub type Reverse64 = Reverse<f64>;
/// Type alias for reverse-mode variables over `f32`.
pub type Reverse32 = Reverse<f32>;
/// Type alias for bytecode-tape variables over `f64`.
pub type BReverse64 = BReverse<f64>;
/// Type alias for bytecode-tape variables over `f32`.
pub type BReverse32 = BReverse<f32>;
