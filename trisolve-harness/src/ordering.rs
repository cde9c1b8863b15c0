use std::fmt;

use trisolve::jit::{Jit, JitGrad};
use trisolve::{grad_fn, jit, jit_grad, JitCache, ScalarFn};

/// Where the gradient operator sits relative to the compilation operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GradientOrdering {
    /// Differentiate the compiled function: replay, then reverse sweep.
    GradOfJit,
    /// Compile the differentiated function: replay the adjoint program.
    JitOfGrad,
    /// Differentiate the uncompiled function, re-recording every call.
    Grad,
}

impl GradientOrdering {
    pub const ALL: [GradientOrdering; 3] = [
        GradientOrdering::GradOfJit,
        GradientOrdering::JitOfGrad,
        GradientOrdering::Grad,
    ];

    /// Bind this ordering to `objective`, compiling through `cache`.
    pub fn prepare<'c, G: ScalarFn<f64> + Clone>(
        self,
        objective: &G,
        cache: &'c JitCache<f64>,
    ) -> Prepared<'c, G> {
        match self {
            GradientOrdering::GradOfJit => Prepared::GradOfJit(jit(objective.clone(), cache)),
            GradientOrdering::JitOfGrad => Prepared::JitOfGrad(jit_grad(objective.clone(), cache)),
            GradientOrdering::Grad => Prepared::Grad(objective.clone()),
        }
    }
}

impl fmt::Display for GradientOrdering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GradientOrdering::GradOfJit => write!(f, "grad(jit(f))"),
            GradientOrdering::JitOfGrad => write!(f, "jit(grad(f))"),
            GradientOrdering::Grad => write!(f, "grad(f)"),
        }
    }
}

/// An ordering bound to an objective, ready to be called repeatedly.
///
/// Keeping the compiled wrappers alive across calls is what lets the cache
/// hit after the first call.
pub enum Prepared<'c, G> {
    GradOfJit(Jit<'c, f64, G>),
    JitOfGrad(JitGrad<'c, f64, G>),
    Grad(G),
}

impl<G: ScalarFn<f64>> Prepared<'_, G> {
    pub fn ordering(&self) -> GradientOrdering {
        match self {
            Prepared::GradOfJit(_) => GradientOrdering::GradOfJit,
            Prepared::JitOfGrad(_) => GradientOrdering::JitOfGrad,
            Prepared::Grad(_) => GradientOrdering::Grad,
        }
    }

    /// Gradient of the objective at `params`.
    pub fn gradient(&self, params: &[f64]) -> trisolve::Result<Vec<f64>> {
        match self {
            Prepared::GradOfJit(f) => f.grad(params),
            Prepared::JitOfGrad(g) => g.call(params),
            Prepared::Grad(f) => grad_fn(f, params).map(|(_, g)| g),
        }
    }
}
