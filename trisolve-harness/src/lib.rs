//! Checks that the three placements of the gradient operator relative to the
//! compilation operator agree, and measures how fast each one is.

pub mod compare;
pub mod config;
pub mod inputs;
pub mod ordering;
pub mod report;
pub mod timing;

use log::info;
use trisolve::{NormObjective, ProblemConfig, SolverConfig};

pub use compare::{compare_gradients, AgreementReport, Deviation};
pub use config::HarnessConfig;
pub use inputs::sample_params;
pub use ordering::{GradientOrdering, Prepared};
pub use report::RunReport;
pub use timing::{measure_latency, LatencyReport, OrderingLatency};

/// Errors surfaced by the harness.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HarnessError {
    #[error(transparent)]
    Solver(#[from] trisolve::Error),

    #[error(
        "{ordering} disagrees at gradient index {index}: expected {expected:e}, got {actual:e}"
    )]
    Disagreement {
        ordering: GradientOrdering,
        index: usize,
        expected: f64,
        actual: f64,
    },

    #[error("invalid harness configuration: {0}")]
    InvalidConfig(String),
}

/// The objective the harness differentiates: `‖solve(assemble(params))‖₂`.
pub fn objective(config: &HarnessConfig) -> NormObjective<f64> {
    NormObjective::new(
        ProblemConfig::default().with_size(config.problem_size),
        SolverConfig::default(),
    )
}

/// Check agreement on `config.draws` parameter vectors, then time every
/// ordering on the first one.
pub fn run(config: &HarnessConfig) -> Result<RunReport, HarnessError> {
    config.validate()?;
    let objective = objective(config);

    let mut agreements = Vec::new();
    for draw in 0..config.draws {
        let params = sample_params(config.seed, draw, config.param_len, config.param_range)?;
        let report = compare_gradients(&objective, &params, config.tolerance)?;
        info!(
            "draw {draw}: orderings agree (max rel deviation {:.3e})",
            report.max_rel()
        );
        agreements.push(report);
    }

    let params = sample_params(config.seed, 0, config.param_len, config.param_range)?;
    let latency = measure_latency(&objective, &params, config)?;

    Ok(RunReport {
        config: config.clone(),
        agreements,
        latency,
    })
}
