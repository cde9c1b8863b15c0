use std::fmt;

use crate::compare::AgreementReport;
use crate::config::HarnessConfig;
use crate::timing::{LatencyReport, OrderingLatency};

/// Everything a harness run produced.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunReport {
    pub config: HarnessConfig,
    pub agreements: Vec<AgreementReport>,
    pub latency: LatencyReport,
}

impl RunReport {
    /// Worst relative gradient deviation over all draws and orderings.
    pub fn max_rel_deviation(&self) -> f64 {
        self.agreements
            .iter()
            .map(AgreementReport::max_rel)
            .fold(0.0, f64::max)
    }
}

impl fmt::Display for OrderingLatency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<14} mean {:>12?}  min {:>12?}  max {:>12?}  warm-up {:>12?}  cache {}h/{}m/{}c",
            self.ordering.to_string(),
            self.mean,
            self.min,
            self.max,
            self.warmup,
            self.cache.hits,
            self.cache.misses,
            self.cache.compilations,
        )
    }
}

impl fmt::Display for LatencyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "latency ({} parameters):", self.param_len)?;
        for l in &self.orderings {
            writeln!(f, "  {l}")?;
        }
        Ok(())
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "trisolve harness: n = {}, {} draws of {} parameters, seed {}",
            self.config.problem_size, self.config.draws, self.config.param_len, self.config.seed
        )?;
        writeln!(
            f,
            "gradients agree: max relative deviation {:.3e} (tolerance {:.1e})",
            self.max_rel_deviation(),
            self.config.tolerance
        )?;
        write!(f, "{}", self.latency)
    }
}
