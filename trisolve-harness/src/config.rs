use crate::inputs::check_range;
use crate::HarnessError;

/// Harness configuration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HarnessConfig {
    /// Timed calls per ordering.
    pub iterations: usize,
    /// Untimed calls per ordering before timing starts. Includes compilation.
    pub warmup: usize,
    /// Maximum relative deviation tolerated between orderings.
    pub tolerance: f64,
    /// Base seed for parameter draws.
    pub seed: u64,
    /// Length of each parameter vector.
    pub param_len: usize,
    /// Number of parameter vectors checked for agreement.
    pub draws: u64,
    /// Number of equations in the assembled system.
    pub problem_size: usize,
    /// Half-open interval parameters are drawn from.
    pub param_range: (f64, f64),
}

impl Default for HarnessConfig {
    fn default() -> Self {
        HarnessConfig {
            iterations: 200,
            warmup: 3,
            tolerance: 1e-10,
            seed: 0,
            param_len: 5,
            draws: 8,
            problem_size: 100,
            // Keeps the assembled system strictly diagonally dominant.
            param_range: (-0.25, 0.25),
        }
    }
}

impl HarnessConfig {
    /// Reject settings the harness cannot run with.
    pub fn validate(&self) -> Result<(), HarnessError> {
        if self.iterations == 0 {
            return Err(HarnessError::InvalidConfig(
                "iterations must be at least 1".into(),
            ));
        }
        if self.draws == 0 {
            return Err(HarnessError::InvalidConfig("draws must be at least 1".into()));
        }
        if !(self.tolerance >= 0.0) {
            return Err(HarnessError::InvalidConfig(format!(
                "tolerance must be non-negative, got {}",
                self.tolerance
            )));
        }
        check_range(self.param_range)
    }
}
