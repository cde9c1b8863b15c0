//! Gradient agreement across orderings.

use log::debug;
use trisolve::{JitCache, ScalarFn};

use crate::ordering::GradientOrdering;
use crate::HarnessError;

/// Largest deviation of one ordering from the reference ordering.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Deviation {
    pub ordering: GradientOrdering,
    pub reference: GradientOrdering,
    pub max_abs: f64,
    pub max_rel: f64,
}

/// Outcome of a successful agreement check.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AgreementReport {
    pub params: Vec<f64>,
    /// Gradient from the reference ordering.
    pub gradient: Vec<f64>,
    pub deviations: Vec<Deviation>,
}

impl AgreementReport {
    /// Worst relative deviation over all orderings.
    pub fn max_rel(&self) -> f64 {
        self.deviations
            .iter()
            .map(|d| d.max_rel)
            .fold(0.0, f64::max)
    }
}

/// Relative deviation with magnitudes below one treated as one.
fn relative(expected: f64, actual: f64) -> f64 {
    (expected - actual).abs() / expected.abs().max(actual.abs()).max(1.0)
}

/// Compute the gradient of `objective` at `params` in every ordering and
/// check that each agrees with [`GradientOrdering::Grad`] within `tolerance`.
///
/// Uses a private cache so that the check never observes programs compiled
/// elsewhere.
pub fn compare_gradients<G: ScalarFn<f64> + Clone>(
    objective: &G,
    params: &[f64],
    tolerance: f64,
) -> Result<AgreementReport, HarnessError> {
    let cache = JitCache::new();
    let reference = GradientOrdering::Grad;
    let expected = reference.prepare(objective, &cache).gradient(params)?;

    let mut deviations = Vec::new();
    for ordering in GradientOrdering::ALL {
        if ordering == reference {
            continue;
        }
        let actual = ordering.prepare(objective, &cache).gradient(params)?;
        if actual.len() != expected.len() {
            return Err(trisolve::Error::ShapeMismatch {
                name: "gradient",
                expected: expected.len().to_string(),
                actual: actual.len(),
            }
            .into());
        }

        let mut dev = Deviation {
            ordering,
            reference,
            max_abs: 0.0,
            max_rel: 0.0,
        };
        for (index, (&e, &a)) in expected.iter().zip(&actual).enumerate() {
            let rel = relative(e, a);
            // NaN deviations must fail too.
            if !(rel <= tolerance) {
                return Err(HarnessError::Disagreement {
                    ordering,
                    index,
                    expected: e,
                    actual: a,
                });
            }
            dev.max_abs = dev.max_abs.max((e - a).abs());
            dev.max_rel = dev.max_rel.max(rel);
        }
        debug!(
            "{ordering} vs {reference}: max abs {:.3e}, max rel {:.3e}",
            dev.max_abs, dev.max_rel
        );
        deviations.push(dev);
    }

    Ok(AgreementReport {
        params: params.to_vec(),
        gradient: expected,
        deviations,
    })
}
