//! Reproducible parameter draws.
//!
//! Each draw is keyed by `(seed, counter)`: the same pair always yields the
//! same vector, and draws with different counters are independent of the
//! order they are requested in.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::HarnessError;

/// Odd 64-bit constant used to spread the counter across the seed space.
const COUNTER_MIX: u64 = 0x9E37_79B9_7F4A_7C15;

fn rng_for(seed: u64, counter: u64) -> StdRng {
    StdRng::seed_from_u64(seed ^ counter.wrapping_add(1).wrapping_mul(COUNTER_MIX))
}

/// Fail unless `range` is a finite, non-empty half-open interval.
pub(crate) fn check_range(range: (f64, f64)) -> Result<(), HarnessError> {
    let (lo, hi) = range;
    if lo < hi && lo.is_finite() && hi.is_finite() {
        Ok(())
    } else {
        Err(HarnessError::InvalidConfig(format!(
            "param_range must be a finite, non-empty interval, got [{lo}, {hi})"
        )))
    }
}

/// Draw `len` values uniformly from `[range.0, range.1)`.
pub fn sample_params(
    seed: u64,
    counter: u64,
    len: usize,
    range: (f64, f64),
) -> Result<Vec<f64>, HarnessError> {
    check_range(range)?;
    let (lo, hi) = range;
    let mut rng = rng_for(seed, counter);
    Ok((0..len).map(|_| rng.gen_range(lo..hi)).collect())
}
