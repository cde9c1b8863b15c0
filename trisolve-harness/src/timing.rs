//! Per-ordering latency measurement.

use std::hint::black_box;
use std::time::{Duration, Instant};

use log::{debug, info};
use trisolve::{CacheStats, JitCache, ScalarFn};

use crate::config::HarnessConfig;
use crate::ordering::GradientOrdering;
use crate::HarnessError;

/// Steady-state latency of one ordering.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OrderingLatency {
    pub ordering: GradientOrdering,
    pub iterations: usize,
    pub mean: Duration,
    pub min: Duration,
    pub max: Duration,
    /// Time spent in the warm-up calls, compilation included.
    pub warmup: Duration,
    /// Cache counters accumulated by this ordering alone.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub cache: CacheStats,
}

/// Latency of every ordering at one parameter vector.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LatencyReport {
    pub param_len: usize,
    pub orderings: Vec<OrderingLatency>,
}

impl LatencyReport {
    pub fn get(&self, ordering: GradientOrdering) -> Option<&OrderingLatency> {
        self.orderings.iter().find(|l| l.ordering == ordering)
    }
}

/// Time every ordering of `objective` at `params`.
///
/// For each ordering the shared cache is cleared and its counters reset,
/// `config.warmup` calls run untimed, and `config.iterations` calls are
/// timed one by one.
pub fn measure_latency<G: ScalarFn<f64> + Clone>(
    objective: &G,
    params: &[f64],
    config: &HarnessConfig,
) -> Result<LatencyReport, HarnessError> {
    config.validate()?;
    let cache = JitCache::new();
    let mut orderings = Vec::with_capacity(GradientOrdering::ALL.len());

    for ordering in GradientOrdering::ALL {
        cache.clear();
        cache.reset_stats();
        let prepared = ordering.prepare(objective, &cache);

        let warm_start = Instant::now();
        for _ in 0..config.warmup {
            black_box(prepared.gradient(black_box(params))?);
        }
        let warmup = warm_start.elapsed();
        debug!("{ordering}: {} warm-up calls in {warmup:?}", config.warmup);

        let mut total = Duration::ZERO;
        let mut min = Duration::MAX;
        let mut max = Duration::ZERO;
        for _ in 0..config.iterations {
            let start = Instant::now();
            black_box(prepared.gradient(black_box(params))?);
            let elapsed = start.elapsed();
            total += elapsed;
            min = min.min(elapsed);
            max = max.max(elapsed);
        }
        // validate() guarantees iterations >= 1.
        let mean = total / u32::try_from(config.iterations).unwrap_or(u32::MAX);

        let latency = OrderingLatency {
            ordering,
            iterations: config.iterations,
            mean,
            min,
            max,
            warmup,
            cache: cache.stats(),
        };
        info!(
            "{ordering}: mean {mean:?} (min {min:?}, max {max:?}) over {} calls",
            config.iterations
        );
        orderings.push(latency);
    }

    Ok(LatencyReport {
        param_len: params.len(),
        orderings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use trisolve::NormObjective;

    fn small_config() -> HarnessConfig {
        HarnessConfig {
            iterations: 5,
            warmup: 2,
            ..HarnessConfig::default()
        }
    }

    #[test]
    fn compiled_orderings_compile_once() {
        let objective = NormObjective::<f64>::default();
        let report = measure_latency(&objective, &[0.1, 0.2, -0.1], &small_config()).unwrap();
        assert_eq!(report.orderings.len(), 3);

        for ordering in [GradientOrdering::GradOfJit, GradientOrdering::JitOfGrad] {
            let l = report.get(ordering).unwrap();
            assert_eq!(l.cache.compilations, 1);
            assert_eq!(l.cache.misses, 1);
            assert_eq!(l.cache.hits, 6);
            assert!(l.min <= l.mean && l.mean <= l.max);
        }

        let taped = report.get(GradientOrdering::Grad).unwrap();
        assert_eq!(taped.cache.compilations, 0);
    }

    #[test]
    fn rejects_zero_iterations() {
        let config = HarnessConfig {
            iterations: 0,
            ..HarnessConfig::default()
        };
        let res = measure_latency(&NormObjective::<f64>::default(), &[0.1], &config);
        assert!(matches!(res, Err(HarnessError::InvalidConfig(_))));
    }
}
