//! Monte Carlo simulator.
//!
//! Draws N independent parameter samples from the scenario's declared
//! distributions, evaluates the physics + calibration pipeline for each,
//! and aggregates the surviving outcomes into a probability distribution.
//!
//! Reproducibility: the RNG stream is derived from the run seed and the
//! scenario id, with one substream per sample index, so the same seed
//! replays the same distribution bit-for-bit, in parallel or not.
//! Aggregation uses fixed-tree reductions and order statistics, which are
//! commutative over the sample set — correctness never depends on the
//! worker pool's scheduling.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use verglas_foundation::{stats, RngStream, ScenarioId};

use crate::calibration::{CalibratedOutcome, CalibrationState};
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::physics;
use crate::scenario::Scenario;

/// Cooperative cancellation handle for a simulation run.
///
/// Cancellation is observed between sample chunks; individual evaluations
/// are cheap and short, so sample-boundary granularity is sufficient.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. The run stops at the next sample boundary.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Derived statistics over one run's calibrated outcomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionSummary {
    /// Mean combined safety factor.
    pub mean_sf: f64,
    pub std_sf: f64,
    pub min_sf: f64,
    pub max_sf: f64,
    /// 5th / 95th percentile order statistics of the safety factor.
    pub p5_sf: f64,
    pub p95_sf: f64,
    /// Empirical fraction of samples with safety factor below the failure
    /// threshold.
    pub failure_probability: f64,
    /// 95th-percentile order statistic of the risk metric
    /// `fail_sf − SF`; a positive value means the conservative 5% tail
    /// crosses the configured failure threshold.
    pub ucl95_risk: f64,
    /// Samples that evaluated successfully and entered the statistics.
    pub effective_samples: usize,
}

/// The set of calibrated outcomes from one simulation run, plus derived
/// statistics. Created once per run, immutable afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeDistribution {
    pub scenario: ScenarioId,
    /// Seed recorded as run provenance; replaying with it reproduces this
    /// distribution exactly.
    pub seed: u64,
    pub requested: usize,
    /// Samples discarded after failing physics validation.
    pub discarded: usize,
    pub outcomes: Vec<CalibratedOutcome>,
    pub summary: DistributionSummary,
}

/// Run a Monte Carlo simulation for a validated scenario.
///
/// Per-sample validation failures are discarded and counted, not fatal;
/// the run fails with [`Error::InsufficientSamples`] only when fewer than
/// the configured minimum fraction survive.
#[instrument(skip_all, fields(scenario = %scenario.id, requested = sample_count, seed))]
pub fn run(
    scenario: &Scenario,
    sample_count: usize,
    seed: u64,
    state: &CalibrationState,
    config: &EngineConfig,
    cancel: Option<&CancelToken>,
) -> Result<OutcomeDistribution> {
    let stream = RngStream::derive(seed, &format!("scenario.{}", scenario.id));
    let chunk_size = config.monte_carlo.chunk_size;

    let mut outcomes: Vec<CalibratedOutcome> = Vec::with_capacity(sample_count);
    let mut discarded = 0usize;
    let mut completed = 0usize;

    for chunk_start in (0..sample_count).step_by(chunk_size) {
        if cancel.is_some_and(CancelToken::is_cancelled) {
            debug!(completed, "run cancelled at sample boundary");
            return Err(Error::Cancelled {
                scenario: scenario.id.clone(),
                completed,
            });
        }

        let chunk_end = (chunk_start + chunk_size).min(sample_count);
        let results: Vec<Result<CalibratedOutcome>> = (chunk_start..chunk_end)
            .into_par_iter()
            .map(|index| {
                let sample = scenario.draw_sample(index as u64, &stream);
                physics::evaluate(scenario, &sample)
                    .map(|outcome| state.correct(&outcome, scenario.scenario_type))
            })
            .collect();

        for result in results {
            completed += 1;
            match result {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) => {
                    discarded += 1;
                    debug!(%err, "sample discarded");
                }
            }
        }
    }

    let effective = outcomes.len();
    let minimum = ((config.monte_carlo.min_sample_fraction * sample_count as f64).ceil() as usize)
        .max(1);
    if effective < minimum {
        warn!(effective, requested = sample_count, minimum, "insufficient valid samples");
        return Err(Error::InsufficientSamples {
            scenario: scenario.id.clone(),
            requested: sample_count,
            effective,
            minimum,
        });
    }

    let summary = summarize(&outcomes, config);
    debug!(
        effective,
        discarded,
        mean_sf = summary.mean_sf,
        pf = summary.failure_probability,
        "run aggregated"
    );

    Ok(OutcomeDistribution {
        scenario: scenario.id.clone(),
        seed,
        requested: sample_count,
        discarded,
        outcomes,
        summary,
    })
}

/// Aggregate calibrated outcomes into summary statistics.
///
/// Uses order-independent reductions and empirical order statistics — the
/// outcome distribution is not assumed symmetric, so no normal
/// approximation is used for the confidence limit.
pub fn summarize(outcomes: &[CalibratedOutcome], config: &EngineConfig) -> DistributionSummary {
    let sfs: Vec<f64> = outcomes.iter().map(|o| o.outcome.safety_factor).collect();
    // Risk is the shortfall against the same failure threshold Pf counts
    // against, so the two metrics agree on what "failure" means.
    let risks: Vec<f64> = sfs.iter().map(|sf| config.judgment.fail_sf - sf).collect();

    DistributionSummary {
        mean_sf: stats::mean(&sfs),
        std_sf: stats::std_dev(&sfs),
        min_sf: stats::min(&sfs),
        max_sf: stats::max(&sfs),
        p5_sf: stats::percentile(&sfs, 5.0),
        p95_sf: stats::percentile(&sfs, 95.0),
        failure_probability: stats::fraction_below(&sfs, config.judgment.fail_sf),
        ucl95_risk: stats::percentile(&risks, 95.0),
        effective_samples: outcomes.len(),
    }
}
