//! Engine façade.
//!
//! Binds the components into the two caller-facing contracts
//! (`simulate`, `ingest_observation`) plus read-only calibration
//! introspection. Transport is a collaborator concern; this is the
//! in-process binding.
//!
//! Concurrency model: simulation runs are read-only with respect to shared
//! state — each takes an `Arc` snapshot of the calibration state for its
//! key and works from that. The drift path (`ingest_observation`) is the
//! single writer; it serializes per-engine behind one mutex and commits
//! new calibration states through the store's atomic swap, so in-flight
//! runs never observe a partial update.

use std::sync::Mutex;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::calibration::CalibrationState;
use crate::config::EngineConfig;
use crate::drift::{DriftMonitor, DriftState, MatchedPair, TickOutcome};
use crate::error::Result;
use crate::judgment::{self, JudgmentResult};
use crate::montecarlo::{self, CancelToken, OutcomeDistribution};
use crate::observation::SensorObservation;
use crate::scenario::{CalibrationKey, Scenario};
use crate::store::CalibrationStore;

/// Result of one `simulate` call: the outcome distribution and the
/// judgment derived from it.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub distribution: OutcomeDistribution,
    pub judgment: JudgmentResult,
}

/// Reference predictions for matching observations to model output.
///
/// Each run records its mean ideal and calibrated observable metric; the
/// drift monitor pairs subsequent observations of that metric against
/// them.
#[derive(Debug, Clone, Copy, Default)]
struct ReferencePrediction {
    ideal: f64,
    calibrated: f64,
}

/// Per-key drift-tracking state. Lives behind the engine's monitor mutex.
struct KeyRuntime {
    monitor: DriftMonitor,
    reference: Option<ReferencePrediction>,
}

/// The reality-calibrated decision engine.
pub struct Engine {
    config: EngineConfig,
    store: CalibrationStore,
    keys: Mutex<IndexMap<CalibrationKey, KeyRuntime>>,
}

impl Engine {
    /// Build an engine, failing fast on invalid configuration.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            store: CalibrationStore::new(),
            keys: Mutex::new(IndexMap::new()),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Access to the calibration store, for persistence collaborators.
    pub fn store(&self) -> &CalibrationStore {
        &self.store
    }

    /// Run one simulation and judge its outcome distribution.
    pub fn simulate(
        &self,
        scenario: &Scenario,
        sample_count: usize,
        seed: u64,
    ) -> Result<SimulationReport> {
        self.simulate_cancellable(scenario, sample_count, seed, None)
    }

    /// [`Engine::simulate`] with a cooperative cancellation token.
    #[instrument(skip_all, fields(scenario = %scenario.id, samples = sample_count, seed))]
    pub fn simulate_cancellable(
        &self,
        scenario: &Scenario,
        sample_count: usize,
        seed: u64,
        cancel: Option<&CancelToken>,
    ) -> Result<SimulationReport> {
        scenario.validate()?;

        let key = scenario.calibration_key();
        let state = self.store.snapshot(&key);

        let distribution =
            montecarlo::run(scenario, sample_count, seed, &state, &self.config, cancel)?;
        let judgment = judgment::judge(&distribution.summary, &self.config.judgment);

        self.record_reference(key, scenario, &distribution);

        info!(
            verdict = ?judgment.verdict,
            rule = judgment.rule,
            mean_sf = distribution.summary.mean_sf,
            pf = distribution.summary.failure_probability,
            "simulation judged"
        );

        Ok(SimulationReport { distribution, judgment })
    }

    /// Feed one sensor observation to the drift monitor.
    ///
    /// Fire-and-forget from the caller's perspective: a malformed
    /// observation is rejected with a validation error; an accepted one
    /// may tick the key's drift monitor and, if drift has sustained,
    /// trigger a recalibration that commits atomically. Recalibration
    /// failures are logged and retried, never surfaced here.
    pub fn ingest_observation(&self, observation: SensorObservation) -> Result<()> {
        observation.validate()?;
        let key = observation.key;

        let mut keys = self.keys.lock().unwrap_or_else(|e| e.into_inner());
        let runtime = keys.entry(key).or_insert_with(|| KeyRuntime {
            monitor: DriftMonitor::new(key, self.config.drift.clone()),
            reference: None,
        });

        let Some(reference) = runtime.reference else {
            // No run has produced a prediction for this key yet, so there
            // is nothing to compare against.
            warn!(key = %key, sensor = %observation.sensor, "observation ignored: no reference prediction");
            return Ok(());
        };

        let pair = MatchedPair {
            ideal: reference.ideal,
            calibrated: reference.calibrated,
            observed: observation.value,
            timestamp_s: observation.timestamp_s,
        };

        if runtime.monitor.tick(pair) == TickOutcome::TriggerRecalibration {
            self.recalibrate(runtime, key, observation.timestamp_s);
        }
        Ok(())
    }

    /// Read-only introspection of a key's calibration state.
    pub fn calibration_state(&self, key: &CalibrationKey) -> std::sync::Arc<CalibrationState> {
        self.store.snapshot(key)
    }

    /// Current drift monitor state for a key, for reporting collaborators.
    pub fn drift_state(&self, key: &CalibrationKey) -> Option<DriftState> {
        let keys = self.keys.lock().unwrap_or_else(|e| e.into_inner());
        keys.get(key).map(|r| r.monitor.state())
    }

    fn recalibrate(&self, runtime: &mut KeyRuntime, key: CalibrationKey, now_s: f64) {
        let prior = self.store.snapshot(&key);
        let pairs = runtime.monitor.fit_pairs();
        let drift_estimate = runtime.monitor.rolling_error();

        match CalibrationState::fit(&prior, key, &pairs, drift_estimate, &self.config.calibration)
        {
            Ok(next) => {
                // Update the calibrated reference against the new state
                // before committing, so subsequent pairs are matched
                // against what runs will now predict.
                if let Some(reference) = runtime.reference.as_mut() {
                    reference.calibrated = next.correct_metric(reference.ideal);
                }
                self.store.commit(key, next);
                runtime.monitor.complete(true, now_s);
            }
            Err(err) => {
                warn!(key = %key, %err, "recalibration failed");
                runtime.monitor.complete(false, now_s);
            }
        }
    }

    fn record_reference(
        &self,
        key: CalibrationKey,
        scenario: &Scenario,
        distribution: &OutcomeDistribution,
    ) {
        let ideal_values: Vec<f64> = distribution
            .outcomes
            .iter()
            .map(|o| o.ideal_metric)
            .collect();
        let calibrated_values: Vec<f64> = distribution
            .outcomes
            .iter()
            .map(|o| o.outcome.observable_metric(scenario.scenario_type))
            .collect();

        let reference = ReferencePrediction {
            ideal: verglas_foundation::stats::mean(&ideal_values),
            calibrated: verglas_foundation::stats::mean(&calibrated_values),
        };

        let mut keys = self.keys.lock().unwrap_or_else(|e| e.into_inner());
        let runtime = keys.entry(key).or_insert_with(|| KeyRuntime {
            monitor: DriftMonitor::new(key, self.config.drift.clone()),
            reference: None,
        });
        runtime.reference = Some(reference);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::error::Error;
    use crate::observation::ObservedMetric;
    use crate::scenario::tests::test_scenario;

    #[test]
    fn invalid_config_is_fatal_at_construction() {
        let mut config = EngineConfig::default();
        config.drift.threshold = -1.0;
        assert!(matches!(Engine::new(config), Err(Error::Configuration(_))));
    }

    #[test]
    fn simulate_validates_the_scenario_first() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let mut scenario = test_scenario();
        scenario.devices.clear();
        let err = engine.simulate(&scenario, 50, 1).unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn observation_without_reference_is_accepted_but_ignored() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let obs = SensorObservation {
            sensor: "cov-01".into(),
            scenario: "ramp-7".into(),
            key: test_scenario().calibration_key(),
            metric: ObservedMetric::CoverageRatio,
            value: 0.8,
            timestamp_s: 10.0,
        };
        assert!(engine.ingest_observation(obs).is_ok());
        assert_eq!(
            engine.drift_state(&test_scenario().calibration_key()),
            Some(DriftState::Stable)
        );
    }

    #[test]
    fn malformed_observation_is_rejected() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let obs = SensorObservation {
            sensor: "cov-01".into(),
            scenario: "ramp-7".into(),
            key: test_scenario().calibration_key(),
            metric: ObservedMetric::CoverageRatio,
            value: 2.0,
            timestamp_s: 10.0,
        };
        assert!(engine.ingest_observation(obs).is_err());
    }
}
