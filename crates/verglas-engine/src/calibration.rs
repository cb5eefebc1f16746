//! Calibration model.
//!
//! The ideal physics model is corrected by a learned residual term
//! `corrected = ideal * (1 + gain) + bias`. The correction is deliberately
//! small and hard-bounded so the physics term stays dominant: with sparse
//! or noisy sensor data the corrected output degrades toward the ideal
//! prediction instead of diverging.
//!
//! Fitting minimizes a loss that combines a sensor-fit term with a
//! physics-consistency (ridge) term weighted by the configured λ:
//!
//! ```text
//! L(g, b) = Σ (pred_i·(1+g) + b − obs_i)² + λ·n·(g² + b²)
//! ```
//!
//! The minimum has a closed form (2×2 normal equations), so a fit is
//! deterministic given the same input batch — recalibrations are
//! reproducible for audit.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::CalibrationConfig;
use crate::error::{Error, Result};
use crate::physics::constants::{MIN_BRINE_COVERAGE, REFERENCE_THERMAL_MARGIN_C, SPRAY_SF_WEIGHT, THERMAL_SF_WEIGHT};
use crate::physics::PhysicalOutcome;
use crate::scenario::{CalibrationKey, ScenarioType};

/// One (ideal prediction, sensor observation) pair used for fitting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitPair {
    /// The ideal (uncorrected) model prediction of the observable metric.
    pub predicted: f64,
    /// The sensor-observed value of the same metric.
    pub observed: f64,
    /// Observation timestamp, seconds.
    pub timestamp_s: f64,
}

/// Fitted residual-correction parameters plus audit metadata.
///
/// This is the only mutable long-lived entity in the engine; one state
/// exists per [`CalibrationKey`] and all mutation happens through the drift
/// monitor committing a whole new state atomically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationState {
    /// Multiplicative correction term, bounded by config.
    pub gain: f64,
    /// Additive correction term (in the observable metric's units),
    /// bounded by config.
    pub bias: f64,
    /// Observation timestamp of the most recent fit, seconds. Zero for the
    /// neutral state.
    pub fitted_at_s: f64,
    /// Matched pairs used by the most recent fit.
    pub observation_count: usize,
    /// Rolling relative error at the time the fit was triggered.
    pub drift_estimate: f64,
    /// Monotonically increasing commit counter; readers use it to tell
    /// states apart.
    pub version: u64,
}

impl CalibrationState {
    /// The identity correction: pass physics through untouched.
    pub fn neutral() -> Self {
        Self {
            gain: 0.0,
            bias: 0.0,
            fitted_at_s: 0.0,
            observation_count: 0,
            drift_estimate: 0.0,
            version: 0,
        }
    }

    /// Apply the correction to one observable metric value.
    pub fn correct_metric(&self, predicted: f64) -> f64 {
        predicted * (1.0 + self.gain) + self.bias
    }

    /// Apply the residual correction to a physical outcome.
    ///
    /// The correction targets the observable metric for the scenario type
    /// (coverage ratio for salt-spray, surface temperature for thermal);
    /// the safety factors are recomputed from the corrected metric so the
    /// outcome stays internally consistent.
    pub fn correct(
        &self,
        outcome: &PhysicalOutcome,
        scenario_type: ScenarioType,
    ) -> CalibratedOutcome {
        let ideal_metric = outcome.observable_metric(scenario_type);
        let mut corrected = outcome.clone();
        match scenario_type {
            ScenarioType::SaltSpray => {
                // Coverage is a physical fraction; clamp after correction.
                corrected.coverage_ratio = self.correct_metric(outcome.coverage_ratio).clamp(0.0, 1.0);
                corrected.spray_sf = corrected.coverage_ratio / MIN_BRINE_COVERAGE;
                corrected.safety_factor =
                    SPRAY_SF_WEIGHT * corrected.spray_sf + THERMAL_SF_WEIGHT * corrected.thermal_sf;
            }
            ScenarioType::Thermal => {
                corrected.surface_temp_c = self.correct_metric(outcome.surface_temp_c);
                corrected.temperature_margin_c = corrected.surface_temp_c - corrected.freezing_point_c;
                corrected.thermal_sf =
                    (corrected.temperature_margin_c / REFERENCE_THERMAL_MARGIN_C).max(0.0);
                corrected.safety_factor = corrected.thermal_sf;
            }
        }
        CalibratedOutcome {
            outcome: corrected,
            ideal_metric,
            gain: self.gain,
            bias: self.bias,
            calibration_version: self.version,
        }
    }

    /// Fit a new state from a batch of matched pairs.
    ///
    /// Deterministic for a given batch; fails with
    /// [`Error::Recalibration`] when the batch is too small or degenerate.
    /// The returned state carries `version = prior.version + 1`.
    pub fn fit(
        prior: &CalibrationState,
        key: CalibrationKey,
        pairs: &[FitPair],
        drift_estimate: f64,
        config: &CalibrationConfig,
    ) -> Result<CalibrationState> {
        if pairs.len() < config.min_observations {
            return Err(Error::Recalibration {
                key,
                detail: format!(
                    "{} matched pairs, need at least {}",
                    pairs.len(),
                    config.min_observations
                ),
            });
        }

        let n = pairs.len() as f64;
        let lambda_n = config.physics_weight * n;

        // Normal equations for L(g, b) over residuals r_i = obs_i - pred_i:
        //   [Σp² + λn   Σp    ] [g]   [Σ p·r]
        //   [Σp         n + λn] [b] = [Σ r  ]
        let mut sum_p = 0.0;
        let mut sum_pp = 0.0;
        let mut sum_r = 0.0;
        let mut sum_pr = 0.0;
        for pair in pairs {
            if !(pair.predicted.is_finite() && pair.observed.is_finite()) {
                return Err(Error::Recalibration {
                    key,
                    detail: "non-finite value in fit batch".into(),
                });
            }
            let r = pair.observed - pair.predicted;
            sum_p += pair.predicted;
            sum_pp += pair.predicted * pair.predicted;
            sum_r += r;
            sum_pr += pair.predicted * r;
        }

        let a11 = sum_pp + lambda_n;
        let a12 = sum_p;
        let a22 = n + lambda_n;
        let det = a11 * a22 - a12 * a12;
        if det.abs() < 1e-12 {
            return Err(Error::Recalibration {
                key,
                detail: "degenerate fit batch (singular normal equations)".into(),
            });
        }

        let gain = ((sum_pr * a22 - sum_r * a12) / det).clamp(-config.max_gain, config.max_gain);
        let bias = ((sum_r * a11 - sum_pr * a12) / det).clamp(-config.max_bias, config.max_bias);

        let fitted_at_s = pairs
            .iter()
            .map(|p| p.timestamp_s)
            .fold(f64::NEG_INFINITY, f64::max);

        debug!(
            key = %key,
            gain,
            bias,
            observations = pairs.len(),
            "calibration fit complete"
        );

        Ok(CalibrationState {
            gain,
            bias,
            fitted_at_s,
            observation_count: pairs.len(),
            drift_estimate,
            version: prior.version + 1,
        })
    }
}

/// A [`PhysicalOutcome`] after residual correction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibratedOutcome {
    /// The corrected outcome; same shape as the ideal prediction.
    pub outcome: PhysicalOutcome,
    /// Ideal (uncorrected) value of the observable metric. Kept alongside
    /// the corrected outcome because the correction may saturate (coverage
    /// clamps to [0, 1]) and would then not be invertible.
    pub ideal_metric: f64,
    /// Correction terms that were applied, for audit.
    pub gain: f64,
    pub bias: f64,
    /// Version of the calibration state that produced this outcome.
    pub calibration_version: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::DeviceClass;

    fn key() -> CalibrationKey {
        CalibrationKey {
            device_class: DeviceClass::SpraySystem,
            scenario_type: ScenarioType::SaltSpray,
        }
    }

    fn pairs_with_offset(offset: f64, n: usize) -> Vec<FitPair> {
        (0..n)
            .map(|i| {
                let predicted = 0.6 + 0.01 * i as f64;
                FitPair {
                    predicted,
                    observed: predicted + offset,
                    timestamp_s: 60.0 * i as f64,
                }
            })
            .collect()
    }

    #[test]
    fn neutral_state_is_identity() {
        let state = CalibrationState::neutral();
        assert_eq!(state.correct_metric(0.75), 0.75);
        assert_eq!(state.version, 0);
    }

    #[test]
    fn fit_learns_a_constant_offset() {
        let cfg = CalibrationConfig::default();
        let pairs = pairs_with_offset(0.05, 16);
        let state =
            CalibrationState::fit(&CalibrationState::neutral(), key(), &pairs, 0.07, &cfg).unwrap();

        // With ridge damping the correction undershoots slightly, but must
        // move predictions toward observations.
        let corrected = state.correct_metric(0.65);
        assert!(
            (corrected - 0.70).abs() < (0.65_f64 - 0.70).abs(),
            "correction should reduce the residual, got {corrected}"
        );
        assert_eq!(state.version, 1);
        assert_eq!(state.observation_count, 16);
        assert!((state.fitted_at_s - 900.0).abs() < 1e-9);
    }

    #[test]
    fn fit_is_deterministic() {
        let cfg = CalibrationConfig::default();
        let pairs = pairs_with_offset(-0.03, 12);
        let a = CalibrationState::fit(&CalibrationState::neutral(), key(), &pairs, 0.06, &cfg)
            .unwrap();
        let b = CalibrationState::fit(&CalibrationState::neutral(), key(), &pairs, 0.06, &cfg)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn correction_is_bounded() {
        let cfg = CalibrationConfig::default();
        // Observations wildly off: the learned terms must still respect
        // the configured bounds.
        let pairs: Vec<FitPair> = (0..16)
            .map(|i| FitPair {
                predicted: 0.5,
                observed: 50.0,
                timestamp_s: i as f64,
            })
            .collect();
        let state =
            CalibrationState::fit(&CalibrationState::neutral(), key(), &pairs, 0.9, &cfg).unwrap();
        assert!(state.gain.abs() <= cfg.max_gain);
        assert!(state.bias.abs() <= cfg.max_bias);
    }

    #[test]
    fn too_few_observations_fail() {
        let cfg = CalibrationConfig::default();
        let pairs = pairs_with_offset(0.05, cfg.min_observations - 1);
        let err = CalibrationState::fit(&CalibrationState::neutral(), key(), &pairs, 0.0, &cfg)
            .unwrap_err();
        assert!(matches!(err, Error::Recalibration { .. }));
    }

    #[test]
    fn corrected_coverage_stays_physical() {
        let state = CalibrationState {
            gain: 0.5,
            bias: 0.25,
            ..CalibrationState::neutral()
        };
        let outcome = PhysicalOutcome {
            sample_index: 0,
            coverage_ratio: 0.9,
            surface_temp_c: -2.0,
            freezing_point_c: -13.8,
            temperature_margin_c: 11.8,
            spray_sf: 0.9 / MIN_BRINE_COVERAGE,
            thermal_sf: 1.0,
            safety_factor: 1.0,
        };
        let corrected = state.correct(&outcome, ScenarioType::SaltSpray);
        assert!(corrected.outcome.coverage_ratio <= 1.0);
        // 0.9 * 1.5 + 0.25 saturates the clamp; the ideal metric must
        // still be recoverable without inverting the correction.
        assert_eq!(corrected.outcome.coverage_ratio, 1.0);
        assert_eq!(corrected.ideal_metric, 0.9);
    }
}
