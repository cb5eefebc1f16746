//! Engine configuration.
//!
//! Every threshold the decision rules and the drift monitor depend on is a
//! configuration value, not a literal buried in code, so device classes can
//! be tuned without code changes. Configuration is validated once at engine
//! construction; an invalid configuration is fatal before any run is
//! accepted.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Monte Carlo run parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonteCarloConfig {
    /// Sample count used when the caller does not specify one.
    pub default_samples: usize,
    /// Minimum fraction of requested samples that must evaluate
    /// successfully for run statistics to be trusted.
    pub min_sample_fraction: f64,
    /// Samples evaluated between cancellation checks.
    pub chunk_size: usize,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            default_samples: 1000,
            min_sample_fraction: 0.5,
            chunk_size: 64,
        }
    }
}

/// Residual-correction fit parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Physics-consistency weight λ in the fit loss
    /// `Σ(pred·(1+g)+b − obs)² + λ·n·(g² + b²)`.
    ///
    /// Larger values keep the learned correction closer to identity.
    pub physics_weight: f64,
    /// Magnitude bound on the multiplicative correction term.
    pub max_gain: f64,
    /// Magnitude bound on the additive correction term.
    pub max_bias: f64,
    /// Minimum matched pairs required for a fit to be attempted.
    pub min_observations: usize,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            physics_weight: 0.1,
            max_gain: 0.5,
            max_bias: 0.25,
            min_observations: 8,
        }
    }
}

/// Drift monitor thresholds.
///
/// Durations are in *observation time* (sensor timestamps), not wall-clock
/// ticks, so irregular sensor arrival rates cannot hide drift.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftConfig {
    /// Rolling relative error above which the model is considered drifting.
    pub threshold: f64,
    /// Seconds the error must remain above threshold continuously before
    /// recalibration is triggered.
    pub sustain_s: f64,
    /// Trailing window over which the rolling error is computed, seconds.
    pub window_s: f64,
    /// Seconds of observation time to wait before retrying a failed
    /// recalibration.
    pub retry_backoff_s: f64,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            threshold: 0.05,
            sustain_s: 600.0,
            window_s: 900.0,
            retry_backoff_s: 120.0,
        }
    }
}

/// Judgment rule thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JudgmentConfig {
    /// Probability of failure at or above which the verdict is FAIL.
    pub fail_pf: f64,
    /// Mean safety factor below which the verdict is FAIL. Also the
    /// per-sample failure threshold used to compute Pf.
    pub fail_sf: f64,
    /// Mean safety factor required for PASS.
    pub pass_sf: f64,
    /// Upper bound the UCL95 of the risk metric must stay within.
    pub risk_limit: f64,
}

impl Default for JudgmentConfig {
    fn default() -> Self {
        Self {
            fail_pf: 0.20,
            fail_sf: 1.0,
            pass_sf: 1.5,
            risk_limit: 0.0,
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub monte_carlo: MonteCarloConfig,
    pub calibration: CalibrationConfig,
    pub drift: DriftConfig,
    pub judgment: JudgmentConfig,
}

impl EngineConfig {
    /// Validate the configuration, failing fast on values that would make
    /// the decision rules or the drift monitor meaningless.
    pub fn validate(&self) -> Result<()> {
        let mc = &self.monte_carlo;
        if mc.default_samples == 0 {
            return Err(Error::Configuration("default_samples must be > 0".into()));
        }
        if !(mc.min_sample_fraction > 0.0 && mc.min_sample_fraction <= 1.0) {
            return Err(Error::Configuration(format!(
                "min_sample_fraction must be in (0, 1], got {}",
                mc.min_sample_fraction
            )));
        }
        if mc.chunk_size == 0 {
            return Err(Error::Configuration("chunk_size must be > 0".into()));
        }

        let cal = &self.calibration;
        if !(cal.physics_weight >= 0.0 && cal.physics_weight.is_finite()) {
            return Err(Error::Configuration(format!(
                "physics_weight must be finite and >= 0, got {}",
                cal.physics_weight
            )));
        }
        if cal.max_gain <= 0.0 || cal.max_bias <= 0.0 {
            return Err(Error::Configuration(
                "correction bounds max_gain/max_bias must be > 0".into(),
            ));
        }
        if cal.min_observations == 0 {
            return Err(Error::Configuration("min_observations must be > 0".into()));
        }

        let drift = &self.drift;
        if !(drift.threshold > 0.0 && drift.threshold.is_finite()) {
            return Err(Error::Configuration(format!(
                "drift threshold must be finite and > 0, got {}",
                drift.threshold
            )));
        }
        if drift.sustain_s <= 0.0 || drift.window_s <= 0.0 || drift.retry_backoff_s < 0.0 {
            return Err(Error::Configuration(
                "drift durations must be positive (retry_backoff_s may be 0)".into(),
            ));
        }
        if drift.window_s < drift.sustain_s {
            return Err(Error::Configuration(format!(
                "drift window_s ({}) must cover sustain_s ({})",
                drift.window_s, drift.sustain_s
            )));
        }

        let judg = &self.judgment;
        if !(judg.fail_pf > 0.0 && judg.fail_pf <= 1.0) {
            return Err(Error::Configuration(format!(
                "fail_pf must be in (0, 1], got {}",
                judg.fail_pf
            )));
        }
        if judg.fail_sf <= 0.0 || judg.pass_sf <= 0.0 {
            return Err(Error::Configuration(
                "safety factor thresholds must be > 0".into(),
            ));
        }
        if judg.fail_sf >= judg.pass_sf {
            return Err(Error::Configuration(format!(
                "fail_sf ({}) must be below pass_sf ({})",
                judg.fail_sf, judg.pass_sf
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_inverted_safety_bands() {
        let mut cfg = EngineConfig::default();
        cfg.judgment.fail_sf = 2.0;
        assert!(matches!(cfg.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn rejects_zero_sample_fraction() {
        let mut cfg = EngineConfig::default();
        cfg.monte_carlo.min_sample_fraction = 0.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_window_shorter_than_sustain() {
        let mut cfg = EngineConfig::default();
        cfg.drift.window_s = cfg.drift.sustain_s / 2.0;
        assert!(cfg.validate().is_err());
    }
}
