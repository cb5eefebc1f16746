//! Sensor observations.
//!
//! Timestamped real-world measurements tied to a device class and scenario
//! type. Observations are append-only: once ingested they are never edited,
//! only aged out of the drift monitor's trailing window.

use serde::{Deserialize, Serialize};
use verglas_foundation::{ScenarioId, SensorId};

use crate::error::{Error, Result};
use crate::scenario::{CalibrationKey, ScenarioType};

/// Which physical quantity a sensor reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservedMetric {
    /// Fraction of the monitored surface wetted by brine, [0, 1].
    CoverageRatio,
    /// Road surface temperature, degC.
    SurfaceTemperature,
}

impl ObservedMetric {
    /// The scenario type whose predictions this metric is compared to.
    pub fn scenario_type(&self) -> ScenarioType {
        match self {
            ObservedMetric::CoverageRatio => ScenarioType::SaltSpray,
            ObservedMetric::SurfaceTemperature => ScenarioType::Thermal,
        }
    }
}

/// One timestamped sensor measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorObservation {
    pub sensor: SensorId,
    /// The scenario whose installation this sensor instruments.
    pub scenario: ScenarioId,
    pub key: CalibrationKey,
    pub metric: ObservedMetric,
    pub value: f64,
    /// Observation timestamp, seconds since the collaborator's epoch.
    pub timestamp_s: f64,
}

impl SensorObservation {
    /// Reject malformed observations. Rejected observations are surfaced
    /// to the producer and never retried by the engine.
    pub fn validate(&self) -> Result<()> {
        let reject = |detail: String| Error::Validation {
            scenario: self.scenario.clone(),
            sample: None,
            detail,
        };

        if !self.timestamp_s.is_finite() || self.timestamp_s < 0.0 {
            return Err(reject(format!(
                "observation from {} has invalid timestamp {}",
                self.sensor, self.timestamp_s
            )));
        }
        if !self.value.is_finite() {
            return Err(reject(format!(
                "observation from {} has non-finite value",
                self.sensor
            )));
        }
        match self.metric {
            ObservedMetric::CoverageRatio => {
                if !(0.0..=1.0).contains(&self.value) {
                    return Err(reject(format!(
                        "coverage ratio {} outside [0, 1]",
                        self.value
                    )));
                }
            }
            ObservedMetric::SurfaceTemperature => {
                if !(-60.0..=80.0).contains(&self.value) {
                    return Err(reject(format!(
                        "surface temperature {} degC outside [-60, 80]",
                        self.value
                    )));
                }
            }
        }
        if self.metric.scenario_type() != self.key.scenario_type {
            return Err(reject(format!(
                "metric {:?} does not match scenario type {}",
                self.metric, self.key.scenario_type
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::DeviceClass;

    fn observation(value: f64, timestamp_s: f64) -> SensorObservation {
        SensorObservation {
            sensor: "cov-01".into(),
            scenario: "ramp-7".into(),
            key: CalibrationKey {
                device_class: DeviceClass::SpraySystem,
                scenario_type: ScenarioType::SaltSpray,
            },
            metric: ObservedMetric::CoverageRatio,
            value,
            timestamp_s,
        }
    }

    #[test]
    fn valid_observation_passes() {
        assert!(observation(0.8, 60.0).validate().is_ok());
    }

    #[test]
    fn out_of_range_value_is_rejected() {
        assert!(observation(1.4, 60.0).validate().is_err());
        assert!(observation(f64::NAN, 60.0).validate().is_err());
    }

    #[test]
    fn missing_timestamp_is_rejected() {
        assert!(observation(0.8, f64::NAN).validate().is_err());
        assert!(observation(0.8, -5.0).validate().is_err());
    }

    #[test]
    fn metric_must_match_scenario_type() {
        let mut obs = observation(0.8, 60.0);
        obs.key.scenario_type = ScenarioType::Thermal;
        assert!(obs.validate().is_err());
    }
}
