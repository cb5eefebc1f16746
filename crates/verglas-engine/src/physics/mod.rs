//! Ideal physics model.
//!
//! [`evaluate`] maps a scenario and one parameter sample to a
//! [`PhysicalOutcome`]: pure, deterministic, and free of learned
//! parameters. Samples whose values violate physical bounds are rejected
//! with a validation error carrying the sample index — never silently
//! clamped — so the Monte Carlo simulator can drop and count them.

pub mod constants;
pub mod spray;
pub mod thermal;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::scenario::{ParameterSample, Scenario, ScenarioType};
use constants::{MIN_BRINE_COVERAGE, REFERENCE_THERMAL_MARGIN_C, SPRAY_SF_WEIGHT, THERMAL_SF_WEIGHT};

/// The ideal model's deterministic prediction for one parameter sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalOutcome {
    /// Index of the [`ParameterSample`] this outcome traces to.
    pub sample_index: u64,
    /// Covered fraction of the road surface, [0, 1].
    pub coverage_ratio: f64,
    /// Predicted road surface temperature, degC.
    pub surface_temp_c: f64,
    /// Freezing point after brine depression, degC.
    pub freezing_point_c: f64,
    /// Margin between surface temperature and freezing point, degC.
    pub temperature_margin_c: f64,
    /// Coverage safety factor: delivered / required coverage.
    pub spray_sf: f64,
    /// Thermal safety factor: margin / reference margin, floored at 0.
    pub thermal_sf: f64,
    /// Combined safety factor the decision rules judge.
    pub safety_factor: f64,
}

/// Bounds a sampled draw must satisfy before the model will evaluate it.
fn check_sample(scenario: &Scenario, sample: &ParameterSample) -> Result<()> {
    let reject = |detail: String| Error::Validation {
        scenario: scenario.id.clone(),
        sample: Some(sample.index),
        detail,
    };

    let finite = [
        (sample.temperature_c, "temperature"),
        (sample.humidity_pct, "humidity"),
        (sample.wind_speed_mps, "wind_speed"),
        (sample.wind_direction_deg, "wind_direction"),
        (sample.precipitation_mmh, "precipitation"),
        (sample.solar_radiation_wm2, "solar_radiation"),
    ];
    for (value, name) in finite {
        if !value.is_finite() {
            return Err(reject(format!("{name} is not finite: {value}")));
        }
    }

    if !(-60.0..=60.0).contains(&sample.temperature_c) {
        return Err(reject(format!(
            "air temperature {} degC outside [-60, 60]",
            sample.temperature_c
        )));
    }
    if !(0.0..=100.0).contains(&sample.humidity_pct) {
        return Err(reject(format!(
            "humidity {}% outside [0, 100]",
            sample.humidity_pct
        )));
    }
    if sample.wind_speed_mps < 0.0 {
        return Err(reject(format!(
            "wind speed {} m/s is negative",
            sample.wind_speed_mps
        )));
    }
    if sample.precipitation_mmh < 0.0 {
        return Err(reject(format!(
            "precipitation {} mm/h is negative",
            sample.precipitation_mmh
        )));
    }
    if sample.solar_radiation_wm2 < 0.0 {
        return Err(reject(format!(
            "solar radiation {} W/m^2 is negative",
            sample.solar_radiation_wm2
        )));
    }
    if sample.droplet_diameters_m.len() != scenario.devices.len() {
        return Err(reject(format!(
            "sample carries {} droplet draws for {} devices",
            sample.droplet_diameters_m.len(),
            scenario.devices.len()
        )));
    }
    for &d in &sample.droplet_diameters_m {
        if !(d.is_finite() && d > 0.0) {
            return Err(reject(format!("droplet diameter {d} m is not positive")));
        }
    }

    Ok(())
}

/// Evaluate the ideal model for one sampled draw.
///
/// Pure and deterministic for fixed inputs; cheap enough to call thousands
/// of times per run without parallelism being required.
pub fn evaluate(scenario: &Scenario, sample: &ParameterSample) -> Result<PhysicalOutcome> {
    check_sample(scenario, sample)?;

    let coverage_ratio = spray::coverage_ratio(scenario, sample);

    let surface_temp_c = match scenario.environment.road_surface_temp_c {
        Some(measured) => measured,
        None => thermal::surface_temperature_c(
            sample.temperature_c,
            sample.wind_speed_mps,
            sample.humidity_pct,
            sample.solar_radiation_wm2,
        ),
    };

    let mean_concentration = if scenario.devices.is_empty() {
        0.0
    } else {
        scenario
            .devices
            .iter()
            .map(|d| d.brine_concentration_pct)
            .sum::<f64>()
            / scenario.devices.len() as f64
    };
    let freezing_point_c = thermal::freezing_point_c(mean_concentration);
    let temperature_margin_c = surface_temp_c - freezing_point_c;

    let spray_sf = coverage_ratio / MIN_BRINE_COVERAGE;
    let thermal_sf = (temperature_margin_c / REFERENCE_THERMAL_MARGIN_C).max(0.0);

    let safety_factor = match scenario.scenario_type {
        ScenarioType::SaltSpray => SPRAY_SF_WEIGHT * spray_sf + THERMAL_SF_WEIGHT * thermal_sf,
        ScenarioType::Thermal => thermal_sf,
    };

    Ok(PhysicalOutcome {
        sample_index: sample.index,
        coverage_ratio,
        surface_temp_c,
        freezing_point_c,
        temperature_margin_c,
        spray_sf,
        thermal_sf,
        safety_factor,
    })
}

impl PhysicalOutcome {
    /// The observable metric a sensor of this scenario type reports.
    pub fn observable_metric(&self, scenario_type: ScenarioType) -> f64 {
        match scenario_type {
            ScenarioType::SaltSpray => self.coverage_ratio,
            ScenarioType::Thermal => self.surface_temp_c,
        }
    }
}
