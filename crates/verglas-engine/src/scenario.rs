//! Scenario model.
//!
//! A [`Scenario`] is the immutable description of one simulation request:
//! road geometry, device placement, supply system, base environmental
//! conditions, and a declared distribution for every uncertain input. It is
//! validated once before a run starts and only ever handed out by shared
//! reference afterwards.

use std::fmt;

use serde::{Deserialize, Serialize};
use verglas_foundation::{DeviceId, RngStream, ScenarioId};

use crate::error::{Error, Result};

/// Device class a calibration state is maintained for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    /// Fixed brine-spray nozzle installations.
    SpraySystem,
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceClass::SpraySystem => write!(f, "spray_system"),
        }
    }
}

/// The physical question a scenario asks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioType {
    /// Does sprayed brine cover enough of the road surface?
    SaltSpray,
    /// Does the road surface stay above its (depressed) freezing point?
    Thermal,
}

impl fmt::Display for ScenarioType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioType::SaltSpray => write!(f, "salt_spray"),
            ScenarioType::Thermal => write!(f, "thermal"),
        }
    }
}

/// Key under which calibration state and drift monitoring are maintained.
///
/// One mutable [`crate::calibration::CalibrationState`] exists per key; all
/// other engine state is per-run and immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CalibrationKey {
    pub device_class: DeviceClass,
    pub scenario_type: ScenarioType,
}

impl fmt::Display for CalibrationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.device_class, self.scenario_type)
    }
}

/// Road segment geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoadSegment {
    pub length_m: f64,
    pub width_m: f64,
    pub lanes: u32,
    /// Longitudinal slope, percent.
    #[serde(default)]
    pub slope_pct: f64,
    #[serde(default)]
    pub elevation_m: f64,
}

/// One placed spray device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SprayDevice {
    pub id: DeviceId,
    /// Position along the road centerline, meters from segment start.
    pub station_m: f64,
    /// Lateral offset from the centerline, meters (positive = left).
    #[serde(default)]
    pub offset_m: f64,
    /// Nozzle mounting height above the surface, meters.
    pub mount_height_m: f64,
    /// Horizontal aim relative to the road axis, degrees.
    #[serde(default)]
    pub orientation_deg: f64,
    /// Full cone opening angle, degrees.
    pub spray_angle_deg: f64,
    pub nozzle_diameter_m: f64,
    pub flow_rate_lpm: f64,
    /// NaCl concentration of the sprayed brine, percent by weight.
    pub brine_concentration_pct: f64,
}

/// Shared supply system feeding the devices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplySystem {
    pub tank_capacity_l: f64,
    pub pump_pressure_pa: f64,
    pub pipe_diameter_m: f64,
}

/// Base environmental conditions for the scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Environment {
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub wind_speed_mps: f64,
    /// Degrees from north.
    pub wind_direction_deg: f64,
    /// mm per hour.
    #[serde(default)]
    pub precipitation_mmh: f64,
    /// W per square meter.
    #[serde(default)]
    pub solar_radiation_wm2: f64,
    /// Measured surface temperature, if a road sensor provides one.
    #[serde(default)]
    pub road_surface_temp_c: Option<f64>,
}

/// Declared distribution for one uncertain input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Distribution {
    /// A known value with no uncertainty.
    Point(f64),
    /// Gaussian around a mean.
    Normal { mean: f64, std: f64 },
    /// Uniform over [min, max).
    Uniform { min: f64, max: f64 },
}

impl Distribution {
    /// Draw one value from this distribution.
    ///
    /// Draws are taken raw: a physically out-of-bounds draw is rejected
    /// later by the physics model, never silently clamped here.
    pub fn sample(&self, rng: &mut RngStream) -> f64 {
        match *self {
            Distribution::Point(v) => v,
            Distribution::Normal { mean, std } => rng.normal_with(mean, std),
            Distribution::Uniform { min, max } => rng.uniform_range(min, max),
        }
    }

    fn validate(&self, input: &str) -> Result<()> {
        let detail = match *self {
            Distribution::Point(v) if !v.is_finite() => {
                Some(format!("{input}: point value must be finite, got {v}"))
            }
            Distribution::Normal { mean, std } if !mean.is_finite() || !(std >= 0.0) => {
                Some(format!(
                    "{input}: normal requires finite mean and std >= 0, got mean {mean}, std {std}"
                ))
            }
            Distribution::Uniform { min, max } if !(min <= max) || !min.is_finite() || !max.is_finite() => {
                Some(format!(
                    "{input}: uniform requires finite min <= max, got [{min}, {max})"
                ))
            }
            _ => None,
        };
        match detail {
            Some(detail) => Err(Error::Validation {
                scenario: ScenarioId("<unvalidated>".into()),
                sample: None,
                detail,
            }),
            None => Ok(()),
        }
    }
}

/// Declared uncertainty for every sampled environmental input.
///
/// Defaults reproduce the measurement spreads the model was designed
/// around: temperature ±2 °C, humidity ±10 %, wind speed ±1.5 m/s, wind
/// direction ±15°, precipitation ±0.5 mm/h, solar radiation ±50 W/m².
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Uncertainty {
    pub temperature: Distribution,
    pub humidity: Distribution,
    pub wind_speed: Distribution,
    pub wind_direction: Distribution,
    pub precipitation: Distribution,
    pub solar_radiation: Distribution,
    /// Log-scale spread of the sampled median droplet diameter.
    pub droplet_sigma: f64,
}

impl Uncertainty {
    /// Default uncertainty centered on the given base conditions.
    pub fn around(env: &Environment) -> Self {
        Self {
            temperature: Distribution::Normal { mean: env.temperature_c, std: 2.0 },
            humidity: Distribution::Normal { mean: env.humidity_pct, std: 10.0 },
            wind_speed: Distribution::Normal { mean: env.wind_speed_mps, std: 1.5 },
            wind_direction: Distribution::Normal { mean: env.wind_direction_deg, std: 15.0 },
            precipitation: Distribution::Normal { mean: env.precipitation_mmh, std: 0.5 },
            solar_radiation: Distribution::Normal { mean: env.solar_radiation_wm2, std: 50.0 },
            droplet_sigma: 0.3,
        }
    }
}

/// Immutable description of one simulation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub id: ScenarioId,
    pub scenario_type: ScenarioType,
    pub road: RoadSegment,
    pub devices: Vec<SprayDevice>,
    pub supply: SupplySystem,
    pub environment: Environment,
    pub uncertainty: Uncertainty,
}

impl Scenario {
    /// The calibration key this scenario's runs read and its sensors feed.
    pub fn calibration_key(&self) -> CalibrationKey {
        CalibrationKey {
            device_class: DeviceClass::SpraySystem,
            scenario_type: self.scenario_type,
        }
    }

    /// Reject geometrically or physically inconsistent scenarios.
    pub fn validate(&self) -> Result<()> {
        let fail = |detail: String| Error::Validation {
            scenario: self.id.clone(),
            sample: None,
            detail,
        };

        if self.road.length_m <= 0.0 || self.road.width_m <= 0.0 {
            return Err(fail(format!(
                "road dimensions must be positive, got {} m x {} m",
                self.road.length_m, self.road.width_m
            )));
        }
        if self.road.lanes == 0 {
            return Err(fail("road must have at least one lane".into()));
        }
        if self.devices.is_empty() {
            return Err(fail("scenario has no spray devices".into()));
        }
        for device in &self.devices {
            if device.station_m < 0.0 || device.station_m > self.road.length_m {
                return Err(fail(format!(
                    "device {} station {} m outside road [0, {}] m",
                    device.id, device.station_m, self.road.length_m
                )));
            }
            if device.offset_m.abs() > self.road.width_m {
                return Err(fail(format!(
                    "device {} offset {} m outside road width {} m",
                    device.id, device.offset_m, self.road.width_m
                )));
            }
            if device.mount_height_m <= 0.0
                || device.nozzle_diameter_m <= 0.0
                || device.flow_rate_lpm <= 0.0
            {
                return Err(fail(format!(
                    "device {} requires positive mount height, nozzle diameter and flow rate",
                    device.id
                )));
            }
            if !(0.0 < device.spray_angle_deg && device.spray_angle_deg <= 180.0) {
                return Err(fail(format!(
                    "device {} spray angle {}° outside (0, 180]",
                    device.id, device.spray_angle_deg
                )));
            }
            if !(0.0..=26.0).contains(&device.brine_concentration_pct) {
                return Err(fail(format!(
                    "device {} brine concentration {}% outside [0, 26] (NaCl saturation)",
                    device.id, device.brine_concentration_pct
                )));
            }
        }
        if self.supply.pump_pressure_pa <= 0.0
            || self.supply.tank_capacity_l <= 0.0
            || self.supply.pipe_diameter_m <= 0.0
        {
            return Err(fail(
                "supply system requires positive pressure, capacity and pipe diameter".into(),
            ));
        }

        for (dist, name) in [
            (&self.uncertainty.temperature, "temperature"),
            (&self.uncertainty.humidity, "humidity"),
            (&self.uncertainty.wind_speed, "wind_speed"),
            (&self.uncertainty.wind_direction, "wind_direction"),
            (&self.uncertainty.precipitation, "precipitation"),
            (&self.uncertainty.solar_radiation, "solar_radiation"),
        ] {
            dist.validate(name).map_err(|e| match e {
                Error::Validation { detail, .. } => Error::Validation {
                    scenario: self.id.clone(),
                    sample: None,
                    detail,
                },
                other => other,
            })?;
        }
        if !(self.uncertainty.droplet_sigma >= 0.0) {
            return Err(fail(format!(
                "droplet_sigma must be >= 0, got {}",
                self.uncertainty.droplet_sigma
            )));
        }

        Ok(())
    }

    /// Draw one concrete [`ParameterSample`] from the declared
    /// distributions.
    ///
    /// Each sample index gets its own RNG substream, so the draws a trial
    /// sees are independent of evaluation order.
    pub fn draw_sample(&self, index: u64, run_stream: &RngStream) -> ParameterSample {
        let mut rng = run_stream.for_sample(index);
        let u = &self.uncertainty;

        // Angle wrap keeps the bearing in [0, 360); this is coordinate
        // normalization, not a physical clamp.
        let wind_direction_deg = u.wind_direction.sample(&mut rng).rem_euclid(360.0);

        let droplet_diameters_m = self
            .devices
            .iter()
            .map(|d| rng.lognormal((d.nozzle_diameter_m * 0.3).ln(), u.droplet_sigma))
            .collect();

        ParameterSample {
            index,
            temperature_c: u.temperature.sample(&mut rng),
            humidity_pct: u.humidity.sample(&mut rng),
            wind_speed_mps: u.wind_speed.sample(&mut rng),
            wind_direction_deg,
            precipitation_mmh: u.precipitation.sample(&mut rng),
            solar_radiation_wm2: u.solar_radiation.sample(&mut rng),
            droplet_diameters_m,
        }
    }
}

/// One concrete draw of every uncertain input; used for exactly one Monte
/// Carlo trial and never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSample {
    /// Trial index within the run; with the run seed this reproduces the
    /// draw exactly.
    pub index: u64,
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub wind_speed_mps: f64,
    pub wind_direction_deg: f64,
    pub precipitation_mmh: f64,
    pub solar_radiation_wm2: f64,
    /// Sampled median droplet diameter per device, same order as
    /// `Scenario::devices`.
    pub droplet_diameters_m: Vec<f64>,
}
