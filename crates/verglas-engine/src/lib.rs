//! Verglas Engine
//!
//! Reality-calibrated decision engine for pre-installation validation of
//! road anti-icing brine-spray layouts. Given a scenario (geometry,
//! devices, environment, declared uncertainty) it runs an ideal physics
//! simulation under Monte Carlo sampling, corrects it with a
//! sensor-trained residual model, and converts the resulting outcome
//! distribution into a calibrated PASS / WARNING / FAIL judgment.
//! A drift monitor keeps the residual model honest against live sensor
//! observations over time.

pub mod calibration;
pub mod config;
pub mod drift;
pub mod engine;
pub mod error;
pub mod judgment;
pub mod montecarlo;
pub mod observation;
pub mod physics;
pub mod scenario;
pub mod store;

pub use calibration::{CalibratedOutcome, CalibrationState, FitPair};
pub use config::EngineConfig;
pub use drift::{DriftMonitor, DriftState};
pub use engine::{Engine, SimulationReport};
pub use error::{Error, Result};
pub use judgment::{JudgmentResult, Verdict};
pub use montecarlo::{CancelToken, DistributionSummary, OutcomeDistribution};
pub use observation::{ObservedMetric, SensorObservation};
pub use physics::PhysicalOutcome;
pub use scenario::{CalibrationKey, DeviceClass, ParameterSample, Scenario, ScenarioType};
