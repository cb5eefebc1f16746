//! End-to-end engine tests: simulate, judge, ingest, recalibrate.

use verglas_engine::config::{DriftConfig, EngineConfig};
use verglas_engine::judgment::{judge, rules};
use verglas_engine::observation::{ObservedMetric, SensorObservation};
use verglas_engine::scenario::{
    Distribution, Environment, RoadSegment, Scenario, ScenarioType, SprayDevice, SupplySystem,
    Uncertainty,
};
use verglas_engine::{DistributionSummary, DriftState, Engine, Error, Verdict};

const SAMPLES: usize = 120;
const SEED: u64 = 42;

fn scenario() -> Scenario {
    let environment = Environment {
        temperature_c: -2.0,
        humidity_pct: 70.0,
        wind_speed_mps: 3.0,
        wind_direction_deg: 0.0,
        precipitation_mmh: 0.5,
        solar_radiation_wm2: 0.0,
        road_surface_temp_c: None,
    };
    Scenario {
        id: "bridge-a12".into(),
        scenario_type: ScenarioType::SaltSpray,
        road: RoadSegment {
            length_m: 12.0,
            width_m: 7.0,
            lanes: 2,
            slope_pct: 1.5,
            elevation_m: 80.0,
        },
        devices: vec![
            SprayDevice {
                id: "nozzle-1".into(),
                station_m: 3.0,
                offset_m: -1.0,
                mount_height_m: 0.3,
                orientation_deg: 0.0,
                spray_angle_deg: 60.0,
                nozzle_diameter_m: 0.003,
                flow_rate_lpm: 0.5,
                brine_concentration_pct: 23.0,
            },
            SprayDevice {
                id: "nozzle-2".into(),
                station_m: 9.0,
                offset_m: 1.0,
                mount_height_m: 0.3,
                orientation_deg: 180.0,
                spray_angle_deg: 60.0,
                nozzle_diameter_m: 0.003,
                flow_rate_lpm: 0.5,
                brine_concentration_pct: 23.0,
            },
        ],
        supply: SupplySystem {
            tank_capacity_l: 2000.0,
            pump_pressure_pa: 300_000.0,
            pipe_diameter_m: 0.05,
        },
        uncertainty: Uncertainty::around(&environment),
        environment,
    }
}

fn summary(mean_sf: f64, pf: f64, ucl95_risk: f64) -> DistributionSummary {
    DistributionSummary {
        mean_sf,
        std_sf: 0.1,
        min_sf: mean_sf - 0.5,
        max_sf: mean_sf + 0.5,
        p5_sf: mean_sf - 0.3,
        p95_sf: mean_sf + 0.3,
        failure_probability: pf,
        ucl95_risk,
        effective_samples: 1000,
    }
}

#[test]
fn simulate_returns_exactly_the_effective_samples() {
    let engine = Engine::new(EngineConfig::default()).unwrap();
    let report = engine.simulate(&scenario(), SAMPLES, SEED).unwrap();

    let dist = &report.distribution;
    assert_eq!(dist.outcomes.len(), dist.summary.effective_samples);
    assert_eq!(dist.outcomes.len() + dist.discarded, dist.requested);
    assert_eq!(dist.requested, SAMPLES);
    assert_eq!(dist.seed, SEED);
}

#[test]
fn fixed_seed_replays_identically() {
    let engine = Engine::new(EngineConfig::default()).unwrap();
    let s = scenario();

    let a = engine.simulate(&s, SAMPLES, SEED).unwrap();
    let b = engine.simulate(&s, SAMPLES, SEED).unwrap();

    assert_eq!(a.distribution.summary, b.distribution.summary);
    assert_eq!(a.distribution.outcomes.len(), b.distribution.outcomes.len());
    for (x, y) in a.distribution.outcomes.iter().zip(&b.distribution.outcomes) {
        assert_eq!(x, y);
    }
    assert_eq!(a.judgment, b.judgment);
}

#[test]
fn judgment_is_a_pure_function_of_the_summary() {
    let engine = Engine::new(EngineConfig::default()).unwrap();
    let report = engine.simulate(&scenario(), SAMPLES, SEED).unwrap();

    let replayed = judge(&report.distribution.summary, &engine.config().judgment);
    assert_eq!(replayed, report.judgment);
    assert_eq!(replayed.rule, report.judgment.rule);
}

#[test]
fn example_scenario_a_fails_on_pf() {
    let result = judge(&summary(0.8, 0.25, 0.4), &EngineConfig::default().judgment);
    assert_eq!(result.verdict, Verdict::Fail);
    assert_eq!(result.rule, rules::PF_LIMIT);
}

#[test]
fn example_scenario_b_warns_in_the_default_band() {
    let result = judge(&summary(1.2, 0.05, -0.05), &EngineConfig::default().judgment);
    assert_eq!(result.verdict, Verdict::Warning);
    assert_eq!(result.rule, rules::DEFAULT_BAND);
}

#[test]
fn example_scenario_c_passes() {
    let result = judge(&summary(1.6, 0.01, -0.2), &EngineConfig::default().judgment);
    assert_eq!(result.verdict, Verdict::Pass);
    assert_eq!(result.rule, rules::PASS_TARGET);
}

#[test]
fn impossible_draws_surface_as_insufficient_samples() {
    let engine = Engine::new(EngineConfig::default()).unwrap();
    let mut s = scenario();
    s.uncertainty.humidity = Distribution::Point(400.0);

    let err = engine.simulate(&s, 40, SEED).unwrap_err();
    match err {
        Error::InsufficientSamples { effective, minimum, .. } => {
            assert_eq!(effective, 0);
            assert!(minimum > 0);
        }
        other => panic!("expected InsufficientSamples, got {other}"),
    }
}

/// Sustained 7% sensor error for 11 minutes of observation time must drive
/// the monitor through RECALIBRATING and advance the fit timestamp.
#[test]
fn sustained_drift_recalibrates_and_advances_the_fit_timestamp() {
    let engine = Engine::new(EngineConfig::default()).unwrap();
    let s = scenario();
    let key = s.calibration_key();

    let report = engine.simulate(&s, SAMPLES, SEED).unwrap();
    let mean_coverage: f64 = report
        .distribution
        .outcomes
        .iter()
        .map(|o| o.outcome.coverage_ratio)
        .sum::<f64>()
        / report.distribution.outcomes.len() as f64;

    let before = engine.calibration_state(&key);
    assert_eq!(before.version, 0);
    assert_eq!(before.fitted_at_s, 0.0);

    // One observation per minute at +7% relative error, 11 minutes.
    let mut recalibrated_at = None;
    for minute in 0..=11u32 {
        let t = 60.0 * minute as f64;
        let obs = SensorObservation {
            sensor: "cov-01".into(),
            scenario: s.id.clone(),
            key,
            metric: ObservedMetric::CoverageRatio,
            value: (mean_coverage * 1.07).min(1.0),
            timestamp_s: t,
        };
        engine.ingest_observation(obs).unwrap();
        if recalibrated_at.is_none() && engine.calibration_state(&key).version > 0 {
            recalibrated_at = Some(t);
        }
    }

    let after = engine.calibration_state(&key);
    assert_eq!(after.version, 1, "exactly one recalibration must commit");
    assert!(after.fitted_at_s > before.fitted_at_s);
    assert!(after.gain != 0.0 || after.bias != 0.0);
    assert!(after.drift_estimate > 0.05);
    // The trigger fires once the error has been sustained for 10 minutes.
    assert_eq!(recalibrated_at, Some(600.0));
    // Commit completed, so the monitor has released the recalibrating
    // right and returned to stable.
    assert_eq!(engine.drift_state(&key), Some(DriftState::Stable));
}

/// Error at 7% for less than the sustain duration must not recalibrate.
#[test]
fn short_lived_drift_does_not_recalibrate() {
    let engine = Engine::new(EngineConfig::default()).unwrap();
    let s = scenario();
    let key = s.calibration_key();
    let report = engine.simulate(&s, SAMPLES, SEED).unwrap();
    let mean_coverage: f64 = report
        .distribution
        .outcomes
        .iter()
        .map(|o| o.outcome.coverage_ratio)
        .sum::<f64>()
        / report.distribution.outcomes.len() as f64;

    for minute in 0..8u32 {
        let obs = SensorObservation {
            sensor: "cov-01".into(),
            scenario: s.id.clone(),
            key,
            metric: ObservedMetric::CoverageRatio,
            value: (mean_coverage * 1.07).min(1.0),
            timestamp_s: 60.0 * minute as f64,
        };
        engine.ingest_observation(obs).unwrap();
    }

    assert_eq!(engine.calibration_state(&key).version, 0);
    assert!(matches!(
        engine.drift_state(&key),
        Some(DriftState::Drifting { .. })
    ));
}

/// Runs after a recalibration pick up the committed state.
#[test]
fn recalibrated_state_feeds_subsequent_runs() {
    let mut config = EngineConfig::default();
    // Tighter drift window so the test stream is short.
    config.drift = DriftConfig {
        threshold: 0.05,
        sustain_s: 300.0,
        window_s: 600.0,
        retry_backoff_s: 60.0,
    };
    let engine = Engine::new(config).unwrap();
    let s = scenario();
    let key = s.calibration_key();

    let baseline = engine.simulate(&s, SAMPLES, SEED).unwrap();
    let mean_coverage: f64 = baseline
        .distribution
        .outcomes
        .iter()
        .map(|o| o.outcome.coverage_ratio)
        .sum::<f64>()
        / baseline.distribution.outcomes.len() as f64;

    // Sensors consistently read 10% above the model, every 30 seconds.
    for step in 0..=20u32 {
        let obs = SensorObservation {
            sensor: "cov-01".into(),
            scenario: s.id.clone(),
            key,
            metric: ObservedMetric::CoverageRatio,
            value: (mean_coverage * 1.10).min(1.0),
            timestamp_s: 30.0 * step as f64,
        };
        engine.ingest_observation(obs).unwrap();
    }

    let state = engine.calibration_state(&key);
    assert_eq!(state.version, 1);

    let calibrated = engine.simulate(&s, SAMPLES, SEED).unwrap();
    // The committed correction raises predicted coverage toward the
    // sensor readings, so the calibrated run cannot score lower.
    assert!(
        calibrated.distribution.summary.mean_sf >= baseline.distribution.summary.mean_sf,
        "correction should move predictions toward the (higher) observations"
    );
    assert!(calibrated
        .distribution
        .outcomes
        .iter()
        .all(|o| o.calibration_version == 1));
}
