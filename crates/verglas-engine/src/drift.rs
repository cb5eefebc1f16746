//! Drift monitor.
//!
//! Watches the divergence between calibrated predictions and matched
//! sensor observations for one calibration key, and decides when the
//! residual model must be refit.
//!
//! The monitor is a three-state machine:
//!
//! ```text
//!            error > threshold                sustained > sustain_s
//!  Stable ──────────────────────> Drifting ─────────────────────> Recalibrating
//!    ^                               │ error <= threshold              │
//!    │<──────────────────────────────┘ (false alarm)                   │
//!    │<────────────────────────────────────────────────────────────────┘ fit ok
//!                     Drifting <── fit failed (retry scheduled)
//! ```
//!
//! All durations are measured in *observation time* (sensor timestamps),
//! never wall-clock ticks, so irregular arrival rates cannot hide drift.
//! An evaluation tick fires once per matched pair, not on a timer, so
//! staleness cannot hide drift either.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::calibration::FitPair;
use crate::config::DriftConfig;
use crate::scenario::CalibrationKey;

/// Monitor state for one calibration key.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DriftState {
    /// Calibrated predictions track observations within threshold.
    Stable,
    /// Error above threshold since `since_s`; not yet sustained.
    Drifting {
        /// Observation timestamp at which the excursion began.
        since_s: f64,
    },
    /// A recalibration is in flight for this key; further triggers are
    /// no-ops until it completes.
    Recalibrating,
}

/// One matched (prediction, observation) pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchedPair {
    /// Ideal (uncorrected) prediction of the observed metric; what a refit
    /// learns against.
    pub ideal: f64,
    /// Calibrated prediction; what drift is measured against.
    pub calibrated: f64,
    /// Sensor-observed value.
    pub observed: f64,
    /// Observation timestamp, seconds.
    pub timestamp_s: f64,
}

/// What the caller must do after an evaluation tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Keep consuming observations.
    Continue,
    /// Error has been sustained: run a fit and commit it. Exactly one
    /// trigger is emitted per excursion; the monitor holds the
    /// recalibrating right until [`DriftMonitor::complete`] is called.
    TriggerRecalibration,
}

/// Drift monitor for one calibration key.
#[derive(Debug, Clone)]
pub struct DriftMonitor {
    key: CalibrationKey,
    state: DriftState,
    window: VecDeque<MatchedPair>,
    /// Earliest observation time at which a failed recalibration may be
    /// retried.
    retry_at_s: Option<f64>,
    config: DriftConfig,
}

impl DriftMonitor {
    pub fn new(key: CalibrationKey, config: DriftConfig) -> Self {
        Self {
            key,
            state: DriftState::Stable,
            window: VecDeque::new(),
            retry_at_s: None,
            config,
        }
    }

    pub fn state(&self) -> DriftState {
        self.state
    }

    /// Rolling relative error over the trailing window.
    ///
    /// Pairs whose prediction is (numerically) zero cannot express a
    /// relative error and are skipped.
    pub fn rolling_error(&self) -> f64 {
        let mut total = 0.0;
        let mut count = 0usize;
        for pair in &self.window {
            if pair.calibrated.abs() > 1e-9 {
                total += (pair.observed - pair.calibrated).abs() / pair.calibrated.abs();
                count += 1;
            }
        }
        if count == 0 {
            0.0
        } else {
            total / count as f64
        }
    }

    /// The trailing pairs a refit would learn from.
    pub fn fit_pairs(&self) -> Vec<FitPair> {
        self.window
            .iter()
            .map(|p| FitPair {
                predicted: p.ideal,
                observed: p.observed,
                timestamp_s: p.timestamp_s,
            })
            .collect()
    }

    /// Evaluation tick: consume one matched pair and advance the state
    /// machine.
    pub fn tick(&mut self, pair: MatchedPair) -> TickOutcome {
        let now_s = pair.timestamp_s;
        self.window.push_back(pair);
        self.evict_before(now_s - self.config.window_s);

        let error = self.rolling_error();

        match self.state {
            DriftState::Stable => {
                if error > self.config.threshold {
                    debug!(key = %self.key, error, "drift excursion began");
                    self.state = DriftState::Drifting { since_s: now_s };
                }
                TickOutcome::Continue
            }
            DriftState::Drifting { since_s } => {
                if error <= self.config.threshold {
                    // False alarm: the excursion ended before sustaining.
                    debug!(key = %self.key, error, "drift excursion reverted");
                    self.state = DriftState::Stable;
                    return TickOutcome::Continue;
                }
                let sustained = now_s - since_s >= self.config.sustain_s;
                let retry_ok = self.retry_at_s.is_none_or(|t| now_s >= t);
                if sustained && retry_ok {
                    info!(key = %self.key, error, sustained_s = now_s - since_s, "drift sustained, triggering recalibration");
                    self.state = DriftState::Recalibrating;
                    TickOutcome::TriggerRecalibration
                } else {
                    TickOutcome::Continue
                }
            }
            // At most one recalibration in flight per key: a second
            // trigger is a no-op, not a queued duplicate.
            DriftState::Recalibrating => TickOutcome::Continue,
        }
    }

    /// Report the result of the triggered recalibration.
    ///
    /// Success commits happened elsewhere (store swap); here the machine
    /// returns to `Stable` and the window is cleared, since its pairs were
    /// matched against the replaced state. Failure returns to `Drifting`
    /// and schedules a retry after the configured backoff — it is never
    /// fatal to the monitor.
    pub fn complete(&mut self, succeeded: bool, now_s: f64) {
        match self.state {
            DriftState::Recalibrating => {
                if succeeded {
                    self.state = DriftState::Stable;
                    self.window.clear();
                    self.retry_at_s = None;
                } else {
                    warn!(key = %self.key, retry_in_s = self.config.retry_backoff_s, "recalibration failed, retry scheduled");
                    self.state = DriftState::Drifting { since_s: now_s };
                    self.retry_at_s = Some(now_s + self.config.retry_backoff_s);
                }
            }
            _ => debug!(key = %self.key, "completion reported while not recalibrating"),
        }
    }

    fn evict_before(&mut self, cutoff_s: f64) {
        while self.window.front().is_some_and(|p| p.timestamp_s < cutoff_s) {
            self.window.pop_front();
        }
    }
}
