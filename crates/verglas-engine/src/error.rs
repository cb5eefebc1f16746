//! Engine errors.
//!
//! The taxonomy is deliberately small and maps one-to-one onto how callers
//! must react:
//!
//! - [`Error::Validation`] — bad input, never retried, surfaced immediately.
//! - [`Error::InsufficientSamples`] — too many per-sample evaluation
//!   failures; the caller may retry with a larger sample count.
//! - [`Error::Recalibration`] — internal to the drift monitor; logged and
//!   retried, never propagated to simulation callers.
//! - [`Error::Configuration`] — invalid thresholds or weights at startup;
//!   fatal before any run is accepted.
//! - [`Error::Cancelled`] — the run was cancelled at a sample boundary.
//!
//! Individual sample failures inside a Monte Carlo run are recovered
//! locally (dropped and counted) rather than aborting the run: a physically
//! implausible random draw must not invalidate an otherwise valid
//! statistical estimate.

use thiserror::Error;
use verglas_foundation::ScenarioId;

use crate::scenario::CalibrationKey;

/// Engine result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the decision engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Input failed validation: inconsistent geometry, out-of-bounds
    /// physical values, or a malformed observation.
    ///
    /// `sample` is set when a concrete Monte Carlo draw was rejected,
    /// which together with the run seed reproduces the failing values.
    #[error("validation failed for scenario {scenario}: {detail}")]
    Validation {
        /// The scenario being simulated or observed.
        scenario: ScenarioId,
        /// Index of the rejected parameter sample, if applicable.
        sample: Option<u64>,
        /// What was out of bounds.
        detail: String,
    },

    /// Too few samples survived evaluation for the statistics to be
    /// trustworthy.
    #[error(
        "insufficient samples for scenario {scenario}: {effective} of {requested} valid, minimum {minimum}"
    )]
    InsufficientSamples {
        /// The scenario being simulated.
        scenario: ScenarioId,
        /// Samples requested for the run.
        requested: usize,
        /// Samples that evaluated successfully.
        effective: usize,
        /// Minimum effective samples required by configuration.
        minimum: usize,
    },

    /// A recalibration attempt could not produce a usable state.
    ///
    /// Never surfaced to `simulate` callers; the drift monitor logs it and
    /// schedules a retry.
    #[error("recalibration failed for {key}: {detail}")]
    Recalibration {
        /// The calibration key being refit.
        key: CalibrationKey,
        /// Why the fit was rejected.
        detail: String,
    },

    /// Configuration rejected at startup.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The run was cancelled between samples.
    #[error("run cancelled for scenario {scenario} after {completed} samples")]
    Cancelled {
        /// The scenario being simulated.
        scenario: ScenarioId,
        /// Samples evaluated before cancellation was observed.
        completed: usize,
    },
}
