//! Calibration state store.
//!
//! One [`CalibrationState`] lives here per [`CalibrationKey`]. Writers use
//! copy-then-atomic-swap semantics: a commit builds a complete new state
//! and replaces the stored `Arc` in one step, so a concurrent reader
//! observes either the pre-commit or the post-commit state in its
//! entirety, never a mix. Readers take a cheap `Arc` snapshot and never
//! block on a writer beyond the swap itself.

use std::sync::{Arc, RwLock};

use indexmap::IndexMap;
use tracing::info;

use crate::calibration::CalibrationState;
use crate::scenario::CalibrationKey;

/// Shared store of calibration states, keyed by (device class, scenario
/// type).
#[derive(Debug, Default)]
pub struct CalibrationStore {
    states: RwLock<IndexMap<CalibrationKey, Arc<CalibrationState>>>,
}

impl CalibrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the current state for a key.
    ///
    /// Keys that have never been calibrated read as the neutral state, so
    /// simulation runs work before any sensor data exists.
    pub fn snapshot(&self, key: &CalibrationKey) -> Arc<CalibrationState> {
        let states = self.states.read().unwrap_or_else(|e| e.into_inner());
        states
            .get(key)
            .cloned()
            .unwrap_or_else(|| Arc::new(CalibrationState::neutral()))
    }

    /// Atomically replace the state for a key.
    ///
    /// In-flight readers keep their old snapshot; the next `snapshot` call
    /// sees the new state in full.
    pub fn commit(&self, key: CalibrationKey, state: CalibrationState) {
        info!(key = %key, version = state.version, gain = state.gain, bias = state.bias, "calibration state committed");
        let mut states = self.states.write().unwrap_or_else(|e| e.into_inner());
        states.insert(key, Arc::new(state));
    }

    /// Dump all states for persistence by a collaborator.
    pub fn export(&self) -> Vec<(CalibrationKey, CalibrationState)> {
        let states = self.states.read().unwrap_or_else(|e| e.into_inner());
        states
            .iter()
            .map(|(k, v)| (*k, v.as_ref().clone()))
            .collect()
    }

    /// Restore states persisted by a collaborator (process restart).
    pub fn restore(&self, entries: Vec<(CalibrationKey, CalibrationState)>) {
        let mut states = self.states.write().unwrap_or_else(|e| e.into_inner());
        for (key, state) in entries {
            states.insert(key, Arc::new(state));
        }
    }
}
