//! Deterministic random number generation.
//!
//! A simulation run must be reproducible from its recorded seed, so all
//! randomness in verglas is derived from that seed via labeled streams.
//!
//! # PRNG Algorithm
//!
//! Uses SplitMix64, a fast, high-quality PRNG that is:
//! - Deterministic and reproducible
//! - Portable (same results on all platforms)
//! - Good statistical quality for Monte Carlo sampling
//!
//! # Stream Model
//!
//! ```text
//! run_seed
//!   └─> scenario label ("scenario.<id>")
//!         └─> sample index (one substream per Monte Carlo trial)
//!               └─> advances with each draw, never resets
//! ```
//!
//! Deriving one substream per sample index means the draws a trial sees do
//! not depend on evaluation order, which keeps parallel and sequential runs
//! identical.

use std::f64::consts::PI;

use crate::stable_hash::fnv1a64_str;

/// A deterministic pseudo-random number stream.
///
/// Streams are created from seeds (typically the run seed combined with a
/// semantic label) and produce a reproducible sequence of values. Each
/// generation method advances the stream state; streams never reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RngStream {
    state: u64,
}

impl RngStream {
    /// Create a new RNG stream from a seed.
    #[inline]
    pub const fn new(seed: u64) -> Self {
        // Ensure non-zero state (SplitMix64 requirement)
        let state = if seed == 0 { 0x9E3779B97F4A7C15 } else { seed };
        Self { state }
    }

    /// Create a new RNG stream by combining a parent seed with a label.
    ///
    /// This is the primary way to create the per-run stream:
    /// ```ignore
    /// let stream = RngStream::derive(run_seed, "scenario.bridge-a12");
    /// ```
    #[inline]
    pub fn derive(parent_seed: u64, label: &str) -> Self {
        let label_hash = fnv1a64_str(label);
        let mixed = splitmix64_mix(parent_seed ^ label_hash);
        Self::new(mixed)
    }

    /// Create an independent substream for a specific sample index.
    ///
    /// Does not advance the parent stream, so substream contents are a
    /// function of (parent state, index) alone.
    #[inline]
    pub fn for_sample(&self, sample_index: u64) -> Self {
        let mixed = splitmix64_mix(self.state ^ sample_index.wrapping_mul(0x9E3779B97F4A7C15));
        Self::new(mixed)
    }

    /// Get the current internal state (for debugging/testing).
    #[inline]
    pub const fn state(&self) -> u64 {
        self.state
    }

    /// Generate the next random u64 value.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        self.state = splitmix64_next(self.state);
        splitmix64_mix(self.state)
    }

    /// Generate a uniform random f64 in [0, 1).
    #[inline]
    pub fn uniform(&mut self) -> f64 {
        u64_to_f64_01(self.next_u64())
    }

    /// Generate a uniform random f64 in [min, max).
    #[inline]
    pub fn uniform_range(&mut self, min: f64, max: f64) -> f64 {
        min + self.uniform() * (max - min)
    }

    /// Generate a standard normal (Gaussian) value using Box-Muller.
    #[inline]
    pub fn normal(&mut self) -> f64 {
        let u1 = self.uniform();
        let u2 = self.uniform();
        // Avoid log(0) by ensuring u1 > 0
        let u1 = if u1 == 0.0 { f64::MIN_POSITIVE } else { u1 };
        (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
    }

    /// Generate a normal value with given mean and standard deviation.
    #[inline]
    pub fn normal_with(&mut self, mean: f64, stddev: f64) -> f64 {
        mean + self.normal() * stddev
    }

    /// Generate a log-normal value parameterized by the underlying normal.
    ///
    /// Used for droplet-size draws, which are strictly positive and skewed.
    #[inline]
    pub fn lognormal(&mut self, mu: f64, sigma: f64) -> f64 {
        (mu + self.normal() * sigma).exp()
    }
}

/// SplitMix64 state transition function.
#[inline]
const fn splitmix64_next(state: u64) -> u64 {
    state.wrapping_add(0x9E3779B97F4A7C15)
}

/// SplitMix64 mixing function for deriving new states.
#[inline]
const fn splitmix64_mix(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Convert a u64 to a uniform f64 in [0, 1).
///
/// Uses the upper 53 bits for full f64 precision.
#[inline]
const fn u64_to_f64_01(x: u64) -> f64 {
    (x >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
}
