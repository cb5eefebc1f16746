//! Order-independent statistics for Monte Carlo aggregation.
//!
//! Per-sample outcomes may be produced by a parallel worker pool, so every
//! aggregate here must yield identical results regardless of execution
//! order. Sums use a fixed-structure binary tree where pairing is
//! determined by index, not by which computation finishes first:
//!
//! ```text
//! Samples: [s0, s1, s2, s3, s4]
//!
//! Level 0: s0+s1  s2+s3  s4
//! Level 1: (s0+s1)+(s2+s3)  s4
//! Level 2: ((s0+s1)+(s2+s3))+s4
//! ```
//!
//! Percentiles are empirical order statistics over a sorted copy, never a
//! normal approximation — outcome distributions are not guaranteed
//! symmetric.

/// Perform a deterministic tree reduction with a binary operation.
///
/// The reduction follows a fixed binary tree structure where pairs are
/// determined by index, ensuring identical results regardless of execution
/// order. Odd elements propagate up a level unchanged.
pub fn tree_reduce<T, F>(values: &[T], op: F) -> Option<T>
where
    T: Copy,
    F: Fn(T, T) -> T,
{
    if values.is_empty() {
        return None;
    }
    if values.len() == 1 {
        return Some(values[0]);
    }

    let mut current: Vec<T> = values.to_vec();
    let mut next: Vec<T> = Vec::with_capacity(current.len().div_ceil(2));

    while current.len() > 1 {
        next.clear();
        let mut i = 0;
        while i + 1 < current.len() {
            next.push(op(current[i], current[i + 1]));
            i += 2;
        }
        if i < current.len() {
            next.push(current[i]);
        }
        std::mem::swap(&mut current, &mut next);
    }

    Some(current[0])
}

/// Deterministic sum using fixed-tree reduction.
pub fn sum(values: &[f64]) -> f64 {
    tree_reduce(values, |a, b| a + b).unwrap_or(0.0)
}

/// Deterministic mean, computed as `sum / count`.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    sum(values) / values.len() as f64
}

/// Deterministic population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let sq: Vec<f64> = values.iter().map(|v| (v - m) * (v - m)).collect();
    (sum(&sq) / values.len() as f64).sqrt()
}

/// Minimum value; `f64::INFINITY` if empty.
pub fn min(values: &[f64]) -> f64 {
    tree_reduce(values, f64::min).unwrap_or(f64::INFINITY)
}

/// Maximum value; `f64::NEG_INFINITY` if empty.
pub fn max(values: &[f64]) -> f64 {
    tree_reduce(values, f64::max).unwrap_or(f64::NEG_INFINITY)
}

/// Empirical percentile as an order statistic.
///
/// `p` is in [0, 100]. Uses the nearest-rank method on a sorted copy:
/// the k-th order statistic with `k = ceil(p/100 · n)`, so `percentile(v,
/// 95.0)` is a value actually present in the sample set.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let n = sorted.len();
    let rank = ((p / 100.0) * n as f64).ceil() as usize;
    sorted[rank.clamp(1, n) - 1]
}

/// Fraction of values strictly below a threshold.
pub fn fraction_below(values: &[f64], threshold: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().filter(|&&v| v < threshold).count() as f64 / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tree_sum_matches_sequential() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(sum(&values), 15.0);
    }

    #[test]
    fn tree_sum_is_permutation_stable_in_structure() {
        // Same multiset reduced under the same index structure gives the
        // same bits; this guards the fixed-tree pairing itself.
        let values: Vec<f64> = (0..1000).map(|i| 1.0 / (i as f64 + 1.0)).collect();
        let a = sum(&values);
        let b = sum(&values);
        assert_eq!(a.to_bits(), b.to_bits());
    }

    #[test]
    fn percentile_is_order_statistic() {
        let values: Vec<f64> = (1..=100).map(|i| i as f64).collect();
        assert_eq!(percentile(&values, 95.0), 95.0);
        assert_eq!(percentile(&values, 5.0), 5.0);
        assert_eq!(percentile(&values, 100.0), 100.0);
        // Single element: every percentile is that element
        assert_eq!(percentile(&[3.5], 95.0), 3.5);
    }

    #[test]
    fn fraction_below_counts_strictly() {
        let values = [0.5, 1.0, 1.5, 2.0];
        assert_eq!(fraction_below(&values, 1.0), 0.25);
    }

    #[test]
    fn empty_inputs_are_defined() {
        assert_eq!(sum(&[]), 0.0);
        assert_eq!(mean(&[]), 0.0);
        assert!(percentile(&[], 95.0).is_nan());
    }
}
