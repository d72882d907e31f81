//! Sample statistics: k-best trimming and summaries.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

fn ascending(a: &f64, b: &f64) -> Ordering {
    a.partial_cmp(b).unwrap_or(Ordering::Equal)
}

/// The `k` smallest samples in ascending order. NaN samples are never kept.
pub fn k_best(samples: &[f64], k: usize) -> Vec<f64> {
    let mut sorted: Vec<f64> = samples.iter().copied().filter(|s| !s.is_nan()).collect();
    sorted.sort_by(ascending);
    sorted.truncate(k);
    sorted
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Nearest-rank quantile of an ascending slice.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() - 1) as f64 * q).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// Summary of the kept samples of one run point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// `(max - min) / min`; how far apart the kept samples are.
    pub spread: f64,
}

impl Summary {
    /// Summarize the `k` best of `samples`.
    pub fn k_best(samples: &[f64], k: usize) -> (Vec<f64>, Summary) {
        let kept = k_best(samples, k);
        let min = kept.first().copied().unwrap_or(0.0);
        let max = kept.last().copied().unwrap_or(0.0);
        let spread = if min > 0.0 { (max - min) / min } else { 0.0 };
        let summary = Summary {
            mean: mean(&kept),
            min,
            max,
            spread,
        };
        (kept, summary)
    }
}
