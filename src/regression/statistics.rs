// Statistical primitives for regression detection and history summaries
//
// The detector works in f64 end to end: verdicts must not depend on float
// narrowing. Summary statistics for reporting go through trueno's SIMD
// vector ops instead, matching how the rest of the toolchain computes
// descriptive stats, and accept f32 precision there.

use serde::Serialize;
use trueno::Vector;

/// Linearly interpolated percentile over pre-sorted data.
///
/// `percentile` is in `[0, 100]`. Empty input yields 0.0; a single element
/// is every percentile of itself.
pub fn percentile_of_sorted(sorted: &[f64], percentile: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }

    let index = (percentile / 100.0) * (sorted.len() - 1) as f64;
    let lower = index.floor() as usize;
    let upper = index.ceil() as usize;

    if lower == upper {
        sorted[lower]
    } else {
        let weight = index - lower as f64;
        sorted[lower] * (1.0 - weight) + sorted[upper] * weight
    }
}

/// Median of an unsorted slice, `None` when empty.
///
/// Median rather than mean: a single outlier run must not drag the whole
/// comparison band with it.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    Some(percentile_of_sorted(&sorted, 50.0))
}

/// Descriptive statistics over one benchmark's value series (SIMD-accelerated via trueno)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesStats {
    pub count: usize,
    pub mean: f32,
    pub stddev: f32,
    pub min: f32,
    pub max: f32,
    pub median: f32, // P50
    pub p90: f32,
    pub p99: f32,
}

impl SeriesStats {
    /// Compute stats for a value series, `None` when the series is empty.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let narrowed: Vec<f32> = values.iter().map(|&v| v as f32).collect();
        let v = Vector::from_slice(&narrowed);

        let mean = v.mean().unwrap_or(0.0);
        let stddev = v.stddev().unwrap_or(0.0);
        let min = v.min().unwrap_or(0.0);
        let max = v.max().unwrap_or(0.0);

        // trueno has no percentile primitive; interpolate over a sorted copy.
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        Some(Self {
            count: values.len(),
            mean,
            stddev,
            min,
            max,
            median: percentile_of_sorted(&sorted, 50.0) as f32,
            p90: percentile_of_sorted(&sorted, 90.0) as f32,
            p99: percentile_of_sorted(&sorted, 99.0) as f32,
        })
    }
}
