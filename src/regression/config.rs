// Configuration for median-window regression detection
//
// Thresholds are relative to the measured noise, not absolute: the allowed
// band around the window median is derived from the reported error ranges,
// then widened by `threshold_pct`. A benchmark whose own noise grows gets a
// proportionally wider band instead of a false alarm.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Which way is better for a measured value.
///
/// Timing benchmarks shrink when they improve; throughput benchmarks grow.
/// The verdict inequalities flip accordingly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    /// Smaller values are better (latency, ns/iter). The default.
    #[default]
    LowerIsBetter,
    /// Larger values are better (throughput, ops/sec).
    HigherIsBetter,
}

/// Configuration for the regression detector
///
/// # Example
/// ```
/// use bench_store::regression::DetectorConfig;
///
/// let config = DetectorConfig::default();
/// assert_eq!(config.window, 5);
/// assert_eq!(config.threshold_pct, 10.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Number of trailing history points the verdict is computed against.
    ///
    /// Fewer than 2 points in the window always yields `InsufficientData`,
    /// so the minimum useful value is 2. Default: 5.
    pub window: usize,

    /// Extra headroom on top of the noise-derived band, in percent.
    ///
    /// The band half-width is `max(median of window ranges, new range)`
    /// scaled by `1 + threshold_pct / 100`. Default: 10 (= 10%).
    pub threshold_pct: f64,

    /// Benchmark-name prefixes mapped to their direction.
    ///
    /// Lookup picks the longest matching prefix; names with no match are
    /// treated as [`Direction::LowerIsBetter`].
    pub directions: BTreeMap<String, Direction>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            window: 5,           // Enough context without chasing stale history
            threshold_pct: 10.0, // Tolerate 10% beyond the measured noise
            directions: BTreeMap::new(),
        }
    }
}

impl DetectorConfig {
    /// Create a strict configuration (fewer false positives, more false negatives)
    ///
    /// Use when you want high confidence in detected regressions.
    pub fn strict() -> Self {
        Self {
            window: 10,          // More context per verdict
            threshold_pct: 25.0, // Only flag clear excursions
            directions: BTreeMap::new(),
        }
    }

    /// Create a permissive configuration (more false positives, fewer false negatives)
    ///
    /// Use when you want to catch potential regressions early.
    pub fn permissive() -> Self {
        Self {
            window: 3,
            threshold_pct: 5.0,
            directions: BTreeMap::new(),
        }
    }

    /// Override the comparison window.
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    /// Override the headroom percentage.
    pub fn with_threshold_pct(mut self, pct: f64) -> Self {
        self.threshold_pct = pct;
        self
    }

    /// Register a direction for every benchmark name starting with `prefix`.
    pub fn with_direction(mut self, prefix: impl Into<String>, direction: Direction) -> Self {
        self.directions.insert(prefix.into(), direction);
        self
    }

    /// Direction for `name`, by longest matching registered prefix.
    pub fn direction_for(&self, name: &str) -> Direction {
        self.directions
            .iter()
            .filter(|(prefix, _)| name.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map_or_else(Direction::default, |(_, direction)| *direction)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.window < 2 {
            return Err(format!(
                "window must be >= 2 for a usable median, got {}",
                self.window
            ));
        }

        if !self.threshold_pct.is_finite() || self.threshold_pct < 0.0 {
            return Err(format!(
                "threshold_pct must be a non-negative finite number, got {}",
                self.threshold_pct
            ));
        }

        Ok(())
    }
}
