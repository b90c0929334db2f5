// Regression verdict for a new measurement against its baseline window
//
// The rule is deliberately simple and total:
// - center = median of the window's values (resists single-run spikes)
// - spread = median of the window's reported ranges (a noise proxy)
// - band   = max(spread, new range) * (1 + threshold_pct / 100)
//
// A value outside [center - band, center + band] is Regressed or Improved
// depending on the benchmark's direction; anything inside is Stable. Fewer
// than 2 window points is always InsufficientData, never a silent verdict.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::Measurement;
use crate::regression::config::{DetectorConfig, Direction};
use crate::regression::statistics::median;

/// Outcome of evaluating one new measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verdict {
    /// Statistically meaningful change in the favorable direction
    Improved,

    /// Within the noise band around the baseline center
    Stable,

    /// Statistically meaningful change in the unfavorable direction
    Regressed,

    /// Fewer than 2 prior points; no comparison possible
    InsufficientData,
}

impl Verdict {
    /// Marker used in human-readable reports.
    pub fn glyph(&self) -> &'static str {
        match self {
            Verdict::Improved | Verdict::Stable => "✅",
            Verdict::Regressed => "❌",
            Verdict::InsufficientData => "⚠️",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let word = match self {
            Verdict::Improved => "improved",
            Verdict::Stable => "stable",
            Verdict::Regressed => "regressed",
            Verdict::InsufficientData => "insufficient-data",
        };
        f.write_str(word)
    }
}

/// Verdict plus the numbers it was derived from.
///
/// `center`, `margin` and `delta` are absent for `InsufficientData`, where
/// no baseline exists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assessment {
    /// Final verdict
    pub verdict: Verdict,

    /// Direction the verdict was judged under
    pub direction: Direction,

    /// Number of prior points actually compared against
    pub window_len: usize,

    /// Median of the window's values
    #[serde(skip_serializing_if = "Option::is_none")]
    pub center: Option<f64>,

    /// Half-width of the allowed band around `center`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin: Option<f64>,

    /// Signed distance of the new value from `center`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<f64>,
}

/// Judge a new measurement against its trailing baseline window.
///
/// Pure function of its inputs: same window, same measurement, same config
/// always produce the same assessment. `window` holds the prior measurements
/// for the same benchmark, oldest first.
///
/// # Example
/// ```
/// use bench_store::model::Measurement;
/// use bench_store::regression::{assess, DetectorConfig, Direction, Verdict};
///
/// let window = [
///     Measurement::new("add/interpreter", 978.0, 88.0, "ns/iter"),
///     Measurement::new("add/interpreter", 1061.0, 105.0, "ns/iter"),
/// ];
/// let new = Measurement::new("add/interpreter", 1873.0, 489.0, "ns/iter");
///
/// let assessment = assess(&window, &new, Direction::LowerIsBetter, &DetectorConfig::default());
/// assert_eq!(assessment.verdict, Verdict::Regressed);
/// ```
pub fn assess(
    window: &[Measurement],
    new: &Measurement,
    direction: Direction,
    config: &DetectorConfig,
) -> Assessment {
    if window.len() < 2 {
        return Assessment {
            verdict: Verdict::InsufficientData,
            direction,
            window_len: window.len(),
            center: None,
            margin: None,
            delta: None,
        };
    }

    let values: Vec<f64> = window.iter().map(|m| m.value).collect();
    let ranges: Vec<f64> = window.iter().map(|m| m.range).collect();

    // Non-empty by the length check above.
    let center = median(&values).unwrap_or_default();
    let spread = median(&ranges).unwrap_or_default();

    let margin = spread.max(new.range) * (1.0 + config.threshold_pct / 100.0);
    let delta = new.value - center;

    let above = new.value > center + margin;
    let below = new.value < center - margin;
    let verdict = match direction {
        Direction::LowerIsBetter if above => Verdict::Regressed,
        Direction::LowerIsBetter if below => Verdict::Improved,
        Direction::HigherIsBetter if below => Verdict::Regressed,
        Direction::HigherIsBetter if above => Verdict::Improved,
        _ => Verdict::Stable,
    };

    Assessment {
        verdict,
        direction,
        window_len: window.len(),
        center: Some(center),
        margin: Some(margin),
        delta: Some(delta),
    }
}

/// Detector bound to one configuration.
///
/// Trims the full per-name history down to the configured trailing window
/// and resolves the benchmark's direction before delegating to [`assess`].
#[derive(Debug, Clone)]
pub struct RegressionDetector {
    config: DetectorConfig,
}

impl RegressionDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Evaluate `new` against the trailing window of `history` (all prior
    /// measurements recorded under `name`, oldest first).
    pub fn evaluate(&self, name: &str, history: &[Measurement], new: &Measurement) -> Assessment {
        let start = history.len().saturating_sub(self.config.window);
        assess(
            &history[start..],
            new,
            self.config.direction_for(name),
            &self.config,
        )
    }
}
