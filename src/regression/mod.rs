// Median-window regression detection for benchmark series
//
// Fixed absolute thresholds ("fail CI on any 5% slowdown") misfire on noisy
// benchmarks and miss slow drifts on quiet ones. This detector scales its
// band to the noise the harness itself reports: the median error range of
// the baseline window, or the new measurement's own range when that is
// wider, plus a configurable percentage of headroom.
//
// The verdict is a pure function of (window, new measurement, config). All
// state handling lives in the store and the ingest pipeline; this module
// can be tested exhaustively with plain slices.

mod config;
mod statistics;
mod verdict;

pub use config::{DetectorConfig, Direction};
pub use statistics::{median, percentile_of_sorted, SeriesStats};
pub use verdict::{assess, Assessment, RegressionDetector, Verdict};
