//! Ingestion pipeline: validate, append, evaluate
//!
//! [`Ingestor`] is the single write path into the store. It rejects malformed
//! records before they touch disk, appends through the store's invariant
//! checks, then evaluates every measurement against the history that existed
//! prior to the append. The resulting [`IngestReport`] carries one outcome
//! per measurement, including the prior latest value and the detector's
//! assessment.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::model::{now_epoch_millis, CommitInfo, EpochMillis, Measurement, RunRecord};
use crate::regression::{Assessment, RegressionDetector, Verdict};
use crate::store::{RecordIndex, SeriesStore, StoreError};

/// Validation failures for an incoming record. Caller errors, never retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MalformedRecord {
    #[error("commit id is empty")]
    EmptyCommitId,

    #[error("record has no measurements")]
    NoMeasurements,

    #[error("measurement has an empty name")]
    EmptyName,

    #[error("measurement {name} has an empty unit")]
    EmptyUnit { name: String },

    #[error("measurement {name} has a non-finite value {value}")]
    NonFiniteValue { name: String, value: f64 },

    #[error("measurement {name} has a negative value {value}")]
    NegativeValue { name: String, value: f64 },

    #[error("measurement {name} has a non-finite range {range}")]
    NonFiniteRange { name: String, range: f64 },

    #[error("measurement {name} has a negative range {range}")]
    NegativeRange { name: String, range: f64 },

    #[error("measurement name {name} appears twice in one record")]
    DuplicateName { name: String },
}

/// Any failure of one `ingest` call.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("malformed record: {0}")]
    Malformed(#[from] MalformedRecord),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IngestError {
    /// Caller errors get CLI exit code 1, infrastructure faults exit code 2.
    pub fn is_caller_error(&self) -> bool {
        match self {
            IngestError::Malformed(_) => true,
            IngestError::Store(e) => e.is_caller_error(),
        }
    }
}

/// Run record as emitted by a harness wrapper, before ingestion defaults.
///
/// `date` is optional on the wire; a missing value means "now". `tool`
/// defaults to the cargo bench harness.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRunRecord {
    pub commit: CommitInfo,
    #[serde(default)]
    pub date: Option<EpochMillis>,
    #[serde(default = "default_tool")]
    pub tool: String,
    pub benches: Vec<Measurement>,
}

fn default_tool() -> String {
    "cargo".to_string()
}

impl RawRunRecord {
    /// Fill in defaults and produce the record to ingest.
    pub fn into_record(self) -> RunRecord {
        RunRecord {
            commit: self.commit,
            date: self.date.unwrap_or_else(now_epoch_millis),
            tool: self.tool,
            benches: self.benches,
        }
    }
}

/// Outcome for one measurement of an ingested record.
#[derive(Debug, Clone, Serialize)]
pub struct MeasurementOutcome {
    pub name: String,
    pub value: f64,
    pub unit: String,

    /// Latest value recorded under this name before the append.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prior: Option<Measurement>,

    pub assessment: Assessment,
}

/// Result of one successful ingest call.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub suite: String,
    pub commit_id: String,
    pub index: RecordIndex,
    pub date: EpochMillis,
    pub outcomes: Vec<MeasurementOutcome>,
}

impl IngestReport {
    /// Number of measurements judged regressed.
    pub fn regression_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.assessment.verdict == Verdict::Regressed)
            .count()
    }

    pub fn has_regressions(&self) -> bool {
        self.regression_count() > 0
    }

    /// Generate human-readable report
    pub fn to_report_string(&self) -> String {
        let mut report = String::new();

        let regressions = self.regression_count();
        let all_insufficient = self
            .outcomes
            .iter()
            .all(|o| o.assessment.verdict == Verdict::InsufficientData);

        if regressions > 0 {
            report.push_str(&format!(
                "❌ REGRESSION DETECTED ({} of {} benchmarks)\n\n",
                regressions,
                self.outcomes.len()
            ));
        } else if all_insufficient {
            report.push_str("⚠️  INSUFFICIENT DATA\n\n");
        } else {
            report.push_str("✅ NO REGRESSION DETECTED\n\n");
        }

        report.push_str(&format!("Suite:  {}\n", self.suite));
        report.push_str(&format!(
            "Commit: {} (record #{})\n\n",
            self.commit_id, self.index
        ));

        for outcome in &self.outcomes {
            let a = &outcome.assessment;
            match (a.center, a.delta) {
                (Some(center), Some(delta)) => {
                    report.push_str(&format!(
                        "  {} {}: {} {} ({}, Δ {:+.1} vs median {:.1} of last {})\n",
                        a.verdict.glyph(),
                        outcome.name,
                        outcome.value,
                        outcome.unit,
                        a.verdict,
                        delta,
                        center,
                        a.window_len
                    ));
                }
                _ => {
                    report.push_str(&format!(
                        "  {} {}: {} {} (insufficient data, {} prior runs)\n",
                        a.verdict.glyph(),
                        outcome.name,
                        outcome.value,
                        outcome.unit,
                        a.window_len
                    ));
                }
            }
        }

        report
    }
}

/// The write path: validation, durable append, regression evaluation.
pub struct Ingestor<'a> {
    store: &'a SeriesStore,
    detector: RegressionDetector,
}

impl<'a> Ingestor<'a> {
    pub fn new(store: &'a SeriesStore, detector: RegressionDetector) -> Self {
        Self { store, detector }
    }

    /// Ingest one record into `suite`.
    ///
    /// Evaluation runs against the exact history prefix that preceded this
    /// append. Because the store is append-only, that prefix is immutable
    /// even while other suites (or later calls on this one) keep writing.
    pub fn ingest(&self, suite: &str, record: RunRecord) -> Result<IngestReport, IngestError> {
        validate_record(&record)?;

        let index = self.store.append(suite, record)?;
        let snapshot = self.store.records_snapshot(suite)?;
        let prior_records = &snapshot[..index];
        let appended = &snapshot[index];

        let mut outcomes = Vec::with_capacity(appended.benches.len());
        for m in &appended.benches {
            let history: Vec<Measurement> = prior_records
                .iter()
                .filter_map(|r| r.measurement(&m.name).cloned())
                .collect();
            let prior = history.last().cloned();
            let assessment = self.detector.evaluate(&m.name, &history, m);
            if assessment.verdict == Verdict::Regressed {
                warn!(
                    suite,
                    bench = %m.name,
                    value = m.value,
                    center = assessment.center,
                    "regression detected"
                );
            }
            outcomes.push(MeasurementOutcome {
                name: m.name.clone(),
                value: m.value,
                unit: m.unit.clone(),
                prior,
                assessment,
            });
        }

        info!(
            suite,
            index,
            benches = outcomes.len(),
            regressions = outcomes
                .iter()
                .filter(|o| o.assessment.verdict == Verdict::Regressed)
                .count(),
            "record ingested"
        );

        Ok(IngestReport {
            suite: suite.to_string(),
            commit_id: appended.commit.id.clone(),
            index,
            date: appended.date,
            outcomes,
        })
    }
}

/// Reject records the store must never see.
fn validate_record(record: &RunRecord) -> Result<(), MalformedRecord> {
    if record.commit.id.is_empty() {
        return Err(MalformedRecord::EmptyCommitId);
    }
    if record.benches.is_empty() {
        return Err(MalformedRecord::NoMeasurements);
    }

    let mut seen = std::collections::HashSet::new();
    for m in &record.benches {
        if m.name.is_empty() {
            return Err(MalformedRecord::EmptyName);
        }
        if m.unit.is_empty() {
            return Err(MalformedRecord::EmptyUnit {
                name: m.name.clone(),
            });
        }
        if !m.value.is_finite() {
            return Err(MalformedRecord::NonFiniteValue {
                name: m.name.clone(),
                value: m.value,
            });
        }
        if m.value < 0.0 {
            return Err(MalformedRecord::NegativeValue {
                name: m.name.clone(),
                value: m.value,
            });
        }
        if !m.range.is_finite() {
            return Err(MalformedRecord::NonFiniteRange {
                name: m.name.clone(),
                range: m.range,
            });
        }
        if m.range < 0.0 {
            return Err(MalformedRecord::NegativeRange {
                name: m.name.clone(),
                range: m.range,
            });
        }
        if !seen.insert(m.name.as_str()) {
            return Err(MalformedRecord::DuplicateName {
                name: m.name.clone(),
            });
        }
    }
    Ok(())
}
