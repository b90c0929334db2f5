//! Core data model for benchmark histories
//!
//! One [`RunRecord`] is a single commit's full set of measurements plus the
//! commit metadata that produced it. Records serialize to the exact JSON shape
//! consumed by downstream chart renderers, including the `"± <number>"` range
//! string. In memory the range is a typed `f64` half-width; the string form
//! exists only at the serde boundary.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Milliseconds since the Unix epoch, the timestamp unit used throughout.
pub type EpochMillis = u64;

/// Current wall-clock time as epoch milliseconds.
pub fn now_epoch_millis() -> EpochMillis {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as EpochMillis
}

/// One named statistic produced by a benchmark harness.
///
/// `name` is treated as an opaque key by the store; the conventional
/// `suite/variant/param` hierarchy is only interpreted by the query layer's
/// pattern matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Benchmark identifier, unique within one record.
    pub name: String,
    /// Central estimate (commonly nanoseconds per iteration).
    pub value: f64,
    /// Symmetric uncertainty half-width, same unit as `value`.
    #[serde(
        serialize_with = "range_codec::serialize",
        deserialize_with = "range_codec::deserialize"
    )]
    pub range: f64,
    /// Unit label, e.g. `ns/iter`. Stable per `name` across a suite's history.
    pub unit: String,
}

impl Measurement {
    /// Create a measurement.
    pub fn new(name: impl Into<String>, value: f64, range: f64, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value,
            range,
            unit: unit.into(),
        }
    }
}

/// Author or committer identity as emitted by the forge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitUser {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl GitUser {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: None,
            username: None,
        }
    }
}

/// Commit metadata attached to a run record.
///
/// `timestamp` is the forge-provided ISO-8601 author time and is carried
/// verbatim; chronology inside the store is decided by [`RunRecord::date`]
/// alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    pub author: GitUser,
    pub committer: GitUser,
    /// Content hash identifying the commit. Unique per suite.
    pub id: String,
    pub message: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tree_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distinct: Option<bool>,
}

/// One commit's full set of measurements plus metadata.
///
/// `date` is the ingestion timestamp ("when measured"), independent of the
/// commit's author time, and is the ordering key the store enforces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub commit: CommitInfo,
    pub date: EpochMillis,
    pub tool: String,
    /// Measurements in harness emission order. Names are unique per record.
    pub benches: Vec<Measurement>,
}

impl RunRecord {
    /// Look up one measurement by exact name.
    pub fn measurement(&self, name: &str) -> Option<&Measurement> {
        self.benches.iter().find(|m| m.name == name)
    }
}

/// Error from parsing a `"± <number>"` range literal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid range literal {literal:?}")]
pub struct RangeParseError {
    pub literal: String,
}

/// Render a range half-width in the wire form, e.g. `"± 88"`.
///
/// Uses `f64` display formatting, so whole numbers carry no trailing `.0`,
/// matching the form existing consumers expect.
pub fn format_range(half_width: f64) -> String {
    format!("± {half_width}")
}

/// Parse a range literal back into a half-width.
///
/// Accepts the canonical `"± <number>"` form (whitespace after the sign is
/// optional) and, leniently, a bare number. Sign and finiteness are *not*
/// checked here; the ingest path rejects negative or non-finite ranges so
/// that a malformed record fails loudly rather than being clamped at parse
/// time.
pub fn parse_range(literal: &str) -> Result<f64, RangeParseError> {
    let trimmed = literal.trim();
    let body = trimmed
        .strip_prefix('±')
        .map(str::trim_start)
        .unwrap_or(trimmed);
    body.parse::<f64>().map_err(|_| RangeParseError {
        literal: literal.to_string(),
    })
}

/// Serde adapter keeping the stringly-typed range out of the in-memory model.
mod range_codec {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(range: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_range(*range))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        let literal = String::deserialize(deserializer)?;
        super::parse_range(&literal).map_err(serde::de::Error::custom)
    }
}
