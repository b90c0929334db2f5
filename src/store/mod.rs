//! Append-only benchmark history store
//!
//! [`SeriesStore`] keeps one durable JSON document per suite under a root
//! directory and enforces the history invariants on every append: commit ids
//! are unique per suite, record dates never move backwards beyond the
//! configured clock-skew tolerance, and a benchmark name never changes unit.
//!
//! Concurrency follows single-writer-multiple-readers per suite. Each suite
//! guards its state with an `RwLock`; the record list inside is an `Arc`
//! snapshot, so readers clone the handle and drop the lock immediately.
//! Appends persist to disk first and publish to the snapshot only after the
//! rename commits, which keeps the in-memory view a subset of the durable
//! one.

pub mod document;

pub use document::SuiteDocument;

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info};

use crate::model::{EpochMillis, Measurement, RunRecord};

/// Position of a record within its suite's history, 0-based.
pub type RecordIndex = usize;

/// Errors surfaced by store operations.
///
/// Validation failures ([`Self::is_caller_error`]) mean the input was
/// rejected and the store is unchanged. The remaining variants are
/// infrastructure faults; after a [`StoreError::Timeout`] the record is not
/// committed and the append may be retried whole.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate commit {commit_id} for suite {suite}")]
    DuplicateCommit { suite: String, commit_id: String },

    #[error(
        "record date {date} precedes last stored date {latest} for suite {suite} \
         beyond the {tolerance_ms}ms clock-skew tolerance"
    )]
    OutOfOrder {
        suite: String,
        date: EpochMillis,
        latest: EpochMillis,
        tolerance_ms: u64,
    },

    #[error("unit for {name} in suite {suite} changed from {existing} to {incoming}")]
    SchemaConflict {
        suite: String,
        name: String,
        existing: String,
        incoming: String,
    },

    #[error("flush not confirmed within {waited_ms}ms, record not committed")]
    Timeout { waited_ms: u64 },

    #[error("unknown suite {suite}")]
    UnknownSuite { suite: String },

    #[error("corrupt document at {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        source: Box<serde_json::Error>,
    },

    #[error("store I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("suite state lock poisoned by an earlier panic")]
    LockPoisoned,
}

impl StoreError {
    /// True when the input was rejected and the caller should fix it;
    /// false for infrastructure faults worth retrying or escalating.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            StoreError::DuplicateCommit { .. }
                | StoreError::OutOfOrder { .. }
                | StoreError::SchemaConflict { .. }
                | StoreError::UnknownSuite { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

const SUITE_FILE_EXT: &str = ".json";

/// Durable per-suite history store.
pub struct SeriesStore {
    root: PathBuf,
    repo_url: String,
    skew_tolerance_ms: u64,
    flush_deadline: Duration,
    suites: Mutex<HashMap<String, Arc<Suite>>>,
}

struct Suite {
    id: String,
    path: PathBuf,
    state: RwLock<SuiteState>,
}

/// Mutable per-suite state, guarded by the suite's `RwLock`.
struct SuiteState {
    records: Arc<Vec<RunRecord>>,
    commit_ids: HashSet<String>,
    /// First unit seen per benchmark name; later appends must match.
    units: HashMap<String, String>,
    /// Date of the most recently appended record.
    last_date: EpochMillis,
}

impl SuiteState {
    fn from_records(records: Vec<RunRecord>) -> Self {
        let mut commit_ids = HashSet::new();
        let mut units = HashMap::new();
        let last_date = records.last().map_or(0, |r| r.date);
        for record in &records {
            commit_ids.insert(record.commit.id.clone());
            for m in &record.benches {
                units
                    .entry(m.name.clone())
                    .or_insert_with(|| m.unit.clone());
            }
        }
        Self {
            records: Arc::new(records),
            commit_ids,
            units,
            last_date,
        }
    }
}

impl SeriesStore {
    /// Open a store rooted at `root`. The directory is created on first
    /// append, so opening never touches the filesystem.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            repo_url: String::new(),
            skew_tolerance_ms: 0,
            flush_deadline: Duration::from_secs(5),
            suites: Mutex::new(HashMap::new()),
        }
    }

    /// Repository URL stamped into every persisted document.
    pub fn with_repo_url(mut self, url: impl Into<String>) -> Self {
        self.repo_url = url.into();
        self
    }

    /// Allow record dates to lag the last stored date by up to `ms`.
    /// Zero (the default) demands non-decreasing dates.
    pub fn with_skew_tolerance_ms(mut self, ms: u64) -> Self {
        self.skew_tolerance_ms = ms;
        self
    }

    /// Bound the per-append fsync wait. Past the deadline the append fails
    /// with [`StoreError::Timeout`] and nothing is committed.
    pub fn with_flush_deadline(mut self, deadline: Duration) -> Self {
        self.flush_deadline = deadline;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn repo_url(&self) -> &str {
        &self.repo_url
    }

    /// Validate and append one record to `suite`, creating the suite on
    /// first use. Returns the record's index in the suite history.
    ///
    /// Checks run in a fixed order: duplicate commit, date ordering, unit
    /// stability. The document is persisted before the new state becomes
    /// visible to readers, so a failure at any point leaves the published
    /// history untouched.
    pub fn append(&self, suite: &str, record: RunRecord) -> Result<RecordIndex> {
        let handle = self.suite_handle(suite, true)?.ok_or_else(|| {
            // Unreachable with create = true; keeps the types honest.
            StoreError::UnknownSuite {
                suite: suite.to_string(),
            }
        })?;
        let mut state = handle.state.write().map_err(|_| StoreError::LockPoisoned)?;

        if state.commit_ids.contains(&record.commit.id) {
            return Err(StoreError::DuplicateCommit {
                suite: suite.to_string(),
                commit_id: record.commit.id.clone(),
            });
        }
        if !state.records.is_empty()
            && record.date.saturating_add(self.skew_tolerance_ms) < state.last_date
        {
            return Err(StoreError::OutOfOrder {
                suite: suite.to_string(),
                date: record.date,
                latest: state.last_date,
                tolerance_ms: self.skew_tolerance_ms,
            });
        }
        for m in &record.benches {
            if let Some(existing) = state.units.get(&m.name) {
                if *existing != m.unit {
                    return Err(StoreError::SchemaConflict {
                        suite: suite.to_string(),
                        name: m.name.clone(),
                        existing: existing.clone(),
                        incoming: m.unit.clone(),
                    });
                }
            }
        }

        let index = state.records.len();
        let record_date = record.date;
        let commit_id = record.commit.id.clone();
        let new_units: Vec<(String, String)> = record
            .benches
            .iter()
            .filter(|m| !state.units.contains_key(&m.name))
            .map(|m| (m.name.clone(), m.unit.clone()))
            .collect();

        let mut next = Vec::with_capacity(index + 1);
        next.extend_from_slice(&state.records);
        next.push(record);
        let doc = SuiteDocument::from_records(&handle.id, &self.repo_url, next);
        document::persist_atomic(&self.root, &handle.path, &doc, self.flush_deadline)?;

        // Commit point passed; publish.
        let records = doc.entries.into_values().next().unwrap_or_default();
        state.commit_ids.insert(commit_id);
        state.units.extend(new_units);
        state.last_date = record_date;
        state.records = Arc::new(records);

        info!(suite, index, date = record_date, "record appended");
        Ok(index)
    }

    /// Immutable snapshot of a suite's full history.
    pub fn records_snapshot(&self, suite: &str) -> Result<Arc<Vec<RunRecord>>> {
        match self.suite_handle(suite, false)? {
            Some(handle) => {
                let state = handle.state.read().map_err(|_| StoreError::LockPoisoned)?;
                Ok(Arc::clone(&state.records))
            }
            None => Err(StoreError::UnknownSuite {
                suite: suite.to_string(),
            }),
        }
    }

    /// Lazy walk over one benchmark's history in insertion order. An unknown
    /// suite yields an empty sequence.
    pub fn history(&self, suite: &str, name: &str) -> Result<HistoryIter> {
        let records = match self.suite_handle(suite, false)? {
            Some(handle) => {
                let state = handle.state.read().map_err(|_| StoreError::LockPoisoned)?;
                Arc::clone(&state.records)
            }
            None => Arc::new(Vec::new()),
        };
        Ok(HistoryIter {
            records,
            name: name.to_string(),
            pos: 0,
        })
    }

    /// Most recent measurement recorded under `name`, if any.
    pub fn latest(&self, suite: &str, name: &str) -> Result<Option<Measurement>> {
        let records = match self.suite_handle(suite, false)? {
            Some(handle) => {
                let state = handle.state.read().map_err(|_| StoreError::LockPoisoned)?;
                Arc::clone(&state.records)
            }
            None => return Ok(None),
        };
        Ok(records
            .iter()
            .rev()
            .find_map(|r| r.measurement(name).cloned()))
    }

    /// Suites with at least one committed record, sorted by name.
    pub fn list_suites(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::Io(e)),
        };
        let mut suites = Vec::new();
        for entry in entries {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            let Some(stem) = name.strip_suffix(SUITE_FILE_EXT) else {
                continue;
            };
            if let Some(id) = unescape_suite_id(stem) {
                suites.push(id);
            }
        }
        suites.sort();
        Ok(suites)
    }

    /// Look up (and on a miss, load or create) the cached handle for `suite`.
    fn suite_handle(&self, suite: &str, create: bool) -> Result<Option<Arc<Suite>>> {
        let mut map = self.suites.lock().map_err(|_| StoreError::LockPoisoned)?;
        if let Some(handle) = map.get(suite) {
            return Ok(Some(Arc::clone(handle)));
        }

        let path = self.suite_path(suite);
        let records = match document::load(&path)? {
            Some(doc) => {
                debug!(suite, path = %path.display(), "suite loaded from disk");
                doc.entries.get(suite).cloned().unwrap_or_default()
            }
            None if create => Vec::new(),
            None => return Ok(None),
        };

        let handle = Arc::new(Suite {
            id: suite.to_string(),
            path,
            state: RwLock::new(SuiteState::from_records(records)),
        });
        map.insert(suite.to_string(), Arc::clone(&handle));
        Ok(Some(handle))
    }

    fn suite_path(&self, suite: &str) -> PathBuf {
        self.root
            .join(format!("{}{SUITE_FILE_EXT}", escape_suite_id(suite)))
    }
}

/// Lazy, restartable view of one benchmark's history.
///
/// Holds an `Arc` snapshot, so it stays valid and stable while later appends
/// land. Records that do not carry the benchmark are skipped.
#[derive(Clone)]
pub struct HistoryIter {
    records: Arc<Vec<RunRecord>>,
    name: String,
    pos: usize,
}

impl HistoryIter {
    /// Rewind to the start of the history.
    pub fn restart(&mut self) {
        self.pos = 0;
    }
}

impl Iterator for HistoryIter {
    type Item = (EpochMillis, Measurement);

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos < self.records.len() {
            let record = &self.records[self.pos];
            self.pos += 1;
            if let Some(m) = record.measurement(&self.name) {
                return Some((record.date, m.clone()));
            }
        }
        None
    }
}

/// Encode a suite id as a filesystem-safe file stem. ASCII alphanumerics,
/// `-`, `_` and `.` pass through; every other byte becomes `%XX`.
fn escape_suite_id(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for byte in id.bytes() {
        match byte {
            b'0'..=b'9' | b'A'..=b'Z' | b'a'..=b'z' | b'-' | b'_' | b'.' => {
                out.push(byte as char);
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// Decode a file stem produced by [`escape_suite_id`]. `None` when the stem
/// carries malformed escapes or non-UTF-8 payloads.
fn unescape_suite_id(stem: &str) -> Option<String> {
    let bytes = stem.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hi = hex_value(*bytes.get(i + 1)?)?;
            let lo = hex_value(*bytes.get(i + 2)?)?;
            out.push(hi * 16 + lo);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        _ => None,
    }
}
