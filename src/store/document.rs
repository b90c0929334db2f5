//! On-disk document format and atomic persistence
//!
//! Each suite lives in its own JSON document under the store root. The shape
//! matches what chart renderers consume: a `lastUpdate` timestamp, the
//! repository URL, and an `entries` map from suite name to its run history.
//!
//! Persistence is write-temp, fsync, rename. The rename is the commit point;
//! a crash or a blown flush deadline before it leaves the previous document
//! intact.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::{Result, StoreError};
use crate::model::{EpochMillis, RunRecord};

/// One suite's complete history in wire form.
///
/// `entries` is ordered so repeated serialization of the same history is
/// byte-identical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteDocument {
    /// Timestamp of the newest record in the document.
    pub last_update: EpochMillis,
    pub repo_url: String,
    pub entries: BTreeMap<String, Vec<RunRecord>>,
}

impl SuiteDocument {
    /// Build a document holding one suite's records.
    ///
    /// `last_update` is derived from the records rather than the wall clock,
    /// so exporting the same history twice yields the same bytes.
    pub fn from_records(suite: &str, repo_url: &str, records: Vec<RunRecord>) -> Self {
        let last_update = records.iter().map(|r| r.date).max().unwrap_or(0);
        let mut entries = BTreeMap::new();
        entries.insert(suite.to_string(), records);
        Self {
            last_update,
            repo_url: repo_url.to_string(),
            entries,
        }
    }

    /// Records for `suite`, empty if the document does not carry it.
    pub fn records(&self, suite: &str) -> &[RunRecord] {
        self.entries.get(suite).map_or(&[], Vec::as_slice)
    }

    /// Canonical serialization used for both store files and exports.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        let mut out = serde_json::to_string_pretty(self)?;
        out.push('\n');
        Ok(out)
    }
}

/// Read a suite document, `None` if the file does not exist yet.
pub fn load(path: &Path) -> Result<Option<SuiteDocument>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::Io(e)),
    };
    let doc = serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt {
        path: path.to_path_buf(),
        source: Box::new(source),
    })?;
    Ok(Some(doc))
}

/// Atomically replace the document at `path` with `doc`.
///
/// The temp file is created in `dir` (same filesystem as `path`) so the final
/// rename cannot cross devices. The data fsync runs on a helper thread and is
/// bounded by `flush_deadline`; if the disk stalls past the deadline the temp
/// file is discarded and the previous document stays in place.
pub fn persist_atomic(
    dir: &Path,
    path: &Path,
    doc: &SuiteDocument,
    flush_deadline: Duration,
) -> Result<()> {
    let body = doc
        .to_json_pretty()
        .map_err(|e| StoreError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))?;

    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(body.as_bytes())?;
    tmp.flush()?;

    let (file, temp_path) = tmp.into_parts();
    let (done_tx, done_rx) = mpsc::channel();
    thread::spawn(move || {
        let outcome = file.sync_all();
        // Receiver may be gone if the deadline already fired.
        let _ = done_tx.send((file, outcome));
    });

    match done_rx.recv_timeout(flush_deadline) {
        Ok((file, outcome)) => {
            outcome?;
            let tmp = NamedTempFile::from_parts(file, temp_path);
            tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
        }
        Err(_) => {
            warn!(
                path = %path.display(),
                deadline_ms = flush_deadline.as_millis() as u64,
                "flush deadline exceeded, discarding uncommitted write"
            );
            // Unlink the orphaned temp file; the sync thread still holds the
            // open handle and finishes against the unlinked inode.
            drop(temp_path);
            return Err(StoreError::Timeout {
                waited_ms: flush_deadline.as_millis() as u64,
            });
        }
    }

    // Make the rename itself durable.
    File::open(dir)?.sync_all()?;
    debug!(path = %path.display(), bytes = body.len(), "document persisted");
    Ok(())
}
