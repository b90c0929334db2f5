// Shared builders for integration tests
#![allow(dead_code)] // not every test binary uses every helper

use bench_store::model::{CommitInfo, EpochMillis, GitUser, Measurement, RunRecord};

pub fn commit(id: &str) -> CommitInfo {
    CommitInfo {
        author: GitUser::named("Ada Lovelace"),
        committer: GitUser::named("Ada Lovelace"),
        id: id.to_string(),
        message: format!("commit {id}"),
        timestamp: "2024-05-01T10:00:00Z".to_string(),
        url: None,
        tree_id: None,
        distinct: None,
    }
}

pub fn bench(name: &str, value: f64, range: f64) -> Measurement {
    Measurement::new(name, value, range, "ns/iter")
}

pub fn record(id: &str, date: EpochMillis, benches: Vec<Measurement>) -> RunRecord {
    RunRecord {
        commit: commit(id),
        date,
        tool: "cargo".to_string(),
        benches,
    }
}

/// Raw input JSON the way a harness wrapper would emit it.
pub fn raw_record_json(id: &str, date: EpochMillis, name: &str, value: f64, range: f64) -> String {
    format!(
        r#"{{
  "commit": {{
    "author": {{"name": "Ada Lovelace"}},
    "committer": {{"name": "Ada Lovelace"}},
    "id": "{id}",
    "message": "commit {id}",
    "timestamp": "2024-05-01T10:00:00Z"
  }},
  "date": {date},
  "tool": "cargo",
  "benches": [
    {{"name": "{name}", "value": {value}, "range": "± {range}", "unit": "ns/iter"}}
  ]
}}"#
    )
}
