//! Read-only projections of the store
//!
//! [`QueryService`] is the thin read boundary external renderers and CI
//! scripts talk to. Nothing here mutates the store; everything works off
//! immutable snapshots, so queries never block ingestion on other suites.
//!
//! Benchmark names are opaque keys everywhere else in the crate. The one
//! place the conventional `suite/variant/param` hierarchy is interpreted is
//! [`NamePattern`], which splits on `/` for wildcard matching.

use serde::Serialize;

use crate::model::EpochMillis;
use crate::regression::SeriesStats;
use crate::store::{Result, SeriesStore, SuiteDocument};

/// Benchmark-name filter with per-segment wildcards.
///
/// A pattern is `/`-separated segments; `*` matches exactly one segment.
/// `add/*` matches `add/interpreter` but not `add` or `add/wasm/simd`.
/// The empty pattern matches everything.
#[derive(Debug, Clone)]
pub struct NamePattern {
    /// Segments to match against (None = match all names)
    segments: Option<Vec<String>>,
}

impl NamePattern {
    /// Create a pattern that matches every benchmark name.
    pub fn all() -> Self {
        Self { segments: None }
    }

    /// Parse a pattern expression like `add/interpreter` or `add/*`.
    pub fn parse(expr: &str) -> Self {
        if expr.is_empty() {
            return Self::all();
        }
        Self {
            segments: Some(expr.split('/').map(str::to_string).collect()),
        }
    }

    /// Check whether a benchmark name matches this pattern.
    pub fn matches(&self, name: &str) -> bool {
        let Some(segments) = &self.segments else {
            return true;
        };
        let name_segments: Vec<&str> = name.split('/').collect();
        if name_segments.len() != segments.len() {
            return false;
        }
        segments
            .iter()
            .zip(&name_segments)
            .all(|(pattern, actual)| pattern == "*" || pattern == actual)
    }
}

impl Default for NamePattern {
    fn default() -> Self {
        Self::all()
    }
}

/// One dated point of a benchmark series. The range is the typed half-width,
/// not the wire string.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub date: EpochMillis,
    pub commit: String,
    pub value: f64,
    pub range: f64,
}

/// Full history of one benchmark, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesView {
    pub name: String,
    pub unit: String,
    pub points: Vec<SeriesPoint>,
}

/// Descriptive statistics for one benchmark's value series.
#[derive(Debug, Clone, Serialize)]
pub struct BenchSummary {
    pub name: String,
    pub unit: String,
    pub stats: SeriesStats,
}

/// Read boundary over a [`SeriesStore`].
pub struct QueryService<'a> {
    store: &'a SeriesStore,
}

impl<'a> QueryService<'a> {
    pub fn new(store: &'a SeriesStore) -> Self {
        Self { store }
    }

    /// Suites with committed history, sorted.
    pub fn list_suites(&self) -> Result<Vec<String>> {
        self.store.list_suites()
    }

    /// Distinct benchmark names in a suite, sorted.
    pub fn list_benchmarks(&self, suite: &str) -> Result<Vec<String>> {
        let records = self.store.records_snapshot(suite)?;
        let names: std::collections::BTreeSet<String> = records
            .iter()
            .flat_map(|r| r.benches.iter().map(|m| m.name.clone()))
            .collect();
        Ok(names.into_iter().collect())
    }

    /// The full suite document, byte-identical to what the store persists.
    pub fn export(&self, suite: &str) -> Result<SuiteDocument> {
        let records = self.store.records_snapshot(suite)?;
        Ok(SuiteDocument::from_records(
            suite,
            self.store.repo_url(),
            records.as_ref().clone(),
        ))
    }

    /// Per-benchmark series matching `pattern`, sorted by name.
    pub fn series(&self, suite: &str, pattern: &NamePattern) -> Result<Vec<SeriesView>> {
        let records = self.store.records_snapshot(suite)?;
        let mut by_name: std::collections::BTreeMap<String, SeriesView> =
            std::collections::BTreeMap::new();

        for record in records.iter() {
            for m in &record.benches {
                if !pattern.matches(&m.name) {
                    continue;
                }
                let view = by_name
                    .entry(m.name.clone())
                    .or_insert_with(|| SeriesView {
                        name: m.name.clone(),
                        unit: m.unit.clone(),
                        points: Vec::new(),
                    });
                view.points.push(SeriesPoint {
                    date: record.date,
                    commit: record.commit.id.clone(),
                    value: m.value,
                    range: m.range,
                });
            }
        }

        Ok(by_name.into_values().collect())
    }

    /// Descriptive statistics per matching benchmark, sorted by name.
    pub fn summaries(&self, suite: &str, pattern: &NamePattern) -> Result<Vec<BenchSummary>> {
        let series = self.series(suite, pattern)?;
        Ok(series
            .into_iter()
            .filter_map(|view| {
                let values: Vec<f64> = view.points.iter().map(|p| p.value).collect();
                SeriesStats::from_values(&values).map(|stats| BenchSummary {
                    name: view.name,
                    unit: view.unit,
                    stats,
                })
            })
            .collect())
    }
}

/// Render series as CSV for spreadsheet analysis and machine parsing.
///
/// One row per point, flattened across series.
pub fn series_to_csv(series: &[SeriesView]) -> String {
    let mut output = String::new();
    output.push_str("name,date,commit,value,range,unit\n");

    for view in series {
        for point in &view.points {
            output.push_str(&format!(
                "{},{},{},{},{},{}\n",
                escape_field(&view.name),
                point.date,
                escape_field(&point.commit),
                point.value,
                point.range,
                escape_field(&view.unit)
            ));
        }
    }

    output
}

/// Render per-benchmark summaries as CSV, one row per benchmark.
pub fn summaries_to_csv(summaries: &[BenchSummary]) -> String {
    let mut output = String::new();
    output.push_str("name,count,mean,stddev,min,max,median,p90,p99,unit\n");

    for summary in summaries {
        let s = &summary.stats;
        output.push_str(&format!(
            "{},{},{},{},{},{},{},{},{},{}\n",
            escape_field(&summary.name),
            s.count,
            s.mean,
            s.stddev,
            s.min,
            s.max,
            s.median,
            s.p90,
            s.p99,
            escape_field(&summary.unit)
        ));
    }

    output
}

/// Escape CSV field (handle commas, quotes, newlines)
fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CommitInfo, GitUser, Measurement, RunRecord};
    use crate::store::StoreError;

    fn record(id: &str, date: EpochMillis, benches: Vec<Measurement>) -> RunRecord {
        RunRecord {
            commit: CommitInfo {
                author: GitUser::named("Ada"),
                committer: GitUser::named("Ada"),
                id: id.to_string(),
                message: "m".to_string(),
                timestamp: "2024-05-01T10:00:00Z".to_string(),
                url: None,
                tree_id: None,
                distinct: None,
            },
            date,
            tool: "cargo".to_string(),
            benches,
        }
    }

    fn seeded_store(dir: &tempfile::TempDir) -> SeriesStore {
        let store = SeriesStore::new(dir.path()).with_repo_url("https://example.com/repo");
        store
            .append(
                "vm",
                record(
                    "c1",
                    100,
                    vec![
                        Measurement::new("add/interpreter", 978.0, 88.0, "ns/iter"),
                        Measurement::new("add/wasm", 120.0, 9.0, "ns/iter"),
                    ],
                ),
            )
            .unwrap();
        store
            .append(
                "vm",
                record(
                    "c2",
                    200,
                    vec![
                        Measurement::new("add/interpreter", 1061.0, 105.0, "ns/iter"),
                        Measurement::new("mul/interpreter", 1500.0, 80.0, "ns/iter"),
                    ],
                ),
            )
            .unwrap();
        store
    }

    #[test]
    fn test_pattern_all_matches_everything() {
        let pattern = NamePattern::all();
        assert!(pattern.matches("anything"));
        assert!(pattern.matches("a/b/c"));
        assert!(NamePattern::parse("").matches("x/y"));
    }

    #[test]
    fn test_pattern_exact_match() {
        let pattern = NamePattern::parse("add/interpreter");
        assert!(pattern.matches("add/interpreter"));
        assert!(!pattern.matches("add/wasm"));
        assert!(!pattern.matches("add"));
        assert!(!pattern.matches("add/interpreter/extra"));
    }

    #[test]
    fn test_pattern_wildcard_matches_one_segment() {
        let pattern = NamePattern::parse("add/*");
        assert!(pattern.matches("add/interpreter"));
        assert!(pattern.matches("add/wasm"));
        assert!(!pattern.matches("mul/interpreter"));
        assert!(!pattern.matches("add"));
        assert!(!pattern.matches("add/wasm/simd"));
    }

    #[test]
    fn test_pattern_wildcard_in_the_middle() {
        let pattern = NamePattern::parse("*/interpreter");
        assert!(pattern.matches("add/interpreter"));
        assert!(pattern.matches("mul/interpreter"));
        assert!(!pattern.matches("add/wasm"));
    }

    #[test]
    fn test_list_benchmarks_sorted_and_distinct() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(&dir);
        let query = QueryService::new(&store);

        assert_eq!(
            query.list_benchmarks("vm").unwrap(),
            vec![
                "add/interpreter".to_string(),
                "add/wasm".to_string(),
                "mul/interpreter".to_string()
            ]
        );
    }

    #[test]
    fn test_unknown_suite_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(&dir);
        let query = QueryService::new(&store);

        for result in [
            query.list_benchmarks("ghost").err(),
            query.export("ghost").err(),
            query.series("ghost", &NamePattern::all()).err(),
        ] {
            assert!(matches!(result, Some(StoreError::UnknownSuite { .. })));
        }
    }

    #[test]
    fn test_series_groups_points_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(&dir);
        let query = QueryService::new(&store);

        let series = query.series("vm", &NamePattern::all()).unwrap();
        assert_eq!(series.len(), 3);

        let interp = &series[0];
        assert_eq!(interp.name, "add/interpreter");
        assert_eq!(interp.unit, "ns/iter");
        assert_eq!(interp.points.len(), 2);
        assert_eq!(interp.points[0].commit, "c1");
        assert_eq!(interp.points[0].value, 978.0);
        assert_eq!(interp.points[1].date, 200);

        // add/wasm only appears in the first record.
        assert_eq!(series[1].points.len(), 1);
    }

    #[test]
    fn test_series_respects_pattern() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(&dir);
        let query = QueryService::new(&store);

        let series = query.series("vm", &NamePattern::parse("add/*")).unwrap();
        let names: Vec<_> = series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["add/interpreter", "add/wasm"]);
    }

    #[test]
    fn test_export_document_shape() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(&dir);
        let query = QueryService::new(&store);

        let doc = query.export("vm").unwrap();
        assert_eq!(doc.repo_url, "https://example.com/repo");
        assert_eq!(doc.last_update, 200);
        assert_eq!(doc.records("vm").len(), 2);
    }

    #[test]
    fn test_export_matches_persisted_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(&dir);
        let query = QueryService::new(&store);

        let exported = query.export("vm").unwrap().to_json_pretty().unwrap();
        let on_disk = std::fs::read_to_string(dir.path().join("vm.json")).unwrap();
        assert_eq!(exported, on_disk);
    }

    #[test]
    fn test_summaries_compute_stats_per_bench() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(&dir);
        let query = QueryService::new(&store);

        let summaries = query
            .summaries("vm", &NamePattern::parse("add/interpreter"))
            .unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].stats.count, 2);
        assert_eq!(summaries[0].stats.min, 978.0);
        assert_eq!(summaries[0].stats.max, 1061.0);
    }

    #[test]
    fn test_csv_flattens_series() {
        let series = vec![SeriesView {
            name: "add/interpreter".to_string(),
            unit: "ns/iter".to_string(),
            points: vec![
                SeriesPoint {
                    date: 100,
                    commit: "c1".to_string(),
                    value: 978.0,
                    range: 88.0,
                },
                SeriesPoint {
                    date: 200,
                    commit: "c2".to_string(),
                    value: 1061.0,
                    range: 105.0,
                },
            ],
        }];

        let csv = series_to_csv(&series);
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines[0], "name,date,commit,value,range,unit");
        assert_eq!(lines[1], "add/interpreter,100,c1,978,88,ns/iter");
        assert_eq!(lines[2], "add/interpreter,200,c2,1061,105,ns/iter");
    }

    #[test]
    fn test_csv_escapes_awkward_fields() {
        assert_eq!(escape_field("plain"), "plain");
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_summaries_csv_one_row_per_bench() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(&dir);
        let query = QueryService::new(&store);

        let summaries = query.summaries("vm", &NamePattern::all()).unwrap();
        let csv = summaries_to_csv(&summaries);
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines[0], "name,count,mean,stddev,min,max,median,p90,p99,unit");
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("add/interpreter,2,"));
        assert!(lines[1].ends_with(",ns/iter"));
        assert!(lines[3].starts_with("mul/interpreter,1,"));
    }
}
