//! Property-based tests for the wire codec, store, and detector
//!
//! Core laws tested:
//! 1. Range literals round-trip exactly through format and parse
//! 2. History is append-only and grows by exactly one per accepted record
//! 3. The detector is total and deterministic over arbitrary windows
//! 4. A regression verdict always lies outside the tolerance band
//! 5. Suite names survive filesystem escaping verbatim
//! 6. Name patterns match their own name and one-segment wildcards

mod utils;

use proptest::prelude::*;
use utils::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_range_literal_round_trips(half_width in 0.0f64..1e12) {
        use bench_store::model::{format_range, parse_range};

        // Property: formatting then parsing recovers the exact value
        let literal = format_range(half_width);
        assert!(literal.starts_with("± "));
        assert_eq!(parse_range(&literal), Ok(half_width));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(30))]

    #[test]
    fn prop_history_is_append_only(values in prop::collection::vec(1.0f64..1e6, 1..12)) {
        use bench_store::store::SeriesStore;

        let dir = tempfile::tempdir().unwrap();
        let store = SeriesStore::new(dir.path());

        // Property: each accepted append grows the suite by exactly one
        // record and never disturbs what came before
        for (i, value) in values.iter().enumerate() {
            store
                .append(
                    "suite",
                    record(&format!("c{i}"), (i as u64 + 1) * 10, vec![bench("fib", *value, 1.0)]),
                )
                .unwrap();

            let snapshot = store.records_snapshot("suite").unwrap();
            assert_eq!(snapshot.len(), i + 1);
            assert_eq!(snapshot[0].commit.id, "c0");
            assert_eq!(snapshot[i].benches[0].value, *value);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_detector_is_total_and_deterministic(
        window in prop::collection::vec((0.0f64..1e9, 0.0f64..1e6), 0..8),
        new_value in 0.0f64..1e9,
        new_range in 0.0f64..1e6,
    ) {
        use bench_store::model::Measurement;
        use bench_store::regression::{DetectorConfig, RegressionDetector, Verdict};

        let history: Vec<Measurement> = window
            .iter()
            .map(|(v, r)| Measurement::new("b", *v, *r, "ns/iter"))
            .collect();
        let new = Measurement::new("b", new_value, new_range, "ns/iter");

        // Property: same inputs, same assessment, every time
        let detector = RegressionDetector::new(DetectorConfig::default());
        let first = detector.evaluate("b", &history, &new);
        let second = detector.evaluate("b", &history, &new);
        assert_eq!(first, second);

        if history.len() < 2 {
            assert_eq!(first.verdict, Verdict::InsufficientData);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_regression_lies_outside_the_band(
        window in prop::collection::vec((1.0f64..1e6, 0.0f64..1e3), 2..8),
        new_value in 0.0f64..2e6,
    ) {
        use bench_store::model::Measurement;
        use bench_store::regression::{DetectorConfig, RegressionDetector, Verdict};

        let history: Vec<Measurement> = window
            .iter()
            .map(|(v, r)| Measurement::new("b", *v, *r, "ns/iter"))
            .collect();
        let new = Measurement::new("b", new_value, 0.0, "ns/iter");

        let assessment =
            RegressionDetector::new(DetectorConfig::default()).evaluate("b", &history, &new);

        // Property: the verdict agrees with the band arithmetic
        let center = assessment.center.unwrap();
        let margin = assessment.margin.unwrap();
        match assessment.verdict {
            Verdict::Regressed => assert!(new_value > center + margin),
            Verdict::Improved => assert!(new_value < center - margin),
            Verdict::Stable => {
                assert!(new_value >= center - margin && new_value <= center + margin);
            }
            Verdict::InsufficientData => panic!("window holds at least two points"),
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(30))]

    #[test]
    fn prop_suite_names_round_trip_through_the_filesystem(suite in "[ -~]{1,12}") {
        use bench_store::store::SeriesStore;

        let dir = tempfile::tempdir().unwrap();
        let store = SeriesStore::new(dir.path());
        store
            .append(&suite, record("c1", 1, vec![bench("fib", 100.0, 5.0)]))
            .unwrap();

        // Property: whatever the suite is called, a reopened store lists it
        // verbatim and can read it back
        let reopened = SeriesStore::new(dir.path());
        assert_eq!(reopened.list_suites().unwrap(), vec![suite.clone()]);
        assert_eq!(reopened.records_snapshot(&suite).unwrap().len(), 1);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_pattern_matches_its_own_name(
        segments in prop::collection::vec("[a-z0-9_]{1,8}", 1..4),
    ) {
        use bench_store::query::NamePattern;

        let name = segments.join("/");

        // Property: a pattern equal to the name always matches
        assert!(NamePattern::parse(&name).matches(&name));

        // A wildcard in any one position still matches
        for i in 0..segments.len() {
            let mut with_star = segments.clone();
            with_star[i] = "*".to_string();
            assert!(NamePattern::parse(&with_star.join("/")).matches(&name));
        }

        // An extra trailing segment never matches
        let longer = format!("{name}/extra");
        assert!(!NamePattern::parse(&name).matches(&longer));
    }
}
