//! Property tests for the aggregator: totality, bounded rates, partition
//! accounting, and JSON round-trip idempotence.

use proptest::prelude::*;

use mount_visibility_tester::report::model::{Outcome, Sample, TestType};
use mount_visibility_tester::report::stats::summarize;

fn arb_outcome() -> impl Strategy<Value = Outcome> {
    prop_oneof![
        Just(Outcome::Ok),
        Just(Outcome::Timeout),
        Just(Outcome::Error),
    ]
}

fn arb_test_type() -> impl Strategy<Value = TestType> {
    prop_oneof![Just(TestType::File), Just(TestType::Directory)]
}

prop_compose! {
    fn arb_sample_parts()(
        test_type in arb_test_type(),
        outcome in arb_outcome(),
        latency in 0.0_f64..10_000.0,
        environment_id in 0_usize..4,
    ) -> (TestType, Outcome, f64, usize) {
        (test_type, outcome, latency, environment_id)
    }
}

fn build_samples(parts: Vec<(TestType, Outcome, f64, usize)>) -> Vec<Sample> {
    parts
        .into_iter()
        .enumerate()
        .map(|(i, (test_type, outcome, latency, environment_id))| Sample {
            sample_id: i as u64,
            test_type,
            environment_id,
            outcome,
            latency_ms: (outcome == Outcome::Ok).then_some(latency),
            host_commit_time: (outcome != Outcome::Error)
                .then(|| "2026-08-05T10:00:00.000000Z".to_string()),
            observed_time: (outcome == Outcome::Ok)
                .then(|| "2026-08-05T10:00:00.001000Z".to_string()),
            error_detail: (outcome == Outcome::Error).then(|| "synthetic failure".to_string()),
        })
        .collect()
}

proptest! {
    #[test]
    fn success_rate_is_bounded(parts in proptest::collection::vec(arb_sample_parts(), 0..64)) {
        let samples = build_samples(parts);
        let summary = summarize(&samples);
        prop_assert!((0.0..=1.0).contains(&summary.success_rate));
        prop_assert!((0.0..=1.0).contains(&summary.file.success_rate));
        prop_assert!((0.0..=1.0).contains(&summary.directory.success_rate));
    }

    #[test]
    fn partitions_account_for_every_sample(parts in proptest::collection::vec(arb_sample_parts(), 0..64)) {
        let samples = build_samples(parts);
        let summary = summarize(&samples);
        prop_assert_eq!(
            summary.file.attempted + summary.directory.attempted,
            summary.total_samples
        );
        prop_assert_eq!(
            summary.ok_count + summary.timeout_count + summary.error_count,
            summary.total_samples
        );
        prop_assert_eq!(
            summary.file.ok_count + summary.directory.ok_count,
            summary.ok_count
        );
    }

    #[test]
    fn stats_present_iff_ok_samples_exist(parts in proptest::collection::vec(arb_sample_parts(), 0..64)) {
        let samples = build_samples(parts);
        let summary = summarize(&samples);
        prop_assert_eq!(summary.overall.is_some(), summary.ok_count > 0);
        if let Some(stats) = &summary.overall {
            prop_assert_eq!(stats.count, summary.ok_count);
            prop_assert!(stats.min <= stats.median && stats.median <= stats.max);
            prop_assert!(stats.p95 <= stats.max && stats.p99 <= stats.max);
            prop_assert!(stats.std_dev >= 0.0);
        }
    }

    #[test]
    fn summary_survives_json_round_trip(parts in proptest::collection::vec(arb_sample_parts(), 0..64)) {
        let samples = build_samples(parts);
        let summary = summarize(&samples);

        // Samples serialized and re-parsed must summarize identically, and
        // the summary itself must round-trip bit-exact.
        let raw_samples = serde_json::to_string(&samples).unwrap();
        let reparsed: Vec<Sample> = serde_json::from_str(&raw_samples).unwrap();
        prop_assert_eq!(summarize(&reparsed), summary.clone());

        let raw_summary = serde_json::to_string(&summary).unwrap();
        let reloaded = serde_json::from_str::<mount_visibility_tester::report::stats::Summary>(&raw_summary).unwrap();
        prop_assert_eq!(reloaded, summary);
    }
}
