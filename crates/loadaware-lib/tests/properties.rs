//! Property tests for the evaluation core.

use chrono::{DateTime, Duration, TimeZone, Utc};
use loadaware_lib::aggregation::target_aggregated_usage;
use loadaware_lib::args::{AggregatedArgs, LoadAwareArgs, UsageThresholds};
use loadaware_lib::daemon::is_daemon_set_pod;
use loadaware_lib::freshness::is_node_metric_expired;
use loadaware_lib::thresholds::{resolve_profile, CustomAggregatedUsage, CustomUsageThresholds};
use loadaware_lib::workload::{sum_pod_usages, EstimationSet, PodMetricMap};
use loadaware_lib::*;
use proptest::prelude::*;
use std::collections::{BTreeMap, HashMap};

// ---------------------------------------------------------------------------
// Helpers / Strategies
// ---------------------------------------------------------------------------

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

fn cpu(value: i64) -> ResourceList {
    [(ResourceName::Cpu, value)].into_iter().collect()
}

fn snapshot(update_time: Option<DateTime<Utc>>, info: NodeMetricInfo) -> NodeMetric {
    let mut metric = NodeMetric::default();
    metric.status.update_time = update_time;
    metric.status.node_metric = Some(info);
    metric
}

fn window(seconds: u64, usage: ResourceList) -> AggregatedUsage {
    AggregatedUsage {
        duration: std::time::Duration::from_secs(seconds),
        usage: HashMap::from([(AggregationType::Avg, usage)]),
    }
}

/// Windows with small, often repeated durations. Non-empty samples carry
/// `index + 1` so the chosen entry can be identified.
fn arb_windows() -> impl Strategy<Value = Vec<AggregatedUsage>> {
    prop::collection::vec((1u64..6, any::<bool>()), 0..8).prop_map(|entries| {
        entries
            .into_iter()
            .enumerate()
            .map(|(index, (minutes, filled))| {
                let usage = if filled { cpu(index as i64 + 1) } else { ResourceList::new() };
                window(minutes * 60, usage)
            })
            .collect()
    })
}

fn arb_thresholds() -> impl Strategy<Value = UsageThresholds> {
    prop::collection::btree_map(
        prop_oneof![Just(ResourceName::Cpu), Just(ResourceName::Memory)],
        0i64..=100,
        0..3,
    )
}

fn arb_aggregation_type() -> impl Strategy<Value = AggregationType> {
    prop_oneof![
        Just(AggregationType::Avg),
        Just(AggregationType::P50),
        Just(AggregationType::P90),
        Just(AggregationType::P95),
        Just(AggregationType::P99),
    ]
}

fn arb_args() -> impl Strategy<Value = LoadAwareArgs> {
    (
        arb_thresholds(),
        arb_thresholds(),
        arb_thresholds(),
        prop::option::of(arb_aggregation_type()),
        prop::option::of(1u64..3600),
    )
        .prop_map(|(usage, prod, aggregated, aggregation_type, seconds)| LoadAwareArgs {
            usage_thresholds: usage,
            prod_usage_thresholds: prod,
            aggregated: Some(AggregatedArgs {
                usage_thresholds: aggregated,
                usage_aggregation_type: aggregation_type,
                usage_aggregated_duration: seconds.map(std::time::Duration::from_secs),
                ..Default::default()
            }),
            ..Default::default()
        })
}

fn arb_owner_kinds() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(
        prop_oneof![
            Just("DaemonSet".to_string()),
            Just("ReplicaSet".to_string()),
            Just("StatefulSet".to_string()),
            Just("Job".to_string()),
        ],
        0..4,
    )
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn non_positive_expiration_never_expires(expiration in -1000i64..=0, age in -100_000i64..100_000) {
        let now = base_time();
        let metric = snapshot(Some(now - Duration::seconds(age)), NodeMetricInfo::default());
        prop_assert!(!is_node_metric_expired(Some(&metric), expiration, now));
    }

    #[test]
    fn positive_expiration_compares_elapsed_time(expiration in 1i64..100_000, age in -100_000i64..200_000) {
        let now = base_time();
        let metric = snapshot(Some(now - Duration::seconds(age)), NodeMetricInfo::default());
        prop_assert_eq!(is_node_metric_expired(Some(&metric), expiration, now), age >= expiration);
    }

    #[test]
    fn missing_snapshot_or_update_time_is_expired(expiration in -1000i64..1000) {
        let now = base_time();
        prop_assert!(is_node_metric_expired(None, expiration, now));
        let metric = snapshot(None, NodeMetricInfo::default());
        prop_assert!(is_node_metric_expired(Some(&metric), expiration, now));
    }

    #[test]
    fn report_state_matches_exactly_one_condition(
        assigned in -10_000i64..10_000,
        update in -10_000i64..10_000,
        interval in 0i64..600,
    ) {
        let assigned_time = base_time() + Duration::seconds(assigned);
        let update_time = base_time() + Duration::seconds(update);
        let state = ReportState::classify(assigned_time, update_time, Duration::seconds(interval));

        let not_yet = assigned_time > update_time;
        let grace = assigned_time < update_time
            && update_time - assigned_time < Duration::seconds(interval);
        let reported = !not_yet && !grace;
        prop_assert_eq!(state == ReportState::NotYetReported, not_yet);
        prop_assert_eq!(state == ReportState::WithinGracePeriod, grace);
        prop_assert_eq!(state == ReportState::Reported, reported);
    }

    #[test]
    fn default_selection_takes_first_widest_filled_window(
        windows in arb_windows(),
        current in prop::option::of(1i64..1000),
    ) {
        let node_usage = current.map(|value| cpu(-value)).unwrap_or_default();
        let metric = snapshot(Some(base_time()), NodeMetricInfo {
            node_usage: node_usage.clone(),
            aggregated_node_usages: windows.clone(),
        });

        let mut expected: Option<&AggregatedUsage> = None;
        for candidate in windows.iter().filter(|w| !w.usage[&AggregationType::Avg].is_empty()) {
            if expected.map_or(true, |best| candidate.duration > best.duration) {
                expected = Some(candidate);
            }
        }
        let expected = match expected {
            _ if windows.is_empty() => None,
            Some(best) => Some(&best.usage[&AggregationType::Avg]),
            None if !node_usage.is_empty() => Some(&node_usage),
            None => None,
        };

        prop_assert_eq!(target_aggregated_usage(&metric, None, AggregationType::Avg), expected);
    }

    #[test]
    fn requested_window_is_never_substituted(windows in arb_windows(), minutes in 1u64..7) {
        let requested = std::time::Duration::from_secs(minutes * 60);
        let metric = snapshot(Some(base_time()), NodeMetricInfo {
            node_usage: cpu(-1),
            aggregated_node_usages: windows.clone(),
        });

        let expected = windows
            .iter()
            .filter(|w| w.duration == requested)
            .map(|w| &w.usage[&AggregationType::Avg])
            .find(|usage| !usage.is_empty());
        prop_assert_eq!(target_aggregated_usage(&metric, Some(requested), AggregationType::Avg), expected);
    }

    #[test]
    fn override_equal_to_global_is_idempotent(args in arb_args()) {
        let aggregated = args.aggregated.clone().unwrap_or_default();
        let same = CustomUsageThresholds {
            usage_thresholds: args.usage_thresholds.clone(),
            prod_usage_thresholds: args.prod_usage_thresholds.clone(),
            aggregated_usage: Some(CustomAggregatedUsage {
                usage_thresholds: aggregated.usage_thresholds,
                usage_aggregation_type: aggregated.usage_aggregation_type,
                usage_aggregated_duration: aggregated.usage_aggregated_duration,
            }),
        };
        prop_assert_eq!(resolve_profile(Some(same), &args), resolve_profile(None, &args));
    }

    #[test]
    fn partition_is_disjoint_and_exhaustive(
        usages in prop::collection::vec((0i64..10_000, 0i64..1_000_000, any::<bool>()), 0..12),
    ) {
        let mut pod_metrics = PodMetricMap::new();
        let mut estimated_pods = EstimationSet::new();
        let mut expected_observed = ResourceList::new();
        let mut expected_estimated = ResourceList::new();
        let mut total = ResourceList::new();

        for (index, (milli_cpu, memory, estimated)) in usages.into_iter().enumerate() {
            let name = NamespacedName::new("default", format!("pod-{index}"));
            let usage: ResourceList =
                [(ResourceName::Cpu, milli_cpu), (ResourceName::Memory, memory)].into_iter().collect();
            total.add(&usage);
            if estimated {
                estimated_pods.insert(name.clone());
                expected_estimated.add(&usage);
            } else {
                expected_observed.add(&usage);
            }
            pod_metrics.insert(name, usage);
        }

        let partition = sum_pod_usages(&pod_metrics, &estimated_pods);
        prop_assert_eq!(&partition.observed, &expected_observed);
        prop_assert_eq!(&partition.estimated, &expected_estimated);
        for resource in [ResourceName::Cpu, ResourceName::Memory] {
            prop_assert_eq!(
                partition.observed.value(resource) + partition.estimated.value(resource),
                total.value(resource)
            );
        }
    }

    #[test]
    fn daemon_classification_matches_owner_kinds(kinds in arb_owner_kinds()) {
        let owners: Vec<OwnerReference> = kinds
            .iter()
            .map(|kind| OwnerReference {
                api_version: "apps/v1".into(),
                kind: kind.clone(),
                name: "owner".into(),
                controller: Some(true),
            })
            .collect();
        prop_assert_eq!(is_daemon_set_pod(&owners), kinds.iter().any(|k| k == "DaemonSet"));
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn scenario_absent_snapshot_is_expired() {
    assert!(is_node_metric_expired(None, 300, base_time()));
}

#[test]
fn scenario_disabled_expiration_keeps_old_snapshot() {
    let now = base_time();
    let metric = snapshot(Some(now - Duration::minutes(10)), NodeMetricInfo::default());
    assert!(!is_node_metric_expired(Some(&metric), 0, now));
}

#[test]
fn scenario_empty_wider_window_is_skipped() {
    let metric = snapshot(
        Some(base_time()),
        NodeMetricInfo {
            node_usage: ResourceList::new(),
            aggregated_node_usages: vec![window(300, cpu(50)), window(600, ResourceList::new())],
        },
    );
    assert_eq!(
        target_aggregated_usage(&metric, None, AggregationType::Avg),
        Some(&cpu(50))
    );
}

#[test]
fn scenario_global_thresholds_without_override() {
    let args = LoadAwareArgs {
        usage_thresholds: BTreeMap::from([(ResourceName::Cpu, 75)]),
        prod_usage_thresholds: BTreeMap::new(),
        aggregated: None,
        ..Default::default()
    };
    let profile = resolve_profile(None, &args);
    assert_eq!(profile.usage_thresholds, BTreeMap::from([(ResourceName::Cpu, 75)]));
    assert!(profile.prod_usage_thresholds.is_empty());
    assert!(profile.aggregated_usage.is_none());
}

#[test]
fn scenario_partition_by_estimation_set() {
    let a = NamespacedName::new("default", "a");
    let b = NamespacedName::new("default", "b");
    let pod_metrics = PodMetricMap::from([(a, cpu(1000)), (b.clone(), cpu(2000))]);
    let partition = sum_pod_usages(&pod_metrics, &EstimationSet::from([b]));
    assert_eq!(partition.observed, cpu(1000));
    assert_eq!(partition.estimated, cpu(2000));
}

#[test]
fn scenario_daemon_classification() {
    let owner = |kind: &str| OwnerReference {
        api_version: "apps/v1".into(),
        kind: kind.into(),
        name: "owner".into(),
        controller: None,
    };
    assert!(is_daemon_set_pod(&[owner("DaemonSet")]));
    assert!(!is_daemon_set_pod(&[owner("ReplicaSet")]));
    assert!(!is_daemon_set_pod(&[]));
}

#[test]
fn scenario_quantities_normalized_on_ingestion() {
    let usage: ResourceList = serde_json::from_str(r#"{"cpu": "1500m", "memory": "1Gi"}"#).unwrap();
    assert_eq!(usage.get(ResourceName::Cpu), Some(1500));
    assert_eq!(usage.get(ResourceName::Memory), Some(1024 * 1024 * 1024));
}
