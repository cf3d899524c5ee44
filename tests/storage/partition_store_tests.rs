//! PartitionStore interface tests.
//!
//! These tests verify the contract of the PartitionStore trait.
//! Each storage implementation should run these tests.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;
use telemetry_history::sample::{Sample, TypeName};
use telemetry_history::storage::PartitionStore;

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

fn all_time() -> (DateTime<Utc>, DateTime<Utc>) {
    (DateTime::<Utc>::MIN_UTC, DateTime::<Utc>::MAX_UTC)
}

// =============================================================================
// Partition lifecycle tests
// =============================================================================

pub async fn test_append_creates_partition<S: PartitionStore>(store: &S) {
    let type_name = TypeName::from("test_lazy");

    assert!(
        !store.partition_exists(&type_name).await.unwrap(),
        "partition should not exist before first append"
    );

    store
        .append(Sample::new("test_lazy", at(1), json!({"v": 1})))
        .await
        .expect("append should succeed");

    assert!(store.partition_exists(&type_name).await.unwrap());
    let partitions = store.list_partitions().await.unwrap();
    assert!(
        partitions.contains(&type_name),
        "appended type should be listed"
    );
}

pub async fn test_ensure_partition_idempotent<S: PartitionStore>(store: &S) {
    let type_name = TypeName::from("test_ensure");

    store.ensure_partition(&type_name).await.unwrap();
    store.ensure_partition(&type_name).await.unwrap();

    assert!(store.partition_exists(&type_name).await.unwrap());
    let samples = store
        .query(&type_name, all_time().0, all_time().1)
        .await
        .unwrap();
    assert!(samples.is_empty(), "ensured partition starts empty");
}

pub async fn test_concurrent_ensure_partition<S: PartitionStore>(store: &S) {
    let type_name = TypeName::from("test_race_ensure");

    let (first, second) = tokio::join!(
        store.ensure_partition(&type_name),
        store.ensure_partition(&type_name)
    );

    first.expect("first creator should succeed");
    second.expect("losing the creation race should succeed");
    let partitions = store.list_partitions().await.unwrap();
    assert_eq!(
        partitions.iter().filter(|p| **p == type_name).count(),
        1,
        "partition should be listed exactly once"
    );
}

pub async fn test_concurrent_first_appends<S: PartitionStore>(store: &S) {
    let type_name = TypeName::from("test_race_append");

    let (first, second) = tokio::join!(
        store.append(Sample::new("test_race_append", at(1), json!("a"))),
        store.append(Sample::new("test_race_append", at(2), json!("b")))
    );

    first.expect("first append should succeed");
    second.expect("second append should succeed");
    let partitions = store.list_partitions().await.unwrap();
    assert_eq!(partitions.iter().filter(|p| **p == type_name).count(), 1);

    let (from, to) = all_time();
    let samples = store.query(&type_name, from, to).await.unwrap();
    assert_eq!(timestamps_of(&samples), vec![at(1), at(2)]);
}

fn timestamps_of(samples: &[Sample]) -> Vec<DateTime<Utc>> {
    samples.iter().map(Sample::timestamp).collect()
}

pub async fn test_query_unknown_partition_is_empty<S: PartitionStore>(store: &S) {
    let (from, to) = all_time();
    let samples = store
        .query(&TypeName::from("test_never_written"), from, to)
        .await
        .expect("query on unknown partition should succeed");

    assert!(samples.is_empty());
    assert!(
        !store
            .partition_exists(&TypeName::from("test_never_written"))
            .await
            .unwrap(),
        "query must not create partitions"
    );
}

// =============================================================================
// Isolation tests
// =============================================================================

pub async fn test_partition_isolation<S: PartitionStore>(store: &S) {
    store
        .append(Sample::new("test_iso_a", at(1), json!("a")))
        .await
        .unwrap();
    store
        .append(Sample::new("test_iso_b", at(1), json!("b")))
        .await
        .unwrap();

    let (from, to) = all_time();
    let a = store
        .query(&TypeName::from("test_iso_a"), from, to)
        .await
        .unwrap();
    let b = store
        .query(&TypeName::from("test_iso_b"), from, to)
        .await
        .unwrap();

    assert_eq!(a.len(), 1);
    assert_eq!(b.len(), 1);
    assert_eq!(a[0].value(), &json!("a"));
    assert_eq!(b[0].value(), &json!("b"));
    assert!(a.iter().all(|s| s.type_name().as_str() == "test_iso_a"));
    assert!(b.iter().all(|s| s.type_name().as_str() == "test_iso_b"));
}

// =============================================================================
// Query tests
// =============================================================================

pub async fn test_query_ordered_by_timestamp<S: PartitionStore>(store: &S) {
    for secs in [30, 10, 20] {
        store
            .append(Sample::new("test_order", at(secs), json!(secs)))
            .await
            .unwrap();
    }

    let (from, to) = all_time();
    let samples = store
        .query(&TypeName::from("test_order"), from, to)
        .await
        .unwrap();

    let times: Vec<_> = samples.iter().map(Sample::timestamp).collect();
    assert_eq!(times, vec![at(10), at(20), at(30)]);
}

pub async fn test_query_half_open_range<S: PartitionStore>(store: &S) {
    for secs in [10, 20, 30] {
        store
            .append(Sample::new("test_range", at(secs), json!(secs)))
            .await
            .unwrap();
    }

    let samples = store
        .query(&TypeName::from("test_range"), at(10), at(30))
        .await
        .unwrap();

    let values: Vec<_> = samples.iter().map(|s| s.value().clone()).collect();
    assert_eq!(
        values,
        vec![json!(10), json!(20)],
        "lower bound inclusive, upper bound exclusive"
    );
}

pub async fn test_value_round_trip<S: PartitionStore>(store: &S) {
    let value = json!({
        "reading": 21.5,
        "unit": "C",
        "flags": [true, false],
        "nested": {"sensor": "probe-3"}
    });
    store
        .append(Sample::new("test_value", at(5), value.clone()))
        .await
        .unwrap();

    let (from, to) = all_time();
    let samples = store
        .query(&TypeName::from("test_value"), from, to)
        .await
        .unwrap();

    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].value(), &value);
    assert_eq!(samples[0].timestamp(), at(5));
}

/// Run all PartitionStore tests against a store implementation.
#[macro_export]
macro_rules! run_partition_store_tests {
    ($store:expr) => {
        use $crate::storage::partition_store_tests::*;

        // lifecycle tests
        test_append_creates_partition($store).await;
        println!("  test_append_creates_partition: PASSED");

        test_ensure_partition_idempotent($store).await;
        println!("  test_ensure_partition_idempotent: PASSED");

        test_concurrent_ensure_partition($store).await;
        println!("  test_concurrent_ensure_partition: PASSED");

        test_concurrent_first_appends($store).await;
        println!("  test_concurrent_first_appends: PASSED");

        test_query_unknown_partition_is_empty($store).await;
        println!("  test_query_unknown_partition_is_empty: PASSED");

        // isolation tests
        test_partition_isolation($store).await;
        println!("  test_partition_isolation: PASSED");

        // query tests
        test_query_ordered_by_timestamp($store).await;
        println!("  test_query_ordered_by_timestamp: PASSED");

        test_query_half_open_range($store).await;
        println!("  test_query_half_open_range: PASSED");

        test_value_round_trip($store).await;
        println!("  test_value_round_trip: PASSED");
    };
}
