//! Property-based tests for ledger invariants
//!
//! These tests use proptest to verify the bookkeeping rules:
//! - Balance formula: remaining == status + normal + nongfu - taken
//! - No side effects on rejection: status and records unchanged
//! - Negative input never touches the store
//! - Listing returns the newest records in descending order

use chrono::{DateTime, Duration, Utc};
use proptest::prelude::*;
use std::sync::Arc;
use water_ledger::{
    DateRange, InventoryStatus, KvStore, Ledger, LedgerError, ManualClock, MemoryStore,
    RecordLimit, RecordQuery,
};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn start() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-05-01T08:00:00.000Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn create_test_ledger() -> (Ledger, Arc<MemoryStore>, Arc<ManualClock>) {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(start()));
    let ledger = Ledger::with_clock(store.clone(), clock.clone());
    (ledger, store, clock)
}

/// Strategy for quantities a delivery form would accept
fn quantity_strategy() -> impl Strategy<Value = i64> {
    0i64..10_000
}

/// Strategy for a delivery tuple (normal, nongfu, taken)
fn delivery_strategy() -> impl Strategy<Value = (i64, i64, i64)> {
    (quantity_strategy(), quantity_strategy(), quantity_strategy())
}

proptest! {
    #[test]
    fn prop_balance_formula(initial in quantity_strategy(), (normal, nongfu, taken) in delivery_strategy()) {
        let rt = runtime();
        let (ledger, store, _) = create_test_ledger();

        rt.block_on(async {
            ledger.set_initial_buckets(initial).await.unwrap();
            let expected = initial + normal + nongfu - taken;
            let keys_before = store.len();

            match ledger.record_delivery(normal, nongfu, taken).await {
                Ok(outcome) => {
                    prop_assert!(expected >= 0);
                    prop_assert_eq!(outcome.record.remaining_empty_buckets, expected);
                    prop_assert_eq!(outcome.current_empty_buckets, expected);
                    prop_assert_eq!(outcome.record.total_delivered, normal + nongfu);
                    prop_assert_eq!(ledger.get_status().await.unwrap(), InventoryStatus::new(expected));
                }
                Err(LedgerError::InsufficientEmptyBuckets { available }) => {
                    prop_assert!(expected < 0);
                    prop_assert_eq!(available, expected + taken);
                    prop_assert_eq!(store.len(), keys_before);
                    prop_assert_eq!(ledger.get_status().await.unwrap(), InventoryStatus::new(initial));
                }
                Err(other) => prop_assert!(false, "unexpected error: {}", other),
            }
            Ok(())
        })?;
    }

    #[test]
    fn prop_running_total_matches_history(deliveries in prop::collection::vec(delivery_strategy(), 1..20)) {
        let rt = runtime();
        let (ledger, store, clock) = create_test_ledger();

        rt.block_on(async {
            let mut balance = 0i64;
            let mut applied = 0usize;

            for (normal, nongfu, taken) in deliveries {
                clock.advance(Duration::seconds(1));
                let next = balance + normal + nongfu - taken;
                match ledger.record_delivery(normal, nongfu, taken).await {
                    Ok(outcome) => {
                        prop_assert!(next >= 0);
                        prop_assert_eq!(outcome.current_empty_buckets, next);
                        balance = next;
                        applied += 1;
                    }
                    Err(LedgerError::InsufficientEmptyBuckets { .. }) => prop_assert!(next < 0),
                    Err(other) => prop_assert!(false, "unexpected error: {}", other),
                }
            }

            prop_assert_eq!(ledger.get_status().await.unwrap().empty_buckets, balance);
            prop_assert!(balance >= 0);

            let records = RecordQuery::new(store.clone())
                .list_records(RecordLimit::new(usize::MAX), &DateRange::unbounded())
                .await
                .unwrap();
            prop_assert_eq!(records.len(), applied);
            if let Some(newest) = records.first() {
                prop_assert_eq!(newest.remaining_empty_buckets, balance);
            }
            Ok(())
        })?;
    }

    #[test]
    fn prop_negative_input_rejected(
        value in -10_000i64..0,
        slot in 0usize..3,
    ) {
        let rt = runtime();
        let (ledger, store, _) = create_test_ledger();

        rt.block_on(async {
            let mut input = [1i64, 1, 1];
            input[slot] = value;

            let err = ledger.record_delivery(input[0], input[1], input[2]).await.unwrap_err();
            let is_negative = matches!(err, LedgerError::NegativeQuantity { .. });
            prop_assert!(is_negative);

            let err = ledger.set_initial_buckets(value).await.unwrap_err();
            let is_negative = matches!(err, LedgerError::NegativeQuantity { .. });
            prop_assert!(is_negative);

            prop_assert!(store.is_empty());
            Ok(())
        })?;
    }

    #[test]
    fn prop_listing_is_newest_first(count in 1usize..15, limit in 1usize..20) {
        let rt = runtime();
        let (ledger, store, clock) = create_test_ledger();

        rt.block_on(async {
            for index in 0..count {
                ledger.record_delivery(index as i64, 0, 0).await.unwrap();
                clock.advance(Duration::milliseconds(250));
            }

            let records = RecordQuery::new(store.clone())
                .list_records(RecordLimit::new(limit), &DateRange::unbounded())
                .await
                .unwrap();

            prop_assert_eq!(records.len(), limit.min(count));
            for (offset, record) in records.iter().enumerate() {
                prop_assert_eq!(record.normal_water, (count - 1 - offset) as i64);
            }
            for pair in records.windows(2) {
                prop_assert!(pair[0].timestamp > pair[1].timestamp);
            }
            Ok(())
        })?;
    }
}

#[tokio::test]
async fn test_delivery_scenario() {
    let (ledger, _, _) = create_test_ledger();
    ledger.set_initial_buckets(10).await.unwrap();

    let outcome = ledger.record_delivery(3, 2, 4).await.unwrap();
    assert_eq!(outcome.record.remaining_empty_buckets, 11);

    let err = ledger.record_delivery(0, 0, 20).await.unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InsufficientEmptyBuckets { available: 11 }
    ));
    assert_eq!(err.to_string(), "Not enough empty buckets: only 11 on hand");

    assert_eq!(ledger.get_status().await.unwrap(), InventoryStatus::new(11));
}

#[tokio::test]
async fn test_set_initial_is_idempotent_overwrite() {
    let (ledger, _, _) = create_test_ledger();
    ledger.set_initial_buckets(42).await.unwrap();
    ledger.record_delivery(1, 1, 0).await.unwrap();

    ledger.set_initial_buckets(5).await.unwrap();
    ledger.set_initial_buckets(5).await.unwrap();
    assert_eq!(ledger.get_status().await.unwrap(), InventoryStatus::new(5));
}

#[tokio::test]
async fn test_clear_all_then_empty_views() {
    let (ledger, store, clock) = create_test_ledger();
    for _ in 0..3 {
        ledger.record_delivery(2, 0, 1).await.unwrap();
        clock.advance(Duration::seconds(1));
    }

    ledger.clear_all().await.unwrap();

    assert_eq!(ledger.get_status().await.unwrap(), InventoryStatus::new(0));
    let records = RecordQuery::new(store.clone())
        .list_records(RecordLimit::default(), &DateRange::unbounded())
        .await
        .unwrap();
    assert!(records.is_empty());
    assert!(store.list_keys("").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_limit_two_of_five() {
    let (ledger, store, clock) = create_test_ledger();
    let mut created = Vec::new();
    for _ in 0..5 {
        created.push(ledger.record_delivery(1, 0, 0).await.unwrap().record);
        clock.advance(Duration::seconds(1));
    }

    let records = RecordQuery::new(store)
        .list_records(RecordLimit::new(2), &DateRange::unbounded())
        .await
        .unwrap();

    assert_eq!(records, vec![created[4].clone(), created[3].clone()]);
}

#[tokio::test]
async fn test_wall_clock_deliveries_in_quick_succession() {
    let store = Arc::new(MemoryStore::new());
    let ledger = Ledger::new(store.clone());

    for _ in 0..5 {
        ledger.record_delivery(1, 0, 0).await.unwrap();
    }

    let records = RecordQuery::new(store)
        .list_records(RecordLimit::new(2), &DateRange::unbounded())
        .await
        .unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].remaining_empty_buckets, 5);
    assert_eq!(records[1].remaining_empty_buckets, 4);
}
