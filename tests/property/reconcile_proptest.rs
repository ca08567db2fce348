//! Property-based tests for the snapshot merge

use std::collections::HashMap;

use chrono::{TimeZone, Utc};
use fieldsync::model::{GeoPoint, Inspection, InspectionItem, ProcessingStatus};
use fieldsync::sync::reconcile::merge_snapshots;
use proptest::prelude::*;

fn arb_status() -> impl Strategy<Value = ProcessingStatus> {
    prop_oneof![
        Just(ProcessingStatus::Pending),
        Just(ProcessingStatus::Processing),
        Just(ProcessingStatus::Completed),
        Just(ProcessingStatus::Failed),
    ]
}

/// A local item in any ownership/status combination
fn arb_local_item(inspection_id: String) -> impl Strategy<Value = InspectionItem> {
    (0u32..50, any::<bool>(), arb_status()).prop_map(move |(n, remote_owned, status)| {
        let mut item = InspectionItem::new(&inspection_id, format!("file:///cap/{n}.jpg"));
        item.id = format!("item-{n}");
        item.timestamp = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        item.processing_status = status;
        if remote_owned {
            item.backend_id = Some(format!("be-{n}"));
        }
        item
    })
}

/// A server item, which is always remote-owned and completed
fn arb_remote_item(inspection_id: String) -> impl Strategy<Value = InspectionItem> {
    (100u32..150).prop_map(move |n| {
        let mut item = InspectionItem::new(&inspection_id, format!("https://cdn.example/{n}.jpg"));
        item.id = format!("srv-item-{n}");
        item.timestamp = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        item.backend_id = Some(item.id.clone());
        item.processing_status = ProcessingStatus::Completed;
        item
    })
}

fn build_inspection(n: u32, pending: bool, items: Vec<InspectionItem>) -> Inspection {
    let mut inspection = Inspection::new_remote(
        format!("srv-{n}"),
        format!("Inspection {n}"),
        GeoPoint::new(0.0, 0.0),
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
    );
    inspection.pending_server_sync = pending;
    for item in items {
        inspection.items.insert(item.id.clone(), item);
    }
    inspection
}

fn arb_local_snapshot() -> impl Strategy<Value = HashMap<String, Inspection>> {
    prop::collection::vec(
        (0u32..8, any::<bool>()).prop_flat_map(|(n, pending)| {
            prop::collection::vec(arb_local_item(format!("srv-{n}")), 0..4)
                .prop_map(move |items| build_inspection(n, pending, items))
        }),
        0..4,
    )
    .prop_map(|list| {
        list.into_iter()
            .map(|inspection| (inspection.id.clone(), inspection))
            .collect()
    })
}

fn arb_remote_snapshot() -> impl Strategy<Value = HashMap<String, Inspection>> {
    prop::collection::vec(
        (0u32..8).prop_flat_map(|n| {
            prop::collection::vec(arb_remote_item(format!("srv-{n}")), 0..4)
                .prop_map(move |items| build_inspection(n, false, items))
        }),
        0..4,
    )
    .prop_map(|list| {
        list.into_iter()
            .map(|inspection| (inspection.id.clone(), inspection))
            .collect()
    })
}

fn is_in_flight(status: ProcessingStatus) -> bool {
    matches!(
        status,
        ProcessingStatus::Pending | ProcessingStatus::Processing | ProcessingStatus::Failed
    )
}

proptest! {
    #[test]
    fn test_merge_is_idempotent(
        local in arb_local_snapshot(),
        remote in arb_remote_snapshot(),
    ) {
        let once = merge_snapshots(local, remote.clone());
        let twice = merge_snapshots(once.clone(), remote);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn test_local_owned_in_flight_items_always_survive(
        local in arb_local_snapshot(),
        remote in arb_remote_snapshot(),
    ) {
        let merged = merge_snapshots(local.clone(), remote);
        for (inspection_id, inspection) in &local {
            for (item_id, item) in &inspection.items {
                if item.is_local_owned() && is_in_flight(item.processing_status) {
                    let kept = merged
                        .get(inspection_id)
                        .and_then(|merged_inspection| merged_inspection.items.get(item_id));
                    prop_assert!(
                        kept.is_some(),
                        "local-owned {:?} item {} vanished from {}",
                        item.processing_status,
                        item_id,
                        inspection_id
                    );
                }
            }
        }
    }

    #[test]
    fn test_every_server_item_lands(
        local in arb_local_snapshot(),
        remote in arb_remote_snapshot(),
    ) {
        let merged = merge_snapshots(local, remote.clone());
        for (inspection_id, inspection) in &remote {
            let merged_inspection = &merged[inspection_id];
            for item_id in inspection.items.keys() {
                prop_assert!(merged_inspection.items.contains_key(item_id));
            }
        }
    }

    #[test]
    fn test_merge_never_invents_inspections(
        local in arb_local_snapshot(),
        remote in arb_remote_snapshot(),
    ) {
        let merged = merge_snapshots(local.clone(), remote.clone());
        for id in merged.keys() {
            prop_assert!(local.contains_key(id) || remote.contains_key(id));
        }
    }
}
