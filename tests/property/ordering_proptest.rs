//! Property-based tests for item display ordering

use chrono::{Duration, TimeZone, Utc};
use fieldsync::model::{GeoPoint, Inspection, InspectionItem};
use proptest::prelude::*;

/// Items with unique ids and deliberately colliding timestamps, so the
/// id tie-break gets exercised
fn arb_items() -> impl Strategy<Value = Vec<InspectionItem>> {
    prop::collection::vec(0i64..6, 0..12).prop_map(|offsets| {
        offsets
            .into_iter()
            .enumerate()
            .map(|(slot, secs)| {
                let mut item =
                    InspectionItem::new("srv-1", format!("file:///cap/{slot}.jpg"));
                item.id = format!("item-{slot:02}");
                item.timestamp = Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap()
                    + Duration::seconds(secs);
                item
            })
            .collect()
    })
}

fn build_inspection(items: Vec<InspectionItem>) -> Inspection {
    let mut inspection = Inspection::new_remote(
        "srv-1",
        "Dockside warehouse",
        GeoPoint::new(51.5, -0.1),
        Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap(),
    );
    for item in items {
        inspection.items.insert(item.id.clone(), item);
    }
    inspection
}

proptest! {
    #[test]
    fn test_ordered_items_sorts_by_time_then_id(items in arb_items()) {
        let inspection = build_inspection(items);
        let ordered = inspection.ordered_items();
        prop_assert_eq!(ordered.len(), inspection.item_count());
        for pair in ordered.windows(2) {
            let earlier = (pair[0].timestamp, pair[0].id.as_str());
            let later = (pair[1].timestamp, pair[1].id.as_str());
            prop_assert!(
                earlier <= later,
                "{:?} sorted after {:?}",
                earlier,
                later
            );
        }
    }

    #[test]
    fn test_ordered_items_ignores_insertion_order(items in arb_items()) {
        let forward = build_inspection(items.clone());
        let mut shuffled = items;
        shuffled.reverse();
        let backward = build_inspection(shuffled);

        let forward_ids: Vec<&str> =
            forward.ordered_items().iter().map(|item| item.id.as_str()).collect();
        let backward_ids: Vec<&str> =
            backward.ordered_items().iter().map(|item| item.id.as_str()).collect();
        prop_assert_eq!(forward_ids, backward_ids);
    }
}
