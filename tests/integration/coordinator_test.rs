//! Coordinator flows: event-driven sweeps, lifecycle, status

use std::sync::Arc;
use std::time::Duration;

use fieldsync::error::SyncError;
use fieldsync::model::{GeoPoint, ProcessingStatus};
use fieldsync::repository::{CapturedItem, InspectionRepository};
use fieldsync::store::MemoryStore;
use fieldsync::sync::SyncCoordinator;
use pretty_assertions::assert_eq;

use crate::common::{eventually, test_config, ScriptedRemote};

fn build(remote: &Arc<ScriptedRemote>) -> (Arc<InspectionRepository>, SyncCoordinator) {
    let config = test_config();
    let repo = Arc::new(InspectionRepository::new(
        remote.clone(),
        Arc::new(MemoryStore::new()),
        &config,
    ));
    let coordinator = SyncCoordinator::new(Arc::clone(&repo), remote.clone(), config);
    (repo, coordinator)
}

#[tokio::test]
async fn test_capture_triggers_upload_without_manual_ticks() {
    let remote = Arc::new(ScriptedRemote::new());
    let (repo, coordinator) = build(&remote);
    coordinator.start().await;

    let inspection = repo
        .create_inspection("Warehouse", GeoPoint::new(40.0, -70.0))
        .await;
    repo.set_current_inspection(Some(&inspection.id))
        .await
        .unwrap();
    let item = repo
        .add_item(CapturedItem::new("file:///cap/0.jpg"))
        .await
        .unwrap();

    let uploaded = eventually(|| async {
        repo.find_item(&item.id)
            .await
            .map(|i| i.processing_status == ProcessingStatus::Completed)
            .unwrap_or(false)
    })
    .await;
    assert!(uploaded);
    assert_eq!(remote.upload_count().await, 1);

    coordinator.stop().await;
    assert!(!coordinator.is_running());
}

#[tokio::test]
async fn test_stopped_coordinator_leaves_items_pending() {
    let remote = Arc::new(ScriptedRemote::new());
    let (repo, coordinator) = build(&remote);
    coordinator.start().await;
    coordinator.stop().await;

    let inspection = repo
        .create_inspection("Warehouse", GeoPoint::new(40.0, -70.0))
        .await;
    repo.set_current_inspection(Some(&inspection.id))
        .await
        .unwrap();
    let item = repo
        .add_item(CapturedItem::new("file:///cap/0.jpg"))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(remote.upload_count().await, 0);
    assert_eq!(
        repo.find_item(&item.id).await.unwrap().processing_status,
        ProcessingStatus::Pending
    );
}

#[tokio::test]
async fn test_manual_retry_resets_and_resends() {
    let remote = Arc::new(ScriptedRemote::new());
    let (repo, coordinator) = build(&remote);

    let inspection = repo
        .create_inspection("Warehouse", GeoPoint::new(40.0, -70.0))
        .await;
    repo.set_current_inspection(Some(&inspection.id))
        .await
        .unwrap();
    let item = repo
        .add_item(CapturedItem::new("file:///cap/0.jpg"))
        .await
        .unwrap();

    remote.fail_sends(10).await;
    for _ in 0..3 {
        coordinator.sweep_now().await;
    }
    assert_eq!(
        repo.find_item(&item.id).await.unwrap().processing_status,
        ProcessingStatus::Failed
    );

    remote.fail_sends(0).await;
    coordinator.retry_item(&item.id).await.unwrap();

    let stored = repo.find_item(&item.id).await.unwrap();
    assert_eq!(stored.processing_status, ProcessingStatus::Completed);
    assert_eq!(remote.upload_count().await, 4);
}

#[tokio::test]
async fn test_retry_of_unknown_item_errors() {
    let remote = Arc::new(ScriptedRemote::new());
    let (_repo, coordinator) = build(&remote);

    let result = coordinator.retry_item("ghost").await;
    assert!(matches!(result, Err(SyncError::ItemNotFound { .. })));
}

#[tokio::test]
async fn test_status_aggregates_item_counts() {
    let remote = Arc::new(ScriptedRemote::new());
    let (repo, coordinator) = build(&remote);

    let inspection = repo
        .create_inspection("Warehouse", GeoPoint::new(40.0, -70.0))
        .await;
    repo.set_current_inspection(Some(&inspection.id))
        .await
        .unwrap();

    // One item is rejected outright, a later one goes through.
    repo.add_item(CapturedItem::new("file:///cap/0.jpg"))
        .await
        .unwrap();
    remote
        .fail_sends_with(1, SyncError::api(422, "photo rejected"))
        .await;
    coordinator.sweep_now().await;

    repo.add_item(CapturedItem::new("file:///cap/1.jpg"))
        .await
        .unwrap();
    coordinator.sweep_now().await;

    let status = coordinator.status().await;
    assert_eq!(status.failed, 1);
    assert_eq!(status.completed, 1);
    assert_eq!(status.pending, 0);
    assert_eq!(status.in_flight, 0);
    assert!(!status.busy);
    assert!(status.last_reconcile.is_none());

    coordinator.reconcile_now().await.unwrap();
    let status = coordinator.status().await;
    assert!(status.last_reconcile.is_some());
}
