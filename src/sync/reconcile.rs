//! # Reconciler
//!
//! Merges the server's view of all inspections into the repository. Server
//! content wins for everything the server owns; local work that has not
//! reached the server yet is never dropped.
//!
//! ## Features
//!
//! - **Fail-safe fetches**: any fetch failure abandons the pass and leaves
//!   local state untouched
//! - **Ownership partition**: remote-owned items are replaced by the server
//!   copy, local-owned in-flight items are re-inserted
//! - **Id adoption**: inspections created offline are pushed to the server
//!   once per pass and take over the server-issued id

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;

use crate::client::{RemoteClient, RemoteInspectionDetail, RemoteItem};
use crate::error::SyncError;
use crate::model::{
    geo_point_from_metadata, Inspection, InspectionItem, InspectionStatus, ProcessingStatus,
};
use crate::repository::InspectionRepository;

/// Merges the server snapshot into the repository
pub struct Reconciler {
    repo: Arc<InspectionRepository>,
    client: Arc<dyn RemoteClient>,
}

impl Reconciler {
    pub fn new(repo: Arc<InspectionRepository>, client: Arc<dyn RemoteClient>) -> Self {
        Self { repo, client }
    }

    /// One full pass: fetch, merge, swap in, then push inspections the
    /// server has never seen.
    ///
    /// Any fetch error abandons the pass with local state untouched; stale
    /// local data beats a partial overwrite.
    pub async fn run(&self) -> Result<(), SyncError> {
        let listed = self.client.list_inspections().await?;

        let mut remote = HashMap::with_capacity(listed.len());
        for summary in listed {
            let detail = self.client.get_inspection_detail(&summary.id).await?;
            let inspection = canonical_inspection(detail);
            remote.insert(inspection.id.clone(), inspection);
        }

        let unsynced: Vec<String> = self
            .repo
            .snapshot()
            .await
            .values()
            .filter(|inspection| {
                inspection.pending_server_sync && !remote.contains_key(&inspection.id)
            })
            .map(|inspection| inspection.id.clone())
            .collect();

        tracing::info!("merging {} server inspections", remote.len());
        // The merge runs against the live collection inside the swap, so a
        // capture racing this pass cannot be dropped.
        self.repo
            .replace_all_with(move |local| merge_snapshots(local, remote))
            .await;

        if !unsynced.is_empty() {
            tracing::info!("pushing {} offline-created inspections", unsynced.len());
            let pushes = unsynced.iter().map(|id| self.push_inspection(id));
            join_all(pushes).await;
        }
        Ok(())
    }

    /// One creation attempt for an inspection the server does not know.
    /// Failure is left to the next pass rather than retried here.
    async fn push_inspection(&self, local_id: &str) {
        let Some(inspection) = self.repo.inspection(local_id).await else {
            return;
        };
        match self
            .client
            .create_inspection(inspection.location.address_or_unknown())
            .await
        {
            Ok(remote) => self.repo.adopt_inspection(local_id, &remote).await,
            Err(e) => {
                tracing::warn!("could not push inspection {} to server: {}", local_id, e);
            }
        }
    }
}

/// Merge the canonical server snapshot over the local collection.
///
/// Matched inspections take the server copy as the base and re-insert
/// local-owned items still working their way to the server. Unmatched local
/// inspections are kept as they are.
pub fn merge_snapshots(
    local: HashMap<String, Inspection>,
    remote: HashMap<String, Inspection>,
) -> HashMap<String, Inspection> {
    let mut merged = remote;

    for (id, local_inspection) in local {
        match merged.get_mut(&id) {
            Some(server_copy) => {
                // The correlation id is device-local; the server never
                // carries it, so the merged copy keeps ours.
                server_copy.local_ref = local_inspection.local_ref;
                for (item_id, item) in local_inspection.items {
                    if item.is_local_owned() && in_flight_status(item.processing_status) {
                        server_copy.items.insert(item_id, item);
                    }
                }
            }
            None => {
                merged.insert(id, local_inspection);
            }
        }
    }
    merged
}

fn in_flight_status(status: ProcessingStatus) -> bool {
    matches!(
        status,
        ProcessingStatus::Pending | ProcessingStatus::Processing | ProcessingStatus::Failed
    )
}

/// Lower a server inspection into the canonical local shape
pub fn canonical_inspection(detail: RemoteInspectionDetail) -> Inspection {
    let remote = detail.inspection;
    let location = geo_point_from_metadata(remote.metadata.as_ref(), remote.address);
    let name = remote
        .name
        .unwrap_or_else(|| location.address_or_unknown().to_string());
    let created_at = remote.created_at.unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

    let mut inspection = Inspection::new_remote(remote.id, name, location, created_at);
    if remote.completed {
        inspection.status = InspectionStatus::Completed;
    }
    for item in detail.items {
        let item = canonical_item(&inspection.id, item);
        inspection.items.insert(item.id.clone(), item);
    }
    inspection
}

/// Lower a server item into the canonical local shape. Everything the
/// server returns is by definition already synced.
pub fn canonical_item(inspection_id: &str, remote: RemoteItem) -> InspectionItem {
    InspectionItem {
        id: remote.id.clone(),
        inspection_id: inspection_id.to_string(),
        photo_uri: remote.photo_url.unwrap_or_default(),
        audio_uri: remote.audio_url,
        timestamp: remote.timestamp.unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
        location: remote.metadata.as_ref().map(|m| m.to_geo_point(None)),
        tags: remote.tags,
        description: remote.description,
        ocr_text: remote.ocr_text,
        audio_transcription: remote.audio_transcription,
        label: remote.label,
        notes: remote.notes,
        backend_id: Some(remote.id),
        processing_status: ProcessingStatus::Completed,
        retry_count: 0,
        last_processing_attempt: None,
        retry_after: None,
    }
}
