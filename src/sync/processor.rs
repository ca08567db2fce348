//! # Background Item Processor
//!
//! Drains the current inspection's unsynced items to the server. Each sweep
//! claims the eligible items, sends them concurrently, and records the
//! outcome per item; nothing here blocks capture.
//!
//! ## Features
//!
//! - **At-least-once delivery**: pending items stay pending until the server
//!   acknowledges them
//! - **Exponential backoff**: transient failures re-schedule with a capped,
//!   doubling delay
//! - **No double dispatch**: an in-flight set claims items before any await,
//!   so overlapping sweeps never send the same item twice

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use tokio::sync::Mutex;

use crate::client::{RemoteClient, UpdateItemRequest, UploadItemRequest};
use crate::config::SyncConfig;
use crate::model::{Inspection, InspectionItem, ProcessingStatus};
use crate::repository::InspectionRepository;

/// Delay before the given attempt: doubles from `base`, saturating at `cap`.
///
/// Attempt numbers start at 1; an attempt of 0 is treated as the first.
pub fn backoff_delay(attempt: u32, base: Duration, cap: Duration) -> Duration {
    let exp = attempt.saturating_sub(1).min(31);
    base.saturating_mul(1u32 << exp).min(cap)
}

/// Whether an item wants a send, ignoring in-flight claims.
///
/// Pending items wait out their backoff window; processing items are only
/// seen here when a previous run died mid-send, so they go immediately.
pub fn wants_send(item: &InspectionItem, now: DateTime<Utc>) -> bool {
    match item.processing_status {
        ProcessingStatus::Pending => item.backoff_elapsed(now),
        ProcessingStatus::Processing => true,
        ProcessingStatus::Completed | ProcessingStatus::Failed => false,
    }
}

/// Trigger predicate for the sync event loop: does this inspection hold at
/// least one item worth a sweep right now?
pub fn has_sendable_items(inspection: &Inspection, now: DateTime<Utc>) -> bool {
    !inspection.pending_server_sync && inspection.items.values().any(|item| wants_send(item, now))
}

/// Sends unsynced items of the current inspection to the server
pub struct BackgroundProcessor {
    repo: Arc<InspectionRepository>,
    client: Arc<dyn RemoteClient>,
    config: SyncConfig,
    in_flight: Mutex<HashSet<String>>,
}

impl BackgroundProcessor {
    pub fn new(
        repo: Arc<InspectionRepository>,
        client: Arc<dyn RemoteClient>,
        config: SyncConfig,
    ) -> Self {
        Self {
            repo,
            client,
            config,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Number of items currently being sent
    pub async fn in_flight_count(&self) -> usize {
        self.in_flight.lock().await.len()
    }

    /// One sweep: claim every eligible item of the current inspection and
    /// send them concurrently. Returns the number of items dispatched.
    pub async fn tick(&self) -> usize {
        let batch = self.claim_eligible(Utc::now()).await;
        if batch.is_empty() {
            return 0;
        }

        tracing::debug!("dispatching {} items to the server", batch.len());
        let sends = batch.into_iter().map(|item| self.send_item(item));
        join_all(sends).await.len()
    }

    /// Collect eligible items and mark them in-flight in one synchronous
    /// critical section, so a concurrent sweep cannot pick them up
    async fn claim_eligible(&self, now: DateTime<Utc>) -> Vec<InspectionItem> {
        let Some(inspection) = self.repo.current_inspection().await else {
            return Vec::new();
        };
        if inspection.pending_server_sync {
            // Items cannot upload into an inspection the server has never
            // heard of; reconciliation adopts it first.
            tracing::debug!(
                "inspection {} awaits server adoption, items held back",
                inspection.id
            );
            return Vec::new();
        }

        let mut in_flight = self.in_flight.lock().await;
        let mut batch = Vec::new();
        for item in inspection.ordered_items() {
            if wants_send(item, now) && in_flight.insert(item.id.clone()) {
                batch.push(item.clone());
            }
        }
        batch
    }

    async fn send_item(&self, claimed: InspectionItem) {
        let item_id = claimed.id.clone();
        self.send_item_inner(claimed).await;
        self.in_flight.lock().await.remove(&item_id);
    }

    async fn send_item_inner(&self, claimed: InspectionItem) {
        if !self.repo.begin_item_attempt(&claimed.id, Utc::now()).await {
            tracing::debug!("item {} vanished before send, skipping", claimed.id);
            return;
        }
        // Re-read after claiming so edits made since the scan are included.
        let Some(item) = self.repo.find_item(&claimed.id).await else {
            return;
        };

        let result = match &item.backend_id {
            None => match self.client.upload_item(upload_request(&item)).await {
                Ok(outcome) => {
                    tracing::info!("item {} uploaded as {}", item.id, outcome.id);
                    self.repo.complete_item_upload(&item.id, outcome).await;
                    Ok(())
                }
                Err(e) => Err(e),
            },
            Some(backend_id) => match self
                .client
                .update_item(backend_id, update_request(&item))
                .await
            {
                Ok(()) => {
                    tracing::info!("item {} fields updated on server", item.id);
                    self.repo.complete_item_update(&item.id).await;
                    Ok(())
                }
                Err(e) => Err(e),
            },
        };

        if let Err(e) = result {
            self.record_failure(&item, e).await;
        }
    }

    async fn record_failure(&self, item: &InspectionItem, error: crate::error::SyncError) {
        if error.is_retryable() {
            let attempt = item.retry_count + 1;
            let delay = backoff_delay(attempt, self.config.backoff_base(), self.config.backoff_cap());
            let status = self
                .repo
                .record_item_failure(&item.id, Utc::now(), self.config.max_retries, delay)
                .await;
            match status {
                Some(ProcessingStatus::Failed) => {
                    tracing::warn!(
                        "item {} failed after {} attempts: {}",
                        item.id,
                        attempt,
                        error
                    );
                }
                Some(_) => {
                    tracing::warn!(
                        "item {} send attempt {} failed, retrying in {:?}: {}",
                        item.id,
                        attempt,
                        delay,
                        error
                    );
                }
                None => {}
            }
        } else {
            tracing::warn!("item {} rejected by the server, parking: {}", item.id, error);
            self.repo.park_item_failed(&item.id).await;
        }
    }
}

fn upload_request(item: &InspectionItem) -> UploadItemRequest {
    UploadItemRequest {
        inspection_id: item.inspection_id.clone(),
        photo_uri: item.photo_uri.clone(),
        audio_uri: item.audio_uri.clone(),
        label: item.label.clone(),
        location: item.location.clone(),
        notes: item.notes.clone(),
    }
}

fn update_request(item: &InspectionItem) -> UpdateItemRequest {
    UpdateItemRequest {
        tags: Some(item.tags.clone()),
        label: item.label.clone(),
        description: item.description.clone(),
        ocr_text: item.ocr_text.clone(),
    }
}
