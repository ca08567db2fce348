//! # Inspection Repository
//!
//! The authoritative in-memory collection of inspections. Every structural
//! mutation funnels through here so it can be observed (change events) and
//! persisted (debounced snapshot writes through the durable store).
//!
//! ## Features
//!
//! - **Synchronous reads**: mutations land in memory first; readers never
//!   see a half-applied change
//! - **Debounced persistence**: bursts of mutations coalesce into one
//!   snapshot write
//! - **Change events**: every mutation emits a typed broadcast event
//! - **Offline creation**: inspections mint a local id when the server is
//!   unreachable and adopt the server id later
//!
//! The repository takes its network client and durable store as constructor
//! parameters; it owns no globals.

pub mod events;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc, RwLock};

use crate::client::{RemoteClient, RemoteInspection, UploadItemResponse};
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::model::{GeoPoint, Inspection, InspectionItem, ItemPatch, ProcessingStatus};
use crate::store::{DurableStore, CURRENT_INSPECTION_KEY, INSPECTIONS_KEY};

pub use events::{event_channel, RepositoryEvent, EVENT_CHANNEL_CAPACITY};

/// A freshly captured item, before it enters an inspection
#[derive(Debug, Clone)]
pub struct CapturedItem {
    /// Local URI of the captured photo
    pub photo_uri: String,
    /// Local URI of the optional audio note
    pub audio_uri: Option<String>,
    /// Capture location
    pub location: Option<GeoPoint>,
    /// User-chosen label
    pub label: Option<String>,
    /// Free-form capture note
    pub notes: Option<String>,
}

impl CapturedItem {
    /// Start a capture draft from the photo URI
    pub fn new(photo_uri: impl Into<String>) -> Self {
        Self {
            photo_uri: photo_uri.into(),
            audio_uri: None,
            location: None,
            label: None,
            notes: None,
        }
    }
}

#[derive(Debug, Default)]
struct RepoState {
    inspections: HashMap<String, Inspection>,
    current_id: Option<String>,
}

/// The in-memory source of truth for inspections and their items
pub struct InspectionRepository {
    state: Arc<RwLock<RepoState>>,
    store: Arc<dyn DurableStore>,
    client: Arc<dyn RemoteClient>,
    events: broadcast::Sender<RepositoryEvent>,
    persist_tx: mpsc::Sender<()>,
}

impl InspectionRepository {
    /// Create a repository over the given client and store.
    ///
    /// Spawns the persistence worker; call from within a tokio runtime.
    pub fn new(
        client: Arc<dyn RemoteClient>,
        store: Arc<dyn DurableStore>,
        config: &SyncConfig,
    ) -> Self {
        let state = Arc::new(RwLock::new(RepoState::default()));
        let persist_tx =
            spawn_persist_worker(Arc::clone(&state), Arc::clone(&store), config.debounce_window());

        Self {
            state,
            store,
            client,
            events: event_channel(),
            persist_tx,
        }
    }

    /// Subscribe to repository change events
    pub fn subscribe(&self) -> broadcast::Receiver<RepositoryEvent> {
        self.events.subscribe()
    }

    /// Load the durable snapshot into memory.
    ///
    /// An unreadable snapshot is discarded with an error log rather than
    /// poisoning startup; the repository then begins empty.
    pub async fn load(&self) -> Result<(), SyncError> {
        let snapshot = self.store.get(INSPECTIONS_KEY).await?;
        let current_raw = self.store.get(CURRENT_INSPECTION_KEY).await?;

        let inspections: HashMap<String, Inspection> = match snapshot {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(map) => map,
                Err(e) => {
                    tracing::error!("discarding unreadable inspection snapshot: {}", e);
                    HashMap::new()
                }
            },
            None => HashMap::new(),
        };

        let mut current_id = current_raw.and_then(|raw| parse_current_id(&raw));
        if let Some(id) = &current_id {
            if !inspections.contains_key(id) {
                tracing::warn!("stored current inspection {} no longer exists", id);
                current_id = None;
            }
        }

        let mut state = self.state.write().await;
        tracing::info!(
            "loaded {} inspections from durable store (current: {:?})",
            inspections.len(),
            current_id
        );
        state.inspections = inspections;
        state.current_id = current_id;
        Ok(())
    }

    /// Create an inspection, server-minted when possible.
    ///
    /// When the mint call fails the inspection is stored under a local id
    /// and picked up by the next reconciliation pass; creation itself never
    /// fails on network trouble.
    pub async fn create_inspection(
        &self,
        name: impl Into<String>,
        location: GeoPoint,
    ) -> Inspection {
        let name = name.into();
        let inspection = match self
            .client
            .create_inspection(location.address_or_unknown())
            .await
        {
            Ok(remote) => {
                let created_at = remote.created_at.unwrap_or_else(Utc::now);
                Inspection::new_remote(remote.id, name, location, created_at)
            }
            Err(e) => {
                tracing::warn!("creating inspection locally, server unreachable: {}", e);
                Inspection::new_local(name, location)
            }
        };

        {
            let mut state = self.state.write().await;
            state
                .inspections
                .insert(inspection.id.clone(), inspection.clone());
        }
        self.emit(RepositoryEvent::InspectionCreated {
            id: inspection.id.clone(),
        });
        self.schedule_persist();
        inspection
    }

    /// Point the current-selection at an inspection, or clear it
    pub async fn set_current_inspection(&self, id: Option<&str>) -> Result<(), SyncError> {
        let new_id = {
            let mut state = self.state.write().await;
            if let Some(id) = id {
                if !state.inspections.contains_key(id) {
                    return Err(SyncError::inspection_not_found(id));
                }
            }
            state.current_id = id.map(str::to_string);
            state.current_id.clone()
        };
        self.emit(RepositoryEvent::CurrentInspectionChanged { id: new_id });
        self.schedule_persist();
        Ok(())
    }

    /// The currently selected inspection, items included
    pub async fn current_inspection(&self) -> Option<Inspection> {
        let state = self.state.read().await;
        let id = state.current_id.as_ref()?;
        state.inspections.get(id).cloned()
    }

    /// Id of the currently selected inspection
    pub async fn current_inspection_id(&self) -> Option<String> {
        self.state.read().await.current_id.clone()
    }

    /// One inspection by id
    pub async fn inspection(&self, id: &str) -> Option<Inspection> {
        self.state.read().await.inspections.get(id).cloned()
    }

    /// Clone of the whole collection
    pub async fn snapshot(&self) -> HashMap<String, Inspection> {
        self.state.read().await.inspections.clone()
    }

    /// One item by id, wherever it lives
    pub async fn find_item(&self, item_id: &str) -> Option<InspectionItem> {
        let state = self.state.read().await;
        state
            .inspections
            .values()
            .find_map(|inspection| inspection.items.get(item_id).cloned())
    }

    /// Capture an item into the current inspection.
    ///
    /// Purely an in-memory insert; the background processor picks the item
    /// up later. Fails only when nothing is selected.
    pub async fn add_item(&self, capture: CapturedItem) -> Result<InspectionItem, SyncError> {
        let (inspection_id, item) = {
            let mut state = self.state.write().await;
            let inspection_id = state
                .current_id
                .clone()
                .ok_or(SyncError::NoCurrentInspection)?;
            let inspection = state
                .inspections
                .get_mut(&inspection_id)
                .ok_or_else(|| SyncError::inspection_not_found(&inspection_id))?;

            let mut item = InspectionItem::new(&inspection_id, capture.photo_uri);
            item.audio_uri = capture.audio_uri;
            item.location = capture.location;
            item.label = capture.label;
            item.notes = capture.notes;
            inspection.items.insert(item.id.clone(), item.clone());
            (inspection_id, item)
        };

        self.emit(RepositoryEvent::ItemAdded {
            inspection_id,
            item_id: item.id.clone(),
        });
        self.schedule_persist();
        Ok(item)
    }

    /// Shallow-merge a patch into an item.
    ///
    /// A missing item is a logged no-op: updates race with deletion and the
    /// deletion wins. A content change on a remote-owned item re-queues it
    /// so the edit syncs as an update.
    pub async fn update_item(&self, item_id: &str, patch: ItemPatch) {
        if patch.is_empty() {
            return;
        }

        let requeued = {
            let mut state = self.state.write().await;
            let Some(item) = state
                .inspections
                .values_mut()
                .find_map(|inspection| inspection.items.get_mut(item_id))
            else {
                tracing::warn!("update for unknown item {} ignored", item_id);
                return;
            };

            patch.apply(item);
            if item.is_remote_owned() && patch.touches_remote_fields() {
                item.processing_status = ProcessingStatus::Pending;
                item.retry_count = 0;
                item.retry_after = None;
                true
            } else {
                false
            }
        };

        self.emit(RepositoryEvent::ItemUpdated {
            item_id: item_id.to_string(),
        });
        if requeued {
            self.emit(RepositoryEvent::ItemStatusChanged {
                item_id: item_id.to_string(),
                status: ProcessingStatus::Pending,
            });
        }
        self.schedule_persist();
    }

    /// Remove an item from its inspection
    pub async fn delete_item(&self, item_id: &str) {
        let removed = {
            let mut state = self.state.write().await;
            state
                .inspections
                .values_mut()
                .any(|inspection| inspection.items.remove(item_id).is_some())
        };

        if removed {
            self.emit(RepositoryEvent::ItemDeleted {
                item_id: item_id.to_string(),
            });
            self.schedule_persist();
        } else {
            tracing::warn!("delete for unknown item {} ignored", item_id);
        }
    }

    /// Delete an inspection, its items, and their local media files.
    ///
    /// Media removal and the server-side delete are best-effort: local
    /// deletion proceeds whatever happens to them.
    pub async fn delete_inspection(&self, id: &str) {
        let target = {
            let state = self.state.read().await;
            state.inspections.get(id).map(|inspection| {
                let mut media: Vec<String> = Vec::new();
                for item in inspection.items.values() {
                    media.push(item.photo_uri.clone());
                    if let Some(audio) = &item.audio_uri {
                        media.push(audio.clone());
                    }
                }
                (media, inspection.pending_server_sync)
            })
        };

        let Some((media, local_only)) = target else {
            tracing::warn!("delete for unknown inspection {} ignored", id);
            return;
        };

        for uri in &media {
            remove_media_file(uri).await;
        }

        if !local_only {
            if let Err(e) = self.client.delete_inspection(id).await {
                tracing::warn!("server-side delete of inspection {} failed: {}", id, e);
            }
        }

        let cleared_current = {
            let mut state = self.state.write().await;
            state.inspections.remove(id);
            if state.current_id.as_deref() == Some(id) {
                state.current_id = None;
                true
            } else {
                false
            }
        };

        self.emit(RepositoryEvent::InspectionDeleted { id: id.to_string() });
        if cleared_current {
            self.emit(RepositoryEvent::CurrentInspectionChanged { id: None });
        }
        self.schedule_persist();
    }

    /// Manual retry: put a failed item back in line with a fresh budget
    pub async fn retry_item(&self, item_id: &str) -> Result<(), SyncError> {
        let changed = {
            let mut state = self.state.write().await;
            let item = state
                .inspections
                .values_mut()
                .find_map(|inspection| inspection.items.get_mut(item_id))
                .ok_or_else(|| SyncError::item_not_found(item_id))?;

            if item.processing_status == ProcessingStatus::Failed {
                item.processing_status = ProcessingStatus::Pending;
                item.retry_count = 0;
                item.retry_after = None;
                true
            } else {
                tracing::debug!("retry requested for non-failed item {}, ignoring", item_id);
                false
            }
        };

        if changed {
            self.emit(RepositoryEvent::ItemStatusChanged {
                item_id: item_id.to_string(),
                status: ProcessingStatus::Pending,
            });
            self.schedule_persist();
        }
        Ok(())
    }

    /// Mark an item as being sent; returns false when the item vanished
    pub async fn begin_item_attempt(&self, item_id: &str, now: DateTime<Utc>) -> bool {
        let began = {
            let mut state = self.state.write().await;
            match state
                .inspections
                .values_mut()
                .find_map(|inspection| inspection.items.get_mut(item_id))
            {
                Some(item) => {
                    item.processing_status = ProcessingStatus::Processing;
                    item.last_processing_attempt = Some(now);
                    true
                }
                None => false,
            }
        };

        if began {
            self.emit(RepositoryEvent::ItemStatusChanged {
                item_id: item_id.to_string(),
                status: ProcessingStatus::Processing,
            });
            self.schedule_persist();
        }
        began
    }

    /// Record a successful first upload: the item becomes remote-owned and
    /// ingests the AI fields the service derived
    pub async fn complete_item_upload(&self, item_id: &str, outcome: UploadItemResponse) {
        let completed = {
            let mut state = self.state.write().await;
            match state
                .inspections
                .values_mut()
                .find_map(|inspection| inspection.items.get_mut(item_id))
            {
                Some(item) => {
                    item.backend_id = Some(outcome.id);
                    if let Some(tags) = outcome.tags {
                        item.tags = tags;
                    }
                    if let Some(description) = outcome.description {
                        item.description = Some(description);
                    }
                    if let Some(ocr_text) = outcome.ocr_text {
                        item.ocr_text = Some(ocr_text);
                    }
                    if let Some(transcription) = outcome.audio_transcription {
                        item.audio_transcription = Some(transcription);
                    }
                    if item.label.is_none() {
                        item.label = outcome.suggested_label;
                    }
                    item.processing_status = ProcessingStatus::Completed;
                    item.retry_count = 0;
                    item.retry_after = None;
                    true
                }
                None => {
                    // Deleted mid-flight; the upload result is discarded.
                    tracing::debug!("upload result for deleted item {} discarded", item_id);
                    false
                }
            }
        };

        if completed {
            self.emit(RepositoryEvent::ItemStatusChanged {
                item_id: item_id.to_string(),
                status: ProcessingStatus::Completed,
            });
            self.schedule_persist();
        }
    }

    /// Record a successful field update for a remote-owned item
    pub async fn complete_item_update(&self, item_id: &str) {
        let completed = {
            let mut state = self.state.write().await;
            match state
                .inspections
                .values_mut()
                .find_map(|inspection| inspection.items.get_mut(item_id))
            {
                Some(item) => {
                    item.processing_status = ProcessingStatus::Completed;
                    item.retry_count = 0;
                    item.retry_after = None;
                    true
                }
                None => {
                    tracing::debug!("update result for deleted item {} discarded", item_id);
                    false
                }
            }
        };

        if completed {
            self.emit(RepositoryEvent::ItemStatusChanged {
                item_id: item_id.to_string(),
                status: ProcessingStatus::Completed,
            });
            self.schedule_persist();
        }
    }

    /// Record a transient failure: back to pending with backoff while the
    /// budget lasts, failed once it runs out
    pub async fn record_item_failure(
        &self,
        item_id: &str,
        now: DateTime<Utc>,
        max_retries: u32,
        next_delay: Duration,
    ) -> Option<ProcessingStatus> {
        let status = {
            let mut state = self.state.write().await;
            let item = state
                .inspections
                .values_mut()
                .find_map(|inspection| inspection.items.get_mut(item_id))?;

            item.retry_count += 1;
            if item.retry_count >= max_retries {
                item.processing_status = ProcessingStatus::Failed;
                item.retry_after = None;
            } else {
                item.processing_status = ProcessingStatus::Pending;
                item.retry_after =
                    Some(now + chrono::Duration::milliseconds(next_delay.as_millis() as i64));
            }
            item.processing_status
        };

        self.emit(RepositoryEvent::ItemStatusChanged {
            item_id: item_id.to_string(),
            status,
        });
        self.schedule_persist();
        Some(status)
    }

    /// Park an item as failed without consuming the rest of its budget,
    /// used for errors a retry cannot fix
    pub async fn park_item_failed(&self, item_id: &str) -> Option<ProcessingStatus> {
        let status = {
            let mut state = self.state.write().await;
            let item = state
                .inspections
                .values_mut()
                .find_map(|inspection| inspection.items.get_mut(item_id))?;
            item.processing_status = ProcessingStatus::Failed;
            item.retry_after = None;
            item.processing_status
        };

        self.emit(RepositoryEvent::ItemStatusChanged {
            item_id: item_id.to_string(),
            status,
        });
        self.schedule_persist();
        Some(status)
    }

    /// Swap in a reconciled collection.
    ///
    /// The current pointer survives when its inspection does; otherwise it
    /// is cleared.
    pub async fn replace_all(&self, merged: HashMap<String, Inspection>) {
        self.replace_all_with(move |_| merged).await;
    }

    /// Rebuild the collection from its live contents in one critical
    /// section, so mutations racing the rebuild are either fully in or
    /// fully out of the input.
    pub async fn replace_all_with<F>(&self, rebuild: F)
    where
        F: FnOnce(HashMap<String, Inspection>) -> HashMap<String, Inspection>,
    {
        let cleared_current = {
            let mut state = self.state.write().await;
            let previous = std::mem::take(&mut state.inspections);
            state.inspections = rebuild(previous);
            let stale = state
                .current_id
                .as_ref()
                .is_some_and(|id| !state.inspections.contains_key(id));
            if stale {
                state.current_id = None;
            }
            stale
        };

        self.emit(RepositoryEvent::SnapshotReplaced);
        if cleared_current {
            self.emit(RepositoryEvent::CurrentInspectionChanged { id: None });
        }
        self.schedule_persist();
    }

    /// Adopt a server id for a locally minted inspection.
    ///
    /// The old external id is replaced everywhere, including the current
    /// selection pointer; the correlation id stays. When the server copy
    /// already landed through reconciliation, local-owned items are folded
    /// into it instead.
    pub async fn adopt_inspection(&self, old_id: &str, remote: &RemoteInspection) {
        let new_id = remote.id.clone();
        let current_moved = {
            let mut state = self.state.write().await;
            let Some(mut inspection) = state.inspections.remove(old_id) else {
                tracing::debug!("adoption target {} already gone", old_id);
                return;
            };

            inspection.adopt_server_id(&new_id);

            if let Some(existing) = state.inspections.get_mut(&new_id) {
                // Reconciliation already brought in the server copy; keep it
                // and fold our local-owned items into it.
                for (item_id, item) in inspection.items {
                    if item.is_local_owned() {
                        existing.items.entry(item_id).or_insert(item);
                    }
                }
            } else {
                state.inspections.insert(new_id.clone(), inspection);
            }

            let current_moved = state.current_id.as_deref() == Some(old_id);
            if current_moved {
                state.current_id = Some(new_id.clone());
            }
            current_moved
        };

        tracing::info!("inspection {} adopted server id {}", old_id, new_id);
        self.emit(RepositoryEvent::InspectionAdopted {
            old_id: old_id.to_string(),
            new_id: new_id.clone(),
        });
        if current_moved {
            self.emit(RepositoryEvent::CurrentInspectionChanged { id: Some(new_id) });
        }
        self.schedule_persist();
    }

    /// Flush the snapshot to the durable store immediately
    pub async fn persist_now(&self) -> Result<(), SyncError> {
        flush_state(&self.state, self.store.as_ref()).await
    }

    fn emit(&self, event: RepositoryEvent) {
        events::emit(&self.events, event);
    }

    fn schedule_persist(&self) {
        // A full channel already has a flush scheduled; dropping the signal
        // is exactly the coalescing we want.
        let _ = self.persist_tx.try_send(());
    }
}

fn parse_current_id(raw: &str) -> Option<String> {
    match serde_json::from_str::<Option<String>>(raw) {
        Ok(id) => id,
        // Pre-JSON snapshots stored the bare id.
        Err(_) => Some(raw.to_string()),
    }
}

async fn remove_media_file(uri: &str) {
    let path = uri.strip_prefix("file://").unwrap_or(uri);
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("failed to remove media file {}: {}", path, e);
        }
    }
}

async fn flush_state(
    state: &RwLock<RepoState>,
    store: &dyn DurableStore,
) -> Result<(), SyncError> {
    let (snapshot_json, current_json) = {
        let state = state.read().await;
        (
            serde_json::to_string(&state.inspections)?,
            serde_json::to_string(&state.current_id)?,
        )
    };
    store.set(INSPECTIONS_KEY, &snapshot_json).await?;
    store.set(CURRENT_INSPECTION_KEY, &current_json).await?;
    tracing::debug!("persisted inspection snapshot ({} bytes)", snapshot_json.len());
    Ok(())
}

/// Spawn the trailing-edge debounce worker: a flush happens one window after
/// the last mutation signal, and pending work flushes on shutdown
fn spawn_persist_worker(
    state: Arc<RwLock<RepoState>>,
    store: Arc<dyn DurableStore>,
    window: Duration,
) -> mpsc::Sender<()> {
    let (tx, mut rx) = mpsc::channel::<()>(16);

    tokio::spawn(async move {
        while rx.recv().await.is_some() {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(window) => break,
                    more = rx.recv() => {
                        if more.is_none() {
                            break;
                        }
                    }
                }
            }
            if let Err(e) = flush_state(&state, store.as_ref()).await {
                tracing::error!("failed to persist inspection snapshot: {}", e);
            }
        }
    });

    tx
}
