//! Repository Change Events
//!
//! Every repository mutation emits a typed event over a broadcast channel.
//! The background processor subscribes and decides whether to tick; UI
//! layers can subscribe for refresh. Lagging subscribers miss events rather
//! than blocking mutations.

use tokio::sync::broadcast;

use crate::model::ProcessingStatus;

/// Capacity of the repository event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// A change that happened inside the repository
#[derive(Debug, Clone, PartialEq)]
pub enum RepositoryEvent {
    /// An inspection was created (server-minted or local)
    InspectionCreated { id: String },
    /// An inspection and all its items were removed
    InspectionDeleted { id: String },
    /// A locally minted inspection took on its server id
    InspectionAdopted { old_id: String, new_id: String },
    /// The current-selection pointer moved
    CurrentInspectionChanged { id: Option<String> },
    /// An item was captured into an inspection
    ItemAdded { inspection_id: String, item_id: String },
    /// An item's content fields changed
    ItemUpdated { item_id: String },
    /// An item was removed
    ItemDeleted { item_id: String },
    /// An item's processing status changed
    ItemStatusChanged {
        item_id: String,
        status: ProcessingStatus,
    },
    /// The whole collection was replaced by a reconciliation merge
    SnapshotReplaced,
}

/// Create the repository event channel
pub fn event_channel() -> broadcast::Sender<RepositoryEvent> {
    let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
    sender
}

/// Send an event to whoever is listening; no subscribers is fine
pub fn emit(sender: &broadcast::Sender<RepositoryEvent>, event: RepositoryEvent) {
    match sender.send(event) {
        Ok(subscriber_count) => {
            tracing::trace!("repository event delivered to {} subscribers", subscriber_count);
        }
        Err(_) => {
            tracing::trace!("repository event dropped, no subscribers");
        }
    }
}
