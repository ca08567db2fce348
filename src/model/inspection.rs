//! Inspection Data Structures
//!
//! An inspection groups the items captured at one site visit. Inspections
//! are minted by the remote service when it is reachable and locally
//! otherwise; locally minted ones are adopted onto their server id once a
//! later sync succeeds.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::item::InspectionItem;
use super::location::GeoPoint;

/// Prefix of locally minted inspection ids
pub const LOCAL_ID_PREFIX: &str = "local-";

/// Lifecycle state of an inspection
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InspectionStatus {
    /// Capture in progress
    Active,
    /// Closed out by the user
    Completed,
}

/// An inspection and its captured items
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Inspection {
    /// Externally visible id; server-issued, or locally minted with
    /// [`LOCAL_ID_PREFIX`] until adoption
    pub id: String,
    /// Stable correlation id; survives id adoption unchanged
    pub local_ref: Uuid,
    /// Display name
    pub name: String,
    /// Site location
    pub location: GeoPoint,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Lifecycle state
    pub status: InspectionStatus,
    /// True while the inspection exists only locally and still needs a
    /// server-side counterpart
    #[serde(default)]
    pub pending_server_sync: bool,
    /// Items keyed by item id; display order is derived from timestamps
    #[serde(default)]
    pub items: HashMap<String, InspectionItem>,
}

impl Inspection {
    /// Create an inspection from a server-issued id
    pub fn new_remote(
        id: impl Into<String>,
        name: impl Into<String>,
        location: GeoPoint,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            local_ref: Uuid::new_v4(),
            name: name.into(),
            location,
            created_at,
            status: InspectionStatus::Active,
            pending_server_sync: false,
            items: HashMap::new(),
        }
    }

    /// Create a locally minted inspection, used when the server cannot be
    /// reached at creation time
    pub fn new_local(name: impl Into<String>, location: GeoPoint) -> Self {
        Self {
            id: format!("{}{}", LOCAL_ID_PREFIX, Uuid::new_v4()),
            local_ref: Uuid::new_v4(),
            name: name.into(),
            location,
            created_at: Utc::now(),
            status: InspectionStatus::Active,
            pending_server_sync: true,
            items: HashMap::new(),
        }
    }

    /// Adopt a server-issued id, rewriting the item back-references.
    ///
    /// `local_ref` stays unchanged so holders of the old external id can be
    /// redirected by correlation.
    pub fn adopt_server_id(&mut self, server_id: impl Into<String>) {
        let server_id = server_id.into();
        for item in self.items.values_mut() {
            item.inspection_id = server_id.clone();
        }
        self.id = server_id;
        self.pending_server_sync = false;
    }

    /// Items in display order (oldest capture first, id as tie-break)
    pub fn ordered_items(&self) -> Vec<&InspectionItem> {
        let mut items: Vec<&InspectionItem> = self.items.values().collect();
        items.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
        items
    }

    /// Number of captured items
    pub fn item_count(&self) -> usize {
        self.items.len()
    }
}
