//! Inspection Item Data Structures
//!
//! A captured photo (with optional audio) inside an inspection, together
//! with the local sync bookkeeping that drives background upload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::location::GeoPoint;

/// Local processing state of a captured item
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    /// Waiting to be uploaded or updated
    Pending,
    /// Currently being sent to the remote service
    Processing,
    /// Accepted by the remote service
    Completed,
    /// Retry budget exhausted; waits for a manual retry
    Failed,
}

/// A captured inspection item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InspectionItem {
    /// Unique item ID (locally minted)
    pub id: String,
    /// The inspection this item belongs to
    pub inspection_id: String,
    /// Local URI of the captured photo
    pub photo_uri: String,
    /// Local URI of the optional audio note
    pub audio_uri: Option<String>,
    /// Capture timestamp; items display sorted by this
    pub timestamp: DateTime<Utc>,
    /// Where the item was captured, when location was available
    pub location: Option<GeoPoint>,
    /// Tags derived by the remote service
    #[serde(default)]
    pub tags: Vec<String>,
    /// Description derived by the remote service
    pub description: Option<String>,
    /// Text recognized in the photo by the remote service
    pub ocr_text: Option<String>,
    /// Transcription of the audio note by the remote service
    pub audio_transcription: Option<String>,
    /// User-chosen or service-suggested label
    pub label: Option<String>,
    /// Free-form note entered at capture time
    #[serde(default)]
    pub notes: Option<String>,
    /// Server-side id; present once the remote service has accepted the item
    pub backend_id: Option<String>,
    /// Local processing state
    pub processing_status: ProcessingStatus,
    /// Upload attempts made so far
    #[serde(default)]
    pub retry_count: u32,
    /// When the last upload or update attempt started
    pub last_processing_attempt: Option<DateTime<Utc>>,
    /// Earliest time the next attempt may start, enforcing backoff
    #[serde(default)]
    pub retry_after: Option<DateTime<Utc>>,
}

impl InspectionItem {
    /// Create a new pending item for a freshly captured photo
    pub fn new(inspection_id: impl Into<String>, photo_uri: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            inspection_id: inspection_id.into(),
            photo_uri: photo_uri.into(),
            audio_uri: None,
            timestamp: Utc::now(),
            location: None,
            tags: Vec::new(),
            description: None,
            ocr_text: None,
            audio_transcription: None,
            label: None,
            notes: None,
            backend_id: None,
            processing_status: ProcessingStatus::Pending,
            retry_count: 0,
            last_processing_attempt: None,
            retry_after: None,
        }
    }

    /// Attach an audio note
    pub fn with_audio(mut self, audio_uri: impl Into<String>) -> Self {
        self.audio_uri = Some(audio_uri.into());
        self
    }

    /// Attach a capture location
    pub fn with_location(mut self, location: GeoPoint) -> Self {
        self.location = Some(location);
        self
    }

    /// Attach a user-chosen label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Attach a capture note
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Whether the remote service has accepted this item
    pub fn is_remote_owned(&self) -> bool {
        self.backend_id.is_some()
    }

    /// Whether this item exists only on-device
    pub fn is_local_owned(&self) -> bool {
        self.backend_id.is_none()
    }

    /// Whether the backoff window for the next attempt has elapsed
    pub fn backoff_elapsed(&self, now: DateTime<Utc>) -> bool {
        match self.retry_after {
            Some(after) => after <= now,
            None => true,
        }
    }
}

/// Partial update applied to an existing item.
///
/// Fields left as `None` are untouched; set fields replace the current
/// value. Shallow merge only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemPatch {
    /// New label
    pub label: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New tag list (replaces the whole list)
    pub tags: Option<Vec<String>>,
    /// New OCR text
    pub ocr_text: Option<String>,
    /// New audio transcription
    pub audio_transcription: Option<String>,
    /// New capture note
    pub notes: Option<String>,
}

impl ItemPatch {
    /// Whether the patch changes nothing
    pub fn is_empty(&self) -> bool {
        self.label.is_none()
            && self.description.is_none()
            && self.tags.is_none()
            && self.ocr_text.is_none()
            && self.audio_transcription.is_none()
            && self.notes.is_none()
    }

    /// Whether the patch touches fields the remote service stores.
    ///
    /// Such a change on a remote-owned item must be re-queued so an update
    /// call carries it to the server.
    pub fn touches_remote_fields(&self) -> bool {
        self.label.is_some()
            || self.description.is_some()
            || self.tags.is_some()
            || self.ocr_text.is_some()
    }

    /// Apply the patch to an item, shallow-merging set fields
    pub fn apply(&self, item: &mut InspectionItem) {
        if let Some(label) = &self.label {
            item.label = Some(label.clone());
        }
        if let Some(description) = &self.description {
            item.description = Some(description.clone());
        }
        if let Some(tags) = &self.tags {
            item.tags = tags.clone();
        }
        if let Some(ocr_text) = &self.ocr_text {
            item.ocr_text = Some(ocr_text.clone());
        }
        if let Some(transcription) = &self.audio_transcription {
            item.audio_transcription = Some(transcription.clone());
        }
        if let Some(notes) = &self.notes {
            item.notes = Some(notes.clone());
        }
    }
}
