//! Remote Service Client
//!
//! The abstract contract the sync engine drives uploads through, plus the
//! wire shapes of the inspection service. The engine never talks to the
//! network directly; it holds a `RemoteClient` trait object so tests can
//! substitute a scripted double.
//!
//! - `RemoteClient` - the six fallible async operations
//! - `TokenProvider` - black-box bearer credential source
//! - request/response DTOs for the JSON contract
//!
//! The production implementation lives in [`http`].

pub mod http;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SyncError;
use crate::model::{GeoPoint, RemoteMetadata};

pub use http::HttpRemoteClient;

/// Source of bearer tokens for authenticated calls.
///
/// Token acquisition and refresh happen behind this trait; the sync engine
/// only ever asks for a usable token string.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Produce a bearer token valid for the next request
    async fn token(&self) -> Result<String, SyncError>;
}

/// A fixed-token provider for tests and pre-authenticated sessions
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    /// Wrap an already-acquired token
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn token(&self) -> Result<String, SyncError> {
        Ok(self.token.clone())
    }
}

/// An inspection as the remote service describes it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteInspection {
    /// Server-issued inspection id
    pub id: String,
    /// Display name; the service may omit it
    #[serde(default)]
    pub name: Option<String>,
    /// Site address
    #[serde(default)]
    pub address: Option<String>,
    /// Server-side creation timestamp
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Lifecycle state as reported by the service
    #[serde(default)]
    pub completed: bool,
    /// Versioned position metadata
    #[serde(default)]
    pub metadata: Option<RemoteMetadata>,
}

/// An item as the remote service describes it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteItem {
    /// Server-issued item id
    pub id: String,
    /// URL of the stored photo
    #[serde(default)]
    pub photo_url: Option<String>,
    /// URL of the stored audio note
    #[serde(default)]
    pub audio_url: Option<String>,
    /// Capture timestamp as recorded by the service
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    /// Service-derived tags
    #[serde(default)]
    pub tags: Vec<String>,
    /// Service-derived description
    #[serde(default)]
    pub description: Option<String>,
    /// Text recognized in the photo
    #[serde(default)]
    pub ocr_text: Option<String>,
    /// Transcription of the audio note
    #[serde(default)]
    pub audio_transcription: Option<String>,
    /// Label stored by the service
    #[serde(default)]
    pub label: Option<String>,
    /// Capture note stored by the service
    #[serde(default)]
    pub notes: Option<String>,
    /// Versioned position metadata
    #[serde(default)]
    pub metadata: Option<RemoteMetadata>,
}

/// Full inspection detail: the inspection plus its items
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteInspectionDetail {
    /// The inspection header
    #[serde(flatten)]
    pub inspection: RemoteInspection,
    /// All items the service holds for this inspection
    #[serde(default)]
    pub items: Vec<RemoteItem>,
}

/// Request body for creating an inspection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInspectionRequest {
    /// Site address the inspection is filed under
    pub address: String,
}

/// Response wrapper for the inspection list
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListInspectionsResponse {
    pub inspections: Vec<RemoteInspection>,
}

/// Everything the service needs to ingest a captured item
#[derive(Debug, Clone, PartialEq)]
pub struct UploadItemRequest {
    /// Server-side id of the owning inspection
    pub inspection_id: String,
    /// Local URI of the photo to upload
    pub photo_uri: String,
    /// Local URI of the optional audio note
    pub audio_uri: Option<String>,
    /// User-chosen label
    pub label: Option<String>,
    /// Capture location
    pub location: Option<GeoPoint>,
    /// Capture note
    pub notes: Option<String>,
}

/// What the service returns after ingesting an item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UploadItemResponse {
    /// Server-issued item id
    pub id: String,
    /// Label the service suggests for the photo
    #[serde(default)]
    pub suggested_label: Option<String>,
    /// Derived tags
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    /// Derived description
    #[serde(default)]
    pub description: Option<String>,
    /// Text recognized in the photo
    #[serde(default)]
    pub ocr_text: Option<String>,
    /// Transcription of the audio note
    #[serde(default)]
    pub audio_transcription: Option<String>,
}

/// Field update pushed for an already-uploaded item
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemRequest {
    /// New tags
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// New label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// New description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New OCR text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocr_text: Option<String>,
}

/// The six operations the sync engine drives.
///
/// Every call is a single fallible network operation; retry policy lives in
/// the caller, never here.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Mint a new inspection for the given address
    async fn create_inspection(&self, address: &str) -> Result<RemoteInspection, SyncError>;

    /// List all inspections visible to the authenticated user
    async fn list_inspections(&self) -> Result<Vec<RemoteInspection>, SyncError>;

    /// Fetch one inspection with all its items
    async fn get_inspection_detail(&self, id: &str) -> Result<RemoteInspectionDetail, SyncError>;

    /// Upload a captured item (photo, optional audio, metadata)
    async fn upload_item(&self, request: UploadItemRequest)
        -> Result<UploadItemResponse, SyncError>;

    /// Push a field update for an already-uploaded item
    async fn update_item(
        &self,
        backend_id: &str,
        request: UpdateItemRequest,
    ) -> Result<(), SyncError>;

    /// Delete an inspection and everything it contains
    async fn delete_inspection(&self, id: &str) -> Result<(), SyncError>;
}
