//! HTTP Remote Client
//!
//! `reqwest`-based implementation of the [`RemoteClient`] contract against
//! the inspection service's JSON-over-HTTPS API. Holds a shared client with
//! the fixed request timeout; every call is authenticated with a bearer
//! token from the injected [`TokenProvider`].

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::model::RemoteMetadata;

use super::{
    CreateInspectionRequest, ListInspectionsResponse, RemoteClient, RemoteInspection,
    RemoteInspectionDetail, TokenProvider, UpdateItemRequest, UploadItemRequest,
    UploadItemResponse,
};

/// HTTP client for the inspection service
pub struct HttpRemoteClient {
    config: SyncConfig,
    client: Client,
    tokens: Arc<dyn TokenProvider>,
}

impl HttpRemoteClient {
    /// Build a client from configuration and a token source
    pub fn new(config: SyncConfig, tokens: Arc<dyn TokenProvider>) -> Result<Self, SyncError> {
        let client = Client::builder().timeout(config.request_timeout()).build()?;
        Ok(Self {
            config,
            client,
            tokens,
        })
    }

    async fn bearer(&self) -> Result<String, SyncError> {
        let token = self.tokens.token().await?;
        Ok(format!("Bearer {}", token))
    }

    /// Turn a non-success response into an API error with a friendly message
    async fn api_error(response: reqwest::Response) -> SyncError {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| status.to_string());
        let message = match status.as_u16() {
            401 | 403 => "Not authorized".to_string(),
            404 => "Not found".to_string(),
            _ => body,
        };
        SyncError::api(status.as_u16(), message)
    }

    async fn media_part(&self, uri: &str) -> Result<Part, SyncError> {
        let path = local_path(uri);
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            SyncError::storage(format!("cannot read media file {}: {}", path, e))
        })?;
        let part = Part::bytes(bytes)
            .file_name(file_name(path))
            .mime_str(mime_for(path))?;
        Ok(part)
    }
}

#[async_trait]
impl RemoteClient for HttpRemoteClient {
    async fn create_inspection(&self, address: &str) -> Result<RemoteInspection, SyncError> {
        let url = self.config.endpoint("/api/inspections");
        let response = self
            .client
            .post(&url)
            .header("Authorization", self.bearer().await?)
            .json(&CreateInspectionRequest {
                address: address.to_string(),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        Ok(response.json::<RemoteInspection>().await?)
    }

    async fn list_inspections(&self) -> Result<Vec<RemoteInspection>, SyncError> {
        let url = self.config.endpoint("/api/inspections");
        let response = self
            .client
            .get(&url)
            .header("Authorization", self.bearer().await?)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        let list = response.json::<ListInspectionsResponse>().await?;
        Ok(list.inspections)
    }

    async fn get_inspection_detail(&self, id: &str) -> Result<RemoteInspectionDetail, SyncError> {
        let url = self.config.endpoint(&format!("/api/inspections/{}", id));
        let response = self
            .client
            .get(&url)
            .header("Authorization", self.bearer().await?)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        Ok(response.json::<RemoteInspectionDetail>().await?)
    }

    async fn upload_item(
        &self,
        request: UploadItemRequest,
    ) -> Result<UploadItemResponse, SyncError> {
        let url = self.config.endpoint(&format!(
            "/api/inspections/{}/items",
            request.inspection_id
        ));

        let mut form = Form::new().part("photo", self.media_part(&request.photo_uri).await?);
        if let Some(audio_uri) = &request.audio_uri {
            form = form.part("audio", self.media_part(audio_uri).await?);
        }
        if let Some(label) = &request.label {
            form = form.text("label", label.clone());
        }
        if let Some(notes) = &request.notes {
            form = form.text("notes", notes.clone());
        }
        if let Some(location) = &request.location {
            let metadata = RemoteMetadata {
                latitude: Some(location.latitude),
                longitude: Some(location.longitude),
                ..RemoteMetadata::default()
            };
            form = form.text("metadata", serde_json::to_string(&metadata)?);
        }

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.bearer().await?)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        Ok(response.json::<UploadItemResponse>().await?)
    }

    async fn update_item(
        &self,
        backend_id: &str,
        request: UpdateItemRequest,
    ) -> Result<(), SyncError> {
        let url = self.config.endpoint(&format!("/api/items/{}", backend_id));
        let response = self
            .client
            .patch(&url)
            .header("Authorization", self.bearer().await?)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        Ok(())
    }

    async fn delete_inspection(&self, id: &str) -> Result<(), SyncError> {
        let url = self.config.endpoint(&format!("/api/inspections/{}", id));
        let response = self
            .client
            .delete(&url)
            .header("Authorization", self.bearer().await?)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        Ok(())
    }
}

/// Strip a `file://` scheme so the URI can be opened as a path
fn local_path(uri: &str) -> &str {
    uri.strip_prefix("file://").unwrap_or(uri)
}

fn file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload")
        .to_string()
}

fn mime_for(path: &str) -> &'static str {
    let extension = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match extension.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("heic") => "image/heic",
        Some("m4a") => "audio/mp4",
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        _ => "application/octet-stream",
    }
}
