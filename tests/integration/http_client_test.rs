//! HTTP client against a mock server

use std::sync::Arc;

use assert_matches::assert_matches;
use fieldsync::client::{
    HttpRemoteClient, RemoteClient, StaticTokenProvider, UpdateItemRequest, UploadItemRequest,
};
use fieldsync::config::SyncConfig;
use fieldsync::error::SyncError;
use fieldsync::model::GeoPoint;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> HttpRemoteClient {
    let config = SyncConfig {
        api_url: server.uri(),
        ..SyncConfig::default()
    };
    HttpRemoteClient::new(config, Arc::new(StaticTokenProvider::new("tok-123"))).unwrap()
}

#[tokio::test]
async fn test_create_inspection_posts_address_with_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/inspections"))
        .and(header("Authorization", "Bearer tok-123"))
        .and(body_json(json!({"address": "12 Dock Rd"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "srv-1",
            "address": "12 Dock Rd",
            "createdAt": "2026-03-01T09:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let created = client.create_inspection("12 Dock Rd").await.unwrap();
    assert_eq!(created.id, "srv-1");
    assert_eq!(created.address.as_deref(), Some("12 Dock Rd"));
}

#[tokio::test]
async fn test_list_inspections_unwraps_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/inspections"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "inspections": [{"id": "srv-1"}, {"id": "srv-2", "completed": true}]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let listed = client.list_inspections().await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, "srv-1");
    assert!(listed[1].completed);
}

#[tokio::test]
async fn test_detail_parses_flattened_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/inspections/srv-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "srv-1",
            "name": "Warehouse",
            "metadata": {"version": 1, "latitude": 40.0, "longitude": -70.0},
            "items": [
                {"id": "it-1", "tags": ["electrical"], "label": "panel"}
            ]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let detail = client.get_inspection_detail("srv-1").await.unwrap();
    assert_eq!(detail.inspection.id, "srv-1");
    assert_eq!(detail.items.len(), 1);
    assert_eq!(detail.items[0].label.as_deref(), Some("panel"));
}

#[tokio::test]
async fn test_upload_item_sends_multipart_and_parses_ai_fields() {
    let dir = tempfile::tempdir().unwrap();
    let photo = dir.path().join("cap.jpg");
    tokio::fs::write(&photo, b"jpeg-bytes").await.unwrap();

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/inspections/srv-1/items"))
        .and(header("Authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "be-1",
            "suggestedLabel": "junction box",
            "tags": ["electrical", "panel"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let outcome = client
        .upload_item(UploadItemRequest {
            inspection_id: "srv-1".to_string(),
            photo_uri: photo.to_string_lossy().to_string(),
            audio_uri: None,
            label: Some("panel".to_string()),
            location: Some(GeoPoint::new(40.0, -70.0)),
            notes: None,
        })
        .await
        .unwrap();

    assert_eq!(outcome.id, "be-1");
    assert_eq!(outcome.suggested_label.as_deref(), Some("junction box"));
    assert_eq!(
        outcome.tags,
        Some(vec!["electrical".to_string(), "panel".to_string()])
    );
}

#[tokio::test]
async fn test_upload_with_missing_photo_fails_before_network() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    let result = client
        .upload_item(UploadItemRequest {
            inspection_id: "srv-1".to_string(),
            photo_uri: "/nonexistent/cap.jpg".to_string(),
            audio_uri: None,
            label: None,
            location: None,
            notes: None,
        })
        .await;

    assert_matches!(result, Err(SyncError::Storage { .. }));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_update_item_patches_only_set_fields() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/items/be-1"))
        .and(body_json(json!({"label": "pump"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = client
        .update_item(
            "be-1",
            UpdateItemRequest {
                label: Some("pump".to_string()),
                ..UpdateItemRequest::default()
            },
        )
        .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_delete_inspection_hits_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/inspections/srv-1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(client.delete_inspection("srv-1").await.is_ok());
}

#[tokio::test]
async fn test_server_errors_map_to_api_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/inspections"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let error = client.create_inspection("12 Dock Rd").await.unwrap_err();
    assert_matches!(error, SyncError::Api { status: 500, .. });
    assert!(error.is_retryable());
}

#[tokio::test]
async fn test_auth_errors_are_not_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/inspections"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let error = client.list_inspections().await.unwrap_err();
    assert_matches!(error, SyncError::Api { status: 401, .. });
    assert!(!error.is_retryable());
}

#[tokio::test]
async fn test_unreachable_server_maps_to_network_error() {
    let config = SyncConfig {
        api_url: "http://127.0.0.1:9".to_string(),
        request_timeout_secs: 1,
        ..SyncConfig::default()
    };
    let client =
        HttpRemoteClient::new(config, Arc::new(StaticTokenProvider::new("tok-123"))).unwrap();

    let error = client.list_inspections().await.unwrap_err();
    assert_matches!(error, SyncError::Network { .. });
    assert!(error.is_retryable());
}
