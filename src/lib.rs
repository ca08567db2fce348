// Increase recursion limit for complex async operations
#![recursion_limit = "256"]

//! FieldSync - Local-First Inspection Sync
//!
//! FieldSync is the data layer for field inspection capture: photos and
//! audio notes recorded on site land in a local repository immediately and
//! flow to the backend in the background, so capture keeps working with no
//! connectivity at all.
//!
//! # Overview
//!
//! This library provides the core functionality for offline-first
//! inspection capture, including:
//! - An in-memory inspection repository with debounced durable persistence
//! - Background upload of captured items with bounded retry and backoff
//! - Reconciliation of the server snapshot that never drops local work
//! - Offline inspection creation with later server id adoption
//!
//! # Module Structure
//!
//! - **`model`** - Canonical domain types
//!   - Inspections, items, processing status, location shapes
//!
//! - **`repository`** - The in-memory source of truth
//!   - All mutations, change events, debounced snapshot writes
//!
//! - **`sync`** - Background machinery
//!   - `SyncCoordinator`, `BackgroundProcessor`, `Reconciler`
//!
//! - **`client`** - Remote client contract and the HTTP implementation
//!
//! - **`store`** - Durable key/value store contract, SQLite-backed and
//!   in-memory implementations
//!
//! - **`checklist`** - Read-only categorization shapes for the review UI
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use fieldsync::client::{HttpRemoteClient, StaticTokenProvider};
//! use fieldsync::config::SyncConfig;
//! use fieldsync::repository::InspectionRepository;
//! use fieldsync::store::SqliteStore;
//! use fieldsync::sync::SyncCoordinator;
//!
//! # async fn example() -> Result<(), fieldsync::error::SyncError> {
//! let config = SyncConfig::load_or_default("fieldsync.toml");
//! let tokens = Arc::new(StaticTokenProvider::new("bearer-token"));
//! let client = Arc::new(HttpRemoteClient::new(config.clone(), tokens)?);
//! let store = Arc::new(SqliteStore::open_default().await?);
//!
//! let repo = Arc::new(InspectionRepository::new(client.clone(), store, &config));
//! repo.load().await?;
//!
//! let sync = SyncCoordinator::new(Arc::clone(&repo), client, config);
//! sync.start().await;
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! All shared state lives behind `Arc<RwLock<>>` inside the repository;
//! change notifications use `broadcast::Sender`. The capture path never
//! awaits network I/O, so UI reads stay current under any connectivity.
//!
//! # Error Handling
//!
//! The library uses Rust's standard error handling:
//!
//! - `Result<T, E>` for fallible operations
//! - `Option<T>` for optional values
//! - One crate-wide error type in `error`, split into retryable and
//!   non-retryable cases

/// Remote client contract and HTTP implementation
pub mod client;

/// Runtime configuration
pub mod config;

/// Crate-wide error type
pub mod error;

/// Canonical domain types
pub mod model;

/// The in-memory inspection repository
pub mod repository;

/// Durable key/value storage
pub mod store;

/// Background synchronization
pub mod sync;

/// Checklist categorization shapes
pub mod checklist;
