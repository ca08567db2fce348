//! Durable Store
//!
//! Flat, asynchronous key/value persistence behind the repository. The
//! repository serializes its whole snapshot to JSON and writes it through
//! this trait; it never assumes anything richer than string get/set.
//!
//! - `SqliteStore` - production implementation over SQLite
//! - `MemoryStore` - in-memory implementation for tests and ephemeral use

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;

use crate::error::SyncError;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Key holding the serialized inspection collection
pub const INSPECTIONS_KEY: &str = "inspections.snapshot";

/// Key holding the current inspection id
pub const CURRENT_INSPECTION_KEY: &str = "inspections.current";

/// Flat async string key/value persistence
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Read the value stored under `key`, if any
    async fn get(&self, key: &str) -> Result<Option<String>, SyncError>;

    /// Write `value` under `key`, replacing any existing value
    async fn set(&self, key: &str, value: &str) -> Result<(), SyncError>;
}
