//! Inspection Data Model
//!
//! This module contains the canonical data structures for the inspection
//! domain:
//!
//! - `Inspection` - a site visit grouping captured items
//! - `InspectionItem` - a captured photo with optional audio and the local
//!   sync bookkeeping that drives background upload
//! - `GeoPoint` / `RemoteMetadata` - location shapes
//!
//! # Usage
//!
//! ```rust
//! use fieldsync::model::{Inspection, InspectionItem, GeoPoint};
//! ```

pub mod inspection;
pub mod item;
pub mod location;

// Re-export all types
pub use inspection::{Inspection, InspectionStatus, LOCAL_ID_PREFIX};
pub use item::{InspectionItem, ItemPatch, ProcessingStatus};
pub use location::{geo_point_from_metadata, GeoPoint, RemoteMetadata, UNKNOWN_ADDRESS};
