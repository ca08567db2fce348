//! Location Data Structures
//!
//! Geographic position attached to inspections and captured items, plus the
//! versioned metadata schema used when decoding positions from the remote
//! service.

use serde::{Deserialize, Serialize};

/// Address used when the remote service provides no usable location
pub const UNKNOWN_ADDRESS: &str = "Unknown location";

/// A geographic point with an optional human-readable address
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Optional reverse-geocoded or user-entered address
    pub address: Option<String>,
}

impl GeoPoint {
    /// Create a new point without an address
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            address: None,
        }
    }

    /// Create a new point with an address
    pub fn with_address(latitude: f64, longitude: f64, address: impl Into<String>) -> Self {
        Self {
            latitude,
            longitude,
            address: Some(address.into()),
        }
    }

    /// Get the address or the unknown-location fallback
    pub fn address_or_unknown(&self) -> &str {
        self.address.as_deref().unwrap_or(UNKNOWN_ADDRESS)
    }
}

/// Versioned position metadata as sent by the remote service.
///
/// Only the latitude/longitude subset is consumed locally; everything else
/// the service attaches is ignored at decode time. Absent or unknown-version
/// payloads degrade to the zero position rather than failing the decode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteMetadata {
    /// Schema version; `1` is the only version currently consumed
    #[serde(default = "RemoteMetadata::current_version")]
    pub version: u32,
    /// Latitude in decimal degrees, when the service recorded one
    #[serde(default)]
    pub latitude: Option<f64>,
    /// Longitude in decimal degrees, when the service recorded one
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl Default for RemoteMetadata {
    fn default() -> Self {
        Self {
            version: Self::current_version(),
            latitude: None,
            longitude: None,
        }
    }
}

impl RemoteMetadata {
    fn current_version() -> u32 {
        1
    }

    /// Convert into a canonical point, filling gaps with safe defaults
    pub fn to_geo_point(&self, address: Option<String>) -> GeoPoint {
        GeoPoint {
            latitude: self.latitude.unwrap_or(0.0),
            longitude: self.longitude.unwrap_or(0.0),
            address: Some(address.unwrap_or_else(|| UNKNOWN_ADDRESS.to_string())),
        }
    }
}

/// Derive a canonical point from optional remote metadata
pub fn geo_point_from_metadata(
    metadata: Option<&RemoteMetadata>,
    address: Option<String>,
) -> GeoPoint {
    match metadata {
        Some(meta) => meta.to_geo_point(address),
        None => GeoPoint {
            latitude: 0.0,
            longitude: 0.0,
            address: Some(address.unwrap_or_else(|| UNKNOWN_ADDRESS.to_string())),
        },
    }
}
