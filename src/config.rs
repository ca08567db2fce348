//! Sync engine configuration
//!
//! Provides the tuning knobs for the repository and the background sync
//! engine. Values come from a TOML file when one exists, with environment
//! overrides for deployment, and compiled-in defaults otherwise.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// Default remote service URL
const DEFAULT_API_URL: &str = "http://127.0.0.1:3000";

/// Environment variable overriding the remote service URL
const API_URL_ENV: &str = "FIELDSYNC_API_URL";

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_base_secs() -> u64 {
    2
}

fn default_backoff_cap_secs() -> u64 {
    60
}

fn default_reconcile_interval_secs() -> u64 {
    300
}

/// Configuration for the sync engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Base URL of the remote inspection service
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Fixed per-request timeout applied at the HTTP client boundary
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Debounce window for coalescing persistence writes
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Upload attempts before an item is parked as failed
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay for exponential retry backoff
    #[serde(default = "default_backoff_base_secs")]
    pub backoff_base_secs: u64,

    /// Upper bound on the retry backoff delay
    #[serde(default = "default_backoff_cap_secs")]
    pub backoff_cap_secs: u64,

    /// How often the reconciler overlays server state onto the repository
    #[serde(default = "default_reconcile_interval_secs")]
    pub reconcile_interval_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            request_timeout_secs: default_request_timeout_secs(),
            debounce_ms: default_debounce_ms(),
            max_retries: default_max_retries(),
            backoff_base_secs: default_backoff_base_secs(),
            backoff_cap_secs: default_backoff_cap_secs(),
            reconcile_interval_secs: default_reconcile_interval_secs(),
        }
    }
}

impl SyncConfig {
    /// Create a configuration from defaults plus environment overrides
    pub fn new() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Load configuration from a TOML file, applying environment overrides
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SyncError> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| SyncError::config(format!("cannot read config file: {}", e)))?;
        let mut config: Self = toml::from_str(&raw)
            .map_err(|e| SyncError::config(format!("invalid config file: {}", e)))?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file if it exists, otherwise fall back to defaults
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if path.exists() {
            match Self::load(path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Ignoring config file {}: {}", path.display(), e);
                }
            }
        }
        Self::new()
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.is_empty() {
                self.api_url = url;
            }
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.api_url.is_empty() {
            return Err(SyncError::config("api_url must not be empty"));
        }
        if self.max_retries == 0 {
            return Err(SyncError::config("max_retries must be at least 1"));
        }
        if self.backoff_cap_secs < self.backoff_base_secs {
            return Err(SyncError::config(
                "backoff_cap_secs must be >= backoff_base_secs",
            ));
        }
        Ok(())
    }

    /// Full URL for a service endpoint path
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_url.trim_end_matches('/'), path)
    }

    /// Per-request timeout as a `Duration`
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Persistence debounce window as a `Duration`
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Backoff base delay as a `Duration`
    pub fn backoff_base(&self) -> Duration {
        Duration::from_secs(self.backoff_base_secs)
    }

    /// Backoff delay cap as a `Duration`
    pub fn backoff_cap(&self) -> Duration {
        Duration::from_secs(self.backoff_cap_secs)
    }

    /// Reconcile interval as a `Duration`
    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_secs)
    }
}
