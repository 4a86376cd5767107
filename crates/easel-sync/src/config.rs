//! Sync client configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// Default throttle interval between saves in milliseconds
pub const DEFAULT_THROTTLE_INTERVAL_MS: u64 = 1000;

/// Default HTTP request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Environment variable overriding the endpoint base URL
pub const ENV_BASE_URL: &str = "EASEL_SYNC_BASE_URL";

/// Fallback endpoint base URL
pub const DEFAULT_BASE_URL: &str = "http://localhost:5858";

/// Synchronization client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Remote endpoint base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Whiteboard id, the key under which the snapshot is persisted
    pub whiteboard_id: String,

    /// Minimum interval between network saves (default: 1000 ms)
    #[serde(default = "default_throttle_interval_ms")]
    pub throttle_interval_ms: u64,

    /// Per-request HTTP timeout (default: 10 s)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Returns the endpoint base URL (checks EASEL_SYNC_BASE_URL env var).
pub fn default_base_url() -> String {
    std::env::var(ENV_BASE_URL).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
}

/// Returns the default throttle interval in milliseconds.
pub fn default_throttle_interval_ms() -> u64 {
    DEFAULT_THROTTLE_INTERVAL_MS
}

/// Returns the default HTTP request timeout in seconds.
pub fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl SyncConfig {
    /// Create a config for a whiteboard on an endpoint
    #[must_use]
    pub fn new(base_url: impl Into<String>, whiteboard_id: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            whiteboard_id: whiteboard_id.into(),
            throttle_interval_ms: default_throttle_interval_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }

    /// Override the throttle interval
    #[must_use]
    pub fn with_throttle_interval_ms(mut self, ms: u64) -> Self {
        self.throttle_interval_ms = ms;
        self
    }

    /// Override the request timeout
    #[must_use]
    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    /// Throttle interval as a duration
    #[must_use]
    pub fn throttle_interval(&self) -> Duration {
        Duration::from_millis(self.throttle_interval_ms)
    }

    /// Request timeout as a duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = SyncConfig::new("http://localhost:5858", "abc");
        assert_eq!(config.throttle_interval_ms, DEFAULT_THROTTLE_INTERVAL_MS);
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
        assert_eq!(config.throttle_interval(), Duration::from_millis(1000));
    }

    #[test]
    fn test_config_builders() {
        let config = SyncConfig::new("http://localhost:5858", "abc")
            .with_throttle_interval_ms(50)
            .with_request_timeout_secs(2);
        assert_eq!(config.throttle_interval(), Duration::from_millis(50));
        assert_eq!(config.request_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: SyncConfig =
            serde_json::from_str(r#"{"whiteboard_id": "abc"}"#).unwrap();
        assert_eq!(config.whiteboard_id, "abc");
        assert_eq!(config.throttle_interval_ms, DEFAULT_THROTTLE_INTERVAL_MS);
    }
}
